//! congress.gov data types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A bill as listed by the congress.gov `/bill` endpoint.
///
/// Field names follow the upstream JSON so the retry queue file holds the same
/// shape the API returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Congress number (e.g. 118).
    pub congress: u32,
    /// Chamber the bill originated in ("House" or "Senate").
    pub origin_chamber: String,
    /// Bill number within its congress and type.
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    /// Official title.
    pub title: String,
    /// Most recent action taken on the bill.
    pub latest_action: LatestAction,
    /// Last update time including text changes; the watermark value.
    pub update_date_including_text: String,
}

/// The latest action on a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAction {
    /// Human-readable description of the action.
    pub text: String,
    /// Day the action was taken.
    pub action_date: NaiveDate,
}

impl Bill {
    /// Short identifier for log lines, e.g. `118-House-42`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.congress, self.origin_chamber, self.number)
    }

    /// The latest action date as midnight UTC.
    #[must_use]
    pub fn action_time(&self) -> DateTime<Utc> {
        self.latest_action
            .action_date
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// Whether the latest action is older than `max_age` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.action_time()) > max_age
    }
}

/// Raw `/bill` response page. Entries stay untyped so one malformed bill
/// doesn't sink the whole batch.
#[derive(Debug, Deserialize)]
pub(crate) struct BillsPage {
    pub bills: Vec<serde_json::Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn sample_bill(number: u32, action_date: NaiveDate, updated: &str) -> Bill {
    Bill {
        congress: 118,
        origin_chamber: "House".to_string(),
        number: number.to_string(),
        title: "Example Act".to_string(),
        latest_action: LatestAction {
            text: "Passed House".to_string(),
            action_date,
        },
        update_date_including_text: updated.to_string(),
    }
}
