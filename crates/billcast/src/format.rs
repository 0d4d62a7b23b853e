//! Turns a bill into post text.

use crate::congress::Bill;
use crate::twitter::Post;

/// Longest body (chamber, action, title) posted without truncation.
pub const BODY_BUDGET: usize = 216;

/// Characters of body kept when truncating, before the ellipsis.
pub const TRUNCATED_BODY_CHARS: usize = 214;

/// Marker appended to a truncated body.
pub const ELLIPSIS: char = '…';

/// Canonical congress.gov page for a bill.
#[must_use]
pub fn bill_url(bill: &Bill) -> String {
    format!(
        "https://www.congress.gov/bill/{}th-congress/{}-bill/{}",
        bill.congress, bill.origin_chamber, bill.number
    )
}

/// Post text for `bill`: a possibly truncated body followed by the bill URL.
///
/// The URL is not counted against [`BODY_BUDGET`].
#[must_use]
pub fn format(bill: &Bill) -> String {
    let body = format!(
        "{}: {}\n{}",
        bill.origin_chamber, bill.latest_action.text, bill.title
    );
    format!("{}\n{}", truncate_body(&body), bill_url(bill))
}

/// Post for `bill`, without attachments.
#[must_use]
pub fn format_post(bill: &Bill) -> Post {
    Post::text(format(bill))
}

/// Truncate on character boundaries, never splitting a UTF-8 sequence.
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= BODY_BUDGET {
        return body.to_string();
    }

    let mut truncated: String = body.chars().take(TRUNCATED_BODY_CHARS).collect();
    truncated.push(ELLIPSIS);
    truncated
}
