//! billcast CLI - relays new congress.gov bill actions to X.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use billcast::config::{Config, DEFAULT_DATA_DIR};
use billcast::congress::{Bill, CongressClient, LatestAction};
use billcast::pipeline::{CycleReport, Pipeline, PipelineConfig};
use billcast::runner::Runner;
use billcast::store::{RetryQueue, WatermarkStore, RETRY_QUEUE_FILE, WATERMARK_FILE};
use billcast::twitter::{Post, Publisher, TwitterClient};

/// billcast - Post newly updated congress.gov bills to X.
#[derive(Parser)]
#[command(name = "billcast")]
#[command(about = "Relay new congress.gov bill actions to X")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll on a fixed interval until interrupted
    Run {
        /// Seconds between cycles (overrides BILLCAST_POLL_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,

        /// State directory (overrides BILLCAST_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Run a single poll cycle (for CronJob use)
    Poll {
        /// State directory (overrides BILLCAST_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Show the stored watermark and pending retries
    Status {
        /// State directory
        #[arg(long, env = "BILLCAST_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },

    /// Send a one-off post, optionally with an image
    Post {
        /// Post text
        #[arg(long)]
        text: String,

        /// Image file to attach
        #[arg(long, requires = "alt")]
        image: Option<PathBuf>,

        /// Alt text for the image
        #[arg(long, requires = "image")]
        alt: Option<String>,

        /// ID of a post to quote
        #[arg(long)]
        quote: Option<String>,
    },

    /// Print the post a bill would produce
    Preview {
        /// Originating chamber
        #[arg(long, default_value = "House")]
        chamber: String,

        /// Congress number
        #[arg(long, default_value = "118")]
        congress: u32,

        /// Bill number
        #[arg(long)]
        number: String,

        /// Bill title
        #[arg(long)]
        title: String,

        /// Latest action text
        #[arg(long)]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("billcast=debug,info")
        } else {
            EnvFilter::new("billcast=info,warn")
        }
    });

    if cli.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Run { interval, data_dir } => {
            let mut config = load_config(data_dir)?;
            if let Some(secs) = interval.filter(|secs| *secs > 0) {
                config.poll_interval = Duration::from_secs(secs);
            }
            run_relay(&config).await
        }
        Commands::Poll { data_dir } => {
            let config = load_config(data_dir)?;
            run_poll(&config).await
        }
        Commands::Post {
            text,
            image,
            alt,
            quote,
        } => {
            let config = load_config(None)?;
            run_post(&config, text, image.zip(alt), quote).await
        }
        Commands::Status { data_dir } => {
            run_status(&data_dir);
            Ok(())
        }
        Commands::Preview {
            chamber,
            congress,
            number,
            title,
            action,
        } => {
            run_preview(chamber, congress, number, title, action);
            Ok(())
        }
    }
}

fn load_config(data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::from_env().context("Missing relay credentials")?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let source = CongressClient::new(config).context("Failed to create congress.gov client")?;
    let publisher = TwitterClient::new(config).context("Failed to create X client")?;
    Ok(Pipeline::new(
        PipelineConfig::from(config),
        Arc::new(source),
        Arc::new(publisher),
    ))
}

async fn run_relay(config: &Config) -> Result<()> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        interval_secs = config.poll_interval.as_secs(),
        stale_days = config.stale_after.num_days(),
        "Starting relay"
    );

    let runner = Runner::new(build_pipeline(config)?, config.poll_interval);
    let cycles = runner
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!(cycles, "Relay stopped");
    Ok(())
}

async fn run_poll(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let report = pipeline.poll_cycle().await;
    print_report(&report);
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("\nPoll Cycle Summary");
    println!("   Fetched: {}", report.fetched);
    println!("   Already seen: {}", report.already_seen);
    println!("   Stale: {}", report.stale);
    println!("   Published: {}", report.published);
    println!("   Failed: {}", report.failed);
    println!("   Retried: {} ({} recovered)", report.retried, report.recovered);
    println!("   Pending retries: {}", report.pending);
    if report.dropped > 0 {
        println!("   Dropped (queue full): {}", report.dropped);
    }
    match &report.watermark {
        Some(watermark) => println!("   Watermark: {watermark}"),
        None => println!("   Watermark: (none)"),
    }

    if !report.errors.is_empty() {
        println!("   Errors: {}", report.errors.len());
        for err in &report.errors {
            eprintln!("     - {err}");
        }
    }
}

async fn run_post(
    config: &Config,
    text: String,
    image: Option<(PathBuf, String)>,
    quote: Option<String>,
) -> Result<()> {
    let client = TwitterClient::new(config).context("Failed to create X client")?;
    let mut post = Post::text(text);

    if let Some((path, alt)) = image {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let Some(media_id) = client.upload_media_with_alt_text(&bytes, &alt).await else {
            bail!("Failed to upload {}", path.display());
        };
        post = post.with_media(vec![media_id]);
    }
    if let Some(quote) = quote {
        post = post.with_quote(quote);
    }

    if !client.publish(&post).await {
        bail!("X rejected the post");
    }
    println!("Posted: {}", post.log_text());
    Ok(())
}

fn run_status(data_dir: &std::path::Path) {
    let watermark = WatermarkStore::new(data_dir.join(WATERMARK_FILE)).load();
    let pending = RetryQueue::new(data_dir.join(RETRY_QUEUE_FILE)).load();

    println!("State in {}\n", data_dir.display());
    match watermark {
        Some(watermark) => println!("Watermark: {watermark}"),
        None => println!("Watermark: (none, next poll fetches the latest page)"),
    }

    println!("Pending retries: {}", pending.len());
    for bill in &pending {
        println!(
            "   {} {} ({})",
            bill.key(),
            bill.title,
            bill.latest_action.action_date
        );
    }
}

fn run_preview(chamber: String, congress: u32, number: String, title: String, action: String) {
    let today = chrono::Utc::now().date_naive();
    let bill = Bill {
        congress,
        origin_chamber: chamber,
        number,
        title,
        latest_action: LatestAction {
            text: action,
            action_date: today,
        },
        update_date_including_text: chrono::Utc::now().to_rfc3339(),
    };

    let text = billcast::format::format(&bill);
    println!("{text}");
    println!("\n({} characters)", text.chars().count());
}
