//! Snapshot CLI entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use snapshot::{failure_kind, run, Args, HttpTileFetcher, Outcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.level())
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let fetcher = Arc::new(HttpTileFetcher::new(args.http_config())?);

    let outcome = match run(&args, fetcher).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let (kind, invalid_request) = failure_kind(&e);
            error!(error = %e, kind, invalid_request, "Snapshot failed");
            return Err(e);
        }
    };

    match outcome {
        Outcome::Plan(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
        Outcome::Image {
            path,
            width,
            height,
        } => info!(path = %path.display(), width, height, "Done"),
    }

    Ok(())
}
