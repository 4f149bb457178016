//! radio-tuner: retune an FM or HD Radio receiver over local HTTP.
//!
//! `GET <tune path>?freq=..[&prog=..]` writes the receiver config, restarts
//! its unit, waits for the audio mount, and redirects to it.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use radio_tuner::{cli, startup};

#[actix_web::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,radio_tuner=info")
        }))
        .init();

    let settings = args.settings()?;
    startup::run(settings).await
}
