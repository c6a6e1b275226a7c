//! mapmirror entry point.
//!
//! Parses flags, layers them over the config file and environment, runs
//! the startup checks and drives one mirror run. Logging goes to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mapmirror_client::{FetchClient, FetchConfig, Mirror};
use mapmirror_client::fetch::canonicalize;
use mapmirror_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod args;
mod startup;

use args::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let origin = cli
        .origin
        .as_deref()
        .map(canonicalize)
        .transpose()
        .context("invalid --origin")?
        .map(|url| url.to_string());

    let config =
        AppConfig::load(cli.config.as_deref(), &cli.overrides(origin)).context("failed to load configuration")?;
    let config = Arc::new(startup::check(config).await?);

    let transport = Arc::new(FetchClient::new(FetchConfig::from(config.as_ref()))?);
    let report = Mirror::new(config.clone(), transport)?.run().await?;

    tracing::info!(
        outdir = %config.outdir.display(),
        requests = report.requests,
        "mirror complete"
    );

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
