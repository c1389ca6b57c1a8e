//! splitfire main entry point

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use splitfire_client::{FireflyClient, SplitwiseClient};
use splitfire_config::Config;
use splitfire_core::Synchronizer;
use std::path::PathBuf;
use tokio::runtime::Builder;

#[derive(Parser, Debug)]
#[command(name = "splitfire")]
#[command(version = "0.1.0")]
#[command(about = "Synchronize Splitwise shared expenses into a Firefly III ledger", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Report decisions without writing to the ledger
    #[arg(long)]
    dry_run: bool,

    /// Print a default configuration file and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let mut config = Config::load(args.config.clone())
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.dry_run {
        config.sync.dry_run = true;
    }

    env_logger::Builder::from_default_env()
        .filter_level(
            config
                .logging
                .level
                .parse()
                .unwrap_or(log::LevelFilter::Info),
        )
        .init();

    // Remote calls are awaited strictly in sequence; a single-threaded
    // runtime keeps the run's execution model honest.
    let rt = Builder::new_current_thread().enable_all().build()?;

    rt.block_on(async {
        let source = SplitwiseClient::new(&config.splitwise.api_key);
        let sink = FireflyClient::new(&config.firefly.url, &config.firefly.token);

        if config.sync.dry_run {
            log::info!("dry run: no writes will reach the ledger");
        }

        let report = Synchronizer::new(&source, &sink, &config.sync)
            .run(Utc::now())
            .await
            .context("synchronization run failed")?;

        log::info!("{}", report.summary());
        for skipped in &report.skipped {
            log::info!(
                "manual handling needed: '{}' for {} {} on {}",
                skipped.description,
                skipped.currency,
                skipped.amount,
                skipped.date
            );
        }

        anyhow::Ok(())
    })?;

    Ok(())
}
