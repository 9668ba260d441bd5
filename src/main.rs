use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use scout_es6_migration::cli::{print_help, print_version, wants_help, wants_version};
use scout_es6_migration::config::Config;
use scout_es6_migration::migrate::MigrationPipeline;
use scout_es6_migration::workspace::DiskStore;

fn main() {
    let args = std::env::args().collect::<Vec<_>>();
    if wants_help(&args) {
        print_help();
        return;
    }
    if wants_version(&args) {
        print_version();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting scout-migrate");

    if let Err(err) = run() {
        let message = format!("{err:#}");
        error!(error = %message, "Migration aborted");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!(
        source = %config.source_dir,
        target = %config.target_dir,
        namespace = %config.namespace,
        dry_run = config.dry_run,
        "Loaded configuration"
    );
    let pipeline = MigrationPipeline::new(Arc::new(config));
    let stats = pipeline.run(&mut DiskStore)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
