use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose { "billscan=debug" } else { "billscan=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = config::AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    config.validate()?;

    tracing::info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "starting batch"
    );

    let report = commands::run_batch(&config).await?;
    commands::print_report(&report);
    Ok(())
}
