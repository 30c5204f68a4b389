use anyhow::Result;
use clap::{Parser, Subcommand};
use propsync_sync::{
    render_salesperson_report, render_status_report, PgBackend, SyncConfig, SyncPipeline,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "propsync")]
#[command(about = "Sync proposal statuses and salespeople from the CRM form extract")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    /// Apply extract statuses to proposals and their opportunities.
    Status,
    /// Create missing salespeople and assign them to proposals.
    Salespeople,
    /// Salespeople, then statuses.
    All,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = std::env::var("PROPSYNC_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run(pipeline: &SyncPipeline<PgBackend>, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            let report = pipeline.run_status_sync().await?;
            println!("{}", render_status_report(&report));
        }
        Commands::Salespeople => {
            let report = pipeline.run_salesperson_sync().await?;
            println!("{}", render_salesperson_report(&report));
        }
        Commands::All => {
            let reports = pipeline.run_all().await?;
            println!("{}", render_salesperson_report(&reports.salespeople));
            println!("{}", render_status_report(&reports.status));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let pipeline = SyncPipeline::connect(SyncConfig::from_env()).await?;
    let result = run(&pipeline, cli.command.unwrap_or(Commands::All)).await;
    pipeline.close().await;
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "sync aborted");
    }
    result
}
