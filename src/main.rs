use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_etl::api::AlphaVantageClient;
use stock_etl::database::SqliteWarehouse;
use stock_etl::models::Config;
use stock_etl::pipeline::{run_workflow, Pipeline, WorkflowDefinition};

#[derive(Parser)]
#[command(name = "stock-etl")]
#[command(about = "Load daily stock prices from Alpha Vantage into the warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Trigger one run of the workflow
    Run {
        /// Override the configured symbol
        #[arg(long)]
        symbol: Option<String>,

        /// Override the number of records kept
        #[arg(long)]
        limit: Option<usize>,

        /// Fetch and transform only; print the records instead of loading them
        #[arg(long)]
        dry_run: bool,

        /// Seconds to wait before retrying a failed task
        #[arg(long)]
        retry_delay_secs: Option<u64>,
    },
    /// Print the workflow definition
    Describe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_etl=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let workflow = WorkflowDefinition::stock_etl();

    match cli.command.unwrap_or(Command::Run {
        symbol: None,
        limit: None,
        dry_run: false,
        retry_delay_secs: None,
    }) {
        Command::Describe => {
            println!("{}", workflow);
            Ok(())
        }
        Command::Run {
            symbol,
            limit,
            dry_run,
            retry_delay_secs,
        } => {
            let mut config = Config::from_env()?;
            if let Some(symbol) = symbol {
                config.symbol = symbol;
            }
            if let Some(limit) = limit {
                config.record_limit = limit;
            }
            config.validate()?;

            let workflow = match retry_delay_secs {
                Some(secs) => workflow.with_retry_delay(Duration::from_secs(secs)),
                None => workflow,
            };

            if let Err(e) = run(&config, &workflow, dry_run).await {
                error!("Run failed: {:#}", e);
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run(config: &Config, workflow: &WorkflowDefinition, dry_run: bool) -> Result<()> {
    let client = AlphaVantageClient::new(config)?;
    let warehouse = SqliteWarehouse::from_conn_id(&config.conn_id)?;
    let pipeline = Pipeline::new(config, Box::new(client), Box::new(warehouse.clone()))?;

    let (records, summary) = run_workflow(workflow, &pipeline, dry_run).await?;

    if dry_run {
        println!("{:<12} {:<8} {:<10} {:<10} {:<10} {:<10} {:<12}",
                 "Date", "Symbol", "Open", "High", "Low", "Close", "Volume");
        println!("{}", "-".repeat(76));
        for record in &records {
            println!("{:<12} {:<8} {:<10.2} {:<10.2} {:<10.2} {:<10.2} {:<12}",
                     record.date.format("%Y-%m-%d"), record.symbol,
                     record.open, record.high, record.low, record.close, record.volume);
        }
        println!("Total Records: {}", summary.records);
    } else {
        let rows = warehouse.row_count(&config.table).await?;
        info!("📊 {} now holds {} rows for {}", config.table, rows, summary.symbol);
    }

    Ok(())
}
