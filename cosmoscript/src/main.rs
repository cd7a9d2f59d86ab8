//! Cosmoscript binary entry point
//!
//! Runs the document database demonstration against a Cosmos DB account, or
//! against an in-process store with `--in-memory`.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::{error, info};
use mimalloc::MiMalloc;

use cosmoscript::{
    demo::{self, DemoConfig, DemoError},
    params, types,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Cosmoscript - document database walkthrough
#[derive(Parser, Debug)]
#[command(name = "cosmoscript", version, about, long_about = None)]
struct Cli {
    /// Database to provision
    #[arg(long, default_value = params::DEFAULT_DATABASE_ID)]
    database: String,

    /// Container to provision
    #[arg(long, default_value = params::DEFAULT_CONTAINER_ID)]
    container: String,

    /// Partition key path of the container
    #[arg(long, default_value = params::DEFAULT_PARTITION_KEY_PATH)]
    partition_key_path: String,

    /// Category of the written item, also used to filter the query
    #[arg(long, default_value = "Electronics")]
    category: String,

    /// Id of the written item
    #[arg(long, default_value = "item1")]
    item_id: String,

    /// Id looked up with a point read (defaults to the written item)
    #[arg(long)]
    read_id: Option<String>,

    /// Run against an in-process store instead of a remote account
    #[arg(long)]
    in_memory: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn demo_config(&self) -> Result<DemoConfig, DemoError> {
        let mut config = DemoConfig::with_partition_key_path(&self.partition_key_path)?;
        config.database = self.database.clone();
        config.container = self.container.clone();
        config.item = types::Item::new(&self.item_id, "Laptop", &self.category, 50);
        config.read_id = self.read_id.clone().unwrap_or_else(|| self.item_id.clone());
        config.category = self.category.clone();
        Ok(config)
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run(cli: &Cli) -> Result<(), DemoError> {
    let config = cli.demo_config()?;

    let report = demo::launch(&config, cli.in_memory, |name| std::env::var(name).ok()).await?;
    info!(
        "{} items returned, {} RU consumed",
        report.queried.len(),
        report.total_request_charge
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // missing .env file is fine, variables may come from the environment
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
