use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use permkit_authorization::{AuthorizationStatus, Authorizer, AuthorizerExt, AuthorizerSet};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "permkit")]
#[command(about = "Query and request authorization for simulated resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    Status {
        #[arg(long)]
        json: bool,
    },

    Request {
        name: String,

        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
        concurrent: u64,
    },

    RequestAll {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let set = config.build()?;

    match cli.command {
        Commands::Status { json } => {
            print_statuses(&set.check(), json)?;
        }

        Commands::Request { name, concurrent } => {
            cmd_request(&set, &name, concurrent).await?;
        }

        Commands::RequestAll { json } => {
            let statuses = set.request_missing().await?;
            print_statuses(&statuses, json)?;
        }
    }

    Ok(())
}

async fn cmd_request(set: &AuthorizerSet, name: &str, concurrent: u64) -> Result<()> {
    let authorizer = set
        .get(name)
        .with_context(|| format!("Unknown resource '{name}'"))?;

    info!(resource = name, concurrent, "Requesting authorization");

    let requests = (0..concurrent).map(|_| authorizer.request());
    let results = futures::future::join_all(requests).await;

    for (index, result) in results.into_iter().enumerate() {
        println!("#{index} {name}: {}", result?);
    }

    println!("current {name}: {}", authorizer.authorization_status());

    Ok(())
}

fn print_statuses(statuses: &BTreeMap<String, AuthorizationStatus>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(statuses)?);
        return Ok(());
    }

    for (name, status) in statuses {
        println!("{name:<16} {status}");
    }

    Ok(())
}
