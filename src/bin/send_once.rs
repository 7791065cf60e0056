use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use bamboo_bank::config::Config;
use bamboo_bank::content::ContentStore;
use bamboo_bank::dispatch::Dispatcher;
use bamboo_bank::model::DispatchOptions;
use bamboo_bank::server::SendResponse;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one daily dispatch and print the result as JSON"
)]
struct Args {
    /// Preview the next message without claiming today or advancing the counter
    #[arg(long)]
    force: bool,

    /// YAML or JSON file with `quotes` and `deeds`; bundled content when unset
    #[arg(long, env = "CONTENT_PATH")]
    content: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    let content = ContentStore::load_or_builtin(args.content.as_deref())
        .context("failed to load content")?;
    let dispatcher = Dispatcher::from_config(&cfg, content)?;

    let result = dispatcher
        .dispatch(DispatchOptions { force: args.force })
        .await;
    let (status, body) = SendResponse::from_result(&result);
    println!("{}", serde_json::to_string(&body)?);

    match result {
        Ok(outcome) => {
            info!(outcome = outcome.as_str(), %status, "done");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "dispatch failed");
            std::process::exit(1);
        }
    }
}
