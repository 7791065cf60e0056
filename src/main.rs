use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use bamboo_bank::config::Config;
use bamboo_bank::content::ContentStore;
use bamboo_bank::dispatch::Dispatcher;
use bamboo_bank::server;
use bamboo_bank::webhook::WebhookSecret;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

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
    info!(
        quotes = content.quotes().len(),
        deeds = content.deeds().len(),
        recipients = cfg.line.recipients.len(),
        "configuration loaded"
    );

    let secret = WebhookSecret::new(&cfg.line.channel_secret);
    let dispatcher = Dispatcher::from_config(&cfg, content)?;
    let app = server::router(dispatcher, secret);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Bamboo Bank listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
