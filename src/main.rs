use clap::Parser;
use plinth::config::Config;
use plinth::router::{Router, StaticFiles};
use plinth::{routes, server};
use std::path::PathBuf;
use tracing::Level;

/// Simple HTTP server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Static files directory
    #[arg(short, long = "static")]
    static_dir: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(dir) = args.static_dir {
        cfg.static_files.root = dir;
    }

    let mut router = Router::new(StaticFiles::from_config(&cfg.static_files));
    routes::register_demo_routes(&mut router);

    match std::fs::canonicalize(&cfg.static_files.root) {
        Ok(root) => tracing::info!("Static files: {}", root.display()),
        Err(_) => tracing::warn!(
            "Static files directory {} does not exist",
            cfg.static_files.root.display()
        ),
    }

    server::listener::run(&cfg.server, router).await
}
