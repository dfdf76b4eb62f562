use std::sync::Arc;

use clap::{Parser, Subcommand};

use debug_site::config::{AppState, Config, DEFAULT_CONFIG_PATH};
use debug_site::site::Site;
use debug_site::{edge, logger, server};

#[derive(Parser, Debug)]
#[command(name = "debug_site")]
#[command(about = "Debug web site for testing CDN and reverse proxy behavior")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run the long-lived HTTP server (default)
    #[default]
    Serve,
    /// Handle a single CGI/1.1 request from the environment and stdin
    Cgi,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    logger::init(&cfg.logging).map_err(|e| e as Box<dyn std::error::Error>)?;

    match cli.command.unwrap_or_default() {
        Command::Serve => serve(cfg),
        Command::Cgi => cgi(&cfg),
    }
}

fn serve(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Create the Tokio runtime, sizing worker threads from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    let state = Arc::new(AppState::new(&cfg));
    runtime.block_on(server::run(state))
}

fn cgi(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let site = Site::from_config(cfg);
    runtime.block_on(edge::cgi::run(&site, &cfg.logging))
}
