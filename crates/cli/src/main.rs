//! control-room CLI.
//!
//! Every invocation loads `.control-room/`, restores the session of the
//! selected pipeline, performs one command and persists the result.

mod app;
mod cli;
mod render;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    app::execute(cli).await
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}
