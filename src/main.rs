mod commands;
mod config;
mod db;
mod discord;
mod error;
mod http;
mod state;
mod types;
mod workers;

#[cfg(test)]
mod test_utils;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;
use state::BotState;

#[derive(Parser)]
#[command(name = "fry-bot")]
#[command(about = "Discord interactions bot for pillow and photo submissions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactions webhook and the image API
    Serve,
    /// Upload the slash command schema to Discord
    Register,
    /// Print the slash command schema without uploading it
    Schema,
}

async fn serve(config: Config) -> Result<()> {
    config.require_public_key()?;
    let bind_addr = config.bind_addr;
    let state = BotState::from_config(config).await?;

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, http::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(pending = state.background.in_flight(), "draining background tasks");
    state.background.drain().await;
    Ok(())
}

async fn register(config: Config) -> Result<()> {
    config.require_bot_token()?;
    let registry = commands::registry()?;
    let discord = state::rest_client(&config);
    commands::register(discord.as_ref(), &registry, config.application_id.as_deref()).await
}

fn schema() -> Result<()> {
    let registry = commands::registry()?;
    println!("{}", serde_json::to_string_pretty(&registry.schema())?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(Config::from_env()?).await,
        Commands::Register => register(Config::from_env()?).await,
        Commands::Schema => schema(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        e.print_tree();
        std::process::exit(1);
    }
}
