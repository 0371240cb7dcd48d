use clap::Parser;
use thiserror::Error;

use crate::args::{Cli, Command};
use crate::client::commands::{self, CommandErr};
use crate::client::http::ApiClient;
use crate::client::session::{Session, local_now};
use crate::db::StoreError;
use crate::util::env::{Config, EnvErr};
use crate::util::telemetry;

mod api;
mod args;
mod client;
mod constants;
mod db;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Command(#[from] CommandErr),

    #[error(transparent)]
    Std(#[from] Box<dyn std::error::Error>),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = util::env::config().await?;
    let telemetry_registry = telemetry::Telemetry::new(config)?.register();

    let outcome = run(cli, config).await;
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "command failed");
    }

    telemetry_registry.shutdown();
    outcome
}

async fn run(cli: Cli, config: &Config) -> Result<()> {
    let api_url = cli.api_url.as_deref().unwrap_or(&config.matchlog_api_url);
    let session = || Session::new(ApiClient::new(api_url), local_now().date());

    let output = match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => return serve(config, port).await,
        Command::List => commands::list(&mut session()).await?,
        Command::Add(fields) => commands::add(&mut session(), fields).await?,
        Command::Edit { id, fields } => commands::edit(&mut session(), id, fields).await?,
        Command::Delete { id, yes } => commands::delete(&mut session(), id, yes).await?,
        Command::Stats => commands::stats(&mut session()).await?,
        Command::Calendar { month } => commands::calendar(&mut session(), month).await?,
    };

    print!("{output}");
    Ok(())
}

async fn serve(config: &Config, port: Option<u16>) -> Result<()> {
    tracing::info!("starting match api");

    let mut config = config.clone();
    if let Some(port) = port {
        config.server_api_port = port;
    }

    let store = db::open_store(&config).await?;
    api::server::start_server(&config, store).await?;
    Ok(())
}
