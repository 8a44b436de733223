//! The chatsql server binary: configuration loading, logging setup and the
//! HTTP listener.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chatsql_configuration::environment::ProcessEnvironment;
use chatsql_configuration::ParsedConfiguration;
use chatsql_server::routes::create_router;
use chatsql_server::state::create_state;

#[derive(Parser)]
struct ServerOptions {
    #[command(subcommand)]
    command: Option<Command>,
    /// Directory containing configuration.json.
    #[arg(
        long,
        value_name = "DIR",
        env = "CHATSQL_CONFIGURATION_DIR",
        default_value = "."
    )]
    configuration_dir: PathBuf,
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8085)]
    port: u16,
}

#[derive(Subcommand)]
enum Command {
    /// Write the initial configuration, skills-profile schema descriptor
    /// included, into the configuration directory.
    Initialize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = ServerOptions::parse();

    if let Some(Command::Initialize) = options.command {
        chatsql_configuration::write_parsed_configuration(
            &ParsedConfiguration::initial(),
            &options.configuration_dir,
        )
        .await?;
        tracing::info!(
            "wrote initial configuration to {}",
            options.configuration_dir.display()
        );
        return Ok(());
    }

    let parsed = chatsql_configuration::parse_configuration(&options.configuration_dir).await?;
    let configuration =
        chatsql_configuration::make_runtime_configuration(parsed, ProcessEnvironment)?;
    let state = create_state(Arc::new(configuration)).await?;

    let router = create_router(state);

    let address = SocketAddr::from(([0, 0, 0, 0], options.port));
    tracing::info!("starting server on {address}");

    axum::Server::bind(&address)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
