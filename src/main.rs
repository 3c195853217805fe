use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docrag_server::{INGEST_PORT, IndexBackend, QUERY_PORT, ServiceConfig};

#[derive(Parser)]
#[command(name = "docrag")]
#[command(
    about = "Document ingestion and retrieval-augmented generation services",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion service (POST /process)
    Ingest(ServeArgs),
    /// Run the query service (POST /generate)
    Query(ServeArgs),
    /// Run both services in one process, sharing their clients
    All {
        /// Address of the ingestion service
        #[arg(long, env = "DOCRAG_INGEST_BIND")]
        ingest_bind: Option<SocketAddr>,

        /// Address of the query service
        #[arg(long, env = "DOCRAG_QUERY_BIND")]
        query_bind: Option<SocketAddr>,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "DOCRAG_BIND")]
    bind: Option<SocketAddr>,

    /// Port on all interfaces, used when no bind address is given
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

impl ServeArgs {
    fn addr(&self, default_port: u16) -> SocketAddr {
        self.bind
            .unwrap_or_else(|| all_interfaces(self.port.unwrap_or(default_port)))
    }
}

fn all_interfaces(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    info!(
        project = %config.project,
        index = %config.index_name,
        "configuration loaded"
    );

    match cli.command {
        Command::Ingest(args) => {
            warn_if_memory_backend(&config);
            let app = docrag_server::ingest_app(&config).await?;
            serve("ingestion", args.addr(INGEST_PORT), app).await
        }
        Command::Query(args) => {
            warn_if_memory_backend(&config);
            let app = docrag_server::query_app(&config).await?;
            serve("query", args.addr(QUERY_PORT), app).await
        }
        Command::All {
            ingest_bind,
            query_bind,
        } => {
            let (ingest, query) = docrag_server::combined_apps(&config).await?;
            let ingest_addr = ingest_bind.unwrap_or_else(|| all_interfaces(INGEST_PORT));
            let query_addr = query_bind.unwrap_or_else(|| all_interfaces(QUERY_PORT));

            tokio::try_join!(
                serve("ingestion", ingest_addr, ingest),
                serve("query", query_addr, query),
            )?;
            Ok(())
        }
    }
}

fn warn_if_memory_backend(config: &ServiceConfig) {
    if config.index == IndexBackend::Memory {
        warn!(
            "in-memory index is not shared between processes; \
             use `docrag all` to run both services together"
        );
    }
}

async fn serve(service: &str, addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {} service to {}", service, addr))?;
    info!(service, %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{} service stopped unexpectedly", service))?;

    info!(service, "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
