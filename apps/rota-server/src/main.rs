mod config;
mod handlers;
mod metrics;
mod scope;
mod server;
mod validate;


use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_stream::wrappers::TcpListenerStream;
use tracing::{error, info};

use config::ServerConfig;
use rota_events::EventBus;
use rota_events_memory::MemoryEventBus;
use rota_proto::rota_service_server::RotaServiceServer;
use rota_storage::{CreateUserParams, Role, Store};
use rota_store_sqlite::SqliteStore;
use server::RotaServer;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "rota-server")]
#[command(about = "Rota server CLI for administration and serving")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gRPC server
    Serve {
        /// Server address
        #[arg(long, default_value = "0.0.0.0:50051")]
        addr: String,

        /// Health check HTTP server address
        #[arg(long, default_value = "0.0.0.0:8080")]
        health_addr: String,
    },
    /// Root admin account management
    Admin {
        #[command(subcommand)]
        admin_cmd: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Bootstrap a root admin account (admins are never provisioned over RPC)
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// Email address (must be unused)
        #[arg(long)]
        email: String,
        /// Ed25519 public key, hex-encoded (32 bytes)
        #[arg(long)]
        public_key: String,
        /// Output only the new user id (for scripts)
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let db_url = cli
        .database_url
        .unwrap_or_else(|| "sqlite://rota.db?mode=rwc".to_string());

    match cli.command {
        Command::Serve { addr, health_addr } => {
            cmd_serve(&db_url, &addr, &health_addr).await?;
        }
        Command::Admin { admin_cmd } => match admin_cmd {
            AdminCommand::Create {
                name,
                email,
                public_key,
                plain,
            } => {
                cmd_admin_create(&db_url, &name, &email, &public_key, plain).await?;
            }
        },
    }

    Ok(())
}

// ────────────────────────────────────── Serve ──────────────────────────────────────

#[derive(Clone)]
struct SideState {
    ready: tokio::sync::watch::Receiver<bool>,
    metrics: metrics_exporter_prometheus::PrometheusHandle,
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(
    axum::extract::State(state): axum::extract::State<SideState>,
) -> (axum::http::StatusCode, &'static str) {
    if *state.ready.borrow() {
        (axum::http::StatusCode::OK, "ready")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<SideState>,
) -> String {
    state.metrics.render()
}

async fn cmd_serve(
    db_url: &str,
    addr: &str,
    health_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use axum::{routing::get, Router};

    let addr: std::net::SocketAddr = addr.parse()?;
    let health_addr: std::net::SocketAddr = health_addr.parse()?;

    let server_config = ServerConfig::from_env()?;
    let store = Arc::new(SqliteStore::open(db_url).await?);
    let events: Arc<dyn EventBus> = Arc::new(MemoryEventBus::new());
    let rota = RotaServer::new_sqlite(store, events, server_config);

    let metrics_handle = metrics::init_metrics();

    // gRPC health service (implements the gRPC health checking protocol)
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<RotaServiceServer<RotaServer>>()
        .await;

    // HTTP side server for Kubernetes probes and Prometheus scraping:
    // /healthz - liveness, /readyz - readiness, /metrics - Prometheus
    let (readiness_tx, readiness_rx) = tokio::sync::watch::channel(false);
    let side_state = SideState {
        ready: readiness_rx,
        metrics: metrics_handle,
    };
    let side_router = Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(side_state);

    let grpc_listener = tokio::net::TcpListener::bind(addr).await?;
    info!("RotaServer listening on {}", grpc_listener.local_addr()?);

    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    info!("Health checks listening on {}", health_listener.local_addr()?);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(health_listener, side_router).await {
            error!("health server error: {}", e);
        }
    });

    // The gRPC listener is bound; report ready
    let _ = readiness_tx.send(true);

    tonic::transport::Server::builder()
        .add_service(health_service)
        .add_service(RotaServiceServer::new(rota))
        .serve_with_incoming_shutdown(TcpListenerStream::new(grpc_listener), shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, stopping gracefully..."),
        Err(e) => error!("failed to listen for shutdown signal: {}", e),
    }
}

// ────────────────────────────────────── Admin ──────────────────────────────────────

async fn cmd_admin_create(
    db_url: &str,
    name: &str,
    email: &str,
    public_key_hex: &str,
    plain: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let public_key = hex::decode(public_key_hex)?;
    let key_bytes: [u8; 32] = public_key
        .as_slice()
        .try_into()
        .map_err(|_| "public key must be exactly 32 bytes")?;
    ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| format!("invalid Ed25519 public key: {}", e))?;

    let store = SqliteStore::open(db_url).await?;
    let user_id = store
        .create_user(&CreateUserParams {
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Admin,
            created_by: None,
            public_key,
        })
        .await?;

    if plain {
        println!("{}", user_id.0);
    } else {
        println!("Created admin account {} <{}>", name, email);
        println!("User ID: {}", user_id.0);
    }

    Ok(())
}
