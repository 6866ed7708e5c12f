//! Farmhost Control - Render Host Manager Service
//!
//! This is the main entry point for the host manager service.
//! It accepts resource reports from render host agents and exposes health probes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use farmhost_control::{
    ControlError, HostManager, HostManagerService, HostReport, HttpHostAgentClient,
    InMemoryFrameRegistry, ManagerConfig,
};
use farmhost_core::HostId;
use farmhost_store::{HardwareState, LockState, RocksStore};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Manager = HostManagerService<RocksStore, HttpHostAgentClient, InMemoryFrameRegistry>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    manager: Arc<Manager>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// What a reporting agent gets back.
#[derive(Serialize)]
struct ReportResponse {
    host_id: HostId,
    lock_state: LockState,
    hardware_state: HardwareState,
    tags: Vec<String>,
}

fn error_response(err: &ControlError) -> Response {
    let code = err.http_status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code,
                message: err.to_string(),
            },
        }),
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "farmhost-control",
    })
}

async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.manager.get_default_allocation().await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "no default allocation"),
    }
}

async fn report_handler(
    State(state): State<AppState>,
    Json(report): Json<HostReport>,
) -> Response {
    match state.manager.process_host_report(&report).await {
        Ok(host) => Json(ReportResponse {
            host_id: host.host_id,
            lock_state: host.lock_state,
            hardware_state: host.hardware_state,
            tags: host.tags,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(host = %report.host.name, error = %e, "Rejected host report");
            error_response(&e)
        }
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/internal/hosts/report", post(report_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,farmhost=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Farmhost Control");

    // Load configuration from environment
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data".to_string());

    let mut config = ManagerConfig::default();
    if let Ok(port) = std::env::var("AGENT_PORT") {
        match port.parse() {
            Ok(port) => config.agent_port = port,
            Err(e) => tracing::warn!(
                value = %port,
                error = %e,
                default = config.agent_port,
                "Ignoring invalid AGENT_PORT"
            ),
        }
    }
    if let Ok(name) = std::env::var("DEFAULT_ALLOCATION") {
        config.default_allocation_name = name;
    }

    // Initialize store
    let store = Arc::new(RocksStore::open(&data_dir)?);
    tracing::info!(data_dir = %data_dir, "Initialized RocksDB store");

    // Initialize host manager
    let agent = Arc::new(HttpHostAgentClient::from_config(&config)?);
    tracing::info!(
        agent_port = agent.port(),
        timeout_secs = config.agent_request_timeout_seconds,
        "Configured host agent client"
    );
    let frames = Arc::new(InMemoryFrameRegistry::new());
    let manager = Arc::new(HostManagerService::new(store, agent, frames, config));

    let allocation = manager.ensure_default_allocation()?;
    tracing::info!(
        allocation = %allocation.name,
        tag = %allocation.tag,
        "New hosts will join the default allocation"
    );

    let app = create_router(AppState { manager });

    // Start server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
