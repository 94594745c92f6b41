//! HTTP surface for the abacus dashboard.
//!
//! Serves the current dashboard state as JSON and lets clients toggle the
//! sampled category or acknowledge errors.

pub mod config;

pub use config::WebConfig;

use crate::display::{DashboardState, DashboardView};
use crate::error::{CounterError, Result};
use crate::poller::{Category, Poller, PollerEvent};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// Shared handles the request handlers work with.
#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<Poller>,
    pub dashboard: Arc<RwLock<DashboardState>>,
    /// Start of the poller session being served
    pub started_at: Instant,
}

impl AppState {
    pub fn new(poller: Arc<Poller>, dashboard: Arc<RwLock<DashboardState>>) -> Self {
        Self {
            poller,
            dashboard,
            started_at: Instant::now(),
        }
    }
}

#[derive(Clone)]
struct ApiState {
    app: AppState,
    config: Arc<WebConfig>,
}

impl ApiState {
    fn snapshot(&self, dashboard: &DashboardState) -> Json<StateResponse> {
        let now = Instant::now();
        let expected = self
            .config
            .expected_interval(now.saturating_duration_since(self.app.started_at));
        Json(StateResponse {
            dashboard: dashboard.view(),
            stale: dashboard.is_stale(now, expected),
        })
    }
}

/// Dashboard view as served over HTTP.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub dashboard: DashboardView,
    /// No value for longer than the current refetch interval plus grace
    pub stale: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Fold poller events into the dashboard until the poller side hangs up.
pub fn spawn_dashboard_updater(
    mut events: mpsc::UnboundedReceiver<PollerEvent>,
    dashboard: Arc<RwLock<DashboardState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Dashboard received {:?}", event);
            dashboard.write().await.apply(&event, Instant::now());
        }
        debug!("Poller event channel closed");
    })
}

/// Build the axum application.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/category", post(set_category))
        .route("/api/errors/reset", post(reset_errors))
        .with_state(ApiState {
            app: state,
            config: Arc::new(config.clone()),
        })
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Start the web server with the provided configuration and state.
pub async fn start_web_server(config: WebConfig, state: AppState) -> Result<()> {
    let app = create_app(&config, state);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| CounterError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Starting abacus web server on http://{}", addr);
    info!("API endpoint: http://{}/api/state", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CounterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| CounterError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_state(State(state): State<ApiState>) -> Json<StateResponse> {
    let dashboard = state.app.dashboard.read().await;
    state.snapshot(&dashboard)
}

async fn set_category(
    State(state): State<ApiState>,
    Json(request): Json<CategoryRequest>,
) -> Json<StateResponse> {
    // The dashboard is cleared before the poller fetches, so the switch itself
    // never wipes the new category's first value. A scheduled fetch for the old
    // category that is already in flight can still land after this.
    let mut dashboard = state.app.dashboard.write().await;
    dashboard.set_category(request.category);
    state.app.poller.set_category(request.category);
    state.snapshot(&dashboard)
}

async fn reset_errors(State(state): State<ApiState>) -> Json<StateResponse> {
    let mut dashboard = state.app.dashboard.write().await;
    dashboard.reset_errors();
    state.snapshot(&dashboard)
}
