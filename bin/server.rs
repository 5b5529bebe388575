// Community Fund Tracker - Web Server
// JSON API over a shared session, REST with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use community_fund::{
    Contribution, ContributionDraft, ContributionFilter, FundConfig, FundError, MutationReport, Session,
    SheetsClient, SqliteKeyValueStore,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type ServerSession = Session<SheetsClient, SqliteKeyValueStore>;

/// Shared application state
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<ServerSession>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// FundError → HTTP status + error body
fn error_response(e: FundError) -> Response {
    let status = match &e {
        FundError::Validation(_) => StatusCode::BAD_REQUEST,
        FundError::NotFound { .. } => StatusCode::NOT_FOUND,
        FundError::Unauthorized(_) => StatusCode::FORBIDDEN,
        FundError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "Request failed");
    }

    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(e.to_string()),
    };
    (status, Json(body)).into_response()
}

/// Created record plus what happened to each copy
#[derive(Serialize)]
struct SubmitResponse {
    contribution: Contribution,
    report: MutationReport,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/status - Sync mode and collection counts
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(ApiResponse::ok(session.status()))
}

/// GET /api/contributions?village=&paymentType=&dateFrom=&dateTo=&search=
async fn get_contributions(
    State(state): State<AppState>,
    Query(filter): Query<ContributionFilter>,
) -> impl IntoResponse {
    let session = state.session.lock().await;
    let contributions: Vec<Contribution> = session
        .visible_contributions(&filter)
        .into_iter()
        .cloned()
        .collect();

    Json(ApiResponse::ok(contributions))
}

/// POST /api/contributions - Submit a contribution
async fn post_contribution(State(state): State<AppState>, Json(draft): Json<ContributionDraft>) -> Response {
    let mut session = state.session.lock().await;

    match session.submit_contribution(draft).await {
        Ok((contribution, report)) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(SubmitResponse { contribution, report })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/mentors
async fn get_mentors(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(ApiResponse::ok(session.mentors().to_vec()))
}

/// GET /api/villages
async fn get_villages(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let villages: Vec<_> = session.visible_villages().into_iter().cloned().collect();
    Json(ApiResponse::ok(villages))
}

/// GET /api/stats - Dashboard summary for today
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(ApiResponse::ok(session.dashboard(Local::now().date_naive())))
}

/// POST /api/refresh - Re-fetch from the spreadsheet
async fn post_refresh(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;

    match session.refresh().await {
        Ok(()) => Json(ApiResponse::ok(session.status())).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Community Fund Tracker - Web Server");

    let config = FundConfig::load().context("Failed to load configuration")?;
    let kv = SqliteKeyValueStore::open(&config.cache_path)
        .with_context(|| format!("Failed to open local cache at {}", config.cache_path.display()))?;
    let service = SheetsClient::new(&config);

    let session = Session::start(config, service, kv).await;
    info!(mode = %session.mode(), "Session ready");

    // Create shared state
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/contributions", get(get_contributions).post(post_contribution))
        .route("/mentors", get(get_mentors))
        .route("/villages", get(get_villages))
        .route("/stats", get(get_stats))
        .route("/refresh", post(post_refresh))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://localhost:3000 (API under /api)");

    axum::serve(listener, app).await.context("Server stopped")?;
    Ok(())
}
