use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::constants;
use crate::data::{MarketData, MockMarketData};
use crate::error::WorkflowError;
use crate::services::batch::BatchAnalyzer;
use crate::types::{AnalystKind, WorkflowMode};
use crate::workflow::{normalize_symbol, RunOptions, WorkflowOrchestrator};

pub struct AppState {
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            started_at: Utc::now(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub symbol: String,
    pub mode: Option<WorkflowMode>,
    pub analysts: Option<Vec<AnalystKind>>,
    pub current_position: Option<f64>,
    pub market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub symbols: Option<Vec<String>>,
    pub mode: Option<WorkflowMode>,
    pub workers: Option<usize>,
}

/// Maps workflow failures onto HTTP statuses
pub struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else if matches!(self.0, WorkflowError::Llm { .. } | WorkflowError::Client(_)) {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let stage = self.0.stage().map(|s| s.to_string());
        (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "stage": stage,
            })),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(get_config))
        .route("/analyze", post(analyze))
        .route("/batch", post(batch))
        .with_state(state)
}

pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<(), std::io::Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 [API] Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.orchestrator.model_name(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.config().masked())
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    info!(
        event = constants::events::HTTP_REQUEST,
        route = "/analyze",
        symbol = %req.symbol,
        "🌐 [API] Analyze request for {}",
        req.symbol
    );

    let orchestrator = &state.orchestrator;
    let mut options = RunOptions::from_config(orchestrator.config());
    if let Some(mode) = req.mode {
        options = options.with_mode(mode);
    }
    if let Some(analysts) = req.analysts {
        options = options.with_analysts(analysts);
    }
    if let Some(position) = req.current_position {
        options = options.with_position(position);
    }

    let symbol = normalize_symbol(&req.symbol)?;
    let market = match req.market_data {
        Some(data) => data,
        None => MockMarketData::generate(
            &symbol,
            constants::batch::MOCK_HISTORY_DAYS,
            MockMarketData::seed_for(&symbol),
        ),
    };

    let result = orchestrator
        .run_with(&symbol, &market, options)
        .await
        .map_err(|e| {
            error!("❌ [API] Analysis of {} failed: {}", symbol, e);
            ApiError(e)
        })?;

    Ok(Json(result).into_response())
}

async fn batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Response, ApiError> {
    let orchestrator = state.orchestrator.clone();
    let symbols = req
        .symbols
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| orchestrator.config().trading.symbols.clone());
    if symbols.is_empty() {
        return Err(ApiError(WorkflowError::InvalidSymbol(String::new())));
    }

    info!(
        event = constants::events::HTTP_REQUEST,
        route = "/batch",
        symbols = symbols.len(),
        "🌐 [API] Batch request for {} symbols",
        symbols.len()
    );

    let mut options = RunOptions::from_config(orchestrator.config());
    if let Some(mode) = req.mode {
        options = options.with_mode(mode);
    }
    let mut analyzer = BatchAnalyzer::new(orchestrator).with_options(options);
    if let Some(workers) = req.workers {
        analyzer = analyzer.with_workers(workers);
    }

    let report = analyzer.run(&symbols).await;
    Ok(Json(json!({
        "summary": report.summary(),
        "rows": report.rows(),
    }))
    .into_response())
}
