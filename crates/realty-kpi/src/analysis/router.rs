use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::analyzer::AnalysisError;
use super::service::{AnalysisServiceError, AnalysisSubmission, PortfolioAnalysisService};
use crate::history::{HistoryError, HistoryId, HistoryRepository, RepositoryError};

/// Router builder exposing the KPI catalog, analysis and history endpoints.
pub fn analysis_router<R>(service: Arc<PortfolioAnalysisService<R>>) -> Router
where
    R: HistoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/kpis", get(catalog_handler::<R>))
        .route("/api/v1/kpis/input-fields", post(input_fields_handler::<R>))
        .route("/api/v1/analysis", post(analyze_handler::<R>))
        .route("/api/v1/history", get(history_handler::<R>))
        .route("/api/v1/history/:history_id", get(saved_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct InputFieldsRequest {
    kpis: Vec<String>,
}

pub(crate) async fn catalog_handler<R>(
    State(service): State<Arc<PortfolioAnalysisService<R>>>,
) -> Response
where
    R: HistoryRepository + 'static,
{
    let payload = json!({
        "kpis": service.catalog(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn input_fields_handler<R>(
    State(service): State<Arc<PortfolioAnalysisService<R>>>,
    axum::Json(request): axum::Json<InputFieldsRequest>,
) -> Response
where
    R: HistoryRepository + 'static,
{
    match service.input_fields(&request.kpis) {
        Ok(fields) => {
            let payload = json!({
                "kpis": request.kpis,
                "fields": fields,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => analysis_error_response(&error),
    }
}

pub(crate) async fn analyze_handler<R>(
    State(service): State<Arc<PortfolioAnalysisService<R>>>,
    axum::Json(submission): axum::Json<AnalysisSubmission>,
) -> Response
where
    R: HistoryRepository + 'static,
{
    match service.submit(submission, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(AnalysisServiceError::Analysis(error)) => analysis_error_response(&error),
        Err(other) => internal_error(&other),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<PortfolioAnalysisService<R>>>,
) -> Response
where
    R: HistoryRepository + 'static,
{
    match service.history() {
        Ok(entries) => {
            let payload = json!({
                "analyses": entries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(&other),
    }
}

pub(crate) async fn saved_handler<R>(
    State(service): State<Arc<PortfolioAnalysisService<R>>>,
    Path(history_id): Path<String>,
) -> Response
where
    R: HistoryRepository + 'static,
{
    let id = HistoryId(history_id);
    match service.saved(&id) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Err(AnalysisServiceError::History(HistoryError::Repository(RepositoryError::NotFound))) => {
            let payload = json!({
                "error": "analysis not found",
                "history_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(&other),
    }
}

fn analysis_error_response(error: &AnalysisError) -> Response {
    let status = match error {
        AnalysisError::NoMetricsSelected | AnalysisError::UnknownMetric(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn internal_error(error: &AnalysisServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
