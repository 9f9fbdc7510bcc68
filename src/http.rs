use crate::evaluator::QualityEvaluator;
use crate::measurement::MetricKind;
use crate::quality::QualityLevel;
use crate::reading::ReadStatus;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpState {
    pub evaluator: Arc<QualityEvaluator>,
}

/// Read failures still answer 200: the value is the sentinel and `status`
/// says why.
#[derive(Debug, Serialize)]
struct AirQualityResponse {
    value: u8,
    level: Option<QualityLevel>,
    status: ReadStatus,
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct MetricResponse {
    metric: MetricKind,
    value: f64,
    status: ReadStatus,
    detail: Option<String>,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_air_quality(State(state): State<HttpState>) -> Json<AirQualityResponse> {
    let reading = state.evaluator.read_air_quality().await;
    Json(AirQualityResponse {
        value: reading.code_or_sentinel(),
        level: reading.value().copied(),
        status: reading.status(),
        detail: reading.detail(),
    })
}

async fn get_metric(
    State(state): State<HttpState>,
    Path(kind): Path<String>,
) -> Result<Json<MetricResponse>, (StatusCode, String)> {
    let metric = kind
        .parse::<MetricKind>()
        .map_err(|err| (StatusCode::NOT_FOUND, err.to_string()))?;
    let reading = state.evaluator.read_metric(metric).await;
    Ok(Json(MetricResponse {
        metric,
        value: reading.value_or_sentinel(),
        status: reading.status(),
        detail: reading.detail(),
    }))
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/air-quality", get(get_air_quality))
        .route("/v1/metrics/{kind}", get(get_metric))
        .with_state(state)
}
