// sift-gateway-rs/src/routes.rs
//
// Analysis endpoints under /api, plus /health
// Provides:
// - POST /api/analyze: analyze one text, cached by exact input
// - POST /api/analyze/batch: up to 10 texts, per-item failure reporting
// - GET  /api/stats: cache occupancy and active analyzer
// - POST /api/cache/flush: admin-gated cache clear
// A failed single analysis degrades to the neutral report; the
// endpoint itself stays 200.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use sift_analyzer::{AnalysisReport, AnalyzerError};

use crate::auth::{require_admin, Caller};
use crate::error::ApiError;
use crate::AppState;

pub const MAX_BATCH_SIZE: usize = 10;

// Analysis of identical text is identical; let clients and proxies
// keep it for a day.
const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// Batch items arrive untyped; non-string entries are skipped rather
/// than failing the whole batch.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub texts: Vec<Value>,
}

/// A report plus the request-level fields added by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub processing_time: f64,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Report(AnalysisEnvelope),
    Failed { error: String, text: String },
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
}

/// Failure policy for single analysis: degrade to the neutral report
/// instead of surfacing an error to the client.
pub(crate) fn report_or_neutral(outcome: Result<AnalysisReport, AnalyzerError>) -> AnalysisReport {
    match outcome {
        Ok(report) => report,
        Err(err) => {
            warn!("analysis failed, serving neutral report: {}", err);
            AnalysisReport::neutral()
        }
    }
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let started = Instant::now();

    if let Some(mut hit) = state.cache.get(&request.text).await {
        hit.processing_time = started.elapsed().as_secs_f64();
        return Ok(with_cache_control(Json(hit).into_response()));
    }

    let report = report_or_neutral(state.analyzer.analyze(&request.text).await);
    let envelope = AnalysisEnvelope {
        report,
        processing_time: started.elapsed().as_secs_f64(),
        text: request.text.clone(),
    };
    state.cache.put(&request.text, envelope.clone()).await;
    Ok(with_cache_control(Json(envelope).into_response()))
}

pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let submitted = request.texts.len();
    if submitted > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "Batch size limit is {} texts",
            MAX_BATCH_SIZE
        )));
    }

    let started = Instant::now();
    let mut results = Vec::with_capacity(submitted);
    for item in &request.texts {
        let text = match item.as_str() {
            Some(text) => text,
            None => continue,
        };

        if let Some(hit) = state.cache.get(text).await {
            results.push(BatchEntry::Report(hit));
            continue;
        }

        match state.analyzer.analyze(text).await {
            Ok(report) => {
                let envelope = AnalysisEnvelope {
                    report,
                    processing_time: 0.0,
                    text: text.to_string(),
                };
                state.cache.put(text, envelope.clone()).await;
                results.push(BatchEntry::Report(envelope));
            }
            Err(err) => {
                warn!("batch item failed: {}", err);
                results.push(BatchEntry::Failed {
                    error: err.to_string(),
                    text: text.to_string(),
                });
            }
        }
    }

    // Processing time is reported as the batch average, matching how
    // long each item took from the caller's point of view.
    if submitted > 0 {
        let shared = started.elapsed().as_secs_f64() / submitted as f64;
        for entry in &mut results {
            if let BatchEntry::Report(envelope) = entry {
                envelope.processing_time = shared;
            }
        }
    }

    Ok(Json(BatchResponse { results }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "cache_size": state.cache.len().await,
        "cache_max_size": state.cache.capacity(),
        "analyzer_type": state.analyzer.name(),
    }))
}

pub async fn flush_cache(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &caller)?;
    let removed = state.cache.flush().await;
    info!("cache flushed, {} entries removed", removed);
    Ok(Json(json!({
        "status": "success",
        "message": format!("Cache flushed successfully. {} entries removed.", removed),
    })))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "analyzer": state.analyzer.name(),
    }))
}

fn with_cache_control(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_analysis_degrades_to_neutral() {
        let report = report_or_neutral(Err(AnalyzerError::Empty));
        assert_eq!(report, AnalysisReport::neutral());

        let mut custom = AnalysisReport::neutral();
        custom.toxicity.score = 0.9;
        assert_eq!(report_or_neutral(Ok(custom.clone())), custom);
    }

    #[test]
    fn envelope_flattens_report_fields() {
        let envelope = AnalysisEnvelope {
            report: AnalysisReport::neutral(),
            processing_time: 0.25,
            text: "hi".to_string(),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("toxicity").is_some());
        assert!(value.get("report").is_none());
        assert_eq!(value["processing_time"], 0.25);
        assert_eq!(value["text"], "hi");
    }

    #[test]
    fn failed_batch_entry_serializes_as_error_object() {
        let entry = BatchEntry::Failed {
            error: "analysis service returned an empty response".to_string(),
            text: "x".to_string(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"error": "analysis service returned an empty response", "text": "x"})
        );
    }
}
