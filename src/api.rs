//! HTTP surface.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/health` | liveness |
//! | POST | `/api/v1/transcripts` | analyze and store a transcript |
//! | POST | `/api/v1/clinical-trials/recommendations` | run the pipeline |
//! | GET | `/api/v1/transcripts/{id}/recommendations` | stored recommendations |
//! | GET | `/api/v1/clinical-trials/{trial_id}` | one trial |

use crate::domain::{CandidateTrial, TrialPreview};
use crate::error::TrialMatchError;
use crate::recommendation::RecommendationService;
use crate::transcript::TranscriptAnalyzer;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared handler state
pub struct AppState {
    pub service: RecommendationService,
    pub analyzer: TranscriptAnalyzer,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/transcripts", post(create_transcript_handler))
        .route(
            "/api/v1/transcripts/{id}/recommendations",
            get(transcript_recommendations_handler),
        )
        .route(
            "/api/v1/clinical-trials/recommendations",
            post(create_recommendations_handler),
        )
        .route("/api/v1/clinical-trials/{trial_id}", get(clinical_trial_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error body: `{"status": "error", "message": ...}`
#[derive(Debug)]
pub struct ApiError(pub TrialMatchError);

impl From<TrialMatchError> for ApiError {
    fn from(e: TrialMatchError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

pub fn status_for(e: &TrialMatchError) -> StatusCode {
    match e {
        TrialMatchError::PatientNotFound(_)
        | TrialMatchError::TranscriptNotFound(_)
        | TrialMatchError::TrialNotFound(_) => StatusCode::NOT_FOUND,
        TrialMatchError::Validation(_) => StatusCode::BAD_REQUEST,
        TrialMatchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        let body = StatusResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct CreateTranscriptRequest {
    pub patient_id: String,
    pub raw_transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTranscriptResponse {
    pub transcript_id: String,
}

async fn create_transcript_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTranscriptRequest>,
) -> Result<(StatusCode, Json<CreateTranscriptResponse>), ApiError> {
    info!(patient_id = %req.patient_id, chars = req.raw_transcript.len(), "Transcript submitted");
    let transcript_id = state
        .analyzer
        .ingest(state.service.storage().as_ref(), &req.patient_id, &req.raw_transcript)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateTranscriptResponse { transcript_id })))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecommendationsRequest {
    pub patient_id: String,
    pub transcript_id: String,
}

async fn create_recommendations_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRecommendationsRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!(patient_id = %req.patient_id, transcript_id = %req.transcript_id, "Recommendation request");
    state
        .service
        .create_recommended_trials(&req.patient_id, &req.transcript_id)
        .await?;
    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: format!("Recommendations created for transcript {}", req.transcript_id),
    }))
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub transcript_id: String,
    pub eligible: Vec<TrialPreview>,
    pub uncertain: Vec<TrialPreview>,
}

async fn transcript_recommendations_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let trials = state.service.get_recommended_trials(&id).await?;
    Ok(Json(RecommendationsResponse {
        transcript_id: id,
        eligible: trials.eligible.iter().map(CandidateTrial::preview).collect(),
        uncertain: trials.uncertain.iter().map(CandidateTrial::preview).collect(),
    }))
}

async fn clinical_trial_handler(
    State(state): State<Arc<AppState>>,
    Path(trial_id): Path<String>,
) -> Result<Json<CandidateTrial>, ApiError> {
    Ok(Json(state.service.get_clinical_trial(&trial_id).await?))
}
