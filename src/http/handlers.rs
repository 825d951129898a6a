use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::AppState;
use crate::audio::SourceKind;
use crate::error::SessionError;
use crate::session::{MeetingStatus, SessionSnapshot};
use crate::transcribe::TranscriptSegment;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartMeetingRequest {
    /// Which stream to capture: "system_audio" or "microphone"
    pub source: SourceKind,
}

#[derive(Debug, Serialize)]
pub struct MeetingActionResponse {
    pub status: MeetingStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::Acquisition(_) | SessionError::TranscriptTooShort { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Transcription(_) | SessionError::Generation(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: SessionError) -> axum::response::Response {
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /meeting/start
/// Begin recording from the requested source
pub async fn start_meeting(
    State(state): State<AppState>,
    Json(req): Json<StartMeetingRequest>,
) -> impl IntoResponse {
    info!("Start requested ({:?})", req.source);

    match state.controller.start(req.source).await {
        Ok(status) => (
            StatusCode::OK,
            Json(MeetingActionResponse {
                status,
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /meeting/stop
/// Stop recording; the transcript is validated and summarized
pub async fn stop_meeting(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested");

    match state.controller.stop().await {
        Ok(status) => (
            StatusCode::OK,
            Json(MeetingActionResponse {
                status,
                message: match status {
                    MeetingStatus::Reviewing => "Minutes ready for review".to_string(),
                    status => format!("Meeting is {}", status),
                },
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /meeting/reset
/// Discard the reviewed session and return to idle
pub async fn reset_meeting(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.reset().await {
        Ok(status) => (
            StatusCode::OK,
            Json(MeetingActionResponse {
                status,
                message: "Session reset".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /meeting
/// Current session snapshot
pub async fn get_meeting(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.controller.snapshot().await)
}

/// GET /meeting/transcript
/// Transcript accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    Json(TranscriptResponse {
        text: state.controller.transcript_text(),
        segments: state.controller.segments(),
    })
}

/// GET /meeting/minutes
/// Generated minutes, once the session reaches review
pub async fn get_minutes(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.minutes().await {
        Some(minutes) => (StatusCode::OK, Json(minutes)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No minutes available; stop a recording first".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
