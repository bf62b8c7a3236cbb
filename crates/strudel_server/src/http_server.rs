use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::Value;
use strudel_core::{
    ChangeQueue, ChangeRequest, Error, ErrorKind, FallbackAgent, Pattern, analyze, dialect,
    queue::CancelOutcome, suggest, validate,
};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::protocol::{
    CancelResponse, ChatRequest, ChatResponse, ErrorResponse, HealthResponse,
    MAX_DESCRIPTION_CHARS, MIN_DESCRIPTION_CHARS, PatternQuery, PatternResponse,
    QueueStatusResponse, ScheduleResponse, SuggestionQuery, SuggestionRequest, ValidateRequest,
    ValidateResponse, WritePatternRequest, WritePatternResponse,
};

const EMPTY_CHAT_REPLY: &str = "I received your message and took action.";

// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub queue: ChangeQueue,
    pub agent: Arc<dyn FallbackAgent>,
    /// False when running with the placeholder agent.
    pub agent_ready: bool,
    /// Directory holding `index.html`.
    pub static_dir: PathBuf,
}

// Build the Axum router
pub fn create_router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));

    Router::new()
        // Change queue
        .route("/api/queue", post(enqueue_change).get(list_queue))
        .route("/api/queue/history", get(queue_history))
        .route("/api/queue/events", get(queue_events))
        .route("/api/queue/:id", delete(cancel_change))
        // Pattern query/edit surface
        .route("/api/pattern", get(get_pattern).put(write_pattern))
        .route("/api/pattern/validate", post(validate_pattern))
        .route("/api/pattern/info", get(pattern_info))
        .route(
            "/api/pattern/suggestions",
            get(get_suggestions).post(post_suggestions),
        )
        .route("/api/chat", post(chat))
        // Player assets
        .route_service("/", index)
        .route("/patterns.js", get(serve_pattern_file))
        // Health check
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decode a candidate given either as a JSON record or as dialect text.
fn decode_candidate(value: &Value) -> Result<Pattern, Error> {
    match value {
        Value::String(text) => {
            let record = dialect::parse(text)?;
            Ok(validate(&record)?)
        }
        record => Ok(validate(record)?),
    }
}

/// Decode a candidate into the pattern shape, skipping range and note checks.
fn decode_unchecked(value: Value) -> Result<Pattern, AppError> {
    let record = match value {
        Value::String(text) => dialect::parse(&text).map_err(Error::from)?,
        record => record,
    };
    serde_json::from_value(record).map_err(|e| {
        AppError::BadRequest(format!("Pattern data does not have the pattern shape: {}", e))
    })
}

// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent_ready: state.agent_ready,
        queue_size: state.queue.len(),
    })
}

// POST /api/queue - Schedule a find/replace change
async fn enqueue_change(
    State(state): State<AppState>,
    payload: Result<Json<ChangeRequest>, JsonRejection>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let Json(request) = payload?;
    let scheduled = state.queue.enqueue(request)?;
    Ok(Json(ScheduleResponse {
        change_id: scheduled.id,
        execute_at: scheduled.due_at,
        status: "scheduled".to_string(),
    }))
}

// GET /api/queue
async fn list_queue(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    let pending_changes = state.queue.list();
    Json(QueueStatusResponse {
        total_count: pending_changes.len(),
        pending_changes,
    })
}

// GET /api/queue/history
async fn queue_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.queue.history())
}

// DELETE /api/queue/:id
async fn cancel_change(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CancelResponse>, AppError> {
    match state.queue.cancel(id) {
        CancelOutcome::NotFound => Err(AppError::NotFound(format!("Change {} not found", id))),
        status => Ok(Json(CancelResponse {
            status,
            change_id: id,
        })),
    }
}

// GET /api/queue/events - Execution reports as they happen
async fn queue_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_reports(socket, state))
}

async fn stream_reports(socket: WebSocket, state: AppState) {
    use futures_util::{SinkExt, StreamExt};

    let mut reports = state.queue.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let report = match reports.recv().await {
                Ok(report) => report,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event stream skipped {} reports", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let json = match serde_json::to_string(&report) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize report: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Clients only listen; drain until they disconnect
    let mut recv_task = tokio::spawn(async move { while let Some(Ok(_)) = receiver.next().await {} });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("Event stream closed");
}

// GET /api/pattern
async fn get_pattern(
    State(state): State<AppState>,
    query: Result<Query<PatternQuery>, QueryRejection>,
) -> Result<Json<PatternResponse>, AppError> {
    let Query(query) = query?;
    let raw = state.queue.store().read().await?;
    let record = dialect::parse(&raw).map_err(Error::from)?;
    let pattern = validate(&record).map_err(Error::from)?;

    Ok(Json(PatternResponse {
        metadata: query.metadata.then(|| analyze(&pattern)),
        last_edited: dialect::last_edited(&raw),
        description: dialect::description(&raw),
        pattern,
    }))
}

// PUT /api/pattern - Overwrite the pattern file
async fn write_pattern(
    State(state): State<AppState>,
    payload: Result<Json<WritePatternRequest>, JsonRejection>,
) -> Result<Json<WritePatternResponse>, AppError> {
    let Json(request) = payload?;

    let description = request.edit_description.trim().to_string();
    let chars = description.chars().count();
    if !(MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&chars) {
        return Err(AppError::BadRequest(format!(
            "edit_description must be between {} and {} characters",
            MIN_DESCRIPTION_CHARS, MAX_DESCRIPTION_CHARS
        )));
    }

    let pattern = if request.validate_before_write {
        decode_candidate(&request.pattern_data)?
    } else {
        decode_unchecked(request.pattern_data)?
    };

    let store = state.queue.store();
    store.save(&pattern, &description).await?;
    info!("Pattern rewritten: {}", description);

    Ok(Json(WritePatternResponse {
        status: "written".to_string(),
        edit_description: description,
        bpm: pattern.bpm,
        backup: store.backup_path().display().to_string(),
    }))
}

// POST /api/pattern/validate
async fn validate_pattern(
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let Json(request) = payload?;
    let response = match decode_candidate(&request.pattern_data) {
        Ok(_) => ValidateResponse {
            valid: true,
            error: None,
            kind: None,
        },
        Err(err) => ValidateResponse {
            valid: false,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        },
    };
    Ok(Json(response))
}

// GET /api/pattern/info
async fn pattern_info(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let pattern = state.queue.store().load().await?;
    Ok(Json(analyze(&pattern)))
}

// GET /api/pattern/suggestions?mood=<mood>
async fn get_suggestions(
    State(state): State<AppState>,
    query: Result<Query<SuggestionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let pattern = state.queue.store().load().await?;
    Ok(Json(suggest(&pattern, query.mood)))
}

// POST /api/pattern/suggestions - Advise on a candidate or the stored pattern
async fn post_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let pattern = match &request.current_pattern {
        Some(candidate) => decode_candidate(candidate)?,
        None => state.queue.store().load().await?,
    };
    Ok(Json(suggest(&pattern, request.mood)))
}

// POST /api/chat - Forward a message to the agent
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let text = state
        .agent
        .apply(request.message)
        .await
        .map_err(|e| Error::FallbackFailure(format!("{:#}", e)))?;

    let response = if text.is_empty() {
        EMPTY_CHAT_REPLY.to_string()
    } else {
        text
    };
    Ok(Json(ChatResponse { response }))
}

// GET /patterns.js - The pattern file as the player loads it
async fn serve_pattern_file(State(state): State<AppState>) -> Result<Response, AppError> {
    let text = state.queue.store().read().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/javascript")],
        text,
    )
        .into_response())
}

// Error handling
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Core(Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Core(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::StorePermission => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::MalformedDialect | ErrorKind::SchemaViolation => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::FallbackFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, kind) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                Some(ErrorKind::InvalidRequest),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Core(err) => {
                let kind = err.kind();
                (status_for(kind), err.to_string(), Some(kind))
            }
        };

        if status.is_server_error() {
            error!("{}", error_message);
        }

        let body = Json(ErrorResponse {
            error: error_message,
            kind,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::StoreUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::StorePermission), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::MalformedDialect), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::SchemaViolation), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::FallbackFailure), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_decode_candidate_accepts_text() {
        let text = "({bpm: 30, chords:{progression:[['C3','Eb3','G3']],interval:'4m',duration:'2m',filter:600}, melody:{notes:['C5','~'],interval:'2m',duration:'1m',waveform:'triangle',delay:0.5}})";
        let pattern = decode_candidate(&Value::String(text.to_string())).unwrap();
        assert_eq!(pattern.bpm, 30);

        let err = decode_candidate(&Value::String("nothing".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDialect);
    }
}
