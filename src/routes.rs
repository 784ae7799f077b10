use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response, sse::{Event, KeepAlive, Sse}},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::{Arc, atomic::{AtomicBool, Ordering}}};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    models::{ContentType, GenerationParams, GenerationResult, Tone},
    postprocess::download_file_name,
    session::{OutputView, Writer, WriterError},
    templates::{catalog, TemplateInfo},
};

#[derive(Clone)]
pub struct AppState {
    pub writer: Arc<Writer>,
    in_flight: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(writer: Arc<Writer>) -> Self {
        Self { writer, in_flight: Arc::default() }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/templates", get(get_templates))
        .route("/api/generate", post(generate))
        .route("/api/output", get(get_output))
        .route("/api/history", get(get_history).delete(clear_history))
        .route("/api/history/:id", get(select_history))
        .route("/api/history/:id/download", get(download_result))
        .route("/api/session/welcome", get(get_welcome).post(mark_welcome_shown))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub content_type: ContentType,
    #[serde(default = "default_genre")]
    pub genre: String,
    /// Free-form so unknown selections fall back to the serious voice instead of failing.
    #[serde(default)]
    pub tone: String,
    pub prompt_text: String,
}

fn default_genre() -> String { GenerationParams::default().genre }

impl From<GenerateRequest> for GenerationParams {
    fn from(body: GenerateRequest) -> Self {
        GenerationParams {
            content_type: body.content_type,
            genre: body.genre,
            tone: Tone::parse_or_default(&body.tone),
            prompt_text: body.prompt_text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub content_types: Vec<TemplateInfo>,
    pub tones: Vec<Tone>,
    pub defaults: GenerationParams,
}

#[derive(Debug, Serialize)]
struct ErrorBody { error: String }

#[derive(Debug, Serialize)]
struct WelcomeState { show_welcome: bool }

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

pub async fn get_templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        content_types: catalog(),
        tones: Tone::ALL.to_vec(),
        defaults: GenerationParams::default(),
    })
}

/// Resets the in-flight flag when the generation task ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) { self.0.store(false, Ordering::SeqCst); }
}

/// Streams `chunk` events, then exactly one `result` or `error` event.
pub async fn generate(State(state): State<AppState>, Json(body): Json<GenerateRequest>) -> Response {
    let params = GenerationParams::from(body);
    if params.prompt_text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, WriterError::EmptyPrompt.to_string());
    }
    if state.in_flight.swap(true, Ordering::SeqCst) {
        return error_response(StatusCode::CONFLICT, "A generation is already in progress.");
    }
    let guard = InFlight(state.in_flight.clone());

    tracing::info!("🚀 Generating {} for prompt: {}", params.content_type.label(), params.prompt_text);

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let writer = state.writer.clone();
    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let mut forward = move |chunk: &str| {
            let _ = chunk_tx.send(Event::default().event("chunk").data(chunk));
        };
        let last = match writer.submit(params, &mut forward).await {
            Ok(result) => Event::default()
                .event("result")
                .json_data(&result)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        drop(guard);
        let _ = tx.send(last);
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Current output panel: idle, streaming buffer, ready result or failure message.
pub async fn get_output(State(state): State<AppState>) -> Json<OutputView> {
    Json(state.writer.view())
}

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<GenerationResult>> {
    Json(state.writer.history().as_slice().to_vec())
}

pub async fn clear_history(State(state): State<AppState>) -> Json<Vec<GenerationResult>> {
    let history = state.writer.clear_history();
    tracing::info!("🧹 History cleared");
    Json(history.as_slice().to_vec())
}

pub async fn select_history(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.writer.select(&id) {
        Some(result) => Json(result).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn download_result(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let history = state.writer.history();
    let Some(result) = history.find(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let disposition = format!("attachment; filename=\"{}\"", download_file_name(result));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.output.clone(),
    )
        .into_response()
}

pub async fn get_welcome(State(state): State<AppState>) -> Response {
    Json(WelcomeState { show_welcome: state.writer.should_show_welcome() }).into_response()
}

pub async fn mark_welcome_shown(State(state): State<AppState>) -> StatusCode {
    state.writer.mark_welcome_shown();
    StatusCode::NO_CONTENT
}
