//! Top-level flow: validate a submission, stream it, store the result.
//!
//! One submission at a time is a caller obligation. [`Writer::submit`] does not
//! guard against overlapping calls; the HTTP host rejects them instead.
//! There is no cancellation: once started, a submission runs until the upstream
//! stream completes or fails, and no timeout is imposed here.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::gemini::{self, GeminiError, TextGenerator};
use crate::history::{History, HistoryStore};
use crate::models::{GenerationParams, GenerationResult};
use crate::postprocess;
use crate::templates::template;

pub const WELCOME_SHOWN_KEY: &str = "welcomeShown";

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Please provide an idea or prompt to generate content.")]
    EmptyPrompt,
    #[error("{}", .0.user_message())]
    Generation(#[from] GeminiError),
}

/// Session-scoped flags. Lives as long as the session, never persisted.
#[derive(Debug, Default)]
pub struct SessionFlags {
    welcome_shown: bool,
}

impl SessionFlags {
    pub fn should_show_welcome(&self) -> bool { !self.welcome_shown }

    pub fn mark_welcome_shown(&mut self) { self.welcome_shown = true; }
}

/// What the output panel shows.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutputView {
    Idle,
    Streaming { buffer: String },
    Ready { result: GenerationResult },
    Failed { message: String },
}

impl OutputView {
    pub fn is_loading(&self) -> bool { matches!(self, OutputView::Streaming { .. }) }

    fn push_chunk(&mut self, chunk: &str) {
        if let OutputView::Streaming { buffer } = self {
            buffer.push_str(chunk);
        }
    }
}

pub struct Writer {
    generator: Arc<dyn TextGenerator>,
    history: Arc<HistoryStore>,
    view: Mutex<OutputView>,
    flags: Mutex<SessionFlags>,
}

impl Writer {
    pub fn new(generator: Arc<dyn TextGenerator>, history: Arc<HistoryStore>, flags: SessionFlags) -> Self {
        Self { generator, history, view: Mutex::new(OutputView::Idle), flags: Mutex::new(flags) }
    }

    pub fn history(&self) -> History { self.history.snapshot() }

    pub fn clear_history(&self) -> History { self.history.clear() }

    pub fn view(&self) -> OutputView { self.view.lock().clone() }

    pub fn should_show_welcome(&self) -> bool { self.flags.lock().should_show_welcome() }

    pub fn mark_welcome_shown(&self) {
        self.flags.lock().mark_welcome_shown();
        info!("{} set for this session", WELCOME_SHOWN_KEY);
    }

    /// Shows a past result in the output panel.
    pub fn select(&self, id: &str) -> Option<GenerationResult> {
        let found = self.history.snapshot().find(id).cloned()?;
        *self.view.lock() = OutputView::Ready { result: found.clone() };
        Some(found)
    }

    /// Runs one generation. Each fragment is forwarded to `on_chunk` as it arrives.
    /// Nothing is stored when the stream fails part way.
    pub async fn submit(
        &self,
        params: GenerationParams,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<GenerationResult, WriterError> {
        if params.prompt_text.trim().is_empty() {
            return Err(WriterError::EmptyPrompt);
        }

        let prompt = template(params.content_type).build(&params.prompt_text, &params.genre);
        info!("🎯 Generating {} ({}, {}) prompt (truncated): {}",
            params.content_type.label(), params.genre, params.tone.as_str(),
            &prompt[..prompt.char_indices().nth(120).map_or(prompt.len(), |(i, _)| i)]);

        *self.view.lock() = OutputView::Streaming { buffer: String::new() };
        let started = Instant::now();

        let outcome = {
            let view = &self.view;
            let mut forward = |chunk: &str| {
                view.lock().push_chunk(chunk);
                on_chunk(chunk);
            };
            gemini::generate(self.generator.as_ref(), &prompt, params.tone, &mut forward).await
        };

        match outcome {
            Ok(raw) => {
                let result = postprocess::package(params, &raw, started.elapsed(), Utc::now());
                info!("✅ Generated {} ({} chars in {}ms)", result.id, result.output.len(), result.performance.generation_time_ms);
                self.history.append(result.clone());
                *self.view.lock() = OutputView::Ready { result: result.clone() };
                Ok(result)
            }
            Err(e) => {
                error!("❌ Generation failed: {}", e);
                let err = WriterError::Generation(e);
                *self.view.lock() = OutputView::Failed { message: err.to_string() };
                Err(err)
            }
        }
    }
}
