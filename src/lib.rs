//! Creative Writer: streams short stories, poems, character backstories and
//! world-building snippets from Gemini and keeps a bounded local history.

pub mod config;
pub mod gemini;
pub mod history;
pub mod models;
pub mod postprocess;
pub mod routes;
pub mod session;
pub mod templates;
pub mod tone;
