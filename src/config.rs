use std::path::PathBuf;

use tracing::{info, warn};

use crate::gemini::{ApiKeySource, API_KEY_VAR, DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: ApiKeySource,
    pub api_base: String,
    pub model: String,
    pub history_dir: PathBuf,
    pub port: u16,
}

impl Config {
    /// Reads settings from the environment. The API key itself is not captured here;
    /// the generation client re-reads it on every call.
    pub fn from_env() -> Self {
        let config = Self {
            api_key: ApiKeySource::Env(API_KEY_VAR.to_string()),
            api_base: std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            history_dir: std::env::var("HISTORY_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".creative-writer")),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080),
        };
        config.check_credentials();
        config
    }

    /// Missing credentials only warn; every generation will fail until a key is set.
    pub fn check_credentials(&self) -> bool {
        match self.api_key.resolve() {
            Some(key) => {
                info!("Using API key: {}...", &key[..key.char_indices().nth(6).map_or(key.len(), |(i, _)| i)]);
                true
            }
            None => {
                warn!("⚠️ {} environment variable not set! Generation requests will fail until it is.", API_KEY_VAR);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_reported_not_fatal() {
        let config = Config {
            api_key: ApiKeySource::Fixed(String::new()),
            api_base: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            history_dir: PathBuf::from("unused"),
            port: 0,
        };
        assert!(!config.check_credentials());
        let config = Config { api_key: ApiKeySource::Fixed("abcdefghijk".into()), ..config };
        assert!(config.check_credentials());
    }
}
