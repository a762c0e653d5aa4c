use std::time::Duration;

use bistro_core::autosave::AutoSaveConfig;

use crate::error::ClientError;

const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Connection and auto-save settings for a wizard client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, without the `/api/v1` prefix.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: String,
    pub autosave: AutoSaveConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            autosave: AutoSaveConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Required | Default                 |
    /// |------------------------|----------|-------------------------|
    /// | `BISTRO_API_URL`       | no       | `http://localhost:3000` |
    /// | `BISTRO_API_TOKEN`     | **yes**  | --                      |
    /// | `AUTOSAVE_DEBOUNCE_MS` | no       | `1000`                  |
    pub fn from_env() -> Result<Self, ClientError> {
        let token = std::env::var("BISTRO_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Config("BISTRO_API_TOKEN must be set".into()))?;
        let base_url =
            std::env::var("BISTRO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let mut config = Self::new(base_url, token);
        if let Ok(raw) = std::env::var("AUTOSAVE_DEBOUNCE_MS") {
            let ms: u64 = raw.parse().map_err(|_| {
                ClientError::Config(format!("AUTOSAVE_DEBOUNCE_MS must be a number, got '{raw}'"))
            })?;
            config.autosave.debounce = Duration::from_millis(ms);
        }
        Ok(config)
    }
}
