//! Provider and front-end configuration.
//!
//! Values come from CLI flags or the environment. A `.env` file in the
//! working directory is read first, without overriding variables that are
//! already set.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

pub const API_KEY_VAR: &str = "API_KEY";
pub const BASE_URL_VAR: &str = "BASE_URL";
pub const DEFAULT_MODEL_VAR: &str = "DEFAULT_MODEL";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
}

/// Connection settings for the completion endpoint. Read-only once built.
#[derive(Clone, Args)]
pub struct ProviderConfig {
    /// API key for the OpenAI-compatible endpoint.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the OpenAI-compatible endpoint, e.g.
    /// https://dashscope-intl.aliyuncs.com/compatible-mode/v1
    #[arg(long, env = "BASE_URL")]
    base_url: String,

    /// Model name sent with every request.
    #[arg(long = "model", env = "DEFAULT_MODEL")]
    model: String,
}

impl ProviderConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Reads `API_KEY`, `BASE_URL` and `DEFAULT_MODEL`, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        Ok(Self::new(
            read(API_KEY_VAR)?,
            read(BASE_URL_VAR)?,
            read(DEFAULT_MODEL_VAR)?,
        ))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// API key safe for display: first and last four characters only.
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        let chars = key.chars().count();
        if chars > 8 {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().skip(chars - 4).collect();
            format!("{}...{}", head, tail)
        } else {
            "*".repeat(chars)
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Command line of the `bid-box` terminal front-end.
#[derive(Debug, Clone, Parser)]
#[command(name = "bid-box")]
#[command(about = "Ask questions about an e-bidding document")]
#[command(version)]
pub struct Cli {
    /// Document to load on start (.pdf, .txt or .md).
    #[arg(long, short)]
    pub document: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long, env = "BID_BOX_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Give up on a completion request after this many seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    #[command(flatten)]
    pub provider: ProviderConfig,
}

impl Cli {
    /// Loads `.env`, then parses flags and environment.
    pub fn load() -> Self {
        load_dotenv();
        Self::parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Loads `.env` from the working directory. A missing file is not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }
}
