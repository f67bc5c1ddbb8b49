//! Process configuration read from the environment

use crate::locale::{Locale, UnknownLocale};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("ROLECHAT_LOCALE: {0}")]
    Locale(#[from] UnknownLocale),
}

/// Generation settings shared by both chat modes
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Length cap for persona-mode instructions
    pub max_tokens: u32,
    /// Upper bound on one generation; `None` lets a silent provider hang
    pub generation_timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            generation_timeout: None,
        }
    }
}

/// Identity the local auth provider signs in
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub email: String,
    pub display_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email: "guest@localhost".to_string(),
            display_name: "Guest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub port: u16,
    pub locale: Locale,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match get("ROLECHAT_PORT") {
            Some(raw) => parse_number("ROLECHAT_PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let locale = match get("ROLECHAT_LOCALE") {
            Some(raw) => raw.parse()?,
            None => Locale::default(),
        };

        let max_tokens = match get("ROLECHAT_MAX_TOKENS") {
            Some(raw) => parse_number("ROLECHAT_MAX_TOKENS", &raw)?,
            None => DEFAULT_MAX_TOKENS,
        };

        let generation_timeout = match get("ROLECHAT_GENERATION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse_number("ROLECHAT_GENERATION_TIMEOUT_SECS", &raw)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let defaults = AuthConfig::default();

        Ok(Self {
            port,
            locale,
            llm: LlmConfig {
                api_key: get("OPENAI_API_KEY"),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: get("ROLECHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens,
                generation_timeout,
            },
            auth: AuthConfig {
                email: get("ROLECHAT_USER_EMAIL").unwrap_or(defaults.email),
                display_name: get("ROLECHAT_USER_NAME").unwrap_or(defaults.display_name),
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}
