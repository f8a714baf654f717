use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::model::Provider;
use crate::reply::Normalizer;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_HISTORY_WINDOW: usize = 8;
const DEFAULT_ASSISTANT_NAME: &str = "Sentinel";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value in env var {key}: {value}")]
    InvalidNumber { key: String, value: String },
    #[error("unknown LLM_PROVIDER {0:?}, expected \"gemini\" or \"groq\"")]
    UnknownProvider(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to build upstream http client: {0}")]
    HttpClient(String),
}

/// Settings for the upstream provider call.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub assistant_name: String,
    pub history_window: usize,
    pub upstream: UpstreamConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let gemini_key = var("GEMINI_API_KEY");
        let groq_key = var("GROQ_API_KEY");

        let provider = match var("LLM_PROVIDER") {
            Some(name) => Provider::parse(&name).ok_or(ConfigError::UnknownProvider(name))?,
            None if gemini_key.is_none() && groq_key.is_some() => Provider::Groq,
            None => Provider::Gemini,
        };

        let api_key = match provider {
            Provider::Gemini => gemini_key,
            Provider::Groq => groq_key,
        };

        let api_base = var("LLM_API_BASE")
            .unwrap_or_else(|| provider.default_api_base().to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "LLM_API_BASE must start with http:// or https://".to_string(),
            ));
        }

        let history_window = parse_var(&var, "HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?;
        let timeout_secs = parse_var(&var, "UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "UPSTREAM_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let assistant_name =
            var("ASSISTANT_NAME").unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string());
        check_assistant_name(&assistant_name)?;

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&var, "PORT", DEFAULT_PORT)?,
            assistant_name,
            history_window,
            upstream: UpstreamConfig {
                provider,
                api_key,
                model: var("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
                api_base,
                timeout: Duration::from_secs(timeout_secs),
                max_tokens: parse_var(&var, "MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
                temperature: parse_var(&var, "TEMPERATURE", DEFAULT_TEMPERATURE)?,
            },
        })
    }
}

/// The name is substituted into every rewrite, so it must survive the rewrite
/// itself or normalized output would keep growing on each pass.
fn check_assistant_name(name: &str) -> Result<(), ConfigError> {
    let normalizer = Normalizer::new(name).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    if normalizer.rewrite(name) != name {
        return Err(ConfigError::Invalid(format!(
            "ASSISTANT_NAME {name:?} contains a vendor or model name"
        )));
    }
    Ok(())
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
