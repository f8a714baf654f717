pub mod client;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::web::models::{Message, Role};

pub use client::HttpUpstream;

/// The LLM API the relay delegates generation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Groq,
}

impl Provider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "groq" => Some(Self::Groq),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Groq => "https://api.groq.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::Groq => "llama-3.1-8b-instant",
        }
    }

    pub fn endpoint(self, api_base: &str, model: &str) -> String {
        match self {
            Self::Gemini => format!("{api_base}/v1beta/models/{model}:generateContent"),
            Self::Groq => format!("{api_base}/openai/v1/chat/completions"),
        }
    }

    /// Renders the provider-specific request body.
    pub fn payload(self, request: &UpstreamRequest, config: &UpstreamConfig) -> Value {
        match self {
            Self::Gemini => {
                let mut contents: Vec<Value> = request
                    .history
                    .iter()
                    .map(|message| {
                        let role = match message.role {
                            Role::Assistant => "model",
                            Role::User | Role::System => "user",
                        };
                        json!({ "role": role, "parts": [ { "text": message.content } ] })
                    })
                    .collect();
                contents.push(json!({ "role": "user", "parts": [ { "text": request.message } ] }));

                json!({
                    "systemInstruction": { "parts": [ { "text": request.system_instruction } ] },
                    "contents": contents,
                    "generationConfig": {
                        "maxOutputTokens": config.max_tokens,
                        "temperature": config.temperature
                    }
                })
            }
            Self::Groq => {
                let mut messages = Vec::with_capacity(request.history.len() + 2);
                messages.push(Message {
                    role: Role::System,
                    content: request.system_instruction.clone(),
                });
                messages.extend(request.history.iter().cloned());
                messages.push(Message::user(request.message.clone()));

                json!({
                    "model": config.model,
                    "messages": messages,
                    "max_tokens": config.max_tokens,
                    "temperature": config.temperature
                })
            }
        }
    }
}

/// Provider-neutral description of one chat turn.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub system_instruction: String,
    pub history: Vec<Message>,
    pub message: String,
}

/// Coarse failure classes the fallback path chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingCredential,
    Timeout,
    Auth,
    RateLimited,
    Server,
    Rejected,
    Unavailable,
    MalformedResponse,
    UnrecognizedFormat,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no API key configured for the upstream provider")]
    MissingCredential,
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream rejected credentials (status={status}): {body}")]
    Auth { status: u16, body: String },
    #[error("upstream rate limited the request: {body}")]
    RateLimited { body: String },
    #[error("upstream server error (status={status}): {body}")]
    Server { status: u16, body: String },
    #[error("upstream rejected the request (status={status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("upstream unreachable: {0}")]
    Unavailable(String),
    #[error("upstream returned a malformed payload: {0}")]
    MalformedResponse(String),
}

impl UpstreamError {
    /// Classifies a non-2xx provider status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            429 => Self::RateLimited { body },
            500..=599 => Self::Server { status, body },
            _ => Self::Rejected { status, body },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential => FailureKind::MissingCredential,
            Self::Timeout => FailureKind::Timeout,
            Self::Auth { .. } => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Server { .. } => FailureKind::Server,
            Self::Rejected { .. } => FailureKind::Rejected,
            Self::Unavailable(_) => FailureKind::Unavailable,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}

/// One request-response exchange with the provider. Implementations never retry.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn complete(&self, request: UpstreamRequest) -> Result<Value, UpstreamError>;
}
