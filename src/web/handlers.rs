use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::chat::ReplySource;
use crate::error::{ApiError, ValidationError};
use crate::web::models::{ChatReply, ChatRequest};
use crate::AppState;

pub const SERVICE_NAME: &str = "chat-relay";

pub const AVAILABLE_ENDPOINTS: &[&str] = &["GET /health", "GET /test", "POST /api/chat"];

// Health check endpoint
pub async fn health_check(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
        "provider": data.provider.name(),
        "model": data.model,
        "providerConfigured": data.provider_configured
    }))
}

// Plain liveness probe
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(format!("{SERVICE_NAME} is running"))
}

// Chat API endpoint
pub async fn chat(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, ApiError> {
    let messages = req
        .into_inner()
        .messages
        .ok_or(ValidationError::MissingMessages)?;

    info!("Chat request with {} messages", messages.len());

    let outcome = data.chat.respond(&messages).await?;
    match outcome.source {
        ReplySource::QuickReply => info!("Answered from quick replies"),
        ReplySource::Upstream => info!("Answered upstream ({} chars)", outcome.content.len()),
        ReplySource::Fallback(kind) => info!("Answered with fallback after {:?}", kind),
    }

    Ok(HttpResponse::Ok().json(ChatReply::assistant(outcome.content)))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "Endpoint not found",
        "availableEndpoints": AVAILABLE_ENDPOINTS
    }))
}
