pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod reply;
pub mod sessions;
pub mod web;

use std::sync::Arc;

use chat::ChatService;
use config::Config;
use model::{Provider, UpstreamClient};

// App state structure
pub struct AppState {
    pub chat: ChatService,
    pub provider: Provider,
    pub model: String,
    pub provider_configured: bool,
}

impl AppState {
    pub fn new(config: &Config, upstream: Arc<dyn UpstreamClient>) -> Result<Self, regex::Error> {
        Ok(Self {
            chat: ChatService::new(config, upstream)?,
            provider: config.upstream.provider,
            model: config.upstream.model.clone(),
            provider_configured: config.upstream.api_key.is_some(),
        })
    }
}
