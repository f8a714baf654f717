use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;

use super::{Provider, UpstreamClient, UpstreamError, UpstreamRequest};
use crate::config::{ConfigError, UpstreamConfig};

// A wrapper for the provider's HTTP API
pub struct HttpUpstream {
    client: Client,
    endpoint: String,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        let endpoint = config.provider.endpoint(&config.api_base, &config.model);

        info!(
            "Using {} model {} at {}",
            config.provider.name(),
            config.model,
            endpoint
        );

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn complete(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential)?;

        let payload = self.config.provider.payload(&request, &self.config);
        debug!("Payload: {}", payload);

        let builder = self.client.post(&self.endpoint).json(&payload);
        let builder = match self.config.provider {
            Provider::Gemini => builder.header("x-goog-api-key", api_key),
            Provider::Groq => builder.bearer_auth(api_key),
        };

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Unavailable(err.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::MalformedResponse(err.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }

        let response_json: Value = serde_json::from_str(&body)
            .map_err(|err| UpstreamError::MalformedResponse(err.to_string()))?;
        debug!("Response JSON: {}", response_json);

        Ok(response_json)
    }
}
