use std::sync::Arc;

use log::{info, warn};

use crate::config::Config;
use crate::error::{ApiError, ValidationError};
use crate::model::{FailureKind, UpstreamClient, UpstreamRequest};
use crate::reply::{FallbackSelector, Normalizer, QuickReplyCache};
use crate::web::models::{Message, Role};

/// Where the text of a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    QuickReply,
    Upstream,
    Fallback(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub content: String,
    pub source: ReplySource,
}

/// Turns a validated message list into exactly one assistant reply.
pub struct ChatService {
    quick_replies: QuickReplyCache,
    normalizer: Normalizer,
    fallback: FallbackSelector,
    upstream: Arc<dyn UpstreamClient>,
    system_instruction: String,
    history_window: usize,
}

impl ChatService {
    pub fn new(config: &Config, upstream: Arc<dyn UpstreamClient>) -> Result<Self, regex::Error> {
        Ok(Self {
            quick_replies: QuickReplyCache::new(&config.assistant_name),
            normalizer: Normalizer::new(&config.assistant_name)?,
            fallback: FallbackSelector::new(&config.assistant_name),
            upstream,
            system_instruction: system_instruction(&config.assistant_name),
            history_window: config.history_window,
        })
    }

    /// Fails only on invalid input or when the upstream task itself dies; every
    /// provider or parsing failure becomes a fallback reply.
    pub async fn respond(&self, messages: &[Message]) -> Result<ChatOutcome, ApiError> {
        let (index, user_message) = latest_user_message(messages)?;

        if let Some(reply) = self.quick_replies.lookup(user_message) {
            info!("Quick reply served for {:?}", user_message);
            return Ok(ChatOutcome {
                content: reply.to_string(),
                source: ReplySource::QuickReply,
            });
        }

        let request = UpstreamRequest {
            system_instruction: self.system_instruction.clone(),
            history: history_window(&messages[..index], self.history_window),
            message: user_message.to_string(),
        };

        info!(
            "Forwarding chat turn upstream with {} history messages",
            request.history.len()
        );

        // Runs detached so a dropped client connection does not abort the call.
        let upstream = Arc::clone(&self.upstream);
        let result = tokio::spawn(async move { upstream.complete(request).await })
            .await
            .map_err(|err| ApiError::Internal(format!("upstream task failed: {err}")))?;

        let failure = match result {
            Ok(raw) => match self.normalizer.extract(&raw) {
                Ok(content) => {
                    return Ok(ChatOutcome {
                        content,
                        source: ReplySource::Upstream,
                    });
                }
                Err(err) => {
                    warn!("Could not read upstream reply: {} (payload: {})", err, raw);
                    err.kind()
                }
            },
            Err(err) => {
                warn!("Upstream call failed [{:?}]: {}", err.kind(), err);
                err.kind()
            }
        };

        Ok(ChatOutcome {
            content: self.fallback.select(user_message, failure).to_string(),
            source: ReplySource::Fallback(failure),
        })
    }
}

/// Finds the last user message with non-empty content, returning its index and
/// trimmed text.
pub fn latest_user_message(messages: &[Message]) -> Result<(usize, &str), ValidationError> {
    if messages.is_empty() {
        return Err(ValidationError::MissingMessages);
    }

    messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, message)| message.role == Role::User)
        .map(|(index, message)| (index, message.content.trim()))
        .find(|(_, content)| !content.is_empty())
        .ok_or(ValidationError::NoUserMessage)
}

/// The trailing `window` conversational messages, skipping client-sent system
/// messages and blank entries.
pub fn history_window(messages: &[Message], window: usize) -> Vec<Message> {
    let turns: Vec<&Message> = messages
        .iter()
        .filter(|message| message.role != Role::System && !message.content.trim().is_empty())
        .collect();
    let start = turns.len().saturating_sub(window);
    turns[start..].iter().map(|message| (*message).clone()).collect()
}

pub fn system_instruction(assistant_name: &str) -> String {
    format!(
        "You are {name}, a friendly assistant focused on cyber security awareness. \
Always introduce yourself as {name}. Never mention the underlying model, the company that trained it, \
or the API provider; if asked who built you, say you were built by the {name} team. \
Answer in the language the user writes in, including romanized Hindi. \
Keep answers concise and well structured, using short paragraphs or bullet points in Markdown.",
        name = assistant_name.trim()
    )
}
