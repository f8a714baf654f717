use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<Message>>,
}

/// The uniform reply shape, identical for upstream answers and canned ones.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Choice {
    pub message: Message,
}

impl ChatReply {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: Message {
                    role: Role::Assistant,
                    content: content.into(),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reply_envelope_has_one_assistant_choice() {
        let value = serde_json::to_value(ChatReply::assistant("hi there")).unwrap();
        assert_eq!(
            value,
            json!({ "choices": [ { "message": { "role": "assistant", "content": "hi there" } } ] })
        );
    }

    #[test]
    fn missing_messages_deserializes_to_none() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.messages.is_none());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_value::<ChatRequest>(
            json!({ "messages": [ { "role": "tool", "content": "x" } ] }),
        );
        assert!(result.is_err());
    }
}
