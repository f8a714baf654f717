use std::collections::HashMap;

use super::fallback::{greeting_reply, identity_reply};

/// Canned answers for common phrases, served without contacting the provider.
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct QuickReplyCache {
    entries: HashMap<String, String>,
}

impl QuickReplyCache {
    pub fn new(assistant_name: &str) -> Self {
        let name = assistant_name.trim();
        let greeting = greeting_reply(name);
        let identity = identity_reply(name);
        let thanks = "You're welcome! Let me know if there's anything else I can help with.";
        let farewell = "Goodbye! Stay safe online.";

        let entries = [
            ("hello", greeting.as_str()),
            ("hi", greeting.as_str()),
            ("hey", greeting.as_str()),
            ("hello there", greeting.as_str()),
            ("good morning", greeting.as_str()),
            ("good evening", greeting.as_str()),
            ("who are you", identity.as_str()),
            ("who are you?", identity.as_str()),
            ("what is your name", identity.as_str()),
            ("what is your name?", identity.as_str()),
            ("what's your name", identity.as_str()),
            ("what's your name?", identity.as_str()),
            ("thanks", thanks),
            ("thank you", thanks),
            ("bye", farewell),
            ("goodbye", farewell),
        ];

        Self::from_entries(entries)
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (normalize_key(key.as_ref()), value.into()))
            .collect();
        Self { entries }
    }

    /// Exact lookup on the trimmed, lower-cased message.
    pub fn lookup(&self, message: &str) -> Option<&str> {
        self.entries.get(&normalize_key(message)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn normalize_key(message: &str) -> String {
    message.trim().to_lowercase()
}
