use crate::model::FailureKind;

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "hii", "greetings"];
const IDENTITY_WORDS: &[&str] = &["name"];
const IDENTITY_PHRASES: &[&str] = &["who are you", "who made you", "who built you"];
const SECURITY_FRAGMENTS: &[&str] = &[
    "cyber", "security", "hack", "phishing", "malware", "password", "virus", "scam",
];
const HINGLISH_WORDS: &[&str] = &[
    "kya", "hai", "hain", "kaise", "kaisa", "aap", "mujhe", "batao", "kyun", "nahi", "namaste",
];

/// Which canned reply family a user message falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Identity,
    Security,
    Hinglish,
    General,
}

impl Topic {
    /// Keyword classification in fixed priority order.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has_word = |list: &[&str]| words.iter().any(|word| list.contains(word));

        if has_word(GREETING_WORDS) {
            Self::Greeting
        } else if has_word(IDENTITY_WORDS) || IDENTITY_PHRASES.iter().any(|p| lower.contains(p)) {
            Self::Identity
        } else if SECURITY_FRAGMENTS.iter().any(|f| lower.contains(f)) {
            Self::Security
        } else if has_word(HINGLISH_WORDS) {
            Self::Hinglish
        } else {
            Self::General
        }
    }
}

pub(crate) fn greeting_reply(name: &str) -> String {
    format!("Hello! I'm {name}, your security assistant. How can I help you stay safe online today?")
}

pub(crate) fn identity_reply(name: &str) -> String {
    format!(
        "I'm {name}, an assistant focused on cyber security awareness. Ask me about passwords, phishing, scams or keeping your devices safe."
    )
}

/// Canned replies served when the upstream call fails.
pub struct FallbackSelector {
    greeting: String,
    identity: String,
    security: String,
    hinglish: String,
    misconfigured: String,
    busy: String,
    slow: String,
    general: String,
}

impl FallbackSelector {
    pub fn new(assistant_name: &str) -> Self {
        let name = assistant_name.trim();
        Self {
            greeting: greeting_reply(name),
            identity: identity_reply(name),
            security: format!(
                "Good question. {name} is having trouble fetching a detailed answer right now, but the basics always help: use strong unique passwords, turn on two-factor authentication, keep your software updated and never click links from unknown senders. Please ask again in a moment for more detail."
            ),
            hinglish: format!(
                "Namaste! Main {name} hoon. Abhi mujhe jawab dene mein thodi dikkat ho rahi hai, kripya thodi der baad dobara poochiye."
            ),
            misconfigured: format!(
                "{name} can't reach its answer service right now because the service is not configured correctly. Please let the site administrator know."
            ),
            busy: "I'm getting a lot of questions right now. Please wait a moment and ask again."
                .to_string(),
            slow: "That took longer than expected. Please try asking again.".to_string(),
            general: "I'm having trouble answering right now. Please try again in a moment."
                .to_string(),
        }
    }

    /// Picks the canned reply for a failed upstream turn. The failure kind only
    /// distinguishes between the generic variants.
    pub fn select(&self, user_message: &str, failure: FailureKind) -> &str {
        match Topic::classify(user_message) {
            Topic::Greeting => &self.greeting,
            Topic::Identity => &self.identity,
            Topic::Security => &self.security,
            Topic::Hinglish => &self.hinglish,
            Topic::General => self.generic(failure),
        }
    }

    fn generic(&self, failure: FailureKind) -> &str {
        match failure {
            FailureKind::MissingCredential | FailureKind::Auth => &self.misconfigured,
            FailureKind::RateLimited => &self.busy,
            FailureKind::Timeout => &self.slow,
            FailureKind::Server
            | FailureKind::Rejected
            | FailureKind::Unavailable
            | FailureKind::MalformedResponse
            | FailureKind::UnrecognizedFormat => &self.general,
        }
    }
}
