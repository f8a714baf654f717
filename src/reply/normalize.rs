//! Provider response parsing and the brand rewrite applied to its text.

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::FailureKind;

const MAX_PASSES: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("provider response matched neither the OpenAI nor the Gemini shape")]
    UnrecognizedFormat,
    #[error("provider response contained no usable text")]
    EmptyText,
}

impl NormalizeError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::UnrecognizedFormat
    }
}

/// A provider response after shape detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    OpenAi { text: String },
    Gemini { text: String },
}

#[derive(Debug, Deserialize)]
struct OpenAiShape {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiShape {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl ProviderResponse {
    pub fn parse(raw: &Value) -> Result<Self, NormalizeError> {
        if raw.get("choices").is_some() {
            let shape = OpenAiShape::deserialize(raw)
                .map_err(|_| NormalizeError::UnrecognizedFormat)?;
            let text = shape
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or(NormalizeError::UnrecognizedFormat)?;
            return Ok(Self::OpenAi { text });
        }

        if raw.get("candidates").is_some() {
            let shape = GeminiShape::deserialize(raw)
                .map_err(|_| NormalizeError::UnrecognizedFormat)?;
            let parts = shape
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
                .map(|content| content.parts)
                .ok_or(NormalizeError::UnrecognizedFormat)?;
            let texts: Vec<String> = parts.into_iter().filter_map(|part| part.text).collect();
            if texts.is_empty() {
                return Err(NormalizeError::UnrecognizedFormat);
            }
            return Ok(Self::Gemini {
                text: texts.concat(),
            });
        }

        Err(NormalizeError::UnrecognizedFormat)
    }

    pub fn text(&self) -> &str {
        match self {
            Self::OpenAi { text } | Self::Gemini { text } => text,
        }
    }
}

enum Replacement {
    Template(String),
    /// Deletes the match only when it closes a sentence.
    TrailingClause,
}

struct Rule {
    pattern: Regex,
    replacement: Replacement,
}

impl Rule {
    fn apply(&self, text: &str) -> String {
        match &self.replacement {
            Replacement::Template(template) => self
                .pattern
                .replace_all(text, template.as_str())
                .into_owned(),
            Replacement::TrailingClause => self
                .pattern
                .replace_all(text, |caps: &Captures| {
                    let matched = &caps[0];
                    let end = caps.get(0).map_or(text.len(), |m| m.end());
                    match text[end..].chars().next() {
                        None | Some('.' | '!' | '?' | '\n') => String::new(),
                        Some(_) => matched.to_string(),
                    }
                })
                .into_owned(),
        }
    }
}

pub struct Normalizer {
    rules: Vec<Rule>,
}

impl Normalizer {
    pub fn new(product_name: &str) -> Result<Self, regex::Error> {
        // `$` is the capture-group sigil in replacement strings.
        let name = product_name.trim().replace('$', "$$");
        let rule = |pattern: &str, replacement: Replacement| -> Result<Rule, regex::Error> {
            Ok(Rule {
                pattern: Regex::new(pattern)?,
                replacement,
            })
        };
        let to = |text: String| Replacement::Template(text);

        let rules = [
            rule(
                r"(?i)\bI(?:'m|’m| am) an? (?:large )?(?:AI|artificial intelligence)(?:[ -][\w-]+){0,3}? (?:model|assistant|chatbot)\b",
                to(format!("I'm {name}")),
            ),
            rule(
                r"(?i)\bI(?:'m|’m| am) an? (?:large )?language model\b",
                to(format!("I'm {name}")),
            ),
            rule(
                r"(?i)\b(as) an? (?:large )?(?:AI|artificial intelligence)(?:[ -][\w-]+){0,2}? (?:model|assistant|chatbot)\b",
                to(format!("${{1}} {name}")),
            ),
            rule(
                r"(?i)\b(as) an? (?:large )?language model\b",
                to(format!("${{1}} {name}")),
            ),
            rule(
                r"(?i),?\s*\bpowered by\b[^.!?\n,]*",
                Replacement::TrailingClause,
            ),
            rule(
                r"(?i)\b(?:(?:developed|trained|created|built|made|designed|provided|powered) )?by (?:google|meta|groq|openai|mistral)(?: deepmind| ai)?\b",
                to(format!("built by the {name} team")),
            ),
            rule(
                r"(?i)\b(?:google(?:'s|’s)? )?gemini(?:[ -](?:pro|flash|ultra|nano|\d+(?:\.\d+)*))*\b",
                to(name.clone()),
            ),
            rule(
                r"(?i)\b(?:meta(?:'s|’s)? )?llama(?:[ -]?\d+(?:\.\d+)*)?(?:[ -](?:\d+b|instant|versatile|chat))*\b",
                to(name.clone()),
            ),
            rule(
                r"(?i)\b(?:mixtral|gemma|bard)(?:[ -]?(?:\d+x\d+b|\d+(?:\.\d+)*b?))?(?:[ -](?:\d+x\d+b|\d+(?:\.\d+)*b?))*\b",
                to(name.clone()),
            ),
            rule(
                r"(?i)\b(?:google deepmind|google|groq|openai|deepmind|meta ai)\b",
                to(name.clone()),
            ),
            rule(
                r"(?i)\b(?:an? )?(?:large )?language model\b",
                to(name.clone()),
            ),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Parses the raw provider response and returns its rewritten text.
    pub fn extract(&self, raw: &Value) -> Result<String, NormalizeError> {
        let parsed = ProviderResponse::parse(raw)?;
        let text = self.rewrite(parsed.text());
        if text.trim().is_empty() {
            return Err(NormalizeError::EmptyText);
        }
        Ok(text.trim().to_string())
    }

    pub fn rewrite(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.apply_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn apply_once(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
