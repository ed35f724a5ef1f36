//! Location extraction: one text-understanding call per message, with the
//! reply normalised into an [`Extraction`].
//!
//! Every failure (transport, API status, malformed reply, "no location"
//! answer) folds into [`Extraction::NoExtraction`]; nothing here returns an
//! error to the caller.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use antiradar_core::{excerpt, ExtractedLocation, Extraction};

use crate::provider::{LlmProvider, Message};

/// Converts free-text chat messages into town/street guesses via an LLM.
pub struct Extractor {
    provider: Box<dyn LlmProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl Extractor {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        system_prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            system_prompt,
            temperature,
            max_tokens,
        }
    }

    /// Extract a location from one message. Never retries.
    pub async fn extract(&self, message: &str) -> Extraction {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(message),
        ];

        let response = match self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    provider = %self.provider.name(),
                    error = %e,
                    message = %excerpt(message),
                    "text-understanding call failed"
                );
                return Extraction::NoExtraction;
            }
        };

        debug!("LLM response: {}", response);

        match parse_extraction(&response) {
            Ok(location) => {
                info!(town = %location.town, street = %location.street, "location extracted");
                Extraction::Extracted(location)
            }
            Err(ExtractionRejected::NoLocation) => {
                info!(message = %excerpt(message), "no location in message");
                Extraction::NoExtraction
            }
            Err(e) => {
                warn!(error = %e, raw_response = %excerpt(&response), "unusable extraction reply");
                Extraction::NoExtraction
            }
        }
    }
}

/// Why a reply could not be turned into an [`ExtractedLocation`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionRejected {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("reply is not a JSON object")]
    NotAnObject,
    #[error("field `{0}` is not a string")]
    WrongFieldType(&'static str),
    #[error("reply carries no location")]
    NoLocation,
}

/// Parse a raw model reply into a location.
///
/// Accepts an object with at least one of `town`/`street` as a string;
/// `null` counts as absent and values are trimmed.
pub fn parse_extraction(response: &str) -> Result<ExtractedLocation, ExtractionRejected> {
    let json_str = extract_json(response);
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractionRejected::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(ExtractionRejected::NotAnObject)?;

    let town = string_field(object, "town")?;
    let street = string_field(object, "street")?;
    if town.is_none() && street.is_none() {
        return Err(ExtractionRejected::NoLocation);
    }

    Ok(ExtractedLocation {
        town: town.unwrap_or_default(),
        street: street.unwrap_or_default(),
    })
}

fn string_field(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ExtractionRejected> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ExtractionRejected::WrongFieldType(key)),
    }
}

/// Extract JSON from an LLM response, handling markdown code blocks.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        // Skip past any language identifier on the same line
        let after_tick = &trimmed[json_start..];
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    // Try raw JSON (starts with {)
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}
