use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use serenity::async_trait;
use tracing::{debug, warn};

use crate::error::TurnError;
use crate::models::intent::ClassifiedIntent;
use crate::service::openai_service::OpenAIClient;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str, now: DateTime<Tz>) -> Result<ClassifiedIntent, TurnError>;
}

pub struct OpenAIClassifier {
    openai: Arc<dyn OpenAIClient>,
}

impl OpenAIClassifier {
    pub fn new(openai: Arc<dyn OpenAIClient>) -> Self {
        Self { openai }
    }
}

#[async_trait]
impl IntentClassifier for OpenAIClassifier {
    async fn classify(&self, utterance: &str, now: DateTime<Tz>) -> Result<ClassifiedIntent, TurnError> {
        let payload = self
            .openai
            .generate_prompt(utterance, "calendar_intent", now)
            .await?;
        let intent = parse_classifier_payload(&payload)?;
        debug!(
            action = intent.action.as_str(),
            calendar = intent.is_calendar_related,
            "utterance classified"
        );
        Ok(intent)
    }
}

/// Parses the classifier's JSON, tolerating a surrounding markdown fence.
pub fn parse_classifier_payload(payload: &str) -> Result<ClassifiedIntent, TurnError> {
    let body = strip_code_fence(payload);
    serde_json::from_str(body).map_err(|err| {
        warn!(error = %err, payload, "classifier returned malformed JSON");
        TurnError::Parse(err.to_string())
    })
}

fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as "json" on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}
