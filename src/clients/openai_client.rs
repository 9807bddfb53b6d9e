use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::CollaboratorError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Connection details for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIOptions {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

impl OpenAIOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub async fn generate_openai_prompt(
    http: &reqwest::Client,
    options: &OpenAIOptions,
    prompt: &str,
    prompt_type: &str,
    now: DateTime<Tz>,
) -> Result<String, CollaboratorError> {
    let full_prompt = match prompt_type {
        "calendar_intent" => format!(
            "You are the intent classifier of a Korean calendar assistant.\n\
             Current date and time: {now}\n\
             User timezone: {timezone}\n\
             Task: Decide whether the user message is about their calendar and, if so, which action they want.\n\
             Actions:\n\
             - add: create a new event\n\
             - remove: delete an existing event\n\
             - edit: change an existing event\n\
             - query: ask when or whether an event happens\n\
             - none: anything else\n\
             Rules:\n\
             - \"title\" is the event name only. Drop date words, times and verbs (\"내일 3시 팀 미팅 삭제해줘\" -> \"팀 미팅\").\n\
             - Resolve relative dates (\"내일\", \"다음 주 금요일\", \"8월 3일\") against the current date and time.\n\
             - \"start_datetime\" and \"end_datetime\" use the form YYYY-MM-DDTHH:MM:SS in the user timezone, or YYYY-MM-DD for all-day events.\n\
             - If no time is given for a timed event, use 09:00.\n\
             - Omit fields you cannot determine instead of guessing.\n\
             - Output ONLY raw JSON, no prose, markdown, or code fences.\n\
             - The JSON shape must be exactly:\n\
             {{\"is_calendar_related\":<bool>,\"action\":\"add|remove|edit|query|none\",\"title\":\"<string>\",\"start_datetime\":\"<string>\",\"end_datetime\":\"<string>\",\"location\":\"<string>\",\"description\":\"<string>\"}}\n\
             User message: \"{user_prompt}\"",
            now = now.to_rfc3339(),
            timezone = now.timezone().name(),
            user_prompt = prompt
        ),
        _ => return Err(CollaboratorError::Request(format!("unknown prompt type {prompt_type}"))),
    };

    query_openai(http, options, full_prompt, prompt_type).await
}

async fn query_openai(
    http: &reqwest::Client,
    options: &OpenAIOptions,
    prompt: String,
    prompt_type: &str,
) -> Result<String, CollaboratorError> {
    let system_message = match prompt_type {
        "calendar_intent" => {
            "You are a strict JSON intent classifier. Reply ONLY with a single JSON object, with no markdown, no backticks, and no extra text."
        }
        _ => "You are a helpful assistant.",
    };

    let request = OpenAIRequest {
        model: options.model.clone(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: system_message.to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: prompt,
            },
        ],
        max_tokens: 500,
        temperature: 0.2,
    };

    let url = format!("{}/chat/completions", options.api_base.trim_end_matches('/'));
    let response = http
        .post(&url)
        .bearer_auth(&options.api_key)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        error!(status = status.as_u16(), body = %text, "chat completion request failed");
        return Err(CollaboratorError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|err| CollaboratorError::Decode(format!("{err}; raw body: {text}")))?;

    match parsed.choices.into_iter().next() {
        Some(choice) => {
            debug!(prompt_type, "chat completion received");
            Ok(choice.message.content)
        }
        None => Err(CollaboratorError::Decode("no choices in response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Seoul;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(server: &MockServer) -> OpenAIOptions {
        OpenAIOptions {
            api_key: "sk-test".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: server.uri(),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "{\"is_calendar_related\":false}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let now = Seoul.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let content = generate_openai_prompt(
            &reqwest::Client::new(),
            &options(&server),
            "안녕",
            "calendar_intent",
            now,
        )
        .await
        .unwrap();

        assert_eq!(content, "{\"is_calendar_related\":false}");
    }

    #[tokio::test]
    async fn maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let now = Seoul.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let err = generate_openai_prompt(
            &reqwest::Client::new(),
            &options(&server),
            "안녕",
            "calendar_intent",
            now,
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            CollaboratorError::Status {
                status: 429,
                body: "slow down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rejects_unknown_prompt_type() {
        let now = Seoul.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let result = generate_openai_prompt(
            &reqwest::Client::new(),
            &OpenAIOptions::new("sk-test"),
            "hi",
            "poem",
            now,
        )
        .await;

        assert!(matches!(result, Err(CollaboratorError::Request(_))));
    }
}
