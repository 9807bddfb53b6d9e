use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use serenity::async_trait;

use crate::clients::openai_client::{self, OpenAIOptions};
use crate::error::CollaboratorError;

#[async_trait]
pub trait OpenAIClient: Send + Sync {
    async fn generate_prompt(
        &self,
        prompt: &str,
        prompt_type: &str,
        now: DateTime<Tz>,
    ) -> Result<String, CollaboratorError>;
}

pub struct OpenAIService {
    options: OpenAIOptions,
    http: reqwest::Client,
}

impl OpenAIService {
    pub fn new(options: OpenAIOptions, timeout: Duration) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { options, http })
    }

    async fn generate_prompt_internal(
        &self,
        prompt: &str,
        prompt_type: &str,
        now: DateTime<Tz>,
    ) -> Result<String, CollaboratorError> {
        openai_client::generate_openai_prompt(&self.http, &self.options, prompt, prompt_type, now).await
    }
}

#[async_trait]
impl OpenAIClient for OpenAIService {
    async fn generate_prompt(
        &self,
        prompt: &str,
        prompt_type: &str,
        now: DateTime<Tz>,
    ) -> Result<String, CollaboratorError> {
        self.generate_prompt_internal(prompt, prompt_type, now).await
    }
}
