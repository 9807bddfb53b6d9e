use std::sync::Arc;

use chrono_tz::Tz;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::id::ChannelId;

use crate::handlers::action::Action;
use crate::service::confirmation::{pending_buttons, render_pending_message};

/// Posts turn results and confirm/cancel prompts back to the chat channel.
#[serenity::async_trait]
pub trait ApprovalPromptService: Send + Sync {
    async fn prompt(&self, action: &mut Action) -> Result<(), String>;
    async fn update_status(&self, action: &Action, message: &str) -> Result<(), String>;
    async fn update_status_message(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<(), String>;
}

pub struct DiscordApprovalPromptService {
    http: Arc<Http>,
    tz: Tz,
}

impl DiscordApprovalPromptService {
    pub fn new(token: &str, tz: Tz) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
            tz,
        }
    }

    fn channel_from(&self, channel_id: &str) -> Result<ChannelId, String> {
        let id = channel_id
            .parse::<u64>()
            .map_err(|_| format!("Invalid channel id {channel_id}"))?;
        Ok(ChannelId::new(id))
    }
}

#[serenity::async_trait]
impl ApprovalPromptService for DiscordApprovalPromptService {
    async fn prompt(&self, action: &mut Action) -> Result<(), String> {
        let channel = self.channel_from(&action.channel_id)?;
        let requester = mention(&action.user_id);
        let action_id = action.id.clone();
        let pending = action
            .pending_deletion_mut()
            .ok_or_else(|| "action has no pending deletion".to_string())?;

        let body = format!("{requester} {}", render_pending_message(pending, self.tz));
        let message = channel
            .send_message(
                &self.http,
                CreateMessage::new()
                    .content(body)
                    .components(vec![pending_buttons(&action_id)]),
            )
            .await
            .map_err(|err| format!("Failed to send approval prompt: {err}"))?;

        pending.message_id = Some(message.id.get());
        Ok(())
    }

    async fn update_status(&self, action: &Action, message: &str) -> Result<(), String> {
        self.update_status_message(&action.channel_id, &action.user_id, message)
            .await
    }

    async fn update_status_message(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<(), String> {
        let channel = self.channel_from(channel_id)?;
        channel
            .say(&self.http, format!("{} {}", mention(user_id), message))
            .await
            .map_err(|err| format!("Failed to send status message: {err}"))?;
        Ok(())
    }
}

fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}
