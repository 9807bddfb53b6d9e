use std::sync::Arc;

use chrono::Utc;
use serenity::all::{
    Command, CommandDataOptionValue, CommandInteraction, CommandOptionType, ComponentInteraction,
    Interaction as DiscordInteraction,
};
use serenity::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::events::queue::EventBus;
use crate::handlers::action::{ActionEvent, ActionStatus, ActionStore, EXPIRED_MESSAGE};
use crate::handlers::discord_responder::{InteractionResponder, SerenityResponder};
use crate::service::confirmation::{CANCEL_PREFIX, CONFIRM_PREFIX};

pub const COMMAND_NAME: &str = "calendar";

pub const ACK_MESSAGE: &str = "요청을 확인했어요. 잠시만 기다려 주세요.";
pub const MISSING_TEXT_MESSAGE: &str = "`/calendar text:` 뒤에 요청 내용을 입력해 주세요.";
pub const UNAVAILABLE_MESSAGE: &str = "이 요청은 더 이상 유효하지 않습니다.";
pub const NOT_REQUESTER_MESSAGE: &str = "요청한 사용자만 확인하거나 취소할 수 있습니다.";
pub const CONFIRMING_MESSAGE: &str = "삭제를 진행합니다.";
pub const CANCELING_MESSAGE: &str = "삭제 요청을 취소합니다.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatDecision {
    Emitted,
    MissingText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingChoice {
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDecision {
    Emitted,
    Unavailable,
    NotRequester,
    Expired,
}

pub struct BotHandler {
    event_bus: EventBus,
    store: Arc<Mutex<ActionStore>>,
}

impl BotHandler {
    pub fn new(event_bus: EventBus, store: Arc<Mutex<ActionStore>>) -> Self {
        BotHandler { event_bus, store }
    }

    pub async fn handle_chat_with<R: InteractionResponder + ?Sized>(
        &self,
        responder: &R,
        text: &str,
        user_id: &str,
        channel_id: &str,
    ) -> ChatDecision {
        let text = text.trim();
        if text.is_empty() {
            responder.reply_ephemeral(MISSING_TEXT_MESSAGE).await;
            return ChatDecision::MissingText;
        }

        self.event_bus
            .emit(ActionEvent::TurnRequested {
                text: text.to_string(),
                user_id: user_id.to_string(),
                channel_id: channel_id.to_string(),
            })
            .await;
        responder.reply_ephemeral(ACK_MESSAGE).await;
        ChatDecision::Emitted
    }

    pub async fn handle_pending_with<R: InteractionResponder + ?Sized>(
        &self,
        responder: &R,
        choice: PendingChoice,
        action_id: &str,
        user_id: &str,
    ) -> PendingDecision {
        let snapshot = {
            let store = self.store.lock().await;
            store.get(action_id).cloned()
        };

        let Some(action) = snapshot.filter(|action| action.status == ActionStatus::AwaitingApproval) else {
            responder.reply_ephemeral(UNAVAILABLE_MESSAGE).await;
            return PendingDecision::Unavailable;
        };

        if action.user_id != user_id {
            responder.reply_ephemeral(NOT_REQUESTER_MESSAGE).await;
            return PendingDecision::NotRequester;
        }

        let expired = action
            .pending_deletion()
            .is_none_or(|pending| pending.is_expired(Utc::now()));
        if choice == PendingChoice::Confirm && expired {
            responder.reply_update(EXPIRED_MESSAGE).await;
            return PendingDecision::Expired;
        }

        let (event, ack) = match choice {
            PendingChoice::Confirm => (
                ActionEvent::DeleteConfirmed {
                    action_id: action_id.to_string(),
                    user_id: user_id.to_string(),
                },
                CONFIRMING_MESSAGE,
            ),
            PendingChoice::Cancel => (
                ActionEvent::DeleteCanceled {
                    action_id: action_id.to_string(),
                    user_id: user_id.to_string(),
                },
                CANCELING_MESSAGE,
            ),
        };
        self.event_bus.emit(event).await;
        responder.reply_update(ack).await;
        PendingDecision::Emitted
    }

    async fn handle_chat(&self, ctx: &Context, command: &CommandInteraction) {
        let text = command
            .data
            .options
            .iter()
            .find(|opt| opt.name == "text")
            .and_then(|opt| match &opt.value {
                CommandDataOptionValue::String(s) => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or("");

        let responder = SerenityResponder::for_command(ctx, command);
        let user_id = command.user.id.to_string();
        let channel_id = command.channel_id.to_string();
        let decision = self
            .handle_chat_with(&responder, text, &user_id, &channel_id)
            .await;
        debug!(user_id, ?decision, "calendar command handled");
    }

    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some((prefix, action_id)) = component.data.custom_id.split_once(':') else {
            return;
        };
        let choice = match prefix {
            CONFIRM_PREFIX => PendingChoice::Confirm,
            CANCEL_PREFIX => PendingChoice::Cancel,
            _ => return,
        };

        let responder = SerenityResponder::for_component(ctx, component);
        let user_id = component.user.id.to_string();
        let decision = self
            .handle_pending_with(&responder, choice, action_id, &user_id)
            .await;
        debug!(action_id, ?choice, ?decision, "confirmation button handled");
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to discord");

        let builder = CreateCommand::new(COMMAND_NAME)
            .description("자연어로 캘린더 일정을 추가, 조회, 삭제합니다")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "text",
                    "예: 내일 3시 팀 미팅 삭제해줘",
                )
                .required(true),
            );

        if let Err(err) = Command::create_global_command(&ctx.http, builder).await {
            error!(error = %err, "failed to register /calendar command");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: DiscordInteraction) {
        match interaction {
            DiscordInteraction::Command(command) if command.data.name == COMMAND_NAME => {
                self.handle_chat(&ctx, &command).await;
            }
            DiscordInteraction::Component(component) => {
                self.handle_component(&ctx, &component).await;
            }
            _ => {}
        }
    }
}
