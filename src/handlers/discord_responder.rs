use serenity::all::{CommandInteraction, ComponentInteraction};
use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::prelude::Context;
use tracing::warn;

/// Replies to the interaction that triggered a handler.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn reply_ephemeral(&self, content: &str);
    /// Replaces the message the clicked component lives on and drops its buttons.
    async fn reply_update(&self, content: &str);
}

pub struct SerenityResponder<'a> {
    ctx: &'a Context,
    command: Option<&'a CommandInteraction>,
    component: Option<&'a ComponentInteraction>,
}

impl<'a> SerenityResponder<'a> {
    pub fn for_command(ctx: &'a Context, command: &'a CommandInteraction) -> Self {
        Self {
            ctx,
            command: Some(command),
            component: None,
        }
    }

    pub fn for_component(ctx: &'a Context, component: &'a ComponentInteraction) -> Self {
        Self {
            ctx,
            command: None,
            component: Some(component),
        }
    }

    async fn respond(&self, response: CreateInteractionResponse) {
        let result = if let Some(component) = self.component {
            component.create_response(&self.ctx.http, response).await
        } else if let Some(command) = self.command {
            command.create_response(&self.ctx.http, response).await
        } else {
            return;
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to respond to interaction");
        }
    }
}

#[async_trait]
impl InteractionResponder for SerenityResponder<'_> {
    async fn reply_ephemeral(&self, content: &str) {
        self.respond(CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true),
        ))
        .await;
    }

    async fn reply_update(&self, content: &str) {
        let response = if self.component.is_some() {
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(vec![]),
            )
        } else {
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(content))
        };
        self.respond(response).await;
    }
}
