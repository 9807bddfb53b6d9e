use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::clients::google_calendar::CalendarTarget;
use crate::clients::openai_client::OpenAIOptions;
use crate::config::Settings;
use crate::events::queue::EventBus;
use crate::events::worker::{run_confirmation_sweeper, run_event_worker};
use crate::handlers::action::{ActionEngine, ActionStore};
use crate::handlers::discord::BotHandler;
use crate::service::approval_prompt::DiscordApprovalPromptService;
use crate::service::calendar_service::GoogleCalendarService;
use crate::service::classifier::OpenAIClassifier;
use crate::service::openai_service::OpenAIService;
use crate::service::orchestrator::IntentOrchestrator;

const EVENT_BUFFER: usize = 64;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub type RuntimeResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Wires the LLM classifier and Google Calendar store into an orchestrator.
pub fn build_orchestrator(settings: &Settings) -> RuntimeResult<IntentOrchestrator> {
    let api_key = Settings::require(&settings.openai_api_key, "OPENAI_API_KEY")?;
    let openai = OpenAIService::new(
        OpenAIOptions {
            api_key,
            model: settings.openai_model.clone(),
            api_base: settings.openai_api_base.clone(),
        },
        settings.request_timeout,
    )?;
    let calendar = GoogleCalendarService::new(
        CalendarTarget {
            api_base: settings.google_calendar_api_base.clone(),
            calendar_id: settings.google_calendar_id.clone(),
        },
        settings.request_timeout,
    )?;

    Ok(IntentOrchestrator::new(
        Arc::new(OpenAIClassifier::new(Arc::new(openai))),
        Arc::new(calendar),
        settings.timezone,
    )
    .with_call_timeout(settings.request_timeout))
}

pub async fn run_bot(settings: Settings) -> RuntimeResult<()> {
    let discord_token = Settings::require(&settings.discord_token, "DISCORD_TOKEN")?;
    let google_token = Settings::require(&settings.google_access_token, "GOOGLE_ACCESS_TOKEN")?;
    let orchestrator = Arc::new(build_orchestrator(&settings)?);

    let store = Arc::new(Mutex::new(ActionStore::new()));
    let approval = Arc::new(DiscordApprovalPromptService::new(&discord_token, settings.timezone));
    let engine = Arc::new(ActionEngine::new(
        store.clone(),
        orchestrator,
        approval,
        Arc::new(google_token),
    ));

    let (event_bus, rx) = EventBus::new(EVENT_BUFFER);
    tokio::spawn(run_event_worker(rx, engine));
    tokio::spawn(run_confirmation_sweeper(store.clone(), SWEEP_INTERVAL));

    let intents = GatewayIntents::GUILDS | GatewayIntents::DIRECT_MESSAGES;
    let mut client = serenity::Client::builder(&discord_token, intents)
        .event_handler(BotHandler::new(event_bus, store))
        .await
        .map_err(|err| format!("failed to build discord client: {err}"))?;

    info!(timezone = %settings.timezone, calendar = %settings.google_calendar_id, "starting discord client");
    if let Err(err) = client.start().await {
        error!(error = %err, "discord client stopped");
        return Err(format!("discord client stopped: {err}").into());
    }
    Ok(())
}
