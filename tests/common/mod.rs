#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use calendarBot::error::CollaboratorError;
use calendarBot::handlers::action::Action;
use calendarBot::models::event::{CalendarEvent, EventDraft, EventTime};
use calendarBot::models::principal::Principal;
use calendarBot::service::approval_prompt::ApprovalPromptService;
use calendarBot::service::calendar_service::CalendarStore;
use calendarBot::service::classifier::OpenAIClassifier;
use calendarBot::service::openai_service::OpenAIClient;
use calendarBot::service::orchestrator::IntentOrchestrator;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Seoul;
use chrono_tz::Tz;
use tokio::sync::Mutex;

pub fn seoul(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    Seoul.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn timed_event(id: &str, title: &str, start: DateTime<Tz>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: Some(title.to_string()),
        start: Some(EventTime::at(start, Seoul)),
        end: Some(EventTime::at(start + chrono::Duration::hours(1), Seoul)),
        location: None,
        description: None,
    }
}

pub fn principal(user_id: &str) -> Principal {
    Principal::new(user_id, "google-token")
}

pub struct FakeOpenAI {
    response: Result<String, CollaboratorError>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeOpenAI {
    pub fn replying(body: &str) -> Self {
        Self {
            response: Ok(body.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: CollaboratorError) -> Self {
        Self {
            response: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[serenity::async_trait]
impl OpenAIClient for FakeOpenAI {
    async fn generate_prompt(
        &self,
        prompt: &str,
        prompt_type: &str,
        _now: DateTime<Tz>,
    ) -> Result<String, CollaboratorError> {
        let mut prompts = self.prompts.lock().await;
        prompts.push((prompt.to_string(), prompt_type.to_string()));
        self.response.clone()
    }
}

/// Calendar store backed by a Vec; listing honours the requested window.
#[derive(Default)]
pub struct InMemoryCalendar {
    pub events: Mutex<Vec<CalendarEvent>>,
    pub created: Mutex<Vec<EventDraft>>,
    pub deleted: Mutex<Vec<String>>,
    pub list_calls: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    pub fail_list: Option<CollaboratorError>,
    pub fail_create: Option<CollaboratorError>,
    pub fail_delete: Option<CollaboratorError>,
    pub delay: Option<Duration>,
}

impl InMemoryCalendar {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }
}

#[serenity::async_trait]
impl CalendarStore for InMemoryCalendar {
    async fn list_events(
        &self,
        _principal: &Principal,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CollaboratorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.list_calls.lock().await.push((time_min, time_max));
        if let Some(err) = &self.fail_list {
            return Err(err.clone());
        }
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .filter(|event| {
                event
                    .start_instant(Seoul)
                    .is_none_or(|start| start >= time_min && start < time_max)
            })
            .cloned()
            .collect())
    }

    async fn create_event(
        &self,
        _principal: &Principal,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, CollaboratorError> {
        if let Some(err) = &self.fail_create {
            return Err(err.clone());
        }
        let mut created = self.created.lock().await;
        created.push(draft.clone());
        Ok(CalendarEvent {
            id: format!("created-{}", created.len()),
            title: Some(draft.title.clone()),
            start: Some(draft.start.clone()),
            end: Some(draft.end.clone()),
            location: draft.location.clone(),
            description: draft.description.clone(),
        })
    }

    async fn delete_event(&self, _principal: &Principal, event_id: &str) -> Result<(), CollaboratorError> {
        if let Some(err) = &self.fail_delete {
            return Err(err.clone());
        }
        self.deleted.lock().await.push(event_id.to_string());
        self.events.lock().await.retain(|event| event.id != event_id);
        Ok(())
    }
}

pub fn orchestrator(openai: Arc<FakeOpenAI>, calendar: Arc<InMemoryCalendar>) -> IntentOrchestrator {
    IntentOrchestrator::new(Arc::new(OpenAIClassifier::new(openai)), calendar, Seoul)
}

#[derive(Default)]
pub struct CapturingApprovalPrompt {
    pub prompts: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<String>>,
}

#[serenity::async_trait]
impl ApprovalPromptService for CapturingApprovalPrompt {
    async fn prompt(&self, action: &mut Action) -> Result<(), String> {
        self.prompts.lock().await.push(action.id.clone());
        if let Some(pending) = action.pending_deletion_mut() {
            pending.message_id = Some(42);
        }
        Ok(())
    }

    async fn update_status(&self, _action: &Action, message: &str) -> Result<(), String> {
        self.statuses.lock().await.push(message.to_string());
        Ok(())
    }

    async fn update_status_message(
        &self,
        _channel_id: &str,
        _user_id: &str,
        message: &str,
    ) -> Result<(), String> {
        self.statuses.lock().await.push(message.to_string());
        Ok(())
    }
}
