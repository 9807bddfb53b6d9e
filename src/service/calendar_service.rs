use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::async_trait;

use crate::clients::google_calendar::{self, CalendarTarget};
use crate::error::CollaboratorError;
use crate::models::event::{CalendarEvent, EventDraft};
use crate::models::principal::Principal;

/// The external calendar. Listing returns events ordered by start time.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn list_events(
        &self,
        principal: &Principal,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CollaboratorError>;

    async fn create_event(
        &self,
        principal: &Principal,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, CollaboratorError>;

    async fn delete_event(&self, principal: &Principal, event_id: &str) -> Result<(), CollaboratorError>;
}

pub struct GoogleCalendarService {
    target: CalendarTarget,
    http: reqwest::Client,
}

impl GoogleCalendarService {
    pub fn new(target: CalendarTarget, timeout: Duration) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { target, http })
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarService {
    async fn list_events(
        &self,
        principal: &Principal,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CollaboratorError> {
        google_calendar::list_events(&self.http, &self.target, principal.access_token(), time_min, time_max).await
    }

    async fn create_event(
        &self,
        principal: &Principal,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, CollaboratorError> {
        google_calendar::insert_event(&self.http, &self.target, principal.access_token(), draft).await
    }

    async fn delete_event(&self, principal: &Principal, event_id: &str) -> Result<(), CollaboratorError> {
        google_calendar::delete_event(&self.http, &self.target, principal.access_token(), event_id).await
    }
}
