use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CollaboratorError;
use crate::models::event::{CalendarEvent, EventDraft, EventTime};

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const MAX_RESULTS: u32 = 100;

/// Where a calendar lives: API base URL plus the calendar id.
#[derive(Debug, Clone)]
pub struct CalendarTarget {
    pub api_base: String,
    pub calendar_id: String,
}

impl CalendarTarget {
    fn events_url(&self, event_id: Option<&str>) -> Result<Url, CollaboratorError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|err| CollaboratorError::Request(format!("invalid calendar api base: {err}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CollaboratorError::Request("calendar api base cannot hold a path".to_string()))?;
            segments.pop_if_empty().extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }
}

pub async fn list_events(
    http: &Client,
    target: &CalendarTarget,
    access_token: &str,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, CollaboratorError> {
    let url = target.events_url(None)?;
    let query = [
        ("timeMin", time_min.to_rfc3339()),
        ("timeMax", time_max.to_rfc3339()),
        ("singleEvents", "true".to_string()),
        ("orderBy", "startTime".to_string()),
        ("maxResults", MAX_RESULTS.to_string()),
    ];

    let response = http.get(url).bearer_auth(access_token).query(&query).send().await?;
    let response = ensure_success(response).await?;
    let body: GoogleEventsResponse = response.json().await?;

    let events: Vec<CalendarEvent> = body.items.into_iter().map(GoogleCalendarEvent::into_event).collect();
    debug!(count = events.len(), %time_min, %time_max, "calendar events listed");
    Ok(events)
}

pub async fn insert_event(
    http: &Client,
    target: &CalendarTarget,
    access_token: &str,
    draft: &EventDraft,
) -> Result<CalendarEvent, CollaboratorError> {
    let url = target.events_url(None)?;
    let response = http
        .post(url)
        .bearer_auth(access_token)
        .query(&[("sendUpdates", "all")])
        .json(draft)
        .send()
        .await?;
    let response = ensure_success(response).await?;
    let created: GoogleCalendarEvent = response.json().await?;
    Ok(created.into_event())
}

pub async fn delete_event(
    http: &Client,
    target: &CalendarTarget,
    access_token: &str,
    event_id: &str,
) -> Result<(), CollaboratorError> {
    let url = target.events_url(Some(event_id))?;
    let response = http
        .delete(url)
        .bearer_auth(access_token)
        .query(&[("sendUpdates", "all")])
        .send()
        .await?;
    ensure_success(response).await?;
    Ok(())
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(CollaboratorError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventDateTime>,
    end: Option<GoogleEventDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventDateTime {
    date: Option<String>,
    date_time: Option<String>,
    time_zone: Option<String>,
}

impl GoogleCalendarEvent {
    fn into_event(self) -> CalendarEvent {
        let start = self.start.and_then(|start| start.into_event_time(&self.id, "start"));
        let end = self.end.and_then(|end| end.into_event_time(&self.id, "end"));
        CalendarEvent {
            id: self.id,
            title: self.summary,
            start,
            end,
            location: self.location,
            description: self.description,
        }
    }
}

impl GoogleEventDateTime {
    // Unparseable values are dropped so the event survives without that bound.
    fn into_event_time(self, event_id: &str, field: &str) -> Option<EventTime> {
        let date_time = self.date_time.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map_err(|err| warn!(event_id, field, raw, error = %err, "unparseable dateTime"))
                .ok()
        });
        let date = self.date.as_deref().and_then(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|err| warn!(event_id, field, raw, error = %err, "unparseable date"))
                .ok()
        });
        if date_time.is_none() && date.is_none() {
            return None;
        }
        Some(EventTime {
            date,
            date_time,
            time_zone: self.time_zone,
        })
    }
}
