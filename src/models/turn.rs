use serde::Serialize;

use crate::models::event::CalendarEvent;

/// The event a near-miss points at, handed back so the caller can offer
/// an explicit confirm/cancel choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmation {
    pub event: CalendarEvent,
    pub distance_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_details: Option<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<DeleteConfirmation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CalendarEvent>,
}

impl TurnResponse {
    pub fn message(action: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action: action.to_string(),
            event_details: None,
            confirmation: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: CalendarEvent) -> Self {
        self.event_details = Some(event);
        self
    }
}
