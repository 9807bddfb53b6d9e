use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serenity::all::ButtonStyle;
use serenity::builder::{CreateActionRow, CreateButton};

use crate::models::event::CalendarEvent;
use crate::service::event_matcher::format_gap;

pub const CONFIRM_PREFIX: &str = "delete_confirm";
pub const CANCEL_PREFIX: &str = "delete_cancel";
pub const CONFIRMATION_TTL_MINUTES: i64 = 5;

/// A near-miss deletion waiting for the requester's explicit go-ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub event: CalendarEvent,
    pub distance_ms: i64,
    pub expires_at: DateTime<Utc>,
    pub message_id: Option<u64>,
}

impl PendingDeletion {
    pub fn new(event: CalendarEvent, distance_ms: i64, now: DateTime<Utc>) -> Self {
        Self {
            event,
            distance_ms,
            expires_at: now + chrono::Duration::minutes(CONFIRMATION_TTL_MINUTES),
            message_id: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

pub fn render_pending_message(pending: &PendingDeletion, tz: Tz) -> String {
    format!(
        "이 일정을 삭제할까요?\n제목: {}\n시간: {}\n요청한 시간과의 차이: {}\n{}분 안에 확인하지 않으면 요청이 취소됩니다.",
        pending.event.display_title(),
        pending.event.describe_start(tz),
        format_gap(pending.distance_ms),
        CONFIRMATION_TTL_MINUTES
    )
}

pub fn pending_buttons(action_id: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{CONFIRM_PREFIX}:{action_id}"))
            .label("삭제 확인")
            .style(ButtonStyle::Danger),
        CreateButton::new(format!("{CANCEL_PREFIX}:{action_id}"))
            .label("취소")
            .style(ButtonStyle::Secondary),
    ])
}
