use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const UNTITLED_EVENT: &str = "제목 없음";

/// Start or end of an event, shaped like the calendar API: either an
/// all-day `date` or a `dateTime` with an optional IANA zone name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn at<Z: TimeZone>(instant: DateTime<Z>, tz: Tz) -> Self {
        Self {
            date: None,
            date_time: Some(instant.with_timezone(&tz).fixed_offset()),
            time_zone: Some(tz.name().to_string()),
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            date_time: None,
            time_zone: None,
        }
    }

    /// `dateTime` when present, else midnight of `date` in `tz`.
    pub fn instant(&self, tz: Tz) -> Option<DateTime<Utc>> {
        if let Some(date_time) = self.date_time {
            return Some(date_time.with_timezone(&Utc));
        }
        let midnight = self.date?.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(rename = "summary", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalendarEvent {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED_EVENT)
    }

    pub fn start_instant(&self, tz: Tz) -> Option<DateTime<Utc>> {
        self.start.as_ref().and_then(|start| start.instant(tz))
    }

    /// "6월 11일 15시 0분" for timed events, "6월 11일 (종일)" for all-day ones.
    pub fn describe_start(&self, tz: Tz) -> String {
        match &self.start {
            Some(start) if start.is_all_day() => match start.date {
                Some(date) => format!("{}월 {}일 (종일)", date.month(), date.day()),
                None => "시간 미정".to_string(),
            },
            Some(start) => match start.instant(tz) {
                Some(instant) => format_local(instant, tz),
                None => "시간 미정".to_string(),
            },
            None => "시간 미정".to_string(),
        }
    }
}

pub fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    let local = instant.with_timezone(&tz);
    format!(
        "{}월 {}일 {}시 {}분",
        local.month(),
        local.day(),
        local.hour(),
        local.minute()
    )
}

/// Normalised fields for a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(rename = "summary")]
    pub title: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Seoul;

    #[test]
    fn all_day_start_is_local_midnight() {
        let event = CalendarEvent {
            id: "b".to_string(),
            title: None,
            start: Some(EventTime::all_day(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap())),
            end: None,
            location: None,
            description: None,
        };
        let expected = Seoul.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap();
        assert_eq!(event.start_instant(Seoul), Some(expected.with_timezone(&Utc)));
        assert_eq!(event.display_title(), UNTITLED_EVENT);
        assert_eq!(event.describe_start(Seoul), "6월 11일 (종일)");
    }

    #[test]
    fn deserializes_calendar_api_shape() {
        let raw = r#"{"id":"x1","summary":"팀 미팅","start":{"dateTime":"2024-06-11T15:00:00+09:00","timeZone":"Asia/Seoul"},"end":{"dateTime":"2024-06-11T16:00:00+09:00"}}"#;
        let event: CalendarEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.display_title(), "팀 미팅");
        assert_eq!(event.describe_start(Seoul), "6월 11일 15시 0분");
    }
}
