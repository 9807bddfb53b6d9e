use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::error::{CollaboratorError, TurnError};
use crate::models::event::{CalendarEvent, EventDraft, EventTime};
use crate::models::intent::{ClassifiedIntent, IntentAction};
use crate::models::principal::Principal;
use crate::models::turn::{DeleteConfirmation, TurnResponse};
use crate::service::calendar_service::CalendarStore;
use crate::service::classifier::IntentClassifier;
use crate::service::date_resolver::{self, ResolvedInstant, localize};
use crate::service::event_matcher::{self, ResolutionResult};
use crate::service::title_extractor::{self, ExtractionMode};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

const OUT_OF_DOMAIN: &str = "죄송합니다. 저는 캘린더 일정에 관한 요청만 도와드릴 수 있어요.";
const EDIT_UNSUPPORTED: &str = "일정 수정 기능은 아직 지원하지 않습니다. 기존 일정을 삭제한 뒤 새로 추가해 주세요.";
const GENERIC_APOLOGY: &str = "죄송합니다. 캘린더 서비스와 통신하는 중 문제가 발생했습니다. 잠시 후 다시 시도해 주세요.";
const PARSE_FAILURE: &str = "요청을 처리하지 못했습니다. 다시 한 번 말씀해 주세요.";
const MISSING_TITLE: &str = "추가할 일정의 제목을 알려주세요.";
const MISSING_START: &str = "일정의 날짜와 시간을 알려주세요.";
const INVALID_START: &str = "일정 시간을 이해하지 못했습니다. 날짜와 시간을 다시 알려주세요.";
const MISSING_REFERENCE: &str = "삭제할 일정의 제목이나 시간을 알려주세요.";

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Drives one user turn: classify, then create, or resolve and delete.
/// Every failure is folded into the returned `TurnResponse`.
pub struct IntentOrchestrator {
    classifier: Arc<dyn IntentClassifier>,
    calendar: Arc<dyn CalendarStore>,
    tz: Tz,
    call_timeout: Duration,
}

impl IntentOrchestrator {
    pub fn new(classifier: Arc<dyn IntentClassifier>, calendar: Arc<dyn CalendarStore>, tz: Tz) -> Self {
        Self {
            classifier,
            calendar,
            tz,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn handle_turn(&self, utterance: &str, principal: &Principal) -> TurnResponse {
        let now = Utc::now().with_timezone(&self.tz);
        self.handle_turn_at(utterance, principal, now).await
    }

    /// Same as `handle_turn` with the turn's single "now" supplied by the caller.
    pub async fn handle_turn_at(&self, utterance: &str, principal: &Principal, now: DateTime<Tz>) -> TurnResponse {
        info!(user = %principal.user_id, "turn received");

        let intent = match self
            .bounded("intent classifier", self.classifier.classify(utterance, now))
            .await
        {
            Ok(intent) => intent,
            Err(err) => return self.respond_with_error(IntentAction::None, err),
        };

        if !intent.is_calendar_related || intent.action == IntentAction::None {
            info!(user = %principal.user_id, "utterance is out of domain");
            return TurnResponse::message(IntentAction::None.as_str(), OUT_OF_DOMAIN);
        }

        let action = intent.action;
        info!(user = %principal.user_id, action = action.as_str(), "utterance classified");
        let result = match action {
            IntentAction::Add => self.create(&intent, principal).await,
            IntentAction::Remove => self.remove(utterance, &intent, principal, now).await,
            IntentAction::Query => self.query(utterance, &intent, principal, now).await,
            IntentAction::Edit => Ok(TurnResponse::message(action.as_str(), EDIT_UNSUPPORTED)),
            IntentAction::None => Ok(TurnResponse::message(action.as_str(), OUT_OF_DOMAIN)),
        };

        result.unwrap_or_else(|err| self.respond_with_error(action, err))
    }

    /// Deletes an event the user confirmed after a near-miss.
    pub async fn confirm_delete(&self, principal: &Principal, event: &CalendarEvent) -> TurnResponse {
        info!(user = %principal.user_id, event_id = %event.id, "near-miss deletion confirmed");
        self.delete_resolved(principal, event.clone()).await
    }

    async fn create(&self, intent: &ClassifiedIntent, principal: &Principal) -> Result<TurnResponse, TurnError> {
        let draft = build_draft(intent, self.tz)?;
        let action = IntentAction::Add.as_str();

        match self
            .bounded("calendar create", self.calendar.create_event(principal, &draft))
            .await
        {
            Ok(created) => {
                info!(event_id = %created.id, "event created");
                let title = if created.title.is_some() {
                    created.display_title().to_string()
                } else {
                    draft.title.clone()
                };
                let when = created.describe_start(self.tz);
                Ok(TurnResponse::message(action, format!("\"{title}\" 일정이 {when}에 생성되었습니다.")).with_event(created))
            }
            Err(TurnError::Collaborator(err)) => {
                error!(error = %err, title = %draft.title, "event creation failed");
                Ok(TurnResponse::message(action, format!("일정 생성 중 오류가 발생했습니다: {err}")))
            }
            Err(err) => Err(err),
        }
    }

    async fn remove(
        &self,
        utterance: &str,
        intent: &ClassifiedIntent,
        principal: &Principal,
        now: DateTime<Tz>,
    ) -> Result<TurnResponse, TurnError> {
        if intent.title().is_none() && intent.start_datetime().is_none() {
            return Err(TurnError::Validation(MISSING_REFERENCE.to_string()));
        }

        let (hint, target) = self.reference(utterance, intent, ExtractionMode::Delete, now);
        let event = self.resolve_event(principal, &hint, &target).await?;
        Ok(self.delete_resolved(principal, event).await)
    }

    async fn query(
        &self,
        utterance: &str,
        intent: &ClassifiedIntent,
        principal: &Principal,
        now: DateTime<Tz>,
    ) -> Result<TurnResponse, TurnError> {
        let action = IntentAction::Query.as_str();
        let (hint, target) = self.reference(utterance, intent, ExtractionMode::Query, now);

        match self.resolve_event(principal, &hint, &target).await {
            Ok(event) => {
                let message = format!(
                    "\"{}\" 일정은 {}에 있습니다.",
                    event.display_title(),
                    event.describe_start(self.tz)
                );
                Ok(TurnResponse::message(action, message).with_event(event))
            }
            // Nothing is mutated on a query, so the closest event is reported as-is.
            Err(TurnError::NearMiss { event, .. }) => {
                let message = format!(
                    "요청한 시간 근처에는 일정이 없습니다. 가장 가까운 일정은 \"{}\" ({})입니다.",
                    event.display_title(),
                    event.describe_start(self.tz)
                );
                Ok(TurnResponse::message(action, message).with_event(*event))
            }
            Err(err) => Err(err),
        }
    }

    /// Title hint and target instant for remove/query.
    fn reference(
        &self,
        utterance: &str,
        intent: &ClassifiedIntent,
        mode: ExtractionMode,
        now: DateTime<Tz>,
    ) -> (String, ResolvedInstant) {
        let mut hint = title_extractor::extract(utterance, mode);
        if hint.is_empty() {
            if let Some(title) = intent.title() {
                hint = title_extractor::strip_date_and_time(title);
            }
        }

        let resolved = date_resolver::resolve(utterance, now);
        if resolved.explicit {
            return (hint, resolved);
        }

        let from_classifier = intent
            .start_datetime()
            .and_then(|raw| parse_classifier_datetime(raw, self.tz))
            .map(|parsed| {
                let at = parsed.target(self.tz);
                ResolvedInstant {
                    keyword: format!("{}월 {}일", at.month(), at.day()),
                    at,
                    explicit: true,
                }
            });

        (hint, from_classifier.unwrap_or(resolved))
    }

    async fn resolve_event(
        &self,
        principal: &Principal,
        hint: &str,
        target: &ResolvedInstant,
    ) -> Result<CalendarEvent, TurnError> {
        let (time_min, time_max) = date_resolver::day_window(target.at);
        let events = self
            .bounded("calendar list", self.calendar.list_events(principal, time_min, time_max))
            .await?;
        info!(count = events.len(), hint, target = %target.at, "resolving event");

        match event_matcher::match_event(&events, hint, target) {
            ResolutionResult::Found(candidate) => Ok(candidate.event),
            ResolutionResult::NotFound { reason, message } => Err(TurnError::NotFound {
                reason: reason.as_str(),
                message,
            }),
            ResolutionResult::Ambiguous { candidates, message, .. } => Err(TurnError::AmbiguousMatch {
                candidates: candidates.into_iter().map(|candidate| candidate.event).collect(),
                message,
            }),
            ResolutionResult::NearMiss {
                candidate,
                distance_ms,
                message,
                ..
            } => Err(TurnError::NearMiss {
                event: Box::new(candidate.event),
                distance_ms,
                message,
            }),
        }
    }

    async fn delete_resolved(&self, principal: &Principal, event: CalendarEvent) -> TurnResponse {
        let action = IntentAction::Remove.as_str();
        match self
            .bounded("calendar delete", self.calendar.delete_event(principal, &event.id))
            .await
        {
            Ok(()) => {
                info!(event_id = %event.id, "event deleted");
                let message = format!(
                    "\"{}\" 일정이 성공적으로 삭제되었습니다. ({})",
                    event.display_title(),
                    event.describe_start(self.tz)
                );
                TurnResponse::message(action, message).with_event(event)
            }
            Err(err) => {
                error!(error = %err, event_id = %event.id, "event deletion failed");
                TurnResponse::message(action, format!("일정 삭제 중 오류가 발생했습니다: {}", collaborator_text(&err)))
            }
        }
    }

    /// Bounds a collaborator call with the configured timeout.
    async fn bounded<T, E>(&self, call: &'static str, future: impl Future<Output = Result<T, E>>) -> Result<T, TurnError>
    where
        TurnError: From<E>,
    {
        match tokio::time::timeout(self.call_timeout, future).await {
            Ok(result) => result.map_err(TurnError::from),
            Err(_) => Err(CollaboratorError::Timeout(call).into()),
        }
    }

    fn respond_with_error(&self, action: IntentAction, err: TurnError) -> TurnResponse {
        let action = action.as_str();
        match err {
            TurnError::Validation(message) => TurnResponse::message(action, message),
            TurnError::NotFound { reason, message } => {
                info!(reason, "no event resolved");
                TurnResponse::message(action, message)
            }
            TurnError::AmbiguousMatch { candidates, message } => {
                info!(count = candidates.len(), "ambiguous event reference");
                let mut response = TurnResponse::message(action, message);
                response.candidates = candidates;
                response
            }
            TurnError::NearMiss {
                event,
                distance_ms,
                message,
            } => {
                info!(event_id = %event.id, distance_ms, "near-miss needs confirmation");
                let mut response = TurnResponse::message(action, message);
                response.confirmation = Some(DeleteConfirmation {
                    event: *event,
                    distance_ms,
                });
                response
            }
            TurnError::Collaborator(err) => {
                error!(error = %err, action, "collaborator call failed");
                TurnResponse::message(action, GENERIC_APOLOGY)
            }
            TurnError::Parse(detail) => {
                warn!(detail = %detail, "classifier payload rejected");
                TurnResponse::message(action, PARSE_FAILURE)
            }
        }
    }
}

fn collaborator_text(err: &TurnError) -> String {
    match err {
        TurnError::Collaborator(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassifierTime {
    At(DateTime<Tz>),
    AllDay(NaiveDate),
}

impl ClassifierTime {
    fn target(self, tz: Tz) -> DateTime<Tz> {
        match self {
            ClassifierTime::At(at) => at,
            ClassifierTime::AllDay(date) => localize(
                tz,
                date.and_hms_opt(date_resolver::DEFAULT_HOUR, date_resolver::DEFAULT_MINUTE, 0)
                    .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN)),
            ),
        }
    }
}

/// RFC 3339, naive local date-time, or a bare date for all-day events.
fn parse_classifier_datetime(raw: &str, tz: Tz) -> Option<ClassifierTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(ClassifierTime::At(parsed.with_timezone(&tz)));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(ClassifierTime::At(localize(tz, naive)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(ClassifierTime::AllDay)
}

fn build_draft(intent: &ClassifiedIntent, tz: Tz) -> Result<EventDraft, TurnError> {
    let title = intent
        .title()
        .ok_or_else(|| TurnError::Validation(MISSING_TITLE.to_string()))?;
    let raw_start = intent
        .start_datetime()
        .ok_or_else(|| TurnError::Validation(MISSING_START.to_string()))?;
    let start = parse_classifier_datetime(raw_start, tz).ok_or_else(|| {
        warn!(raw_start, "unparseable start_datetime");
        TurnError::Validation(INVALID_START.to_string())
    })?;
    let end = intent
        .end_datetime()
        .and_then(|raw| parse_classifier_datetime(raw, tz));

    let (start, end) = match (start, end) {
        (ClassifierTime::At(start), Some(ClassifierTime::At(end))) if end > start => {
            (EventTime::at(start, tz), EventTime::at(end, tz))
        }
        (ClassifierTime::At(start), _) => (
            EventTime::at(start, tz),
            EventTime::at(start + chrono::Duration::hours(1), tz),
        ),
        (ClassifierTime::AllDay(start), Some(ClassifierTime::AllDay(end))) if end > start => {
            (EventTime::all_day(start), EventTime::all_day(end))
        }
        (ClassifierTime::AllDay(start), _) => (
            EventTime::all_day(start),
            EventTime::all_day(start + chrono::Duration::days(1)),
        ),
    };

    Ok(EventDraft {
        title: title.to_string(),
        start,
        end,
        location: optional_text(intent.location.as_deref()),
        description: optional_text(intent.description.as_deref()),
    })
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Seoul;

    fn intent(title: Option<&str>, start: Option<&str>, end: Option<&str>) -> ClassifiedIntent {
        ClassifiedIntent {
            is_calendar_related: true,
            action: IntentAction::Add,
            title: title.map(str::to_string),
            start_datetime: start.map(str::to_string),
            end_datetime: end.map(str::to_string),
            ..ClassifiedIntent::default()
        }
    }

    #[test]
    fn naive_start_defaults_end_to_one_hour() {
        let draft = build_draft(&intent(Some("치과"), Some("2024-06-12T10:00:00"), None), Seoul).unwrap();
        let start = Seoul.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap();
        assert_eq!(draft.start, EventTime::at(start, Seoul));
        assert_eq!(draft.end, EventTime::at(start + chrono::Duration::hours(1), Seoul));
    }

    #[test]
    fn end_before_start_is_replaced() {
        let draft = build_draft(
            &intent(Some("치과"), Some("2024-06-12T10:00"), Some("2024-06-12T09:00")),
            Seoul,
        )
        .unwrap();
        let start = Seoul.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap();
        assert_eq!(draft.end, EventTime::at(start + chrono::Duration::hours(1), Seoul));
    }

    #[test]
    fn rfc3339_start_keeps_instant() {
        let draft = build_draft(
            &intent(Some("call"), Some("2024-06-12T01:00:00Z"), Some("2024-06-12T02:30:00Z")),
            Seoul,
        )
        .unwrap();
        let start = Seoul.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap();
        assert_eq!(draft.start, EventTime::at(start, Seoul));
        assert_eq!(draft.end, EventTime::at(start + chrono::Duration::minutes(90), Seoul));
    }

    #[test]
    fn date_only_is_all_day() {
        let draft = build_draft(&intent(Some("휴가"), Some("2024-06-12"), None), Seoul).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        assert_eq!(draft.start, EventTime::all_day(day));
        assert_eq!(draft.end, EventTime::all_day(day + chrono::Duration::days(1)));
    }

    #[test]
    fn missing_or_bad_fields_are_validation_errors() {
        let missing_title = build_draft(&intent(None, Some("2024-06-12"), None), Seoul).unwrap_err();
        assert!(matches!(missing_title, TurnError::Validation(ref m) if m == MISSING_TITLE));

        let missing_start = build_draft(&intent(Some("치과"), None, None), Seoul).unwrap_err();
        assert!(matches!(missing_start, TurnError::Validation(ref m) if m == MISSING_START));

        let bad_start = build_draft(&intent(Some("치과"), Some("다음 주쯤"), None), Seoul).unwrap_err();
        assert!(matches!(bad_start, TurnError::Validation(ref m) if m == INVALID_START));
    }

    #[test]
    fn all_day_target_uses_default_hour() {
        let parsed = parse_classifier_datetime("2024-06-12", Seoul).unwrap();
        assert_eq!(
            parsed.target(Seoul),
            Seoul.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap()
        );
    }
}
