//! Locates the single calendar event a fuzzy reference points at.
//!
//! Tiers run strictly in order and stop at the first success: exact title,
//! title substring, title token overlap, then time proximity. The matcher
//! works on an already-fetched event list and has no side effects beyond
//! logging.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::event::CalendarEvent;
use crate::service::date_resolver::ResolvedInstant;

/// Two hours. Candidates further than this from the target are near-misses.
pub const NEAR_MISS_THRESHOLD_MS: i64 = 7_200_000;
pub const HINT_LIST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    ExactTitle,
    SubstringTitle,
    TokenOverlap,
    TimeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    NoEventsOnDate,
    NoMatchByTitleOrTime,
    MultipleMatches,
    TimeTooFar,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NoEventsOnDate => "no-events-on-date",
            ReasonCode::NoMatchByTitleOrTime => "no-match-by-title-or-time",
            ReasonCode::MultipleMatches => "multiple-matches",
            ReasonCode::TimeTooFar => "time-too-far",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub event: CalendarEvent,
    /// Absolute distance from the target; `None` when the event has no usable start.
    pub distance_ms: Option<i64>,
    pub tier: MatchTier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Found(MatchCandidate),
    NotFound {
        reason: ReasonCode,
        message: String,
    },
    Ambiguous {
        reason: ReasonCode,
        candidates: Vec<MatchCandidate>,
        message: String,
    },
    NearMiss {
        reason: ReasonCode,
        candidate: MatchCandidate,
        distance_ms: i64,
        message: String,
    },
}

pub fn match_event(
    events: &[CalendarEvent],
    title_hint: &str,
    target: &ResolvedInstant,
) -> ResolutionResult {
    if events.is_empty() {
        return ResolutionResult::NotFound {
            reason: ReasonCode::NoEventsOnDate,
            message: format!("{}에는 등록된 일정이 없습니다.", target.keyword),
        };
    }

    let tz = target.timezone();
    let target_utc = target.utc();
    let hint = title_hint.trim();

    if !hint.is_empty() {
        let folded_hint = hint.to_lowercase();

        if let Some(event) = events
            .iter()
            .find(|event| folded_title(event).as_deref() == Some(folded_hint.as_str()))
        {
            debug!(event_id = %event.id, "exact title match");
            return ResolutionResult::Found(candidate(event, MatchTier::ExactTitle, tz, target_utc));
        }

        let mut tier = MatchTier::SubstringTitle;
        let mut matched: Vec<&CalendarEvent> = events
            .iter()
            .filter(|event| {
                folded_title(event).is_some_and(|title| title.contains(folded_hint.as_str()))
            })
            .collect();

        if matched.is_empty() {
            tier = MatchTier::TokenOverlap;
            let terms: Vec<&str> = folded_hint.split_whitespace().collect();
            matched = events
                .iter()
                .filter(|event| {
                    folded_title(event)
                        .is_some_and(|title| terms.iter().any(|term| title.contains(term)))
                })
                .collect();
        }

        debug!(hint, ?tier, matches = matched.len(), "title tiers evaluated");
        match matched.as_slice() {
            [] => debug!(hint, "no title match, falling back to time proximity"),
            [only] => return ResolutionResult::Found(candidate(only, tier, tz, target_utc)),
            _ => return break_tie_by_time(&matched, tier, hint, tz, target_utc),
        }
    }

    resolve_by_time(events, hint, target)
}

/// Several title matches: the closest one wins if it lies within the threshold.
fn break_tie_by_time(
    matched: &[&CalendarEvent],
    tier: MatchTier,
    hint: &str,
    tz: Tz,
    target_utc: DateTime<Utc>,
) -> ResolutionResult {
    let candidates: Vec<MatchCandidate> = matched
        .iter()
        .map(|event| candidate(event, tier, tz, target_utc))
        .collect();

    let mut closest: Option<(&MatchCandidate, i64)> = None;
    for c in &candidates {
        let Some(distance) = c.distance_ms else {
            warn!(event_id = %c.event.id, "skipping event without a usable start");
            continue;
        };
        // Strict comparison keeps the first-seen event on exact ties.
        if closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((c, distance));
        }
    }

    if let Some((best, distance)) = closest.filter(|(_, distance)| *distance <= NEAR_MISS_THRESHOLD_MS) {
        debug!(event_id = %best.event.id, distance_ms = distance, "time tie-break picked the closest candidate");
        return ResolutionResult::Found(best.clone());
    }

    let mut message = format!(
        "\"{}\"와(과) 일치하는 일정이 {}개 있습니다. 어떤 일정인지 시간이나 제목을 더 구체적으로 알려주세요.",
        hint,
        candidates.len()
    );
    for c in &candidates {
        message.push_str(&format!("\n- {} ({})", c.event.display_title(), c.event.describe_start(tz)));
    }

    ResolutionResult::Ambiguous {
        reason: ReasonCode::MultipleMatches,
        candidates,
        message,
    }
}

fn resolve_by_time(events: &[CalendarEvent], hint: &str, target: &ResolvedInstant) -> ResolutionResult {
    let tz = target.timezone();
    let target_utc = target.utc();

    let mut closest: Option<(&CalendarEvent, i64)> = None;
    for event in events {
        let Some(start) = event.start_instant(tz) else {
            warn!(event_id = %event.id, "skipping event without a usable start");
            continue;
        };
        let distance = (start - target_utc).num_milliseconds().abs();
        // Strict comparison keeps the first-seen event on exact ties.
        if closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((event, distance));
        }
    }

    match closest {
        Some((event, distance)) if distance <= NEAR_MISS_THRESHOLD_MS => {
            debug!(event_id = %event.id, distance_ms = distance, "matched by time proximity");
            ResolutionResult::Found(MatchCandidate {
                event: event.clone(),
                distance_ms: Some(distance),
                tier: MatchTier::TimeOnly,
            })
        }
        Some((event, distance)) => {
            debug!(event_id = %event.id, distance_ms = distance, "closest event exceeds threshold");
            let message = format!(
                "요청한 시간에 가장 가까운 일정은 \"{}\" ({})이지만 {} 차이가 납니다. 이 일정이 맞다면 삭제를 확인해주세요.",
                event.display_title(),
                event.describe_start(tz),
                format_gap(distance)
            );
            ResolutionResult::NearMiss {
                reason: ReasonCode::TimeTooFar,
                candidate: MatchCandidate {
                    event: event.clone(),
                    distance_ms: Some(distance),
                    tier: MatchTier::TimeOnly,
                },
                distance_ms: distance,
                message,
            }
        }
        None => {
            let mut message = if hint.is_empty() {
                "요청한 시간에 해당하는 일정을 찾지 못했습니다.".to_string()
            } else {
                format!("\"{}\" 일정을 찾지 못했습니다.", hint)
            };
            message.push_str(" 해당 날짜의 일정:");
            for event in events.iter().take(HINT_LIST_LIMIT) {
                message.push_str(&format!("\n- {} ({})", event.display_title(), event.describe_start(tz)));
            }
            ResolutionResult::NotFound {
                reason: ReasonCode::NoMatchByTitleOrTime,
                message,
            }
        }
    }
}

fn candidate(event: &CalendarEvent, tier: MatchTier, tz: Tz, target_utc: DateTime<Utc>) -> MatchCandidate {
    MatchCandidate {
        event: event.clone(),
        distance_ms: event
            .start_instant(tz)
            .map(|start| (start - target_utc).num_milliseconds().abs()),
        tier,
    }
}

fn folded_title(event: &CalendarEvent) -> Option<String> {
    event
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_lowercase)
}

/// "3시간 0분" style gap, truncated to whole minutes.
pub fn format_gap(distance_ms: i64) -> String {
    let minutes = distance_ms / 60_000;
    format!("{}시간 {}분", minutes / 60, minutes % 60)
}
