use std::sync::LazyLock;

use regex::Regex;

use crate::service::date_resolver::{DATE_KEYWORDS, TIME_OF_DAY_PATTERNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Delete,
    Query,
}

const DELETE_VERBS: &str = r"삭제|제거|취소|지워|지우|없애|delete|remove|cancel";

// Tried in order; the first non-empty capture wins.
static DELETE_TEMPLATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)^(.+?)\s*일정\s*(?:을|를)?\s*(?:{DELETE_VERBS})"),
        format!(r"(?i)^(.+?)\s*(?:을|를)\s*(?:{DELETE_VERBS})"),
        format!(r"(?i)^(.+?)\s+(?:{DELETE_VERBS})"),
        format!(
            r"(?i)(?:{DELETE_VERBS})(?:\s*해\s*주세요|\s*해\s*줘|\s*해|\s*줘)?\s*[:：]?\s*(?:my\s+|the\s+)?(.+?)\s*(?:일정|약속|event)?\s*[.!?]*$"
        ),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static QUERY_TEMPLATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(.+?)\s*(?:일정)?\s*(?:이|가|은|는)?\s*(?:언제|몇\s*시|있어|있니|있나|있지|있는지|뭐|알려|보여|확인)",
        r"(?i)(?:when\s+is|what\s+time\s+is|show(?:\s+me)?|find)\s+(?:my\s+|the\s+)?(.+?)\s*[.!?]*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Pulls the event-title fragment out of a raw utterance. An empty result
/// means "no title constraint".
pub fn extract(utterance: &str, mode: ExtractionMode) -> String {
    let templates = match mode {
        ExtractionMode::Delete => &*DELETE_TEMPLATES,
        ExtractionMode::Query => &*QUERY_TEMPLATES,
    };

    let utterance = utterance.trim();
    let Some(fragment) = templates.iter().find_map(|template| {
        template
            .captures(utterance)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|captured| !captured.is_empty())
    }) else {
        return String::new();
    };

    strip_date_and_time(fragment)
}

/// Removes time-of-day and date-keyword substrings, then tidies whitespace.
pub fn strip_date_and_time(fragment: &str) -> String {
    let mut cleaned = fragment.to_string();
    for pattern in TIME_OF_DAY_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    cleaned = DATE_KEYWORDS.replace_all(&cleaned, " ").into_owned();
    WHITESPACE.replace_all(cleaned.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_strips_date_and_time() {
        assert_eq!(extract("내일 3시 팀 미팅 삭제해줘", ExtractionMode::Delete), "팀 미팅");
    }

    #[test]
    fn delete_keeps_the_noun_phrase() {
        assert_eq!(
            extract("아빠랑 해운대 약속 삭제해줘", ExtractionMode::Delete),
            "아빠랑 해운대 약속"
        );
    }

    #[test]
    fn delete_drops_generic_schedule_word() {
        assert_eq!(
            extract("다음 주 금요일 치과 일정 취소해 주세요", ExtractionMode::Delete),
            "치과"
        );
        assert_eq!(extract("오늘 저녁 7시에 돈호 약속을 지워줘", ExtractionMode::Delete), "돈호 약속");
    }

    #[test]
    fn delete_with_verb_first() {
        assert_eq!(extract("삭제해줘: 주간 회의", ExtractionMode::Delete), "주간 회의");
        assert_eq!(extract("delete my team sync tomorrow", ExtractionMode::Delete), "team sync");
    }

    #[test]
    fn delete_with_only_date_yields_empty() {
        assert_eq!(extract("내일 3시 일정 삭제해줘", ExtractionMode::Delete), "");
    }

    #[test]
    fn query_templates() {
        assert_eq!(extract("내일 팀 미팅 언제야?", ExtractionMode::Query), "팀 미팅");
        assert_eq!(extract("치과 예약이 몇 시지", ExtractionMode::Query), "치과 예약");
        assert_eq!(
            extract("when is my dentist appointment tomorrow?", ExtractionMode::Query),
            "dentist appointment"
        );
        assert_eq!(extract("오늘 일정 알려줘", ExtractionMode::Query), "");
    }

    #[test]
    fn no_template_match_is_empty() {
        assert_eq!(extract("안녕하세요", ExtractionMode::Delete), "");
        assert_eq!(extract("안녕하세요", ExtractionMode::Query), "");
    }
}
