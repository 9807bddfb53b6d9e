//! Turns Korean/English relative date expressions ("내일", "다음 주 금요일",
//! "8월 3일 오후 3시") into a concrete local instant.
//!
//! Every computation is relative to the `now` handed in; nothing here reads
//! the clock.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;

pub const DEFAULT_HOUR: u32 = 9;
pub const DEFAULT_MINUTE: u32 = 0;
pub const DEFAULT_KEYWORD: &str = "오늘";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstant {
    pub at: DateTime<Tz>,
    /// The date expression that produced `at`, for echoing back to the user.
    pub keyword: String,
    /// False when neither a date nor a time token was recognised.
    pub explicit: bool,
}

impl ResolvedInstant {
    pub fn timezone(&self) -> Tz {
        self.at.timezone()
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.at.with_timezone(&Utc)
    }
}

const MONTH_NAMES: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const WEEKDAY_NAMES: &str = r"monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues?|wed|thu(?:rs?)?|fri|sat|sun";

static KOREAN_MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})\s*일").unwrap());
static ENGLISH_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTH_NAMES})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b")).unwrap()
});
static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)([월화수목금토일])\s*(?:요일|욜)|\b({WEEKDAY_NAMES})\b")).unwrap()
});
static NEXT_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)다음\s*주|next\s*week").unwrap());
static THIS_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)이번\s*주|this\s*week").unwrap());
static DAY_AFTER_TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)모레|day\s*after\s*tomorrow").unwrap());
static TOMORROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)내일|tomorrow").unwrap());
static TODAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)오늘|today|tonight").unwrap());

static KOREAN_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(오전|오후|아침|낮|저녁|밤|새벽)\s*)?(\d{1,2})\s*시(?:\s*(\d{1,2})\s*분|\s*(반))?").unwrap()
});
static COLON_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(오전|오후|아침|낮|저녁|밤|새벽)\s*)?(\d{1,2}):(\d{2})(?:\s*(am|pm)\b)?").unwrap()
});
static ENGLISH_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*(am|pm)\b").unwrap());

/// Same vocabulary as the resolver, used to scrub date words out of a title.
pub(crate) static DATE_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:다음\s*주|이번\s*주|next\s*week|this\s*week|\d{{1,2}}\s*월\s*\d{{1,2}}\s*일|[월화수목금토일]\s*(?:요일|욜)|모레|내일|오늘|day\s*after\s*tomorrow|tomorrow|today|tonight|\b(?:{MONTH_NAMES})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?\b|\b(?:{WEEKDAY_NAMES})\b)(?:\s*에\b)?"
    ))
    .unwrap()
});

/// Time-of-day patterns, each optionally followed by the particle "에".
pub(crate) static TIME_OF_DAY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [&*KOREAN_TIME, &*COLON_TIME, &*ENGLISH_TIME]
        .iter()
        .map(|re| Regex::new(&format!(r"(?:{})(?:\s*에\b)?", re.as_str())).unwrap())
        .collect()
});

pub fn resolve(expression: &str, now: DateTime<Tz>) -> ResolvedInstant {
    let text = expression.to_lowercase();
    let (date, keyword, date_explicit) = match resolve_date(&text, now) {
        Some((date, keyword)) => (date, keyword, true),
        None => (now.date_naive(), DEFAULT_KEYWORD.to_string(), false),
    };
    let (time, time_explicit) = match extract_time_of_day(&text) {
        Some(time) => (time, true),
        None => (default_time(), false),
    };

    ResolvedInstant {
        at: localize(now.timezone(), date.and_time(time)),
        keyword,
        explicit: date_explicit || time_explicit,
    }
}

/// Full local day containing `instant`, as a half-open UTC window.
pub fn day_window(instant: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = instant.timezone();
    let day = instant.date_naive();
    let start = localize(tz, day.and_time(NaiveTime::MIN));
    let end = localize(tz, (day + Duration::days(1)).and_time(NaiveTime::MIN));
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

fn resolve_date(text: &str, now: DateTime<Tz>) -> Option<(NaiveDate, String)> {
    let today = now.date_naive();

    if let Some(caps) = KOREAN_MONTH_DAY.captures(text) {
        let month = caps[1].parse().ok();
        let day = caps[2].parse().ok();
        if let Some(date) = month.zip(day).and_then(|(m, d)| next_month_day(now, m, d)) {
            return Some((date, caps[0].to_string()));
        }
    }
    if let Some(caps) = ENGLISH_MONTH_DAY.captures(text) {
        let month = month_from_name(&caps[1]);
        let day = caps[2].parse().ok();
        if let Some(date) = month.zip(day).and_then(|(m, d)| next_month_day(now, m, d)) {
            return Some((date, caps[0].to_string()));
        }
    }

    let next_week = NEXT_WEEK.find(text);
    if let Some((weekday, matched)) = find_weekday(text) {
        let offset = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64
            + 7)
            % 7;
        let mut date = today + Duration::days(offset);
        let mut keyword = matched;
        if let Some(qualifier) = next_week {
            date += Duration::days(7);
            keyword = format!("{} {}", qualifier.as_str(), keyword);
        }
        return Some((date, keyword));
    }

    if let Some(m) = DAY_AFTER_TOMORROW.find(text) {
        return Some((today + Duration::days(2), m.as_str().to_string()));
    }
    if let Some(m) = TOMORROW.find(text) {
        return Some((today + Duration::days(1), m.as_str().to_string()));
    }
    if let Some(m) = TODAY.find(text) {
        return Some((today, m.as_str().to_string()));
    }
    if let Some(m) = next_week {
        return Some((today + Duration::days(7), m.as_str().to_string()));
    }
    if let Some(m) = THIS_WEEK.find(text) {
        return Some((today, m.as_str().to_string()));
    }
    None
}

/// Month/day applied to `now`; rolls into a later year when the result
/// would fall strictly before `now`.
fn next_month_day(now: DateTime<Tz>, month: u32, day: u32) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(now.year(), month, day)?;
    if candidate.and_time(now.time()) >= now.naive_local() {
        return Some(candidate);
    }
    (1..=4).find_map(|offset| NaiveDate::from_ymd_opt(now.year() + offset, month, day))
}

fn find_weekday(text: &str) -> Option<(Weekday, String)> {
    let caps = WEEKDAY.captures(text)?;
    let weekday = if let Some(korean) = caps.get(1) {
        match korean.as_str() {
            "월" => Weekday::Mon,
            "화" => Weekday::Tue,
            "수" => Weekday::Wed,
            "목" => Weekday::Thu,
            "금" => Weekday::Fri,
            "토" => Weekday::Sat,
            _ => Weekday::Sun,
        }
    } else {
        let english = caps.get(2)?.as_str();
        match &english[..3] {
            "mon" => Weekday::Mon,
            "tue" => Weekday::Tue,
            "wed" => Weekday::Wed,
            "thu" => Weekday::Thu,
            "fri" => Weekday::Fri,
            "sat" => Weekday::Sat,
            _ => Weekday::Sun,
        }
    };
    Some((weekday, caps[0].to_string()))
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn extract_time_of_day(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = KOREAN_TIME.captures(text) {
        let hour: u32 = caps[2].parse().ok()?;
        let minute = match (caps.get(3), caps.get(4)) {
            (Some(m), _) => m.as_str().parse().ok()?,
            (None, Some(_)) => 30,
            (None, None) => DEFAULT_MINUTE,
        };
        let marker = caps.get(1).map(|m| m.as_str());
        return build_time(hour, minute, marker);
    }
    if let Some(caps) = COLON_TIME.captures(text) {
        let hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = caps[3].parse().ok()?;
        let marker = caps.get(4).or(caps.get(1)).map(|m| m.as_str());
        return build_time(hour, minute, marker);
    }
    if let Some(caps) = ENGLISH_TIME.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        return build_time(hour, DEFAULT_MINUTE, Some(&caps[2]));
    }
    None
}

fn build_time(hour: u32, minute: u32, marker: Option<&str>) -> Option<NaiveTime> {
    let hour = match marker {
        Some("오후" | "낮" | "저녁" | "밤" | "pm") if hour < 12 => hour + 12,
        Some("오전" | "아침" | "새벽" | "am") if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_HOUR, DEFAULT_MINUTE, 0).unwrap_or(NaiveTime::MIN)
}

pub(crate) fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
