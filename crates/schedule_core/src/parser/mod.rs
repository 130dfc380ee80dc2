//! Local, rule-based reader for spoken or typed scheduling phrases such as
//! `明天下午两点拜访张总`.
//!
//! Every category (date, time, counterparty, title) is resolved by trying a
//! fixed list of patterns in order; the first hit wins and nothing is scored or
//! backtracked. Anything that does not match simply leaves its field at the
//! default, so any non-blank input yields a record.

mod numerals;

use crate::model::ParsedSchedule;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

const TITLE_MAX_CHARS: usize = 20;
const TITLE_ELLIPSIS: &str = "...";

/// Tested in this order; only the first keyword found is applied.
const RELATIVE_DAYS: [(&str, i64); 4] = [("今天", 0), ("明天", 1), ("后天", 2), ("大后天", 3)];

/// Keywords are matched against the lowercased text, so `Demo` and `DEMO`
/// count as `demo`.
const ACTION_TITLES: [(&[&str], &str); 5] = [
    (&["开会", "会议"], "会议"),
    (&["拜访", "见面"], "拜访"),
    (&["电话", "联系", "沟通"], "电话沟通"),
    (&["演示", "demo"], "产品演示"),
    (&["培训"], "培训"),
];

static RE_MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})月([0-9]{1,2})[日号]").expect("valid date regex"));
static RE_PERIOD_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([上下])午\s*([0-9]{1,2}|[零〇一二两三四五六七八九十]{1,3})\s*[点时]")
        .expect("valid period time regex")
});
static RE_CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})[点时:]([0-9]{2})?").expect("valid clock regex"));
static RE_COUNTERPARTY: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // Lazy so the trailing verb is not swallowed into the name.
        Regex::new(r"和([^\s\p{P}]{2,4}?)[开会见面谈]").expect("valid counterparty regex"),
        Regex::new(r"拜访([^\s\p{P}]{2,4})").expect("valid counterparty regex"),
        Regex::new(r"联系([^\s\p{P}]{2,4})").expect("valid counterparty regex"),
        Regex::new(r"见([^\s\p{P}]{2,4})").expect("valid counterparty regex"),
    ]
});

/// Parses `text` relative to the current local date.
///
/// Returns `None` only when `text` is empty or whitespace.
pub fn parse_schedule(text: &str) -> Option<ParsedSchedule> {
    parse_schedule_on(text, local_today())
}

/// Parses `text` as if today were `today`. Pure: equal inputs give equal output.
pub fn parse_schedule_on(text: &str, today: Date) -> Option<ParsedSchedule> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date = month_day_date(text, today.year())
        .or_else(|| relative_date(text, today))
        .unwrap_or(today);
    let time = period_time(text).or_else(|| clock_time(text));
    let customer_name = counterparty(text);
    let title = action_title(text, customer_name.as_deref())
        .unwrap_or_else(|| truncate_title(trimmed));

    debug!(
        "parsed schedule phrase: date={} time={:?} customer={:?} title={}",
        format_date(date),
        time,
        customer_name,
        title
    );

    Some(ParsedSchedule {
        title,
        date: format_date(date),
        time,
        customer_name,
        description: text.to_string(),
    })
}

/// Today's date in the local offset, falling back to UTC when the offset
/// cannot be determined.
pub fn local_today() -> Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// `YYYY-MM-DD`
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn relative_date(text: &str, today: Date) -> Option<Date> {
    let (keyword, offset) = RELATIVE_DAYS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))?;
    debug!("relative date keyword {keyword} (+{offset}d)");
    today.checked_add(Duration::days(*offset))
}

/// `<month>月<day>日|号` in `year`; ignored when it is not a real calendar date.
fn month_day_date(text: &str, year: i32) -> Option<Date> {
    let captures = RE_MONTH_DAY.captures(text)?;
    let month: u8 = captures[1].parse().ok()?;
    let day: u8 = captures[2].parse().ok()?;
    let month = Month::try_from(month).ok()?;
    match Date::from_calendar_date(year, month, day) {
        Ok(date) => Some(date),
        Err(err) => {
            debug!("ignoring impossible date {}: {err}", &captures[0]);
            None
        }
    }
}

fn period_time(text: &str) -> Option<String> {
    let captures = RE_PERIOD_TIME.captures(text)?;
    let mut hour = numerals::parse_hour(&captures[2])?;
    match &captures[1] {
        "下" if hour < 12 => hour += 12,
        "上" if hour == 12 => hour = 0,
        _ => {}
    }
    format_time(hour, 0)
}

fn clock_time(text: &str) -> Option<String> {
    let captures = RE_CLOCK_TIME.captures(text)?;
    let hour: u32 = captures[1].parse().ok()?;
    let minute: u32 = match captures.get(2) {
        Some(value) => value.as_str().parse().ok()?,
        None => 0,
    };
    format_time(hour, minute)
}

fn format_time(hour: u32, minute: u32) -> Option<String> {
    if hour > 23 || minute > 59 {
        debug!("ignoring out-of-range time {hour}:{minute}");
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}

fn counterparty(text: &str) -> Option<String> {
    RE_COUNTERPARTY
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|captures| captures[1].to_string())
}

fn action_title(text: &str, customer_name: Option<&str>) -> Option<String> {
    let lowered = text.to_lowercase();
    let (_, label) = ACTION_TITLES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))?;
    Some(match customer_name {
        Some(name) => format!("{label} - {name}"),
        None => (*label).to_string(),
    })
}

fn truncate_title(text: &str) -> String {
    if text.chars().count() <= TITLE_MAX_CHARS {
        return text.to_string();
    }
    let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}
