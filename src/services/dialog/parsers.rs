//! Pure utterance parsers for the intake fields.
//!
//! Every parser maps free speech-recognition text to `Some(value)` or `None`;
//! none of them panic or error on any input, since utterances are fully
//! untrusted. Clock-dependent parsers take `now`/`today` as arguments so
//! tests can pin the calendar.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::PhoneNumber;

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[\s./-](\d{1,2})[\s./-](\d{4})\b").unwrap());

static CLOCK_MERIDIEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)\b").unwrap());

static CLOCK_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());

static AT_HOUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2})\b").unwrap());

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Normalize whitespace and title-case each token. Empty-after-trim is not
/// recognized; anything else is.
pub fn parse_name(text: &str) -> Option<String> {
    let name = text
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Capitalize free text that didn't match any reason keyword. The reason
/// field accepts anything non-empty verbatim.
pub fn capitalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(title_case_first(trimmed))
}

fn title_case_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Date of birth: numeric day-month-year or a month-name phrase like
/// "May 15 1980". Must be a real date, year 1900..=current, strictly before
/// today.
pub fn parse_dob(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let date = parse_numeric_date(text).or_else(|| parse_spoken_date(text, None))?;
    if date.year() < 1900 || date.year() > today.year() || date >= today {
        return None;
    }
    Some(date)
}

fn parse_numeric_date(text: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_DATE.captures(text)?;
    let a: u32 = caps[1].parse().ok()?;
    let b: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    // Day-month-year first (the prompt asks for that order); swap when the
    // middle number can't be a month.
    NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
}

/// Month-name date: "May 15 1980", "15 May 1980", "March 3rd". With
/// `default_year` set, a missing year resolves to it.
fn parse_spoken_date(text: &str, default_year: Option<i32>) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let month = tokens.iter().find_map(|t| month_number(t))?;

    let mut year: Option<i32> = None;
    let mut day: Option<u32> = None;
    for token in &tokens {
        let digits = strip_ordinal(token);
        if let Ok(n) = digits.parse::<i64>() {
            if (1000..=9999).contains(&n) && year.is_none() {
                year = Some(n as i32);
            } else if (1..=31).contains(&n) && day.is_none() {
                day = Some(n as u32);
            }
        }
    }

    NaiveDate::from_ymd_opt(year.or(default_year)?, month, day?)
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == token)
        .map(|i| i as u32 + 1)
}

fn strip_ordinal(token: &str) -> &str {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
                return stem;
            }
        }
    }
    token
}

/// Appointment date and time. Recognizes relative days (today, tomorrow, day
/// after tomorrow), weekday names (next future occurrence), month-name and
/// numeric dates, and clock times ("10 am", "14:30", "at 3"). A date without
/// a time defaults to `default_hour`; a time without a date lands on the next
/// occurrence of that time. Anything that can't resolve to a future instant
/// is not recognized. Minute resolution.
pub fn parse_appointment(text: &str, now: NaiveDateTime, default_hour: u32) -> Option<NaiveDateTime> {
    let lowered = text.to_lowercase();
    let today = now.date();

    let date = if lowered.contains("day after tomorrow") {
        Some(today + Duration::days(2))
    } else if lowered.contains("tomorrow") {
        Some(today + Duration::days(1))
    } else if lowered.contains("today") || lowered.contains("tonight") {
        Some(today)
    } else if let Some(weekday) = find_weekday(&lowered) {
        Some(next_weekday(today, weekday))
    } else {
        parse_numeric_date(&lowered)
            .or_else(|| parse_spoken_date(&lowered, Some(today.year())))
            .map(|d| {
                // Future bias for yearless phrases: "March 3" said in June
                // means next March.
                if d < today && d.year() == today.year() && !lowered.contains(&d.year().to_string())
                {
                    d.with_year(d.year() + 1).unwrap_or(d)
                } else {
                    d
                }
            })
    };

    let time = parse_clock(&lowered);

    let candidate = match (date, time) {
        (Some(d), Some(t)) => d.and_time(t),
        (Some(d), None) => d.and_time(NaiveTime::from_hms_opt(default_hour, 0, 0)?),
        (None, Some(t)) => {
            // Bare time: today if still ahead, otherwise tomorrow.
            let at = today.and_time(t);
            if at > now {
                at
            } else {
                (today + Duration::days(1)).and_time(t)
            }
        }
        (None, None) => return None,
    };

    if candidate <= now {
        return None;
    }
    // Minute resolution.
    Some(candidate.with_second(0)?.with_nanosecond(0)?)
}

fn parse_clock(lowered: &str) -> Option<NaiveTime> {
    if let Some(caps) = CLOCK_MERIDIEM.captures(lowered) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let pm = caps[3].starts_with('p');
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    if let Some(caps) = CLOCK_24H.captures(lowered) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    if lowered.contains("noon") {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if lowered.contains("morning") {
        return NaiveTime::from_hms_opt(10, 0, 0);
    }
    if lowered.contains("afternoon") {
        return NaiveTime::from_hms_opt(15, 0, 0);
    }
    if lowered.contains("evening") {
        return NaiveTime::from_hms_opt(18, 0, 0);
    }
    if let Some(caps) = AT_HOUR.captures(lowered) {
        let hour: u32 = caps[1].parse().ok()?;
        if hour > 23 {
            return None;
        }
        // "at 3" in clinic hours means 15:00; "at 9" stays morning.
        let hour = if hour < 8 { hour + 12 } else { hour };
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }
    None
}

fn find_weekday(lowered: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| lowered.contains(name))
        .map(|(_, wd)| *wd)
}

/// Next strictly-future occurrence of a weekday: saying "Monday" on a Monday
/// means next week.
fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(ahead as i64)
}

/// US phone number. Strips everything but digits, validates against the NANP
/// digit rules, then falls back to pure length checks: exactly 10 digits is
/// a national number, 11 digits with a leading 1 already carries the country
/// code. Everything else is not recognized.
pub fn parse_phone(text: &str) -> Option<PhoneNumber> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return None,
    };

    if !is_valid_nanp(national) {
        tracing::debug!(digits = %national, "number fails NANP rules, accepting by length");
    }

    Some(PhoneNumber {
        e164: format!("+1{national}"),
        spoken: format!("{} {} {}", &national[..3], &national[3..6], &national[6..]),
    })
}

/// NANP: area code and exchange code must not begin with 0 or 1.
fn is_valid_nanp(national: &str) -> bool {
    let bytes = national.as_bytes();
    bytes.len() == 10 && bytes[0] >= b'2' && bytes[3] >= b'2'
}
