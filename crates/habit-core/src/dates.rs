use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::config::Config;

const TIMEZONE_CONFIG_FILE: &str = "habit-time.toml";
const TIMEZONE_ENV_VAR: &str = "HABIT_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "HABIT_TIME_CONFIG";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that names a calendar day. Timestamps are moved to UTC before
/// the day is taken, so the result never depends on the host timezone.
pub trait ToDay {
    fn to_day(&self) -> NaiveDate;
}

impl ToDay for NaiveDate {
    fn to_day(&self) -> NaiveDate {
        *self
    }
}

impl ToDay for DateTime<Utc> {
    fn to_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl ToDay for DateTime<FixedOffset> {
    fn to_day(&self) -> NaiveDate {
        self.with_timezone(&Utc).date_naive()
    }
}

impl<T: ToDay + ?Sized> ToDay for &T {
    fn to_day(&self) -> NaiveDate {
        (**self).to_day()
    }
}

#[must_use]
pub fn format_date<D: ToDay>(date: D) -> String {
    date.to_day().format(DATE_FORMAT).to_string()
}

/// Parses a stored completion date. Unrecognized input yields `None`.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, DATE_FORMAT) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.to_day());
    }

    NaiveDateTime::parse_from_str(token, "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|ndt| ndt.date())
}

#[must_use]
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(format_date)
}

/// Monday = 0 ... Sunday = 6.
#[must_use]
pub fn day_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// The Monday-first week holding `base`, or `None` when part of that week
/// falls outside the representable date range.
#[must_use]
pub fn week_dates(base: NaiveDate) -> Option<[NaiveDate; 7]> {
    let monday = add_days(base, -i64::from(day_index(base)))?;
    let days: Vec<NaiveDate> = monday.iter_days().take(7).collect();
    days.try_into().ok()
}

/// Whole calendar days from `a` to `b`; positive when `b` is later.
#[must_use]
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    b.signed_duration_since(a).num_days()
}

#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

#[must_use]
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;

    let Some(max_day) = days_in_month(year, month) else {
        return date;
    };
    NaiveDate::from_ymd_opt(year, month, date.day().min(max_day)).unwrap_or(date)
}

#[must_use]
pub fn first_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = first_day_of_month(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (first.year().checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    first_day_of_month(next_year, next_month)?.pred_opt()
}

#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    last_day_of_month(year, month).map(|date| date.day())
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_day_expr(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "today" => return Ok(today),
        "yesterday" => return offset_day(today, -1),
        "tomorrow" => return offset_day(today, 1),
        _ => {}
    }

    if let Some(weekday) = parse_weekday_name(&lower) {
        let week = week_dates(today)
            .ok_or_else(|| anyhow!("week of {today} is out of range"))?;
        return Ok(week[weekday.num_days_from_monday() as usize]);
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    if let Some(caps) = rel_re.captures(&lower) {
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let unit = caps
            .name("unit")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative unit"))?;

        let days = match unit {
            "d" => num,
            "w" => num.saturating_mul(7),
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return offset_day(today, if sign == "-" { -days } else { days });
    }

    if let Some(date) = parse_date(token) {
        return Ok(date);
    }

    Err(anyhow!("unrecognized day expression: {input}")).with_context(|| {
        "supported formats: today/yesterday/tomorrow, weekday names (e.g. \
         monday, within the current week), +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD, \
         RFC3339, YYYYMMDDTHHMMSSZ"
    })
}

fn offset_day(today: NaiveDate, days: i64) -> anyhow::Result<NaiveDate> {
    add_days(today, days).ok_or_else(|| anyhow!("{days} days from {today} is out of range"))
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

#[must_use]
pub fn today_in(tz: &Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}

#[tracing::instrument(skip(cfg))]
pub fn resolve_timezone(cfg: &Config) -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(raw) = cfg.get("timezone")
        && let Some(tz) = parse_timezone(&raw, "config:timezone")
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    tracing::debug!("no timezone configured; using UTC");
    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed reading timezone config file"
            );
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed parsing timezone config file"
            );
            return None;
        }
    };

    let Some(timezone) = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone))
    else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(&timezone, &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(
                source,
                timezone = %trimmed,
                error = %err,
                "failed to parse timezone id"
            );
            None
        }
    }
}
