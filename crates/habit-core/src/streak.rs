use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::dates::{days_between, parse_date};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResult {
    pub current_streak: u32,
    pub best_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    #[serde(flatten)]
    pub streak: StreakResult,
    pub total_days: u32,
    pub last_completed: Option<NaiveDate>,
}

/// Computes the current and best run of consecutive completed days.
///
/// The current streak stays alive while the latest completion is `today` or
/// the day before; unparseable entries are skipped and duplicates collapse.
pub fn calculate_streak<I>(completed_dates: I, today: NaiveDate) -> StreakResult
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    streak_from_days(&collect_days(completed_dates), today)
}

pub fn habit_stats<I>(completed_dates: I, today: NaiveDate) -> HabitStats
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let days = collect_days(completed_dates);
    HabitStats {
        streak: streak_from_days(&days, today),
        total_days: u32::try_from(days.len()).unwrap_or(u32::MAX),
        last_completed: days.last().copied(),
    }
}

pub fn streak_from_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakResult {
    let mut best_streak = 0_u32;
    let mut temp_streak = 0_u32;
    let mut last: Option<NaiveDate> = None;

    for &day in days {
        temp_streak = match last {
            None => 1,
            Some(prev) => match days_between(prev, day) {
                0 => temp_streak,
                1 => temp_streak.saturating_add(1),
                _ => 1,
            },
        };
        best_streak = best_streak.max(temp_streak);
        last = Some(day);
    }

    let current_streak = match last {
        Some(latest) if latest == today || Some(latest) == today.pred_opt() => temp_streak,
        _ => 0,
    };

    StreakResult {
        current_streak,
        best_streak: best_streak.max(current_streak),
    }
}

fn collect_days<I>(completed_dates: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut days = BTreeSet::new();
    for raw in completed_dates {
        let raw = raw.as_ref();
        match parse_date(raw) {
            Some(day) => {
                days.insert(day);
            }
            None => warn!(value = %raw, "skipping malformed completion date"),
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{StreakResult, calculate_streak, habit_stats};
    use crate::dates::{add_days, format_date};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn days_ago(offsets: &[i64]) -> Vec<String> {
        offsets
            .iter()
            .map(|offset| format_date(add_days(today(), -offset).expect("in range")))
            .collect()
    }

    fn streak(current_streak: u32, best_streak: u32) -> StreakResult {
        StreakResult {
            current_streak,
            best_streak,
        }
    }

    #[test]
    fn empty_set_has_no_streak() {
        let none: Vec<String> = vec![];
        assert_eq!(calculate_streak(&none, today()), streak(0, 0));
    }

    #[test]
    fn only_today() {
        assert_eq!(calculate_streak(days_ago(&[0]), today()), streak(1, 1));
    }

    #[test]
    fn five_days_ending_today() {
        assert_eq!(
            calculate_streak(days_ago(&[4, 3, 2, 1, 0]), today()),
            streak(5, 5)
        );
    }

    #[test]
    fn isolated_old_day_breaks_current() {
        assert_eq!(calculate_streak(days_ago(&[10]), today()), streak(0, 1));
    }

    #[test]
    fn gap_between_two_runs() {
        assert_eq!(
            calculate_streak(days_ago(&[5, 4, 1, 0]), today()),
            streak(2, 2)
        );
    }

    #[test]
    fn yesterday_keeps_streak_alive() {
        assert_eq!(
            calculate_streak(days_ago(&[3, 2, 1]), today()),
            streak(3, 3)
        );
    }

    #[test]
    fn best_streak_survives_a_shorter_current_run() {
        assert_eq!(
            calculate_streak(days_ago(&[20, 19, 18, 17, 0]), today()),
            streak(1, 4)
        );
    }

    #[test]
    fn unsorted_duplicate_and_malformed_input() {
        let mut dates = days_ago(&[0, 2, 1, 1]);
        dates.push("not-a-date".to_string());
        dates.push(String::new());
        let three_ago = add_days(today(), -3).expect("in range");
        dates.push(format!("{}T23:59:00Z", format_date(three_ago)));
        assert_eq!(calculate_streak(&dates, today()), streak(4, 4));
    }

    #[test]
    fn future_completion_is_not_current() {
        assert_eq!(calculate_streak(days_ago(&[0, -1]), today()), streak(0, 2));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let dates = days_ago(&[6, 5, 2, 1]);
        let first = calculate_streak(&dates, today());
        let second = calculate_streak(&dates, today());
        assert_eq!(first, second);
        assert_eq!(dates, days_ago(&[6, 5, 2, 1]));
    }

    #[test]
    fn month_and_leap_day_boundaries_are_consecutive() {
        let dates = ["2024-02-28", "2024-02-29", "2024-03-01"];
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).expect("valid date");
        assert_eq!(calculate_streak(dates, today), streak(3, 3));

        let dates = ["2023-12-31", "2024-01-01"];
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        assert_eq!(calculate_streak(dates, today), streak(2, 2));
    }

    #[test]
    fn every_two_week_pattern_respects_invariants() {
        for mask in 0_u32..(1 << 14) {
            let offsets: Vec<i64> = (0_i64..14)
                .filter(|bit| mask & (1_u32 << bit) != 0)
                .collect();
            let result = calculate_streak(days_ago(&offsets), today());
            assert!(result.best_streak >= result.current_streak, "mask {mask:#b}");

            let anchor = if mask & 1 != 0 { 0_u32 } else { 1 };
            let expected_current = (anchor..14)
                .take_while(|bit| mask & (1_u32 << bit) != 0)
                .count() as u32;
            assert_eq!(result.current_streak, expected_current, "mask {mask:#b}");
        }
    }

    #[test]
    fn stats_count_distinct_valid_days() {
        let mut dates = days_ago(&[9, 1, 0]);
        dates.push(format_date(today()));
        dates.push("bogus".to_string());
        let stats = habit_stats(&dates, today());
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.last_completed, Some(today()));
        assert_eq!(stats.streak, streak(2, 2));
    }
}
