use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::{format_date, parse_date};
use crate::streak::{StreakResult, calculate_streak};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: u64,

    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    pub name: String,

    #[serde(default)]
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub completed_dates: BTreeSet<String>,

    #[serde(default)]
    pub best_streak: u32,
}

impl Habit {
    pub fn new(id: u64, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            name,
            created: now,
            completed_dates: BTreeSet::new(),
            best_streak: 0,
        }
    }

    pub fn is_completed_on(&self, day: NaiveDate) -> bool {
        self.completed_dates
            .iter()
            .any(|raw| parse_date(raw) == Some(day))
    }

    /// Flips completion for `day` and reports whether it is now completed.
    pub fn toggle(&mut self, day: NaiveDate) -> bool {
        if self.is_completed_on(day) {
            self.completed_dates
                .retain(|raw| parse_date(raw) != Some(day));
            false
        } else {
            self.completed_dates.insert(format_date(day));
            true
        }
    }

    pub fn streak(&self, today: NaiveDate) -> StreakResult {
        calculate_streak(&self.completed_dates, today)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};

    use super::Habit;
    use crate::dates::format_date;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut habit = Habit::new(1, "Read".to_string(), Utc::now());
        assert!(habit.toggle(day(2024, 5, 1)));
        assert!(habit.is_completed_on(day(2024, 5, 1)));
        assert!(habit.completed_dates.contains("2024-05-01"));

        assert!(!habit.toggle(day(2024, 5, 1)));
        assert!(habit.completed_dates.is_empty());
    }

    #[test]
    fn toggle_off_removes_unnormalized_entries() {
        let mut habit = Habit::new(1, "Run".to_string(), Utc::now());
        habit.completed_dates.insert("2024-05-01T07:15:00Z".to_string());
        habit.completed_dates.insert("garbage".to_string());

        assert!(habit.is_completed_on(day(2024, 5, 1)));
        assert!(!habit.toggle(day(2024, 5, 1)));
        assert_eq!(habit.completed_dates.len(), 1);
        assert!(habit.completed_dates.contains("garbage"));
    }

    #[test]
    fn deserializes_the_minimal_record() {
        let raw = r#"{"id":3,"name":"Stretch","completedDates":["2024-01-02","2024-01-01"]}"#;
        let habit: Habit = serde_json::from_str(raw).expect("parse habit");
        assert_eq!(habit.id, 3);
        assert_eq!(habit.name, "Stretch");
        assert_eq!(habit.created, DateTime::<Utc>::default());
        assert_eq!(format_date(habit.created), "1970-01-01");
        assert!(!habit.uuid.is_nil());
        assert_eq!(habit.best_streak, 0);
        assert_eq!(habit.streak(day(2024, 1, 3)).current_streak, 2);

        let bare: Habit = serde_json::from_str(r#"{"id":4,"name":"Walk"}"#).expect("parse bare");
        assert!(bare.completed_dates.is_empty());
        assert_ne!(bare.uuid, habit.uuid);
    }

    #[test]
    fn keeps_stored_identity_fields() {
        let raw = r#"{"id":3,"uuid":"6f1c2a36-51a3-4c5e-9a60-2f0d3f1b9a11","name":"Stretch","created":"2024-01-01T00:00:00Z","completedDates":[],"bestStreak":7}"#;
        let habit: Habit = serde_json::from_str(raw).expect("parse habit");
        assert_eq!(habit.uuid.to_string(), "6f1c2a36-51a3-4c5e-9a60-2f0d3f1b9a11");
        assert_eq!(format_date(habit.created), "2024-01-01");
        assert_eq!(habit.best_streak, 7);
    }
}
