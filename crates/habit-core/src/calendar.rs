use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};

use crate::dates::{add_days, day_index, days_in_month, first_day_of_month};
use crate::habit::Habit;

pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAggregate<'a> {
    pub date: NaiveDate,
    pub completed: Vec<&'a Habit>,
    pub pending: Vec<&'a Habit>,
}

impl DayAggregate<'_> {
    pub fn total(&self) -> usize {
        self.completed.len() + self.pending.len()
    }

    pub fn completion_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed.len() as f64 / total as f64,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.pending.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthStats {
    pub days_in_month: u32,
    pub days_with_completions: u32,
    pub perfect_days: u32,
}

#[derive(Debug, Clone)]
pub struct MonthView<'a> {
    pub year: i32,
    pub month: u32,
    pub days: Vec<(GridCell, DayAggregate<'a>)>,
    pub stats: MonthStats,
}

/// Splits `habits` into those completed on `date` and those still pending,
/// preserving input order in both lists.
pub fn aggregate_for_date(date: NaiveDate, habits: &[Habit]) -> DayAggregate<'_> {
    let (completed, pending) = habits
        .iter()
        .partition(|habit| habit.is_completed_on(date));

    DayAggregate {
        date,
        completed,
        pending,
    }
}

/// Six Monday-first weeks starting at the week that holds the 1st of `month`.
pub fn month_grid(year: i32, month: u32) -> anyhow::Result<Vec<GridCell>> {
    let first = first_day_of_month(year, month)
        .ok_or_else(|| anyhow!("invalid month: {year}-{month:02}"))?;
    let out_of_range = || anyhow!("month grid for {year}-{month:02} is out of range");
    let start = add_days(first, -i64::from(day_index(first))).ok_or_else(out_of_range)?;

    (0..GRID_CELLS)
        .map(|offset| {
            add_days(start, offset as i64).map(|date| GridCell {
                date,
                is_current_month: date.year() == year && date.month() == month,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(out_of_range)
}

#[tracing::instrument(skip(habits), fields(count = habits.len()))]
pub fn month_view(year: i32, month: u32, habits: &[Habit]) -> anyhow::Result<MonthView<'_>> {
    let grid = month_grid(year, month)?;
    let mut stats = MonthStats {
        days_in_month: days_in_month(year, month).unwrap_or_default(),
        ..MonthStats::default()
    };

    let days: Vec<_> = grid
        .into_iter()
        .map(|cell| (cell, aggregate_for_date(cell.date, habits)))
        .collect();

    for (cell, aggregate) in &days {
        if !cell.is_current_month {
            continue;
        }
        if !aggregate.completed.is_empty() {
            stats.days_with_completions += 1;
        }
        if aggregate.is_complete() {
            stats.perfect_days += 1;
        }
    }

    tracing::debug!(
        year,
        month,
        active = stats.days_with_completions,
        perfect = stats.perfect_days,
        "built month view"
    );

    Ok(MonthView {
        year,
        month,
        days,
        stats,
    })
}
