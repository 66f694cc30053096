use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument};

use super::{parse_id, sort_habits};
use crate::calendar::{aggregate_for_date, month_view};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::dates::{add_days, normalize_date, parse_day_expr, shift_months, week_dates};
use crate::habit::Habit;
use crate::render::Renderer;
use crate::streak::{StreakResult, habit_stats};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedHabit {
    #[serde(flatten)]
    habit: Habit,
    current_streak: u32,
    total_days: u32,
    last_completed: Option<NaiveDate>,
}

#[instrument(skip(store, cfg, renderer, args))]
pub(super) fn cmd_week(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command week");

    let base = match args.join(" ").trim() {
        "" => Some(today),
        "prev" | "previous" => add_days(today, -7),
        "next" => add_days(today, 7),
        expr => Some(parse_day_expr(expr, today)?),
    };
    let week = base
        .and_then(week_dates)
        .ok_or_else(|| anyhow!("week is out of the supported date range"))?;

    let habits = load_sorted(store, cfg)?;
    let rows = with_streaks(&habits, today);
    renderer.print_week(&rows, &week, today, cfg.show_streaks())
}

#[instrument(skip(store, cfg, renderer, args))]
pub(super) fn cmd_month(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command month");

    let (year, month) = parse_month_arg(&args.join(" "), today)?;
    let habits = load_sorted(store, cfg)?;
    let view = month_view(year, month, &habits)?;
    renderer.print_month(&view, today)
}

#[instrument(skip(store, cfg, renderer, args))]
pub(super) fn cmd_day(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command day");

    let date = match args.join(" ").trim() {
        "" => today,
        expr => parse_day_expr(expr, today)?,
    };
    let habits = load_sorted(store, cfg)?;
    renderer.print_day(&aggregate_for_date(date, &habits))
}

#[instrument(skip(store, cfg, renderer))]
pub(super) fn cmd_streaks(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command streaks");

    let habits = load_sorted(store, cfg)?;
    let mut rows = with_streaks(&habits, today);
    rows.sort_by(|(_, a), (_, b)| {
        b.current_streak
            .cmp(&a.current_streak)
            .then(b.best_streak.cmp(&a.best_streak))
    });
    renderer.print_streaks(&rows)
}

#[instrument(skip(store, renderer, args))]
pub(super) fn cmd_info(
    store: &mut DataStore,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command info");

    let id = parse_id(args.first())?;
    let habits = store.load_habits()?;
    let habit = habits
        .iter()
        .find(|h| h.id == id)
        .ok_or_else(|| anyhow!("habit not found: {id}"))?;

    renderer.print_habit_info(habit, &habit_stats(&habit.completed_dates, today))
}

#[instrument(skip(store, cfg))]
pub(super) fn cmd_export(
    store: &mut DataStore,
    cfg: &Config,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command export");

    let rows = export_rows(load_sorted(store, cfg)?, today);
    let out = serde_json::to_string(&rows)?;
    println!("{out}");
    Ok(())
}

fn export_rows(habits: Vec<Habit>, today: NaiveDate) -> Vec<ExportedHabit> {
    habits
        .into_iter()
        .map(|mut habit| {
            let stats = habit_stats(&habit.completed_dates, today);
            habit.best_streak = stats.streak.best_streak;
            habit.completed_dates = habit
                .completed_dates
                .iter()
                .filter_map(|raw| normalize_date(raw))
                .collect();
            ExportedHabit {
                habit,
                current_streak: stats.streak.current_streak,
                total_days: stats.total_days,
                last_completed: stats.last_completed,
            }
        })
        .collect()
}

fn load_sorted(store: &DataStore, cfg: &Config) -> anyhow::Result<Vec<Habit>> {
    let mut habits = store.load_habits()?;
    sort_habits(&mut habits, cfg.habit_sort()?);
    Ok(habits)
}

fn with_streaks(habits: &[Habit], today: NaiveDate) -> Vec<(&Habit, StreakResult)> {
    habits
        .iter()
        .map(|habit| (habit, habit.streak(today)))
        .collect()
}

pub(super) fn parse_month_arg(raw: &str, today: NaiveDate) -> anyhow::Result<(i32, u32)> {
    let token = raw.trim();
    let focus = match token {
        "" => today,
        "prev" | "previous" => shift_months(today, -1),
        "next" => shift_months(today, 1),
        _ => {
            if let Some((year, month)) = token.split_once('-')
                && year.len() == 4
                && (1..=2).contains(&month.len())
            {
                let year: i32 = year
                    .parse()
                    .with_context(|| format!("invalid year in {token}"))?;
                let month: u32 = month
                    .parse()
                    .with_context(|| format!("invalid month in {token}"))?;
                if !(1..=12).contains(&month) {
                    return Err(anyhow!("invalid month: {token}"));
                }
                return Ok((year, month));
            }
            parse_day_expr(token, today)?
        }
    };

    Ok((focus.year(), focus.month()))
}
