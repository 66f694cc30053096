use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayAggregate, MonthView};
use crate::config::Config;
use crate::dates::format_date;
use crate::habit::Habit;
use crate::streak::{HabitStats, StreakResult};

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const CHECK: &str = "✓";
const EMPTY: &str = "·";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, rows, week))]
    pub fn print_week(
        &self,
        rows: &[(&Habit, StreakResult)],
        week: &[NaiveDate; 7],
        today: NaiveDate,
        show_streaks: bool,
    ) -> anyhow::Result<()> {
        self.write_week(io::stdout().lock(), rows, week, today, show_streaks)
    }

    pub fn write_week<W: Write>(
        &self,
        mut out: W,
        rows: &[(&Habit, StreakResult)],
        week: &[NaiveDate; 7],
        today: NaiveDate,
        show_streaks: bool,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "Week of {} to {}",
            format_date(week[0]),
            format_date(week[6])
        )?;
        writeln!(out)?;

        let mut headers = vec!["ID".to_string(), "Habit".to_string()];
        for (label, date) in WEEKDAY_LABELS.iter().zip(week) {
            let header = format!("{label} {:02}", date.day());
            headers.push(if *date == today {
                self.paint(&header, "1;4")
            } else {
                header
            });
        }
        if show_streaks {
            headers.push("Current".to_string());
            headers.push("Best".to_string());
        }

        let mut table = Vec::with_capacity(rows.len());
        for (habit, streak) in rows {
            let mut row = vec![self.paint(&habit.id.to_string(), "33"), habit.name.clone()];
            for date in week {
                row.push(if habit.is_completed_on(*date) {
                    self.paint(CHECK, "32")
                } else {
                    EMPTY.to_string()
                });
            }
            if show_streaks {
                row.push(streak.current_streak.to_string());
                row.push(streak.best_streak.to_string());
            }
            table.push(row);
        }

        write_table(&mut out, headers, table)?;
        if rows.is_empty() {
            writeln!(out, "No habits yet. Add one with `habit add <name>`.")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_month(&self, view: &MonthView<'_>, today: NaiveDate) -> anyhow::Result<()> {
        self.write_month(io::stdout().lock(), view, today)
    }

    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        view: &MonthView<'_>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let title = NaiveDate::from_ymd_opt(view.year, view.month, 1)
            .map(|first| first.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", view.year, view.month));
        writeln!(out, "{title}")?;
        writeln!(out)?;

        let headers = WEEKDAY_LABELS.iter().map(|label| label.to_string()).collect();
        let rows = view
            .days
            .chunks(7)
            .map(|week| {
                week.iter()
                    .map(|(cell, aggregate)| {
                        let text = format!(
                            "{:>2} {}/{}",
                            cell.date.day(),
                            aggregate.completed.len(),
                            aggregate.total()
                        );
                        if !cell.is_current_month {
                            self.paint(&text, "2")
                        } else if cell.date == today {
                            self.paint(&text, "1;4")
                        } else if aggregate.is_complete() {
                            self.paint(&text, "32")
                        } else {
                            text
                        }
                    })
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)?;

        let stats = view.stats;
        writeln!(out)?;
        writeln!(
            out,
            "Active days  {}/{}",
            stats.days_with_completions, stats.days_in_month
        )?;
        writeln!(
            out,
            "Perfect days {}/{}",
            stats.perfect_days, stats.days_in_month
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, aggregate))]
    pub fn print_day(&self, aggregate: &DayAggregate<'_>) -> anyhow::Result<()> {
        self.write_day(io::stdout().lock(), aggregate)
    }

    pub fn write_day<W: Write>(
        &self,
        mut out: W,
        aggregate: &DayAggregate<'_>,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} ({}): {}/{} completed ({:.0}%)",
            format_date(aggregate.date),
            aggregate.date.format("%A"),
            aggregate.completed.len(),
            aggregate.total(),
            aggregate.completion_ratio() * 100.0
        )?;

        writeln!(out, "completed")?;
        for habit in &aggregate.completed {
            writeln!(out, "  {} {} {}", self.paint(CHECK, "32"), habit.id, habit.name)?;
        }
        writeln!(out, "pending")?;
        for habit in &aggregate.pending {
            writeln!(out, "  {} {} {}", EMPTY, habit.id, habit.name)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_streaks(&self, rows: &[(&Habit, StreakResult)]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Habit".to_string(),
            "Current".to_string(),
            "Best".to_string(),
        ];
        let table = rows
            .iter()
            .map(|(habit, streak)| {
                vec![
                    self.paint(&habit.id.to_string(), "33"),
                    habit.name.clone(),
                    streak.current_streak.to_string(),
                    streak.best_streak.to_string(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), headers, table)
    }

    #[tracing::instrument(skip(self, habit, stats))]
    pub fn print_habit_info(&self, habit: &Habit, stats: &HabitStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", habit.id)?;
        writeln!(out, "uuid      {}", habit.uuid)?;
        writeln!(out, "name      {}", habit.name)?;
        writeln!(out, "created   {}", format_date(habit.created))?;
        writeln!(out, "current   {}", stats.streak.current_streak)?;
        writeln!(out, "best      {}", stats.streak.best_streak)?;
        writeln!(out, "total     {}", stats.total_days)?;
        if let Some(last) = stats.last_completed {
            writeln!(out, "last      {}", format_date(last))?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write_cell(&mut writer, header, widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            write_cell(&mut writer, cell, widths[idx])?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_cell<W: Write>(writer: &mut W, cell: &str, width: usize) -> anyhow::Result<()> {
    let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
    let padding = width.saturating_sub(visible_width);
    write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
