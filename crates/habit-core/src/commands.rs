mod habit_ops;
mod views;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};

use crate::cli::Invocation;
use crate::config::{Config, HabitSort};
use crate::datastore::DataStore;
use crate::dates::{resolve_timezone, today_in};
use crate::habit::Habit;
use crate::render::Renderer;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "rename",
        "delete",
        "toggle",
        "week",
        "month",
        "day",
        "streaks",
        "info",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tz = resolve_timezone(cfg);
    let today = today_in(&tz, now);
    execute(store, cfg, renderer, inv, now, today)
}

#[instrument(skip(store, cfg, renderer, inv, now))]
pub fn execute(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();

    debug!(command, args = ?args, %today, "dispatching command");

    match command {
        "add" => habit_ops::cmd_add(store, args, now),
        "rename" => habit_ops::cmd_rename(store, args),
        "delete" => habit_ops::cmd_delete(store, args),
        "toggle" => habit_ops::cmd_toggle(store, args, today),
        "week" => views::cmd_week(store, cfg, renderer, args, today),
        "month" => views::cmd_month(store, cfg, renderer, args, today),
        "day" => views::cmd_day(store, cfg, renderer, args, today),
        "streaks" => views::cmd_streaks(store, cfg, renderer, today),
        "info" => views::cmd_info(store, renderer, args, today),
        "export" => views::cmd_export(store, cfg, today),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

pub fn sort_habits(habits: &mut [Habit], sort: HabitSort) {
    match sort {
        HabitSort::Created => habits.sort_by_key(|h| (h.created, h.id)),
        HabitSort::Alphabetical => habits.sort_by_key(|h| (h.name.to_lowercase(), h.id)),
    }
}

fn parse_id(raw: Option<&String>) -> anyhow::Result<u64> {
    let raw = raw.ok_or_else(|| anyhow!("missing habit id"))?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| anyhow!("invalid habit id: {raw}"))
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Usage: habit [--rc KEY=VALUE] [--habitrc PATH] [--data DIR] <command> [args]");
    println!();
    println!("  add <name>             create a habit");
    println!("  rename <id> <name>     change a habit's name");
    println!("  delete <id>            remove a habit and its history");
    println!("  toggle <id> [day]      flip completion for a day (default today)");
    println!("  week [day|prev|next]   weekly table for the week containing day");
    println!("  month [YYYY-MM|prev|next|day]");
    println!("                         month calendar with per-day completion");
    println!("  day [day]              completed and pending habits for a day");
    println!("  streaks                current and best streak per habit");
    println!("  info <id>              habit details");
    println!("  export                 habits as JSON");
    println!();
    println!("Days: today, yesterday, tomorrow, monday..sunday, +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD");
    Ok(())
}
