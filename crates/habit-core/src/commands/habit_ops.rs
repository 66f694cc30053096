use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

use super::parse_id;
use crate::datastore::DataStore;
use crate::dates::{format_date, parse_day_expr};

#[instrument(skip(store, args, now))]
pub(super) fn cmd_add(
    store: &mut DataStore,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    if args.is_empty() {
        return Err(anyhow!("add requires a habit name"));
    }
    let habit = store.add_habit(&args.join(" "), now)?;

    println!("Created habit {}.", habit.id);
    Ok(())
}

#[instrument(skip(store, args))]
pub(super) fn cmd_rename(store: &mut DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command rename");

    let id = parse_id(args.first())?;
    let name = args.get(1..).unwrap_or_default().join(" ");
    let habit = store.rename_habit(id, &name)?;

    println!("Renamed habit {} to '{}'.", habit.id, habit.name);
    Ok(())
}

#[instrument(skip(store, args))]
pub(super) fn cmd_delete(store: &mut DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id = parse_id(args.first())?;
    let habit = store.delete_habit(id)?;

    println!("Deleted habit {} '{}'.", habit.id, habit.name);
    Ok(())
}

#[instrument(skip(store, args))]
pub(super) fn cmd_toggle(
    store: &mut DataStore,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command toggle");

    let id = parse_id(args.first())?;
    let day = match args.get(1..) {
        Some(rest) if !rest.is_empty() => parse_day_expr(&rest.join(" "), today)?,
        _ => today,
    };

    let completed = store.toggle_completion(id, day, today)?;
    println!(
        "Habit {id} {} for {}.",
        if completed {
            "completed"
        } else {
            "cleared"
        },
        format_date(day)
    );
    Ok(())
}
