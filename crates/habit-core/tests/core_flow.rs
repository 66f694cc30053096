use std::fs;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use habit_core::calendar::{aggregate_for_date, month_view};
use habit_core::cli::Invocation;
use habit_core::commands::execute;
use habit_core::config::Config;
use habit_core::datastore::DataStore;
use habit_core::render::Renderer;
use habit_core::streak::StreakResult;
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn days_before(today: NaiveDate, days: u64) -> NaiveDate {
    today - Days::new(days)
}

fn invocation(command: &str, args: &[&str]) -> Invocation {
    Invocation {
        command: command.to_string(),
        command_args: args.iter().map(|a| a.to_string()).collect(),
    }
}

#[test]
fn datastore_roundtrip_and_streaks() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc
        .with_ymd_and_hms(2024, 3, 15, 9, 0, 0)
        .single()
        .expect("valid now");
    let today = day(2024, 3, 15);

    let read = store.add_habit("  Read 20 pages ", now).expect("add read");
    let run = store.add_habit("Run", now).expect("add run");
    assert_eq!(read.id, 1);
    assert_eq!(run.id, 2);
    assert_eq!(read.name, "Read 20 pages");

    for offset in 0..5 {
        assert!(
            store
                .toggle_completion(read.id, days_before(today, offset), today)
                .expect("toggle")
        );
    }
    assert!(
        store
            .toggle_completion(run.id, days_before(today, 10), today)
            .expect("toggle")
    );

    let habits = store.load_habits().expect("load");
    assert_eq!(habits.len(), 2);
    assert_eq!(
        habits[0].streak(today),
        StreakResult {
            current_streak: 5,
            best_streak: 5
        }
    );
    assert_eq!(habits[0].best_streak, 5);
    assert_eq!(
        habits[1].streak(today),
        StreakResult {
            current_streak: 0,
            best_streak: 1
        }
    );

    assert!(
        !store
            .toggle_completion(read.id, days_before(today, 2), today)
            .expect("untoggle")
    );
    let habits = store.load_habits().expect("reload");
    assert_eq!(
        habits[0].streak(today),
        StreakResult {
            current_streak: 2,
            best_streak: 2
        }
    );
    assert_eq!(habits[0].best_streak, 2);

    let agg = aggregate_for_date(days_before(today, 10), &habits);
    assert_eq!(agg.completed.len(), 1);
    assert_eq!(agg.completed[0].name, "Run");
    assert_eq!(agg.pending.len(), 1);

    let view = month_view(2024, 3, &habits).expect("month view");
    assert_eq!(view.stats.days_with_completions, 5);
}

#[test]
fn rename_delete_and_unknown_ids() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc::now();

    let habit = store.add_habit("Meditate", now).expect("add");
    let renamed = store.rename_habit(habit.id, "Meditate 10 min").expect("rename");
    assert_eq!(renamed.name, "Meditate 10 min");
    assert!(store.rename_habit(habit.id, "   ").is_err());
    assert!(store.rename_habit(99, "Ghost").is_err());
    assert!(store.toggle_completion(99, day(2024, 1, 1), day(2024, 1, 1)).is_err());

    store.delete_habit(habit.id).expect("delete");
    assert!(store.load_habits().expect("load").is_empty());
    assert!(store.delete_habit(habit.id).is_err());

    let next = store.add_habit("Journal", now).expect("add again");
    assert_eq!(next.id, 1);
}

#[test]
fn corrupt_lines_report_position() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    fs::write(&store.habits_path, "\n{not json}\n").expect("write corrupt data");

    let err = store.load_habits().expect_err("corrupt file should fail");
    assert!(format!("{err:#}").contains("line 2"));
}

#[test]
fn loads_records_without_identity_fields() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    fs::write(
        &store.habits_path,
        "{\"id\":3,\"name\":\"Stretch\",\"completedDates\":[\"2024-03-14\",\"2024-03-15\"]}\n",
    )
    .expect("write data");

    let habits = store.load_habits().expect("load");
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].streak(day(2024, 3, 15)).current_streak, 2);

    assert!(
        store
            .toggle_completion(3, day(2024, 3, 16), day(2024, 3, 16))
            .expect("toggle")
    );
    let habits = store.load_habits().expect("reload");
    assert_eq!(habits[0].best_streak, 3);
    assert_eq!(store.next_id(&habits), 4);
}

#[test]
fn commands_mutate_the_store() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let cfg = Config::default();
    let mut renderer = Renderer::plain();
    let now = Utc
        .with_ymd_and_hms(2024, 3, 13, 18, 0, 0)
        .single()
        .expect("valid now");
    let today = day(2024, 3, 13);

    let mut run = |command: &str, args: &[&str]| {
        execute(
            &mut store,
            &cfg,
            &mut renderer,
            invocation(command, args),
            now,
            today,
        )
    };

    run("add", &["Drink", "water"]).expect("add");
    run("add", &["Stretch"]).expect("add");
    run("toggle", &["1"]).expect("toggle today");
    run("toggle", &["1", "yesterday"]).expect("toggle yesterday");
    run("toggle", &["2", "monday"]).expect("toggle monday");
    run("rename", &["2", "Morning", "stretch"]).expect("rename");

    run("week", &[]).expect("week");
    run("week", &["prev"]).expect("previous week");
    run("month", &["2024-03"]).expect("month");
    run("day", &["yesterday"]).expect("day");
    run("streaks", &[]).expect("streaks");
    run("info", &["1"]).expect("info");
    run("export", &[]).expect("export");

    assert!(run("toggle", &["1", "someday"]).is_err());
    assert!(run("info", &["42"]).is_err());
    assert!(run("month", &["2024-13"]).is_err());
    assert!(run("add", &[]).is_err());
    assert!(run("bogus", &[]).is_err());

    run("delete", &["1"]).expect("delete");

    let habits = store.load_habits().expect("load");
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name, "Morning stretch");
    assert!(habits[0].is_completed_on(day(2024, 3, 11)));
    assert_eq!(habits[0].streak(today).current_streak, 0);
}
