use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc, Weekday};

use crate::errors::Error;
use crate::scheduler::{parse_interval, weekday_field, CronScheduler, Entry, Timing};

fn ticks(expression: &str, after: &str, count: usize) -> Vec<DateTime<Utc>> {
    let timing = Timing::parse(expression).unwrap();
    let mut time: DateTime<Utc> = after.parse().unwrap();
    let mut ticks = Vec::with_capacity(count);
    for _ in 0..count {
        time = timing.next_after(&time).unwrap();
        ticks.push(time);
    }
    ticks
}

fn counting_job(counter: &Arc<AtomicUsize>) -> impl Fn() -> futures::future::Ready<()> + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(())
    }
}

#[test]
fn test_accepted_expressions() {
    for expression in &[
        "*/5 * * * *",
        "0 7 * * 1-5",
        "30 6 1 * 0",
        "0 30 9 * * Mon,Wed,Fri",
        "0 0 12 1 1 * 2030",
        "@yearly",
        "@annually",
        "@monthly",
        "@weekly",
        "@daily",
        "@midnight",
        "@hourly",
        "@every 90s",
        "@every 250ms",
    ] {
        assert!(CronScheduler::validate(expression).is_ok(), "{} should be accepted", expression);
    }
}

#[test]
fn test_rejected_expressions() {
    for expression in &[
        "", "* * *", "* * * * * * * *", "0 7 * * 9", "@every", "@every 5x", "@every 0s", "@sometimes",
        "@every 307445734561825862m", "@every 5124095576030432h", "0 0 * * 5-3", "0 0 * * 1/0",
    ] {
        match CronScheduler::validate(expression) {
            Err(Error::InvalidSchedule(rejected, _)) => assert_eq!(&rejected, expression),
            other => panic!("{} should be rejected, got {:?}", expression, other),
        }
    }
}

#[tokio::test]
async fn test_register_and_remove() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let first = scheduler.register("default/a", "0 7 * * *", counting_job(&counter)).unwrap();
    let second = scheduler.register("default/b", "@hourly", counting_job(&counter)).unwrap();
    assert!(first > 0);
    assert!(second > first);
    assert_eq!(scheduler.len(), 2);
    assert_eq!(scheduler.owner_of(first).as_deref(), Some("default/a"));
    assert_eq!(
        scheduler.entries(),
        vec![
            Entry {
                id: first,
                owner: "default/a".to_owned(),
                expression: "0 7 * * *".to_owned()
            },
            Entry {
                id: second,
                owner: "default/b".to_owned(),
                expression: "@hourly".to_owned()
            },
        ]
    );

    assert!(scheduler.remove(first));
    assert!(!scheduler.remove(first));
    assert_eq!(scheduler.owner_of(first), None);
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test]
async fn test_invalid_expression_registers_nothing() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    assert!(scheduler.register("default/a", "whenever", counting_job(&counter)).is_err());
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn test_remove_owned() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler.register("default/a", "@daily", counting_job(&counter)).unwrap();
    scheduler.register("default/a", "@hourly", counting_job(&counter)).unwrap();
    let other = scheduler.register("default/b", "@daily", counting_job(&counter)).unwrap();

    assert_eq!(scheduler.remove_owned("default/a"), 2);
    assert_eq!(scheduler.len(), 1);
    assert_eq!(scheduler.owner_of(other).as_deref(), Some("default/b"));
}

#[tokio::test]
async fn test_entry_fires_until_removed() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = scheduler.register("default/a", "@every 30ms", counting_job(&counter)).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(counter.load(Ordering::SeqCst) >= 2);

    scheduler.remove(id);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let fired = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(counter.load(Ordering::SeqCst), fired);
}

#[test]
fn test_weekday_field() {
    assert_eq!(weekday_field("*").unwrap(), "*");
    assert_eq!(weekday_field("?").unwrap(), "?");
    assert_eq!(weekday_field("0").unwrap(), "1");
    assert_eq!(weekday_field("7").unwrap(), "1");
    assert_eq!(weekday_field("1-5").unwrap(), "2,3,4,5,6");
    assert_eq!(weekday_field("5-7").unwrap(), "1,6,7");
    assert_eq!(weekday_field("5-7/2").unwrap(), "1,6");
    assert_eq!(weekday_field("1/2").unwrap(), "2,4,6");
    assert_eq!(weekday_field("0,7").unwrap(), "1");
    assert_eq!(weekday_field("0,3").unwrap(), "1,4");
    assert_eq!(weekday_field("*/2").unwrap(), "*/2");
    assert_eq!(weekday_field("MON-FRI").unwrap(), "MON-FRI");
    assert!(weekday_field("8").is_err());
    assert!(weekday_field("5-1").is_err());
    assert!(weekday_field("1-5/0").is_err());
}

#[test]
fn test_parse_interval() {
    assert_eq!(parse_interval("90s").unwrap(), Duration::from_secs(90));
    assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
    assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
    assert!(parse_interval("10").is_err());
    assert!(parse_interval("0s").is_err());
    assert!(parse_interval("3d").is_err());
    assert!(parse_interval("307445734561825862m").is_err());
    assert!(parse_interval("18446744073709551615h").is_err());
}

#[test]
fn test_stepped_weekday_range_keeps_sunday() {
    // 2024-01-01 is a Monday
    let weekdays: Vec<Weekday> = ticks("0 0 * * 5-7/2", "2024-01-01T00:00:00Z", 4)
        .iter()
        .map(|tick| tick.weekday())
        .collect();
    assert_eq!(weekdays, vec![Weekday::Fri, Weekday::Sun, Weekday::Fri, Weekday::Sun]);
}

#[test]
fn test_month_day_or_weekday() {
    let days: Vec<(u32, u32, Weekday)> = ticks("0 0 1 * 1", "2024-01-01T00:00:00Z", 6)
        .iter()
        .map(|tick| (tick.month(), tick.day(), tick.weekday()))
        .collect();
    assert_eq!(
        days,
        vec![
            (1, 8, Weekday::Mon),
            (1, 15, Weekday::Mon),
            (1, 22, Weekday::Mon),
            (1, 29, Weekday::Mon),
            (2, 1, Weekday::Thu),
            (2, 5, Weekday::Mon),
        ]
    );
}

#[test]
fn test_wildcard_weekday_keeps_month_day_only() {
    let days: Vec<u32> = ticks("30 6 1 * *", "2024-01-01T12:00:00Z", 3)
        .iter()
        .map(|tick| tick.day())
        .collect();
    assert_eq!(days, vec![1, 1, 1]);
}
