//! In-process cron scheduler.
//!
//! Each registration owns a tokio task that sleeps until the next tick and then
//! spawns the job, so a slow job never holds up the following tick. Removing a
//! registration aborts its task; jobs that already started run to completion.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::crd::metrics::CRON_ENTRIES;
use crate::errors::Error;

pub type EntryId = u64;

/// A live registration as reported by [`CronScheduler::entries`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub owner: String,
    pub expression: String,
}

struct Registration {
    owner: String,
    expression: String,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub(crate) enum Timing {
    /// Fires on the earliest tick of any of the schedules.
    Cron(Vec<cron::Schedule>),
    Every(Duration),
}

impl Timing {
    pub(crate) fn parse(expression: &str) -> Result<Timing, Error> {
        let invalid = |reason: String| Error::InvalidSchedule(expression.to_string(), reason);
        let trimmed = expression.trim();

        if let Some(interval) = trimmed.strip_prefix("@every") {
            let every = parse_interval(interval.trim()).map_err(invalid)?;
            return Ok(Timing::Every(every));
        }

        let normalized = match trimmed {
            "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
            "@monthly" => "0 0 0 1 * *".to_string(),
            "@weekly" => "0 0 0 * * Sun".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@hourly" => "0 0 * * * *".to_string(),
            _ => {
                let fields: Vec<&str> = trimmed.split_whitespace().collect();
                match fields.len() {
                    5 => format!("0 {} {}", fields[..4].join(" "), weekday_field(fields[4]).map_err(invalid)?),
                    6 | 7 => fields.join(" "),
                    n => return Err(invalid(format!("expected 5 to 7 fields, found {}", n))),
                }
            }
        };

        // A restricted day-of-month and day-of-week match when either one does.
        let fields: Vec<&str> = normalized.split_whitespace().collect();
        let unrestricted = |field: &str| field == "*" || field == "?";
        let expressions = if unrestricted(fields[3]) || unrestricted(fields[5]) {
            vec![normalized.clone()]
        } else {
            let mut by_month_day = fields.clone();
            by_month_day[5] = "*";
            let mut by_weekday = fields.clone();
            by_weekday[3] = "*";
            vec![by_month_day.join(" "), by_weekday.join(" ")]
        };

        let schedules = expressions
            .iter()
            .map(|expression| cron::Schedule::from_str(expression).map_err(|err| invalid(err.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Timing::Cron(schedules))
    }

    /// First tick strictly after `time`, `None` once the schedule is exhausted.
    pub(crate) fn next_after(&self, time: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Timing::Every(every) => time.checked_add_signed(chrono::Duration::from_std(*every).ok()?),
            Timing::Cron(schedules) => schedules
                .iter()
                .filter_map(|schedule| schedule.after(time).next())
                .min(),
        }
    }

    fn until_next(&self) -> Option<Duration> {
        let now = Utc::now();
        let next = self.next_after(&now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

pub(crate) fn parse_interval(interval: &str) -> Result<Duration, String> {
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in '{}'", interval))?;
    let (amount, unit) = interval.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| format!("invalid interval '{}'", interval))?;
    let too_long = || format!("interval '{}' is too long", interval);
    let every = match unit {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(too_long)?),
        "h" => Duration::from_secs(amount.checked_mul(3600).ok_or_else(too_long)?),
        other => return Err(format!("unknown unit '{}'", other)),
    };
    if every.is_zero() {
        return Err("interval must be positive".to_string());
    }
    if chrono::Duration::from_std(every).is_err() {
        return Err(too_long());
    }
    Ok(every)
}

/// Translate a classic day-of-week field (0-7, Sunday is 0 or 7) to the 1-7 numbering
/// used by the `cron` crate (Sunday is 1).
///
/// Numeric ranges and steps are expanded to a list of days, since a range ending on
/// Sunday wraps around. Names and `*` pass through unchanged.
pub(crate) fn weekday_field(field: &str) -> Result<String, String> {
    let day = |value: &str| -> Result<u32, String> {
        match value.parse::<u32>() {
            Ok(day) if day <= 7 => Ok(day),
            _ => Err(format!("invalid day of week '{}'", value)),
        }
    };
    let numeric = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

    let mut items: Vec<String> = Vec::new();
    let mut push = |item: String| {
        if !items.contains(&item) {
            items.push(item);
        }
    };
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        let bounds = match range.split_once('-') {
            Some((start, end)) if numeric(start) && numeric(end) => Some((day(start)?, day(end)?)),
            None if numeric(range) => {
                let start = day(range)?;
                // a lone day with a step runs to the end of the week
                Some((start, if step.is_some() { 6 } else { start }))
            }
            _ => None,
        };
        let (start, end) = match bounds {
            Some(bounds) => bounds,
            None => {
                push(item.to_string());
                continue;
            }
        };
        if start > end {
            return Err(format!("invalid day of week range '{}'", range));
        }
        let step = match step {
            Some(step) => match step.parse::<usize>() {
                Ok(step) if step > 0 => step,
                _ => return Err(format!("invalid step '{}'", step)),
            },
            None => 1,
        };
        let mut days: Vec<u32> = (start..=end).step_by(step).map(|weekday| weekday % 7 + 1).collect();
        days.sort_unstable();
        for day in days {
            push(day.to_string());
        }
    }
    Ok(items.join(","))
}

/// Registry of cron entries, shared between the supervisor and the HTTP views.
#[derive(Default)]
pub struct CronScheduler {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<EntryId, Registration>>,
}

impl CronScheduler {
    pub fn new() -> Self {
        CronScheduler::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<EntryId, Registration>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check that `expression` can be scheduled without registering anything.
    pub fn validate(expression: &str) -> Result<(), Error> {
        Timing::parse(expression).map(|_| ())
    }

    /// Run `job` on every tick of `expression` until the entry is removed.
    /// Must be called from within a tokio runtime.
    pub fn register<F, Fut>(&self, owner: &str, expression: &str, job: F) -> Result<EntryId, Error>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let timing = Timing::parse(expression)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        let handle = tokio::spawn(async move {
            while let Some(wait) = timing.until_next() {
                tokio::time::sleep(wait).await;
                debug!("Cron entry {} fired", id);
                tokio::spawn(job());
            }
        });

        let mut entries = self.lock();
        entries.insert(
            id,
            Registration {
                owner: owner.to_string(),
                expression: expression.to_string(),
                handle,
            },
        );
        CRON_ENTRIES.set(entries.len() as i64);
        Ok(id)
    }

    /// Stop an entry. Returns false if no such entry exists.
    pub fn remove(&self, id: EntryId) -> bool {
        let mut entries = self.lock();
        let removed = match entries.remove(&id) {
            Some(registration) => {
                registration.handle.abort();
                true
            }
            None => false,
        };
        CRON_ENTRIES.set(entries.len() as i64);
        removed
    }

    /// Stop every entry of `owner`, returning how many were removed.
    pub fn remove_owned(&self, owner: &str) -> usize {
        let owned: Vec<EntryId> = self
            .lock()
            .iter()
            .filter(|(_, registration)| registration.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        owned.into_iter().filter(|id| self.remove(*id)).count()
    }

    pub fn owner_of(&self, id: EntryId) -> Option<String> {
        self.lock().get(&id).map(|registration| registration.owner.clone())
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.lock()
            .iter()
            .map(|(id, registration)| Entry {
                id: *id,
                owner: registration.owner.clone(),
                expression: registration.expression.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        for (_, registration) in self.lock().iter() {
            registration.handle.abort();
        }
    }
}
