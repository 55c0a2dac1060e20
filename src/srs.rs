// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Datelike;
use chrono::Local;
use chrono::Months;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::TimeDelta;
use chrono::TimeZone;
use chrono::Timelike;
use clap::ValueEnum;
use serde::Serialize;

use crate::config::LanguageConfig;
use crate::db::Database;
use crate::db::NewItem;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::mode::Mode;
use crate::types::timestamp::Timestamp;

/// An item's position in the interval progression. Level 0 means the item is
/// not scheduled.
pub type Level = u32;

/// The level an item moves to after a review. A correct answer moves it up
/// one level; a wrong answer moves it down one, but never below level 1.
///
/// The result is not capped: callers clamp it to the scheme's number of
/// levels.
pub fn new_level(old_level: Level, correct: bool) -> Level {
    if correct {
        old_level + 1
    } else {
        old_level.saturating_sub(1).max(1)
    }
}

/// Ready and waiting counts for one level.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LevelAmounts {
    /// Items whose review date has passed.
    pub ready: usize,
    /// Items whose review date is in the future.
    pub waiting: usize,
}

/// Ready and waiting counts for every mode and level. Each mode's vector is
/// indexed by level; level 0 is always empty since unscheduled items are
/// never counted.
#[derive(Serialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct Amounts {
    pub modes: BTreeMap<Mode, Vec<LevelAmounts>>,
}

impl Amounts {
    pub fn total_ready(&self) -> usize {
        self.modes
            .values()
            .flat_map(|levels| levels.iter())
            .map(|amounts| amounts.ready)
            .sum()
    }

    pub fn total_waiting(&self) -> usize {
        self.modes
            .values()
            .flat_map(|levels| levels.iter())
            .map(|amounts| amounts.waiting)
            .sum()
    }
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

/// Number of items falling due in one interval of a schedule.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScheduleEntry {
    pub amount: usize,
    /// Exclusive end of the interval.
    pub end: Timestamp,
}

/// The scheduler for one language: the language's store plus its
/// configuration.
pub struct Srs<'a> {
    db: &'a Database,
    config: &'a LanguageConfig,
}

impl<'a> Srs<'a> {
    pub fn new(db: &'a Database, config: &'a LanguageConfig) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &'a Database {
        self.db
    }

    pub fn config(&self) -> &'a LanguageConfig {
        self.config
    }

    pub fn modes(&self) -> &'a [Mode] {
        &self.config.modes
    }

    pub fn num_levels(&self) -> Level {
        self.config.num_levels()
    }

    /// The current level of an item.
    pub fn level(&self, key: &str, mode: Mode) -> Fallible<Level> {
        self.check_mode(mode)?;
        self.db.level(key, mode)
    }

    /// Move an item to `level`, scheduling its next review one interval of
    /// that level from now. Level 0 unschedules the item.
    pub fn set_level(&self, key: &str, level: Level, mode: Mode) -> Fallible<Option<Timestamp>> {
        self.set_level_at(key, level, mode, Timestamp::now())
    }

    pub fn set_level_at(
        &self,
        key: &str,
        level: Level,
        mode: Mode,
        now: Timestamp,
    ) -> Fallible<Option<Timestamp>> {
        self.check_mode(mode)?;
        let review_date = self.review_date(level, now)?;
        self.db.update_level(key, mode, level, review_date)?;
        log::debug!("{mode} '{key}' -> level {level}, due {review_date:?}");
        Ok(review_date)
    }

    /// Add an item at `level`, due one interval of that level from `now`.
    pub fn add_item_at(
        &self,
        key: &str,
        mode: Mode,
        solutions: &[String],
        readings: &[String],
        level: Level,
        now: Timestamp,
    ) -> Fallible<Option<Timestamp>> {
        self.check_mode(mode)?;
        let review_date = self.review_date(level, now)?;
        self.db.add_item(&NewItem {
            key,
            mode,
            solutions,
            readings,
            level,
            review_date,
            added_at: now,
        })?;
        log::debug!("Added {mode} '{key}' at level {level}");
        Ok(review_date)
    }

    pub fn remove_item(&self, key: &str, mode: Mode) -> Fallible<()> {
        self.check_mode(mode)?;
        self.db.remove_item(key, mode)
    }

    /// The review date of an item entering `level` at `now`.
    pub fn review_date(&self, level: Level, now: Timestamp) -> Fallible<Option<Timestamp>> {
        if level == 0 {
            return Ok(None);
        }
        match self.config.spacing.interval(level) {
            Some(interval) => Ok(Some(now.plus(interval))),
            None => Err(ErrorReport::invalid(format!(
                "Level {level} is out of range (0 to {}).",
                self.num_levels()
            ))),
        }
    }

    /// Keys of the items of a mode that are ready for review.
    pub fn ready_items(&self, mode: Mode) -> Fallible<Vec<String>> {
        self.ready_items_at(mode, Timestamp::now())
    }

    pub fn ready_items_at(&self, mode: Mode, now: Timestamp) -> Fallible<Vec<String>> {
        self.ready_items_since(mode, None, now)
    }

    /// Like `ready_items_at`, but only items that came due after `start`.
    pub fn ready_items_since(
        &self,
        mode: Mode,
        start: Option<Timestamp>,
        now: Timestamp,
    ) -> Fallible<Vec<String>> {
        self.check_mode(mode)?;
        self.db.ready_keys(mode, start, now)
    }

    /// Ready and waiting counts for every active mode and level.
    pub fn amounts(&self) -> Fallible<Amounts> {
        self.amounts_at(Timestamp::now())
    }

    pub fn amounts_at(&self, now: Timestamp) -> Fallible<Amounts> {
        let size = self.num_levels() as usize + 1;
        let mut amounts = Amounts::default();
        for mode in self.modes() {
            let mut levels = vec![LevelAmounts::default(); size];
            for count in self.db.level_counts(*mode, now)? {
                let index = count.level as usize;
                if index >= levels.len() {
                    log::warn!(
                        "{mode}: {} items at level {}, beyond the scheme's {} levels",
                        count.ready + count.waiting,
                        count.level,
                        self.num_levels()
                    );
                    levels.resize(index + 1, LevelAmounts::default());
                }
                levels[index] = LevelAmounts {
                    ready: count.ready,
                    waiting: count.waiting,
                };
            }
            amounts.modes.insert(*mode, levels);
        }
        Ok(amounts)
    }

    /// Number of items ready for review across all modes.
    pub fn total_ready(&self) -> Fallible<usize> {
        self.total_ready_at(Timestamp::now())
    }

    pub fn total_ready_at(&self, now: Timestamp) -> Fallible<usize> {
        Ok(self.amounts_at(now)?.total_ready())
    }

    /// Number of active items per level, summed over all modes. Every level
    /// of the scheme is present.
    pub fn items_per_level(&self) -> Fallible<BTreeMap<Level, usize>> {
        let mut result: BTreeMap<Level, usize> =
            (1..=self.num_levels()).map(|level| (level, 0)).collect();
        for mode in self.modes() {
            for (level, amount) in self.db.items_per_level(*mode)? {
                *result.entry(level).or_insert(0) += amount;
            }
        }
        Ok(result)
    }

    /// Number of active items across all modes.
    pub fn item_count(&self) -> Fallible<usize> {
        Ok(self.items_per_level()?.values().sum())
    }

    /// Number of items falling due in each of the next `count` units of
    /// time, starting from the beginning of the current unit.
    pub fn schedule(&self, unit: TimeUnit, count: usize) -> Fallible<Vec<ScheduleEntry>> {
        self.schedule_at(Local::now(), unit, count)
    }

    pub fn schedule_at<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
        unit: TimeUnit,
        count: usize,
    ) -> Fallible<Vec<ScheduleEntry>> {
        let bounds = timeline(now, unit, count)?;
        let mut entries = Vec::with_capacity(bounds.len());
        for (start, end) in bounds {
            let mut amount = 0;
            for mode in self.modes() {
                amount += self.db.count_due_between(*mode, start, end)?;
            }
            entries.push(ScheduleEntry { amount, end });
        }
        Ok(entries)
    }

    fn check_mode(&self, mode: Mode) -> Fallible<()> {
        if self.config.modes.contains(&mode) {
            Ok(())
        } else {
            Err(ErrorReport::invalid(format!(
                "Mode {mode} is not available for {}.",
                self.config.language
            )))
        }
    }
}

/// Consecutive `[start, end)` intervals of one unit each, the first starting
/// at the beginning of the unit containing `now`.
fn timeline<Tz: TimeZone>(
    now: DateTime<Tz>,
    unit: TimeUnit,
    count: usize,
) -> Fallible<Vec<(Timestamp, Timestamp)>> {
    let tz = now.timezone();
    let local = now.naive_local();
    let midnight = local.date().and_time(NaiveTime::MIN);
    let start: NaiveDateTime = match unit {
        TimeUnit::Hours => midnight + TimeDelta::hours(local.hour() as i64),
        TimeUnit::Days | TimeUnit::Weeks => midnight,
        TimeUnit::Months => first_of_month(local.date())?.and_time(NaiveTime::MIN),
    };
    let mut bounds = Vec::with_capacity(count);
    let mut current = start;
    for _ in 0..count {
        let next = match unit {
            TimeUnit::Hours => current + TimeDelta::hours(1),
            TimeUnit::Days => current + TimeDelta::days(1),
            TimeUnit::Weeks => current + TimeDelta::weeks(1),
            TimeUnit::Months => current
                .checked_add_months(Months::new(1))
                .ok_or_else(|| ErrorReport::invalid("Schedule extends past the calendar."))?,
        };
        bounds.push((to_timestamp(&tz, current)?, to_timestamp(&tz, next)?));
        current = next;
    }
    Ok(bounds)
}

fn first_of_month(date: NaiveDate) -> Fallible<NaiveDate> {
    date.with_day0(0)
        .ok_or_else(|| ErrorReport::new("invalid date"))
}

fn to_timestamp<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Fallible<Timestamp> {
    let ts = tz
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| ErrorReport::new("nonexistent local time"))?;
    Ok(Timestamp::new(ts.timestamp()))
}
