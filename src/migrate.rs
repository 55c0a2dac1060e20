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

//! Moving items from one SRS scheme to another.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::Spacing;
use crate::db::Database;
use crate::db::SrsRow;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::srs::Level;
use crate::types::mode::Mode;
use crate::types::timestamp::Timestamp;

/// How an item's review date is adjusted when it moves to a new level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Adjustment {
    /// Keep the review date.
    Keep,
    /// Push the review date back if the new interval is longer.
    Postpone,
    /// Bring the review date forward if the new interval is shorter.
    BringForward,
    /// Bring forward when the item lands in a shorter level early, but do not
    /// pull it forward when it falls through to the last target.
    Either,
}

impl Adjustment {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '=' => Some(Adjustment::Keep),
            '+' => Some(Adjustment::Postpone),
            '-' => Some(Adjustment::BringForward),
            '~' | '\u{223c}' => Some(Adjustment::Either),
            _ => None,
        }
    }
}

/// For each old level, the ordered new levels an item may move into.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MigrationPlan {
    targets: BTreeMap<Level, Vec<(Level, Adjustment)>>,
}

impl MigrationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old_level: Level, targets: Vec<(Level, Adjustment)>) {
        self.targets.insert(old_level, targets);
    }

    pub fn targets(&self, old_level: Level) -> Option<&[(Level, Adjustment)]> {
        self.targets
            .get(&old_level)
            .map(|targets| targets.as_slice())
            .filter(|targets| !targets.is_empty())
    }

    /// Every level keeps its number where the new scheme has it. Levels past
    /// the new scheme's end, and the old terminal level, go to the new
    /// terminal level. Review dates are kept.
    pub fn identity(old_levels: Level, new_levels: Level) -> Self {
        let mut plan = Self::new();
        for level in 1..=old_levels {
            let target = if level == old_levels {
                new_levels
            } else {
                level.min(new_levels)
            };
            plan.insert(level, vec![(target, Adjustment::Keep)]);
        }
        plan
    }
}

/// Parses `"1:1;2:2,3+;3:4-"`: old level, colon, comma-separated targets,
/// each a new level optionally followed by `=`, `+`, `-` or `~`.
impl FromStr for MigrationPlan {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Fallible<Self> {
        let invalid = || ErrorReport::invalid(format!("Invalid migration plan: '{s}'"));
        let mut plan = Self::new();
        for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (old, targets) = entry.split_once(':').ok_or_else(invalid)?;
            let old: Level = old.trim().parse().map_err(|_| invalid())?;
            let mut parsed = Vec::new();
            for target in targets.split(',').map(str::trim) {
                let (digits, adjustment) = match target.chars().last().and_then(Adjustment::from_char) {
                    Some(adjustment) => {
                        let end = target.len() - target.chars().last().map_or(0, char::len_utf8);
                        (&target[..end], adjustment)
                    }
                    None => (target, Adjustment::Keep),
                };
                let level: Level = digits.trim().parse().map_err(|_| invalid())?;
                parsed.push((level, adjustment));
            }
            plan.insert(old, parsed);
        }
        Ok(plan)
    }
}

/// Where one item ends up: its new level and review date. Moving between a
/// finite interval and the unbounded terminal one reschedules the item from
/// `now`, since a date measured against the other kind is meaningless.
pub fn migrate_item(
    level: Level,
    review_date: Timestamp,
    now: Timestamp,
    old: &Spacing,
    new: &Spacing,
    targets: &[(Level, Adjustment)],
) -> (Level, Timestamp) {
    let (new_level, date) = pick_target(level, review_date, now, old, new, targets);
    let old_unbounded = old.interval_or_zero(level) == i64::MAX;
    let new_interval = new.interval_or_zero(new_level);
    if old_unbounded != (new_interval == i64::MAX) {
        return (new_level, now.plus(new_interval));
    }
    (new_level, date)
}

fn pick_target(
    level: Level,
    review_date: Timestamp,
    now: Timestamp,
    old: &Spacing,
    new: &Spacing,
    targets: &[(Level, Adjustment)],
) -> (Level, Timestamp) {
    let old_interval = old.interval_or_zero(level);
    let until_review = review_date.seconds().saturating_sub(now.seconds()).max(0);
    let time_scheduled = old_interval.saturating_sub(until_review);
    let mut cumulative: i64 = 0;
    for (new_level, adjustment) in targets {
        cumulative = cumulative.saturating_add(new.interval_or_zero(*new_level));
        let diff = cumulative.saturating_sub(old_interval);
        if cumulative >= old_interval {
            let date = match adjustment {
                Adjustment::Postpone => review_date.plus(diff),
                _ => review_date,
            };
            return (*new_level, date);
        }
        if time_scheduled < cumulative {
            let date = match adjustment {
                Adjustment::BringForward | Adjustment::Either => review_date.plus(diff),
                _ => review_date,
            };
            return (*new_level, date);
        }
    }
    // Scheduled longer than all targets combined.
    match targets.last() {
        Some((last_level, adjustment)) => {
            let date = match adjustment {
                Adjustment::BringForward => {
                    review_date.plus(cumulative.saturating_sub(old_interval))
                }
                _ => review_date,
            };
            (*last_level, date)
        }
        None => (level, review_date),
    }
}

/// Move every scheduled item of the given modes from the `old` spacing to the
/// `new` one. All rows are written in one transaction. Returns the number of
/// items migrated.
pub fn migrate_items(
    db: &Database,
    modes: &[Mode],
    old: &Spacing,
    new: &Spacing,
    plan: &MigrationPlan,
    now: Timestamp,
) -> Fallible<usize> {
    let mut updates: Vec<(Mode, SrsRow)> = Vec::new();
    for mode in modes {
        for row in db.srs_rows(*mode)? {
            if row.level == 0 {
                continue;
            }
            let review_date = row.review_date.unwrap_or(now);
            let targets = plan.targets(row.level).ok_or_else(|| {
                ErrorReport::invalid(format!(
                    "Migration plan has no target for level {}.",
                    row.level
                ))
            })?;
            if let Some((bad, _)) = targets.iter().find(|(l, _)| *l == 0 || *l > new.num_levels()) {
                return Err(ErrorReport::invalid(format!(
                    "Migration target level {bad} is out of range (1 to {}).",
                    new.num_levels()
                )));
            }
            let (level, review_date) =
                migrate_item(row.level, review_date, now, old, new, targets);
            updates.push((
                *mode,
                SrsRow {
                    key: row.key,
                    level,
                    review_date: Some(review_date),
                },
            ));
        }
    }
    db.update_srs_rows(&updates)?;
    log::debug!("Migrated {} items", updates.len());
    Ok(updates.len())
}
