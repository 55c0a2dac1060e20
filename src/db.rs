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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::srs::Level;
use crate::types::mode::Mode;
use crate::types::mode::Part;
use crate::types::timestamp::Timestamp;

/// Separator for lists of answers stored in a single column.
const SEPARATOR: char = ';';

/// A language's item store. Every test mode has its own table, keyed by the
/// mode's key column.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// A new item to insert into a mode's table.
pub struct NewItem<'a> {
    pub key: &'a str,
    pub mode: Mode,
    pub solutions: &'a [String],
    /// Only meaningful for `Mode::Words`.
    pub readings: &'a [String],
    pub level: Level,
    pub review_date: Option<Timestamp>,
    pub added_at: Timestamp,
}

/// The scheduling state of a single item.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SrsRow {
    pub key: String,
    pub level: Level,
    pub review_date: Option<Timestamp>,
}

/// Ready and waiting counts for one level of one mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelCount {
    pub level: Level,
    pub ready: usize,
    pub waiting: usize,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating schema in {database_path}");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Insert a new item. Fails if an item with the same key exists in the
    /// mode's table.
    pub fn add_item(&self, item: &NewItem) -> Fallible<()> {
        let mode = item.mode;
        if mode != Mode::Words && !item.readings.is_empty() {
            return Err(ErrorReport::invalid(format!(
                "Mode {mode} has no readings."
            )));
        }
        let solutions = join_values(item.solutions)?;
        let readings = join_values(item.readings)?;
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        if item_exists(&tx, item.key, mode)? {
            return Err(ErrorReport::invalid(format!(
                "Item '{}' already exists in mode {mode}.",
                item.key
            )));
        }
        let column = solutions_column(mode, Part::Solutions)?;
        if mode == Mode::Words {
            let sql = "insert into vocabulary (word, date_added, translations, readings, level, review_date) values (?, ?, ?, ?, ?, ?);";
            tx.execute(
                sql,
                (
                    item.key,
                    item.added_at,
                    &solutions,
                    &readings,
                    item.level,
                    item.review_date,
                ),
            )?;
        } else {
            let sql = format!(
                "insert into {} ({}, date_added, {column}, level, review_date) values (?, ?, ?, ?, ?);",
                mode.table(),
                mode.key_column()
            );
            tx.execute(
                &sql,
                (
                    item.key,
                    item.added_at,
                    &solutions,
                    item.level,
                    item.review_date,
                ),
            )?;
        }
        tx.commit()?;
        log::debug!("Added '{}' to {mode} at level {}", item.key, item.level);
        Ok(())
    }

    /// Delete an item. Fails if it does not exist.
    pub fn remove_item(&self, key: &str, mode: Mode) -> Fallible<()> {
        let conn = self.acquire();
        let sql = format!(
            "delete from {} where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let changed = conn.execute(&sql, [key])?;
        if changed == 0 {
            return Err(not_found(key, mode));
        }
        Ok(())
    }

    /// The current level of an item.
    pub fn level(&self, key: &str, mode: Mode) -> Fallible<Level> {
        let conn = self.acquire();
        let sql = format!(
            "select level from {} where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let level: Option<Level> = conn.query_row(&sql, [key], |row| row.get(0)).optional()?;
        level.ok_or_else(|| not_found(key, mode))
    }

    /// Overwrite an item's level and review date.
    pub fn update_level(
        &self,
        key: &str,
        mode: Mode,
        level: Level,
        review_date: Option<Timestamp>,
    ) -> Fallible<()> {
        let conn = self.acquire();
        let sql = format!(
            "update {} set level = ?, review_date = ? where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let changed = conn.execute(&sql, (level, review_date, key))?;
        if changed == 0 {
            return Err(not_found(key, mode));
        }
        Ok(())
    }

    /// Keys of active items whose review date is at or before `now` and,
    /// if given, strictly after `after`.
    pub fn ready_keys(
        &self,
        mode: Mode,
        after: Option<Timestamp>,
        now: Timestamp,
    ) -> Fallible<Vec<String>> {
        let conn = self.acquire();
        let sql = format!(
            "select {key} from {table} where level > 0 and review_date <= ? and review_date > ? order by review_date asc, {key} asc;",
            key = mode.key_column(),
            table = mode.table()
        );
        let after = after.unwrap_or(Timestamp::new(i64::MIN));
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query((now, after))?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    /// Ready and waiting counts per level for the active items of a mode,
    /// computed in a single grouped query.
    pub fn level_counts(&self, mode: Mode, now: Timestamp) -> Fallible<Vec<LevelCount>> {
        let conn = self.acquire();
        let sql = format!(
            "select level, sum(case when review_date <= ?1 then 1 else 0 end), sum(case when review_date > ?1 then 1 else 0 end) from {} where level > 0 group by level order by level;",
            mode.table()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([now])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            counts.push(LevelCount {
                level: row.get(0)?,
                ready: to_count(row.get(1)?),
                waiting: to_count(row.get(2)?),
            });
        }
        Ok(counts)
    }

    /// Number of active items per level, ignoring review dates.
    pub fn items_per_level(&self, mode: Mode) -> Fallible<Vec<(Level, usize)>> {
        let conn = self.acquire();
        let sql = format!(
            "select level, count(*) from {} where level > 0 group by level order by level;",
            mode.table()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let level: Level = row.get(0)?;
            counts.push((level, to_count(row.get(1)?)));
        }
        Ok(counts)
    }

    /// Number of active items falling due in `[start, end)`.
    pub fn count_due_between(
        &self,
        mode: Mode,
        start: Timestamp,
        end: Timestamp,
    ) -> Fallible<usize> {
        let conn = self.acquire();
        let sql = format!(
            "select count(*) from {} where level > 0 and review_date >= ? and review_date < ?;",
            mode.table()
        );
        let count: i64 = conn.query_row(&sql, (start, end), |row| row.get(0))?;
        Ok(to_count(count))
    }

    pub fn increment_correct(&self, key: &str, mode: Mode) -> Fallible<()> {
        self.increment(key, mode, "correct_count")
    }

    pub fn increment_mistakes(&self, key: &str, mode: Mode) -> Fallible<()> {
        self.increment(key, mode, "mistake_count")
    }

    /// The `(correct, mistake)` counters of an item.
    pub fn counters(&self, key: &str, mode: Mode) -> Fallible<(u64, u64)> {
        let conn = self.acquire();
        let sql = format!(
            "select correct_count, mistake_count from {} where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let counters: Option<(i64, i64)> = conn
            .query_row(&sql, [key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        let (correct, mistakes) = counters.ok_or_else(|| not_found(key, mode))?;
        Ok((correct.max(0) as u64, mistakes.max(0) as u64))
    }

    /// The stored answers of an item for the given part.
    pub fn solutions(&self, key: &str, mode: Mode, part: Part) -> Fallible<Vec<String>> {
        let column = solutions_column(mode, part)?;
        let conn = self.acquire();
        let sql = format!(
            "select {column} from {} where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let joined: Option<String> = conn.query_row(&sql, [key], |row| row.get(0)).optional()?;
        let joined = joined.ok_or_else(|| not_found(key, mode))?;
        Ok(split_values(&joined))
    }

    /// The scheduling state of every item in a mode.
    pub fn srs_rows(&self, mode: Mode) -> Fallible<Vec<SrsRow>> {
        let conn = self.acquire();
        let sql = format!(
            "select {}, level, review_date from {};",
            mode.key_column(),
            mode.table()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(SrsRow {
                key: row.get(0)?,
                level: row.get(1)?,
                review_date: row.get(2)?,
            });
        }
        Ok(items)
    }

    /// Write a batch of scheduling states in one transaction.
    pub fn update_srs_rows(&self, updates: &[(Mode, SrsRow)]) -> Fallible<()> {
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        for (mode, row) in updates {
            let sql = format!(
                "update {} set level = ?, review_date = ? where {} = ?;",
                mode.table(),
                mode.key_column()
            );
            let changed = tx.execute(&sql, (row.level, row.review_date, &row.key))?;
            if changed == 0 {
                return Err(not_found(&row.key, *mode));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn increment(&self, key: &str, mode: Mode, column: &str) -> Fallible<()> {
        let conn = self.acquire();
        let sql = format!(
            "update {} set {column} = {column} + 1 where {} = ?;",
            mode.table(),
            mode.key_column()
        );
        let changed = conn.execute(&sql, [key])?;
        if changed == 0 {
            return Err(not_found(key, mode));
        }
        Ok(())
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

fn solutions_column(mode: Mode, part: Part) -> Fallible<&'static str> {
    mode.solutions_column(part)
        .ok_or_else(|| ErrorReport::invalid(format!("Mode {mode} has no part '{part}'.")))
}

fn item_exists(tx: &Transaction, key: &str, mode: Mode) -> Fallible<bool> {
    let sql = format!(
        "select count(*) from {} where {} = ?;",
        mode.table(),
        mode.key_column()
    );
    let count: i64 = tx.query_row(&sql, [key], |row| row.get(0))?;
    Ok(count > 0)
}

fn join_values(values: &[String]) -> Fallible<String> {
    if let Some(value) = values.iter().find(|v| v.contains(SEPARATOR)) {
        return Err(ErrorReport::invalid(format!(
            "Value '{value}' must not contain '{SEPARATOR}'."
        )));
    }
    Ok(values.join(&SEPARATOR.to_string()))
}

fn split_values(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(SEPARATOR).map(|s| s.to_string()).collect()
}

fn not_found(key: &str, mode: Mode) -> ErrorReport {
    ErrorReport::not_found(format!("Item '{key}' not found in mode {mode}."))
}

fn to_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["vocabulary"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn add(db: &Database, key: &str, mode: Mode, level: Level, due: Option<i64>) -> Fallible<()> {
        db.add_item(&NewItem {
            key,
            mode,
            solutions: &["a".to_string(), "b".to_string()],
            readings: &[],
            level,
            review_date: due.map(Timestamp::new),
            added_at: Timestamp::new(0),
        })
    }

    #[test]
    fn test_add_and_read_level() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "犬", Mode::KanjiMeanings, 3, Some(100))?;
        assert_eq!(db.level("犬", Mode::KanjiMeanings)?, 3);
        assert_eq!(
            db.solutions("犬", Mode::KanjiMeanings, Part::Solutions)?,
            vec!["a", "b"]
        );
        Ok(())
    }

    #[test]
    fn test_add_duplicate() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "dog", Mode::Words, 1, Some(100))?;
        let err = add(&db, "dog", Mode::Words, 1, Some(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        // Same key in a different mode is a different item.
        add(&db, "dog", Mode::HanziMeanings, 1, Some(100))?;
        Ok(())
    }

    #[test]
    fn test_readings_only_for_words() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let readings = vec!["いぬ".to_string()];
        let err = db
            .add_item(&NewItem {
                key: "犬",
                mode: Mode::KanjiMeanings,
                solutions: &["dog".to_string()],
                readings: &readings,
                level: 1,
                review_date: None,
                added_at: Timestamp::new(0),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn test_separator_rejected() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let err = db
            .add_item(&NewItem {
                key: "dog",
                mode: Mode::Words,
                solutions: &["Hund;Köter".to_string()],
                readings: &[],
                level: 1,
                review_date: None,
                added_at: Timestamp::new(0),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn test_missing_item() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        assert_eq!(
            db.level("nope", Mode::Words).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.update_level("nope", Mode::Words, 1, None)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.increment_correct("nope", Mode::Words)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.remove_item("nope", Mode::Words).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[test]
    fn test_ready_keys() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "a", Mode::Words, 1, Some(50))?;
        add(&db, "b", Mode::Words, 2, Some(100))?;
        add(&db, "c", Mode::Words, 2, Some(101))?;
        add(&db, "d", Mode::Words, 0, Some(10))?;
        let now = Timestamp::new(100);
        assert_eq!(db.ready_keys(Mode::Words, None, now)?, vec!["a", "b"]);
        assert_eq!(
            db.ready_keys(Mode::Words, Some(Timestamp::new(50)), now)?,
            vec!["b"]
        );
        Ok(())
    }

    #[test]
    fn test_level_counts() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "a", Mode::Words, 1, Some(50))?;
        add(&db, "b", Mode::Words, 1, Some(150))?;
        add(&db, "c", Mode::Words, 3, Some(100))?;
        add(&db, "d", Mode::Words, 0, None)?;
        let counts = db.level_counts(Mode::Words, Timestamp::new(100))?;
        assert_eq!(
            counts,
            vec![
                LevelCount {
                    level: 1,
                    ready: 1,
                    waiting: 1
                },
                LevelCount {
                    level: 3,
                    ready: 1,
                    waiting: 0
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_counters() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "a", Mode::Words, 1, Some(50))?;
        for _ in 0..3 {
            db.increment_correct("a", Mode::Words)?;
        }
        db.increment_mistakes("a", Mode::Words)?;
        assert_eq!(db.counters("a", Mode::Words)?, (3, 1));
        Ok(())
    }

    #[test]
    fn test_count_due_between() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "a", Mode::Words, 1, Some(10))?;
        add(&db, "b", Mode::Words, 1, Some(20))?;
        add(&db, "c", Mode::Words, 0, Some(15))?;
        let count = db.count_due_between(Mode::Words, Timestamp::new(10), Timestamp::new(20))?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn test_update_srs_rows_is_atomic() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add(&db, "a", Mode::Words, 1, Some(10))?;
        let updates = vec![
            (
                Mode::Words,
                SrsRow {
                    key: "a".to_string(),
                    level: 4,
                    review_date: Some(Timestamp::new(99)),
                },
            ),
            (
                Mode::Words,
                SrsRow {
                    key: "missing".to_string(),
                    level: 4,
                    review_date: None,
                },
            ),
        ];
        assert!(db.update_srs_rows(&updates).is_err());
        assert_eq!(db.level("a", Mode::Words)?, 1);
        Ok(())
    }
}
