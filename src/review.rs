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

use std::collections::BTreeSet;
use std::collections::VecDeque;

use serde::Serialize;

use crate::db::Database;
use crate::error::Fallible;
use crate::registry::extended_solutions;
use crate::registry::parts_for_item;
use crate::registry::solutions;
use crate::srs::Level;
use crate::srs::Srs;
use crate::srs::new_level;
use crate::types::mode::Mode;
use crate::types::mode::Part;
use crate::types::timestamp::Timestamp;

pub fn increment_correct_counter(db: &Database, key: &str, mode: Mode) -> Fallible<()> {
    db.increment_correct(key, mode)
}

pub fn increment_mistakes_counter(db: &Database, key: &str, mode: Mode) -> Fallible<()> {
    db.increment_mistakes(key, mode)
}

/// The result of recording a review.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub key: String,
    pub mode: Mode,
    pub correct: bool,
    pub old_level: Level,
    pub new_level: Level,
    pub due: Option<Timestamp>,
    /// Counters after this review.
    pub correct_count: u64,
    pub mistake_count: u64,
}

/// Record a review of an item: move it to its new level, capped at the
/// scheme's highest level, and bump the matching counter.
pub fn apply_review(
    srs: &Srs,
    key: &str,
    mode: Mode,
    correct: bool,
    now: Timestamp,
) -> Fallible<ReviewOutcome> {
    let old_level = srs.level(key, mode)?;
    let level = new_level(old_level, correct).min(srs.num_levels());
    let due = srs.set_level_at(key, level, mode, now)?;
    if correct {
        increment_correct_counter(srs.db(), key, mode)?;
    } else {
        increment_mistakes_counter(srs.db(), key, mode)?;
    }
    let (correct_count, mistake_count) = srs.db().counters(key, mode)?;
    Ok(ReviewOutcome {
        key: key.to_string(),
        mode,
        correct,
        old_level,
        new_level: level,
        due,
        correct_count,
        mistake_count,
    })
}

/// Whether `answer` matches one of the accepted solutions.
///
/// Beyond exact matches against the extended solutions, this deliberately
/// forgives small typos outside of readings: an edit distance below a quarter
/// of the solution's length still counts. Readings must match exactly.
pub fn check_answer(answer: &str, accepted: &BTreeSet<String>, part: Part) -> bool {
    let answer = answer.trim();
    if accepted.contains(answer) {
        return true;
    }
    if part == Part::Readings {
        return false;
    }
    accepted.iter().any(|solution| {
        let length = solution.chars().count();
        4 * levenshtein_distance(answer, solution) < length
    })
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// An item being tested in a drill session.
#[derive(Clone, Debug)]
pub struct TestItem {
    pub key: String,
    pub mode: Mode,
    pub level: Level,
    /// Parts still to be answered, in order.
    pub parts: VecDeque<Part>,
    /// Set once any part has been answered wrongly.
    marked: bool,
}

/// The result of answering one question.
#[derive(Clone, Debug)]
pub struct Answer {
    pub correct: bool,
    /// The canonical solutions, for display.
    pub solutions: Vec<String>,
    /// Present when this answer completed the item.
    pub outcome: Option<ReviewOutcome>,
}

/// A review session over every item that is ready. Wrongly answered parts go
/// back into the queue; an item is graded once all of its parts have been
/// answered correctly, and counts as correct only if no answer was wrong.
pub struct Session {
    queue: VecDeque<TestItem>,
    pub num_correct: usize,
    pub num_wrong: usize,
}

impl Session {
    pub fn build(srs: &Srs, now: Timestamp) -> Fallible<Self> {
        let mut queue = VecDeque::new();
        for mode in srs.modes() {
            for key in srs.ready_items_at(*mode, now)? {
                let level = srs.level(&key, *mode)?;
                let parts = parts_for_item(srs.db(), &key, *mode, srs.config())?;
                queue.push_back(TestItem {
                    key,
                    mode: *mode,
                    level,
                    parts: parts.into_iter().collect(),
                    marked: false,
                });
            }
        }
        log::debug!("Session with {} items", queue.len());
        Ok(Self {
            queue,
            num_correct: 0,
            num_wrong: 0,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// The item and part to ask next.
    pub fn current(&self) -> Option<(&TestItem, Part)> {
        let item = self.queue.front()?;
        let part = *item.parts.front()?;
        Some((item, part))
    }

    /// Evaluate an answer to the current question.
    pub fn answer(&mut self, srs: &Srs, answer: &str, now: Timestamp) -> Fallible<Option<Answer>> {
        let Some(mut item) = self.queue.pop_front() else {
            return Ok(None);
        };
        let Some(part) = item.parts.pop_front() else {
            return Ok(None);
        };
        let config = srs.config();
        let accepted = extended_solutions(srs.db(), &item.key, item.mode, part, config)?;
        let canonical = solutions(srs.db(), &item.key, item.mode, part)?;
        let correct = check_answer(answer, &accepted, part);
        if !correct {
            item.marked = true;
            item.parts.push_back(part);
        }
        if !item.parts.is_empty() {
            self.queue.push_back(item);
            return Ok(Some(Answer {
                correct,
                solutions: canonical,
                outcome: None,
            }));
        }
        let item_correct = !item.marked;
        let outcome = apply_review(srs, &item.key, item.mode, item_correct, now)?;
        if item_correct {
            self.num_correct += 1;
        } else {
            self.num_wrong += 1;
        }
        Ok(Some(Answer {
            correct,
            solutions: canonical,
            outcome: Some(outcome),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageConfig;
    use crate::config::Spacing;
    use crate::db::NewItem;
    use crate::error::ErrorKind;
    use crate::registry::modes_for_language;

    const HOUR: i64 = 3600;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn config(language: &str) -> LanguageConfig {
        LanguageConfig {
            language: language.to_string(),
            secondary_language: "English".to_string(),
            readings: true,
            scheme: "Test".to_string(),
            spacing: Spacing::new(vec![HOUR, 2 * HOUR, i64::MAX]),
            modes: modes_for_language(language),
        }
    }

    fn add_word(db: &Database, key: &str, solutions: &[&str], readings: &[&str], level: Level) -> Fallible<()> {
        db.add_item(&NewItem {
            key,
            mode: Mode::Words,
            solutions: &strings(solutions),
            readings: &strings(readings),
            level,
            review_date: Some(Timestamp::new(0)),
            added_at: Timestamp::new(0),
        })
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("犬", "猫"), 1);
    }

    #[test]
    fn test_check_answer() {
        let accepted: BTreeSet<String> = strings(&["television", "tv"]).into_iter().collect();
        assert!(check_answer("tv", &accepted, Part::Solutions));
        assert!(check_answer("  tv ", &accepted, Part::Solutions));
        assert!(check_answer("televisoin", &accepted, Part::Solutions));
        assert!(!check_answer("radio", &accepted, Part::Solutions));
        assert!(!check_answer("televisoin", &accepted, Part::Readings));
    }

    #[test]
    fn test_apply_review() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let config = config("German");
        let srs = Srs::new(&db, &config);
        add_word(&db, "Hund", &["dog"], &[], 1)?;
        let now = Timestamp::new(1_000);
        let outcome = apply_review(&srs, "Hund", Mode::Words, true, now)?;
        assert_eq!(outcome.old_level, 1);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(outcome.due, Some(now.plus(2 * HOUR)));
        let outcome = apply_review(&srs, "Hund", Mode::Words, false, now)?;
        assert_eq!(outcome.new_level, 1);
        assert_eq!(db.counters("Hund", Mode::Words)?, (1, 1));
        assert_eq!((outcome.correct_count, outcome.mistake_count), (1, 1));
        Ok(())
    }

    #[test]
    fn test_apply_review_caps_at_top_level() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let config = config("German");
        let srs = Srs::new(&db, &config);
        add_word(&db, "Hund", &["dog"], &[], 3)?;
        let outcome = apply_review(&srs, "Hund", Mode::Words, true, Timestamp::new(0))?;
        assert_eq!(outcome.new_level, 3);
        assert_eq!(outcome.due, Some(Timestamp::new(i64::MAX)));
        Ok(())
    }

    #[test]
    fn test_apply_review_missing_item() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let config = config("German");
        let srs = Srs::new(&db, &config);
        let err = apply_review(&srs, "Katze", Mode::Words, true, Timestamp::new(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_counters_concurrent_increments() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add_word(&db, "Hund", &["dog"], &[], 1)?;
        let mut tasks: tokio::task::JoinSet<Fallible<()>> = tokio::task::JoinSet::new();
        for i in 0..40 {
            let db = db.clone();
            tasks.spawn_blocking(move || {
                if i % 4 == 0 {
                    increment_mistakes_counter(&db, "Hund", Mode::Words)
                } else {
                    increment_correct_counter(&db, "Hund", Mode::Words)
                }
            });
        }
        while let Some(result) = tasks.join_next().await {
            result??;
        }
        assert_eq!(db.counters("Hund", Mode::Words)?, (30, 10));
        Ok(())
    }

    #[test]
    fn test_counters_from_threads() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add_word(&db, "Hund", &["dog"], &[], 1)?;
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || increment_correct_counter(&db, "Hund", Mode::Words))
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .map_err(|_| crate::error::ErrorReport::new("thread panicked"))??;
        }
        assert_eq!(db.counters("Hund", Mode::Words)?, (16, 0));
        Ok(())
    }

    #[test]
    fn test_counters_sequential_increments() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        add_word(&db, "Hund", &["dog"], &[], 1)?;
        for _ in 0..25 {
            increment_correct_counter(&db, "Hund", Mode::Words)?;
        }
        increment_mistakes_counter(&db, "Hund", Mode::Words)?;
        assert_eq!(db.counters("Hund", Mode::Words)?, (25, 1));
        Ok(())
    }

    #[test]
    fn test_session_all_correct() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let config = config("Japanese");
        let srs = Srs::new(&db, &config);
        add_word(&db, "犬", &["dog"], &["いぬ"], 1)?;
        let now = Timestamp::new(100);
        let mut session = Session::build(&srs, now)?;
        assert_eq!(session.remaining(), 1);

        let (item, part) = session.current().ok_or_else(|| crate::error::ErrorReport::new("empty"))?;
        assert_eq!(item.key, "犬");
        assert_eq!(part, Part::Solutions);
        let answer = session.answer(&srs, "dog", now)?.ok_or_else(|| crate::error::ErrorReport::new("none"))?;
        assert!(answer.correct);
        assert!(answer.outcome.is_none());

        let (_, part) = session.current().ok_or_else(|| crate::error::ErrorReport::new("empty"))?;
        assert_eq!(part, Part::Readings);
        let answer = session.answer(&srs, "いぬ", now)?.ok_or_else(|| crate::error::ErrorReport::new("none"))?;
        let outcome = answer.outcome.ok_or_else(|| crate::error::ErrorReport::new("no outcome"))?;
        assert!(outcome.correct);
        assert_eq!(outcome.new_level, 2);
        assert!(session.is_finished());
        assert_eq!((session.num_correct, session.num_wrong), (1, 0));
        Ok(())
    }

    #[test]
    fn test_session_wrong_answer_requeues() -> Fallible<()> {
        let db = Database::new(":memory:")?;
        let config = config("German");
        let srs = Srs::new(&db, &config);
        add_word(&db, "Hund", &["dog"], &[], 2)?;
        add_word(&db, "Katze", &["cat"], &[], 1)?;
        let now = Timestamp::new(100);
        let mut session = Session::build(&srs, now)?;
        assert_eq!(session.remaining(), 2);

        // "Hund" and "Katze" both came due at 0; ordered by key.
        let answer = session.answer(&srs, "bird", now)?.ok_or_else(|| crate::error::ErrorReport::new("none"))?;
        assert!(!answer.correct);
        assert_eq!(answer.solutions, vec!["dog"]);
        assert!(answer.outcome.is_none());

        let answer = session.answer(&srs, "cat", now)?.ok_or_else(|| crate::error::ErrorReport::new("none"))?;
        assert!(answer.outcome.is_some());

        let answer = session.answer(&srs, "dog", now)?.ok_or_else(|| crate::error::ErrorReport::new("none"))?;
        let outcome = answer.outcome.ok_or_else(|| crate::error::ErrorReport::new("no outcome"))?;
        assert!(!outcome.correct);
        assert_eq!(outcome.old_level, 2);
        assert_eq!(outcome.new_level, 1);
        assert!(session.is_finished());
        assert_eq!((session.num_correct, session.num_wrong), (1, 1));
        assert_eq!(db.counters("Hund", Mode::Words)?, (0, 1));
        Ok(())
    }
}
