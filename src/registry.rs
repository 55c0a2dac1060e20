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

//! Maps test modes to their storage and answers.

use std::collections::BTreeSet;

use crate::config::LanguageConfig;
use crate::db::Database;
use crate::error::Fallible;
use crate::types::mode::Mode;
use crate::types::mode::Part;

/// The test modes available for a language, in a stable order.
pub fn modes_for_language(language: &str) -> Vec<Mode> {
    match language {
        "Japanese" => vec![
            Mode::Words,
            Mode::KanjiMeanings,
            Mode::KanjiOnYomi,
            Mode::KanjiKunYomi,
        ],
        "Chinese" => vec![Mode::Words, Mode::HanziMeanings, Mode::HanziReadings],
        _ => vec![Mode::Words],
    }
}

/// The parts tested for items of a mode. Words get a readings part when the
/// language uses a reading system.
pub fn parts(mode: Mode, config: &LanguageConfig) -> Vec<Part> {
    match mode {
        Mode::Words if config.readings => vec![Part::Solutions, Part::Readings],
        _ => vec![Part::Solutions],
    }
}

/// Like `parts`, but drops the readings part of a word that has none.
pub fn parts_for_item(
    db: &Database,
    key: &str,
    mode: Mode,
    config: &LanguageConfig,
) -> Fallible<Vec<Part>> {
    let mut result = Vec::new();
    for part in parts(mode, config) {
        if part == Part::Readings && db.solutions(key, mode, part)?.is_empty() {
            continue;
        }
        result.push(part);
    }
    Ok(result)
}

/// The canonical answers for a part of an item.
pub fn solutions(db: &Database, key: &str, mode: Mode, part: Part) -> Fallible<Vec<String>> {
    db.solutions(key, mode, part)
}

/// The canonical answers plus lenient variants of them.
pub fn extended_solutions(
    db: &Database,
    key: &str,
    mode: Mode,
    part: Part,
    config: &LanguageConfig,
) -> Fallible<BTreeSet<String>> {
    let canonical = db.solutions(key, mode, part)?;
    Ok(extend_solutions(&canonical, &config.secondary_language))
}

/// Derive the accepted answers from canonical ones:
///
/// - With English as the secondary language, `"to eat"` also accepts `"eat"`.
/// - `"(to) run (fast)"` also accepts `"to run fast"` (brackets dropped)
///   and `"run"` (bracketed spans dropped).
pub fn extend_solutions(canonical: &[String], secondary_language: &str) -> BTreeSet<String> {
    let english = secondary_language == "English";
    let mut accepted: BTreeSet<String> = BTreeSet::new();
    for solution in canonical {
        accepted.insert(solution.clone());
        if english {
            if let Some(stripped) = strip_infinitive(solution) {
                accepted.insert(stripped);
            }
        }
    }
    let snapshot: Vec<String> = accepted.iter().cloned().collect();
    for solution in snapshot {
        if !solution.contains(['(', ')', '[', ']']) {
            continue;
        }
        for variant in [remove_brackets(&solution), remove_bracketed(&solution)] {
            if variant.is_empty() {
                continue;
            }
            if english {
                if let Some(stripped) = strip_infinitive(&variant) {
                    accepted.insert(stripped);
                }
            }
            accepted.insert(variant);
        }
    }
    accepted
}

fn strip_infinitive(solution: &str) -> Option<String> {
    solution
        .strip_prefix("to ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Drop the bracket characters, keep their content.
fn remove_brackets(solution: &str) -> String {
    let text: String = solution
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect();
    normalize_whitespace(&text)
}

/// Drop bracketed spans together with their content.
fn remove_bracketed(solution: &str) -> String {
    let mut text = String::new();
    let mut depth: usize = 0;
    for c in solution.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => text.push(c),
            _ => {}
        }
    }
    normalize_whitespace(&text)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
