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

use std::io::BufRead;
use std::io::Write;

use crate::error::Fallible;
use crate::library::Library;
use crate::review::Session;
use crate::review::apply_review;
use crate::srs::Srs;
use crate::types::mode::Mode;
use crate::types::timestamp::Timestamp;

pub fn list_due(library: &Library, language: &str, mode: Option<Mode>) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    let modes: Vec<Mode> = match mode {
        Some(mode) => vec![mode],
        None => srs.modes().to_vec(),
    };
    for mode in modes {
        for key in srs.ready_items(mode)? {
            println!("{mode}\t{key}");
        }
    }
    if mode.is_none() {
        println!("{} items ready.", srs.total_ready()?);
    }
    Ok(())
}

pub fn record_review(
    library: &Library,
    language: &str,
    key: &str,
    mode: Mode,
    correct: bool,
) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    let outcome = apply_review(&srs, key, mode, correct, Timestamp::now())?;
    match outcome.due {
        Some(due) => println!(
            "{key}: level {} -> {}, due {due}.",
            outcome.old_level, outcome.new_level
        ),
        None => println!("{key}: level {} -> {}.", outcome.old_level, outcome.new_level),
    }
    println!(
        "{} correct, {} mistakes so far.",
        outcome.correct_count, outcome.mistake_count
    );
    Ok(())
}

pub fn drill(library: &Library, language: &str) -> Fallible<()> {
    let stdin = std::io::stdin();
    drill_with(library, language, &mut stdin.lock())
}

/// Run a drill session reading answers from `input`. Ends early when the
/// input is exhausted; items not yet completed stay ready.
fn drill_with(library: &Library, language: &str, input: &mut impl BufRead) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    let mut session = Session::build(&srs, Timestamp::now())?;
    if session.is_finished() {
        println!("No items are ready for review.");
        return Ok(());
    }
    println!("{} items ready.", session.remaining());
    loop {
        let Some((item, part)) = session.current() else {
            break;
        };
        print!(
            "[{} / {}, level {}] {}: ",
            item.mode,
            part.as_str(),
            item.level,
            item.key
        );
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let Some(answer) = session.answer(&srs, &line, Timestamp::now())? else {
            break;
        };
        if answer.correct {
            println!("Correct.");
        } else {
            println!("Wrong. Solutions: {}", answer.solutions.join("; "));
        }
        if let Some(outcome) = answer.outcome {
            println!(
                "{}: level {} -> {} ({} correct, {} mistakes).",
                outcome.key,
                outcome.old_level,
                outcome.new_level,
                outcome.correct_count,
                outcome.mistake_count
            );
        }
    }
    println!(
        "Session over: {} correct, {} wrong.",
        session.num_correct, session.num_wrong
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::cmd::items::add_item;
    use crate::cmd::items::create_language;
    use crate::helper::create_tmp_directory;

    #[test]
    fn test_drill_session() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let library = Library::open(&dir)?;
        create_language(&library, "German", "English", false, "Default")?;
        add_item(&library, "German", "Hund", Mode::Words, "dog", None, 1)?;
        {
            let (db, config) = library.load("German")?;
            Srs::new(&db, &config).set_level_at("Hund", 1, Mode::Words, Timestamp::new(0))?;
        }
        let mut input = Cursor::new("cat\ndog\n");
        drill_with(&library, "German", &mut input)?;
        let (db, _) = library.load("German")?;
        assert_eq!(db.level("Hund", Mode::Words)?, 1);
        assert_eq!(db.counters("Hund", Mode::Words)?, (0, 1));
        Ok(())
    }

    #[test]
    fn test_drill_stops_at_end_of_input() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let library = Library::open(&dir)?;
        create_language(&library, "German", "English", false, "Default")?;
        add_item(&library, "German", "Hund", Mode::Words, "dog", None, 1)?;
        {
            let (db, config) = library.load("German")?;
            Srs::new(&db, &config).set_level_at("Hund", 1, Mode::Words, Timestamp::new(0))?;
        }
        let mut input = Cursor::new("");
        drill_with(&library, "German", &mut input)?;
        let (db, _) = library.load("German")?;
        assert_eq!(db.counters("Hund", Mode::Words)?, (0, 0));
        Ok(())
    }

    #[test]
    fn test_record_review() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let library = Library::open(&dir)?;
        create_language(&library, "German", "English", false, "Default")?;
        add_item(&library, "German", "Hund", Mode::Words, "dog", None, 1)?;
        record_review(&library, "German", "Hund", Mode::Words, true)?;
        list_due(&library, "German", None)?;
        let (db, _) = library.load("German")?;
        assert_eq!(db.level("Hund", Mode::Words)?, 2);
        assert!(record_review(&library, "German", "Katze", Mode::Words, true).is_err());
        Ok(())
    }
}
