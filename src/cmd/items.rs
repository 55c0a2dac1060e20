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

use crate::cli::split_list;
use crate::error::Fallible;
use crate::error::fail;
use crate::library::Library;
use crate::registry::extended_solutions;
use crate::registry::solutions;
use crate::srs::Level;
use crate::srs::Srs;
use crate::types::mode::Mode;
use crate::types::mode::Part;
use crate::types::timestamp::Timestamp;

pub fn create_language(
    library: &Library,
    language: &str,
    secondary: &str,
    readings: bool,
    scheme: &str,
) -> Fallible<()> {
    library.create_language(language, secondary, readings, scheme)?;
    println!("Created {language}.");
    Ok(())
}

pub fn add_item(
    library: &Library,
    language: &str,
    key: &str,
    mode: Mode,
    solutions: &str,
    readings: Option<&str>,
    level: Level,
) -> Fallible<()> {
    let solutions = split_list(solutions);
    if solutions.is_empty() {
        return fail("at least one solution is required.");
    }
    let readings = readings.map(split_list).unwrap_or_default();
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    match srs.add_item_at(key, mode, &solutions, &readings, level, Timestamp::now())? {
        Some(due) => println!("Added '{key}' at level {level}, due {due}."),
        None => println!("Added '{key}' (not scheduled)."),
    }
    Ok(())
}

pub fn remove_item(library: &Library, language: &str, key: &str, mode: Mode) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    Srs::new(&db, &config).remove_item(key, mode)?;
    println!("Removed '{key}'.");
    Ok(())
}

pub fn show_level(
    library: &Library,
    language: &str,
    key: &str,
    mode: Mode,
    set: Option<Level>,
) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    match set {
        Some(level) => match srs.set_level(key, level, mode)? {
            Some(due) => println!("{key}: level {level}, due {due}."),
            None => println!("{key}: level {level} (not scheduled)."),
        },
        None => println!("{key}: level {} of {}.", srs.level(key, mode)?, srs.num_levels()),
    }
    Ok(())
}

pub fn show_solutions(
    library: &Library,
    language: &str,
    key: &str,
    mode: Mode,
    part: Part,
    extended: bool,
) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let answers: Vec<String> = if extended {
        extended_solutions(&db, key, mode, part, &config)?
            .into_iter()
            .collect()
    } else {
        solutions(&db, key, mode, part)?
    };
    for answer in answers {
        println!("{answer}");
    }
    Ok(())
}
