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
use crate::library::Library;
use crate::migrate::MigrationPlan;

pub fn list_schemes(library: &Library) -> Fallible<()> {
    for scheme in library.schemes().schemes() {
        let intervals = library.schemes().interval_texts(&scheme.name)?;
        println!("{}: {}", scheme.name, intervals[1..].join(", "));
        if !scheme.description.is_empty() {
            println!("  {}", scheme.description);
        }
        let users = library.languages_using_scheme(&scheme.name)?;
        if !users.is_empty() {
            println!("  used by: {}", users.join(", "));
        }
    }
    Ok(())
}

pub fn create_scheme(library: &mut Library, name: &str) -> Fallible<()> {
    library.create_scheme(name)?;
    println!("Created scheme '{name}'.");
    Ok(())
}

/// Edit a scheme. Fields that are not given keep their current value.
pub fn edit_scheme(
    library: &mut Library,
    name: &str,
    rename: Option<&str>,
    description: Option<&str>,
    intervals: Option<&str>,
) -> Fallible<()> {
    let scheme = library.schemes().get(name)?.clone();
    let new_name = rename.unwrap_or(name);
    let description = description.unwrap_or(&scheme.description);
    let intervals = match intervals {
        Some(intervals) => split_list(intervals),
        None => scheme.intervals.clone(),
    };
    library.edit_scheme(name, new_name, description, intervals)?;
    println!("Saved scheme '{new_name}'.");
    Ok(())
}

pub fn switch_scheme(
    library: &Library,
    language: &str,
    scheme: &str,
    plan: Option<&str>,
) -> Fallible<()> {
    let plan: Option<MigrationPlan> = plan.map(|plan| plan.parse()).transpose()?;
    let migrated = library.switch_scheme(language, scheme, plan)?;
    println!("{language} now uses '{scheme}'; {migrated} items migrated.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::items::add_item;
    use crate::cmd::items::create_language;
    use crate::helper::create_tmp_directory;
    use crate::types::mode::Mode;

    #[test]
    fn test_scheme_commands() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let mut library = Library::open(&dir)?;
        create_scheme(&mut library, "Quick")?;
        edit_scheme(&mut library, "Quick", None, Some("Fast."), Some("1 hour; 1 day"))?;
        assert_eq!(library.schemes().num_levels("Quick")?, 3);
        edit_scheme(&mut library, "Quick", Some("Fast"), None, None)?;
        assert_eq!(library.schemes().get("Fast")?.description, "Fast.");
        assert!(edit_scheme(&mut library, "Quick", None, None, None).is_err());
        list_schemes(&library)?;

        create_language(&library, "German", "English", false, "Default")?;
        add_item(&library, "German", "Hund", Mode::Words, "dog", None, 2)?;
        assert!(switch_scheme(&library, "German", "Fast", Some("1:1")).is_err());
        assert!(switch_scheme(&library, "German", "Fast", Some("bogus")).is_err());
        switch_scheme(&library, "German", "Fast", Some("2:1,2+"))?;
        let (db, config) = library.load("German")?;
        assert_eq!(config.scheme, "Fast");
        // Just scheduled, so it lands on the first target.
        assert_eq!(db.level("Hund", Mode::Words)?, 1);
        Ok(())
    }
}
