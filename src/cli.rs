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

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::cmd::items::add_item;
use crate::cmd::items::create_language;
use crate::cmd::items::remove_item;
use crate::cmd::items::show_level;
use crate::cmd::items::show_solutions;
use crate::cmd::review::drill;
use crate::cmd::review::list_due;
use crate::cmd::review::record_review;
use crate::cmd::schemes::create_scheme;
use crate::cmd::schemes::edit_scheme;
use crate::cmd::schemes::list_schemes;
use crate::cmd::schemes::switch_scheme;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_schedule;
use crate::cmd::stats::print_status;
use crate::cmd::stats::print_totals;
use crate::error::Fallible;
use crate::library::Library;
use crate::srs::Level;
use crate::srs::TimeUnit;
use crate::types::mode::Mode;
use crate::types::mode::Part;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the library directory. Defaults to the current directory.
    #[arg(long, global = true)]
    directory: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a language.
    Init {
        language: String,
        /// The language answers are given in.
        #[arg(long, default_value = "English")]
        secondary: String,
        /// Test the readings of words.
        #[arg(long)]
        readings: bool,
        /// The SRS scheme to use.
        #[arg(long, default_value = "Default")]
        scheme: String,
    },
    /// Add an item.
    Add {
        key: String,
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = Mode::Words)]
        mode: Mode,
        /// Solutions separated by semicolons.
        #[arg(long)]
        solutions: String,
        /// Readings separated by semicolons. Words only.
        #[arg(long)]
        readings: Option<String>,
        #[arg(long, default_value_t = 1)]
        level: Level,
    },
    /// Remove an item.
    Remove {
        key: String,
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = Mode::Words)]
        mode: Mode,
    },
    /// Show or set the level of an item.
    Level {
        key: String,
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = Mode::Words)]
        mode: Mode,
        /// Move the item to this level.
        #[arg(long)]
        set: Option<Level>,
    },
    /// List the items ready for review.
    Due {
        #[arg(long)]
        language: String,
        /// Only this mode.
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Record the outcome of a review.
    Review {
        key: String,
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = Mode::Words)]
        mode: Mode,
        #[arg(long, conflicts_with = "wrong", required_unless_present = "wrong")]
        correct: bool,
        #[arg(long)]
        wrong: bool,
    },
    /// Review every ready item interactively.
    Drill {
        #[arg(long)]
        language: String,
    },
    /// Show the solutions of an item.
    Solutions {
        key: String,
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = Mode::Words)]
        mode: Mode,
        #[arg(long, value_enum, default_value_t = Part::Solutions)]
        part: Part,
        /// Include the lenient variants accepted as answers.
        #[arg(long)]
        extended: bool,
    },
    /// Ready and waiting items per mode and level.
    Status {
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// Ready items per language.
    Totals {
        /// Languages to count. Defaults to all.
        languages: Vec<String>,
    },
    /// Items falling due over the coming hours, days, weeks or months.
    Schedule {
        #[arg(long)]
        language: String,
        #[arg(long, value_enum, default_value_t = TimeUnit::Days)]
        unit: TimeUnit,
        #[arg(long, default_value_t = 7)]
        count: usize,
    },
    /// List the SRS schemes.
    Schemes,
    /// Create an empty SRS scheme.
    SchemeCreate { name: String },
    /// Edit an SRS scheme.
    SchemeEdit {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Intervals separated by semicolons, e.g. "4 hours;1 day;1 week".
        #[arg(long)]
        intervals: Option<String>,
    },
    /// Switch a language to another SRS scheme, migrating its items.
    SwitchScheme {
        scheme: String,
        #[arg(long)]
        language: String,
        /// Migration plan, e.g. "1:1;2:2,3+;3:4-". Defaults to keeping
        /// levels.
        #[arg(long)]
        plan: Option<String>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let directory: PathBuf = match cli.directory {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let mut library = Library::open(&directory)?;
    match cli.command {
        Command::Init {
            language,
            secondary,
            readings,
            scheme,
        } => create_language(&library, &language, &secondary, readings, &scheme),
        Command::Add {
            key,
            language,
            mode,
            solutions,
            readings,
            level,
        } => add_item(
            &library,
            &language,
            &key,
            mode,
            &solutions,
            readings.as_deref(),
            level,
        ),
        Command::Remove {
            key,
            language,
            mode,
        } => remove_item(&library, &language, &key, mode),
        Command::Level {
            key,
            language,
            mode,
            set,
        } => show_level(&library, &language, &key, mode, set),
        Command::Due { language, mode } => list_due(&library, &language, mode),
        Command::Review {
            key,
            language,
            mode,
            correct,
            wrong: _,
        } => record_review(&library, &language, &key, mode, correct),
        Command::Drill { language } => drill(&library, &language),
        Command::Solutions {
            key,
            language,
            mode,
            part,
            extended,
        } => show_solutions(&library, &language, &key, mode, part, extended),
        Command::Status { language, format } => print_status(&library, &language, format),
        Command::Totals { languages } => print_totals(&library, languages).await,
        Command::Schedule {
            language,
            unit,
            count,
        } => print_schedule(&library, &language, unit, count),
        Command::Schemes => list_schemes(&library),
        Command::SchemeCreate { name } => create_scheme(&mut library, &name),
        Command::SchemeEdit {
            name,
            rename,
            description,
            intervals,
        } => edit_scheme(
            &mut library,
            &name,
            rename.as_deref(),
            description.as_deref(),
            intervals.as_deref(),
        ),
        Command::SwitchScheme {
            scheme,
            language,
            plan,
        } => switch_scheme(&library, &language, &scheme, plan.as_deref()),
    }
}

/// Split a semicolon-separated list, dropping blank entries.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(';')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a; b ;;c"), vec!["a", "b", "c"]);
        assert!(split_list(" ; ").is_empty());
    }

    #[test]
    fn test_parse_review() {
        let cli = Cli::try_parse_from([
            "lexicards",
            "review",
            "Hund",
            "--language",
            "German",
            "--wrong",
        ]);
        assert!(cli.is_ok());
        let cli = Cli::try_parse_from(["lexicards", "review", "Hund", "--language", "German"]);
        assert!(cli.is_err());
    }
}
