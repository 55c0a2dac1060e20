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
use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Fallible;
use crate::library::Library;
use crate::srs::Amounts;
use crate::srs::Level;
use crate::srs::ScheduleEntry;
use crate::srs::Srs;
use crate::srs::TimeUnit;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Plain text table.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    language: String,
    scheme: String,
    num_levels: Level,
    total_ready: usize,
    total_waiting: usize,
    items_per_level: BTreeMap<Level, usize>,
    amounts: Amounts,
}

pub fn print_status(library: &Library, language: &str, format: StatsFormat) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let srs = Srs::new(&db, &config);
    let amounts = srs.amounts()?;
    let status = Status {
        language: language.to_string(),
        scheme: config.scheme.clone(),
        num_levels: srs.num_levels(),
        total_ready: amounts.total_ready(),
        total_waiting: amounts.total_waiting(),
        items_per_level: srs.items_per_level()?,
        amounts,
    };
    match format {
        StatsFormat::Json => {
            let status_json = serde_json::to_string_pretty(&status)?;
            println!("{}", status_json);
        }
        StatsFormat::Text => {
            println!(
                "{} ({}): {} ready, {} waiting",
                status.language, status.scheme, status.total_ready, status.total_waiting
            );
            for (mode, levels) in &status.amounts.modes {
                println!("{mode}");
                for (level, amounts) in levels.iter().enumerate().skip(1) {
                    println!(
                        "  level {level:>2}: {:>5} ready {:>5} waiting",
                        amounts.ready, amounts.waiting
                    );
                }
            }
        }
    }
    Ok(())
}

pub async fn print_totals(library: &Library, languages: Vec<String>) -> Fallible<()> {
    let languages = if languages.is_empty() {
        library.languages()?
    } else {
        languages
    };
    let totals = library.ready_totals(&languages).await?;
    for (language, total) in &totals {
        println!("{language}: {total}");
    }
    println!("Total: {}", totals.values().sum::<usize>());
    Ok(())
}

pub fn print_schedule(
    library: &Library,
    language: &str,
    unit: TimeUnit,
    count: usize,
) -> Fallible<()> {
    let (db, config) = library.load(language)?;
    let schedule: Vec<ScheduleEntry> = Srs::new(&db, &config).schedule(unit, count)?;
    for entry in schedule {
        println!("until {}: {}", entry.end, entry.amount);
    }
    Ok(())
}
