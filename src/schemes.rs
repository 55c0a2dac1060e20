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

use std::fs::read_to_string;
use std::fs::write;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::config::Spacing;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::srs::Level;
use crate::types::time_span::TimeSpan;

const DEFAULT_SCHEMES: &str = include_str!("default_schemes.toml");

/// The text of the terminal level every scheme ends with.
const TERMINAL_INTERVAL: &str = "Infinity";

/// A named sequence of SRS intervals.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Scheme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// One time span per level, starting at level 1. The terminal level is
    /// implicit.
    #[serde(default)]
    pub intervals: Vec<String>,
}

/// All known SRS schemes.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SchemeBook {
    #[serde(rename = "scheme", default)]
    schemes: Vec<Scheme>,
}

impl SchemeBook {
    pub fn defaults() -> Fallible<Self> {
        let book: Self = toml::from_str(DEFAULT_SCHEMES)?;
        Ok(book)
    }

    /// Load schemes from `path`. If the file does not exist, the built-in
    /// schemes are written there first.
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            log::debug!("Writing default SRS schemes to {}", path.display());
            let book = Self::defaults()?;
            book.save(path)?;
            return Ok(book);
        }
        let content = read_to_string(path)?;
        let book: Self = toml::from_str(&content)?;
        Ok(book)
    }

    pub fn save(&self, path: &Path) -> Fallible<()> {
        let content = toml::to_string_pretty(self)?;
        write(path, content)?;
        Ok(())
    }

    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    pub fn get(&self, name: &str) -> Fallible<&Scheme> {
        self.schemes
            .iter()
            .find(|scheme| scheme.name == name)
            .ok_or_else(|| scheme_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemes.iter().any(|scheme| scheme.name == name)
    }

    /// Add an empty scheme. Fails if the name is taken.
    pub fn create(&mut self, name: &str) -> Fallible<()> {
        if self.contains(name) {
            return Err(ErrorReport::invalid(format!(
                "SRS scheme with name '{name}' already exists."
            )));
        }
        self.schemes.push(Scheme {
            name: name.to_string(),
            description: String::new(),
            intervals: Vec::new(),
        });
        Ok(())
    }

    /// Replace a scheme's name, description and intervals.
    pub fn edit(
        &mut self,
        name: &str,
        new_name: &str,
        description: &str,
        intervals: Vec<String>,
    ) -> Fallible<&Scheme> {
        for interval in &intervals {
            interval.parse::<TimeSpan>()?;
        }
        if new_name != name && self.contains(new_name) {
            return Err(ErrorReport::invalid(format!(
                "SRS scheme with name '{new_name}' already exists."
            )));
        }
        let scheme = self
            .schemes
            .iter_mut()
            .find(|scheme| scheme.name == name)
            .ok_or_else(|| scheme_not_found(name))?;
        scheme.name = new_name.to_string();
        scheme.description = description.to_string();
        scheme.intervals = intervals;
        Ok(scheme)
    }

    /// Interval texts indexed by level. Index 0 is empty since levels start
    /// at 1, and the last entry is the terminal level.
    pub fn interval_texts(&self, name: &str) -> Fallible<Vec<String>> {
        let scheme = self.get(name)?;
        let mut texts = Vec::with_capacity(scheme.intervals.len() + 2);
        texts.push(String::new());
        texts.extend(scheme.intervals.iter().cloned());
        texts.push(TERMINAL_INTERVAL.to_string());
        Ok(texts)
    }

    /// Number of levels, including the terminal one.
    pub fn num_levels(&self, name: &str) -> Fallible<Level> {
        Ok(self.interval_texts(name)?.len() as Level - 1)
    }

    /// The scheme's intervals in seconds, each reduced by `modifier`.
    pub fn spacing(&self, name: &str, modifier: TimeSpan) -> Fallible<Spacing> {
        let texts = self.interval_texts(name)?;
        let mut intervals = Vec::with_capacity(texts.len() - 1);
        for text in texts.iter().skip(1) {
            let span: TimeSpan = text.parse()?;
            intervals.push(span.reduce_by(modifier).seconds());
        }
        Ok(Spacing::new(intervals))
    }
}

fn scheme_not_found(name: &str) -> ErrorReport {
    ErrorReport::not_found(format!("SRS scheme with name '{name}' could not be found."))
}
