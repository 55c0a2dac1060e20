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

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::srs::Level;
use crate::types::mode::Mode;
use crate::types::time_span::TimeSpan;

/// Settings shared by all languages.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GlobalSettings {
    /// Subtracted from every finite SRS interval, so that items come due a
    /// little before the nominal interval has passed.
    #[serde(default = "default_interval_modifier")]
    pub interval_modifier: String,
}

fn default_interval_modifier() -> String {
    "0 seconds".to_string()
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            interval_modifier: default_interval_modifier(),
        }
    }
}

impl GlobalSettings {
    /// Load from `path`, falling back to defaults if the file is missing.
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn interval_modifier(&self) -> Fallible<TimeSpan> {
        self.interval_modifier.parse()
    }
}

/// Persisted per-language settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LanguageSettings {
    /// The language answers are given in.
    pub secondary_language: String,
    /// Whether words of this language have readings to be tested.
    #[serde(default)]
    pub readings: bool,
    /// Name of the SRS scheme in use.
    pub srs_scheme: String,
}

impl LanguageSettings {
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            return Err(ErrorReport::not_found(format!(
                "Language settings not found: {}",
                path.display()
            )));
        }
        let content = read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Fallible<()> {
        let content = toml::to_string_pretty(self)?;
        write(path, content)?;
        Ok(())
    }
}

/// Seconds to wait before an item at a given level comes due. Levels start
/// at 1; the highest level is `num_levels()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spacing {
    intervals: Vec<i64>,
}

impl Spacing {
    /// `intervals[i]` is the interval of level `i + 1`.
    pub fn new(intervals: Vec<i64>) -> Self {
        Self { intervals }
    }

    pub fn num_levels(&self) -> Level {
        self.intervals.len() as Level
    }

    pub fn interval(&self, level: Level) -> Option<i64> {
        if level == 0 {
            return None;
        }
        self.intervals.get(level as usize - 1).copied()
    }

    /// Like `interval`, with level 0 and levels past the end treated as a
    /// zero-length interval.
    pub fn interval_or_zero(&self, level: Level) -> i64 {
        self.interval(level).unwrap_or(0)
    }
}

/// Everything the scheduler needs to know about one language. Built once
/// when the language is loaded and passed around by reference.
#[derive(Clone, Debug)]
pub struct LanguageConfig {
    pub language: String,
    pub secondary_language: String,
    pub readings: bool,
    pub scheme: String,
    pub spacing: Spacing,
    pub modes: Vec<Mode>,
}

impl LanguageConfig {
    pub fn num_levels(&self) -> Level {
        self.spacing.num_levels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::helper::create_tmp_directory;

    #[test]
    fn test_spacing() {
        let spacing = Spacing::new(vec![10, 20, i64::MAX]);
        assert_eq!(spacing.num_levels(), 3);
        assert_eq!(spacing.interval(0), None);
        assert_eq!(spacing.interval(1), Some(10));
        assert_eq!(spacing.interval(3), Some(i64::MAX));
        assert_eq!(spacing.interval(4), None);
        assert_eq!(spacing.interval_or_zero(4), 0);
    }

    #[test]
    fn test_global_settings_default_when_missing() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let settings = GlobalSettings::load(&dir.join("settings.toml"))?;
        assert_eq!(settings, GlobalSettings::default());
        assert_eq!(settings.interval_modifier()?, TimeSpan::Finite(0));
        Ok(())
    }

    #[test]
    fn test_global_settings_parse() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let path = dir.join("settings.toml");
        write(&path, "interval_modifier = \"1 hour\"\n")?;
        let settings = GlobalSettings::load(&path)?;
        assert_eq!(settings.interval_modifier()?, TimeSpan::Finite(3600));
        Ok(())
    }

    #[test]
    fn test_language_settings_round_trip() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let path = dir.join("settings.toml");
        let settings = LanguageSettings {
            secondary_language: "English".to_string(),
            readings: true,
            srs_scheme: "Default".to_string(),
        };
        settings.save(&path)?;
        assert_eq!(LanguageSettings::load(&path)?, settings);
        Ok(())
    }

    #[test]
    fn test_language_settings_missing() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let err = LanguageSettings::load(&dir.join("nope.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }
}
