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
use std::fs::create_dir_all;
use std::fs::read_dir;
use std::path::Path;
use std::path::PathBuf;

use tokio::task::JoinSet;

use crate::config::GlobalSettings;
use crate::config::LanguageConfig;
use crate::config::LanguageSettings;
use crate::db::Database;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::migrate::MigrationPlan;
use crate::migrate::migrate_items;
use crate::registry::modes_for_language;
use crate::schemes::SchemeBook;
use crate::srs::Srs;
use crate::types::timestamp::Timestamp;

const SETTINGS_FILE: &str = "settings.toml";
const SCHEMES_FILE: &str = "srs_schemes.toml";
const LANGUAGES_DIR: &str = "languages";
const DATABASE_FILE: &str = "database.sqlite3";

/// A directory holding the global settings, the SRS schemes, and one
/// subdirectory per language.
pub struct Library {
    root: PathBuf,
    settings: GlobalSettings,
    schemes: SchemeBook,
}

impl Library {
    pub fn open(root: &Path) -> Fallible<Self> {
        if !root.exists() {
            return fail("directory does not exist.");
        }
        create_dir_all(root.join(LANGUAGES_DIR))?;
        let settings = GlobalSettings::load(&root.join(SETTINGS_FILE))?;
        let schemes = SchemeBook::load(&root.join(SCHEMES_FILE))?;
        Ok(Self {
            root: root.to_path_buf(),
            settings,
            schemes,
        })
    }

    pub fn schemes(&self) -> &SchemeBook {
        &self.schemes
    }

    fn language_dir(&self, language: &str) -> PathBuf {
        self.root.join(LANGUAGES_DIR).join(language)
    }

    fn settings_path(&self, language: &str) -> PathBuf {
        self.language_dir(language).join(SETTINGS_FILE)
    }

    fn database_path(&self, language: &str) -> Fallible<String> {
        let path = self.language_dir(language).join(DATABASE_FILE);
        path.to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ErrorReport::new("invalid path"))
    }

    /// Names of all languages, sorted.
    pub fn languages(&self) -> Fallible<Vec<String>> {
        let mut languages = Vec::new();
        for entry in read_dir(self.root.join(LANGUAGES_DIR))? {
            let entry = entry?;
            if !entry.path().join(SETTINGS_FILE).exists() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                languages.push(name.to_string());
            }
        }
        languages.sort();
        Ok(languages)
    }

    pub fn create_language(
        &self,
        language: &str,
        secondary_language: &str,
        readings: bool,
        scheme: &str,
    ) -> Fallible<()> {
        if language.is_empty() || language.contains(['/', '\\']) || language.starts_with('.') {
            return Err(ErrorReport::invalid(format!(
                "Invalid language name '{language}'."
            )));
        }
        if self.settings_path(language).exists() {
            return Err(ErrorReport::invalid(format!(
                "Language '{language}' already exists."
            )));
        }
        self.schemes.get(scheme)?;
        create_dir_all(self.language_dir(language))?;
        let settings = LanguageSettings {
            secondary_language: secondary_language.to_string(),
            readings,
            srs_scheme: scheme.to_string(),
        };
        settings.save(&self.settings_path(language))?;
        Database::new(&self.database_path(language)?)?;
        log::debug!("Created language {language} using scheme '{scheme}'");
        Ok(())
    }

    pub fn language_settings(&self, language: &str) -> Fallible<LanguageSettings> {
        let path = self.settings_path(language);
        if !path.exists() {
            return Err(ErrorReport::not_found(format!(
                "Language '{language}' does not exist."
            )));
        }
        LanguageSettings::load(&path)
    }

    /// Build the configuration the scheduler needs for a language.
    pub fn language_config(&self, language: &str) -> Fallible<LanguageConfig> {
        let settings = self.language_settings(language)?;
        let modifier = self.settings.interval_modifier()?;
        let spacing = self.schemes.spacing(&settings.srs_scheme, modifier)?;
        Ok(LanguageConfig {
            language: language.to_string(),
            secondary_language: settings.secondary_language,
            readings: settings.readings,
            scheme: settings.srs_scheme,
            spacing,
            modes: modes_for_language(language),
        })
    }

    /// Open a language's store together with its configuration.
    pub fn load(&self, language: &str) -> Fallible<(Database, LanguageConfig)> {
        let config = self.language_config(language)?;
        let db = Database::new(&self.database_path(language)?)?;
        log::debug!("Loaded language {language}");
        Ok((db, config))
    }

    pub fn languages_using_scheme(&self, scheme: &str) -> Fallible<Vec<String>> {
        let mut result = Vec::new();
        for language in self.languages()? {
            if self.language_settings(&language)?.srs_scheme == scheme {
                result.push(language);
            }
        }
        Ok(result)
    }

    /// Languages using the scheme with at least one item at level 1 or
    /// above.
    pub fn non_empty_languages_using_scheme(&self, scheme: &str) -> Fallible<Vec<String>> {
        let mut result = Vec::new();
        for language in self.languages_using_scheme(scheme)? {
            let (db, config) = self.load(&language)?;
            if Srs::new(&db, &config).item_count()? > 0 {
                result.push(language);
            }
        }
        Ok(result)
    }

    pub fn create_scheme(&mut self, name: &str) -> Fallible<()> {
        self.schemes.create(name)?;
        self.schemes.save(&self.root.join(SCHEMES_FILE))
    }

    /// Edit a scheme. Languages using it follow a rename. Changing the number
    /// of levels is refused while any language has items scheduled under it.
    pub fn edit_scheme(
        &mut self,
        name: &str,
        new_name: &str,
        description: &str,
        intervals: Vec<String>,
    ) -> Fallible<()> {
        let old_levels = self.schemes.num_levels(name)?;
        if intervals.len() as u32 + 1 != old_levels {
            let users = self.non_empty_languages_using_scheme(name)?;
            if !users.is_empty() {
                return Err(ErrorReport::invalid(format!(
                    "Cannot change the number of levels of '{name}' while it is used by: {}.",
                    users.join(", ")
                )));
            }
        }
        let users = self.languages_using_scheme(name)?;
        self.schemes.edit(name, new_name, description, intervals)?;
        self.schemes.save(&self.root.join(SCHEMES_FILE))?;
        if new_name != name {
            for language in users {
                let mut settings = self.language_settings(&language)?;
                settings.srs_scheme = new_name.to_string();
                settings.save(&self.settings_path(&language))?;
                log::debug!("{language}: scheme renamed '{name}' -> '{new_name}'");
            }
        }
        Ok(())
    }

    /// Switch a language to another scheme, migrating its items. Without a
    /// plan, every level keeps its number, capped at the new scheme's top
    /// level. Returns the number of migrated items.
    pub fn switch_scheme(
        &self,
        language: &str,
        scheme: &str,
        plan: Option<MigrationPlan>,
    ) -> Fallible<usize> {
        self.switch_scheme_at(language, scheme, plan, Timestamp::now())
    }

    pub fn switch_scheme_at(
        &self,
        language: &str,
        scheme: &str,
        plan: Option<MigrationPlan>,
        now: Timestamp,
    ) -> Fallible<usize> {
        let (db, old_config) = self.load(language)?;
        let modifier = self.settings.interval_modifier()?;
        let new_spacing = self.schemes.spacing(scheme, modifier)?;
        let plan = match plan {
            Some(plan) => plan,
            None => MigrationPlan::identity(old_config.num_levels(), new_spacing.num_levels()),
        };
        let migrated = migrate_items(
            &db,
            &old_config.modes,
            &old_config.spacing,
            &new_spacing,
            &plan,
            now,
        )?;
        let mut settings = self.language_settings(language)?;
        settings.srs_scheme = scheme.to_string();
        settings.save(&self.settings_path(language))?;
        log::debug!(
            "{language}: switched scheme '{}' -> '{scheme}', {migrated} items migrated",
            old_config.scheme
        );
        Ok(migrated)
    }

    /// Items ready for review in each of the given languages. Each language
    /// is counted on its own blocking task against its own store; any
    /// failure fails the whole call.
    pub async fn ready_totals(&self, languages: &[String]) -> Fallible<BTreeMap<String, usize>> {
        self.ready_totals_at(languages, Timestamp::now()).await
    }

    pub async fn ready_totals_at(
        &self,
        languages: &[String],
        now: Timestamp,
    ) -> Fallible<BTreeMap<String, usize>> {
        let mut tasks: JoinSet<Fallible<(String, usize)>> = JoinSet::new();
        for language in languages {
            let config = self.language_config(language)?;
            let path = self.database_path(language)?;
            let language = language.clone();
            tasks.spawn_blocking(move || {
                let db = Database::new(&path)?;
                let total = Srs::new(&db, &config).total_ready_at(now)?;
                Ok((language, total))
            });
        }
        let mut totals = BTreeMap::new();
        while let Some(result) = tasks.join_next().await {
            let (language, total) = result??;
            totals.insert(language, total);
        }
        Ok(totals)
    }
}
