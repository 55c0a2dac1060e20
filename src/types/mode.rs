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

use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::ErrorReport;

/// A test mode: an independent category of review items with its own
/// backing table.
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Mode {
    Words,
    KanjiMeanings,
    KanjiOnYomi,
    KanjiKunYomi,
    HanziMeanings,
    HanziReadings,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Words,
        Mode::KanjiMeanings,
        Mode::KanjiOnYomi,
        Mode::KanjiKunYomi,
        Mode::HanziMeanings,
        Mode::HanziReadings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Words => "WORDS",
            Mode::KanjiMeanings => "KANJI_MEANINGS",
            Mode::KanjiOnYomi => "KANJI_ON_YOMI",
            Mode::KanjiKunYomi => "KANJI_KUN_YOMI",
            Mode::HanziMeanings => "HANZI_MEANINGS",
            Mode::HanziReadings => "HANZI_READINGS",
        }
    }

    /// The table holding this mode's items.
    pub fn table(&self) -> &'static str {
        match self {
            Mode::Words => "vocabulary",
            Mode::KanjiMeanings => "kanji_meanings",
            Mode::KanjiOnYomi => "kanji_on_yomi",
            Mode::KanjiKunYomi => "kanji_kun_yomi",
            Mode::HanziMeanings => "hanzi_meanings",
            Mode::HanziReadings => "hanzi_readings",
        }
    }

    /// The column identifying an item in this mode's table.
    pub fn key_column(&self) -> &'static str {
        match self {
            Mode::Words => "word",
            Mode::KanjiMeanings | Mode::KanjiOnYomi | Mode::KanjiKunYomi => "kanji",
            Mode::HanziMeanings | Mode::HanziReadings => "hanzi",
        }
    }

    /// The column holding the answers for the given part.
    pub fn solutions_column(&self, part: Part) -> Option<&'static str> {
        match (self, part) {
            (Mode::Words, Part::Solutions) => Some("translations"),
            (Mode::Words, Part::Readings) => Some("readings"),
            (Mode::KanjiMeanings, Part::Solutions) => Some("meanings"),
            (Mode::KanjiOnYomi, Part::Solutions) => Some("on_yomi"),
            (Mode::KanjiKunYomi, Part::Solutions) => Some("kun_yomi"),
            (Mode::HanziMeanings, Part::Solutions) => Some("meanings"),
            (Mode::HanziReadings, Part::Solutions) => Some("readings"),
            (_, Part::Readings) => None,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Mode {
    type Error = ErrorReport;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| ErrorReport::invalid(format!("Invalid test mode: {value}")))
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A separately tested question about an item.
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Part {
    Solutions,
    Readings,
}

impl Part {
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Solutions => "solutions",
            Part::Readings => "readings",
        }
    }
}

impl Display for Part {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::ErrorKind;
    use crate::error::Fallible;

    #[test]
    fn test_tables_are_distinct() {
        let tables: HashSet<&str> = Mode::ALL.iter().map(|m| m.table()).collect();
        assert_eq!(tables.len(), Mode::ALL.len());
    }

    #[test]
    fn test_mapping() {
        assert_eq!(Mode::Words.table(), "vocabulary");
        assert_eq!(Mode::Words.key_column(), "word");
        assert_eq!(Mode::KanjiOnYomi.table(), "kanji_on_yomi");
        assert_eq!(Mode::KanjiOnYomi.key_column(), "kanji");
        assert_eq!(Mode::HanziReadings.key_column(), "hanzi");
    }

    #[test]
    fn test_solutions_column() {
        assert_eq!(
            Mode::Words.solutions_column(Part::Readings),
            Some("readings")
        );
        assert_eq!(Mode::KanjiMeanings.solutions_column(Part::Readings), None);
        assert_eq!(
            Mode::KanjiKunYomi.solutions_column(Part::Solutions),
            Some("kun_yomi")
        );
    }

    #[test]
    fn test_string_round_trip() -> Fallible<()> {
        for mode in Mode::ALL {
            assert_eq!(Mode::try_from(mode.as_str())?, mode);
        }
        let err = Mode::try_from("KANJI_NANORI").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }
}
