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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

/// The broad category of an error.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// An item, scheme, or language does not exist.
    NotFound,
    /// The caller passed a value that is out of range or malformed.
    InvalidInput,
    /// The backing store failed.
    Storage,
    /// Anything else: I/O, configuration parsing, task failures.
    Other,
}

#[derive(Debug)]
pub struct ErrorReport {
    kind: ErrorKind,
    message: String,
}

impl ErrorReport {
    pub fn new(message: &str) -> Self {
        Self::with_kind(ErrorKind::Other, message)
    }

    pub fn with_kind(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

pub fn fail<T>(msg: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport {
        kind: ErrorKind::Other,
        message: msg.into(),
    })
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport::new(&format!("I/O error: {value:#?}"))
    }
}

impl From<rusqlite::Error> for ErrorReport {
    fn from(value: rusqlite::Error) -> Self {
        ErrorReport::with_kind(ErrorKind::Storage, &format!("database error: {value}"))
    }
}

impl From<toml::de::Error> for ErrorReport {
    fn from(value: toml::de::Error) -> Self {
        ErrorReport::new(&format!("failed to parse TOML: {value}"))
    }
}

impl From<toml::ser::Error> for ErrorReport {
    fn from(value: toml::ser::Error) -> Self {
        ErrorReport::new(&format!("failed to serialize TOML: {value}"))
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport::new(&format!("JSON error: {value}"))
    }
}

impl From<tokio::task::JoinError> for ErrorReport {
    fn from(value: tokio::task::JoinError) -> Self {
        ErrorReport::new(&format!("task failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ErrorReport::new("directory does not exist.");
        assert_eq!(err.to_string(), "error: directory does not exist.");
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ErrorReport::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(ErrorReport::invalid("x").kind(), ErrorKind::InvalidInput);
        let result: Fallible<()> = fail("nope");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Other);
    }
}
