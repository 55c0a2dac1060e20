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

use chrono::DateTime;
use chrono::Local;
use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;

/// A point in time, in whole seconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn seconds(self) -> i64 {
        self.0
    }

    /// Add an interval. Unbounded intervals saturate instead of overflowing.
    pub fn plus(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    pub fn into_local(self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(self.0, 0).map(|ts| ts.with_timezone(&Local))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.into_local() {
            Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M")),
            None => write!(f, "never"),
        }
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let seconds: i64 = FromSql::column_result(value)?;
        Ok(Timestamp(seconds))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_saturates() {
        let ts = Timestamp::new(1_000);
        assert_eq!(ts.plus(500).seconds(), 1_500);
        assert_eq!(ts.plus(i64::MAX).seconds(), i64::MAX);
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::new(1) < Timestamp::new(2));
    }

    #[test]
    fn test_display_out_of_range() {
        assert_eq!(Timestamp::new(i64::MAX).to_string(), "never");
    }
}
