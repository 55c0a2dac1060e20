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

use std::str::FromStr;

use crate::error::ErrorReport;
use crate::error::Fallible;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// A duration written the way users write it in scheme definitions, e.g.
/// `"4 hours"`, `"1 week 3 days"` or `"Infinity"`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeSpan {
    Finite(i64),
    Infinite,
}

impl TimeSpan {
    /// Length in seconds. `Infinite` is `i64::MAX`, which saturates when
    /// added to a timestamp.
    pub fn seconds(self) -> i64 {
        match self {
            TimeSpan::Finite(s) => s,
            TimeSpan::Infinite => i64::MAX,
        }
    }

    /// Shorten by `modifier`, never going below zero.
    pub fn reduce_by(self, modifier: TimeSpan) -> TimeSpan {
        match (self, modifier) {
            (TimeSpan::Infinite, _) => TimeSpan::Infinite,
            (TimeSpan::Finite(_), TimeSpan::Infinite) => TimeSpan::Finite(0),
            (TimeSpan::Finite(s), TimeSpan::Finite(m)) => TimeSpan::Finite((s - m).max(0)),
        }
    }
}

impl FromStr for TimeSpan {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Fallible<Self> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("infinity") {
            return Ok(TimeSpan::Infinite);
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() % 2 != 0 {
            return Err(invalid_span(s));
        }
        let mut total: i64 = 0;
        for pair in tokens.chunks(2) {
            let amount: i64 = pair[0].parse().map_err(|_| invalid_span(s))?;
            if amount < 0 {
                return Err(invalid_span(s));
            }
            let unit = unit_seconds(pair[1]).ok_or_else(|| invalid_span(s))?;
            total = amount
                .checked_mul(unit)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(|| invalid_span(s))?;
        }
        Ok(TimeSpan::Finite(total))
    }
}

fn unit_seconds(unit: &str) -> Option<i64> {
    let unit = unit.to_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);
    match unit {
        "second" => Some(1),
        "minute" => Some(MINUTE),
        "hour" => Some(HOUR),
        "day" => Some(DAY),
        "week" => Some(WEEK),
        "month" => Some(MONTH),
        "year" => Some(YEAR),
        _ => None,
    }
}

fn invalid_span(s: &str) -> ErrorReport {
    ErrorReport::invalid(format!("Invalid time span: '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_single_unit() -> Fallible<()> {
        assert_eq!("4 hours".parse::<TimeSpan>()?, TimeSpan::Finite(4 * HOUR));
        assert_eq!("1 day".parse::<TimeSpan>()?, TimeSpan::Finite(DAY));
        assert_eq!("0 seconds".parse::<TimeSpan>()?, TimeSpan::Finite(0));
        Ok(())
    }

    #[test]
    fn test_parse_compound() -> Fallible<()> {
        let span: TimeSpan = "1 week 3 days".parse()?;
        assert_eq!(span, TimeSpan::Finite(WEEK + 3 * DAY));
        Ok(())
    }

    #[test]
    fn test_parse_infinity() -> Fallible<()> {
        assert_eq!("Infinity".parse::<TimeSpan>()?, TimeSpan::Infinite);
        assert_eq!(TimeSpan::Infinite.seconds(), i64::MAX);
        Ok(())
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "4", "four hours", "3 fortnights", "-1 day", "1 day 2"] {
            let err = text.parse::<TimeSpan>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_reduce_by() {
        let hour = TimeSpan::Finite(HOUR);
        assert_eq!(
            TimeSpan::Finite(DAY).reduce_by(hour),
            TimeSpan::Finite(DAY - HOUR)
        );
        assert_eq!(
            TimeSpan::Finite(MINUTE).reduce_by(hour),
            TimeSpan::Finite(0)
        );
        assert_eq!(TimeSpan::Infinite.reduce_by(hour), TimeSpan::Infinite);
    }
}
