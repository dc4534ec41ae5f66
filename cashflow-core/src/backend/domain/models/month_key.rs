//! Domain model for the "YYYY-MM" month key used as cache granularity.
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, displayed and parsed as "YYYY-MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month key '{0}', expected YYYY-MM")]
pub struct MonthKeyParseError(pub String);

impl MonthKey {
    /// Build a month key; `None` unless the year has four digits and the month is 1-12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by a signed number of months
    pub fn offset(&self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn previous(&self) -> Self {
        self.offset(-1)
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Every month from `start` to `end` inclusive, oldest first
    pub fn range(start: MonthKey, end: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            current = current.next();
        }
        months
    }

    /// The `count` months ending with (and including) this one, oldest first
    pub fn trailing(&self, count: u32) -> Vec<MonthKey> {
        if count == 0 {
            return Vec::new();
        }
        MonthKey::range(self.offset(-(count as i32 - 1)), *self)
    }

    /// The `count` months strictly before this one, most recent first
    pub fn preceding(&self, count: u32) -> Vec<MonthKey> {
        (1..=count as i32).map(|back| self.offset(-back)).collect()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut parts = trimmed.splitn(2, '-');
        let (Some(year), Some(month)) = (parts.next(), parts.next()) else {
            return Err(MonthKeyParseError(value.to_string()));
        };
        if year.len() != 4 || month.len() != 2 {
            return Err(MonthKeyParseError(value.to_string()));
        }
        match (year.parse::<i32>(), month.parse::<u32>()) {
            (Ok(year), Ok(month)) => {
                MonthKey::new(year, month).ok_or_else(|| MonthKeyParseError(value.to_string()))
            }
            _ => Err(MonthKeyParseError(value.to_string())),
        }
    }
}

impl TryFrom<String> for MonthKey {
    type Error = MonthKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}
