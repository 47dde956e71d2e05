//! Calendar dates and the day-count encoding used by the binary tables.
//!
//! Table files store dates as a `u16` number of days since 1979-12-31, so day
//! `1` is 1980-01-01 and the largest value (`65535`) lands in 2159. The type
//! wraps [`chrono::NaiveDate`] and adds the conversions the grouper needs.

use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::error::{ModelError, Result};

/// Day number (counted from 0001-01-01 as day 1) of the disk epoch, 1979-12-31.
const DISK_EPOCH_CE_DAYS: i32 = 722_814;

/// A calendar date with a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(NaiveDate);

impl Date {
    /// Build a date from its parts, returning `None` for impossible dates.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse an ISO `YYYY-MM-DD` date.
    pub fn parse(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ModelError::invalid_date(value))
    }

    /// Number of days since the disk epoch (1979-12-31); may be negative.
    #[must_use]
    pub fn days_since_epoch(self) -> i32 {
        self.0.num_days_from_ce() - DISK_EPOCH_CE_DAYS
    }

    /// Inverse of [`Date::days_since_epoch`].
    #[must_use]
    pub fn from_days_since_epoch(days: i32) -> Option<Self> {
        let ce_days = days.checked_add(DISK_EPOCH_CE_DAYS)?;
        NaiveDate::from_num_days_from_ce_opt(ce_days).map(Self)
    }

    /// Decode an on-disk `u16` day count.
    #[must_use]
    pub fn from_disk_days(days: u16) -> Option<Self> {
        Self::from_days_since_epoch(i32::from(days))
    }

    /// Latest date representable in the table files.
    #[must_use]
    pub fn disk_max() -> Option<Self> {
        Self::from_disk_days(u16::MAX)
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    #[must_use]
    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// Age in whole years on `self` for someone born on `birthdate`.
    ///
    /// One year is removed when the birthday has not been reached yet in the
    /// year of `self`.
    #[must_use]
    pub fn years_since(self, birthdate: Date) -> i32 {
        let mut age = self.year() - birthdate.year();
        if (self.month(), self.day()) < (birthdate.month(), birthdate.day()) {
            age -= 1;
        }
        age
    }
}

/// Difference in days.
impl Sub for Date {
    type Output = i32;

    fn sub(self, rhs: Self) -> i32 {
        self.days_since_epoch() - rhs.days_since_epoch()
    }
}

impl FromStr for Date {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).expect("valid date")
    }

    #[test]
    fn test_disk_epoch() {
        assert_eq!(Date::from_disk_days(0), Some(date(1979, 12, 31)));
        assert_eq!(Date::from_disk_days(1), Some(date(1980, 1, 1)));
        assert_eq!(Date::disk_max(), Some(date(2159, 6, 5)));
        assert_eq!(date(1980, 1, 1).days_since_epoch(), 1);
    }

    #[test]
    fn test_parse_and_display() {
        let parsed = Date::parse("2016-02-29").expect("leap day");
        assert_eq!(parsed, date(2016, 2, 29));
        assert_eq!(parsed.to_string(), "2016-02-29");
        assert!(Date::parse("2017-02-29").is_err());
        assert!(Date::parse("29/02/2016").is_err());
    }

    #[test]
    fn test_difference_in_days() {
        assert_eq!(date(2017, 3, 1) - date(2017, 2, 1), 28);
        assert_eq!(date(2016, 3, 1) - date(2016, 2, 1), 29);
        assert_eq!(date(2016, 1, 1) - date(2016, 1, 1), 0);
    }

    #[test]
    fn test_years_since() {
        let birth = date(2000, 6, 15);
        assert_eq!(date(2010, 6, 14).years_since(birth), 9);
        assert_eq!(date(2010, 6, 15).years_since(birth), 10);
        assert_eq!(date(2010, 12, 1).years_since(birth), 10);
        assert_eq!(date(2000, 6, 15).years_since(birth), 0);
    }
}
