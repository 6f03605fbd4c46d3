//! Calendar helpers shared by storage filters and the period aggregator.

use std::str::FromStr;

use chrono::{Datelike, FixedOffset, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Format a date the way reports display it: `DD-MM-YYYY`.
#[must_use]
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// The current calendar date at the given UTC offset.
#[must_use]
pub fn today_in(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// An inclusive `[start, end]` span of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDateRange`] when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Everything up to and including `end`.
    #[must_use]
    pub fn up_to(end: NaiveDate) -> Self {
        Self {
            start: NaiveDate::MIN,
            end,
        }
    }

    /// The start date, or `None` for a range built with [`DateRange::up_to`].
    #[must_use]
    pub fn lower_bound(&self) -> Option<NaiveDate> {
        (self.start != NaiveDate::MIN).then_some(self.start)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A calendar month, e.g. `2024-01`.
///
/// Internally this is the first day of the month, so it is always a valid
/// date and orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidMonth`] when `month` is outside `1..=12` or
    /// the year is outside chrono's supported range.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidMonth(format!("{year:04}-{month:02}")))
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
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
    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The preceding month, rolling January back into December of the prior year.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }

    #[must_use]
    pub fn span(self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    /// Human label such as `January 2024`.
    #[must_use]
    pub fn label(self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn display_date_is_day_month_year() {
        assert_eq!(format_display_date(date(2024, 3, 7)), "07-03-2024");
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDateRange { .. }));
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert_eq!(range.lower_bound(), Some(date(2024, 1, 1)));
    }

    #[test]
    fn up_to_has_no_lower_bound() {
        let range = DateRange::up_to(date(2024, 1, 31));
        assert!(range.contains(date(1990, 6, 1)));
        assert_eq!(range.lower_bound(), None);
    }

    #[test]
    fn parses_year_month() {
        let ym: YearMonth = "2024-01".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 1);
        assert_eq!(ym.to_string(), "2024-01");
    }

    #[test]
    fn rejects_malformed_year_month() {
        for raw in ["2024-13", "2024-00", "2024/01", "24-01", "2024-1", "January"] {
            assert!(raw.parse::<YearMonth>().is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn last_day_handles_short_and_leap_months() {
        assert_eq!(YearMonth::new(2023, 11).unwrap().last_day(), date(2023, 11, 30));
        assert_eq!(YearMonth::new(2024, 2).unwrap().last_day(), date(2024, 2, 29));
        assert_eq!(YearMonth::new(2023, 2).unwrap().last_day(), date(2023, 2, 28));
        assert_eq!(YearMonth::new(2023, 12).unwrap().last_day(), date(2023, 12, 31));
    }

    #[test]
    fn previous_rolls_over_year_boundary() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.previous().unwrap(), YearMonth::new(2023, 12).unwrap());
    }

    #[test]
    fn label_uses_full_month_name() {
        assert_eq!(YearMonth::new(2023, 12).unwrap().label(), "December 2023");
    }

    #[test]
    fn serde_round_trips_as_string() {
        let ym = YearMonth::new(2024, 5).unwrap();
        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2024-05\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym);
    }
}
