// Month selector - year-agnostic calendar month matching
//
// A selector is either a month number ("3", "03") or an English month
// name or abbreviation ("March", "mar"). Matching compares the parsed
// month of a sale date with the selector; the year never participates.

use chrono::{DateTime, Datelike, FixedOffset, Month};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
    #[error("month is required")]
    Empty,
    #[error("invalid month '{0}': expected 1-12 or a month name")]
    Unrecognized(String),
}

/// A calendar month, matched against sale dates in any year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthSelector(Month);

impl MonthSelector {
    /// Month number, 1 = January
    pub fn number(&self) -> u32 {
        self.0.number_from_month()
    }

    pub fn month(&self) -> Month {
        self.0
    }

    pub fn from_number(number: u32) -> Option<Self> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        MONTHS.get(index).copied().map(MonthSelector)
    }

    /// True iff the date falls in this month, in any year.
    /// The month is read in the date's own offset, as recorded.
    pub fn matches(&self, date_of_sale: &DateTime<FixedOffset>) -> bool {
        date_of_sale.month() == self.number()
    }

    /// All twelve months in calendar order
    pub fn all() -> impl Iterator<Item = MonthSelector> {
        MONTHS.into_iter().map(MonthSelector)
    }
}

impl FromStr for MonthSelector {
    type Err = MonthParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MonthParseError::Empty);
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<u32>()
                .ok()
                .and_then(MonthSelector::from_number)
                .ok_or_else(|| MonthParseError::Unrecognized(trimmed.to_string()));
        }

        let wanted = trimmed.to_ascii_lowercase();
        MONTHS
            .into_iter()
            .find(|month| {
                let name = month.name().to_ascii_lowercase();
                wanted == name || wanted == name[..3]
            })
            .map(MonthSelector)
            .ok_or_else(|| MonthParseError::Unrecognized(trimmed.to_string()))
    }
}

impl fmt::Display for MonthSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

impl From<Month> for MonthSelector {
    fn from(month: Month) -> Self {
        MonthSelector(month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!("3".parse::<MonthSelector>().unwrap().number(), 3);
        assert_eq!("03".parse::<MonthSelector>().unwrap().number(), 3);
        assert_eq!(" 12 ".parse::<MonthSelector>().unwrap().number(), 12);
        assert_eq!("1".parse::<MonthSelector>().unwrap().month(), Month::January);
    }

    #[test]
    fn test_parse_names() {
        for raw in ["March", "march", "MARCH", "mar", "Mar"] {
            let month: MonthSelector = raw.parse().unwrap();
            assert_eq!(month.number(), 3, "failed for {raw}");
        }
        assert_eq!("sep".parse::<MonthSelector>().unwrap().number(), 9);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<MonthSelector>(), Err(MonthParseError::Empty));
        assert_eq!("   ".parse::<MonthSelector>(), Err(MonthParseError::Empty));
        for raw in ["0", "13", "00", "foo", "-1", "3.0", "2021-03", "marc", "ma"] {
            assert!(
                matches!(raw.parse::<MonthSelector>(), Err(MonthParseError::Unrecognized(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_is_year_agnostic() {
        let march: MonthSelector = "3".parse().unwrap();
        assert!(march.matches(&date("2021-03-05T10:00:00+05:30")));
        assert!(march.matches(&date("2022-03-20T00:00:00Z")));
        assert!(march.matches(&date("1999-03-31T23:59:59-08:00")));
        assert!(!march.matches(&date("2021-07-01T00:00:00Z")));
    }

    #[test]
    fn test_matches_no_substring_false_positives() {
        // "1" appears in the year and the day, but the month is November
        let january: MonthSelector = "1".parse().unwrap();
        assert!(!january.matches(&date("2021-11-21T11:11:11Z")));
        assert!(january.matches(&date("2022-01-15T00:00:00Z")));
    }

    #[test]
    fn test_matches_uses_recorded_offset() {
        // April 1st locally, still March 31st in UTC
        let march: MonthSelector = "March".parse().unwrap();
        assert!(!march.matches(&date("2021-04-01T02:00:00+05:30")));
        // March 31st locally, already April in UTC
        assert!(march.matches(&date("2021-03-31T23:30:00-05:00")));
    }

    #[test]
    fn test_all_months_in_order() {
        let numbers: Vec<u32> = MonthSelector::all().map(|m| m.number()).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
    }
}
