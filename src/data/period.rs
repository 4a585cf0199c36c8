use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Day-level formats, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Timestamp formats; the time of day is discarded.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Month-level formats. chrono needs a day to build a date, so each is
/// parsed with ` 01` appended (see [`parse_month_token`]).
///
/// A space in a chrono format matches zero or more spaces and `%Y` accepts a
/// sign, so `"%b %Y"` would read `Mar-2021` as year -2021. The hyphenated
/// forms must come first.
const MONTH_FORMATS: &[&str] = &[
    "%Y-%m", "%m/%Y", "%Y/%m", "%b/%Y", "%B/%Y", "%b-%Y", "%B-%Y", "%b %Y", "%B %Y",
];

/// Years a measurement period may fall in.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    Month,
    Day,
}

/// A parsed measurement period.
///
/// Month tokens are pinned to the first of the month so periods of either
/// granularity order on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub date: NaiveDate,
    pub granularity: Granularity,
}

impl Period {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Month => write!(f, "{}", self.date.format("%Y-%m")),
            Granularity::Day => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

/// Parse a raw period cell. Returns `None` for anything unrecognised.
pub fn parse_period(raw: &str) -> Option<Period> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let day = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().filter(in_range))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                NaiveDateTime::parse_from_str(s, fmt)
                    .ok()
                    .map(|dt| dt.date())
                    .filter(in_range)
            })
        });
    if let Some(date) = day {
        return Some(Period {
            date,
            granularity: Granularity::Day,
        });
    }

    MONTH_FORMATS
        .iter()
        .find_map(|fmt| parse_month_token(s, fmt))
        .map(|date| Period {
            date,
            granularity: Granularity::Month,
        })
}

fn parse_month_token(s: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{s} 01"), &format!("{fmt} %d"))
        .ok()
        .filter(in_range)
}

fn in_range(date: &NaiveDate) -> bool {
    YEAR_RANGE.contains(&date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_dates_at_day_level() {
        for raw in ["2021-03-15", "03/15/2021", "2021/03/15", "2021-03-15 08:00:00"] {
            let p = parse_period(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(p.date, ymd(2021, 3, 15), "{raw}");
            assert_eq!(p.granularity, Granularity::Day, "{raw}");
        }
    }

    #[test]
    fn parses_month_tokens_to_first_of_month() {
        for raw in ["2021-03", "03/2021", "3/2021", "Mar/2021", "March/2021", "March 2021", " Mar-2021 "] {
            let p = parse_period(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(p.date, ymd(2021, 3, 1), "{raw}");
            assert_eq!(p.granularity, Granularity::Month, "{raw}");
        }
    }

    #[test]
    fn every_month_format_lands_in_the_right_year() {
        let cases = [
            ("%Y-%m", "2021-03"),
            ("%m/%Y", "03/2021"),
            ("%Y/%m", "2021/03"),
            ("%b/%Y", "Mar/2021"),
            ("%B/%Y", "March/2021"),
            ("%b-%Y", "Mar-2021"),
            ("%B-%Y", "March-2021"),
            ("%b %Y", "Mar 2021"),
            ("%B %Y", "March 2021"),
        ];
        assert_eq!(cases.len(), MONTH_FORMATS.len());
        for (fmt, raw) in cases {
            assert!(MONTH_FORMATS.contains(&fmt), "{fmt}");
            let p = parse_period(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!((p.year(), p.month()), (2021, 3), "{raw}");
            assert_eq!(p.granularity, Granularity::Month, "{raw}");
        }
    }

    #[test]
    fn signed_years_are_rejected() {
        for raw in ["-2021-03", "-2021-03-15", "Mar -2021", "03/-2021"] {
            assert!(parse_period(raw).is_none(), "accepted {raw:?}");
        }
    }

    #[test]
    fn rejects_malformed_tokens() {
        for raw in ["not-a-date", "", "   ", "2021-13", "13/2021", "2021-02-30", "Q1 2021"] {
            assert!(parse_period(raw).is_none(), "accepted {raw:?}");
        }
    }

    #[test]
    fn display_respects_granularity() {
        assert_eq!(parse_period("01/2022").unwrap().to_string(), "2022-01");
        assert_eq!(parse_period("2022-01-09").unwrap().to_string(), "2022-01-09");
    }

    #[test]
    fn periods_order_by_calendar() {
        let a = parse_period("2021-12").unwrap();
        let b = parse_period("2022-01-05").unwrap();
        assert!(a < b);
        assert_eq!((b.year(), b.month()), (2022, 1));
    }
}
