//! Time-window partitioning of the overall scan.
//!
//! A run is split into disjoint half-open windows on the `first-seen` field:
//! whole calendar years, or calendar months when finer granularity is wanted.
//! Windows are processed in ascending order.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{CoreError, Result};

/// Years whose window bounds both render as four digits.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1..=9998;

/// A single `[start, end)` scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Partition {
    pub year: i32,
    /// Calendar month 1-12, or `None` for the whole year.
    pub month: Option<u32>,
}

impl Partition {
    pub fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::partition(format!(
                "month {} is out of range (1-12)",
                month
            )));
        }
        Ok(Self {
            year,
            month: Some(month),
        })
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> NaiveDate {
        first_day(self.year, self.month.unwrap_or(1))
    }

    /// Exclusive upper bound; December rolls over into January of the next year.
    pub fn end(&self) -> NaiveDate {
        match self.month {
            None | Some(12) => first_day(self.year.saturating_add(1), 1),
            Some(month) => first_day(self.year, month + 1),
        }
    }

    /// Date format matching [`Self::bounds`], in the store's date-pattern syntax.
    pub fn range_format(&self) -> &'static str {
        match self.month {
            None => "yyyy",
            Some(_) => "yyyy-MM",
        }
    }

    /// The window bounds rendered at partition granularity, e.g.
    /// `("2021-12", "2022-01")`.
    pub fn bounds(&self) -> (String, String) {
        let pattern = match self.month {
            None => "%Y",
            Some(_) => "%Y-%m",
        };
        (
            self.start().format(pattern).to_string(),
            self.end().format(pattern).to_string(),
        )
    }

    /// Whether a calendar date falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date < self.end()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            None => write!(f, "{}", self.year),
            Some(month) => write!(f, "{}-{:02}", self.year, month),
        }
    }
}

fn first_day(year: i32, month: u32) -> NaiveDate {
    // Month is validated to 1-12 at construction, so the date always exists.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Build the ordered partition list for a set of years.
///
/// Duplicate years collapse; with `monthly` every year is crossed with months
/// 1-12.
pub fn plan(years: &[i32], monthly: bool) -> Result<Vec<Partition>> {
    if years.is_empty() {
        return Err(CoreError::partition("no years configured"));
    }

    let years: BTreeSet<i32> = years.iter().copied().collect();
    let mut partitions = Vec::new();
    for year in years {
        check_year(year)?;
        if monthly {
            for month in 1..=12 {
                partitions.push(Partition::month(year, month)?);
            }
        } else {
            partitions.push(Partition::year(year));
        }
    }
    Ok(partitions)
}

fn check_year(year: i32) -> Result<i32> {
    if SUPPORTED_YEARS.contains(&year) {
        Ok(year)
    } else {
        Err(CoreError::partition(format!(
            "year {} is out of range ({}-{})",
            year,
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )))
    }
}

/// Parse a year list such as `2016-2018,2020`.
pub fn parse_years(list: &str) -> Result<Vec<i32>> {
    let mut years = BTreeSet::new();

    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parse = |s: &str| {
            s.trim()
                .parse::<i32>()
                .map_err(|_| CoreError::partition(format!("'{}' is not a year", s.trim())))
                .and_then(check_year)
        };

        match part.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (parse(from)?, parse(to)?);
                if from > to {
                    return Err(CoreError::partition(format!(
                        "year range '{}' is reversed",
                        part
                    )));
                }
                years.extend(from..=to);
            }
            None => {
                years.insert(parse(part)?);
            }
        }
    }

    if years.is_empty() {
        return Err(CoreError::partition("no years configured"));
    }
    Ok(years.into_iter().collect())
}
