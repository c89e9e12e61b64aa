use crate::db::{AttendanceRecord, Store, StoreError};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

pub const ALL: &str = "all";

/// A reporting window: every record, or one calendar month keyed `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    All,
    Month(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("period must be \"all\" or YYYY-MM, got {0:?}")]
pub struct InvalidPeriod(pub String);

impl Period {
    pub fn parse(raw: &str) -> Result<Period, InvalidPeriod> {
        let t = raw.trim();
        if t.eq_ignore_ascii_case(ALL) {
            return Ok(Period::All);
        }
        let bytes = t.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit)
            && NaiveDate::parse_from_str(&format!("{t}-01"), "%Y-%m-%d").is_ok();
        if !well_formed {
            return Err(InvalidPeriod(raw.to_string()));
        }
        Ok(Period::Month(t.to_string()))
    }

    pub fn key(&self) -> &str {
        match self {
            Period::All => ALL,
            Period::Month(m) => m,
        }
    }

    pub fn contains(&self, date: &str) -> bool {
        match self {
            Period::All => true,
            Period::Month(m) => month_key(date) == m,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

fn month_key(date: &str) -> &str {
    date.get(..7).unwrap_or(date)
}

/// `"all"` followed by every month present in `dates`, newest first.
///
/// Fixed-width `YYYY-MM` keys sort chronologically as plain strings.
pub fn periods_from_dates<'a, I>(dates: I) -> Vec<Period>
where
    I: IntoIterator<Item = &'a str>,
{
    let months: BTreeSet<&str> = dates.into_iter().map(month_key).collect();
    std::iter::once(Period::All)
        .chain(months.into_iter().rev().map(|m| Period::Month(m.to_string())))
        .collect()
}

pub async fn list_periods(store: &Store) -> Result<Vec<Period>, StoreError> {
    let records: Vec<AttendanceRecord> = store.get_all().await?;
    Ok(periods_from_dates(records.iter().map(|r| r.date.as_str())))
}
