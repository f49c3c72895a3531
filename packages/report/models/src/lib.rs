#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Report period, normalized field, and record types.
//!
//! This crate defines the plain data types shared between the extraction
//! engine, the format registry, and the emitters: the calendar [`Period`] a
//! report block belongs to, the typed [`NormalizedField`] values produced by
//! token classification, and the assembled [`Record`] with its [`DedupKey`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Three-letter month abbreviations, indexed by `month - 1`.
const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The calendar month/year context a report table belongs to.
///
/// Periods are announced once per report section (e.g. `for month of March
/// 2022`) and carried forward across pages until the next announcement.
/// The canonical display form is the `Mon-YY` tag the reports themselves
/// use (`Mar-22`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Four-digit calendar year.
    pub year: i32,
    /// Month number, 1-12.
    pub month: u32,
}

impl Period {
    /// Creates a period from a year and a 1-based month number.
    ///
    /// Returns `None` if `month` is not in `1..=12`.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if matches!(month, 1..=12) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Creates a period from a full or abbreviated English month name.
    #[must_use]
    pub fn from_month_name(name: &str, year: i32) -> Option<Self> {
        let prefix = name.get(..3)?;
        let month = MONTH_ABBR
            .iter()
            .position(|abbr| abbr.eq_ignore_ascii_case(prefix))?;
        Self::new(year, u32::try_from(month).ok()? + 1)
    }

    /// Creates a period from any date falling inside the month.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The first day of the month, for chronological sorting.
    ///
    /// # Panics
    ///
    /// Never panics: `month` is validated at construction.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| unreachable!("month validated at construction"))
    }

    /// Whether this period is the September fiscal-year close-out month.
    ///
    /// Several report vintages print annualized columns only in September
    /// rows, so assemblers need to branch on it.
    #[must_use]
    pub const fn is_fiscal_close(self) -> bool {
        self.month == 9
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            MONTH_ABBR[(self.month - 1) as usize],
            self.year.rem_euclid(100)
        )
    }
}

/// Error returned when a `Mon-YY` tag cannot be parsed into a [`Period`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriodError {
    /// The tag that failed to parse.
    pub tag: String,
}

impl fmt::Display for InvalidPeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid period tag '{}': expected Mon-YY", self.tag)
    }
}

impl std::error::Error for InvalidPeriodError {}

impl FromStr for Period {
    type Err = InvalidPeriodError;

    /// Parses the `Mon-YY` tag form (`Mar-22`). Two-digit years below 50
    /// map to 20xx, the rest to 19xx (the corpus spans 1990s microfiche
    /// scans through current reports).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidPeriodError { tag: s.to_owned() };
        let (mon, yy) = s.trim().split_once('-').ok_or_else(err)?;
        let yy: i32 = yy.trim().parse().map_err(|_| err())?;
        if !(0..100).contains(&yy) {
            return Err(err());
        }
        let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
        Self::from_month_name(mon.trim(), year).ok_or_else(err)
    }
}

/// The classified type of a sliced field token.
///
/// Format definitions declare one kind per schema field; the token
/// classifier uses the declared kind to decide which repairs and parses to
/// attempt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    /// Free text, whitespace-normalized.
    Text,
    /// Whole number (counts, location codes used numerically).
    Integer,
    /// Decimal number (currency amounts, rates).
    Decimal,
    /// Percentage (stored as a whole percent unless the schema opts into
    /// fractions).
    Percent,
    /// Calendar date.
    Date,
}

/// A classified field value with its canonical representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text after whitespace normalization and alias mapping.
    Text(String),
    /// A whole number.
    Integer(i64),
    /// A decimal number. Parenthesized source tokens are negated.
    Decimal(f64),
    /// A percentage, as a whole percent (55.0 for `55%`) or a fraction
    /// when the schema field asked for one.
    Percent(f64),
    /// A calendar date.
    Date(NaiveDate),
    /// An empty cell or a lone dash.
    Missing,
}

impl FieldValue {
    /// Whether this value is [`FieldValue::Missing`].
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The canonical string form used in delimited-text output.
    ///
    /// Missing values render as the empty string; dates render in the
    /// `m/d/YYYY` form the source reports use.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Decimal(n) | Self::Percent(n) => format_number(*n),
            Self::Date(d) => d.format("%-m/%-d/%Y").to_string(),
            Self::Missing => String::new(),
        }
    }
}

/// Formats a numeric value without float artifacts: integral values print
/// without a fractional part, everything else with its shortest form.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// A normalized field: the classified value plus the raw sliced token it
/// came from, retained for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedField {
    /// The classified value.
    pub value: FieldValue,
    /// The raw token as sliced from the source line, pre-repair.
    pub raw: String,
}

impl NormalizedField {
    /// Creates a normalized field from a value and its source token.
    #[must_use]
    pub fn new(value: FieldValue, raw: impl Into<String>) -> Self {
        Self {
            value,
            raw: raw.into(),
        }
    }

    /// A missing field with its raw token (empty string or lone dash).
    #[must_use]
    pub fn missing(raw: impl Into<String>) -> Self {
        Self::new(FieldValue::Missing, raw)
    }
}

/// A structured record assembled from one table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// The format (table type) this record belongs to.
    pub table_type: String,
    /// The report period in force when the row was parsed.
    pub period: Option<Period>,
    /// The natural-key value identifying this row within its period.
    pub natural_key: String,
    /// Field name to normalized value. Emission order comes from the
    /// format's schema, not from this map.
    pub fields: BTreeMap<String, NormalizedField>,
}

impl Record {
    /// The deduplication key for this record.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            table_type: self.table_type.clone(),
            period: self.period,
            natural_key: self.natural_key.clone(),
        }
    }

    /// The canonical string for a named field, or the empty string when the
    /// field is absent from this record.
    #[must_use]
    pub fn canonical(&self, field: &str) -> String {
        self.fields
            .get(field)
            .map(|f| f.value.canonical())
            .unwrap_or_default()
    }
}

/// Identity of a record within one document: at most one record survives
/// per key, later-parsed records replacing earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupKey {
    /// The format (table type).
    pub table_type: String,
    /// The report period, if the originating block carried one.
    pub period: Option<Period>,
    /// The natural-key value within the period.
    pub natural_key: String,
}
