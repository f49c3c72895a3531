//! Page segmentation and report-period tracking.
//!
//! Layout-preserved report text arrives as one string with form-feed
//! characters between pages. Pages are yielded lazily, in document order,
//! each tagged with the report period currently in force: a period
//! announcement anywhere on a page (e.g. `for month of March 2022`)
//! updates the context, which carries forward to subsequent pages until
//! the next announcement.

use ledger_lift_report_models::Period;
use regex::Regex;

use crate::EngineError;

/// The page-break character `pdftotext` emits between pages.
pub const PAGE_BREAK: char = '\u{000C}';

/// One page of report text with its inferred period.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    /// 1-based page number in document order.
    pub number: usize,
    /// The period in force for this page, if any announcement has been
    /// seen yet.
    pub period: Option<Period>,
    /// The page's raw text, exclusive of the page break.
    pub text: &'a str,
    /// 1-based document line number of the page's first line.
    pub first_line: usize,
}

/// Compiled period announcement patterns.
///
/// Each pattern must expose `month` and `year` capture groups; the year
/// group tolerates OCR digit lookalikes (`202l`), which are repaired
/// before parsing.
#[derive(Debug)]
pub struct PeriodPatterns {
    patterns: Vec<Regex>,
}

/// Announcement forms seen across the report corpus: the asset-report
/// `for month of March 2022` line and the statement-header
/// `... month ended January 31, 2021` / `as of January 31, 2021` forms.
const DEFAULT_PATTERNS: &[&str] = &[
    r"(?i)for\s+month\s+of\s+(?P<month>[A-Za-z]+)\s+(?P<year>[0-9OIl]{4})",
    r"(?i)(?:month|period)\s+end(?:ed|ing)\s+(?P<month>[A-Za-z]+)\s+[0-9OIl]{1,2},?\s+(?P<year>[0-9OIl]{4})",
    r"(?i)as\s+of\s+(?P<month>[A-Za-z]+)\s+[0-9OIl]{1,2},?\s+(?P<year>[0-9OIl]{4})",
];

impl PeriodPatterns {
    /// Compiles the default announcement patterns plus any extras from the
    /// document options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Pattern`] if an extra pattern fails to
    /// compile.
    pub fn compile(extra: &[String]) -> Result<Self, EngineError> {
        let mut patterns = Vec::with_capacity(DEFAULT_PATTERNS.len() + extra.len());
        for pattern in DEFAULT_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str))
        {
            patterns.push(Regex::new(pattern)?);
        }
        Ok(Self { patterns })
    }

    /// Finds the first period announcement in `text`.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<Period> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(text) {
                let month = caps.name("month")?.as_str();
                let year = repair_year(caps.name("year")?.as_str());
                let Ok(year) = year.parse::<i32>() else {
                    continue;
                };
                if let Some(period) = Period::from_month_name(month, year) {
                    return Some(period);
                }
            }
        }
        None
    }
}

/// Repairs OCR digit lookalikes in a year token (`202l` → `2021`,
/// `2O22` → `2022`).
fn repair_year(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'I' | 'l' | 'i' => '1',
            other => other,
        })
        .collect()
}

/// A lazy, finite, restartable iterator over a document's pages.
///
/// Restart by calling [`pages`] again — the input text is immutable and
/// the iterator owns nothing but its cursor and the carried period.
#[derive(Debug)]
pub struct Pages<'a> {
    splits: std::str::Split<'a, char>,
    patterns: &'a PeriodPatterns,
    number: usize,
    next_line: usize,
    period: Option<Period>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = Page<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.splits.next()?;
        self.number += 1;
        let first_line = self.next_line;
        self.next_line += text.lines().count();

        if let Some(period) = self.patterns.find(text) {
            if self.period != Some(period) {
                log::debug!("page {}: period is now {period}", self.number);
            }
            self.period = Some(period);
        }

        Some(Page {
            number: self.number,
            period: self.period,
            text,
            first_line,
        })
    }
}

/// Splits `text` into period-tagged pages.
#[must_use]
pub fn pages<'a>(text: &'a str, patterns: &'a PeriodPatterns) -> Pages<'a> {
    Pages {
        splits: text.split(PAGE_BREAK),
        patterns,
        number: 0,
        next_line: 1,
        period: None,
    }
}
