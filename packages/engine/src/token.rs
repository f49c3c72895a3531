//! Token classification and numeric/date repair.
//!
//! Sliced field tokens arrive corrupted in predictable ways: thousands
//! separators and currency symbols, parenthesized negatives, amounts
//! printed as cent-suffixed integers, and OCR digit/letter confusions
//! (`O`→`0`, `S`→`5`, `l`/`I`→`1`). Classification normalizes a token
//! into a typed [`FieldValue`] according to the schema field's declared
//! kind, counting every repair it applies.

use chrono::NaiveDate;
use ledger_lift_report_models::{FieldKind, FieldValue, Period};

/// Per-field classification options, derived from the format config.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOptions {
    /// Apply the OCR digit-lookalike substitution table before parsing.
    pub repair: bool,
    /// The token is a cent-suffixed integer when it carries no decimal
    /// point: re-insert the point before the final two digits.
    pub cents: bool,
    /// Store percents as fractions (`55%` → `0.55`) instead of whole
    /// percents.
    pub fraction: bool,
}

/// A successful classification, with a flag for whether any repair fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    /// The normalized value.
    pub value: FieldValue,
    /// Whether a digit-lookalike substitution changed the token.
    pub repaired: bool,
}

/// A token that failed to parse as its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable {kind} token '{token}'")]
pub struct TokenError {
    /// The kind the schema declared.
    pub kind: FieldKind,
    /// The offending token.
    pub token: String,
}

/// Classifies one sliced, deglitched token.
///
/// Missing is universal: an empty token or a lone dash classifies as
/// [`FieldValue::Missing`] regardless of kind.
///
/// # Errors
///
/// Returns [`TokenError`] if the token cannot be parsed as the declared
/// kind even after repair. Callers decide whether that rejects the row
/// (required field) or records a missing value.
pub fn classify(raw: &str, kind: FieldKind, opts: TokenOptions) -> Result<Classified, TokenError> {
    let token = raw.trim();
    if token.is_empty() || token == "-" {
        return Ok(Classified {
            value: FieldValue::Missing,
            repaired: false,
        });
    }

    let err = || TokenError {
        kind,
        token: token.to_owned(),
    };

    match kind {
        FieldKind::Text => Ok(Classified {
            value: FieldValue::Text(token.to_owned()),
            repaired: false,
        }),
        FieldKind::Integer => {
            let (value, repaired) = parse_integer(token, opts).ok_or_else(err)?;
            Ok(Classified {
                value: FieldValue::Integer(value),
                repaired,
            })
        }
        FieldKind::Decimal => {
            let (value, repaired) = parse_decimal(token, opts).ok_or_else(err)?;
            Ok(Classified {
                value: FieldValue::Decimal(value),
                repaired,
            })
        }
        FieldKind::Percent => {
            let stripped = token.strip_suffix('%').unwrap_or(token).trim_end();
            let (value, repaired) = parse_decimal(stripped, TokenOptions {
                cents: false,
                ..opts
            })
            .ok_or_else(err)?;
            let value = if opts.fraction { value / 100.0 } else { value };
            Ok(Classified {
                value: FieldValue::Percent(value),
                repaired,
            })
        }
        FieldKind::Date => {
            let (value, repaired) = parse_date(token, opts.repair).ok_or_else(err)?;
            Ok(Classified {
                value: FieldValue::Date(value),
                repaired,
            })
        }
    }
}

/// Whether a token looks numeric for the purposes of locating a row's
/// numeric tail: optionally parenthesized, comma-grouped, decimal, a lone
/// dash, or numeric-after-repair when `repair` is set.
#[must_use]
pub fn is_numeric_token(token: &str, repair: bool) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    if token == "-" {
        return true;
    }
    let candidate = if repair {
        repair_lookalikes(token).0
    } else {
        token.to_owned()
    };
    let inner = candidate
        .trim_start_matches(['(', '$'])
        .trim_end_matches(')')
        .trim_end_matches('-')
        .trim_start_matches('-');
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
        && inner.chars().any(|c| c.is_ascii_digit())
}

/// The OCR digit-lookalike substitution table, applied character-wise.
/// Returns the repaired string and whether anything changed.
fn repair_lookalikes(s: &str) -> (String, bool) {
    let mut changed = false;
    let repaired = s
        .chars()
        .map(|c| {
            let r = match c {
                'O' | 'Q' | 'D' | 'o' => '0',
                'S' | 's' => '5',
                'L' | 'l' | 'J' | 'I' | 'i' => '1',
                other => other,
            };
            changed |= r != c;
            r
        })
        .collect();
    (repaired, changed)
}

/// Parses a whole number with the defensive repairs of [`parse_decimal`].
fn parse_integer(token: &str, opts: TokenOptions) -> Option<(i64, bool)> {
    let (value, repaired) = parse_decimal(token, TokenOptions {
        cents: false,
        ..opts
    })?;
    if value.fract() != 0.0 || value.abs() > 9.0e15 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some((value as i64, repaired))
}

/// Parses an optionally parenthesized, comma-grouped, optionally decimal
/// numeral.
///
/// Repairs, in order: digit-lookalike substitution (when opted in), stray
/// punctuation stripping, parenthesized or trailing-hyphen negation, and
/// cent-suffix decimal restoration (when opted in).
fn parse_decimal(token: &str, opts: TokenOptions) -> Option<(f64, bool)> {
    let mut s: String = token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '+')
        .collect();

    let mut repaired = false;
    if opts.repair {
        let (fixed, changed) = repair_lookalikes(&s);
        s = fixed;
        repaired = changed;
    }

    // Stray characters OCR introduces around digits.
    s.retain(|c| !matches!(c, ':' | ';' | '_' | '·' | '"' | '\''));

    let parenthesized = s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = s[1..s.len() - 1].to_owned();
    }
    let negative = parenthesized || s.ends_with('-') || s.starts_with('-');
    s.retain(|c| c != '-' && c != '(' && c != ')');

    if opts.cents {
        // Cent-suffixed convention: every digit is significant, any
        // embedded point is an artifact. Rebuild with the point before
        // the last two digits.
        s.retain(|c| c.is_ascii_digit());
        if s.is_empty() {
            return None;
        }
        s = if s.len() <= 2 {
            format!("0.{s:0>2}")
        } else {
            format!("{}.{}", &s[..s.len() - 2], &s[s.len() - 2..])
        };
    } else {
        s.retain(|c| c != ',');
    }

    if s.is_empty() || !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let magnitude: f64 = s.parse().ok()?;
    Some((if negative { -magnitude } else { magnitude }, repaired))
}

/// Parses a date token in the corpus's common orders: `m/d/Y`, `m/d/y`,
/// `Month D, YYYY`, `D Month YYYY`, and the `Mon-YY` period tag.
fn parse_date(token: &str, repair: bool) -> Option<(NaiveDate, bool)> {
    let mut repaired = false;
    let fix = |part: &str, repaired: &mut bool| -> String {
        if repair {
            let (fixed, changed) = repair_lookalikes(part);
            *repaired |= changed;
            fixed
        } else {
            part.to_owned()
        }
    };

    // Numeric m/d/y (separators occasionally misread, so any of / - .).
    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.trim().is_empty()) {
        let nums: Vec<Option<u32>> = parts
            .iter()
            .map(|p| fix(p.trim(), &mut repaired).parse().ok())
            .collect();
        if let [Some(m), Some(d), Some(y)] = nums[..] {
            let year = normalize_year(y);
            if let Some(date) = NaiveDate::from_ymd_opt(year, m, d) {
                return Some((date, repaired));
            }
        }
        // Fall through: `Mon-YY` also splits into parts on '-'.
    }

    // Month-name orders.
    let words: Vec<&str> = token
        .split([' ', ','])
        .filter(|w| !w.trim().is_empty())
        .collect();
    if words.len() == 3 {
        // `Month D, YYYY` or `D Month YYYY` — whichever word names a
        // month decides the order (the day token may carry OCR letters).
        let year: Option<i32> = fix(words[2], &mut repaired).parse().ok();
        if let Some(year) = year {
            let attempt = |month: &str, day: &str, repaired: &mut bool| -> Option<NaiveDate> {
                let period = Period::from_month_name(month, year)?;
                let day: u32 = fix(day, repaired).parse().ok()?;
                NaiveDate::from_ymd_opt(period.year, period.month, day)
            };
            if let Some(date) = attempt(words[0], words[1], &mut repaired) {
                return Some((date, repaired));
            }
            if let Some(date) = attempt(words[1], words[0], &mut repaired) {
                return Some((date, repaired));
            }
        }
    }

    // `Mon-YY` tag: the first of the month.
    if let Ok(period) = token.parse::<Period>() {
        return Some((period.first_day(), repaired));
    }

    None
}

/// Two-digit years pivot at 70 (`15` → 2015, `97` → 1997); four-digit
/// years pass through.
fn normalize_year(y: u32) -> i32 {
    let y = i64::from(y);
    let normalized = if y < 70 {
        2000 + y
    } else if y < 100 {
        1900 + y
    } else {
        y
    };
    i32::try_from(normalized).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: TokenOptions = TokenOptions {
        repair: false,
        cents: false,
        fraction: false,
    };
    const REPAIR: TokenOptions = TokenOptions {
        repair: true,
        cents: false,
        fraction: false,
    };
    const CENTS: TokenOptions = TokenOptions {
        repair: true,
        cents: true,
        fraction: false,
    };

    fn decimal(raw: &str, opts: TokenOptions) -> f64 {
        match classify(raw, FieldKind::Decimal, opts).unwrap().value {
            FieldValue::Decimal(v) => v,
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_lone_dash_are_missing() {
        for raw in ["", "  ", "-"] {
            let c = classify(raw, FieldKind::Decimal, PLAIN).unwrap();
            assert_eq!(c.value, FieldValue::Missing, "raw {raw:?}");
        }
    }

    #[test]
    fn parenthesized_comma_grouped_value_negates() {
        assert!((decimal("(1,234.56)", PLAIN) - -1234.56).abs() < f64::EPSILON);
    }

    #[test]
    fn currency_symbol_and_commas_strip() {
        assert!((decimal("$12,345.00", PLAIN) - 12345.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trailing_hyphen_negates() {
        assert!((decimal("512.50-", PLAIN) - -512.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ocr_lookalikes_repair_when_opted_in() {
        let c = classify("1,2S4.O6", FieldKind::Decimal, REPAIR).unwrap();
        assert_eq!(c.value, FieldValue::Decimal(1254.06));
        assert!(c.repaired);
    }

    #[test]
    fn lookalikes_do_not_repair_by_default() {
        assert!(classify("1,2S4.06", FieldKind::Decimal, PLAIN).is_err());
    }

    #[test]
    fn cents_suffix_restores_decimal_point() {
        assert!((decimal("123456", CENTS) - 1234.56).abs() < f64::EPSILON);
    }

    #[test]
    fn cents_token_with_existing_point_is_unchanged() {
        assert!((decimal("1,234.56", CENTS) - 1234.56).abs() < f64::EPSILON);
    }

    #[test]
    fn cents_short_token_pads_below_one() {
        assert!((decimal("45", CENTS) - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_strips_suffix() {
        let c = classify("55%", FieldKind::Percent, PLAIN).unwrap();
        assert_eq!(c.value, FieldValue::Percent(55.0));
    }

    #[test]
    fn percent_fraction_contract_divides() {
        let opts = TokenOptions {
            fraction: true,
            ..PLAIN
        };
        let c = classify("55%", FieldKind::Percent, opts).unwrap();
        assert_eq!(c.value, FieldValue::Percent(0.55));
    }

    #[test]
    fn integer_accepts_comma_grouping() {
        let c = classify("12,034", FieldKind::Integer, PLAIN).unwrap();
        assert_eq!(c.value, FieldValue::Integer(12034));
    }

    #[test]
    fn integer_rejects_fractional() {
        assert!(classify("12.5", FieldKind::Integer, PLAIN).is_err());
    }

    #[test]
    fn date_mdy_parses() {
        let c = classify("10/15/2021", FieldKind::Date, PLAIN).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 10, 15).unwrap())
        );
    }

    #[test]
    fn date_two_digit_year_pivots() {
        let c = classify("3/1/97", FieldKind::Date, PLAIN).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(1997, 3, 1).unwrap())
        );
    }

    #[test]
    fn date_month_name_order_parses() {
        let c = classify("January 31, 2021", FieldKind::Date, PLAIN).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 1, 31).unwrap())
        );
    }

    #[test]
    fn date_day_first_order_parses() {
        let c = classify("31 January 2021", FieldKind::Date, PLAIN).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 1, 31).unwrap())
        );
    }

    #[test]
    fn date_ocr_day_repairs() {
        let c = classify("3l January 202l", FieldKind::Date, REPAIR).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 1, 31).unwrap())
        );
        assert!(c.repaired);
    }

    #[test]
    fn date_period_tag_is_first_of_month() {
        let c = classify("Mar-22", FieldKind::Date, PLAIN).unwrap();
        assert_eq!(
            c.value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2022, 3, 1).unwrap())
        );
    }

    #[test]
    fn unparsable_date_is_an_error_not_a_panic() {
        assert!(classify("not a date", FieldKind::Date, PLAIN).is_err());
    }

    #[test]
    fn numeric_token_detection() {
        assert!(is_numeric_token("1,234.56", false));
        assert!(is_numeric_token("(1,234.56)", false));
        assert!(is_numeric_token("-", false));
        assert!(is_numeric_token("512-", false));
        assert!(!is_numeric_token("Kaiserslautern", false));
        assert!(is_numeric_token("1,2S4.56", true));
        assert!(!is_numeric_token("1,2S4.56", false));
    }
}
