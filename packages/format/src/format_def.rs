//! The per-table-type configuration record the engine is parameterized by.
//!
//! [`FormatDefinition`] captures everything unique about one report table in
//! a serializable config struct: how its section starts and ends, what its
//! header looks like, which field uniquely identifies a row, and which
//! assembly strategy turns sliced rows into records.

use std::collections::BTreeMap;

use ledger_lift_report_models::FieldKind;
use serde::Deserialize;

use crate::FormatError;

// ── Top-level format definition ──────────────────────────────────────────

/// A complete, config-driven report table definition.
///
/// Loaded from TOML files at compile time and used as the sole description
/// of a table type; the engine contains no per-table code.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatDefinition {
    /// Unique identifier (e.g. `"site_status"`); doubles as the output
    /// table name.
    pub id: String,
    /// The table title as printed in the reports (for log messages).
    pub title: String,
    /// Case-insensitive regexes recognizing the section start, anchored to
    /// the trimmed line start.
    pub start_patterns: Vec<String>,
    /// Additional patterns that end this section. Any other format's start
    /// pattern and the registry-wide catch-all end it too.
    #[serde(default)]
    pub end_patterns: Vec<String>,
    /// Number of consecutive blank lines that ends the section's data
    /// region. `None` means blank lines are tolerated.
    #[serde(default)]
    pub stop_blank_lines: Option<usize>,
    /// Header geometry for column-layout inference.
    #[serde(default)]
    pub header: Option<HeaderConfig>,
    /// The natural-key contract for rows of this table.
    pub key: KeyConfig,
    /// Ordered field schema; emission order follows this list.
    pub fields: Vec<FieldDef>,
    /// How rows are turned into records.
    pub assembler: AssemblerConfig,
    /// Whether blocks of this table must carry a report period. Defaults
    /// to `true`: a period-less block is skipped whole. Fiscal-span
    /// reports that never announce a month opt out.
    #[serde(default = "default_require_period")]
    pub require_period: bool,
    /// Regex whose last match before or inside a block sets the block's
    /// context label (e.g. the branch location printed at the top of each
    /// statement page). The first capture group is used when present.
    #[serde(default)]
    pub context_pattern: Option<String>,
    /// Schema field receiving the block context label.
    #[serde(default)]
    pub context_field: Option<String>,
    /// Output ordering contract.
    #[serde(default)]
    pub sort: SortOrder,
    /// Whether numeric tokens get the OCR digit-lookalike repair table
    /// applied before parsing. Scanned-report formats opt in; born-digital
    /// formats leave it off.
    #[serde(default)]
    pub repair_numerics: bool,
    /// Known label corrections (truncated/typo'd category names to their
    /// canonical form), applied to text fields after normalization.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

// ── Header config ────────────────────────────────────────────────────────

/// Expected header labels and geometry for column-layout inference.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    /// Expected column labels, in order, as printed in the header line.
    pub labels: Vec<String>,
    /// How many physical lines the header may wrap onto (joined before
    /// label location).
    #[serde(default = "default_header_lines")]
    pub max_lines: usize,
    /// How many lines past the section start to search for the header.
    #[serde(default = "default_header_search")]
    pub search_window: usize,
    /// Regex recognizing wrapped header lines following the main header
    /// line (e.g. fiscal-year column labels spilling onto a second line).
    /// Matching lines within `max_lines` join the header instead of being
    /// parsed as data.
    #[serde(default)]
    pub continuation_pattern: Option<String>,
}

const fn default_require_period() -> bool {
    true
}

const fn default_header_lines() -> usize {
    1
}

const fn default_header_search() -> usize {
    25
}

// ── Key config ───────────────────────────────────────────────────────────

/// The field(s) that uniquely identify a row within one period.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Schema field names forming the natural key, joined in order.
    pub fields: Vec<String>,
    /// Validation regex for the first key field's raw token. Rows whose
    /// key does not match are continuation candidates or rejects.
    #[serde(default)]
    pub pattern: Option<String>,
}

// ── Field schema ─────────────────────────────────────────────────────────

/// One named field in a table's schema.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    /// Output column name.
    pub name: String,
    /// How tokens for this field are classified.
    pub kind: FieldKind,
    /// For decimal fields printed as cent-suffixed integers (`123456` →
    /// `1234.56`): re-insert the decimal point before the final two digits
    /// when the token carries none.
    #[serde(default)]
    pub cents: bool,
    /// For percent fields: store as a fraction (`55%` → `0.55`) instead of
    /// a whole percent.
    #[serde(default)]
    pub fraction: bool,
    /// A row whose token for this field fails to parse is rejected instead
    /// of recording a missing value.
    #[serde(default)]
    pub required: bool,
    /// Sliced for structure but excluded from emitted output (e.g. columns
    /// the reports print but the schema retires).
    #[serde(default)]
    pub hidden: bool,
}

// ── Assembler config ─────────────────────────────────────────────────────

/// How data rows of this table become records.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AssemblerConfig {
    /// Slice rows at header-inferred column offsets; fields map onto the
    /// schema positionally. Wrapped rows (blank key column) merge into the
    /// previous row.
    Columnar,

    /// Whitespace-tokenized rows: the first `leading_fields` schema fields
    /// take the leading text tokens (the last of them absorbing every
    /// token up to the first numeric), then the numeric tail fills the
    /// REMAINING schema slots anchored to the right edge, missing leading
    /// slots padded with Missing. Handles fiscal-span tables whose column
    /// count varies by vintage.
    RightAnchored {
        /// How many schema fields are leading text fields.
        leading_fields: usize,
    },

    /// Region-label rows pivoting per-service values into named slots:
    /// the row's last plain value is the total, preceding values fill the
    /// service fields left-to-right, a trailing percent token fills the
    /// percent field.
    RegionPivot {
        /// Row-leading region labels that identify a data row.
        regions: Vec<String>,
        /// Schema field receiving the region label.
        region_field: String,
        /// Schema field receiving the leading location count.
        location_field: String,
        /// Per-service value fields, in printed order.
        value_fields: Vec<String>,
        /// Schema field receiving the row total.
        total_field: String,
        /// Schema field receiving the trailing percent, if printed.
        percent_field: String,
    },

    /// Tables where a single-field header line sets a category carried
    /// onto every following row until the next header line.
    CategoryCarry {
        /// Schema field receiving the carried category.
        carry_field: String,
        /// Regex recognizing carry header lines. When unset, any row that
        /// yields exactly one non-numeric column is a carry header.
        #[serde(default)]
        carry_pattern: Option<String>,
        /// Lines matching any of these are skipped outright (ruling lines,
        /// page totals).
        #[serde(default)]
        skip_patterns: Vec<String>,
        /// How data rows are split into columns.
        rows: RowTokenizer,
    },
}

/// Row tokenization for non-sliced strategies.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowTokenizer {
    /// Columns separated by runs of two or more spaces.
    Split,
    /// Whitespace tokens: leading text fields then a numeric tail, as in
    /// [`AssemblerConfig::RightAnchored`].
    Tokens {
        /// How many schema fields (beyond any carry field) take leading
        /// text tokens.
        leading_fields: usize,
    },
}

/// Output ordering for a table's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Records appear in the order their rows were first seen.
    #[default]
    FirstSeen,
    /// Records sort by natural key, then ascending by period.
    Chronological,
}

// ── Parsing & validation ─────────────────────────────────────────────────

/// Parses and validates a TOML format definition.
///
/// # Errors
///
/// Returns [`FormatError`] if the TOML fails to deserialize, a pattern does
/// not compile, or the definition violates a structural invariant (missing
/// key field, columnar layout with fewer than two columns, schema/label
/// arity mismatch).
pub fn parse_format_toml(content: &str) -> Result<FormatDefinition, FormatError> {
    let def: FormatDefinition = toml::from_str(content)?;
    validate(&def)?;
    Ok(def)
}

fn validate(def: &FormatDefinition) -> Result<(), FormatError> {
    let invalid = |message: String| FormatError::Invalid {
        format: def.id.clone(),
        message,
    };

    if def.start_patterns.is_empty() {
        return Err(invalid("at least one start pattern is required".into()));
    }

    for pattern in def
        .start_patterns
        .iter()
        .chain(&def.end_patterns)
        .chain(&def.key.pattern)
    {
        compile_check(&def.id, pattern)?;
    }

    for field in &def.key.fields {
        if !def.fields.iter().any(|f| &f.name == field) {
            return Err(invalid(format!("key field '{field}' is not in the schema")));
        }
    }

    if let Some(pattern) = &def.context_pattern {
        compile_check(&def.id, pattern)?;
        let field = def
            .context_field
            .as_ref()
            .ok_or_else(|| invalid("context_pattern requires context_field".into()))?;
        if !def.fields.iter().any(|f| &f.name == field) {
            return Err(invalid(format!(
                "context field '{field}' is not in the schema"
            )));
        }
    }
    if def.key.fields.is_empty() {
        return Err(invalid("at least one key field is required".into()));
    }

    if let Some(header) = &def.header {
        if let Some(pattern) = &header.continuation_pattern {
            compile_check(&def.id, pattern)?;
        }
        if header.labels.is_empty() {
            return Err(invalid("a [header] table needs at least one label".into()));
        }
    }

    match &def.assembler {
        AssemblerConfig::Columnar => {
            let header = def
                .header
                .as_ref()
                .ok_or_else(|| invalid("columnar assembly requires a [header] table".into()))?;
            if header.labels.len() < 2 {
                return Err(invalid("a column layout needs at least two labels".into()));
            }
            if header.labels.len() != def.fields.len() {
                return Err(invalid(format!(
                    "{} header labels but {} schema fields",
                    header.labels.len(),
                    def.fields.len()
                )));
            }
        }
        AssemblerConfig::RightAnchored { leading_fields } => {
            if *leading_fields == 0 || *leading_fields >= def.fields.len() {
                return Err(invalid(format!(
                    "leading_fields must be in 1..{}",
                    def.fields.len()
                )));
            }
        }
        AssemblerConfig::RegionPivot {
            regions,
            region_field,
            location_field,
            value_fields,
            total_field,
            percent_field,
        } => {
            if regions.is_empty() {
                return Err(invalid("region_pivot needs at least one region".into()));
            }
            let named = [region_field, location_field, total_field, percent_field];
            for field in named.iter().copied().chain(value_fields) {
                if !def.fields.iter().any(|f| &f.name == field) {
                    return Err(invalid(format!(
                        "pivot field '{field}' is not in the schema"
                    )));
                }
            }
        }
        AssemblerConfig::CategoryCarry {
            carry_field,
            carry_pattern,
            skip_patterns,
            ..
        } => {
            if !def.fields.iter().any(|f| &f.name == carry_field) {
                return Err(invalid(format!(
                    "carry field '{carry_field}' is not in the schema"
                )));
            }
            for pattern in carry_pattern.iter().chain(skip_patterns) {
                compile_check(&def.id, pattern)?;
            }
        }
    }

    Ok(())
}

fn compile_check(format: &str, pattern: &str) -> Result<(), FormatError> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|source| FormatError::Pattern {
            format: format.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        id = "test_table"
        title = "Test Table"
        start_patterns = ["^Test\\s+Table\\b"]

        [key]
        fields = ["code"]
        pattern = "^\\d{4}$"

        [[fields]]
        name = "code"
        kind = "text"

        [[fields]]
        name = "amount"
        kind = "decimal"

        [assembler]
        strategy = "right_anchored"
        leading_fields = 1
    "#;

    #[test]
    fn parses_minimal_definition() {
        let def = parse_format_toml(MINIMAL).unwrap();
        assert_eq!(def.id, "test_table");
        assert_eq!(def.fields.len(), 2);
        assert_eq!(def.sort, SortOrder::FirstSeen);
        assert!(!def.repair_numerics);
    }

    #[test]
    fn rejects_unknown_key_field() {
        let toml = MINIMAL.replace("fields = [\"code\"]", "fields = [\"nope\"]");
        let err = parse_format_toml(&toml).unwrap_err();
        assert!(matches!(err, FormatError::Invalid { .. }));
    }

    #[test]
    fn rejects_bad_start_pattern() {
        let toml = MINIMAL.replace("^Test\\\\s+Table\\\\b", "](");
        assert!(parse_format_toml(&toml).is_err());
    }

    #[test]
    fn rejects_columnar_without_header() {
        let toml = MINIMAL.replace(
            "strategy = \"right_anchored\"\n        leading_fields = 1",
            "strategy = \"columnar\"",
        );
        let err = parse_format_toml(&toml).unwrap_err();
        assert!(matches!(err, FormatError::Invalid { .. }));
    }

    #[test]
    fn rejects_label_field_arity_mismatch() {
        let toml = format!(
            "{}\n[header]\nlabels = [\"Code\", \"Amount\", \"Extra\"]\n",
            MINIMAL.replace(
                "strategy = \"right_anchored\"\n        leading_fields = 1",
                "strategy = \"columnar\"",
            )
        );
        assert!(parse_format_toml(&toml).is_err());
    }
}
