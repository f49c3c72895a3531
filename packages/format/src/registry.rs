//! Format registry — loads all table definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/format/formats/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new report table is as
//! simple as creating a new TOML file and adding it to the list below.

use crate::format_def::{FormatDefinition, parse_format_toml};

/// TOML configs embedded at compile time.
const FORMAT_TOMLS: &[(&str, &str)] = &[
    // ── Revenue ledger tables ────────────────────────────────────────
    ("slot_results", include_str!("../formats/slot_results.toml")),
    (
        "nafi_reimbursements",
        include_str!("../formats/nafi_reimbursements.toml"),
    ),
    // ── Asset inventory tables ───────────────────────────────────────
    (
        "egms_by_region_service",
        include_str!("../formats/egms_by_region_service.toml"),
    ),
    (
        "egms_by_field_office",
        include_str!("../formats/egms_by_field_office.toml"),
    ),
    // ── Operational-status rosters ───────────────────────────────────
    ("site_status", include_str!("../formats/site_status.toml")),
    // ── Financial statement tables ───────────────────────────────────
    (
        "financial_statement",
        include_str!("../formats/financial_statement.toml"),
    ),
    (
        "actual_vs_budget",
        include_str!("../formats/actual_vs_budget.toml"),
    ),
    (
        "gaming_revenue",
        include_str!("../formats/gaming_revenue.toml"),
    ),
];

/// Total number of configured formats (used in tests).
#[cfg(test)]
const EXPECTED_FORMAT_COUNT: usize = 8;

/// Returns all configured format definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded and covered by tests).
#[must_use]
pub fn all_formats() -> Vec<FormatDefinition> {
    FORMAT_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_format_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Returns the format definition with the given id, if configured.
#[must_use]
pub fn format_by_id(id: &str) -> Option<FormatDefinition> {
    all_formats().into_iter().find(|f| f.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_def::AssemblerConfig;

    #[test]
    fn loads_all_formats() {
        let formats = all_formats();
        assert_eq!(formats.len(), EXPECTED_FORMAT_COUNT);
    }

    #[test]
    fn ids_match_file_names() {
        for (name, _) in FORMAT_TOMLS {
            let def = format_by_id(name)
                .unwrap_or_else(|| panic!("format id '{name}' does not match its file name"));
            assert_eq!(&def.id, name);
        }
    }

    #[test]
    fn ids_are_unique() {
        let formats = all_formats();
        for (i, a) in formats.iter().enumerate() {
            for b in &formats[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate format id");
            }
        }
    }

    #[test]
    fn every_strategy_is_exercised() {
        let formats = all_formats();
        assert!(
            formats
                .iter()
                .any(|f| matches!(f.assembler, AssemblerConfig::Columnar))
        );
        assert!(
            formats
                .iter()
                .any(|f| matches!(f.assembler, AssemblerConfig::RightAnchored { .. }))
        );
        assert!(
            formats
                .iter()
                .any(|f| matches!(f.assembler, AssemblerConfig::RegionPivot { .. }))
        );
        assert!(
            formats
                .iter()
                .any(|f| matches!(f.assembler, AssemblerConfig::CategoryCarry { .. }))
        );
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(format_by_id("not_a_table").is_none());
    }
}
