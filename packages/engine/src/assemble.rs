//! Record assembly: turning a block's sliced rows into typed records.
//!
//! Four strategies cover the corpus, selected per format:
//!
//! - **columnar** — slice at header-inferred offsets, merge wrapped rows
//! - **right_anchored** — whitespace tokens, numeric tail anchored to the
//!   right edge (fiscal-span tables whose column count drifts by vintage)
//! - **region_pivot** — region-label rows with per-service value slots
//! - **category_carry** — single-field header lines set a category carried
//!   onto following rows
//!
//! Numeric alignment anchors to the RIGHT edge of a row wherever column
//! counts vary, because trailing columns are the stable ones across report
//! vintages.

use std::collections::BTreeMap;

use ledger_lift_format::{AssemblerConfig, FormatDefinition, HeaderConfig, RowTokenizer};
use ledger_lift_report_models::{FieldValue, NormalizedField, Record};
use regex::Regex;

use crate::diagnostics::Diagnostics;
use crate::layout::ColumnLayout;
use crate::scan::{Block, BlockLine, CompiledFormat};
use crate::slice::{deglitch, slice_line, split_columns, tokenize};
use crate::token::{TokenOptions, classify, is_numeric_token};

/// Assembles every record a block yields. Problems are recorded in
/// `diags`; this never fails the document.
#[must_use]
pub fn assemble_block(
    block: &Block,
    format: &CompiledFormat,
    diags: &mut Diagnostics,
) -> Vec<Record> {
    let def = &format.def;
    if def.require_period && block.period.is_none() {
        diags.block_skip(
            &def.id,
            None,
            Some(block.start_line),
            "no report period in force",
        );
        return Vec::new();
    }

    match &def.assembler {
        AssemblerConfig::Columnar => columnar(block, format, diags),
        AssemblerConfig::RightAnchored { leading_fields } => {
            right_anchored(block, format, *leading_fields, diags)
        }
        AssemblerConfig::RegionPivot { .. } => region_pivot(block, format, diags),
        AssemblerConfig::CategoryCarry { .. } => category_carry(block, format, diags),
    }
}

// ── Header location ──────────────────────────────────────────────────────

/// The located header: its index, the first data line index, and the
/// header text (wrapped lines joined) for layout inference.
struct HeaderSpan {
    data_start: usize,
    text: String,
}

/// Locates the header line by searching the block's first lines for one
/// containing the leading expected labels, then absorbs wrapped header
/// lines matching the continuation pattern.
fn header_span(
    lines: &[BlockLine],
    header: &HeaderConfig,
    continuation: Option<&Regex>,
) -> Option<HeaderSpan> {
    let first = header.labels.first()?.to_lowercase();
    let second = header.labels.get(1).map(|s| s.to_lowercase());
    let index = lines.iter().take(header.search_window).position(|line| {
        let lower = line.text.to_lowercase();
        lower.contains(&first) && second.as_ref().is_none_or(|s| lower.contains(s))
    })?;

    let mut text = lines[index].text.clone();
    let mut data_start = index + 1;
    if let Some(continuation) = continuation {
        while data_start < lines.len()
            && data_start - index < header.max_lines
            && continuation.is_match(lines[data_start].text.trim())
        {
            text.push_str("  ");
            text.push_str(&lines[data_start].text);
            data_start += 1;
        }
    }
    Some(HeaderSpan { data_start, text })
}

// ── Shared record construction ───────────────────────────────────────────

/// Builds a record from per-schema-field raw tokens (`slots` aligns 1:1
/// with `def.fields`; empty string means no token).
///
/// Applies, in order: block-context fill, token classification with the
/// field's repair/scale options, alias mapping for text values, required-
/// field enforcement, and natural-key derivation.
fn record_from_slots(
    block: &Block,
    format: &CompiledFormat,
    line_no: usize,
    mut slots: Vec<String>,
    diags: &mut Diagnostics,
) -> Option<Record> {
    let def = &format.def;

    if let Some(context_field) = &def.context_field {
        if let Some(context) = &block.context {
            if let Some(idx) = field_index(def, context_field) {
                if slots[idx].is_empty() {
                    slots[idx].clone_from(context);
                }
            }
        }
    }

    let mut fields = BTreeMap::new();
    for (field, raw) in def.fields.iter().zip(&slots) {
        let opts = TokenOptions {
            repair: def.repair_numerics,
            cents: field.cents,
            fraction: field.fraction,
        };
        let value = match classify(raw, field.kind, opts) {
            Ok(classified) => {
                if classified.repaired {
                    diags.ocr_repair();
                }
                match classified.value {
                    FieldValue::Text(text) => {
                        FieldValue::Text(def.aliases.get(&text).cloned().unwrap_or(text))
                    }
                    other => other,
                }
            }
            Err(e) => {
                if field.required {
                    diags.row_reject(&def.id, block.period, line_no, e.to_string());
                    return None;
                }
                log::debug!("[{}] line {line_no}: {e}; recording missing", def.id);
                FieldValue::Missing
            }
        };
        if value.is_missing() && field.required {
            diags.row_reject(
                &def.id,
                block.period,
                line_no,
                format!("required field '{}' is blank", field.name),
            );
            return None;
        }
        fields.insert(field.name.clone(), NormalizedField::new(value, raw.clone()));
    }

    let natural_key = def
        .key
        .fields
        .iter()
        .map(|name| {
            fields
                .get(name)
                .map(|f| f.value.canonical())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("|");
    if natural_key.chars().all(|c| c == '|') {
        diags.row_reject(&def.id, block.period, line_no, "empty natural key");
        return None;
    }

    Some(Record {
        table_type: def.id.clone(),
        period: block.period,
        natural_key,
        fields,
    })
}

fn field_index(def: &FormatDefinition, name: &str) -> Option<usize> {
    def.fields.iter().position(|f| f.name == name)
}

/// Whether a raw key token satisfies the format's key pattern (always
/// true when no pattern is configured, as long as the token is present).
fn key_ok(format: &CompiledFormat, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    format
        .key_pattern
        .as_ref()
        .is_none_or(|p| p.is_match(token))
}

// ── Columnar ─────────────────────────────────────────────────────────────

fn columnar(block: &Block, format: &CompiledFormat, diags: &mut Diagnostics) -> Vec<Record> {
    let def = &format.def;
    let Some(header_cfg) = def.header.as_ref() else {
        // Unreachable for validated formats; treated as a skip, not a panic.
        diags.block_skip(&def.id, block.period, Some(block.start_line), "no header config");
        return Vec::new();
    };
    let Some(span) = header_span(
        &block.lines,
        header_cfg,
        format.header_continuation.as_ref(),
    ) else {
        diags.block_skip(
            &def.id,
            block.period,
            Some(block.start_line),
            "header not located",
        );
        return Vec::new();
    };

    let (layout, fallbacks) = ColumnLayout::infer(&span.text, &header_cfg.labels);
    if fallbacks * 2 > header_cfg.labels.len() {
        diags.block_skip(
            &def.id,
            block.period,
            Some(block.start_line),
            format!(
                "{fallbacks} of {} header labels not located",
                header_cfg.labels.len()
            ),
        );
        return Vec::new();
    }
    if fallbacks > 0 {
        diags.layout_fallback(&def.id, u64::try_from(fallbacks).unwrap_or(u64::MAX));
    }

    let Some(key_idx) = def.key.fields.first().and_then(|k| field_index(def, k)) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for line in &block.lines[span.data_start..] {
        let row = slice_line(&line.text, &layout, line.no);
        if row.fields.iter().all(String::is_empty) {
            continue;
        }
        if key_ok(format, &row.fields[key_idx]) {
            rows.push(row);
        } else if let Some(prev) = rows.last_mut() {
            // Wrapped cell text: fold into the previous row.
            if prev.merge_continuation(&row) > 0 {
                diags.continuation_merge();
            }
        } else {
            diags.row_reject(
                &def.id,
                block.period,
                line.no,
                "blank or invalid key with no row to continue",
            );
        }
    }

    rows.into_iter()
        .filter_map(|row| record_from_slots(block, format, row.line, row.fields, diags))
        .collect()
}

// ── Right-anchored token runs ────────────────────────────────────────────

fn right_anchored(
    block: &Block,
    format: &CompiledFormat,
    leading: usize,
    diags: &mut Diagnostics,
) -> Vec<Record> {
    let def = &format.def;
    let data_start = match def.header.as_ref() {
        Some(header_cfg) => {
            let Some(span) = header_span(
                &block.lines,
                header_cfg,
                format.header_continuation.as_ref(),
            ) else {
                diags.block_skip(
                    &def.id,
                    block.period,
                    Some(block.start_line),
                    "header not located",
                );
                return Vec::new();
            };
            span.data_start
        }
        None => 0,
    };

    let key_idx = def.key.fields.first().and_then(|k| field_index(def, k));

    let mut records = Vec::new();
    for line in &block.lines[data_start..] {
        let tokens = tokenize(&line.text);
        if tokens.is_empty() {
            continue;
        }
        let Some(slots) = anchored_slots(&tokens, def, leading, 0, line) else {
            continue;
        };
        if let Some(key_idx) = key_idx {
            if !key_ok(format, &slots[key_idx]) {
                // Data-shaped rows with a bad key are rejects; label lines
                // with no numeric tail are not data at all.
                if slots[leading..].iter().any(|s| !s.is_empty()) {
                    diags.row_reject(
                        &def.id,
                        block.period,
                        line.no,
                        format!("key token '{}' fails the key pattern", slots[key_idx]),
                    );
                } else {
                    log::trace!("[{}] line {}: not a data row", def.id, line.no);
                }
                continue;
            }
        }
        if let Some(record) = record_from_slots(block, format, line.no, slots, diags) {
            records.push(record);
        }
    }
    records
}

/// Splits whitespace tokens into leading text fields and a right-anchored
/// numeric tail, mapped onto the schema starting at `first_slot` (fields
/// before `first_slot` are filled elsewhere, e.g. by a carried category).
///
/// Returns `None` for lines that are not data-shaped: too few leading
/// tokens, or a leading token failing the key pattern. Data-shaped rows
/// with an over-long tail keep its rightmost tokens — the stable columns.
fn anchored_slots(
    tokens: &[String],
    def: &FormatDefinition,
    leading: usize,
    first_slot: usize,
    line: &BlockLine,
) -> Option<Vec<String>> {
    let mut tail_start = tokens.len();
    while tail_start > 0 && is_numeric_token(&tokens[tail_start - 1], def.repair_numerics) {
        tail_start -= 1;
    }
    let leading_tokens = &tokens[..tail_start];
    let tail = &tokens[tail_start..];

    if leading_tokens.len() < leading {
        log::trace!("[{}] line {}: not a data row", def.id, line.no);
        return None;
    }

    let mut slots = vec![String::new(); def.fields.len()];
    for (i, token) in leading_tokens.iter().take(leading - 1).enumerate() {
        slots[first_slot + i].clone_from(token);
    }
    slots[first_slot + leading - 1] = leading_tokens[leading - 1..].join(" ");

    let numeric_slots = def.fields.len() - first_slot - leading;
    let tail = if tail.len() > numeric_slots {
        log::debug!(
            "[{}] line {}: dropping {} leading numeric column(s) beyond the schema",
            def.id,
            line.no,
            tail.len() - numeric_slots
        );
        &tail[tail.len() - numeric_slots..]
    } else {
        tail
    };
    // Right edge anchoring: the tail fills the rightmost slots.
    let offset = def.fields.len() - tail.len();
    for (i, token) in tail.iter().enumerate() {
        slots[offset + i].clone_from(token);
    }
    Some(slots)
}

// ── Region pivot ─────────────────────────────────────────────────────────

fn region_pivot(block: &Block, format: &CompiledFormat, diags: &mut Diagnostics) -> Vec<Record> {
    let def = &format.def;
    let AssemblerConfig::RegionPivot {
        regions,
        region_field,
        location_field,
        value_fields,
        total_field,
        percent_field,
    } = &def.assembler
    else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for line in &block.lines {
        let cleaned = deglitch(&line.text);
        let Some(region) = regions.iter().find(|r| {
            cleaned
                .strip_prefix(r.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
        }) else {
            continue;
        };
        let rest = &cleaned[region.len()..];

        let mut location = None;
        let mut values = Vec::new();
        let mut percents = Vec::new();
        for token in tokenize(rest) {
            if token == "-" {
                continue;
            }
            if token.ends_with('%') {
                percents.push(token);
            } else if is_numeric_token(&token, def.repair_numerics) {
                if location.is_none() {
                    location = Some(token);
                } else {
                    values.push(token);
                }
            }
        }
        let Some(location) = location else {
            // A bare region word is a grouping header, not a data row.
            continue;
        };

        let mut slots = vec![String::new(); def.fields.len()];
        let mut set = |name: &str, value: String| {
            if let Some(idx) = field_index(def, name) {
                slots[idx] = value;
            }
        };
        set(region_field, region.clone());
        set(location_field, location);
        if let Some(total) = values.pop() {
            set(total_field, total);
        }
        if values.len() > value_fields.len() {
            log::debug!(
                "[{}] line {}: {} service values for {} slots",
                def.id,
                line.no,
                values.len(),
                value_fields.len()
            );
            values.truncate(value_fields.len());
        }
        for (name, value) in value_fields.iter().zip(values) {
            set(name, value);
        }
        if let Some(percent) = percents.pop() {
            set(percent_field, percent);
        }

        if let Some(record) = record_from_slots(block, format, line.no, slots, diags) {
            records.push(record);
        }
    }
    records
}

// ── Category carry ───────────────────────────────────────────────────────

fn category_carry(block: &Block, format: &CompiledFormat, diags: &mut Diagnostics) -> Vec<Record> {
    let def = &format.def;
    let AssemblerConfig::CategoryCarry {
        carry_field,
        rows: tokenizer,
        ..
    } = &def.assembler
    else {
        return Vec::new();
    };
    let Some(carry_idx) = field_index(def, carry_field) else {
        return Vec::new();
    };
    let carry_required = def.fields[carry_idx].required;

    let data_start = def.header.as_ref().map_or(0, |header_cfg| {
        header_span(
            &block.lines,
            header_cfg,
            format.header_continuation.as_ref(),
        )
        .map_or(0, |span| span.data_start)
    });

    // Row tokens map onto the schema minus the carried and context fields.
    let context_idx = def
        .context_field
        .as_ref()
        .and_then(|name| field_index(def, name));
    let row_slots: Vec<usize> = (0..def.fields.len())
        .filter(|i| *i != carry_idx && Some(*i) != context_idx)
        .collect();

    let mut carry: Option<String> = None;
    let mut records = Vec::new();
    for line in &block.lines[data_start..] {
        let cleaned = deglitch(&line.text);
        if format.skip_patterns.iter().any(|p| p.is_match(&cleaned)) {
            continue;
        }

        if let Some(pattern) = &format.carry_pattern {
            if let Some(caps) = pattern.captures(&cleaned) {
                let label = caps
                    .get(1)
                    .map_or_else(|| cleaned.clone(), |m| m.as_str().to_owned());
                carry = Some(label);
                continue;
            }
        } else {
            let columns = split_columns(&line.text);
            if columns.len() == 1
                && columns[0].chars().any(char::is_alphabetic)
                && !is_numeric_token(&columns[0], def.repair_numerics)
            {
                carry = Some(columns[0].clone());
                continue;
            }
        }

        if carry.is_none() && carry_required {
            log::trace!(
                "[{}] line {}: data before the first category header",
                def.id,
                line.no
            );
            continue;
        }

        let slots = match tokenizer {
            RowTokenizer::Split => split_slots(&line.text, def, &row_slots),
            RowTokenizer::Tokens { leading_fields } => {
                let tokens = tokenize(&line.text);
                if tokens.is_empty() {
                    continue;
                }
                // Carry and context fields precede the row fields in
                // every configured schema, so the run starts after them.
                let first_slot = row_slots.first().copied().unwrap_or(0);
                anchored_slots(&tokens, def, *leading_fields, first_slot, line)
            }
        };
        let Some(mut slots) = slots else { continue };

        if let Some(carry) = &carry {
            slots[carry_idx].clone_from(carry);
        }

        let key_raw = def
            .key
            .fields
            .first()
            .and_then(|k| field_index(def, k))
            .map(|idx| slots[idx].clone())
            .unwrap_or_default();
        if !key_ok(format, &key_raw) {
            diags.row_reject(
                &def.id,
                block.period,
                line.no,
                format!("key token '{key_raw}' fails the key pattern"),
            );
            continue;
        }

        if let Some(record) = record_from_slots(block, format, line.no, slots, diags) {
            records.push(record);
        }
    }
    records
}

/// Splits a line at two-or-more-space runs and maps the columns onto the
/// row's schema slots left-to-right.
///
/// Repairs the two ways extraction miscounts columns: too many (a
/// category name split across columns — leading extras re-join into the
/// first slot) and too few (two amounts fused into one column with a
/// single space — columns holding two dotted numerals re-split).
fn split_slots(line: &str, def: &FormatDefinition, row_slots: &[usize]) -> Option<Vec<String>> {
    let mut columns = split_columns(line);
    if columns.len() < 2 {
        return None;
    }

    let expected = row_slots.len();
    if columns.len() > expected && expected >= 2 {
        let keep_tail = expected - 1;
        let joined = columns[..columns.len() - keep_tail].join(" ");
        let mut repaired = vec![joined];
        repaired.extend_from_slice(&columns[columns.len() - keep_tail..]);
        columns = repaired;
    }
    if columns.len() < expected {
        let mut resplit = Vec::with_capacity(expected);
        for (i, column) in columns.iter().enumerate() {
            if i > 0
                && resplit.len() + (columns.len() - i) < expected + 1
                && column.matches('.').count() == 2
            {
                if let Some((a, b)) = column.split_once(' ') {
                    resplit.push(a.to_owned());
                    resplit.push(b.to_owned());
                    continue;
                }
            }
            resplit.push(column.clone());
        }
        columns = resplit;
    }

    let mut slots = vec![String::new(); def.fields.len()];
    for (slot, column) in row_slots.iter().zip(columns) {
        slots[*slot] = column;
    }
    Some(slots)
}

#[cfg(test)]
mod tests {
    use ledger_lift_format::format_by_id;
    use ledger_lift_report_models::Period;

    use super::*;
    use crate::scan::{Block, BlockLine, CompiledFormat};

    fn compiled(id: &str) -> CompiledFormat {
        CompiledFormat::compile(&format_by_id(id).unwrap()).unwrap()
    }

    fn block(id_period: Option<&str>, lines: &[&str]) -> Block {
        Block {
            format: 0,
            period: id_period.map(|p| p.parse::<Period>().unwrap()),
            context: None,
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, text)| BlockLine {
                    no: i + 1,
                    text: (*text).to_owned(),
                })
                .collect(),
            start_line: 1,
        }
    }

    #[test]
    fn columnar_slices_and_types_fields() {
        let format = compiled("site_status");
        let block = block(
            Some("Mar-22"),
            &[
                "Loc    LNAME           PLACE     Open        Closed      KSI   CmtyNum  SVC    FONUM  FOSHORT     FOM     EMAIL   REGNUM  Region  Message",
                "3079   Club Trilogy    Atsugi    10/15/2021              Y     401401   Navy   23     TOKYO       x       x       2       Japan   open floor",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.natural_key, "3079");
        assert_eq!(record.canonical("lname"), "Club Trilogy");
        assert_eq!(record.canonical("open"), "10/15/2021");
        assert_eq!(record.canonical("closed"), "");
        assert_eq!(record.period, Some("Mar-22".parse().unwrap()));
    }

    #[test]
    fn columnar_merges_wrapped_rows() {
        let format = compiled("site_status");
        let block = block(
            Some("Mar-22"),
            &[
                "Loc    LNAME      PLACE     Open        Closed   KSI  CmtyNum  SVC   FONUM  FOSHORT  FOM  EMAIL  REGNUM  Region  Message",
                "001    SITE A     Atsugi    10/15/2021           Y    401401   Navy  23     TOKYO    x    x      2       Japan   closed for",
                "       (cont'd)                                                                                                  renovation",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].canonical("lname"), "SITE A (cont'd)");
        assert_eq!(records[0].canonical("message"), "closed for renovation");
        assert_eq!(diags.repairs.continuation_merges, 1);
    }

    #[test]
    fn periodless_block_is_skipped_when_period_required() {
        let format = compiled("site_status");
        let block = block(None, &["Loc  LNAME", "3079  Club"]);
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert!(records.is_empty());
        assert_eq!(diags.blocks_skipped, 1);
    }

    #[test]
    fn right_anchored_fills_rightmost_slots() {
        let format = compiled("slot_results");
        let block = block(
            None,
            &[
                "Country    Installation         FY22        FY23 thru SEP   ANNUALIZED FY23",
                "GERMANY    Kaiserslautern       1,234.56    (55.20)         -",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.natural_key, "GERMANY|Kaiserslautern");
        // Three trailing columns anchor to the three rightmost slots.
        assert_eq!(record.canonical("fy4"), "1234.56");
        assert_eq!(record.canonical("fy_thru_sep"), "-55.2");
        assert_eq!(record.canonical("fy_annualized"), "");
        assert_eq!(record.canonical("fy1"), "");
    }

    #[test]
    fn right_anchored_skips_wrapped_header_lines() {
        let format = compiled("slot_results");
        let block = block(
            None,
            &[
                "Country    Installation    FY20      FY21",
                "           FY22 thru SEP   ANNUALIZED FY22",
                "GERMANY    Kaiserslautern  1.00      2.00",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].natural_key, "GERMANY|Kaiserslautern");
    }

    #[test]
    fn region_pivot_maps_variable_value_counts() {
        let format = compiled("egms_by_region_service");
        let block = block(
            Some("Mar-22"),
            &[
                "Europe   10   100   200   300   55%",
                "Japan    5    50    60    110   45%",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 2);
        let europe = &records[0];
        assert_eq!(europe.canonical("locations"), "10");
        assert_eq!(europe.canonical("army"), "100");
        assert_eq!(europe.canonical("navy"), "200");
        assert_eq!(europe.canonical("total"), "300");
        assert_eq!(europe.canonical("marine_corps"), "");
        assert_eq!(europe.canonical("percent"), "55");
    }

    #[test]
    fn region_line_with_only_location_and_percent() {
        let format = compiled("egms_by_region_service");
        let block = block(Some("Mar-22"), &["Europe  1234  55%"]);
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.canonical("region"), "Europe");
        assert_eq!(record.canonical("locations"), "1234");
        assert_eq!(record.canonical("percent"), "55");
        for unfilled in ["army", "navy", "marine_corps", "airforce", "total"] {
            assert_eq!(record.canonical(unfilled), "", "slot {unfilled}");
        }
    }

    #[test]
    fn category_carry_applies_until_next_header() {
        let format = compiled("financial_statement");
        let block = block(
            Some("Jan-21"),
            &[
                "                                    Balance",
                "CURRENT ASSETS",
                "CASH IN BANK                        1,234,567",
                "ACCTS RECEIVABLE                    98,76S",
                "FIXED ASSETS",
                "EQUIPMENT                           55,00O",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].canonical("category"), "CURRENT ASSETS");
        assert_eq!(records[1].canonical("category"), "CURRENT ASSETS");
        assert_eq!(records[2].canonical("category"), "FIXED ASSETS");
        // Cent-suffixed integers with OCR lookalikes repaired.
        assert_eq!(records[0].canonical("balance"), "12345.67");
        assert_eq!(records[1].canonical("balance"), "987.65");
        assert_eq!(records[2].canonical("balance"), "550");
        assert!(diags.repairs.ocr_repairs >= 2);
    }

    #[test]
    fn carry_with_pattern_and_tokens_rows() {
        let format = compiled("egms_by_field_office");
        let block = block(
            Some("Mar-22"),
            &[
                "Europe",
                "1   HEIDELBERG      120  10  5  3  138",
                "23  CAMP HUMPHREYS  100  5   2  1  108",
                "Europe Total        220  15  7  4  246",
            ],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&block, &format, &mut diags);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].canonical("region"), "Europe");
        assert_eq!(records[0].canonical("fo_short"), "HEIDELBERG");
        assert_eq!(records[1].canonical("fo_short"), "CAMP HUMPHREYS");
        assert_eq!(records[1].canonical("total"), "108");
    }

    #[test]
    fn split_rows_rejoin_fragmented_categories() {
        let format = compiled("actual_vs_budget");
        let mut b = block(
            Some("Jan-21"),
            &[
                "Revenue",
                "SLOT  REVENUE   1,234.56   1,000.00   234.56   5,000.00   4,800.00   200.00",
            ],
        );
        b.context = Some("Korea".to_owned());
        let mut diags = Diagnostics::default();
        let records = assemble_block(&b, &format, &mut diags);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.canonical("category"), "SLOT REVENUE");
        assert_eq!(record.canonical("asset_type"), "Revenue");
        assert_eq!(record.canonical("location"), "Korea");
        assert_eq!(record.canonical("ytd_variance"), "200");
    }

    #[test]
    fn fused_amount_columns_resplit() {
        let format = compiled("actual_vs_budget");
        let mut b = block(
            Some("Jan-21"),
            &[
                "Revenue",
                "SLOT REVENUE   1,234.56 1,000.00   234.56   5,000.00   4,800.00   200.00",
            ],
        );
        b.context = Some("Japan".to_owned());
        let mut diags = Diagnostics::default();
        let records = assemble_block(&b, &format, &mut diags);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].canonical("month_actual"), "1234.56");
        assert_eq!(records[0].canonical("month_budget"), "1000");
    }

    #[test]
    fn rows_before_required_carry_are_not_records() {
        let format = compiled("actual_vs_budget");
        let b = block(
            Some("Jan-21"),
            &["For the Month Ended January 31, 2021   Page 4"],
        );
        let mut diags = Diagnostics::default();
        let records = assemble_block(&b, &format, &mut diags);
        assert!(records.is_empty());
        assert_eq!(diags.rows_rejected, 0);
    }
}
