//! Row slicing and normalization.
//!
//! Data lines are cut into field strings three ways, depending on the
//! format's assembly strategy: at char offsets from an inferred
//! [`ColumnLayout`], at runs of two-or-more spaces, or into bare
//! whitespace tokens. All three paths strip the invisible characters
//! text extraction leaves behind.

use crate::layout::ColumnLayout;

/// Strips control/zero-width/non-breaking characters and collapses
/// internal whitespace runs to a single space.
///
/// Extraction artifacts handled: non-breaking spaces, zero-width spaces,
/// BOMs, non-breaking hyphens, and typographic dashes (which the reports
/// use interchangeably with `-`).
#[must_use]
pub fn deglitch(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        let c = match c {
            '\u{00A0}' => ' ',
            '\u{200B}' | '\u{FEFF}' => continue,
            '\u{2011}' | '\u{2013}' | '\u{2014}' => '-',
            other => other,
        };
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// One data line sliced into field strings.
///
/// Mutable during continuation merging: wrapped lines append into specific
/// fields of the preceding row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based document line number the row started on.
    pub line: usize,
    /// Field strings, one per layout column (or tokenizer slot).
    pub fields: Vec<String>,
}

impl RawRow {
    /// Merges a continuation row's non-blank fields into this row,
    /// space-joining into the corresponding slots. Returns how many
    /// fields received text.
    pub fn merge_continuation(&mut self, continuation: &Self) -> usize {
        let mut merged = 0;
        for (slot, extra) in self.fields.iter_mut().zip(&continuation.fields) {
            if extra.is_empty() {
                continue;
            }
            if slot.is_empty() {
                slot.clone_from(extra);
            } else {
                slot.push(' ');
                slot.push_str(extra);
            }
            merged += 1;
        }
        merged
    }
}

/// Slices a line at the layout's char offsets.
///
/// The returned field count always equals the layout's column count:
/// lines shorter than a column's start contribute empty fields, and the
/// open-ended last column absorbs any overflow.
#[must_use]
pub fn slice_line(line: &str, layout: &ColumnLayout, line_no: usize) -> RawRow {
    let chars: Vec<char> = line.chars().collect();
    let fields = layout
        .columns()
        .iter()
        .map(|col| {
            let start = col.start.min(chars.len());
            let end = col.end.unwrap_or(chars.len()).min(chars.len());
            let raw: String = chars[start..end.max(start)].iter().collect();
            deglitch(&raw)
        })
        .collect();
    RawRow {
        line: line_no,
        fields,
    }
}

/// Splits a line into columns at runs of two or more spaces.
#[must_use]
pub fn split_columns(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut space_run = 0usize;
    for c in deglitch_preserving_runs(line).chars() {
        if c == ' ' {
            space_run += 1;
            continue;
        }
        if space_run >= 2 && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        } else if space_run == 1 && !current.is_empty() {
            current.push(' ');
        }
        space_run = 0;
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Splits a line into bare whitespace-separated tokens.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    deglitch(line)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Like [`deglitch`] but keeps whitespace runs intact so column splits at
/// two-or-more spaces still see them.
fn deglitch_preserving_runs(s: &str) -> String {
    s.trim()
        .chars()
        .filter_map(|c| match c {
            '\u{00A0}' => Some(' '),
            '\u{200B}' | '\u{FEFF}' => None,
            '\u{2011}' | '\u{2013}' | '\u{2014}' => Some('-'),
            '\t' => Some(' '),
            other => Some(other),
        })
        .collect()
}
