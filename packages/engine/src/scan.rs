//! Line-oriented section scanning.
//!
//! A two-state machine walks every page in document order. In `Idle`,
//! each line is tested against every format's start patterns; on a match
//! the scanner begins accumulating a [`Block`]. In section, a line
//! matching the format's own end markers, any format's start pattern, or
//! the generic next-section catch-all ends the block (exclusive of the
//! matching line, which is re-examined as a potential new start).
//!
//! A block whose `(table_type, period)` was already completed is consumed
//! but discarded — the mechanism that drops report pages repeating an
//! earlier month's table verbatim.

use ledger_lift_format::{AssemblerConfig, FormatDefinition};
use ledger_lift_report_models::Period;
use regex::{Regex, RegexBuilder};

use crate::EngineError;
use crate::dedup::BlockLedger;
use crate::diagnostics::Diagnostics;
use crate::page::Page;

/// A format definition with its patterns compiled.
#[derive(Debug)]
pub struct CompiledFormat {
    /// The plain definition this was compiled from.
    pub def: FormatDefinition,
    starts: Vec<Regex>,
    ends: Vec<Regex>,
    /// Natural-key validation pattern, when the format declares one.
    pub key_pattern: Option<Regex>,
    context: Option<Regex>,
    /// Category-carry header pattern, for carry formats that declare one.
    pub carry_pattern: Option<Regex>,
    /// Lines to skip outright inside carry blocks.
    pub skip_patterns: Vec<Regex>,
    /// Wrapped-header-line pattern, when the header declares one.
    pub header_continuation: Option<Regex>,
}

impl CompiledFormat {
    /// Compiles a validated format definition's patterns.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Pattern`] if a pattern fails to compile
    /// (format validation checks syntax, so this only fires for limits).
    pub fn compile(def: &FormatDefinition) -> Result<Self, EngineError> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, EngineError> {
            patterns.iter().map(|p| compile_insensitive(p)).collect()
        };

        let (carry_pattern, skip_patterns) = match &def.assembler {
            AssemblerConfig::CategoryCarry {
                carry_pattern,
                skip_patterns,
                ..
            } => (
                carry_pattern.as_deref().map(compile_insensitive).transpose()?,
                compile_all(skip_patterns)?,
            ),
            _ => (None, Vec::new()),
        };

        Ok(Self {
            starts: compile_all(&def.start_patterns)?,
            ends: compile_all(&def.end_patterns)?,
            key_pattern: def
                .key
                .pattern
                .as_deref()
                .map(compile_insensitive)
                .transpose()?,
            context: def
                .context_pattern
                .as_deref()
                .map(compile_insensitive)
                .transpose()?,
            carry_pattern,
            skip_patterns,
            header_continuation: def
                .header
                .as_ref()
                .and_then(|h| h.continuation_pattern.as_deref())
                .map(compile_insensitive)
                .transpose()?,
            def: def.clone(),
        })
    }

    /// Whether a trimmed line starts this format's section.
    #[must_use]
    pub fn matches_start(&self, trimmed: &str) -> bool {
        self.starts.iter().any(|r| r.is_match(trimmed))
    }

    /// Whether a trimmed line matches this format's own end markers.
    #[must_use]
    pub fn matches_end(&self, trimmed: &str) -> bool {
        self.ends.iter().any(|r| r.is_match(trimmed))
    }
}

fn compile_insensitive(pattern: &str) -> Result<Regex, EngineError> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// One line of a block, with its 1-based document line number for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine {
    /// 1-based document line number.
    pub no: usize,
    /// The raw line text.
    pub text: String,
}

/// A contiguous run of lines belonging to one detected table instance.
#[derive(Debug, Clone)]
pub struct Block {
    /// Index into the scanner's format slice.
    pub format: usize,
    /// The period in force when the block started.
    pub period: Option<Period>,
    /// Context label captured for the block (e.g. a branch location).
    pub context: Option<String>,
    /// The block's data lines, blank lines excluded.
    pub lines: Vec<BlockLine>,
    /// Document line the section started on.
    pub start_line: usize,
}

enum State {
    Idle,
    InSection {
        format: usize,
        block: Block,
        blanks: usize,
        discard: bool,
    },
}

/// The scanner state machine. Feed pages in document order, then call
/// [`SectionScanner::finish`].
pub struct SectionScanner<'f> {
    formats: &'f [CompiledFormat],
    stops: Vec<Regex>,
    contexts: Vec<Option<String>>,
    state: State,
    blocks: Vec<Block>,
}

impl<'f> SectionScanner<'f> {
    /// Creates a scanner over the given compiled formats and generic
    /// next-section stop patterns.
    #[must_use]
    pub fn new(formats: &'f [CompiledFormat], stops: Vec<Regex>) -> Self {
        Self {
            formats,
            stops,
            contexts: vec![None; formats.len()],
            state: State::Idle,
            blocks: Vec::new(),
        }
    }

    /// Scans one page's lines.
    pub fn push_page(&mut self, page: &Page<'_>, ledger: &mut BlockLedger, diags: &mut Diagnostics) {
        for (i, line) in page.text.lines().enumerate() {
            self.push_line(line, page.first_line + i, page.period, ledger, diags);
        }
    }

    /// Flushes any open block and returns the collected blocks. A block
    /// still open at end of input is kept as-is; no trailing marker is
    /// required.
    #[must_use]
    pub fn finish(mut self, ledger: &mut BlockLedger) -> Vec<Block> {
        let state = std::mem::replace(&mut self.state, State::Idle);
        if let State::InSection { block, discard, .. } = state {
            self.complete(block, discard, ledger);
        }
        self.blocks
    }

    fn push_line(
        &mut self,
        line: &str,
        line_no: usize,
        period: Option<Period>,
        ledger: &mut BlockLedger,
        diags: &mut Diagnostics,
    ) {
        let trimmed = line.trim();
        self.track_contexts(trimmed);

        // An end match hands the same line back to `Idle` so it can start
        // the next section; two passes are always enough.
        let mut state = std::mem::replace(&mut self.state, State::Idle);
        for _ in 0..2 {
            match state {
                State::Idle => {
                    if trimmed.is_empty() {
                        break;
                    }
                    if let Some(format) = self.find_start(trimmed) {
                        let def = &self.formats[format].def;
                        let discard = ledger.seen(&def.id, period);
                        if discard {
                            diags.duplicate_block(&def.id, period);
                        } else {
                            log::debug!(
                                "[{}] section starts at line {line_no} ({})",
                                def.id,
                                period.map_or_else(|| "no period".to_owned(), |p| p.to_string())
                            );
                        }
                        state = State::InSection {
                            format,
                            block: Block {
                                format,
                                period,
                                context: self.contexts[format].clone(),
                                lines: Vec::new(),
                                start_line: line_no,
                            },
                            blanks: 0,
                            discard,
                        };
                    }
                    break;
                }
                State::InSection {
                    format,
                    mut block,
                    mut blanks,
                    discard,
                } => {
                    if trimmed.is_empty() {
                        blanks += 1;
                        let stop = self.formats[format]
                            .def
                            .stop_blank_lines
                            .is_some_and(|limit| blanks >= limit);
                        if stop {
                            self.complete(block, discard, ledger);
                            state = State::Idle;
                        } else {
                            state = State::InSection {
                                format,
                                block,
                                blanks,
                                discard,
                            };
                        }
                        break;
                    }
                    blanks = 0;

                    let ends_here = self.formats[format].matches_end(trimmed)
                        || self.find_start(trimmed).is_some()
                        || self.stops.iter().any(|r| r.is_match(trimmed));
                    if ends_here {
                        self.complete(block, discard, ledger);
                        state = State::Idle;
                        // Re-examine this line as a potential new start.
                        continue;
                    }

                    if !discard {
                        if let Some(regex) = &self.formats[format].context {
                            if regex.is_match(trimmed) {
                                block.context = self.contexts[format].clone();
                            }
                        }
                        block.lines.push(BlockLine {
                            no: line_no,
                            text: line.to_owned(),
                        });
                    }
                    state = State::InSection {
                        format,
                        block,
                        blanks,
                        discard,
                    };
                    break;
                }
            }
        }
        self.state = state;
    }

    fn find_start(&self, trimmed: &str) -> Option<usize> {
        self.formats.iter().position(|f| f.matches_start(trimmed))
    }

    fn track_contexts(&mut self, trimmed: &str) {
        for (i, format) in self.formats.iter().enumerate() {
            if let Some(regex) = &format.context {
                if let Some(caps) = regex.captures(trimmed) {
                    let label = caps
                        .get(1)
                        .map_or_else(|| trimmed.to_owned(), |m| m.as_str().to_owned());
                    self.contexts[i] = Some(label);
                }
            }
        }
    }

    fn complete(&mut self, block: Block, discard: bool, ledger: &mut BlockLedger) {
        if discard {
            return;
        }
        let def = &self.formats[block.format].def;
        ledger.mark(&def.id, block.period);
        log::debug!(
            "[{}] section complete: {} line(s)",
            def.id,
            block.lines.len()
        );
        self.blocks.push(block);
    }
}
