//! Record- and block-level deduplication.
//!
//! Source PDFs repeat earlier months' tables verbatim and re-print
//! corrected rows on later pages. The [`BlockLedger`] is the coarse,
//! cheap first line of defense (whole repeated blocks are discarded by
//! the scanner before any row work); the [`Deduper`] then keeps the most
//! recently assembled record per [`DedupKey`], on the presumption that
//! later entries within a document are corrections.

use std::collections::{HashMap, HashSet};

use ledger_lift_format::SortOrder;
use ledger_lift_report_models::{DedupKey, Period, Record};

/// Which `(table_type, period)` blocks have already been completed.
///
/// Only period-tagged blocks are tracked: period-less blocks cannot be
/// told apart, and fiscal-span reports legitimately print several
/// period-less sections per document.
#[derive(Debug, Default)]
pub struct BlockLedger {
    seen: HashSet<(String, Period)>,
}

impl BlockLedger {
    /// Whether a block for this `(table_type, period)` was already
    /// completed.
    #[must_use]
    pub fn seen(&self, table_type: &str, period: Option<Period>) -> bool {
        period.is_some_and(|p| self.seen.contains(&(table_type.to_owned(), p)))
    }

    /// Marks a `(table_type, period)` as completed.
    pub fn mark(&mut self, table_type: &str, period: Option<Period>) {
        if let Some(period) = period {
            self.seen.insert((table_type.to_owned(), period));
        }
    }
}

/// Last-write-wins record store for one table type.
///
/// Records keep their first-seen position; a later record with the same
/// key replaces the earlier one in place.
#[derive(Debug, Default)]
pub struct Deduper {
    index: HashMap<DedupKey, usize>,
    records: Vec<Record>,
}

impl Deduper {
    /// Inserts a record, replacing any earlier record with the same key.
    /// Returns `true` when a replacement happened.
    pub fn insert(&mut self, record: Record) -> bool {
        let key = record.dedup_key();
        if let Some(&slot) = self.index.get(&key) {
            self.records[slot] = record;
            true
        } else {
            self.index.insert(key, self.records.len());
            self.records.push(record);
            false
        }
    }

    /// Number of surviving records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the store, returning records in the table's output order.
    #[must_use]
    pub fn into_records(self, sort: SortOrder) -> Vec<Record> {
        let mut records = self.records;
        if sort == SortOrder::Chronological {
            records.sort_by(|a, b| {
                a.natural_key
                    .cmp(&b.natural_key)
                    .then_with(|| a.period.cmp(&b.period))
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ledger_lift_report_models::{FieldValue, NormalizedField};

    use super::*;

    fn record(key: &str, period: &str, note: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert(
            "note".to_owned(),
            NormalizedField::new(FieldValue::Text(note.to_owned()), note),
        );
        Record {
            table_type: "site_status".to_owned(),
            period: Some(period.parse().unwrap()),
            natural_key: key.to_owned(),
            fields,
        }
    }

    #[test]
    fn later_record_replaces_earlier_in_place() {
        let mut deduper = Deduper::default();
        deduper.insert(record("1001", "Mar-22", "first"));
        deduper.insert(record("2002", "Mar-22", "other"));
        let replaced = deduper.insert(record("1001", "Mar-22", "corrected"));
        assert!(replaced);

        let records = deduper.into_records(SortOrder::FirstSeen);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].natural_key, "1001");
        assert_eq!(records[0].canonical("note"), "corrected");
        assert_eq!(records[1].natural_key, "2002");
    }

    #[test]
    fn same_key_different_period_both_survive() {
        let mut deduper = Deduper::default();
        deduper.insert(record("1001", "Mar-22", "march"));
        let replaced = deduper.insert(record("1001", "Apr-22", "april"));
        assert!(!replaced);
        assert_eq!(deduper.len(), 2);
    }

    #[test]
    fn chronological_sort_orders_key_then_period() {
        let mut deduper = Deduper::default();
        deduper.insert(record("2002", "Mar-22", ""));
        deduper.insert(record("1001", "Apr-22", ""));
        deduper.insert(record("1001", "Mar-22", ""));
        let records = deduper.into_records(SortOrder::Chronological);
        let order: Vec<(String, String)> = records
            .iter()
            .map(|r| (r.natural_key.clone(), r.period.unwrap().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1001".to_owned(), "Mar-22".to_owned()),
                ("1001".to_owned(), "Apr-22".to_owned()),
                ("2002".to_owned(), "Mar-22".to_owned()),
            ]
        );
    }

    #[test]
    fn ledger_tracks_period_tagged_blocks_only() {
        let mut ledger = BlockLedger::default();
        let period: Period = "Mar-22".parse().unwrap();

        ledger.mark("site_status", Some(period));
        assert!(ledger.seen("site_status", Some(period)));
        assert!(!ledger.seen("slot_results", Some(period)));

        ledger.mark("slot_results", None);
        assert!(!ledger.seen("slot_results", None));
    }
}
