use std::collections::HashMap;

use crate::model::{AggregateRow, GroupOrder, Record, Totals};

/// Folds the record set into one aggregate row per distinct group key and
/// sorts the result by the requested field order.
///
/// Grouping is order-independent: any permutation of the same records yields
/// identical rows. Sums use plain floating-point accumulation; two-decimal
/// rendering is an export concern.
pub fn summarize(records: &[Record], order: GroupOrder) -> Vec<AggregateRow> {
    let mut groups: HashMap<_, AggregateRow> = HashMap::new();

    for record in records {
        let key = record.group_key();
        groups
            .entry(key.clone())
            .or_insert_with(|| AggregateRow::zeroed(key))
            .absorb(record);
    }

    let mut rows: Vec<AggregateRow> = groups.into_values().collect();
    rows.sort_by(|lhs, rhs| order.compare(lhs, rhs));
    rows
}

/// Grand totals over the summary rows, computed freshly per request.
pub fn totals(rows: &[AggregateRow]) -> Totals {
    Totals::from_rows(rows)
}
