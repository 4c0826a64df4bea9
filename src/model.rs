use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

/// One accepted, normalized inventory line item. Records are plain values;
/// once the extractor has produced one it is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Product name, trimmed source cell text.
    pub product: String,
    /// Category tag. Only populated by the categorized snapshot layout; the
    /// plain layout leaves it `None`.
    pub category: Option<String>,
    /// Numeric index identifier. Falls back to 0 when the cell does not parse.
    pub index: i64,
    /// Purchase price, rounded to two decimals.
    pub purchase_price: f64,
    /// Quantity, strictly positive for every accepted row.
    pub quantity: f64,
    /// Size, free text. May be empty.
    pub size: String,
    /// Sale price, rounded to two decimals.
    pub sale_price: f64,
    /// Base name of the workbook the row came from.
    pub source_file: String,
}

impl Record {
    /// Composite identity used to fold records into one [`AggregateRow`].
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            product: self.product.clone(),
            category: self.category.clone(),
            index: self.index,
            size: self.size.clone(),
        }
    }
}

/// A reported data-quality issue tied to a specific source cell. Diagnostics
/// are informational and never block the row they were raised on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Base name of the workbook containing the offending cell.
    pub file: String,
    /// 1-based spreadsheet row number.
    pub row: u32,
    /// A1-style coordinate of the offending cell, e.g. `C7`.
    pub cell: String,
    /// Human-readable description of the problem.
    pub description: String,
    /// Raw offending value. `None` when the cell was empty.
    pub value: Option<String>,
}

/// A workbook that could not be opened at all. The rest of the batch is
/// unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

/// The full result of one load operation across one or more files. A new load
/// replaces the previous batch wholesale; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<FileFailure>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Composite identity used when grouping records. Equality covers all four
/// fields; presentation ordering is a separate concern, see [`GroupOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub product: String,
    pub category: Option<String>,
    pub index: i64,
    pub size: String,
}

/// Summed view of all records sharing one [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub product: String,
    pub category: Option<String>,
    pub index: i64,
    pub size: String,
    /// Sum of contributing quantities.
    pub quantity: f64,
    /// Sum of contributing purchase prices. Rendered at two decimals on
    /// export; the running sum itself is not truncated.
    pub purchase_price: f64,
    /// Sum of contributing sale prices.
    pub sale_price: f64,
    /// Deduplicated names of the workbooks that contributed to this row.
    pub files: BTreeSet<String>,
}

impl AggregateRow {
    /// Creates a zero-valued row for the given key.
    pub fn zeroed(key: GroupKey) -> Self {
        Self {
            product: key.product,
            category: key.category,
            index: key.index,
            size: key.size,
            quantity: 0.0,
            purchase_price: 0.0,
            sale_price: 0.0,
            files: BTreeSet::new(),
        }
    }

    /// Folds one record into the running sums.
    pub fn absorb(&mut self, record: &Record) {
        self.quantity += record.quantity;
        self.purchase_price += record.purchase_price;
        self.sale_price += record.sale_price;
        self.files.insert(record.source_file.clone());
    }

    /// Contributing file names as a sorted, comma-joined string.
    pub fn files_joined(&self) -> String {
        self.files.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Grand totals over a set of aggregate rows, recomputed freshly whenever the
/// summary view is rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub quantity: f64,
    pub purchase_price: f64,
    pub sale_price: f64,
}

impl Totals {
    pub fn from_rows(rows: &[AggregateRow]) -> Self {
        let mut totals = Totals::default();
        for row in rows {
            totals.quantity += row.quantity;
            totals.purchase_price += row.purchase_price;
            totals.sale_price += row.sale_price;
        }
        totals
    }
}

/// Column layout variant of the snapshot files being ingested. The categorized
/// variant adds a category tag in column B and reports blank tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotLayout {
    Plain,
    Categorized,
}

impl SnapshotLayout {
    /// Whether column B carries a category tag in this layout.
    pub fn reads_category(&self) -> bool {
        matches!(self, SnapshotLayout::Categorized)
    }
}

/// Field order used when sorting aggregate rows for presentation and export.
/// Both orders are in circulation among snapshot producers, so this is
/// configuration rather than a hard-coded choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupOrder {
    /// Index, then size, then product name.
    IndexSizeProduct,
    /// Product name, then category, then index, then size.
    ProductCategoryIndexSize,
}

impl GroupOrder {
    /// The order each layout variant historically used.
    pub fn default_for(layout: SnapshotLayout) -> Self {
        match layout {
            SnapshotLayout::Plain => GroupOrder::IndexSizeProduct,
            SnapshotLayout::Categorized => GroupOrder::ProductCategoryIndexSize,
        }
    }

    /// Compares two aggregate rows. The index compares numerically, all other
    /// key fields compare as text.
    pub fn compare(&self, lhs: &AggregateRow, rhs: &AggregateRow) -> Ordering {
        match self {
            GroupOrder::IndexSizeProduct => lhs
                .index
                .cmp(&rhs.index)
                .then_with(|| lhs.size.cmp(&rhs.size))
                .then_with(|| lhs.product.cmp(&rhs.product)),
            GroupOrder::ProductCategoryIndexSize => lhs
                .product
                .cmp(&rhs.product)
                .then_with(|| lhs.category.cmp(&rhs.category))
                .then_with(|| lhs.index.cmp(&rhs.index))
                .then_with(|| lhs.size.cmp(&rhs.size)),
        }
    }
}
