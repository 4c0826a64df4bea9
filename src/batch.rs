use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::aggregate;
use crate::error::Result;
use crate::io::excel_read::{self, file_label};
use crate::io::excel_write;
use crate::model::{Batch, FileFailure, GroupOrder, SnapshotLayout, Totals};

/// Loads a batch of snapshot workbooks, strictly one after another.
///
/// A workbook that cannot be opened is recorded as a [`FileFailure`] and the
/// remaining files are still processed. The returned batch replaces any prior
/// one; callers hold it as an explicit value.
#[instrument(level = "info", skip_all, fields(file_count = paths.len()))]
pub fn load_batch(paths: &[PathBuf], layout: SnapshotLayout) -> Batch {
    let mut batch = Batch::default();

    for path in paths {
        match excel_read::read_snapshot(path, layout) {
            Ok((records, diagnostics)) => {
                info!(
                    file = %path.display(),
                    records = records.len(),
                    diagnostics = diagnostics.len(),
                    "snapshot ingested"
                );
                batch.records.extend(records);
                batch.diagnostics.extend(diagnostics);
            }
            Err(error) => {
                warn!(file = %path.display(), %error, "snapshot could not be opened");
                batch.failures.push(FileFailure {
                    file: file_label(path),
                    reason: error.to_string(),
                });
            }
        }
    }

    // Detail views present records in index order.
    batch.records.sort_by_key(|record| record.index);
    batch
}

/// Aggregates the batch and writes the detail + summary workbook. Returns the
/// freshly computed totals for the caller's report.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_report(
    output: &Path,
    batch: &Batch,
    layout: SnapshotLayout,
    order: GroupOrder,
) -> Result<Totals> {
    let summary = aggregate::summarize(&batch.records, order);
    let totals = aggregate::totals(&summary);
    debug!(
        detail_rows = batch.records.len(),
        summary_rows = summary.len(),
        "report assembled"
    );
    excel_write::write_report(output, &batch.records, &summary, layout)?;
    info!(output = %output.display(), "report written");
    Ok(totals)
}

/// Writes the on-demand diagnostics workbook for the batch.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_diagnostics(output: &Path, batch: &Batch) -> Result<()> {
    excel_write::write_diagnostics(output, &batch.diagnostics)?;
    info!(
        output = %output.display(),
        diagnostics = batch.diagnostics.len(),
        "diagnostics written"
    );
    Ok(())
}
