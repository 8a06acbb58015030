//! Import execution: normalize, dedup, and commit one sheet in bounded
//! batches.
//!
//! Batches commit independently; a failure in one batch never rolls back a
//! prior one, so callers must treat a result with `errors > 0` as partially
//! applied and re-run in append mode after fixing the source. An insert
//! that reports success while persisting zero rows is escalated to a
//! row-level error instead of being swallowed: that is how row-level
//! security rejects writes.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    dedup::{DedupGuard, roster_acceptance},
    error::{ImportError, StoreError},
    mapper::ColumnMap,
    normalize::{self, Record},
    router::TabType,
    store::{RecordStore, Scope},
    workbook::ParsedSheet,
};

/// Rows per insert batch.
pub const BATCH_SIZE: usize = 250;
/// Row-error details kept verbatim; the rest collapse into a count.
pub const ERROR_PREVIEW_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Delete all existing scoped records before inserting.
    Replace,
    /// Preserve existing records and skip duplicates.
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based position within the sheet's data rows.
    pub row: usize,
    pub message: String,
}

/// Outcome of one import execution for one sheet. Never mutated after
/// return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported: usize,
    pub deleted: u64,
    pub errors: usize,
    pub duplicates_skipped: usize,
    /// Rows silently excluded for lacking their tab's business key.
    pub missing_key_skipped: usize,
    /// First [`ERROR_PREVIEW_CAP`] row errors, in row order.
    pub error_details: Vec<RowError>,
    /// Row errors beyond the preview cap.
    pub errors_truncated: usize,
    pub mode: ImportMode,
}

/// Run the import for one sheet against a frozen column map.
///
/// Sheet-fatal conditions (authorization, replace-mode delete failure, an
/// unroutable tab) return `Err` before any insert; row-level outcomes are
/// accumulated in the result.
pub fn execute(
    store: &mut dyn RecordStore,
    scope: &Scope,
    sheet: &ParsedSheet,
    map: &ColumnMap,
    tab: TabType,
    mode: ImportMode,
) -> Result<ImportResult, ImportError> {
    let Some(table) = tab.table() else {
        return Err(ImportError::UnroutableSheet);
    };
    store.authorize_write(scope).map_err(|e| match e {
        StoreError::Unauthenticated => ImportError::Unauthenticated,
        _ => ImportError::Forbidden {
            scope: scope.to_string(),
        },
    })?;

    // Existing keys are fetched once up front; replace mode skips the
    // store-side check entirely since those rows are about to be deleted.
    let check_store = mode == ImportMode::Append;
    let existing = if check_store {
        store
            .select(scope, table)
            .map_err(ImportError::ExistingFetchFailed)?
    } else {
        Vec::new()
    };
    let mut guard = DedupGuard::from_existing(&existing, tab);

    let accept = match tab {
        TabType::Roster => Some(roster_acceptance(sheet, map)),
        _ => None,
    };

    let mut errors: Vec<RowError> = Vec::new();
    let mut duplicates_skipped = 0usize;
    let mut missing_key_skipped = 0usize;
    let mut candidates: Vec<(usize, Record)> = Vec::new();

    for (idx, raw) in sheet.rows.iter().enumerate() {
        let row_number = idx + 1;
        if let Some(mask) = &accept
            && !mask.get(idx).copied().unwrap_or(false)
        {
            missing_key_skipped += 1;
            continue;
        }
        let mut record = normalize::normalize_row(raw, map, tab);
        let Some(key) = normalize::business_key(&record, tab) else {
            missing_key_skipped += 1;
            continue;
        };
        if tab == TabType::Inventory {
            normalize::derive_inventory_fields(&mut record);
        }
        let failures = normalize::validate_record(&record, tab);
        if !failures.is_empty() {
            errors.push(RowError {
                row: row_number,
                message: failures.join("; "),
            });
            continue;
        }
        if guard.is_duplicate(&key, check_store) {
            duplicates_skipped += 1;
            continue;
        }
        record.insert("event_id".into(), json!(scope.event_id.to_string()));
        candidates.push((row_number, record));
    }

    let deleted = match mode {
        ImportMode::Replace => store.delete_scoped(scope, table).map_err(|source| {
            ImportError::ReplaceDeleteFailed {
                table: table.to_string(),
                source,
            }
        })?,
        ImportMode::Append => 0,
    };

    let mut imported = 0usize;
    for batch in candidates.chunks(BATCH_SIZE) {
        let rows: Vec<Record> = batch.iter().map(|(_, record)| record.clone()).collect();
        match store.insert_confirmed(scope, table, &rows) {
            Err(e) => {
                warn!("Batch insert into '{table}' failed: {e}");
                for (row, _) in batch {
                    errors.push(RowError {
                        row: *row,
                        message: format!("Insert failed: {e}"),
                    });
                }
            }
            Ok(0) if !batch.is_empty() => {
                // Reported success, persisted nothing: a silently blocking
                // authorization layer, not a clean write.
                let reason = StoreError::PersistenceSilentlyBlocked;
                warn!("Batch insert into '{table}': {reason}");
                for (row, _) in batch {
                    errors.push(RowError {
                        row: *row,
                        message: reason.to_string(),
                    });
                }
            }
            Ok(persisted) => {
                let attempted = batch.len() as u64;
                if persisted < attempted {
                    warn!(
                        "Batch insert into '{table}' persisted {persisted} of {attempted} row(s)"
                    );
                    // The store does not say which rows it dropped; charge
                    // the tail of the batch so the counts still add up.
                    for (row, _) in &batch[persisted as usize..] {
                        errors.push(RowError {
                            row: *row,
                            message: format!(
                                "Batch persisted {persisted} of {attempted} row(s)"
                            ),
                        });
                    }
                }
                imported += persisted as usize;
            }
        }
    }

    let total_errors = errors.len();
    let errors_truncated = total_errors.saturating_sub(ERROR_PREVIEW_CAP);
    errors.truncate(ERROR_PREVIEW_CAP);

    let result = ImportResult {
        success: total_errors == 0,
        imported,
        deleted,
        errors: total_errors,
        duplicates_skipped,
        missing_key_skipped,
        error_details: errors,
        errors_truncated,
        mode,
    };
    info!(
        "Sheet '{}' -> {table}: imported {}, deleted {}, {} error(s), {} duplicate(s), {} missing key",
        sheet.name, result.imported, result.deleted, result.errors,
        result.duplicates_skipped, result.missing_key_skipped
    );
    Ok(result)
}
