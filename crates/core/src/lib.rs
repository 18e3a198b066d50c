pub mod csvio;
pub mod error;
pub mod index;
pub mod merge;
pub mod relocate;
pub mod resolve;
pub mod rewrite;
pub mod tags;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use error::{Error, Result};
use index::FileIndex;
use resolve::{apply_resolution, resolve_path, Resolution, RowOutcome, SearchStrategy};

/// Cooperative cancellation handle. Checked during index construction and
/// between rows; cancelling does not roll back output already written.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for one correction run.
#[derive(Debug, Clone)]
pub struct CorrectOptions {
    /// Directory trees searched for replacement files.
    pub search_roots: Vec<PathBuf>,
    /// Base directory for resolving relative references.
    pub base_dir: PathBuf,
    /// Treat the first record as a header and pass it through verbatim.
    pub has_header: bool,
    /// Keep rows whose reference matched nothing; when false they are
    /// dropped from the output.
    pub keep_unmatched: bool,
    /// On multiple matches, keep one row using the first discovered match;
    /// when false, fan out one row per match.
    pub preserve_order: bool,
    /// Walk search roots on the rayon pool.
    pub parallel: bool,
    /// Build the filename index up front instead of walking per row.
    pub use_index: bool,
}

impl Default for CorrectOptions {
    fn default() -> Self {
        Self {
            search_roots: Vec::new(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            has_header: true,
            keep_unmatched: true,
            preserve_order: true,
            parallel: true,
            use_index: true,
        }
    }
}

/// Callback events for a correction run.
pub enum CorrectProgress {
    /// Input parsed; total record count (header included).
    Start { rows: usize },
    /// Filename index finished building.
    IndexBuilt { files: usize },
    /// A directory could not be read and was skipped.
    DirSkipped { path: PathBuf, reason: String },
    /// The stated path existed; kept (normalized) as-is.
    RowKept { line: usize, path: String },
    /// Field 0 was replaced. Unused candidates, if any, are reported.
    RowCorrected {
        line: usize,
        from: String,
        to: String,
        alternatives: Vec<String>,
    },
    /// A multi-match row fanned out into `count` output rows.
    RowExpanded { line: usize, count: usize },
    /// Nothing matched; the row was kept or dropped per configuration.
    RowUnmatched {
        line: usize,
        path: String,
        dropped: bool,
    },
    /// Run finished and the output file was written.
    Complete { report: CorrectReport },
}

/// Running counts for one correction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CorrectReport {
    /// Data rows processed (header excluded).
    pub total_rows: usize,
    /// Rows whose stated path did not exist on disk.
    pub missing_rows: usize,
    /// Substitutions written (fan-out rows each count once).
    pub corrected_rows: usize,
    /// Rows that matched nothing.
    pub unresolved_rows: usize,
    /// Rows that matched more than one file.
    pub multi_match_rows: usize,
}

/// Default output path for an input CSV: `<stem>_corrected.<ext>` next to it.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let name = if ext.is_empty() {
        format!("{stem}_corrected")
    } else {
        format!("{stem}_corrected.{ext}")
    };
    input.with_file_name(name)
}

/// Correct the image-path column of a label CSV.
///
/// Reads every record of `input`, verifies each row's path reference on
/// disk, searches the configured roots for replacements on a miss, applies
/// the tie-break policy, and writes the result to `output`. Calls
/// `progress_cb` with progress updates if provided.
pub fn correct_csv(
    input: &Path,
    output: &Path,
    options: &CorrectOptions,
    cancel: &CancelFlag,
    mut progress_cb: Option<&mut dyn FnMut(CorrectProgress)>,
) -> Result<CorrectReport> {
    let rows = csvio::read_rows(input)?;
    if rows.is_empty() {
        return Err(Error::EmptyInput(input.to_path_buf()));
    }

    if let Some(ref mut cb) = progress_cb {
        cb(CorrectProgress::Start { rows: rows.len() });
    }

    // Indexed mode builds the full index before any row is resolved.
    let index = if options.use_index && !options.search_roots.is_empty() {
        let (index, skipped) = FileIndex::build(&options.search_roots, options.parallel, cancel)?;
        if let Some(ref mut cb) = progress_cb {
            for skip in &skipped {
                cb(CorrectProgress::DirSkipped {
                    path: skip.path.clone(),
                    reason: skip.reason.clone(),
                });
            }
            cb(CorrectProgress::IndexBuilt { files: index.len() });
        }
        Some(index)
    } else {
        None
    };

    let strategy = match &index {
        Some(index) => SearchStrategy::Indexed(index),
        None => SearchStrategy::Walk {
            roots: &options.search_roots,
            parallel: options.parallel,
        },
    };

    let mut report = CorrectReport::default();
    let mut out_rows: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    let mut rows = rows.into_iter();

    if options.has_header {
        if let Some(header) = rows.next() {
            out_rows.push(header);
        }
    }

    let header_offset = if options.has_header { 1 } else { 0 };
    for (i, row) in rows.enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let line = i + 1 + header_offset;
        report.total_rows += 1;

        if row.is_empty() {
            out_rows.push(row);
            continue;
        }

        let raw = row[0].clone();
        let mut skipped = Vec::new();
        let resolution = resolve_path(&raw, &options.base_dir, &strategy, &mut skipped);
        if let Some(ref mut cb) = progress_cb {
            for skip in skipped {
                cb(CorrectProgress::DirSkipped {
                    path: skip.path,
                    reason: skip.reason,
                });
            }
        }

        if !matches!(resolution, Resolution::Exists(_) | Resolution::NoReference) {
            report.missing_rows += 1;
        }

        match apply_resolution(
            row,
            resolution,
            options.keep_unmatched,
            options.preserve_order,
        ) {
            RowOutcome::Passthrough(row) => out_rows.push(row),
            RowOutcome::Kept(row) => {
                if let Some(ref mut cb) = progress_cb {
                    cb(CorrectProgress::RowKept {
                        line,
                        path: row[0].clone(),
                    });
                }
                out_rows.push(row);
            }
            RowOutcome::Corrected { row, alternatives } => {
                report.corrected_rows += 1;
                if !alternatives.is_empty() {
                    report.multi_match_rows += 1;
                }
                if let Some(ref mut cb) = progress_cb {
                    cb(CorrectProgress::RowCorrected {
                        line,
                        from: raw.clone(),
                        to: row[0].clone(),
                        alternatives,
                    });
                }
                out_rows.push(row);
            }
            RowOutcome::Expanded(fanned) => {
                report.multi_match_rows += 1;
                report.corrected_rows += fanned.len();
                if let Some(ref mut cb) = progress_cb {
                    cb(CorrectProgress::RowExpanded {
                        line,
                        count: fanned.len(),
                    });
                }
                out_rows.extend(fanned);
            }
            RowOutcome::Unmatched(row) => {
                report.unresolved_rows += 1;
                if let Some(ref mut cb) = progress_cb {
                    cb(CorrectProgress::RowUnmatched {
                        line,
                        path: raw.clone(),
                        dropped: false,
                    });
                }
                out_rows.push(row);
            }
            RowOutcome::Dropped => {
                report.unresolved_rows += 1;
                if let Some(ref mut cb) = progress_cb {
                    cb(CorrectProgress::RowUnmatched {
                        line,
                        path: raw.clone(),
                        dropped: true,
                    });
                }
            }
        }
    }

    csvio::write_rows(output, &out_rows)?;

    if let Some(ref mut cb) = progress_cb {
        cb(CorrectProgress::Complete { report });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/labels.csv")),
            PathBuf::from("/data/labels_corrected.csv")
        );
        assert_eq!(
            default_output_path(Path::new("labels")),
            PathBuf::from("labels_corrected")
        );
    }

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
