use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::csvio::CsvTable;
use crate::error::{Error, Result};

/// Newest `*.csv` file in a directory, by modification time.
pub fn latest_csv_in(dir: &Path) -> Result<PathBuf> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }
        let mtime = entry.metadata()?.modified()?;
        if latest.as_ref().map(|(t, _)| mtime > *t).unwrap_or(true) {
            latest = Some((mtime, path));
        }
    }
    latest
        .map(|(_, p)| p)
        .ok_or_else(|| Error::NoCsvFiles(dir.to_path_buf()))
}

/// Reshape a table onto `target_header`: columns missing from the source are
/// filled with empty fields, extra columns are dropped, and column order
/// follows the target.
pub fn align_columns(target_header: &[String], table: &CsvTable) -> CsvTable {
    let positions: Vec<Option<usize>> = target_header
        .iter()
        .map(|col| table.header.iter().position(|h| h == col))
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            positions
                .iter()
                .map(|pos| match pos {
                    Some(i) => row.get(*i).cloned().unwrap_or_default(),
                    None => String::new(),
                })
                .collect()
        })
        .collect();

    CsvTable {
        header: target_header.to_vec(),
        rows,
    }
}

/// Merge `incoming` into `base`: incoming is aligned onto the base header,
/// rows are concatenated, and duplicate path values (first column) are
/// collapsed keeping the last occurrence, so newer exports win.
///
/// With `annotate`, a `source_file` column naming each row's origin is
/// appended to both tables before alignment.
pub fn merge_tables(
    base: CsvTable,
    incoming: CsvTable,
    annotate: Option<(&str, &str)>,
) -> CsvTable {
    let (mut base, incoming) = match annotate {
        Some((base_label, incoming_label)) => (
            with_source_column(base, base_label),
            with_source_column(incoming, incoming_label),
        ),
        None => (base, incoming),
    };

    let aligned = align_columns(&base.header, &incoming);
    base.rows.extend(aligned.rows);
    base.rows = dedupe_by_path(base.rows);
    base
}

fn with_source_column(mut table: CsvTable, label: &str) -> CsvTable {
    if !table.header.iter().any(|h| h == "source_file") {
        table.header.push("source_file".to_string());
    }
    let width = table.header.len();
    for row in &mut table.rows {
        row.resize(width - 1, String::new());
        row.push(label.to_string());
    }
    table
}

fn dedupe_by_path(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut last: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let key = row.first().cloned().unwrap_or_default();
        last.insert(key, i);
    }
    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| {
            let key = row.first().cloned().unwrap_or_default();
            last[&key] == *i
        })
        .map(|(_, row)| row)
        .collect()
}
