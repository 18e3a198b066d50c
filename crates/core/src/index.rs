use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::CancelFlag;

/// A directory (or file) that could not be read during a walk.
/// The run continues without its contents.
#[derive(Debug, Clone)]
pub struct SkippedDir {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
struct Entry {
    /// Lowercased filename, extension included.
    name: String,
    path: PathBuf,
}

/// Build-once filename index over a set of search roots.
///
/// Entries are kept in discovery order (roots in caller order, files in
/// traversal order within each root) so that "first discovered" tie-breaking
/// is stable for a given filesystem state. The index is never refreshed
/// within a run; concurrent filesystem mutation is not observed.
#[derive(Debug)]
pub struct FileIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, Vec<usize>>,
}

impl FileIndex {
    /// Walk every root and index `(lowercase filename → paths)` for each
    /// regular file. Per-directory errors are skipped and reported through
    /// the returned list, never fatal. With `parallel`, roots are walked on
    /// the rayon pool and merged after join, preserving root order.
    pub fn build(
        roots: &[PathBuf],
        parallel: bool,
        cancel: &CancelFlag,
    ) -> Result<(Self, Vec<SkippedDir>)> {
        let scans: Vec<Result<RootScan>> = if parallel {
            roots.par_iter().map(|root| scan_root(root, cancel)).collect()
        } else {
            roots.iter().map(|root| scan_root(root, cancel)).collect()
        };

        let mut index = FileIndex {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        let mut skipped = Vec::new();

        for scan in scans {
            let scan = scan?;
            for entry in scan.entries {
                let slot = index.entries.len();
                index.by_name.entry(entry.name.clone()).or_default().push(slot);
                index.entries.push(entry);
            }
            skipped.extend(scan.skipped);
        }

        Ok((index, skipped))
    }

    /// All indexed paths whose filename matches `name`, case-insensitively,
    /// in discovery order.
    pub fn lookup(&self, name: &str) -> Vec<&Path> {
        let name = name.to_lowercase();
        match self.by_name.get(&name) {
            Some(slots) => slots.iter().map(|&i| self.entries[i].path.as_path()).collect(),
            None => Vec::new(),
        }
    }

    /// All indexed paths whose extension-less filename matches `stem`,
    /// case-insensitively. A linear scan over the index, in discovery order;
    /// used as the last-resort fallback, once per unresolved row.
    pub fn lookup_stem(&self, stem: &str) -> Vec<&Path> {
        let stem = stem.to_lowercase();
        self.entries
            .iter()
            .filter(|e| stem_of(&e.name) == stem)
            .map(|e| e.path.as_path())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filename without its last extension ("a.b.png" → "a.b").
fn stem_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

struct RootScan {
    entries: Vec<Entry>,
    skipped: Vec<SkippedDir>,
}

fn scan_root(root: &Path, cancel: &CancelFlag) -> Result<RootScan> {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    if !root.is_dir() {
        skipped.push(SkippedDir {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
        return Ok(RootScan { entries, skipped });
    }

    for entry in WalkDir::new(root) {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                skipped.push(SkippedDir {
                    path,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().to_lowercase(),
            path: entry.path().to_path_buf(),
        });
    }

    Ok(RootScan { entries, skipped })
}
