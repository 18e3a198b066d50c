use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::index::{FileIndex, SkippedDir};

/// Extensions probed when a reference has no extension of its own.
/// The walk strategy also probes the uppercase spelling of each.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// Where replacement candidates come from: the prebuilt filename index, or a
/// directory walk per query.
pub enum SearchStrategy<'a> {
    Indexed(&'a FileIndex),
    Walk {
        roots: &'a [PathBuf],
        parallel: bool,
    },
}

/// Outcome of resolving one row's path reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No usable reference (empty field, or no filename component).
    NoReference,
    /// The stated path exists; carries its normalized form.
    Exists(String),
    /// Exactly one replacement found.
    Unique(String),
    /// Several replacements found, in discovery order.
    Multiple(Vec<String>),
    /// Nothing matched.
    NotFound,
}

/// What to emit for a row after applying the tie-break policy.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Row emitted untouched (no usable reference).
    Passthrough(Vec<String>),
    /// Reference existed on disk; field 0 normalized in place.
    Kept(Vec<String>),
    /// Field 0 replaced; unused candidates reported as alternatives.
    Corrected {
        row: Vec<String>,
        alternatives: Vec<String>,
    },
    /// One output row per candidate, non-path fields duplicated.
    Expanded(Vec<Vec<String>>),
    /// No match; row kept unchanged.
    Unmatched(Vec<String>),
    /// No match; row omitted from the output.
    Dropped,
}

/// Normalize a path reference: backslashes unified to `/`, made absolute
/// against `base` when relative, `.` and `..` resolved lexically.
/// Normalizing the output again yields the same string.
pub fn normalize_path(raw: &str, base: &Path) -> String {
    let unified = raw.trim().replace('\\', "/");
    let path = Path::new(&unified);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }

    out.to_string_lossy().replace('\\', "/")
}

/// Resolve one path reference against the filesystem and, on a miss, the
/// search strategy. Per-directory errors encountered while walking are
/// appended to `skipped`.
pub fn resolve_path(
    raw: &str,
    base: &Path,
    strategy: &SearchStrategy,
    skipped: &mut Vec<SkippedDir>,
) -> Resolution {
    if raw.trim().is_empty() {
        return Resolution::NoReference;
    }

    let normalized = normalize_path(raw, base);
    let path = Path::new(&normalized);
    if path.is_file() {
        return Resolution::Exists(normalized);
    }

    let filename = match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => return Resolution::NoReference,
    };

    let mut candidates = find_by_name(strategy, &filename, skipped);
    if candidates.is_empty() {
        let stem = Path::new(&filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.clone());
        candidates = find_by_stem(strategy, &stem, skipped);
    }

    let normalized: Vec<String> = dedupe(
        candidates
            .iter()
            .map(|p| normalize_path(&p.to_string_lossy(), base)),
    );

    match normalized.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Unique(normalized.into_iter().next().unwrap()),
        _ => Resolution::Multiple(normalized),
    }
}

/// Apply the tie-break policy to a resolved row.
///
/// Zero matches: pass through or drop, per `keep_unmatched`. One match:
/// substitute. Multiple: with `preserve_order` take the first discovered and
/// report the rest; otherwise fan out one row per match.
pub fn apply_resolution(
    row: Vec<String>,
    resolution: Resolution,
    keep_unmatched: bool,
    preserve_order: bool,
) -> RowOutcome {
    match resolution {
        Resolution::NoReference => RowOutcome::Passthrough(row),
        Resolution::Exists(path) => RowOutcome::Kept(replace_path_field(row, path)),
        Resolution::Unique(path) => RowOutcome::Corrected {
            row: replace_path_field(row, path),
            alternatives: Vec::new(),
        },
        Resolution::Multiple(paths) => {
            if preserve_order {
                let mut paths = paths.into_iter();
                let first = paths.next().unwrap();
                RowOutcome::Corrected {
                    row: replace_path_field(row, first),
                    alternatives: paths.collect(),
                }
            } else {
                RowOutcome::Expanded(
                    paths
                        .into_iter()
                        .map(|p| replace_path_field(row.clone(), p))
                        .collect(),
                )
            }
        }
        Resolution::NotFound => {
            if keep_unmatched {
                RowOutcome::Unmatched(row)
            } else {
                RowOutcome::Dropped
            }
        }
    }
}

fn replace_path_field(mut row: Vec<String>, path: String) -> Vec<String> {
    if row.is_empty() {
        row.push(path);
    } else {
        row[0] = path;
    }
    row
}

fn dedupe(paths: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for path in paths {
        if seen.insert(path.clone()) {
            out.push(path);
        }
    }
    out
}

fn find_by_name(
    strategy: &SearchStrategy,
    filename: &str,
    skipped: &mut Vec<SkippedDir>,
) -> Vec<PathBuf> {
    let has_extension = Path::new(filename).extension().is_some();

    match strategy {
        SearchStrategy::Indexed(index) => {
            let mut found: Vec<PathBuf> =
                index.lookup(filename).iter().map(|p| p.to_path_buf()).collect();
            if !has_extension {
                // Index keys are lowercased, so one probe per extension covers
                // both case spellings on disk.
                for ext in IMAGE_EXTENSIONS {
                    let probe = format!("{filename}.{ext}");
                    found.extend(index.lookup(&probe).iter().map(|p| p.to_path_buf()));
                }
            }
            found
        }
        SearchStrategy::Walk { roots, parallel } => {
            // Cheap pass first: the reference is usually a direct child of a
            // root after a reorganize.
            let mut found = Vec::new();
            for root in roots.iter() {
                if !root.is_dir() {
                    continue;
                }
                if has_extension {
                    let candidate = root.join(filename);
                    if candidate.is_file() {
                        found.push(candidate);
                    }
                } else {
                    for ext in IMAGE_EXTENSIONS {
                        for spelling in [ext.to_string(), ext.to_uppercase()] {
                            let candidate = root.join(format!("{filename}.{spelling}"));
                            if candidate.is_file() {
                                found.push(candidate);
                            }
                        }
                    }
                }
            }
            if !found.is_empty() {
                return found;
            }

            let target = filename.to_lowercase();
            let (walked, skips) = walk_matching(roots, *parallel, move |name| name == target);
            skipped.extend(skips);
            walked
        }
    }
}

fn find_by_stem(
    strategy: &SearchStrategy,
    stem: &str,
    skipped: &mut Vec<SkippedDir>,
) -> Vec<PathBuf> {
    match strategy {
        SearchStrategy::Indexed(index) => {
            index.lookup_stem(stem).iter().map(|p| p.to_path_buf()).collect()
        }
        SearchStrategy::Walk { roots, parallel } => {
            let target = stem.to_lowercase();
            let (walked, skips) = walk_matching(roots, *parallel, move |name| {
                let name_stem = match name.rsplit_once('.') {
                    Some((s, _)) if !s.is_empty() => s,
                    _ => name,
                };
                name_stem == target
            });
            skipped.extend(skips);
            walked
        }
    }
}

/// Walk every root collecting files whose lowercased filename satisfies the
/// predicate. Unreadable directories are recorded and skipped. With
/// `parallel`, roots are walked on the rayon pool and results merged in root
/// order after join.
fn walk_matching<F>(roots: &[PathBuf], parallel: bool, matches: F) -> (Vec<PathBuf>, Vec<SkippedDir>)
where
    F: Fn(&str) -> bool + Sync,
{
    let walk_one = |root: &PathBuf| -> (Vec<PathBuf>, Vec<SkippedDir>) {
        let mut found = Vec::new();
        let mut skipped = Vec::new();
        if !root.is_dir() {
            return (found, skipped);
        }
        for entry in WalkDir::new(root) {
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
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if matches(&name) {
                found.push(entry.path().to_path_buf());
            }
        }
        (found, skipped)
    };

    let per_root: Vec<(Vec<PathBuf>, Vec<SkippedDir>)> = if parallel {
        roots.par_iter().map(walk_one).collect()
    } else {
        roots.iter().map(walk_one).collect()
    };

    let mut found = Vec::new();
    let mut skipped = Vec::new();
    for (f, s) in per_root {
        found.extend(f);
        skipped.extend(s);
    }
    (found, skipped)
}
