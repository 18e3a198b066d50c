use std::fs;
use std::path::{Path, PathBuf};

use crate::csvio;
use crate::error::{Error, Result};
use crate::tags;

/// Extract the file path from the last `Tags of <path>:` line of a tagger
/// log. The log's final block names the file the tagger stopped on.
pub fn extract_referenced_path(text: &str) -> Option<String> {
    text.lines().rev().find_map(|line| {
        line.strip_prefix("Tags of ").map(|rest| {
            let rest = rest.trim();
            rest.strip_suffix(':').unwrap_or(rest).trim().to_string()
        })
    })
}

/// Collision-avoiding path inside `dir`: `name.ext`, then `name_1.ext`,
/// `name_2.ext`, …
pub fn unique_target(dir: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().unwrap_or_default().to_string_lossy();

    let mut target = dir.join(filename);
    let mut counter = 1u32;
    while target.exists() {
        target = if ext.is_empty() {
            dir.join(format!("{stem}_{counter}"))
        } else {
            dir.join(format!("{stem}_{counter}.{ext}"))
        };
        counter += 1;
    }
    target
}

/// Move the file referenced by the newest tagger log in `log_dir` into
/// `target_dir`. Relative references are resolved against `base`. Returns
/// the (source, target) pair.
pub fn relocate_referenced_file(
    log_dir: &Path,
    target_dir: &Path,
    base: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let log = tags::latest_txt_in(log_dir)?;
    let bytes = fs::read(&log)?;
    let text = csvio::decode(&bytes);

    let referenced =
        extract_referenced_path(&text).ok_or_else(|| Error::NoReferencedFile(log.clone()))?;

    let mut source = PathBuf::from(&referenced);
    if source.is_relative() {
        source = base.join(source);
    }
    if !source.is_file() {
        return Err(Error::ReferencedFileMissing(source));
    }

    fs::create_dir_all(target_dir)?;
    let filename = source
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let target = unique_target(target_dir, &filename);
    move_file(&source, &target)?;

    Ok((source, target))
}

/// Rename where possible; copy+remove across filesystems.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    if fs::rename(source, target).is_err() {
        fs::copy(source, target)?;
        fs::remove_file(source)?;
    }
    Ok(())
}
