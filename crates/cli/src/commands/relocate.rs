use std::path::PathBuf;

use anyhow::Result;
use relink_core::relocate::relocate_referenced_file;

pub fn run(log_dir: PathBuf, target_dir: PathBuf, base: Option<PathBuf>) -> Result<()> {
    let base = match base {
        Some(base) => base,
        None => std::env::current_dir()?,
    };

    let (source, target) = relocate_referenced_file(&log_dir, &target_dir, &base)?;
    println!("Moved {} -> {}", source.display(), target.display());
    Ok(())
}
