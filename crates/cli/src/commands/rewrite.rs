use std::path::PathBuf;

use anyhow::Result;
use relink_core::csvio;
use relink_core::rewrite::rewrite_paths;

pub fn run(input: PathBuf, from: &str, to: &str, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| input.clone());

    let mut table = csvio::read_table(&input)?;
    let changed = rewrite_paths(&mut table, from, to);
    csvio::write_table(&output, &table)?;

    println!(
        "Rewrote {changed} fields ({from:?} -> {to:?}) into {}",
        output.display()
    );
    Ok(())
}
