use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use relink_core::tags::{latest_txt_in, parse_tagger_output, records_to_table};
use relink_core::{csvio, error};

pub fn run(input: PathBuf, base: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let source = if input.is_dir() {
        latest_txt_in(&input)?
    } else if input.is_file() {
        input
    } else {
        return Err(error::Error::InputNotFound(input).into());
    };

    let base = match base {
        Some(base) => base,
        None => std::env::current_dir()?,
    };
    let output = output.unwrap_or_else(|| source.with_extension("csv"));

    let bytes = fs::read(&source)?;
    let records = parse_tagger_output(&csvio::decode(&bytes));
    let table = records_to_table(records, &base);
    let image_count = table.rows.len();
    csvio::write_table(&output, &table)?;

    println!(
        "Converted {} ({} images) into {}",
        source.display(),
        image_count,
        output.display()
    );
    Ok(())
}
