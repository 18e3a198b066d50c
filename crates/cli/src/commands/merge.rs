use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use relink_core::csvio;
use relink_core::merge::{latest_csv_in, merge_tables};

pub fn run(
    base: Option<PathBuf>,
    incoming: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    incoming_dir: Option<PathBuf>,
    output: PathBuf,
    tag_source: bool,
) -> Result<()> {
    let base = pick_input(base, base_dir.as_deref(), "base")?;
    let incoming = pick_input(incoming, incoming_dir.as_deref(), "incoming")?;

    let base_table = csvio::read_table(&base)?;
    let incoming_table = csvio::read_table(&incoming)?;

    let base_label = label_of(&base);
    let incoming_label = label_of(&incoming);
    let annotate = tag_source.then_some((base_label.as_str(), incoming_label.as_str()));

    let merged = merge_tables(base_table, incoming_table, annotate);
    let row_count = merged.rows.len();
    csvio::write_table(&output, &merged)?;

    println!(
        "Merged {} + {} into {} ({} rows)",
        base.display(),
        incoming.display(),
        output.display(),
        row_count
    );
    Ok(())
}

fn pick_input(file: Option<PathBuf>, dir: Option<&Path>, which: &str) -> Result<PathBuf> {
    match (file, dir) {
        (Some(file), _) => Ok(file),
        (None, Some(dir)) => Ok(latest_csv_in(dir)?),
        (None, None) => bail!("no {which} CSV: pass a file or --{which}-dir"),
    }
}

fn label_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_input_prefers_explicit_file() {
        let picked = pick_input(Some(PathBuf::from("a.csv")), Some(Path::new("/tmp")), "base");
        assert_eq!(picked.unwrap(), PathBuf::from("a.csv"));
    }

    #[test]
    fn test_pick_input_neither_given() {
        let err = pick_input(None, None, "incoming").unwrap_err();
        assert!(err.to_string().contains("--incoming-dir"));
    }

    #[test]
    fn test_label_of_uses_file_name() {
        assert_eq!(label_of(Path::new("/data/exports/run1.csv")), "run1.csv");
    }
}
