use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use relink_core::{
    correct_csv, default_output_path, CancelFlag, CorrectOptions, CorrectProgress, CorrectReport,
};

pub struct Args {
    pub input: PathBuf,
    pub roots: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub base: Option<PathBuf>,
    pub no_header: bool,
    pub drop_unmatched: bool,
    pub expand_matches: bool,
    pub no_index: bool,
    pub serial: bool,
}

fn active_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {bar:30.cyan/blue} {spinner:.green} {pos:>5}/{len:<5} {prefix:.dim} {msg}",
    )
    .unwrap()
    .progress_chars("━╸─")
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("  {bar:30.green} {prefix:.green} {msg:.dim}").unwrap()
}

pub fn run(args: Args) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));

    let mut options = CorrectOptions::default();
    options.search_roots = args.roots;
    options.has_header = !args.no_header;
    options.keep_unmatched = !args.drop_unmatched;
    options.preserve_order = !args.expand_matches;
    options.use_index = !args.no_index;
    options.parallel = !args.serial;
    if let Some(base) = args.base {
        options.base_dir = base;
    }
    let has_header = options.has_header;

    let mp = MultiProgress::new();
    let mut active_pb: Option<ProgressBar> = None;

    let report = correct_csv(
        &args.input,
        &output,
        &options,
        &CancelFlag::new(),
        Some(&mut |progress| match progress {
            CorrectProgress::Start { rows } => {
                let data_rows = if has_header {
                    rows.saturating_sub(1)
                } else {
                    rows
                };
                let pb = mp.add(ProgressBar::new(data_rows as u64));
                pb.set_style(active_style());
                pb.set_prefix("Resolving");
                pb.enable_steady_tick(std::time::Duration::from_millis(80));
                active_pb = Some(pb);
            }
            CorrectProgress::IndexBuilt { files } => {
                mp.println(format!("  Indexed {files} files")).ok();
            }
            CorrectProgress::DirSkipped { path, reason } => {
                mp.println(format!("  Skipped {}: {reason}", path.display()))
                    .ok();
            }
            CorrectProgress::RowKept { path, .. } => {
                if let Some(ref pb) = active_pb {
                    pb.set_message(file_name_of(&path));
                    pb.inc(1);
                }
            }
            CorrectProgress::RowCorrected {
                line,
                from,
                to,
                alternatives,
            } => {
                if !alternatives.is_empty() {
                    mp.println(multi_match_message(line, &from, &to, alternatives.len()))
                        .ok();
                }
                if let Some(ref pb) = active_pb {
                    pb.set_message(file_name_of(&to));
                    pb.inc(1);
                }
            }
            CorrectProgress::RowExpanded { line, count } => {
                mp.println(format!("  Line {line}: expanded into {count} rows"))
                    .ok();
                if let Some(ref pb) = active_pb {
                    pb.inc(1);
                }
            }
            CorrectProgress::RowUnmatched {
                line,
                path,
                dropped,
            } => {
                mp.println(unmatched_message(line, &path, dropped)).ok();
                if let Some(ref pb) = active_pb {
                    pb.inc(1);
                }
            }
            CorrectProgress::Complete { .. } => {
                if let Some(pb) = active_pb.take() {
                    pb.set_style(done_style());
                    pb.set_prefix("done");
                    pb.finish_with_message("Rows resolved");
                }
            }
        }),
    )?;

    println!();
    println!("  Wrote {}", output.display());
    println!();
    println!("{}", summary_table(&report));
    println!();
    Ok(())
}

fn file_name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn multi_match_message(line: usize, from: &str, to: &str, alternatives: usize) -> String {
    format!(
        "  Line {line}: {} candidates for {from}, kept {to}",
        alternatives + 1
    )
}

fn unmatched_message(line: usize, path: &str, dropped: bool) -> String {
    if dropped {
        format!("  Line {line}: no match for {path} (dropped)")
    } else {
        format!("  Line {line}: no match for {path}")
    }
}

fn summary_table(report: &CorrectReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Metric"), Cell::new("Rows")]);
    table.add_row(vec![Cell::new("Total"), Cell::new(report.total_rows)]);
    table.add_row(vec![Cell::new("Missing"), Cell::new(report.missing_rows)]);
    table.add_row(vec![
        Cell::new("Corrected"),
        Cell::new(report.corrected_rows),
    ]);
    table.add_row(vec![
        Cell::new("Unresolved"),
        Cell::new(report.unresolved_rows),
    ]);
    table.add_row(vec![
        Cell::new("Multi-match"),
        Cell::new(report.multi_match_rows),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── message formatting ───────────────────────────────────────

    #[test]
    fn test_unmatched_message_kept() {
        assert_eq!(
            unmatched_message(3, "a/b.png", false),
            "  Line 3: no match for a/b.png"
        );
    }

    #[test]
    fn test_unmatched_message_dropped() {
        assert_eq!(
            unmatched_message(3, "a/b.png", true),
            "  Line 3: no match for a/b.png (dropped)"
        );
    }

    #[test]
    fn test_multi_match_message_counts_kept_candidate() {
        assert_eq!(
            multi_match_message(7, "old/x.png", "new/x.png", 2),
            "  Line 7: 3 candidates for old/x.png, kept new/x.png"
        );
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("/a/b/c.png"), "c.png");
        assert_eq!(file_name_of("c.png"), "c.png");
    }

    // ── summary_table ────────────────────────────────────────────

    #[test]
    fn test_summary_table_contains_counts() {
        let report = CorrectReport {
            total_rows: 10,
            missing_rows: 4,
            corrected_rows: 3,
            unresolved_rows: 1,
            multi_match_rows: 2,
        };
        let rendered = summary_table(&report).to_string();
        assert!(rendered.contains("Corrected"));
        assert!(rendered.contains("10"));
        assert!(rendered.contains("Multi-match"));
    }
}
