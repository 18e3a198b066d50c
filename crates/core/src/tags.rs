use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::csvio::CsvTable;
use crate::error::{Error, Result};

/// One image's block from a tagger's text output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub path: String,
    pub tags: Vec<String>,
    pub confidences: Vec<f64>,
}

/// Parse tagger text output into records.
///
/// Blocks start with `Tags of <path>:`; each following tag line is
/// `(<confidence>) <tag>`. Blocks without any tag line are dropped.
pub fn parse_tagger_output(text: &str) -> Vec<TagRecord> {
    let mut records = Vec::new();
    let mut current: Option<TagRecord> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Tags of ") {
            if let Some(record) = current.take() {
                if !record.tags.is_empty() {
                    records.push(record);
                }
            }
            let path = rest.strip_suffix(':').unwrap_or(rest).trim().to_string();
            current = Some(TagRecord {
                path,
                tags: Vec::new(),
                confidences: Vec::new(),
            });
        } else if line.starts_with('(') {
            if let Some((confidence, tag)) = parse_tag_line(line) {
                if let Some(ref mut record) = current {
                    record.tags.push(tag);
                    record.confidences.push(confidence);
                }
            }
        }
    }

    if let Some(record) = current {
        if !record.tags.is_empty() {
            records.push(record);
        }
    }

    records
}

fn parse_tag_line(line: &str) -> Option<(f64, String)> {
    let rest = line.strip_prefix('(')?;
    let (number, tag) = rest.split_once(')')?;
    let confidence: f64 = number.trim().parse().ok()?;
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }
    Some((confidence, tag.to_string()))
}

/// Turn parsed records into a CSV table: one row per image, paths
/// relativized against `base` when they fall under it, sorted by tag count
/// descending (stable).
pub fn records_to_table(records: Vec<TagRecord>, base: &Path) -> CsvTable {
    let mut records = records;
    records.sort_by_key(|r| Reverse(r.tags.len()));

    let rows = records
        .iter()
        .map(|record| {
            let path = Path::new(&record.path)
                .strip_prefix(base)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| record.path.clone());

            let with_confidence: Vec<String> = record
                .tags
                .iter()
                .zip(&record.confidences)
                .map(|(tag, conf)| format!("{tag} ({conf})"))
                .collect();
            let confidences: Vec<String> = record
                .confidences
                .iter()
                .map(|c| format!("{c:.3}"))
                .collect();

            vec![
                path,
                record.tags.len().to_string(),
                record.tags.join(", "),
                with_confidence.join(", "),
                confidences.join(", "),
            ]
        })
        .collect();

    CsvTable {
        header: vec![
            "image_path".to_string(),
            "tag_count".to_string(),
            "tags".to_string(),
            "tags_with_confidence".to_string(),
            "confidences".to_string(),
        ],
        rows,
    }
}

/// Newest `*.txt` file in a directory, by modification time.
pub fn latest_txt_in(dir: &Path) -> Result<PathBuf> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_txt = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_txt {
            continue;
        }
        let mtime = entry.metadata()?.modified()?;
        if latest.as_ref().map(|(t, _)| mtime > *t).unwrap_or(true) {
            latest = Some((mtime, path));
        }
    }
    latest
        .map(|(_, p)| p)
        .ok_or_else(|| Error::NoTxtFiles(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Tags of /data/images/a.png:
(0.981) 1girl
(0.854) smile

Tags of /data/images/b.png:
(0.702) outdoors
";

    // ── parse_tagger_output ──────────────────────────────────────

    #[test]
    fn test_parse_two_blocks() {
        let records = parse_tagger_output(SAMPLE);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "/data/images/a.png");
        assert_eq!(records[0].tags, vec!["1girl", "smile"]);
        assert_eq!(records[0].confidences, vec![0.981, 0.854]);
        assert_eq!(records[1].tags, vec!["outdoors"]);
    }

    #[test]
    fn test_parse_drops_tagless_block() {
        let text = "Tags of /a.png:\nTags of /b.png:\n(0.5) cat\n";
        let records = parse_tagger_output(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/b.png");
    }

    #[test]
    fn test_parse_trailing_colon_stripped() {
        let records = parse_tagger_output("Tags of /x/y.png:\n(0.9) tag\n");
        assert_eq!(records[0].path, "/x/y.png");
    }

    #[test]
    fn test_parse_ignores_malformed_tag_lines() {
        let text = "Tags of /a.png:\n(not-a-number) tag\n(0.5) good\n(0.6)\n";
        let records = parse_tagger_output(text);
        assert_eq!(records[0].tags, vec!["good"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_tagger_output("").is_empty());
    }

    #[test]
    fn test_parse_tag_with_parentheses_in_name() {
        let records = parse_tagger_output("Tags of /a.png:\n(0.5) bow (weapon)\n");
        assert_eq!(records[0].tags, vec!["bow (weapon)"]);
    }

    // ── records_to_table ─────────────────────────────────────────

    #[test]
    fn test_table_sorted_by_tag_count_desc() {
        let records = parse_tagger_output(SAMPLE);
        let table = records_to_table(records, Path::new("/data"));

        assert_eq!(table.rows[0][0], "images/a.png");
        assert_eq!(table.rows[0][1], "2");
        assert_eq!(table.rows[1][0], "images/b.png");
        assert_eq!(table.rows[1][1], "1");
    }

    #[test]
    fn test_table_path_outside_base_kept_absolute() {
        let records = parse_tagger_output("Tags of /elsewhere/c.png:\n(0.5) cat\n");
        let table = records_to_table(records, Path::new("/data"));
        assert_eq!(table.rows[0][0], "/elsewhere/c.png");
    }

    #[test]
    fn test_table_confidence_formatting() {
        let records = parse_tagger_output("Tags of /a.png:\n(0.981) 1girl\n");
        let table = records_to_table(records, Path::new("/"));
        assert_eq!(table.rows[0][3], "1girl (0.981)");
        assert_eq!(table.rows[0][4], "0.981");
    }

    // ── latest_txt_in ────────────────────────────────────────────

    #[test]
    fn test_latest_txt_by_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let older = tmp.path().join("older.txt");
        let newer = tmp.path().join("newer.txt");
        std::fs::write(&older, "a").unwrap();
        std::fs::write(&newer, "b").unwrap();

        let past = SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(latest_txt_in(tmp.path()).unwrap(), newer);
    }

    #[test]
    fn test_latest_txt_none_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = latest_txt_in(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("no TXT files"));
    }
}
