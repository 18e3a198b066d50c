use std::fs;
use std::io::Write;
use std::path::Path;

use encoding_rs::{Encoding, GBK, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

use crate::error::{Error, Result};

/// UTF-8 byte order mark, written at the start of every output file so that
/// spreadsheet tools pick the right encoding for non-ASCII labels.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A CSV file split into a header record and data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Sniff the encoding of a raw byte buffer.
///
/// BOMs win outright; otherwise the candidate list UTF-8 → GBK → windows-1252
/// is tried in order and the first lossless decode is used. windows-1252
/// accepts any byte sequence, so detection never fails.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if bytes.starts_with(UTF8_BOM) {
        return UTF_8;
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return UTF_16LE;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return UTF_16BE;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let (_, had_errors) = GBK.decode_without_bom_handling(bytes);
    if !had_errors {
        return GBK;
    }
    WINDOWS_1252
}

/// Decode a byte buffer using the detected encoding, stripping any BOM.
pub fn decode(bytes: &[u8]) -> String {
    let encoding = detect_encoding(bytes);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Read every record of a CSV file as plain string rows.
///
/// No header interpretation; ragged field counts are allowed. A missing file
/// is fatal for the run.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.is_file() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    let text = decode(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Write rows as UTF-8 CSV (with BOM), preserving each row's field count.
pub fn write_rows(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a CSV file whose first record is a header.
pub fn read_table(path: &Path) -> Result<CsvTable> {
    let mut rows = read_rows(path)?;
    if rows.is_empty() {
        return Err(Error::EmptyInput(path.to_path_buf()));
    }
    let header = rows.remove(0);
    Ok(CsvTable { header, rows })
}

/// Write a header-plus-rows table as UTF-8 CSV (with BOM).
pub fn write_table(path: &Path, table: &CsvTable) -> Result<()> {
    let mut all = Vec::with_capacity(table.rows.len() + 1);
    all.push(table.header.clone());
    all.extend(table.rows.iter().cloned());
    write_rows(path, &all)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── detect_encoding ──────────────────────────────────────────

    #[test]
    fn test_detect_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("a,b".as_bytes());
        assert_eq!(detect_encoding(&bytes), UTF_8);
    }

    #[test]
    fn test_detect_utf16le_bom() {
        let bytes = [0xFF, 0xFE, b'a', 0x00];
        assert_eq!(detect_encoding(&bytes), UTF_16LE);
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'a'];
        assert_eq!(detect_encoding(&bytes), UTF_16BE);
    }

    #[test]
    fn test_detect_plain_utf8() {
        assert_eq!(detect_encoding("图片路径,分类".as_bytes()), UTF_8);
    }

    #[test]
    fn test_detect_gbk() {
        let (bytes, _, _) = GBK.encode("图片路径,分类");
        assert_eq!(detect_encoding(&bytes), GBK);
    }

    #[test]
    fn test_decode_gbk_roundtrip() {
        let (bytes, _, _) = GBK.encode("图片路径");
        assert_eq!(decode(&bytes), "图片路径");
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"a,b");
        assert_eq!(decode(&bytes), "a,b");
    }

    // ── read_rows / write_rows ───────────────────────────────────

    #[test]
    fn test_read_rows_missing_file() {
        let err = read_rows(Path::new("/nonexistent/file.csv")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_write_then_read_preserves_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let rows = vec![
            vec!["img/a.png".to_string(), "cat".to_string()],
            vec!["img/b.png".to_string(), "dog".to_string(), "extra".to_string()],
        ];

        write_rows(&path, &rows).unwrap();
        let read = read_rows(&path).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_read_rows_gbk_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gbk.csv");
        let (bytes, _, _) = GBK.encode("图片路径,标签\na.png,猫\n");
        std::fs::write(&path, &bytes).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["图片路径", "标签"]);
        assert_eq!(rows[1], vec!["a.png", "猫"]);
    }

    #[test]
    fn test_output_has_utf8_bom() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bom.csv");
        write_rows(&path, &[vec!["a".to_string()]]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }

    #[test]
    fn test_fields_with_commas_quoted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quoted.csv");
        let rows = vec![vec!["a.png".to_string(), "cat, dog".to_string()]];

        write_rows(&path, &rows).unwrap();
        assert_eq!(read_rows(&path).unwrap(), rows);
    }

    // ── read_table / write_table ─────────────────────────────────

    #[test]
    fn test_read_table_splits_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        std::fs::write(&path, "path,label\na.png,cat\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.header, vec!["path", "label"]);
        assert_eq!(table.rows, vec![vec!["a.png", "cat"]]);
    }

    #[test]
    fn test_read_table_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let err = read_table(&path).unwrap_err();
        assert!(err.to_string().contains("no records"));
    }

    #[test]
    fn test_table_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rt.csv");
        let table = CsvTable {
            header: vec!["path".to_string(), "label".to_string()],
            rows: vec![vec!["a.png".to_string(), "cat".to_string()]],
        };

        write_table(&path, &table).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }
}
