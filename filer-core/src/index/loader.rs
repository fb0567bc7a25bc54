use std::io::{BufRead, Read, Write};

use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::record::FileRecord;

/// Longest accepted data line, line terminator excluded.
pub const MAX_LINE_BYTES: usize = 4096;

const DEFAULT_CAPACITY: usize = 1000;

/// Parses an index stream of `["path", "sha1", size, mtime]` lines.
///
/// Lines starting with `#` and empty lines are skipped. Each parsed record is
/// handed to `filter`; records it returns `None` for are dropped silently.
/// Any malformed or over-long line fails the whole stream and no records are
/// returned.
pub fn load_index<R, F>(reader: R, filter: F) -> Result<Vec<FileRecord>>
where
    R: BufRead,
    F: FnMut(FileRecord) -> Option<FileRecord>,
{
    load_index_with_limit(reader, MAX_LINE_BYTES, filter)
}

pub fn load_index_with_limit<R, F>(
    mut reader: R,
    limit: usize,
    mut filter: F,
) -> Result<Vec<FileRecord>>
where
    R: BufRead,
    F: FnMut(FileRecord) -> Option<FileRecord>,
{
    let mut records = Vec::with_capacity(DEFAULT_CAPACITY);
    let mut buf = Vec::with_capacity(256);
    let mut line = 0usize;

    loop {
        buf.clear();
        // Room for the line, "\r\n" and one extra byte to detect overflow.
        let read = reader
            .by_ref()
            .take(limit as u64 + 3)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > limit {
            return Err(CatalogError::LongLine { line, limit });
        }
        if buf.is_empty() || buf[0] == b'#' {
            continue;
        }

        let record = parse_line(&buf, line)?;
        if let Some(record) = filter(record) {
            records.push(record);
        }
    }

    Ok(records)
}

fn parse_line(raw: &[u8], line: usize) -> Result<FileRecord> {
    let fields: Vec<Value> =
        serde_json::from_slice(raw).map_err(|source| CatalogError::Parse { line, source })?;
    if fields.len() != 4 {
        return Err(CatalogError::WrongArity {
            line,
            found: fields.len(),
        });
    }

    let path = fields[0]
        .as_str()
        .ok_or(CatalogError::InvalidField { line, field: "path" })?;
    let hash = fields[1]
        .as_str()
        .ok_or(CatalogError::InvalidField { line, field: "hash" })?;
    let size = as_integer(&fields[2]).ok_or(CatalogError::InvalidField { line, field: "size" })?;
    let mtime =
        as_integer(&fields[3]).ok_or(CatalogError::InvalidField { line, field: "mtime" })?;

    Ok(FileRecord::new(path, hash, size, mtime))
}

// Producers sometimes emit whole numbers as doubles.
fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|float| float as i64))
}

/// Writes `records` in the index line format read by [`load_index`].
pub fn save_index<'a, W, I>(mut writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a FileRecord>,
{
    for record in records {
        serde_json::to_writer(
            &mut writer,
            &(&record.path, &record.content_hash, record.size, record.mtime),
        )
        .map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(input: &str) -> Result<Vec<FileRecord>> {
        load_index(Cursor::new(input), Some)
    }

    #[test]
    fn loads_records_and_skips_comments() {
        let input = "# generated\n[\"/m/a.mp4\",\"h1\",100,1000]\n\n[\"/m/b.mp4\",\"h1\",50,1000]\n";
        let records = load(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "/m/a.mp4");
        assert_eq!(records[0].content_hash, "h1");
        assert_eq!(records[0].size, 100);
        assert_eq!(records[1].mtime, 1000);
    }

    #[test]
    fn accepts_crlf_and_missing_trailing_newline() {
        let records = load("[\"/m/a.mp4\",\"h1\",1,2]\r\n[\"/m/b.mp4\",\"h2\",3,4]").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].content_hash, "h2");
    }

    #[test]
    fn float_numbers_are_truncated() {
        let records = load("[\"/m/a.mp4\",\"h1\",100.0,1000.7]\n").unwrap();
        assert_eq!(records[0].size, 100);
        assert_eq!(records[0].mtime, 1000);
    }

    #[test]
    fn truncated_line_fails_whole_file() {
        let input = "[\"/m/a.mp4\",\"h1\",100,1000]\n[\"/m/c.mp4\",\"h2\"\n";
        let err = load(input).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { line: 2, .. }), "{err}");
        assert!(err.is_parse_failure());
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = load("[\"/m/a.mp4\",\"h1\",100]\n").unwrap_err();
        assert!(matches!(err, CatalogError::WrongArity { line: 1, found: 3 }));
    }

    #[test]
    fn wrong_field_types_are_rejected() {
        let err = load("[\"/m/a.mp4\",7,100,1000]\n").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { field: "hash", .. }));
        let err = load("[\"/m/a.mp4\",\"h\",\"100\",1000]\n").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { field: "size", .. }));
    }

    #[test]
    fn long_line_fails_whole_file() {
        let long_path = "x".repeat(64);
        let input = format!("[\"/m/a.mp4\",\"h1\",1,1]\n[\"/{long_path}\",\"h\",1,1]\n");
        let err = load_index_with_limit(Cursor::new(input), 32, Some).unwrap_err();
        assert!(matches!(err, CatalogError::LongLine { line: 2, limit: 32 }));
    }

    #[test]
    fn line_at_the_limit_is_accepted() {
        let line = "[\"/m/a.mp4\",\"h1\",1,1]";
        let input = format!("{line}\r\n");
        let records = load_index_with_limit(Cursor::new(input), line.len(), Some).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn filter_drops_records_silently() {
        let input = "[\"/m/a.mp4\",\"h1\",100,1000]\n[\"/m/b.mp4\",\"h2\",0,1000]\n";
        let records = load_index(Cursor::new(input), |r| (r.size > 0).then_some(r)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn save_then_load_preserves_records() {
        let original = vec![
            FileRecord::new("/m/a \"quoted\".mp4", "h1", 100, 1000),
            FileRecord::new("/m/<b>&.mp4", "h2", 5, -3),
        ];
        let mut out = Vec::new();
        save_index(&mut out, &original).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("<b>&"));

        let loaded = load_index(Cursor::new(out), Some).unwrap();
        assert_eq!(loaded.len(), original.len());
        for (a, b) in original.iter().zip(&loaded) {
            assert!(a.same_entry(b));
        }
    }
}
