//! Reads `account<delimiter>hash` lines from a credential export.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use compact_str::CompactString;

use crate::error::Error;

/// One line of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub account: CompactString,
    pub hash: CompactString,
}

impl Record {
    pub fn new(account: impl Into<CompactString>, hash: impl Into<CompactString>) -> Self {
        Self { account: account.into(), hash: hash.into() }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Separator between account and hash. Only the first occurrence splits.
    pub delimiter: String,
    /// Drop the first non-blank line.
    pub skip_header: bool,
    /// Stop after this many records. `None` or `Some(0)` reads everything.
    pub limit: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: ":".to_string(), skip_header: false, limit: None }
    }
}

/// Parses records from any buffered reader.
///
/// Lines without the delimiter are skipped, never reported.
pub fn parse_records<R: BufRead>(reader: R, options: &LoadOptions) -> std::io::Result<Vec<Record>> {
    let limit = options.limit.filter(|&l| l > 0);
    let mut records = Vec::new();
    let mut first_line = true;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if first_line {
            first_line = false;
            if options.skip_header {
                continue;
            }
        }

        let Some((account, hash)) = line.split_once(options.delimiter.as_str()) else {
            continue;
        };
        records.push(Record::new(account, hash));

        if limit.is_some_and(|l| records.len() >= l) {
            break;
        }
    }

    Ok(records)
}

/// Loads all records from `path`. Any I/O failure is fatal for the run.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Vec<Record>, Error> {
    let file = File::open(path)
        .map_err(|source| Error::OpenInput { path: path.to_path_buf(), source })?;

    parse_records(BufReader::new(file), options)
        .map_err(|source| Error::ReadInput { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::io::Write;

    use super::*;

    fn parse(input: &str, options: &LoadOptions) -> Vec<Record> {
        parse_records(Cursor::new(input), options).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let records = parse("alice:AAAA1\nbob:BBBB2\n", &LoadOptions::default());
        assert_eq!(records, vec![Record::new("alice", "AAAA1"), Record::new("bob", "BBBB2")]);
    }

    #[test]
    fn test_splits_on_first_delimiter_only() {
        let records = parse("svc:AB:CD\n", &LoadOptions::default());
        assert_eq!(records, vec![Record::new("svc", "AB:CD")]);
    }

    #[test]
    fn test_skips_blank_and_malformed_lines() {
        let input = "\n  \nno-delimiter-here\nalice:AAAA1\r\n\n";
        let records = parse(input, &LoadOptions::default());
        assert_eq!(records, vec![Record::new("alice", "AAAA1")]);
    }

    #[test]
    fn test_skip_header_ignores_leading_blank_lines() {
        let options = LoadOptions { skip_header: true, ..Default::default() };
        let records = parse("\naccount:hash\nalice:AAAA1\n", &options);
        assert_eq!(records, vec![Record::new("alice", "AAAA1")]);
    }

    #[test]
    fn test_header_not_skipped_by_default() {
        let records = parse("account:hash\nalice:AAAA1\n", &LoadOptions::default());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_custom_multichar_delimiter() {
        let options = LoadOptions { delimiter: "::".to_string(), ..Default::default() };
        let records = parse("alice::AAAA1\nbob:BBBB2\n", &options);
        assert_eq!(records, vec![Record::new("alice", "AAAA1")]);
    }

    #[test]
    fn test_limit_truncates() {
        let options = LoadOptions { limit: Some(2), ..Default::default() };
        let records = parse("a:1\nb:2\nc:3\n", &options);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].account, "b");
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let options = LoadOptions { limit: Some(0), ..Default::default() };
        assert_eq!(parse("a:1\nb:2\nc:3\n", &options).len(), 3);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:AAAAA1111122223333444455556666").unwrap();
        writeln!(file, "PC01$:AAAAA1111122223333444455556666").unwrap();

        let records = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let err = load_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OpenInput { .. }), "{err}");
    }
}
