//! Line-oriented `key,value` parser shared by sensor ingestion and change
//! requests.
//!
//! Format rules:
//!
//! - one entry per line, split on the first `,`;
//! - blank lines and lines starting with `#` are ignored;
//! - lines longer than [`MAX_LINE_BYTES`] are rejected.
//!
//! A bad line is logged and skipped; it never aborts the rest of the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::CoreError;

/// Longest accepted line, excluding the terminating newline.
pub const MAX_LINE_BYTES: usize = 256;

const COMMENT_MARKER: char = '#';
const SEPARATOR: char = ',';

/// A single `key,value` line. Both halves are trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    /// 1-based line number in the source.
    pub line: usize,
    pub key: &'a str,
    pub value: &'a str,
}

/// Outcome counters for one pass over a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Entries handed to the callback and accepted by it.
    pub accepted: usize,
    /// Lines that were malformed or rejected by the callback.
    pub skipped: usize,
}

/// Open `path` and feed every entry to `on_entry`.
///
/// Fails with [`CoreError::SourceUnavailable`] if the file cannot be opened
/// or read; per-line problems are logged and counted in [`ParseStats`].
pub fn parse_file<F>(path: &Path, on_entry: F) -> Result<ParseStats, CoreError>
where
    F: FnMut(Entry<'_>) -> Result<(), CoreError>,
{
    let unavailable = |source| CoreError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unavailable)?;
    parse_reader(BufReader::new(file), on_entry).map_err(unavailable)
}

/// Feed every entry in `reader` to `on_entry`.
///
/// When `on_entry` returns an error, the error is logged and the line
/// counted as skipped.
pub fn parse_reader<R, F>(mut reader: R, mut on_entry: F) -> io::Result<ParseStats>
where
    R: BufRead,
    F: FnMut(Entry<'_>) -> Result<(), CoreError>,
{
    let mut stats = ParseStats::default();
    let mut buf = Vec::with_capacity(MAX_LINE_BYTES + 1);
    let mut line_no = 0;

    loop {
        buf.clear();
        let read = reader
            .by_ref()
            .take((MAX_LINE_BYTES + 1) as u64)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        if buf.last() != Some(&b'\n') && buf.len() > MAX_LINE_BYTES {
            skip_to_newline(&mut reader)?;
            report(
                &mut stats,
                CoreError::MalformedLine {
                    line: line_no,
                    reason: format!("line exceeds {MAX_LINE_BYTES} bytes"),
                },
            );
            continue;
        }

        let text = String::from_utf8_lossy(&buf);
        let result = match split_line(line_no, &text) {
            Ok(Some(entry)) => on_entry(entry),
            Ok(None) => continue,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => stats.accepted += 1,
            Err(e) => report(&mut stats, e),
        }
    }

    Ok(stats)
}

/// Split one raw line into an entry. `Ok(None)` means blank or comment.
fn split_line(line: usize, raw: &str) -> Result<Option<Entry<'_>>, CoreError> {
    let text = raw.trim();
    if text.is_empty() || text.starts_with(COMMENT_MARKER) {
        return Ok(None);
    }

    let (key, value) = text
        .split_once(SEPARATOR)
        .ok_or_else(|| CoreError::MalformedLine {
            line,
            reason: format!("missing '{SEPARATOR}' separator"),
        })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(CoreError::MalformedLine {
            line,
            reason: "empty key".to_string(),
        });
    }

    Ok(Some(Entry {
        line,
        key,
        value: value.trim(),
    }))
}

/// Discard input up to and including the next newline without buffering it.
fn skip_to_newline<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (found, used) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(idx) => (true, idx + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

fn report(stats: &mut ParseStats, error: CoreError) {
    tracing::warn!(error = %error, "Skipping line");
    stats.skipped += 1;
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn collect(input: &str) -> (Vec<(usize, String, String)>, ParseStats) {
        let mut entries = Vec::new();
        let stats = parse_reader(Cursor::new(input), |e| {
            entries.push((e.line, e.key.to_string(), e.value.to_string()));
            Ok(())
        })
        .expect("in-memory read cannot fail");
        (entries, stats)
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let (entries, stats) = collect("# header\n\nac1Temp,31\n   \n#ac2Temp,99\nac2Temp,25\n");
        assert_eq!(
            entries,
            vec![
                (3, "ac1Temp".to_string(), "31".to_string()),
                (6, "ac2Temp".to_string(), "25".to_string()),
            ]
        );
        assert_eq!(stats, ParseStats { accepted: 2, skipped: 0 });
    }

    #[test]
    fn splits_on_first_separator_only() {
        let (entries, _) = collect("trapSink,10.0.0.1,public\n");
        assert_eq!(entries[0].1, "trapSink");
        assert_eq!(entries[0].2, "10.0.0.1,public");
    }

    #[test]
    fn trims_whitespace_and_carriage_returns() {
        let (entries, _) = collect("  ac3Temp , 22 \r\n");
        assert_eq!(entries[0].1, "ac3Temp");
        assert_eq!(entries[0].2, "22");
    }

    #[test]
    fn missing_separator_is_skipped_not_fatal() {
        let (entries, stats) = collect("garbage\nac1Temp,20\n,5\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(stats, ParseStats { accepted: 1, skipped: 2 });
    }

    #[test]
    fn last_line_without_newline_is_parsed() {
        let (entries, _) = collect("ac1Temp,20\nac2Temp,21");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].2, "21");
    }

    #[test]
    fn overlong_line_is_skipped_and_parsing_resumes() {
        let long = format!("ac1Temp,{}\n", "9".repeat(MAX_LINE_BYTES * 3));
        let input = format!("{long}ac2Temp,24\n");
        let (entries, stats) = collect(&input);
        assert_eq!(entries, vec![(2, "ac2Temp".to_string(), "24".to_string())]);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn line_at_limit_is_accepted() {
        let key = "k".repeat(MAX_LINE_BYTES - 2);
        let (entries, stats) = collect(&format!("{key},1\n"));
        assert_eq!(entries.len(), 1);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn callback_rejection_counts_as_skipped() {
        let stats = parse_reader(Cursor::new("a,1\nb,2\n"), |e| {
            if e.key == "b" {
                Err(CoreError::UnknownSensor(e.key.to_string()))
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(stats, ParseStats { accepted: 1, skipped: 1 });
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let result = parse_file(Path::new("/nonexistent/envmon/sensors.dat"), |_| Ok(()));
        assert!(matches!(result, Err(CoreError::SourceUnavailable { .. })));
    }
}
