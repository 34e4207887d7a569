///! Standings CSV parser
///!
///! Turns an uploaded standings sheet into [`TeamRecord`]s. Columns are
///! positional; the first row is always treated as a header and dropped.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use standings_common::TeamRecord;
use tracing::debug;

use crate::error::{Result, StandingsError};

/// Rows shorter than this are skipped (trailing blank lines, stray notes)
const MIN_FIELDS_PER_ROW: usize = 2;

/// Parse an integer the lenient way spreadsheet exports need.
///
/// Leading whitespace and an optional sign are accepted, then the longest run
/// of leading digits is taken and anything after it is ignored. A `0x`/`0X`
/// prefix switches to hexadecimal digits:
///   "42"     -> 42
///   " 12pts" -> 12
///   "3.9"    -> 3
///   "0x1F"   -> 31
///   "abc"    -> 0
///   ""       -> 0
fn parse_int_lenient(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (rest, radix) = match rest.get(..2) {
        Some("0x") | Some("0X") => (&rest[2..], 16),
        _ => (rest, 10),
    };

    let digits_end = rest
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];

    if digits.is_empty() {
        return 0;
    }

    match i64::from_str_radix(digits, radix) {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) => 0,
    }
}

/// Field at `idx` as text. Bytes that are not UTF-8 become U+FFFD.
fn text_field(row: &csv::ByteRecord, idx: usize, line: u64) -> String {
    let raw = row.get(idx).unwrap_or_default();
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            debug!("Line {}: column {} is not valid UTF-8, replaced undecodable bytes", line, idx);
            text
        }
    }
}

/// Numeric cell at `idx`, coerced to 0 when missing or malformed.
fn numeric_field(row: &csv::ByteRecord, idx: usize, line: u64) -> i64 {
    let raw = text_field(row, idx, line);
    let value = parse_int_lenient(&raw);
    if value == 0 && !raw.trim().trim_start_matches(['+', '-']).starts_with('0') {
        debug!("Line {}: column {} value {:?} coerced to 0", line, idx, raw);
    }
    value
}

fn row_to_record(row: &csv::ByteRecord, line: u64) -> TeamRecord {
    TeamRecord {
        rank:             numeric_field(row, 0, line),
        team_name:        text_field(row, 1, line),
        total_points:     numeric_field(row, 2, line),
        placement_points: numeric_field(row, 3, line),
        kill_points:      numeric_field(row, 4, line),
        total_kills:      numeric_field(row, 5, line),
        matches_played:   numeric_field(row, 6, line),
        first_place_wins: numeric_field(row, 7, line),
    }
}

/// Parse standings CSV content into records, preserving input order.
///
/// Undecodable bytes inside a field are replaced rather than rejected;
/// malformed cells never reject a row.
pub fn parse_standings_csv(content: &[u8]) -> Result<Vec<TeamRecord>> {
    parse_standings_reader(content)
}

/// Parse standings CSV from any byte source.
///
/// Fails only when the source itself errors or cannot be tokenized.
pub fn parse_standings_reader<R: Read>(source: R) -> Result<Vec<TeamRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Rows may carry fewer or extra columns
        .from_reader(source);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in reader.byte_records().enumerate() {
        let row = result?;

        // Header row, whatever it says
        if index == 0 {
            continue;
        }

        if row.len() < MIN_FIELDS_PER_ROW {
            skipped += 1;
            continue;
        }

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        records.push(row_to_record(&row, line));
    }

    debug!(
        "Parsed {} standings rows ({} short rows skipped)",
        records.len(),
        skipped
    );

    Ok(records)
}

/// Read and parse a standings CSV file.
pub async fn parse_standings_file(path: impl AsRef<Path>) -> Result<Vec<TeamRecord>> {
    let path = path.as_ref();
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| StandingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    debug!("Loaded {} bytes of CSV from {:?}", content.len(), path);
    parse_standings_csv(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const HEADER: &str = "Rank,Team Name,Total Points,Placement Points,Kill Points,Total Kills,Matches Played,First Place Wins\n";

    #[test]
    fn test_parse_int_lenient() {
        assert_eq!(parse_int_lenient("42"), 42);
        assert_eq!(parse_int_lenient("  7"), 7);
        assert_eq!(parse_int_lenient("-3"), -3);
        assert_eq!(parse_int_lenient("+5"), 5);
        assert_eq!(parse_int_lenient("12pts"), 12);
        assert_eq!(parse_int_lenient("3.9"), 3);
        assert_eq!(parse_int_lenient("abc"), 0);
        assert_eq!(parse_int_lenient(""), 0);
        assert_eq!(parse_int_lenient("-"), 0);
        assert_eq!(parse_int_lenient("99999999999999999999999"), 0);
    }

    #[test]
    fn test_parse_int_lenient_hex_prefix() {
        assert_eq!(parse_int_lenient("0x10"), 16);
        assert_eq!(parse_int_lenient("0X1f"), 31);
        assert_eq!(parse_int_lenient(" -0x10"), -16);
        assert_eq!(parse_int_lenient("0x1Gz"), 1);
        assert_eq!(parse_int_lenient("0x"), 0);
        assert_eq!(parse_int_lenient("0xZZ"), 0);
        assert_eq!(parse_int_lenient("010"), 10);
    }

    #[test]
    fn test_worked_example() {
        let csv = format!(
            "{}1,Alpha,50,20,30,15,5,2\n2,Beta,abc,10,10,8,5,0\n",
            HEADER
        );
        let records = parse_standings_csv(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            TeamRecord {
                rank: 1,
                team_name: "Alpha".to_string(),
                total_points: 50,
                placement_points: 20,
                kill_points: 30,
                total_kills: 15,
                matches_played: 5,
                first_place_wins: 2,
            }
        );
        assert_eq!(
            records[1],
            TeamRecord {
                rank: 2,
                team_name: "Beta".to_string(),
                total_points: 0,
                placement_points: 10,
                kill_points: 10,
                total_kills: 8,
                matches_played: 5,
                first_place_wins: 0,
            }
        );
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse_standings_csv(HEADER.as_bytes()).unwrap().is_empty());
        assert!(parse_standings_csv(b"").unwrap().is_empty());
    }

    #[test]
    fn test_header_is_not_validated() {
        let csv = "whatever,columns\n3,Gamma,1,1,1,1,1,1\n";
        let records = parse_standings_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_name, "Gamma");
    }

    #[test]
    fn test_short_rows_dropped_without_reordering() {
        let csv = format!(
            "{}1,Alpha,10\nlonely\n2,Beta,9\n\n3,Gamma,8\n   \n",
            HEADER
        );
        let records = parse_standings_csv(csv.as_bytes()).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_order_preserved_regardless_of_rank() {
        let csv = format!("{}9,Last,1\n1,First,99\n5,Middle,50\n", HEADER);
        let records = parse_standings_csv(csv.as_bytes()).unwrap();
        let ranks: Vec<_> = records.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![9, 1, 5]);
    }

    #[test]
    fn test_missing_trailing_fields_default() {
        let csv = format!("{}4,Delta\n", HEADER);
        let records = parse_standings_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            records[0],
            TeamRecord {
                rank: 4,
                team_name: "Delta".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_empty_name_and_quoted_fields() {
        let csv = format!(
            "{}1,,5,5,0,0,1,0\n2,\"Team, With Comma\",3,3,0,0,1,0\n3,\"Multi\nLine\",1,1,0,0,1,0\n",
            HEADER
        );
        let records = parse_standings_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].team_name, "");
        assert_eq!(records[1].team_name, "Team, With Comma");
        assert_eq!(records[2].team_name, "Multi\nLine");
        assert_eq!(records[2].rank, 3);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        // Windows-1252 "Équipe" from a spreadsheet export
        let csv = b"Rank,Team\n1,\xC9quipe,50,20,30,15,5,2\n2,Beta,10,1,1,1,1,0\n";
        let records = parse_standings_csv(csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].team_name, "\u{FFFD}quipe");
        assert_eq!(records[0].total_points, 50);
        assert_eq!(records[0].first_place_wins, 2);
        assert_eq!(records[1].team_name, "Beta");
    }

    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device went away"))
        }
    }

    #[test]
    fn test_source_failure_fails_whole_parse() {
        let err = parse_standings_reader(BrokenSource).unwrap_err();
        assert!(matches!(err, StandingsError::Decode(_)));
    }

    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_file_load_is_quiet_at_info_level() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("standings.csv");
        tokio::fs::write(&path, format!("{}1,Alpha,x,20,30,15,5,2\n", HEADER))
            .await
            .unwrap();

        let output = CapturedOutput::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let records = parse_standings_file(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(output.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_file_and_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("standings.csv");
        tokio::fs::write(&path, format!("{}1,Alpha,50,20,30,15,5,2\n", HEADER))
            .await
            .unwrap();

        let records = parse_standings_file(&path).await.unwrap();
        assert_eq!(records.len(), 1);

        let missing = parse_standings_file(dir.path().join("nope.csv")).await;
        assert!(matches!(missing, Err(StandingsError::Read { .. })));
    }
}
