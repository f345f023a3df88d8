// CSV/TSV decoding and dataset export

use std::io::Write;
use std::path::Path;

use econfab_core::{CanonicalDataset, Cell, ParseError, ParsedTable};

use crate::headers::normalize_headers;
use crate::ExportError;

/// Decode CSV bytes to text.
///
/// UTF-8 first (a leading BOM is dropped); on failure fall back to
/// Windows-1252, which is what Excel writes on most desktop installs.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Decode CSV text into a table: first record is the header row.
///
/// With `limit`, only the first `limit` data rows are kept, but every record
/// is still read so `total_rows` and malformed input are reported faithfully.
/// Records whose fields are all empty are skipped.
pub fn parse_table(
    source_name: &str,
    content: &str,
    delimiter: u8,
    limit: Option<usize>,
) -> Result<ParsedTable, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let malformed = |e: csv::Error| ParseError::Malformed {
        source_name: source_name.to_string(),
        message: e.to_string(),
    };

    let mut header_row: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut total = 0usize;

    for result in reader.records() {
        let record = result.map_err(malformed)?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if header_row.is_none() {
            header_row = Some(record.iter().map(str::to_string).collect());
            continue;
        }
        total += 1;
        if limit.map_or(true, |l| rows.len() < l) {
            rows.push(record.iter().map(Cell::from_text).collect());
        }
    }

    let header_row = header_row.ok_or_else(|| ParseError::Empty {
        source_name: source_name.to_string(),
    })?;

    tracing::debug!(source = source_name, rows = total, delimiter = %(delimiter as char), "decoded csv");

    let mut table = ParsedTable::new(source_name, econfab_core::input::CSV_SHEET_NAME, normalize_headers(header_row), rows);
    if limit.is_some() {
        table = table.with_total_rows(total);
    }
    Ok(table)
}

/// Write a dataset as comma-separated text: header row, then one record per row.
pub fn write_dataset<W: Write>(dataset: &CanonicalDataset, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    writer.write_record(dataset.headers())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(Cell::as_str))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export a dataset to a CSV file.
pub fn export(dataset: &CanonicalDataset, path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_dataset(dataset, std::io::BufWriter::new(file))
}
