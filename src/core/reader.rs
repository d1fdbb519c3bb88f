use crate::core::RawRow;
use crate::utils::error::Result;

/// A parsed export: trimmed header names plus the non-blank data rows.
#[derive(Debug, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Parses a CSV export with a header row into ordered rows.
///
/// Blank lines and rows whose cells are all empty are skipped; short rows
/// simply miss their trailing columns.
pub fn parse_csv(bytes: &[u8]) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Excel 輸出的 CSV 可能帶 BOM
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = RawRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.push(header.as_str(), value);
        }
        rows.push(row);
    }

    tracing::debug!("Parsed {} rows with {} columns", rows.len(), headers.len());
    Ok(CsvTable { headers, rows })
}
