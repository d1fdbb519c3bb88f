use crate::core::{ExportFormat, MembershipRecord, ProcessedData, RenderedExport};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const DEFAULT_FILE_STEM: &str = "membership-expiry-data";
pub const PROCESSED_FILE_NAME: &str = "processed.json";

pub const EXPORT_HEADERS: [&str; 13] = [
    "Customer Name",
    "Customer Email",
    "Membership Name",
    "Source Membership Name",
    "Home Location",
    "Expires At",
    "Frozen At",
    "Unfrozen At",
    "Bought At",
    "Days Lapsed",
    "Tags",
    "Assigned To",
    "Follow-ups",
];

fn export_row(record: &MembershipRecord) -> [String; 13] {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    let follow_ups = record
        .follow_ups
        .iter()
        .map(|f| format!("{}: {}", f.date, f.comment))
        .collect::<Vec<_>>()
        .join(" | ");

    [
        record.customer_name.clone(),
        record.customer_email.clone(),
        record.membership_name.clone(),
        record.raw_membership_name.clone(),
        record.home_location.clone(),
        optional(&record.expires_at),
        optional(&record.frozen_at),
        optional(&record.unfrozen_at),
        optional(&record.bought_at),
        record
            .days_lapsed
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record.tags.join(", "),
        optional(&record.assigned_to),
        follow_ups,
    ]
}

fn render_delimited(records: &[MembershipRecord], delimiter: u8, quote: csv::QuoteStyle) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        writer.write_record(export_row(record))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Serializes records in one export format.
pub fn render(records: &[MembershipRecord], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_delimited(records, b',', csv::QuoteStyle::Always),
        // 試算表軟體可直接開啟 TSV
        ExportFormat::Excel => render_delimited(records, b'\t', csv::QuoteStyle::Necessary),
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
        ExportFormat::Pdf => Err(EtlError::UnsupportedExport {
            format: format.to_string(),
        }),
    }
}

pub fn render_exports(
    records: &[MembershipRecord],
    formats: &[ExportFormat],
    file_stem: &str,
) -> Result<Vec<RenderedExport>> {
    formats
        .iter()
        .map(|format| {
            Ok(RenderedExport {
                file_name: format!("{}.{}", file_stem, format.extension()),
                bytes: render(records, *format)?,
            })
        })
        .collect()
}

/// Packs the rendered exports plus the full processed data into one ZIP.
pub fn bundle(exports: &[RenderedExport], processed: &ProcessedData) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for export in exports {
        zip.start_file::<_, ()>(export.file_name.as_str(), FileOptions::default())?;
        zip.write_all(&export.bytes)?;
    }

    zip.start_file::<_, ()>(PROCESSED_FILE_NAME, FileOptions::default())?;
    zip.write_all(&serde_json::to_vec_pretty(processed)?)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
