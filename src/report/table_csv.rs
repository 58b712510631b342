//! Plain CSV export of the results table.

use crate::models::ResultRow;

use super::ExportError;

pub const CSV_FILE_NAME: &str = "rag_evaluation_results.csv";
pub const CSV_HEADERS: [&str; 3] = ["Query", "Response", "Reference"];

/// One record per row under a fixed header; fields are quoted only when they
/// contain a delimiter, quote or line break.
pub fn results_csv(rows: &[ResultRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS).map_err(|e| ExportError::Csv(e.to_string()))?;
    for row in rows {
        writer
            .write_record([&row.query, &row.response, &row.reference])
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| ExportError::Csv(e.to_string()))
}
