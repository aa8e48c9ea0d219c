//! Export of a document's analysis history as JSON or CSV.
//!
//! JSON exports carry the full result payloads. CSV flattens each record
//! into key/value rows: scalar result fields are written verbatim,
//! arrays and objects as JSON strings, with a blank line between
//! records.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<ExportFormat> {
        match s {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// A rendered export: body plus the metadata the HTTP layer needs to
/// serve it as a download.
#[derive(Debug)]
pub struct ExportPayload {
    pub content_type: &'static str,
    pub filename: String,
    pub body: String,
}

/// Renders every stored analysis for a document, newest first. A document
/// with no analysis history yields a not-found error rather than an empty
/// export.
pub async fn export_analyses(
    pool: &SqlitePool,
    document_id: &str,
    format: ExportFormat,
) -> Result<ExportPayload> {
    let records = store::list_analyses(pool, document_id).await?;
    if records.is_empty() {
        return Err(AppError::not_found(format!(
            "no analyses found for document: {}",
            document_id
        )));
    }

    match format {
        ExportFormat::Json => Ok(ExportPayload {
            content_type: "application/json",
            filename: format!("analyses_{}.json", document_id),
            body: serde_json::to_string_pretty(&records)?,
        }),
        ExportFormat::Csv => {
            let mut body = String::new();
            for record in &records {
                body.push_str(&format!(
                    "Analysis Type,{}\n",
                    csv_field(record.analysis_type.as_str())
                ));
                body.push_str(&format!("Created At,{}\n", record.created_at));
                body.push('\n');

                if let Some(obj) = record.result.as_object() {
                    for (key, value) in obj {
                        let rendered = match value {
                            Value::String(s) => s.clone(),
                            Value::Null => String::new(),
                            Value::Bool(_) | Value::Number(_) => value.to_string(),
                            Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
                        };
                        body.push_str(&format!(
                            "{},{}\n",
                            csv_field(key),
                            csv_field(&rendered)
                        ));
                    }
                }
                body.push('\n');
            }
            Ok(ExportPayload {
                content_type: "text/csv",
                filename: format!("analyses_{}.csv", document_id),
                body,
            })
        }
    }
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
/// Embedded quotes are doubled per RFC 4180.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
