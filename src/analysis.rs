//! Single-document analysis orchestration.
//!
//! Every run follows the same path: load stored content, extract an
//! oracle payload, call the oracle with the task instruction, validate
//! the response envelope, persist the result. Results append to history;
//! re-running a type never overwrites earlier runs.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::extract::{self, DocumentPayload};
use crate::models::{AnalysisRecord, AnalysisType};
use crate::oracle::{validate_envelope, AnalysisOracle, ContentPart, OracleTask};
use crate::store;

/// Loads a document's stored bytes and turns them into an oracle content
/// part, keeping the filename for labeling in multi-document contexts.
pub(crate) async fn content_part(pool: &SqlitePool, id: &str) -> Result<(String, ContentPart)> {
    let stored = store::get_document_content(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("document not found: {}", id)))?;

    let part = match extract::payload_for(&stored.bytes, &stored.filename, stored.file_type)? {
        DocumentPayload::Text(text) => ContentPart::Text(text),
        DocumentPayload::Image { mime, base64 } => ContentPart::Image { mime, base64 },
    };

    Ok((stored.filename, part))
}

pub(crate) fn labeled_parts(filename: &str, part: ContentPart) -> Vec<ContentPart> {
    vec![
        ContentPart::Text(format!("Document: {}", filename)),
        part,
    ]
}

/// Runs one analysis type against one document and appends the result to
/// its history.
pub async fn analyze(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_id: &str,
    analysis_type: AnalysisType,
) -> Result<AnalysisRecord> {
    let (filename, part) = content_part(pool, document_id).await?;
    let parts = labeled_parts(&filename, part);

    let task = OracleTask::Analysis(analysis_type);
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    store::insert_analysis(pool, document_id, analysis_type, &result).await
}

/// Outcome of one analysis type within a comprehensive sweep. Exactly one
/// of `result` / `error` is set.
#[derive(Debug, serde::Serialize)]
pub struct ComprehensiveEntry {
    pub analysis_type: AnalysisType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs all six analysis types against one document. Content is extracted
/// once and reused. Failures are captured per type: a failed summarize
/// never blocks the slides run, and every success is persisted.
pub async fn run_comprehensive(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_id: &str,
) -> Result<Vec<ComprehensiveEntry>> {
    let (filename, part) = content_part(pool, document_id).await?;
    let parts = labeled_parts(&filename, part);

    let mut entries = Vec::with_capacity(AnalysisType::ALL.len());
    for analysis_type in AnalysisType::ALL {
        let task = OracleTask::Analysis(analysis_type);
        let outcome = match oracle.complete(&task, &parts).await {
            Ok(result) => match validate_envelope(&task, &result) {
                Ok(()) => {
                    store::insert_analysis(pool, document_id, analysis_type, &result).await?;
                    ComprehensiveEntry {
                        analysis_type,
                        result: Some(result),
                        error: None,
                    }
                }
                Err(e) => ComprehensiveEntry {
                    analysis_type,
                    result: None,
                    error: Some(e.to_string()),
                },
            },
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    analysis_type = %analysis_type.as_str(),
                    error = %e,
                    "analysis failed during comprehensive run"
                );
                ComprehensiveEntry {
                    analysis_type,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };
        entries.push(outcome);
    }

    Ok(entries)
}

/// All stored analysis runs for a document, newest first. Works for
/// deleted documents too, since history rows outlive their document.
pub async fn get_history(pool: &SqlitePool, document_id: &str) -> Result<Vec<AnalysisRecord>> {
    store::list_analyses(pool, document_id).await
}

/// Classifies a document and stores the resulting suggestions payload.
/// Called from the background pass after upload; also usable directly to
/// refresh suggestions on demand.
pub async fn generate_suggestions(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_id: &str,
) -> Result<Value> {
    let (filename, part) = content_part(pool, document_id).await?;
    let parts = labeled_parts(&filename, part);

    let task = OracleTask::Suggestions;
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    store::set_document_suggestions(pool, document_id, &result).await?;
    Ok(result)
}

/// Suggestions for a document: the cached payload when the upload-time
/// pass already ran, otherwise a fresh classification, persisted before
/// returning.
pub async fn suggestions_for(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_id: &str,
) -> Result<Value> {
    let document = store::get_document(pool, document_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("document not found: {}", document_id)))?;

    match document.suggestions {
        Some(cached) => Ok(cached),
        None => generate_suggestions(pool, oracle, document_id).await,
    }
}
