//! Multi-document operations: comparisons, decision matrices, Q&A, and
//! chart generation.
//!
//! Inputs are validated before any oracle call, and document order is
//! preserved end to end: the order of ids in a compare request drives the
//! "Document 1"/"Document 2" labeling in both the prompt and the stored
//! record.

use sqlx::SqlitePool;

use crate::analysis::{self, content_part};
use crate::error::{AppError, Result};
use crate::models::{ChartRecord, ChartType, Comparison, Criterion, DecisionMatrix, QaRecord};
use crate::oracle::{validate_envelope, AnalysisOracle, ContentPart, OracleTask};
use crate::store;

/// Tolerance for the criteria weight sum check.
const WEIGHT_TOLERANCE: f64 = 0.01;

/// Loads every document and builds the labeled content part sequence:
/// `Document N: <filename>` followed by that document's content, in the
/// order given.
async fn gather_parts(pool: &SqlitePool, document_ids: &[String]) -> Result<Vec<ContentPart>> {
    let mut parts = Vec::with_capacity(document_ids.len() * 2);
    for (i, id) in document_ids.iter().enumerate() {
        let (filename, part) = content_part(pool, id).await?;
        parts.push(ContentPart::Text(format!(
            "Document {}: {}",
            i + 1,
            filename
        )));
        parts.push(part);
    }
    Ok(parts)
}

/// Compares two or more documents. Fewer than two ids, or any id that
/// does not resolve, is a validation error: a comparison request is
/// meaningless unless the full set exists.
pub async fn compare(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_ids: &[String],
) -> Result<Comparison> {
    if document_ids.len() < 2 {
        return Err(AppError::validation(
            "comparison requires at least two documents",
        ));
    }

    let parts = gather_parts(pool, document_ids).await.map_err(|e| match e {
        AppError::NotFound(msg) => AppError::Validation(msg),
        other => other,
    })?;

    let task = OracleTask::Compare {
        document_count: document_ids.len(),
    };
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    store::insert_comparison(pool, document_ids, &result).await
}

/// Builds a weighted decision matrix over two or more documents.
/// Criteria weights must sum to 1.0 within a 0.01 tolerance.
pub async fn build_decision_matrix(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    name: &str,
    document_ids: &[String],
    criteria: &[Criterion],
) -> Result<DecisionMatrix> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("matrix name must not be empty"));
    }
    if document_ids.len() < 2 {
        return Err(AppError::validation(
            "decision matrix requires at least two documents",
        ));
    }
    if criteria.is_empty() {
        return Err(AppError::validation(
            "decision matrix requires at least one criterion",
        ));
    }

    let weight_sum: f64 = criteria.iter().map(|c| c.weight).sum();
    if (weight_sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(AppError::validation(format!(
            "criteria weights must sum to 1.0 (got {:.3})",
            weight_sum
        )));
    }

    let parts = gather_parts(pool, document_ids).await?;

    let task = OracleTask::DecisionMatrix {
        criteria: criteria.to_vec(),
    };
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    store::insert_matrix(pool, name, document_ids, criteria, &result).await
}

/// Answers a question against the combined content of every listed
/// document, then appends the exchange to Q&A history.
pub async fn ask(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_ids: &[String],
    question: &str,
) -> Result<QaRecord> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::validation("question must not be empty"));
    }
    if document_ids.is_empty() {
        return Err(AppError::validation(
            "question requires at least one document",
        ));
    }

    let mut parts = gather_parts(pool, document_ids).await?;
    parts.push(ContentPart::Text(format!("Question: {}", question)));

    let task = OracleTask::Question;
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    store::insert_qa(pool, document_ids, question, &result).await
}

/// Extracts numeric data from one document and stores a chart record.
/// The stored title falls back to a generic one when the oracle omits it,
/// and the stored chart type follows the oracle's choice when it returns
/// a recognizable one.
pub async fn generate_chart(
    pool: &SqlitePool,
    oracle: &dyn AnalysisOracle,
    document_id: &str,
    chart_type: ChartType,
) -> Result<ChartRecord> {
    let (filename, part) = content_part(pool, document_id).await?;
    let parts = analysis::labeled_parts(&filename, part);

    let task = OracleTask::Chart(chart_type);
    let result = oracle.complete(&task, &parts).await?;
    validate_envelope(&task, &result)?;

    let title = result
        .get("title")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .unwrap_or_else(|| format!("{} chart", chart_type.as_str()));

    let stored_type = result
        .get("chart_type")
        .and_then(|t| t.as_str())
        .and_then(ChartType::parse)
        .unwrap_or(chart_type);

    // The record keeps only the data series; title and type live in their
    // own columns.
    let chart_data = result
        .get("data")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    store::insert_chart(pool, document_id, stored_type, &title, &chart_data).await
}
