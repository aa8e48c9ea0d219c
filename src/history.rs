//! History listings for comparisons, decision matrices, Q&A, and charts.
//!
//! All listings return newest-first. Records referencing deleted
//! documents are included unchanged; history is append-only and outlives
//! the documents it mentions.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{ChartRecord, Comparison, DecisionMatrix, QaRecord};
use crate::store;

pub const DEFAULT_QA_LIMIT: i64 = 50;

pub async fn list_comparisons(pool: &SqlitePool) -> Result<Vec<Comparison>> {
    store::list_comparisons(pool).await
}

pub async fn list_decision_matrices(pool: &SqlitePool) -> Result<Vec<DecisionMatrix>> {
    store::list_matrices(pool).await
}

/// The most recent Q&A exchanges, capped at `limit` (50 when unset).
pub async fn list_qa_history(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<QaRecord>> {
    let limit = limit.unwrap_or(DEFAULT_QA_LIMIT).max(0);
    store::list_qa(pool, limit).await
}

pub async fn list_charts(pool: &SqlitePool, document_id: &str) -> Result<Vec<ChartRecord>> {
    store::list_charts(pool, document_id).await
}
