//! Storage layer: entity CRUD over SQLite.
//!
//! Every entity row is written exactly once by the operation that creates
//! it; the only post-creation mutations are `Document.suggestions` (set
//! once by the auto-analysis pass) and `Document.workspace_id`
//! (reassignable). Raw document content lives only in the `documents`
//! table and is never copied into analysis records.
//!
//! Listing queries order by `created_at DESC, rowid DESC` so that rows
//! created within the same millisecond still come back newest-first.

use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    AnalysisRecord, AnalysisType, ChartRecord, ChartType, Comparison, Criterion, DecisionMatrix,
    Document, FileType, QaRecord, Workspace, WorkspaceSummary,
};

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn decode_err(msg: String) -> AppError {
    AppError::Db(sqlx::Error::Decode(msg.into()))
}

fn parse_id_list(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

// ============ Workspaces ============

pub async fn insert_workspace(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Workspace> {
    let workspace = Workspace {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.map(|s| s.to_string()),
        created_at: now_millis(),
    };

    sqlx::query("INSERT INTO workspaces (id, name, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(&workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.created_at)
        .execute(pool)
        .await?;

    Ok(workspace)
}

pub async fn list_workspaces(pool: &SqlitePool) -> Result<Vec<WorkspaceSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT w.id, w.name, w.description, w.created_at, COUNT(d.id) AS document_count
        FROM workspaces w LEFT JOIN documents d ON w.id = d.workspace_id
        GROUP BY w.id ORDER BY w.created_at DESC, w.rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| WorkspaceSummary {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            document_count: row.get("document_count"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn get_workspace(pool: &SqlitePool, id: &str) -> Result<Option<Workspace>> {
    let row = sqlx::query("SELECT id, name, description, created_at FROM workspaces WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Workspace {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }))
}

/// Merge-style update: `None` leaves a column unchanged. A description
/// can be replaced but not cleared back to NULL; omitted request fields
/// and absent values are indistinguishable at this layer.
pub async fn update_workspace(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE workspaces SET
            name = COALESCE(?, name),
            description = COALESCE(?, description)
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes a workspace and un-assigns its documents. Documents are never
/// cascade-deleted.
pub async fn delete_workspace(pool: &SqlitePool, id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE documents SET workspace_id = NULL WHERE workspace_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}

// ============ Documents ============

/// Raw stored content plus the metadata the extractor and oracle need.
#[derive(Debug, Clone)]
pub struct StoredContent {
    pub filename: String,
    pub file_type: FileType,
    pub bytes: Vec<u8>,
}

pub async fn insert_document(
    pool: &SqlitePool,
    filename: &str,
    file_type: FileType,
    content: &[u8],
    workspace_id: Option<&str>,
) -> Result<Document> {
    let document = Document {
        id: Uuid::new_v4().to_string(),
        filename: filename.to_string(),
        file_type,
        file_size: content.len() as i64,
        workspace_id: workspace_id.map(|s| s.to_string()),
        suggestions: None,
        created_at: now_millis(),
    };

    sqlx::query(
        r#"
        INSERT INTO documents (id, workspace_id, filename, file_type, file_size, content, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document.id)
    .bind(&document.workspace_id)
    .bind(&document.filename)
    .bind(document.file_type.as_str())
    .bind(document.file_size)
    .bind(content)
    .bind(document.created_at)
    .execute(pool)
    .await?;

    Ok(document)
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let file_type_raw: String = row.get("file_type");
    let file_type = FileType::parse(&file_type_raw)
        .ok_or_else(|| decode_err(format!("unknown file type: {}", file_type_raw)))?;

    // Suggestions are best-effort: an unparseable blob reads back as None.
    let suggestions: Option<Value> = row
        .get::<Option<String>, _>("suggestions")
        .and_then(|s| serde_json::from_str(&s).ok());

    Ok(Document {
        id: row.get("id"),
        filename: row.get("filename"),
        file_type,
        file_size: row.get("file_size"),
        workspace_id: row.get("workspace_id"),
        suggestions,
        created_at: row.get("created_at"),
    })
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
    let row = sqlx::query(
        "SELECT id, workspace_id, filename, file_type, file_size, suggestions, created_at \
         FROM documents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| document_from_row(&r)).transpose()
}

pub async fn get_document_content(pool: &SqlitePool, id: &str) -> Result<Option<StoredContent>> {
    let row = sqlx::query("SELECT filename, file_type, content FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let file_type_raw: String = row.get("file_type");
        let file_type = FileType::parse(&file_type_raw)
            .ok_or_else(|| decode_err(format!("unknown file type: {}", file_type_raw)))?;
        Ok(StoredContent {
            filename: row.get("filename"),
            file_type,
            bytes: row.get("content"),
        })
    })
    .transpose()
}

pub async fn list_documents(
    pool: &SqlitePool,
    workspace_id: Option<&str>,
) -> Result<Vec<Document>> {
    let rows = match workspace_id {
        Some(ws) => {
            sqlx::query(
                "SELECT id, workspace_id, filename, file_type, file_size, suggestions, created_at \
                 FROM documents WHERE workspace_id = ? ORDER BY created_at DESC, rowid DESC",
            )
            .bind(ws)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT id, workspace_id, filename, file_type, file_size, suggestions, created_at \
                 FROM documents ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(document_from_row).collect()
}

/// Deletes only the document row. Historical analysis, comparison, Q&A and
/// chart rows that reference it are soft-orphaned, not removed.
pub async fn delete_document(pool: &SqlitePool, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn set_document_suggestions(
    pool: &SqlitePool,
    id: &str,
    suggestions: &Value,
) -> Result<u64> {
    let result = sqlx::query("UPDATE documents SET suggestions = ? WHERE id = ?")
        .bind(serde_json::to_string(suggestions)?)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn set_document_workspace(
    pool: &SqlitePool,
    id: &str,
    workspace_id: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query("UPDATE documents SET workspace_id = ? WHERE id = ?")
        .bind(workspace_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// ============ Analysis results ============

pub async fn insert_analysis(
    pool: &SqlitePool,
    document_id: &str,
    analysis_type: AnalysisType,
    result: &Value,
) -> Result<AnalysisRecord> {
    let record = AnalysisRecord {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        analysis_type,
        result: result.clone(),
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO analysis_results (id, document_id, analysis_type, result_json, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.document_id)
    .bind(record.analysis_type.as_str())
    .bind(serde_json::to_string(&record.result)?)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(record)
}

pub async fn list_analyses(pool: &SqlitePool, document_id: &str) -> Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(
        "SELECT id, document_id, analysis_type, result_json, created_at \
         FROM analysis_results WHERE document_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let type_raw: String = row.get("analysis_type");
            let analysis_type = AnalysisType::parse(&type_raw)
                .ok_or_else(|| decode_err(format!("unknown analysis type: {}", type_raw)))?;
            let result: Value = serde_json::from_str(row.get::<String, _>("result_json").as_str())?;
            Ok(AnalysisRecord {
                id: row.get("id"),
                document_id: row.get("document_id"),
                analysis_type,
                result,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

// ============ Comparisons ============

pub async fn insert_comparison(
    pool: &SqlitePool,
    document_ids: &[String],
    result: &Value,
) -> Result<Comparison> {
    let comparison = Comparison {
        id: Uuid::new_v4().to_string(),
        document_ids: document_ids.to_vec(),
        result: result.clone(),
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO comparisons (id, document_ids, result_json, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&comparison.id)
    .bind(serde_json::to_string(&comparison.document_ids)?)
    .bind(serde_json::to_string(&comparison.result)?)
    .bind(comparison.created_at)
    .execute(pool)
    .await?;

    Ok(comparison)
}

pub async fn list_comparisons(pool: &SqlitePool) -> Result<Vec<Comparison>> {
    let rows = sqlx::query(
        "SELECT id, document_ids, result_json, created_at \
         FROM comparisons ORDER BY created_at DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Comparison {
                id: row.get("id"),
                document_ids: parse_id_list(row.get::<String, _>("document_ids").as_str())?,
                result: serde_json::from_str(row.get::<String, _>("result_json").as_str())?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

// ============ Decision matrices ============

pub async fn insert_matrix(
    pool: &SqlitePool,
    name: &str,
    document_ids: &[String],
    criteria: &[Criterion],
    result: &Value,
) -> Result<DecisionMatrix> {
    let matrix = DecisionMatrix {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        document_ids: document_ids.to_vec(),
        criteria: criteria.to_vec(),
        result: result.clone(),
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO decision_matrices (id, name, document_ids, criteria, result_json, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&matrix.id)
    .bind(&matrix.name)
    .bind(serde_json::to_string(&matrix.document_ids)?)
    .bind(serde_json::to_string(&matrix.criteria)?)
    .bind(serde_json::to_string(&matrix.result)?)
    .bind(matrix.created_at)
    .execute(pool)
    .await?;

    Ok(matrix)
}

pub async fn list_matrices(pool: &SqlitePool) -> Result<Vec<DecisionMatrix>> {
    let rows = sqlx::query(
        "SELECT id, name, document_ids, criteria, result_json, created_at \
         FROM decision_matrices ORDER BY created_at DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DecisionMatrix {
                id: row.get("id"),
                name: row.get("name"),
                document_ids: parse_id_list(row.get::<String, _>("document_ids").as_str())?,
                criteria: serde_json::from_str(row.get::<String, _>("criteria").as_str())?,
                result: serde_json::from_str(row.get::<String, _>("result_json").as_str())?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

// ============ Q&A history ============

pub async fn insert_qa(
    pool: &SqlitePool,
    document_ids: &[String],
    question: &str,
    answer: &Value,
) -> Result<QaRecord> {
    let record = QaRecord {
        id: Uuid::new_v4().to_string(),
        document_ids: document_ids.to_vec(),
        question: question.to_string(),
        answer: answer.clone(),
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO qa_history (id, document_ids, question, answer_json, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(serde_json::to_string(&record.document_ids)?)
    .bind(&record.question)
    .bind(serde_json::to_string(&record.answer)?)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(record)
}

pub async fn list_qa(pool: &SqlitePool, limit: i64) -> Result<Vec<QaRecord>> {
    let rows = sqlx::query(
        "SELECT id, document_ids, question, answer_json, created_at \
         FROM qa_history ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(QaRecord {
                id: row.get("id"),
                document_ids: parse_id_list(row.get::<String, _>("document_ids").as_str())?,
                question: row.get("question"),
                answer: serde_json::from_str(row.get::<String, _>("answer_json").as_str())?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

// ============ Charts ============

pub async fn insert_chart(
    pool: &SqlitePool,
    document_id: &str,
    chart_type: ChartType,
    title: &str,
    chart_data: &Value,
) -> Result<ChartRecord> {
    let record = ChartRecord {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chart_type,
        title: title.to_string(),
        chart_data: chart_data.clone(),
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO charts (id, document_id, chart_type, title, chart_data, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.document_id)
    .bind(record.chart_type.as_str())
    .bind(&record.title)
    .bind(serde_json::to_string(&record.chart_data)?)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(record)
}

pub async fn list_charts(pool: &SqlitePool, document_id: &str) -> Result<Vec<ChartRecord>> {
    let rows = sqlx::query(
        "SELECT id, document_id, chart_type, title, chart_data, created_at \
         FROM charts WHERE document_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let type_raw: String = row.get("chart_type");
            let chart_type = ChartType::parse(&type_raw)
                .ok_or_else(|| decode_err(format!("unknown chart type: {}", type_raw)))?;
            Ok(ChartRecord {
                id: row.get("id"),
                document_id: row.get("document_id"),
                chart_type,
                title: row.get("title"),
                chart_data: serde_json::from_str(row.get::<String, _>("chart_data").as_str())?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}
