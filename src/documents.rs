//! Workspace and document lifecycle operations.
//!
//! Uploads are validated (extension, size) before anything is stored.
//! Multi-file uploads isolate failures per file. After a successful store,
//! an auto-analysis pass runs in the background to attach classification
//! suggestions; its failure never affects the upload result.

use std::sync::Arc;

use serde_json::Value;
use sqlx::SqlitePool;

use crate::analysis;
use crate::error::{AppError, Result};
use crate::extract;
use crate::models::{Document, FileType, Workspace, WorkspaceSummary};
use crate::oracle::AnalysisOracle;
use crate::store;

// ============ Workspaces ============

pub async fn create_workspace(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Workspace> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("workspace name must not be empty"));
    }
    store::insert_workspace(pool, name, description).await
}

pub async fn list_workspaces(pool: &SqlitePool) -> Result<Vec<WorkspaceSummary>> {
    store::list_workspaces(pool).await
}

/// A workspace plus its documents, newest first.
#[derive(Debug, serde::Serialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub documents: Vec<Document>,
}

pub async fn get_workspace(pool: &SqlitePool, id: &str) -> Result<WorkspaceDetail> {
    let workspace = store::get_workspace(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("workspace not found: {}", id)))?;
    let documents = store::list_documents(pool, Some(id)).await?;
    Ok(WorkspaceDetail {
        workspace,
        documents,
    })
}

pub async fn update_workspace(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Workspace> {
    let name = name.map(str::trim);
    if name == Some("") {
        return Err(AppError::validation("workspace name must not be empty"));
    }

    let affected = store::update_workspace(pool, id, name, description).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("workspace not found: {}", id)));
    }

    store::get_workspace(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("workspace not found: {}", id)))
}

pub async fn delete_workspace(pool: &SqlitePool, id: &str) -> Result<()> {
    let affected = store::delete_workspace(pool, id).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("workspace not found: {}", id)));
    }
    Ok(())
}

// ============ Documents ============

/// Per-file result of a multi-file upload. Exactly one of `document` /
/// `error` is set.
#[derive(Debug, serde::Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn validate_upload(filename: &str, size: usize, max_bytes: usize) -> Result<FileType> {
    let ext = extract::extension_of(filename)
        .ok_or_else(|| AppError::UnsupportedType(filename.to_string()))?;
    let file_type =
        FileType::from_extension(&ext).ok_or_else(|| AppError::UnsupportedType(ext.clone()))?;

    if size > max_bytes {
        return Err(AppError::SizeLimit {
            size,
            limit: max_bytes,
        });
    }

    Ok(file_type)
}

/// Validates and stores one uploaded file. With `auto_analyze` set, the
/// background suggestions pass is kicked off after the store; the
/// returned document always has `suggestions: None` either way, and
/// clients re-fetch to observe the filled-in value.
pub async fn upload_document(
    pool: &SqlitePool,
    oracle: Arc<dyn AnalysisOracle>,
    max_bytes: usize,
    filename: &str,
    bytes: &[u8],
    workspace_id: Option<&str>,
    auto_analyze: bool,
) -> Result<Document> {
    let file_type = validate_upload(filename, bytes.len(), max_bytes)?;

    if let Some(ws) = workspace_id {
        if store::get_workspace(pool, ws).await?.is_none() {
            return Err(AppError::not_found(format!("workspace not found: {}", ws)));
        }
    }

    let document = store::insert_document(pool, filename, file_type, bytes, workspace_id).await?;

    if auto_analyze {
        spawn_suggestions(pool.clone(), oracle, document.id.clone());
    }

    Ok(document)
}

/// Uploads a batch of files. Each file is validated and stored
/// independently; one bad file never blocks the others.
pub async fn upload_many(
    pool: &SqlitePool,
    oracle: Arc<dyn AnalysisOracle>,
    max_bytes: usize,
    files: Vec<(String, Vec<u8>)>,
    workspace_id: Option<&str>,
    auto_analyze: bool,
) -> Result<Vec<UploadOutcome>> {
    let mut outcomes = Vec::with_capacity(files.len());
    for (filename, bytes) in files {
        let result = upload_document(
            pool,
            oracle.clone(),
            max_bytes,
            &filename,
            &bytes,
            workspace_id,
            auto_analyze,
        )
        .await;
        outcomes.push(match result {
            Ok(document) => UploadOutcome {
                filename,
                document: Some(document),
                error: None,
            },
            Err(e) => UploadOutcome {
                filename,
                document: None,
                error: Some(e.to_string()),
            },
        });
    }
    Ok(outcomes)
}

/// Best-effort auto-analysis: classify the new document and store the
/// suggestions payload. Failures are logged and dropped.
fn spawn_suggestions(pool: SqlitePool, oracle: Arc<dyn AnalysisOracle>, document_id: String) {
    tokio::spawn(async move {
        match analysis::generate_suggestions(&pool, oracle.as_ref(), &document_id).await {
            Ok(_) => {
                tracing::debug!(document_id = %document_id, "auto-analysis suggestions stored");
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, error = %e, "auto-analysis failed");
            }
        }
    });
}

pub async fn list_documents(
    pool: &SqlitePool,
    workspace_id: Option<&str>,
) -> Result<Vec<Document>> {
    store::list_documents(pool, workspace_id).await
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Document> {
    store::get_document(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("document not found: {}", id)))
}

/// Deletes the document row. Analysis, comparison, Q&A and chart history
/// referencing it stays behind.
pub async fn delete_document(pool: &SqlitePool, id: &str) -> Result<()> {
    let affected = store::delete_document(pool, id).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("document not found: {}", id)));
    }
    Ok(())
}

/// Moves a document into a workspace, or out of any workspace when
/// `workspace_id` is `None`.
pub async fn assign_document(
    pool: &SqlitePool,
    document_id: &str,
    workspace_id: Option<&str>,
) -> Result<Document> {
    if let Some(ws) = workspace_id {
        if store::get_workspace(pool, ws).await?.is_none() {
            return Err(AppError::not_found(format!("workspace not found: {}", ws)));
        }
    }

    let affected = store::set_document_workspace(pool, document_id, workspace_id).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!(
            "document not found: {}",
            document_id
        )));
    }

    get_document(pool, document_id).await
}

/// Returns the stored suggestions for a document, if the auto-analysis
/// pass has completed.
pub async fn get_suggestions(pool: &SqlitePool, id: &str) -> Result<Option<Value>> {
    Ok(get_document(pool, id).await?.suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_validation_checks_extension_first() {
        let err = validate_upload("malware.exe", 10, 100).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedType(_)));

        let err = validate_upload("no_extension", 10, 100).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedType(_)));
    }

    #[test]
    fn upload_validation_enforces_size_limit() {
        let err = validate_upload("big.pdf", 101, 100).unwrap_err();
        assert!(matches!(
            err,
            AppError::SizeLimit {
                size: 101,
                limit: 100
            }
        ));

        // Exactly at the limit is accepted.
        assert_eq!(validate_upload("ok.pdf", 100, 100).unwrap(), FileType::Pdf);
    }
}
