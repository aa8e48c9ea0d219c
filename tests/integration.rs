//! End-to-end tests over the service layer with a temp SQLite database
//! and a mock oracle.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use analysisdoc::config::{Config, DbConfig, OracleConfig, ServerConfig, UploadConfig};
use analysisdoc::error::{AppError, Result};
use analysisdoc::models::{AnalysisType, ChartType, Criterion};
use analysisdoc::oracle::{AnalysisOracle, ContentPart, OracleTask};
use analysisdoc::{aggregate, analysis, db, documents, export, history, migrate, server};

async fn setup() -> (sqlx::SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = db::connect(&dir.path().join("test.db")).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (pool, dir)
}

/// Oracle returning minimal well-formed envelopes for every task.
/// Analysis types listed in `fail_types` return an oracle error instead.
struct MockOracle {
    fail_types: Vec<AnalysisType>,
}

impl MockOracle {
    fn new() -> Arc<Self> {
        Arc::new(Self { fail_types: vec![] })
    }

    fn failing(fail_types: Vec<AnalysisType>) -> Arc<Self> {
        Arc::new(Self { fail_types })
    }
}

#[async_trait]
impl AnalysisOracle for MockOracle {
    async fn complete(&self, task: &OracleTask, _parts: &[ContentPart]) -> Result<Value> {
        let value = match task {
            OracleTask::Analysis(t) => {
                if self.fail_types.contains(t) {
                    return Err(AppError::oracle("mock failure"));
                }
                match t {
                    AnalysisType::Summarize => json!({ "summary": "a fine document" }),
                    AnalysisType::ProsCons => json!({ "pros": [], "cons": [] }),
                    AnalysisType::GapsRisks => json!({ "gaps": [], "risks": [] }),
                    AnalysisType::Upgrade => json!({ "suggestions": [] }),
                    AnalysisType::Report => {
                        json!({ "executive_summary": "fine", "key_findings": [] })
                    }
                    AnalysisType::Slides => json!({ "slides": [] }),
                }
            }
            OracleTask::Question => json!({ "answer": "forty-two", "confidence": 0.9 }),
            OracleTask::Chart(ct) => json!({
                "title": "Mock Chart",
                "chart_type": ct.as_str(),
                "data": [ { "label": "a", "value": 1 } ],
            }),
            OracleTask::Suggestions => json!({
                "analysis_suggestions": [ { "type": "summarize", "relevance": 0.9 } ],
            }),
            OracleTask::Compare { document_count: 2 } => json!({
                "document1": { "name": "d1" },
                "document2": { "name": "d2" },
                "comparison_table": [],
            }),
            OracleTask::Compare { document_count } => json!({
                "documents": (0..*document_count).map(|i| json!({ "id": i })).collect::<Vec<_>>(),
                "ranking": (0..*document_count).map(|i| json!({ "rank": i + 1 })).collect::<Vec<_>>(),
            }),
            OracleTask::DecisionMatrix { .. } => json!({
                "options": [],
                "ranking": [],
                "winner": { "name": "first" },
            }),
        };
        Ok(value)
    }
}

async fn upload_txt(
    pool: &sqlx::SqlitePool,
    name: &str,
    body: &str,
    workspace: Option<&str>,
) -> analysisdoc::models::Document {
    documents::upload_document(
        pool,
        MockOracle::new(),
        15 * 1024 * 1024,
        name,
        body.as_bytes(),
        workspace,
        false,
    )
    .await
    .unwrap()
}

// ============ Workspaces ============

#[tokio::test]
async fn workspace_lifecycle() {
    let (pool, _dir) = setup().await;

    let ws = documents::create_workspace(&pool, "Vendors", Some("RFP season"))
        .await
        .unwrap();

    let listed = documents::list_workspaces(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Vendors");
    assert_eq!(listed[0].document_count, 0);

    let updated = documents::update_workspace(&pool, &ws.id, Some("Vendors 2025"), None)
        .await
        .unwrap();
    assert_eq!(updated.name, "Vendors 2025");
    assert_eq!(updated.description.as_deref(), Some("RFP season"));

    documents::delete_workspace(&pool, &ws.id).await.unwrap();
    let err = documents::get_workspace(&pool, &ws.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn workspace_name_must_not_be_blank() {
    let (pool, _dir) = setup().await;

    let err = documents::create_workspace(&pool, "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn deleting_workspace_keeps_documents() {
    let (pool, _dir) = setup().await;

    let ws = documents::create_workspace(&pool, "Temp", None)
        .await
        .unwrap();
    let doc = upload_txt(&pool, "keep.txt", "content", Some(&ws.id)).await;
    assert_eq!(doc.workspace_id.as_deref(), Some(ws.id.as_str()));

    documents::delete_workspace(&pool, &ws.id).await.unwrap();

    let survivor = documents::get_document(&pool, &doc.id).await.unwrap();
    assert_eq!(survivor.workspace_id, None);
}

// ============ Uploads ============

#[tokio::test]
async fn upload_records_exact_size_and_type() {
    let (pool, _dir) = setup().await;

    let body = "hello analysis";
    let doc = upload_txt(&pool, "notes.txt", body, None).await;
    assert_eq!(doc.file_size, body.len() as i64);
    assert_eq!(doc.file_type.as_str(), "txt");
    assert!(doc.suggestions.is_none());
}

#[tokio::test]
async fn upload_rejects_oversized_and_accepts_at_limit() {
    let (pool, _dir) = setup().await;

    let at_limit = vec![b'x'; 100];
    let doc = documents::upload_document(
        &pool,
        MockOracle::new(),
        100,
        "ok.txt",
        &at_limit,
        None,
        false,
    )
    .await
    .unwrap();
    assert_eq!(doc.file_size, 100);

    let over = vec![b'x'; 101];
    let err = documents::upload_document(
        &pool,
        MockOracle::new(),
        100,
        "big.txt",
        &over,
        None,
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::SizeLimit {
            size: 101,
            limit: 100
        }
    ));
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let (pool, _dir) = setup().await;

    let err = documents::upload_document(
        &pool,
        MockOracle::new(),
        1024,
        "binary.exe",
        b"MZ",
        None,
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedType(_)));
}

#[tokio::test]
async fn upload_to_missing_workspace_fails() {
    let (pool, _dir) = setup().await;

    let err = documents::upload_document(
        &pool,
        MockOracle::new(),
        1024,
        "a.txt",
        b"x",
        Some("no-such-workspace"),
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn batch_upload_isolates_failures() {
    let (pool, _dir) = setup().await;

    let outcomes = documents::upload_many(
        &pool,
        MockOracle::new(),
        1024,
        vec![
            ("good.txt".to_string(), b"fine".to_vec()),
            ("bad.exe".to_string(), b"nope".to_vec()),
        ],
        None,
        false,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].document.is_some());
    assert!(outcomes[0].error.is_none());
    assert!(outcomes[1].document.is_none());
    assert!(outcomes[1].error.is_some());

    let docs = documents::list_documents(&pool, None).await.unwrap();
    assert_eq!(docs.len(), 1);
}

// ============ Analysis ============

#[tokio::test]
async fn analyze_appends_to_history() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    analysis::analyze(&pool, oracle.as_ref(), &doc.id, AnalysisType::Summarize)
        .await
        .unwrap();
    analysis::analyze(&pool, oracle.as_ref(), &doc.id, AnalysisType::Summarize)
        .await
        .unwrap();

    let records = analysis::get_history(&pool, &doc.id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.analysis_type == AnalysisType::Summarize));
    assert!(records[0].created_at >= records[1].created_at);
}

#[tokio::test]
async fn analyze_unknown_document_is_not_found() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();

    let err = analysis::analyze(&pool, oracle.as_ref(), "missing", AnalysisType::Report)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn comprehensive_run_isolates_failures() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::failing(vec![AnalysisType::ProsCons]);
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    let entries = analysis::run_comprehensive(&pool, oracle.as_ref(), &doc.id)
        .await
        .unwrap();

    assert_eq!(entries.len(), 6);
    let failed: Vec<_> = entries.iter().filter(|e| e.error.is_some()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].analysis_type, AnalysisType::ProsCons);
    assert!(entries
        .iter()
        .filter(|e| e.analysis_type != AnalysisType::ProsCons)
        .all(|e| e.result.is_some()));

    // Only the five successes are persisted.
    let records = analysis::get_history(&pool, &doc.id).await.unwrap();
    assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn auto_analyze_flag_controls_suggestions_pass() {
    let (pool, _dir) = setup().await;

    let off = documents::upload_document(
        &pool,
        MockOracle::new(),
        1024,
        "quiet.txt",
        b"content",
        None,
        false,
    )
    .await
    .unwrap();

    // With the pass disabled, nothing runs in the background and the
    // stored document stays without suggestions.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let fetched = documents::get_document(&pool, &off.id).await.unwrap();
    assert!(fetched.suggestions.is_none());

    let on = documents::upload_document(
        &pool,
        MockOracle::new(),
        1024,
        "eager.txt",
        b"content",
        None,
        true,
    )
    .await
    .unwrap();

    // The background pass fills suggestions in shortly after upload.
    let mut stored = None;
    for _ in 0..100 {
        stored = documents::get_document(&pool, &on.id).await.unwrap().suggestions;
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let stored = stored.expect("suggestions stored by background pass");
    assert!(stored.get("analysis_suggestions").is_some());
}

#[tokio::test]
async fn suggestions_are_generated_on_demand_and_cached() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    // No upload-time pass ran, so the first request generates and
    // persists the payload.
    let first = analysis::suggestions_for(&pool, oracle.as_ref(), &doc.id)
        .await
        .unwrap();
    assert!(first.get("analysis_suggestions").is_some());

    let stored = documents::get_suggestions(&pool, &doc.id).await.unwrap();
    assert_eq!(stored, Some(first.clone()));

    // The cached payload is served without another oracle call.
    let second = analysis::suggestions_for(&pool, &RefusingOracle, &doc.id)
        .await
        .unwrap();
    assert_eq!(second, first);
}

/// Oracle that errors on every call; reaching it at all fails the test
/// that uses it.
struct RefusingOracle;

#[async_trait]
impl AnalysisOracle for RefusingOracle {
    async fn complete(&self, _task: &OracleTask, _parts: &[ContentPart]) -> Result<Value> {
        Err(AppError::oracle("unexpected oracle call"))
    }
}

#[tokio::test]
async fn suggestions_are_stored_and_readable() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    analysis::generate_suggestions(&pool, oracle.as_ref(), &doc.id)
        .await
        .unwrap();

    let stored = documents::get_suggestions(&pool, &doc.id).await.unwrap();
    let stored = stored.expect("suggestions stored");
    assert!(stored.get("analysis_suggestions").is_some());
}

// ============ History survives deletion ============

#[tokio::test]
async fn deleting_document_keeps_analysis_history() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    analysis::analyze(&pool, oracle.as_ref(), &doc.id, AnalysisType::Summarize)
        .await
        .unwrap();

    documents::delete_document(&pool, &doc.id).await.unwrap();

    let err = documents::get_document(&pool, &doc.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let records = analysis::get_history(&pool, &doc.id).await.unwrap();
    assert_eq!(records.len(), 1);
}

// ============ Compare ============

#[tokio::test]
async fn compare_requires_two_resolvable_documents() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "only.txt", "content", None).await;

    let err = aggregate::compare(&pool, oracle.as_ref(), &[doc.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = aggregate::compare(
        &pool,
        oracle.as_ref(),
        &[doc.id.clone(), "missing".to_string()],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn compare_preserves_document_order() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let a = upload_txt(&pool, "a.txt", "alpha", None).await;
    let b = upload_txt(&pool, "b.txt", "beta", None).await;
    let c = upload_txt(&pool, "c.txt", "gamma", None).await;

    let ids = vec![c.id.clone(), a.id.clone(), b.id.clone()];
    let comparison = aggregate::compare(&pool, oracle.as_ref(), &ids)
        .await
        .unwrap();
    assert_eq!(comparison.document_ids, ids);
    assert_eq!(comparison.result["ranking"].as_array().unwrap().len(), 3);

    let listed = history::list_comparisons(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].document_ids, ids);
}

// ============ Decision matrix ============

fn criteria(weights: &[(&str, f64)]) -> Vec<Criterion> {
    weights
        .iter()
        .map(|(name, weight)| Criterion {
            name: name.to_string(),
            weight: *weight,
        })
        .collect()
}

#[tokio::test]
async fn matrix_rejects_bad_weight_sum() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let a = upload_txt(&pool, "a.txt", "alpha", None).await;
    let b = upload_txt(&pool, "b.txt", "beta", None).await;
    let ids = vec![a.id, b.id];

    let err = aggregate::build_decision_matrix(
        &pool,
        oracle.as_ref(),
        "Vendor pick",
        &ids,
        &criteria(&[("cost", 0.5), ("quality", 0.45)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Within tolerance passes.
    let matrix = aggregate::build_decision_matrix(
        &pool,
        oracle.as_ref(),
        "Vendor pick",
        &ids,
        &criteria(&[("cost", 0.5), ("quality", 0.5)]),
    )
    .await
    .unwrap();
    assert_eq!(matrix.name, "Vendor pick");
    assert_eq!(matrix.criteria.len(), 2);

    let listed = history::list_decision_matrices(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn matrix_requires_existing_documents() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let a = upload_txt(&pool, "a.txt", "alpha", None).await;

    let err = aggregate::build_decision_matrix(
        &pool,
        oracle.as_ref(),
        "Pick",
        &[a.id, "missing".to_string()],
        &criteria(&[("cost", 1.0)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============ Q&A ============

#[tokio::test]
async fn ask_validates_and_records_history() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "alpha", None).await;

    let err = aggregate::ask(&pool, oracle.as_ref(), &[doc.id.clone()], "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let record = aggregate::ask(&pool, oracle.as_ref(), &[doc.id.clone()], "what is it?")
        .await
        .unwrap();
    assert_eq!(record.question, "what is it?");
    assert_eq!(record.answer["answer"], "forty-two");
}

#[tokio::test]
async fn qa_history_is_capped_and_newest_first() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "alpha", None).await;

    for i in 0..5 {
        aggregate::ask(
            &pool,
            oracle.as_ref(),
            &[doc.id.clone()],
            &format!("question {}", i),
        )
        .await
        .unwrap();
    }

    let recent = history::list_qa_history(&pool, Some(2)).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].question, "question 4");
    assert_eq!(recent[1].question, "question 3");

    let all = history::list_qa_history(&pool, None).await.unwrap();
    assert_eq!(all.len(), 5);
}

// ============ Charts ============

#[tokio::test]
async fn chart_generation_and_listing() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "figures.txt", "q1 10 q2 20", None).await;

    let chart = aggregate::generate_chart(&pool, oracle.as_ref(), &doc.id, ChartType::Bar)
        .await
        .unwrap();
    assert_eq!(chart.title, "Mock Chart");
    assert_eq!(chart.chart_type, ChartType::Bar);
    assert_eq!(chart.chart_data[0]["label"], "a");

    let listed = history::list_charts(&pool, &doc.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let err = aggregate::generate_chart(&pool, oracle.as_ref(), "missing", ChartType::Pie)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============ Export ============

#[tokio::test]
async fn export_renders_json_and_csv() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;
    analysis::analyze(&pool, oracle.as_ref(), &doc.id, AnalysisType::Summarize)
        .await
        .unwrap();

    let json_export = export::export_analyses(&pool, &doc.id, export::ExportFormat::Json)
        .await
        .unwrap();
    assert_eq!(json_export.content_type, "application/json");
    assert!(json_export.body.contains("a fine document"));

    let csv_export = export::export_analyses(&pool, &doc.id, export::ExportFormat::Csv)
        .await
        .unwrap();
    assert_eq!(csv_export.content_type, "text/csv");
    // Flat key/value rows: a header pair per record, then one row per
    // top-level result field.
    assert!(csv_export.body.starts_with("Analysis Type,summarize\n"));
    assert!(csv_export.body.contains("Created At,"));
    assert!(csv_export.body.contains("summary,a fine document\n"));
}

#[tokio::test]
async fn csv_export_serializes_nested_values_as_json() {
    let (pool, _dir) = setup().await;
    let oracle = MockOracle::new();
    let doc = upload_txt(&pool, "a.txt", "content", None).await;
    analysis::analyze(&pool, oracle.as_ref(), &doc.id, AnalysisType::ProsCons)
        .await
        .unwrap();

    let csv_export = export::export_analyses(&pool, &doc.id, export::ExportFormat::Csv)
        .await
        .unwrap();
    assert!(csv_export.body.starts_with("Analysis Type,pros_cons\n"));
    // Array fields come through as JSON strings.
    assert!(csv_export.body.contains("pros,[]\n"));
    assert!(csv_export.body.contains("cons,[]\n"));
}

#[tokio::test]
async fn export_without_history_is_not_found() {
    let (pool, _dir) = setup().await;
    let doc = upload_txt(&pool, "a.txt", "content", None).await;

    let err = export::export_analyses(&pool, &doc.id, export::ExportFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============ HTTP surface ============

/// Serves the router on an ephemeral port and returns the base URL.
async fn spawn_server(pool: sqlx::SqlitePool, dir: &TempDir) -> String {
    let config = Config {
        db: DbConfig {
            path: dir.path().join("test.db"),
        },
        upload: UploadConfig::default(),
        oracle: OracleConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    };

    let app = server::router(pool, MockOracle::new(), Arc::new(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn http_routes_match_published_table() {
    let (pool, dir) = setup().await;
    let doc = upload_txt(&pool, "a.txt", "content", None).await;
    let base = spawn_server(pool, &dir).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.status(), 200);

    // Questions go to /qa.
    let qa = client
        .post(format!("{}/qa", base))
        .json(&json!({ "document_ids": [doc.id], "question": "what?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(qa.status(), 200);
    let qa_body: Value = qa.json().await.unwrap();
    assert_eq!(qa_body["answer"]["answer"], "forty-two");

    // Shortcut endpoints force their analysis type.
    let report = client
        .post(format!("{}/report", base))
        .json(&json!({ "document_id": doc.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(report.status(), 200);
    let report_body: Value = report.json().await.unwrap();
    assert_eq!(report_body["analysis_type"], "report");

    let slides = client
        .post(format!("{}/slides", base))
        .json(&json!({ "document_id": doc.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(slides.status(), 200);
    let slides_body: Value = slides.json().await.unwrap();
    assert_eq!(slides_body["analysis_type"], "slides");

    // History lives under /analysis/{doc_id}.
    let hist = client
        .get(format!("{}/analysis/{}", base, doc.id))
        .send()
        .await
        .unwrap();
    assert_eq!(hist.status(), 200);
    let hist_body: Value = hist.json().await.unwrap();
    assert_eq!(hist_body.as_array().unwrap().len(), 2);

    // Chart generation is POST /charts; listing is GET /charts/{doc_id}.
    let chart = client
        .post(format!("{}/charts", base))
        .json(&json!({ "document_id": doc.id, "chart_type": "bar" }))
        .send()
        .await
        .unwrap();
    assert_eq!(chart.status(), 200);

    let charts = client
        .get(format!("{}/charts/{}", base, doc.id))
        .send()
        .await
        .unwrap();
    assert_eq!(charts.status(), 200);
    assert_eq!(
        charts.json::<Value>().await.unwrap().as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn analyze_upload_stores_and_analyzes_in_one_call() {
    let (pool, dir) = setup().await;
    let base = spawn_server(pool.clone(), &dir).await;
    let client = reqwest::Client::new();

    let boundary = "----routeboundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"combo.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         combined upload\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"analysis_type\"\r\n\r\n\
         pros_cons\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"auto_analyze\"\r\n\r\n\
         false\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let resp = client
        .post(format!("{}/analyze-upload", base))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let payload: Value = resp.json().await.unwrap();
    assert_eq!(payload["document"]["filename"], "combo.txt");
    assert_eq!(payload["analysis"]["analysis_type"], "pros_cons");

    let doc_id = payload["document"]["id"].as_str().unwrap();
    let records = analysis::get_history(&pool, doc_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].analysis_type, AnalysisType::ProsCons);
}

// ============ Document assignment ============

#[tokio::test]
async fn documents_move_between_workspaces() {
    let (pool, _dir) = setup().await;
    let ws1 = documents::create_workspace(&pool, "One", None).await.unwrap();
    let ws2 = documents::create_workspace(&pool, "Two", None).await.unwrap();
    let doc = upload_txt(&pool, "a.txt", "content", Some(&ws1.id)).await;

    let moved = documents::assign_document(&pool, &doc.id, Some(&ws2.id))
        .await
        .unwrap();
    assert_eq!(moved.workspace_id.as_deref(), Some(ws2.id.as_str()));

    let in_ws1 = documents::list_documents(&pool, Some(&ws1.id)).await.unwrap();
    assert!(in_ws1.is_empty());
    let in_ws2 = documents::list_documents(&pool, Some(&ws2.id)).await.unwrap();
    assert_eq!(in_ws2.len(), 1);

    let unassigned = documents::assign_document(&pool, &doc.id, None)
        .await
        .unwrap();
    assert_eq!(unassigned.workspace_id, None);
}
