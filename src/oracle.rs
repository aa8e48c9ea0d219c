//! AI oracle abstraction and the OpenRouter-backed implementation.
//!
//! The oracle is an external collaborator: it receives document content
//! plus a task instruction and returns structured JSON. The core validates
//! only the response envelope (required top-level keys per task) and never
//! interprets inner fields.
//!
//! # Retry Strategy
//!
//! Transport-level retries only:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Domain-level oracle errors (malformed envelope, "no numeric data") are
//! never retried here; per §7 the caller decides.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::OracleConfig;
use crate::error::{AppError, Result};
use crate::models::{AnalysisType, ChartType, Criterion};

/// One piece of user content forwarded to the oracle, in order.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Image { mime: String, base64: String },
}

/// A task the oracle can be asked to perform. Each task carries the
/// structured parameters that shape its instruction and the required
/// envelope keys of its response.
#[derive(Debug, Clone)]
pub enum OracleTask {
    Analysis(AnalysisType),
    Question,
    Chart(ChartType),
    Suggestions,
    Compare { document_count: usize },
    DecisionMatrix { criteria: Vec<Criterion> },
}

impl OracleTask {
    /// System instruction sent with the request. All instructions demand a
    /// JSON object response whose top-level shape matches
    /// [`required_keys`](OracleTask::required_keys).
    pub fn instruction(&self) -> String {
        match self {
            OracleTask::Analysis(AnalysisType::Summarize) => "You are a document analysis expert. Summarize the document. Return a JSON object with: \
                 \"title\", \"summary\" (comprehensive paragraph), \"key_highlights\" (array), \
                 \"key_points\" (array of {label, details, page, confidence}), \
                 \"sections\" (array of {title, summary, page}), \"document_type\", \"language\", \
                 \"page_count\", \"word_count\". Include confidence scores (0.0-1.0) for each key point."
                .to_string(),
            OracleTask::Analysis(AnalysisType::ProsCons) => "Analyze the document for pros and cons. Return a JSON object with: \"title\", \
                 \"summary\", \"pros\" (array of {point, importance, citation}), \"cons\" (same shape), \
                 \"overall_assessment\", \"recommendation\". Each pro/con must cite a page and a quote \
                 of at most 25 words."
                .to_string(),
            OracleTask::Analysis(AnalysisType::GapsRisks) => "Analyze the document for gaps and risks. Return a JSON object with: \"title\", \
                 \"summary\", \"gaps\" (array of {description, severity, recommendation, citation}), \
                 \"risks\" (array of {description, severity, impact, mitigation, citation}), \
                 \"completeness_score\" (0-100), \"missing_sections\", \"improvement_priority\"."
                .to_string(),
            OracleTask::Analysis(AnalysisType::Upgrade) => "Suggest improvements for the document. Return a JSON object with: \"title\", \
                 \"current_quality_score\" (0-100), \"suggestions\" (array of {suggestion, priority, \
                 effort, impact, source_gap, citation}), \"quick_wins\", \"major_improvements\", \
                 \"potential_quality_score\"."
                .to_string(),
            OracleTask::Analysis(AnalysisType::Report) => "Generate a comprehensive analysis report. Return a JSON object with: \"title\", \
                 \"executive_summary\", \"document_overview\" ({type, purpose, audience, date}), \
                 \"key_findings\" (array of {finding, importance, citation}), \"analysis_sections\" \
                 (array of {title, content, key_points}), \"recommendations\" (array of \
                 {recommendation, priority, rationale}), \"conclusion\", \"appendix\"."
                .to_string(),
            OracleTask::Analysis(AnalysisType::Slides) => "Create a presentation outline of 8-12 slides covering the document. Return a JSON \
                 object with: \"title\", \"subtitle\", \"slides\" (array of {slide_number, title, type, \
                 bullets, speaker_notes, chart_suggestion}), \"total_slides\", \"estimated_duration\", \
                 \"key_messages\", \"visual_suggestions\"."
                .to_string(),
            OracleTask::Question => "Answer the question using only the provided document content. Return a JSON object \
                 with: \"question\", \"answer\", \"confidence\" (0.0-1.0), \"citations\" (array of \
                 {page, quote, confidence}), \"related_topics\", \"follow_up_questions\", \"warning\" \
                 (null unless the question cannot be answered from the documents)."
                .to_string(),
            OracleTask::Chart(chart_type) => format!(
                "Extract numeric data from the document suitable for a {} chart. Return a JSON \
                 object with: \"title\", \"chart_type\" (\"{}\"), \"x_label\", \"y_label\", \"data\" \
                 (array of {{label, value}} pairs, in a meaningful order), \"source_page\", \"notes\", \
                 \"alternative_charts\". If the document has no extractable numeric data, say so in a \
                 plain error instead of inventing values.",
                chart_type.as_str(),
                chart_type.as_str()
            ),
            OracleTask::Suggestions => "Classify the document and recommend analyses. Return a JSON object with: \
                 \"document_summary\" (2-3 sentences), \"document_type\", \"key_topics\" (array), \
                 \"has_numeric_data\" (bool), \"has_comparative_content\" (bool), \
                 \"analysis_suggestions\" (array of {type, relevance, reason, output_preview} covering \
                 summarize, pros_cons, gaps_risks, upgrade, report, slides), \"chart_suggestions\" \
                 (array of {type, relevance, reason, data_description}), \"suggested_questions\" \
                 (array), \"compare_suggestions\" ({good_to_compare_with, comparison_criteria}), \
                 \"decision_matrix_suggestions\" ({suitable_for_matrix, suggested_criteria}). \
                 Relevance scores are 0.0-1.0."
                .to_string(),
            OracleTask::Compare { document_count: 2 } => "Compare the two documents thoroughly. Return a JSON object with: \"document1\" and \
                 \"document2\" ({name, summary, key_points} each), \"comparison_table\" (array of \
                 {aspect, document1_value, document2_value, difference, better}), \
                 \"detailed_differences\" (array), \"similarity_score\" (0-100), \"strengths_doc1\", \
                 \"strengths_doc2\", \"weaknesses_doc1\", \"weaknesses_doc2\", \"best_version\" \
                 (\"document1\" or \"document2\"), \"best_version_reason\", \"recommendation\"."
                .to_string(),
            OracleTask::Compare { document_count } => format!(
                "Compare all {} documents thoroughly. Return a JSON object with: \"documents\" \
                 (array of {{id, name, summary, key_points, quality_score}}, one entry per document, \
                 in the order given), \"comparison_table\" (array of {{aspect, values, best}}), \
                 \"detailed_differences\" (array), \"strengths_by_document\", \
                 \"weaknesses_by_document\", \"ranking\" (array of {{rank, document, score, reason}}, \
                 one entry per document), \"best_candidate\" ({{name, reason, key_advantages}}), \
                 \"recommendation\".",
                document_count
            ),
            OracleTask::DecisionMatrix { criteria } => {
                let listing: Vec<String> = criteria
                    .iter()
                    .map(|c| format!("- {} (weight: {})", c.name, c.weight))
                    .collect();
                format!(
                    "Evaluate each document against every criterion, scoring 0-10 per criterion \
                     and computing weighted totals (score x weight). Criteria:\n{}\n\nReturn a JSON \
                     object with: \"criteria\" (array of {{name, weight, description}}), \"options\" \
                     (array of {{option_id, name, summary, scores, total_weighted_score, strengths, \
                     weaknesses, key_findings}}), \"comparison_by_criterion\" (array), \"ranking\" \
                     (array of {{rank, document, total_score, percentage, summary}}), \"winner\" \
                     ({{name, total_score, percentage, reason, key_advantages, considerations}}), \
                     \"recommendation\".",
                    listing.join("\n")
                )
            }
        }
    }

    /// Top-level keys the response envelope must contain for this task.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            OracleTask::Analysis(AnalysisType::Summarize) => &["summary"],
            OracleTask::Analysis(AnalysisType::ProsCons) => &["pros", "cons"],
            OracleTask::Analysis(AnalysisType::GapsRisks) => &["gaps", "risks"],
            OracleTask::Analysis(AnalysisType::Upgrade) => &["suggestions"],
            OracleTask::Analysis(AnalysisType::Report) => &["executive_summary", "key_findings"],
            OracleTask::Analysis(AnalysisType::Slides) => &["slides"],
            OracleTask::Question => &["answer"],
            OracleTask::Chart(_) => &["chart_type", "data"],
            OracleTask::Suggestions => &["analysis_suggestions"],
            OracleTask::Compare { document_count: 2 } => {
                &["document1", "document2", "comparison_table"]
            }
            OracleTask::Compare { .. } => &["documents", "ranking"],
            OracleTask::DecisionMatrix { .. } => &["options", "ranking", "winner"],
        }
    }
}

/// Checks that a response is a JSON object carrying every required
/// top-level key for the task. Inner content is never inspected.
pub fn validate_envelope(task: &OracleTask, value: &Value) -> Result<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| AppError::oracle("oracle response is not a JSON object"))?;

    let missing: Vec<&str> = task
        .required_keys()
        .iter()
        .filter(|key| !obj.contains_key(**key))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::oracle(format!(
            "oracle response missing required keys: {}",
            missing.join(", ")
        )))
    }
}

/// The external AI service. Implementations receive a task plus ordered
/// content parts and return the raw structured response; envelope
/// validation happens in the orchestration layer.
#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    async fn complete(&self, task: &OracleTask, parts: &[ContentPart]) -> Result<Value>;
}

// ============ Disabled Oracle ============

/// A stub oracle that rejects every call. Used when
/// `oracle.provider = "disabled"`: storage and query operations keep
/// working, anything that needs inference fails with an OracleError.
pub struct DisabledOracle;

#[async_trait]
impl AnalysisOracle for DisabledOracle {
    async fn complete(&self, _task: &OracleTask, _parts: &[ContentPart]) -> Result<Value> {
        Err(AppError::oracle("oracle provider is disabled"))
    }
}

// ============ OpenRouter Oracle ============

/// Oracle backed by the OpenRouter chat-completions API.
///
/// Requires the `OPENROUTER_API_KEY` environment variable. Requests ask
/// for `json_object` responses; a caller-configurable timeout bounds each
/// round-trip since the oracle is network-based and can stall.
pub struct OpenRouterOracle {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl OpenRouterOracle {
    pub fn new(config: &OracleConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn user_content(parts: &[ContentPart]) -> Value {
        let items: Vec<Value> = parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => serde_json::json!({ "type": "text", "text": text }),
                ContentPart::Image { mime, base64 } => serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", mime, base64) }
                }),
            })
            .collect();
        Value::Array(items)
    }
}

#[async_trait]
impl AnalysisOracle for OpenRouterOracle {
    async fn complete(&self, task: &OracleTask, parts: &[ContentPart]) -> Result<Value> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": task.instruction() },
                { "role": "user", "content": Self::user_content(parts) }
            ],
            "response_format": { "type": "json_object" },
        });

        let mut last_err: Option<AppError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1u64 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response
                            .json()
                            .await
                            .map_err(|e| AppError::oracle(e.to_string()))?;
                        match extract_message_json(&json) {
                            Ok(value) => return Ok(value),
                            Err(e) => {
                                // Empty or unparseable completions are transient often
                                // enough to be worth one more round-trip.
                                last_err = Some(e);
                                continue;
                            }
                        }
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(AppError::oracle(format!(
                            "oracle API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(AppError::oracle(format!(
                        "oracle API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(AppError::oracle(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::oracle("oracle call failed after retries")))
    }
}

/// Pulls `choices[0].message.content` out of a chat-completions response
/// and parses it as JSON. Models occasionally wrap the object in prose
/// despite `json_object` mode, so a brace-delimited substring is tried
/// before giving up.
fn extract_message_json(response: &Value) -> Result<Value> {
    let content = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| AppError::oracle("invalid oracle response structure"))?;

    if content.trim().is_empty() {
        return Err(AppError::oracle("empty oracle response"));
    }

    parse_json_content(content)
}

fn parse_json_content(content: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(content) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&content[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AppError::oracle("oracle response is not parseable JSON"))
}

/// Builds the oracle configured in `[oracle]`.
pub fn create_oracle(config: &OracleConfig) -> anyhow::Result<std::sync::Arc<dyn AnalysisOracle>> {
    match config.provider.as_str() {
        "disabled" => Ok(std::sync::Arc::new(DisabledOracle)),
        "openrouter" => Ok(std::sync::Arc::new(OpenRouterOracle::new(config)?)),
        other => anyhow::bail!("Unknown oracle provider: {}", other),
    }
}
