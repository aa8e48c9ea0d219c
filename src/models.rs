//! Core data models for the document-analysis service.
//!
//! These types represent the workspaces, documents, and analysis artifacts
//! that flow between the HTTP surface, the orchestration layer, and SQLite.
//! Oracle outputs stay loosely typed (`serde_json::Value`): only the outer
//! envelope is validated, inner fields belong to the rendering layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The six single-document analysis types the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Summarize,
    ProsCons,
    GapsRisks,
    Upgrade,
    Report,
    Slides,
}

impl AnalysisType {
    /// Every analysis type, in the order a comprehensive sweep runs them.
    pub const ALL: [AnalysisType; 6] = [
        AnalysisType::Summarize,
        AnalysisType::ProsCons,
        AnalysisType::GapsRisks,
        AnalysisType::Upgrade,
        AnalysisType::Report,
        AnalysisType::Slides,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Summarize => "summarize",
            AnalysisType::ProsCons => "pros_cons",
            AnalysisType::GapsRisks => "gaps_risks",
            AnalysisType::Upgrade => "upgrade",
            AnalysisType::Report => "report",
            AnalysisType::Slides => "slides",
        }
    }

    pub fn parse(s: &str) -> Option<AnalysisType> {
        match s {
            "summarize" => Some(AnalysisType::Summarize),
            "pros_cons" => Some(AnalysisType::ProsCons),
            "gaps_risks" => Some(AnalysisType::GapsRisks),
            "upgrade" => Some(AnalysisType::Upgrade),
            "report" => Some(AnalysisType::Report),
            "slides" => Some(AnalysisType::Slides),
            _ => None,
        }
    }
}

/// Document type derived from the filename extension at upload time,
/// immutable thereafter. Extensions outside the enumerated set that are
/// still accepted for upload (gif, webp, md, csv) map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Doc,
    Png,
    Jpg,
    Jpeg,
    Txt,
    Other,
}

impl FileType {
    /// Maps a filename extension to a file type, or `None` if the
    /// extension is outside the supported upload set.
    pub fn from_extension(ext: &str) -> Option<FileType> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "doc" => Some(FileType::Doc),
            "png" => Some(FileType::Png),
            "jpg" => Some(FileType::Jpg),
            "jpeg" => Some(FileType::Jpeg),
            "txt" => Some(FileType::Txt),
            "gif" | "webp" | "md" | "csv" => Some(FileType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Doc => "doc",
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Jpeg => "jpeg",
            FileType::Txt => "txt",
            FileType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<FileType> {
        match s {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "doc" => Some(FileType::Doc),
            "png" => Some(FileType::Png),
            "jpg" => Some(FileType::Jpg),
            "jpeg" => Some(FileType::Jpeg),
            "txt" => Some(FileType::Txt),
            "other" => Some(FileType::Other),
            _ => None,
        }
    }
}

/// Chart families supported by the chart generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
    Radar,
    PolarArea,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
            ChartType::Radar => "radar",
            ChartType::PolarArea => "polarArea",
        }
    }

    pub fn parse(s: &str) -> Option<ChartType> {
        match s {
            "bar" => Some(ChartType::Bar),
            "line" => Some(ChartType::Line),
            "pie" => Some(ChartType::Pie),
            "doughnut" => Some(ChartType::Doughnut),
            "radar" => Some(ChartType::Radar),
            "polarArea" => Some(ChartType::PolarArea),
            _ => None,
        }
    }
}

/// A named grouping of documents. Deleting a workspace un-assigns its
/// documents; it never deletes them.
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// Workspace listing entry with an aggregate document count.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub document_count: i64,
    pub created_at: i64,
}

/// Document metadata as returned by listing and read operations.
/// Raw content bytes are owned exclusively by the storage layer and are
/// never carried on this type.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub workspace_id: Option<String>,
    /// Classification/recommendation payload produced once by the
    /// auto-analysis pass; `None` until that pass completes.
    pub suggestions: Option<Value>,
    pub created_at: i64,
}

/// One run of a single-document analysis. `(document_id, analysis_type)`
/// is not unique: each run appends a new record, and the most recent entry
/// per type is authoritative for display.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub document_id: String,
    pub analysis_type: AnalysisType,
    pub result: Value,
    pub created_at: i64,
}

/// A multi-document comparison. `document_ids` keeps insertion order;
/// for exactly two documents the order drives "Document 1"/"Document 2"
/// labeling downstream.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub id: String,
    pub document_ids: Vec<String>,
    pub result: Value,
    pub created_at: i64,
}

/// A weighted evaluation criterion. Weights across a matrix must sum to
/// 1.0 within a 0.01 tolerance, enforced at the orchestration boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionMatrix {
    pub id: String,
    pub name: String,
    pub document_ids: Vec<String>,
    pub criteria: Vec<Criterion>,
    pub result: Value,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaRecord {
    pub id: String,
    pub document_ids: Vec<String>,
    pub question: String,
    pub answer: Value,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartRecord {
    pub id: String,
    pub document_id: String,
    pub chart_type: ChartType,
    pub title: String,
    pub chart_data: Value,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_type_roundtrip() {
        for t in AnalysisType::ALL {
            assert_eq!(AnalysisType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AnalysisType::parse("qa"), None);
    }

    #[test]
    fn file_type_from_extension() {
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("jpeg"), Some(FileType::Jpeg));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Other));
        assert_eq!(FileType::from_extension("exe"), None);
        assert_eq!(FileType::from_extension(""), None);
    }

    #[test]
    fn chart_type_parse() {
        assert_eq!(ChartType::parse("polarArea"), Some(ChartType::PolarArea));
        assert_eq!(ChartType::parse("bar"), Some(ChartType::Bar));
        assert_eq!(ChartType::parse("scatter"), None);
    }
}
