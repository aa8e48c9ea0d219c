//! # AnalysisDoc
//!
//! A document-analysis service: upload documents, run AI-backed analyses
//! over them, compare alternatives, build weighted decision matrices, ask
//! questions across documents, and export the accumulated history.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │  Upload  │──▶│   Extract     │──▶│  Oracle   │
//! │ pdf/docx │   │ text / image  │   │ (AI API)  │
//! └──────────┘   └───────────────┘   └────┬─────┘
//!                                         │
//!                    ┌────────────────────┤
//!                    ▼                    ▼
//!               ┌──────────┐       ┌──────────┐
//!               │  SQLite  │       │   HTTP   │
//!               │ history  │       │  (adoc)  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Entity CRUD over SQLite |
//! | [`extract`] | Document content extraction |
//! | [`oracle`] | AI oracle abstraction and OpenRouter client |
//! | [`documents`] | Workspace and document lifecycle |
//! | [`analysis`] | Single-document analysis orchestration |
//! | [`aggregate`] | Compare, decision matrix, Q&A, charts |
//! | [`history`] | History listings |
//! | [`export`] | JSON / CSV export |
//! | [`server`] | HTTP API server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod export;
pub mod extract;
pub mod history;
pub mod migrate;
pub mod models;
pub mod oracle;
pub mod server;
pub mod store;
