//! Persistence of accepted results.
//!
//! Each write takes one [`SubjectLineRecord`] and sends it to an externally
//! owned store: a Google Sheets row or a MySQL table. Writes are not
//! idempotent; saving the same result twice writes twice.

pub mod database;
#[cfg(feature = "mysql")]
pub mod schema;
pub mod sheets;

pub use database::DatabaseSink;
pub use sheets::SheetSink;

use crate::analysis::Analysis;
use crate::config::{Config, ConfigError, Target};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("invalid credentials: {0}")]
    Credentials(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Google Sheets returned {status}: {body}")]
    SheetsStatus { status: u16, body: String },
    #[error("invalid row {0}: rows start at 1")]
    InvalidRow(u32),
    #[error("database error: {0}")]
    Database(String),
    #[error("{0}")]
    Unsupported(&'static str),
}

/// The four persisted fields, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLineRecord {
    pub subject_line: String,
    pub score: String,
    pub template: String,
    pub category: String,
}

impl SubjectLineRecord {
    pub fn new(subject_line: &str, analysis: &Analysis) -> Self {
        Self {
            subject_line: subject_line.trim().to_string(),
            score: analysis.score.clone(),
            template: analysis.template.clone(),
            category: analysis.category.clone(),
        }
    }

    /// Cell values A..D
    pub fn columns(&self) -> [&str; 4] {
        [
            self.subject_line.as_str(),
            self.score.as_str(),
            self.template.as_str(),
            self.category.as_str(),
        ]
    }
}

/// Where a write landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    SheetRow(u32),
    DatabaseId(u64),
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receipt::SheetRow(row) => write!(f, "row {row}"),
            Receipt::DatabaseId(id) => write!(f, "id {id}"),
        }
    }
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Write one record
    async fn write(&self, record: &SubjectLineRecord) -> Result<Receipt, StoreError>;

    /// Destination, for logs and feedback
    fn describe(&self) -> String;
}

/// Build the sink for a target; `row` is only used by the sheet target
pub fn build_sink(
    config: &Config,
    target: Target,
    row: u32,
) -> Result<Box<dyn ResultSink>, StoreError> {
    match target {
        Target::Sheet => Ok(Box::new(SheetSink::from_config(config, row)?)),
        Target::Database => Ok(Box::new(DatabaseSink::from_config(config)?)),
    }
}
