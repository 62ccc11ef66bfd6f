//! Analyze/save workflow shared by the TUI and the CLI.
//!
//! One analysis asks the model twice for the same subject line and keeps
//! both replies, so the user can pick the better one. Nothing is cached:
//! every analysis calls the model again.

use crate::agent::{AgentError, TextGenerator};
use crate::analysis::{Analysis, ResponseFormat};
use crate::parse::{parse_response, ParseError};
use crate::prompt::build_prompt;
use crate::store::{ResultSink, StoreError, SubjectLineRecord};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter a subject line.")]
    EmptySubject,
    #[error("Analyze a subject line first.")]
    NotAnalyzed,
    #[error("{panel} format is incorrect or missing data: {reason}")]
    Malformed { panel: PanelId, reason: ParseError },
    #[error("Invalid row '{0}': enter a row number starting at 1.")]
    InvalidRow(String),
    #[error("Analysis failed: {0}")]
    Generation(#[from] AgentError),
    #[error("Error saving {panel}: {source}")]
    Store {
        panel: PanelId,
        #[source]
        source: StoreError,
    },
}

/// One of the two side-by-side results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
    First,
    Second,
}

impl PanelId {
    pub const BOTH: [PanelId; 2] = [PanelId::First, PanelId::Second];

    pub fn index(self) -> usize {
        match self {
            PanelId::First => 0,
            PanelId::Second => 1,
        }
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Result {}", self.index() + 1)
    }
}

/// Raw model reply and what it parsed to.
#[derive(Debug, Clone)]
pub struct Panel {
    pub raw: String,
    pub parsed: Result<Analysis, ParseError>,
}

#[derive(Debug, Default)]
pub struct Session {
    subject_line: String,
    analyzed: bool,
    panels: [Option<Panel>; 2],
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    /// Subject line of the last successful analysis
    pub fn subject_line(&self) -> &str {
        &self.subject_line
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels[id.index()].as_ref()
    }

    /// Ask the model twice, one call after the other, and keep both replies
    pub async fn analyze<G>(
        &mut self,
        generator: &G,
        subject_line: &str,
        format: ResponseFormat,
    ) -> Result<(), SessionError>
    where
        G: TextGenerator + ?Sized,
    {
        let subject_line = subject_line.trim();
        if subject_line.is_empty() {
            return Err(SessionError::EmptySubject);
        }

        self.analyzed = true;
        self.panels = [None, None];
        self.subject_line = subject_line.to_string();

        let prompt = build_prompt(subject_line, format);
        info!(
            generator = %generator.describe(),
            subject_len = subject_line.len(),
            ?format,
            "analyzing subject line"
        );

        let mut panels: [Option<Panel>; 2] = [None, None];
        for id in PanelId::BOTH {
            let raw = generator.generate(&prompt).await.inspect_err(|e| {
                warn!(panel = %id, error = %e, "generation failed");
            })?;
            let parsed = parse_response(&raw, format);
            if let Err(e) = &parsed {
                warn!(panel = %id, error = %e, "reply did not parse");
            }
            panels[id.index()] = Some(Panel { raw, parsed });
        }

        self.panels = panels;
        Ok(())
    }

    /// The record a save of this panel would write
    pub fn record(&self, id: PanelId) -> Result<SubjectLineRecord, SessionError> {
        let panel = self.panel(id).ok_or(SessionError::NotAnalyzed)?;
        match &panel.parsed {
            Ok(analysis) => Ok(SubjectLineRecord::new(&self.subject_line, analysis)),
            Err(reason) => Err(SessionError::Malformed {
                panel: id,
                reason: reason.clone(),
            }),
        }
    }

    /// Persist one panel's own result; returns the feedback message
    pub async fn save<S>(&self, id: PanelId, sink: &S) -> Result<String, SessionError>
    where
        S: ResultSink + ?Sized,
    {
        let record = self.record(id)?;
        let receipt = sink
            .write(&record)
            .await
            .map_err(|source| SessionError::Store { panel: id, source })?;

        info!(panel = %id, destination = %sink.describe(), %receipt, "result saved");
        Ok(format!("{id} saved to {receipt}!"))
    }
}

/// Parse the row field of the sheet target
pub fn parse_row(text: &str) -> Result<u32, SessionError> {
    match text.trim().parse::<u32>() {
        Ok(row) if row >= 1 => Ok(row),
        _ => Err(SessionError::InvalidRow(text.trim().to_string())),
    }
}
