//! # Subline
//!
//! A TUI for scoring and classifying email subject lines using LLMs.
//!
//! ## Features
//!
//! - **Two opinions per subject line**: every analysis asks the model twice and shows both results side by side
//! - **Typed results**: replies are parsed into an `Analysis` with score, template and category
//! - **Pluggable persistence**: accepted results go to a Google Sheets row or a MySQL table
//! - **Provider Agnostic**: OpenAI-compatible APIs over reqwest, Gemini via rstructor

pub mod agent;
pub mod analysis;
pub mod config;
pub mod logging;
pub mod parse;
pub mod prompt;
pub mod session;
pub mod store;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use analysis::{Analysis, Category, ResponseFormat};
pub use config::Config;
pub use session::{PanelId, Session};
