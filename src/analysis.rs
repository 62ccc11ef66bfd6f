//! Analysis record - the structured result parsed from one model reply.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subject-line type assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    Informational,
    Announcement,
    Promotion,
    Generic,
    Cold,
    Survey,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Informational,
        Category::Announcement,
        Category::Promotion,
        Category::Generic,
        Category::Cold,
        Category::Survey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Informational => "Informational",
            Category::Announcement => "Announcement",
            Category::Promotion => "Promotion",
            Category::Generic => "Generic",
            Category::Cold => "Cold",
            Category::Survey => "Survey",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive; surrounding whitespace and trailing punctuation are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.trim().to_string())
    }
}

/// Canonical spelling for a known label; any other label is kept as given
pub fn normalize_category(label: &str) -> String {
    label
        .parse::<Category>()
        .map(String::from)
        .unwrap_or_else(|_| label.trim().to_string())
}

/// Reply shape the model is instructed to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// `[Score, Template, Topic]`
    #[default]
    List,
    /// `{"subject_line", "score", "template", "category"}`
    Json,
}

/// One scored and classified subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Effectiveness score as written by the model
    pub score: String,
    /// Subject line with its variable parts replaced by placeholders
    pub template: String,
    /// Category label; canonical spelling when it is one of [`Category::ALL`]
    pub category: String,
}

impl Analysis {
    pub fn new(
        score: impl Into<String>,
        template: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            score: score.into(),
            template: template.into(),
            category: category.into(),
        }
    }

    /// The category, if the label is one of the known ones
    pub fn known_category(&self) -> Option<Category> {
        self.category.parse().ok()
    }

    /// Numeric reading of the score, if it is one
    pub fn score_value(&self) -> Option<f64> {
        self.score.trim().parse().ok()
    }
}

/// Reply expected from the model in the JSON variant.
///
/// Only used to render the schema embedded in the prompt; replies are parsed
/// leniently in [`crate::parse`].
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct JsonReply {
    /// The subject line exactly as given
    pub subject_line: String,
    /// Effectiveness score out of 100
    pub score: String,
    /// Generic template with placeholders such as [X]
    pub template: String,
    pub category: Category,
}
