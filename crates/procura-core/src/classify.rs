//! Agent output classification.
//!
//! The agent process prints free-form text. Each line is matched against an
//! ordered list of substring markers; the first marker found decides which
//! agent the line is attributed to. Lines with no marker fall back to
//! [`AgentTag::System`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source tag attached to every relay message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentTag {
    #[serde(rename = "Sourcing Agent")]
    Sourcing,
    #[serde(rename = "Negotiation Agent")]
    Negotiation,
    #[serde(rename = "Order Agent")]
    Order,
    /// Terminal tag: the run's outcome, errors and exit status.
    #[serde(rename = "Final Outcome")]
    FinalOutcome,
    #[serde(rename = "System")]
    System,
}

impl AgentTag {
    /// Wire label for this tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sourcing => "Sourcing Agent",
            Self::Negotiation => "Negotiation Agent",
            Self::Order => "Order Agent",
            Self::FinalOutcome => "Final Outcome",
            Self::System => "System",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::FinalOutcome)
    }
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw output line to an [`AgentTag`].
///
/// Implemented by [`Classifier`]; swap in another implementation to move the
/// agent process onto a structured protocol without touching the supervisor.
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> AgentTag;
}

/// Ordered `(marker, tag)` substring classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(String, AgentTag)>,
    fallback: AgentTag,
}

impl Default for Classifier {
    /// Markers printed by the procurement crew.
    ///
    /// `Final Outcome` is checked first so a closing summary that mentions an
    /// agent by name is still treated as terminal.
    fn default() -> Self {
        Self::new(vec![
            ("Final Outcome".to_string(), AgentTag::FinalOutcome),
            ("Sourcing".to_string(), AgentTag::Sourcing),
            ("Negotiation".to_string(), AgentTag::Negotiation),
            ("Order".to_string(), AgentTag::Order),
        ])
    }
}

impl Classifier {
    /// Build a classifier from an ordered rule list.
    pub const fn new(rules: Vec<(String, AgentTag)>) -> Self {
        Self {
            rules,
            fallback: AgentTag::System,
        }
    }

    /// Tag used when no marker matches.
    #[must_use]
    pub const fn with_fallback(mut self, fallback: AgentTag) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn rules(&self) -> &[(String, AgentTag)] {
        &self.rules
    }
}

impl LineClassifier for Classifier {
    fn classify(&self, line: &str) -> AgentTag {
        self.rules
            .iter()
            .find(|(marker, _)| line.contains(marker.as_str()))
            .map_or(self.fallback, |(_, tag)| *tag)
    }
}
