use std::fmt;

use thiserror::Error;

use crate::search::AutomationError;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SearchPhase {
    #[default]
    Idle,
    Launching,
    Navigating,
    Uploading,
    WaitingForResults,
    Scraping,
    Done,
    Failed,
}

impl SearchPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Launching => "Launching browser",
            Self::Navigating => "Opening image search",
            Self::Uploading => "Uploading image",
            Self::WaitingForResults => "Waiting for results",
            Self::Scraping => "Reading results",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchResult {
    pub urls: Vec<String>,
    pub snippets: Vec<String>,
}

impl SearchResult {
    /// Appends `url` unless an identical string is already present.
    pub fn push_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.urls.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.snippets.is_empty()
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("reverse search failed while {}: {error}", .phase.label().to_ascii_lowercase())]
pub struct SearchFailure {
    pub phase: SearchPhase,
    pub error: AutomationError,
}

pub type SearchOutcome = Result<SearchResult, SearchFailure>;
