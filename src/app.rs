use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::config::{AppConfig, SearchProfile};
use crate::core::metadata::{MetadataError, MetadataExtractor};
use crate::core::report;
use crate::models::{GpsCoordinate, MetadataRecord, SearchOutcome, SearchPhase, SearchResult};
use crate::search::{
    BrowserLauncher, PendingSearch, ReverseSearch, SearchError, WebDriverLauncher,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no image selected")]
    NoImageSelected,
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("failed to write {}: {source}", .path.display())]
    Export { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Everything the window shows, independent of gpui.
pub struct AppState {
    image_path: Option<PathBuf>,
    record: Option<MetadataRecord>,
    report: String,
    search: ReverseSearch,
    pending: Option<PendingSearch>,
    last_search: Option<SearchOutcome>,
    status: String,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let launcher = Arc::new(WebDriverLauncher::new(config.driver.clone()));
        Self::with_launcher(launcher, config.search.clone())
    }

    pub fn with_launcher(launcher: Arc<dyn BrowserLauncher>, profile: SearchProfile) -> Self {
        Self {
            image_path: None,
            record: None,
            report: String::new(),
            search: ReverseSearch::new(launcher, profile),
            pending: None,
            last_search: None,
            status: String::from("Select an image to inspect"),
        }
    }

    /// Replaces the current record. On failure nothing from the previous image is kept.
    pub fn select_image(&mut self, path: &Path) -> Result<&MetadataRecord, AppError> {
        self.last_search = None;

        match MetadataExtractor::extract(path) {
            Ok(record) => {
                self.report = report::render_report(&record);
                self.status = format!("Loaded {}", record.file.filename);
                self.image_path = Some(path.to_path_buf());
                Ok(self.record.insert(record))
            }
            Err(err) => {
                self.record = None;
                self.image_path = None;
                self.report.clear();
                self.status = String::from("Could not load image");
                Err(err.into())
            }
        }
    }

    pub fn record(&self) -> Option<&MetadataRecord> {
        self.record.as_ref()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn coordinates(&self) -> Option<GpsCoordinate> {
        self.record.as_ref().and_then(MetadataRecord::gps)
    }

    pub fn can_open_map(&self) -> bool {
        self.coordinates().is_some()
    }

    pub fn map_url(&self) -> Option<String> {
        self.coordinates().map(|coordinate| report::maps_url(&coordinate))
    }

    pub fn export_report(&self, path: &Path) -> Result<(), AppError> {
        if self.record.is_none() {
            return Err(AppError::NoImageSelected);
        }

        report::export_report(path, &self.report).map_err(|source| AppError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Metadata exported to {}", path.display());
        Ok(())
    }

    pub fn is_searching(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_start_search(&self) -> bool {
        self.record.is_some() && !self.is_searching()
    }

    pub fn search_phase(&self) -> SearchPhase {
        self.search.phase()
    }

    pub fn start_search(&mut self) -> Result<(), AppError> {
        let path = self.image_path.clone().ok_or(AppError::NoImageSelected)?;
        if self.is_searching() {
            return Err(SearchError::Busy.into());
        }

        let pending = self.search.search(&path)?;
        self.pending = Some(pending);
        self.last_search = None;
        self.status = format!("{}...", SearchPhase::Launching.label());
        Ok(())
    }

    /// Drains a finished search. Must be called from the interactive thread; the
    /// search trigger becomes available again only here.
    pub fn poll_search(&mut self) -> Option<SearchOutcome> {
        let pending = self.pending.as_mut()?;

        let Some(outcome) = pending.poll() else {
            // A finished phase keeps the last running label until the outcome lands.
            let phase = pending.phase();
            if !phase.is_terminal() {
                self.status = format!("{}...", phase.label());
            }
            return None;
        };

        self.pending = None;
        self.status = match &outcome {
            Ok(result) => format!("Search complete: {} links found", result.urls.len()),
            Err(failure) => format!("Search failed: {}", failure.error),
        };
        self.last_search = Some(outcome.clone());
        Some(outcome)
    }

    pub fn last_search(&self) -> Option<&SearchOutcome> {
        self.last_search.as_ref()
    }

    pub fn search_summary(&self) -> Option<String> {
        match self.last_search.as_ref()? {
            Ok(result) => Some(summarize_search(result)),
            Err(failure) => Some(failure.to_string()),
        }
    }

    /// Lets an in-flight search finish so its browser is closed before exit.
    pub fn shutdown(&mut self) {
        self.search.shutdown();
        if let Some(mut pending) = self.pending.take() {
            if let Some(Err(failure)) = pending.poll() {
                warn!("Search ended during shutdown: {failure}");
            }
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn summarize_search(result: &SearchResult) -> String {
    if result.is_empty() {
        return String::from("No matching pages found");
    }

    let mut out = String::new();
    let _ = writeln!(out, "Found {} related pages:", result.urls.len());
    for url in &result.urls {
        let _ = writeln!(out, "{url}");
    }

    if !result.snippets.is_empty() {
        out.push_str("\nSnippets:\n");
        for snippet in &result.snippets {
            let _ = writeln!(out, "- {snippet}");
        }
    }

    out
}
