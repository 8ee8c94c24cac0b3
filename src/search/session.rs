use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while driving the browser.
///
/// Kept `Clone` so a failure can be stored in the UI state and rendered more than once.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AutomationError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("no WebDriver executable found ({0})")]
    DriverNotFound(String),
    #[error("no element matches `{0}`")]
    ElementNotFound(String),
    #[error("timed out after {waited:?} waiting for `{target}`")]
    Timeout { target: String, waited: Duration },
    #[error("WebDriver request failed: {0}")]
    Network(String),
    #[error("WebDriver protocol error: {0}")]
    Protocol(String),
    #[error("search worker exited without reporting a result")]
    WorkerLost,
}

/// Opaque reference to an element inside one browser session.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// A live browser session. Used from a single worker thread.
pub trait BrowserSession: Send {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;

    /// Elements matching `selector`, searched below `scope` or in the whole document.
    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AutomationError>;

    fn click(&mut self, element: &ElementHandle) -> Result<(), AutomationError>;

    /// Hands a local file to an `<input type="file">` element.
    fn upload_file(&mut self, element: &ElementHandle, path: &Path)
        -> Result<(), AutomationError>;

    fn text(&mut self, element: &ElementHandle) -> Result<String, AutomationError>;

    fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    /// Ends the session and releases the browser process.
    fn close(self: Box<Self>) -> Result<(), AutomationError>;
}

pub trait BrowserLauncher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, AutomationError>;
}
