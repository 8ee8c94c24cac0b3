mod driver;
mod session;
mod webdriver;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::SearchProfile;
use crate::models::{SearchFailure, SearchOutcome, SearchPhase, SearchResult};

pub use driver::{find_in_path, resolve_driver, DriverProcess, DRIVER_ENV_VAR};
pub use session::{AutomationError, BrowserLauncher, BrowserSession, ElementHandle};
pub use webdriver::{WebDriverLauncher, WebDriverSession};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("a reverse image search is already running")]
    Busy,
    #[error("failed to start the search worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Runs reverse image searches on a background thread, one at a time.
pub struct ReverseSearch {
    launcher: Arc<dyn BrowserLauncher>,
    profile: SearchProfile,
    in_flight: Arc<AtomicBool>,
    phase: PhaseCell,
    worker: Option<JoinHandle<()>>,
}

impl ReverseSearch {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, profile: SearchProfile) -> Self {
        Self {
            launcher,
            profile,
            in_flight: Arc::new(AtomicBool::new(false)),
            phase: PhaseCell::default(),
            worker: None,
        }
    }

    /// True while a worker may still hold a browser session.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase.get()
    }

    pub fn search(&mut self, image: &Path) -> Result<PendingSearch, SearchError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SearchError::Busy);
        }

        // The previous worker already cleared the flag, so this join is immediate.
        if let Some(previous) = self.worker.take() {
            let _ = previous.join();
        }

        let image = std::path::absolute(image).unwrap_or_else(|_| image.to_path_buf());
        let (sender, receiver) = mpsc::channel();
        let job = SearchJob {
            launcher: Arc::clone(&self.launcher),
            profile: self.profile.clone(),
            image,
            phase: self.phase.clone(),
        };
        let in_flight = InFlight(Arc::clone(&self.in_flight));

        self.phase.set(SearchPhase::Launching);
        info!("Starting reverse image search for {}", job.image.display());

        let spawned = thread::Builder::new()
            .name(String::from("reverse-search"))
            .spawn(move || {
                let outcome = job.run();
                match &outcome {
                    Ok(result) => info!(
                        "Reverse image search finished with {} links and {} snippets",
                        result.urls.len(),
                        result.snippets.len()
                    ),
                    Err(failure) => error!("{failure}"),
                }
                drop(in_flight);
                let _ = sender.send(outcome);
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(PendingSearch {
                    receiver,
                    phase: self.phase.clone(),
                    delivered: false,
                })
            }
            Err(err) => {
                // The closure (and its in-flight guard) was dropped with the failed spawn.
                self.phase.set(SearchPhase::Idle);
                Err(SearchError::Spawn(err))
            }
        }
    }

    /// Waits for an in-flight worker so its browser session is closed.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            if self.is_running() {
                info!("Waiting for the reverse image search to release its browser");
            }
            if worker.join().is_err() {
                warn!("Reverse image search worker panicked");
            }
        }
    }
}

impl Drop for ReverseSearch {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Receiving end of one search. Yields the outcome exactly once.
pub struct PendingSearch {
    receiver: Receiver<SearchOutcome>,
    phase: PhaseCell,
    delivered: bool,
}

impl PendingSearch {
    pub fn phase(&self) -> SearchPhase {
        self.phase.get()
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Non-blocking check, meant for the interactive thread.
    pub fn poll(&mut self) -> Option<SearchOutcome> {
        if self.delivered {
            return None;
        }

        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.delivered = true;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.delivered = true;
                Some(Err(self.worker_lost()))
            }
        }
    }

    /// Blocks until the outcome arrives. `None` once it has been delivered.
    pub fn wait(&mut self) -> Option<SearchOutcome> {
        if self.delivered {
            return None;
        }

        self.delivered = true;
        Some(self.receiver.recv().unwrap_or_else(|_| Err(self.worker_lost())))
    }

    fn worker_lost(&self) -> SearchFailure {
        self.phase.set(SearchPhase::Failed);
        SearchFailure {
            phase: SearchPhase::Failed,
            error: AutomationError::WorkerLost,
        }
    }
}

#[derive(Clone, Default)]
struct PhaseCell(Arc<Mutex<SearchPhase>>);

impl PhaseCell {
    fn get(&self) -> SearchPhase {
        match self.0.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set(&self, phase: SearchPhase) {
        match self.0.lock() {
            Ok(mut current) => *current = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }
}

/// Clears the in-flight flag when dropped, including when the worker unwinds.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Closes the browser session when the worker leaves its run, on every path.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> Result<&mut (dyn BrowserSession + 'static), AutomationError> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(AutomationError::Protocol(String::from("browser session already closed"))),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            match session.close() {
                Ok(()) => debug!("Browser session closed"),
                Err(err) => warn!("Failed to close browser session: {err}"),
            }
        }
    }
}

struct SearchJob {
    launcher: Arc<dyn BrowserLauncher>,
    profile: SearchProfile,
    image: PathBuf,
    phase: PhaseCell,
}

impl SearchJob {
    fn run(&self) -> SearchOutcome {
        let result = self.drive();
        self.phase.set(match &result {
            Ok(_) => SearchPhase::Done,
            Err(_) => SearchPhase::Failed,
        });
        result
    }

    fn drive(&self) -> SearchOutcome {
        self.enter(SearchPhase::Launching);
        let session = self.launcher.launch().map_err(|err| self.fail(err))?;
        let mut guard = SessionGuard::new(session);

        let result = self.steps(&mut guard).map_err(|err| self.fail(err));
        drop(guard);
        result
    }

    fn steps(&self, guard: &mut SessionGuard) -> Result<SearchResult, AutomationError> {
        let profile = &self.profile;
        let selectors = &profile.selectors;
        let session = guard.session()?;

        self.enter(SearchPhase::Navigating);
        session.navigate(&profile.home_url)?;
        thread::sleep(profile.settle_delay());
        let search_by_image = wait_for_element(session, &selectors.search_by_image, profile)?;
        session.click(&search_by_image)?;
        thread::sleep(profile.settle_delay());

        self.enter(SearchPhase::Uploading);
        let upload = wait_for_element(session, &selectors.upload_input, profile)?;
        session.upload_file(&upload, &self.image)?;

        self.enter(SearchPhase::WaitingForResults);
        thread::sleep(profile.settle_delay());
        wait_for_element(session, &selectors.results, profile)?;

        self.enter(SearchPhase::Scraping);
        scrape_results(session, profile)
    }

    fn enter(&self, phase: SearchPhase) {
        debug!("Reverse search phase: {phase}");
        self.phase.set(phase);
    }

    fn fail(&self, error: AutomationError) -> SearchFailure {
        SearchFailure {
            phase: self.phase.get(),
            error,
        }
    }
}

/// Polls for `selector` until it matches or the profile's element timeout runs out.
pub fn wait_for_element<S: BrowserSession + ?Sized>(
    session: &mut S,
    selector: &str,
    profile: &SearchProfile,
) -> Result<ElementHandle, AutomationError> {
    let timeout = profile.element_timeout();
    let interval = profile.poll_interval();
    let started = Instant::now();

    loop {
        if let Some(element) = session.find_elements(None, selector)?.into_iter().next() {
            return Ok(element);
        }

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(AutomationError::Timeout {
                target: selector.to_string(),
                waited,
            });
        }
        thread::sleep(interval.min(timeout.saturating_sub(waited)).max(Duration::from_millis(1)));
    }
}

/// Reads snippets and outbound links from the first `max_results` result blocks.
pub fn scrape_results<S: BrowserSession + ?Sized>(
    session: &mut S,
    profile: &SearchProfile,
) -> Result<SearchResult, AutomationError> {
    let mut result = SearchResult::default();
    let blocks = session.find_elements(None, &profile.selectors.results)?;

    for block in blocks.iter().take(profile.max_results) {
        let text = session.text(block)?;
        let text = text.trim();
        if !text.is_empty() {
            result.snippets.push(text.to_string());
        }

        for link in session.find_elements(Some(block), &profile.selectors.links)? {
            if let Some(href) = session.attribute(&link, "href")? {
                if is_outbound(&href) {
                    result.push_url(href);
                }
            }
        }
    }

    Ok(result)
}

fn is_outbound(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_links() {
        assert!(is_outbound("https://example.com/a"));
        assert!(is_outbound("http://example.com"));
        assert!(!is_outbound("/search?q=1"));
        assert!(!is_outbound("javascript:void(0)"));
    }

    #[test]
    fn phase_cell_defaults_to_idle() {
        let cell = PhaseCell::default();
        assert_eq!(cell.get(), SearchPhase::Idle);
        cell.set(SearchPhase::Scraping);
        assert_eq!(cell.clone().get(), SearchPhase::Scraping);
    }
}
