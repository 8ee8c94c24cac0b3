#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use exif_inspector::config::SearchProfile;
use exif_inspector::search::{AutomationError, BrowserLauncher, BrowserSession, ElementHandle};

pub fn unique_path(name: &str, ext: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("exif_inspector_{name}_{stamp}.{ext}"));
    path
}

pub fn write_jpeg(path: &Path) {
    image::RgbImage::from_pixel(16, 16, image::Rgb([10, 20, 30]))
        .save(path)
        .expect("should write jpeg");
}

/// Profile with no settle delay and a zero element timeout, so a missing element
/// fails on the first poll.
pub fn fast_profile() -> SearchProfile {
    SearchProfile {
        settle_delay_ms: 0,
        element_timeout_secs: 0,
        poll_interval_ms: 1,
        ..SearchProfile::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResultBlock {
    pub text: String,
    pub hrefs: Vec<String>,
}

impl ResultBlock {
    pub fn new(text: &str, hrefs: &[&str]) -> Self {
        Self {
            text: text.to_string(),
            hrefs: hrefs.iter().map(|href| href.to_string()).collect(),
        }
    }
}

/// What the fake search page serves.
#[derive(Clone, Debug, Default)]
pub struct FakePage {
    pub missing: Vec<String>,
    pub results: Vec<ResultBlock>,
    pub panic_on_click: bool,
}

#[derive(Debug, Default)]
pub struct SessionLog {
    pub launched: usize,
    pub closed: usize,
    pub visited: Vec<String>,
    pub clicked: Vec<String>,
    pub uploaded: Option<PathBuf>,
}

pub struct FakeLauncher {
    page: FakePage,
    profile: SearchProfile,
    launch_error: Option<AutomationError>,
    gate: Option<Mutex<Receiver<()>>>,
    pub log: Arc<Mutex<SessionLog>>,
}

impl FakeLauncher {
    pub fn new(page: FakePage, profile: &SearchProfile) -> Self {
        Self {
            page,
            profile: profile.clone(),
            launch_error: None,
            gate: None,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    pub fn failing(error: AutomationError, profile: &SearchProfile) -> Self {
        Self {
            launch_error: Some(error),
            ..Self::new(FakePage::default(), profile)
        }
    }

    /// Holds `launch` until a message arrives on `gate`.
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(Mutex::new(gate));
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, AutomationError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().expect("gate lock").recv_timeout(Duration::from_secs(10));
        }
        if let Some(error) = &self.launch_error {
            return Err(error.clone());
        }

        self.log.lock().expect("log lock").launched += 1;
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            profile: self.profile.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    page: FakePage,
    profile: SearchProfile,
    log: Arc<Mutex<SessionLog>>,
}

impl FakeSession {
    fn result_index(element: &ElementHandle) -> Option<usize> {
        element.id().strip_prefix("result-")?.parse().ok()
    }

    fn link(&self, element: &ElementHandle) -> Option<&String> {
        let rest = element.id().strip_prefix("link-")?;
        let (block, link) = rest.split_once('-')?;
        let block: usize = block.parse().ok()?;
        let link: usize = link.parse().ok()?;
        self.page.results.get(block)?.hrefs.get(link)
    }
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.log.lock().expect("log lock").visited.push(url.to_string());
        Ok(())
    }

    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        if self.page.missing.iter().any(|missing| missing == selector) {
            return Ok(Vec::new());
        }

        let selectors = &self.profile.selectors;
        let found = match scope {
            Some(parent) if selector == selectors.links => {
                let block = Self::result_index(parent)
                    .ok_or_else(|| AutomationError::ElementNotFound(parent.id().to_string()))?;
                let count = self.page.results.get(block).map_or(0, |b| b.hrefs.len());
                (0..count)
                    .map(|link| ElementHandle::new(format!("link-{block}-{link}")))
                    .collect()
            }
            Some(_) => Vec::new(),
            None if selector == selectors.search_by_image => {
                vec![ElementHandle::new("search-by-image")]
            }
            None if selector == selectors.upload_input => vec![ElementHandle::new("upload")],
            None if selector == selectors.results => (0..self.page.results.len())
                .map(|index| ElementHandle::new(format!("result-{index}")))
                .collect(),
            None => Vec::new(),
        };
        Ok(found)
    }

    fn click(&mut self, element: &ElementHandle) -> Result<(), AutomationError> {
        if self.page.panic_on_click {
            panic!("browser crashed while clicking {}", element.id());
        }
        self.log
            .lock()
            .expect("log lock")
            .clicked
            .push(element.id().to_string());
        Ok(())
    }

    fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> Result<(), AutomationError> {
        if element.id() != "upload" {
            return Err(AutomationError::Protocol(format!(
                "{} is not a file input",
                element.id()
            )));
        }
        self.log.lock().expect("log lock").uploaded = Some(path.to_path_buf());
        Ok(())
    }

    fn text(&mut self, element: &ElementHandle) -> Result<String, AutomationError> {
        Self::result_index(element)
            .and_then(|index| self.page.results.get(index))
            .map(|block| block.text.clone())
            .ok_or_else(|| AutomationError::ElementNotFound(element.id().to_string()))
    }

    fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        if name != "href" {
            return Ok(None);
        }
        Ok(self.link(element).cloned())
    }

    fn close(self: Box<Self>) -> Result<(), AutomationError> {
        self.log.lock().map(|mut log| log.closed += 1).ok();
        Ok(())
    }
}

/// Session whose page renders `selector` only after `appears_after` empty lookups.
pub struct LateSession {
    pub selector: String,
    pub appears_after: usize,
    pub lookups: Arc<AtomicUsize>,
}

impl LateSession {
    pub fn new(selector: &str, appears_after: usize) -> Self {
        Self {
            selector: selector.to_string(),
            appears_after,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BrowserSession for LateSession {
    fn navigate(&mut self, _url: &str) -> Result<(), AutomationError> {
        Ok(())
    }

    fn find_elements(
        &mut self,
        _scope: Option<&ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let seen = self.lookups.fetch_add(1, Ordering::SeqCst);
        if selector == self.selector && seen >= self.appears_after {
            Ok(vec![ElementHandle::new("late")])
        } else {
            Ok(Vec::new())
        }
    }

    fn click(&mut self, _element: &ElementHandle) -> Result<(), AutomationError> {
        Ok(())
    }

    fn upload_file(&mut self, _element: &ElementHandle, _path: &Path) -> Result<(), AutomationError> {
        Ok(())
    }

    fn text(&mut self, _element: &ElementHandle) -> Result<String, AutomationError> {
        Ok(String::new())
    }

    fn attribute(
        &mut self,
        _element: &ElementHandle,
        _name: &str,
    ) -> Result<Option<String>, AutomationError> {
        Ok(None)
    }

    fn close(self: Box<Self>) -> Result<(), AutomationError> {
        Ok(())
    }
}

pub fn cleanup_file(path: &Path) {
    let _ = fs::remove_file(path);
}
