use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use super::driver::{resolve_driver, DriverProcess};
use super::{AutomationError, BrowserLauncher, BrowserSession, ElementHandle};
use crate::config::DriverConfig;

/// W3C identifier under which element references are returned.
const ELEMENT_KEY: &str = "element-6066-11e4-a23f-4f0b6c2e0c2e";
const READY_POLL: Duration = Duration::from_millis(100);

/// Starts Chrome sessions through a WebDriver server.
pub struct WebDriverLauncher {
    config: DriverConfig,
}

impl WebDriverLauncher {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn capabilities(&self) -> Value {
        let mut args = self.config.browser_args.clone();
        if self.config.headless && !args.iter().any(|arg| arg.starts_with("--headless")) {
            args.insert(0, String::from("--headless=new"));
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

impl BrowserLauncher for WebDriverLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, AutomationError> {
        // Dropping `driver` on any early return stops the spawned process.
        let (base_url, driver) = match &self.config.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let binary = resolve_driver(self.config.driver_path.as_deref())?;
                let process = DriverProcess::spawn(&binary)?;
                (process.url(), Some(process))
            }
        };

        let client = WireClient::new(base_url)?;
        client.wait_until_ready(self.config.startup_timeout())?;

        let created = client.send(Method::POST, "session", Some(&self.capabilities()))?;
        let session_id = created
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::Launch(format!("no session id in {created}")))?
            .to_string();

        info!("WebDriver session {session_id} started at {}", client.base_url);
        Ok(Box::new(WebDriverSession {
            client,
            session_id,
            driver,
        }))
    }
}

pub struct WebDriverSession {
    client: WireClient,
    session_id: String,
    driver: Option<DriverProcess>,
}

impl WebDriverSession {
    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, AutomationError> {
        let path = format!("session/{}/{path}", self.session_id);
        self.client.send(method, &path, body)
    }

    fn element_call(
        &self,
        method: Method,
        element: &ElementHandle,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Value, AutomationError> {
        self.call(method, &format!("element/{}/{action}", element.id()), body)
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.call(Method::POST, "url", Some(&json!({ "url": url })))?;
        Ok(())
    }

    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let query = json!({ "using": "css selector", "value": selector });
        let found = match scope {
            Some(parent) => self.element_call(Method::POST, parent, "elements", Some(&query))?,
            None => self.call(Method::POST, "elements", Some(&query))?,
        };
        parse_elements(&found)
    }

    fn click(&mut self, element: &ElementHandle) -> Result<(), AutomationError> {
        self.element_call(Method::POST, element, "click", Some(&json!({})))?;
        Ok(())
    }

    fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> Result<(), AutomationError> {
        let text = path.to_string_lossy();
        self.element_call(Method::POST, element, "value", Some(&json!({ "text": text })))?;
        Ok(())
    }

    fn text(&mut self, element: &ElementHandle) -> Result<String, AutomationError> {
        match self.element_call(Method::GET, element, "text", None)? {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Err(AutomationError::Protocol(format!("unexpected text value {other}"))),
        }
    }

    fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        match self.element_call(Method::GET, element, &format!("attribute/{name}"), None)? {
            Value::String(value) => Ok(Some(value)),
            Value::Null => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    }

    fn close(self: Box<Self>) -> Result<(), AutomationError> {
        let Self {
            client,
            session_id,
            driver,
        } = *self;

        let result = client
            .send(Method::DELETE, &format!("session/{session_id}"), None)
            .map(|_| ());
        debug!("WebDriver session {session_id} deleted");
        drop(driver);
        result
    }
}

/// Blocking JSON client for one WebDriver endpoint. It keeps its own Tokio runtime
/// so reqwest has a reactor on the worker thread.
struct WireClient {
    http: reqwest::Client,
    runtime: Runtime,
    base_url: String,
}

impl WireClient {
    fn new(base_url: String) -> Result<Self, AutomationError> {
        let http = reqwest::Client::builder()
            .user_agent("ExifInspector/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| AutomationError::Launch(format!("failed to build HTTP client: {err}")))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .thread_name("exif-inspector-webdriver")
            .build()
            .map_err(|err| AutomationError::Launch(format!("failed to build tokio runtime: {err}")))?;

        Ok(Self {
            http,
            runtime,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn wait_until_ready(&self, timeout: Duration) -> Result<(), AutomationError> {
        let started = Instant::now();
        loop {
            match self.send(Method::GET, "status", None) {
                Ok(status) if status.get("ready").and_then(Value::as_bool) == Some(true) => {
                    return Ok(());
                }
                Ok(_) => debug!("WebDriver at {} not ready yet", self.base_url),
                Err(err) => debug!("WebDriver at {} unreachable: {err}", self.base_url),
            }

            if started.elapsed() >= timeout {
                return Err(AutomationError::Launch(format!(
                    "WebDriver at {} not ready after {timeout:?}",
                    self.base_url
                )));
            }
            thread::sleep(READY_POLL);
        }
    }

    /// Sends one command and returns the `value` member of the reply.
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, AutomationError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self.http.request(method, &url);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|err| AutomationError::Protocol(err.to_string()))?;
            builder = builder
                .header("Content-Type", "application/json; charset=utf-8")
                .body(bytes);
        }

        let (status, bytes) = self
            .runtime
            .block_on(async move {
                let response = builder.send().await?;
                let status = response.status();
                let bytes = response.bytes().await?;
                Ok::<_, reqwest::Error>((status, bytes))
            })
            .map_err(|err| AutomationError::Network(err.to_string()))?;

        let reply: Value = serde_json::from_slice(&bytes).map_err(|err| {
            AutomationError::Protocol(format!("invalid reply from {url} ({status}): {err}"))
        })?;
        let value = match reply {
            Value::Object(mut members) => members.remove("value").unwrap_or(Value::Null),
            _ => Value::Null,
        };

        if !status.is_success() || value.get("error").is_some() {
            return Err(wire_error(&value));
        }
        Ok(value)
    }
}

/// Maps a W3C error object onto the automation error kinds.
fn wire_error(value: &Value) -> AutomationError {
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match code {
        "no such element" => AutomationError::ElementNotFound(message),
        "timeout" | "script timeout" => AutomationError::Timeout {
            target: message,
            waited: Duration::ZERO,
        },
        other => AutomationError::Protocol(format!("{other}: {message}")),
    }
}

fn parse_elements(value: &Value) -> Result<Vec<ElementHandle>, AutomationError> {
    let Some(items) = value.as_array() else {
        return Err(AutomationError::Protocol(format!(
            "expected an element list, got {value}"
        )));
    };

    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(ElementHandle::new)
                .ok_or_else(|| AutomationError::Protocol(format!("not an element reference: {item}")))
        })
        .collect()
}
