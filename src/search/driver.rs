use std::env;
use std::ffi::OsStr;
use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::{debug, info, warn};

use super::AutomationError;

pub const DRIVER_ENV_VAR: &str = "CHROMEDRIVER";

#[cfg(target_os = "windows")]
const DRIVER_BINARY: &str = "chromedriver.exe";
#[cfg(not(target_os = "windows"))]
const DRIVER_BINARY: &str = "chromedriver";

/// Locates the chromedriver binary: explicit path, then `CHROMEDRIVER`, then `PATH`.
pub fn resolve_driver(configured: Option<&Path>) -> Result<PathBuf, AutomationError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(AutomationError::DriverNotFound(format!(
            "configured driver {} does not exist",
            path.display()
        )));
    }

    if let Some(path) = env::var_os(DRIVER_ENV_VAR).map(PathBuf::from) {
        if path.is_file() {
            return Ok(path);
        }
        warn!(
            "{DRIVER_ENV_VAR} points to {}, which is not a file",
            path.display()
        );
    }

    env::var_os("PATH")
        .and_then(|paths| find_in_path(DRIVER_BINARY, &paths))
        .ok_or_else(|| {
            AutomationError::DriverNotFound(format!(
                "set driver.driver_path or {DRIVER_ENV_VAR}, or put {DRIVER_BINARY} on PATH"
            ))
        })
}

/// First `dir/name` that is a regular file, scanning a `PATH`-style list.
pub fn find_in_path(name: &str, paths: &OsStr) -> Option<PathBuf> {
    env::split_paths(paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// A chromedriver child process listening on a local port. Killed on drop.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    pub fn spawn(binary: &Path) -> Result<Self, AutomationError> {
        let port = free_port()
            .map_err(|err| AutomationError::Launch(format!("no free local port: {err}")))?;

        let child = Command::new(binary)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                AutomationError::Launch(format!("failed to start {}: {err}", binary.display()))
            })?;

        info!("Started {} on port {port}", binary.display());
        Ok(Self { child, port })
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            // Already exited.
            if err.kind() != io::ErrorKind::InvalidInput {
                warn!("Failed to stop WebDriver process: {err}");
            }
        }
        let _ = self.child.wait();
        debug!("WebDriver process on port {} stopped", self.port);
    }
}

fn free_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        let dir = env::temp_dir().join(format!("exif_inspector_{label}_{nanos}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn finds_binary_in_later_path_entry() {
        let empty = unique_dir("path_empty");
        let with_driver = unique_dir("path_driver");
        fs::write(with_driver.join("fakedriver"), b"").expect("write fake driver");

        let paths = env::join_paths([empty.clone(), with_driver.clone()]).expect("join paths");
        assert_eq!(
            find_in_path("fakedriver", &paths),
            Some(with_driver.join("fakedriver"))
        );
        assert_eq!(find_in_path("missing-driver", &paths), None);
        assert_eq!(find_in_path("fakedriver", &OsString::new()), None);

        let _ = fs::remove_dir_all(empty);
        let _ = fs::remove_dir_all(with_driver);
    }

    #[test]
    fn directories_are_not_binaries() {
        let dir = unique_dir("path_dir");
        fs::create_dir_all(dir.join("chromedriver")).expect("create nested dir");

        assert_eq!(find_in_path("chromedriver", dir.as_os_str()), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_configured_driver_is_reported() {
        let missing = env::temp_dir().join("exif_inspector_no_such_driver");
        match resolve_driver(Some(&missing)) {
            Err(AutomationError::DriverNotFound(message)) => {
                assert!(message.contains("exif_inspector_no_such_driver"))
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn free_port_is_assigned() {
        assert_ne!(free_port().expect("bind loopback"), 0);
    }
}
