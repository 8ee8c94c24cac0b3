use std::io;
use std::process::{Command, ExitStatus};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    MacOS,
    Windows,
    Linux,
    Other,
}

pub fn current_platform() -> Platform {
    if cfg!(target_os = "macos") {
        Platform::MacOS
    } else if cfg!(target_os = "windows") {
        Platform::Windows
    } else if cfg!(target_os = "linux") {
        Platform::Linux
    } else {
        Platform::Other
    }
}

/// Program and leading arguments that hand a URL to the desktop's default handler.
pub fn opener_command(platform: Platform) -> Option<(&'static str, &'static [&'static str])> {
    match platform {
        Platform::MacOS => Some(("open", &[])),
        Platform::Windows => Some(("cmd", &["/C", "start", ""])),
        Platform::Linux => Some(("xdg-open", &[])),
        Platform::Other => None,
    }
}

/// Opens `url` in the default browser without waiting on the page.
pub fn open_url(url: &str) -> io::Result<()> {
    let Some((program, args)) = opener_command(current_platform()) else {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "opening URLs is not supported on this platform",
        ));
    };

    let status = Command::new(program).args(args).arg(url).status()?;
    check_status(program, status)
}

fn check_status(program: &str, status: ExitStatus) -> io::Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(io::Error::other(format!(
        "{program} command failed with status {status}"
    )))
}
