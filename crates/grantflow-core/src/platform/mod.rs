//! Platform abstraction layer
//!
//! Each platform module exposes the same three functions: `has_accessibility`,
//! `resolve` and `launch`. [`SystemStatus`] and [`SystemNavigator`] adapt the
//! current one to the flow's collaborator traits.

use crate::collaborators::{CapabilityStatus, LaunchError, Resolution, SettingsNavigator, SettingsScreen};
#[cfg(target_os = "linux")]
use std::path::PathBuf;
use std::process::Command;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

// Re-export the current platform
#[cfg(target_os = "macos")]
pub use macos as current;

#[cfg(target_os = "linux")]
pub use linux as current;

#[cfg(target_os = "windows")]
pub use windows as current;

/// Accessibility status as the operating system reports it
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStatus;

impl CapabilityStatus for SystemStatus {
    fn is_active(&self) -> bool {
        current::has_accessibility()
    }
}

/// Opens the platform's settings application
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNavigator;

impl SettingsNavigator for SystemNavigator {
    fn resolve(&self, screen: &SettingsScreen) -> Resolution {
        current::resolve(screen)
    }

    fn launch(&self, screen: &SettingsScreen) -> Result<(), LaunchError> {
        tracing::debug!(screen = screen.name(), "opening settings");
        current::launch(screen)
    }
}

/// Run a short-lived launcher command and wait for it
#[cfg(any(target_os = "macos", target_os = "windows"))]
pub(crate) fn run(program: &str, args: &[&str]) -> Result<(), LaunchError> {
    let status = Command::new(program).args(args).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::Failed {
            handler: program.to_string(),
            status: status.to_string(),
        })
    }
}

/// Start a GUI program without waiting for it to exit
#[cfg(target_os = "linux")]
pub(crate) fn spawn(program: &str, args: &[&str]) -> Result<(), LaunchError> {
    spawn_reaped(program, args).map(|_| ())
}

/// The child is waited on from a background thread so it does not linger
/// as a zombie in long-lived hosts.
#[cfg(target_os = "linux")]
fn spawn_reaped(
    program: &str,
    args: &[&str],
) -> Result<std::thread::JoinHandle<std::io::Result<std::process::ExitStatus>>, LaunchError> {
    let mut child = Command::new(program).args(args).spawn()?;
    let reaper = std::thread::Builder::new()
        .name(format!("reap-{}", program))
        .spawn(move || {
            let status = child.wait();
            tracing::debug!(?status, "settings app exited");
            status
        })?;
    Ok(reaper)
}

#[cfg(target_os = "linux")]
pub(crate) fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn spawned_child_is_reaped() {
        let reaper = spawn_reaped("true", &[]).unwrap();
        let status = reaper.join().unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn spawn_reports_missing_program() {
        assert!(spawn("grantflow-no-such-program", &[]).is_err());
    }

    #[test]
    fn finds_programs_on_path() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("grantflow-no-such-program").is_none());
    }
}
