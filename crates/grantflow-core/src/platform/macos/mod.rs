//! macOS platform implementation
//!
//! Uses the Accessibility API trust check via cidre and the
//! `x-apple.systempreferences` URL scheme. The Privacy pane has no way to
//! highlight a single entry, so the highlight hint is ignored here.

use crate::collaborators::{LaunchError, Resolution, SettingsScreen};
use cidre::ax;
use std::path::Path;

const ACCESSIBILITY_PANE: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";
const SETTINGS_ROOT: &str = "x-apple.systempreferences:";

// Ventura renamed System Preferences to System Settings
const SETTINGS_APPS: [&str; 2] = [
    "/System/Applications/System Settings.app",
    "/System/Applications/System Preferences.app",
];

/// Check if the process is a trusted accessibility client
pub fn has_accessibility() -> bool {
    ax::is_process_trusted()
}

pub fn resolve(_screen: &SettingsScreen) -> Resolution {
    SETTINGS_APPS
        .iter()
        .map(Path::new)
        .find(|app| app.exists())
        .and_then(|app| app.file_stem())
        .map(|name| Resolution::Resolved {
            handler: name.to_string_lossy().into_owned(),
        })
        .unwrap_or(Resolution::Unresolved)
}

pub fn launch(screen: &SettingsScreen) -> Result<(), LaunchError> {
    let url = match screen {
        SettingsScreen::Accessibility { .. } => ACCESSIBILITY_PANE,
        SettingsScreen::General => SETTINGS_ROOT,
    };
    super::run("open", &[url])
}
