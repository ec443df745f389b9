//! Linux platform implementation
//!
//! GNOME only: the accessibility toggle is the `toolkit-accessibility`
//! desktop setting and the screen lives in `gnome-control-center`.

use crate::collaborators::{LaunchError, Resolution, SettingsScreen};
use std::process::Command;

const CONTROL_CENTER: &str = "gnome-control-center";
const ACCESSIBILITY_PANEL: &str = "universal-access";

/// Check if assistive technology support is switched on for the session
pub fn has_accessibility() -> bool {
    Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", "toolkit-accessibility"])
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true")
        .unwrap_or(false)
}

pub fn resolve(_screen: &SettingsScreen) -> Resolution {
    match super::find_in_path(CONTROL_CENTER) {
        Some(_) => Resolution::Resolved {
            handler: CONTROL_CENTER.to_string(),
        },
        None => Resolution::Unresolved,
    }
}

pub fn launch(screen: &SettingsScreen) -> Result<(), LaunchError> {
    if super::find_in_path(CONTROL_CENTER).is_none() {
        return Err(LaunchError::NotFound(screen.name()));
    }
    match screen {
        SettingsScreen::Accessibility { .. } => super::spawn(CONTROL_CENTER, &[ACCESSIBILITY_PANEL]),
        SettingsScreen::General => super::spawn(CONTROL_CENTER, &[]),
    }
}
