//! Windows platform implementation
//!
//! UI Automation needs no user grant, so access is always reported active
//! and the flow short-circuits. Navigation still works for callers that
//! open settings directly.

use crate::collaborators::{LaunchError, Resolution, SettingsScreen};

const EASE_OF_ACCESS: &str = "ms-settings:easeofaccess";
const SETTINGS_HOME: &str = "ms-settings:";

pub fn has_accessibility() -> bool {
    true
}

pub fn resolve(_screen: &SettingsScreen) -> Resolution {
    Resolution::Resolved {
        handler: "ms-settings".to_string(),
    }
}

pub fn launch(screen: &SettingsScreen) -> Result<(), LaunchError> {
    let uri = match screen {
        SettingsScreen::Accessibility { .. } => EASE_OF_ACCESS,
        SettingsScreen::General => SETTINGS_HOME,
    };
    super::run("cmd", &["/C", "start", "", uri])
}
