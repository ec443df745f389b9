//! Interfaces the flow drives but does not implement

use crate::error::Result;
use crate::model::{Prompt, ServiceMessage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reports whether accessibility access is currently active
pub trait CapabilityStatus: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Modal yes/no prompt. Answers come back as [`crate::FlowMessage`]s.
pub trait ConsentUi: Send + Sync {
    /// Show a non-cancelable consent prompt
    fn ask(&self, prompt: Prompt);
    /// Tell the user the accessibility screen is missing and offer the general one
    fn offer_fallback(&self, notice: &str);
}

/// Jumps to system settings screens
pub trait SettingsNavigator: Send + Sync {
    fn resolve(&self, screen: &SettingsScreen) -> Resolution;
    /// Open the screen. Completion is reported later as `NavigationFinished`.
    fn launch(&self, screen: &SettingsScreen) -> std::result::Result<(), LaunchError>;
}

/// Long-running consumer of the flow's outcome
pub trait DependentService: Send + Sync {
    fn deliver(&self, message: ServiceMessage) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum SettingsScreen {
    /// Accessibility list; `highlight` names the entry to scroll to where supported
    Accessibility {
        #[serde(skip_serializing_if = "Option::is_none")]
        highlight: Option<String>,
    },
    General,
}

impl SettingsScreen {
    pub fn accessibility_for(app_id: &str, entry: &str) -> Self {
        SettingsScreen::Accessibility {
            highlight: Some(format!("{}/{}", app_id, entry)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SettingsScreen::Accessibility { .. } => "accessibility",
            SettingsScreen::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { handler: String },
    Unresolved,
}

impl Resolution {
    /// Resolved to something that actually shows the screen. Some vendors
    /// register placeholder handlers whose names contain "Stub".
    pub fn is_usable(&self) -> bool {
        match self {
            Resolution::Resolved { handler } => !handler.contains("Stub"),
            Resolution::Unresolved => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no handler for the {0} settings screen")]
    NotFound(&'static str),
    #[error("{handler} exited with {status}")]
    Failed { handler: String, status: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_handlers_are_not_usable() {
        let r = Resolution::Resolved { handler: "com.vendor.SettingsStub".into() };
        assert!(!r.is_usable());
        let r = Resolution::Resolved { handler: "System Settings".into() };
        assert!(r.is_usable());
        assert!(!Resolution::Unresolved.is_usable());
    }

    #[test]
    fn highlight_hint_names_app_entry() {
        let s = SettingsScreen::accessibility_for("dev.grantflow", "input");
        assert_eq!(
            s,
            SettingsScreen::Accessibility { highlight: Some("dev.grantflow/input".into()) }
        );
        assert_eq!(s.name(), "accessibility");
    }
}
