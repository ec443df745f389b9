//! grantflow-core - Accessibility access acquisition flow
//!
//! Decides whether accessibility (input control) access is needed, asks the
//! user, sends them to the right settings screen and reports one outcome to
//! the dependent service.
//!
//! ## Platform Support
//!
//! - **macOS**: status via the AX trust check, Privacy & Security pane deep link
//! - **Linux**: GNOME toolkit-accessibility setting, `gnome-control-center`
//! - **Windows**: `ms-settings:` Ease of Access page

pub mod collaborators;
pub mod config;
pub mod decision;
pub mod error;
pub mod flow;
pub mod model;
pub mod platform;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use collaborators::{
    CapabilityStatus, ConsentUi, DependentService, LaunchError, Resolution, SettingsNavigator,
    SettingsScreen,
};
pub use config::{ConfigSnapshot, ConfigStore, Defaults, JsonConfigStore, MemoryConfigStore, Settings};
pub use decision::{decide, PlatformTraits};
pub use error::{Error, ErrorCode, Result};
pub use flow::{
    Collaborators, ConsentAnswer, FlowController, FlowMessage, FlowState, FlowStatus, Termination,
};
pub use model::{FlowDecision, FlowOutcome, FlowRequest, Prompt, ServiceMessage};
pub use platform::{SystemNavigator, SystemStatus};

pub mod prelude {
    pub use crate::collaborators::{
        CapabilityStatus, ConsentUi, DependentService, SettingsNavigator, SettingsScreen,
    };
    pub use crate::config::{ConfigStore, Defaults, JsonConfigStore};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::flow::{Collaborators, ConsentAnswer, FlowController, FlowMessage, FlowStatus};
    pub use crate::model::{FlowOutcome, FlowRequest, Prompt, ServiceMessage};
    pub use crate::platform::{SystemNavigator, SystemStatus};
}

/// Check if the process has accessibility access
pub fn has_accessibility() -> bool {
    platform::current::has_accessibility()
}
