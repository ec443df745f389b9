//! Pure decision: what does this invocation need to ask for?

use crate::config::ConfigSnapshot;
use crate::model::{FlowDecision, FlowRequest};

/// Platform facts that influence the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTraits {
    /// Launching on login depends on accessibility access here
    pub supports_auto_start: bool,
}

impl PlatformTraits {
    pub fn current() -> Self {
        Self {
            supports_auto_start: cfg!(target_os = "macos"),
        }
    }
}

pub fn decide(request: &FlowRequest, snapshot: &ConfigSnapshot, platform: PlatformTraits) -> FlowDecision {
    let auto_start_needed = platform.supports_auto_start && snapshot.start_on_boot;
    let capability_needed = match request.view_only_override {
        Some(view_only) => !view_only,
        None => !snapshot.view_only,
    };
    FlowDecision {
        capability_needed,
        auto_start_needed,
    }
}
