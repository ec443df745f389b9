//! Values that live for exactly one flow invocation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of the triggering invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRequest {
    /// Do not notify the dependent service when the flow finishes
    #[serde(default)]
    pub suppress_service_start: bool,
    /// Explicit view-only flag. Takes precedence over the stored setting;
    /// input access is needed iff this is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_only_override: Option<bool>,
}

impl FlowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress_service_start(mut self, suppress: bool) -> Self {
        self.suppress_service_start = suppress;
        self
    }

    pub fn view_only(mut self, view_only: bool) -> Self {
        self.view_only_override = Some(view_only);
        self
    }
}

/// What the flow has to ask for, computed once at start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDecision {
    pub capability_needed: bool,
    pub auto_start_needed: bool,
}

impl FlowDecision {
    pub fn anything_needed(&self) -> bool {
        self.capability_needed || self.auto_start_needed
    }

    /// Prompt variant for this decision, `None` if nothing is needed
    pub fn prompt(&self) -> Option<Prompt> {
        match (self.capability_needed, self.auto_start_needed) {
            (true, true) => Some(Prompt::InputAndAutoStart),
            (true, false) => Some(Prompt::Input),
            (false, true) => Some(Prompt::AutoStart),
            (false, false) => None,
        }
    }
}

/// The single terminal result of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOutcome {
    pub granted: bool,
}

impl FlowOutcome {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

/// Consent prompt variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    Input,
    AutoStart,
    InputAndAutoStart,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        "Accessibility access"
    }

    pub fn message(&self) -> &'static str {
        match self {
            Prompt::Input => {
                "Remote input requires accessibility access. Open the accessibility settings and enable it now?"
            }
            Prompt::AutoStart => {
                "Starting on login requires accessibility access. Open the accessibility settings and enable it now?"
            }
            Prompt::InputAndAutoStart => {
                "Remote input and starting on login require accessibility access. Open the accessibility settings and enable it now?"
            }
        }
    }
}

/// Text of the notice shown when the accessibility screen cannot be opened
pub const FALLBACK_NOTICE: &str =
    "The accessibility settings screen could not be found on this system. Open the general settings instead?";

/// The one-shot notification handed to the dependent service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    pub outcome: FlowOutcome,
    pub access_key: String,
    pub sent_at: DateTime<Utc>,
}

impl ServiceMessage {
    pub fn new(outcome: FlowOutcome, access_key: impl Into<String>) -> Self {
        Self {
            outcome,
            access_key: access_key.into(),
            sent_at: Utc::now(),
        }
    }
}
