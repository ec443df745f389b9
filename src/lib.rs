//! # grantflow
//!
//! Acquire accessibility (input control) access with one consent prompt and
//! one trip to the system settings, then tell the service that needs it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grantflow::prelude::*;
//! use std::sync::Arc;
//!
//! # struct Dialog;
//! # impl ConsentUi for Dialog {
//! #     fn ask(&self, _: Prompt) {}
//! #     fn offer_fallback(&self, _: &str) {}
//! # }
//! let (service, outcomes) = ChannelService::new();
//! let controller = FlowController::new(Collaborators {
//!     status: Arc::new(SystemStatus),
//!     config: Arc::new(JsonConfigStore::new()?),
//!     consent: Arc::new(Dialog),
//!     navigator: Arc::new(SystemNavigator),
//!     service: Arc::new(service),
//! });
//! let handle = FlowDriver::spawn(controller, FlowRequest::new())?;
//! handle.send(FlowMessage::Consent(ConsentAnswer::Accept));
//! // ... settings screen closes
//! handle.send(FlowMessage::NavigationFinished);
//! println!("{:?}", handle.wait());
//! println!("{:?}", outcomes.recv()?);
//! # Ok::<(), anyhow::Error>(())
//! ```

// Re-export core flow
pub use grantflow_core::*;

// Re-export host module
pub use grantflow_host as host;

pub use grantflow_host::{
    ChannelService, FlowDriver, FlowEnd, FlowHandle, FlowSender, OutcomeSpool, SpoolService,
    StdoutService,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use grantflow_core::prelude::*;
    pub use grantflow_host::prelude::*;
}
