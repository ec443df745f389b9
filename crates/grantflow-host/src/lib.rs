//! grantflow-host - Running permission flows
//!
//! Threaded driver for [`grantflow_core::FlowController`] plus the places a
//! finished flow can hand its outcome to.

pub mod driver;
pub mod service;
pub mod spool;

pub use driver::{FlowDriver, FlowEnd, FlowHandle, FlowSender, Receiver, Sender};
pub use service::{ChannelService, SpoolService, StdoutService};
pub use spool::OutcomeSpool;

pub mod prelude {
    pub use crate::driver::{FlowDriver, FlowEnd, FlowHandle, FlowSender};
    pub use crate::service::{ChannelService, SpoolService, StdoutService};
    pub use crate::spool::OutcomeSpool;
}
