//! Dependent service endpoints
//!
//! The flow hands its single [`ServiceMessage`] to one of these. Which one a
//! host uses is a deployment detail; the message is the same.

use crate::driver::{Receiver, Sender};
use crate::spool::OutcomeSpool;
use crossbeam_channel::unbounded;
use grantflow_core::{DependentService, Error, ServiceMessage};
use std::io::Write;

/// In-process service: messages go to a channel the service thread reads
pub struct ChannelService {
    tx: Sender<ServiceMessage>,
}

impl ChannelService {
    pub fn new() -> (Self, Receiver<ServiceMessage>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl DependentService for ChannelService {
    fn deliver(&self, message: ServiceMessage) -> grantflow_core::Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::service_unavailable("service channel closed"))
    }
}

/// Appends the message to the outcome spool for a separate service process
pub struct SpoolService {
    spool: OutcomeSpool,
}

impl SpoolService {
    pub fn new(spool: OutcomeSpool) -> Self {
        Self { spool }
    }
}

impl DependentService for SpoolService {
    fn deliver(&self, message: ServiceMessage) -> grantflow_core::Result<()> {
        self.spool
            .append(&message)
            .map_err(|e| Error::service_unavailable(format!("{:#}", e)))
    }
}

/// Prints the message as one JSON line on stdout
pub struct StdoutService;

impl DependentService for StdoutService {
    fn deliver(&self, message: ServiceMessage) -> grantflow_core::Result<()> {
        write_line(&mut std::io::stdout().lock(), &message)
    }
}

fn write_line(out: &mut impl Write, message: &ServiceMessage) -> grantflow_core::Result<()> {
    serde_json::to_writer(&mut *out, message)
        .map_err(|e| Error::service_unavailable(format!("encoding outcome: {}", e)))?;
    writeln!(out)
        .and_then(|_| out.flush())
        .map_err(|e| Error::service_unavailable(format!("writing outcome: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantflow_core::FlowOutcome;

    #[test]
    fn channel_service_forwards() {
        let (service, rx) = ChannelService::new();
        service
            .deliver(ServiceMessage::new(FlowOutcome::granted(), "k"))
            .unwrap();
        let msg = rx.try_recv().unwrap();
        assert!(msg.outcome.granted);
        assert_eq!(msg.access_key, "k");
    }

    #[test]
    fn closed_channel_is_service_unavailable() {
        let (service, rx) = ChannelService::new();
        drop(rx);
        let err = service
            .deliver(ServiceMessage::new(FlowOutcome::denied(), ""))
            .unwrap_err();
        assert_eq!(err.code, grantflow_core::ErrorCode::ServiceUnavailable);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stdout_line_is_one_json_object() {
        let mut buf = Vec::new();
        write_line(&mut buf, &ServiceMessage::new(FlowOutcome::granted(), "k")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        let back: ServiceMessage = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(back.access_key, "k");
    }

    #[test]
    fn unwritable_stdout_is_service_unavailable() {
        let err = write_line(&mut BrokenPipe, &ServiceMessage::new(FlowOutcome::denied(), ""))
            .unwrap_err();
        assert_eq!(err.code, grantflow_core::ErrorCode::ServiceUnavailable);
    }
}
