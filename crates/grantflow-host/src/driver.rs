//! Threaded flow driver
//!
//! Owns a [`FlowController`] on its own thread and feeds it messages in the
//! order they arrive on a channel. Platform callbacks (dialog buttons,
//! settings screen closing) only need a [`Sender`].

use anyhow::{Context, Result};
pub use crossbeam_channel::{Receiver, Sender};
use crossbeam_channel::{bounded, unbounded};
use grantflow_core::{FlowController, FlowMessage, FlowOutcome, FlowRequest, FlowStatus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How a driven flow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEnd {
    Finished(FlowOutcome),
    /// Fallback dismissed, no outcome
    Abandoned,
    /// Handle cancelled or dropped while suspended, no outcome
    Cancelled,
}

impl FlowEnd {
    pub fn outcome(&self) -> Option<FlowOutcome> {
        match self {
            FlowEnd::Finished(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

enum Input {
    Message(FlowMessage),
    Cancel,
}

/// Cheap, cloneable way to post messages into a running flow
#[derive(Clone)]
pub struct FlowSender {
    tx: Sender<Input>,
}

impl FlowSender {
    /// Returns false once the flow has ended
    pub fn send(&self, message: FlowMessage) -> bool {
        self.tx.send(Input::Message(message)).is_ok()
    }
}

/// Running flow - owns the controller thread
pub struct FlowHandle {
    tx: Sender<Input>,
    end_rx: Receiver<FlowEnd>,
    end: Mutex<Option<FlowEnd>>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FlowHandle {
    pub fn sender(&self) -> FlowSender {
        FlowSender { tx: self.tx.clone() }
    }

    pub fn send(&self, message: FlowMessage) -> bool {
        self.tx.send(Input::Message(message)).is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Non-blocking check for the end of the flow
    pub fn try_end(&self) -> Option<FlowEnd> {
        let mut end = self.end.lock();
        if end.is_none() {
            *end = self.end_rx.try_recv().ok();
        }
        *end
    }

    /// Block until the flow ends. A stalled flow never ends on its own.
    pub fn wait(mut self) -> FlowEnd {
        let end = self.receive(None).unwrap_or(FlowEnd::Cancelled);
        self.join();
        end
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<FlowEnd> {
        self.receive(Some(timeout))
    }

    /// Discard the flow without producing an outcome
    pub fn cancel(mut self) -> FlowEnd {
        let _ = self.tx.send(Input::Cancel);
        let end = self.receive(None).unwrap_or(FlowEnd::Cancelled);
        self.join();
        end
    }

    fn receive(&self, timeout: Option<Duration>) -> Option<FlowEnd> {
        let mut end = self.end.lock();
        if end.is_none() {
            *end = match timeout {
                Some(t) => self.end_rx.recv_timeout(t).ok(),
                None => self.end_rx.recv().ok(),
            };
        }
        *end
    }

    fn join(&mut self) {
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for FlowHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.tx.send(Input::Cancel);
            self.join();
        }
    }
}

pub struct FlowDriver;

impl FlowDriver {
    /// Start `controller` on a new thread. `start` runs before this returns,
    /// so any prompt has been shown by then.
    pub fn spawn(mut controller: FlowController, request: FlowRequest) -> Result<FlowHandle> {
        let (tx, rx) = unbounded::<Input>();
        let (end_tx, end_rx) = bounded::<FlowEnd>(1);
        let (ready_tx, ready_rx) = bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();

        let thread = thread::Builder::new()
            .name("grantflow".into())
            .spawn(move || {
                let first = controller.start(request);
                let _ = ready_tx.send(());
                let end = match first {
                    Ok(status) => drive(&mut controller, status, &rx),
                    Err(e) => {
                        warn!(error = %e, "flow failed to start");
                        FlowEnd::Cancelled
                    }
                };
                r.store(false, Ordering::SeqCst);
                let _ = end_tx.send(end);
            })
            .context("failed to spawn flow thread")?;

        ready_rx.recv().context("flow thread exited before starting")?;

        Ok(FlowHandle {
            tx,
            end_rx,
            end: Mutex::new(None),
            running,
            thread: Some(thread),
        })
    }
}

fn drive(controller: &mut FlowController, mut status: FlowStatus, rx: &Receiver<Input>) -> FlowEnd {
    loop {
        match status {
            FlowStatus::Finished(outcome) => return FlowEnd::Finished(outcome),
            FlowStatus::Abandoned => return FlowEnd::Abandoned,
            FlowStatus::Suspended => {}
        }

        let message = match rx.recv() {
            Ok(Input::Message(m)) => m,
            Ok(Input::Cancel) | Err(_) => {
                debug!(state = controller.state().name(), "flow cancelled while suspended");
                return FlowEnd::Cancelled;
            }
        };

        status = match controller.handle(message) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "ignoring message");
                FlowStatus::Suspended
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantflow_core::testing::{FakeNavigator, Fakes, ScriptedStatus};
    use grantflow_core::{ConsentAnswer, PlatformTraits, Resolution, Settings};

    fn input_settings() -> Settings {
        Settings {
            view_only: Some(false),
            start_on_boot: Some(false),
            access_key: Some("k".into()),
        }
    }

    fn controller(fakes: &Fakes) -> FlowController {
        FlowController::new(fakes.collaborators()).platform(PlatformTraits {
            supports_auto_start: false,
        })
    }

    #[test]
    fn short_circuit_ends_immediately() {
        let fakes = Fakes::new(ScriptedStatus::fixed(true), input_settings(), FakeNavigator::default());
        let handle = FlowDriver::spawn(controller(&fakes), FlowRequest::new()).unwrap();

        assert_eq!(handle.wait(), FlowEnd::Finished(FlowOutcome::granted()));
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn messages_drive_flow_to_outcome() {
        let fakes = Fakes::new(
            ScriptedStatus::new(&[false, true]),
            input_settings(),
            FakeNavigator::default(),
        );
        let handle = FlowDriver::spawn(controller(&fakes), FlowRequest::new()).unwrap();
        assert_eq!(fakes.consent.prompts().len(), 1);

        let sender = handle.sender();
        assert!(sender.send(FlowMessage::Consent(ConsentAnswer::Accept)));
        assert!(sender.send(FlowMessage::NavigationFinished));

        assert_eq!(handle.wait(), FlowEnd::Finished(FlowOutcome::granted()));
        assert!(!sender.send(FlowMessage::NavigationFinished));
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn stray_messages_are_ignored() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), input_settings(), FakeNavigator::default());
        let handle = FlowDriver::spawn(controller(&fakes), FlowRequest::new()).unwrap();

        handle.send(FlowMessage::NavigationFinished);
        handle.send(FlowMessage::Consent(ConsentAnswer::Decline));

        assert_eq!(handle.wait(), FlowEnd::Finished(FlowOutcome::denied()));
    }

    #[test]
    fn stalled_flow_can_be_cancelled() {
        let nav = FakeNavigator::default()
            .accessibility(Resolution::Unresolved)
            .general_launches(false);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), input_settings(), nav);
        let handle = FlowDriver::spawn(controller(&fakes), FlowRequest::new()).unwrap();

        handle.send(FlowMessage::Consent(ConsentAnswer::Accept));
        handle.send(FlowMessage::FallbackAcknowledged);

        assert_eq!(handle.wait_timeout(Duration::from_millis(100)), None);
        assert!(handle.is_running());
        assert_eq!(handle.cancel(), FlowEnd::Cancelled);
        assert!(fakes.service.messages().is_empty());
    }

    #[test]
    fn dismissed_fallback_is_abandoned() {
        let nav = FakeNavigator::default().accessibility(Resolution::Unresolved);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), input_settings(), nav);
        let handle = FlowDriver::spawn(controller(&fakes), FlowRequest::new()).unwrap();

        handle.send(FlowMessage::Consent(ConsentAnswer::Accept));
        handle.send(FlowMessage::FallbackDismissed);

        assert_eq!(handle.wait(), FlowEnd::Abandoned);
        assert!(fakes.service.messages().is_empty());
    }
}
