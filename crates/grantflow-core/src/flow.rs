//! The permission flow state machine
//!
//! A [`FlowController`] is created per invocation, started once, then fed
//! [`FlowMessage`]s as the consent prompt and settings navigation report
//! back. It produces at most one [`FlowOutcome`], and hands it to the
//! dependent service unless the request suppresses that.
//!
//! ```text
//! Init ─┬─> Finished(NotNeeded)
//!       ├─> Finished(AlreadyGranted)
//!       └─> AwaitingConsent ─┬─> Finished(Declined)
//!                            ├─> AwaitingNavigation ──> Finished(Resumed)
//!                            └─> AwaitingFallback ─┬─> AwaitingNavigation
//!                                                  └─> Abandoned
//! ```

use crate::collaborators::{
    CapabilityStatus, ConsentUi, DependentService, SettingsNavigator, SettingsScreen,
};
use crate::config::{self, ConfigSnapshot, ConfigStore, Defaults};
use crate::decision::{decide, PlatformTraits};
use crate::error::{Error, Result};
use crate::model::{FlowDecision, FlowOutcome, FlowRequest, Prompt, ServiceMessage, FALLBACK_NOTICE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_APP_ID: &str = "dev.grantflow";
/// Accessibility entry the settings screen should highlight
pub const CAPABILITY_ENTRY: &str = "input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentAnswer {
    Accept,
    Decline,
}

/// Everything that can resume a suspended flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "answer", rename_all = "snake_case")]
pub enum FlowMessage {
    Consent(ConsentAnswer),
    FallbackAcknowledged,
    FallbackDismissed,
    NavigationFinished,
}

impl FlowMessage {
    pub fn name(&self) -> &'static str {
        match self {
            FlowMessage::Consent(_) => "Consent",
            FlowMessage::FallbackAcknowledged => "FallbackAcknowledged",
            FlowMessage::FallbackDismissed => "FallbackDismissed",
            FlowMessage::NavigationFinished => "NavigationFinished",
        }
    }
}

/// How a finished flow got its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    NotNeeded,
    AlreadyGranted,
    Declined,
    Resumed,
    /// Only with `report_launch_failure` enabled
    LaunchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Init,
    AwaitingConsent { prompt: Prompt },
    AwaitingFallback,
    /// `launched` is false when even the general screen failed to open;
    /// `NavigationFinished` is then rejected and the flow never resumes.
    AwaitingNavigation { screen: SettingsScreen, launched: bool },
    /// Fallback notice dismissed. Nothing more will happen.
    Abandoned,
    Finished { termination: Termination, outcome: FlowOutcome },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Init => "Init",
            FlowState::AwaitingConsent { .. } => "AwaitingConsent",
            FlowState::AwaitingFallback => "AwaitingFallback",
            FlowState::AwaitingNavigation { .. } => "AwaitingNavigation",
            FlowState::Abandoned => "Abandoned",
            FlowState::Finished { .. } => "Finished",
        }
    }
}

/// Result of feeding the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Waiting for the next message
    Suspended,
    Finished(FlowOutcome),
    /// Will never produce an outcome
    Abandoned,
}

pub struct Collaborators {
    pub status: Arc<dyn CapabilityStatus>,
    pub config: Arc<dyn ConfigStore>,
    pub consent: Arc<dyn ConsentUi>,
    pub navigator: Arc<dyn SettingsNavigator>,
    pub service: Arc<dyn DependentService>,
}

pub struct FlowController {
    env: Collaborators,
    defaults: Defaults,
    platform: PlatformTraits,
    app_id: String,
    report_launch_failure: bool,
    request: FlowRequest,
    decision: Option<FlowDecision>,
    state: FlowState,
}

impl FlowController {
    pub fn new(env: Collaborators) -> Self {
        Self {
            env,
            defaults: Defaults::default(),
            platform: PlatformTraits::current(),
            app_id: DEFAULT_APP_ID.to_string(),
            report_launch_failure: false,
            request: FlowRequest::default(),
            decision: None,
            state: FlowState::Init,
        }
    }

    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn platform(mut self, platform: PlatformTraits) -> Self {
        self.platform = platform;
        self
    }

    /// Identifier used in the settings highlight hint
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Finish with `granted: false` instead of stalling when no settings
    /// screen at all can be opened.
    pub fn report_launch_failure(mut self, report: bool) -> Self {
        self.report_launch_failure = report;
        self
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn decision(&self) -> Option<FlowDecision> {
        self.decision
    }

    pub fn outcome(&self) -> Option<FlowOutcome> {
        match self.state {
            FlowState::Finished { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, FlowState::Finished { .. })
    }

    /// True when no settings screen could be opened and the flow waits for nothing
    pub fn is_stalled(&self) -> bool {
        matches!(self.state, FlowState::AwaitingNavigation { launched: false, .. })
    }

    pub fn start(&mut self, request: FlowRequest) -> Result<FlowStatus> {
        if self.state != FlowState::Init {
            return Err(Error::already_started());
        }
        self.request = request;

        let snapshot = ConfigSnapshot::read(self.env.config.as_ref(), &self.defaults);
        let decision = decide(&request, &snapshot, self.platform);
        self.decision = Some(decision);
        debug!(
            capability_needed = decision.capability_needed,
            auto_start_needed = decision.auto_start_needed,
            "flow decided"
        );

        let Some(prompt) = decision.prompt() else {
            return Ok(self.finish(Termination::NotNeeded, FlowOutcome::denied()));
        };

        if self.env.status.is_active() {
            return Ok(self.finish(Termination::AlreadyGranted, FlowOutcome::granted()));
        }

        self.env.consent.ask(prompt);
        self.state = FlowState::AwaitingConsent { prompt };
        Ok(FlowStatus::Suspended)
    }

    pub fn handle(&mut self, message: FlowMessage) -> Result<FlowStatus> {
        match (&self.state, message) {
            (FlowState::Finished { .. }, _) => Err(Error::flow_finished(message.name())),
            (FlowState::Init, _) => Err(Error::not_started()),
            (FlowState::AwaitingConsent { .. }, FlowMessage::Consent(ConsentAnswer::Decline)) => {
                Ok(self.finish(Termination::Declined, FlowOutcome::denied()))
            }
            (FlowState::AwaitingConsent { .. }, FlowMessage::Consent(ConsentAnswer::Accept)) => {
                Ok(self.open_accessibility())
            }
            (FlowState::AwaitingFallback, FlowMessage::FallbackAcknowledged) => {
                Ok(self.open_general())
            }
            (FlowState::AwaitingFallback, FlowMessage::FallbackDismissed) => {
                info!("fallback declined, abandoning flow");
                self.state = FlowState::Abandoned;
                Ok(FlowStatus::Abandoned)
            }
            (FlowState::AwaitingNavigation { launched: true, .. }, FlowMessage::NavigationFinished) => {
                let granted = self.env.status.is_active();
                Ok(self.finish(Termination::Resumed, FlowOutcome { granted }))
            }
            (state, message) => Err(Error::unexpected_message(message.name(), state.name())),
        }
    }

    fn open_accessibility(&mut self) -> FlowStatus {
        let screen = SettingsScreen::accessibility_for(&self.app_id, CAPABILITY_ENTRY);
        let resolution = self.env.navigator.resolve(&screen);
        if resolution.is_usable() {
            match self.env.navigator.launch(&screen) {
                Ok(()) => {
                    self.state = FlowState::AwaitingNavigation { screen, launched: true };
                    return FlowStatus::Suspended;
                }
                Err(e) => warn!(error = %e, "accessibility settings failed to open"),
            }
        } else {
            debug!(?resolution, "accessibility settings unavailable");
        }

        self.env.consent.offer_fallback(FALLBACK_NOTICE);
        self.state = FlowState::AwaitingFallback;
        FlowStatus::Suspended
    }

    fn open_general(&mut self) -> FlowStatus {
        let screen = SettingsScreen::General;
        let launched = match self.env.navigator.launch(&screen) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "general settings failed to open");
                if self.report_launch_failure {
                    return self.finish(Termination::LaunchFailed, FlowOutcome::denied());
                }
                false
            }
        };
        self.state = FlowState::AwaitingNavigation { screen, launched };
        FlowStatus::Suspended
    }

    fn finish(&mut self, termination: Termination, outcome: FlowOutcome) -> FlowStatus {
        if outcome.granted {
            info!(?termination, "accessibility enabled");
        } else {
            info!(?termination, "accessibility disabled");
        }

        if !self.request.suppress_service_start {
            let access_key = config::access_key(self.env.config.as_ref(), &self.defaults);
            if let Err(e) = self.env.service.deliver(ServiceMessage::new(outcome, access_key)) {
                error!(error = %e, "failed to notify dependent service");
            }
        }

        self.state = FlowState::Finished { termination, outcome };
        FlowStatus::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Resolution;
    use crate::config::Settings;
    use crate::testing::{FakeNavigator, Fakes, RecordingService, ScriptedStatus};
    use crate::ErrorCode;

    const NO_AUTO: PlatformTraits = PlatformTraits { supports_auto_start: false };
    const AUTO: PlatformTraits = PlatformTraits { supports_auto_start: true };

    fn settings(view_only: bool) -> Settings {
        Settings {
            view_only: Some(view_only),
            start_on_boot: Some(false),
            access_key: Some("key-1".into()),
        }
    }

    fn controller(fakes: &Fakes) -> FlowController {
        FlowController::new(fakes.collaborators()).platform(NO_AUTO)
    }

    #[test]
    fn nothing_needed_finishes_without_ui() {
        let fakes = Fakes::new(ScriptedStatus::fixed(true), settings(true), FakeNavigator::default());
        let mut flow = controller(&fakes);

        let status = flow.start(FlowRequest::new()).unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::denied()));
        assert!(!fakes.consent.shown_anything());
        // status provider is not consulted before the needs check
        assert_eq!(fakes.status.queries(), 0);
        let msgs = fakes.service.messages();
        assert_eq!(msgs.len(), 1);
        assert!(!msgs[0].outcome.granted);
    }

    #[test]
    fn already_active_finishes_granted_without_ui() {
        let fakes = Fakes::new(ScriptedStatus::fixed(true), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        let status = flow.start(FlowRequest::new()).unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
        assert!(!fakes.consent.shown_anything());
        assert_eq!(
            flow.state(),
            &FlowState::Finished {
                termination: Termination::AlreadyGranted,
                outcome: FlowOutcome::granted()
            }
        );
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn auto_start_alone_still_prompts() {
        let mut s = settings(true);
        s.start_on_boot = Some(true);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), s, FakeNavigator::default());
        let mut flow = FlowController::new(fakes.collaborators()).platform(AUTO);

        assert_eq!(flow.start(FlowRequest::new()).unwrap(), FlowStatus::Suspended);
        assert_eq!(fakes.consent.prompts(), vec![Prompt::AutoStart]);
    }

    #[test]
    fn decline_reports_denied() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        assert_eq!(flow.start(FlowRequest::new()).unwrap(), FlowStatus::Suspended);
        assert_eq!(fakes.consent.prompts(), vec![Prompt::Input]);

        let status = flow.handle(FlowMessage::Consent(ConsentAnswer::Decline)).unwrap();
        assert_eq!(status, FlowStatus::Finished(FlowOutcome::denied()));
        assert!(fakes.navigator.launched().is_empty());
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn accept_then_resume_rereads_status() {
        let fakes = Fakes::new(
            ScriptedStatus::new(&[false, true]),
            settings(false),
            FakeNavigator::default(),
        );
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        assert_eq!(
            flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap(),
            FlowStatus::Suspended
        );
        assert_eq!(
            fakes.navigator.launched(),
            vec![SettingsScreen::Accessibility {
                highlight: Some(format!("{}/{}", DEFAULT_APP_ID, CAPABILITY_ENTRY))
            }]
        );

        let status = flow.handle(FlowMessage::NavigationFinished).unwrap();
        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
        assert_eq!(fakes.status.queries(), 2);
        assert!(fakes.service.messages()[0].outcome.granted);
    }

    #[test]
    fn resume_can_still_be_denied() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        let status = flow.handle(FlowMessage::NavigationFinished).unwrap();
        assert_eq!(status, FlowStatus::Finished(FlowOutcome::denied()));
    }

    #[test]
    fn access_key_is_read_at_emission() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        fakes.config.update(|s| s.access_key = Some("key-2".into()));
        flow.handle(FlowMessage::Consent(ConsentAnswer::Decline)).unwrap();

        assert_eq!(fakes.service.messages()[0].access_key, "key-2");
    }

    #[test]
    fn suppressed_service_gets_nothing() {
        let fakes = Fakes::new(ScriptedStatus::fixed(true), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        let status = flow
            .start(FlowRequest::new().suppress_service_start(true))
            .unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
        assert!(fakes.service.messages().is_empty());
        assert_eq!(flow.outcome(), Some(FlowOutcome::granted()));
    }

    #[test]
    fn suppressed_service_gets_nothing_after_decline() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new().suppress_service_start(true)).unwrap();
        let status = flow.handle(FlowMessage::Consent(ConsentAnswer::Decline)).unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::denied()));
        assert!(fakes.service.messages().is_empty());
    }

    #[test]
    fn suppressed_service_gets_nothing_after_resume() {
        let fakes = Fakes::new(
            ScriptedStatus::new(&[false, true]),
            settings(false),
            FakeNavigator::default(),
        );
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new().suppress_service_start(true)).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        let status = flow.handle(FlowMessage::NavigationFinished).unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
        assert!(fakes.service.messages().is_empty());
        assert_eq!(flow.outcome(), Some(FlowOutcome::granted()));
    }

    #[test]
    fn override_beats_stored_view_only() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(true), FakeNavigator::default());
        let mut flow = controller(&fakes);

        assert_eq!(
            flow.start(FlowRequest::new().view_only(false)).unwrap(),
            FlowStatus::Suspended
        );
        assert!(flow.decision().unwrap().capability_needed);
    }

    #[test]
    fn stub_handler_triggers_fallback() {
        let nav = FakeNavigator::default().accessibility(Resolution::Resolved {
            handler: "SettingsStub".into(),
        });
        let fakes = Fakes::new(ScriptedStatus::new(&[false, true]), settings(false), nav);
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        assert_eq!(flow.state(), &FlowState::AwaitingFallback);
        assert_eq!(fakes.consent.notices(), vec![FALLBACK_NOTICE.to_string()]);

        flow.handle(FlowMessage::FallbackAcknowledged).unwrap();
        assert_eq!(fakes.navigator.launched(), vec![SettingsScreen::General]);

        let status = flow.handle(FlowMessage::NavigationFinished).unwrap();
        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
    }

    #[test]
    fn failed_accessibility_launch_falls_back() {
        let nav = FakeNavigator::default().accessibility_launches(false);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), nav);
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        assert_eq!(flow.state(), &FlowState::AwaitingFallback);
    }

    #[test]
    fn double_fallback_failure_stalls_without_outcome() {
        let nav = FakeNavigator::default()
            .accessibility(Resolution::Unresolved)
            .general_launches(false);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), nav);
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        let status = flow.handle(FlowMessage::FallbackAcknowledged).unwrap();

        assert_eq!(status, FlowStatus::Suspended);
        assert!(flow.is_stalled());
        assert!(!flow.is_finished());
        assert!(fakes.service.messages().is_empty());
        assert!(fakes.navigator.launched().is_empty());

        // nothing was opened, so a stray completion must not resume the flow
        let err = flow.handle(FlowMessage::NavigationFinished).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedMessage);
        assert!(flow.is_stalled());
        assert!(fakes.service.messages().is_empty());
    }

    #[test]
    fn double_fallback_failure_can_be_reported() {
        let nav = FakeNavigator::default()
            .accessibility(Resolution::Unresolved)
            .general_launches(false);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), nav);
        let mut flow = controller(&fakes).report_launch_failure(true);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        let status = flow.handle(FlowMessage::FallbackAcknowledged).unwrap();

        assert_eq!(status, FlowStatus::Finished(FlowOutcome::denied()));
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn dismissed_fallback_abandons() {
        let nav = FakeNavigator::default().accessibility(Resolution::Unresolved);
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), nav);
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap();
        assert_eq!(
            flow.handle(FlowMessage::FallbackDismissed).unwrap(),
            FlowStatus::Abandoned
        );
        assert!(fakes.service.messages().is_empty());

        let err = flow.handle(FlowMessage::NavigationFinished).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedMessage);
    }

    #[test]
    fn only_one_outcome_per_flow() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        flow.start(FlowRequest::new()).unwrap();
        flow.handle(FlowMessage::Consent(ConsentAnswer::Decline)).unwrap();

        let err = flow.handle(FlowMessage::Consent(ConsentAnswer::Accept)).unwrap_err();
        assert_eq!(err.code, ErrorCode::FlowFinished);
        let err = flow.handle(FlowMessage::NavigationFinished).unwrap_err();
        assert_eq!(err.code, ErrorCode::FlowFinished);
        assert_eq!(fakes.service.messages().len(), 1);
    }

    #[test]
    fn protocol_misuse_is_rejected() {
        let fakes = Fakes::new(ScriptedStatus::fixed(false), settings(false), FakeNavigator::default());
        let mut flow = controller(&fakes);

        let err = flow.handle(FlowMessage::NavigationFinished).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotStarted);

        flow.start(FlowRequest::new()).unwrap();
        let err = flow.start(FlowRequest::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyStarted);

        let err = flow.handle(FlowMessage::NavigationFinished).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedMessage);
        assert_eq!(flow.state(), &FlowState::AwaitingConsent { prompt: Prompt::Input });
    }

    #[test]
    fn delivery_failure_still_finishes() {
        let fakes = Fakes::new(ScriptedStatus::fixed(true), settings(false), FakeNavigator::default())
            .with_service(RecordingService::failing());
        let mut flow = controller(&fakes);

        let status = flow.start(FlowRequest::new()).unwrap();
        assert_eq!(status, FlowStatus::Finished(FlowOutcome::granted()));
        assert!(flow.is_finished());
    }
}
