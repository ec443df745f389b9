//! Recording collaborators for tests

use crate::collaborators::{
    CapabilityStatus, ConsentUi, DependentService, LaunchError, Resolution, SettingsNavigator,
    SettingsScreen,
};
use crate::config::{MemoryConfigStore, Settings};
use crate::error::{Error, Result};
use crate::flow::Collaborators;
use crate::model::{Prompt, ServiceMessage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Answers `is_active` from a script; the last value repeats
pub struct ScriptedStatus {
    values: Mutex<VecDeque<bool>>,
    queries: Mutex<usize>,
}

impl ScriptedStatus {
    pub fn new(values: &[bool]) -> Self {
        Self {
            values: Mutex::new(values.iter().copied().collect()),
            queries: Mutex::new(0),
        }
    }

    pub fn fixed(active: bool) -> Self {
        Self::new(&[active])
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock()
    }
}

impl CapabilityStatus for ScriptedStatus {
    fn is_active(&self) -> bool {
        *self.queries.lock() += 1;
        let mut values = self.values.lock();
        if values.len() > 1 {
            values.pop_front().unwrap_or(false)
        } else {
            values.front().copied().unwrap_or(false)
        }
    }
}

#[derive(Default)]
pub struct RecordingConsent {
    prompts: Mutex<Vec<Prompt>>,
    notices: Mutex<Vec<String>>,
}

impl RecordingConsent {
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    pub fn shown_anything(&self) -> bool {
        !self.prompts.lock().is_empty() || !self.notices.lock().is_empty()
    }
}

impl ConsentUi for RecordingConsent {
    fn ask(&self, prompt: Prompt) {
        self.prompts.lock().push(prompt);
    }

    fn offer_fallback(&self, notice: &str) {
        self.notices.lock().push(notice.to_string());
    }
}

/// Navigator whose resolution and launch results are set per screen
pub struct FakeNavigator {
    accessibility: Resolution,
    accessibility_launches: bool,
    general_launches: bool,
    launched: Mutex<Vec<SettingsScreen>>,
}

impl Default for FakeNavigator {
    fn default() -> Self {
        Self {
            accessibility: Resolution::Resolved {
                handler: "Accessibility".to_string(),
            },
            accessibility_launches: true,
            general_launches: true,
            launched: Mutex::new(Vec::new()),
        }
    }
}

impl FakeNavigator {
    pub fn accessibility(mut self, resolution: Resolution) -> Self {
        self.accessibility = resolution;
        self
    }

    pub fn accessibility_launches(mut self, ok: bool) -> Self {
        self.accessibility_launches = ok;
        self
    }

    pub fn general_launches(mut self, ok: bool) -> Self {
        self.general_launches = ok;
        self
    }

    pub fn launched(&self) -> Vec<SettingsScreen> {
        self.launched.lock().clone()
    }
}

impl SettingsNavigator for FakeNavigator {
    fn resolve(&self, screen: &SettingsScreen) -> Resolution {
        match screen {
            SettingsScreen::Accessibility { .. } => self.accessibility.clone(),
            SettingsScreen::General => Resolution::Resolved {
                handler: "Settings".to_string(),
            },
        }
    }

    fn launch(&self, screen: &SettingsScreen) -> std::result::Result<(), LaunchError> {
        let ok = match screen {
            SettingsScreen::Accessibility { .. } => self.accessibility_launches,
            SettingsScreen::General => self.general_launches,
        };
        if !ok {
            return Err(LaunchError::NotFound(screen.name()));
        }
        self.launched.lock().push(screen.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingService {
    messages: Mutex<Vec<ServiceMessage>>,
    fail: bool,
}

impl RecordingService {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<ServiceMessage> {
        self.messages.lock().clone()
    }
}

impl DependentService for RecordingService {
    fn deliver(&self, message: ServiceMessage) -> Result<()> {
        if self.fail {
            return Err(Error::service_unavailable("service refused the message"));
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Handles on every fake so tests can inspect them after the flow ran
pub struct Fakes {
    pub status: Arc<ScriptedStatus>,
    pub config: Arc<MemoryConfigStore>,
    pub consent: Arc<RecordingConsent>,
    pub navigator: Arc<FakeNavigator>,
    pub service: Arc<RecordingService>,
}

impl Fakes {
    pub fn new(status: ScriptedStatus, settings: Settings, navigator: FakeNavigator) -> Self {
        Self {
            status: Arc::new(status),
            config: Arc::new(MemoryConfigStore::new(settings)),
            consent: Arc::new(RecordingConsent::default()),
            navigator: Arc::new(navigator),
            service: Arc::new(RecordingService::default()),
        }
    }

    pub fn with_service(mut self, service: RecordingService) -> Self {
        self.service = Arc::new(service);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            status: self.status.clone(),
            config: self.config.clone(),
            consent: self.consent.clone(),
            navigator: self.navigator.clone(),
            service: self.service.clone(),
        }
    }
}
