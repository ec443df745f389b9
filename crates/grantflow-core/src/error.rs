//! Structured errors for flow hosts and tooling

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyStarted,
    NotStarted,
    UnexpectedMessage,
    FlowFinished,
    ConfigInvalid,
    ServiceUnavailable,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn already_started() -> Self {
        Self::new(ErrorCode::AlreadyStarted, "Flow was already started")
            .with_suggestions(vec!["Create a new FlowController per invocation".to_string()])
    }

    pub fn not_started() -> Self {
        Self::new(ErrorCode::NotStarted, "Flow has not been started")
    }

    pub fn unexpected_message(message: &str, state: &str) -> Self {
        Self::new(
            ErrorCode::UnexpectedMessage,
            format!("Message {} is not accepted in state {}", message, state),
        )
    }

    pub fn flow_finished(message: &str) -> Self {
        Self::new(
            ErrorCode::FlowFinished,
            format!("Flow already produced its outcome, dropping {}", message),
        )
    }

    pub fn config_invalid(path: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalid,
            format!("Invalid settings file '{}': {}", path, reason),
        )
    }

    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, reason)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::ConfigInvalid, e.to_string())
    }
}
