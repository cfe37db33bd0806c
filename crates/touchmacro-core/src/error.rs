//! Structured errors for macro authoring, storage and playback

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::EngineError;
use crate::gesture::DispatchError;

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
    MacroNotFound,
    DuplicateMacro,
    EmptyMacro,
    AlreadyRunning,
    InvalidCommand,
    DecodeFailed,
    DispatchFailed,
    StorageFailed,
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

    pub fn macro_not_found(id: &str) -> Self {
        Self::new(ErrorCode::MacroNotFound, format!("No macro with id: {}", id))
            .with_suggestions(vec!["Run `tm list` to see stored macro ids".to_string()])
    }

    pub fn duplicate_macro(id: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateMacro,
            format!("A macro with id {} already exists", id),
        )
    }

    pub fn empty_macro(name: Option<&str>) -> Self {
        let message = match name {
            Some(name) => format!("Macro '{}' has no actions", name),
            None => "Macro is missing or has no actions".to_string(),
        };
        Self::new(ErrorCode::EmptyMacro, message)
    }

    pub fn already_running() -> Self {
        Self::new(ErrorCode::AlreadyRunning, "A macro is already running")
            .with_suggestions(vec!["Stop the current run before starting another".to_string()])
    }

    pub fn invalid_command(line: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::InvalidCommand,
            format!("Invalid command '{}': {}", line, reason),
        )
        .with_suggestions(vec![
            "tap,<x>,<y>".to_string(),
            "swipe,<startX>,<startY>,<endX>,<endY>,<durationMs>".to_string(),
            "delay,<delayMs>".to_string(),
        ])
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DecodeFailed, message)
    }

    pub fn dispatch_failed(reason: &str) -> Self {
        Self::new(
            ErrorCode::DispatchFailed,
            format!("Gesture dispatch failed: {}", reason),
        )
    }

    pub fn storage_failed(op: &str, reason: &str) -> Self {
        Self::new(ErrorCode::StorageFailed, format!("{} failed: {}", op, reason))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::EmptyMacro => Self::empty_macro(None),
            EngineError::AlreadyRunning => Self::already_running(),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::dispatch_failed(&e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, format!("{:#}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_screaming_codes_and_skips_empty_fields() {
        let json = serde_json::to_value(Error::new(ErrorCode::EmptyMacro, "nothing")).unwrap();
        assert_eq!(json["code"], "EMPTY_MACRO");
        assert!(json.get("suggestions").is_none());
        assert!(json.get("context").is_none());
    }

    #[test]
    fn engine_and_dispatch_errors_map_to_codes() {
        assert_eq!(Error::from(EngineError::AlreadyRunning).code, ErrorCode::AlreadyRunning);
        let e = Error::from(DispatchError::Unavailable("no device".into()));
        assert_eq!(e.code, ErrorCode::DispatchFailed);
        assert!(e.message.contains("no device"));
    }

    #[test]
    fn display_carries_code() {
        assert_eq!(
            Error::macro_not_found("9").to_string(),
            "[MacroNotFound] No macro with id: 9"
        );
    }
}
