//! Error types for the orchestration engine.
//!
//! Only two classes are fatal for a run: [`ValidationError`] (pre-flight,
//! before any device is touched) and [`GraphError`] (malformed phase graph,
//! raised at construction). Everything device-level is converted into a
//! per-device outcome at the executor boundary and never propagates further.

use thiserror::Error;

use crate::validate::Violation;

/// Errors raised by a device session (connect or command round-trip).
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Transport-level failure reaching the device. Retryable.
    #[error("connection to {device} failed: {reason}")]
    Connection { device: String, reason: String },

    /// The action exceeded its time budget. Treated as connection-class.
    #[error("timeout on {device}: {detail}")]
    Timeout { device: String, detail: String },

    /// The device refused a directive. Never retried.
    #[error("device {device} rejected `{command}`: {reason}")]
    CommandRejected {
        device: String,
        command: String,
        reason: String,
    },
}

impl SessionError {
    /// Connection and timeout failures are transient and eligible for the
    /// bounded retry policy; a rejected command is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. } | SessionError::Timeout { .. }
        )
    }
}

/// Error returned by a phase action for one device.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Anything that is not a session failure (e.g. a failed backup write).
    /// Never retried.
    #[error("{0}")]
    Fatal(String),
}

impl ActionError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        ActionError::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::Session(s) if s.is_retryable())
    }
}

/// Structural problems in the declared phase graph, detected at
/// construction. The orchestrator never starts when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("phase graph contains a cycle involving: {}", phases.join(", "))]
    Cycle { phases: Vec<String> },

    #[error("phase '{phase}' depends on unknown phase '{predecessor}'")]
    UnknownPredecessor { phase: String, predecessor: String },

    #[error("duplicate phase name '{0}'")]
    DuplicatePhase(String),
}

/// Pre-flight validation failure. Aborts the entire run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed with {} violation(s)", violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}
