//! Device session capability traits.
//!
//! The engine consumes a remote command-execution capability; it does not
//! implement a transport. A real SSH client plugs in behind
//! [`DeviceConnector`]; tests and dry runs use the scripted fakes from the
//! [`fakes`](crate::fakes) module.
//!
//! Guarantees expected from implementations:
//! - `connect` and `execute` are fallible and side-effecting on the real
//!   device; the engine never assumes a command is idempotent unless the
//!   action issuing it enforces that.
//! - Errors carry enough context to distinguish connection-class failures
//!   (retryable) from command rejections (terminal).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::Device;

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// An open command-execution session to one device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Execute a single command and return its output.
    async fn execute(&mut self, command: &str) -> SessionResult<String>;

    /// Close the session. Errors on close are not fatal to an action.
    async fn close(&mut self) -> SessionResult<()>;
}

/// Opens sessions to devices. One connector serves the whole run and must
/// be safe to call concurrently for different devices.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self, device: &Device) -> SessionResult<Box<dyn DeviceSession>>;
}

/// Bounded retry policy for connection-class failures.
///
/// Whether to back off at a fixed interval or exponentially is a caller
/// decision, not a constant of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backoff", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Retry up to `attempts` times, sleeping `interval_ms` between tries.
    Fixed { attempts: u32, interval_ms: u64 },
    /// Retry up to `attempts` times, doubling the delay from `base_ms`.
    Exponential { attempts: u32, base_ms: u64 },
}

impl RetryPolicy {
    /// Maximum number of retries (not counting the first attempt).
    pub fn attempts(&self) -> u32 {
        match self {
            RetryPolicy::Fixed { attempts, .. } | RetryPolicy::Exponential { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Fixed { interval_ms, .. } => Duration::from_millis(*interval_ms),
            RetryPolicy::Exponential { base_ms, .. } => {
                Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
            }
        }
    }

    /// No retries at all. Useful in tests.
    pub fn none() -> Self {
        RetryPolicy::Fixed {
            attempts: 0,
            interval_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Fixed {
            attempts: 2,
            interval_ms: 500,
        }
    }
}
