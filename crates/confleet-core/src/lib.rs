//! confleet-core: declarative configuration orchestration for network
//! device fleets.
//!
//! The engine takes an inventory of devices and a set of per-device
//! configuration intents, validates them, renders platform command
//! sequences, and pushes them across the fleet in dependency-ordered
//! phases with bounded concurrency, retries, and cooperative
//! cancellation. The outcome of every (phase, device) pair lands in a
//! [`report::RunReport`].
//!
//! Transport is abstracted behind [`session::DeviceConnector`]; the
//! crate ships a scripted in-memory implementation in [`fakes`] for
//! tests and dry runs.

pub mod actions;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod graph;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod validate;

pub use error::{ActionError, GraphError, SessionError, ValidationError};
pub use executor::{CancelToken, ExecutorConfig, PhaseExecutor};
pub use model::{ConfigIntent, Device, DeviceIntent, DeviceKind, Inventory};
pub use orchestrator::{Orchestrator, Phase, PhaseAction};
pub use report::{DeviceOutcome, RunReport, RunStatus};
pub use session::{DeviceConnector, DeviceSession, RetryPolicy};
