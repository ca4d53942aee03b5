//! Per-phase concurrent device execution with failure isolation.
//!
//! [`PhaseExecutor::run_phase`] fans one action out over a device set with
//! a bounded number of tasks in flight, converts every per-device error
//! into a [`DeviceOutcome`], and returns only once every device has
//! reached a terminal outcome (the phase barrier). A failure on one device
//! can never interrupt or reorder work on another.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{debug, instrument, warn};

use crate::error::{ActionError, SessionError};
use crate::model::Device;
use crate::report::DeviceOutcome;
use crate::session::RetryPolicy;

/// Run-scoped cancellation signal.
///
/// Once raised, no new device action is started anywhere; work already in
/// flight completes and is recorded normally. Cloning shares the signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning knobs for phase execution, scoped to one run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Device tasks in flight at once, unless a phase overrides it.
    pub default_concurrency: usize,

    /// Upper bound for one device action (including its session I/O).
    /// Exceeding it counts as a connection-class failure.
    pub action_timeout: Duration,

    /// Retry policy for connection-class failures.
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 8,
            action_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Executes one phase's action across its device set.
pub struct PhaseExecutor {
    config: ExecutorConfig,
    cancel: CancelToken,
}

impl PhaseExecutor {
    pub fn new(config: ExecutorConfig, cancel: CancelToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Apply `action` to every device, at most `limit` concurrently.
    ///
    /// An empty device set is a no-op that reports phase success with zero
    /// outcomes. The returned map holds exactly one outcome per device and
    /// is independent of scheduling order.
    #[instrument(skip(self, devices, action), fields(phase = %phase, devices = devices.len()))]
    pub async fn run_phase<F, Fut>(
        &self,
        phase: &str,
        devices: Vec<Device>,
        limit: usize,
        action: F,
    ) -> BTreeMap<String, DeviceOutcome>
    where
        F: Fn(Device) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        if devices.is_empty() {
            return BTreeMap::new();
        }

        let action = Arc::new(action);
        let sem = Arc::new(Semaphore::new(limit.max(1)));
        let results: Arc<Mutex<BTreeMap<String, DeviceOutcome>>> =
            Arc::new(Mutex::new(BTreeMap::new()));
        let device_names: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();

        let mut tasks = Vec::new();
        for device in devices {
            let sem = Arc::clone(&sem);
            let action = Arc::clone(&action);
            let results = Arc::clone(&results);
            let cancel = self.cancel.clone();
            let timeout = self.config.action_timeout;
            let retry = self.config.retry;

            tasks.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();

                // Work that has not started when the run is cancelled is
                // skipped; in-flight siblings are left alone.
                if cancel.is_cancelled() {
                    results.lock().await.insert(
                        device.name.clone(),
                        DeviceOutcome::Skipped {
                            cause: "cancelled".to_string(),
                        },
                    );
                    return;
                }

                let outcome = run_device_action(&device, timeout, retry, action.as_ref()).await;
                results.lock().await.insert(device.name.clone(), outcome);
            }));
        }

        // Phase barrier: never return while any device is outstanding.
        futures::future::join_all(tasks).await;

        let mut outcomes = results.lock().await.clone();
        for name in device_names {
            // A panicked action task leaves no outcome behind; record it as
            // that device's failure so the map stays one-entry-per-device.
            outcomes.entry(name).or_insert_with(|| DeviceOutcome::Failed {
                reason: "device task aborted before completion".to_string(),
            });
        }
        outcomes
    }
}

/// Drive one device's action to a terminal outcome, applying the timeout
/// and the bounded retry policy for connection-class failures.
async fn run_device_action<F, Fut>(
    device: &Device,
    timeout: Duration,
    retry: RetryPolicy,
    action: &F,
) -> DeviceOutcome
where
    F: Fn(Device) -> Fut,
    Fut: Future<Output = Result<(), ActionError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = match tokio::time::timeout(timeout, action(device.clone())).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::Session(SessionError::Timeout {
                device: device.name.clone(),
                detail: format!("action exceeded {}ms", timeout.as_millis()),
            })),
        };

        match result {
            Ok(()) => {
                debug!(device = %device.name, "device action succeeded");
                return DeviceOutcome::Succeeded;
            }
            Err(err) if err.is_retryable() && attempt < retry.attempts() => {
                warn!(
                    device = %device.name,
                    attempt,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(retry.delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(device = %device.name, error = %err, "device action failed");
                return DeviceOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        }
    }
}
