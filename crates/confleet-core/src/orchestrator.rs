//! Phase orchestration over the dependency DAG.
//!
//! Each phase moves Pending → Running → Completed. A phase starts once
//! every declared predecessor has completed, regardless of how many of the
//! predecessor's devices succeeded; ready phases run concurrently. A
//! malformed graph is rejected when the orchestrator is built, never
//! mid-run, and no phase is ever entered twice.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{error, info};

use crate::error::{ActionError, GraphError};
use crate::executor::PhaseExecutor;
use crate::graph::PhaseGraph;
use crate::model::Device;
use crate::report::{DeviceOutcome, RunReport};

/// Future returned by a phase action for one device.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send>>;

/// A phase's device-level action. Cloning shares the closure.
pub type PhaseAction = Arc<dyn Fn(Device) -> ActionFuture + Send + Sync>;

/// One named unit of work over a subset of devices.
pub struct Phase {
    pub name: String,
    pub after: Vec<String>,
    pub devices: Vec<Device>,
    pub action: PhaseAction,
    /// Per-phase concurrency override; falls back to the executor default.
    pub concurrency: Option<usize>,
}

impl Phase {
    pub fn new(name: impl Into<String>, devices: Vec<Device>, action: PhaseAction) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            devices,
            action,
            concurrency: None,
        }
    }

    /// Declare predecessor phases that must complete first.
    pub fn after(mut self, predecessors: &[&str]) -> Self {
        self.after = predecessors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }
}

/// Drives the phase DAG to completion and assembles the run report.
pub struct Orchestrator {
    phases: BTreeMap<String, Phase>,
    graph: PhaseGraph,
    executor: Arc<PhaseExecutor>,
}

impl Orchestrator {
    /// Validate the declared graph and build the orchestrator.
    pub fn new(phases: Vec<Phase>, executor: PhaseExecutor) -> Result<Self, GraphError> {
        let graph = PhaseGraph::build(
            phases
                .iter()
                .map(|p| (p.name.clone(), p.after.clone()))
                .collect(),
        )?;

        let phases = phases.into_iter().map(|p| (p.name.clone(), p)).collect();
        Ok(Self {
            phases,
            graph,
            executor: Arc::new(executor),
        })
    }

    /// Run every phase to completion and return the report.
    ///
    /// The run always terminates with a report; device failures surface in
    /// the report content, never as an error from this method.
    pub async fn run(mut self) -> RunReport {
        let mut report = RunReport::new();
        let mut started: BTreeSet<String> = BTreeSet::new();
        let mut completed: BTreeSet<String> = BTreeSet::new();
        let mut inflight = FuturesUnordered::new();

        loop {
            // A phase starts the moment its predecessors have completed;
            // it never waits on unrelated in-flight phases.
            for name in self.graph.ready(&started, &completed) {
                started.insert(name.clone());
                report.mark_started(&name);

                let Some(phase) = self.phases.remove(&name) else {
                    continue;
                };
                let executor = Arc::clone(&self.executor);
                let limit = phase
                    .concurrency
                    .unwrap_or(executor.config().default_concurrency);
                let device_names: Vec<String> =
                    phase.devices.iter().map(|d| d.name.clone()).collect();

                info!(phase = %name, devices = device_names.len(), "phase running");
                let handle = tokio::spawn(async move {
                    let Phase {
                        name,
                        devices,
                        action,
                        ..
                    } = phase;
                    executor
                        .run_phase(&name, devices, limit, move |d| action(d))
                        .await
                });
                inflight.push(async move { (name, device_names, handle.await) });
            }

            // All started, none in flight: the run is over.
            let Some((name, device_names, joined)) = inflight.next().await else {
                break;
            };

            let outcomes = match joined {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    error!(phase = %name, error = %err, "phase task crashed");
                    device_names
                        .into_iter()
                        .map(|device| {
                            (
                                device,
                                DeviceOutcome::Failed {
                                    reason: format!("phase executor crashed: {err}"),
                                },
                            )
                        })
                        .collect()
                }
            };

            info!(
                phase = %name,
                succeeded = outcomes.values().filter(|o| o.is_succeeded()).count(),
                failed = outcomes.values().filter(|o| o.is_failed()).count(),
                skipped = outcomes.values().filter(|o| o.is_skipped()).count(),
                "phase completed"
            );
            report.record_phase(&name, outcomes);
            completed.insert(name);
        }

        report.finish();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CancelToken, ExecutorConfig};
    use crate::model::{CredentialRef, DeviceKind};

    fn device(name: &str) -> Device {
        Device {
            name: name.to_string(),
            address: "192.0.2.1".to_string(),
            port: 22,
            kind: DeviceKind::CiscoIos,
            credentials: CredentialRef("lab".to_string()),
        }
    }

    fn ok_action() -> PhaseAction {
        Arc::new(|_d| -> ActionFuture { Box::pin(async { Ok(()) }) })
    }

    #[test]
    fn cyclic_graph_never_constructs() {
        let executor = PhaseExecutor::new(ExecutorConfig::default(), CancelToken::new());
        let phases = vec![
            Phase::new("a", vec![device("R1")], ok_action()).after(&["b"]),
            Phase::new("b", vec![device("R1")], ok_action()).after(&["a"]),
        ];
        assert!(matches!(
            Orchestrator::new(phases, executor),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[tokio::test]
    async fn single_phase_runs_all_devices() {
        let executor = PhaseExecutor::new(ExecutorConfig::default(), CancelToken::new());
        let phases = vec![Phase::new(
            "interfaces",
            vec![device("R1"), device("R2")],
            ok_action(),
        )];
        let report = Orchestrator::new(phases, executor).unwrap().run().await;

        assert_eq!(report.succeeded_count(), 2);
        assert!(report.finished_at.is_some());
        let timing = report.timing("interfaces").unwrap();
        assert!(timing.completed_at.is_some());
    }

    #[tokio::test]
    async fn ready_phase_is_not_blocked_by_an_unrelated_slow_phase() {
        let slow: PhaseAction = Arc::new(|_d| -> ActionFuture {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok(())
            })
        });

        let executor = PhaseExecutor::new(ExecutorConfig::default(), CancelToken::new());
        let phases = vec![
            Phase::new("fast", vec![device("R1")], ok_action()),
            Phase::new("slow", vec![device("R2")], slow),
            Phase::new("after_fast", vec![device("R1")], ok_action()).after(&["fast"]),
        ];
        let report = Orchestrator::new(phases, executor).unwrap().run().await;

        assert_eq!(report.succeeded_count(), 3);
        let dependent_started = report.timing("after_fast").unwrap().started_at;
        let slow_done = report.timing("slow").unwrap().completed_at.unwrap();
        assert!(
            dependent_started < slow_done,
            "dependent waited for an unrelated phase"
        );
    }

    #[tokio::test]
    async fn empty_phase_completes_with_zero_outcomes() {
        let executor = PhaseExecutor::new(ExecutorConfig::default(), CancelToken::new());
        let phases = vec![
            Phase::new("interfaces", vec![], ok_action()),
            Phase::new("routing", vec![device("R1")], ok_action()).after(&["interfaces"]),
        ];
        let report = Orchestrator::new(phases, executor).unwrap().run().await;

        assert!(report.phase_outcomes("interfaces").unwrap().is_empty());
        assert!(report.get("routing", "R1").unwrap().is_succeeded());
    }
}
