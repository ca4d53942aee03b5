//! Run report: the single authority external callers consult for pass/fail.
//!
//! Producing a report never fails, even when every device failed; "no
//! devices changed" and "all devices changed" both come out as an ordinary
//! report, distinguished only by content.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal result of one phase for one device. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeviceOutcome {
    Succeeded,
    Failed { reason: String },
    Skipped { cause: String },
}

impl DeviceOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, DeviceOutcome::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeviceOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DeviceOutcome::Skipped { .. })
    }
}

/// Overall run verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No outcome anywhere is Failed.
    Success,
    /// At least one (phase, device) pair failed.
    PartialFailure,
}

/// Start/completion instants for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One failed (phase, device) pair with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub phase: String,
    pub device: String,
    pub reason: String,
}

/// Aggregated outcomes for a whole run, keyed by (phase, device).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    outcomes: BTreeMap<String, BTreeMap<String, DeviceOutcome>>,
    timings: BTreeMap<String, PhaseTiming>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: BTreeMap::new(),
            timings: BTreeMap::new(),
        }
    }

    /// Record that a phase moved to Running.
    pub fn mark_started(&mut self, phase: &str) {
        self.timings.insert(
            phase.to_string(),
            PhaseTiming {
                started_at: Utc::now(),
                completed_at: None,
            },
        );
    }

    /// Record a completed phase's outcome map.
    pub fn record_phase(&mut self, phase: &str, outcomes: BTreeMap<String, DeviceOutcome>) {
        if let Some(timing) = self.timings.get_mut(phase) {
            timing.completed_at = Some(Utc::now());
        }
        self.outcomes.insert(phase.to_string(), outcomes);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn get(&self, phase: &str, device: &str) -> Option<&DeviceOutcome> {
        self.outcomes.get(phase).and_then(|m| m.get(device))
    }

    pub fn phase_outcomes(&self, phase: &str) -> Option<&BTreeMap<String, DeviceOutcome>> {
        self.outcomes.get(phase)
    }

    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(String::as_str)
    }

    pub fn timing(&self, phase: &str) -> Option<&PhaseTiming> {
        self.timings.get(phase)
    }

    /// Success only when no outcome anywhere is Failed.
    pub fn status(&self) -> RunStatus {
        let any_failed = self
            .outcomes
            .values()
            .flat_map(|m| m.values())
            .any(DeviceOutcome::is_failed);
        if any_failed {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        }
    }

    /// Every failed (phase, device) pair with its reason, in key order.
    pub fn failures(&self) -> Vec<FailedEntry> {
        let mut entries = Vec::new();
        for (phase, devices) in &self.outcomes {
            for (device, outcome) in devices {
                if let DeviceOutcome::Failed { reason } = outcome {
                    entries.push(FailedEntry {
                        phase: phase.clone(),
                        device: device.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
        entries
    }

    pub fn succeeded_count(&self) -> usize {
        self.count(DeviceOutcome::is_succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.count(DeviceOutcome::is_failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(DeviceOutcome::is_skipped)
    }

    fn count(&self, pred: fn(&DeviceOutcome) -> bool) -> usize {
        self.outcomes
            .values()
            .flat_map(|m| m.values())
            .filter(|o| pred(o))
            .count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(entries: &[(&str, DeviceOutcome)]) -> BTreeMap<String, DeviceOutcome> {
        entries
            .iter()
            .map(|(name, o)| (name.to_string(), o.clone()))
            .collect()
    }

    #[test]
    fn all_succeeded_is_success() {
        let mut report = RunReport::new();
        report.mark_started("interfaces");
        report.record_phase(
            "interfaces",
            outcomes(&[
                ("R1", DeviceOutcome::Succeeded),
                ("R2", DeviceOutcome::Succeeded),
            ]),
        );
        report.finish();

        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.succeeded_count(), 2);
        assert!(report.failures().is_empty());
    }

    #[test]
    fn skipped_outcomes_do_not_fail_the_run() {
        let mut report = RunReport::new();
        report.record_phase(
            "routing",
            outcomes(&[(
                "R1",
                DeviceOutcome::Skipped {
                    cause: "cancelled".to_string(),
                },
            )]),
        );
        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn single_failure_yields_partial_failure() {
        let mut report = RunReport::new();
        report.record_phase(
            "interfaces",
            outcomes(&[
                ("R1", DeviceOutcome::Succeeded),
                (
                    "R3",
                    DeviceOutcome::Failed {
                        reason: "unreachable".to_string(),
                    },
                ),
            ]),
        );

        assert_eq!(report.status(), RunStatus::PartialFailure);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phase, "interfaces");
        assert_eq!(failures[0].device, "R3");
        assert_eq!(failures[0].reason, "unreachable");
    }

    #[test]
    fn lookup_by_phase_and_device() {
        let mut report = RunReport::new();
        report.record_phase("vlans", outcomes(&[("R1", DeviceOutcome::Succeeded)]));

        assert!(report.get("vlans", "R1").unwrap().is_succeeded());
        assert!(report.get("vlans", "R9").is_none());
        assert!(report.get("backup", "R1").is_none());
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = RunReport::new();
        report.record_phase("interfaces", outcomes(&[("R1", DeviceOutcome::Succeeded)]));
        report.finish();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["outcomes"]["interfaces"]["R1"]["outcome"],
            serde_json::json!("succeeded")
        );
    }
}
