//! Backup capture running as an orchestrated phase.

use std::sync::Arc;
use std::time::Duration;

use confleet_backup::{capture_action, BackupStore, FsBackupStore, MemoryBackupStore};
use confleet_core::executor::{CancelToken, ExecutorConfig, PhaseExecutor};
use confleet_core::fakes::{ScriptedBehavior, ScriptedConnector};
use confleet_core::model::{CredentialRef, Device, DeviceKind};
use confleet_core::orchestrator::{Orchestrator, Phase};
use confleet_core::report::RunStatus;
use confleet_core::session::RetryPolicy;

fn device(name: &str) -> Device {
    Device {
        name: name.to_string(),
        address: "192.0.2.1".to_string(),
        port: 22,
        kind: DeviceKind::CiscoIos,
        credentials: CredentialRef("lab".to_string()),
    }
}

fn executor() -> PhaseExecutor {
    PhaseExecutor::new(
        ExecutorConfig {
            default_concurrency: 4,
            action_timeout: Duration::from_secs(5),
            retry: RetryPolicy::Fixed {
                attempts: 1,
                interval_ms: 1,
            },
        },
        CancelToken::new(),
    )
}

#[tokio::test]
async fn backup_phase_appends_one_snapshot_per_device() {
    let connector = Arc::new(ScriptedConnector::new());
    let store: Arc<dyn BackupStore> = Arc::new(MemoryBackupStore::new());

    let phase = Phase::new(
        "backup",
        vec![device("R1"), device("R2")],
        capture_action(connector.clone(), store.clone()),
    );
    let report = Orchestrator::new(vec![phase], executor())
        .unwrap()
        .run()
        .await;

    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(store.history("R1").await.unwrap().len(), 1);
    assert_eq!(store.history("R2").await.unwrap().len(), 1);

    // The capture issued exactly one read per device.
    assert_eq!(connector.transcript("R1"), vec!["show running-config"]);
}

#[tokio::test]
async fn unreachable_device_fails_its_backup_only() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.set_behavior(
        "R2",
        ScriptedBehavior {
            connect_failures: 10,
            ..ScriptedBehavior::default()
        },
    );
    let store: Arc<dyn BackupStore> = Arc::new(MemoryBackupStore::new());

    let phase = Phase::new(
        "backup",
        vec![device("R1"), device("R2")],
        capture_action(connector, store.clone()),
    );
    let report = Orchestrator::new(vec![phase], executor())
        .unwrap()
        .run()
        .await;

    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert!(report.get("backup", "R1").unwrap().is_succeeded());
    assert!(report.get("backup", "R2").unwrap().is_failed());
    assert_eq!(store.history("R1").await.unwrap().len(), 1);
    assert!(store.history("R2").await.unwrap().is_empty());
}

#[tokio::test]
async fn backup_phase_persists_to_the_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(ScriptedConnector::new());
    let store: Arc<dyn BackupStore> = Arc::new(FsBackupStore::open(dir.path()).await.unwrap());

    let phase = Phase::new(
        "backup",
        vec![device("R1")],
        capture_action(connector, store.clone()),
    );
    let report = Orchestrator::new(vec![phase], executor())
        .unwrap()
        .run()
        .await;
    assert_eq!(report.status(), RunStatus::Success);

    let latest = store.latest("R1").await.unwrap().unwrap();
    assert!(latest.content.contains("! Device: R1"));
    assert!(latest.content.contains("hostname scripted"));

    let pointer = tokio::fs::read_to_string(dir.path().join("R1_latest.txt"))
        .await
        .unwrap();
    assert_eq!(pointer, latest.content);
}
