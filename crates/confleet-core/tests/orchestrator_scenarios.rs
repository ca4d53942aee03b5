//! End-to-end orchestration scenarios against the scripted connector.

use std::sync::Arc;
use std::time::Duration;

use confleet_core::actions::{interfaces_action, routing_action, vlans_action};
use confleet_core::error::ActionError;
use confleet_core::executor::{CancelToken, ExecutorConfig, PhaseExecutor};
use confleet_core::fakes::{ScriptedBehavior, ScriptedConnector};
use confleet_core::model::{
    ConfigIntent, CredentialRef, Device, DeviceIntent, DeviceKind, InterfaceIntent,
    NetworkStatement, RoutingIntent, VlanIntent,
};
use confleet_core::orchestrator::{ActionFuture, Orchestrator, Phase, PhaseAction};
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

fn interface(name: &str, address: &str) -> InterfaceIntent {
    InterfaceIntent {
        name: name.to_string(),
        address: address.to_string(),
        mask: "255.255.255.0".to_string(),
        description: "uplink".to_string(),
        enabled: true,
    }
}

fn fleet_intents() -> ConfigIntent {
    let mut intents = ConfigIntent::new();
    intents.insert(
        "R1",
        DeviceIntent {
            interfaces: vec![interface("GigabitEthernet0/0", "10.0.0.1")],
            routing: vec![RoutingIntent::Eigrp {
                as_number: 100,
                networks: vec![NetworkStatement {
                    network: "10.0.0.0".to_string(),
                    wildcard: "0.0.0.255".to_string(),
                }],
            }],
            vlans: vec![],
        },
    );
    intents.insert(
        "R2",
        DeviceIntent {
            interfaces: vec![interface("GigabitEthernet0/1", "10.0.1.1")],
            routing: vec![],
            vlans: vec![VlanIntent {
                vlan_id: 10,
                subinterface: "GigabitEthernet0/1.10".to_string(),
                address: "10.0.10.1".to_string(),
                mask: "255.255.255.0".to_string(),
                description: "vlan ten".to_string(),
            }],
        },
    );
    intents.insert(
        "R3",
        DeviceIntent {
            interfaces: vec![interface("GigabitEthernet0/0", "10.0.2.1")],
            routing: vec![],
            vlans: vec![],
        },
    );
    intents
}

fn fast_executor(cancel: CancelToken) -> PhaseExecutor {
    PhaseExecutor::new(
        ExecutorConfig {
            default_concurrency: 4,
            action_timeout: Duration::from_secs(5),
            retry: RetryPolicy::Fixed {
                attempts: 1,
                interval_ms: 1,
            },
        },
        cancel,
    )
}

fn fleet_phases(connector: Arc<ScriptedConnector>, intents: Arc<ConfigIntent>) -> Vec<Phase> {
    let devices = vec![device("R1"), device("R2"), device("R3")];
    vec![
        Phase::new(
            "interfaces",
            devices.clone(),
            interfaces_action(connector.clone(), intents.clone()),
        ),
        Phase::new(
            "routing",
            devices.clone(),
            routing_action(connector.clone(), intents.clone()),
        )
        .after(&["interfaces"]),
        Phase::new("vlans", devices, vlans_action(connector, intents)).after(&["interfaces"]),
    ]
}

#[tokio::test]
async fn healthy_fleet_run_succeeds_everywhere() {
    let connector = Arc::new(ScriptedConnector::new());
    let intents = Arc::new(fleet_intents());

    let phases = fleet_phases(connector.clone(), intents);
    let report = Orchestrator::new(phases, fast_executor(CancelToken::new()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(report.failed_count(), 0);
    // Three phases, three devices each.
    assert_eq!(report.succeeded_count(), 9);

    let transcript = connector.transcript("R1");
    assert!(transcript.contains(&"interface GigabitEthernet0/0".to_string()));
    assert!(transcript.contains(&"router eigrp 100".to_string()));
    assert!(transcript.contains(&"network 10.0.0.0 0.0.0.255".to_string()));
}

#[tokio::test]
async fn unreachable_device_fails_alone_and_the_run_continues() {
    let connector = Arc::new(ScriptedConnector::new());
    // R3 stays unreachable past the retry budget.
    connector.set_behavior(
        "R3",
        ScriptedBehavior {
            connect_failures: 10,
            ..ScriptedBehavior::default()
        },
    );
    let intents = Arc::new(fleet_intents());

    let phases = fleet_phases(connector.clone(), intents);
    let report = Orchestrator::new(phases, fast_executor(CancelToken::new()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.status(), RunStatus::PartialFailure);

    // R3 only carries interface directives, so the one failure is there;
    // routing and vlans are no-ops for it and still succeed.
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].phase, "interfaces");
    assert_eq!(failures[0].device, "R3");

    assert!(report.get("interfaces", "R1").unwrap().is_succeeded());
    assert!(report.get("interfaces", "R2").unwrap().is_succeeded());
    assert!(report.get("routing", "R3").unwrap().is_succeeded());
    assert!(report.get("vlans", "R3").unwrap().is_succeeded());

    // Initial attempt plus one retry.
    assert_eq!(connector.connect_attempts("R3"), 2);
}

#[tokio::test]
async fn rejected_directive_is_terminal_for_that_device() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.set_behavior(
        "R1",
        ScriptedBehavior {
            reject_matching: Some(("router eigrp".to_string(), "invalid input".to_string())),
            ..ScriptedBehavior::default()
        },
    );
    let intents = Arc::new(fleet_intents());

    let phases = fleet_phases(connector.clone(), intents);
    let report = Orchestrator::new(phases, fast_executor(CancelToken::new()))
        .unwrap()
        .run()
        .await;

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].phase, "routing");
    assert_eq!(failures[0].device, "R1");
    assert!(failures[0].reason.contains("rejected"));

    // Interfaces phase on R1 still succeeded before the rejection.
    assert!(report.get("interfaces", "R1").unwrap().is_succeeded());
}

#[tokio::test]
async fn dependent_phases_start_after_their_predecessor_completes() {
    let connector = Arc::new(ScriptedConnector::new());
    let intents = Arc::new(fleet_intents());

    let phases = fleet_phases(connector, intents);
    let report = Orchestrator::new(phases, fast_executor(CancelToken::new()))
        .unwrap()
        .run()
        .await;

    let interfaces_done = report.timing("interfaces").unwrap().completed_at.unwrap();
    for dependent in ["routing", "vlans"] {
        let started = report.timing(dependent).unwrap().started_at;
        assert!(
            started >= interfaces_done,
            "{dependent} started before interfaces completed"
        );
    }
}

#[tokio::test]
async fn cancellation_skips_every_unstarted_phase_device() {
    let cancel = CancelToken::new();
    let cancel_in_action = cancel.clone();

    // First phase raises the run-wide cancellation signal itself.
    let cancelling: PhaseAction = Arc::new(move |_d| -> ActionFuture {
        let cancel = cancel_in_action.clone();
        Box::pin(async move {
            cancel.cancel();
            Ok::<(), ActionError>(())
        })
    });

    let connector = Arc::new(ScriptedConnector::new());
    let intents = Arc::new(fleet_intents());
    let phases = vec![
        Phase::new("first", vec![device("R1")], cancelling),
        Phase::new(
            "interfaces",
            vec![device("R1"), device("R2"), device("R3")],
            interfaces_action(connector.clone(), intents),
        )
        .after(&["first"]),
    ];

    let report = Orchestrator::new(phases, fast_executor(cancel))
        .unwrap()
        .run()
        .await;

    assert!(report.get("first", "R1").unwrap().is_succeeded());
    for name in ["R1", "R2", "R3"] {
        assert!(
            report.get("interfaces", name).unwrap().is_skipped(),
            "{name} should have been skipped"
        );
    }
    // Nothing ever touched the devices.
    assert_eq!(connector.connect_attempts("R1"), 0);

    // Skips alone never fail a run.
    assert_eq!(report.status(), RunStatus::Success);
}

#[tokio::test]
async fn rerunning_the_same_intents_pushes_the_same_commands() {
    let intents = Arc::new(fleet_intents());

    let first = Arc::new(ScriptedConnector::new());
    Orchestrator::new(
        fleet_phases(first.clone(), intents.clone()),
        fast_executor(CancelToken::new()),
    )
    .unwrap()
    .run()
    .await;

    let second = Arc::new(ScriptedConnector::new());
    let report = Orchestrator::new(
        fleet_phases(second.clone(), intents),
        fast_executor(CancelToken::new()),
    )
    .unwrap()
    .run()
    .await;

    assert_eq!(report.status(), RunStatus::Success);
    for name in ["R1", "R2", "R3"] {
        assert_eq!(first.transcript(name), second.transcript(name));
    }
}
