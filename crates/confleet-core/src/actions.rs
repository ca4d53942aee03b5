//! Device-level actions for the built-in configuration stages.
//!
//! Each builder closes over the connector and the loaded intents and
//! produces a [`PhaseAction`] the executor fans out per device: open a
//! session, push the rendered command lines, run the stage's verification
//! read, persist the configuration, close. A device with no directives for
//! the stage is an idempotent no-op and succeeds without connecting.

use std::sync::Arc;

use tracing::debug;

use crate::error::SessionError;
use crate::model::{ConfigIntent, Device};
use crate::orchestrator::{ActionFuture, PhaseAction};
use crate::render::{renderer_for, CommandRenderer};
use crate::session::DeviceConnector;

/// Push `commands` to the device, verify, and save.
async fn apply_commands(
    connector: &dyn DeviceConnector,
    device: &Device,
    renderer: &dyn CommandRenderer,
    commands: &[String],
    verify: Option<&str>,
) -> Result<(), SessionError> {
    let mut session = connector.connect(device).await?;

    let pushed = async {
        for command in commands {
            session.execute(command).await?;
        }
        if let Some(check) = verify {
            session.execute(check).await?;
        }
        session.execute(renderer.save_command()).await?;
        Ok::<_, SessionError>(())
    }
    .await;

    // Close the session whether or not the push succeeded; a close
    // failure does not undo applied configuration.
    if let Err(err) = session.close().await {
        debug!(device = %device.name, error = %err, "session close failed");
    }
    pushed
}

/// Action for the interface configuration stage.
pub fn interfaces_action(
    connector: Arc<dyn DeviceConnector>,
    intents: Arc<ConfigIntent>,
) -> PhaseAction {
    Arc::new(move |device: Device| -> ActionFuture {
        let connector = Arc::clone(&connector);
        let intents = Arc::clone(&intents);
        Box::pin(async move {
            let directives = match intents.get(&device.name) {
                Some(intent) if !intent.interfaces.is_empty() => intent.interfaces.clone(),
                _ => {
                    debug!(device = %device.name, "no interface directives");
                    return Ok(());
                }
            };

            let renderer = renderer_for(device.kind);
            let mut commands = Vec::new();
            for intf in &directives {
                commands.extend(renderer.interface_commands(intf));
            }
            apply_commands(connector.as_ref(), &device, renderer, &commands, None).await?;
            Ok(())
        })
    })
}

/// Action for the routing configuration stage.
pub fn routing_action(
    connector: Arc<dyn DeviceConnector>,
    intents: Arc<ConfigIntent>,
) -> PhaseAction {
    Arc::new(move |device: Device| -> ActionFuture {
        let connector = Arc::clone(&connector);
        let intents = Arc::clone(&intents);
        Box::pin(async move {
            let directives = match intents.get(&device.name) {
                Some(intent) if !intent.routing.is_empty() => intent.routing.clone(),
                _ => {
                    debug!(device = %device.name, "no routing directives");
                    return Ok(());
                }
            };

            let renderer = renderer_for(device.kind);
            let mut commands = Vec::new();
            for routing in &directives {
                commands.extend(renderer.routing_commands(routing));
            }
            apply_commands(
                connector.as_ref(),
                &device,
                renderer,
                &commands,
                Some(renderer.verify_routing()),
            )
            .await?;
            Ok(())
        })
    })
}

/// Action for the VLAN subinterface stage.
pub fn vlans_action(
    connector: Arc<dyn DeviceConnector>,
    intents: Arc<ConfigIntent>,
) -> PhaseAction {
    Arc::new(move |device: Device| -> ActionFuture {
        let connector = Arc::clone(&connector);
        let intents = Arc::clone(&intents);
        Box::pin(async move {
            let directives = match intents.get(&device.name) {
                Some(intent) if !intent.vlans.is_empty() => intent.vlans.clone(),
                _ => {
                    debug!(device = %device.name, "no vlan directives");
                    return Ok(());
                }
            };

            let renderer = renderer_for(device.kind);
            let mut commands = Vec::new();
            for vlan in &directives {
                commands.extend(renderer.vlan_commands(vlan));
            }
            apply_commands(
                connector.as_ref(),
                &device,
                renderer,
                &commands,
                Some(renderer.verify_vlans()),
            )
            .await?;
            Ok(())
        })
    })
}
