//! Running-configuration capture.
//!
//! [`capture_snapshot`] pulls the device's running configuration over an
//! open session and stamps it with a capture header. [`capture_action`]
//! wraps the whole capture-and-append flow as a phase action, so backup
//! runs through the same executor as configuration pushes and gets the
//! same retry, timeout, and cancellation treatment.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use confleet_core::error::ActionError;
use confleet_core::model::Device;
use confleet_core::orchestrator::{ActionFuture, PhaseAction};
use confleet_core::render::renderer_for;
use confleet_core::session::DeviceConnector;

use crate::error::BackupResult;
use crate::snapshot::BackupSnapshot;
use crate::store::BackupStore;

/// Capture one device's running configuration as a snapshot.
///
/// Nothing is persisted here; the snapshot only exists once a store
/// accepts it, so a session failure leaves no partial entry anywhere.
pub async fn capture_snapshot(
    connector: &dyn DeviceConnector,
    device: &Device,
) -> BackupResult<BackupSnapshot> {
    let captured_at = Utc::now();
    let mut session = connector.connect(device).await?;
    let running = session
        .execute(renderer_for(device.kind).show_running())
        .await?;
    session.close().await?;

    let content = format!(
        "! Captured: {}\n! Device: {}\n! Address: {}\n{}",
        captured_at.to_rfc3339(),
        device.name,
        device.address,
        running
    );
    Ok(BackupSnapshot::new(&device.name, captured_at, content))
}

/// Phase action that captures each device and appends to `store`.
pub fn capture_action(
    connector: Arc<dyn DeviceConnector>,
    store: Arc<dyn BackupStore>,
) -> PhaseAction {
    Arc::new(move |device: Device| -> ActionFuture {
        let connector = Arc::clone(&connector);
        let store = Arc::clone(&store);
        Box::pin(async move {
            let snapshot = capture_snapshot(connector.as_ref(), &device)
                .await
                .map_err(backup_to_action)?;
            let digest = snapshot.digest.short().to_string();
            store.append(snapshot).await.map_err(backup_to_action)?;
            info!(device = %device.name, digest = %digest, "configuration backed up");
            Ok(())
        })
    })
}

/// Session failures keep their retry class; store failures are terminal.
fn backup_to_action(err: crate::error::BackupError) -> ActionError {
    match err {
        crate::error::BackupError::Session(s) => ActionError::Session(s),
        other => ActionError::fatal(other.to_string()),
    }
}
