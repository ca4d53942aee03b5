//! YAML configuration loading.
//!
//! The inventory file uses the operational layout fleets already keep:
//!
//! ```yaml
//! routers:
//!   - name: R1
//!     ip: 192.168.122.10
//!     device_type: cisco_ios
//!     credential: lab-admin
//! ```
//!
//! The intents file deserializes straight into the engine's
//! [`ConfigIntent`] model.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use confleet_core::model::{ConfigIntent, CredentialRef, Device, DeviceKind, Inventory};

#[derive(Debug, Deserialize)]
struct InventoryFile {
    routers: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
    ip: String,
    device_type: String,
    #[serde(default = "default_port")]
    port: u16,
    credential: String,
}

fn default_port() -> u16 {
    22
}

fn parse_kind(device_type: &str) -> Result<DeviceKind> {
    match device_type {
        "cisco_ios" => Ok(DeviceKind::CiscoIos),
        "cisco_ios_xe" | "cisco_xe" => Ok(DeviceKind::CiscoIosXe),
        other => bail!("unsupported device_type '{other}'"),
    }
}

/// Load the device inventory from a YAML file.
pub fn load_inventory(path: &Path) -> Result<Inventory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read inventory file {}", path.display()))?;
    let file: InventoryFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid inventory YAML in {}", path.display()))?;

    let mut devices = Vec::with_capacity(file.routers.len());
    for entry in file.routers {
        let kind = parse_kind(&entry.device_type)
            .with_context(|| format!("device '{}'", entry.name))?;
        devices.push(Device {
            name: entry.name,
            address: entry.ip,
            port: entry.port,
            kind,
            credentials: CredentialRef(entry.credential),
        });
    }
    Ok(Inventory::new(devices))
}

/// Load the fleet configuration intents from a YAML file.
pub fn load_intents(path: &Path) -> Result<ConfigIntent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read intents file {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid intents YAML in {}", path.display()))
}
