//! Fleet data model: managed devices and declarative configuration intents.
//!
//! Both [`Inventory`] and [`ConfigIntent`] are loaded once per run and are
//! read-only afterwards; no component mutates them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Vendor/command-set tag for a managed device. Selects the command
/// renderer at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    CiscoIos,
    CiscoIosXe,
}

/// Opaque handle naming a credential entry held by an external secret
/// store. The raw secret is never carried through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef(pub String);

impl std::fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One managed device. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique name within the inventory.
    pub name: String,

    /// Management address.
    pub address: String,

    /// Management port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Command-set tag.
    pub kind: DeviceKind,

    /// Credential reference (opaque).
    pub credentials: CredentialRef,
}

fn default_port() -> u16 {
    22
}

/// The set of managed devices, in load order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    devices: Vec<Device>,
}

impl Inventory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Target state for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceIntent {
    /// Interface name, e.g. `GigabitEthernet0/0`.
    pub name: String,
    pub address: String,
    pub mask: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A network statement with its wildcard mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatement {
    pub network: String,
    pub wildcard: String,
}

/// Networks advertised into one OSPF area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OspfArea {
    pub area: u32,
    pub networks: Vec<NetworkStatement>,
}

/// Target routing-protocol state for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum RoutingIntent {
    Ospf {
        process_id: u32,
        #[serde(default)]
        router_id: Option<String>,
        areas: Vec<OspfArea>,
    },
    Eigrp {
        as_number: u32,
        networks: Vec<NetworkStatement>,
    },
}

/// Target state for one VLAN subinterface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanIntent {
    pub vlan_id: u16,
    /// Subinterface carrying the VLAN, e.g. `GigabitEthernet0/1.10`.
    pub subinterface: String,
    pub address: String,
    pub mask: String,
    #[serde(default)]
    pub description: String,
}

/// All declared directives for a single device, grouped by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIntent {
    #[serde(default)]
    pub interfaces: Vec<InterfaceIntent>,
    #[serde(default)]
    pub routing: Vec<RoutingIntent>,
    #[serde(default)]
    pub vlans: Vec<VlanIntent>,
}

/// Declarative target state for the whole fleet, keyed by device name.
///
/// Every referenced device must exist in the [`Inventory`]; the validator
/// treats an unknown name as a structural violation, not a runtime skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIntent {
    #[serde(default)]
    devices: BTreeMap<String, DeviceIntent>,
}

impl ConfigIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device: impl Into<String>, intent: DeviceIntent) {
        self.devices.insert(device.into(), intent);
    }

    pub fn get(&self, device: &str) -> Option<&DeviceIntent> {
        self.devices.get(device)
    }

    /// Iterate (device name, intent) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceIntent)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
