//! Pre-flight structural validation of configuration intents.
//!
//! [`validate`] is a pure function of the inventory and the intents; it
//! never opens a session. Any violation aborts the whole run before a
//! single device is touched.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{ConfigIntent, Inventory, RoutingIntent};

/// One structural violation found during pre-flight validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    UnknownDevice {
        device: String,
    },
    DuplicateVlanId {
        device: String,
        vlan_id: u16,
    },
    MissingField {
        device: String,
        context: String,
        field: String,
    },
    MalformedAddress {
        device: String,
        field: String,
        value: String,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::UnknownDevice { device } => {
                write!(f, "intent references device '{device}' not present in inventory")
            }
            Violation::DuplicateVlanId { device, vlan_id } => {
                write!(f, "device '{device}' declares VLAN {vlan_id} more than once")
            }
            Violation::MissingField {
                device,
                context,
                field,
            } => {
                write!(f, "device '{device}': {context} is missing required field '{field}'")
            }
            Violation::MalformedAddress {
                device,
                field,
                value,
            } => {
                write!(f, "device '{device}': '{value}' is not a valid IPv4 {field}")
            }
        }
    }
}

/// Validate all intents against the inventory.
///
/// Returns `Ok(())` or the full ordered list of violations (device name
/// order, then declaration order within a device). No partial pass-through:
/// a single violation fails the run.
pub fn validate(inventory: &Inventory, intents: &ConfigIntent) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    for (name, intent) in intents.iter() {
        if !inventory.contains(name) {
            violations.push(Violation::UnknownDevice {
                device: name.to_string(),
            });
        }

        for intf in &intent.interfaces {
            if intf.name.trim().is_empty() {
                violations.push(Violation::MissingField {
                    device: name.to_string(),
                    context: "interface".to_string(),
                    field: "name".to_string(),
                });
            }
            check_ipv4(&mut violations, name, "address", &intf.address);
            check_ipv4(&mut violations, name, "mask", &intf.mask);
        }

        for routing in &intent.routing {
            match routing {
                RoutingIntent::Ospf {
                    router_id, areas, ..
                } => {
                    if let Some(rid) = router_id {
                        check_ipv4(&mut violations, name, "router-id", rid);
                    }
                    for area in areas {
                        for net in &area.networks {
                            check_ipv4(&mut violations, name, "network", &net.network);
                            check_ipv4(&mut violations, name, "wildcard", &net.wildcard);
                        }
                    }
                }
                RoutingIntent::Eigrp { networks, .. } => {
                    for net in networks {
                        check_ipv4(&mut violations, name, "network", &net.network);
                        check_ipv4(&mut violations, name, "wildcard", &net.wildcard);
                    }
                }
            }
        }

        let mut seen_vlans = BTreeSet::new();
        for vlan in &intent.vlans {
            if !seen_vlans.insert(vlan.vlan_id) {
                violations.push(Violation::DuplicateVlanId {
                    device: name.to_string(),
                    vlan_id: vlan.vlan_id,
                });
            }
            if vlan.subinterface.trim().is_empty() {
                violations.push(Violation::MissingField {
                    device: name.to_string(),
                    context: format!("vlan {}", vlan.vlan_id),
                    field: "subinterface".to_string(),
                });
            }
            check_ipv4(&mut violations, name, "address", &vlan.address);
            check_ipv4(&mut violations, name, "mask", &vlan.mask);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn check_ipv4(violations: &mut Vec<Violation>, device: &str, field: &str, value: &str) {
    if value.parse::<Ipv4Addr>().is_err() {
        violations.push(Violation::MalformedAddress {
            device: device.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
