//! Per-kind command rendering.
//!
//! Each [`DeviceKind`](crate::model::DeviceKind) maps to one renderer
//! implementation, selected by the kind tag when an action is built. The
//! renderer turns a declarative intent into the ordered command lines a
//! session will send; it never talks to a device itself.

use crate::model::{DeviceKind, InterfaceIntent, RoutingIntent, VlanIntent};

/// Capability interface turning intents into vendor command lines.
pub trait CommandRenderer: Send + Sync {
    fn interface_commands(&self, intent: &InterfaceIntent) -> Vec<String>;
    fn routing_commands(&self, intent: &RoutingIntent) -> Vec<String>;
    fn vlan_commands(&self, intent: &VlanIntent) -> Vec<String>;

    /// Persist the running configuration to startup.
    fn save_command(&self) -> &'static str;

    /// Dump the full running configuration (used for backup capture).
    fn show_running(&self) -> &'static str;

    /// Read-only verification after the routing stage.
    fn verify_routing(&self) -> &'static str;

    /// Read-only verification after the VLAN stage.
    fn verify_vlans(&self) -> &'static str;
}

/// Classic IOS / IOS-XE command set.
pub struct IosRenderer;

impl CommandRenderer for IosRenderer {
    fn interface_commands(&self, intent: &InterfaceIntent) -> Vec<String> {
        let mut commands = vec![
            format!("interface {}", intent.name),
            format!("ip address {} {}", intent.address, intent.mask),
        ];
        if !intent.description.is_empty() {
            commands.push(format!("description {}", intent.description));
        }
        if intent.enabled {
            commands.push("no shutdown".to_string());
        } else {
            commands.push("shutdown".to_string());
        }
        commands
    }

    fn routing_commands(&self, intent: &RoutingIntent) -> Vec<String> {
        match intent {
            RoutingIntent::Ospf {
                process_id,
                router_id,
                areas,
            } => {
                let mut commands = vec![format!("router ospf {process_id}")];
                if let Some(rid) = router_id {
                    commands.push(format!("router-id {rid}"));
                }
                for area in areas {
                    for net in &area.networks {
                        commands.push(format!(
                            "network {} {} area {}",
                            net.network, net.wildcard, area.area
                        ));
                    }
                }
                commands
            }
            RoutingIntent::Eigrp {
                as_number,
                networks,
            } => {
                let mut commands = vec![
                    format!("router eigrp {as_number}"),
                    "no auto-summary".to_string(),
                ];
                for net in networks {
                    commands.push(format!("network {} {}", net.network, net.wildcard));
                }
                commands
            }
        }
    }

    fn vlan_commands(&self, intent: &VlanIntent) -> Vec<String> {
        let mut commands = vec![
            format!("interface {}", intent.subinterface),
            format!("encapsulation dot1Q {}", intent.vlan_id),
            format!("ip address {} {}", intent.address, intent.mask),
        ];
        if !intent.description.is_empty() {
            commands.push(format!("description {}", intent.description));
        }
        commands.push("no shutdown".to_string());
        commands
    }

    fn save_command(&self) -> &'static str {
        "write memory"
    }

    fn show_running(&self) -> &'static str {
        "show running-config"
    }

    fn verify_routing(&self) -> &'static str {
        "show ip route"
    }

    fn verify_vlans(&self) -> &'static str {
        "show ip interface brief"
    }
}

/// Select the renderer for a device kind.
pub fn renderer_for(kind: DeviceKind) -> &'static dyn CommandRenderer {
    match kind {
        // IOS-XE shares the classic IOS command set for everything we render.
        DeviceKind::CiscoIos | DeviceKind::CiscoIosXe => &IosRenderer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NetworkStatement, OspfArea};

    #[test]
    fn interface_render_enabled() {
        let intent = InterfaceIntent {
            name: "GigabitEthernet0/0".to_string(),
            address: "10.0.0.1".to_string(),
            mask: "255.255.255.0".to_string(),
            description: "WAN uplink".to_string(),
            enabled: true,
        };
        let commands = IosRenderer.interface_commands(&intent);
        assert_eq!(
            commands,
            vec![
                "interface GigabitEthernet0/0",
                "ip address 10.0.0.1 255.255.255.0",
                "description WAN uplink",
                "no shutdown",
            ]
        );
    }

    #[test]
    fn interface_render_disabled_ends_with_shutdown() {
        let intent = InterfaceIntent {
            name: "Gi0/1".to_string(),
            address: "10.0.1.1".to_string(),
            mask: "255.255.255.0".to_string(),
            description: String::new(),
            enabled: false,
        };
        let commands = IosRenderer.interface_commands(&intent);
        assert_eq!(commands.last().unwrap(), "shutdown");
        assert!(!commands.iter().any(|c| c.starts_with("description")));
    }

    #[test]
    fn ospf_render_with_router_id() {
        let intent = RoutingIntent::Ospf {
            process_id: 1,
            router_id: Some("1.1.1.1".to_string()),
            areas: vec![OspfArea {
                area: 0,
                networks: vec![NetworkStatement {
                    network: "10.0.0.0".to_string(),
                    wildcard: "0.0.0.255".to_string(),
                }],
            }],
        };
        let commands = IosRenderer.routing_commands(&intent);
        assert_eq!(
            commands,
            vec![
                "router ospf 1",
                "router-id 1.1.1.1",
                "network 10.0.0.0 0.0.0.255 area 0",
            ]
        );
    }

    #[test]
    fn eigrp_render_disables_auto_summary() {
        let intent = RoutingIntent::Eigrp {
            as_number: 100,
            networks: vec![NetworkStatement {
                network: "172.16.0.0".to_string(),
                wildcard: "0.0.255.255".to_string(),
            }],
        };
        let commands = IosRenderer.routing_commands(&intent);
        assert_eq!(
            commands,
            vec![
                "router eigrp 100",
                "no auto-summary",
                "network 172.16.0.0 0.0.255.255",
            ]
        );
    }

    #[test]
    fn vlan_render_dot1q_subinterface() {
        let intent = VlanIntent {
            vlan_id: 10,
            subinterface: "Gi0/1.10".to_string(),
            address: "10.10.10.1".to_string(),
            mask: "255.255.255.0".to_string(),
            description: "users".to_string(),
        };
        let commands = IosRenderer.vlan_commands(&intent);
        assert_eq!(
            commands,
            vec![
                "interface Gi0/1.10",
                "encapsulation dot1Q 10",
                "ip address 10.10.10.1 255.255.255.0",
                "description users",
                "no shutdown",
            ]
        );
    }
}
