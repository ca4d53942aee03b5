//! In-memory scripted session fakes (testing and dry runs).
//!
//! [`ScriptedConnector`] satisfies the [`DeviceConnector`] contract without
//! any transport. Per-device behavior is scripted: a number of connect
//! attempts to fail first, an optional command pattern to reject, and a
//! canned running configuration. Every executed command is recorded in a
//! per-device transcript for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::SessionError;
use crate::model::Device;
use crate::session::{DeviceConnector, DeviceSession, SessionResult};

/// Scripted behavior for one device.
#[derive(Debug, Clone)]
pub struct ScriptedBehavior {
    /// Fail this many connect attempts before succeeding.
    pub connect_failures: u32,

    /// Reject any command containing this substring, with this reason.
    pub reject_matching: Option<(String, String)>,

    /// Output returned for the running-config dump.
    pub running_config: String,
}

impl Default for ScriptedBehavior {
    fn default() -> Self {
        Self {
            connect_failures: 0,
            reject_matching: None,
            running_config: "! scripted running-config\nhostname scripted\nend\n".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct DeviceScript {
    behavior: ScriptedBehavior,
    connect_attempts: u32,
    closes: u32,
    transcript: Vec<String>,
}

/// Connector whose sessions follow per-device scripts.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<String, Arc<Mutex<DeviceScript>>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a behavior for one device. Devices without an installed
    /// behavior use [`ScriptedBehavior::default`].
    pub fn set_behavior(&self, device: &str, behavior: ScriptedBehavior) {
        let script = self.script_for(device);
        script.lock().unwrap().behavior = behavior;
    }

    /// Every command executed against the device so far, in order.
    pub fn transcript(&self, device: &str) -> Vec<String> {
        self.script_for(device).lock().unwrap().transcript.clone()
    }

    /// How many connect attempts were made against the device.
    pub fn connect_attempts(&self, device: &str) -> u32 {
        self.script_for(device).lock().unwrap().connect_attempts
    }

    /// How many sessions were closed against the device.
    pub fn close_count(&self, device: &str) -> u32 {
        self.script_for(device).lock().unwrap().closes
    }

    fn script_for(&self, device: &str) -> Arc<Mutex<DeviceScript>> {
        let mut scripts = self.scripts.lock().unwrap();
        Arc::clone(scripts.entry(device.to_string()).or_default())
    }
}

#[async_trait]
impl DeviceConnector for ScriptedConnector {
    async fn connect(&self, device: &Device) -> SessionResult<Box<dyn DeviceSession>> {
        let script = self.script_for(&device.name);
        {
            let mut guard = script.lock().unwrap();
            guard.connect_attempts += 1;
            if guard.connect_attempts <= guard.behavior.connect_failures {
                return Err(SessionError::Connection {
                    device: device.name.clone(),
                    reason: "scripted connect failure".to_string(),
                });
            }
        }
        Ok(Box::new(ScriptedSession {
            device: device.name.clone(),
            script,
        }))
    }
}

/// Session handed out by [`ScriptedConnector`].
pub struct ScriptedSession {
    device: String,
    script: Arc<Mutex<DeviceScript>>,
}

#[async_trait]
impl DeviceSession for ScriptedSession {
    async fn execute(&mut self, command: &str) -> SessionResult<String> {
        let mut guard = self.script.lock().unwrap();
        guard.transcript.push(command.to_string());

        if let Some((pattern, reason)) = &guard.behavior.reject_matching {
            if command.contains(pattern.as_str()) {
                return Err(SessionError::CommandRejected {
                    device: self.device.clone(),
                    command: command.to_string(),
                    reason: reason.clone(),
                });
            }
        }

        if command.starts_with("show running-config") {
            return Ok(guard.behavior.running_config.clone());
        }
        Ok("ok".to_string())
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.script.lock().unwrap().closes += 1;
        Ok(())
    }
}
