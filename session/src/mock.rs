//! Scriptable in-memory connector for tests
//!
//! Mirrors the shape of the real connectors: per-host behavior is scripted
//! up front, open attempts are recorded, and command output is served from
//! a map. Unscripted hosts connect successfully and echo placeholder
//! output for every command.

use crate::{CommandError, ConnectError, DeviceSession, SessionConfig, SessionConnector};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted behavior for one host
#[derive(Clone, Default, Debug)]
pub struct DeviceScript {
    /// Refuse the session open with this reason
    pub refuse: Option<String>,
    /// Output served per command; unscripted commands echo a placeholder
    pub outputs: HashMap<String, String>,
    /// Command that fails mid-run
    pub failing_command: Option<String>,
    /// Artificial latency added to every command
    pub latency: Duration,
}

impl DeviceScript {
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            refuse: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.outputs.insert(command.into(), output.into());
        self
    }

    pub fn with_failing_command(mut self, command: impl Into<String>) -> Self {
        self.failing_command = Some(command.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Connector serving scripted sessions
#[derive(Default)]
pub struct MockConnector {
    scripts: Mutex<HashMap<String, DeviceScript>>,
    attempts: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior for one host
    pub fn script(&self, host: &str, script: DeviceScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), script);
    }

    /// Hosts an open was attempted for, in attempt order
    pub fn open_attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    type Session = MockSession;

    async fn open(&self, config: &SessionConfig) -> Result<MockSession, ConnectError> {
        let host = config.host.as_str().to_string();
        self.attempts.lock().unwrap().push(host.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&host)
            .cloned()
            .unwrap_or_default();

        if let Some(reason) = script.refuse.clone() {
            return Err(ConnectError::Refused {
                host: config.host.clone(),
                reason,
            });
        }

        Ok(MockSession { host, script })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Session handed out by [`MockConnector`]
#[derive(Debug)]
pub struct MockSession {
    host: String,
    script: DeviceScript,
}

#[async_trait]
impl DeviceSession for MockSession {
    async fn run_command(&mut self, command: &str) -> Result<String, CommandError> {
        if !self.script.latency.is_zero() {
            tokio::time::sleep(self.script.latency).await;
        }

        if self.script.failing_command.as_deref() == Some(command) {
            return Err(CommandError::Rejected {
                command: command.to_string(),
                reason: format!("scripted failure on {}", self.host),
            });
        }

        Ok(self
            .script
            .outputs
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("{} output from {}\n", command, self.host)))
    }

    async fn close(&mut self) -> Result<(), CommandError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credential, DeviceTarget, DeviceType};

    fn config_for(host: &str) -> SessionConfig {
        SessionConfig::new(
            DeviceType::CiscoIos,
            DeviceTarget::new(host),
            Credential::new("admin", "secret"),
            true,
        )
    }

    #[tokio::test]
    async fn test_scripted_output_and_attempt_log() {
        let connector = MockConnector::new();
        connector.script(
            "10.0.0.1",
            DeviceScript::default().with_output("show version", "IOS 15.2\n"),
        );

        let mut session = connector.open(&config_for("10.0.0.1")).await.unwrap();
        assert_eq!(session.run_command("show version").await.unwrap(), "IOS 15.2\n");
        assert_eq!(connector.open_attempts(), vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn test_refused_host_still_counts_as_attempt() {
        let connector = MockConnector::new();
        connector.script("10.0.0.2", DeviceScript::refusing("auth failed"));

        let err = connector.open(&config_for("10.0.0.2")).await.unwrap_err();
        assert!(matches!(err, ConnectError::Refused { .. }));
        assert_eq!(connector.open_attempts().len(), 1);
    }
}
