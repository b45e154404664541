//! Bounded fleet polling
//!
//! One unit of work per device, at most `concurrency` in flight at once,
//! outcomes collected in completion order. A failing device never aborts
//! its siblings; every error path collapses into a per-device outcome at
//! the worker boundary.

use crate::runner;
use crate::sink::OutputSink;
use chrono::Local;
use confsnap_session::{
    Credential, DeviceSession, DeviceTarget, DeviceType, SessionConfig, SessionConnector,
};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Per-device result of one run.
///
/// Exactly one of these exists per device per run, success or failure.
#[derive(Debug)]
pub enum Outcome {
    /// Transcript captured and persisted
    Success {
        device: DeviceTarget,
        artifact: PathBuf,
    },
    /// Session, command, or persistence failure; no artifact was written
    Failure { device: DeviceTarget, error: String },
}

impl Outcome {
    pub fn device(&self) -> &DeviceTarget {
        match self {
            Outcome::Success { device, .. } => device,
            Outcome::Failure { device, .. } => device,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Invalid pool configuration, refused before any device is touched
#[derive(Error, Debug)]
#[error("concurrency limit must be at least 1 (got {0})")]
pub struct PoolError(pub usize);

/// Settings for one fleet run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub device_type: DeviceType,
    pub fast_mode: bool,
    pub port: u16,
    /// Maximum devices in flight at once; limits above the fleet size
    /// simply leave capacity idle
    pub concurrency: usize,
    /// Optional hard per-command read deadline
    pub command_deadline: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::CiscoIos,
            fast_mode: false,
            port: confsnap_session::DEFAULT_PORT,
            concurrency: 50,
            command_deadline: None,
        }
    }
}

/// Drives the whole fleet through one snapshot run
pub struct FleetOrchestrator<C: SessionConnector> {
    connector: Arc<C>,
    sink: OutputSink,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
}

impl<C: SessionConnector> FleetOrchestrator<C> {
    pub fn new(
        connector: Arc<C>,
        sink: OutputSink,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            sink,
            config,
            shutdown,
        }
    }

    /// Snapshot every device once.
    ///
    /// Returns one outcome per device in completion order, which is not
    /// dispatch order and varies across runs. An empty device list yields
    /// an empty result.
    pub async fn run(
        &self,
        devices: &[DeviceTarget],
        credential: &Credential,
        commands: &[String],
    ) -> Result<Vec<Outcome>, PoolError> {
        if self.config.concurrency == 0 {
            return Err(PoolError(self.config.concurrency));
        }

        let credential = Arc::new(credential.clone());
        let commands: Arc<[String]> = commands.into();

        let outcomes = stream::iter(devices.iter().cloned())
            .map(|device| {
                let connector = self.connector.clone();
                let sink = self.sink.clone();
                let config = self.config.clone();
                let shutdown = self.shutdown.clone();
                let credential = credential.clone();
                let commands = commands.clone();
                async move {
                    snapshot_device(connector, sink, config, shutdown, device, credential, commands)
                        .await
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(outcomes)
    }
}

/// One unit of work: session open, command loop, persist
async fn snapshot_device<C: SessionConnector>(
    connector: Arc<C>,
    sink: OutputSink,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
    device: DeviceTarget,
    credential: Arc<Credential>,
    commands: Arc<[String]>,
) -> Outcome {
    if *shutdown.borrow() {
        warn!("skipping {}: shutdown requested", device);
        return Outcome::Failure {
            device,
            error: "shutdown requested before device was scheduled".to_string(),
        };
    }

    let session_config = SessionConfig::new(
        config.device_type,
        device.clone(),
        (*credential).clone(),
        config.fast_mode,
    )
    .with_port(config.port)
    .with_deadline(config.command_deadline);

    let mut session = match connector.open(&session_config).await {
        Ok(session) => session,
        Err(e) => {
            error!("{}: {}", device, e);
            return Outcome::Failure {
                device,
                error: e.to_string(),
            };
        }
    };
    info!("connected to {}", device);

    let transcript = match runner::run_commands(&mut session, &commands).await {
        Ok(transcript) => {
            debug!("{}: captured {} command outputs", device, transcript.len());
            transcript
        }
        Err(e) => {
            error!("{}: {}", device, e);
            let _ = session.close().await;
            return Outcome::Failure {
                device,
                error: e.to_string(),
            };
        }
    };

    // The transcript is complete at this point; a close failure does not
    // discard it
    if let Err(e) = session.close().await {
        warn!("{}: close failed: {}", device, e);
    }

    match sink
        .persist(&device, &transcript, Local::now().naive_local())
        .await
    {
        Ok(artifact) => {
            info!("collected {} -> {}", device, artifact.display());
            Outcome::Success { device, artifact }
        }
        Err(e) => {
            error!("{}: {}", device, e);
            Outcome::Failure {
                device,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsnap_session::mock::{DeviceScript, MockConnector};
    use std::collections::HashSet;
    use tokio::time::Instant;

    fn targets(hosts: &[&str]) -> Vec<DeviceTarget> {
        hosts.iter().map(|h| DeviceTarget::new(*h)).collect()
    }

    fn commands() -> Vec<String> {
        vec!["show version".to_string(), "show ip int brief".to_string()]
    }

    fn orchestrator(
        connector: Arc<MockConnector>,
        dir: &std::path::Path,
        concurrency: usize,
    ) -> (FleetOrchestrator<MockConnector>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let config = OrchestratorConfig {
            concurrency,
            ..OrchestratorConfig::default()
        };
        (
            FleetOrchestrator::new(connector, OutputSink::new(dir), config, rx),
            tx,
        )
    }

    #[tokio::test]
    async fn test_one_outcome_per_device_at_every_limit() {
        let devices = targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        let credential = Credential::new("admin", "secret");

        for limit in [1, devices.len(), 64] {
            let dir = tempfile::tempdir().unwrap();
            let connector = Arc::new(MockConnector::new());
            let (orch, _tx) = orchestrator(connector.clone(), dir.path(), limit);

            let outcomes = orch.run(&devices, &credential, &commands()).await.unwrap();

            assert_eq!(outcomes.len(), devices.len());
            let seen: HashSet<&str> = outcomes.iter().map(|o| o.device().as_str()).collect();
            assert_eq!(seen.len(), devices.len());
            assert!(outcomes.iter().all(Outcome::is_success));
        }
    }

    #[tokio::test]
    async fn test_failing_device_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new());
        connector.script("10.0.0.2", DeviceScript::refusing("connection refused"));

        let devices = targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let (orch, _tx) = orchestrator(connector, dir.path(), 3);
        let outcomes = orch
            .run(&devices, &Credential::new("admin", "secret"), &commands())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);

        let mut artifacts = HashSet::new();
        let mut failures = Vec::new();
        for outcome in &outcomes {
            match outcome {
                Outcome::Success { artifact, .. } => {
                    artifacts.insert(artifact.clone());
                }
                Outcome::Failure { device, error } => {
                    failures.push((device.clone(), error.clone()));
                }
            }
        }
        assert_eq!(artifacts.len(), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.as_str(), "10.0.0.2");
        assert!(!failures[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_wall_clock_bounded_by_slowest_device() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new());
        let devices = targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]);
        for device in &devices {
            connector.script(
                device.as_str(),
                DeviceScript::default().with_latency(Duration::from_millis(200)),
            );
        }

        let (orch, _tx) = orchestrator(connector, dir.path(), devices.len());
        let started = Instant::now();
        let outcomes = orch
            .run(
                &devices,
                &Credential::new("admin", "secret"),
                &["show clock".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), devices.len());
        // Five devices at 200ms each would take a second sequentially
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_zero_concurrency_fails_before_any_device() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new());
        let (orch, _tx) = orchestrator(connector.clone(), dir.path(), 0);

        let result = orch
            .run(
                &targets(&["10.0.0.1"]),
                &Credential::new("admin", "secret"),
                &commands(),
            )
            .await;

        assert!(result.is_err());
        assert!(connector.open_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_device_list_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new());
        let (orch, _tx) = orchestrator(connector, dir.path(), 4);

        let outcomes = orch
            .run(&[], &Credential::new("admin", "secret"), &commands())
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_work() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new());
        let devices = targets(&["10.0.0.1", "10.0.0.2"]);
        let (orch, tx) = orchestrator(connector.clone(), dir.path(), 2);

        tx.send(true).unwrap();
        let outcomes = orch
            .run(&devices, &Credential::new("admin", "secret"), &commands())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
        assert!(connector.open_attempts().is_empty());
    }
}
