//! Connector and session traits for pluggable device transports

use crate::{CommandError, ConnectError, SessionConfig};
use async_trait::async_trait;

/// An open, authenticated, paging-disabled channel to one device
#[async_trait]
pub trait DeviceSession: Send {
    /// Run one command and return its raw output
    async fn run_command(&mut self, command: &str) -> Result<String, CommandError>;

    /// Close the session gracefully
    async fn close(&mut self) -> Result<(), CommandError>;
}

/// Factory for opening device sessions
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// The session type this connector produces
    type Session: DeviceSession;

    /// Open an authenticated session to the configured device
    async fn open(&self, config: &SessionConfig) -> Result<Self::Session, ConnectError>;

    /// Human-readable name for this connector
    fn name(&self) -> &'static str;
}
