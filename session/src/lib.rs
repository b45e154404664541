//! Device session capability for confsnap
//!
//! Shared vocabulary types plus the connector/session traits used to talk
//! to one network device over an interactive command channel. Concrete
//! transports live in submodules; the fleet orchestrator depends only on
//! the trait surface.

pub mod mock;
pub mod tcp;
pub mod timing;
mod traits;

pub use traits::{DeviceSession, SessionConnector};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default port for the line-oriented TCP transport
pub const DEFAULT_PORT: u16 = 23;

/// Default timeout for establishing the underlying connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single fleet member, identified by hostname or IP address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceTarget(String);

impl DeviceTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceTarget {
    fn from(host: &str) -> Self {
        Self(host.to_string())
    }
}

/// Login credentials, shared read-only by every worker
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// The password must never reach logs or panic messages
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Device dialect profile (paging and setup behavior varies per vendor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    CiscoIos,
    CiscoXe,
    Junos,
}

impl DeviceType {
    /// Command that disables output paging for this dialect
    pub fn paging_disable(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos | DeviceType::CiscoXe => "terminal length 0",
            DeviceType::Junos => "set cli screen-length 0",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::CiscoIos => "cisco-ios",
            DeviceType::CiscoXe => "cisco-xe",
            DeviceType::Junos => "junos",
        };
        f.write_str(name)
    }
}

/// Unrecognized device dialect name
#[derive(Error, Debug)]
#[error("unknown device type: {0}")]
pub struct UnknownDeviceType(String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "cisco-ios" => Ok(DeviceType::CiscoIos),
            "cisco-xe" => Ok(DeviceType::CiscoXe),
            "junos" => Ok(DeviceType::Junos),
            other => Err(UnknownDeviceType(other.to_string())),
        }
    }
}

/// Timing-based read strategy.
///
/// Output is collected in poll-sized slices and a read ends after a quiet
/// window, not on a prompt pattern. Slower per command, but devices whose
/// output does not end in a recognizable prompt are never truncated.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    /// How long each poll waits for more output
    pub poll_interval: Duration,
    /// Upper bound on polls per read
    pub max_polls: u32,
    /// Consecutive silent polls that end a read
    pub quiet_polls: u32,
    /// Absolute per-read deadline; None disables the deadline entirely
    pub deadline: Option<Duration>,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(400),
            max_polls: 2000,
            quiet_polls: 2,
            deadline: None,
        }
    }
}

impl TimingPolicy {
    /// Low-latency variant for fleets of small, fast devices
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            ..Self::default()
        }
    }
}

/// Everything a connector needs to open one device session.
///
/// Built once per worker and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub device_type: DeviceType,
    pub host: DeviceTarget,
    pub credential: Credential,
    pub fast_mode: bool,
    pub timing: TimingPolicy,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(
        device_type: DeviceType,
        host: DeviceTarget,
        credential: Credential,
        fast_mode: bool,
    ) -> Self {
        let timing = if fast_mode {
            TimingPolicy::fast()
        } else {
            TimingPolicy::default()
        };

        Self {
            device_type,
            host,
            credential,
            fast_mode,
            timing,
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set or clear the absolute per-read deadline
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.timing.deadline = deadline;
        self
    }
}

/// Errors opening a device session
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("connection to {host} timed out after {timeout:?}")]
    Timeout { host: DeviceTarget, timeout: Duration },

    #[error("connection to {host} failed: {source}")]
    Io {
        host: DeviceTarget,
        #[source]
        source: std::io::Error,
    },

    #[error("login to {host} failed: {reason}")]
    Login { host: DeviceTarget, reason: String },

    #[error("{host} refused the session: {reason}")]
    Refused { host: DeviceTarget, reason: String },
}

/// Errors while running a command on an open session
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("peer closed the session while running {command:?}")]
    SessionClosed { command: String },

    #[error("i/o failure while running {command:?}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {command:?} exceeded its read deadline of {deadline:?}")]
    DeadlineExceeded { command: String, deadline: Duration },

    #[error("device rejected {command:?}: {reason}")]
    Rejected { command: String, reason: String },
}
