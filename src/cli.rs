//! Command-line interface

use clap::Parser;
use confsnap_session::DeviceType;
use std::path::PathBuf;

/// Snapshot configuration from a fleet of network devices in one run
#[derive(Parser, Debug)]
#[command(name = "confsnap", version, about)]
pub struct Cli {
    /// Device inventory, one hostname or IP per line
    #[arg(long, default_value = "devices.txt")]
    pub devices: PathBuf,

    /// Credential file containing a single username:password line
    #[arg(long, default_value = "credentials.txt")]
    pub credentials: PathBuf,

    /// Commands to run on every device, one per line
    #[arg(long, default_value = "commands.txt")]
    pub commands: PathBuf,

    /// Directory that receives one artifact per device
    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Maximum devices polled at once
    #[arg(long, default_value_t = 50)]
    pub concurrency: usize,

    /// Device dialect profile
    #[arg(long, default_value_t = DeviceType::CiscoIos)]
    pub device_type: DeviceType,

    /// TCP port for the session transport
    #[arg(long, default_value_t = confsnap_session::DEFAULT_PORT)]
    pub port: u16,

    /// Trade output-completeness safety margins for lower latency
    #[arg(long)]
    pub fast: bool,

    /// Hard per-command read deadline in seconds (default: none)
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,
}
