//! Agent configuration
//!
//! Process-wide policy read from the environment. Per-run parameters (subnets,
//! API URL, flags) come from the command line instead.

use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Whether deploy targets may carry a restart command at all
    pub allow_restart_commands: bool,
    /// Directory for the temporary copy of the relay config
    pub temp_dir: PathBuf,
    /// Inventory API request timeout in seconds
    pub api_timeout_secs: u64,
    /// Deadline for each external process (scp, ssh, docker, restart)
    pub command_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            allow_restart_commands: std::env::var("CAMAGENT_ALLOW_RESTART_COMMANDS")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            temp_dir: std::env::var("CAMAGENT_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            api_timeout_secs: std::env::var("CAMAGENT_API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            command_timeout_secs: std::env::var("CAMAGENT_COMMAND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}

impl AgentConfig {
    /// Inventory API request timeout
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// External process deadline
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
