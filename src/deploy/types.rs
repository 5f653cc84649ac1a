//! Deploy target types

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_ssh_port() -> u16 {
    22
}

/// SSH target: config copied with scp, restart run over ssh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshTarget {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub user: String,
    pub remote_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
}

/// Docker target: config copied with `docker cp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerTarget {
    pub container: String,
    pub config_path: String,
    #[serde(default)]
    pub restart: bool,
}

/// Local filesystem target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTarget {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
}

/// Where the relay config goes; exactly one target per document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DeployConfig {
    Ssh { ssh: SshTarget },
    Docker { docker: DockerTarget },
    Local { local: LocalTarget },
}

impl DeployConfig {
    pub fn mode(&self) -> DeployMode {
        match self {
            DeployConfig::Ssh { .. } => DeployMode::Ssh,
            DeployConfig::Docker { .. } => DeployMode::Docker,
            DeployConfig::Local { .. } => DeployMode::Local,
        }
    }

    /// Restart command, blank treated as absent
    pub fn restart_command(&self) -> Option<&str> {
        let cmd = match self {
            DeployConfig::Ssh { ssh } => ssh.restart_command.as_deref(),
            DeployConfig::Local { local } => local.restart_command.as_deref(),
            DeployConfig::Docker { .. } => None,
        };
        cmd.map(str::trim).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    Ssh,
    Docker,
    Local,
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployMode::Ssh => "ssh",
            DeployMode::Docker => "docker",
            DeployMode::Local => "local",
        };
        f.write_str(s)
    }
}

/// Result of a completed dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub mode: DeployMode,
    /// `user@host:path`, `container:path` or the local path
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub restarted: bool,
}
