//! Deploy - relay config dispatch
//!
//! ## Responsibilities
//!
//! - Safety gate over every deploy target (see [`guard`])
//! - Temp-file staging of the generated config, always cleaned up
//! - Transfer via scp, `docker cp` or a direct write, then the optional restart
//!
//! Processes are started with argument arrays. No shell is involved.

pub mod guard;
pub mod types;

pub use types::{DeployConfig, DeployMode, DeployOutcome, DockerTarget, LocalTarget, SshTarget};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::process::Command;

use crate::config::AgentConfig;
use crate::error::{Error, Result};

/// Runs an external program with an argument array
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion; non-zero exit is an error carrying stderr
    async fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        // kill_on_drop: a timed-out child is killed when the future is dropped
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("{} spawn failed: {}", program, e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Process(format!(
                        "{} exited with {}: {}",
                        program,
                        output.status,
                        stderr.trim()
                    )));
                }
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(Err(e)) => Err(Error::Process(format!("{} execution failed: {}", program, e))),
            Err(_) => {
                tracing::warn!(
                    program = program,
                    timeout_secs = self.timeout.as_secs(),
                    "Process timeout, killed via kill_on_drop"
                );
                Err(Error::Process(format!(
                    "{} timeout ({}s)",
                    program,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Staged copy of the config; removed by [`StagedConfig::remove`]
struct StagedConfig {
    path: PathBuf,
}

impl StagedConfig {
    async fn create(dir: &Path, content: &[u8]) -> Result<Self> {
        let name = format!(
            "mediamtx_{}_{:x}.yml",
            chrono::Utc::now().timestamp_millis(),
            rand::thread_rng().gen::<u64>()
        );
        let path = dir.join(name);
        tokio::fs::write(&path, content).await?;
        Ok(Self { path })
    }

    fn arg(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    async fn remove(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged config");
        }
    }
}

/// Validates and performs deploys
#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<dyn CommandRunner>,
    config: AgentConfig,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, config: AgentConfig) -> Self {
        Self { runner, config }
    }

    /// Dispatcher using real processes
    pub fn system(config: AgentConfig) -> Self {
        let runner = Arc::new(SystemRunner::new(config.command_timeout()));
        Self::new(runner, config)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Gate check only
    pub fn validate(&self, deploy: &DeployConfig) -> Result<()> {
        guard::validate(deploy, &self.config)
    }

    /// Validate, stage, transfer, restart. The staged file is removed on every path.
    pub async fn dispatch(&self, deploy: &DeployConfig, content: &[u8]) -> Result<DeployOutcome> {
        self.validate(deploy)?;

        let staged = StagedConfig::create(&self.config.temp_dir, content).await?;
        let result = self.transfer(deploy, &staged, content).await;
        staged.remove().await;

        match &result {
            Ok(outcome) => tracing::info!(
                mode = %outcome.mode,
                destination = %outcome.destination,
                restarted = outcome.restarted,
                "Relay config deployed"
            ),
            Err(e) => tracing::error!(mode = %deploy.mode(), error = %e, "Relay config deploy failed"),
        }
        result
    }

    async fn transfer(
        &self,
        deploy: &DeployConfig,
        staged: &StagedConfig,
        content: &[u8],
    ) -> Result<DeployOutcome> {
        match deploy {
            DeployConfig::Ssh { ssh } => {
                let login = format!("{}@{}", ssh.user, ssh.host);
                let destination = format!("{}:{}", login, ssh.remote_path);
                let port = ssh.port.to_string();

                self.runner
                    .run("scp", &[
                        "-P".to_string(),
                        port.clone(),
                        staged.arg(),
                        destination.clone(),
                    ])
                    .await?;

                let restarted = match deploy.restart_command() {
                    Some(command) => {
                        self.runner
                            .run("ssh", &["-p".to_string(), port, login, command.to_string()])
                            .await?;
                        true
                    }
                    None => false,
                };

                Ok(DeployOutcome {
                    mode: DeployMode::Ssh,
                    destination,
                    port: Some(ssh.port),
                    restarted,
                })
            }
            DeployConfig::Docker { docker } => {
                let destination = format!("{}:{}", docker.container, docker.config_path);
                self.runner
                    .run("docker", &["cp".to_string(), staged.arg(), destination.clone()])
                    .await?;

                if docker.restart {
                    self.runner
                        .run("docker", &["restart".to_string(), docker.container.clone()])
                        .await?;
                }

                Ok(DeployOutcome {
                    mode: DeployMode::Docker,
                    destination,
                    port: None,
                    restarted: docker.restart,
                })
            }
            DeployConfig::Local { local } => {
                tokio::fs::write(&local.path, content).await?;

                let restarted = match deploy.restart_command() {
                    Some(command) => {
                        let mut argv = command.split_whitespace().map(String::from);
                        let program = argv
                            .next()
                            .ok_or_else(|| Error::UnsafeDeploy("empty restart command".to_string()))?;
                        let args: Vec<String> = argv.collect();
                        self.runner.run(&program, &args).await?;
                        true
                    }
                    None => false,
                };

                Ok(DeployOutcome {
                    mode: DeployMode::Local,
                    destination: local.path.clone(),
                    port: None,
                    restarted,
                })
            }
        }
    }
}
