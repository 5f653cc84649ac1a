//! camagent - LAN camera discovery and provisioning agent
//!
//! ```bash
//! # Scan the local private subnets
//! camagent scan --pretty --output scan.json
//!
//! # Scan one subnet with ONVIF enrichment
//! camagent scan --subnet 192.168.10.0/24 --onvif-user admin --onvif-pass secret
//!
//! # Provision from a reviewed document
//! camagent provision --api https://api.example --token $JWT --school-id s1 --input provision.json --test
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camagent::{
    config::AgentConfig,
    deploy::Dispatcher,
    ipcam_scan::{self, utils, OnvifCredentials, ScanOptions},
    provision::{HttpInventoryClient, ProvisionFlags, ProvisionInput, Provisioner},
};

#[derive(Parser, Debug)]
#[command(name = "camagent", version)]
#[command(about = "Discover, classify and provision LAN cameras and NVRs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan subnets for cameras and recorders
    Scan(ScanArgs),
    /// Create recorders and cameras from a provisioning document
    Provision(ProvisionArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Target subnets (CIDR or single IP); defaults to local interfaces
    #[arg(long = "subnet", value_delimiter = ',')]
    subnets: Vec<String>,

    /// Candidate ports (comma separated)
    #[arg(long)]
    ports: Option<String>,

    /// TCP connect timeout in ms
    #[arg(long, default_value_t = utils::DEFAULT_TIMEOUT_MS)]
    timeout: u64,

    /// Fingerprint request timeout in ms
    #[arg(long, default_value_t = utils::DEFAULT_HTTP_TIMEOUT_MS)]
    http_timeout: u64,

    /// Hosts examined in parallel
    #[arg(long, default_value_t = utils::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Host budget across all subnets
    #[arg(long, default_value_t = utils::DEFAULT_MAX_HOSTS)]
    max_hosts: usize,

    /// Allow non-private target ranges (not recommended)
    #[arg(long)]
    allow_public: bool,

    #[arg(long, env = "CAMAGENT_ONVIF_USER")]
    onvif_user: Option<String>,

    #[arg(long, env = "CAMAGENT_ONVIF_PASS", hide_env_values = true)]
    onvif_pass: Option<String>,

    /// ONVIF session deadline in ms
    #[arg(long, default_value_t = utils::DEFAULT_ONVIF_TIMEOUT_MS)]
    onvif_timeout: u64,

    /// Write the result to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ProvisionArgs {
    /// Inventory API base URL
    #[arg(long, env = "CAMAGENT_API_URL")]
    api: String,

    /// Bearer token
    #[arg(long, env = "CAMAGENT_TOKEN", hide_env_values = true)]
    token: String,

    #[arg(long, env = "CAMAGENT_SCHOOL_ID")]
    school_id: String,

    /// Provisioning document (JSON)
    #[arg(long)]
    input: PathBuf,

    /// Print payloads without calling anything
    #[arg(long)]
    dry_run: bool,

    /// Test every recorder's connection
    #[arg(long)]
    test: bool,

    /// ONVIF-sync every recorder
    #[arg(long)]
    sync: bool,

    /// Run the document's deploy section
    #[arg(long)]
    deploy: bool,

    /// Generated relay config to dispatch locally; without it the API deploys
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ScanArgs {
    fn to_options(&self) -> anyhow::Result<ScanOptions> {
        let ports = match &self.ports {
            Some(list) => {
                let ports = utils::parse_port_list(list);
                if ports.is_empty() {
                    bail!("--ports contains no valid port: {}", list);
                }
                ports
            }
            None => utils::default_ports(),
        };

        let onvif = match (&self.onvif_user, &self.onvif_pass) {
            (Some(username), Some(password)) => Some(OnvifCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => None,
            _ => bail!("--onvif-user and --onvif-pass must be given together"),
        };

        Ok(ScanOptions {
            subnets: self
                .subnets
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ports,
            timeout_ms: self.timeout,
            http_timeout_ms: self.http_timeout,
            concurrency: self.concurrency,
            max_hosts: self.max_hosts,
            allow_public: self.allow_public,
            onvif,
            onvif_timeout_ms: self.onvif_timeout,
        })
    }
}

async fn run_scan(args: ScanArgs) -> anyhow::Result<()> {
    let options = args.to_options()?;
    if options.allow_public {
        tracing::warn!("Public ranges allowed, make sure you are authorized to scan them");
    }

    let result = ipcam_scan::run_scan(options).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", json))
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), devices = result.devices.len(), "Scan result written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run_provision(args: ProvisionArgs) -> anyhow::Result<()> {
    let config = AgentConfig::default();

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let input = ProvisionInput::from_json(&raw)
        .with_context(|| format!("invalid provisioning document {}", args.input.display()))?;

    let relay_config = match &args.config {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let api = HttpInventoryClient::new(&args.api, &args.token, config.api_timeout())?;
    let provisioner = Provisioner::new(Arc::new(api), Dispatcher::system(config), args.school_id);

    let flags = ProvisionFlags {
        dry_run: args.dry_run,
        test: args.test,
        sync: args.sync,
        deploy: args.deploy,
    };

    let report = provisioner
        .run(&input, flags, relay_config.as_deref())
        .await?;

    for line in report.lines() {
        println!("{}", line);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries JSON and report lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camagent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("camagent v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Scan(args) => run_scan(args).await,
        Command::Provision(args) => run_provision(args).await,
    }
}
