//! Provision - inventory provisioning from a declarative document
//!
//! ## Responsibilities
//!
//! - Recorders first, in document order, then cameras
//! - Symbolic recorder names resolved to generated ids for later cameras
//! - Optional connection test and ONVIF sync per recorder
//! - Optional relay deploy, gated before any API call is made
//!
//! Strictly sequential. Any API failure other than a connection test aborts the run.

pub mod client;
pub mod types;

pub use client::{HttpInventoryClient, InventoryApi};
pub use types::*;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::deploy::{DeployConfig, DeployOutcome, Dispatcher};
use crate::error::Result;

/// Placeholder id prefix used for recorders in dry-run previews
pub const DRY_RUN_ID_PREFIX: &str = "dry-run:";

/// Run-level switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionFlags {
    /// Log payloads, call nothing
    pub dry_run: bool,
    /// Test every recorder's connection
    pub test: bool,
    /// ONVIF-sync every recorder
    pub sync: bool,
    /// Run the document's deploy spec
    pub deploy: bool,
}

/// One observable step of a provisioning run
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionEvent {
    RecorderPlanned { payload: RecorderPayload },
    RecorderCreated { id: String, name: String },
    ConnectionTested { id: String, ok: bool, detail: Option<String> },
    OnvifSynced { id: String },
    CameraPlanned { payload: CameraPayload },
    CameraCreated { name: String, nvr_id: Option<String> },
    CameraUnlinked { name: String, nvr_ref: String },
    DeployPlanned { config: DeployConfig, local: bool },
    DeployTriggered { mode: String },
    Deployed { outcome: DeployOutcome },
}

impl fmt::Display for ProvisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionEvent::RecorderPlanned { payload } => write!(
                f,
                "[DRY] create nvr {}",
                serde_json::to_string(&payload.redacted()).unwrap_or_default()
            ),
            ProvisionEvent::RecorderCreated { id, name } => write!(f, "created nvr {} {}", id, name),
            ProvisionEvent::ConnectionTested { id, ok: true, .. } => write!(f, "test ok {}", id),
            ProvisionEvent::ConnectionTested { id, ok: false, detail } => write!(
                f,
                "test failed {}: {}",
                id,
                detail.as_deref().unwrap_or("unknown error")
            ),
            ProvisionEvent::OnvifSynced { id } => write!(f, "onvif sync ok {}", id),
            ProvisionEvent::CameraPlanned { payload } => write!(
                f,
                "[DRY] create camera {}",
                serde_json::to_string(payload).unwrap_or_default()
            ),
            ProvisionEvent::CameraCreated { name, .. } => write!(f, "created camera {}", name),
            ProvisionEvent::CameraUnlinked { name, nvr_ref } => write!(
                f,
                "warning: camera {} references unknown nvr {}, creating without link",
                name, nvr_ref
            ),
            ProvisionEvent::DeployPlanned { config, local } => write!(
                f,
                "[DRY] deploy mediamtx ({}, {})",
                config.mode(),
                if *local { "local dispatch" } else { "via API" }
            ),
            ProvisionEvent::DeployTriggered { mode } => write!(f, "mediamtx deploy ok ({} via API)", mode),
            ProvisionEvent::Deployed { outcome } => write!(
                f,
                "mediamtx deploy ok ({} -> {}{})",
                outcome.mode,
                outcome.destination,
                if outcome.restarted { ", restarted" } else { "" }
            ),
        }
    }
}

/// Everything a run did, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionReport {
    pub events: Vec<ProvisionEvent>,
}

impl ProvisionReport {
    fn push(&mut self, event: ProvisionEvent) {
        tracing::info!(event = %event, "Provision step");
        self.events.push(event);
    }

    /// Human-readable lines, one per event
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Ids of created recorders, in creation order
    pub fn created_recorders(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProvisionEvent::RecorderCreated { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Provisioning orchestrator
pub struct Provisioner {
    api: Arc<dyn InventoryApi>,
    dispatcher: Dispatcher,
    school_id: String,
}

impl Provisioner {
    pub fn new(api: Arc<dyn InventoryApi>, dispatcher: Dispatcher, school_id: impl Into<String>) -> Self {
        Self {
            api,
            dispatcher,
            school_id: school_id.into(),
        }
    }

    /// Execute a document.
    ///
    /// `relay_config` is the generated relay config; when present the deploy is
    /// dispatched locally, otherwise the backend is asked to deploy.
    pub async fn run(
        &self,
        input: &ProvisionInput,
        flags: ProvisionFlags,
        relay_config: Option<&[u8]>,
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        // Gate the deploy spec before any API call
        let deploy = match (&input.deploy, flags.deploy) {
            (Some(config), true) => {
                self.dispatcher.validate(config)?;
                Some(config)
            }
            (None, true) => {
                tracing::warn!("--deploy given but the document has no deploy section");
                None
            }
            _ => None,
        };

        let recorder_ids = self.provision_recorders(input, flags, &mut report).await?;
        self.provision_cameras(input, flags, &recorder_ids, &mut report)
            .await?;

        if let Some(config) = deploy {
            self.deploy(config, flags, relay_config, &mut report).await?;
        }

        tracing::info!(
            school_id = %self.school_id,
            dry_run = flags.dry_run,
            steps = report.events.len(),
            "Provisioning complete"
        );
        Ok(report)
    }

    /// Stage 1-3: Recorders, tests, syncs. Returns symbolic name → id.
    async fn provision_recorders(
        &self,
        input: &ProvisionInput,
        flags: ProvisionFlags,
        report: &mut ProvisionReport,
    ) -> Result<HashMap<String, String>> {
        let mut ids = HashMap::new();

        for spec in &input.nvrs {
            let payload = spec.payload();

            if flags.dry_run {
                ids.insert(
                    spec.symbolic_name().to_string(),
                    format!("{}{}", DRY_RUN_ID_PREFIX, spec.symbolic_name()),
                );
                report.push(ProvisionEvent::RecorderPlanned { payload });
                continue;
            }

            let created = self.api.create_recorder(&self.school_id, &payload).await?;
            ids.insert(spec.symbolic_name().to_string(), created.id.clone());
            report.push(ProvisionEvent::RecorderCreated {
                id: created.id.clone(),
                name: created.name.clone(),
            });

            if flags.test || spec.test_connection.unwrap_or(false) {
                let event = match self.api.test_connection(&created.id).await {
                    Ok(_) => ProvisionEvent::ConnectionTested {
                        id: created.id.clone(),
                        ok: true,
                        detail: None,
                    },
                    Err(e) => {
                        tracing::warn!(recorder_id = %created.id, error = %e, "Connection test failed");
                        ProvisionEvent::ConnectionTested {
                            id: created.id.clone(),
                            ok: false,
                            detail: Some(e.to_string()),
                        }
                    }
                };
                report.push(event);
            }

            if flags.sync || spec.sync_onvif.unwrap_or(false) {
                self.api
                    .onvif_sync(&created.id, &spec.sync_request())
                    .await?;
                report.push(ProvisionEvent::OnvifSynced {
                    id: created.id.clone(),
                });
            }
        }

        Ok(ids)
    }

    /// Stage 4: Cameras with resolved recorder links
    async fn provision_cameras(
        &self,
        input: &ProvisionInput,
        flags: ProvisionFlags,
        recorder_ids: &HashMap<String, String>,
        report: &mut ProvisionReport,
    ) -> Result<()> {
        for spec in &input.cameras {
            let nvr_id = resolve_recorder(spec, recorder_ids);

            if nvr_id.is_none() {
                if let Some(nvr_ref) = &spec.nvr_ref {
                    report.push(ProvisionEvent::CameraUnlinked {
                        name: spec.name.clone(),
                        nvr_ref: nvr_ref.clone(),
                    });
                }
            }

            let payload = spec.payload(nvr_id);

            if flags.dry_run {
                report.push(ProvisionEvent::CameraPlanned { payload });
                continue;
            }

            self.api.create_camera(&self.school_id, &payload).await?;
            report.push(ProvisionEvent::CameraCreated {
                name: payload.name,
                nvr_id: payload.nvr_id,
            });
        }
        Ok(())
    }

    /// Stage 5: Relay deploy (already gated)
    async fn deploy(
        &self,
        config: &DeployConfig,
        flags: ProvisionFlags,
        relay_config: Option<&[u8]>,
        report: &mut ProvisionReport,
    ) -> Result<()> {
        if flags.dry_run {
            report.push(ProvisionEvent::DeployPlanned {
                config: config.clone(),
                local: relay_config.is_some(),
            });
            return Ok(());
        }

        match relay_config {
            Some(content) => {
                let outcome = self.dispatcher.dispatch(config, content).await?;
                report.push(ProvisionEvent::Deployed { outcome });
            }
            None => {
                self.api.trigger_deploy(&self.school_id, config).await?;
                report.push(ProvisionEvent::DeployTriggered {
                    mode: config.mode().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Explicit id first, then the symbolic name map
pub fn resolve_recorder(spec: &CameraSpec, recorder_ids: &HashMap<String, String>) -> Option<String> {
    spec.nvr_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            spec.nvr_ref
                .as_ref()
                .and_then(|r| recorder_ids.get(r))
                .cloned()
        })
}
