//! camagent library
//!
//! LAN discovery, classification and provisioning of video-surveillance hardware.
//!
//! ## Components
//!
//! 1. IpcamScan - subnet guard, port probe, fingerprints, vendor and device-kind classifiers, ONVIF
//! 2. BoundedRunner - ordered fan-out with a concurrency ceiling
//! 3. Provision - recorder/camera creation against the inventory API
//! 4. Deploy - safety gate and dispatcher for the relay config
//!
//! Scan and provisioning runs are pure functions of their inputs and the live
//! network; nothing is persisted.

pub mod bounded_runner;
pub mod config;
pub mod deploy;
pub mod error;
pub mod ipcam_scan;
pub mod provision;

pub use config::AgentConfig;
pub use error::{Error, Result};
