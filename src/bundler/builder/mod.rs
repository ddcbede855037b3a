//! Build orchestration.
//!
//! [`Packager`] plans one [`BuildJob`] per applicable package, checks every
//! proto area up front, then drives each job through its lifecycle.
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`job`] - per-package state machine and lifecycle steps
//! - [`orchestrator`] - the [`Packager`] run loop and its [`BuildReport`]
//! - [`tool_detection`] - external tool availability checking

mod checksum;
mod job;
mod orchestrator;
mod tool_detection;

pub use checksum::calculate_sha256;
pub use job::{BuildJob, JobState, LIFECYCLE_HOOKS, apply_metadata_policy};
pub use orchestrator::{BuildReport, BuiltArtifact, JobFailure, Packager};
pub use tool_detection::{HAS_DPKG_DEB, HAS_FAKEROOT, HAS_LINTIAN};
