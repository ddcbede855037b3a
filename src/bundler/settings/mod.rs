//! Configuration structures for packaging runs.
//!
//! This module holds the read-only tables (architecture registry, distro
//! profiles), the package catalog, and the per-run build options.

mod arch;
mod catalog;
mod distro;
mod options;
mod package;

// Re-export all public types
pub use arch::{ARCH_REGISTRY, Arch, ArchRegistry};
pub use catalog::{builtin_catalog, load_catalog, parse_catalog};
pub use distro::{BuildTool, ControlFormat, Distro, DistroProfile, profile_for};
pub use options::{
    BuildOptions, BuildOptionsBuilder, Compression, DEFAULT_COMPRESSION_LEVEL, MetadataPolicy,
    VERSION_REVISION, calendar_version, is_valid_version,
};
pub use package::{PackageSpec, validate_catalog};
