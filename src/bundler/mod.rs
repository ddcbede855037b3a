//! Package building.
//!
//! Turns subtrees of a prebuilt proto area into distro packages:
//! Debian `.deb`, OpenWrt `.ipk` and plain `.tar.gz` archives.
//!
//! ```no_run
//! use protopack::bundler::{Arch, BuildOptionsBuilder, Distro, Packager, builtin_catalog};
//!
//! # async fn example() -> protopack::bundler::Result<()> {
//! let options = BuildOptionsBuilder::new()
//!     .distro(Distro::Openwrt)
//!     .arch(Arch::Armhf)
//!     .proto_root("proto.armv7l")
//!     .output_dir("out")
//!     .build()?;
//! let report = Packager::new(options, builtin_catalog())?.run().await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod platform;
pub mod process;
pub mod settings;
pub mod template;
pub mod utils;

pub use builder::{BuildReport, BuiltArtifact, JobFailure, Packager};
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::debian::LintStatus;
pub use process::{CommandRunner, SystemRunner, ToolCommand, ToolOutput};
pub use settings::{
    Arch, BuildOptions, BuildOptionsBuilder, Compression, DEFAULT_COMPRESSION_LEVEL, Distro,
    MetadataPolicy, PackageSpec, builtin_catalog, is_valid_version, load_catalog, parse_catalog,
};
