//! Multi-target package builder.
//!
//! Builds installable artifacts from a prebuilt proto area:
//! - Debian packages (.deb) via `dpkg-deb`
//! - OpenWrt packages (.ipk) via `ipkg-build`
//! - Plain archives (.tar.gz) built in-process
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, PackagerError, Result};
