//! Command line argument parsing and validation.

use crate::bundler::{
    Arch, BuildOptionsBuilder, Compression, DEFAULT_COMPRESSION_LEVEL, Distro, MetadataPolicy,
    is_valid_version,
};
use clap::Parser;
use path_absolutize::Absolutize;
use std::path::PathBuf;

/// Builds distro packages from a prebuilt proto area
#[derive(Parser, Debug)]
#[command(
    name = "protopack",
    version,
    about = "Builds .deb, .ipk and .tar.gz packages from a proto area",
    long_about = "Builds one package per catalog entry for a single (distro, arch) pair.

Each package's subtree of the proto area is copied into a work directory, a control
file and lifecycle scripts are added, and the distro's build tool produces the
artifact in the output directory.

Usage:
  protopack -D debian -A amd64 -p proto.x86_64
  protopack -D openwrt -A armhf -p proto.armv7l --script-dir build
  protopack -D archive -A amd64 -p proto.x86_64 -Z none

A (distro, arch) pair with no package output exits 0 without touching anything."
)]
pub struct Args {
    /// Logical architecture: armhf or amd64
    #[arg(short = 'A', long, value_name = "ARCH")]
    pub arch: String,

    /// Distribution: debian, openwrt or archive (raspbian is debian)
    #[arg(short = 'D', long, value_name = "DISTRO")]
    pub distro: String,

    /// Root of the proto area
    #[arg(short = 'p', long, value_name = "DIR")]
    pub proto: PathBuf,

    /// Run lintian on built .deb artifacts
    #[arg(long)]
    pub lint: bool,

    /// Compression type
    #[arg(short = 'Z', long, value_enum, default_value_t = Compression::Gzip)]
    pub compresstype: Compression,

    /// Compression level
    #[arg(
        short = 'z',
        long,
        default_value_t = DEFAULT_COMPRESSION_LEVEL,
        value_parser = clap::value_parser!(u32).range(0..=9)
    )]
    pub compresslevel: u32,

    /// TOML package catalog; the built-in catalog is used when absent
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving work directories and artifacts
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Directory holding debian-deb/, openwrt-ipk/ and the ipkg-build tool
    #[arg(long, value_name = "DIR", default_value = "build")]
    pub script_dir: PathBuf,

    /// Package version; defaults to a calendar version
    #[arg(long, value_name = "VERSION")]
    pub pkg_version: Option<String>,

    /// Fail a package whose control file cannot be rendered
    #[arg(long)]
    pub strict_metadata: bool,

    /// Run build tools without fakeroot
    #[arg(long)]
    pub no_fakeroot: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if !self.proto.is_dir() {
            return Err(format!(
                "proto area {} is not a directory",
                self.proto.display()
            ));
        }
        if !self.output_dir.is_dir() {
            return Err(format!(
                "output directory {} is not a directory",
                self.output_dir.display()
            ));
        }
        if let Some(config) = self.config.as_ref().filter(|c| !c.is_file()) {
            return Err(format!("catalog {} not found", config.display()));
        }
        if let Some(version) = self
            .pkg_version
            .as_deref()
            .filter(|v| !is_valid_version(v))
        {
            return Err(format!(
                "package version '{version}' must start with a digit and use only [A-Za-z0-9.+~:-]"
            ));
        }
        Ok(())
    }

    /// Options builder seeded from the arguments, with absolute paths.
    ///
    /// Lint and fakeroot depend on the host and are left to the caller.
    pub fn options_builder(&self, distro: Distro, arch: Arch) -> std::io::Result<BuildOptionsBuilder> {
        let policy = if self.strict_metadata {
            MetadataPolicy::Strict
        } else {
            MetadataPolicy::Lenient
        };

        let mut builder = BuildOptionsBuilder::new()
            .distro(distro)
            .arch(arch)
            .proto_root(self.proto.absolutize()?)
            .output_dir(self.output_dir.absolutize()?)
            .script_root(self.script_dir.absolutize()?)
            .compression(self.compresstype)
            .compression_level(self.compresslevel)
            .metadata_policy(policy);
        if let Some(version) = &self.pkg_version {
            builder = builder.version(version.clone());
        }
        Ok(builder)
    }
}
