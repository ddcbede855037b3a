//! Per-run build options and their builder.

use super::{Arch, Distro};
use crate::bundler::error::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};

/// Revision suffix appended to every calendar version.
pub const VERSION_REVISION: &str = "1";

/// Default gzip/xz level handed to the build tool.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 5;

/// Compression applied by the build tool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Compression {
    /// Store only
    None,
    /// gzip (default)
    #[default]
    Gzip,
    /// xz
    Xz,
}

impl Compression {
    /// Name understood by `dpkg-deb -Z`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Xz => "xz",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when the control template fails to render.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MetadataPolicy {
    /// Log the failure, leave the control file empty, keep building
    #[default]
    Lenient,
    /// Fail the job
    Strict,
}

/// Builds the calendar version shared by every job in a run: `0.0.<YYMMDDHHMM>-1`.
pub fn calendar_version(now: DateTime<Local>) -> String {
    format!("0.0.{}-{}", now.format("%y%m%d%H%M"), VERSION_REVISION)
}

/// Whether `version` is a Debian version string: a leading digit followed by
/// alphanumerics and `.+~:-`. Versions end up in file names.
pub fn is_valid_version(version: &str) -> bool {
    let mut chars = version.chars();
    chars.next().is_some_and(|c| c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_alphanumeric() || ".+~:-".contains(c))
}

/// Options for one packaging run.
///
/// Constructed via [`BuildOptionsBuilder`]; immutable once built and shared by
/// every job in the run.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    distro: Distro,
    arch: Arch,
    version: String,
    proto_root: PathBuf,
    output_dir: PathBuf,
    script_root: PathBuf,
    compression: Compression,
    compression_level: u32,
    lint: bool,
    metadata_policy: MetadataPolicy,
    use_fakeroot: bool,
}

impl BuildOptions {
    /// Target distribution (after alias normalization).
    pub fn distro(&self) -> Distro {
        self.distro
    }

    /// Requested logical architecture.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Version string shared by all jobs.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Root of the staged file tree.
    pub fn proto_root(&self) -> &Path {
        &self.proto_root
    }

    /// Where work directories and artifacts are created.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Root holding per-distro lifecycle scripts and helper tools.
    pub fn script_root(&self) -> &Path {
        &self.script_root
    }

    /// Compression type.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Compression level, 0-9.
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Whether to lint built artifacts.
    pub fn lint(&self) -> bool {
        self.lint
    }

    /// Template failure policy.
    pub fn metadata_policy(&self) -> MetadataPolicy {
        self.metadata_policy
    }

    /// Whether build tools run under fakeroot.
    pub fn use_fakeroot(&self) -> bool {
        self.use_fakeroot
    }
}

/// Builder for [`BuildOptions`].
#[derive(Default)]
pub struct BuildOptionsBuilder {
    distro: Option<Distro>,
    arch: Option<Arch>,
    version: Option<String>,
    proto_root: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    script_root: Option<PathBuf>,
    compression: Compression,
    compression_level: Option<u32>,
    lint: bool,
    metadata_policy: MetadataPolicy,
    use_fakeroot: bool,
}

impl BuildOptionsBuilder {
    /// Creates a new options builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the target distribution. Required.
    pub fn distro(mut self, distro: Distro) -> Self {
        self.distro = Some(distro);
        self
    }

    /// Sets the logical architecture. Required.
    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Overrides the version.
    ///
    /// Default: [`calendar_version`] of the current local time
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the proto area root. Required.
    pub fn proto_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.proto_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output directory.
    ///
    /// Default: current directory
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the lifecycle script root.
    ///
    /// Default: `build`
    pub fn script_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.script_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the compression type.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the compression level.
    ///
    /// Default: [`DEFAULT_COMPRESSION_LEVEL`]
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Enables linting of built artifacts.
    pub fn lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    /// Sets the template failure policy.
    pub fn metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    /// Runs build tools under fakeroot.
    pub fn use_fakeroot(mut self, use_fakeroot: bool) -> Self {
        self.use_fakeroot = use_fakeroot;
        self
    }

    /// Builds the options.
    ///
    /// # Errors
    ///
    /// Returns an error if distro, arch, or proto root are missing, or the
    /// compression level is outside 0-9.
    pub fn build(self) -> Result<BuildOptions> {
        let compression_level = self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        if compression_level > 9 {
            crate::bail!("compression level {compression_level} out of range 0-9");
        }
        if let Some(version) = self.version.as_deref().filter(|v| !is_valid_version(v)) {
            crate::bail!("invalid package version '{version}'");
        }

        Ok(BuildOptions {
            distro: self.distro.context("distro is required")?,
            arch: self.arch.context("arch is required")?,
            version: self
                .version
                .unwrap_or_else(|| calendar_version(Local::now())),
            proto_root: self.proto_root.context("proto_root is required")?,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            script_root: self.script_root.unwrap_or_else(|| PathBuf::from("build")),
            compression: self.compression,
            compression_level,
            lint: self.lint,
            metadata_policy: self.metadata_policy,
            use_fakeroot: self.use_fakeroot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_version_format() {
        let now = Local.with_ymd_and_hms(2018, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(calendar_version(now), "0.0.1803070905-1");
    }

    #[test]
    fn test_version_characters() {
        assert!(is_valid_version("0.0.1803070905-1"));
        assert!(is_valid_version("1:2.0~rc1+dfsg-3"));
        for bad in ["", "../1", "1/2", "v1", "1 2"] {
            assert!(!is_valid_version(bad), "{bad:?} accepted");
        }

        let res = BuildOptionsBuilder::new()
            .distro(Distro::Archive)
            .arch(Arch::Amd64)
            .proto_root("proto")
            .version("../../x")
            .build();
        assert!(res.is_err());
    }

    #[test]
    fn test_defaults() {
        let opts = BuildOptionsBuilder::new()
            .distro(Distro::Debian)
            .arch(Arch::Amd64)
            .proto_root("proto")
            .build()
            .unwrap();
        assert_eq!(opts.compression(), Compression::Gzip);
        assert_eq!(opts.compression_level(), 5);
        assert_eq!(opts.output_dir(), Path::new("."));
        assert_eq!(opts.script_root(), Path::new("build"));
        assert_eq!(opts.metadata_policy(), MetadataPolicy::Lenient);
        assert!(opts.version().starts_with("0.0."));
        assert!(opts.version().ends_with("-1"));
        assert!(!opts.lint());
    }

    #[test]
    fn test_missing_proto_root() {
        let err = BuildOptionsBuilder::new()
            .distro(Distro::Debian)
            .arch(Arch::Amd64)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "proto_root is required");
    }

    #[test]
    fn test_level_out_of_range() {
        let res = BuildOptionsBuilder::new()
            .distro(Distro::Debian)
            .arch(Arch::Amd64)
            .proto_root("proto")
            .compression_level(12)
            .build();
        assert!(res.is_err());
    }
}
