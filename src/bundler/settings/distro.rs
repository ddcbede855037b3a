//! Target distributions and their packaging profiles.

use super::{ARCH_REGISTRY, Arch, Compression};
use crate::bundler::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Distribution an artifact is built for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distro {
    /// Debian binary package (.deb)
    Debian,
    /// OpenWrt package (.ipk)
    Openwrt,
    /// Plain tar archive
    Archive,
}

impl Distro {
    /// Returns the canonical distro name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distro::Debian => "debian",
            Distro::Openwrt => "openwrt",
            Distro::Archive => "archive",
        }
    }

    /// Parses a distro name, mapping `raspbian` onto `debian`.
    ///
    /// Returns the distro and whether the alias was applied.
    pub fn parse_with_alias(name: &str) -> Result<(Self, bool)> {
        if name == "raspbian" {
            return Ok((Distro::Debian, true));
        }
        name.parse().map(|d| (d, false))
    }

    /// Returns the static packaging profile for this distro.
    pub fn profile(&self) -> &'static DistroProfile {
        match self {
            Distro::Debian => &DEBIAN_PROFILE,
            Distro::Openwrt => &OPENWRT_PROFILE,
            Distro::Archive => &ARCHIVE_PROFILE,
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distro {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debian" => Ok(Distro::Debian),
            "openwrt" => Ok(Distro::Openwrt),
            "archive" => Ok(Distro::Archive),
            other => Err(Error::UnsupportedDistro {
                distro: other.to_string(),
                package: None,
            }),
        }
    }
}

/// Which control template a distro renders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlFormat {
    /// dpkg control file, includes Priority
    Deb,
    /// opkg control file
    Ipk,
}

/// How a distro turns a prepared work directory into an artifact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildTool {
    /// `dpkg-deb --build`
    DpkgDeb,
    /// OpenWrt `ipkg-build` script shipped in the script directory
    IpkgBuild,
    /// In-process tar archive
    Tar,
}

/// Per-distribution packaging policy.
#[derive(Debug)]
pub struct DistroProfile {
    /// Distribution this profile describes
    pub distro: Distro,
    /// Artifact file extension, including the leading dot
    pub artifact_extension: &'static str,
    /// Control directory inside the work directory, if the format has one
    pub metadata_subdir: Option<&'static str>,
    /// Directory under the script root holding `<name>-<hook>` files
    pub script_subdir: Option<&'static str>,
    /// Control template, if the format has one
    pub control_format: Option<ControlFormat>,
    /// Tool that materializes the artifact
    pub build_tool: BuildTool,
    /// Whether the artifact can be linted
    pub lintable: bool,
}

static DEBIAN_PROFILE: DistroProfile = DistroProfile {
    distro: Distro::Debian,
    artifact_extension: ".deb",
    metadata_subdir: Some("DEBIAN"),
    script_subdir: Some("debian-deb"),
    control_format: Some(ControlFormat::Deb),
    build_tool: BuildTool::DpkgDeb,
    lintable: true,
};

static OPENWRT_PROFILE: DistroProfile = DistroProfile {
    distro: Distro::Openwrt,
    artifact_extension: ".ipk",
    metadata_subdir: Some("CONTROL"),
    script_subdir: Some("openwrt-ipk"),
    control_format: Some(ControlFormat::Ipk),
    build_tool: BuildTool::IpkgBuild,
    lintable: false,
};

static ARCHIVE_PROFILE: DistroProfile = DistroProfile {
    distro: Distro::Archive,
    artifact_extension: ".tar.gz",
    metadata_subdir: None,
    script_subdir: None,
    control_format: None,
    build_tool: BuildTool::Tar,
    lintable: false,
};

impl DistroProfile {
    /// Resolves a logical architecture through the registry.
    pub fn resolve_arch(&self, arch: Arch) -> Result<&'static str> {
        ARCH_REGISTRY.resolve(self.distro, arch)
    }

    /// Deterministic work directory name: `<name>_<version>_<arch>`.
    pub fn work_dir_name(&self, name: &str, version: &str, pkg_arch: &str) -> String {
        format!("{name}_{version}_{pkg_arch}")
    }

    /// Artifact extension once compression is known.
    ///
    /// Only the archive format changes shape: `.tar`, `.tar.gz` or `.tar.xz`.
    pub fn extension_for(&self, compression: Compression) -> &'static str {
        match (self.build_tool, compression) {
            (BuildTool::Tar, Compression::None) => ".tar",
            (BuildTool::Tar, Compression::Xz) => ".tar.xz",
            _ => self.artifact_extension,
        }
    }

    /// Artifact file name: work directory name plus the artifact extension.
    pub fn artifact_name(
        &self,
        name: &str,
        version: &str,
        pkg_arch: &str,
        compression: Compression,
    ) -> String {
        format!(
            "{}{}",
            self.work_dir_name(name, version, pkg_arch),
            self.extension_for(compression)
        )
    }
}

/// Looks up the profile for a distro name, applying the `raspbian` alias.
pub fn profile_for(name: &str) -> Result<&'static DistroProfile> {
    let (distro, aliased) = Distro::parse_with_alias(name)?;
    if aliased {
        log::info!("auto-correcting '{}' distro to '{}'", name, distro);
    }
    Ok(distro.profile())
}
