//! CPU architecture types and the distro architecture registry.

use super::Distro;
use crate::bundler::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Logical CPU architecture of a proto area.
///
/// These are the names used on the command line and in package catalogs.
/// Each distribution spells them differently; see [`ArchRegistry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// ARM with hard-float (32-bit) - Raspberry Pi and embedded ARM
    Armhf,
    /// x86_64 / AMD64 (64-bit)
    Amd64,
}

impl Arch {
    /// Returns the logical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Armhf => "armhf",
            Arch::Amd64 => "amd64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "armhf" => Ok(Arch::Armhf),
            "amd64" => Ok(Arch::Amd64),
            other => Err(Error::UnknownArchitecture {
                distro: "any".to_string(),
                arch: other.to_string(),
            }),
        }
    }
}

/// Read-only mapping from (distro, logical arch) to the distro's arch string.
///
/// Initialized once as a static table; nothing mutates it after startup.
pub struct ArchRegistry {
    entries: &'static [(Distro, Arch, &'static str)],
}

/// Process-wide registry.
pub static ARCH_REGISTRY: ArchRegistry = ArchRegistry {
    entries: &[
        (Distro::Debian, Arch::Armhf, "armhf"),
        (Distro::Debian, Arch::Amd64, "amd64"),
        (Distro::Openwrt, Arch::Armhf, "arm_cortex-a7_neon-vfpv4"),
        (Distro::Archive, Arch::Armhf, "armhf"),
        (Distro::Archive, Arch::Amd64, "amd64"),
    ],
};

impl ArchRegistry {
    /// Resolves the distro-specific architecture string.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownArchitecture`] when the table has no entry for the pair.
    pub fn resolve(&self, distro: Distro, arch: Arch) -> Result<&'static str> {
        self.entries
            .iter()
            .find(|(d, a, _)| *d == distro && *a == arch)
            .map(|(_, _, s)| *s)
            .ok_or_else(|| Error::UnknownArchitecture {
                distro: distro.to_string(),
                arch: arch.to_string(),
            })
    }

    /// Whether any artifact can be produced for the pair.
    pub fn supports(&self, distro: Distro, arch: Arch) -> bool {
        self.resolve(distro, arch).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debian_uses_logical_names() {
        assert_eq!(ARCH_REGISTRY.resolve(Distro::Debian, Arch::Amd64).unwrap(), "amd64");
        assert_eq!(ARCH_REGISTRY.resolve(Distro::Debian, Arch::Armhf).unwrap(), "armhf");
    }

    #[test]
    fn test_openwrt_maps_armhf_to_cortex() {
        assert_eq!(
            ARCH_REGISTRY.resolve(Distro::Openwrt, Arch::Armhf).unwrap(),
            "arm_cortex-a7_neon-vfpv4"
        );
    }

    #[test]
    fn test_openwrt_has_no_amd64() {
        let err = ARCH_REGISTRY.resolve(Distro::Openwrt, Arch::Amd64).unwrap_err();
        assert!(matches!(err, Error::UnknownArchitecture { .. }));
        assert!(!ARCH_REGISTRY.supports(Distro::Openwrt, Arch::Amd64));
    }

    #[test]
    fn test_parse_unknown_arch() {
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::Amd64);
        assert!(matches!(
            "arm".parse::<Arch>(),
            Err(Error::UnknownArchitecture { .. })
        ));
    }
}
