//! Declarative description of a buildable product.

use super::{Arch, Distro};
use crate::bundler::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// One buildable product.
///
/// Specs are immutable once the catalog is loaded. A spec yields one build job
/// per run when the requested (distro, arch) pair is in its supported sets.
///
/// # Examples
///
/// ```
/// use protopack::bundler::{Arch, Distro, PackageSpec};
///
/// let spec = PackageSpec {
///     name: "bg-cloud".into(),
///     description: "Cloud components.".into(),
///     maintainer: "Ops <ops@example.com>".into(),
///     arches: vec![Arch::Amd64],
///     distros: vec![Distro::Debian],
///     depends: [(Distro::Debian, vec!["libc6".to_string()])].into(),
///     proto_subdir: "cloud".into(),
///     dirty_markers: vec![],
/// };
/// assert!(spec.validate().is_ok());
/// assert_eq!(spec.depends_for(Distro::Debian), ["libc6"]);
/// ```
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// Package name, unique within a run.
    pub name: String,

    /// Human description, copied verbatim into the control file.
    pub description: String,

    /// Maintainer string, copied verbatim into the control file.
    pub maintainer: String,

    /// Logical architectures this product supports. Must not be empty.
    pub arches: Vec<Arch>,

    /// Distributions this product can be packaged for.
    pub distros: Vec<Distro>,

    /// Dependency list per distribution, in display order.
    #[serde(default)]
    pub depends: BTreeMap<Distro, Vec<String>>,

    /// Location of this product's files under the proto root.
    pub proto_subdir: PathBuf,

    /// Files whose presence marks the proto subtree as dirty,
    /// relative to the proto subtree.
    #[serde(default)]
    pub dirty_markers: Vec<PathBuf>,
}

impl PackageSpec {
    /// Checks the package definition for internal consistency.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpec`] if the name is not a valid package name, `arches`
    /// is empty, a dependency list names a distro outside `distros`, or the
    /// proto subdir escapes the proto root.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSpec {
            package: self.name.clone(),
            reason,
        };

        if !is_valid_name(&self.name) {
            return Err(invalid(format!(
                "name '{}' must match [a-z0-9][a-z0-9+.-]*",
                self.name
            )));
        }
        if self.arches.is_empty() {
            return Err(invalid("no architectures listed".into()));
        }
        if let Some(distro) = self.depends.keys().find(|d| !self.distros.contains(d)) {
            return Err(invalid(format!(
                "depends lists {distro}, which is not in distros"
            )));
        }
        if !is_contained(&self.proto_subdir) {
            return Err(invalid(format!(
                "proto_subdir {} must be relative and stay inside the proto root",
                self.proto_subdir.display()
            )));
        }
        if let Some(marker) = self.dirty_markers.iter().find(|m| !is_contained(m)) {
            return Err(invalid(format!(
                "dirty marker {} must be relative",
                marker.display()
            )));
        }
        Ok(())
    }

    /// Checks that this spec can be built for the pair.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedArchitecture`] or [`Error::UnsupportedDistro`]; both
    /// mean "skip this spec", not failure.
    pub fn check_target(&self, distro: Distro, arch: Arch) -> Result<()> {
        if !self.arches.contains(&arch) {
            return Err(Error::UnsupportedArchitecture {
                package: self.name.clone(),
                arch: arch.to_string(),
                supported: self
                    .arches
                    .iter()
                    .map(Arch::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        if !self.distros.contains(&distro) {
            return Err(Error::UnsupportedDistro {
                distro: distro.to_string(),
                package: Some(self.name.clone()),
            });
        }
        Ok(())
    }

    /// Dependencies for a distro, empty when none are declared.
    pub fn depends_for(&self, distro: Distro) -> &[String] {
        self.depends.get(&distro).map(Vec::as_slice).unwrap_or_default()
    }

    /// This product's subtree under the proto root.
    pub fn proto_dir(&self, proto_root: &Path) -> PathBuf {
        proto_root.join(&self.proto_subdir)
    }

    /// Verifies no dirty marker exists in the proto subtree.
    ///
    /// Read-only. A dangling symlink at a marker path counts as present.
    ///
    /// # Errors
    ///
    /// [`Error::DirtyProtoArea`] naming the first marker found.
    pub fn check_proto(&self, proto_root: &Path) -> Result<()> {
        let proto_dir = self.proto_dir(proto_root);
        for marker in &self.dirty_markers {
            if std::fs::symlink_metadata(proto_dir.join(marker)).is_ok() {
                return Err(Error::DirtyProtoArea {
                    package: self.name.clone(),
                    marker: marker.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Validates a whole catalog: every spec, plus name uniqueness.
pub fn validate_catalog(specs: &[PackageSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        spec.validate()?;
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::InvalidSpec {
                package: spec.name.clone(),
                reason: "duplicate package name".into(),
            });
        }
    }
    Ok(())
}

/// Debian package name rules. The name becomes a path component of the work
/// directory and the artifact, so separators and leading dots are excluded.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+.-".contains(c))
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec() -> PackageSpec {
        PackageSpec {
            name: "bg-appliance".into(),
            description: "Appliance components.".into(),
            maintainer: "Ops <ops@example.com>".into(),
            arches: vec![Arch::Armhf, Arch::Amd64],
            distros: vec![Distro::Archive, Distro::Debian, Distro::Openwrt],
            depends: [
                (Distro::Debian, vec!["iw".into(), "libc6".into()]),
                (Distro::Openwrt, vec!["iw-full".into()]),
            ]
            .into(),
            proto_subdir: "appliance".into(),
            dirty_markers: vec!["data/configd/ap_props.json".into()],
        }
    }

    #[test]
    fn test_valid_spec() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn test_empty_arches_rejected() {
        let mut s = spec();
        s.arches.clear();
        assert!(matches!(s.validate(), Err(Error::InvalidSpec { .. })));
    }

    #[test]
    fn test_depends_key_must_be_a_distro() {
        let mut s = spec();
        s.distros = vec![Distro::Debian];
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("openwrt"));
    }

    #[test]
    fn test_name_must_be_a_package_name() {
        for bad in ["", "../victim", "a/b", ".hidden", "Upper", "-dash", "sp ace"] {
            let mut s = spec();
            s.name = bad.into();
            assert!(
                matches!(s.validate(), Err(Error::InvalidSpec { .. })),
                "{bad:?} accepted"
            );
        }
        let mut s = spec();
        s.name = "libfoo2.0+git-1".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_proto_subdir_must_stay_inside() {
        let mut s = spec();
        s.proto_subdir = "../etc".into();
        assert!(s.validate().is_err());
        s.proto_subdir = "/abs".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_duplicate_names() {
        let specs = vec![spec(), spec()];
        let err = validate_catalog(&specs).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_check_target() {
        let mut s = spec();
        s.arches = vec![Arch::Amd64];
        assert!(matches!(
            s.check_target(Distro::Debian, Arch::Armhf),
            Err(Error::UnsupportedArchitecture { .. })
        ));
        s.distros = vec![Distro::Debian];
        s.depends.remove(&Distro::Openwrt);
        assert!(matches!(
            s.check_target(Distro::Archive, Arch::Amd64),
            Err(Error::UnsupportedDistro { .. })
        ));
        assert!(s.check_target(Distro::Debian, Arch::Amd64).is_ok());
    }

    #[test]
    fn test_depends_for_missing_distro_is_empty() {
        assert!(spec().depends_for(Distro::Archive).is_empty());
        assert_eq!(spec().depends_for(Distro::Debian), ["iw", "libc6"]);
    }

    #[test]
    fn test_check_proto_clean_and_dirty() {
        let temp = TempDir::new().unwrap();
        let s = spec();
        fs::create_dir_all(temp.path().join("appliance/data/configd")).unwrap();
        assert!(s.check_proto(temp.path()).is_ok());

        let marker = temp.path().join("appliance/data/configd/ap_props.json");
        fs::write(&marker, "{}").unwrap();
        let before = fs::read(&marker).unwrap();
        let err = s.check_proto(temp.path()).unwrap_err();
        assert!(matches!(err, Error::DirtyProtoArea { .. }));
        assert_eq!(fs::read(&marker).unwrap(), before);
    }

    #[test]
    fn test_dangling_symlink_marker_counts() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("appliance/data/configd");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", dir.join("ap_props.json")).unwrap();
        assert!(spec().check_proto(temp.path()).is_err());
    }
}
