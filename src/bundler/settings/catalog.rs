//! Package catalogs: the built-in product set and TOML-defined ones.
//!
//! A catalog file lists packages in registration order:
//!
//! ```toml
//! [[package]]
//! name = "bg-cloud"
//! description = "Cloud components."
//! maintainer = "Brightgate Software <contact_us@brightgate.com>"
//! arches = ["amd64"]
//! distros = ["archive", "debian"]
//! proto_subdir = "cloud"
//!
//! [package.depends]
//! debian = ["libc6"]
//! ```

use super::{Arch, Distro, PackageSpec, validate_catalog};
use crate::bundler::error::{ErrorExt, Result};
use std::path::Path;

const MAINTAINER: &str = "Brightgate Software <contact_us@brightgate.com>";

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default, rename = "package")]
    packages: Vec<PackageSpec>,
}

/// Parses and validates a catalog from TOML text.
pub fn parse_catalog(text: &str) -> Result<Vec<PackageSpec>> {
    let file: CatalogFile = toml::from_str(text)?;
    validate_catalog(&file.packages)?;
    Ok(file.packages)
}

/// Reads, parses, and validates a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<PackageSpec>> {
    let text = std::fs::read_to_string(path).fs_context("reading package catalog", path)?;
    let specs = parse_catalog(&text)?;
    log::debug!("loaded {} package spec(s) from {}", specs.len(), path.display());
    Ok(specs)
}

/// The products shipped by default, in build order.
pub fn builtin_catalog() -> Vec<PackageSpec> {
    vec![
        PackageSpec {
            name: "bg-cloud".into(),
            description: "Cloud components.".into(),
            maintainer: MAINTAINER.into(),
            arches: vec![Arch::Amd64],
            distros: vec![Distro::Archive, Distro::Debian],
            depends: [(Distro::Debian, strings(&["libc6"]))].into(),
            proto_subdir: "cloud".into(),
            dirty_markers: Vec::new(),
        },
        PackageSpec {
            name: "bg-appliance".into(),
            description: "Appliance components.".into(),
            maintainer: MAINTAINER.into(),
            arches: vec![Arch::Armhf, Arch::Amd64],
            distros: vec![Distro::Archive, Distro::Debian, Distro::Openwrt],
            depends: [
                (
                    Distro::Debian,
                    strings(&[
                        "bridge-utils",
                        "chrony",
                        "dhcpcd5",
                        "iproute2",
                        "iptables",
                        "iptables-persistent",
                        "iw",
                        "libc6",
                        "libpcap-dev",
                        "netfilter-persistent",
                        "nmap",
                        "procps",
                        "vlan",
                        "bg-hostapd",
                    ]),
                ),
                (
                    Distro::Openwrt,
                    strings(&[
                        "libgcc",
                        "libpcap",
                        "libsodium",
                        "uclibcxx",
                        "chrony",
                        "iw-full",
                        "logrotate",
                        "nmap-ssl",
                        "rsyslog",
                        "bg-hostapd",
                    ]),
                ),
            ]
            .into(),
            proto_subdir: "appliance".into(),
            // An initialized config store must never ship.
            dirty_markers: vec![
                "opt/com.brightgate/etc/ap_props.json".into(),
                "data/configd/ap_props.json".into(),
            ],
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
