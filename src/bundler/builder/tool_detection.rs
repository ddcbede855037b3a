//! External tool detection and availability checking.
//!
//! Results are cached so repeated checks during a run spawn nothing.

use std::sync::LazyLock;

/// Whether `fakeroot` is available to wrap build tools.
pub static HAS_FAKEROOT: LazyLock<bool> = LazyLock::new(|| detect("fakeroot", "--version"));

/// Whether `lintian` is available for linting .deb artifacts.
pub static HAS_LINTIAN: LazyLock<bool> = LazyLock::new(|| detect("lintian", "--version"));

/// Whether `dpkg-deb` is available for building .deb artifacts.
pub static HAS_DPKG_DEB: LazyLock<bool> = LazyLock::new(|| detect("dpkg-deb", "--version"));

fn detect(tool: &str, version_arg: &str) -> bool {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());

            match std::process::Command::new(&path).arg(version_arg).output() {
                Ok(output) if output.status.success() => {
                    let version = String::from_utf8_lossy(&output.stdout);
                    log::debug!(
                        "{} available: {}",
                        tool,
                        version.lines().next().unwrap_or_default().trim()
                    );
                    true
                }
                Ok(output) => {
                    log::warn!(
                        "{} found at {} but {} check failed (exit code: {:?}). Stderr: {}",
                        tool,
                        path.display(),
                        version_arg,
                        output.status.code(),
                        String::from_utf8_lossy(&output.stderr)
                    );
                    false
                }
                Err(e) => {
                    log::warn!(
                        "{} found at {} but failed to execute: {}. Check file permissions.",
                        tool,
                        path.display(),
                        e
                    );
                    false
                }
            }
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", tool, e);
            false
        }
    }
}
