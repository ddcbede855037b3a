//! Debian package (.deb) construction and linting.

use super::run_build_tool;
use crate::bundler::{
    error::{Error, Result},
    process::{CommandRunner, ToolCommand},
    settings::Compression,
};
use std::path::Path;

/// Exit status lintian uses when it found tags but ran fine.
const LINTIAN_WARNINGS: i32 = 1;

/// Outcome of a lint run that did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LintStatus {
    /// No tags reported
    Clean,
    /// Tags reported; logged, not fatal
    Warnings,
}

/// Builds the `dpkg-deb` invocation for a work directory.
pub fn dpkg_deb_command(
    work_dir: &Path,
    artifact: &Path,
    compression: Compression,
    level: u32,
    fakeroot: bool,
) -> ToolCommand {
    ToolCommand::new("dpkg-deb")
        .args(["-Z", compression.as_str(), "-z", &level.to_string(), "--build"])
        .arg(work_dir)
        .arg(artifact)
        .under_fakeroot(fakeroot)
}

/// Materializes the .deb from a staged work directory.
pub async fn build<R: CommandRunner>(
    runner: &R,
    package: &str,
    work_dir: &Path,
    artifact: &Path,
    compression: Compression,
    level: u32,
    fakeroot: bool,
) -> Result<()> {
    let command = dpkg_deb_command(work_dir, artifact, compression, level, fakeroot);
    run_build_tool(runner, package, &command).await
}

/// Builds the `lintian` invocation for an artifact.
pub fn lintian_command(artifact: &Path) -> ToolCommand {
    ToolCommand::new("lintian")
        .arg("--no-tag-display-limit")
        .arg(artifact)
}

/// Lints a built .deb.
///
/// # Errors
///
/// [`Error::LintFailed`] for any exit other than success or "warnings found",
/// or when lintian cannot be started.
pub async fn lint<R: CommandRunner>(runner: &R, artifact: &Path) -> Result<LintStatus> {
    let output = runner
        .run(&lintian_command(artifact))
        .await
        .map_err(|e| Error::LintFailed {
            artifact: artifact.to_path_buf(),
            reason: e.to_string(),
        })?;

    match output.code {
        Some(0) => Ok(LintStatus::Clean),
        Some(LINTIAN_WARNINGS) => {
            log::warn!("lintian {} returned {}", artifact.display(), LINTIAN_WARNINGS);
            Ok(LintStatus::Warnings)
        }
        code => Err(Error::LintFailed {
            artifact: artifact.to_path_buf(),
            reason: format!("lintian exited with {code:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpkg_deb_arguments() {
        let cmd = dpkg_deb_command(
            Path::new("out/pkg_1_amd64"),
            Path::new("out/pkg_1_amd64.deb"),
            Compression::Xz,
            9,
            false,
        );
        assert_eq!(
            cmd.to_string(),
            "dpkg-deb -Z xz -z 9 --build out/pkg_1_amd64 out/pkg_1_amd64.deb"
        );
    }

    #[test]
    fn test_dpkg_deb_under_fakeroot() {
        let cmd = dpkg_deb_command(
            Path::new("w"),
            Path::new("w.deb"),
            Compression::Gzip,
            5,
            true,
        );
        assert_eq!(cmd.to_string(), "fakeroot dpkg-deb -Z gzip -z 5 --build w w.deb");
    }

    #[test]
    fn test_lintian_arguments() {
        assert_eq!(
            lintian_command(Path::new("a.deb")).to_string(),
            "lintian --no-tag-display-limit a.deb"
        );
    }
}
