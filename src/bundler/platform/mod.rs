//! Per-distribution artifact construction.
//!
//! Each submodule turns a prepared work directory into one artifact:
//!
//! - `debian` - `dpkg-deb --build` plus optional `lintian`
//! - `openwrt` - the `ipkg-build` script from the script directory
//! - `archive` - an in-process tar archive

pub mod archive;
pub mod debian;
pub mod openwrt;

use crate::bundler::{
    error::{Error, Result},
    process::{CommandRunner, ToolCommand},
};

/// Runs a build tool and maps a non-zero exit to [`Error::ArtifactBuildFailed`].
pub(crate) async fn run_build_tool<R: CommandRunner>(
    runner: &R,
    package: &str,
    command: &ToolCommand,
) -> Result<()> {
    log::info!("{}: {}", package, command);
    let output = runner.run(command).await?;
    if !output.success() {
        return Err(Error::ArtifactBuildFailed {
            package: package.to_string(),
            tool: command.tool_name(),
            code: output.code,
        });
    }
    Ok(())
}
