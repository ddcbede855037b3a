//! OpenWrt package (.ipk) construction.

use super::run_build_tool;
use crate::bundler::{
    error::Result,
    process::{CommandRunner, ToolCommand},
};
use std::path::Path;

/// Location of `ipkg-build` under the script root.
pub const IPKG_BUILD: &str = "openwrt-ipk/ipkg-build";

/// Builds the `ipkg-build` invocation.
///
/// `ipkg-build` names the package itself from the control file and writes it
/// into `output_dir`.
pub fn ipkg_build_command(
    script_root: &Path,
    work_dir: &Path,
    output_dir: &Path,
    fakeroot: bool,
) -> ToolCommand {
    ToolCommand::new(script_root.join(IPKG_BUILD))
        .arg(work_dir)
        .arg(output_dir)
        .under_fakeroot(fakeroot)
}

/// Materializes the .ipk from a staged work directory.
pub async fn build<R: CommandRunner>(
    runner: &R,
    package: &str,
    script_root: &Path,
    work_dir: &Path,
    output_dir: &Path,
    fakeroot: bool,
) -> Result<()> {
    let command = ipkg_build_command(script_root, work_dir, output_dir, fakeroot);
    run_build_tool(runner, package, &command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipkg_build_arguments() {
        let cmd = ipkg_build_command(Path::new("build"), Path::new("w"), Path::new("."), true);
        assert_eq!(cmd.to_string(), "fakeroot build/openwrt-ipk/ipkg-build w .");
        assert_eq!(cmd.tool_name(), "ipkg-build");
    }
}
