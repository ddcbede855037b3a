//! Command line interface for protopack.
//!
//! Parses arguments, resolves the (distro, arch) pair, and hands the run to
//! the [`Packager`](crate::bundler::Packager).

mod args;

pub use args::Args;

use crate::bundler::{
    Arch, BuildReport, Distro, Packager,
    builder::{HAS_DPKG_DEB, HAS_FAKEROOT, HAS_LINTIAN},
    builtin_catalog, load_catalog,
    settings::{DistroProfile, profile_for},
};
use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Runs a packaging pass for already parsed arguments and returns the exit code.
pub async fn execute(args: &Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let profile = profile_for(&args.distro)?;
    let distro = profile.distro;

    let arch = match args.arch.parse::<Arch>() {
        Ok(arch) => arch,
        Err(e) => {
            log::info!("no package output: {}", e);
            return Ok(0);
        }
    };

    let specs = match &args.config {
        Some(path) => load_catalog(path)?,
        None => builtin_catalog(),
    };

    let lint = args.lint && lint_available(profile);
    let use_fakeroot = !args.no_fakeroot && *HAS_FAKEROOT;
    if !args.no_fakeroot && !*HAS_FAKEROOT && distro != Distro::Archive {
        log::warn!("fakeroot not found; running build tools directly");
    }
    if distro == Distro::Debian && !*HAS_DPKG_DEB {
        log::warn!("dpkg-deb not found in PATH");
    }

    let options = args
        .options_builder(distro, arch)?
        .lint(lint)
        .use_fakeroot(use_fakeroot)
        .build()?;
    log::info!("package version {}", options.version());

    let packager = Packager::new(options, specs)?;
    match packager.run().await {
        Ok(report) => Ok(summarize(&report)),
        Err(e) => {
            log::error!("{}", e);
            Ok(1)
        }
    }
}

fn lint_available(profile: &DistroProfile) -> bool {
    if !profile.lintable {
        log::info!("{} artifacts are not linted", profile.distro);
        return false;
    }
    if !*HAS_LINTIAN {
        log::warn!("lintian not found; skipping lint");
        return false;
    }
    true
}

/// Logs the outcome and returns the process exit code.
fn summarize(report: &BuildReport) -> i32 {
    for failure in &report.failures {
        log::error!("{}: {} failed", failure.package, failure.step);
    }
    log::info!(
        "{} built, {} skipped, {} failed",
        report.artifacts.len(),
        report.skipped.len(),
        report.failures.len()
    );
    if report.is_success() { 0 } else { 1 }
}
