//! Main packaging orchestration.
//!
//! [`Packager`] turns a catalog of [`PackageSpec`]s into artifacts for one
//! (distro, arch) pair. Jobs run one after another in catalog order.

use super::{
    checksum::calculate_sha256,
    job::{BuildJob, JobState},
};
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::debian::LintStatus,
    process::{CommandRunner, SystemRunner},
    settings::{ARCH_REGISTRY, BuildOptions, PackageSpec, validate_catalog},
};
use std::path::PathBuf;

/// An artifact produced by a finished job.
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    /// Package name
    pub package: String,
    /// Artifact location
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the artifact
    pub checksum: String,
    /// Lint outcome, `None` when not linted
    pub lint: Option<LintStatus>,
}

/// A job that did not finish cleanly.
#[derive(Debug)]
pub struct JobFailure {
    /// Package name
    pub package: String,
    /// Step that failed
    pub step: &'static str,
    /// What went wrong
    pub error: Error,
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Artifacts on disk after the run, in build order
    pub artifacts: Vec<BuiltArtifact>,
    /// Packages that do not apply to the requested pair
    pub skipped: Vec<String>,
    /// Jobs that failed; siblings still ran
    pub failures: Vec<JobFailure>,
}

impl BuildReport {
    /// Whether every attempted job finished.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Packaging orchestrator.
///
/// # Examples
///
/// ```no_run
/// use protopack::bundler::{Arch, BuildOptionsBuilder, Distro, Packager, builtin_catalog};
///
/// # async fn example() -> protopack::bundler::Result<()> {
/// let options = BuildOptionsBuilder::new()
///     .distro(Distro::Debian)
///     .arch(Arch::Amd64)
///     .proto_root("proto.x86_64")
///     .build()?;
///
/// let report = Packager::new(options, builtin_catalog())?.run().await?;
/// for artifact in &report.artifacts {
///     println!("{} {}", artifact.checksum, artifact.path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Packager<R = SystemRunner> {
    options: BuildOptions,
    specs: Vec<PackageSpec>,
    runner: R,
}

impl Packager<SystemRunner> {
    /// Creates a packager that runs real build tools.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpec`] if the catalog is inconsistent.
    pub fn new(options: BuildOptions, specs: Vec<PackageSpec>) -> Result<Self> {
        Self::with_runner(options, specs, SystemRunner)
    }
}

impl<R: CommandRunner> Packager<R> {
    /// Creates a packager with a custom command runner.
    pub fn with_runner(options: BuildOptions, specs: Vec<PackageSpec>, runner: R) -> Result<Self> {
        validate_catalog(&specs)?;
        Ok(Self {
            options,
            specs,
            runner,
        })
    }

    /// Returns the run options.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Creates one job per spec that supports the requested pair.
    ///
    /// Specs that do not apply are logged and listed in `skipped`.
    pub fn plan(&self, skipped: &mut Vec<String>) -> Result<Vec<BuildJob<'_>>> {
        let mut jobs = Vec::new();
        for spec in &self.specs {
            match BuildJob::new(spec, &self.options) {
                Ok(job) => jobs.push(job),
                Err(e) if e.is_skip() => {
                    log::info!("skipping {}: {}", spec.name, e);
                    skipped.push(spec.name.clone());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(jobs)
    }

    /// Checks every job's proto area before any job touches the disk.
    ///
    /// # Errors
    ///
    /// [`Error::DirtyProtoArea`] for the first dirty spec; no job may run.
    pub fn preflight(jobs: &[BuildJob<'_>]) -> Result<()> {
        for job in jobs {
            log::info!("pre-build check for {}", job.artifact_name());
            job.check_proto().inspect_err(|e| {
                log::error!("failed proto area check: {}", e);
            })?;
        }
        Ok(())
    }

    /// Builds every applicable package.
    ///
    /// Returns `Err` only for failures fatal to the whole run (dirty proto
    /// area, broken catalog). Per-job failures are collected in the report.
    pub async fn run(&self) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let (distro, arch) = (self.options.distro(), self.options.arch());

        if !ARCH_REGISTRY.supports(distro, arch) {
            log::info!("no package output for {} on {}", arch, distro);
            return Ok(report);
        }

        let mut jobs = self.plan(&mut report.skipped)?;
        Self::preflight(&jobs)?;

        for job in &mut jobs {
            log::info!("begin {} package build", job.artifact_name());
            match self.run_job(job).await {
                Ok(artifact) => {
                    log::info!("end {} package build", job.name());
                    report.artifacts.push(artifact);
                }
                Err(failure) => report.failures.push(failure),
            }
        }

        Ok(report)
    }

    async fn run_job(&self, job: &mut BuildJob<'_>) -> std::result::Result<BuiltArtifact, JobFailure> {
        let assembled = Self::assemble(job, &self.runner).await;
        job.remove_work_dir().await;
        if let Err(error) = assembled {
            return Err(fail(job, error));
        }

        let artifact = match describe_artifact(job).await {
            Ok(artifact) => artifact,
            Err(error) => return Err(fail(job, error)),
        };

        let lint = if job.wants_lint() {
            match job.lint(&self.runner).await {
                Ok(status) => Some(status),
                Err(error) => return Err(fail(job, error)),
            }
        } else {
            None
        };

        if let Err(error) = job.finish() {
            return Err(fail(job, error));
        }

        log::info!(
            "{} ({} bytes, sha256 {})",
            artifact.path.display(),
            artifact.size,
            artifact.checksum
        );
        Ok(BuiltArtifact { lint, ..artifact })
    }

    async fn assemble(job: &mut BuildJob<'_>, runner: &R) -> Result<()> {
        job.stage().await?;
        job.write_metadata().await?;
        job.build(runner).await
    }
}

async fn describe_artifact(job: &BuildJob<'_>) -> Result<BuiltArtifact> {
    let path = job.artifact_path().to_path_buf();
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading artifact metadata", &path)?
        .len();
    let checksum = calculate_sha256(&path).await?;
    Ok(BuiltArtifact {
        package: job.name().to_string(),
        path,
        size,
        checksum,
        lint: None,
    })
}

fn fail(job: &mut BuildJob<'_>, error: Error) -> JobFailure {
    let step = match error {
        Error::LintFailed { .. } => "lint",
        _ => job.state().pending_step(),
    };
    log::error!("{}: {} failed: {}", job.name(), step, error);
    job.abort();
    debug_assert_eq!(job.state(), JobState::Aborted);
    JobFailure {
        package: job.name().to_string(),
        step,
        error,
    }
}
