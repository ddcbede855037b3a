//! One package build: state machine and lifecycle steps.
//!
//! A [`BuildJob`] borrows its [`PackageSpec`] and the run's [`BuildOptions`],
//! owns its work directory exclusively, and moves through
//!
//! ```text
//! Unvalidated -> Validated -> Staged -> MetadataWritten -> Built -> [Linted] -> Finished
//! ```
//!
//! with `Aborted` reachable from any non-terminal state.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::{
        archive,
        debian::{self, LintStatus},
        openwrt,
    },
    process::CommandRunner,
    settings::{BuildOptions, BuildTool, ControlFormat, DistroProfile, MetadataPolicy, PackageSpec},
    template::{ControlFields, render_control},
    utils::fs,
};
use std::fmt;
use std::path::{Path, PathBuf};

/// Optional lifecycle hooks copied from the script directory.
pub const LIFECYCLE_HOOKS: &[&str] = &["prerm", "postinst", "conffiles"];

/// Hook listing configuration files; copied without the executable bit.
const CONFFILES_HOOK: &str = "conffiles";

/// Lifecycle state of a [`BuildJob`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    /// Created, target not checked yet
    Unvalidated,
    /// Spec supports the requested distro and arch
    Validated,
    /// Proto subtree copied into the work directory
    Staged,
    /// Control file and lifecycle scripts written
    MetadataWritten,
    /// Artifact produced
    Built,
    /// Artifact linted
    Linted,
    /// Done
    Finished,
    /// Stopped by an error
    Aborted,
}

impl JobState {
    /// Lowercase state name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Unvalidated => "unvalidated",
            JobState::Validated => "validated",
            JobState::Staged => "staged",
            JobState::MetadataWritten => "metadata-written",
            JobState::Built => "built",
            JobState::Linted => "linted",
            JobState::Finished => "finished",
            JobState::Aborted => "aborted",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Aborted)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (s, Aborted) => !s.is_terminal(),
            (Unvalidated, Validated)
            | (Validated, Staged)
            | (Staged, MetadataWritten)
            | (MetadataWritten, Built)
            | (Built, Linted)
            | (Built, Finished)
            | (Linted, Finished) => true,
            _ => false,
        }
    }

    /// The step that runs from this state, used to name failures.
    pub fn pending_step(&self) -> &'static str {
        match self {
            JobState::Unvalidated => "validate",
            JobState::Validated => "stage",
            JobState::Staged => "render metadata",
            JobState::MetadataWritten => "build",
            JobState::Built => "verify artifact",
            JobState::Linted | JobState::Finished | JobState::Aborted => "finish",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single (spec, distro, arch, version) build.
#[derive(Debug)]
pub struct BuildJob<'a> {
    spec: &'a PackageSpec,
    options: &'a BuildOptions,
    profile: &'static DistroProfile,
    pkg_arch: &'static str,
    work_dir: PathBuf,
    artifact_path: PathBuf,
    state: JobState,
}

impl<'a> BuildJob<'a> {
    /// Creates and validates a job.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedArchitecture`] / [`Error::UnsupportedDistro`] when
    /// the package does not cover the requested pair, or
    /// [`Error::UnknownArchitecture`] when the distro has no spelling for it.
    pub fn new(spec: &'a PackageSpec, options: &'a BuildOptions) -> Result<Self> {
        let profile = options.distro().profile();
        let mut job = Self {
            spec,
            options,
            profile,
            pkg_arch: "",
            work_dir: PathBuf::new(),
            artifact_path: PathBuf::new(),
            state: JobState::Unvalidated,
        };

        spec.check_target(options.distro(), options.arch())?;
        job.pkg_arch = profile.resolve_arch(options.arch())?;

        let version = options.version();
        job.work_dir = options
            .output_dir()
            .join(profile.work_dir_name(&spec.name, version, job.pkg_arch));
        job.artifact_path = options.output_dir().join(profile.artifact_name(
            &spec.name,
            version,
            job.pkg_arch,
            options.compression(),
        ));
        job.advance(JobState::Validated)?;
        Ok(job)
    }

    /// The spec being built.
    pub fn spec(&self) -> &PackageSpec {
        self.spec
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Distro-resolved architecture string.
    pub fn pkg_arch(&self) -> &'static str {
        self.pkg_arch
    }

    /// Work directory owned by this job.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Where the artifact is written.
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Artifact file name.
    pub fn artifact_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Control directory inside the work directory, if the distro has one.
    pub fn metadata_dir(&self) -> Option<PathBuf> {
        self.profile.metadata_subdir.map(|d| self.work_dir.join(d))
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] if `next` is not a legal successor.
    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        log::trace!("{}: {} -> {}", self.name(), self.state, next);
        self.state = next;
        Ok(())
    }

    /// Marks the job aborted. No-op once terminal.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Aborted;
        }
    }

    /// Runs the package's proto check. Never touches the filesystem beyond reads.
    pub fn check_proto(&self) -> Result<()> {
        self.spec.check_proto(self.options.proto_root())
    }

    /// Copies the proto subtree into a fresh work directory and creates the
    /// control directory.
    pub async fn stage(&mut self) -> Result<()> {
        self.remove_work_dir().await;

        let proto_dir = self.spec.proto_dir(self.options.proto_root());
        log::debug!(
            "{}: copying {} -> {}",
            self.name(),
            proto_dir.display(),
            self.work_dir.display()
        );
        fs::copy_dir(&proto_dir, &self.work_dir).await?;

        if let Some(metadata_dir) = self.metadata_dir() {
            if let Err(e) = fs::create_dir_all(&metadata_dir).await {
                log::warn!("{}: {}", self.name(), e);
            }
        }

        self.advance(JobState::Staged)
    }

    /// Renders the control file and copies lifecycle scripts.
    ///
    /// Formats without a control directory only change state.
    pub async fn write_metadata(&mut self) -> Result<()> {
        if let (Some(metadata_dir), Some(format)) =
            (self.metadata_dir(), self.profile.control_format)
        {
            self.write_control(&metadata_dir, format).await?;
            self.copy_lifecycle_scripts(&metadata_dir).await?;
        }
        self.advance(JobState::MetadataWritten)
    }

    async fn write_control(&self, metadata_dir: &Path, format: ControlFormat) -> Result<()> {
        let fields = ControlFields::new(
            &self.spec.name,
            self.options.version(),
            self.pkg_arch,
            self.spec.depends_for(self.options.distro()),
            &self.spec.maintainer,
            &self.spec.description,
        );
        let text = apply_metadata_policy(
            render_control(format, &fields),
            self.options.metadata_policy(),
        )?;

        let control = metadata_dir.join("control");
        tokio::fs::write(&control, text)
            .await
            .fs_context("writing control file", &control)
    }

    async fn copy_lifecycle_scripts(&self, metadata_dir: &Path) -> Result<()> {
        let Some(script_subdir) = self.profile.script_subdir else {
            return Ok(());
        };
        let script_dir = self.options.script_root().join(script_subdir);

        for hook in LIFECYCLE_HOOKS {
            let src = script_dir.join(format!("{}-{}", self.spec.name, hook));
            if !src.is_file() {
                continue;
            }
            let dst = metadata_dir.join(hook);
            log::debug!("{}: installing {} as {}", self.name(), src.display(), hook);
            fs::copy_file(&src, &dst).await?;
            let mode = if *hook == CONFFILES_HOOK { 0o644 } else { 0o755 };
            fs::set_mode(&dst, mode).await?;
        }
        Ok(())
    }

    /// Invokes the distro's build tool on the work directory.
    pub async fn build<R: CommandRunner>(&mut self, runner: &R) -> Result<()> {
        let options = self.options;
        match self.profile.build_tool {
            BuildTool::DpkgDeb => {
                debian::build(
                    runner,
                    &self.spec.name,
                    &self.work_dir,
                    &self.artifact_path,
                    options.compression(),
                    options.compression_level(),
                    options.use_fakeroot(),
                )
                .await?
            }
            BuildTool::IpkgBuild => {
                openwrt::build(
                    runner,
                    &self.spec.name,
                    options.script_root(),
                    &self.work_dir,
                    options.output_dir(),
                    options.use_fakeroot(),
                )
                .await?
            }
            BuildTool::Tar => {
                archive::build(
                    &self.spec.name,
                    &self.work_dir,
                    &self.artifact_path,
                    options.compression(),
                    options.compression_level(),
                )
                .await?
            }
        }
        self.advance(JobState::Built)
    }

    /// Whether this job's artifact gets linted.
    pub fn wants_lint(&self) -> bool {
        self.options.lint() && self.profile.lintable
    }

    /// Lints the built artifact. The artifact stays in place either way.
    pub async fn lint<R: CommandRunner>(&mut self, runner: &R) -> Result<LintStatus> {
        let status = debian::lint(runner, &self.artifact_path).await?;
        self.advance(JobState::Linted)?;
        Ok(status)
    }

    /// Completes the job.
    pub fn finish(&mut self) -> Result<()> {
        self.advance(JobState::Finished)
    }

    /// Removes the work directory. Failures are logged, never returned.
    pub async fn remove_work_dir(&self) {
        if let Err(e) = fs::remove_dir_all(&self.work_dir).await {
            log::warn!("{}: {}", self.name(), e);
        }
    }
}

/// Applies the template failure policy to a render result.
///
/// `Lenient` logs the diagnostic and yields an empty control file;
/// `Strict` returns the error.
pub fn apply_metadata_policy(rendered: Result<String>, policy: MetadataPolicy) -> Result<String> {
    match (rendered, policy) {
        (Ok(text), _) => Ok(format!("{text}\n")),
        (Err(e), MetadataPolicy::Strict) => Err(e),
        (Err(e), MetadataPolicy::Lenient) => {
            log::error!("control template issue: {}", e);
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::process::{ToolCommand, ToolOutput};
    use crate::bundler::settings::{Arch, BuildOptionsBuilder, Distro, builtin_catalog};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    struct ExitWith(i32);

    impl CommandRunner for ExitWith {
        async fn run(&self, _command: &ToolCommand) -> Result<ToolOutput> {
            Ok(ToolOutput {
                code: Some(self.0),
                ..Default::default()
            })
        }
    }

    fn options(temp: &TempDir, distro: Distro, arch: Arch) -> BuildOptions {
        BuildOptionsBuilder::new()
            .distro(distro)
            .arch(arch)
            .version("0.0.1801010000-1")
            .proto_root(temp.path().join("proto"))
            .output_dir(temp.path().join("out"))
            .script_root(temp.path().join("build"))
            .build()
            .unwrap()
    }

    fn appliance_proto(temp: &TempDir) {
        let root = temp.path().join("proto/appliance");
        std::fs::create_dir_all(root.join("opt/bin")).unwrap();
        std::fs::write(root.join("opt/bin/ap.watchd"), "elf").unwrap();
        std::os::unix::fs::symlink("../../nowhere", root.join("opt/bin/dangling")).unwrap();
        std::fs::create_dir_all(temp.path().join("out")).unwrap();
    }

    #[test]
    fn test_state_transitions() {
        use JobState::*;
        assert!(Unvalidated.can_advance_to(Validated));
        assert!(Built.can_advance_to(Finished));
        assert!(Built.can_advance_to(Linted));
        assert!(Staged.can_advance_to(Aborted));
        assert!(!Validated.can_advance_to(Built));
        assert!(!Finished.can_advance_to(Aborted));
        assert!(!Aborted.can_advance_to(Validated));
        assert_eq!(MetadataWritten.pending_step(), "build");
    }

    #[test]
    fn test_new_resolves_names() {
        let temp = TempDir::new().unwrap();
        let specs = builtin_catalog();
        let opts = options(&temp, Distro::Openwrt, Arch::Armhf);
        let job = BuildJob::new(&specs[1], &opts).unwrap();
        assert_eq!(job.state(), JobState::Validated);
        assert_eq!(job.pkg_arch(), "arm_cortex-a7_neon-vfpv4");
        assert_eq!(
            job.artifact_name(),
            "bg-appliance_0.0.1801010000-1_arm_cortex-a7_neon-vfpv4.ipk"
        );
        assert_eq!(
            job.work_dir(),
            temp.path()
                .join("out/bg-appliance_0.0.1801010000-1_arm_cortex-a7_neon-vfpv4")
        );
        assert_eq!(job.metadata_dir().unwrap(), job.work_dir().join("CONTROL"));
    }

    #[test]
    fn test_new_rejects_unsupported_arch() {
        let temp = TempDir::new().unwrap();
        let specs = builtin_catalog();
        let opts = options(&temp, Distro::Debian, Arch::Armhf);
        let err = BuildJob::new(&specs[0], &opts).unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_illegal_advance() {
        let temp = TempDir::new().unwrap();
        let specs = builtin_catalog();
        let opts = options(&temp, Distro::Debian, Arch::Amd64);
        let mut job = BuildJob::new(&specs[0], &opts).unwrap();
        let err = job.advance(JobState::Built).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        job.abort();
        assert_eq!(job.state(), JobState::Aborted);
        job.abort();
        assert_eq!(job.state(), JobState::Aborted);
    }

    #[tokio::test]
    async fn test_stage_and_metadata() {
        let temp = TempDir::new().unwrap();
        appliance_proto(&temp);
        let scripts = temp.path().join("build/debian-deb");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("bg-appliance-postinst"), "#!/bin/sh\n").unwrap();
        std::fs::write(scripts.join("bg-appliance-conffiles"), "/etc/x\n").unwrap();

        let specs = builtin_catalog();
        let opts = options(&temp, Distro::Debian, Arch::Amd64);
        let mut job = BuildJob::new(&specs[1], &opts).unwrap();

        // Leftover from an earlier failed run.
        std::fs::create_dir_all(job.work_dir().join("stale")).unwrap();

        job.stage().await.unwrap();
        assert!(!job.work_dir().join("stale").exists());
        assert_eq!(
            std::fs::read_link(job.work_dir().join("opt/bin/dangling")).unwrap(),
            Path::new("../../nowhere")
        );

        job.write_metadata().await.unwrap();
        assert_eq!(job.state(), JobState::MetadataWritten);

        let debian_dir = job.work_dir().join("DEBIAN");
        let control = std::fs::read_to_string(debian_dir.join("control")).unwrap();
        let expected_depends = specs[1].depends_for(Distro::Debian).join(",");
        assert!(control.contains(&format!("Depends: {expected_depends}\n")));
        assert!(control.contains("Architecture: amd64\n"));
        assert!(control.ends_with("Description: Appliance components.\n"));

        let postinst = std::fs::metadata(debian_dir.join("postinst")).unwrap();
        assert_eq!(postinst.permissions().mode() & 0o777, 0o755);
        let conffiles = std::fs::metadata(debian_dir.join("conffiles")).unwrap();
        assert_eq!(conffiles.permissions().mode() & 0o111, 0);
        assert!(!debian_dir.join("prerm").exists());

        job.remove_work_dir().await;
        assert!(!job.work_dir().exists());
    }

    #[tokio::test]
    async fn test_build_failure_maps_exit_code() {
        let temp = TempDir::new().unwrap();
        appliance_proto(&temp);
        let specs = builtin_catalog();
        let opts = options(&temp, Distro::Debian, Arch::Amd64);
        let mut job = BuildJob::new(&specs[1], &opts).unwrap();
        job.stage().await.unwrap();
        job.write_metadata().await.unwrap();

        let err = job.build(&ExitWith(2)).await.unwrap_err();
        match err {
            Error::ArtifactBuildFailed { package, tool, code } => {
                assert_eq!(package, "bg-appliance");
                assert_eq!(tool, "dpkg-deb");
                assert_eq!(code, Some(2));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(job.state(), JobState::MetadataWritten);
    }

    #[test]
    fn test_metadata_policy() {
        let failed = || {
            Err(Error::TemplateRender {
                package: "p".into(),
                reason: "boom".into(),
            })
        };
        assert_eq!(
            apply_metadata_policy(failed(), MetadataPolicy::Lenient).unwrap(),
            ""
        );
        assert!(apply_metadata_policy(failed(), MetadataPolicy::Strict).is_err());
        assert_eq!(
            apply_metadata_policy(Ok("x".into()), MetadataPolicy::Strict).unwrap(),
            "x\n"
        );
    }
}
