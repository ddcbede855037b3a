//! Error types for package building.
//!
//! Every failure the builder can surface is a variant of [`Error`]. The
//! orchestrator inspects the variant to decide whether a failure skips a
//! package, fails a single job, or aborts the whole run.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving, staging, or building packages.
#[derive(Error, Debug)]
pub enum Error {
    /// No distro-specific architecture string exists for the pair.
    #[error("unknown architecture '{arch}' for distro {distro}")]
    UnknownArchitecture {
        /// Requested distribution
        distro: String,
        /// Requested logical architecture
        arch: String,
    },

    /// The distribution name is not recognized, or a package does not support it.
    #[error("unsupported distro '{distro}'{}", package.as_ref().map(|p| format!(" for {p}")).unwrap_or_default())]
    UnsupportedDistro {
        /// Requested distribution
        distro: String,
        /// Package that rejected it, if any
        package: Option<String>,
    },

    /// The package does not list the requested architecture.
    #[error("{arch} not a supported architecture for {package} (supports {supported})")]
    UnsupportedArchitecture {
        /// Package name
        package: String,
        /// Requested logical architecture
        arch: String,
        /// Comma-joined supported architectures
        supported: String,
    },

    /// A generated secret or config artifact was found in the proto subtree.
    #[error("proto area for {package} looks dirty (found {marker})")]
    DirtyProtoArea {
        /// Package name
        package: String,
        /// Marker path that was found, relative to the proto subtree
        marker: PathBuf,
    },

    /// The external build tool did not produce the artifact.
    #[error("{tool} failed for {package} with exit code {code:?}")]
    ArtifactBuildFailed {
        /// Package name
        package: String,
        /// Tool that failed
        tool: String,
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
    },

    /// The linter rejected the artifact.
    #[error("lint failed for {artifact}: {reason}")]
    LintFailed {
        /// Artifact that was linted
        artifact: PathBuf,
        /// Exit status or spawn failure
        reason: String,
    },

    /// The control template could not be rendered.
    #[error("control template for {package}: {reason}")]
    TemplateRender {
        /// Package name
        package: String,
        /// Handlebars diagnostic
        reason: String,
    },

    /// The package catalog is inconsistent.
    #[error("invalid package spec {package}: {reason}")]
    InvalidSpec {
        /// Package name
        package: String,
        /// What is wrong with it
        reason: String,
    },

    /// A build job was asked to move to a state it cannot reach.
    #[error("illegal job transition {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: &'static str,
        /// Requested state
        to: &'static str,
    },

    /// An external command could not be started.
    #[error("failed to run {command}: {error}")]
    CommandFailed {
        /// Program name
        command: String,
        /// Spawn error
        error: std::io::Error,
    },

    /// Filesystem operation with the path and action that failed.
    #[error("{context} {}: {error}", path.display())]
    Fs {
        /// What was being done
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        error: std::io::Error,
    },

    /// IO error without path context
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Directory walk error
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix error while relativizing walk entries
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Catalog TOML could not be parsed
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Anything else
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Whether this error must stop every remaining job in the run.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Error::DirtyProtoArea { .. } | Error::InvalidSpec { .. })
    }

    /// Whether this error means "this package does not apply" rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedArchitecture { .. } | Error::UnsupportedDistro { .. }
        )
    }
}

/// Attaches filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Wraps an IO error with the action being performed and the path involved.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Converts options and foreign results into [`Error::GenericError`] with a message.
pub trait Context<T> {
    /// Attaches a message to a missing value or an error.
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
