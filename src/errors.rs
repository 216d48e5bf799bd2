//! Error types shared by every stage of a sketch build.
//!
//! Each variant of [`BuildError`] is terminal for the current invocation.
//! [`BuildError::kind`] collapses the variants into the coarse
//! [`ErrorKind`] categories the CLI and the tests reason about.

use std::path::PathBuf;
use thiserror::Error;

use crate::props::PropertyError;

/// Coarse category of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingTarget,
    MalformedProperty,
    AmbiguousPropertyForm,
    CyclicPath,
    PathCreation,
    Compilation,
    InvalidSketch,
    Config,
    Io,
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// Neither `--fqbn` nor the sketch metadata named a board.
    #[error("missing FQBN (Fully Qualified Board Name). Use -b/--fqbn or run 'sketchc board attach'")]
    MissingTarget,

    #[error("invalid FQBN '{fqbn}': {reason}")]
    InvalidTarget { fqbn: String, reason: String },

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("Error during sketch processing: symlink loop detected at {} (points to {})", link.display(), target.display())]
    CyclicPath { link: PathBuf, target: PathBuf },

    #[error("Error during sketch processing: {reason} ({})", path.display())]
    InvalidSketch { path: PathBuf, reason: String },

    #[error("Error during sketch processing: cannot read {}: {source}", path.display())]
    SketchRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create directory {}: {source}", path.display())]
    PathCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot export {} to {}: {source}", from.display(), to.display())]
    Export {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("platform '{platform}' is not installed. Install it with 'arduino-cli core install {platform}'")]
    PlatformNotInstalled { platform: String },

    #[error("compilation failed: {0}")]
    Compilation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::MissingTarget | BuildError::InvalidTarget { .. } => {
                ErrorKind::MissingTarget
            }
            BuildError::Property(e) if e.is_ambiguous() => ErrorKind::AmbiguousPropertyForm,
            BuildError::Property(_) => ErrorKind::MalformedProperty,
            BuildError::CyclicPath { .. } => ErrorKind::CyclicPath,
            BuildError::InvalidSketch { .. } | BuildError::SketchRead { .. } => {
                ErrorKind::InvalidSketch
            }
            BuildError::PathCreation { .. } => ErrorKind::PathCreation,
            BuildError::PlatformNotInstalled { .. } | BuildError::Compilation(_) => {
                ErrorKind::Compilation
            }
            BuildError::Config(_) => ErrorKind::Config,
            BuildError::Export { .. } | BuildError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
