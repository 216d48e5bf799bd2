//! Where a build writes its artifacts.
//!
//! Precedence for the primary directory:
//! 1. `--build-path`
//! 2. `<temp>/arduino-sketch-<MD5 of the sketch path, uppercase hex>`
//!
//! Export is layered on top: `--output-dir` as-is, otherwise
//! `<sketch>/build/<fqbn with dots>` when `--export-binaries` or the
//! always-export setting is on.

use md5::{Digest, Md5};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::sketch::Sketch;
use crate::toolchain::Fqbn;

pub const EPHEMERAL_PREFIX: &str = "arduino-sketch-";
pub const EXPORT_SUBDIR: &str = "build";

/// Ephemeral build directory for `sketch_root` under the system temp dir.
pub fn ephemeral_build_dir(sketch_root: &Path) -> PathBuf {
    ephemeral_build_dir_in(&std::env::temp_dir(), sketch_root)
}

pub fn ephemeral_build_dir_in(temp_root: &Path, sketch_root: &Path) -> PathBuf {
    let digest = Md5::digest(path_bytes(sketch_root));
    let hex: String = digest.iter().map(|b| format!("{:02X}", b)).collect();
    temp_root.join(format!("{}{}", EPHEMERAL_PREFIX, hex))
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// `<sketch>/build/<vendor.arch.board>`
pub fn export_dir_for(sketch_root: &Path, fqbn: &Fqbn) -> PathBuf {
    sketch_root.join(EXPORT_SUBDIR).join(fqbn.path_segment())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDir {
    Ephemeral(PathBuf),
    Explicit(PathBuf),
}

impl BuildDir {
    pub fn path(&self) -> &Path {
        match self {
            BuildDir::Ephemeral(p) | BuildDir::Explicit(p) => p,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, BuildDir::Ephemeral(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub primary: BuildDir,
    pub export: Option<PathBuf>,
}

impl BuildPaths {
    pub fn primary_dir(&self) -> &Path {
        self.primary.path()
    }

    pub fn export_dir(&self) -> Option<&Path> {
        self.export.as_deref()
    }

    /// Rejects a primary directory that is `sketch_root` or one of its
    /// ancestors. Cleaning it would delete the sketch sources.
    pub fn check_sketch_root(&self, sketch_root: &Path) -> Result<()> {
        let Ok(primary) = fs::canonicalize(self.primary_dir()) else {
            return Ok(());
        };
        let root = fs::canonicalize(sketch_root).map_err(|source| BuildError::SketchRead {
            path: sketch_root.to_path_buf(),
            source,
        })?;
        if root.starts_with(&primary) {
            return Err(BuildError::InvalidSketch {
                path: self.primary_dir().to_path_buf(),
                reason: "build path must not contain the sketch directory".to_string(),
            });
        }
        Ok(())
    }

    /// Creates the primary directory. Existing directories are fine;
    /// with `clean` they are wiped first.
    pub fn prepare(&self, clean: bool) -> Result<()> {
        let dir = self.primary_dir();
        if clean && dir.exists() {
            tracing::debug!(dir = %dir.display(), "cleaning build directory");
            fs::remove_dir_all(dir).map_err(|source| BuildError::PathCreation {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::create_dir_all(dir).map_err(|source| BuildError::PathCreation {
            path: dir.to_path_buf(),
            source,
        })
    }
}

/// Path-related inputs of one compile request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRequest<'a> {
    pub build_path: Option<&'a Path>,
    pub output_dir: Option<&'a Path>,
    pub export_binaries: bool,
    /// From the environment or the settings file.
    pub always_export: bool,
}

#[derive(Debug, Clone)]
pub struct BuildPathResolver {
    cwd: PathBuf,
    temp_root: PathBuf,
}

impl BuildPathResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir()?,
            temp_root: std::env::temp_dir(),
        })
    }

    pub fn with_roots(cwd: impl Into<PathBuf>, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            temp_root: temp_root.into(),
        }
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    pub fn resolve(&self, sketch: &Sketch, fqbn: &Fqbn, request: &PathRequest<'_>) -> BuildPaths {
        let primary = match request.build_path {
            Some(path) => BuildDir::Explicit(self.absolutize(path)),
            None => BuildDir::Ephemeral(ephemeral_build_dir_in(&self.temp_root, sketch.root())),
        };

        let mut export = match request.output_dir {
            Some(dir) => Some(self.absolutize(dir)),
            None if request.export_binaries || request.always_export => {
                Some(export_dir_for(sketch.root(), fqbn))
            }
            None => None,
        };

        if export.as_deref() == Some(primary.path()) {
            tracing::debug!("export directory is the build directory, nothing to copy");
            export = None;
        }

        tracing::debug!(
            primary = %primary.path().display(),
            export = ?export,
            "resolved build paths"
        );
        BuildPaths { primary, export }
    }
}
