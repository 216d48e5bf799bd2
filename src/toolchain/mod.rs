//! External collaborators of the build pipeline.
//!
//! The engine never talks to a cross-compiler or a package index directly.
//! It goes through two traits:
//!
//! - [`PackageManager`] - which platforms are installed
//! - [`Compiler`] - turn sources + properties into artifacts in a build dir
//!
//! [`ArduinoCli`] implements both on top of an `arduino-cli` executable.

pub mod arduino_cli;
pub mod board;
pub mod types;

pub use arduino_cli::ArduinoCli;
pub use board::Fqbn;
pub use types::{ARTIFACT_SUFFIXES, ArtifactSet, Board, CompileJob, InstalledPlatform};

use crate::errors::BuildError;

pub trait PackageManager {
    fn installed_platforms(&self) -> Result<Vec<InstalledPlatform>, BuildError>;
}

pub trait Compiler {
    /// The command line `compile` would run, for dry runs and logs.
    fn command_line(&self, job: &CompileJob<'_>) -> Vec<String>;

    fn compile(&self, job: &CompileJob<'_>) -> Result<ArtifactSet, BuildError>;
}

/// Resolves `fqbn` to a board whose platform is installed.
pub fn resolve_board(fqbn: &Fqbn, packages: &dyn PackageManager) -> Result<Board, BuildError> {
    let platform_id = fqbn.platform_id();
    let platform = packages
        .installed_platforms()?
        .into_iter()
        .filter(|p| p.id == platform_id)
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or(BuildError::PlatformNotInstalled {
            platform: platform_id,
        })?;

    tracing::debug!(platform = %platform.id, version = %platform.version, "resolved board platform");
    Ok(Board {
        fqbn: fqbn.clone(),
        platform,
    })
}
