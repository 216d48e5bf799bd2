use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::toolchain::ArtifactSet;

/// Copies every artifact into `export_dir`, creating it if needed.
/// Returns the copied paths.
pub fn export_artifacts(artifacts: &ArtifactSet, export_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(export_dir).map_err(|source| BuildError::PathCreation {
        path: export_dir.to_path_buf(),
        source,
    })?;

    if same_dir(&artifacts.dir, export_dir) {
        return Ok(artifacts.files.clone());
    }

    let mut exported = Vec::with_capacity(artifacts.files.len());
    for file in &artifacts.files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = export_dir.join(name);
        fs::copy(file, &dest).map_err(|source| BuildError::Export {
            from: file.clone(),
            to: dest.clone(),
            source,
        })?;
        tracing::debug!(from = %file.display(), to = %dest.display(), "exported artifact");
        exported.push(dest);
    }
    Ok(exported)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
