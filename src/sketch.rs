//! Sketch loading, creation and `sketch.json` metadata.
//!
//! A sketch is a directory `<name>/` holding its primary file `<name>.ino`
//! (or `.pde`). The root is kept absolute with `.` and `..` folded, but
//! symlinks are left unresolved, so the same sketch always maps to the
//! same ephemeral build directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::templates;

pub const MAIN_EXTENSIONS: &[&str] = &["ino", "pde"];
pub const METADATA_FILE: &str = "sketch.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuMetadata>,
}

/// Board attached with `sketchc board attach`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMetadata {
    pub fqbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Sketch {
    root: PathBuf,
    name: String,
    main_file: PathBuf,
    metadata: Option<SketchMetadata>,
}

impl Sketch {
    /// Loads the sketch at `path`, which may be the sketch directory or its primary file.
    pub fn load(path: &Path) -> Result<Self> {
        let abs = std::path::absolute(path)
            .map(|p| normalize(&p))
            .map_err(|source| BuildError::SketchRead {
                path: path.to_path_buf(),
                source,
            })?;

        let meta = fs::metadata(&abs).map_err(|_| BuildError::InvalidSketch {
            path: abs.clone(),
            reason: "sketch path does not exist".to_string(),
        })?;

        let root = if meta.is_file() && has_main_extension(&abs) {
            abs.parent().map(Path::to_path_buf).unwrap_or_default()
        } else if meta.is_dir() {
            abs
        } else {
            return Err(BuildError::InvalidSketch {
                path: abs,
                reason: "not a sketch directory".to_string(),
            });
        };

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BuildError::InvalidSketch {
                path: root.clone(),
                reason: "sketch directory has no name".to_string(),
            })?;

        let main_file = find_main_file(&root, &name)?;
        let metadata = read_metadata(&root)?;

        tracing::debug!(root = %root.display(), main = %main_file.display(), "loaded sketch");
        Ok(Self {
            root,
            name,
            main_file,
            metadata,
        })
    }

    /// Creates `<path>/<name>.ino` from the default template.
    pub fn create(path: &Path) -> Result<Self> {
        let abs = normalize(&std::path::absolute(path)?);
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BuildError::InvalidSketch {
                path: abs.clone(),
                reason: "sketch directory has no name".to_string(),
            })?;

        let main_file = abs.join(format!("{}.ino", name));
        if main_file.exists() {
            return Err(BuildError::InvalidSketch {
                path: main_file,
                reason: "sketch already exists".to_string(),
            });
        }

        fs::create_dir_all(&abs).map_err(|source| BuildError::PathCreation {
            path: abs.clone(),
            source,
        })?;
        fs::write(&main_file, templates::sketch_template(&name))?;

        Self::load(&abs)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main_file(&self) -> &Path {
        &self.main_file
    }

    /// e.g. `Blink.ino`
    pub fn main_file_name(&self) -> String {
        self.main_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<&SketchMetadata> {
        self.metadata.as_ref()
    }

    pub fn attached_fqbn(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.cpu.as_ref())
            .map(|cpu| cpu.fqbn.as_str())
            .filter(|fqbn| !fqbn.is_empty())
    }

    pub fn save_metadata(&mut self, metadata: SketchMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| BuildError::Config(format!("cannot encode sketch metadata: {}", e)))?;
        fs::write(self.root.join(METADATA_FILE), json)?;
        self.metadata = Some(metadata);
        Ok(())
    }
}

/// Drops `.` and folds `..` without touching the filesystem, so symlinks
/// in the sketch path are kept as typed.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn has_main_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MAIN_EXTENSIONS.contains(&e))
}

fn find_main_file(root: &Path, name: &str) -> Result<PathBuf> {
    for ext in MAIN_EXTENSIONS {
        let candidate = root.join(format!("{}.{}", name, ext));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let read_err = |source| BuildError::SketchRead {
        path: root.to_path_buf(),
        source,
    };
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && has_main_extension(&path) {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(BuildError::InvalidSketch {
            path: root.to_path_buf(),
            reason: format!("no valid sketch found: missing {}.ino", name),
        }),
        n => Err(BuildError::InvalidSketch {
            path: root.to_path_buf(),
            reason: format!(
                "{} candidate primary files and none named {}.ino",
                n, name
            ),
        }),
    }
}

fn read_metadata(root: &Path) -> Result<Option<SketchMetadata>> {
    let path = root.join(METADATA_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| BuildError::InvalidSketch {
            path,
            reason: format!("invalid {}: {}", METADATA_FILE, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_sketch(dir: &TempDir, name: &str) -> PathBuf {
        let root = dir.path().join(name);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(format!("{}.ino", name)), "void setup(){}\nvoid loop(){}\n").unwrap();
        root
    }

    #[test]
    fn test_load_directory() {
        let tmp = TempDir::new().unwrap();
        let root = make_sketch(&tmp, "Blink");
        let sketch = Sketch::load(&root).unwrap();
        assert_eq!(sketch.name(), "Blink");
        assert_eq!(sketch.main_file_name(), "Blink.ino");
        assert!(sketch.root().is_absolute());
    }

    #[test]
    fn test_load_from_primary_file() {
        let tmp = TempDir::new().unwrap();
        let root = make_sketch(&tmp, "Blink");
        let sketch = Sketch::load(&root.join("Blink.ino")).unwrap();
        assert_eq!(sketch.root(), root.as_path());
    }

    #[test]
    fn test_parent_components_are_folded() {
        let tmp = TempDir::new().unwrap();
        let root = make_sketch(&tmp, "Blink");
        fs::create_dir_all(root.join("sub")).unwrap();

        let sketch = Sketch::load(&root.join("sub").join("..")).unwrap();
        assert_eq!(sketch.name(), "Blink");
        assert_eq!(sketch.root(), root.as_path());

        let detour = tmp.path().join("sub").join("..").join("Blink").join(".");
        let sketch = Sketch::load(&detour).unwrap();
        assert_eq!(sketch.root(), root.as_path());
    }

    #[test]
    fn test_single_differently_named_primary() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Project");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("main.ino"), "").unwrap();
        let sketch = Sketch::load(&root).unwrap();
        assert_eq!(sketch.main_file_name(), "main.ino");
    }

    #[test]
    fn test_nested_primary_file_does_not_count() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Empty");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src").join("Empty.ino"), "").unwrap();
        let err = Sketch::load(&root).unwrap_err();
        assert!(err.to_string().contains("Error during sketch processing"));
    }

    #[test]
    fn test_missing_path() {
        let tmp = TempDir::new().unwrap();
        assert!(Sketch::load(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn test_create_and_attach_metadata() {
        let tmp = TempDir::new().unwrap();
        let mut sketch = Sketch::create(&tmp.path().join("Fresh")).unwrap();
        assert!(sketch.main_file().exists());
        assert_eq!(sketch.attached_fqbn(), None);

        sketch
            .save_metadata(SketchMetadata {
                cpu: Some(CpuMetadata {
                    fqbn: "arduino:avr:uno".to_string(),
                    name: None,
                    port: Some("/dev/ttyACM0".to_string()),
                }),
            })
            .unwrap();

        let reloaded = Sketch::load(sketch.root()).unwrap();
        assert_eq!(reloaded.attached_fqbn(), Some("arduino:avr:uno"));
    }

    #[test]
    fn test_create_refuses_existing() {
        let tmp = TempDir::new().unwrap();
        let root = make_sketch(&tmp, "Taken");
        assert!(Sketch::create(&root).is_err());
    }
}
