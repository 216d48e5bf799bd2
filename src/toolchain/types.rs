use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

use super::board::Fqbn;
use crate::build::walker::SourceFile;
use crate::props::PropertyTable;
use crate::sketch::Sketch;

/// Suffixes appended to the primary file name (`Blink.ino` + `.hex`).
pub const ARTIFACT_SUFFIXES: &[&str] = &[
    "eep",
    "elf",
    "hex",
    "bin",
    "with_bootloader.bin",
    "with_bootloader.hex",
    "uf2",
    "map",
];

/// A platform (core) reported by the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlatform {
    /// `vendor:arch`
    pub id: String,
    pub version: Version,
}

/// A resolved build target.
#[derive(Debug, Clone)]
pub struct Board {
    pub fqbn: Fqbn,
    pub platform: InstalledPlatform,
}

/// Everything the compiler collaborator needs for one build.
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    pub sketch: &'a Sketch,
    pub fqbn: &'a Fqbn,
    pub sources: &'a [SourceFile],
    pub properties: &'a PropertyTable,
    pub build_dir: &'a Path,
    pub libraries: &'a [PathBuf],
    pub verbose: bool,
}

/// Output files produced by a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Collects the known artifacts for `sketch` that exist in `dir`.
    pub fn scan(dir: &Path, sketch: &Sketch) -> Self {
        let files = ARTIFACT_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{}.{}", sketch.main_file_name(), suffix)))
            .filter(|p| fs::metadata(p).is_ok_and(|m| m.is_file()))
            .collect();
        Self {
            dir: dir.to_path_buf(),
            files,
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect()
    }
}

/// Lenient version parsing: `1.8` is read as `1.8.0`.
pub fn parse_platform_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(raw) {
        return Some(v);
    }
    let (core, pre) = match raw.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (raw, None),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    let padded = match pre {
        Some(pre) => format!("{}-{}", parts.join("."), pre),
        None => parts.join("."),
    };
    Version::parse(&padded).ok()
}
