use anyhow::{Context, Result, bail};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "sketchc.toml";
pub const ALWAYS_EXPORT_ENV: &str = "ARDUINO_SKETCH_ALWAYS_EXPORT_BINARIES";
pub const CLI_PATH_ENV: &str = "SKETCHC_CLI_PATH";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub sketch: SketchSettings,
    pub compiler: CompilerSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SketchSettings {
    /// Same as passing `--export-binaries` to every compile.
    pub always_export_binaries: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerSettings {
    pub cli_path: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            cli_path: "arduino-cli".to_string(),
        }
    }
}

/// `true/1/yes/on` and `false/0/no/off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse {} - check for syntax errors (missing quotes, brackets)",
                path.display()
            )
        })
    }

    /// `--config-file`, then `./sketchc.toml`, then the user config dir.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("sketchc").join(CONFIG_FILE))
            .filter(|p| p.is_file())
    }

    /// File settings (or defaults) with the process environment applied.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match Self::locate(explicit) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ALWAYS_EXPORT_ENV) {
            match parse_bool(&raw) {
                Some(value) => self.sketch.always_export_binaries = value,
                None => eprintln!(
                    "   {} Ignoring {}={:?}: expected true or false",
                    "⚠".yellow(),
                    ALWAYS_EXPORT_ENV,
                    raw
                ),
            }
        }
        if let Some(path) = lookup(CLI_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.compiler.cli_path = path;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Writes `dir/sketchc.toml`. Refuses to replace a file unless `overwrite`.
    pub fn write_to(&self, dir: &Path, overwrite: bool) -> Result<PathBuf> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() && !overwrite {
            bail!(
                "{} already exists. Use --overwrite to replace it",
                path.display()
            );
        }
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(&path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
