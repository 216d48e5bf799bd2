//! Collaborator backed by an external `arduino-cli` executable.
//!
//! - `arduino-cli core list --format json` answers [`PackageManager`]
//! - `arduino-cli compile --fqbn ... --build-path ...` implements [`Compiler`]

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::types::{ArtifactSet, CompileJob, InstalledPlatform, parse_platform_version};
use super::{Compiler, PackageManager};
use crate::build::feedback::FeedbackAnalyzer;
use crate::errors::BuildError;

pub struct ArduinoCli {
    program: PathBuf,
}

impl ArduinoCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn ensure_available(&self) -> Result<(), BuildError> {
        if self.is_available() {
            return Ok(());
        }
        eprintln!("{} {} not found!", "x".red(), self.program.display());
        eprintln!();
        eprintln!("   Install arduino-cli:");
        #[cfg(windows)]
        eprintln!("   {}", "winget install Arduino.Arduino-CLI".yellow());
        #[cfg(not(windows))]
        eprintln!("   {}", "brew install arduino-cli".yellow());
        eprintln!(
            "   Or point {} at an existing binary.",
            "[compiler] cli_path".cyan()
        );
        Err(BuildError::Compilation(format!(
            "{} is required to compile sketches",
            self.program.display()
        )))
    }
}

/// Reads both the legacy array layout and the `{"platforms": [...]}` layout.
fn parse_core_list(json: &Value) -> Vec<InstalledPlatform> {
    let entries = match json {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("platforms")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id")?.as_str()?;
            let raw = entry
                .get("installed_version")
                .or_else(|| entry.get("installed"))?
                .as_str()?;
            let Some(version) = parse_platform_version(raw) else {
                tracing::warn!(platform = id, version = raw, "unparseable platform version");
                return None;
            };
            Some(InstalledPlatform {
                id: id.to_string(),
                version,
            })
        })
        .collect()
}

impl PackageManager for ArduinoCli {
    fn installed_platforms(&self) -> Result<Vec<InstalledPlatform>, BuildError> {
        self.ensure_available()?;

        let output = Command::new(&self.program)
            .args(["core", "list", "--format", "json"])
            .output()?;
        if !output.status.success() {
            return Err(BuildError::Compilation(format!(
                "'{} core list' failed: {}",
                self.program.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let json: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            BuildError::Compilation(format!("cannot read installed platforms: {}", e))
        })?;
        Ok(parse_core_list(&json))
    }
}

impl Compiler for ArduinoCli {
    fn command_line(&self, job: &CompileJob<'_>) -> Vec<String> {
        let mut args = vec![
            self.program.to_string_lossy().to_string(),
            "compile".to_string(),
            "--fqbn".to_string(),
            job.fqbn.to_string(),
            "--build-path".to_string(),
            job.build_dir.to_string_lossy().to_string(),
        ];

        // arduino-cli re-tokenizes the value, so pass the quoting as typed.
        for property in job.properties.iter() {
            args.push("--build-property".to_string());
            args.push(property.serialize());
        }

        if !job.libraries.is_empty() {
            let joined = job
                .libraries
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>()
                .join(",");
            args.push("--libraries".to_string());
            args.push(joined);
        }

        if job.verbose {
            args.push("-v".to_string());
        }

        args.push(job.sketch.root().to_string_lossy().to_string());
        args
    }

    fn compile(&self, job: &CompileJob<'_>) -> Result<ArtifactSet, BuildError> {
        let args = self.command_line(job);
        tracing::debug!(command = %args.join(" "), "invoking compiler");

        let mut cmd = Command::new(&args[0]);
        cmd.args(&args[1..]);

        let (success, stderr) = if job.verbose {
            let status = cmd.status()?;
            (status.success(), String::new())
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
            {
                pb.set_style(style);
            }
            pb.set_message(format!("Compiling {}...", job.sketch.name()));
            pb.enable_steady_tick(Duration::from_millis(100));
            let output = cmd.output();
            pb.finish_and_clear();
            let output = output?;
            (
                output.status.success(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            )
        };

        if !success {
            if !stderr.is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
            if let Some(hint) = FeedbackAnalyzer::analyze(&stderr) {
                eprintln!("{} {}", "💡".yellow(), hint);
            }
            return Err(BuildError::Compilation(format!(
                "{} exited with an error while building {}",
                self.program.display(),
                job.sketch.name()
            )));
        }

        Ok(ArtifactSet::scan(job.build_dir, job.sketch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_core_list_new_layout() {
        let json = json!({
            "platforms": [
                {"id": "arduino:avr", "installed_version": "1.8.6", "latest_version": "1.8.6"},
                {"id": "esp32:esp32", "latest_version": "3.0.0"}
            ]
        });
        let platforms = parse_core_list(&json);
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].id, "arduino:avr");
        assert_eq!(platforms[0].version.to_string(), "1.8.6");
    }

    #[test]
    fn test_parse_core_list_legacy_layout() {
        let json = json!([
            {"id": "arduino:avr", "installed": "1.8.3", "latest": "1.8.6"}
        ]);
        let platforms = parse_core_list(&json);
        assert_eq!(platforms[0].version.to_string(), "1.8.3");
    }

    #[test]
    fn test_parse_core_list_garbage() {
        assert!(parse_core_list(&json!("nope")).is_empty());
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let cli = ArduinoCli::new("definitely-not-an-arduino-cli-binary");
        assert!(!cli.is_available());
        assert!(cli.installed_platforms().is_err());
    }
}
