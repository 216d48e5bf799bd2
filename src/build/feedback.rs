use colored::*;
use regex::Regex;
use std::sync::LazyLock;

static MISSING_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"fatal error: ([^:\s]+): No such file or directory").expect("valid regex")
});

pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    /// Turns compiler diagnostics into a one-paragraph hint.
    pub fn analyze(output: &str) -> Option<String> {
        // Sketch without an entry point
        if output.contains("undefined reference to `setup'")
            || output.contains("undefined reference to `loop'")
        {
            return Some(format!(
                "Your sketch is missing {} or {}.\nEvery sketch needs both functions, even if empty.",
                "setup()".bold().yellow(),
                "loop()".bold().yellow()
            ));
        }

        if let Some(caps) = MISSING_HEADER.captures(output) {
            return Some(format!(
                "It looks like a {} error ({}).\nInstall the library with {} or pass its folder with {}.",
                "Missing Header".bold().red(),
                &caps[1],
                "arduino-cli lib install".bold().green(),
                "--libraries".bold().yellow()
            ));
        }

        if output.contains("was not declared in this scope") {
            return Some(format!(
                "An identifier is {}.\nCheck spelling and that the defining library is included.",
                "not declared".bold().red()
            ));
        }

        if output.contains("Platform") && output.contains("not found") {
            return Some(format!(
                "The board {} is not installed.\nRun {} for the FQBN's vendor:arch.",
                "platform".bold().red(),
                "arduino-cli core install".bold().green()
            ));
        }

        if output.contains("undefined reference to") {
            return Some(format!(
                "It looks like a {} error.\nA library may be missing from {}.",
                "Linker".bold().red(),
                "--libraries".bold().yellow()
            ));
        }

        None
    }
}
