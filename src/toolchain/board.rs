//! Fully Qualified Board Names (`vendor:arch:board[:opt=val,...]`).

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::errors::BuildError;

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("valid regex"));
static OPTION_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9=_.-]*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fqbn {
    raw: String,
    vendor: String,
    arch: String,
    board: String,
    options: Vec<(String, String)>,
}

impl Fqbn {
    pub fn parse(raw: &str) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidTarget {
            fqbn: raw.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(invalid("expected vendor:arch:board[:options]"));
        }
        for part in &parts[..3] {
            if !SEGMENT_RE.is_match(part) {
                return Err(invalid(&format!("invalid segment '{}'", part)));
            }
        }

        let mut options = Vec::new();
        if let Some(opts) = parts.get(3) {
            for opt in opts.split(',') {
                let Some((key, value)) = opt.split_once('=') else {
                    return Err(invalid(&format!("invalid config option '{}'", opt)));
                };
                if !SEGMENT_RE.is_match(key) || !OPTION_VALUE_RE.is_match(value) {
                    return Err(invalid(&format!("invalid config option '{}'", opt)));
                }
                options.push((key.to_string(), value.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            vendor: parts[0].to_string(),
            arch: parts[1].to_string(),
            board: parts[2].to_string(),
            options,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// `vendor:arch`, the id of the platform that provides the board.
    pub fn platform_id(&self) -> String {
        format!("{}:{}", self.vendor, self.arch)
    }

    /// Filesystem-safe form: every `:` becomes `.`.
    pub fn path_segment(&self) -> String {
        self.raw.replace(':', ".")
    }
}

impl fmt::Display for Fqbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Fqbn {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let fqbn = Fqbn::parse("arduino:avr:uno").unwrap();
        assert_eq!(fqbn.vendor(), "arduino");
        assert_eq!(fqbn.arch(), "avr");
        assert_eq!(fqbn.board(), "uno");
        assert_eq!(fqbn.platform_id(), "arduino:avr");
        assert_eq!(fqbn.path_segment(), "arduino.avr.uno");
        assert!(fqbn.options().is_empty());
    }

    #[test]
    fn test_parse_with_options() {
        let fqbn =
            Fqbn::parse("esp8266:esp8266:nodemcu:xtal=80,vt=heap,eesz=4M1M,wipe=none,baud=115200")
                .unwrap();
        assert_eq!(fqbn.options().len(), 5);
        assert_eq!(fqbn.options()[0], ("xtal".to_string(), "80".to_string()));
        assert_eq!(
            fqbn.path_segment(),
            "esp8266.esp8266.nodemcu.xtal=80,vt=heap,eesz=4M1M,wipe=none,baud=115200"
        );
    }

    #[test]
    fn test_parse_rejects_short_or_bad() {
        assert!(Fqbn::parse("arduino:avr").is_err());
        assert!(Fqbn::parse("arduino::uno").is_err());
        assert!(Fqbn::parse("arduino:avr:uno:cpu").is_err());
        assert!(Fqbn::parse("ard uino:avr:uno").is_err());
    }
}
