//! Host-side configuration: board revision and timing policy.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use splitkb_core::{BoardRevision, Timing, Wiring};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub board: BoardRevision,
    pub timing: Timing,
}

impl Config {
    /// Load from `path`, or the defaults when no path is given. Missing
    /// fields fall back to their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing configuration")
    }

    pub fn wiring(&self) -> Wiring {
        Wiring::for_revision(self.board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitkb_core::timing::{DEBOUNCE_TIME, MAX_HOLD_TIME};

    #[test]
    fn empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.board, BoardRevision::Rev2);
        assert_eq!(config.timing.debounce_us, DEBOUNCE_TIME);
    }

    #[test]
    fn partial_timing_table() {
        let config = Config::parse(
            r#"
board = "rev1"

[timing]
max_hold_us = 300000
"#,
        )
        .unwrap();
        assert_eq!(config.board, BoardRevision::Rev1);
        assert_eq!(config.timing.max_hold_us, 300_000);
        assert_eq!(config.timing.debounce_us, DEBOUNCE_TIME);
        assert_eq!(config.wiring().chips.len(), 8);
    }

    #[test]
    fn unknown_board_is_rejected() {
        assert!(Config::parse(r#"board = "rev9""#).is_err());
    }

    #[test]
    fn serializes_both_sections() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains(r#"board = "rev2""#));
        assert!(text.contains("[timing]"));
        assert!(text.contains(&format!("max_hold_us = {MAX_HOLD_TIME}")));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/splitkb.toml"))).is_err());
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
