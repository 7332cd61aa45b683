//! Configuration file handling
//!
//! The harness runs without any configuration file; a TOML file can
//! override the front-end location and the timeout bounds.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Front-end settings
    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Configuration for the debugger front-end under test
#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    /// Path to the front-end executable; resolved via PATH when absent
    pub path: Option<PathBuf>,

    /// Executable name looked up on PATH when no explicit path is given
    #[serde(default = "default_frontend_name")]
    pub name: String,

    /// Arguments passed to the front-end; interaction is always via the
    /// textual protocol, never a human console
    #[serde(default = "default_frontend_args")]
    pub args: Vec<String>,

    /// Extra environment variables for the front-end process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            path: None,
            name: default_frontend_name(),
            args: default_frontend_args(),
            env: HashMap::new(),
        }
    }
}

impl FrontendConfig {
    /// Environment as owned pairs in the shape `Session::spawn` takes
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn default_frontend_name() -> String {
    "lldb-mi".to_string()
}

fn default_frontend_args() -> Vec<String> {
    vec!["--interpreter".to_string()]
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Timeouts {
    /// Default timeout for one expectation
    #[serde(default = "default_expect")]
    pub expect_secs: u64,

    /// Overall timeout for one scenario, spawn to teardown
    #[serde(default = "default_scenario")]
    pub scenario_secs: u64,

    /// Grace period between SIGTERM and kill at teardown
    #[serde(default = "default_terminate_grace")]
    pub terminate_grace_millis: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect_secs: default_expect(),
            scenario_secs: default_scenario(),
            terminate_grace_millis: default_terminate_grace(),
        }
    }
}

fn default_expect() -> u64 {
    10
}
fn default_scenario() -> u64 {
    120
}
fn default_terminate_grace() -> u64 {
    500
}

impl Config {
    /// Load configuration from a TOML file, or defaults when none is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse '{}': {}", path.display(), e)))
    }

    /// Resolve the front-end executable, preferring an explicit path
    pub fn resolve_frontend(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path.or(self.frontend.path.as_deref()) {
            return Ok(path.to_path_buf());
        }

        which::which(&self.frontend.name).map_err(|_| Error::FrontendNotFound {
            name: self.frontend.name.clone(),
        })
    }

    /// Default timeout for one expectation
    pub fn expect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.expect_secs)
    }

    /// Overall timeout for one scenario
    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.scenario_secs)
    }

    /// Grace period before a forced kill
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.timeouts.terminate_grace_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.frontend.name, "lldb-mi");
        assert_eq!(config.frontend.args, vec!["--interpreter"]);
        assert_eq!(config.timeouts.expect_secs, 10);
        assert_eq!(config.timeouts.scenario_secs, 120);
    }

    #[test]
    fn parses_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[frontend]\npath = \"/opt/llvm/bin/lldb-mi\"\n\n[timeouts]\nexpect_secs = 3"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(
            config.frontend.path.as_deref(),
            Some(Path::new("/opt/llvm/bin/lldb-mi"))
        );
        assert_eq!(config.timeouts.expect_secs, 3);
        // untouched section keeps its default
        assert_eq!(config.timeouts.scenario_secs, 120);
    }

    #[test]
    fn explicit_path_skips_lookup() {
        let config = Config::default();
        let resolved = config
            .resolve_frontend(Some(Path::new("/usr/bin/true")))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/usr/bin/true"));
    }
}
