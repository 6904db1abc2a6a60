use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;

pub const STRUCTR_URL: &str = "STRUCTR_URL";
pub const STRUCTR_USER: &str = "STRUCTR_USER";
pub const STRUCTR_PASSWORD: &str = "STRUCTR_PASSWORD";
pub const PAGER_STATE_DIR: &str = "PAGER_STATE_DIR";

/// Environment variables from the process, overlaid by a `.env` file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
    sensitive_patterns: Vec<String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
            sensitive_patterns: Self::default_sensitive_patterns(),
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    /// Loads `path` if it exists. Returns whether anything was read.
    pub fn load_if_present<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, CliError> {
        if !path.as_ref().is_file() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value safe to print in logs.
    pub fn display_value(&self, key: &str) -> Option<String> {
        let value = self.get(key)?;
        if self.is_sensitive(key) {
            Some("****".to_string())
        } else {
            Some(value.to_string())
        }
    }

    pub fn credentials(&self) -> Option<(String, String)> {
        let user = self.get(STRUCTR_USER)?;
        let password = self.get(STRUCTR_PASSWORD).unwrap_or_default();
        Some((user.to_string(), password.to_string()))
    }

    /// `explicit`, else `PAGER_STATE_DIR`, else `~/.pager/state`.
    pub fn state_dir(&self, explicit: Option<&str>) -> Result<PathBuf, CliError> {
        if let Some(dir) = explicit.or_else(|| self.get(PAGER_STATE_DIR)) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
        Ok(home.join(".pager/state"))
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.sensitive_patterns.iter().any(|p| key.contains(p))
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }

        value.to_string()
    }

    fn default_sensitive_patterns() -> Vec<String> {
        ["password", "passwd", "secret", "token", "auth", "credential"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}
