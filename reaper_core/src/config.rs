//! Reaper configuration.

use crate::error::{Error, Result};

/// Identity the reaper registers its own parked transfer nodes under.
pub const DEFAULT_SERVICE_URL: &str = "mojo:reaper";

/// Configuration for a [`crate::Reaper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    /// The reaper's own identity, always a root.
    pub service_url: String,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
        }
    }
}

impl ReaperConfig {
    /// Parse a `key=value` config file.
    ///
    /// Blank lines and `#` comments are skipped, `version=1` and a non-empty
    /// `service_url` are required, and unknown keys are ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut service_url = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "service_url" => service_url = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_config(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        let service_url =
            service_url.ok_or_else(|| Error::invalid_config("Missing service_url in config"))?;
        if service_url.is_empty() {
            return Err(Error::invalid_config("service_url must not be empty"));
        }

        Ok(Self {
            service_url: service_url.to_string(),
        })
    }
}
