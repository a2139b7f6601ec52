use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion fails, TOML
    /// parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from raw TOML text
    ///
    /// # Errors
    ///
    /// Returns an error on expansion, parse, or validation failure
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw)?;
        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.router.validate()?;

        if !self.router.providers.is_empty() && self.router.daily_cap <= 0.0 {
            anyhow::bail!("a provider table without a positive daily_cap cannot route anything");
        }
        if self.repository.max_retries == 0 {
            anyhow::bail!("repository.max_retries must be at least 1");
        }

        Ok(())
    }
}
