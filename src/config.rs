use std::{fs, path::Path};

use anyhow::{Context, ensure};
use eval::{SamplerConfig, Window};
use serde::{Deserialize, Serialize};

/// Settings of a [`Board`](crate::board::Board). Missing fields in a config
/// file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub window: Window,
    pub sampler: SamplerConfig,
    /// Formulas past this many are ignored.
    pub max_formulas: usize,
    pub dot_radius: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            window: Window::default(),
            sampler: SamplerConfig::default(),
            max_formulas: 5,
            dot_radius: 0.25,
        }
    }
}

impl BoardConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("malformed board config")?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn check(&self) -> anyhow::Result<()> {
        ensure!(self.window.is_valid(), "invalid window {:?}", self.window);
        ensure!(self.sampler.is_valid(), "invalid sampler settings {:?}", self.sampler);
        ensure!(
            self.dot_radius.is_finite() && self.dot_radius > 0.0,
            "dot radius must be positive, got {}",
            self.dot_radius
        );
        Ok(())
    }
}
