//! Build settings, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::accel::heuristic::DEFAULT_KD_TRAVERSAL_COST;
use crate::accel::{AccelKind, Heuristic, MAX_DEPTH_LIMIT};
use crate::util::{Error, Result};

/// Which acceleration structure to build, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelSettings {
    pub structure: AccelKind,
    pub heuristic: Heuristic,
    /// Overrides the per-structure depth cap (1..=64).
    pub max_depth: Option<u32>,
    /// Constant added to every Kd SAH candidate cost.
    pub kd_traversal_cost: f32,
}

impl Default for AccelSettings {
    fn default() -> Self {
        Self {
            structure: AccelKind::Bvh,
            heuristic: Heuristic::Sah,
            max_depth: None,
            kd_traversal_cost: DEFAULT_KD_TRAVERSAL_COST,
        }
    }
}

impl AccelSettings {
    pub fn new(structure: AccelKind, heuristic: Heuristic) -> Self {
        Self {
            structure,
            heuristic,
            ..Self::default()
        }
    }

    /// Depth cap the builder will use.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
            .unwrap_or_else(|| self.structure.default_max_depth(self.heuristic))
            .min(MAX_DEPTH_LIMIT)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(depth) = self.max_depth {
            if !(1..=MAX_DEPTH_LIMIT).contains(&depth) {
                return Err(Error::invalid(format!(
                    "max_depth must be in 1..={MAX_DEPTH_LIMIT}, got {depth}"
                )));
            }
        }
        if !self.kd_traversal_cost.is_finite() || self.kd_traversal_cost < 0.0 {
            return Err(Error::invalid(format!(
                "kd_traversal_cost must be finite and >= 0, got {}",
                self.kd_traversal_cost
            )));
        }
        Ok(())
    }

    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::SettingsNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
