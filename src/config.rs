//! Pipeline settings read from a TOML file. Every field has a default, so an
//! empty file (or no file) yields the CDS setup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{CdsSchema, WindowSpec};
use crate::error::Result;
use crate::pipeline::PreprocessConfig;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WindowSettings {
    pub min_encoder_length: usize,
    pub max_encoder_length: usize,
    pub min_prediction_length: usize,
    pub max_prediction_length: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        // two days of context, one day ahead at two-hourly sampling
        Self {
            min_encoder_length: 12,
            max_encoder_length: 24,
            min_prediction_length: 1,
            max_prediction_length: 12,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub schema: CdsSchema,
    pub window: WindowSettings,
    pub targets: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            schema: CdsSchema::default(),
            window: WindowSettings::default(),
            targets: vec!["tcc".to_string()],
        }
    }
}

impl PipelineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        debug!("Loaded pipeline config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(
            self.window.min_encoder_length,
            self.window.max_encoder_length,
            self.window.min_prediction_length,
            self.window.max_prediction_length,
        )
    }

    pub fn schema(&self) -> &CdsSchema {
        &self.schema
    }
}
