use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::{FeatureRoles, TimeSeriesDataSetConfig, WindowSpec};
use super::dataset::TimeSeriesDataSet;
use super::lags::LagSpec;
use crate::error::{Error, Result};
use crate::frame::calendar::cyclic_feature_names;
use crate::frame::require_column;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Eval,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Mode::Train),
            "eval" => Ok(Mode::Eval),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Eval => write!(f, "eval"),
        }
    }
}

pub enum Datasets {
    Train {
        training: TimeSeriesDataSet,
        validation: TimeSeriesDataSet,
    },
    Eval(TimeSeriesDataSet),
}

/// Column layout of a preprocessed CDS table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CdsSchema {
    pub time_idx: String,
    /// Group keys, also used as the static categoricals.
    pub group_ids: Vec<String>,
    pub known_reals: Vec<String>,
    pub sampling_interval_hours: f64,
    /// Targets that get seasonal lags; the first target when unset.
    pub lag_targets: Option<Vec<String>>,
}

impl Default for CdsSchema {
    fn default() -> Self {
        let mut known_reals = vec!["time_idx".to_string()];
        known_reals.extend(cyclic_feature_names());
        Self {
            time_idx: "time_idx".to_string(),
            group_ids: vec!["latitude".to_string(), "longitude".to_string()],
            known_reals,
            sampling_interval_hours: 2.0,
            lag_targets: None,
        }
    }
}

impl CdsSchema {
    pub fn roles(&self, targets: &[String]) -> FeatureRoles {
        FeatureRoles {
            static_categoricals: self.group_ids.clone(),
            time_varying_known_reals: self.known_reals.clone(),
            time_varying_unknown_reals: targets.to_vec(),
        }
    }

    pub fn lags(&self, targets: &[String]) -> LagSpec {
        match &self.lag_targets {
            Some(lagged) => LagSpec::seasonal(self.sampling_interval_hours, lagged.as_slice()),
            None => LagSpec::seasonal(self.sampling_interval_hours, &targets[..targets.len().min(1)]),
        }
    }

    pub fn dataset_config(&self, window: WindowSpec, targets: &[String]) -> TimeSeriesDataSetConfig {
        TimeSeriesDataSetConfig::new(
            self.time_idx.clone(),
            targets.to_vec(),
            self.group_ids.clone(),
            window,
        )
        .with_roles(self.roles(targets))
        .with_lags(self.lags(targets))
    }
}

/// Builds the CDS training/validation pair (`mode = "train"`) or a single
/// evaluation dataset (`mode = "eval"`).
pub fn create_cds_time_series_datasets(
    df: &DataFrame,
    window: WindowSpec,
    targets: &[String],
    mode: &str,
) -> Result<Datasets> {
    create_cds_time_series_datasets_with(df, window, targets, mode, &CdsSchema::default())
}

pub fn create_cds_time_series_datasets_with(
    df: &DataFrame,
    window: WindowSpec,
    targets: &[String],
    mode: &str,
    schema: &CdsSchema,
) -> Result<Datasets> {
    let mode = Mode::from_str(mode)?;
    let config = schema.dataset_config(window, targets);
    config.validate()?;

    match mode {
        Mode::Train => {
            let time_idx = require_column(df, &schema.time_idx)?.cast(&DataType::Int64)?;
            let max_idx = time_idx.i64()?.max().ok_or_else(|| {
                Error::InvalidArgument(format!("column '{}' has no values", schema.time_idx))
            })?;
            let cutoff = max_idx - config.window.max_prediction_length as i64;
            info!("Training cutoff: {cutoff}");

            let mask = time_idx.i64()?.lt_eq(cutoff);
            let train_df = df.filter(&mask)?;
            info!(
                "Training on {} of {} rows (time_idx <= {cutoff}).",
                train_df.height(),
                df.height()
            );

            let training = TimeSeriesDataSet::new(&train_df, config)?;
            let validation =
                TimeSeriesDataSet::from_dataset(&training, df, true, true, Some(cutoff + 1))?;
            Ok(Datasets::Train {
                training,
                validation,
            })
        }
        Mode::Eval => {
            let config = config.with_randomize_length(false);
            Ok(Datasets::Eval(TimeSeriesDataSet::new(df, config)?))
        }
    }
}
