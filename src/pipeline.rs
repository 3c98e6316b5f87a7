//! The fixed preprocessing recipe for CDS tables.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::frame::{
    add_cyclic_features, check_and_handle_missing_values, convert_columns_to_string,
    convert_to_datetime, drop_columns, factorize_column, require_columns,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    pub time_column: String,
    pub time_format: Option<String>,
    pub group_columns: Vec<String>,
    pub time_idx: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            time_column: "time".to_string(),
            time_format: None,
            group_columns: vec!["latitude".to_string(), "longitude".to_string()],
            time_idx: "time_idx".to_string(),
        }
    }
}

/// Preprocesses a CDS table keyed by latitude/longitude.
pub fn preprocess_cds_df(df: DataFrame, time_column: &str) -> Result<DataFrame> {
    let config = PreprocessConfig {
        time_column: time_column.to_string(),
        ..PreprocessConfig::default()
    };
    preprocess_with(df, &config)
}

/// Parses the time column, drops incomplete rows, adds the cyclic calendar
/// features and replaces the timestamps with a dense integer time index.
pub fn preprocess_with(df: DataFrame, config: &PreprocessConfig) -> Result<DataFrame> {
    let time = config.time_column.as_str();
    require_columns(&df, &[time])?;
    require_columns(&df, &config.group_columns)?;

    let df = convert_to_datetime(df, time, config.time_format.as_deref())?;
    let df = check_and_handle_missing_values(df, true)?;
    let df = add_cyclic_features(df, time)?;
    let df = df.sort([time], false, true)?;
    let df = factorize_column(df, time, &config.time_idx)?;
    let df = drop_columns(df, &[time])?;
    let df = convert_columns_to_string(df, &config.group_columns)?;

    info!("Preprocessed DataFrame shape: {:?}", df.shape());
    Ok(df)
}
