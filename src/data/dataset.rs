use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use burn::data::dataset::Dataset;
use polars::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{FeatureRoles, TimeSeriesDataSetConfig, WindowSpec};
use super::lags::LagSpec;
use super::normalizer::{
    CategoricalEncoder, GroupNormalizer, NormParams, StandardScaler, TargetNormalizer,
};
use crate::consistency::{group_keys, missing_indices};
use crate::error::{Error, Result};
use crate::frame::require_column;

/// State fitted on the data a dataset was first built from and reused by
/// every dataset derived from it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FittedState {
    pub categorical_encoders: BTreeMap<String, CategoricalEncoder>,
    pub scalers: BTreeMap<String, StandardScaler>,
    pub target_normalizer: TargetNormalizer,
}

/// Everything needed to rebuild a dataset over a table.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatasetParameters {
    pub config: TimeSeriesDataSetConfig,
    pub state: FittedState,
}

/// One encoder/decoder sample.
#[derive(Debug, Clone)]
pub struct WindowItem {
    pub group: Vec<String>,
    /// Time index of the first decoder step.
    pub time_idx: i64,
    pub encoder_length: usize,
    pub decoder_length: usize,
    pub static_categoricals: Vec<i64>,
    pub static_reals: Vec<f32>,
    pub known_reals: Vec<Vec<f32>>,    // [T + H, D_kr]
    pub unknown_reals: Vec<Vec<f32>>,  // [T, D_ur]
    pub encoder_target: Vec<Vec<f32>>, // [T, D_t], normalized
    pub decoder_target: Vec<Vec<f32>>, // [H, D_t], raw
    pub target_scale: Vec<[f32; 2]>,   // [D_t], center and scale
}

/// Location of a window, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo<'a> {
    pub group: &'a [String],
    pub encoder_length: usize,
    pub decoder_length: usize,
    pub first_time_idx: i64,
    pub decoder_time_idx: i64,
    pub last_time_idx: i64,
}

#[derive(Debug, Clone, Copy)]
struct WindowIndex {
    group: usize,
    start: usize,
    encoder_length: usize,
    decoder_length: usize,
}

struct GroupSeries {
    key: Vec<String>,
    time: Vec<i64>,
    static_codes: Vec<i64>,
    known: Vec<Vec<f64>>,
    observed: Vec<Vec<f64>>,
    normalized: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
    lagged: Vec<Vec<f64>>,
    scales: Vec<NormParams>,
}

struct Columns {
    time: Vec<i64>,
    groups: Vec<Vec<String>>,
    categoricals: Vec<Vec<String>>,
    known: Vec<Vec<f64>>,
    observed: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

/// Encoder/decoder windows over a preprocessed table, grouped by the
/// configured group ids.
pub struct TimeSeriesDataSet {
    config: TimeSeriesDataSetConfig,
    state: FittedState,
    groups: Vec<GroupSeries>,
    index: Vec<WindowIndex>,
    rng: Mutex<StdRng>,
}

impl TimeSeriesDataSet {
    /// Builds a dataset and fits encoders, scalers and the target normalizer
    /// on `data`.
    pub fn new(data: &DataFrame, config: TimeSeriesDataSetConfig) -> Result<Self> {
        Self::build(data, config, None)
    }

    /// Builds a dataset over `data` that shares the configuration and fitted
    /// state of `dataset`.
    pub fn from_dataset(
        dataset: &TimeSeriesDataSet,
        data: &DataFrame,
        predict: bool,
        stop_randomization: bool,
        min_prediction_idx: Option<i64>,
    ) -> Result<Self> {
        let mut config = dataset.config.clone().with_predict_mode(predict);
        if stop_randomization {
            config = config.with_randomize_length(false);
        }
        if min_prediction_idx.is_some() {
            config = config.with_min_prediction_idx(min_prediction_idx);
        }
        Self::build(data, config, Some(dataset.state.clone()))
    }

    pub fn from_parameters(parameters: DatasetParameters, data: &DataFrame) -> Result<Self> {
        Self::build(data, parameters.config, Some(parameters.state))
    }

    pub fn parameters(&self) -> DatasetParameters {
        DatasetParameters {
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }

    /// Writes the configuration and fitted state as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.parameters())?)?;
        info!("Saved dataset parameters to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, data: &DataFrame) -> Result<Self> {
        let parameters: DatasetParameters = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::from_parameters(parameters, data)
    }

    fn build(
        data: &DataFrame,
        config: TimeSeriesDataSetConfig,
        state: Option<FittedState>,
    ) -> Result<Self> {
        config.validate()?;
        debug!("TSD Params:\n{config}");

        let columns = read_columns(data, &config)?;
        let grouped = group_rows(&columns)?;
        let state = match state {
            Some(state) => state,
            None => fit_state(&config, &columns, &grouped),
        };

        let groups: Vec<GroupSeries> = grouped
            .into_iter()
            .map(|(key, rows)| GroupSeries::new(key, &rows, &columns, &config, &state))
            .collect();
        let index = window_index(&config, &groups);

        info!(
            "Built dataset with {} groups and {} windows (predict mode: {}).",
            groups.len(),
            index.len(),
            config.predict_mode
        );

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            state,
            groups,
            index,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &TimeSeriesDataSetConfig {
        &self.config
    }

    pub fn roles(&self) -> &FeatureRoles {
        &self.config.roles
    }

    pub fn window(&self) -> &WindowSpec {
        &self.config.window
    }

    pub fn target_normalizer(&self) -> &TargetNormalizer {
        &self.state.target_normalizer
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn static_categorical_names(&self) -> Vec<String> {
        self.config.roles.static_categoricals.clone()
    }

    pub fn static_real_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.config.add_target_scales {
            for target in &self.config.targets {
                names.push(format!("{target}_center"));
                names.push(format!("{target}_scale"));
            }
        }
        if self.config.add_encoder_length {
            names.push("encoder_length".to_string());
        }
        names
    }

    pub fn known_real_names(&self) -> Vec<String> {
        let mut names = self.config.roles.time_varying_known_reals.clone();
        if self.config.add_relative_time_idx {
            names.push("relative_time_idx".to_string());
        }
        names
    }

    pub fn unknown_real_names(&self) -> Vec<String> {
        let mut names = self.config.targets.clone();
        names.extend(observed_reals(&self.config));
        for target in &self.config.targets {
            for &lag in self.config.lags.get(target) {
                names.push(LagSpec::feature_name(target, lag));
            }
        }
        names
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowInfo<'_>> {
        self.index.iter().map(move |window| {
            let group = &self.groups[window.group];
            let decoder = window.start + window.encoder_length;
            WindowInfo {
                group: &group.key,
                encoder_length: window.encoder_length,
                decoder_length: window.decoder_length,
                first_time_idx: group.time[window.start],
                decoder_time_idx: group.time[decoder],
                last_time_idx: group.time[decoder + window.decoder_length - 1],
            }
        })
    }

    fn randomizes(&self) -> bool {
        let window = &self.config.window;
        self.config.randomize_length
            && !self.config.predict_mode
            && window.min_encoder_length < window.max_encoder_length
    }

    fn item(&self, index: usize) -> Option<WindowItem> {
        let window = *self.index.get(index)?;
        let group = &self.groups[window.group];
        let spec = &self.config.window;

        let mut encoder_length = window.encoder_length;
        if self.randomizes() && encoder_length > spec.min_encoder_length {
            if let Ok(mut rng) = self.rng.lock() {
                encoder_length = rng.gen_range(spec.min_encoder_length..=encoder_length);
            }
        }

        let decoder_start = window.start + window.encoder_length;
        let first = decoder_start - encoder_length;
        let end = decoder_start + window.decoder_length;
        let max_encoder = spec.max_encoder_length as f64;

        let known_reals = (first..end)
            .map(|step| {
                let mut row: Vec<f32> = group.known.iter().map(|f| f[step] as f32).collect();
                if self.config.add_relative_time_idx {
                    row.push(((step as f64 - decoder_start as f64) / max_encoder) as f32);
                }
                row
            })
            .collect();

        let encoder_target: Vec<Vec<f32>> = (first..decoder_start)
            .map(|step| group.normalized.iter().map(|t| t[step] as f32).collect())
            .collect();

        let unknown_reals = (first..decoder_start)
            .map(|step| {
                group
                    .normalized
                    .iter()
                    .chain(&group.observed)
                    .chain(&group.lagged)
                    .map(|f| f[step] as f32)
                    .collect()
            })
            .collect();

        let decoder_target = (decoder_start..end)
            .map(|step| group.targets.iter().map(|t| t[step] as f32).collect())
            .collect();

        let target_scale: Vec<[f32; 2]> = group
            .scales
            .iter()
            .map(|p| [p.center as f32, p.scale as f32])
            .collect();

        let mut static_reals = Vec::new();
        if self.config.add_target_scales {
            static_reals.extend(target_scale.iter().flatten().copied());
        }
        if self.config.add_encoder_length {
            let scaled = (encoder_length as f64 - 0.5 * max_encoder) / max_encoder * 2.0;
            static_reals.push(scaled as f32);
        }

        Some(WindowItem {
            group: group.key.clone(),
            time_idx: group.time[decoder_start],
            encoder_length,
            decoder_length: window.decoder_length,
            static_categoricals: group.static_codes.clone(),
            static_reals,
            known_reals,
            unknown_reals,
            encoder_target,
            decoder_target,
            target_scale,
        })
    }
}

impl Dataset<WindowItem> for TimeSeriesDataSet {
    fn get(&self, index: usize) -> Option<WindowItem> {
        self.item(index)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

impl GroupSeries {
    fn new(
        key: Vec<String>,
        rows: &[usize],
        columns: &Columns,
        config: &TimeSeriesDataSetConfig,
        state: &FittedState,
    ) -> Self {
        let take = |values: &[f64]| -> Vec<f64> { rows.iter().map(|&r| values[r]).collect() };

        let static_codes = config
            .roles
            .static_categoricals
            .iter()
            .zip(&columns.categoricals)
            .map(|(name, values)| {
                state
                    .categorical_encoders
                    .get(name)
                    .map_or(0, |encoder| encoder.transform(&values[rows[0]]))
            })
            .collect();

        let scale = |names: Vec<String>, values: &[Vec<f64>]| -> Vec<Vec<f64>> {
            names
                .iter()
                .zip(values)
                .map(|(name, values)| {
                    let scaler = state.scalers.get(name);
                    rows.iter()
                        .map(|&r| scaler.map_or(values[r], |s| s.transform(values[r])))
                        .collect()
                })
                .collect()
        };
        let known = scale(config.roles.time_varying_known_reals.clone(), &columns.known);
        let observed = scale(observed_reals(config), &columns.observed);

        let targets: Vec<Vec<f64>> = columns.targets.iter().map(|t| take(t)).collect();
        let mut scales = Vec::with_capacity(targets.len());
        let mut normalized = Vec::with_capacity(targets.len());
        let mut lagged = Vec::new();

        for (target, values) in config.targets.iter().zip(&targets) {
            let normalizer = state.target_normalizer.get(target);
            let params = normalizer.map_or(
                NormParams {
                    center: 0.0,
                    scale: 1.0,
                },
                |n| n.params(&key),
            );
            let series: Vec<f64> = match normalizer {
                Some(n) => values.iter().map(|&v| n.transform(v, params)).collect(),
                None => values.clone(),
            };
            let lags = config.lags.get(target);
            for lag in lags_beyond_history(lags, series.len()) {
                warn!(
                    "Group {key:?} has {} steps, {target}_lagged_by_{lag} is constant zero.",
                    series.len()
                );
            }
            for &lag in lags {
                lagged.push(
                    (0..series.len())
                        .map(|step| if step >= lag { series[step - lag] } else { 0.0 })
                        .collect(),
                );
            }
            scales.push(params);
            normalized.push(series);
        }

        Self {
            time: rows.iter().map(|&r| columns.time[r]).collect(),
            key,
            static_codes,
            known,
            observed,
            normalized,
            targets,
            lagged,
            scales,
        }
    }

    fn len(&self) -> usize {
        self.time.len()
    }
}

/// Lags with no earlier value anywhere in a group of `len` steps.
fn lags_beyond_history(lags: &[usize], len: usize) -> impl Iterator<Item = usize> + '_ {
    lags.iter().copied().filter(move |&lag| lag >= len)
}

fn observed_reals(config: &TimeSeriesDataSetConfig) -> Vec<String> {
    config.roles.observed_reals(&config.targets)
}

fn read_columns(data: &DataFrame, config: &TimeSeriesDataSetConfig) -> Result<Columns> {
    let reals = |names: &[String]| -> Result<Vec<Vec<f64>>> {
        names.iter().map(|name| real_column(data, name)).collect()
    };

    Ok(Columns {
        time: int_column(data, &config.time_idx)?,
        groups: group_keys(data, &config.group_ids)?,
        categoricals: config
            .roles
            .static_categoricals
            .iter()
            .map(|name| text_column(data, name))
            .collect::<Result<_>>()?,
        known: reals(&config.roles.time_varying_known_reals)?,
        observed: reals(&observed_reals(config))?,
        targets: reals(&config.targets)?,
    })
}

fn int_column(data: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let series = require_column(data, name)?
        .cast(&DataType::Int64)
        .map_err(|_| Error::TypeCoercion {
            column: name.to_string(),
            target: "integer".to_string(),
        })?;
    series
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| missing_values(name)))
        .collect()
}

fn real_column(data: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = require_column(data, name)?
        .cast(&DataType::Float64)
        .map_err(|_| Error::TypeCoercion {
            column: name.to_string(),
            target: "float".to_string(),
        })?;
    series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|v| !v.is_nan()).ok_or_else(|| missing_values(name)))
        .collect()
}

fn text_column(data: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = require_column(data, name)?.cast(&DataType::Utf8)?;
    series
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string).ok_or_else(|| missing_values(name)))
        .collect()
}

fn missing_values(column: &str) -> Error {
    Error::InvalidArgument(format!("column '{column}' contains missing values"))
}

/// Row numbers of every group, sorted by time index. Groups must be free of
/// gaps and duplicate time indices.
fn group_rows(columns: &Columns) -> Result<Vec<(Vec<String>, Vec<usize>)>> {
    let mut grouped: BTreeMap<&[String], Vec<usize>> = BTreeMap::new();
    for (row, key) in columns.groups.iter().enumerate() {
        grouped.entry(key.as_slice()).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(key, mut rows)| {
            rows.sort_by_key(|&r| columns.time[r]);
            let times: Vec<i64> = rows.iter().map(|&r| columns.time[r]).collect();

            if let Some(pair) = times.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(Error::InvalidArgument(format!(
                    "group {key:?} has duplicate time index {}",
                    pair[0]
                )));
            }
            let missing = missing_indices(&times.iter().copied().collect());
            if !missing.is_empty() {
                return Err(Error::MissingTimesteps {
                    group: key.to_vec(),
                    missing,
                });
            }
            Ok((key.to_vec(), rows))
        })
        .collect()
}

fn fit_state(
    config: &TimeSeriesDataSetConfig,
    columns: &Columns,
    grouped: &[(Vec<String>, Vec<usize>)],
) -> FittedState {
    let categorical_encoders = config
        .roles
        .static_categoricals
        .iter()
        .zip(&columns.categoricals)
        .map(|(name, values)| {
            (
                name.clone(),
                CategoricalEncoder::fit(values.iter().map(String::as_str)),
            )
        })
        .collect();

    let scalers = config
        .roles
        .time_varying_known_reals
        .iter()
        .zip(&columns.known)
        .chain(observed_reals(config).iter().zip(&columns.observed))
        .map(|(name, values)| (name.clone(), StandardScaler::fit(values)))
        .collect();

    let normalizers = config
        .targets
        .iter()
        .zip(&columns.targets)
        .map(|(target, values)| {
            let per_group: Vec<(&[String], Vec<f64>)> = grouped
                .iter()
                .map(|(key, rows)| (key.as_slice(), rows.iter().map(|&r| values[r]).collect()))
                .collect();
            GroupNormalizer::fit(
                target,
                config.transformation,
                per_group.iter().map(|(key, values)| (*key, values.as_slice())),
            )
        })
        .collect();

    FittedState {
        categorical_encoders,
        scalers,
        target_normalizer: TargetNormalizer::new(normalizers),
    }
}

fn window_index(config: &TimeSeriesDataSetConfig, groups: &[GroupSeries]) -> Vec<WindowIndex> {
    let spec = &config.window;
    let mut index = Vec::new();

    for (g, group) in groups.iter().enumerate() {
        let n = group.len();

        if config.predict_mode {
            let mut decoder_length = spec
                .max_prediction_length
                .min(n.saturating_sub(spec.min_encoder_length));
            if let (Some(min_idx), Some(&last)) = (config.min_prediction_idx, group.time.last()) {
                let allowed = (last - min_idx + 1).max(0) as usize;
                decoder_length = decoder_length.min(allowed);
            }
            if decoder_length == 0 || decoder_length < spec.min_prediction_length {
                continue;
            }
            let encoder_length = spec.max_encoder_length.min(n - decoder_length);
            if encoder_length < spec.min_encoder_length {
                continue;
            }
            index.push(WindowIndex {
                group: g,
                start: n - decoder_length - encoder_length,
                encoder_length,
                decoder_length,
            });
            continue;
        }

        for start in 0..n {
            let length = (n - start).min(spec.max_length());
            if length < spec.min_length() {
                break;
            }
            let decoder_length = spec.max_prediction_length.min(length - spec.min_encoder_length);
            let encoder_length = length - decoder_length;
            if let Some(min_idx) = config.min_prediction_idx {
                if group.time[start + encoder_length] < min_idx {
                    continue;
                }
            }
            index.push(WindowIndex {
                group: g,
                start,
                encoder_length,
                decoder_length,
            });
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(groups: &[&str], steps: i64) -> DataFrame {
        let mut time = Vec::new();
        let mut latitude = Vec::new();
        let mut sin_hour = Vec::new();
        let mut tcc = Vec::new();
        for (g, name) in groups.iter().enumerate() {
            for t in 0..steps {
                time.push(t);
                latitude.push(name.to_string());
                sin_hour.push((t as f64).sin());
                tcc.push(0.1 + 0.05 * g as f64 + 0.01 * (t % 7) as f64);
            }
        }
        df![
            "time_idx" => time,
            "latitude" => latitude,
            "sin_hour" => sin_hour,
            "tcc" => tcc,
        ]
        .unwrap()
    }

    fn config(window: WindowSpec) -> TimeSeriesDataSetConfig {
        TimeSeriesDataSetConfig::new(
            "time_idx".into(),
            vec!["tcc".into()],
            vec!["latitude".into()],
            window,
        )
        .with_roles(FeatureRoles {
            static_categoricals: vec!["latitude".into()],
            time_varying_known_reals: vec!["time_idx".into(), "sin_hour".into()],
            time_varying_unknown_reals: vec!["tcc".into()],
        })
    }

    #[test]
    fn windows_respect_length_bounds() {
        let spec = WindowSpec::new(3, 5, 1, 2);
        let dataset = TimeSeriesDataSet::new(&table(&["a", "b"], 12), config(spec)).unwrap();

        assert!(dataset.len() > 0);
        for window in dataset.windows() {
            assert!((3..=5).contains(&window.encoder_length));
            assert!((1..=2).contains(&window.decoder_length));
            assert_eq!(
                window.last_time_idx - window.first_time_idx + 1,
                (window.encoder_length + window.decoder_length) as i64
            );
        }
        // full-length windows start at 0..=5, shorter ones at 6..=8
        assert_eq!(dataset.len(), 2 * 9);
    }

    #[test]
    fn items_have_consistent_shapes() {
        let spec = WindowSpec::new(4, 4, 2, 2);
        let dataset = TimeSeriesDataSet::new(&table(&["a"], 10), config(spec)).unwrap();
        let item = dataset.get(0).unwrap();

        assert_eq!(item.encoder_length, 4);
        assert_eq!(item.decoder_length, 2);
        assert_eq!(item.time_idx, 4);
        assert_eq!(item.known_reals.len(), 6);
        assert_eq!(item.known_reals[0].len(), dataset.known_real_names().len());
        assert_eq!(item.unknown_reals.len(), 4);
        assert_eq!(item.unknown_reals[0].len(), dataset.unknown_real_names().len());
        assert_eq!(item.decoder_target.len(), 2);
        assert_eq!(item.static_reals.len(), dataset.static_real_names().len());
        assert_eq!(item.static_categoricals, vec![1]);

        // relative time index is 0 at the first decoder step
        let relative = item.known_reals[4].last().copied().unwrap();
        assert_eq!(relative, 0.0);
        assert!((item.decoder_target[0][0] - 0.14).abs() < 1e-6);
    }

    #[test]
    fn lags_add_unknown_reals() {
        let spec = WindowSpec::new(4, 4, 1, 1);
        let cfg = config(spec).with_lags(LagSpec::default().with_target("tcc", vec![7, 2]));
        let dataset = TimeSeriesDataSet::new(&table(&["a"], 20), cfg).unwrap();

        assert_eq!(
            dataset.unknown_real_names(),
            vec!["tcc", "tcc_lagged_by_7", "tcc_lagged_by_2"]
        );
        let item = dataset.get(10).unwrap();
        let current = &item.unknown_reals;
        // lag 2 at encoder step 3 equals the target at encoder step 1
        assert_eq!(current[3][2], current[1][0]);
        // first item has no history for lag 7
        let first = dataset.get(0).unwrap();
        assert_eq!(first.unknown_reals[0][1], 0.0);
    }

    #[test]
    fn lags_longer_than_group_are_flagged() {
        let lags = [4383, 84, 2];
        assert_eq!(lags_beyond_history(&lags, 100).collect::<Vec<_>>(), vec![4383]);
        assert_eq!(lags_beyond_history(&lags, 84).collect::<Vec<_>>(), vec![4383, 84]);
        assert_eq!(lags_beyond_history(&lags, 5000).count(), 0);

        let cfg = config(WindowSpec::new(4, 4, 1, 1))
            .with_lags(LagSpec::default().with_target("tcc", vec![30]));
        let dataset = TimeSeriesDataSet::new(&table(&["a"], 20), cfg).unwrap();
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert!(item.unknown_reals.iter().all(|row| row[1] == 0.0));
        }
    }

    #[test]
    fn predict_mode_takes_last_window_per_group() {
        let spec = WindowSpec::new(2, 6, 1, 3);
        let training = TimeSeriesDataSet::new(&table(&["a", "b"], 15), config(spec)).unwrap();
        let validation =
            TimeSeriesDataSet::from_dataset(&training, &table(&["a", "b"], 20), true, true, Some(15))
                .unwrap();

        assert_eq!(validation.len(), 2);
        for window in validation.windows() {
            assert_eq!(window.decoder_time_idx, 17);
            assert_eq!(window.last_time_idx, 19);
            assert_eq!(window.encoder_length, 6);
        }
    }

    #[test]
    fn randomized_encoder_length_stays_in_bounds() {
        let spec = WindowSpec::new(2, 6, 1, 1);
        let dataset = TimeSeriesDataSet::new(&table(&["a"], 30), config(spec)).unwrap();
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert!((2..=6).contains(&item.encoder_length));
            assert_eq!(item.encoder_target.len(), item.encoder_length);
            assert_eq!(item.known_reals.len(), item.encoder_length + item.decoder_length);
        }
    }

    #[test]
    fn gaps_inside_groups_are_rejected() {
        let df = table(&["a"], 10);
        let mask = df.column("time_idx").unwrap().i64().unwrap().not_equal(4);
        let df = df.filter(&mask).unwrap();

        let err = TimeSeriesDataSet::new(&df, config(WindowSpec::new(1, 2, 1, 1))).err().unwrap();
        assert!(matches!(err, Error::MissingTimesteps { missing, .. } if missing == vec![4]));
    }

    #[test]
    fn nulls_in_features_are_rejected() {
        let df = df![
            "time_idx" => &[0i64, 1],
            "latitude" => &["a", "a"],
            "sin_hour" => &[Some(0.0), None],
            "tcc" => &[0.1, 0.2],
        ]
        .unwrap();
        let err = TimeSeriesDataSet::new(&df, config(WindowSpec::new(1, 1, 1, 1))).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let spec = WindowSpec::new(2, 4, 1, 2);
        let dataset = TimeSeriesDataSet::new(&table(&["a", "b"], 12), config(spec)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");

        dataset.save(&path).unwrap();
        let loaded = TimeSeriesDataSet::load(&path, &table(&["a", "b"], 12)).unwrap();

        assert_eq!(loaded.len(), dataset.len());
        assert_eq!(
            loaded.windows().collect::<Vec<_>>(),
            dataset.windows().collect::<Vec<_>>()
        );
        let key = vec!["b".to_string()];
        let original = dataset.target_normalizer().get("tcc").unwrap().params(&key);
        let restored = loaded.target_normalizer().get("tcc").unwrap().params(&key);
        assert_eq!(original, restored);
    }
}
