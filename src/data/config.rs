use std::collections::BTreeSet;

use burn::config::Config;
use serde::{Deserialize, Serialize};

use super::lags::LagSpec;
use super::normalizer::Transformation;
use crate::error::Error;

/// Encoder/decoder window lengths, in time-index steps.
#[derive(Config, Debug)]
pub struct WindowSpec {
    pub min_encoder_length: usize,
    pub max_encoder_length: usize,
    pub min_prediction_length: usize,
    pub max_prediction_length: usize,
}

impl WindowSpec {
    pub fn validate(&self) -> crate::error::Result<()> {
        let pairs = [
            (
                "encoder",
                self.min_encoder_length,
                self.max_encoder_length,
            ),
            (
                "prediction",
                self.min_prediction_length,
                self.max_prediction_length,
            ),
        ];
        for (name, min, max) in pairs {
            if min == 0 || max == 0 {
                return Err(Error::Config(format!("{name} lengths must be positive")));
            }
            if min > max {
                return Err(Error::Config(format!(
                    "min_{name}_length ({min}) exceeds max_{name}_length ({max})"
                )));
            }
        }
        Ok(())
    }

    pub fn min_length(&self) -> usize {
        self.min_encoder_length + self.min_prediction_length
    }

    pub fn max_length(&self) -> usize {
        self.max_encoder_length + self.max_prediction_length
    }
}

/// Partition of the feature columns into the roles the model sees them in.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FeatureRoles {
    /// Constant within a group.
    pub static_categoricals: Vec<String>,
    /// Future values are known in advance.
    pub time_varying_known_reals: Vec<String>,
    /// Only observed in the past; the targets live here.
    pub time_varying_unknown_reals: Vec<String>,
}

impl FeatureRoles {
    pub fn validate(&self, targets: &[String]) -> crate::error::Result<()> {
        let mut seen = BTreeSet::new();
        let all = self
            .static_categoricals
            .iter()
            .chain(&self.time_varying_known_reals)
            .chain(&self.time_varying_unknown_reals);
        for column in all {
            if !seen.insert(column) {
                return Err(Error::Config(format!(
                    "column '{column}' is assigned to more than one feature role"
                )));
            }
        }

        for target in targets {
            if !self.time_varying_unknown_reals.contains(target) {
                return Err(Error::Config(format!(
                    "target '{target}' must be a time-varying unknown real"
                )));
            }
        }
        Ok(())
    }

    /// Unknown reals that are not targets.
    pub fn observed_reals(&self, targets: &[String]) -> Vec<String> {
        self.time_varying_unknown_reals
            .iter()
            .filter(|name| !targets.contains(name))
            .cloned()
            .collect()
    }
}

#[derive(Config, Debug)]
pub struct TimeSeriesDataSetConfig {
    pub time_idx: String,
    pub targets: Vec<String>,
    pub group_ids: Vec<String>,
    pub window: WindowSpec,

    #[config(default = "FeatureRoles::default()")]
    pub roles: FeatureRoles,

    #[config(default = "LagSpec::default()")]
    pub lags: LagSpec,

    #[config(default = "Transformation::Softplus")]
    pub transformation: Transformation,

    #[config(default = true)]
    pub add_relative_time_idx: bool,

    #[config(default = true)]
    pub add_target_scales: bool,

    #[config(default = true)]
    pub add_encoder_length: bool,

    /// Emit only the last window of every group.
    #[config(default = false)]
    pub predict_mode: bool,

    /// First time index a decoder may start predicting at.
    #[config(default = "None")]
    pub min_prediction_idx: Option<i64>,

    #[config(default = true)]
    pub randomize_length: bool,

    #[config(default = 42)]
    pub seed: u64,
}

impl TimeSeriesDataSetConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        self.window.validate()?;

        if self.targets.is_empty() {
            return Err(Error::Config("at least one target is required".to_string()));
        }
        if self.group_ids.is_empty() {
            return Err(Error::Config("at least one group id is required".to_string()));
        }
        self.roles.validate(&self.targets)?;

        for (target, offsets) in self.lags.iter() {
            if !self.targets.contains(target) {
                return Err(Error::Config(format!(
                    "lags are configured for '{target}', which is not a target"
                )));
            }
            if offsets.iter().any(|&lag| lag == 0) {
                return Err(Error::Config(format!("lags of '{target}' must be positive")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> FeatureRoles {
        FeatureRoles {
            static_categoricals: vec!["latitude".into(), "longitude".into()],
            time_varying_known_reals: vec!["time_idx".into(), "sin_hour".into()],
            time_varying_unknown_reals: vec!["tcc".into()],
        }
    }

    fn config() -> TimeSeriesDataSetConfig {
        TimeSeriesDataSetConfig::new(
            "time_idx".into(),
            vec!["tcc".into()],
            vec!["latitude".into(), "longitude".into()],
            WindowSpec::new(2, 4, 1, 2),
        )
        .with_roles(roles())
    }

    #[test]
    fn window_bounds_are_checked() {
        assert!(WindowSpec::new(1, 1, 1, 1).validate().is_ok());
        assert!(matches!(WindowSpec::new(0, 4, 1, 2).validate(), Err(Error::Config(_))));
        assert!(matches!(WindowSpec::new(5, 4, 1, 2).validate(), Err(Error::Config(_))));
        assert!(matches!(WindowSpec::new(1, 4, 3, 2).validate(), Err(Error::Config(_))));
    }

    #[test]
    fn roles_must_be_disjoint() {
        let mut roles = roles();
        roles.time_varying_known_reals.push("latitude".into());
        assert!(roles.validate(&["tcc".to_string()]).is_err());
    }

    #[test]
    fn targets_must_be_unknown_reals() {
        assert!(roles().validate(&["sin_hour".to_string()]).is_err());
        assert!(roles().validate(&["tcc".to_string()]).is_ok());
    }

    #[test]
    fn lags_must_reference_targets() {
        assert!(config().validate().is_ok());

        let bad = config().with_lags(LagSpec::default().with_target("hcc", vec![84]));
        assert!(bad.validate().is_err());

        let zero = config().with_lags(LagSpec::default().with_target("tcc", vec![0]));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn observed_reals_skip_targets() {
        let mut roles = roles();
        roles.time_varying_unknown_reals.push("hcc".into());
        assert_eq!(roles.observed_reals(&["tcc".to_string()]), vec!["hcc".to_string()]);
    }
}
