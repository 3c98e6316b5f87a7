use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const HOURS_PER_WEEK: f64 = 7.0 * 24.0;
const HOURS_PER_YEAR: f64 = 365.25 * 24.0;

/// Lag offsets, in time-index steps, for each lagged target.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LagSpec {
    lags: BTreeMap<String, Vec<usize>>,
}

impl LagSpec {
    /// Yearly and weekly lags for data sampled every `hours_per_step` hours,
    /// applied to each of `targets`.
    pub fn seasonal<S: AsRef<str>>(hours_per_step: f64, targets: &[S]) -> Self {
        let yearly = (HOURS_PER_YEAR / hours_per_step).round() as usize;
        let weekly = (HOURS_PER_WEEK / hours_per_step).round() as usize;

        targets.iter().fold(Self::default(), |spec, target| {
            spec.with_target(target.as_ref(), vec![yearly, weekly])
        })
    }

    pub fn with_target(mut self, target: &str, offsets: Vec<usize>) -> Self {
        self.lags.insert(target.to_string(), offsets);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<usize>)> {
        self.lags.iter()
    }

    pub fn get(&self, target: &str) -> &[usize] {
        self.lags.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.lags.values().all(Vec::is_empty)
    }

    pub fn max_lag(&self) -> usize {
        self.lags.values().flatten().copied().max().unwrap_or(0)
    }

    pub fn feature_name(target: &str, lag: usize) -> String {
        format!("{target}_lagged_by_{lag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_hourly_lags() {
        let spec = LagSpec::seasonal(2.0, &["tcc"]);
        assert_eq!(spec.get("tcc"), &[4383, 84]);
        assert_eq!(spec.max_lag(), 4383);
        assert!(spec.get("hcc").is_empty());
    }

    #[test]
    fn hourly_and_daily_lags() {
        assert_eq!(LagSpec::seasonal(1.0, &["t"]).get("t"), &[8766, 168]);
        assert_eq!(LagSpec::seasonal(24.0, &["t"]).get("t"), &[365, 7]);
    }
}
