use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inputs below this floor are clamped before the inverse softplus, which is
/// undefined at zero.
const SOFTPLUS_FLOOR: f64 = 1e-6;
const EPS: f64 = 1e-8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    Identity,
    Softplus,
    Log1p,
}

impl Transformation {
    pub fn forward(&self, x: f64) -> f64 {
        match self {
            Transformation::Identity => x,
            Transformation::Softplus => {
                let x = x.max(SOFTPLUS_FLOOR);
                x + (-(-x).exp_m1()).ln()
            }
            Transformation::Log1p => x.ln_1p(),
        }
    }

    pub fn reverse(&self, y: f64) -> f64 {
        match self {
            Transformation::Identity => y,
            Transformation::Softplus => {
                if y > 20.0 {
                    y
                } else {
                    y.exp().ln_1p()
                }
            }
            Transformation::Log1p => y.exp_m1(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NormParams {
    pub center: f64,
    pub scale: f64,
}

impl NormParams {
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.collect();
        if values.is_empty() {
            return Self {
                center: 0.0,
                scale: 1.0,
            };
        }
        let n = values.len() as f64;
        let center = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - center).powi(2)).sum::<f64>() / n;
        Self {
            center,
            scale: variance.sqrt() + EPS,
        }
    }
}

/// Per-group standardization of one target, applied after a transformation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupNormalizer {
    target: String,
    transformation: Transformation,
    #[serde(with = "pairs")]
    params: BTreeMap<Vec<String>, NormParams>,
    fallback: NormParams,
}

impl GroupNormalizer {
    /// Fits center and scale of the transformed values of every group.
    pub fn fit<'a, I>(target: &str, transformation: Transformation, groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a [String], &'a [f64])>,
    {
        let params: BTreeMap<Vec<String>, NormParams> = groups
            .into_iter()
            .map(|(group, values)| {
                let fitted = NormParams::fit(values.iter().map(|&v| transformation.forward(v)));
                (group.to_vec(), fitted)
            })
            .collect();

        let n = params.len().max(1) as f64;
        let fallback = NormParams {
            center: params.values().map(|p| p.center).sum::<f64>() / n,
            scale: if params.is_empty() {
                1.0
            } else {
                params.values().map(|p| p.scale).sum::<f64>() / n
            },
        };

        Self {
            target: target.to_string(),
            transformation,
            params,
            fallback,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Parameters of `group`, or the mean over fitted groups for a group
    /// that was not seen while fitting.
    pub fn params(&self, group: &[String]) -> NormParams {
        self.params.get(group).copied().unwrap_or(self.fallback)
    }

    pub fn transform(&self, value: f64, params: NormParams) -> f64 {
        (self.transformation.forward(value) - params.center) / params.scale
    }

    pub fn inverse_transform(&self, value: f64, params: NormParams) -> f64 {
        self.transformation
            .reverse(value * params.scale + params.center)
    }

    pub fn num_groups(&self) -> usize {
        self.params.len()
    }
}

/// One [`GroupNormalizer`] per target, in target order.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TargetNormalizer {
    normalizers: Vec<GroupNormalizer>,
}

impl TargetNormalizer {
    pub fn new(normalizers: Vec<GroupNormalizer>) -> Self {
        Self { normalizers }
    }

    pub fn get(&self, target: &str) -> Option<&GroupNormalizer> {
        self.normalizers.iter().find(|n| n.target == target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupNormalizer> {
        self.normalizers.iter()
    }
}

/// Standardization of a real-valued feature over all rows.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StandardScaler {
    mean: f64,
    std: f64,
}

impl StandardScaler {
    pub fn fit(values: &[f64]) -> Self {
        let params = NormParams::fit(values.iter().copied());
        let std = params.scale - EPS;
        Self {
            mean: params.center,
            std: if std > 0.0 { std } else { 1.0 },
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Label encoding of a categorical column. Code 0 is reserved for values
/// unseen while fitting.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CategoricalEncoder {
    classes: BTreeMap<String, i64>,
}

impl CategoricalEncoder {
    pub fn fit<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let mut classes = BTreeMap::new();
        for value in values {
            classes.entry(value.to_string()).or_insert(0);
        }
        for (code, value) in classes.values_mut().enumerate() {
            *value = code as i64 + 1;
        }
        Self { classes }
    }

    pub fn transform(&self, value: &str) -> i64 {
        self.classes.get(value).copied().unwrap_or(0)
    }

    /// Number of codes including the reserved unknown code.
    pub fn cardinality(&self) -> usize {
        self.classes.len() + 1
    }
}

mod pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
