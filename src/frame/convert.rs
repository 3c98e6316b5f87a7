use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::{debug, info};

use super::require_column;
use crate::error::{Error, Result};

/// Labeled multi-dimensional data: one coordinate axis per dimension and any
/// number of data variables stored flattened in row-major order.
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    coords: Vec<Series>,
    data_vars: BTreeMap<String, Vec<f64>>,
}

impl GriddedDataset {
    pub fn new(coords: Vec<Series>) -> Self {
        Self {
            coords,
            data_vars: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, values: Vec<f64>) -> Self {
        self.data_vars.insert(name.to_string(), values);
        self
    }

    pub fn shape(&self) -> Vec<usize> {
        self.coords.iter().map(|s| s.len()).collect()
    }

    pub fn variables(&self) -> Vec<String> {
        self.data_vars.keys().cloned().collect()
    }

    fn to_dataframe(&self, variables: &[String]) -> Result<DataFrame> {
        if self.coords.is_empty() {
            return Err(Error::UnsupportedInput(
                "gridded dataset has no coordinate axes".to_string(),
            ));
        }

        let shape = self.shape();
        let rows: usize = shape.iter().product();
        let mut columns = Vec::with_capacity(self.coords.len() + variables.len());

        let mut stride = rows;
        for (coord, &len) in self.coords.iter().zip(shape.iter()) {
            let len = len.max(1);
            stride /= len;
            let idx: Vec<IdxSize> = (0..rows)
                .map(|row| ((row / stride.max(1)) % len) as IdxSize)
                .collect();
            columns.push(coord.take(&IdxCa::new("idx", idx.as_slice()))?);
        }

        for name in variables {
            let values = &self.data_vars[name];
            if values.len() != rows {
                return Err(Error::UnsupportedInput(format!(
                    "variable '{name}' has {} values, expected {rows} for shape {shape:?}",
                    values.len()
                )));
            }
            columns.push(Series::new(name, values.as_slice()));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Input accepted by [`convert_to_dataframe`].
#[derive(Debug, Clone)]
pub enum DataSource {
    Grid(GriddedDataset),
    Table(DataFrame),
}

/// Flattens `source` into a table restricted to `variables` (all variables
/// when `None` or empty). For grids the coordinate columns are always kept.
pub fn convert_to_dataframe(source: DataSource, variables: Option<&[String]>) -> Result<DataFrame> {
    let requested: Vec<String> = variables.map(<[String]>::to_vec).unwrap_or_default();

    let df = match source {
        DataSource::Grid(grid) => {
            let available = grid.variables();
            debug!("Dataset variables: {available:?}");
            debug!("Requested variables: {requested:?}");

            let selected = if requested.is_empty() {
                available
            } else {
                ensure_present(&requested, &available)?;
                requested
            };
            grid.to_dataframe(&selected)?
        }
        DataSource::Table(df) => {
            let available: Vec<String> = df
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect();
            debug!("DataFrame columns: {available:?}");
            debug!("Requested variables: {requested:?}");

            if requested.is_empty() {
                df
            } else {
                ensure_present(&requested, &available)?;
                df.select(&requested)?
            }
        }
    };

    info!(
        "Converted dataset to DataFrame with {} rows and columns {:?}",
        df.height(),
        df.get_column_names()
    );
    Ok(df)
}

fn ensure_present(requested: &[String], available: &[String]) -> Result<()> {
    let missing: Vec<String> = requested
        .iter()
        .filter(|name| !available.contains(name))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingVariables(missing))
    }
}

pub fn convert_columns_to_string<S: AsRef<str>>(mut df: DataFrame, columns: &[S]) -> Result<DataFrame> {
    for column in columns {
        let column = column.as_ref();
        let converted = coerce(&df, column, DataType::Utf8, "string")?;
        df.with_column(converted)?;
        info!("Converted column '{column}' to string.");
    }
    Ok(df)
}

pub fn convert_columns_to_float<S: AsRef<str>>(mut df: DataFrame, columns: &[S]) -> Result<DataFrame> {
    for column in columns {
        let column = column.as_ref();
        let converted = coerce(&df, column, DataType::Float64, "float")?;
        df.with_column(converted)?;
        info!("Converted column '{column}' to float.");
    }
    Ok(df)
}

fn coerce(df: &DataFrame, column: &str, dtype: DataType, target: &str) -> Result<Series> {
    require_column(df, column)?
        .strict_cast(&dtype)
        .map_err(|_| Error::TypeCoercion {
            column: column.to_string(),
            target: target.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GriddedDataset {
        GriddedDataset::new(vec![
            Series::new("time", &["2021-01-01 00:00:00", "2021-01-01 02:00:00"]),
            Series::new("latitude", &[50.0, 50.25]),
            Series::new("longitude", &[4.0, 4.25, 4.5]),
        ])
        .with_variable("tcc", (0..12).map(|v| v as f64 / 12.0).collect())
        .with_variable("hcc", vec![0.5; 12])
    }

    #[test]
    fn grid_expands_coordinate_product() {
        let vars = ["tcc".to_string()];
        let df = convert_to_dataframe(DataSource::Grid(grid()), Some(&vars[..])).unwrap();

        assert_eq!(df.shape(), (12, 4));
        let lon: Vec<f64> = df.column("longitude").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(&lon[..4], &[4.0, 4.25, 4.5, 4.0]);
        let lat: Vec<f64> = df.column("latitude").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(&lat[..4], &[50.0, 50.0, 50.0, 50.25]);
        let time = df.column("time").unwrap().utf8().unwrap();
        assert_eq!(time.get(6), Some("2021-01-01 02:00:00"));
    }

    #[test]
    fn grid_defaults_to_all_variables() {
        let df = convert_to_dataframe(DataSource::Grid(grid()), None).unwrap();
        assert_eq!(df.width(), 5);
    }

    #[test]
    fn absent_variables_are_rejected() {
        let vars = ["tcc".to_string(), "lcc".to_string()];
        let err = convert_to_dataframe(DataSource::Grid(grid()), Some(&vars[..])).unwrap_err();
        assert!(matches!(err, Error::MissingVariables(names) if names == vec!["lcc".to_string()]));

        let table = df!["tcc" => &[0.1]].unwrap();
        let err = convert_to_dataframe(DataSource::Table(table), Some(&vars[..])).unwrap_err();
        assert!(matches!(err, Error::MissingVariables(_)));
    }

    #[test]
    fn malformed_grid_is_unsupported() {
        let bad = grid().with_variable("lcc", vec![0.0; 5]);
        let err = convert_to_dataframe(DataSource::Grid(bad), None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput(_)));
    }

    #[test]
    fn coercions() {
        let df = df![
            "latitude" => &[50.25, 51.0],
            "sold" => &["1.5", "2"],
            "label" => &["1.0", "n/a"],
        ]
        .unwrap();

        let df = convert_columns_to_string(df, &["latitude"]).unwrap();
        assert_eq!(df.column("latitude").unwrap().utf8().unwrap().get(0), Some("50.25"));

        let df = convert_columns_to_float(df, &["sold"]).unwrap();
        assert_eq!(df.column("sold").unwrap().f64().unwrap().get(1), Some(2.0));

        let err = convert_columns_to_float(df, &["label"]).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { column, .. } if column == "label"));
    }
}
