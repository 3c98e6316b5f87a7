use std::collections::HashMap;
use std::hash::Hash;

use polars::prelude::*;
use tracing::info;

use super::require_column;
use crate::error::Result;

/// Reports missing cells per column and, with `drop`, removes every row
/// holding at least one. NaN counts as missing in float columns. The order
/// of the remaining rows is preserved.
pub fn check_and_handle_missing_values(df: DataFrame, drop: bool) -> Result<DataFrame> {
    let mut missing_rows = vec![false; df.height()];
    let mut per_column = Vec::new();

    for series in df.get_columns() {
        let missing = missing_mask(series)?;
        let count = missing.iter().filter(|&&m| m).count();
        if count > 0 {
            per_column.push((series.name().to_string(), count));
        }
        for (row, m) in missing_rows.iter_mut().zip(missing) {
            *row |= m;
        }
    }

    let total: usize = per_column.iter().map(|(_, count)| count).sum();
    if total == 0 {
        info!("No missing values in the DataFrame.");
        return Ok(df);
    }

    info!("DataFrame has {total} missing values.");
    for (column, count) in &per_column {
        info!("  {column}: {count}");
    }

    if !drop {
        info!("Missing values were not dropped.");
        return Ok(df);
    }

    let keep: Vec<bool> = missing_rows.iter().map(|m| !m).collect();
    let mask = Series::new("keep", keep);
    let out = df.filter(mask.bool()?)?;
    info!(
        "Dropped {} rows with missing values. Remaining rows: {}",
        df.height() - out.height(),
        out.height()
    );
    Ok(out)
}

fn missing_mask(series: &Series) -> Result<Vec<bool>> {
    Ok(match series.dtype() {
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(true, f64::is_nan))
            .collect(),
        _ => series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect(),
    })
}

/// Assigns each distinct value of `column` a code in order of first
/// appearance (0, 1, 2, ...) and stores it in `new_column`. Nulls stay null.
pub fn factorize_column(mut df: DataFrame, column: &str, new_column: &str) -> Result<DataFrame> {
    let series = require_column(&df, column)?;

    let codes = match series.dtype() {
        dtype if dtype.is_numeric() || dtype.is_temporal() => {
            let physical = series.to_physical_repr().cast(&DataType::Float64)?;
            let keys = physical.f64()?.into_iter().map(|v| v.map(float_key));
            first_appearance_codes(keys)
        }
        _ => {
            let text = series.cast(&DataType::Utf8)?;
            let keys = text.utf8()?.into_iter();
            first_appearance_codes(keys)
        }
    };

    df.with_column(Series::new(new_column, codes))?;
    info!("Factorized column '{column}' into '{new_column}' with incrementing count.");
    Ok(df)
}

fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn first_appearance_codes<K, I>(keys: I) -> Vec<Option<i64>>
where
    K: Hash + Eq,
    I: Iterator<Item = Option<K>>,
{
    let mut seen: HashMap<K, i64> = HashMap::new();
    keys.map(|key| {
        key.map(|key| {
            let next = seen.len() as i64;
            *seen.entry(key).or_insert(next)
        })
    })
    .collect()
}

/// Drops the named columns, failing if any of them is absent.
pub fn drop_columns<S: AsRef<str>>(df: DataFrame, columns: &[S]) -> Result<DataFrame> {
    let mut df = df;
    for column in columns {
        require_column(&df, column.as_ref())?;
        df = df.drop(column.as_ref())?;
    }
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    info!("Dropped columns: {names:?}");
    Ok(df)
}

/// Keeps the first row of every duplicate set, considering `subset` or all
/// columns. Row order is preserved.
pub fn drop_duplicates_and_reset_index(
    df: DataFrame,
    subset: Option<&[String]>,
) -> Result<DataFrame> {
    if let Some(subset) = subset {
        super::require_columns(&df, subset)?;
    }
    let out = df.unique_stable(subset, UniqueKeepStrategy::First, None)?;
    info!(
        "Dropped duplicates if there was any. Remaining rows: {}",
        out.height()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn drop_removes_exactly_rows_with_missing_cells() {
        let df = df![
            "a" => &[Some(1i64), None, Some(3), Some(4)],
            "b" => &[Some(1.0), Some(2.0), Some(f64::NAN), Some(4.0)],
            "c" => &[Some("x"), Some("y"), Some("z"), Some("w")],
        ]
        .unwrap();

        let out = check_and_handle_missing_values(df.clone(), true).unwrap();
        let a: Vec<Option<i64>> = out.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(4)]);

        let kept = check_and_handle_missing_values(df, false).unwrap();
        assert_eq!(kept.height(), 4);
    }

    #[test]
    fn factorize_uses_first_appearance() {
        let df = df!["city" => &["b", "a", "b", "c", "a"]].unwrap();
        let df = factorize_column(df, "city", "city_id").unwrap();
        let codes: Vec<Option<i64>> = df
            .column("city_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(0), Some(1), Some(0), Some(2), Some(1)]);
    }

    #[test]
    fn factorize_numeric_codes_are_dense() {
        let df = df!["t" => &[30i64, 10, 20, 10, 30, 40]].unwrap();
        let df = factorize_column(df, "t", "t_idx").unwrap();
        let codes: Vec<i64> = df
            .column("t_idx")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(codes, vec![0, 1, 2, 1, 0, 3]);
    }

    #[test]
    fn drop_columns_requires_presence() {
        let df = df!["a" => &[1], "b" => &[2]].unwrap();
        let out = drop_columns(df.clone(), &["a"]).unwrap();
        assert_eq!(out.get_column_names(), vec!["b"]);

        let err = drop_columns(df, &["a", "zz"]).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(name) if name == "zz"));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let df = df![
            "time" => &[1, 1, 2, 3, 3],
            "v" => &[10, 11, 20, 30, 30],
        ]
        .unwrap();

        let all = drop_duplicates_and_reset_index(df.clone(), None).unwrap();
        assert_eq!(all.height(), 4);

        let subset = ["time".to_string()];
        let by_time = drop_duplicates_and_reset_index(df, Some(&subset[..])).unwrap();
        let v: Vec<Option<i32>> = by_time.column("v").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(v, vec![Some(10), Some(20), Some(30)]);
    }
}
