use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::frame::require_column;

/// Fails with [`Error::MissingIndex`] unless every integer between the
/// minimum and maximum of `time_column` is present.
pub fn consistency_check(df: &DataFrame, time_column: &str) -> Result<()> {
    let observed = observed_indices(df, time_column)?;
    let missing = missing_indices(&observed);

    if missing.is_empty() {
        debug!("No missing time indices detected.");
        Ok(())
    } else {
        debug!("Missing time indices: {missing:?}");
        Err(Error::MissingIndex {
            column: time_column.to_string(),
            missing,
        })
    }
}

/// Runs the contiguity check inside every group of `group_columns`.
pub fn consistency_check_by_group<S: AsRef<str>>(
    df: &DataFrame,
    time_column: &str,
    group_columns: &[S],
) -> Result<()> {
    let times = indices(df, time_column)?;
    let keys = group_keys(df, group_columns)?;

    let mut groups: BTreeMap<Vec<String>, BTreeSet<i64>> = BTreeMap::new();
    for (key, time) in keys.into_iter().zip(times) {
        if let Some(time) = time {
            groups.entry(key).or_default().insert(time);
        }
    }

    for (group, observed) in groups {
        let missing = missing_indices(&observed);
        if !missing.is_empty() {
            debug!("Group {group:?} is missing time indices: {missing:?}");
            return Err(Error::MissingTimesteps { group, missing });
        }
    }
    debug!("No missing time indices detected in any group.");
    Ok(())
}

pub(crate) fn missing_indices(observed: &BTreeSet<i64>) -> Vec<i64> {
    match (observed.first(), observed.last()) {
        (Some(&min), Some(&max)) => (min..=max).filter(|t| !observed.contains(t)).collect(),
        _ => Vec::new(),
    }
}

fn observed_indices(df: &DataFrame, column: &str) -> Result<BTreeSet<i64>> {
    Ok(indices(df, column)?.into_iter().flatten().collect())
}

fn indices(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    let series = require_column(df, column)?
        .cast(&DataType::Int64)
        .map_err(|_| Error::TypeCoercion {
            column: column.to_string(),
            target: "integer".to_string(),
        })?;
    let values = series.i64()?.into_iter().collect();
    Ok(values)
}

/// Stringified group key of every row.
pub(crate) fn group_keys<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<Vec<Vec<String>>> {
    let mut keys = vec![Vec::with_capacity(columns.len()); df.height()];
    for column in columns {
        let series = require_column(df, column.as_ref())?.cast(&DataType::Utf8)?;
        for (key, value) in keys.iter_mut().zip(series.utf8()?.into_iter()) {
            key.push(value.unwrap_or_default().to_string());
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_index_passes() {
        let df = df!["time_idx" => &[2i64, 0, 1, 1, 3]].unwrap();
        assert!(consistency_check(&df, "time_idx").is_ok());
    }

    #[test]
    fn removed_middle_index_is_reported() {
        let times: Vec<i64> = (0..10).filter(|&t| t != 4).collect();
        let df = df!["time_idx" => times].unwrap();

        let err = consistency_check(&df, "time_idx").unwrap_err();
        assert!(matches!(err, Error::MissingIndex { missing, .. } if missing == vec![4]));
    }

    #[test]
    fn missing_indices_are_sorted() {
        let df = df!["time_idx" => &[9i64, 0, 5]].unwrap();
        match consistency_check(&df, "time_idx") {
            Err(Error::MissingIndex { missing, .. }) => {
                assert_eq!(missing, vec![1, 2, 3, 4, 6, 7, 8])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_table_passes() {
        let df = df!["time_idx" => Vec::<i64>::new()].unwrap();
        assert!(consistency_check(&df, "time_idx").is_ok());
    }

    #[test]
    fn gaps_inside_a_group_are_found() {
        let df = df![
            "time_idx" => &[0i64, 1, 2, 0, 2],
            "latitude" => &["1", "1", "1", "2", "2"],
        ]
        .unwrap();

        assert!(consistency_check(&df, "time_idx").is_ok());
        let err = consistency_check_by_group(&df, "time_idx", &["latitude"]).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingTimesteps { group, missing } if group == vec!["2".to_string()] && missing == vec![1]
        ));
    }
}
