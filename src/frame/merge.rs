use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::require_column;
use crate::error::{Error, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inner" => Ok(JoinKind::Inner),
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "outer" => Ok(JoinKind::Outer),
            other => Err(Error::InvalidArgument(format!(
                "unsupported join '{other}'; use inner, left, right, or outer"
            ))),
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Outer => "outer",
        };
        f.write_str(name)
    }
}

/// Relational join of two tables on the column `on`.
pub fn merge_dataframes(
    left: DataFrame,
    right: DataFrame,
    on: &str,
    how: JoinKind,
) -> Result<DataFrame> {
    require_column(&left, on)?;
    require_column(&right, on)?;

    let merged = match how {
        JoinKind::Inner => left.inner_join(&right, [on], [on])?,
        JoinKind::Left => left.left_join(&right, [on], [on])?,
        JoinKind::Outer => left.outer_join(&right, [on], [on])?,
        JoinKind::Right => {
            let joined = right.left_join(&left, [on], [on])?;
            let names: Vec<String> = joined
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect();
            let mut order: Vec<String> = left
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .filter(|name| names.contains(name))
                .collect();
            let rest: Vec<String> = names.into_iter().filter(|name| !order.contains(name)).collect();
            order.extend(rest);
            joined.select(order)?
        }
    };

    info!("Merged DataFrames on column '{on}' using '{how}' method.");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (DataFrame, DataFrame) {
        let left = df!["k" => &[1i64, 2, 3], "a" => &[10.0, 20.0, 30.0]].unwrap();
        let right = df!["k" => &[2i64, 3, 4], "b" => &["x", "y", "z"]].unwrap();
        (left, right)
    }

    #[test]
    fn inner_keeps_shared_keys() {
        let (left, right) = tables();
        let merged = merge_dataframes(left, right, "k", JoinKind::Inner).unwrap();
        let keys: Vec<i64> = merged.column("k").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(keys, vec![2, 3]);
        assert_eq!(merged.width(), 3);
    }

    #[test]
    fn outer_fills_unmatched_with_nulls() {
        let (left, right) = tables();
        let merged = merge_dataframes(left, right, "k", JoinKind::Outer).unwrap();
        assert_eq!(merged.height(), 4);
        assert_eq!(merged.column("a").unwrap().null_count(), 1);
        assert_eq!(merged.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn left_and_right_keep_their_side() {
        let (left, right) = tables();
        let merged = merge_dataframes(left.clone(), right.clone(), "k", JoinKind::Left).unwrap();
        assert_eq!(merged.height(), 3);
        assert_eq!(merged.column("b").unwrap().null_count(), 1);

        let merged = merge_dataframes(left, right, "k", JoinKind::Right).unwrap();
        assert_eq!(merged.get_column_names(), vec!["k", "a", "b"]);
        assert_eq!(merged.height(), 3);
        assert_eq!(merged.column("a").unwrap().null_count(), 1);
    }

    #[test]
    fn join_kind_parsing() {
        assert_eq!("outer".parse::<JoinKind>().unwrap(), JoinKind::Outer);
        assert!(matches!(
            "cross".parse::<JoinKind>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
