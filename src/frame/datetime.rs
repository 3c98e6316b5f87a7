use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;
use tracing::{info, warn};

use super::require_column;
use crate::error::{Error, Result};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

pub(crate) const MILLIS: DataType = DataType::Datetime(TimeUnit::Milliseconds, None);

/// Parses `column` into a millisecond `Datetime` column.
///
/// Entries that cannot be parsed become null instead of failing the call; the
/// number of successful and failed conversions is logged. Rows are never
/// removed here.
pub fn convert_to_datetime(
    mut df: DataFrame,
    column: &str,
    format: Option<&str>,
) -> Result<DataFrame> {
    let series = require_column(&df, column)?;
    let parsed = Series::new(column, parse_millis(series, format)?).cast(&MILLIS)?;

    let failed = parsed.null_count();
    let succeeded = parsed.len() - failed;
    info!("Successfully converted {succeeded} entries of '{column}' to datetime format.");
    if failed > 0 {
        warn!("Failed to convert {failed} entries of '{column}' to datetime format.");
    }

    df.with_column(parsed)?;
    Ok(df)
}

/// Adds the calendar date, hour of day and year of `time_column` as separate
/// columns.
pub fn split_year_date_hour(
    mut df: DataFrame,
    time_column: &str,
    hour_column: &str,
    date_column: &str,
    year_column: &str,
) -> Result<DataFrame> {
    let stamps = timestamps(&df, time_column)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let dates: Vec<Option<i32>> = stamps
        .iter()
        .map(|ts| ts.map(|ts| (ts.date() - epoch).num_days() as i32))
        .collect();
    let hours: Vec<Option<i32>> = stamps.iter().map(|ts| ts.map(|ts| ts.hour() as i32)).collect();
    let years: Vec<Option<i32>> = stamps.iter().map(|ts| ts.map(|ts| ts.year())).collect();

    df.with_column(Series::new(date_column, dates).cast(&DataType::Date)?)?;
    df.with_column(Series::new(hour_column, hours))?;
    df.with_column(Series::new(year_column, years))?;
    info!("Extracted date, hour and year from '{time_column}'.");
    Ok(df)
}

/// Reads `column` as naive UTC timestamps. Text columns are parsed with the
/// inferred formats, with unparsable entries read as `None`.
pub(crate) fn timestamps(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let series = require_column(df, column)?;
    Ok(parse_millis(series, None)?
        .into_iter()
        .map(|ms| ms.and_then(from_millis))
        .collect())
}

fn parse_millis(series: &Series, format: Option<&str>) -> Result<Vec<Option<i64>>> {
    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let physical = series.cast(&MILLIS)?.cast(&DataType::Int64)?;
            Ok(physical.i64()?.into_iter().collect())
        }
        _ => {
            let text = series
                .cast(&DataType::Utf8)
                .map_err(|_| Error::TypeCoercion {
                    column: series.name().to_string(),
                    target: "datetime".to_string(),
                })?;
            Ok(text
                .utf8()?
                .into_iter()
                .map(|value| value.and_then(|s| parse_timestamp(s.trim(), format)))
                .map(|ts| ts.map(|ts| ts.and_utc().timestamp_millis()))
                .collect())
        }
    }
}

fn parse_timestamp(value: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    match format {
        Some(fmt) => parse_with(value, fmt),
        None => DATETIME_FORMATS
            .iter()
            .chain(DATE_FORMATS.iter())
            .find_map(|fmt| parse_with(value, fmt))
            .or_else(|| {
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|dt| dt.naive_utc())
            }),
    }
}

fn parse_with(value: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, fmt).ok().or_else(|| {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

pub(crate) fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_entries_become_null() {
        let df = df![
            "time" => &["2021-01-01 00:00:00", "not a date", "2021-01-01 02:00:00"],
            "tcc" => &[0.1, 0.2, 0.3],
        ]
        .unwrap();

        let df = convert_to_datetime(df, "time", None).unwrap();
        let time = df.column("time").unwrap();

        assert_eq!(time.dtype(), &MILLIS);
        assert_eq!(time.null_count(), 1);
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn explicit_format_is_used() {
        let df = df!["time" => &["01/02/2021 06:00", "bad"]].unwrap();
        let df = convert_to_datetime(df, "time", Some("%d/%m/%Y %H:%M")).unwrap();

        let stamps = timestamps(&df, "time").unwrap();
        let expected = NaiveDate::from_ymd_opt(2021, 2, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(stamps, vec![Some(expected), None]);
    }

    #[test]
    fn date_only_values_parse_to_midnight() {
        let ts = parse_timestamp("2020-12-31", None).unwrap();
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.day(), 31);
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df!["tcc" => &[0.1]].unwrap();
        let err = convert_to_datetime(df, "time", None).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(name) if name == "time"));
    }

    #[test]
    fn split_extracts_parts() {
        let df = df!["time" => &["2022-03-04 05:00:00"]].unwrap();
        let df = convert_to_datetime(df, "time", None).unwrap();
        let df = split_year_date_hour(df, "time", "hour_id", "date_id", "year_id").unwrap();

        assert_eq!(df.column("hour_id").unwrap().i32().unwrap().get(0), Some(5));
        assert_eq!(df.column("year_id").unwrap().i32().unwrap().get(0), Some(2022));
        assert_eq!(df.column("date_id").unwrap().dtype(), &DataType::Date);
    }
}
