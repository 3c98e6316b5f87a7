use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::datetime::timestamps;
use super::holidays::HolidayRegistry;
use super::require_column;
use crate::error::{Error, Result};

/// Calendar quantity extracted from a timestamp.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalendarUnit {
    /// 0..=23
    Hour,
    /// 1..=31
    Day,
    /// Monday = 0 .. Sunday = 6
    DayOfWeek,
    /// 1..=366
    DayOfYear,
    /// ISO week, 1..=53
    Week,
    /// 1..=12
    Month,
    /// 1..=4
    Quarter,
    Year,
}

impl CalendarUnit {
    pub fn name(&self) -> &'static str {
        match self {
            CalendarUnit::Hour => "hour",
            CalendarUnit::Day => "day",
            CalendarUnit::DayOfWeek => "day_of_week",
            CalendarUnit::DayOfYear => "day_of_year",
            CalendarUnit::Week => "week",
            CalendarUnit::Month => "month",
            CalendarUnit::Quarter => "quarter",
            CalendarUnit::Year => "year",
        }
    }

    pub fn value(&self, ts: &NaiveDateTime) -> f64 {
        match self {
            CalendarUnit::Hour => ts.hour() as f64,
            CalendarUnit::Day => ts.day() as f64,
            CalendarUnit::DayOfWeek => ts.weekday().num_days_from_monday() as f64,
            CalendarUnit::DayOfYear => ts.ordinal() as f64,
            CalendarUnit::Week => ts.iso_week().week() as f64,
            CalendarUnit::Month => ts.month() as f64,
            CalendarUnit::Quarter => ((ts.month() - 1) / 3 + 1) as f64,
            CalendarUnit::Year => ts.year() as f64,
        }
    }
}

/// Cycles added by [`add_cyclic_features`]: feature name, unit and cycle
/// length. The yearly cycle follows the day of the year.
pub const CDS_CYCLES: [(&str, CalendarUnit, f64); 4] = [
    ("hour", CalendarUnit::Hour, 24.0),
    ("day_of_week", CalendarUnit::DayOfWeek, 7.0),
    ("month", CalendarUnit::Month, 12.0),
    ("year", CalendarUnit::DayOfYear, 365.25),
];

/// Column names produced by [`add_cyclic_features`], in insertion order.
pub fn cyclic_feature_names() -> Vec<String> {
    CDS_CYCLES
        .iter()
        .flat_map(|(name, _, _)| [format!("sin_{name}"), format!("cos_{name}")])
        .collect()
}

/// Adds `sin_<name>` / `cos_<name>` for every entry of [`CDS_CYCLES`].
pub fn add_cyclic_features(mut df: DataFrame, time_column: &str) -> Result<DataFrame> {
    let stamps = timestamps(&df, time_column)?;
    for (name, unit, cycle) in CDS_CYCLES {
        let (sin, cos) = encode_cycle(&stamps, unit, cycle);
        df.with_column(Series::new(&format!("sin_{name}"), sin))?;
        df.with_column(Series::new(&format!("cos_{name}"), cos))?;
    }
    info!("Added cyclic features: {:?}", cyclic_feature_names());
    Ok(df)
}

/// Adds `<unit>_sin` / `<unit>_cos` for every `(unit, cycle)` pair.
pub fn add_cyclical_calendar_features(
    mut df: DataFrame,
    cycles: &[(CalendarUnit, f64)],
    time_column: &str,
) -> Result<DataFrame> {
    let names: Vec<&str> = cycles.iter().map(|(unit, _)| unit.name()).collect();
    info!("Adding cyclical calendar features: {names:?}");

    let stamps = timestamps(&df, time_column)?;
    for &(unit, cycle) in cycles {
        if cycle <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "cycle length for '{}' must be positive, got {cycle}",
                unit.name()
            )));
        }
        let (sin, cos) = encode_cycle(&stamps, unit, cycle);
        df.with_column(Series::new(&format!("{}_sin", unit.name()), sin))?;
        df.with_column(Series::new(&format!("{}_cos", unit.name()), cos))?;
    }
    Ok(df)
}

fn encode_cycle(
    stamps: &[Option<NaiveDateTime>],
    unit: CalendarUnit,
    cycle: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    stamps
        .iter()
        .map(|ts| {
            ts.map(|ts| 2.0 * PI * unit.value(&ts) / cycle)
                .map(|angle| (angle.sin(), angle.cos()))
                .unzip()
        })
        .unzip()
}

/// Adds `weekend`: 1 on Saturday and Sunday (and Friday with
/// `count_friday`), 0 otherwise.
pub fn add_weekend_feature(
    mut df: DataFrame,
    time_column: &str,
    count_friday: bool,
) -> Result<DataFrame> {
    let threshold = if count_friday { 3 } else { 4 };
    let weekend: Vec<Option<i32>> = timestamps(&df, time_column)?
        .iter()
        .map(|ts| ts.map(|ts| (ts.weekday().num_days_from_monday() > threshold) as i32))
        .collect();

    df.with_column(Series::new("weekend", weekend))?;
    Ok(df)
}

/// Adds `holidays`: 1 when the row's date is a public holiday in the row's
/// country. Each distinct country is looked up once for the years it spans.
pub fn add_holidays_feature(
    mut df: DataFrame,
    time_column: &str,
    country_column: &str,
    registry: &HolidayRegistry,
) -> Result<DataFrame> {
    let stamps = timestamps(&df, time_column)?;
    let countries = require_column(&df, country_column)?.cast(&DataType::Utf8)?;
    let countries: Vec<Option<&str>> = countries.utf8()?.into_iter().collect();

    let mut years: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();
    for (country, ts) in countries.iter().zip(stamps.iter()) {
        if let (Some(country), Some(ts)) = (country, ts) {
            years.entry(*country).or_default().insert(ts.year());
        }
    }

    let mut calendars = BTreeMap::new();
    for (country, years) in years {
        calendars.insert(country, registry.holidays(country, years)?);
    }

    let flags: Vec<Option<i32>> = countries
        .iter()
        .zip(stamps.iter())
        .map(|(country, ts)| match (country, ts) {
            (Some(country), Some(ts)) => Some(
                calendars
                    .get(country)
                    .map_or(false, |days| days.contains(&ts.date())) as i32,
            ),
            _ => None,
        })
        .collect();

    df.with_column(Series::new("holidays", flags))?;
    info!("Added holidays for {} countries.", calendars.len());
    Ok(df)
}

/// Adds `newyear`: 1 between December 25 and December 31, 0 otherwise.
pub fn add_end_of_year_holidays(mut df: DataFrame, time_column: &str) -> Result<DataFrame> {
    let flags: Vec<Option<i32>> = timestamps(&df, time_column)?
        .iter()
        .map(|ts| ts.map(|ts| (ts.month() == 12 && ts.day() >= 25) as i32))
        .collect();

    df.with_column(Series::new("newyear", flags))?;
    Ok(df)
}
