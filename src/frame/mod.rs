//! Column transforms over [`DataFrame`]s.
//!
//! Every transform consumes the table it is given and returns a new owned
//! table, so a caller never observes a half-applied transform on a frame it
//! still holds.

pub mod calendar;
pub mod clean;
pub mod convert;
pub mod datetime;
pub mod holidays;
pub mod io;
pub mod merge;

use polars::prelude::*;

use crate::error::{Error, Result};

pub use calendar::{
    add_cyclic_features, add_cyclical_calendar_features, add_end_of_year_holidays,
    add_holidays_feature, add_weekend_feature, CalendarUnit, CDS_CYCLES,
};
pub use clean::{
    check_and_handle_missing_values, drop_columns, drop_duplicates_and_reset_index,
    factorize_column,
};
pub use convert::{
    convert_columns_to_float, convert_columns_to_string, convert_to_dataframe, DataSource,
    GriddedDataset,
};
pub use datetime::{convert_to_datetime, split_year_date_hour};
pub use holidays::{HolidayCalendar, HolidayRegistry, NationalCalendar};
pub use io::{read_csv, save_to_csv};
pub use merge::{merge_dataframes, JoinKind};

pub(crate) fn require_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map_err(|_| Error::MissingColumn(column.to_string()))
}

pub(crate) fn require_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<()> {
    for column in columns {
        require_column(df, column.as_ref())?;
    }
    Ok(())
}
