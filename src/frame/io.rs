use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::Result;

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let df = CsvReader::new(&mut file).has_header(true).finish()?;
    info!(
        "Read {} rows and {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Writes `df` as CSV with a header row and no index column, creating parent
/// directories as needed.
pub fn save_to_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving DataFrame...");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    info!("Saved DataFrame to {}", path.display());
    Ok(())
}
