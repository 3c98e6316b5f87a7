//! Data preparation for climate time series forecasting: column transforms
//! over polars tables, the CDS preprocessing recipe, and encoder/decoder
//! windowed datasets that batch into burn tensors.

pub mod config;
pub mod consistency;
pub mod data;
pub mod error;
pub mod frame;
pub mod pipeline;

pub use error::{Error, Result};
