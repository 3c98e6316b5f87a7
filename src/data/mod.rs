pub mod batcher;
pub mod batchitem;
pub mod builder;
pub mod config;
pub mod dataset;
pub mod lags;
pub mod normalizer;

pub use batcher::WindowBatcher;
pub use batchitem::BatchItem;
pub use builder::{
    create_cds_time_series_datasets, create_cds_time_series_datasets_with, CdsSchema, Datasets,
    Mode,
};
pub use config::{FeatureRoles, TimeSeriesDataSetConfig, WindowSpec};
pub use dataset::{DatasetParameters, FittedState, TimeSeriesDataSet, WindowInfo, WindowItem};
pub use lags::LagSpec;
pub use normalizer::{
    CategoricalEncoder, GroupNormalizer, NormParams, StandardScaler, TargetNormalizer,
    Transformation,
};
