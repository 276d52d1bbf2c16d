#![forbid(unsafe_code)]
//! Request-scoped pipeline over the workbook: normalize raw insight rows
//! into a working table, apply filter criteria, then shape the survivors
//! into output records. Every stage is a pure function; the table is
//! rebuilt per request and owned by the caller.

mod filters;
mod normalize;
mod shape;

pub use filters::{apply_filters, FilterCriteria, SEARCH_FIELDS};
pub use normalize::{normalize, NormalizedInsight, NormalizedTable};
pub use shape::{
    brand_platform_pairs, distinct_options, finalize, BrandPlatformPair, OptionsUniverse,
    OutputRecord, SortMode,
};

pub const CRATE_NAME: &str = "insights-panel-query";

#[cfg(test)]
mod query_tests;
