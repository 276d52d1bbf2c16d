#![forbid(unsafe_code)]
//! HTTP surface contracts: filter/query parameter parsing (including the
//! legacy spreadsheet column labels), typed API errors, and response
//! DTOs. No I/O lives here.

pub mod compat;
pub mod errors;
pub mod params;
pub mod responses;

pub use compat::{canonical_filter_field, CanonicalField};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    params_from_body, parse_data_query, DataRequestBody, DataRequestParams, BOUND_DATE_FORMAT,
};
pub use responses::{DataResponseDto, MetadataResponseDto};

pub const CRATE_NAME: &str = "insights-panel-api";
