#![forbid(unsafe_code)]
//! Insights panel model SSOT.
//!
//! Typed spreadsheet records, report-date parsing, Portuguese month
//! ordinals, and the accent-insensitive comparison key the filter and
//! search layers build on.

mod dates;
mod month;
mod record;
mod text;

pub use dates::{
    format_output_date, parse_report_date, OUTPUT_DATE_FORMAT, REPORT_DATE_INPUT_FORMAT,
};
pub use month::{month_ordinal, MONTH_NAMES};
pub use record::{
    BrandRow, InsightRow, PlatformRow, SheetRow, COL_AUTHOR, COL_BRAND, COL_INSIGHT, COL_LIFETIME,
    COL_LINK, COL_MONTH, COL_PLATFORM, COL_REPORT_DATE, COL_TYPE, REQUIRED_COLUMNS,
};
pub use text::fold_key;

pub const CRATE_NAME: &str = "insights-panel-model";
