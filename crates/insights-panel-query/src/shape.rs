use crate::normalize::{NormalizedInsight, NormalizedTable};
use insights_panel_model::{fold_key, format_output_date, month_ordinal};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Sort order for finalized records. Null sort keys (unparseable dates,
/// unmapped months) always land at the end; within equal keys the input
/// order is preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    ReportDate,
    MonthOrdinal,
}

/// Wire form of one insight. All six required fields are present as
/// keys; absent or unparseable cells are explicit nulls, never "nan" or
/// empty strings. Unrecognized spreadsheet columns ride along flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub author: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub insight: Option<String>,
    pub report_date: Option<String>,
    pub month: Option<String>,
    pub insight_type: Option<String>,
    pub link: Option<String>,
    pub lifetime: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[must_use]
pub fn finalize(table: NormalizedTable, sort: SortMode) -> Vec<OutputRecord> {
    let mut rows = table.rows;
    sort_rows(&mut rows, sort);
    rows.into_iter().map(output_record).collect()
}

fn sort_rows(rows: &mut [NormalizedInsight], sort: SortMode) {
    match sort {
        SortMode::ReportDate => rows.sort_by_key(|r| (r.report_date.is_none(), r.report_date)),
        SortMode::MonthOrdinal => {
            rows.sort_by_key(|r| (r.month_ordinal.is_none(), r.month_ordinal));
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn output_record(row: NormalizedInsight) -> OutputRecord {
    let extra = row
        .extra
        .into_iter()
        .map(|(key, cell)| {
            let value = if cell.trim().is_empty() {
                Value::Null
            } else {
                Value::String(cell)
            };
            (key, value)
        })
        .collect();
    OutputRecord {
        author: row.author,
        brand: non_empty(row.brand),
        platform: non_empty(row.platform),
        insight: non_empty(row.insight),
        // Raw text that failed to parse serializes as null too.
        report_date: row.report_date.map(format_output_date),
        month: non_empty(row.month),
        insight_type: non_empty(row.insight_type),
        link: row.link,
        lifetime: row.lifetime,
        extra,
    }
}

/// One cell of the brand-universe × platform-universe cross join, with
/// the matching filtered insights sorted by month ordinal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandPlatformPair {
    pub brand: String,
    pub platform: String,
    pub count: usize,
    pub has_insights: bool,
    pub insights: Vec<OutputRecord>,
}

#[must_use]
pub fn brand_platform_pairs(
    table: &NormalizedTable,
    brands: &[String],
    platforms: &[String],
) -> Vec<BrandPlatformPair> {
    let mut pairs = Vec::with_capacity(brands.len() * platforms.len());
    for brand in brands {
        let brand_key = fold_key(brand);
        for platform in platforms {
            let platform_key = fold_key(platform);
            let subset: Vec<NormalizedInsight> = table
                .rows
                .iter()
                .filter(|r| r.brand_key == brand_key && r.platform_key == platform_key)
                .cloned()
                .collect();
            let count = subset.len();
            let insights = finalize(NormalizedTable { rows: subset }, SortMode::MonthOrdinal);
            pairs.push(BrandPlatformPair {
                brand: brand.clone(),
                platform: platform.clone(),
                count,
                has_insights: count > 0,
                insights,
            });
        }
    }
    pairs
}

/// Deduplicated value universes of a (typically already filtered) table.
/// Brands, platforms, and insight types sort lexicographically; months
/// sort by calendar ordinal with unmapped names last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionsUniverse {
    pub brands: Vec<String>,
    pub platforms: Vec<String>,
    pub insight_types: Vec<String>,
    pub months: Vec<String>,
}

#[must_use]
pub fn distinct_options(table: &NormalizedTable) -> OptionsUniverse {
    let mut brands = BTreeSet::new();
    let mut platforms = BTreeSet::new();
    let mut insight_types = BTreeSet::new();
    let mut months = BTreeSet::new();
    for row in &table.rows {
        if !row.brand.is_empty() {
            brands.insert(row.brand.clone());
        }
        if !row.platform.is_empty() {
            platforms.insert(row.platform.clone());
        }
        if !row.insight_type.is_empty() {
            insight_types.insert(row.insight_type.clone());
        }
        if !row.month.is_empty() {
            months.insert(row.month.clone());
        }
    }
    let mut months: Vec<String> = months.into_iter().collect();
    months.sort_by_key(|m| (month_ordinal(m).is_none(), month_ordinal(m), m.clone()));
    OptionsUniverse {
        brands: brands.into_iter().collect(),
        platforms: platforms.into_iter().collect(),
        insight_types: insight_types.into_iter().collect(),
        months,
    }
}
