use crate::normalize::{NormalizedInsight, NormalizedTable};
use chrono::NaiveDate;
use insights_panel_model::fold_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered list of fields the free-text search walks. `report_date`
/// means the raw spreadsheet text, not the parsed date.
pub const SEARCH_FIELDS: [&str; 6] = [
    "brand",
    "platform",
    "insight",
    "insight_type",
    "month",
    "report_date",
];

/// Accepted-value sets per canonical field (empty = unconstrained), an
/// optional free-text term, and an optional inclusive date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub brand: Vec<String>,
    pub platform: Vec<String>,
    pub insight_type: Vec<String>,
    pub month: Vec<String>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FilterCriteria {
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.brand.is_empty()
            && self.platform.is_empty()
            && self.insight_type.is_empty()
            && self.month.is_empty()
            && self.search.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    fn has_date_bound(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Applies the criteria in a fixed order: equality sets, then search,
/// then date range. The predicates are independent, so the order only
/// pins down reproducibility.
///
/// Brand and platform membership compares fold keys, so accent and case
/// variants of the same name match. Insight type and month compare the
/// stored value exactly.
#[must_use]
pub fn apply_filters(table: NormalizedTable, criteria: &FilterCriteria) -> NormalizedTable {
    let mut rows = table.rows;

    if !criteria.brand.is_empty() {
        let keys: BTreeSet<String> = criteria.brand.iter().map(|v| fold_key(v)).collect();
        rows.retain(|r| keys.contains(&r.brand_key));
    }
    if !criteria.platform.is_empty() {
        let keys: BTreeSet<String> = criteria.platform.iter().map(|v| fold_key(v)).collect();
        rows.retain(|r| keys.contains(&r.platform_key));
    }
    if !criteria.insight_type.is_empty() {
        let keys: BTreeSet<&str> = criteria.insight_type.iter().map(String::as_str).collect();
        rows.retain(|r| keys.contains(r.insight_type.as_str()));
    }
    if !criteria.month.is_empty() {
        let keys: BTreeSet<&str> = criteria.month.iter().map(String::as_str).collect();
        rows.retain(|r| keys.contains(r.month.as_str()));
    }

    if let Some(term) = criteria.search.as_deref() {
        let needle = fold_key(term);
        if !needle.is_empty() {
            rows.retain(|r| row_matches_search(r, &needle));
        }
    }

    if criteria.has_date_bound() {
        rows.retain(|r| match r.report_date {
            Some(date) => {
                criteria.start_date.is_none_or(|start| date >= start)
                    && criteria.end_date.is_none_or(|end| date <= end)
            }
            // Unparseable dates are excluded once date filtering is active.
            None => false,
        });
    }

    NormalizedTable { rows }
}

fn row_matches_search(row: &NormalizedInsight, needle: &str) -> bool {
    SEARCH_FIELDS.iter().any(|field| {
        let haystack = match *field {
            "brand" => &row.brand,
            "platform" => &row.platform,
            "insight" => &row.insight,
            "insight_type" => &row.insight_type,
            "month" => &row.month,
            "report_date" => &row.report_date_text,
            _ => return false,
        };
        fold_key(haystack).contains(needle)
    })
}
