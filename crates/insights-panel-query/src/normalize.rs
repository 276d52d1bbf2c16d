use chrono::NaiveDate;
use insights_panel_model::{fold_key, month_ordinal, parse_report_date, InsightRow};
use std::collections::BTreeMap;

/// One insight after column back-fill and date parsing. The six required
/// fields are always present; absent cells are empty strings here and
/// serialize as nulls in output records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedInsight {
    pub author: Option<String>,
    pub brand: String,
    pub platform: String,
    pub insight: String,
    pub report_date_text: String,
    pub report_date: Option<NaiveDate>,
    pub month: String,
    pub month_ordinal: Option<u32>,
    pub insight_type: String,
    pub link: Option<String>,
    pub lifetime: Option<String>,
    pub extra: BTreeMap<String, String>,
    pub brand_key: String,
    pub platform_key: String,
}

/// The in-memory working set a request handler filters and shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    pub rows: Vec<NormalizedInsight>,
}

impl NormalizedTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[must_use]
pub fn normalize(rows: &[InsightRow]) -> NormalizedTable {
    let rows = rows.iter().map(normalize_row).collect();
    NormalizedTable { rows }
}

fn normalize_row(row: &InsightRow) -> NormalizedInsight {
    let brand = row.brand.clone().unwrap_or_default();
    let platform = row.platform.clone().unwrap_or_default();
    let report_date_text = row.report_date.clone().unwrap_or_default();
    let month = row.month.clone().unwrap_or_default();
    NormalizedInsight {
        author: row.author.clone(),
        brand_key: fold_key(&brand),
        platform_key: fold_key(&platform),
        report_date: parse_report_date(&report_date_text),
        month_ordinal: month_ordinal(&month),
        brand,
        platform,
        insight: row.insight.clone().unwrap_or_default(),
        report_date_text,
        month,
        insight_type: row.insight_type.clone().unwrap_or_default(),
        link: row.link.clone(),
        lifetime: row.lifetime.clone(),
        extra: row.extra.clone(),
    }
}
