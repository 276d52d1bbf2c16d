use super::*;
use insights_panel_model::{InsightRow, COL_BRAND, COL_INSIGHT, COL_MONTH, COL_PLATFORM, COL_REPORT_DATE, COL_TYPE};

fn insight(cells: &[(&str, &str)]) -> InsightRow {
    let row = cells
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    InsightRow::from_sheet_row(&row)
}

fn fixture_rows() -> Vec<InsightRow> {
    vec![
        insight(&[
            (COL_BRAND, "Corona"),
            (COL_PLATFORM, "Instagram"),
            (COL_INSIGHT, "Engajamento alto em reels"),
            (COL_REPORT_DATE, "15/03/2024"),
            (COL_MONTH, "Março"),
            (COL_TYPE, "Comportamento"),
        ]),
        insight(&[
            (COL_BRAND, "Stella"),
            (COL_PLATFORM, "TikTok"),
            (COL_INSIGHT, "Budweiser citada em comentários"),
            (COL_REPORT_DATE, "10/01/2024"),
            (COL_MONTH, "Janeiro"),
            (COL_TYPE, "Concorrência"),
        ]),
        insight(&[
            (COL_BRAND, "Corona"),
            (COL_PLATFORM, "TikTok"),
            (COL_INSIGHT, "Sem data de report"),
            (COL_MONTH, "mês desconhecido"),
            (COL_TYPE, "Comportamento"),
        ]),
    ]
}

#[test]
fn normalize_backfills_required_fields() {
    let table = normalize(&[insight(&[(COL_BRAND, "Corona")])]);
    let row = &table.rows[0];
    assert_eq!(row.brand, "Corona");
    assert_eq!(row.platform, "");
    assert_eq!(row.insight, "");
    assert_eq!(row.report_date_text, "");
    assert_eq!(row.month, "");
    assert_eq!(row.insight_type, "");
    assert_eq!(row.report_date, None);
    assert_eq!(row.month_ordinal, None);
}

#[test]
fn normalize_precomputes_dates_ordinals_and_fold_keys() {
    let table = normalize(&fixture_rows());
    let first = &table.rows[0];
    assert!(first.report_date.is_some());
    assert_eq!(first.month_ordinal, Some(3));
    assert_eq!(first.brand_key, "corona");
    assert_eq!(table.rows[2].report_date, None);
    assert_eq!(table.rows[2].month_ordinal, None);
}

#[test]
fn brand_filter_retains_only_members() {
    let criteria = FilterCriteria {
        brand: vec!["Corona".to_string()],
        ..FilterCriteria::default()
    };
    let filtered = apply_filters(normalize(&fixture_rows()), &criteria);
    assert_eq!(filtered.len(), 2);
    assert!(filtered.rows.iter().all(|r| r.brand == "Corona"));
}

#[test]
fn brand_filter_matches_accent_and_case_variants() {
    let rows = vec![insight(&[(COL_BRAND, "Brahma Açaí")])];
    let criteria = FilterCriteria {
        brand: vec!["brahma acai".to_string()],
        ..FilterCriteria::default()
    };
    let filtered = apply_filters(normalize(&rows), &criteria);
    assert_eq!(filtered.len(), 1);
}

#[test]
fn equality_filters_intersect_regardless_of_order() {
    let table = normalize(&fixture_rows());
    let both = FilterCriteria {
        brand: vec!["Corona".to_string()],
        platform: vec!["TikTok".to_string()],
        ..FilterCriteria::default()
    };
    let brand_only = FilterCriteria {
        brand: vec!["Corona".to_string()],
        ..FilterCriteria::default()
    };
    let platform_only = FilterCriteria {
        platform: vec!["TikTok".to_string()],
        ..FilterCriteria::default()
    };
    let combined = apply_filters(table.clone(), &both);
    let sequential = apply_filters(apply_filters(table.clone(), &platform_only), &brand_only);
    assert_eq!(combined, sequential);
    assert_eq!(combined.len(), 1);
    assert_eq!(combined.rows[0].insight, "Sem data de report");
}

#[test]
fn search_is_case_and_accent_insensitive() {
    let table = normalize(&fixture_rows());
    let criteria = FilterCriteria {
        search: Some("BUDWEISER".to_string()),
        ..FilterCriteria::default()
    };
    let hit = apply_filters(table.clone(), &criteria);
    assert_eq!(hit.len(), 1);
    assert_eq!(hit.rows[0].brand, "Stella");

    let accented = FilterCriteria {
        search: Some("comentarios".to_string()),
        ..FilterCriteria::default()
    };
    assert_eq!(apply_filters(table, &accented).len(), 1);
}

#[test]
fn search_covers_raw_report_date_text() {
    let criteria = FilterCriteria {
        search: Some("15/03".to_string()),
        ..FilterCriteria::default()
    };
    let filtered = apply_filters(normalize(&fixture_rows()), &criteria);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.rows[0].brand, "Corona");
}

#[test]
fn date_range_is_inclusive_and_drops_null_dates() {
    let table = normalize(&fixture_rows());
    let criteria = FilterCriteria {
        start_date: Some(chrono::NaiveDate::from_ymd_opt(2024, 1, 10).expect("date")),
        end_date: Some(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")),
        ..FilterCriteria::default()
    };
    let filtered = apply_filters(table.clone(), &criteria);
    assert_eq!(filtered.len(), 2);

    // Without a bound the null-date row is kept.
    assert_eq!(apply_filters(table, &FilterCriteria::default()).len(), 3);
}

#[test]
fn report_date_sort_ascending_with_nulls_last() {
    let records = finalize(normalize(&fixture_rows()), SortMode::ReportDate);
    assert_eq!(records[0].brand.as_deref(), Some("Stella"));
    assert_eq!(records[1].report_date.as_deref(), Some("2024-03-15T00:00:00Z"));
    assert_eq!(records[2].report_date, None);
}

#[test]
fn month_sort_orders_by_ordinal_with_unmapped_last() {
    let records = finalize(normalize(&fixture_rows()), SortMode::MonthOrdinal);
    assert_eq!(records[0].month.as_deref(), Some("Janeiro"));
    assert_eq!(records[1].month.as_deref(), Some("Março"));
    assert_eq!(records[2].month.as_deref(), Some("mês desconhecido"));
}

#[test]
fn output_records_null_out_empty_cells() {
    let records = finalize(normalize(&[insight(&[(COL_BRAND, "Corona")])]), SortMode::ReportDate);
    let record = &records[0];
    assert_eq!(record.brand.as_deref(), Some("Corona"));
    assert_eq!(record.platform, None);
    assert_eq!(record.insight, None);
    assert_eq!(record.report_date, None);
    let encoded = serde_json::to_value(record).expect("encode record");
    assert!(encoded.get("platform").expect("platform key").is_null());
    assert!(encoded.get("month").expect("month key").is_null());
}

#[test]
fn unparseable_report_date_serializes_as_null() {
    let rows = vec![insight(&[(COL_BRAND, "Corona"), (COL_REPORT_DATE, "32/13/2024")])];
    let records = finalize(normalize(&rows), SortMode::ReportDate);
    assert_eq!(records[0].report_date, None);
}

#[test]
fn pairs_cross_join_attaches_matching_subsets() {
    let table = normalize(&fixture_rows());
    let brands = vec!["Corona".to_string(), "Stella".to_string()];
    let platforms = vec!["Instagram".to_string(), "TikTok".to_string()];
    let pairs = brand_platform_pairs(&table, &brands, &platforms);
    assert_eq!(pairs.len(), 4);

    let corona_tiktok = pairs
        .iter()
        .find(|p| p.brand == "Corona" && p.platform == "TikTok")
        .expect("corona/tiktok pair");
    assert_eq!(corona_tiktok.count, 1);
    assert!(corona_tiktok.has_insights);

    let stella_instagram = pairs
        .iter()
        .find(|p| p.brand == "Stella" && p.platform == "Instagram")
        .expect("stella/instagram pair");
    assert_eq!(stella_instagram.count, 0);
    assert!(!stella_instagram.has_insights);
    assert!(stella_instagram.insights.is_empty());
}

#[test]
fn distinct_options_orders_months_by_ordinal() {
    let options = distinct_options(&normalize(&fixture_rows()));
    assert_eq!(options.brands, vec!["Corona".to_string(), "Stella".to_string()]);
    assert_eq!(
        options.months,
        vec![
            "Janeiro".to_string(),
            "Março".to_string(),
            "mês desconhecido".to_string()
        ]
    );
    assert_eq!(
        options.insight_types,
        vec!["Comportamento".to_string(), "Concorrência".to_string()]
    );
}
