use insights_panel_model::{InsightRow, SheetRow};
use insights_panel_query::{apply_filters, finalize, normalize, FilterCriteria, SortMode};

fn row(brand: &str, platform: &str, date: &str, month: &str) -> InsightRow {
    let mut cells = SheetRow::new();
    cells.insert("Marca".to_string(), brand.to_string());
    cells.insert("Plataforma".to_string(), platform.to_string());
    cells.insert("Data do report/status".to_string(), date.to_string());
    cells.insert("Mês".to_string(), month.to_string());
    InsightRow::from_sheet_row(&cells)
}

#[test]
fn normalization_is_deterministic() {
    let rows = vec![
        row("Corona", "Instagram", "15/03/2024", "Março"),
        row("Stella", "TikTok", "", "Janeiro"),
    ];
    assert_eq!(normalize(&rows), normalize(&rows));
}

#[test]
fn accepted_value_order_does_not_change_the_result() {
    let rows = vec![
        row("Corona", "Instagram", "15/03/2024", "Março"),
        row("Stella", "TikTok", "10/01/2024", "Janeiro"),
        row("Brahma", "Instagram", "20/02/2024", "Fevereiro"),
    ];
    let table = normalize(&rows);
    let forward = FilterCriteria {
        brand: vec!["Corona".to_string(), "Stella".to_string()],
        ..FilterCriteria::default()
    };
    let reversed = FilterCriteria {
        brand: vec!["Stella".to_string(), "Corona".to_string()],
        ..FilterCriteria::default()
    };
    assert_eq!(
        apply_filters(table.clone(), &forward),
        apply_filters(table, &reversed)
    );
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let rows = vec![
        row("A", "x", "bad date", "Janeiro"),
        row("B", "x", "", "Janeiro"),
        row("C", "x", "05/01/2024", "Janeiro"),
    ];
    let records = finalize(normalize(&rows), SortMode::ReportDate);
    // The parseable date leads; the two null-date rows keep input order.
    assert_eq!(records[0].brand.as_deref(), Some("C"));
    assert_eq!(records[1].brand.as_deref(), Some("A"));
    assert_eq!(records[2].brand.as_deref(), Some("B"));
}
