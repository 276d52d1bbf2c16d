use std::collections::BTreeMap;

/// One spreadsheet row, keyed by header cell text. What every store
/// backend yields before typing.
pub type SheetRow = BTreeMap<String, String>;

pub const COL_AUTHOR: &str = "Autor";
pub const COL_BRAND: &str = "Marca";
pub const COL_PLATFORM: &str = "Plataforma";
pub const COL_INSIGHT: &str = "Insight";
pub const COL_REPORT_DATE: &str = "Data do report/status";
pub const COL_MONTH: &str = "Mês";
pub const COL_TYPE: &str = "Tipo de insight";
pub const COL_LINK: &str = "Link";
pub const COL_LIFETIME: &str = "LTV";

/// Columns every normalized insight must carry even when the sheet
/// omits them entirely.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_BRAND,
    COL_PLATFORM,
    COL_INSIGHT,
    COL_REPORT_DATE,
    COL_MONTH,
    COL_TYPE,
];

/// Typed insight row. Recognized columns land in explicit optional
/// fields; anything else is kept as-is in `extra`. Empty cells are
/// `None`, never `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightRow {
    pub author: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub insight: Option<String>,
    pub report_date: Option<String>,
    pub month: Option<String>,
    pub insight_type: Option<String>,
    pub link: Option<String>,
    pub lifetime: Option<String>,
    pub extra: BTreeMap<String, String>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl InsightRow {
    #[must_use]
    pub fn from_sheet_row(row: &SheetRow) -> Self {
        let mut out = Self::default();
        for (header, cell) in row {
            let value = non_empty(cell);
            match header.trim() {
                COL_AUTHOR => out.author = value,
                COL_BRAND => out.brand = value,
                COL_PLATFORM => out.platform = value,
                COL_INSIGHT => out.insight = value,
                COL_REPORT_DATE => out.report_date = value,
                COL_MONTH => out.month = value,
                COL_TYPE => out.insight_type = value,
                COL_LINK => out.link = value,
                COL_LIFETIME => out.lifetime = value,
                other => {
                    if let Some(v) = value {
                        out.extra.insert(other.to_string(), v);
                    }
                }
            }
        }
        out
    }
}

/// Lookup row from the brands worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRow {
    pub brand: String,
}

impl BrandRow {
    /// `None` when the brand cell is absent or blank.
    #[must_use]
    pub fn from_sheet_row(row: &SheetRow) -> Option<Self> {
        row.get(COL_BRAND)
            .and_then(|v| non_empty(v))
            .map(|brand| Self { brand })
    }
}

/// Lookup row from the platforms worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRow {
    pub platform: String,
}

impl PlatformRow {
    #[must_use]
    pub fn from_sheet_row(row: &SheetRow) -> Option<Self> {
        row.get(COL_PLATFORM)
            .and_then(|v| non_empty(v))
            .map(|platform| Self { platform })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_row(cells: &[(&str, &str)]) -> SheetRow {
        cells
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn recognized_columns_become_typed_fields() {
        let row = sheet_row(&[
            (COL_BRAND, "Corona"),
            (COL_PLATFORM, "Instagram"),
            (COL_INSIGHT, "Engajamento alto"),
            (COL_REPORT_DATE, "15/03/2024"),
            (COL_MONTH, "Março"),
            (COL_TYPE, "Comportamento"),
            (COL_AUTHOR, "Ana"),
        ]);
        let insight = InsightRow::from_sheet_row(&row);
        assert_eq!(insight.brand.as_deref(), Some("Corona"));
        assert_eq!(insight.report_date.as_deref(), Some("15/03/2024"));
        assert_eq!(insight.author.as_deref(), Some("Ana"));
        assert!(insight.extra.is_empty());
    }

    #[test]
    fn blank_cells_are_none_and_unknown_columns_go_to_extra() {
        let row = sheet_row(&[(COL_BRAND, "   "), ("Observação", "rever"), ("Nota", "")]);
        let insight = InsightRow::from_sheet_row(&row);
        assert_eq!(insight.brand, None);
        assert_eq!(insight.extra.get("Observação").map(String::as_str), Some("rever"));
        assert!(!insight.extra.contains_key("Nota"));
    }

    #[test]
    fn header_whitespace_is_tolerated() {
        let row = sheet_row(&[(" Marca ", "Stella")]);
        let insight = InsightRow::from_sheet_row(&row);
        assert_eq!(insight.brand.as_deref(), Some("Stella"));
    }

    #[test]
    fn lookup_rows_require_a_value() {
        assert!(BrandRow::from_sheet_row(&sheet_row(&[(COL_BRAND, "")])).is_none());
        assert_eq!(
            BrandRow::from_sheet_row(&sheet_row(&[(COL_BRAND, "Corona")])),
            Some(BrandRow {
                brand: "Corona".to_string()
            })
        );
        assert!(PlatformRow::from_sheet_row(&sheet_row(&[(COL_BRAND, "Corona")])).is_none());
    }
}
