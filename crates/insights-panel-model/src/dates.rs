use chrono::NaiveDate;

/// Input format the spreadsheet uses for report dates.
pub const REPORT_DATE_INPUT_FORMAT: &str = "%d/%m/%Y";

/// Canonical output format for every date-bearing field: ISO-8601 with a
/// fixed UTC midnight suffix.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

/// Strict `%d/%m/%Y` parse. Empty and unparseable text yield `None`.
#[must_use]
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, REPORT_DATE_INPUT_FORMAT).ok()
}

#[must_use]
pub fn format_output_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn report_date_round_trip() {
        let date = parse_report_date("15/03/2024").expect("parse");
        assert_eq!((date.day(), date.month(), date.year()), (15, 3, 2024));
        assert_eq!(format_output_date(date), "2024-03-15T00:00:00Z");
    }

    #[test]
    fn zero_padding_is_preserved_on_output() {
        let date = parse_report_date("01/02/2024").expect("parse");
        assert_eq!(format_output_date(date), "2024-02-01T00:00:00Z");
    }

    #[test]
    fn unparseable_and_empty_dates_are_none() {
        assert_eq!(parse_report_date(""), None);
        assert_eq!(parse_report_date("   "), None);
        assert_eq!(parse_report_date("2024-03-15"), None);
        assert_eq!(parse_report_date("31/02/2024"), None);
        assert_eq!(parse_report_date("not a date"), None);
    }
}
