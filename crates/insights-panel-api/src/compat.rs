// SPDX-License-Identifier: Apache-2.0

/// Stable filter key, independent of the spreadsheet's column labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Brand,
    Platform,
    InsightType,
    Month,
}

/// Legacy spreadsheet column labels still accepted in filter objects.
pub const LEGACY_FILTER_LABELS: [(&str, CanonicalField); 4] = [
    ("Marca", CanonicalField::Brand),
    ("Plataforma", CanonicalField::Platform),
    ("Tipo de insight", CanonicalField::InsightType),
    ("Mês", CanonicalField::Month),
];

/// Resolves a filter-object key to its canonical field. The second
/// element is true for a legacy label; callers use it to let canonical
/// keys win when a request carries both spellings.
#[must_use]
pub fn canonical_filter_field(key: &str) -> Option<(CanonicalField, bool)> {
    match key {
        "brand" => Some((CanonicalField::Brand, false)),
        "platform" => Some((CanonicalField::Platform, false)),
        "insight_type" => Some((CanonicalField::InsightType, false)),
        "month" => Some((CanonicalField::Month, false)),
        other => LEGACY_FILTER_LABELS
            .iter()
            .find(|(label, _)| *label == other)
            .map(|(_, field)| (*field, true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keys_resolve_directly() {
        assert_eq!(
            canonical_filter_field("brand"),
            Some((CanonicalField::Brand, false))
        );
        assert_eq!(
            canonical_filter_field("insight_type"),
            Some((CanonicalField::InsightType, false))
        );
    }

    #[test]
    fn legacy_labels_resolve_with_the_legacy_flag() {
        assert_eq!(
            canonical_filter_field("Marca"),
            Some((CanonicalField::Brand, true))
        );
        assert_eq!(
            canonical_filter_field("Mês"),
            Some((CanonicalField::Month, true))
        );
    }

    #[test]
    fn unknown_keys_resolve_to_none() {
        assert_eq!(canonical_filter_field("Autor"), None);
        assert_eq!(canonical_filter_field("BRAND"), None);
    }
}
