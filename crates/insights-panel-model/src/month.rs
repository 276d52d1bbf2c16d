use crate::text::fold_key;

/// The twelve Portuguese month names, in calendar order.
pub const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// 1-based calendar ordinal for a Portuguese month name. Matching is
/// case- and accent-insensitive; unknown names yield `None`.
#[must_use]
pub fn month_ordinal(name: &str) -> Option<u32> {
    let key = fold_key(name);
    if key.is_empty() {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|m| fold_key(m) == key)
        .map(|i| i as u32 + 1)
}
