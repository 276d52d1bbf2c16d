use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison key: trimmed, NFKD-decomposed, combining marks
/// stripped, Unicode lowercase. `fold_key("Março") == fold_key("MARCO")`.
#[must_use]
pub fn fold_key(input: &str) -> String {
    input
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
