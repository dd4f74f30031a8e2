/// Values treated as true, compared case-insensitively
pub const TRUE_VALUES: &[&str] = &["1", "T", "TRUE", "Y", "YES"];

/// Whether a loosely formatted flag is true
///
/// `None` and anything outside `TRUE_VALUES` are false. Surrounding
/// whitespace is not stripped.
pub fn truthy(value: Option<&str>) -> bool {
    truthy_with(value, TRUE_VALUES)
}

/// `truthy` against a custom set of (uppercase) true values
pub fn truthy_with(value: Option<&str>, true_values: &[&str]) -> bool {
    let Some(value) = value else {
        return false;
    };
    let upper = value.to_uppercase();
    true_values.iter().any(|t| *t == upper)
}
