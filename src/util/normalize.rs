//! Input normalization for contact fields
//!
//! Each function takes raw, possibly missing user input and returns a clean
//! value, or `None` when nothing usable is left.

use regex::Regex;
use std::sync::LazyLock;

static HTML: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]+|&#").expect("valid regex"));

static HTML_OR_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]+|&#|[0-9]").expect("valid regex"));

static NON_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("valid regex")
});

/// Five digit ZIP code
///
/// ZIP+4 is cut to the first five digits; three or four digit input (leading
/// zeros lost in a spreadsheet) is padded back to five.
pub fn normalize_zip(value: Option<&str>) -> Option<String> {
    let value = value?;
    let zip5 = value.split('-').next().unwrap_or_default();
    let digits = NON_DIGIT.replace_all(zip5, "");

    match digits.len() {
        3 | 4 => Some(format!("{:0>5}", digits)),
        n if n >= 5 => Some(digits[..5].to_string()),
        _ => None,
    }
}

/// Validated email address with a lowercased domain
///
/// Anything carrying HTML fragments or a `/` is rejected outright rather
/// than cleaned.
pub fn normalize_email(value: Option<&str>) -> Option<String> {
    let value = value?.trim();

    if HTML.is_match(value) || value.contains('/') || !EMAIL.is_match(value) {
        return None;
    }

    let (local, domain) = value.rsplit_once('@')?;
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return None;
    }

    Some(format!("{}@{}", local, domain.to_lowercase()))
}

/// Ten digit North American phone number
///
/// A leading country code of 1 is dropped.
pub fn normalize_phone(value: Option<&str>) -> Option<String> {
    let digits = NON_DIGIT.replace_all(value?, "");
    let digits = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        _ => &digits[..],
    };

    (digits.len() == 10).then(|| digits.to_string())
}

/// Strip digits and HTML fragments from a name or place, then title case it
pub fn normalize_name_or_place(value: Option<&str>) -> String {
    let cleaned = HTML_OR_DIGIT.replace_all(value.unwrap_or_default(), "");
    title_case(&cleaned)
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zip() {
        assert_eq!(normalize_zip(Some("12345")).as_deref(), Some("12345"));
        assert_eq!(normalize_zip(Some("1234")).as_deref(), Some("01234"));
        assert_eq!(normalize_zip(Some("501")).as_deref(), Some("00501"));
        assert_eq!(normalize_zip(Some("12345-6789")).as_deref(), Some("12345"));
        assert_eq!(normalize_zip(Some("123456789")).as_deref(), Some("12345"));
        assert_eq!(normalize_zip(Some(" 02134 ")).as_deref(), Some("02134"));
        assert_eq!(normalize_zip(Some("12")), None);
        assert_eq!(normalize_zip(Some("abcde")), None);
        assert_eq!(normalize_zip(Some("")), None);
        assert_eq!(normalize_zip(None), None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email(Some(" test@Example.COM ")).as_deref(),
            Some("test@example.com")
        );
        assert_eq!(
            normalize_email(Some("first.last+tag@sub.example.org")).as_deref(),
            Some("first.last+tag@sub.example.org")
        );
        assert_eq!(normalize_email(Some("<script>@example.com")), None);
        assert_eq!(normalize_email(Some("a&#64;b@example.com")), None);
        assert_eq!(normalize_email(Some("some/one@example.com")), None);
        assert_eq!(normalize_email(Some("no-at-sign.example.com")), None);
        assert_eq!(normalize_email(Some("missing@tld")), None);
        assert_eq!(normalize_email(Some("two..dots@example.com")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(Some("(817) 555-1234")).as_deref(), Some("8175551234"));
        assert_eq!(normalize_phone(Some("+1 817.555.1234")).as_deref(), Some("8175551234"));
        assert_eq!(normalize_phone(Some("28175551234")), None);
        assert_eq!(normalize_phone(Some("555-1234")), None);
        assert_eq!(normalize_phone(None), None);
    }

    #[test]
    fn test_normalize_name_or_place() {
        assert_eq!(normalize_name_or_place(Some("fort worth")), "Fort Worth");
        assert_eq!(normalize_name_or_place(Some("JOHN3")), "John");
        assert_eq!(normalize_name_or_place(Some("<b>mary-jane</b>")), "Bmary-Jane/B");
        assert_eq!(normalize_name_or_place(Some("o'neil &#39;")), "O'Neil ;");
        assert_eq!(normalize_name_or_place(None), "");
    }
}
