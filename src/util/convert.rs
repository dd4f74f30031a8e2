//! Case Conversion
//!
//! camelCase / PascalCase / ACRONYMCase to snake_case, for strings and for
//! the keys of decoded JSON payloads.

use serde_json::{Map, Value};

/// Convert an identifier to snake_case
///
/// Words are lowercase runs (optionally led by one capital), runs of two or
/// more capitals that end before a capitalized word, a digit, a non-word
/// character or the end, and runs of digits. Everything else separates
/// words. `"FOOBar"` becomes `"foo_bar"`, `"vanId2"` becomes `"van_id_2"`.
pub fn to_snake_case(input: &str) -> String {
    words(input)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert every object key in a JSON value to snake_case, recursively
///
/// Values are left alone; only keys change.
pub fn convert_keys_to_snake_case(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_snake_case(&k), convert_keys_to_snake_case(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(convert_keys_to_snake_case).collect()),
        other => other,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        // Capitalized or lowercase word
        if c.is_ascii_lowercase() || (c.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase())) {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            words.push(chars[start..i].iter().collect());
            continue;
        }

        // Acronym: longest run of capitals that ends at a word boundary
        if c.is_ascii_uppercase() {
            let run = chars[i..].iter().take_while(|c| c.is_ascii_uppercase()).count();
            let acronym = (2..=run).rev().find(|&len| {
                let after = chars.get(i + len).copied();
                match after {
                    None => true,
                    Some(a) if a.is_ascii_digit() || !is_word_char(a) => true,
                    Some(a) => {
                        a.is_ascii_uppercase()
                            && chars.get(i + len + 1).is_some_and(|n| n.is_ascii_lowercase())
                    }
                }
            });
            if let Some(len) = acronym {
                words.push(chars[i..i + len].iter().collect());
                i += len;
                continue;
            }
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            words.push(chars[start..i].iter().collect());
            continue;
        }

        i += 1;
    }

    words
}
