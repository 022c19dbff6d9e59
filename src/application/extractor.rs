// Embedded-data extractor - pulls the `"values"` literal out of inline scripts
//
// Two stages that are tested separately:
//   1. isolate_values: find the marker and cut out the balanced `[[...]]` literal
//   2. parse_values: strict JSON, then a lenient pass for generator quirks
use crate::application::page_driver::PageDriver;
use crate::domain::selector::Selector;
use crate::error::ScrapeError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const VALUES_MARKER: &str = "\"values\"";

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma pattern"));

/// Returns the array-of-arrays literal that follows a `"values":` key.
pub fn isolate_values(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find(VALUES_MARKER) {
        let after_marker = search_from + found + VALUES_MARKER.len();
        if let Some(literal) = literal_after_key(text, after_marker) {
            return Some(literal);
        }
        search_from = after_marker;
    }
    None
}

fn literal_after_key(text: &str, pos: usize) -> Option<&str> {
    let rest = &text[pos..];
    let rest = rest.trim_start().strip_prefix(':')?;
    let start_offset = text.len() - rest.trim_start().len();

    // must open an array whose first element is itself an array
    let body = text[start_offset..].strip_prefix('[')?;
    if !body.trim_start().starts_with('[') {
        return None;
    }

    let end = matching_bracket(&text[start_offset..])?;
    Some(&text[start_offset..start_offset + end + 1])
}

/// Byte offset of the `]` closing the `[` at offset 0. Brackets inside
/// quoted strings are ignored.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse first; on failure normalize quotes and trailing commas and retry.
/// Returns `None` when both passes fail. Nothing is guessed beyond that.
pub fn parse_values(literal: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(literal) {
        Ok(value) => Some(value),
        Err(strict_err) => {
            tracing::debug!("Strict parse failed ({}), trying lenient pass", strict_err);
            let cleaned = lenient_normalize(literal);
            match serde_json::from_str::<Value>(&cleaned) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Lenient parse failed: {}", e);
                    None
                }
            }
        }
    }
}

pub fn lenient_normalize(literal: &str) -> String {
    let quoted = literal.replace('\'', "\"");
    TRAILING_COMMA.replace_all(&quoted, "$1").into_owned()
}

/// First script text that yields a parsable payload wins
pub fn extract_from_texts<'a, I>(texts: I) -> Option<Value>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .filter(|text| text.contains(VALUES_MARKER))
        .find_map(|text| isolate_values(text).and_then(parse_values))
}

/// Scan every inline `<script>` on the page. `Ok(None)` signals absence.
pub async fn extract_embedded_values(
    driver: &dyn PageDriver,
) -> Result<Option<Value>, ScrapeError> {
    let scripts = driver.find_all(&Selector::tag_name("script")).await?;
    tracing::debug!("Scanning {} script tags for {}", scripts.len(), VALUES_MARKER);

    for (idx, script) in scripts.into_iter().enumerate() {
        let text = driver.inner_html(script).await?;
        if !text.contains(VALUES_MARKER) {
            continue;
        }
        if let Some(value) = extract_from_texts([text.as_str()]) {
            tracing::info!(script = idx, "Embedded values payload extracted");
            return Ok(Some(value));
        }
        tracing::warn!(script = idx, "Script mentions {} but could not be parsed", VALUES_MARKER);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_isolate_values() {
        let text = r#"var fig = {"data": [{"type": "table", "cells": {"values": [["A","B"],["2024-01-01","2024-01-02"],[10.5,20.1]]}}]};"#;
        assert_eq!(
            isolate_values(text),
            Some(r#"[["A","B"],["2024-01-01","2024-01-02"],[10.5,20.1]]"#)
        );
    }

    #[test]
    fn test_isolate_values_ignores_brackets_in_strings() {
        let text = r#""values" : [ ["a]b", "c[d"], ["x"], [1] ] , "other": 1"#;
        assert_eq!(
            isolate_values(text),
            Some(r#"[ ["a]b", "c[d"], ["x"], [1] ]"#)
        );
    }

    #[test]
    fn test_isolate_values_skips_non_array_occurrences() {
        let text = r#"{"values": "header"} {"values": [["A"],["d"],[1]]}"#;
        assert_eq!(isolate_values(text), Some(r#"[["A"],["d"],[1]]"#));
    }

    #[test]
    fn test_isolate_values_requires_balanced_literal() {
        assert_eq!(isolate_values(r#""values": [["A","B"],["x""#), None);
        assert_eq!(isolate_values(r#""values": [1, 2, 3]"#), None);
        assert_eq!(isolate_values("no marker here"), None);
    }

    #[test]
    fn test_lenient_pass_recovers_quotes_and_trailing_commas() {
        let strict = parse_values(r#"[["A","B"],[1,2]]"#).unwrap();
        let recovered = parse_values("[['A','B'],[1,2,],]").unwrap();
        assert_eq!(recovered, strict);
    }

    #[test]
    fn test_lenient_normalize_handles_whitespace_before_closer() {
        assert_eq!(lenient_normalize("[1, 2 ,\n ]"), "[1, 2 ]");
        assert_eq!(lenient_normalize("{'a': 1, }"), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_values_gives_up_on_garbage() {
        assert_eq!(parse_values("[[A, B], [1, 2]]"), None);
    }

    #[test]
    fn test_extract_continues_past_unparsable_scripts() {
        let broken = r#"{"values": [[undefined], [x], [1]]}"#;
        let good = r#"{"values": [["A"], ["2024-01-01"], [3.5]]}"#;
        let value = extract_from_texts(["var x = 1;", broken, good]).unwrap();
        assert_eq!(value, json!([["A"], ["2024-01-01"], [3.5]]));
    }

    #[test]
    fn test_extract_reports_absence() {
        assert_eq!(extract_from_texts(["var x = 1;", "console.log('values')"]), None);
    }
}
