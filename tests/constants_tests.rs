// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use scan_japan::constants::{LANGUAGES, language, language_name, next_language};
use std::collections::HashSet;

#[test]
fn test_language_table() {
    assert_eq!(LANGUAGES.len(), 38);

    let codes: HashSet<_> = LANGUAGES.iter().map(|l| l.code).collect();
    assert_eq!(codes.len(), LANGUAGES.len(), "Language codes should be unique");
    assert!(LANGUAGES.iter().all(|l| !l.name.is_empty()));
}

#[test]
fn test_language_names() {
    assert_eq!(language_name("ja"), "Japanese");
    assert_eq!(language_name("iw"), "Hebrew");
    assert_eq!(language_name("xx"), "xx");
    assert!(language("en").is_some());
    assert!(language("EN").is_none());
}

#[test]
fn test_language_cycle_visits_every_language() {
    let mut code = "en";
    let mut seen = HashSet::new();
    for _ in 0..LANGUAGES.len() {
        code = next_language(code);
        seen.insert(code);
    }
    assert_eq!(code, "en");
    assert_eq!(seen.len(), LANGUAGES.len());

    // Unknown codes restart at the top of the menu
    assert_eq!(next_language("xx"), LANGUAGES[0].code);
}
