// SPDX-License-Identifier: MPL-2.0

//! Integration tests for preference persistence

use scan_japan::config::{AppTheme, PreferenceStore, Preferences, PrefsError};

fn store() -> (tempfile::TempDir, PreferenceStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(dir.path().join("nested").join("preferences.json"));
    (dir, store)
}

#[test]
fn test_missing_file_gives_defaults() {
    let (_dir, store) = store();
    assert_eq!(store.try_load().unwrap(), Preferences::default());
}

#[test]
fn test_round_trip() {
    let (_dir, store) = store();
    let prefs = Preferences {
        language: "ja".into(),
        theme: AppTheme::Light,
    };
    store.save(&prefs).unwrap();
    assert_eq!(store.try_load().unwrap(), prefs);

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"selectedLanguage\": \"ja\""));
    assert!(raw.contains("\"theme\": \"light\""));
}

#[test]
fn test_unknown_language_falls_back() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), r#"{"selectedLanguage":"klingon","theme":"dark"}"#).unwrap();

    let prefs = store.try_load().unwrap();
    assert_eq!(prefs.language, "en");
    assert_eq!(prefs.theme, AppTheme::Dark);
}

#[test]
fn test_corrupt_file() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "{not json").unwrap();

    assert!(matches!(store.try_load(), Err(PrefsError::Format { .. })));
    assert_eq!(store.load(), Preferences::default());
}

#[test]
fn test_partial_file_uses_defaults_for_missing_keys() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), r#"{"theme":"light"}"#).unwrap();

    let prefs = store.try_load().unwrap();
    assert_eq!(prefs.language, "en");
    assert_eq!(prefs.theme, AppTheme::Light);
}
