// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{LogConfig, LogLevel};

#[test]
fn test_verbosity_mapping() {
    let levels: Vec<_> = [(0, false), (1, false), (2, false), (9, false), (3, true)]
        .into_iter()
        .map(|(v, q)| LogLevel::from_verbosity(v, q).as_u8())
        .collect();
    assert_eq!(levels, [3, 4, 5, 6, 1]);
}

#[test]
fn test_filter_strings() {
    let filters: Vec<_> = (0..=6)
        .map(|n| LogLevel::new(n).unwrap().to_filter_string())
        .collect();
    insta::assert_debug_snapshot!(filters, @r#"
    [
        "off",
        "warn,flowvcs=error",
        "warn",
        "warn,flowvcs=info",
        "warn,flowvcs=debug",
        "warn,flowvcs=trace",
        "trace",
    ]
    "#);
}

#[test]
fn test_level_out_of_range() {
    assert!(LogLevel::new(7).is_err());
    assert!(serde_json::from_str::<LogLevel>("9").is_err());
    assert_eq!(serde_json::from_str::<LogLevel>("4").unwrap(), LogLevel::DEBUG);
}

#[test]
fn test_default_config() {
    let config = LogConfig::default();
    assert_eq!(config.console_level(), LogLevel::INFO);
    assert!(config.log_file().is_none());
    assert!(!config.json());
}
