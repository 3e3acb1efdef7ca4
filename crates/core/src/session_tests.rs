// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn marker_format() {
    assert_eq!(
        session_start_marker("2026-08-01T12:00:00Z"),
        "Session Start: 2026-08-01T12:00:00Z\n"
    );
}

#[test]
fn summary_truncates_at_500_chars() {
    let notepad = "x".repeat(1_200);
    assert_eq!(summarize(&notepad).len(), SUMMARY_LEN);
}

#[test]
fn summary_keeps_short_notepads_whole() {
    assert_eq!(summarize("short log"), "short log");
}

#[test]
fn summary_respects_char_boundaries() {
    // Multi-byte chars must not be split mid-codepoint.
    let notepad = "é".repeat(600);
    let summary = summarize(&notepad);
    assert_eq!(summary.chars().count(), SUMMARY_LEN);
}
