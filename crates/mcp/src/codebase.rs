// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin regex scan over project files for the `search_codebase` tool.
//!
//! Deliberately small: bounded walk, bounded matches, skips dot
//! directories and obvious build output. The full codebase-search
//! utility lives outside this service.

use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_RESULTS: usize = 50;
const MAX_FILES: usize = 2_000;
const MAX_FILE_BYTES: u64 = 512 * 1024;
const SKIP_DIRS: [&str; 4] = ["node_modules", "target", "dist", "history"];

pub fn search(root: &Path, pattern: &str, max_results: usize) -> Result<String, String> {
    let regex = Regex::new(pattern).map_err(|e| format!("invalid pattern: {e}"))?;
    let mut hits = Vec::new();
    let mut visited = 0usize;
    walk(root, root, &regex, &mut hits, &mut visited, max_results);

    if hits.is_empty() {
        return Ok(format!("no matches for `{pattern}`"));
    }
    let mut out = String::new();
    for (path, line_no, line) in &hits {
        let _ = writeln!(out, "{path}:{line_no}: {}", line.trim_end());
    }
    Ok(out)
}

fn walk(
    root: &Path,
    dir: &Path,
    regex: &Regex,
    hits: &mut Vec<(String, usize, String)>,
    visited: &mut usize,
    max_results: usize,
) {
    if hits.len() >= max_results || *visited >= MAX_FILES {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if hits.len() >= max_results || *visited >= MAX_FILES {
            return;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if name.starts_with('.') || SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            walk(root, &path, regex, hits, visited, max_results);
        } else {
            *visited += 1;
            if entry.metadata().map(|m| m.len() > MAX_FILE_BYTES).unwrap_or(true) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let display = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    hits.push((display.clone(), idx + 1, line.to_string()));
                    if hits.len() >= max_results {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_matches_with_line_numbers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}\nlet claim = 1;\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.rs"), "claim_next_job();\n").unwrap();

        let out = search(dir.path(), "claim", DEFAULT_MAX_RESULTS).unwrap();
        assert!(out.contains("a.rs:2"));
        assert!(out.contains("sub/b.rs:1"));
    }

    #[test]
    fn skips_dot_and_build_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "needle\n").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/out.txt"), "needle\n").unwrap();

        let out = search(dir.path(), "needle", DEFAULT_MAX_RESULTS).unwrap();
        assert!(out.contains("no matches"));
    }

    #[test]
    fn rejects_invalid_patterns() {
        let dir = TempDir::new().unwrap();
        assert!(search(dir.path(), "(unclosed", DEFAULT_MAX_RESULTS).is_err());
    }

    #[test]
    fn caps_result_count() {
        let dir = TempDir::new().unwrap();
        let many = "match\n".repeat(100);
        fs::write(dir.path().join("big.txt"), many).unwrap();
        let out = search(dir.path(), "match", 5).unwrap();
        assert_eq!(out.lines().count(), 5);
    }
}
