// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the axis binary.

use axis_core::DEFAULT_LOCK_TTL;
use std::path::PathBuf;
use std::time::Duration;

/// Postgres DSN. Presence selects hosted (shared-store) mode.
pub fn database_url() -> Option<String> {
    non_empty("DATABASE_URL")
}

/// Local-mode state path (default `./history/nerve-center-state.json`).
pub fn state_file() -> PathBuf {
    non_empty("NERVE_CENTER_STATE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./history/nerve-center-state.json"))
}

/// Instructions directory (default `./.axis/instructions`).
pub fn instructions_dir() -> PathBuf {
    non_empty("AXIS_INSTRUCTIONS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./.axis/instructions"))
}

/// Project the CLI binds to when none is named.
pub fn project_name() -> String {
    non_empty("PROJECT_NAME").unwrap_or_else(|| "default".to_string())
}

/// Lock TTL override (`AXIS_LOCK_TTL_SECS`, default 30 minutes).
pub fn lock_ttl() -> Duration {
    non_empty("AXIS_LOCK_TTL_SECS")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_LOCK_TTL)
}

/// Embeddings credential.
pub fn openai_api_key() -> Option<String> {
    non_empty("OPENAI_API_KEY")
}

/// JWT signing secret for the HTTP surface.
pub fn session_secret() -> Option<String> {
    non_empty("APP_SESSION_SECRET")
}

/// The `sk_sc_` API key accepted by the HTTP surface, and the secret
/// the remote-mode tool surface presents.
pub fn shared_context_api_secret() -> Option<String> {
    non_empty("SHARED_CONTEXT_API_SECRET")
}

/// Remote-mode endpoint for the tool surface.
pub fn shared_context_api_url() -> Option<String> {
    non_empty("SHARED_CONTEXT_API_URL")
}

/// Production mode strips error messages down to category strings.
pub fn is_production() -> bool {
    non_empty("AXIS_ENV").is_some_and(|v| v == "production")
}

/// Plan label reported by `/v1/verify` (default "pro").
pub fn plan() -> String {
    non_empty("AXIS_PLAN").unwrap_or_else(|| "pro".to_string())
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_unset() {
        std::env::remove_var("NERVE_CENTER_STATE_FILE");
        std::env::remove_var("PROJECT_NAME");
        std::env::remove_var("AXIS_LOCK_TTL_SECS");
        assert_eq!(state_file(), PathBuf::from("./history/nerve-center-state.json"));
        assert_eq!(project_name(), "default");
        assert_eq!(lock_ttl(), DEFAULT_LOCK_TTL);
    }

    #[test]
    #[serial]
    fn overrides_are_read() {
        std::env::set_var("PROJECT_NAME", "atlas");
        std::env::set_var("AXIS_LOCK_TTL_SECS", "60");
        std::env::set_var("AXIS_ENV", "production");
        assert_eq!(project_name(), "atlas");
        assert_eq!(lock_ttl(), Duration::from_secs(60));
        assert!(is_production());
        std::env::remove_var("PROJECT_NAME");
        std::env::remove_var("AXIS_LOCK_TTL_SECS");
        std::env::remove_var("AXIS_ENV");
    }

    #[test]
    #[serial]
    fn empty_values_count_as_unset() {
        std::env::set_var("DATABASE_URL", "");
        assert!(database_url().is_none());
        std::env::remove_var("DATABASE_URL");
    }
}
