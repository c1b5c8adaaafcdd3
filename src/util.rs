//! Shared utility functions used across the codebase.

use std::time::Duration;

/// Parse an environment variable as a boolean, returning `default` if unset.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// any other value maps to `false`.
pub fn env_var_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Build the HTTP client shared by the outbound API clients.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Shorten a secret for logging, keeping only its first characters.
pub fn fingerprint(secret: &str) -> String {
    if secret.is_empty() {
        return "(empty)".to_string();
    }
    let prefix: String = secret.chars().take(6).collect();
    format!("{}…", prefix)
}
