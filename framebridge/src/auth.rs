// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Credential selection
//
// The inbound `Authorization` header may carry several comma-separated
// tokens. The first one wins. Tokens copied from a browser cookie look like
// `<user>%3A%3A<token>` and only the segment after the first separator is
// sent on.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication token is required")]
    Missing,
}

const BEARER_PREFIX: &str = "Bearer ";
const COOKIE_SEPARATOR: &str = "%3A%3A";

/// Pick the upstream credential out of an `Authorization` header value.
pub fn select_credential(header: Option<&str>) -> Result<String, AuthError> {
    let raw = header.ok_or(AuthError::Missing)?;
    let raw = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);

    let first = raw
        .split(',')
        .map(str::trim)
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Missing)?;

    let token = first.split(COOKIE_SEPARATOR).nth(1).unwrap_or(first);

    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_stripped() {
        assert_eq!(select_credential(Some("Bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn bare_token_accepted() {
        assert_eq!(select_credential(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn first_of_several_tokens_wins() {
        assert_eq!(select_credential(Some("Bearer  one , two,three")).unwrap(), "one");
    }

    #[test]
    fn selection_is_deterministic() {
        let header = Some("Bearer a,b,c");
        let picks: Vec<_> = (0..10).map(|_| select_credential(header).unwrap()).collect();
        assert!(picks.iter().all(|p| p == "a"));
    }

    #[test]
    fn cookie_style_token_keeps_suffix() {
        assert_eq!(
            select_credential(Some("Bearer user_01%3A%3AeyJhbGciOi")).unwrap(),
            "eyJhbGciOi"
        );
    }

    #[test]
    fn cookie_style_token_stops_at_next_separator() {
        assert_eq!(
            select_credential(Some("user_01%3A%3AeyJhbGciOi%3A%3Atrailer")).unwrap(),
            "eyJhbGciOi"
        );
    }

    #[test]
    fn missing_or_blank_header_rejected() {
        assert_eq!(select_credential(None), Err(AuthError::Missing));
        assert_eq!(select_credential(Some("")), Err(AuthError::Missing));
        assert_eq!(select_credential(Some("Bearer ")), Err(AuthError::Missing));
        assert_eq!(select_credential(Some(" , x")), Err(AuthError::Missing));
        assert_eq!(select_credential(Some("user%3A%3A")), Err(AuthError::Missing));
    }

    #[test]
    fn error_message_matches_client_contract() {
        assert_eq!(AuthError::Missing.to_string(), "Authentication token is required");
    }
}
