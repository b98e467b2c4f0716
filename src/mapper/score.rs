//! Robustness score (0-120) for a classified element
//!
//! # Scoring Rules
//! - **Role + accessible name** both present: 40 points
//! - **Stable-looking id**: 40 points
//! - **Stable attributes**: 10 points each, at most 30
//! - **Canonical tag** (`button`, `a`, `input`): 10 points

use regex::Regex;
use std::sync::LazyLock;

use super::types::{ElementMeta, RoleName};
use std::collections::BTreeMap;

pub const MAX_SCORE: u32 = 120;

/// Identifier-shaped: starts with a letter or underscore, at least 3 characters
static ID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-:.]{2,}$").unwrap());

/// Patterns that indicate auto-generated ids (less stable)
static AUTO_GENERATED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}").unwrap(), // UUID pattern
        Regex::new(r"\d{5,}").unwrap(),                      // Long number / timestamp
        Regex::new(r"^(ember|ext-gen|yui_|gwt-uid-|react-select-|mui-|headlessui-|radix-)")
            .unwrap(), // Framework generated prefixes
        Regex::new(r"^generated_").unwrap(),
    ]
});

/// Hex run of 8+ characters mixing digits and letters, e.g. `btn-3fa9c0d2e1`
fn has_hash_run(id: &str) -> bool {
    id.split(|c: char| !c.is_ascii_hexdigit())
        .filter(|run| run.len() >= 8)
        .any(|run| {
            run.chars().any(|c| c.is_ascii_digit()) && run.chars().any(|c| c.is_ascii_alphabetic())
        })
}

/// Whether an id looks like it will survive a redeploy
pub fn is_stable_id(id: &str) -> bool {
    ID_SHAPE.is_match(id)
        && !AUTO_GENERATED_PATTERNS.iter().any(|p| p.is_match(id))
        && !has_hash_run(id)
}

/// Score from the classified parts; pure and deterministic
pub fn score(
    tag: &str,
    id: Option<&str>,
    stable_attrs: &BTreeMap<String, String>,
    role_name: &RoleName,
) -> u32 {
    let mut total = 0u32;
    if role_name.is_complete() {
        total += 40;
    }
    if id.is_some_and(is_stable_id) {
        total += 40;
    }
    let counted = stable_attrs.values().filter(|v| !v.is_empty()).count().min(3) as u32;
    total += counted * 10;
    if matches!(tag, "button" | "a" | "input") {
        total += 10;
    }
    total.min(MAX_SCORE)
}

/// Recompute the score of stored metadata
pub fn score_meta(meta: &ElementMeta) -> u32 {
    score(
        &meta.tag,
        meta.id.as_deref(),
        &meta.stable_attrs,
        &meta.selectors.role_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rn(role: Option<&str>, name: Option<&str>) -> RoleName {
        RoleName {
            role: role.map(String::from),
            name: name.map(String::from),
        }
    }

    #[test]
    fn test_stable_ids() {
        assert!(is_stable_id("submit-btn"));
        assert!(is_stable_id("login_form"));
        assert!(is_stable_id("user.email"));
    }

    #[test]
    fn test_unstable_ids() {
        assert!(!is_stable_id(""));
        assert!(!is_stable_id("12345"));
        assert!(!is_stable_id("ab"));
        assert!(!is_stable_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_stable_id("btn-3fa9c0d2e1"));
        assert!(!is_stable_id("ember412"));
        assert!(!is_stable_id("item_1699999999"));
        assert!(!is_stable_id(":r1:"));
    }

    #[test]
    fn test_score_components() {
        let none = BTreeMap::new();
        assert_eq!(score("div", None, &none, &rn(None, None)), 0);
        assert_eq!(score("button", None, &none, &rn(Some("button"), Some("Go"))), 50);
        assert_eq!(
            score("button", Some("submit-btn"), &none, &rn(Some("button"), Some("Submit"))),
            90
        );
        assert_eq!(score("div", None, &none, &rn(Some("button"), None)), 0);
    }

    #[test]
    fn test_stable_attrs_capped() {
        let attrs: BTreeMap<String, String> = [
            ("data-testid", "a"),
            ("data-test", "b"),
            ("data-qa", "c"),
            ("data-cy", "d"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(score("span", None, &attrs, &rn(None, None)), 30);
    }

    #[test]
    fn test_score_bounds_and_idempotence() {
        let attrs: BTreeMap<String, String> = [
            ("data-testid", "a"),
            ("data-test", "b"),
            ("data-qa", "c"),
            ("data-e2e", "d"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let role_name = rn(Some("link"), Some("Home"));
        let first = score("a", Some("home-link"), &attrs, &role_name);
        let second = score("a", Some("home-link"), &attrs, &role_name);
        assert_eq!(first, MAX_SCORE);
        assert_eq!(first, second);
    }
}
