//! Selector synthesis.
//!
//! CSS, XPath and role+name are computed independently from the element's
//! ancestry; a strategy that cannot be computed is absent, never an error.

use super::score::is_stable_id;
use super::types::{RoleName, SelectorSet};
use crate::driver::traits::{PathStep, RawElement};

/// Maximum number of compound selectors in a structural CSS path
pub const MAX_CSS_DEPTH: usize = 5;

/// Build the full selector set for a described element
pub fn synthesize(raw: &RawElement, role_name: &RoleName) -> SelectorSet {
    SelectorSet {
        css: css_selector(&raw.ancestry),
        xpath: xpath(&raw.ancestry, &raw.tag),
        role_name: role_name.clone(),
    }
}

/// Anchor segment for a node that can be identified on its own
fn anchor(step: &PathStep) -> Option<String> {
    if let Some(id) = step.id.as_deref().filter(|id| is_stable_id(id)) {
        return Some(format!("#{}", css_escape(id)));
    }
    step.stable_attr
        .as_ref()
        .map(|(name, value)| format!("{}{}", step.tag, attr_selector(name, value)))
}

fn positional(step: &PathStep) -> String {
    if step.of_type_count > 1 {
        format!("{}:nth-of-type({})", step.tag, step.nth_of_type)
    } else {
        step.tag.clone()
    }
}

/// Shortest CSS for the last node of `ancestry`.
///
/// An id or stable attribute on the element wins outright. Otherwise the path
/// climbs through `nth-of-type` qualified segments until an anchored ancestor,
/// the document root, or `MAX_CSS_DEPTH` segments.
pub fn css_selector(ancestry: &[PathStep]) -> Option<String> {
    let (target, parents) = ancestry.split_last()?;
    if let Some(own) = anchor(target) {
        return Some(own);
    }

    let mut segments = vec![positional(target)];
    for step in parents.iter().rev() {
        if segments.len() >= MAX_CSS_DEPTH {
            break;
        }
        if let Some(a) = anchor(step) {
            segments.push(a);
            break;
        }
        segments.push(positional(step));
    }
    segments.reverse();
    Some(segments.join(" > "))
}

/// Absolute XPath with 1-based same-tag positions, e.g. `/html[1]/body[1]/div[2]`.
/// Falls back to `//tag` when no ancestry is known.
pub fn xpath(ancestry: &[PathStep], tag: &str) -> String {
    if ancestry.is_empty() {
        return format!("//{}", tag);
    }
    ancestry
        .iter()
        .map(|step| format!("/{}[{}]", step.tag, step.nth_of_type.max(1)))
        .collect()
}

/// `[name="value"]` with the value quoted
pub fn attr_selector(name: &str, value: &str) -> String {
    format!("[{}=\"{}\"]", name, escape_attr_value(value))
}

fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an identifier for use after `#` or `.`
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        let safe = c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii();
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if safe {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
