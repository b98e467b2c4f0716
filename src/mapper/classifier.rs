//! Element classification: descriptive metadata, field kind and the
//! accessibility role/name pair. Read-only with respect to the page.

use std::collections::BTreeMap;

use super::types::{
    AriaInfo, BoundingBox, ElementMeta, FieldInfo, FieldKind, FramePath, RoleName, SelectorSet,
    STABLE_ATTRS,
};
use crate::driver::traits::RawElement;

/// Inner text is kept up to this many Unicode code points
pub const MAX_TEXT_CHARS: usize = 200;

/// Truncate to `MAX_TEXT_CHARS` code points
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Explicit `role` wins; otherwise the implicit role of the tag
pub fn infer_role(tag: &str, explicit: Option<&str>, input_type: Option<&str>) -> Option<String> {
    if let Some(role) = non_empty(explicit) {
        return Some(role);
    }
    let role = match tag {
        "input" => match input_type {
            None | Some("text" | "email" | "tel" | "url" | "password" | "number") => "textbox",
            Some("search") => "searchbox",
            Some("button" | "submit") => "button",
            _ => return None,
        },
        "textarea" => "textbox",
        "select" => "combobox",
        "a" => "link",
        "button" => "button",
        _ => return None,
    };
    Some(role.to_string())
}

/// `aria-label`, then visible text, then `placeholder`
pub fn accessible_name(
    aria_label: Option<&str>,
    text: &str,
    placeholder: Option<&str>,
) -> Option<String> {
    non_empty(aria_label)
        .or_else(|| non_empty(Some(text)))
        .or_else(|| non_empty(placeholder))
}

pub fn is_contenteditable(raw: &RawElement) -> bool {
    matches!(raw.attr("contenteditable"), Some("" | "true"))
}

/// Editable kind; `contenteditable` takes precedence over the tag
pub fn field_kind(raw: &RawElement) -> Option<FieldKind> {
    if is_contenteditable(raw) {
        return Some(FieldKind::ContentEditable);
    }
    match raw.tag.as_str() {
        "textarea" => Some(FieldKind::Textarea),
        "select" => Some(FieldKind::Select),
        "input" => {
            let input_type = raw
                .attr("type")
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string());
            FieldKind::from_input_type(&input_type)
        }
        _ => None,
    }
}

/// Allow-listed attributes with a non-empty value
pub fn stable_attrs(raw: &RawElement) -> BTreeMap<String, String> {
    STABLE_ATTRS
        .iter()
        .filter_map(|name| {
            raw.attr(name)
                .filter(|v| !v.is_empty())
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

fn field_info(raw: &RawElement) -> Option<FieldInfo> {
    let kind = field_kind(raw)?;
    Some(FieldInfo {
        kind,
        placeholder: raw.attr("placeholder").map(String::from),
        name: raw.attr("name").map(String::from),
        autocomplete: raw.attr("autocomplete").map(String::from),
        readonly: raw.has_attr("readonly"),
        required: raw.has_attr("required"),
        aria_disabled: raw.attr("aria-disabled") == Some("true"),
        inputmode: raw.attr("inputmode").map(String::from),
        maxlength: raw.attr("maxlength").map(String::from),
        contenteditable: is_contenteditable(raw),
        value_length: raw.value_length,
    })
}

/// Classify a described element. Selectors other than role+name and the score
/// are filled in by the synthesizer and the score calculator.
pub fn classify(raw: &RawElement, frame_path: &FramePath) -> ElementMeta {
    let tag = raw.tag.to_lowercase();
    let text = truncate_text(raw.inner_text.trim());
    let input_type = raw.attr("type").map(|t| t.to_lowercase());

    let role_name = RoleName {
        role: infer_role(&tag, raw.attr("role"), input_type.as_deref()),
        name: accessible_name(raw.attr("aria-label"), &text, raw.attr("placeholder")),
    };

    let bbox = raw
        .rect
        .map(|r| BoundingBox {
            x: Some(r.x),
            y: Some(r.y),
            width: Some(r.width),
            height: Some(r.height),
        })
        .unwrap_or_default();

    ElementMeta {
        frame_path: frame_path.clone(),
        index: 0,
        id: raw.attr("id").filter(|v| !v.is_empty()).map(String::from),
        classes: raw.attr("class").map(String::from),
        role: role_name.role.clone(),
        name: role_name.name.clone(),
        input_type: raw.attr("type").map(String::from),
        title: raw.attr("title").map(String::from),
        text,
        href: raw.attr("href").map(String::from),
        stable_attrs: stable_attrs(raw),
        selectors: SelectorSet {
            css: None,
            xpath: String::new(),
            role_name,
        },
        bbox,
        score: 0,
        field: field_info(raw),
        aria: AriaInfo {
            label: raw.attr("aria-label").map(String::from),
            labelledby: raw.attr("aria-labelledby").map(String::from),
            describedby: raw.attr("aria-describedby").map(String::from),
        },
        tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::attrs;

    fn raw(tag: &str, pairs: &[(&str, &str)], text: &str) -> RawElement {
        RawElement {
            tag: tag.to_string(),
            attributes: attrs(pairs),
            inner_text: text.to_string(),
            visible: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate_counts_code_points() {
        let short = "a".repeat(200);
        assert_eq!(truncate_text(&short), short);

        let long = "é".repeat(250);
        let truncated = truncate_text(&long);
        assert_eq!(truncated.chars().count(), 200);
        assert_eq!(truncated.len(), 400);

        let emoji = "🙂".repeat(201);
        assert_eq!(truncate_text(&emoji).chars().count(), 200);
    }

    #[test]
    fn test_name_precedence() {
        assert_eq!(
            accessible_name(Some("Close"), "X", Some("ph")).as_deref(),
            Some("Close")
        );
        assert_eq!(accessible_name(Some("  "), "X", Some("ph")).as_deref(), Some("X"));
        assert_eq!(accessible_name(None, "", Some("Search")).as_deref(), Some("Search"));
        assert_eq!(accessible_name(None, "", None), None);
    }

    #[test]
    fn test_implicit_roles() {
        assert_eq!(infer_role("input", None, None).as_deref(), Some("textbox"));
        assert_eq!(infer_role("input", None, Some("search")).as_deref(), Some("searchbox"));
        assert_eq!(infer_role("input", None, Some("submit")).as_deref(), Some("button"));
        assert_eq!(infer_role("input", None, Some("checkbox")), None);
        assert_eq!(infer_role("select", None, None).as_deref(), Some("combobox"));
        assert_eq!(infer_role("a", None, None).as_deref(), Some("link"));
        assert_eq!(infer_role("div", Some("tab"), None).as_deref(), Some("tab"));
        assert_eq!(infer_role("div", None, None), None);
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(field_kind(&raw("input", &[], "")), Some(FieldKind::InputText));
        assert_eq!(
            field_kind(&raw("input", &[("type", "EMAIL")], "")),
            Some(FieldKind::InputEmail)
        );
        assert_eq!(field_kind(&raw("input", &[("type", "submit")], "")), None);
        assert_eq!(field_kind(&raw("textarea", &[], "")), Some(FieldKind::Textarea));
        assert_eq!(field_kind(&raw("select", &[], "")), Some(FieldKind::Select));
        assert_eq!(field_kind(&raw("button", &[], "Go")), None);
        assert_eq!(
            field_kind(&raw("textarea", &[("contenteditable", "")], "")),
            Some(FieldKind::ContentEditable)
        );
        assert_eq!(field_kind(&raw("div", &[("contenteditable", "false")], "")), None);
    }

    #[test]
    fn test_contenteditable_classification() {
        let mut element = raw("div", &[("contenteditable", "true")], "Notes");
        element.value_length = 5;
        let meta = classify(&element, &vec![]);
        let field = meta.field.expect("contenteditable is a field");
        assert_eq!(field.kind, FieldKind::ContentEditable);
        assert!(field.contenteditable);
        assert_eq!(field.value_length, 5);
        assert_eq!(meta.name.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_only_allow_listed_attributes_are_stable() {
        let element = raw(
            "button",
            &[
                ("data-testid", "save"),
                ("data-reactid", ".0.1"),
                ("data-qa", ""),
                ("data-cy", "save-btn"),
            ],
            "Save",
        );
        let meta = classify(&element, &vec!["checkout".into()]);
        assert_eq!(meta.stable_attrs.len(), 2);
        assert!(meta.stable_attrs.contains_key("data-testid"));
        assert!(meta.stable_attrs.contains_key("data-cy"));
        assert_eq!(meta.frame_path, vec!["checkout".to_string()]);
        assert_eq!(meta.field, None);
    }

    #[test]
    fn test_placeholder_name_for_inputs() {
        let element = raw(
            "input",
            &[("type", "password"), ("placeholder", "Senha"), ("name", "pwd")],
            "",
        );
        let meta = classify(&element, &vec![]);
        assert_eq!(meta.role.as_deref(), Some("textbox"));
        assert_eq!(meta.name.as_deref(), Some("Senha"));
        let field = meta.field.unwrap();
        assert_eq!(field.kind, FieldKind::InputPassword);
        assert_eq!(field.name.as_deref(), Some("pwd"));
    }
}
