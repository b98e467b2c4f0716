//! Data model shared by scan, capture and revalidation.
//!
//! `ElementMeta` is the persisted element body; its JSON shape is read back by
//! `test`, so field names must not change.

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Frame identifiers from the root document down to the element's frame.
/// Empty means the main frame.
pub type FramePath = Vec<String>;

/// Allow-listed attributes presumed to survive deploys
pub const STABLE_ATTRS: [&str; 6] = [
    "data-testid",
    "data-test",
    "data-qa",
    "data-id",
    "data-cy",
    "data-e2e",
];

/// Editable element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "input:text")]
    InputText,
    #[serde(rename = "input:password")]
    InputPassword,
    #[serde(rename = "input:search")]
    InputSearch,
    #[serde(rename = "input:email")]
    InputEmail,
    #[serde(rename = "input:tel")]
    InputTel,
    #[serde(rename = "input:number")]
    InputNumber,
    #[serde(rename = "input:url")]
    InputUrl,
    #[serde(rename = "textarea")]
    Textarea,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "contenteditable")]
    ContentEditable,
}

impl FieldKind {
    /// Kind for an `<input>` with the given (lowercased) type attribute
    pub fn from_input_type(input_type: &str) -> Option<Self> {
        match input_type {
            "text" => Some(FieldKind::InputText),
            "password" => Some(FieldKind::InputPassword),
            "search" => Some(FieldKind::InputSearch),
            "email" => Some(FieldKind::InputEmail),
            "tel" => Some(FieldKind::InputTel),
            "number" => Some(FieldKind::InputNumber),
            "url" => Some(FieldKind::InputUrl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::InputText => "input:text",
            FieldKind::InputPassword => "input:password",
            FieldKind::InputSearch => "input:search",
            FieldKind::InputEmail => "input:email",
            FieldKind::InputTel => "input:tel",
            FieldKind::InputNumber => "input:number",
            FieldKind::InputUrl => "input:url",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::ContentEditable => "contenteditable",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of an editable element. The current value is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub kind: FieldKind,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub autocomplete: Option<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub aria_disabled: bool,
    #[serde(default)]
    pub inputmode: Option<String>,
    #[serde(default)]
    pub maxlength: Option<String>,
    #[serde(default)]
    pub contenteditable: bool,
    #[serde(default)]
    pub value_length: usize,
}

/// Accessibility role and accessible name pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleName {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RoleName {
    /// Both halves present and non-empty
    pub fn is_complete(&self) -> bool {
        matches!((&self.role, &self.name), (Some(r), Some(n)) if !r.is_empty() && !n.is_empty())
    }
}

/// Independently synthesized locator strategies for one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    #[serde(default)]
    pub css: Option<String>,
    pub xpath: String,
    #[serde(default)]
    pub role_name: RoleName,
}

impl SelectorSet {
    /// CSS when available, XPath otherwise
    pub fn preferred(&self) -> &str {
        self.css.as_deref().unwrap_or(&self.xpath)
    }
}

/// Bounding box at scan time. Members may be null in records from older writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AriaInfo {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub labelledby: Option<String>,
    #[serde(default)]
    pub describedby: Option<String>,
}

/// Classified, scored description of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMeta {
    #[serde(default)]
    pub frame_path: FramePath,
    #[serde(default)]
    pub index: i64,
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Raw `class` attribute
    #[serde(default)]
    pub classes: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub stable_attrs: BTreeMap<String, String>,
    pub selectors: SelectorSet,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub score: u32,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub field: Option<FieldInfo>,
    #[serde(default)]
    pub aria: AriaInfo,
}

impl ElementMeta {
    pub fn class_list(&self) -> Vec<&str> {
        self.classes
            .as_deref()
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Stable attributes in allow-list order
    pub fn stable_attrs_ordered(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        STABLE_ATTRS
            .iter()
            .filter_map(|attr| self.stable_attrs.get(*attr).map(|v| (*attr, v.as_str())))
    }

    /// Short label for listings
    pub fn display_name(&self, max_chars: usize) -> String {
        let source = self.name.as_deref().unwrap_or(&self.text);
        source.chars().take(max_chars).collect()
    }
}

/// Older writers stored a `field` block for every element, with kinds outside
/// the editable set; those read back as "not a field".
fn deserialize_field<'de, D>(deserializer: D) -> Result<Option<FieldInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value::<FieldInfo>(v).ok()))
}

/// In-memory scan result: metadata plus the live handle it was read from
#[derive(Debug)]
pub struct ElementCandidate<E> {
    pub meta: ElementMeta,
    pub handle: E,
}

/// Save-time context supplied by the caller, never by the core
#[derive(Debug, Clone)]
pub struct SaveContext {
    pub saved_at: DateTime<Local>,
    pub page_url: String,
    pub machine_user: String,
    pub machine_host: String,
    pub session: String,
}

/// Persisted form of a captured candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(default)]
    pub saved_at: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub machine_user: String,
    #[serde(default)]
    pub machine_host: String,
    #[serde(default)]
    pub session: String,
    pub element: ElementMeta,
}

/// Recoverable condition surfaced to the caller as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperWarning {
    /// A frame could not be walked or scanned; it contributes no candidates
    FrameSkipped { path: FramePath, reason: String },
    /// A single element vanished or failed to describe during the scan
    ElementSkipped { path: FramePath, reason: String },
    /// A lookup strategy errored (as opposed to simply not matching)
    LookupFailed { strategy: String, reason: String },
    /// The record was captured on a different page
    UrlMismatch { saved: String, current: String },
    /// Drawing or clearing the overlay failed
    Highlight { reason: String },
}

impl std::fmt::Display for MapperWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapperWarning::FrameSkipped { path, reason } => {
                write!(f, "frame skipped path_len={} err={}", path.len(), reason)
            }
            MapperWarning::ElementSkipped { path, reason } => {
                write!(f, "element skipped path_len={} err={}", path.len(), reason)
            }
            MapperWarning::LookupFailed { strategy, reason } => {
                write!(f, "lookup {} failed: {}", strategy, reason)
            }
            MapperWarning::UrlMismatch { saved, current } => {
                write!(f, "current URL differs from saved (saved={} current={})", saved, current)
            }
            MapperWarning::Highlight { reason } => write!(f, "highlight error: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&FieldKind::InputPassword).unwrap(),
            "\"input:password\""
        );
        let kind: FieldKind = serde_json::from_str("\"contenteditable\"").unwrap();
        assert_eq!(kind, FieldKind::ContentEditable);
        assert_eq!(FieldKind::from_input_type("date"), None);
    }

    #[test]
    fn test_role_name_completeness() {
        let mut rn = RoleName {
            role: Some("button".into()),
            name: Some("".into()),
        };
        assert!(!rn.is_complete());
        rn.name = Some("Save".into());
        assert!(rn.is_complete());
    }

    #[test]
    fn test_legacy_record_loads() {
        let json = r#"{
            "saved_at": "2024-05-01T10:00:00",
            "page_url": "https://example.com/login",
            "machine_user": "ana",
            "machine_host": "ws-01",
            "session": "1a2b3c4d",
            "element": {
                "frame_path": [],
                "index": 3,
                "tag": "input",
                "id": null,
                "classes": "btn btn-primary",
                "role": "button",
                "name": "Entrar",
                "type": "submit",
                "title": null,
                "text": "",
                "href": null,
                "stable_attrs": {},
                "selectors": {"css": "form>input:nth-of-type(2)", "xpath": "/html[1]/body[1]/form[1]/input[2]", "role_name": {"role": "button", "name": "Entrar"}},
                "bbox": {"x": null, "y": null, "width": null, "height": null},
                "score": 50,
                "field": {"kind": "input:button", "placeholder": null, "name": null, "autocomplete": null,
                          "readonly": false, "required": false, "aria_disabled": false, "inputmode": null,
                          "maxlength": null, "contenteditable": false, "value_length": 0},
                "aria": {"label": null, "labelledby": null, "describedby": null}
            }
        }"#;
        let record: ElementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.element.field, None);
        assert_eq!(record.element.bbox.x, None);
        assert_eq!(record.element.class_list(), vec!["btn", "btn-primary"]);
        assert!(record.element.selectors.role_name.is_complete());
    }

    #[test]
    fn test_stable_attrs_follow_allow_list_order() {
        let mut meta: ElementMeta = serde_json::from_value(serde_json::json!({
            "tag": "div",
            "selectors": {"xpath": "/html[1]/body[1]/div[1]"}
        }))
        .unwrap();
        meta.stable_attrs.insert("data-qa".into(), "b".into());
        meta.stable_attrs.insert("data-testid".into(), "a".into());
        let ordered: Vec<_> = meta.stable_attrs_ordered().collect();
        assert_eq!(ordered, vec![("data-testid", "a"), ("data-qa", "b")]);
    }
}
