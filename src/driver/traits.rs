use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Query understood by every driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector evaluated against the frame's document
    Css(String),
    /// XPath evaluated against the frame's document
    XPath(String),
}

impl Locator {
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Identity of a frame at the moment it was walked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub name: String,
    pub url: String,
    pub detached: bool,
}

/// One step of an element's ancestry, from `html` down to the element itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    /// First allow-listed stable attribute present on this node, as (name, value)
    #[serde(default)]
    pub stable_attr: Option<(String, String)>,
    /// 1-based position among element siblings with the same tag
    pub nth_of_type: usize,
    /// Number of element siblings (including this one) with the same tag
    pub of_type_count: usize,
}

/// Client rect reported by the driver, in the frame's viewport pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Read-only snapshot of one element as seen through the driver.
///
/// `attributes` only carries the attributes the classifier reads; the value
/// of form controls is never transferred, only its length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub inner_text: String,
    #[serde(default)]
    pub value_length: usize,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub ancestry: Vec<PathStep>,
}

impl RawElement {
    /// Attribute value, if the attribute is present (possibly empty)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Driver failure, split by whether the session can keep going
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("frame detached: {0}")]
    Detached(String),

    #[error("element no longer attached: {0}")]
    StaleElement(String),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser failure: {0}")]
    Fatal(String),
}

impl DriverError {
    /// Transient errors are recovered locally as empty results or failed lookups
    pub fn is_transient(&self) -> bool {
        !matches!(self, DriverError::Fatal(_))
    }

    /// Classify a raw driver message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("target closed")
            || lower.contains("browser has been closed")
            || lower.contains("connection closed")
            || lower.contains("browser closed")
        {
            DriverError::Fatal(message)
        } else if lower.contains("frame was detached") || lower.contains("frame detached") {
            DriverError::Detached(message)
        } else if lower.contains("not attached") || lower.contains("element is detached") {
            DriverError::StaleElement(message)
        } else {
            DriverError::Evaluation(message)
        }
    }
}

/// Browser page capability set consumed by the mapper core.
///
/// Frame and element handles are only meaningful for the page state they were
/// obtained from; callers re-walk frames for every operation instead of caching them.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Frame: Send + Sync;
    type Element: Send + Sync;

    /// Root frame of the current page
    async fn main_frame(&self) -> Result<Self::Frame, DriverError>;

    /// Direct child frames, in DOM order
    async fn child_frames(&self, frame: &Self::Frame) -> Result<Vec<Self::Frame>, DriverError>;

    /// Name, URL and detached state of a frame
    async fn frame_info(&self, frame: &Self::Frame) -> Result<FrameInfo, DriverError>;

    /// All elements matching the locator in the frame's document
    async fn query_all(
        &self,
        frame: &Self::Frame,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, DriverError>;

    /// First element matching the locator, if any
    async fn query_first(
        &self,
        frame: &Self::Frame,
        locator: &Locator,
    ) -> Result<Option<Self::Element>, DriverError>;

    /// Read-only metadata snapshot of an element
    async fn describe(
        &self,
        frame: &Self::Frame,
        element: &Self::Element,
    ) -> Result<RawElement, DriverError>;

    /// Inject the highlight overlay around an element, inside its own frame
    async fn draw_overlay(
        &self,
        frame: &Self::Frame,
        element: &Self::Element,
    ) -> Result<(), DriverError>;

    /// Remove any highlight overlay from the frame's document
    async fn remove_overlays(&self, frame: &Self::Frame) -> Result<(), DriverError>;

    /// URL of the top-level page
    async fn current_url(&self) -> Result<String, DriverError>;
}

/// Navigation used by the interactive shell; the mapper core never navigates
#[async_trait]
pub trait Navigate: Send + Sync {
    /// Load a URL and return the URL actually requested
    async fn open(&self, url: &str) -> anyhow::Result<String>;

    async fn reload(&self) -> anyhow::Result<()>;
}
