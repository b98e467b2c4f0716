//! In-memory page used by unit tests.
//!
//! Every frame is a flat list of elements under `body`; ancestry, eligibility
//! and the handful of locator shapes the mapper emits are evaluated in Rust.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::traits::{
    DriverError, FrameInfo, Locator, Navigate, PageDriver, PathStep, RawElement, Rect,
};
use crate::mapper::scanner::ELIGIBILITY_SELECTOR;
use crate::mapper::selectors;
use crate::mapper::types::STABLE_ATTRS;

/// Builder for one element
#[derive(Debug, Clone)]
pub struct MemoryElement {
    pub raw: RawElement,
    pub stale: bool,
}

pub fn el(tag: &str) -> MemoryElement {
    MemoryElement {
        raw: RawElement {
            tag: tag.to_string(),
            visible: true,
            rect: Some(Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 20.0,
            }),
            ..Default::default()
        },
        stale: false,
    }
}

impl MemoryElement {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.raw
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.raw.inner_text = text.to_string();
        self
    }

    pub fn value_length(mut self, len: usize) -> Self {
        self.raw.value_length = len;
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        if let Some(rect) = self.raw.rect.as_mut() {
            rect.x = x;
            rect.y = y;
        }
        self
    }

    pub fn hidden(mut self) -> Self {
        self.raw.visible = false;
        self.raw.rect = Some(Rect::default());
        self
    }

    /// `disabled` DOM property without the attribute
    pub fn disabled_property(mut self) -> Self {
        self.raw.disabled = true;
        self
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFrame {
    pub name: String,
    pub url: String,
    pub detached: bool,
    pub elements: Vec<MemoryElement>,
    pub children: Vec<MemoryFrame>,
    pub overlay: Option<usize>,
}

impl MemoryFrame {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with(mut self, element: MemoryElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn child(mut self, frame: MemoryFrame) -> Self {
        self.children.push(frame);
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    fn ancestry(&self, index: usize) -> Vec<PathStep> {
        let target = &self.elements[index].raw;
        let same_tag: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.raw.tag == target.tag)
            .map(|(i, _)| i)
            .collect();
        let nth = same_tag.iter().position(|i| *i == index).unwrap_or(0) + 1;
        let stable_attr = STABLE_ATTRS.iter().find_map(|a| {
            target
                .attr(a)
                .filter(|v| !v.is_empty())
                .map(|v| (a.to_string(), v.to_string()))
        });
        vec![
            step("html", 1, 1),
            step("body", 1, 1),
            PathStep {
                tag: target.tag.clone(),
                id: target.attr("id").filter(|v| !v.is_empty()).map(String::from),
                stable_attr,
                nth_of_type: nth,
                of_type_count: same_tag.len(),
            },
        ]
    }

    fn matches(&self, index: usize, locator: &Locator) -> bool {
        let raw = &self.elements[index].raw;
        match locator {
            Locator::Css(css) if css == ELIGIBILITY_SELECTOR => is_eligible(raw),
            Locator::Css(css) => {
                if let Some(id) = css.strip_prefix('#') {
                    return raw.attr("id") == Some(unescape(id).as_str());
                }
                if let Some((name, value)) = parse_attr_selector(css) {
                    return raw.attr(&name) == Some(value.as_str());
                }
                selectors::css_selector(&self.ancestry(index)).as_deref() == Some(css.as_str())
            }
            Locator::XPath(xpath) => selectors::xpath(&self.ancestry(index), &raw.tag) == *xpath,
        }
    }
}

fn step(tag: &str, nth: usize, count: usize) -> PathStep {
    PathStep {
        tag: tag.to_string(),
        id: None,
        stable_attr: None,
        nth_of_type: nth,
        of_type_count: count,
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `[name="value"]`
fn parse_attr_selector(css: &str) -> Option<(String, String)> {
    let inner = css.strip_prefix('[')?.strip_suffix(']')?;
    let (name, value) = inner.split_once('=')?;
    let value = value.strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), unescape(value)))
}

/// Rust rendition of the eligibility selector list
pub fn is_eligible(raw: &RawElement) -> bool {
    let input_type = raw.attr("type").map(|t| t.to_lowercase());
    let role = raw.attr("role").unwrap_or("");
    match raw.tag.as_str() {
        "button" | "textarea" | "select" => return true,
        "a" if raw.has_attr("href") => return true,
        "input" => match input_type.as_deref() {
            None => return true,
            Some(
                "button" | "submit" | "text" | "password" | "search" | "email" | "tel" | "number"
                | "url",
            ) => return true,
            _ => {}
        },
        _ => {}
    }
    matches!(role, "button" | "textbox" | "searchbox" | "combobox")
        || matches!(raw.attr("contenteditable"), Some("" | "true"))
        || raw.has_attr("onclick")
        || raw.attr("tabindex").is_some_and(|t| t != "-1")
}

/// Handle to a frame: child indices from the root
pub type MemoryFrameRef = Vec<usize>;

/// Handle to an element: its frame plus position
pub type MemoryElementRef = (Vec<usize>, usize);

pub struct MemoryPage {
    pub url: String,
    root: Mutex<MemoryFrame>,
    /// Fail every call with a fatal error, as a crashed browser would
    pub crashed: bool,
}

impl MemoryPage {
    pub fn new(url: &str, root: MemoryFrame) -> Self {
        Self {
            url: url.to_string(),
            root: Mutex::new(root),
            crashed: false,
        }
    }

    fn with_frame<T>(
        &self,
        path: &[usize],
        f: impl FnOnce(&mut MemoryFrame) -> T,
    ) -> Result<T, DriverError> {
        if self.crashed {
            return Err(DriverError::Fatal("Target closed".into()));
        }
        let mut root = self.root.lock().unwrap();
        let mut frame = &mut *root;
        for i in path {
            frame = frame
                .children
                .get_mut(*i)
                .ok_or_else(|| DriverError::Detached("frame was detached".into()))?;
        }
        if frame.detached {
            return Err(DriverError::Detached("frame was detached".into()));
        }
        Ok(f(frame))
    }

    /// Remove every element carrying the given id, anywhere in the tree
    pub fn remove_by_id(&self, id: &str) {
        fn walk(frame: &mut MemoryFrame, id: &str) {
            frame.elements.retain(|e| e.raw.attr("id") != Some(id));
            for child in frame.children.iter_mut() {
                walk(child, id);
            }
        }
        walk(&mut self.root.lock().unwrap(), id);
    }

    /// Frames (as child-index paths) currently carrying an overlay
    pub fn overlay_frames(&self) -> Vec<MemoryFrameRef> {
        fn walk(frame: &MemoryFrame, path: Vec<usize>, out: &mut Vec<MemoryFrameRef>) {
            if frame.overlay.is_some() {
                out.push(path.clone());
            }
            for (i, child) in frame.children.iter().enumerate() {
                let mut next = path.clone();
                next.push(i);
                walk(child, next, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.root.lock().unwrap(), Vec::new(), &mut out);
        out
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    type Frame = MemoryFrameRef;
    type Element = MemoryElementRef;

    async fn main_frame(&self) -> Result<Self::Frame, DriverError> {
        self.with_frame(&[], |_| Vec::new())
    }

    async fn child_frames(&self, frame: &Self::Frame) -> Result<Vec<Self::Frame>, DriverError> {
        self.with_frame(frame, |f| {
            (0..f.children.len())
                .map(|i| {
                    let mut path = frame.clone();
                    path.push(i);
                    path
                })
                .collect()
        })
    }

    async fn frame_info(&self, frame: &Self::Frame) -> Result<FrameInfo, DriverError> {
        if self.crashed {
            return Err(DriverError::Fatal("Target closed".into()));
        }
        let root = self.root.lock().unwrap();
        let mut current = &*root;
        for i in frame {
            match current.children.get(*i) {
                Some(child) => current = child,
                None => {
                    return Ok(FrameInfo {
                        detached: true,
                        ..Default::default()
                    })
                }
            }
        }
        Ok(FrameInfo {
            name: current.name.clone(),
            url: current.url.clone(),
            detached: current.detached,
        })
    }

    async fn query_all(
        &self,
        frame: &Self::Frame,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, DriverError> {
        self.with_frame(frame, |f| {
            (0..f.elements.len())
                .filter(|i| f.matches(*i, locator))
                .map(|i| (frame.clone(), i))
                .collect()
        })
    }

    async fn query_first(
        &self,
        frame: &Self::Frame,
        locator: &Locator,
    ) -> Result<Option<Self::Element>, DriverError> {
        Ok(self.query_all(frame, locator).await?.into_iter().next())
    }

    async fn describe(
        &self,
        frame: &Self::Frame,
        element: &Self::Element,
    ) -> Result<RawElement, DriverError> {
        let index = element.1;
        self.with_frame(frame, |f| match f.elements.get(index) {
            Some(e) if !e.stale => {
                let mut raw = e.raw.clone();
                raw.ancestry = f.ancestry(index);
                Ok(raw)
            }
            _ => Err(DriverError::StaleElement(
                "Element is not attached to the DOM".into(),
            )),
        })?
    }

    async fn draw_overlay(
        &self,
        frame: &Self::Frame,
        element: &Self::Element,
    ) -> Result<(), DriverError> {
        self.with_frame(frame, |f| f.overlay = Some(element.1))
    }

    async fn remove_overlays(&self, frame: &Self::Frame) -> Result<(), DriverError> {
        self.with_frame(frame, |f| f.overlay = None)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.clone())
    }
}

#[async_trait]
impl Navigate for MemoryPage {
    async fn open(&self, url: &str) -> anyhow::Result<String> {
        Ok(url.to_string())
    }

    async fn reload(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Attribute map shorthand for classifier tests
pub fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
