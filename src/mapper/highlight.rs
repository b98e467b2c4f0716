//! Temporary visual overlay around one element.
//!
//! The overlay lives in the element's own frame and never outlives a reload.
//! At most one highlight is active; drawing a new one clears every frame first.

use log::debug;

use super::frames::walk_frames;
use super::types::{FramePath, MapperWarning};
use crate::driver::traits::{DriverError, PageDriver};

#[derive(Debug, Default)]
pub struct Highlighter {
    active: Option<FramePath>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame path of the current highlight, if any
    pub fn active(&self) -> Option<&FramePath> {
        self.active.as_ref()
    }

    /// Clear previous markers, then outline `element` inside `frame`
    pub async fn highlight<D: PageDriver>(
        &mut self,
        driver: &D,
        frame: &D::Frame,
        path: &FramePath,
        element: &D::Element,
    ) -> Result<Vec<MapperWarning>, DriverError> {
        let mut warnings = self.clear(driver).await?;
        match driver.draw_overlay(frame, element).await {
            Ok(()) => {
                debug!("Highlight drawn in frame {:?}", path);
                self.active = Some(path.clone());
            }
            Err(e) if e.is_transient() => warnings.push(MapperWarning::Highlight {
                reason: e.to_string(),
            }),
            Err(e) => return Err(e),
        }
        Ok(warnings)
    }

    /// Remove markers from the main frame and every frame currently reachable.
    /// Safe to call when nothing is highlighted.
    pub async fn clear<D: PageDriver>(
        &mut self,
        driver: &D,
    ) -> Result<Vec<MapperWarning>, DriverError> {
        let walk = walk_frames(driver).await?;
        let mut warnings = Vec::new();
        for walked in &walk.frames {
            match driver.remove_overlays(&walked.frame).await {
                Ok(()) => {}
                Err(e) if e.is_transient() => warnings.push(MapperWarning::Highlight {
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }
        self.active = None;
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::{el, MemoryFrame, MemoryPage};
    use crate::driver::traits::{Locator, PageDriver};

    fn page() -> MemoryPage {
        MemoryPage::new(
            "https://app.local/",
            MemoryFrame::new("", "https://app.local/")
                .with(el("button").attr("id", "top-btn").text("Top"))
                .child(
                    MemoryFrame::new("editor", "https://app.local/editor")
                        .with(el("button").attr("id", "inner-btn").text("Inner")),
                )
                .child(
                    MemoryFrame::new("sidebar", "https://app.local/side")
                        .with(el("a").attr("href", "/x").text("Side")),
                ),
        )
    }

    #[tokio::test]
    async fn test_highlight_stays_in_element_frame() {
        let page = page();
        let mut highlighter = Highlighter::new();
        let frame = vec![0];
        let element = page
            .query_first(&frame, &Locator::Css("#inner-btn".into()))
            .await
            .unwrap()
            .unwrap();

        let warnings = highlighter
            .highlight(&page, &frame, &vec!["editor".into()], &element)
            .await
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(page.overlay_frames(), vec![vec![0]]);
        assert_eq!(highlighter.active(), Some(&vec!["editor".to_string()]));

        highlighter.clear(&page).await.unwrap();
        assert!(page.overlay_frames().is_empty());
        assert_eq!(highlighter.active(), None);
    }

    #[tokio::test]
    async fn test_new_highlight_replaces_previous() {
        let page = page();
        let mut highlighter = Highlighter::new();
        let top = page
            .query_first(&vec![], &Locator::Css("#top-btn".into()))
            .await
            .unwrap()
            .unwrap();
        highlighter.highlight(&page, &vec![], &vec![], &top).await.unwrap();

        let inner = page
            .query_first(&vec![0], &Locator::Css("#inner-btn".into()))
            .await
            .unwrap()
            .unwrap();
        highlighter
            .highlight(&page, &vec![0], &vec!["editor".into()], &inner)
            .await
            .unwrap();
        assert_eq!(page.overlay_frames(), vec![vec![0]]);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let page = page();
        let mut highlighter = Highlighter::new();
        assert!(highlighter.clear(&page).await.unwrap().is_empty());
        assert!(highlighter.clear(&page).await.unwrap().is_empty());
    }
}
