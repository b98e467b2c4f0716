//! Element mapper core
//!
//! This module provides:
//! - Frame walking and eligible element scanning
//! - Classification, selector synthesis and robustness scoring
//! - Capture into persisted records and later revalidation
//! - Frame-scoped highlighting

pub mod classifier;
pub mod error;
pub mod frames;
pub mod highlight;
pub mod revalidate;
pub mod scanner;
pub mod score;
pub mod selectors;
pub mod types;

use log::{debug, info};
use std::cmp::Ordering;

pub use error::MapperError;
pub use highlight::Highlighter;
pub use revalidate::{RevalidationResult, Strategy};
pub use types::{ElementCandidate, ElementMeta, ElementRecord, FramePath, MapperWarning, SaveContext};

use crate::driver::traits::{DriverError, PageDriver, RawElement};

/// Outcome of a full-page scan
#[derive(Debug)]
pub struct ScanReport<E> {
    pub candidates: Vec<ElementCandidate<E>>,
    pub frames_scanned: usize,
    pub warnings: Vec<MapperWarning>,
}

/// Classify, synthesize selectors and score one described element
pub fn build_meta(raw: &RawElement, frame_path: &FramePath) -> ElementMeta {
    let mut meta = classifier::classify(raw, frame_path);
    meta.selectors = selectors::synthesize(raw, &meta.selectors.role_name);
    meta.score = score::score_meta(&meta);
    meta
}

/// Promote a candidate to a persisted record with caller-supplied context
pub fn capture<E>(candidate: &ElementCandidate<E>, ctx: &SaveContext) -> ElementRecord {
    ElementRecord {
        saved_at: ctx.saved_at.to_rfc3339(),
        page_url: ctx.page_url.clone(),
        machine_user: ctx.machine_user.clone(),
        machine_host: ctx.machine_host.clone(),
        session: ctx.session.clone(),
        element: candidate.meta.clone(),
    }
}

/// Candidate indices ordered by descending score; ties keep list order
pub fn rank<E>(candidates: &[ElementCandidate<E>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| candidates[*b].meta.score.cmp(&candidates[*a].meta.score));
    order
}

fn reading_order(a: &ElementMeta, b: &ElementMeta) -> Ordering {
    let key = |m: &ElementMeta| (m.bbox.y.unwrap_or(0.0), m.bbox.x.unwrap_or(0.0));
    let (ay, ax) = key(a);
    let (by, bx) = key(b);
    ay.partial_cmp(&by)
        .unwrap_or(Ordering::Equal)
        .then(ax.partial_cmp(&bx).unwrap_or(Ordering::Equal))
}

/// Single-page mapping session over a driver
pub struct Mapper<D: PageDriver> {
    driver: D,
    highlighter: Highlighter,
}

impl<D: PageDriver> Mapper<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            highlighter: Highlighter::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Walk every frame and collect ranked candidates.
    ///
    /// Candidates are ordered top-to-bottom, left-to-right (stable, so walk
    /// order breaks ties) and indexed in that order.
    pub async fn scan(&self) -> Result<ScanReport<D::Element>, DriverError> {
        let walk = frames::walk_frames(&self.driver).await?;
        let mut warnings = walk.warnings;
        let mut candidates = Vec::new();

        for walked in &walk.frames {
            let scan = scanner::scan_frame(&self.driver, walked).await?;
            debug!(
                "Frame {:?}: {} eligible elements",
                walked.path,
                scan.elements.len()
            );
            warnings.extend(scan.warnings);
            candidates.extend(scan.elements.into_iter().map(|(handle, raw)| ElementCandidate {
                meta: build_meta(&raw, &walked.path),
                handle,
            }));
        }

        candidates.sort_by(|a, b| reading_order(&a.meta, &b.meta));
        for (index, candidate) in candidates.iter_mut().enumerate() {
            candidate.meta.index = index as i64;
        }

        info!(
            "Scan found {} candidates in {} frames ({} warnings)",
            candidates.len(),
            walk.frames.len(),
            warnings.len()
        );
        Ok(ScanReport {
            candidates,
            frames_scanned: walk.frames.len(),
            warnings,
        })
    }

    /// Revalidate a persisted record against the current page
    pub async fn test(
        &mut self,
        record: &ElementRecord,
    ) -> Result<RevalidationResult<D::Element>, MapperError> {
        revalidate::revalidate(&self.driver, record, &mut self.highlighter).await
    }

    /// Highlight an element inside the given frame
    pub async fn highlight(
        &mut self,
        frame: &D::Frame,
        path: &FramePath,
        element: &D::Element,
    ) -> Result<Vec<MapperWarning>, DriverError> {
        self.highlighter
            .highlight(&self.driver, frame, path, element)
            .await
    }

    /// Highlight a scan candidate, resolving its frame afresh
    pub async fn highlight_candidate(
        &mut self,
        candidate: &ElementCandidate<D::Element>,
    ) -> Result<Vec<MapperWarning>, DriverError> {
        let path = &candidate.meta.frame_path;
        match frames::resolve_frame_path(&self.driver, path).await? {
            Some(frame) => {
                self.highlighter
                    .highlight(&self.driver, &frame, path, &candidate.handle)
                    .await
            }
            None => Ok(vec![MapperWarning::Highlight {
                reason: format!("frame {:?} no longer exists", path),
            }]),
        }
    }

    /// Remove every highlight marker
    pub async fn clear_highlights(&mut self) -> Result<Vec<MapperWarning>, DriverError> {
        self.highlighter.clear(&self.driver).await
    }
}
