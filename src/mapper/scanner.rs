//! Eligible element discovery inside one frame.

use log::{debug, warn};

use super::frames::WalkedFrame;
use super::types::MapperWarning;
use crate::driver::traits::{DriverError, Locator, PageDriver, RawElement};

/// Union of clickable and editable criteria
pub const ELIGIBILITY_SELECTOR: &str = concat!(
    // Buttons / links
    "button,",
    "[role=button],",
    "a[href],",
    "input[type=button],",
    "input[type=submit],",
    // Editable fields
    "input[type=text],",
    "input[type=password],",
    "input[type=search],",
    "input[type=email],",
    "input[type=tel],",
    "input[type=number],",
    "input[type=url],",
    "input:not([type]),",
    "textarea,",
    "select,",
    "[contenteditable=''],",
    "[contenteditable='true'],",
    "[role=textbox],",
    "[role=searchbox],",
    "[role=combobox],",
    // General heuristics
    "[onclick],",
    "[tabindex]:not([tabindex='-1'])"
);

/// Rendered with a non-zero layout box
pub fn is_rendered(raw: &RawElement) -> bool {
    raw.visible
        && raw
            .rect
            .is_some_and(|r| r.width > 0.0 && r.height > 0.0)
}

/// Not disabled by property, attribute or `aria-disabled="true"`
pub fn is_enabled(raw: &RawElement) -> bool {
    !raw.disabled && !raw.has_attr("disabled") && raw.attr("aria-disabled") != Some("true")
}

/// Eligible elements of one frame that pass both filters
pub struct FrameScan<E> {
    pub elements: Vec<(E, RawElement)>,
    pub warnings: Vec<MapperWarning>,
}

impl<E> FrameScan<E> {
    fn skipped<F>(frame: &WalkedFrame<F>, error: &DriverError) -> Self {
        warn!("Frame {:?} skipped during scan: {}", frame.path, error);
        Self {
            elements: Vec::new(),
            warnings: vec![MapperWarning::FrameSkipped {
                path: frame.path.clone(),
                reason: error.to_string(),
            }],
        }
    }
}

/// Snapshot the eligible, visible and enabled elements of a frame.
///
/// A frame that detaches mid-scan contributes nothing but a warning; elements
/// that vanish individually are skipped. Fatal driver errors propagate.
pub async fn scan_frame<D: PageDriver>(
    driver: &D,
    frame: &WalkedFrame<D::Frame>,
) -> Result<FrameScan<D::Element>, DriverError> {
    let handles = match driver
        .query_all(&frame.frame, &Locator::Css(ELIGIBILITY_SELECTOR.to_string()))
        .await
    {
        Ok(handles) => handles,
        Err(e) if e.is_transient() => return Ok(FrameScan::skipped(frame, &e)),
        Err(e) => return Err(e),
    };

    let mut scan = FrameScan {
        elements: Vec::with_capacity(handles.len()),
        warnings: Vec::new(),
    };

    for handle in handles {
        let raw = match driver.describe(&frame.frame, &handle).await {
            Ok(raw) => raw,
            Err(e @ DriverError::Detached(_)) => return Ok(FrameScan::skipped(frame, &e)),
            Err(e) if e.is_transient() => {
                debug!("Element skipped in {:?}: {}", frame.path, e);
                scan.warnings.push(MapperWarning::ElementSkipped {
                    path: frame.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };
        if !is_rendered(&raw) || !is_enabled(&raw) {
            continue;
        }
        scan.elements.push((handle, raw));
    }

    Ok(scan)
}
