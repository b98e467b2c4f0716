//! Frame tree walking.
//!
//! Frames are re-enumerated for every operation and identified by their path
//! from the root at the moment of use.

use log::warn;
use std::collections::HashMap;

use super::types::{FramePath, MapperWarning};
use crate::driver::traits::{DriverError, FrameInfo, PageDriver};

pub const ANONYMOUS_FRAME: &str = "<anonymous>";

/// A frame handle together with its path from the root
pub struct WalkedFrame<F> {
    pub path: FramePath,
    pub frame: F,
}

/// Result of a walk: reachable frames in depth-first order plus skipped ones
pub struct FrameWalk<F> {
    pub frames: Vec<WalkedFrame<F>>,
    pub warnings: Vec<MapperWarning>,
}

/// Label for a frame: its name, else its URL, else `<anonymous>`
pub fn frame_label(info: &FrameInfo) -> String {
    if !info.name.is_empty() {
        info.name.clone()
    } else if !info.url.is_empty() {
        info.url.clone()
    } else {
        ANONYMOUS_FRAME.to_string()
    }
}

/// Segment for the `ordinal`-th sibling (1-based) carrying `label`.
///
/// The first sibling keeps the bare label; later ones get `label[n]`, so
/// paths stay unique among unnamed or same-`src` frames.
pub fn frame_segment(label: &str, ordinal: usize) -> String {
    if ordinal <= 1 {
        label.to_string()
    } else {
        format!("{}[{}]", label, ordinal)
    }
}

/// Split `label[n]` into its label and ordinal (n >= 2)
fn parse_segment(segment: &str) -> Option<(&str, usize)> {
    let (label, rest) = segment.strip_suffix(']')?.rsplit_once('[')?;
    let ordinal = rest.parse::<usize>().ok().filter(|n| *n >= 2)?;
    Some((label, ordinal))
}

/// Assign each readable child its unique segment, in DOM order.
/// Children whose info cannot be read get `None` and take no ordinal.
fn child_segments(infos: &[Option<FrameInfo>]) -> Vec<Option<String>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    infos
        .iter()
        .map(|info| {
            info.as_ref().map(|info| {
                let label = frame_label(info);
                let ordinal = seen.entry(label.clone()).or_insert(0);
                *ordinal += 1;
                frame_segment(&label, *ordinal)
            })
        })
        .collect()
}

/// Index of the child that `segment` designates.
///
/// Exact segment first. A segment without an ordinal may also be a plain
/// name or URL, as older records wrote it.
fn match_segment(segment: &str, infos: &[Option<FrameInfo>]) -> Option<usize> {
    let segments = child_segments(infos);
    let live = |i: &usize| infos[*i].as_ref().is_some_and(|info| !info.detached);

    if let Some(i) = (0..infos.len())
        .filter(live)
        .find(|i| segments[*i].as_deref() == Some(segment))
    {
        return Some(i);
    }
    if parse_segment(segment).is_some() {
        return None;
    }
    (0..infos.len()).filter(live).find(|i| {
        infos[*i]
            .as_ref()
            .is_some_and(|info| segment == info.name || segment == info.url)
    })
}

/// Enumerate the main frame and all descendants, depth-first in DOM order.
///
/// Detached or inaccessible frames are skipped with a warning; only fatal
/// driver errors abort the walk.
pub async fn walk_frames<D: PageDriver>(driver: &D) -> Result<FrameWalk<D::Frame>, DriverError> {
    let mut walk = FrameWalk {
        frames: Vec::new(),
        warnings: Vec::new(),
    };

    let root = match driver.main_frame().await {
        Ok(frame) => frame,
        Err(e) if e.is_transient() => {
            warn!("Main frame unavailable: {}", e);
            walk.warnings.push(MapperWarning::FrameSkipped {
                path: Vec::new(),
                reason: e.to_string(),
            });
            return Ok(walk);
        }
        Err(e) => return Err(e),
    };

    let mut stack: Vec<WalkedFrame<D::Frame>> = vec![WalkedFrame {
        path: Vec::new(),
        frame: root,
    }];

    while let Some(current) = stack.pop() {
        let children = match driver.child_frames(&current.frame).await {
            Ok(children) => children,
            Err(e) if e.is_transient() => {
                warn!("Cannot list child frames of {:?}: {}", current.path, e);
                walk.warnings.push(MapperWarning::FrameSkipped {
                    path: current.path.clone(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut infos = Vec::with_capacity(children.len());
        for child in &children {
            match driver.frame_info(child).await {
                Ok(info) => infos.push(Some(info)),
                Err(e) if e.is_transient() => {
                    warn!("Cannot read frame under {:?}: {}", current.path, e);
                    walk.warnings.push(MapperWarning::FrameSkipped {
                        path: current.path.clone(),
                        reason: e.to_string(),
                    });
                    infos.push(None);
                }
                Err(e) => return Err(e),
            }
        }

        let segments = child_segments(&infos);
        let mut pending = Vec::with_capacity(children.len());
        for ((child, info), segment) in children.into_iter().zip(infos).zip(segments) {
            let (Some(info), Some(segment)) = (info, segment) else {
                continue;
            };
            let mut path = current.path.clone();
            path.push(segment);
            if info.detached {
                warn!("Skipping detached frame {:?}", path);
                walk.warnings.push(MapperWarning::FrameSkipped {
                    path,
                    reason: "frame detached".to_string(),
                });
                continue;
            }
            pending.push(WalkedFrame { path, frame: child });
        }

        walk.frames.push(current);
        // Reverse so the first child is popped next
        stack.extend(pending.into_iter().rev());
    }

    Ok(walk)
}

/// Follow `path` from the main frame. `None` when any segment no longer resolves.
pub async fn resolve_frame_path<D: PageDriver>(
    driver: &D,
    path: &[String],
) -> Result<Option<D::Frame>, DriverError> {
    let mut current = match driver.main_frame().await {
        Ok(frame) => frame,
        Err(e) if e.is_transient() => return Ok(None),
        Err(e) => return Err(e),
    };

    for segment in path {
        let children = match driver.child_frames(&current).await {
            Ok(children) => children,
            Err(e) if e.is_transient() => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut infos = Vec::with_capacity(children.len());
        for child in &children {
            match driver.frame_info(child).await {
                Ok(info) => infos.push(Some(info)),
                Err(e) if e.is_transient() => infos.push(None),
                Err(e) => return Err(e),
            }
        }
        let next = match_segment(segment, &infos).and_then(|i| children.into_iter().nth(i));
        match next {
            Some(frame) => current = frame,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}
