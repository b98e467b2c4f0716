//! Re-locating a captured element on the current page.
//!
//! Strategies in fallback order (first success wins):
//! 1. Role + accessible name
//! 2. `id`
//! 3. First allow-listed stable attribute
//! 4. `name` attribute
//! 5. `placeholder` attribute
//! 6. Synthesized CSS
//! 7. Synthesized XPath

use log::{debug, info, warn};

use super::classifier::classify;
use super::error::MapperError;
use super::frames::{resolve_frame_path, walk_frames, WalkedFrame};
use super::highlight::Highlighter;
use super::scanner::{is_rendered, ELIGIBILITY_SELECTOR};
use super::score::score_meta;
use super::selectors::{attr_selector, css_escape, synthesize};
use super::types::{ElementMeta, ElementRecord, FramePath, MapperWarning};
use crate::driver::traits::{DriverError, Locator, PageDriver};

/// One locator attempt in the revalidation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    RoleName,
    Id,
    StableAttribute,
    NameAttribute,
    Placeholder,
    Css,
    XPath,
}

/// What a strategy looks for, derived from the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    RoleName { role: String, name: String },
    Query(Locator),
}

impl Strategy {
    /// Fallback chain, most robust first
    pub const CHAIN: [Strategy; 7] = [
        Strategy::RoleName,
        Strategy::Id,
        Strategy::StableAttribute,
        Strategy::NameAttribute,
        Strategy::Placeholder,
        Strategy::Css,
        Strategy::XPath,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::RoleName => "role+name",
            Strategy::Id => "id",
            Strategy::StableAttribute => "stable-attribute",
            Strategy::NameAttribute => "name-attribute",
            Strategy::Placeholder => "placeholder",
            Strategy::Css => "css",
            Strategy::XPath => "xpath",
        }
    }

    /// Lookup for this strategy, or `None` when the record lacks the data
    pub fn lookup(&self, meta: &ElementMeta) -> Option<Lookup> {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(String::from);
        let field = meta.field.as_ref();
        match self {
            Strategy::RoleName => {
                let rn = &meta.selectors.role_name;
                if !rn.is_complete() {
                    return None;
                }
                Some(Lookup::RoleName {
                    role: rn.role.clone()?,
                    name: rn.name.clone()?,
                })
            }
            Strategy::Id => non_empty(meta.id.as_deref())
                .map(|id| Lookup::Query(Locator::Css(format!("#{}", css_escape(&id))))),
            Strategy::StableAttribute => meta
                .stable_attrs_ordered()
                .next()
                .map(|(attr, value)| Lookup::Query(Locator::Css(attr_selector(attr, value)))),
            Strategy::NameAttribute => non_empty(field.and_then(|f| f.name.as_deref()))
                .map(|name| Lookup::Query(Locator::Css(attr_selector("name", &name)))),
            Strategy::Placeholder => non_empty(field.and_then(|f| f.placeholder.as_deref()))
                .map(|ph| Lookup::Query(Locator::Css(attr_selector("placeholder", &ph)))),
            Strategy::Css => non_empty(meta.selectors.css.as_deref())
                .map(|css| Lookup::Query(Locator::Css(css))),
            Strategy::XPath => non_empty(Some(meta.selectors.xpath.as_str()))
                .map(|xpath| Lookup::Query(Locator::XPath(xpath))),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict of a revalidation. A miss is a normal outcome, not an error.
#[derive(Debug)]
pub struct RevalidationResult<E> {
    pub located: bool,
    /// Found inside the frame the record's path still resolves to
    pub frame_match: bool,
    pub used_strategy: Option<Strategy>,
    pub frame_path: Option<FramePath>,
    pub element: Option<E>,
    /// Score stored at capture time
    pub captured_score: u32,
    /// Score recomputed from the located element
    pub current_score: Option<u32>,
    pub warnings: Vec<MapperWarning>,
}

impl<E> RevalidationResult<E> {
    fn missed(captured_score: u32, warnings: Vec<MapperWarning>) -> Self {
        Self {
            located: false,
            frame_match: false,
            used_strategy: None,
            frame_path: None,
            element: None,
            captured_score,
            current_score: None,
            warnings,
        }
    }

    /// Difference between the current and the captured score
    pub fn score_drift(&self) -> Option<i64> {
        self.current_score
            .map(|s| s as i64 - self.captured_score as i64)
    }
}

/// Reject records that cannot drive any lookup
pub fn validate_record(record: &ElementRecord) -> Result<(), MapperError> {
    let element = &record.element;
    if element.tag.trim().is_empty() {
        return Err(MapperError::MalformedRecord("element.tag is empty".into()));
    }
    if element.selectors.xpath.trim().is_empty() {
        return Err(MapperError::MalformedRecord(
            "element.selectors.xpath is empty".into(),
        ));
    }
    Ok(())
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

async fn attempt<D: PageDriver>(
    driver: &D,
    frame: &D::Frame,
    lookup: &Lookup,
) -> Result<Option<D::Element>, DriverError> {
    match lookup {
        Lookup::Query(locator) => driver.query_first(frame, locator).await,
        Lookup::RoleName { role, name } => {
            let eligible = Locator::Css(ELIGIBILITY_SELECTOR.to_string());
            for handle in driver.query_all(frame, &eligible).await? {
                let raw = match driver.describe(frame, &handle).await {
                    Ok(raw) => raw,
                    Err(e) if e.is_transient() => continue,
                    Err(e) => return Err(e),
                };
                if !is_rendered(&raw) {
                    continue;
                }
                let meta = classify(&raw, &Vec::new());
                if meta.role.as_deref() == Some(role.as_str())
                    && meta.name.as_deref() == Some(name.as_str())
                {
                    return Ok(Some(handle));
                }
            }
            Ok(None)
        }
    }
}

/// Re-locate the element described by `record` on the current page.
///
/// Searches the frame the record's path resolves to, or every frame when the
/// path no longer resolves. On success the element is highlighted. Transient
/// driver errors become warnings; only fatal ones are returned as errors.
pub async fn revalidate<D: PageDriver>(
    driver: &D,
    record: &ElementRecord,
    highlighter: &mut Highlighter,
) -> Result<RevalidationResult<D::Element>, MapperError> {
    validate_record(record)?;
    let meta = &record.element;
    let mut warnings = Vec::new();

    if !record.page_url.is_empty() {
        match driver.current_url().await {
            Ok(current) if strip_query(&current) != strip_query(&record.page_url) => {
                warn!("Current URL differs from saved record");
                warnings.push(MapperWarning::UrlMismatch {
                    saved: record.page_url.clone(),
                    current,
                });
            }
            Ok(_) => {}
            Err(e) if e.is_transient() => debug!("Cannot read current URL: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    let (scope, resolved) = match resolve_frame_path(driver, &meta.frame_path).await? {
        Some(frame) => (
            vec![WalkedFrame {
                path: meta.frame_path.clone(),
                frame,
            }],
            true,
        ),
        None => {
            info!(
                "Frame path {:?} no longer resolves, searching all frames",
                meta.frame_path
            );
            let walk = walk_frames(driver).await?;
            warnings.extend(walk.warnings);
            (walk.frames, false)
        }
    };

    for strategy in Strategy::CHAIN {
        let Some(lookup) = strategy.lookup(meta) else {
            continue;
        };
        for walked in &scope {
            let found = match attempt(driver, &walked.frame, &lookup).await {
                Ok(found) => found,
                Err(e) if e.is_transient() => {
                    debug!("Strategy {} failed in {:?}: {}", strategy, walked.path, e);
                    warnings.push(MapperWarning::LookupFailed {
                        strategy: strategy.name().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(element) = found else {
                continue;
            };

            let current_score = match driver.describe(&walked.frame, &element).await {
                Ok(raw) => {
                    let mut current = classify(&raw, &walked.path);
                    current.selectors = synthesize(&raw, &current.selectors.role_name);
                    Some(score_meta(&current))
                }
                Err(e) if e.is_transient() => None,
                Err(e) => return Err(e.into()),
            };

            warnings.extend(
                highlighter
                    .highlight(driver, &walked.frame, &walked.path, &element)
                    .await?,
            );
            info!("Element located via {} in {:?}", strategy, walked.path);

            return Ok(RevalidationResult {
                located: true,
                frame_match: resolved,
                used_strategy: Some(strategy),
                frame_path: Some(walked.path.clone()),
                element: Some(element),
                captured_score: meta.score,
                current_score,
                warnings,
            });
        }
    }

    warn!("Revalidation exhausted every strategy");
    Ok(RevalidationResult::missed(meta.score, warnings))
}
