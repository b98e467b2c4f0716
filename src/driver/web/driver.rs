//! Web Driver implementation using Playwright
//!
//! Drives a Chromium-family browser and exposes the current page to the
//! mapper through `PageDriver`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use playwright::api::{Browser, BrowserContext, ElementHandle, Frame, Page, Viewport};
use playwright::Playwright;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::scripts::{DESCRIBE_ELEMENT, DRAW_OVERLAY, REMOVE_OVERLAY};
use crate::driver::traits::{DriverError, FrameInfo, Locator, Navigate, PageDriver, RawElement};

/// Browser used for the mapping session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserChoice {
    #[default]
    Edge,
    Chrome,
    Chromium,
}

impl FromStr for BrowserChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "edge" | "msedge" => Ok(BrowserChoice::Edge),
            "chrome" => Ok(BrowserChoice::Chrome),
            "chromium" => Ok(BrowserChoice::Chromium),
            other => anyhow::bail!("Unknown browser: {} (expected edge, chrome or chromium)", other),
        }
    }
}

impl std::fmt::Display for BrowserChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BrowserChoice::Edge => "edge",
            BrowserChoice::Chrome => "chrome",
            BrowserChoice::Chromium => "chromium",
        };
        f.write_str(name)
    }
}

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser: BrowserChoice,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// CDP endpoint to connect to existing browser (e.g. http://localhost:9222)
    pub cdp_endpoint: Option<String>,
    pub navigation_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        let headless = std::env::var("LUMI_HEADLESS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            browser: BrowserChoice::default(),
            headless,
            viewport_width: 1280,
            viewport_height: 720,
            cdp_endpoint: std::env::var("LUMI_CDP_ENDPOINT").ok(),
            navigation_timeout_ms: 120_000,
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    #[allow(dead_code)]
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

fn driver_error(e: impl std::fmt::Display) -> DriverError {
    DriverError::from_message(e.to_string())
}

/// Missing scheme defaults to https
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") || url.starts_with("about:") || url.starts_with("data:") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn selector_string(locator: &Locator) -> String {
    match locator {
        Locator::Css(css) => css.clone(),
        Locator::XPath(xpath) => format!("xpath={}", xpath),
    }
}

impl WebDriver {
    /// Launch (or attach to) a browser and open a blank page
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;
        let chromium = playwright.chromium();

        let attached = match config.cdp_endpoint {
            Some(ref endpoint) => {
                println!(
                    "{} Trying to connect to browser at: {}",
                    "🔌".blue(),
                    endpoint
                );
                match chromium
                    .connect_over_cdp_builder(endpoint)
                    .connect_over_cdp()
                    .await
                {
                    Ok(b) => {
                        println!("{} Connected to existing browser!", "✅".green());
                        Some(b)
                    }
                    Err(e) => {
                        println!(
                            "{} Could not connect to existing browser: {}",
                            "⚠️".yellow(),
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let reuse = attached.is_some();
        let browser = match attached {
            Some(b) => b,
            None => launch_browser(&chromium, &config).await?,
        };

        let existing = if reuse {
            browser.contexts()?.into_iter().next()
        } else {
            None
        };
        let context = match existing {
            Some(ctx) => {
                println!("{} Reusing existing browser context", "♻️".green());
                ctx
            }
            None => browser.context_builder().build().await?,
        };

        let page = match context.pages().unwrap_or_default().into_iter().next() {
            Some(p) if reuse => p,
            _ => context.new_page().await?,
        };

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }
}

#[async_trait]
impl Navigate for WebDriver {
    async fn open(&self, url: &str) -> Result<String> {
        let full_url = normalize_url(url);
        let page = self.page.lock().await;
        page.goto_builder(&full_url)
            .timeout(self.config.navigation_timeout_ms as f64)
            .goto()
            .await
            .context("Failed to navigate to URL")?;
        Ok(full_url)
    }

    /// Reload the current page
    async fn reload(&self) -> Result<()> {
        let page = self.page.lock().await;
        page.reload_builder()
            .timeout(self.config.navigation_timeout_ms as f64)
            .reload()
            .await
            .context("Failed to reload page")?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for WebDriver {
    type Frame = Frame;
    type Element = ElementHandle;

    async fn main_frame(&self) -> Result<Frame, DriverError> {
        let page = self.page.lock().await;
        Ok(page.main_frame())
    }

    async fn child_frames(&self, frame: &Frame) -> Result<Vec<Frame>, DriverError> {
        frame.child_frames().map_err(driver_error)
    }

    async fn frame_info(&self, frame: &Frame) -> Result<FrameInfo, DriverError> {
        Ok(FrameInfo {
            name: frame.name().map_err(driver_error)?,
            url: frame.url().map_err(driver_error)?,
            detached: frame.is_detached().map_err(driver_error)?,
        })
    }

    async fn query_all(
        &self,
        frame: &Frame,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        frame
            .query_selector_all(&selector_string(locator))
            .await
            .map_err(driver_error)
    }

    async fn query_first(
        &self,
        frame: &Frame,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, DriverError> {
        frame
            .query_selector(&selector_string(locator))
            .await
            .map_err(driver_error)
    }

    async fn describe(
        &self,
        frame: &Frame,
        element: &ElementHandle,
    ) -> Result<RawElement, DriverError> {
        let value: serde_json::Value = frame
            .evaluate(DESCRIBE_ELEMENT, element.clone())
            .await
            .map_err(driver_error)?;
        serde_json::from_value(value)
            .map_err(|e| DriverError::Evaluation(format!("unexpected describe payload: {}", e)))
    }

    async fn draw_overlay(&self, frame: &Frame, element: &ElementHandle) -> Result<(), DriverError> {
        // Off-screen elements would get an overlay nobody can see
        element
            .scroll_into_view_if_needed(None)
            .await
            .map_err(driver_error)?;
        frame
            .evaluate::<_, ()>(DRAW_OVERLAY, element.clone())
            .await
            .map_err(driver_error)
    }

    async fn remove_overlays(&self, frame: &Frame) -> Result<(), DriverError> {
        frame
            .evaluate::<_, ()>(REMOVE_OVERLAY, ())
            .await
            .map_err(driver_error)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let page = self.page.lock().await;
        page.url().map_err(driver_error)
    }
}

/// Launch a Chromium-family browser with the executable for the chosen browser
async fn launch_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher().headless(config.headless);

    let env_path = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .map(PathBuf::from);
    let system_path = find_system_browser(config.browser);

    if let Some(ref path) = env_path {
        println!("{} Using browser from env: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else if let Some(ref path) = system_path {
        println!(
            "{} Using discovered {}: {}",
            "🌐".blue(),
            config.browser,
            path.display()
        );
        launcher = launcher.executable(path);
    } else {
        println!(
            "{} No {} executable found. Falling back to Playwright's bundled Chromium...",
            "ℹ".blue(),
            config.browser
        );
    }

    let args: Vec<String> = [
        "--disable-dev-shm-usage",
        "--ignore-certificate-errors",
        "--start-maximized",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}

fn browser_paths(browser: BrowserChoice) -> &'static [&'static str] {
    match browser {
        BrowserChoice::Edge => &[
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
            "/usr/bin/microsoft-edge",
            "/usr/bin/microsoft-edge-stable",
            "/opt/microsoft/msedge/msedge",
            "C:\\Program Files (x86)\\Microsoft\\Edge\\Application\\msedge.exe",
            "C:\\Program Files\\Microsoft\\Edge\\Application\\msedge.exe",
        ],
        BrowserChoice::Chrome => &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
            "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
        ],
        BrowserChoice::Chromium => &[
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ],
    }
}

fn find_system_browser(browser: BrowserChoice) -> Option<PathBuf> {
    browser_paths(browser)
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
