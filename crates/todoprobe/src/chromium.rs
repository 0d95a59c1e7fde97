//! Chromium adapter over the DevTools protocol (feature `browser`).
//!
//! One browser process is shared by a [`ChromiumFactory`]; every adapter it
//! creates lives in its own browser context, so scenarios running in
//! parallel never see each other's `localStorage`.

#![allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

use crate::adapter::{HarnessAdapter, Key, Target};
use crate::config::{RunnerConfig, Selectors};
use crate::model::PersistedRecord;
use crate::result::{ConformanceError, ConformanceResult};
use crate::suite::AdapterFactory;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const IS_VISIBLE_JS: &str = "function() { \
    const style = window.getComputedStyle(this); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && (this.offsetWidth > 0 || this.offsetHeight > 0 || this.getClientRects().length > 0); \
}";
const IS_CHECKED_JS: &str = "function() { return this.checked === true; }";
const SELECT_ALL_JS: &str = "function() { this.focus(); if (this.select) { this.select(); } }";
const BLUR_JS: &str = "function() { this.blur(); }";

fn cdp_err(e: impl Display) -> ConformanceError {
    ConformanceError::driver(e.to_string())
}

/// Shared Chromium process.
#[derive(Debug)]
pub struct ChromiumFactory {
    browser: Arc<Mutex<Browser>>,
    handle: tokio::task::JoinHandle<()>,
    config: RunnerConfig,
}

impl ChromiumFactory {
    /// Launch Chromium as configured
    pub async fn launch(config: RunnerConfig) -> ConformanceResult<Self> {
        let mut builder = CdpConfig::builder().request_timeout(config.navigation_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ConformanceError::BrowserLaunchError { message })?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(|e| {
            ConformanceError::BrowserLaunchError {
                message: e.to_string(),
            }
        })?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        info!(headless = config.headless, "Chromium launched");

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handle,
            config,
        })
    }

    /// Close the browser
    pub async fn close(&self) -> ConformanceResult<()> {
        let mut browser = self.browser.lock().await;
        let _ = browser.close().await.map_err(cdp_err)?;
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl AdapterFactory for ChromiumFactory {
    type Adapter = ChromiumAdapter;

    async fn create(&self) -> ConformanceResult<ChromiumAdapter> {
        let mut browser = self.browser.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(cdp_err)?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context)
            .build()
            .map_err(ConformanceError::driver)?;
        let page = browser.new_page(params).await.map_err(cdp_err)?;
        debug!("Page created in a fresh browser context");
        Ok(ChromiumAdapter::new(page, &self.config))
    }
}

/// [`HarnessAdapter`] driving one Chromium page.
#[derive(Debug, Clone)]
pub struct ChromiumAdapter {
    page: Page,
    selectors: Selectors,
    navigation_timeout: Duration,
}

impl ChromiumAdapter {
    /// Wrap an existing page
    #[must_use]
    pub fn new(page: Page, config: &RunnerConfig) -> Self {
        Self {
            page,
            selectors: config.selectors.clone(),
            navigation_timeout: config.navigation_timeout(),
        }
    }

    /// Every element matching the target
    async fn resolve_all(&self, target: Target) -> ConformanceResult<Vec<Element>> {
        let (selector, item) = self.selectors.resolve(target);
        let elements = self.page.find_elements(selector).await.map_err(cdp_err)?;
        match item {
            None => Ok(elements),
            Some((n, child)) => match elements.into_iter().nth(n) {
                None => Ok(Vec::new()),
                Some(element) if child.is_empty() => Ok(vec![element]),
                Some(element) => element.find_elements(child).await.map_err(cdp_err),
            },
        }
    }

    /// The first element matching the target
    async fn resolve(&self, target: Target) -> ConformanceResult<Element> {
        self.resolve_all(target)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConformanceError::driver(format!("element not found: {target}")))
    }

    async fn eval_bool(element: &Element, function: &str) -> ConformanceResult<bool> {
        let returns = element.call_js_fn(function, false).await.map_err(cdp_err)?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
        clicks: i64,
    ) -> ConformanceResult<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(clicks)
            .build()
            .map_err(ConformanceError::driver)?;
        let _ = self.page.execute(params).await.map_err(cdp_err)?;
        Ok(())
    }
}

#[async_trait]
impl HarnessAdapter for ChromiumAdapter {
    async fn navigate(&mut self, url: &str) -> ConformanceResult<()> {
        debug!(url, "Navigating");
        let navigation = self.page.goto(url);
        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ConformanceError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ConformanceError::NavigationError {
                url: url.to_string(),
                message: format!("timed out after {}ms", self.navigation_timeout.as_millis()),
            }),
        }
    }

    async fn reload(&mut self) -> ConformanceResult<()> {
        let _ = self.page.reload().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn go_back(&mut self) -> ConformanceResult<()> {
        let _ = self
            .page
            .evaluate("window.history.back()")
            .await
            .map_err(cdp_err)?;
        Ok(())
    }

    async fn fill_text(&mut self, target: Target, text: &str) -> ConformanceResult<()> {
        let element = self.resolve(target).await?;
        let _ = element.call_js_fn(SELECT_ALL_JS, false).await.map_err(cdp_err)?;
        if text.is_empty() {
            let _ = element.press_key(Key::Backspace.name()).await.map_err(cdp_err)?;
        } else {
            let _ = element.type_str(text).await.map_err(cdp_err)?;
        }
        Ok(())
    }

    async fn press_key(&mut self, target: Target, key: Key) -> ConformanceResult<()> {
        let element = self.resolve(target).await?;
        let _ = element.focus().await.map_err(cdp_err)?;
        let _ = element.press_key(key.name()).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn click(&mut self, target: Target) -> ConformanceResult<()> {
        let element = self.resolve(target).await?;
        let _ = element.scroll_into_view().await.map_err(cdp_err)?;
        let _ = element.click().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn double_click(&mut self, target: Target) -> ConformanceResult<()> {
        let element = self.resolve(target).await?;
        let _ = element.scroll_into_view().await.map_err(cdp_err)?;
        let point = element.clickable_point().await.map_err(cdp_err)?;
        for clicks in 1..=2 {
            self.mouse(DispatchMouseEventType::MousePressed, point.x, point.y, clicks)
                .await?;
            self.mouse(DispatchMouseEventType::MouseReleased, point.x, point.y, clicks)
                .await?;
        }
        Ok(())
    }

    async fn dispatch_blur(&mut self, target: Target) -> ConformanceResult<()> {
        let element = self.resolve(target).await?;
        let _ = element.call_js_fn(BLUR_JS, false).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn read_visible_text(&self, target: Target) -> ConformanceResult<String> {
        let element = self.resolve(target).await?;
        let text = element.inner_text().await.map_err(cdp_err)?;
        Ok(text.unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        target: Target,
        name: &str,
    ) -> ConformanceResult<Option<String>> {
        let element = self.resolve(target).await?;
        element.attribute(name).await.map_err(cdp_err)
    }

    async fn count_matches(&self, target: Target) -> ConformanceResult<usize> {
        Ok(self.resolve_all(target).await?.len())
    }

    async fn is_visible(&self, target: Target) -> ConformanceResult<bool> {
        match self.resolve_all(target).await?.first() {
            Some(element) => Self::eval_bool(element, IS_VISIBLE_JS).await,
            None => Ok(false),
        }
    }

    async fn is_checked(&self, target: Target) -> ConformanceResult<bool> {
        match self.resolve_all(target).await?.first() {
            Some(element) => Self::eval_bool(element, IS_CHECKED_JS).await,
            None => Ok(false),
        }
    }

    async fn read_persisted_snapshot(
        &self,
        key: &str,
    ) -> ConformanceResult<Vec<PersistedRecord>> {
        let expression = format!(
            "window.localStorage.getItem({})",
            serde_json::to_string(key)?
        );
        let raw: Option<String> = self
            .page
            .evaluate(expression)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(cdp_err)?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }
}
