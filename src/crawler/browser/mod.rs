
use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ConfigError;

/// Configuration for the headless browser fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Timeout for page navigation in seconds
    pub navigation_timeout_seconds: u64,
    /// Time to let scripts run after the body appears, in milliseconds
    pub settle_millis: u64,
    /// Whether to run the browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Additional Chrome arguments
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    #[inline]
    fn default() -> Self {
        Self {
            navigation_timeout_seconds: 15,
            settle_millis: 2000,
            headless: true,
            window_width: 1280,
            window_height: 720,
            chrome_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.navigation_timeout_seconds == 0 || self.navigation_timeout_seconds > 300 {
            return Err(ConfigError::InvalidBrowserTimeout(
                self.navigation_timeout_seconds,
            ));
        }

        if !(100..=4000).contains(&self.window_width) || !(100..=4000).contains(&self.window_height)
        {
            return Err(ConfigError::InvalidWindowDimensions(
                self.window_width,
                self.window_height,
            ));
        }

        Ok(())
    }

    fn launch_options(&self) -> LaunchOptions<'_> {
        LaunchOptions {
            headless: self.headless,
            window_size: Some((self.window_width, self.window_height)),
            args: self.chrome_args.iter().map(OsStr::new).collect(),
            ..Default::default()
        }
    }
}

/// Renders pages in a short-lived Chrome instance
#[derive(Debug, Clone)]
pub struct BrowserClient {
    config: BrowserConfig,
    user_agent: Option<String>,
}

impl BrowserClient {
    #[inline]
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            user_agent: None,
        }
    }

    #[inline]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Navigate to `url`, wait for the body, let scripts settle and return the DOM
    #[inline]
    pub async fn render_page(&self, url: &Url) -> Result<String> {
        debug!("Launching browser to render {}", url);

        let browser =
            Browser::new(self.config.launch_options()).context("Failed to launch browser")?;
        let tab = browser.new_tab().context("Failed to create new browser tab")?;
        tab.set_default_timeout(Duration::from_secs(self.config.navigation_timeout_seconds));

        if let Some(user_agent) = &self.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .context("Failed to set user agent")?;
        }

        tab.navigate_to(url.as_str())
            .with_context(|| format!("Failed to navigate to {}", url))?;
        tab.wait_until_navigated()
            .with_context(|| format!("Navigation to {} did not complete", url))?;

        if let Err(e) = tab.wait_for_element("body") {
            warn!("Failed to wait for body element: {}", e);
        }

        tokio::time::sleep(Duration::from_millis(self.config.settle_millis)).await;

        let content = tab.get_content().context("Failed to get page content")?;
        debug!("Rendered {} bytes from {}", content.len(), url);

        Ok(content)
    }
}
