pub mod browser;
pub mod extractor;


use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use ureq::Agent;
use url::Url;

use self::browser::{BrowserClient, BrowserConfig};
use self::extractor::extract_relevant_text;
use crate::config::ConfigError;

/// Configuration for the page scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Hosts that may be fetched; subdomains of an entry are allowed too
    pub allowed_domains: Vec<String>,
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Rate limit delay between requests in milliseconds
    pub rate_limit_ms: u64,
    /// Configuration for browser-based rendering
    pub browser: BrowserConfig,
}

impl Default for CrawlerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            allowed_domains: vec![
                "bankofmaharashtra.in".to_string(),
                "bankofmaharashtra.co.in".to_string(),
                "bankofmaharashtra.bank.in".to_string(),
            ],
            user_agent: "Mozilla/5.0 (compatible; Bot/1.0)".to_string(),
            timeout_seconds: 20,
            rate_limit_ms: 250,
            browser: BrowserConfig::default(),
        }
    }
}

impl CrawlerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::NoAllowedDomains);
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        self.browser.validate()
    }

    /// Whether `url` points at an allowed host
    #[inline]
    pub fn is_allowed(&self, url: &Url) -> bool {
        domain_allowed(url, &self.allowed_domains)
    }
}

/// HTTP client wrapper with rate limiting. Each URL gets a single attempt.
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    rate_limit: Duration,
    last_request_time: Option<Instant>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    #[inline]
    pub fn new(config: &CrawlerConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            last_request_time: None,
        }
    }

    /// Fetch a page body, failing on transport errors and non-2xx statuses
    #[inline]
    pub async fn get(&mut self, url: &str) -> Result<String> {
        self.apply_rate_limit().await;

        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => {
                let text = response
                    .body_mut()
                    .read_to_string()
                    .with_context(|| format!("Failed to read response body from {}", url))?;
                debug!("Successfully read {} bytes from {}", text.len(), url);
                Ok(text)
            }
            Err(ureq::Error::StatusCode(status)) => {
                debug!("HTTP request failed with status {}: {}", status, url);
                Err(anyhow!("HTTP error {}", status))
            }
            Err(e) => {
                debug!("HTTP request failed with transport error: {}", e);
                Err(anyhow::Error::from(e))
                    .with_context(|| format!("Failed to make HTTP request to {}", url))
            }
        }
    }

    /// Apply rate limiting by sleeping if necessary
    async fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();

            if elapsed < self.rate_limit {
                let sleep_duration = self.rate_limit - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                sleep(sleep_duration).await;
            }
        }

        self.last_request_time = Some(Instant::now());
    }
}

/// Validate and normalize a URL
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// True when the host equals an allowed domain or is a subdomain of one
#[inline]
pub fn domain_allowed(url: &Url, allowed_domains: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    allowed_domains.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    })
}

/// Output file name for a page: the URL minus its scheme with path and query
/// separators flattened
#[inline]
pub fn safe_file_name(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let flattened: String = without_scheme
        .chars()
        .map(|c| match c {
            '/' | '?' | ':' => '_',
            other => other,
        })
        .collect();

    format!("{}.txt", flattened)
}

/// Read a newline-delimited URL list, dropping blank lines
#[inline]
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// Outcome of a scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    /// Files written, in input order
    pub written: Vec<PathBuf>,
    /// URLs rejected as invalid or outside the allowlist
    pub skipped: Vec<String>,
    /// URLs that could not be fetched
    pub failed: Vec<String>,
}

/// Fetches listed pages and stores their relevant text
pub struct PageScraper {
    http_client: HttpClient,
    browser_client: Option<BrowserClient>,
    config: CrawlerConfig,
}

impl PageScraper {
    /// Create a scraper; `use_browser` enables the headless browser fallback
    #[inline]
    pub fn new(config: CrawlerConfig, use_browser: bool) -> Self {
        let browser_client = use_browser.then(|| {
            BrowserClient::new(config.browser.clone()).with_user_agent(&config.user_agent)
        });

        Self {
            http_client: HttpClient::new(&config),
            browser_client,
            config,
        }
    }

    /// Scrape each URL in order, writing one text file per fetched page
    #[inline]
    pub async fn scrape(&mut self, urls: &[String], out_dir: &Path) -> Result<ScrapeReport> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(urls.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Scraping {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut report = ScrapeReport::default();

        for raw in urls {
            let url_str = raw.trim();
            if url_str.is_empty() {
                continue;
            }
            bar.set_message(url_str.to_string());

            let url = match validate_url(url_str) {
                Ok(url) if self.config.is_allowed(&url) => url,
                Ok(_) => {
                    info!("Skipping URL outside allowed domains: {}", url_str);
                    report.skipped.push(url_str.to_string());
                    bar.inc(1);
                    continue;
                }
                Err(e) => {
                    info!("Skipping invalid URL {}: {:#}", url_str, e);
                    report.skipped.push(url_str.to_string());
                    bar.inc(1);
                    continue;
                }
            };

            let Some(html) = self.fetch(&url).await else {
                report.failed.push(url_str.to_string());
                bar.inc(1);
                continue;
            };

            let content = extract_relevant_text(&html);
            let path = out_dir.join(safe_file_name(url_str));
            fs::write(&path, content)
                .with_context(|| format!("Failed to write page text: {}", path.display()))?;
            debug!("Wrote {}", path.display());

            report.written.push(path);
            bar.inc(1);
        }

        bar.finish_and_clear();
        info!(
            "Scrape finished: {} written, {} skipped, {} failed",
            report.written.len(),
            report.skipped.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Plain HTTP first, then the browser when enabled
    async fn fetch(&mut self, url: &Url) -> Option<String> {
        let http_error = match self.http_client.get(url.as_str()).await {
            Ok(html) => return Some(html),
            Err(e) => e,
        };
        warn!("HTTP fetch failed for {}: {:#}", url, http_error);

        let browser = self.browser_client.as_ref()?;
        match browser.render_page(url).await {
            Ok(html) => {
                info!("Rendered {} with headless browser", url);
                Some(html)
            }
            Err(e) => {
                error!("Browser rendering failed for {}: {:#}", url, e);
                None
            }
        }
    }
}
