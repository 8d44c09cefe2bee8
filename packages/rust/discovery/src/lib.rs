//! Bulletin discovery and download.
//!
//! Fetches the publisher's index page, locates the dated bulletin PDFs it
//! links to, and downloads them under a deterministic date-keyed file name
//! so that a later run (or a local `extract`) can find them again.

mod download;
mod parser;

use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;
use veglytics_shared::{BulletinRef, Result, SourceConfig, VeglyticsError};

pub use download::{DownloadedBulletin, bulletin_file_name, date_from_file_name};
pub use parser::BulletinLocator;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("Veglytics/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Runtime settings for index fetches and downloads.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Listing page URL.
    pub index_url: Url,
    /// Base relative PDF links resolve against.
    pub base_url: Url,
    /// Title phrase preceding each bulletin date.
    pub bulletin_title: String,
    /// Timeout for the index request.
    pub index_timeout: Duration,
    /// Timeout for each PDF download.
    pub download_timeout: Duration,
}

impl DiscoveryOptions {
    /// Build options from the `[source]` config section.
    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        let parse = |key: &str, value: &str| {
            Url::parse(value)
                .map_err(|e| VeglyticsError::config(format!("{key} '{value}' is not a URL: {e}")))
        };
        Ok(Self {
            index_url: parse("source.index_url", &source.index_url)?,
            base_url: parse("source.base_url", &source.base_url)?,
            bulletin_title: source.bulletin_title.clone(),
            index_timeout: Duration::from_secs(source.index_timeout_secs),
            download_timeout: Duration::from_secs(source.download_timeout_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// BulletinClient
// ---------------------------------------------------------------------------

/// HTTP client for the bulletin publisher.
#[derive(Debug, Clone)]
pub struct BulletinClient {
    client: Client,
    opts: DiscoveryOptions,
    locator: BulletinLocator,
}

impl BulletinClient {
    pub fn new(opts: DiscoveryOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| VeglyticsError::Network(format!("failed to build HTTP client: {e}")))?;
        let locator = BulletinLocator::new(&opts.bulletin_title, &opts.base_url)?;
        Ok(Self {
            client,
            opts,
            locator,
        })
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.opts
    }

    /// Fetch the raw HTML of the index page.
    #[instrument(skip_all, fields(url = %self.opts.index_url))]
    pub async fn fetch_index(&self) -> Result<String> {
        let url = self.opts.index_url.as_str();
        let response = self
            .client
            .get(url)
            .timeout(self.opts.index_timeout)
            .send()
            .await
            .map_err(|e| VeglyticsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VeglyticsError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| VeglyticsError::Network(format!("{url}: failed to read body: {e}")))
    }

    /// Fetch the index page and return the `count` newest bulletins.
    ///
    /// An empty result is not an error; the caller decides what to do.
    #[instrument(skip_all, fields(count = count))]
    pub async fn discover(&self, count: usize) -> Result<Vec<BulletinRef>> {
        let html = self.fetch_index().await?;
        let bulletins = self.locator.locate(&html, count);
        if bulletins.is_empty() {
            warn!("no bulletin links found on index page");
        } else {
            info!(
                found = bulletins.len(),
                newest = %bulletins[0].date_label(),
                "bulletins discovered"
            );
        }
        Ok(bulletins)
    }
}
