use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{HoundError, Result};
use crate::domain::Polarity;

/// Where the product, search and review pages live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.com".to_string(),
        }
    }
}

impl SiteConfig {
    fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    fn with_path(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| HoundError::Config(format!("base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Search results for `keyword`, ranked by popularity
    pub fn search_url(&self, keyword: &str) -> Result<Url> {
        let mut url = self.with_path(&["s"])?;
        url.query_pairs_mut()
            .append_pair("k", keyword)
            .append_pair("s", "exact-aware-popularity-rank");
        Ok(url)
    }

    pub fn product_url(&self, asin: &str) -> Result<Url> {
        self.with_path(&["dp", asin])
    }

    /// Most recent reviews of one polarity, one listing page at a time
    pub fn reviews_url(&self, asin: &str, polarity: Polarity, page: u32) -> Result<Url> {
        let mut url = self.with_path(&["product-reviews", asin, ""])?;
        url.query_pairs_mut()
            .append_pair("sortBy", "recent")
            .append_pair("filterByStar", polarity.as_str())
            .append_pair("pageNumber", &page.to_string());
        Ok(url)
    }
}

/// Budgets, timeouts and pacing for one scrape job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on concurrently open browsers (default: 3)
    pub max_drivers: usize,

    /// Competitors kept after discovery (default: 5)
    pub competitor_limit: usize,

    /// Survivors taken before deduplication (default: 6)
    pub discovery_over_fetch: usize,

    /// Reviews collected per identifier and polarity
    pub critical_target: usize,
    pub positive_target: usize,

    pub search_nav_timeout_secs: u64,
    pub search_wait_timeout_secs: u64,
    pub detail_nav_timeout_secs: u64,
    pub title_wait_timeout_secs: u64,
    pub review_nav_timeout_secs: u64,

    pub discovery_attempts: u32,
    pub description_attempts: u32,
    pub description_backoff_ms: u64,

    /// Consecutive empty review pages tolerated before giving up (default: 3)
    pub empty_page_budget: u32,

    /// Delay between review page fetches: base per polarity plus jitter
    pub critical_pacing_ms: u64,
    pub positive_pacing_ms: u64,
    pub pacing_jitter_ms: u64,

    /// Pause after each listing navigation before reading the DOM
    pub settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_drivers: 3,
            competitor_limit: 5,
            discovery_over_fetch: 6,
            critical_target: 50,
            positive_target: 50,
            search_nav_timeout_secs: 60,
            search_wait_timeout_secs: 30,
            detail_nav_timeout_secs: 45,
            title_wait_timeout_secs: 15,
            review_nav_timeout_secs: 30,
            discovery_attempts: 3,
            description_attempts: 2,
            description_backoff_ms: 3000,
            empty_page_budget: 3,
            critical_pacing_ms: 1000,
            positive_pacing_ms: 1500,
            pacing_jitter_ms: 1000,
            settle_ms: 1000,
        }
    }
}

impl PipelineConfig {
    /// No pacing or backoff; for tests and local fixtures
    pub fn immediate() -> Self {
        Self {
            description_backoff_ms: 0,
            critical_pacing_ms: 0,
            positive_pacing_ms: 0,
            pacing_jitter_ms: 0,
            settle_ms: 0,
            ..Default::default()
        }
    }

    pub fn target(&self, polarity: Polarity) -> usize {
        match polarity {
            Polarity::Critical => self.critical_target,
            Polarity::Positive => self.positive_target,
        }
    }

    /// Randomized delay before the next review page
    pub fn pacing(&self, polarity: Polarity) -> Duration {
        let base = match polarity {
            Polarity::Critical => self.critical_pacing_ms,
            Polarity::Positive => self.positive_pacing_ms,
        };
        let jitter = if self.pacing_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..self.pacing_jitter_ms)
        };
        Duration::from_millis(base + jitter)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn search_nav_timeout(&self) -> Duration {
        Duration::from_secs(self.search_nav_timeout_secs)
    }

    pub fn search_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.search_wait_timeout_secs)
    }

    pub fn detail_nav_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_nav_timeout_secs)
    }

    pub fn title_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.title_wait_timeout_secs)
    }

    pub fn review_nav_timeout(&self) -> Duration {
        Duration::from_secs(self.review_nav_timeout_secs)
    }

    pub fn description_backoff(&self) -> Duration {
        Duration::from_millis(self.description_backoff_ms)
    }
}
