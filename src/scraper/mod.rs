//! Browser automation for the product, search and review pages.
//!
//! Each [`Driver`] owns one isolated browser with its own fingerprint and a
//! copy of the captured session. Pipeline stages talk to the [`Page`] trait
//! only, so everything above this module runs against a scripted page in
//! tests.
//!
//! # Architecture
//!
//! ```text
//! DriverFactory → Driver { Page, Humanizer, SessionStore } → pipeline stages
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use reviewhound::scraper::{ChromeDriverFactory, DriverConfig, DriverFactory};
//!
//! let factory = ChromeDriverFactory::new(DriverConfig::default(), Some(session));
//! let driver = factory.acquire().await?;
//! driver.goto("https://www.amazon.com/dp/B000000001", timeout).await?;
//! driver.close().await?;
//! ```

mod chrome;
mod config;
mod driver;
mod extractor;
mod fingerprint;
mod humanize;
pub mod selectors;

#[cfg(test)]
pub(crate) mod fake;

pub use chrome::{ChromeDriverFactory, ChromePage};
pub use config::DriverConfig;
pub use driver::{Driver, DriverFactory};
pub use extractor::DomExtractor;
pub use fingerprint::Fingerprint;
pub use humanize::{Humanizer, NoopHumanizer, PointerHumanizer};

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::RawReview;
use crate::session::SessionCookie;

/// A single browser tab.
///
/// Calls on one page are issued sequentially by its owner; implementations
/// only need to be `Sync` so the page can sit behind a shared reference.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the load event, failing with a timeout error
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Poll until `selector` matches at least one element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn attribute_all(&self, selector: &str, attribute: &str) -> Result<Vec<String>>;
    async fn text_first(&self, selector: &str) -> Result<Option<String>>;
    async fn text_all(&self, selector: &str) -> Result<Vec<String>>;
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Raw fields of every review element on the current page
    async fn review_elements(&self) -> Result<Vec<RawReview>>;

    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    /// Inject cookies, returning how many were accepted
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<usize>;

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()>;
    async fn scroll_by(&self, dy: f64) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
