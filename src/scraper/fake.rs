//! Scripted page used by the pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{HoundError, Result};
use crate::domain::RawReview;
use crate::scraper::{selectors, Page};
use crate::session::SessionCookie;

/// What the fake renders for every URL containing a route pattern.
#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub asins: Vec<String>,
    pub title: Option<String>,
    pub bullets: Vec<String>,
    pub count_text: Option<String>,
    pub reviews: Vec<RawReview>,
    pub has_next: bool,
    pub greeting: Option<String>,
}

impl FakeDocument {
    pub fn search(asins: &[&str]) -> Self {
        Self {
            asins: asins.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn product(title: &str, bullets: &[&str]) -> Self {
        Self {
            title: Some(title.to_string()),
            bullets: bullets.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// A review listing page with `count` reviews whose ids start at `first`
    pub fn reviews(count_text: &str, first: usize, count: usize, has_next: bool) -> Self {
        Self {
            count_text: Some(count_text.to_string()),
            reviews: (first..first + count).map(raw_review).collect(),
            has_next,
            ..Default::default()
        }
    }

    fn matches(&self, selector: &str) -> bool {
        match selector {
            selectors::SEARCH_RESULT => !self.asins.is_empty(),
            selectors::PRODUCT_TITLE => self.title.is_some(),
            selectors::FEATURE_BULLETS => !self.bullets.is_empty(),
            selectors::REVIEW_COUNT => self.count_text.is_some(),
            selectors::REVIEW => !self.reviews.is_empty(),
            selectors::NEXT_PAGE => self.has_next,
            selectors::ACCOUNT_GREETING => self.greeting.is_some(),
            _ => false,
        }
    }
}

pub fn raw_review(n: usize) -> RawReview {
    RawReview {
        id: Some(format!("R{:04}", n)),
        title_spans: vec!["4.0 out of 5 stars".into(), format!("Review {}", n)],
        body_span: Some(format!("Body of review {}", n)),
        rating_text: Some("4.0 out of 5 stars".into()),
        date_text: Some("Reviewed in the United States on March 3, 2024".into()),
        verified: n % 2 == 0,
        vote_texts: vec![format!("{} people found this helpful", n)],
        ..Default::default()
    }
}

#[derive(Default)]
struct FakeState {
    current: Option<String>,
    navigations: Vec<String>,
    cookies: Vec<SessionCookie>,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<Vec<(String, FakeDocument)>>,
    unreachable: Mutex<Vec<String>>,
    failing_waits: Mutex<HashMap<String, u32>>,
    empty_reads: Mutex<HashMap<String, u32>>,
    state: Mutex<FakeState>,
    gestures: AtomicUsize,
    closed: Arc<AtomicBool>,
}

/// In-memory [`Page`] driven by substring routes. The longest matching
/// pattern wins; unmatched URLs render an empty document.
///
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Clone, Default)]
pub struct FakePage {
    inner: Arc<Inner>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, document: FakeDocument) -> Self {
        lock(&self.inner.routes).push((pattern.to_string(), document));
        self
    }

    /// Navigation to matching URLs fails
    pub fn unreachable(self, pattern: &str) -> Self {
        lock(&self.inner.unreachable).push(pattern.to_string());
        self
    }

    /// The next `times` selector waits on matching URLs time out
    pub fn fail_waits(self, pattern: &str, times: u32) -> Self {
        lock(&self.inner.failing_waits).insert(pattern.to_string(), times);
        self
    }

    /// The next `times` review reads on matching URLs come back empty
    pub fn empty_reads(self, pattern: &str, times: u32) -> Self {
        lock(&self.inner.empty_reads).insert(pattern.to_string(), times);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        lock(&self.inner.state).navigations.clone()
    }

    pub fn navigation_count(&self) -> usize {
        lock(&self.inner.state).navigations.len()
    }

    pub fn gestures(&self) -> usize {
        self.inner.gestures.load(Ordering::SeqCst)
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.inner.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn current_url(&self) -> String {
        lock(&self.inner.state).current.clone().unwrap_or_default()
    }

    fn document(&self) -> FakeDocument {
        let url = self.current_url();
        let routes = lock(&self.inner.routes);
        routes
            .iter()
            .filter(|(pattern, _)| url.contains(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, doc)| doc.clone())
            .unwrap_or_default()
    }

    /// Consume one scripted failure for the current URL, if any remain
    fn take_failure(&self, table: &Mutex<HashMap<String, u32>>) -> bool {
        let url = self.current_url();
        let mut table = lock(table);
        for (pattern, remaining) in table.iter_mut() {
            if url.contains(pattern.as_str()) && *remaining > 0 {
                *remaining -= 1;
                return true;
            }
        }
        false
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        let unreachable = lock(&self.inner.unreachable)
            .iter()
            .any(|p| url.contains(p.as_str()));

        let mut state = lock(&self.inner.state);
        state.navigations.push(url.to_string());

        if unreachable {
            state.current = None;
            return Err(HoundError::Browser(format!(
                "net::ERR_CONNECTION_REFUSED at {}",
                url
            )));
        }
        state.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.take_failure(&self.inner.failing_waits) || !self.document().matches(selector) {
            return Err(HoundError::timeout(selector, timeout));
        }
        Ok(())
    }

    async fn attribute_all(&self, selector: &str, _attribute: &str) -> Result<Vec<String>> {
        if selector == selectors::SEARCH_RESULT {
            return Ok(self.document().asins);
        }
        Ok(Vec::new())
    }

    async fn text_first(&self, selector: &str) -> Result<Option<String>> {
        let doc = self.document();
        Ok(match selector {
            selectors::PRODUCT_TITLE => doc.title,
            selectors::REVIEW_COUNT => doc.count_text,
            selectors::ACCOUNT_GREETING => doc.greeting,
            selectors::FEATURE_BULLETS => doc.bullets.into_iter().next(),
            _ => None,
        })
    }

    async fn text_all(&self, selector: &str) -> Result<Vec<String>> {
        if selector == selectors::FEATURE_BULLETS {
            return Ok(self.document().bullets);
        }
        Ok(self.text_first(selector).await?.into_iter().collect())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.document().matches(selector))
    }

    async fn review_elements(&self) -> Result<Vec<RawReview>> {
        if self.take_failure(&self.inner.empty_reads) {
            return Ok(Vec::new());
        }
        Ok(self.document().reviews)
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(lock(&self.inner.state).cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<usize> {
        lock(&self.inner.state).cookies.extend_from_slice(cookies);
        Ok(cookies.len())
    }

    async fn move_pointer(&self, _x: f64, _y: f64) -> Result<()> {
        self.inner.gestures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_by(&self, _dy: f64) -> Result<()> {
        self.inner.gestures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
