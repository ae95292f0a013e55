//! Paginated review harvesting for one identifier and polarity.
//!
//! ```text
//! Init → CountCheck → Extract ⇄ PageFetch → Done(StopReason)
//! ```
//!
//! The first listing page is loaded by the count check and extracted
//! without a second navigation. An empty extraction re-fetches the same
//! page; a non-empty one advances only while a next-page control exists.

use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::{parse_review_count, Polarity, ReviewRecord};
use crate::pipeline::{PipelineConfig, SiteConfig};
use crate::scraper::{selectors, Driver};

/// Why a harvest ended. None of these is an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Target was zero; nothing was fetched
    NothingRequested,
    /// The listing reported no matching reviews
    NoMatches,
    TargetReached,
    /// Collected as many as the listing reported
    ReportedCountReached,
    /// No next-page control
    Exhausted,
    /// Too many consecutive empty extractions
    AttemptBudgetExceeded,
    /// Navigation or evaluation failed; partial results kept
    Failed,
}

#[derive(Debug)]
pub struct Harvest {
    pub reviews: Vec<ReviewRecord>,
    /// Total shown by the listing's match-count indicator
    pub reported: u32,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CountCheck,
    PageFetch { page: u32 },
    Extract { page: u32 },
    Advance { page: u32 },
    Done(StopReason),
}

struct Harvester<'a> {
    driver: &'a Driver,
    site: &'a SiteConfig,
    config: &'a PipelineConfig,
    asin: &'a str,
    polarity: Polarity,
    target: usize,
    reviews: Vec<ReviewRecord>,
    reported: u32,
    empty_attempts: u32,
}

/// Collect at most `target` reviews of `polarity` for `asin`.
///
/// Never fails: any navigation or evaluation error ends the harvest with
/// whatever was accumulated.
pub async fn harvest(
    driver: &Driver,
    site: &SiteConfig,
    config: &PipelineConfig,
    asin: &str,
    polarity: Polarity,
    target: usize,
) -> Harvest {
    let mut harvester = Harvester {
        driver,
        site,
        config,
        asin,
        polarity,
        target,
        reviews: Vec::new(),
        reported: 0,
        empty_attempts: 0,
    };

    let stop = harvester.run().await;

    let mut reviews = harvester.reviews;
    reviews.truncate(target);
    info!(
        "Harvested {} {} reviews for {} ({:?})",
        reviews.len(),
        polarity,
        asin,
        stop
    );

    Harvest {
        reviews,
        reported: harvester.reported,
        stop,
    }
}

impl Harvester<'_> {
    async fn run(&mut self) -> StopReason {
        let mut state = State::Init;
        loop {
            debug!("{} {} harvest: {:?}", self.asin, self.polarity, state);
            state = match state {
                State::Init if self.target == 0 => State::Done(StopReason::NothingRequested),
                State::Init => State::CountCheck,
                State::CountCheck => self.count_check().await,
                State::PageFetch { page } => self.page_fetch(page).await,
                State::Extract { page } => self.extract(page).await,
                State::Advance { page } => self.advance(page).await,
                State::Done(stop) => return stop,
            };
        }
    }

    fn failed(&self, during: &str, e: impl std::fmt::Display) -> State {
        warn!(
            "{} {} harvest stopped during {}: {}",
            self.asin, self.polarity, during, e
        );
        State::Done(StopReason::Failed)
    }

    async fn load(&self, page: u32) -> Result<()> {
        let url = self.site.reviews_url(self.asin, self.polarity, page)?;
        self.driver
            .goto(url.as_str(), self.config.review_nav_timeout())
            .await?;
        tokio::time::sleep(self.config.settle()).await;
        Ok(())
    }

    async fn count_check(&mut self) -> State {
        if let Err(e) = self.load(1).await {
            return self.failed("count check", e);
        }

        let text = match self.driver.page().text_first(selectors::REVIEW_COUNT).await {
            Ok(text) => text,
            Err(e) => return self.failed("count check", e),
        };

        self.reported = text.as_deref().map(parse_review_count).unwrap_or(0);
        if self.reported == 0 {
            info!(
                "No {} reviews for {} ({:?})",
                self.polarity,
                self.asin,
                text.unwrap_or_default()
            );
            return State::Done(StopReason::NoMatches);
        }

        info!(
            "{} reports {} {} reviews",
            self.asin, self.reported, self.polarity
        );
        State::Extract { page: 1 }
    }

    async fn page_fetch(&mut self, page: u32) -> State {
        tokio::time::sleep(self.config.pacing(self.polarity)).await;
        match self.load(page).await {
            Ok(()) => State::Extract { page },
            Err(e) => self.failed("page fetch", e),
        }
    }

    async fn extract(&mut self, page: u32) -> State {
        let raw = match self.driver.page().review_elements().await {
            Ok(raw) => raw,
            Err(e) => return self.failed("extraction", e),
        };

        if raw.is_empty() {
            self.empty_attempts += 1;
            let budget = self.config.empty_page_budget.max(1);
            if self.empty_attempts >= budget {
                info!(
                    "{} {} page {} empty {} times, giving up",
                    self.asin, self.polarity, page, self.empty_attempts
                );
                return State::Done(StopReason::AttemptBudgetExceeded);
            }
            debug!(
                "{} {} page {} empty (attempt {}/{})",
                self.asin, self.polarity, page, self.empty_attempts, budget
            );
            return State::PageFetch { page };
        }

        self.empty_attempts = 0;
        let found = raw.len();
        self.reviews.extend(
            raw.into_iter()
                .map(|r| ReviewRecord::from_raw(r, self.asin, self.polarity)),
        );
        debug!(
            "{} {} page {}: {} reviews, {} total",
            self.asin,
            self.polarity,
            page,
            found,
            self.reviews.len()
        );
        State::Advance { page }
    }

    async fn advance(&mut self, page: u32) -> State {
        if self.reviews.len() >= self.target {
            return State::Done(StopReason::TargetReached);
        }
        if self.reviews.len() >= self.reported as usize {
            return State::Done(StopReason::ReportedCountReached);
        }

        match self.driver.page().exists(selectors::NEXT_PAGE).await {
            Ok(true) => State::PageFetch { page: page + 1 },
            Ok(false) => {
                info!(
                    "No more {} review pages for {} after page {}",
                    self.polarity, self.asin, page
                );
                State::Done(StopReason::Exhausted)
            }
            Err(e) => self.failed("pagination check", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::fake::{FakeDocument, FakePage};

    const ASIN: &str = "B000000001";

    fn listing(page: u32) -> String {
        format!("filterByStar=critical&pageNumber={}", page)
    }

    async fn run(page: FakePage, target: usize) -> (Harvest, Vec<String>) {
        let driver = Driver::new(0, Box::new(page.clone()));
        let result = harvest(
            &driver,
            &SiteConfig::default(),
            &PipelineConfig::immediate(),
            ASIN,
            Polarity::Critical,
            target,
        )
        .await;
        (result, page.navigations())
    }

    #[tokio::test]
    async fn test_zero_matches_stops_after_listing_page() {
        let page = FakePage::new().route(
            &listing(1),
            FakeDocument::reviews("No matching customer reviews", 0, 0, false),
        );
        let (result, navs) = run(page, 50).await;

        assert!(result.reviews.is_empty());
        assert_eq!(result.stop, StopReason::NoMatches);
        assert_eq!(navs.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_indicator_counts_as_zero() {
        let (result, navs) = run(FakePage::new(), 50).await;
        assert_eq!(result.stop, StopReason::NoMatches);
        assert_eq!(navs.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_target_fetches_nothing() {
        let page = FakePage::new().route(
            &listing(1),
            FakeDocument::reviews("40 matching customer reviews", 0, 10, true),
        );
        let (result, navs) = run(page, 0).await;

        assert!(result.reviews.is_empty());
        assert_eq!(result.stop, StopReason::NothingRequested);
        assert!(navs.is_empty());
    }

    #[tokio::test]
    async fn test_twelve_reviews_across_two_pages() {
        let page = FakePage::new()
            .route(
                &listing(1),
                FakeDocument::reviews("12 matching customer reviews", 0, 10, true),
            )
            .route(
                &listing(2),
                FakeDocument::reviews("12 matching customer reviews", 10, 2, false),
            );
        let (result, navs) = run(page, 30).await;

        assert_eq!(result.reviews.len(), 12);
        assert_eq!(result.reported, 12);
        assert_eq!(navs.len(), 2);
        assert!(navs[1].ends_with("pageNumber=2"));
    }

    #[tokio::test]
    async fn test_missing_next_control_exhausts() {
        let page = FakePage::new().route(
            &listing(1),
            FakeDocument::reviews("1,234 matching customer reviews", 0, 10, false),
        );
        let (result, navs) = run(page, 30).await;

        assert_eq!(result.reviews.len(), 10);
        assert_eq!(result.reported, 1234);
        assert_eq!(result.stop, StopReason::Exhausted);
        assert_eq!(navs.len(), 1);
    }

    #[tokio::test]
    async fn test_last_page_overshoot_is_truncated() {
        let page = FakePage::new()
            .route(
                &listing(1),
                FakeDocument::reviews("100 matching customer reviews", 0, 10, true),
            )
            .route(
                &listing(2),
                FakeDocument::reviews("100 matching customer reviews", 10, 10, true),
            );
        let (result, navs) = run(page, 15).await;

        assert_eq!(result.reviews.len(), 15);
        assert_eq!(result.stop, StopReason::TargetReached);
        assert_eq!(navs.len(), 2);
        assert_eq!(result.reviews[14].review_id, "R0014");
    }

    #[tokio::test]
    async fn test_empty_pages_exceed_budget() {
        let page = FakePage::new().route(
            &listing(1),
            FakeDocument::reviews("40 matching customer reviews", 0, 0, true),
        );
        let (result, navs) = run(page, 30).await;

        assert!(result.reviews.is_empty());
        assert_eq!(result.stop, StopReason::AttemptBudgetExceeded);
        // count check plus two re-fetches of page 1
        assert_eq!(navs.len(), 3);
        assert!(navs.iter().all(|u| u.ends_with("pageNumber=1")));
    }

    #[tokio::test]
    async fn test_empty_page_retries_same_page_then_recovers() {
        let page = FakePage::new()
            .route(
                &listing(1),
                FakeDocument::reviews("12 matching customer reviews", 0, 10, true),
            )
            .route(
                &listing(2),
                FakeDocument::reviews("12 matching customer reviews", 10, 2, false),
            )
            .empty_reads(&listing(2), 2);
        let (result, navs) = run(page, 30).await;

        assert_eq!(result.reviews.len(), 12);
        assert_eq!(navs.len(), 4);
        assert_eq!(navs.iter().filter(|u| u.ends_with("pageNumber=2")).count(), 3);
    }

    #[tokio::test]
    async fn test_navigation_failure_keeps_partial_results() {
        let page = FakePage::new()
            .route(
                &listing(1),
                FakeDocument::reviews("100 matching customer reviews", 0, 10, true),
            )
            .unreachable(&listing(2));
        let (result, _) = run(page, 30).await;

        assert_eq!(result.reviews.len(), 10);
        assert_eq!(result.stop, StopReason::Failed);
    }

    #[tokio::test]
    async fn test_count_check_failure_is_empty() {
        let page = FakePage::new().unreachable("product-reviews");
        let (result, _) = run(page, 30).await;
        assert!(result.reviews.is_empty());
        assert_eq!(result.stop, StopReason::Failed);
    }

    #[tokio::test]
    async fn test_records_are_tagged() {
        let page = FakePage::new().route(
            &listing(1),
            FakeDocument::reviews("3 matching customer reviews", 0, 3, false),
        );
        let (result, _) = run(page, 30).await;

        assert_eq!(result.stop, StopReason::ReportedCountReached);
        for review in &result.reviews {
            assert_eq!(review.asin, ASIN);
            assert_eq!(review.polarity, Polarity::Critical);
            assert_eq!(review.rating, Some(4.0));
            assert_eq!(review.country.as_deref(), Some("United States"));
        }
    }
}
