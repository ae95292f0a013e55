use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::app::{HoundError, Result};
use crate::domain::{
    Corpus, IdentifierOutcome, Polarity, ProductDescription, ProductReviews, ReviewRecord,
    ScrapeJob, SearchResult,
};
use crate::pipeline::description::describe;
use crate::pipeline::discovery::discover;
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::reviews::harvest;
use crate::pipeline::{PipelineConfig, SiteConfig};
use crate::scraper::{Driver, DriverFactory};
use crate::store::Store;

pub const MISSING_INPUT: &str = "Both keyword and asin are required";

/// Resolves a (keyword, identifier) pair into a corpus, from the store when
/// possible and by scraping otherwise.
pub struct Orchestrator {
    store: Arc<dyn Store + Send + Sync>,
    factory: Arc<dyn DriverFactory>,
    site: SiteConfig,
    config: PipelineConfig,
    refresh_session: bool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        factory: Arc<dyn DriverFactory>,
        site: SiteConfig,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            factory,
            site,
            config,
            refresh_session: true,
        }
    }

    /// Save each driver's cookies after every identifier (default: on)
    pub fn with_session_refresh(mut self, enabled: bool) -> Self {
        self.refresh_session = enabled;
        self
    }

    pub async fn scrape(&self, keyword: &str, asin: &str) -> Result<Corpus> {
        let keyword = keyword.trim();
        let asin = asin.trim();
        if keyword.is_empty() || asin.is_empty() {
            return Err(HoundError::InvalidInput(MISSING_INPUT.to_string()));
        }

        if let Some(snapshot) = self.store.lookup_job(keyword, asin)? {
            info!("Cache hit for {:?} / {}", keyword, asin);
            return Ok(snapshot.into());
        }
        let known = self.store.get_search_result(keyword, asin)?;
        if known.is_some() {
            info!("Stored job for {:?} / {} is incomplete, refilling", keyword, asin);
        } else {
            info!("Cache miss for {:?} / {}, scraping", keyword, asin);
        }

        let mut drivers = vec![self.factory.acquire().await?];
        let result = self.scrape_with(keyword, asin, known, &mut drivers).await;
        release(&drivers).await;

        if let Err(ref e) = result {
            error!("Scrape of {:?} / {} failed: {}", keyword, asin, e);
        }
        result
    }

    async fn scrape_with(
        &self,
        keyword: &str,
        asin: &str,
        known: Option<SearchResult>,
        drivers: &mut Vec<Driver>,
    ) -> Result<Corpus> {
        let search = match known {
            Some(search) => search,
            None => {
                let competitors =
                    discover(&drivers[0], &self.site, &self.config, keyword, asin).await?;
                let search = SearchResult::new(keyword, asin, competitors);
                if !self.store.insert_search_result(&search)? {
                    debug!("Search result for {:?} / {} already stored", keyword, asin);
                }
                search
            }
        };

        let mut job = ScrapeJob::new(search);
        let identifiers = job.identifiers().to_vec();

        let wanted = identifiers.len().min(self.config.max_drivers).max(1);
        self.acquire_more(drivers, wanted).await;

        let drivers: &[Driver] = drivers;
        let pool = WorkerPool::new(drivers.len());
        info!(
            "Processing {} identifiers on {} workers",
            identifiers.len(),
            pool.workers()
        );
        let outcomes = pool
            .run(identifiers, |worker, id| async move {
                let driver = &drivers[worker];
                let outcome = self.process(driver, &id).await;
                if self.refresh_session {
                    driver.refresh_session().await;
                }
                self.persist(&outcome)?;
                Ok::<_, HoundError>(outcome)
            })
            .await;

        for outcome in outcomes {
            job.record(outcome?);
        }
        Ok(job.into_corpus())
    }

    /// Top up to `wanted` drivers; extra drivers that fail to start are skipped
    async fn acquire_more(&self, drivers: &mut Vec<Driver>, wanted: usize) {
        let missing = wanted.saturating_sub(drivers.len());
        let launched = join_all((0..missing).map(|_| self.factory.acquire())).await;
        for result in launched {
            match result {
                Ok(driver) => drivers.push(driver),
                Err(e) => warn!("Could not start an extra driver, continuing with fewer: {}", e),
            }
        }
    }

    /// Description, then critical reviews, then positive reviews, on one page
    async fn process(&self, driver: &Driver, asin: &str) -> IdentifierOutcome {
        info!("Driver {} processing {}", driver.id(), asin);

        let description = describe(driver, &self.site, &self.config, asin).await;
        if description.is_none() {
            warn!("Storing placeholder description for {}", asin);
        }

        let mut reviews = ProductReviews::default();
        for polarity in Polarity::ALL {
            let harvest = harvest(
                driver,
                &self.site,
                &self.config,
                asin,
                polarity,
                self.config.target(polarity),
            )
            .await;
            reviews.set(polarity, harvest.reviews);
        }

        IdentifierOutcome {
            asin: asin.to_string(),
            description,
            reviews,
        }
    }

    fn persist(&self, outcome: &IdentifierOutcome) -> Result<()> {
        let description = outcome
            .description
            .clone()
            .unwrap_or_else(|| ProductDescription::placeholder(outcome.asin.clone()));
        let reviews: Vec<ReviewRecord> = outcome.reviews.iter().cloned().collect();

        let written = self.store.save_product(&description, &reviews)?;
        debug!("Persisted {} ({} reviews)", outcome.asin, written);
        Ok(())
    }
}

async fn release(drivers: &[Driver]) {
    for driver in drivers {
        if let Err(e) = driver.close().await {
            warn!("Failed to close driver {}: {}", driver.id(), e);
        }
    }
}
