pub mod sqlite;

use std::collections::BTreeMap;

use tracing::debug;

use crate::app::Result;
use crate::domain::{JobSnapshot, ProductDescription, ProductReviews, ReviewRecord, SearchResult};

pub use sqlite::SqliteStore;

/// Idempotent persistence for search results, descriptions and reviews.
///
/// Every write is a single-statement upsert (or one transaction of them), so
/// concurrent identifier workers never interleave a read-modify-write.
pub trait Store {
    // Search results, keyed by (keyword, excluded identifier)
    fn insert_search_result(&self, result: &SearchResult) -> Result<bool>;
    fn get_search_result(&self, keyword: &str, excluded_asin: &str)
        -> Result<Option<SearchResult>>;

    // Descriptions, keyed by identifier
    fn upsert_description(&self, description: &ProductDescription) -> Result<()>;
    fn get_descriptions(&self, asins: &[String]) -> Result<BTreeMap<String, ProductDescription>>;

    // Reviews, keyed by (review id, identifier)
    fn upsert_reviews(&self, reviews: &[ReviewRecord]) -> Result<usize>;
    fn get_reviews(&self, asins: &[String]) -> Result<BTreeMap<String, ProductReviews>>;
    fn count_reviews(&self, asin: &str) -> Result<i64>;

    /// Write one identifier's description and reviews in a single batch
    fn save_product(&self, description: &ProductDescription, reviews: &[ReviewRecord])
        -> Result<usize>;

    /// Composite read that decides whether a scrape can be skipped entirely.
    ///
    /// A stored search result only counts once every identifier it names has
    /// a description row; a job interrupted mid fan-out reads as a miss.
    fn lookup_job(&self, keyword: &str, excluded_asin: &str) -> Result<Option<JobSnapshot>> {
        let Some(search) = self.get_search_result(keyword, excluded_asin)? else {
            return Ok(None);
        };

        let asins = search.all_asins();
        let descriptions = self.get_descriptions(&asins)?;
        if let Some(missing) = asins.iter().find(|a| !descriptions.contains_key(*a)) {
            debug!(
                "Stored job for {:?} / {} is incomplete ({} has no description)",
                keyword, excluded_asin, missing
            );
            return Ok(None);
        }
        let reviews = self.get_reviews(&asins)?;

        Ok(Some(JobSnapshot {
            search,
            descriptions,
            reviews,
        }))
    }
}
