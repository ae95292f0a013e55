use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Polarity, ProductDescription, ReviewRecord, SearchResult};

/// Critical and positive reviews collected for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductReviews {
    pub critical: Vec<ReviewRecord>,
    pub positive: Vec<ReviewRecord>,
}

impl ProductReviews {
    pub fn get(&self, polarity: Polarity) -> &[ReviewRecord] {
        match polarity {
            Polarity::Critical => &self.critical,
            Polarity::Positive => &self.positive,
        }
    }

    pub fn set(&mut self, polarity: Polarity, reviews: Vec<ReviewRecord>) {
        match polarity {
            Polarity::Critical => self.critical = reviews,
            Polarity::Positive => self.positive = reviews,
        }
    }

    /// File a stored record under its own polarity tag
    pub fn push(&mut self, review: ReviewRecord) {
        match review.polarity {
            Polarity::Critical => self.critical.push(review),
            Polarity::Positive => self.positive.push(review),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReviewRecord> {
        self.critical.iter().chain(self.positive.iter())
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.positive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a corpus was assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusSource {
    Database,
    Scraping,
}

/// Per-identifier descriptions and reviews for one keyword + identifier pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpus {
    pub source: CorpusSource,
    pub keyword: String,
    pub excluded_asin: String,
    pub competitor_asins: Vec<String>,
    pub descriptions: BTreeMap<String, ProductDescription>,
    pub reviews: BTreeMap<String, ProductReviews>,
}

/// Everything the store holds for a previously resolved job.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub search: SearchResult,
    pub descriptions: BTreeMap<String, ProductDescription>,
    pub reviews: BTreeMap<String, ProductReviews>,
}

impl From<JobSnapshot> for Corpus {
    fn from(snapshot: JobSnapshot) -> Self {
        let mut reviews = snapshot.reviews;
        for asin in snapshot.search.all_asins() {
            reviews.entry(asin).or_default();
        }

        Self {
            source: CorpusSource::Database,
            keyword: snapshot.search.keyword,
            excluded_asin: snapshot.search.excluded_asin,
            competitor_asins: snapshot.search.competitor_asins,
            descriptions: snapshot.descriptions,
            reviews,
        }
    }
}

/// What one identifier produced during a scrape.
#[derive(Debug, Clone)]
pub struct IdentifierOutcome {
    pub asin: String,
    pub description: Option<ProductDescription>,
    pub reviews: ProductReviews,
}

/// Transient accumulator for a single scrape request.
#[derive(Debug)]
pub struct ScrapeJob {
    search: SearchResult,
    identifiers: Vec<String>,
    descriptions: BTreeMap<String, ProductDescription>,
    reviews: BTreeMap<String, ProductReviews>,
}

impl ScrapeJob {
    pub fn new(search: SearchResult) -> Self {
        let identifiers = search.all_asins();
        Self {
            search,
            identifiers,
            descriptions: BTreeMap::new(),
            reviews: BTreeMap::new(),
        }
    }

    /// Competitors plus the excluded identifier
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn contains(&self, asin: &str) -> bool {
        self.identifiers.iter().any(|a| a == asin)
    }

    /// Accept an outcome, substituting a placeholder for a missing description.
    ///
    /// Outcomes for identifiers outside the job, and reviews owned by another
    /// identifier, are dropped.
    pub fn record(&mut self, outcome: IdentifierOutcome) -> bool {
        if !self.contains(&outcome.asin) {
            warn!("Ignoring outcome for {} which is not part of this job", outcome.asin);
            return false;
        }

        let asin = outcome.asin;
        let description = outcome
            .description
            .unwrap_or_else(|| ProductDescription::placeholder(asin.clone()));

        let mut reviews = outcome.reviews;
        reviews.critical.retain(|r| r.asin == asin);
        reviews.positive.retain(|r| r.asin == asin);

        self.descriptions.insert(asin.clone(), description);
        self.reviews.insert(asin, reviews);
        true
    }

    pub fn description(&self, asin: &str) -> Option<&ProductDescription> {
        self.descriptions.get(asin)
    }

    pub fn reviews(&self, asin: &str) -> Option<&ProductReviews> {
        self.reviews.get(asin)
    }

    /// Finish the job; identifiers that never reported get empty entries.
    pub fn into_corpus(mut self) -> Corpus {
        for asin in &self.identifiers {
            self.descriptions
                .entry(asin.clone())
                .or_insert_with(|| ProductDescription::placeholder(asin.clone()));
            self.reviews.entry(asin.clone()).or_default();
        }

        Corpus {
            source: CorpusSource::Scraping,
            keyword: self.search.keyword,
            excluded_asin: self.search.excluded_asin,
            competitor_asins: self.search.competitor_asins,
            descriptions: self.descriptions,
            reviews: self.reviews,
        }
    }
}
