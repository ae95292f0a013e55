use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detail-page fields for one identifier. Later scrapes replace earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDescription {
    pub asin: String,
    pub title: String,
    #[serde(rename = "description")]
    pub bullet_points: Vec<String>,
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Utc>,
}

impl ProductDescription {
    pub fn new(asin: impl Into<String>, title: impl Into<String>, bullet_points: Vec<String>) -> Self {
        Self {
            asin: asin.into(),
            title: title.into(),
            bullet_points,
            captured_at: Utc::now(),
        }
    }

    /// Empty record stored when the detail page never rendered
    pub fn placeholder(asin: impl Into<String>) -> Self {
        Self::new(asin, "", Vec::new())
    }

    pub fn is_placeholder(&self) -> bool {
        self.title.is_empty() && self.bullet_points.is_empty()
    }
}

/// Competitors discovered for a (keyword, excluded identifier) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub keyword: String,
    pub excluded_asin: String,
    pub competitor_asins: Vec<String>,
    pub discovered_at: DateTime<Utc>,
}

impl SearchResult {
    pub fn new(
        keyword: impl Into<String>,
        excluded_asin: impl Into<String>,
        competitor_asins: Vec<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            excluded_asin: excluded_asin.into(),
            competitor_asins,
            discovered_at: Utc::now(),
        }
    }

    /// Competitors followed by the excluded identifier, without duplicates
    pub fn all_asins(&self) -> Vec<String> {
        let mut asins = self.competitor_asins.clone();
        let excluded = self.excluded_asin.trim();
        if !excluded.is_empty() && !asins.iter().any(|a| a == excluded) {
            asins.push(excluded.to_string());
        }
        asins
    }
}
