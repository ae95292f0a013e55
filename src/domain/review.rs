use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*out of\s*\d+").expect("valid regex"));

static STARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(?:\.\d+)?\s*out of\s*\d+\s*stars").expect("valid regex")
});

static REVIEWED_IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Reviewed\s+in\s+(?:the\s+)?(.+?)\s+on\s+(.+)").expect("valid regex")
});

static MATCH_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s+matching customer reviews?").expect("valid regex")
});

/// Review filter dimension on the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Critical,
    Positive,
}

impl Polarity {
    pub const ALL: [Polarity; 2] = [Polarity::Critical, Polarity::Positive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Critical => "critical",
            Polarity::Positive => "positive",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Polarity::Critical),
            "positive" => Ok(Polarity::Positive),
            other => Err(format!("unknown review polarity: {}", other)),
        }
    }
}

/// A single review as stored and returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_id: String,
    pub asin: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub rating: Option<f64>,
    pub country: Option<String>,
    #[serde(rename = "date")]
    pub review_date: Option<String>,
    pub verified_purchase: bool,
    pub helpful_votes: u32,
    #[serde(rename = "review_type")]
    pub polarity: Polarity,
}

/// Raw text pulled out of one review element in a single DOM pass.
///
/// Every field is optional: the page decides what exists, and
/// [`ReviewRecord::from_raw`] decides what it means.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawReview {
    pub id: Option<String>,
    pub title_spans: Vec<String>,
    pub title_text: Option<String>,
    pub body_span: Option<String>,
    pub body_text: Option<String>,
    pub rating_text: Option<String>,
    pub date_text: Option<String>,
    pub verified: bool,
    pub vote_texts: Vec<String>,
}

impl ReviewRecord {
    /// Shape a raw element into a record owned by `asin`.
    ///
    /// Unparseable fields degrade to `None` individually.
    pub fn from_raw(raw: RawReview, asin: &str, polarity: Polarity) -> Self {
        let title = raw
            .title_spans
            .iter()
            .rev()
            .find_map(|s| non_empty(s))
            .or_else(|| raw.title_text.as_deref().and_then(strip_star_fragment));

        let body = raw
            .body_span
            .as_deref()
            .and_then(non_empty)
            .or_else(|| raw.body_text.as_deref().and_then(non_empty));

        let rating = raw.rating_text.as_deref().and_then(parse_rating);

        let (country, review_date) = raw
            .date_text
            .as_deref()
            .map(parse_reviewed_in)
            .unwrap_or((None, None));

        let helpful_votes = parse_helpful_votes(&raw.vote_texts);

        let review_id = raw
            .id
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| {
                Self::generate_id(
                    asin,
                    title.as_deref().unwrap_or(""),
                    body.as_deref().unwrap_or(""),
                    review_date.as_deref().unwrap_or(""),
                )
            });

        Self {
            review_id,
            asin: asin.to_string(),
            title,
            body,
            rating,
            country,
            review_date,
            verified_purchase: raw.verified,
            helpful_votes,
            polarity,
        }
    }

    /// Deterministic id for elements rendered without a DOM id
    pub fn generate_id(asin: &str, title: &str, body: &str, date: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [asin, title, body, date] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn strip_star_fragment(s: &str) -> Option<String> {
    non_empty(&STARS_RE.replace_all(s, ""))
}

/// Parse "4.0 out of 5 stars"; ratings outside 1-5 are discarded.
pub fn parse_rating(text: &str) -> Option<f64> {
    let caps = RATING_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    (1.0..=5.0).contains(&value).then_some(value)
}

/// Split "Reviewed in the United States on March 3, 2024" into country and date.
pub fn parse_reviewed_in(text: &str) -> (Option<String>, Option<String>) {
    match REVIEWED_IN_RE.captures(text.trim()) {
        Some(caps) => (
            caps.get(1).and_then(|m| non_empty(m.as_str())),
            caps.get(2).and_then(|m| non_empty(m.as_str())),
        ),
        None => (None, None),
    }
}

pub fn parse_helpful_votes(texts: &[String]) -> u32 {
    let Some(text) = texts.iter().find(|t| t.contains("found this helpful")) else {
        return 0;
    };

    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits.parse().unwrap_or(0);
    }

    if text.trim_start().to_lowercase().starts_with("one person") {
        1
    } else {
        0
    }
}

/// Read the "N matching customer reviews" indicator. Anything unreadable is zero.
pub fn parse_review_count(text: &str) -> u32 {
    if text.contains("No matching customer reviews") {
        return 0;
    }

    MATCH_COUNT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}
