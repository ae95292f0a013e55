pub mod job;
pub mod product;
pub mod review;

pub use job::{Corpus, CorpusSource, IdentifierOutcome, JobSnapshot, ProductReviews, ScrapeJob};
pub use product::{ProductDescription, SearchResult};
pub use review::{parse_review_count, Polarity, RawReview, ReviewRecord};
