//! The scrape job: discovery, per-identifier extraction and persistence.
//!
//! ```text
//! Orchestrator → cache check → Driver × N → discover (once)
//!              → WorkerPool { describe, harvest(critical), harvest(positive) }
//!              → Store upserts → Corpus
//! ```

mod config;
pub mod description;
pub mod discovery;
pub mod orchestrator;
pub mod pool;
pub mod retry;
pub mod reviews;

pub use config::{PipelineConfig, SiteConfig};
pub use orchestrator::Orchestrator;
pub use pool::WorkerPool;
pub use retry::{Backoff, RetryPolicy};
pub use reviews::{Harvest, StopReason};
