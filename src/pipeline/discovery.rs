use std::collections::HashSet;

use tracing::info;

use crate::app::Result;
use crate::pipeline::retry::{retry, RetryPolicy};
use crate::pipeline::{PipelineConfig, SiteConfig};
use crate::scraper::{selectors, Driver};

/// Find up to `competitor_limit` competitors for `keyword`.
///
/// The search page must render; if it never does within the attempt budget
/// the error propagates instead of returning an empty set.
pub async fn discover(
    driver: &Driver,
    site: &SiteConfig,
    config: &PipelineConfig,
    keyword: &str,
    exclude: &str,
) -> Result<Vec<String>> {
    let url = site.search_url(keyword)?;
    let url = url.as_str();

    retry(
        RetryPolicy::immediate(config.discovery_attempts),
        "search page",
        |attempt| async move {
            info!("Searching for {:?} (attempt {})", keyword, attempt);
            driver.goto(url, config.search_nav_timeout()).await?;
            driver
                .page()
                .wait_for_selector(selectors::SEARCH_RESULT, config.search_wait_timeout())
                .await
        },
    )
    .await?;

    let raw = driver
        .page()
        .attribute_all(selectors::SEARCH_RESULT, selectors::SEARCH_RESULT_ATTR)
        .await?;

    let competitors = select_competitors(
        &raw,
        exclude,
        config.discovery_over_fetch,
        config.competitor_limit,
    );
    info!(
        "Discovered {} competitors for {:?} from {} results",
        competitors.len(),
        keyword,
        raw.len()
    );
    Ok(competitors)
}

/// Drop empty values and `exclude`, take `over_fetch` survivors, then keep
/// the first `limit` distinct ones in encounter order.
pub fn select_competitors(
    raw: &[String],
    exclude: &str,
    over_fetch: usize,
    limit: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != exclude)
        .take(over_fetch)
        .filter(|s| seen.insert(*s))
        .take(limit)
        .map(String::from)
        .collect()
}
