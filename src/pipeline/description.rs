use tracing::{info, warn};

use crate::app::Result;
use crate::domain::ProductDescription;
use crate::pipeline::retry::{retry, RetryPolicy};
use crate::pipeline::{PipelineConfig, SiteConfig};
use crate::scraper::{selectors, Driver};

/// Title and bullet points from the detail page of `asin`.
///
/// `None` means no data: the page never rendered a title within the retry
/// budget, or reading it failed. Missing bullets are an empty list.
pub async fn describe(
    driver: &Driver,
    site: &SiteConfig,
    config: &PipelineConfig,
    asin: &str,
) -> Option<ProductDescription> {
    match try_describe(driver, site, config, asin).await {
        Ok(description) => Some(description),
        Err(e) => {
            warn!("No description for {}: {}", asin, e);
            None
        }
    }
}

async fn try_describe(
    driver: &Driver,
    site: &SiteConfig,
    config: &PipelineConfig,
    asin: &str,
) -> Result<ProductDescription> {
    let url = site.product_url(asin)?;
    let url = url.as_str();

    retry(
        RetryPolicy::fixed(config.description_attempts, config.description_backoff()),
        "detail page",
        |_| async move {
            driver.goto(url, config.detail_nav_timeout()).await?;
            driver
                .page()
                .wait_for_selector(selectors::PRODUCT_TITLE, config.title_wait_timeout())
                .await
        },
    )
    .await?;

    let page = driver.page();
    let title = page
        .text_first(selectors::PRODUCT_TITLE)
        .await?
        .unwrap_or_default();
    let bullet_points: Vec<String> = page
        .text_all(selectors::FEATURE_BULLETS)
        .await?
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    info!("Described {}: {} bullet points", asin, bullet_points.len());
    Ok(ProductDescription::new(asin, title, bullet_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::fake::{FakeDocument, FakePage};

    fn product_page() -> FakePage {
        FakePage::new().route(
            "/dp/B000000001",
            FakeDocument::product("55\" LED TV", &["4K UHD", "  ", "Smart apps"]),
        )
    }

    #[tokio::test]
    async fn test_describe_reads_title_and_bullets() {
        let driver = Driver::new(0, Box::new(product_page()));
        let desc = describe(
            &driver,
            &SiteConfig::default(),
            &PipelineConfig::immediate(),
            "B000000001",
        )
        .await
        .unwrap();

        assert_eq!(desc.asin, "B000000001");
        assert_eq!(desc.title, "55\" LED TV");
        assert_eq!(desc.bullet_points, vec!["4K UHD", "Smart apps"]);
    }

    #[tokio::test]
    async fn test_describe_missing_bullets_is_empty() {
        let page = FakePage::new().route("/dp/B1", FakeDocument::product("Title", &[]));
        let driver = Driver::new(0, Box::new(page));
        let desc = describe(&driver, &SiteConfig::default(), &PipelineConfig::immediate(), "B1")
            .await
            .unwrap();
        assert!(desc.bullet_points.is_empty());
    }

    #[tokio::test]
    async fn test_describe_retries_once() {
        let page = product_page().fail_waits("/dp/B000000001", 1);
        let driver = Driver::new(0, Box::new(page));
        let desc = describe(
            &driver,
            &SiteConfig::default(),
            &PipelineConfig::immediate(),
            "B000000001",
        )
        .await;
        assert!(desc.is_some());
    }

    #[tokio::test]
    async fn test_describe_gives_up_after_retry() {
        let page = product_page().fail_waits("/dp/B000000001", 2);
        let driver = Driver::new(0, Box::new(page));
        let desc = describe(
            &driver,
            &SiteConfig::default(),
            &PipelineConfig::immediate(),
            "B000000001",
        )
        .await;
        assert!(desc.is_none());
    }

    #[tokio::test]
    async fn test_describe_unreachable_is_none() {
        let page = FakePage::new().unreachable("/dp/");
        let driver = Driver::new(0, Box::new(page));
        let desc = describe(&driver, &SiteConfig::default(), &PipelineConfig::immediate(), "B1").await;
        assert!(desc.is_none());
    }
}
