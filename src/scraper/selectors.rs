//! Fixed DOM hooks on the product, search and review pages.

/// Every rendered search result carries its identifier in `data-asin`
pub const SEARCH_RESULT: &str = "[data-asin]";
pub const SEARCH_RESULT_ATTR: &str = "data-asin";

pub const PRODUCT_TITLE: &str = "#productTitle";
pub const FEATURE_BULLETS: &str = "#feature-bullets ul li span";

pub const REVIEW_COUNT: &str = "div[data-hook=\"cr-filter-info-review-rating-count\"]";
pub const REVIEW: &str = "div[data-hook=\"review\"], li[data-hook=\"review\"]";
pub const REVIEW_TITLE: &str = "[data-hook=\"review-title\"]";
pub const REVIEW_BODY: &str = "[data-hook=\"review-body\"]";
pub const REVIEW_RATING: &str = "[data-hook=\"review-star-rating\"]";
pub const REVIEW_DATE: &str = "[data-hook=\"review-date\"]";
pub const REVIEW_VERIFIED: &str = "[data-hook=\"avp-badge\"]";
pub const REVIEW_VOTES: &str = ".a-size-base.a-color-tertiary.cr-vote-text";

/// Present only while another listing page exists
pub const NEXT_PAGE: &str = "ul.a-pagination li.a-last:not(.a-disabled)";

pub const ACCOUNT_GREETING: &str = "#nav-link-accountList-nav-line-1";
