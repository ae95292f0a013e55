use crate::scraper::selectors;

/// JavaScript snippets evaluated inside the page for DOM reads.
///
/// Every snippet returns JSON that is never `null`, so results always
/// deserialize: single values are wrapped in a zero- or one-element array.
pub struct DomExtractor;

impl DomExtractor {
    /// Values of `attribute` on every element matching `selector`
    pub fn attribute_all_script(selector: &str, attribute: &str) -> String {
        format!(
            r#"
            (() => Array.from(document.querySelectorAll({selector}))
                .map(el => el.getAttribute({attribute}) || ''))()
            "#,
            selector = js_string(selector),
            attribute = js_string(attribute),
        )
    }

    /// Trimmed text of the first match, as `[]` or `[text]`
    pub fn text_first_script(selector: &str) -> String {
        format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                return el ? [(el.textContent || '').trim()] : [];
            }})()
            "#,
            selector = js_string(selector),
        )
    }

    /// Trimmed text of every match
    pub fn text_all_script(selector: &str) -> String {
        format!(
            r#"
            (() => Array.from(document.querySelectorAll({selector}))
                .map(el => (el.textContent || '').trim()))()
            "#,
            selector = js_string(selector),
        )
    }

    pub fn exists_script(selector: &str) -> String {
        format!(
            "(() => !!document.querySelector({selector}))()",
            selector = js_string(selector),
        )
    }

    pub fn scroll_script(dy: f64) -> String {
        format!("window.scrollBy({{top: {dy}, behavior: 'smooth'}}); true")
    }

    /// Collect every review element in one pass.
    ///
    /// Only raw text is returned; interpretation happens in
    /// [`ReviewRecord::from_raw`](crate::domain::ReviewRecord::from_raw).
    pub fn review_elements_script() -> String {
        format!(
            r#"
            (() => {{
                const text = (el) => el ? (el.textContent || '').trim() : null;
                const out = [];
                for (const review of document.querySelectorAll({review})) {{
                    try {{
                        const titleEl = review.querySelector({title});
                        const bodyEl = review.querySelector({body});
                        const voteEls = review.querySelectorAll({votes});
                        out.push({{
                            id: review.id || null,
                            titleSpans: titleEl
                                ? Array.from(titleEl.querySelectorAll('span')).map(s => (s.textContent || '').trim())
                                : [],
                            titleText: text(titleEl),
                            bodySpan: bodyEl ? text(bodyEl.querySelector('span')) : null,
                            bodyText: text(bodyEl),
                            ratingText: text(review.querySelector({rating})),
                            dateText: text(review.querySelector({date})),
                            verified: !!review.querySelector({verified}),
                            voteTexts: Array.from(voteEls).map(v => (v.textContent || '').trim()),
                        }});
                    }} catch (e) {{
                        // unrecoverable element, skip it
                    }}
                }}
                return out;
            }})()
            "#,
            review = js_string(selectors::REVIEW),
            title = js_string(selectors::REVIEW_TITLE),
            body = js_string(selectors::REVIEW_BODY),
            votes = js_string(selectors::REVIEW_VOTES),
            rating = js_string(selectors::REVIEW_RATING),
            date = js_string(selectors::REVIEW_DATE),
            verified = js_string(selectors::REVIEW_VERIFIED),
        )
    }
}

/// Quote `s` as a JavaScript string literal
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_quoted() {
        let script = DomExtractor::text_first_script(selectors::REVIEW_COUNT);
        assert!(script.contains(r#""div[data-hook=\"cr-filter-info-review-rating-count\"]""#));
    }

    #[test]
    fn test_quotes_cannot_break_out() {
        let script = DomExtractor::exists_script("a'); alert('x");
        assert!(script.contains(r#""a'); alert('x""#));
    }

    #[test]
    fn test_review_script_reads_all_hooks() {
        let script = DomExtractor::review_elements_script();
        for key in ["titleSpans", "bodySpan", "ratingText", "dateText", "verified", "voteTexts"] {
            assert!(script.contains(key), "missing {}", key);
        }
        assert!(script.contains("avp-badge"));
    }

    #[test]
    fn test_attribute_script() {
        let script = DomExtractor::attribute_all_script("[data-asin]", "data-asin");
        assert!(script.contains("getAttribute(\"data-asin\")"));
    }
}
