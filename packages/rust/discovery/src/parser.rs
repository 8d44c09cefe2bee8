//! Bulletin index page parser.
//!
//! The publisher's listing page carries one entry per bulletin: a title
//! phrase with an embedded `(DD-MM-YYYY)` date, followed somewhere later in
//! the markup by a link to the PDF. The two are paired in document order:
//! - a title seen in ordinary text arms a pending date (first one wins)
//! - the next anchor whose `href` ends in `.pdf` consumes it
//! - an anchor with nothing pending may carry the title in its own text

use chrono::NaiveDate;
use regex::Regex;
use scraper::node::Element;
use scraper::{Html, Node};
use tracing::debug;
use url::Url;
use veglytics_shared::{BULLETIN_DATE_FORMAT, BulletinRef, Result, VeglyticsError};

/// Finds dated bulletin links on an index page.
#[derive(Debug, Clone)]
pub struct BulletinLocator {
    title_re: Regex,
    base: Url,
}

impl BulletinLocator {
    /// Build a locator for bulletins titled `title`, resolving relative links
    /// against `base`.
    pub fn new(title: &str, base: &Url) -> Result<Self> {
        let words: Vec<String> = title.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Err(VeglyticsError::validation("bulletin title must not be empty"));
        }
        let pattern = format!(r"(?i){}\s*\((\d{{2}}-\d{{2}}-\d{{4}})\)", words.join(r"\s+"));
        let title_re = Regex::new(&pattern)
            .map_err(|e| VeglyticsError::parse(format!("invalid title pattern: {e}")))?;
        Ok(Self {
            title_re,
            base: base.clone(),
        })
    }

    /// Return the `count` newest bulletins linked from `html`, newest first.
    ///
    /// Links with an unparseable date or an unresolvable `href` are dropped.
    /// Equal dates keep their document order.
    pub fn locate(&self, html: &str, count: usize) -> Vec<BulletinRef> {
        let document = Html::parse_document(html);
        let mut found: Vec<BulletinRef> = Vec::new();
        // Text seen since the last PDF link.
        let mut pending = String::new();

        for node in document.tree.root().descendants() {
            match node.value() {
                Node::Text(text) => {
                    let skipped = node.ancestors().any(|a| {
                        a.value()
                            .as_element()
                            .is_some_and(|e| is_pdf_anchor(e) || is_non_content(e))
                    });
                    if skipped {
                        continue;
                    }
                    pending.push(' ');
                    pending.push_str(&**text);
                }
                Node::Element(element) if element.name() == "a" => {
                    let Some(href) = element.attr("href").filter(|h| is_pdf_href(h)) else {
                        continue;
                    };
                    let armed = self.first_date(&pending);
                    pending.clear();
                    let raw_date = match armed {
                        Some(date) => date,
                        None => {
                            let anchor_text: String = node
                                .descendants()
                                .filter_map(|n| n.value().as_text().map(|t| String::from(&**t)))
                                .collect::<Vec<_>>()
                                .join(" ");
                            match self.first_date(&anchor_text) {
                                Some(date) => date,
                                None => continue,
                            }
                        }
                    };
                    if let Some(bulletin) = self.resolve(href, &raw_date) {
                        found.push(bulletin);
                    }
                }
                _ => {}
            }
        }

        // Stable sort keeps document order for equal dates.
        found.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
        found.truncate(count);
        debug!(count = found.len(), "bulletin links located");
        found
    }

    fn first_date(&self, text: &str) -> Option<String> {
        self.title_re
            .captures(text)
            .map(|caps| caps[1].to_string())
    }

    fn resolve(&self, href: &str, raw_date: &str) -> Option<BulletinRef> {
        let publication_date = match NaiveDate::parse_from_str(raw_date, BULLETIN_DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                debug!(raw_date, error = %e, "dropping bulletin with invalid date");
                return None;
            }
        };
        let url = match self.base.join(href.trim()) {
            Ok(url) => url,
            Err(e) => {
                debug!(href, error = %e, "dropping bulletin with unresolvable link");
                return None;
            }
        };
        Some(BulletinRef {
            url: url.to_string(),
            publication_date,
        })
    }
}

/// Whether `href` points at a PDF (path ends in `.pdf`, any case).
fn is_pdf_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href).trim();
    path.to_ascii_lowercase().ends_with(".pdf")
}

fn is_pdf_anchor(element: &Element) -> bool {
    element.name() == "a" && element.attr("href").is_some_and(is_pdf_href)
}

fn is_non_content(element: &Element) -> bool {
    matches!(element.name(), "script" | "style" | "head")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> BulletinLocator {
        let base = Url::parse("https://www.harti.gov.lk").unwrap();
        BulletinLocator::new("Daily Food Commodities Bulletin", &base).unwrap()
    }

    #[test]
    fn parse_index_fixture() {
        let html = std::fs::read_to_string("../../../fixtures/html/bulletin-index.html")
            .expect("read fixture");
        let found = locator().locate(&html, 7);

        let dates: Vec<String> = found.iter().map(|b| b.date_label()).collect();
        assert_eq!(
            dates,
            vec![
                "06-01-2026",
                "05-01-2026",
                "03-01-2026",
                "02-01-2026",
                "31-12-2025",
            ]
        );
        assert_eq!(
            found[0].url,
            "https://www.harti.gov.lk/images/download/market_information/2026/daily/06-01-2026.pdf"
        );
        // Absolute links elsewhere are kept as-is.
        assert!(found.iter().any(|b| b.url.starts_with("https://cdn.example.org/")));
    }

    #[test]
    fn newest_n_only() {
        let html = std::fs::read_to_string("../../../fixtures/html/bulletin-index.html")
            .expect("read fixture");
        let found = locator().locate(&html, 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].date_label(), "06-01-2026");
        assert_eq!(found[1].date_label(), "05-01-2026");
    }

    #[test]
    fn title_inside_anchor_text() {
        let html = r#"<ul>
            <li><a href="/files/b.pdf">Daily Food Commodities Bulletin (12-03-2025)</a></li>
        </ul>"#;
        let found = locator().locate(html, 7);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://www.harti.gov.lk/files/b.pdf");
    }

    #[test]
    fn flexible_whitespace_and_case() {
        let html = r#"<p>DAILY   food
            Commodities Bulletin(01-02-2025)</p><a href="x.PDF">download</a>"#;
        let found = locator().locate(html, 7);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date_label(), "01-02-2025");
    }

    #[test]
    fn invalid_dates_are_dropped() {
        let html = r#"
            <p>Daily Food Commodities Bulletin (31-02-2025)</p><a href="/bad.pdf">pdf</a>
            <p>Daily Food Commodities Bulletin (28-02-2025)</p><a href="/good.pdf">pdf</a>"#;
        let found = locator().locate(html, 7);
        assert_eq!(found.len(), 1);
        assert!(found[0].url.ends_with("/good.pdf"));
    }

    #[test]
    fn non_pdf_links_do_not_consume_titles() {
        let html = r#"
            <p>Daily Food Commodities Bulletin (10-01-2025)</p>
            <a href="/details.html">details</a>
            <a href="/bulletin.pdf">pdf</a>"#;
        let found = locator().locate(html, 7);
        assert_eq!(found.len(), 1);
        assert!(found[0].url.ends_with("/bulletin.pdf"));
    }

    #[test]
    fn first_title_before_link_wins() {
        let html = r#"
            <p>Daily Food Commodities Bulletin (10-01-2025)</p>
            <p>Daily Food Commodities Bulletin (11-01-2025)</p>
            <a href="/bulletin.pdf">pdf</a>"#;
        let found = locator().locate(html, 7);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date_label(), "10-01-2025");
    }

    #[test]
    fn equal_dates_keep_document_order() {
        let html = r#"
            <p>Daily Food Commodities Bulletin (10-01-2025)</p><a href="/first.pdf">pdf</a>
            <p>Daily Food Commodities Bulletin (10-01-2025)</p><a href="/second.pdf">pdf</a>"#;
        let found = locator().locate(html, 7);
        assert!(found[0].url.ends_with("/first.pdf"));
        assert!(found[1].url.ends_with("/second.pdf"));
    }

    #[test]
    fn nothing_matches() {
        let found = locator().locate("<html><body><p>No bulletins today</p></body></html>", 7);
        assert!(found.is_empty());
    }

    #[test]
    fn pdf_href_detection() {
        assert!(is_pdf_href("/a/b.pdf"));
        assert!(is_pdf_href("B.PDF?download=1"));
        assert!(!is_pdf_href("/a/b.pdf.html"));
        assert!(!is_pdf_href("/page"));
    }

    #[test]
    fn empty_title_rejected() {
        let base = Url::parse("https://www.harti.gov.lk").unwrap();
        assert!(BulletinLocator::new("   ", &base).is_err());
    }
}
