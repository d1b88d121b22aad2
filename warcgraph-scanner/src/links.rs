use crate::error::{Result, ScanError};
use scraper::{Html, Selector};

/// Pulls raw `href` values out of anchor elements.
pub struct LinkExtractor {
    anchors: Selector,
}

impl LinkExtractor {
    pub fn new() -> Result<Self> {
        let anchors = Selector::parse("a[href]")
            .map_err(|e| ScanError::PayloadParse(format!("anchor selector: {}", e)))?;
        Ok(Self { anchors })
    }

    /// Returns every anchor `href` in document order, unresolved.
    ///
    /// The payload must be UTF-8; malformed markup is parsed best-effort and
    /// never fails.
    pub fn extract(&self, payload: &[u8]) -> Result<Vec<String>> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| ScanError::PayloadParse(format!("payload is not UTF-8: {}", e)))?;

        Ok(self.extract_str(text))
    }

    pub fn extract_str(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        document
            .select(&self.anchors)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_in_document_order() {
        let extractor = LinkExtractor::new().unwrap();
        let html = br#"<html><body>
            <a href="/first">1</a>
            <p><a href="http://example.com/second#x">2</a></p>
            <a name="no-href">skip</a>
            <a href="third.html?q=1">3</a>
        </body></html>"#;

        let links = extractor.extract(html).unwrap();
        assert_eq!(
            links,
            vec!["/first", "http://example.com/second#x", "third.html?q=1"]
        );
    }

    #[test]
    fn test_malformed_markup_is_best_effort() {
        let extractor = LinkExtractor::new().unwrap();
        let html = b"<html><body><div><a href='a.html'>unclosed <b><a href=\"b.html\">x</div><p";

        let links = extractor.extract(html).unwrap();
        assert_eq!(links, vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_duplicate_and_empty_hrefs_are_kept() {
        let extractor = LinkExtractor::new().unwrap();
        let links = extractor.extract_str(r#"<a href="x">1</a><a href="x">2</a><a href="">3</a>"#);
        assert_eq!(links, vec!["x", "x", ""]);
    }

    #[test]
    fn test_non_utf8_payload_fails() {
        let extractor = LinkExtractor::new().unwrap();
        let result = extractor.extract(&[0x3c, 0x61, 0xff, 0xfe, 0x3e]);
        assert!(matches!(result, Err(ScanError::PayloadParse(_))));
    }

    #[test]
    fn test_no_markup() {
        let extractor = LinkExtractor::new().unwrap();
        assert!(extractor.extract(b"plain text, no anchors").unwrap().is_empty());
        assert!(extractor.extract(b"").unwrap().is_empty());
    }
}
