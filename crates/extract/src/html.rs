use scraper::{Html, Selector};
use url::Url;

use nyx_core::url_util::normalize_link;
use nyx_core::MetaTag;

pub struct HtmlResult {
    pub title: Option<String>,
    pub body_text: String,
    pub meta_tags: Vec<MetaTag>,
    pub links: Vec<String>,
}

/// Extracts title, meta-tags, outbound `.onion` links, and flattened body
/// text from a fetched page. HTML cleanup quality itself is out of scope;
/// this is deliberately the thin slice the pipeline needs.
pub fn parse_html(html_str: &str, base_url: &Url) -> HtmlResult {
    let document = Html::parse_document(html_str);

    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string());

    let body_text = selector("body")
        .and_then(|s| document.select(&s).next())
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let meta_tags = extract_meta_tags(&document);
    let links = extract_links(&document, base_url);

    HtmlResult {
        title,
        body_text,
        meta_tags,
        links,
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn extract_meta_tags(document: &Html) -> Vec<MetaTag> {
    let Some(sel) = selector("meta[name]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| {
            let key = el.value().attr("name")?.to_string();
            let value = el.value().attr("content").map(str::to_string);
            Some(MetaTag {
                key: Some(key),
                value,
            })
        })
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| normalize_link(href, base_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_meta_and_onion_links_only() {
        let base = Url::parse("http://abc.onion/page.html").unwrap();
        let html = r#"
            <html><head>
                <title>  Hello World  </title>
                <meta name="description" content="a dark page">
            </head><body>
                <a href="/other.html">link</a>
                <a href="https://example.com">external</a>
                <p>Some body text</p>
            </body></html>
        "#;

        let result = parse_html(html, &base);
        assert_eq!(result.title.as_deref(), Some("Hello World"));
        assert_eq!(result.meta_tags.len(), 1);
        assert_eq!(result.meta_tags[0].value.as_deref(), Some("a dark page"));
        assert_eq!(result.links, vec!["http://abc.onion/other.html".to_string()]);
        assert!(result.body_text.contains("Some body text"));
    }
}
