use url::Url;

/// Removes stray quote characters sometimes left behind when `href` values
/// are captured out of raw HTML attribute soup.
pub fn strip_quotes(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\'' | '"' | '`')).collect()
}

/// Normalizes a URL the same way for blacklist hashing and link-dedup:
/// strips quote characters, then drops scheme, userinfo, and fragment so
/// that `http://x.onion/#a` and `x.onion` hash identically.
pub fn strip_url(raw: &str) -> String {
    let cleaned = strip_quotes(raw);
    match Url::parse(&cleaned) {
        Ok(mut u) => {
            u.set_fragment(None);
            let _ = u.set_username("");
            let _ = u.set_password(None);
            let host = u.host_str().unwrap_or("").to_string();
            format!("{}{}", host, u.path())
        }
        Err(_) => cleaned,
    }
}

/// True iff the URL's host ends in `.onion`.
pub fn is_onion_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with(".onion")))
        .unwrap_or(false)
}

/// Resolves an extracted `href` against a base page URL into a normalized,
/// absolute link, or `None` if it should be dropped.
///
/// Drops empty/`#` anchors, strips trailing fragments, resolves relative
/// paths against the base, and keeps only `.onion` results.
pub fn normalize_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href == "#" {
        return None;
    }
    let without_fragment = href.split('#').next().unwrap_or("");
    if without_fragment.is_empty() {
        return None;
    }
    let resolved = base.join(without_fragment).ok()?;
    if !resolved.host_str().map(|h| h.ends_with(".onion")).unwrap_or(false) {
        return None;
    }
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quote_characters() {
        assert_eq!(strip_quotes("'http://x.onion\""), "http://x.onion");
    }

    #[test]
    fn strip_url_ignores_scheme_and_fragment() {
        let a = strip_url("http://abc.onion/page#frag");
        let b = strip_url("https://abc.onion/page");
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_link_drops_non_onion() {
        let base = Url::parse("http://abc.onion/dir/page.html").unwrap();
        assert_eq!(normalize_link("https://example.com", &base), None);
    }

    #[test]
    fn normalize_link_resolves_relative_onion_path() {
        let base = Url::parse("http://abc.onion/dir/page.html").unwrap();
        let out = normalize_link("../other.html", &base).unwrap();
        assert_eq!(out, "http://abc.onion/other.html");
    }

    #[test]
    fn normalize_link_drops_bare_anchor() {
        let base = Url::parse("http://abc.onion/dir/page.html").unwrap();
        assert_eq!(normalize_link("#top", &base), None);
    }
}
