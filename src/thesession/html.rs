//! Just enough HTML handling for search result links and page text.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::utils::decode_entities;

fn tune_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*/tunes/\d+[^"']*)["']"#).unwrap()
    })
}

/// `href` values of every anchor pointing at a numbered tune, in document order.
pub fn tune_links(html: &str) -> Vec<String> {
    tune_link_regex()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()))
        .collect()
}

/// Rendered text of a page, one source line per output line.
///
/// Scripts and styles are dropped, `<br>` and block closings become line
/// breaks, the remaining tags are removed and entities decoded.
pub fn page_text(html: &str) -> String {
    static HIDDEN: OnceLock<Regex> = OnceLock::new();
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let hidden = HIDDEN.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
    });
    let breaks = BREAKS.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|pre|li|tr|h[1-6]|dd|dt|section|article)\s*>")
            .unwrap()
    });
    let tags = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());

    let text = hidden.replace_all(html, "");
    let text = breaks.replace_all(&text, "\n");
    let text = tags.replace_all(&text, "");
    decode_entities(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_links() {
        let html = r#"
            <a href="/discussions/1">Chat</a>
            <a class="manifest-item-title" href="/tunes/74">The Musical Priest</a>
            <A HREF='/tunes/9#setting9'>Other</A>
            <a href="/tunes/new">New</a>
        "#;
        assert_eq!(tune_links(html), vec!["/tunes/74".to_string(), "/tunes/9#setting9".to_string()]);
        assert!(tune_links("<p>No tunes</p>").is_empty());
    }

    #[test]
    fn test_page_text() {
        let html = "<script>var x = '<b>';</script><div class=\"notes\">X: 1<br />T: Jenny&#39;s Chickens<br/>K: Edor</div><p>A &amp; B</p>";
        let text = page_text(html);
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["X: 1", "T: Jenny's Chickens", "K: Edor", "A & B"]);
    }
}
