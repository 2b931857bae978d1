use super::{walk, PageNode};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Builds the sitemap document for the whole page tree.
///
/// Every page contributes one `<url>` entry, in the same pre-order the
/// resolver scans in, with its location prefixed by the given base url.
/// Pages with children are emitted too, children do not replace their
/// parent's entry.
pub fn build_sitemap(pages: &[PageNode], base_url: &str) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    doc.push_str(&format!("<urlset xmlns=\"{SITEMAP_NS}\">\n"));

    walk(pages, &mut |page| {
        doc.push_str("  <url><loc>");
        doc.push_str(&escape_xml(&format!("{base_url}{}", page.path)));
        doc.push_str("</loc></url>\n");
    });

    doc.push_str("</urlset>\n");
    doc
}

fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
