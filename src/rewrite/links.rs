//! Link rewriting for exported pages.
//!
//! Turns the host's page-to-page navigation links into anchors that resolve
//! inside the generated document, makes in-page anchors unique across pages,
//! and strips the authoring links (create/edit) that make no sense offline.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::{ExportFormat, PageId};

/// Every link shape the rewriter cares about, tried left to right.
///
/// Alternatives are ordered so that whole elements (edit and create anchors)
/// win over the generic opening-tag branch at the same position.
static LINK_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)(?P<edit><a\s+href=["']edit\.php[^\n]*?\[edit\]</a>)"#,
        r#"|(?P<create><a\b[^>]*?\bhref\s*=\s*["'](?:[^"']*/mod/lesson/)?create\.php[^"']*["'][^>]*>(?P<text>.*?)</a>)"#,
        r#"|(?P<open><a\b[^>]*>)"#,
        r#"|(?P<element><[a-z][a-z0-9]*\b[^>]*?\sid\s*=\s*["'][^>]*>)"#,
        r#"|(?P<url>https?://[^\s"'<>]+?/mod/lesson/view\.php\?[^\s"'<>#]*)"#,
    ))
    .expect("link scan pattern is valid")
});

/// `href`, `name` and `id` attributes inside one opening tag.
static TAG_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<ws>\s+)(?P<attr>href|name|id)(?P<eq>\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("attribute pattern is valid")
});

/// Result of rewriting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewrite {
    /// The rewritten HTML.
    pub content: String,
    /// In-page anchors (references and definitions) made unique.
    pub anchors: usize,
    /// Navigation links turned into document-internal targets.
    pub cross_page: usize,
    /// Authoring links removed.
    pub removed: usize,
}

/// What to do with one attribute value.
enum AttrRewrite {
    Keep,
    Replace(String),
    Drop,
}

/// Rewrites navigation links for a single export run.
///
/// Holds the host site root and the set of pages taking part in the export.
/// A link to a page outside that set is left untouched.
pub struct LinkRewriter<'a> {
    site_url: &'a str,
    known: &'a HashSet<PageId>,
    format: ExportFormat,
}

impl<'a> LinkRewriter<'a> {
    /// Creates a rewriter. `site_url` is the host root without a trailing slash
    /// (an empty root accepts view links on any host).
    pub fn new(site_url: &'a str, known: &'a HashSet<PageId>, format: ExportFormat) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/'),
            known,
            format,
        }
    }

    /// Rewrites the links in one page's HTML in a single left-to-right scan.
    pub fn rewrite(&self, html: &str, page: PageId) -> LinkRewrite {
        let anchors = Cell::new(0usize);
        let cross_page = Cell::new(0usize);
        let removed = Cell::new(0usize);

        let content = LINK_SCAN.replace_all(html, |caps: &Captures| {
            if caps.name("edit").is_some() {
                removed.set(removed.get() + 1);
                String::new()
            } else if caps.name("create").is_some() {
                removed.set(removed.get() + 1);
                caps.name("text").map_or("", |m| m.as_str()).to_string()
            } else if let Some(open) = caps.name("open") {
                self.rewrite_open_tag(open.as_str(), page, &anchors, &cross_page, &removed)
            } else if let Some(element) = caps.name("element") {
                self.rename_ids(element.as_str(), page, &anchors)
            } else {
                let url = &caps[0];
                match self.known_view_target(url) {
                    Some(target) => {
                        cross_page.set(cross_page.get() + 1);
                        target
                    }
                    None => url.to_string(),
                }
            }
        });

        LinkRewrite {
            content: content.into_owned(),
            anchors: anchors.get(),
            cross_page: cross_page.get(),
            removed: removed.get(),
        }
    }

    fn rewrite_open_tag(
        &self,
        tag: &str,
        page: PageId,
        anchors: &Cell<usize>,
        cross_page: &Cell<usize>,
        removed: &Cell<usize>,
    ) -> String {
        TAG_ATTR
            .replace_all(tag, |caps: &Captures| {
                let (value, quote) = match (caps.name("dq"), caps.name("sq")) {
                    (Some(v), _) => (v.as_str(), '"'),
                    (None, Some(v)) => (v.as_str(), '\''),
                    (None, None) => return caps[0].to_string(),
                };
                let is_href = caps["attr"].eq_ignore_ascii_case("href");

                let action = if is_href {
                    self.rewrite_href(value, page, anchors, cross_page, removed)
                } else if self.format.is_paginated() && !value.is_empty() {
                    anchors.set(anchors.get() + 1);
                    AttrRewrite::Replace(format!("{value}-{page}"))
                } else {
                    AttrRewrite::Keep
                };

                match action {
                    AttrRewrite::Keep => caps[0].to_string(),
                    AttrRewrite::Drop => String::new(),
                    AttrRewrite::Replace(new_value) => format!(
                        "{}{}{}{quote}{new_value}{quote}",
                        &caps["ws"], &caps["attr"], &caps["eq"]
                    ),
                }
            })
            .into_owned()
    }

    /// Renames the `id` of a non-anchor element the same way as `name`.
    fn rename_ids(&self, tag: &str, page: PageId, anchors: &Cell<usize>) -> String {
        if !self.format.is_paginated() {
            return tag.to_string();
        }
        TAG_ATTR
            .replace_all(tag, |caps: &Captures| {
                let (value, quote) = match (caps.name("dq"), caps.name("sq")) {
                    (Some(v), _) => (v.as_str(), '"'),
                    (None, Some(v)) => (v.as_str(), '\''),
                    (None, None) => return caps[0].to_string(),
                };
                if !caps["attr"].eq_ignore_ascii_case("id") || value.is_empty() {
                    return caps[0].to_string();
                }
                anchors.set(anchors.get() + 1);
                format!(
                    "{}{}{}{quote}{value}-{page}{quote}",
                    &caps["ws"], &caps["attr"], &caps["eq"]
                )
            })
            .into_owned()
    }

    fn rewrite_href(
        &self,
        value: &str,
        page: PageId,
        anchors: &Cell<usize>,
        cross_page: &Cell<usize>,
        removed: &Cell<usize>,
    ) -> AttrRewrite {
        if let Some(name) = value.strip_prefix('#') {
            if self.format.is_paginated() && !name.is_empty() {
                anchors.set(anchors.get() + 1);
                return AttrRewrite::Replace(format!("#{name}-{page}"));
            }
            return AttrRewrite::Keep;
        }
        if self.is_create_url(value) {
            removed.set(removed.get() + 1);
            return AttrRewrite::Drop;
        }
        match self.known_view_target(value) {
            Some(target) => {
                cross_page.set(cross_page.get() + 1);
                AttrRewrite::Replace(target)
            }
            None => AttrRewrite::Keep,
        }
    }

    /// Returns the in-document target for a view link to an exported page.
    fn known_view_target(&self, url: &str) -> Option<String> {
        let id = view_page_id(self.strip_site(url)?)?;
        self.known.contains(&id).then(|| page_target(id, self.format))
    }

    /// Strips the site root, returning the host-relative part.
    ///
    /// Returns `None` for absolute URLs on some other host.
    fn strip_site<'u>(&self, url: &'u str) -> Option<&'u str> {
        if !self.site_url.is_empty() {
            if let Some(rest) = url.strip_prefix(self.site_url) {
                return Some(rest);
            }
        } else if let Some(after_scheme) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        {
            return after_scheme.find('/').map(|slash| &after_scheme[slash..]);
        }
        if url.contains("://") {
            return None;
        }
        Some(url)
    }

    fn is_create_url(&self, url: &str) -> bool {
        self.strip_site(url).is_some_and(|path| {
            let path = path.split(['?', '#']).next().unwrap_or(path);
            path == "create.php" || path.ends_with("/mod/lesson/create.php")
        })
    }
}

/// Returns the document-internal target of a page for the given format.
pub fn page_target(id: PageId, format: ExportFormat) -> String {
    if format.is_paginated() {
        format!("#pageid-{id}")
    } else {
        format!("pageid-{id}.xhtml")
    }
}

/// Extracts the numeric `pageid` from a host-relative view link.
fn view_page_id(path: &str) -> Option<PageId> {
    let query = path
        .strip_prefix("/mod/lesson/view.php?")
        .or_else(|| path.strip_prefix("view.php?"))?;
    let query = query.split('#').next().unwrap_or(query);
    let query = query.replace("&amp;", "&");

    query.split('&').find_map(|pair| {
        let digits = pair.strip_prefix("pageid=")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok().map(PageId::new)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://school.example";

    fn known(ids: &[i64]) -> HashSet<PageId> {
        ids.iter().copied().map(PageId::new).collect()
    }

    fn pdf(html: &str, page: i64, ids: &[i64]) -> LinkRewrite {
        let set = known(ids);
        LinkRewriter::new(SITE, &set, ExportFormat::Pdf).rewrite(html, PageId::new(page))
    }

    fn epub(html: &str, page: i64, ids: &[i64]) -> LinkRewrite {
        let set = known(ids);
        LinkRewriter::new(SITE, &set, ExportFormat::Epub).rewrite(html, PageId::new(page))
    }

    // ===========================================
    // In-page anchors
    // ===========================================

    #[test]
    fn anchor_reference_gets_page_suffix() {
        let result = pdf(r##"<a href="#intro">x</a>"##, 7, &[7]);
        assert_eq!(result.content, r##"<a href="#intro-7">x</a>"##);
        assert_eq!(result.anchors, 1);
    }

    #[test]
    fn anchor_definition_is_renamed_to_match() {
        let result = pdf(r#"<a name="intro"></a><p>Hello</p>"#, 7, &[7]);
        assert_eq!(result.content, r#"<a name="intro-7"></a><p>Hello</p>"#);
    }

    #[test]
    fn element_id_is_renamed_to_match_references() {
        let html = r##"<h3 id="steps">Steps</h3><p><a href="#steps">back</a></p>"##;
        let result = pdf(html, 7, &[7]);
        assert_eq!(
            result.content,
            r##"<h3 id="steps-7">Steps</h3><p><a href="#steps-7">back</a></p>"##
        );
        assert_eq!(result.anchors, 2);
    }

    #[test]
    fn anchor_id_is_renamed_with_its_name() {
        let result = pdf(r#"<a id="top" name="top"></a>"#, 4, &[4]);
        assert_eq!(result.content, r#"<a id="top-4" name="top-4"></a>"#);
    }

    #[test]
    fn same_id_on_two_pages_stays_distinct() {
        let first = pdf(r#"<p id="note">a</p>"#, 1, &[1, 2]);
        let second = pdf(r#"<p id="note">b</p>"#, 2, &[1, 2]);
        assert_ne!(first.content, second.content);
        assert!(second.content.contains(r#"id="note-2""#));
    }

    #[test]
    fn element_attributes_other_than_id_are_kept() {
        let html = r#"<input name="q" id="q" data-id="x">"#;
        let result = pdf(html, 3, &[3]);
        assert_eq!(result.content, r#"<input name="q" id="q-3" data-id="x">"#);
    }

    #[test]
    fn reflowable_output_keeps_anchors() {
        let html = r##"<a name="intro"></a><h2 id="part">P</h2><a href="#intro">x</a>"##;
        let result = epub(html, 7, &[7]);
        assert_eq!(result.content, html);
        assert_eq!(result.anchors, 0);
    }

    #[test]
    fn bare_hash_is_left_alone() {
        let result = pdf(r##"<a href="#">top</a>"##, 3, &[3]);
        assert_eq!(result.content, r##"<a href="#">top</a>"##);
    }

    // ===========================================
    // Cross-page navigation
    // ===========================================

    #[test]
    fn view_link_to_exported_page_becomes_destination() {
        let html = r#"<a href="https://school.example/mod/lesson/view.php?pageid=42">next</a>"#;
        let result = pdf(html, 1, &[1, 42]);
        assert_eq!(result.content, r##"<a href="#pageid-42">next</a>"##);
        assert_eq!(result.cross_page, 1);
    }

    #[test]
    fn view_link_to_unknown_page_is_untouched() {
        let html = r#"<a href="https://school.example/mod/lesson/view.php?pageid=42">next</a>"#;
        let result = pdf(html, 1, &[1, 2]);
        assert_eq!(result.content, html);
        assert_eq!(result.cross_page, 0);
    }

    #[test]
    fn reflowable_target_is_page_document() {
        let html = r#"<a href="https://school.example/mod/lesson/view.php?pageid=42">next</a>"#;
        let result = epub(html, 1, &[42]);
        assert_eq!(result.content, r#"<a href="pageid-42.xhtml">next</a>"#);
    }

    #[test]
    fn view_link_with_escaped_query_is_matched() {
        let html = r#"<a class="btn" href="https://school.example/mod/lesson/view.php?id=9&amp;pageid=42">go</a>"#;
        let result = pdf(html, 1, &[42]);
        assert_eq!(result.content, r##"<a class="btn" href="#pageid-42">go</a>"##);
    }

    #[test]
    fn relative_view_link_is_matched() {
        let result = pdf(r#"<a href='view.php?pageid=5'>five</a>"#, 1, &[5]);
        assert_eq!(result.content, r##"<a href='#pageid-5'>five</a>"##);
    }

    #[test]
    fn non_numeric_page_id_passes_through() {
        let html = r#"<a href="https://school.example/mod/lesson/view.php?pageid=abc">x</a>"#;
        assert_eq!(pdf(html, 1, &[1]).content, html);
    }

    #[test]
    fn view_link_on_other_host_passes_through() {
        let html = r#"<a href="https://elsewhere.example/mod/lesson/view.php?pageid=42">x</a>"#;
        assert_eq!(pdf(html, 1, &[42]).content, html);
    }

    #[test]
    fn bare_view_url_in_text_is_rewritten() {
        let html = "See https://school.example/mod/lesson/view.php?pageid=42 for more";
        assert_eq!(pdf(html, 1, &[42]).content, "See #pageid-42 for more");
    }

    // ===========================================
    // Housekeeping
    // ===========================================

    #[test]
    fn edit_link_is_removed() {
        let html = r#"<p>Question</p><a href="edit.php?id=3&amp;pageid=9">[edit]</a>"#;
        let result = pdf(html, 9, &[9]);
        assert_eq!(result.content, "<p>Question</p>");
        assert_eq!(result.removed, 1);
    }

    #[test]
    fn create_anchor_keeps_only_its_text() {
        let html = r#"<a href="https://school.example/mod/lesson/create.php?pageid=2">Add a page</a> after"#;
        let result = pdf(html, 2, &[2]);
        assert_eq!(result.content, "Add a page after");
        assert_eq!(result.removed, 1);
    }

    #[test]
    fn untouched_html_round_trips() {
        let html = "<p>No links <strong>here</strong>.</p><img src=\"a.png\">";
        let result = pdf(html, 1, &[1]);
        assert_eq!(result.content, html);
        assert_eq!((result.anchors, result.cross_page, result.removed), (0, 0, 0));
    }

    #[test]
    fn page_targets_differ_by_format() {
        assert_eq!(page_target(PageId::new(3), ExportFormat::Pdf), "#pageid-3");
        assert_eq!(page_target(PageId::new(3), ExportFormat::Epub), "pageid-3.xhtml");
    }
}
