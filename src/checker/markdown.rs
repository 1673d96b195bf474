// src/checker/markdown.rs
// =============================================================================
// This module finds outbound links in a wiki page, with byte offsets.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Can report the source byte range of every event (into_offset_iter)
//
// What counts as a link:
// - [text](url), [text][ref] and <url> autolinks
// - bare http(s) URLs in prose
// - <a href="url">...</a> written as inline or block HTML
//
// What does NOT count:
// - anything inside code blocks or `inline code`
// - images, relative links, mailto: and friends
// - the YAML front matter block at the top of a page
//
// An archive link sitting right after a link, like
//     [Title](https://example.com) [Archived](https://web.archive.org/...)
// is folded into the first link as its existing archive reference.
//
// Rust concepts:
// - Iterators: For processing the parser's event stream
// - Range<usize>: byte spans into the original text
// - OnceLock: compile a Regex once, reuse it forever
// =============================================================================

use std::ops::Range;
use std::sync::OnceLock;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Hosts whose links are archive references out of the box.
const DEFAULT_ARCHIVE_HOSTS: &[&str] = &[
    "web.archive.org",
    "archive.org",
    "archive.today",
    "archive.ph",
    "archive.is",
];

/// How a link was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `[text](url)`
    Inline,
    /// `[text][ref]`, `[ref][]` or `[ref]`
    Reference,
    /// `<url>`
    Autolink,
    /// A URL typed straight into the prose
    Bare,
    /// `<a href="url">`
    Html,
}

/// One hyperlink found in a document.
///
/// `span` indexes the exact text the occurrence was extracted from;
/// `snapshot` is the fingerprint of that text so the rewriter can refuse
/// to apply offsets to anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOccurrence {
    pub url: String,
    pub span: Range<usize>,
    /// Archive reference already present next to the link.
    pub archive: Option<String>,
    pub kind: LinkKind,
    #[serde(skip)]
    pub snapshot: blake3::Hash,
}

impl LinkOccurrence {
    pub fn is_archived(&self) -> bool {
        self.archive.is_some()
    }
}

/// A link we could not make sense of. Extraction skips it and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub span: Range<usize>,
    pub destination: String,
    pub reason: String,
}

/// Everything the extractor found in one document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub occurrences: Vec<LinkOccurrence>,
    pub issues: Vec<ParseIssue>,
}

/// Decides which URLs point at an archiving service.
#[derive(Debug, Clone)]
pub struct ArchiveMatcher {
    hosts: Vec<String>,
}

impl Default for ArchiveMatcher {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl ArchiveMatcher {
    /// Built-in archive hosts plus `extra` (lower-cased, duplicates dropped).
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut hosts: Vec<String> = DEFAULT_ARCHIVE_HOSTS.iter().map(|h| h.to_string()).collect();
        for host in extra {
            let host = host.into().to_ascii_lowercase();
            if !host.is_empty() && !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        Self { hosts }
    }

    /// True for the listed hosts and any of their subdomains.
    pub fn is_archive_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|archive| {
            host == *archive
                || host
                    .strip_suffix(archive.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Fingerprint of a text snapshot, stamped on every occurrence taken from it.
pub fn snapshot_fingerprint(text: &str) -> blake3::Hash {
    blake3::hash(text.as_bytes())
}

// A link before archive-reference folding.
struct Candidate {
    url: String,
    parsed: Url,
    span: Range<usize>,
    kind: LinkKind,
}

// Extracts all outbound links from a markdown document
//
// Parameters:
//   text: the whole document (borrowed, never modified)
//   matcher: which hosts count as archive services
//
// Returns: occurrences in document order with non-overlapping spans,
// plus the links that had to be skipped
//
// Example input:
//   "See [docs](http://example.com/a) for details."
//
// Example output:
//   one Inline occurrence of http://example.com/a spanning bytes 4..32
pub fn extract_links(text: &str, matcher: &ArchiveMatcher) -> Extraction {
    let body_start = front_matter_len(text);
    let body = &text[body_start..];

    let mut candidates = Vec::new();
    let mut issues = Vec::new();

    // Depth counters: links/images can nest (an image inside a link)
    let mut code_depth = 0usize;
    let mut link_depth = 0usize;

    // pulldown-cmark splits prose into several Text events (at `_`, `&`, ...).
    // Contiguous ones are glued back together before looking for bare URLs.
    let mut text_run: Option<Range<usize>> = None;

    let options = Options::ENABLE_FOOTNOTES | Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(body, options).into_offset_iter();

    for (event, range) in parser {
        // Offsets are relative to `body`; shift them back onto `text`
        let range = (range.start + body_start)..(range.end + body_start);

        if let Event::Text(_) = event {
            if code_depth == 0 && link_depth == 0 {
                text_run = match text_run.take() {
                    Some(run) if run.end == range.start => Some(run.start..range.end),
                    Some(run) => {
                        scan_bare_urls(text, run, &mut candidates);
                        Some(range)
                    }
                    None => Some(range),
                };
                continue;
            }
        }

        if let Some(run) = text_run.take() {
            scan_bare_urls(text, run, &mut candidates);
        }

        match event {
            Event::Start(Tag::CodeBlock(_)) => code_depth += 1,
            Event::End(Tag::CodeBlock(_)) => code_depth = code_depth.saturating_sub(1),

            // In pulldown-cmark 0.9, Link is Tag::Link(link_type, dest_url, title)
            Event::Start(Tag::Link(link_type, dest_url, _title)) => {
                link_depth += 1;
                if link_depth == 1 && code_depth == 0 {
                    if let Some(kind) = link_kind(link_type) {
                        push_destination(&dest_url, range, kind, &mut candidates, &mut issues);
                    }
                }
            }
            Event::End(Tag::Link(..)) => link_depth = link_depth.saturating_sub(1),

            // Images are not hyperlinks, and their alt text is not prose
            Event::Start(Tag::Image(..)) => link_depth += 1,
            Event::End(Tag::Image(..)) => link_depth = link_depth.saturating_sub(1),

            Event::Html(_) if code_depth == 0 && link_depth == 0 => {
                scan_html_anchors(text, range, &mut candidates, &mut issues);
            }

            // We don't care about other events (headings, code spans, etc.)
            _ => {}
        }
    }

    if let Some(run) = text_run.take() {
        scan_bare_urls(text, run, &mut candidates);
    }

    let snapshot = snapshot_fingerprint(text);
    Extraction {
        occurrences: fold_archive_references(text, candidates, matcher, snapshot),
        issues,
    }
}

fn link_kind(link_type: LinkType) -> Option<LinkKind> {
    match link_type {
        LinkType::Inline => Some(LinkKind::Inline),
        LinkType::Autolink => Some(LinkKind::Autolink),
        LinkType::Email => None,
        LinkType::Reference
        | LinkType::ReferenceUnknown
        | LinkType::Collapsed
        | LinkType::CollapsedUnknown
        | LinkType::Shortcut
        | LinkType::ShortcutUnknown => Some(LinkKind::Reference),
    }
}

// Validates a link destination and records it as a candidate or an issue.
// Relative links and non-HTTP schemes are silently ignored.
fn push_destination(
    dest: &str,
    span: Range<usize>,
    kind: LinkKind,
    candidates: &mut Vec<Candidate>,
    issues: &mut Vec<ParseIssue>,
) {
    let dest = dest.trim();
    if !is_http_link(dest) {
        return;
    }

    match Url::parse(dest) {
        Ok(parsed) if parsed.host_str().is_some() => candidates.push(Candidate {
            url: dest.to_string(),
            parsed,
            span,
            kind,
        }),
        Ok(_) => issues.push(ParseIssue {
            span,
            destination: dest.to_string(),
            reason: "URL has no host".into(),
        }),
        Err(e) => {
            tracing::debug!(destination = dest, error = %e, "skipping malformed link");
            issues.push(ParseIssue {
                span,
                destination: dest.to_string(),
                reason: e.to_string(),
            });
        }
    }
}

// Helper function to check if a URL is an HTTP/HTTPS link
//
// We want to skip:
// - mailto: links (email addresses)
// - tel: links (phone numbers)
// - javascript: links
// - Relative links to other wiki pages
fn is_http_link(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn bare_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bhttps?://[^\s<>\[\]"'`]+"#).expect("bare URL pattern is valid")
    })
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#)
            .expect("anchor pattern is valid")
    })
}

// Finds URLs typed directly into a run of prose.
fn scan_bare_urls(text: &str, run: Range<usize>, candidates: &mut Vec<Candidate>) {
    let slice = &text[run.clone()];
    for m in bare_url_regex().find_iter(slice) {
        let url = trim_bare_url(m.as_str());
        let Ok(parsed) = Url::parse(url) else {
            continue;
        };
        if parsed.host_str().is_none() {
            continue;
        }
        let start = run.start + m.start();
        candidates.push(Candidate {
            url: url.to_string(),
            parsed,
            span: start..start + url.len(),
            kind: LinkKind::Bare,
        });
    }
}

// Drops the prose around a bare URL match:
//   "see https://example.com." - the full stop ends the sentence
//   "(see https://example.com/a)" - the ")" closes the prose parenthesis
// while keeping balanced parentheses that belong to the path, as in
//   https://en.wikipedia.org/wiki/Rust_(programming_language)
fn trim_bare_url(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '*' | '~'));
        let unbalanced = trimmed.matches('(').count() < trimmed.matches(')').count();
        if trimmed.ends_with(')') && unbalanced {
            url = &trimmed[..trimmed.len() - 1];
            continue;
        }
        return trimmed;
    }
}

// Finds <a href="..."> anchors in an HTML event. The span runs to the
// matching </a> when it is in the same block, otherwise just the opening tag.
fn scan_html_anchors(
    text: &str,
    range: Range<usize>,
    candidates: &mut Vec<Candidate>,
    issues: &mut Vec<ParseIssue>,
) {
    let slice = &text[range.clone()];
    for caps in anchor_regex().captures_iter(slice) {
        let Some(tag) = caps.get(0) else { continue };
        let Some(href) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };

        let start = range.start + tag.start();
        let tag_end = range.start + tag.end();
        let end = closing_anchor_end(text, tag_end).unwrap_or(tag_end);
        push_destination(href.as_str(), start..end, LinkKind::Html, candidates, issues);
    }
}

fn closing_anchor_end(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    // Stay inside the current block
    let limit = rest.find("\n\n").unwrap_or(rest.len());
    let window = &rest[..limit];
    let pos = window.find("</a>").or_else(|| window.find("</A>"))?;
    Some(from + pos + "</a>".len())
}

// Sorts candidates, drops overlaps, and attaches archive links to the link
// they follow.
fn fold_archive_references(
    text: &str,
    mut candidates: Vec<Candidate>,
    matcher: &ArchiveMatcher,
    snapshot: blake3::Hash,
) -> Vec<LinkOccurrence> {
    candidates.sort_by_key(|c| (c.span.start, std::cmp::Reverse(c.span.end)));

    let mut occurrences: Vec<LinkOccurrence> = Vec::with_capacity(candidates.len());
    let mut last_end = 0usize;

    for candidate in candidates {
        // e.g. a bare URL inside the text of an <a> anchor
        if candidate.span.start < last_end {
            continue;
        }
        last_end = candidate.span.end;

        if matcher.is_archive_url(&candidate.parsed) {
            if let Some(prev) = occurrences.last_mut() {
                if prev.archive.is_none()
                    && is_adjacent_gap(&text[prev.span.end..candidate.span.start])
                {
                    prev.archive = Some(candidate.url);
                    continue;
                }
            }
            // A bare archive link is already an archive reference by itself
            occurrences.push(LinkOccurrence {
                archive: Some(candidate.url.clone()),
                url: candidate.url,
                span: candidate.span,
                kind: candidate.kind,
                snapshot,
            });
            continue;
        }

        occurrences.push(LinkOccurrence {
            url: candidate.url,
            span: candidate.span,
            archive: None,
            kind: candidate.kind,
            snapshot,
        });
    }

    occurrences
}

// "", " ", " (", ", ", " - " ... but never a line break or real words.
fn is_adjacent_gap(gap: &str) -> bool {
    let trimmed = gap.trim_matches(|c| c == ' ' || c == '\t');
    trimmed.is_empty() || matches!(trimmed, "(" | "," | ";" | ":" | "-")
}

// Length of a leading `---` front matter block, or 0 when there is none.
fn front_matter_len(text: &str) -> usize {
    let Some(first_end) = text.find('\n') else {
        return 0;
    };
    if text[..first_end].trim_end_matches('\r') != "---" {
        return 0;
    }

    let mut pos = first_end + 1;
    for line in text[pos..].split_inclusive('\n') {
        pos += line.len();
        if line.trim_end_matches(|c| c == '\r' || c == '\n') == "---" {
            return pos;
        }
    }
    // Unterminated block: treat the whole thing as markdown
    0
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does into_offset_iter() give us?
//    - The normal parser yields just events
//    - into_offset_iter() yields (event, byte_range) pairs
//    - For Start(..) events the range covers the whole element, so for a
//      link it covers "[text](url)" from the '[' to the ')'
//
// 2. Why Range<usize> instead of (usize, usize)?
//    - Ranges slice strings directly: &text[span.clone()]
//    - They are Clone but not Copy, hence the .clone() calls
//
// 3. What is OnceLock?
//    - A cell that is written at most once, safely across threads
//    - Regex::new is slow-ish, so we build each pattern the first time
//      it's needed and hand out &'static references afterwards
//
// 4. What is let-else?
//    - let Some(x) = opt else { continue; };
//    - Binds x when the pattern matches, otherwise runs the else block,
//      which must leave the scope (return/continue/break)
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Extraction {
        extract_links(text, &ArchiveMatcher::new(["archive.example"]))
    }

    #[test]
    fn test_extract_simple_link() {
        let markdown = "See [docs](http://example.com/a) for details.";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.url, "http://example.com/a");
        assert_eq!(link.kind, LinkKind::Inline);
        assert_eq!(&markdown[link.span.clone()], "[docs](http://example.com/a)");
        assert!(!link.is_archived());
    }

    #[test]
    fn test_skip_code_blocks_and_inline_code() {
        let markdown = r#"
Use `curl https://inline.example/x` to test.

```
[fenced](https://fenced.example/)
https://fenced.example/bare
```

    https://indented.example/

Real link: <https://real.example/>
"#;
        let found = extract(markdown);
        let urls: Vec<&str> = found.occurrences.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, vec!["https://real.example/"]);
        assert_eq!(found.occurrences[0].kind, LinkKind::Autolink);
    }

    #[test]
    fn test_bare_url_trims_sentence_punctuation() {
        let markdown = "Visit https://example.com/page. Thanks!";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.url, "https://example.com/page");
        assert_eq!(link.kind, LinkKind::Bare);
        assert_eq!(&markdown[link.span.clone()], "https://example.com/page");
    }

    #[test]
    fn test_bare_url_with_underscores_stays_whole() {
        let markdown = "Spec at https://example.com/some_long_path here";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
        assert_eq!(found.occurrences[0].url, "https://example.com/some_long_path");
    }

    #[test]
    fn test_bare_url_keeps_balanced_parentheses() {
        let markdown = "See https://en.wikipedia.org/wiki/Rust_(programming_language) now.";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.url, "https://en.wikipedia.org/wiki/Rust_(programming_language)");
        assert_eq!(
            &markdown[link.span.clone()],
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
    }

    #[test]
    fn test_bare_url_inside_prose_parentheses() {
        let markdown = "Rust (https://en.wikipedia.org/wiki/Rust_(programming_language)) and Go (https://go.dev/).";
        let found = extract(markdown);
        let urls: Vec<&str> = found.occurrences.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://en.wikipedia.org/wiki/Rust_(programming_language)",
                "https://go.dev/",
            ]
        );
    }

    #[test]
    fn test_trim_bare_url() {
        assert_eq!(trim_bare_url("https://a.example/x)."), "https://a.example/x");
        assert_eq!(trim_bare_url("https://a.example/f(x)"), "https://a.example/f(x)");
        assert_eq!(trim_bare_url("https://a.example/path_"), "https://a.example/path_");
        assert_eq!(trim_bare_url("https://a.example/page?!"), "https://a.example/page");
    }

    #[test]
    fn test_adjacent_archive_link_is_attached() {
        let markdown = "[Title](http://example.com/a) [Archived](https://web.archive.org/web/2020/http://example.com/a)";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.url, "http://example.com/a");
        assert_eq!(
            link.archive.as_deref(),
            Some("https://web.archive.org/web/2020/http://example.com/a")
        );
        assert_eq!(&markdown[link.span.clone()], "[Title](http://example.com/a)");
    }

    #[test]
    fn test_parenthetical_archive_link_is_attached() {
        let markdown = "[Title](http://example.com/a) ([archive](https://archive.ph/abc))";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
        assert_eq!(found.occurrences[0].archive.as_deref(), Some("https://archive.ph/abc"));
    }

    #[test]
    fn test_archive_link_after_prose_is_standalone() {
        let markdown = "[Title](http://example.com/a) and later [snap](https://web.archive.org/web/1/x)";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 2);
        assert!(found.occurrences[0].archive.is_none());
        assert_eq!(
            found.occurrences[1].archive.as_deref(),
            Some("https://web.archive.org/web/1/x")
        );
    }

    #[test]
    fn test_configured_archive_host() {
        let markdown = "[a](http://example.com/a) [Archived](http://archive.example/a)";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
        assert_eq!(found.occurrences[0].archive.as_deref(), Some("http://archive.example/a"));
    }

    #[test]
    fn test_html_anchor() {
        let markdown = r#"Read <a href="https://example.com/html">this page</a> first."#;
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.kind, LinkKind::Html);
        assert_eq!(link.url, "https://example.com/html");
        assert_eq!(
            &markdown[link.span.clone()],
            r#"<a href="https://example.com/html">this page</a>"#
        );
    }

    #[test]
    fn test_malformed_link_is_skipped_not_fatal() {
        let markdown = "[bad](http://) then [good](https://example.com/ok)";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
        assert_eq!(found.occurrences[0].url, "https://example.com/ok");
        assert_eq!(found.issues.len(), 1);
        assert_eq!(found.issues[0].destination, "http://");
        assert_eq!(&markdown[found.issues[0].span.clone()], "[bad](http://)");
    }

    #[test]
    fn test_skip_mailto_relative_and_images() {
        let markdown = "[mail](mailto:a@b.c) [page](./Other.md) ![logo](https://img.example/logo.png)";
        let found = extract(markdown);
        assert!(found.occurrences.is_empty());
        assert!(found.issues.is_empty());
    }

    #[test]
    fn test_front_matter_is_ignored() {
        let markdown = "---\ntitle: Page\nsource: https://front.example/\n---\nBody [x](https://body.example/)\n";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.url, "https://body.example/");
        assert_eq!(&markdown[link.span.clone()], "[x](https://body.example/)");
    }

    #[test]
    fn test_footnote_citation() {
        let markdown = "A claim.[^1]\n\n[^1]: Source, [Report](https://example.com/report)\n";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
        assert_eq!(found.occurrences[0].url, "https://example.com/report");
    }

    #[test]
    fn test_reference_link() {
        let markdown = "See [the docs][docs].\n\n[docs]: https://example.com/docs\n";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);

        let link = &found.occurrences[0];
        assert_eq!(link.kind, LinkKind::Reference);
        assert_eq!(link.url, "https://example.com/docs");
        assert_eq!(&markdown[link.span.clone()], "[the docs][docs]");
    }

    #[test]
    fn test_link_text_url_not_counted_twice() {
        let markdown = "[https://example.com/](https://example.com/)";
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 1);
    }

    #[test]
    fn test_spans_are_ordered_and_disjoint() {
        let markdown = r#"
# Links

Bare https://one.example/ and [two](https://two.example/) and <https://three.example/>.

<p><a href="https://four.example/">https://four.example/</a></p>

[^1]: [five](https://five.example/) [Archived](https://web.archive.org/web/1/https://five.example/)
"#;
        let found = extract(markdown);
        assert_eq!(found.occurrences.len(), 5);
        for pair in found.occurrences.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }

    #[test]
    fn test_input_is_not_modified_and_snapshot_matches() {
        let markdown = String::from("[a](https://a.example/)");
        let before = markdown.clone();
        let found = extract(&markdown);
        assert_eq!(markdown, before);
        assert_eq!(found.occurrences[0].snapshot, snapshot_fingerprint(&markdown));
    }

    #[test]
    fn test_snapshot_fingerprint_is_blake3_of_the_text() {
        assert_eq!(
            snapshot_fingerprint("").to_hex().as_str(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
        assert_ne!(snapshot_fingerprint("a\n"), snapshot_fingerprint("a\r\n"));
    }

    #[test]
    fn test_no_links() {
        let found = extract("Just some prose.\n\nNothing to see.\n");
        assert!(found.occurrences.is_empty());
    }

    #[test]
    fn test_matcher_subdomains() {
        let matcher = ArchiveMatcher::default();
        assert!(matcher.is_archive_url(&Url::parse("https://web.archive.org/web/1/x").unwrap()));
        assert!(matcher.is_archive_url(&Url::parse("https://wayback.archive.org/").unwrap()));
        assert!(!matcher.is_archive_url(&Url::parse("https://notarchive.org/").unwrap()));
    }
}
