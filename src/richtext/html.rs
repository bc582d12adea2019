//! HTML serialization of rich text fields

use serde::Serialize;
use std::fmt;

use super::{Block, BlockKind, Link, RichTextField, Span, SpanKind};
use crate::helpers::html_escape;

/// HTML produced by [`as_html`]
///
/// All text and attribute values inside are escaped and only whitelisted
/// link schemes are emitted, so templates may output it without escaping.
/// Provider HTML of embeds is only included when
/// [`HtmlOptions::trust_embed_html`] is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for HTML serialization
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// Emit the provider HTML of embed blocks verbatim
    pub trust_embed_html: bool,
    /// Route prefix for links to other documents, e.g. `/post/`
    pub document_route: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            trust_embed_html: false,
            document_route: "/post/".to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Serialize a rich text field to HTML
pub fn as_html(field: &RichTextField, options: &HtmlOptions) -> TrustedHtml {
    let blocks = match field {
        RichTextField::Plain(text) => return TrustedHtml(escape_text(text)),
        RichTextField::Blocks(blocks) => blocks,
    };

    let mut out = String::new();
    let mut open_list: Option<ListKind> = None;

    for block in blocks {
        let list = match block.kind {
            BlockKind::ListItem => Some(ListKind::Unordered),
            BlockKind::OrderedListItem => Some(ListKind::Ordered),
            _ => None,
        };

        if open_list != list {
            if let Some(kind) = open_list {
                out.push_str(&format!("</{}>", kind.tag()));
            }
            if let Some(kind) = list {
                out.push_str(&format!("<{}>", kind.tag()));
            }
            open_list = list;
        }

        render_block(&mut out, block, options);
    }

    if let Some(kind) = open_list {
        out.push_str(&format!("</{}>", kind.tag()));
    }

    TrustedHtml(out)
}

fn render_block(out: &mut String, block: &Block, options: &HtmlOptions) {
    let text = block.text.as_deref().unwrap_or("");
    let wrap = |tag: &str| {
        format!(
            "<{tag}>{}</{tag}>",
            render_inline(text, &block.spans, options)
        )
    };

    match block.kind {
        BlockKind::Heading1 => out.push_str(&wrap("h1")),
        BlockKind::Heading2 => out.push_str(&wrap("h2")),
        BlockKind::Heading3 => out.push_str(&wrap("h3")),
        BlockKind::Heading4 => out.push_str(&wrap("h4")),
        BlockKind::Heading5 => out.push_str(&wrap("h5")),
        BlockKind::Heading6 => out.push_str(&wrap("h6")),
        BlockKind::Paragraph => out.push_str(&wrap("p")),
        BlockKind::Preformatted => out.push_str(&wrap("pre")),
        BlockKind::ListItem | BlockKind::OrderedListItem => out.push_str(&wrap("li")),
        BlockKind::Image => render_image(out, block, options),
        BlockKind::Embed => render_embed(out, block, options),
        BlockKind::Unknown => {
            tracing::debug!("Skipping rich text block of unknown type");
        }
    }
}

fn render_image(out: &mut String, block: &Block, options: &HtmlOptions) {
    let Some(src) = block.url.as_deref().filter(|u| is_safe_url(u)) else {
        return;
    };
    let img = format!(
        r#"<img src="{}" alt="{}" />"#,
        html_escape(src),
        html_escape(block.alt.as_deref().unwrap_or(""))
    );
    let linked = block
        .link_to
        .as_ref()
        .and_then(|link| resolve_link(link, options))
        .map(|open| format!("{}{}</a>", open, img))
        .unwrap_or(img);
    out.push_str(&format!(r#"<p class="block-img">{}</p>"#, linked));
}

fn render_embed(out: &mut String, block: &Block, options: &HtmlOptions) {
    let Some(embed) = block.oembed.as_ref() else {
        return;
    };
    let url = embed.embed_url.as_deref().filter(|u| is_safe_url(u));

    if options.trust_embed_html {
        if let Some(html) = embed.html.as_deref() {
            out.push_str(&format!(
                r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                html_escape(url.unwrap_or("")),
                html_escape(embed.embed_type.as_deref().unwrap_or("")),
                html
            ));
            return;
        }
    }

    if let Some(url) = url {
        let title = embed.title.as_deref().unwrap_or(url);
        out.push_str(&format!(
            r#"<p class="block-embed"><a href="{}" target="_blank" rel="noopener noreferrer">{}</a></p>"#,
            html_escape(url),
            escape_text(title)
        ));
    }
}

/// Render a block's text with its spans as properly nested inline tags
fn render_inline(text: &str, spans: &[Span], options: &HtmlOptions) -> String {
    let chars: Vec<char> = text.chars().collect();

    // UTF-16 offset at which each char starts
    let mut utf16_starts = Vec::with_capacity(chars.len());
    let mut offset = 0;
    for c in &chars {
        utf16_starts.push(offset);
        offset += c.len_utf16();
    }
    let to_char_index = |utf16: usize| utf16_starts.partition_point(|&s| s < utf16);

    struct Resolved {
        start: usize,
        end: usize,
        open: String,
        close: &'static str,
    }

    let mut resolved: Vec<Resolved> = spans
        .iter()
        .filter_map(|span| {
            let start = to_char_index(span.start);
            let end = to_char_index(span.end).min(chars.len());
            if start >= end {
                return None;
            }
            let (open, close) = open_close(span, options)?;
            Some(Resolved {
                start,
                end,
                open,
                close,
            })
        })
        .collect();
    // Outer spans first so inner ones nest inside them
    resolved.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut boundaries: Vec<usize> = vec![0, chars.len()];
    for span in &resolved {
        boundaries.push(span.start);
        boundaries.push(span.end);
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut out = String::new();
    let mut stack: Vec<usize> = Vec::new();

    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        let active: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start <= from && s.end >= to)
            .map(|(i, _)| i)
            .collect();

        let common = stack
            .iter()
            .zip(active.iter())
            .take_while(|(a, b)| a == b)
            .count();
        while stack.len() > common {
            if let Some(i) = stack.pop() {
                out.push_str(resolved[i].close);
            }
        }
        for &i in &active[common..] {
            out.push_str(&resolved[i].open);
            stack.push(i);
        }

        let segment: String = chars[from..to].iter().collect();
        out.push_str(&escape_text(&segment));
    }

    while let Some(i) = stack.pop() {
        out.push_str(resolved[i].close);
    }

    out
}

fn open_close(span: &Span, options: &HtmlOptions) -> Option<(String, &'static str)> {
    match span.kind {
        SpanKind::Strong => Some(("<strong>".to_string(), "</strong>")),
        SpanKind::Em => Some(("<em>".to_string(), "</em>")),
        SpanKind::Label => {
            let label = span.data.as_ref()?.label.as_deref()?;
            Some((
                format!(r#"<span class="{}">"#, html_escape(label)),
                "</span>",
            ))
        }
        SpanKind::Hyperlink => {
            let link = span.data.as_ref()?.link.as_ref()?;
            Some((resolve_link(link, options)?, "</a>"))
        }
        SpanKind::Unknown => None,
    }
}

/// Opening anchor tag for a link, or `None` when it cannot be rendered safely
fn resolve_link(link: &Link, options: &HtmlOptions) -> Option<String> {
    let href = match link.link_type.as_deref() {
        Some("Document") => {
            let uid = link.uid.as_deref()?;
            format!("{}{}", options.document_route, uid)
        }
        _ => link.url.clone().filter(|u| is_safe_url(u))?,
    };

    let target = match link.target.as_deref() {
        Some(target) => format!(
            r#" target="{}" rel="noopener noreferrer""#,
            html_escape(target)
        ),
        None => String::new(),
    };

    Some(format!(r#"<a href="{}"{}>"#, html_escape(&href), target))
}

/// Whether a URL may be placed in `href`/`src`
///
/// Relative references and http(s), mailto and tel URLs are allowed.
fn is_safe_url(raw: &str) -> bool {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "mailto" | "tel"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Escape text content, keeping line breaks
fn escape_text(s: &str) -> String {
    html_escape(s).replace('\n', "<br />")
}
