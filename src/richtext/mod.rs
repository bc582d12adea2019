//! Rich text fields as delivered by the content backend
//!
//! A rich text field is a list of blocks (paragraphs, headings, list items,
//! images, embeds). Text-bearing blocks carry spans that mark ranges of the
//! text as strong, emphasised, linked or labelled. Span offsets count UTF-16
//! code units.

mod html;

use serde::Deserialize;

pub use html::{as_html, HtmlOptions, TrustedHtml};

/// A rich text field, or a key-text field holding a plain string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RichTextField {
    Blocks(Vec<Block>),
    Plain(String),
}

impl Default for RichTextField {
    fn default() -> Self {
        RichTextField::Blocks(Vec::new())
    }
}

impl RichTextField {
    /// Plain text of the field, text blocks joined by a single space
    pub fn as_text(&self) -> String {
        match self {
            RichTextField::Plain(text) => text.clone(),
            RichTextField::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Whether the field holds no text and no media
    pub fn is_empty(&self) -> bool {
        match self {
            RichTextField::Plain(text) => text.is_empty(),
            RichTextField::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

/// One block of a rich text field
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default, rename = "linkTo")]
    pub link_to: Option<Link>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

/// A styled range of a block's text
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

/// Payload of hyperlink and label spans
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SpanData {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub link: Option<Link>,
}

/// A link to the web, to media, or to another document
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Link {
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, rename = "type")]
    pub document_type: Option<String>,
}

/// oEmbed payload of an embed block
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default, rename = "type")]
    pub embed_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}
