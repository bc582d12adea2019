//! Maps raw documents to view models

use serde::Deserialize;
use thiserror::Error;

use super::{Banner, ContentBlock, PostDetail, PostSummary};
use crate::client::Document;
use crate::config::SiteConfig;
use crate::helpers::{is_valid_slug, DateError, DateFormatter};
use crate::richtext::{as_html, HtmlOptions, RichTextField};

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Document {id} has no uid")]
    MissingUid { id: String },

    #[error("Document {id} has uid {uid:?}, which cannot be used as a slug")]
    InvalidUid { id: String, uid: String },

    #[error("Document {id} is malformed: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document {id} has an invalid date: {source}")]
    InvalidDate {
        id: String,
        #[source]
        source: DateError,
    },
}

/// Fields the list page reads
#[derive(Debug, Deserialize)]
struct SummaryFields {
    title: RichTextField,
    #[serde(default)]
    subtitle: Option<RichTextField>,
    #[serde(default)]
    author: Option<RichTextField>,
}

/// Fields the post page reads
#[derive(Debug, Deserialize)]
struct DetailFields {
    title: RichTextField,
    #[serde(default)]
    subtitle: Option<RichTextField>,
    #[serde(default)]
    author: Option<RichTextField>,
    #[serde(default)]
    banner: Option<ImageField>,
    #[serde(default)]
    content: Option<Vec<SectionField>>,
}

#[derive(Debug, Deserialize)]
struct ImageField {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionField {
    #[serde(default)]
    heading: Option<RichTextField>,
    #[serde(default)]
    body: Option<RichTextField>,
}

fn text_of(field: &Option<RichTextField>) -> String {
    field.as_ref().map(RichTextField::as_text).unwrap_or_default()
}

/// Number of whitespace-separated words in a section
pub fn word_count(heading: &str, body: &str) -> usize {
    heading.split_whitespace().count() + body.split_whitespace().count()
}

/// Reading time in minutes, rounded to the nearest minute
///
/// Zero words read in zero minutes; there is no lower clamp.
pub fn reading_minutes(words: usize, words_per_minute: u32) -> u64 {
    if words_per_minute == 0 {
        return 0;
    }
    (words as f64 / f64::from(words_per_minute)).round() as u64
}

/// Turns documents into [`PostSummary`] and [`PostDetail`] values
#[derive(Debug, Clone)]
pub struct Mapper {
    dates: DateFormatter,
    html: HtmlOptions,
    words_per_minute: u32,
}

impl Mapper {
    pub fn new(dates: DateFormatter, html: HtmlOptions, words_per_minute: u32) -> Self {
        Self {
            dates,
            html,
            words_per_minute,
        }
    }

    /// Create a mapper from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, DateError> {
        let dates = DateFormatter::new(
            &config.content.date_format,
            &config.content.locale,
            &config.content.timezone,
        )?;
        let html = HtmlOptions {
            trust_embed_html: config.content.trust_embed_html,
            document_route: crate::helpers::url_for(config, "post/"),
        };
        Ok(Self::new(dates, html, config.content.words_per_minute))
    }

    /// Slug of a document whose uid can name a page
    pub fn usable_slug(doc: &Document) -> Option<&str> {
        doc.uid.as_deref().filter(|uid| is_valid_slug(uid))
    }

    fn slug(doc: &Document) -> Result<String, MapError> {
        match doc.uid.as_deref() {
            None => Err(MapError::MissingUid { id: doc.id.clone() }),
            Some(uid) if !is_valid_slug(uid) => Err(MapError::InvalidUid {
                id: doc.id.clone(),
                uid: uid.to_string(),
            }),
            Some(uid) => Ok(uid.to_string()),
        }
    }

    fn date(&self, doc: &Document) -> Result<Option<String>, MapError> {
        self.dates
            .format_opt(doc.first_publication_date.as_deref())
            .map_err(|source| MapError::InvalidDate {
                id: doc.id.clone(),
                source,
            })
    }

    fn fields<T: for<'de> Deserialize<'de>>(doc: &Document) -> Result<T, MapError> {
        T::deserialize(&doc.data).map_err(|source| MapError::Malformed {
            id: doc.id.clone(),
            source,
        })
    }

    /// Map a document to its list entry
    pub fn summary(&self, doc: &Document) -> Result<PostSummary, MapError> {
        let fields: SummaryFields = Self::fields(doc)?;
        Ok(PostSummary {
            slug: Self::slug(doc)?,
            date: self.date(doc)?,
            title: fields.title.as_text(),
            subtitle: text_of(&fields.subtitle),
            author: text_of(&fields.author),
        })
    }

    /// Map a batch of documents, keeping their order
    ///
    /// Documents without a usable uid have no page to link to and are left
    /// out. Of the rest, either every document maps or none is returned.
    pub fn summaries(&self, docs: &[Document]) -> Result<Vec<PostSummary>, MapError> {
        docs.iter()
            .filter(|doc| {
                let usable = Self::usable_slug(doc).is_some();
                if !usable {
                    tracing::warn!("Leaving out document {} with uid {:?}", doc.id, doc.uid);
                }
                usable
            })
            .map(|doc| self.summary(doc))
            .collect()
    }

    /// Map a document to its full page
    pub fn detail(&self, doc: &Document) -> Result<PostDetail, MapError> {
        let fields: DetailFields = Self::fields(doc)?;

        let mut total_words = 0;
        let content: Vec<ContentBlock> = fields
            .content
            .unwrap_or_default()
            .iter()
            .map(|section| {
                let heading = text_of(&section.heading);
                let body_text = text_of(&section.body);
                total_words += word_count(&heading, &body_text);

                let body = section
                    .body
                    .as_ref()
                    .map(|b| as_html(b, &self.html))
                    .unwrap_or_default();

                ContentBlock {
                    anchor: slug::slugify(&heading),
                    heading,
                    body,
                }
            })
            .collect();

        let banner = fields.banner.and_then(|image| {
            image.url.filter(|u| !u.is_empty()).map(|url| Banner {
                url,
                alt: image.alt.unwrap_or_default(),
            })
        });

        Ok(PostDetail {
            slug: Self::slug(doc)?,
            date: self.date(doc)?,
            title: fields.title.as_text(),
            subtitle: text_of(&fields.subtitle),
            author: text_of(&fields.author),
            banner,
            content,
            word_count: total_words,
            reading_minutes: reading_minutes(total_words, self.words_per_minute),
        })
    }
}
