//! Paginated post list ("load more")
//!
//! A [`PostFeed`] holds the summaries shown so far and the cursor of the next
//! page. Loading more appends the next page in backend order; nothing is
//! de-duplicated or re-ordered, so the list only ever grows.

use thiserror::Error;

use super::{MapError, Mapper, PostSummary};
use crate::client::{ClientError, ContentSource, Cursor, DocumentPage};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Whether another page can be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    HasMore,
    NoMore,
}

/// Which documents the feed lists
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub document_type: String,
    pub page_size: u32,
}

/// Result of a "load more" action
#[derive(Debug, Clone)]
pub enum LoadMoreOutcome {
    /// A page was appended
    Loaded {
        posts: Vec<PostSummary>,
        next: Option<Cursor>,
    },
    /// There was no cursor to follow
    Exhausted,
    /// Nothing changed; following `retry` again may succeed
    Failed { error: String, retry: Cursor },
}

/// A mapped page with its continuation
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    pub next: Option<Cursor>,
}

impl FeedPage {
    /// Map a raw page; fails without partial results
    pub fn from_documents(page: &DocumentPage, mapper: &Mapper) -> Result<Self, FeedError> {
        Ok(Self {
            posts: mapper.summaries(&page.results)?,
            next: page.next_cursor()?,
        })
    }
}

/// Fetch and map one page of the listing
pub async fn fetch_page<S: ContentSource>(
    source: &S,
    mapper: &Mapper,
    query: &FeedQuery,
    cursor: Option<&Cursor>,
) -> Result<FeedPage, FeedError> {
    let page = source
        .list_by_type(&query.document_type, query.page_size, cursor)
        .await?;
    FeedPage::from_documents(&page, mapper)
}

/// The post list of one session
#[derive(Debug, Clone, Default)]
pub struct PostFeed {
    posts: Vec<PostSummary>,
    cursor: Option<Cursor>,
}

impl PostFeed {
    pub fn new(posts: Vec<PostSummary>, cursor: Option<Cursor>) -> Self {
        Self { posts, cursor }
    }

    /// Load the first page
    pub async fn first_page<S: ContentSource>(
        source: &S,
        mapper: &Mapper,
        query: &FeedQuery,
    ) -> Result<Self, FeedError> {
        let page = fetch_page(source, mapper, query, None).await?;
        Ok(Self::new(page.posts, page.next))
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn state(&self) -> FeedState {
        if self.cursor.is_some() {
            FeedState::HasMore
        } else {
            FeedState::NoMore
        }
    }

    pub fn has_more(&self) -> bool {
        self.state() == FeedState::HasMore
    }

    /// Append a mapped page and take over its cursor
    pub fn append(&mut self, page: FeedPage) {
        self.posts.extend(page.posts);
        self.cursor = page.next;
    }

    /// Follow the stored cursor and append what it yields
    ///
    /// On failure the feed is left untouched and the outcome carries the
    /// cursor to retry with.
    pub async fn load_more<S: ContentSource>(
        &mut self,
        source: &S,
        mapper: &Mapper,
        query: &FeedQuery,
    ) -> LoadMoreOutcome {
        let Some(cursor) = self.cursor.clone() else {
            return LoadMoreOutcome::Exhausted;
        };

        match fetch_page(source, mapper, query, Some(&cursor)).await {
            Ok(page) => {
                let outcome = LoadMoreOutcome::Loaded {
                    posts: page.posts.clone(),
                    next: page.next.clone(),
                };
                self.append(page);
                outcome
            }
            Err(e) => {
                tracing::warn!("Failed to load more posts from {}: {}", cursor, e);
                LoadMoreOutcome::Failed {
                    error: e.to_string(),
                    retry: cursor,
                }
            }
        }
    }
}
