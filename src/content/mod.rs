//! Content module - turns backend documents into posts

pub mod feed;
mod mapper;
mod post;

pub use feed::{FeedQuery, FeedState, LoadMoreOutcome, PostFeed};
pub use mapper::{reading_minutes, word_count, MapError, Mapper};
pub use post::{Banner, ContentBlock, PostDetail, PostSummary};
