//! Listing filters for posts.
//!
//! The three post listings differ only in which [`PostFilter`] they use;
//! ordering, eager loading, comment counts and pagination are shared.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Post};
use crate::policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Every publicly visible post.
    Published { now: DateTime<Utc> },
    /// Publicly visible posts of one category.
    InCategory {
        category_id: Uuid,
        now: DateTime<Utc>,
    },
    /// Posts of one author; hidden ones only when the author is looking.
    ByAuthor {
        author_id: Uuid,
        include_hidden: bool,
        now: DateTime<Utc>,
    },
}

impl PostFilter {
    pub fn published(now: DateTime<Utc>) -> Self {
        PostFilter::Published { now }
    }

    pub fn in_category(category_id: Uuid, now: DateTime<Utc>) -> Self {
        PostFilter::InCategory { category_id, now }
    }

    /// Profile listing of `author_id` as seen by `viewer`.
    pub fn by_author(author_id: Uuid, viewer: Option<Uuid>, now: DateTime<Utc>) -> Self {
        PostFilter::ByAuthor {
            author_id,
            include_hidden: viewer == Some(author_id),
            now,
        }
    }

    /// Evaluate the filter against a post and the category it belongs to.
    pub fn matches(&self, post: &Post, category: &Category) -> bool {
        match *self {
            PostFilter::Published { now } => policy::is_publicly_visible(post, category, now),
            PostFilter::InCategory { category_id, now } => {
                post.category_id == category_id && policy::is_publicly_visible(post, category, now)
            }
            PostFilter::ByAuthor {
                author_id,
                include_hidden,
                now,
            } => {
                post.author_id == author_id
                    && (include_hidden || policy::is_publicly_visible(post, category, now))
            }
        }
    }
}

/// Listing order: newest publication date first.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.pub_date
        .cmp(&a.pub_date)
        .then_with(|| b.created_at.cmp(&a.created_at))
}
