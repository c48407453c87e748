use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Author, Category, Location};

/// Post entity - a blog publication owned by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub location_id: Option<Uuid>,
    pub title: String,
    pub text: String,
    /// Posts dated in the future stay hidden from the public until then.
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Author-editable fields of a post.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Uuid,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub image: Option<String>,
}

impl Post {
    /// Create a new post owned by `author_id`.
    pub fn new(author_id: Uuid, draft: PostDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            category_id: draft.category_id,
            location_id: draft.location_id,
            title: draft.title,
            text: draft.text,
            pub_date: draft.pub_date,
            is_published: draft.is_published,
            image: draft.image,
            created_at: Utc::now(),
        }
    }

    /// Replace the editable fields, keeping identity, author and creation time.
    pub fn apply(&mut self, draft: PostDraft) {
        self.title = draft.title;
        self.text = draft.text;
        self.pub_date = draft.pub_date;
        self.category_id = draft.category_id;
        self.location_id = draft.location_id;
        self.is_published = draft.is_published;
        self.image = draft.image;
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

/// A post joined with its author, category, location and comment count.
///
/// This is the shape every listing and the detail view return.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub author: Author,
    pub category: Category,
    pub location: Option<Location>,
    pub comment_count: u64,
}
