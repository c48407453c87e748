//! Visibility and ownership rules for posts and comments.
//!
//! Every read path (listings, detail, commenting) goes through
//! [`is_publicly_visible`] or [`can_view`]; every mutation path goes
//! through one of the ownership guards below.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Comment, Post};
use crate::error::DomainError;

/// A post is public iff it is published, its date has come and its
/// category is published.
pub fn is_publicly_visible(post: &Post, category: &Category, now: DateTime<Utc>) -> bool {
    post.is_published && post.pub_date <= now && category.is_published
}

/// Authors always see their own posts; everyone else needs the public predicate.
pub fn can_view(
    post: &Post,
    category: &Category,
    viewer: Option<Uuid>,
    now: DateTime<Utc>,
) -> bool {
    viewer.is_some_and(|id| post.is_authored_by(id)) || is_publicly_visible(post, category, now)
}

/// Outcome of a post edit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEditAccess {
    Allowed,
    /// Non-owners are sent back to the post page without any error.
    RedirectToDetail,
}

pub fn post_edit_access(post: &Post, actor: Uuid) -> PostEditAccess {
    if post.is_authored_by(actor) {
        PostEditAccess::Allowed
    } else {
        PostEditAccess::RedirectToDetail
    }
}

/// Comment mutations guarded by [`authorize_comment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Edit,
    Delete,
}

impl CommentAction {
    fn denial(self) -> &'static str {
        match self {
            CommentAction::Edit => "You are not allowed to edit this comment.",
            CommentAction::Delete => "You are not allowed to delete this comment.",
        }
    }
}

/// Only the comment author may edit or delete it.
pub fn authorize_comment(
    comment: &Comment,
    actor: Uuid,
    action: CommentAction,
) -> Result<(), DomainError> {
    if comment.is_authored_by(actor) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(action.denial().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::PostDraft;

    fn fixture(is_published: bool, offset: Duration, category_published: bool) -> (Post, Category) {
        let mut category = Category::new("Travel".into(), String::new(), "travel".into());
        category.is_published = category_published;
        let post = Post::new(
            Uuid::new_v4(),
            PostDraft {
                title: "Hello".into(),
                text: "World".into(),
                pub_date: Utc::now() + offset,
                category_id: category.id,
                location_id: None,
                is_published,
                image: None,
            },
        );
        (post, category)
    }

    #[test]
    fn test_visibility_predicate_truth_table() {
        let now = Utc::now();
        let past = -Duration::hours(1);
        let future = Duration::hours(1);

        for (published, offset, category_published, expected) in [
            (true, past, true, true),
            (false, past, true, false),
            (true, future, true, false),
            (true, past, false, false),
            (false, future, false, false),
        ] {
            let (post, category) = fixture(published, offset, category_published);
            assert_eq!(
                is_publicly_visible(&post, &category, now),
                expected,
                "published={published} offset={offset} category_published={category_published}"
            );
        }
    }

    #[test]
    fn test_author_bypasses_visibility() {
        let now = Utc::now();
        let (post, category) = fixture(false, Duration::hours(2), false);

        assert!(can_view(&post, &category, Some(post.author_id), now));
        assert!(!can_view(&post, &category, Some(Uuid::new_v4()), now));
        assert!(!can_view(&post, &category, None, now));
    }

    #[test]
    fn test_post_edit_access() {
        let (post, _) = fixture(true, -Duration::hours(1), true);

        assert_eq!(post_edit_access(&post, post.author_id), PostEditAccess::Allowed);
        assert_eq!(
            post_edit_access(&post, Uuid::new_v4()),
            PostEditAccess::RedirectToDetail
        );
    }

    #[test]
    fn test_comment_guard() {
        let comment = Comment::new(Uuid::new_v4(), Uuid::new_v4(), "Nice".into());

        assert!(authorize_comment(&comment, comment.author_id, CommentAction::Edit).is_ok());

        let err = authorize_comment(&comment, Uuid::new_v4(), CommentAction::Delete).unwrap_err();
        match err {
            DomainError::Forbidden(msg) => assert!(msg.contains("delete")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
