use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Category, Comment, CommentCard, Location, Post, PostCard, User};
use crate::error::RepoError;
use crate::pagination::{Page, PageRequest};
use crate::query::PostFilter;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Persist a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Fails with `NotFound` if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    /// Unpublished categories are treated as missing.
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    async fn list_published(&self) -> Result<Vec<Category>, RepoError>;
}

#[async_trait]
pub trait LocationRepository: BaseRepository<Location, Uuid> {
    async fn list_published(&self) -> Result<Vec<Location>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// One page of posts matching `filter`, newest first, with author,
    /// category, location and comment count loaded.
    async fn list(&self, filter: PostFilter, page: PageRequest)
    -> Result<Page<PostCard>, RepoError>;

    /// A single post with its relations, regardless of visibility.
    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError>;

    /// A post scoped to its author; someone else's post is reported as missing.
    async fn find_owned(&self, id: Uuid, author_id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Delete a post scoped to its author. Comments go with it.
    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentCard>, RepoError>;
}
