//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use uuid::Uuid;

use blogicum_core::domain::{Author, Category, CommentCard, Location, Post, PostCard, User};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{Page, PageRequest};
use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};
use blogicum_core::query::PostFilter;

use super::entity::category::{self, Entity as CategoryEntity};
use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::location::{self, Entity as LocationEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, query_error, write_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<CategoryEntity>;

/// PostgreSQL location repository.
pub type PostgresLocationRepository = PostgresBaseRepository<LocationEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// SQL form of the public visibility predicate. Needs `categories` joined.
pub fn published_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(post::Column::IsPublished.eq(true))
        .add(post::Column::PubDate.lte(now))
        .add(category::Column::IsPublished.eq(true))
}

/// SQL form of a listing filter. Needs `categories` joined.
pub fn filter_condition(filter: &PostFilter) -> Condition {
    match *filter {
        PostFilter::Published { now } => published_condition(now),
        PostFilter::InCategory { category_id, now } => Condition::all()
            .add(post::Column::CategoryId.eq(category_id))
            .add(published_condition(now)),
        PostFilter::ByAuthor {
            author_id,
            include_hidden: true,
            ..
        } => Condition::all().add(post::Column::AuthorId.eq(author_id)),
        PostFilter::ByAuthor {
            author_id,
            include_hidden: false,
            now,
        } => Condition::all()
            .add(post::Column::AuthorId.eq(author_id))
            .add(published_condition(now)),
    }
}

/// One row of the grouped comment count.
#[derive(Debug, FromQueryResult)]
struct CommentCount {
    post_id: Uuid,
    comment_count: i64,
}

fn unique_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    ids.into_iter().collect::<HashSet<_>>().into_iter().collect()
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsPublished.eq(true))
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    async fn list_published(&self) -> Result<Vec<Category>, RepoError> {
        let result = CategoryEntity::find()
            .filter(category::Column::IsPublished.eq(true))
            .order_by_asc(category::Column::Title)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl LocationRepository for PostgresLocationRepository {
    async fn list_published(&self) -> Result<Vec<Location>, RepoError> {
        let result = LocationEntity::find()
            .filter(location::Column::IsPublished.eq(true))
            .order_by_asc(location::Column::Name)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

impl PostgresPostRepository {
    /// Attach authors, categories, locations and comment counts to a batch
    /// of posts with one query per relation.
    async fn hydrate(&self, posts: Vec<post::Model>) -> Result<Vec<PostCard>, RepoError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids = unique_ids(posts.iter().map(|p| p.author_id));
        let authors: HashMap<Uuid, Author> = UserEntity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(&self.db)
            .await
            .map_err(query_error)?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    Author {
                        id: u.id,
                        username: u.username,
                    },
                )
            })
            .collect();

        let category_ids = unique_ids(posts.iter().map(|p| p.category_id));
        let categories: HashMap<Uuid, Category> = CategoryEntity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await
            .map_err(query_error)?
            .into_iter()
            .map(|c| (c.id, c.into()))
            .collect();

        let location_ids = unique_ids(posts.iter().filter_map(|p| p.location_id));
        let locations: HashMap<Uuid, Location> = if location_ids.is_empty() {
            HashMap::new()
        } else {
            LocationEntity::find()
                .filter(location::Column::Id.is_in(location_ids))
                .all(&self.db)
                .await
                .map_err(query_error)?
                .into_iter()
                .map(|l| (l.id, l.into()))
                .collect()
        };

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let counts: HashMap<Uuid, i64> = CommentEntity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(
                Expr::col((comment::Entity, comment::Column::Id)).count(),
                "comment_count",
            )
            .filter(comment::Column::PostId.is_in(post_ids))
            .group_by(comment::Column::PostId)
            .into_model::<CommentCount>()
            .all(&self.db)
            .await
            .map_err(query_error)?
            .into_iter()
            .map(|row| (row.post_id, row.comment_count))
            .collect();

        posts
            .into_iter()
            .map(|model| {
                let post: Post = model.into();
                let dangling = |what: &str| {
                    RepoError::Query(format!("post {} references a missing {what}", post.id))
                };

                let author = authors
                    .get(&post.author_id)
                    .cloned()
                    .ok_or_else(|| dangling("author"))?;
                let category = categories
                    .get(&post.category_id)
                    .cloned()
                    .ok_or_else(|| dangling("category"))?;
                let location = post.location_id.and_then(|id| locations.get(&id).cloned());
                let comment_count = counts.get(&post.id).copied().unwrap_or(0).max(0) as u64;

                Ok(PostCard {
                    post,
                    author,
                    category,
                    location,
                    comment_count,
                })
            })
            .collect()
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list(
        &self,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostCard>, RepoError> {
        tracing::debug!(?filter, page = page.number(), "Listing posts");

        let select = PostEntity::find()
            .join(JoinType::InnerJoin, post::Relation::Category.def())
            .filter(filter_condition(&filter));

        let total = select.clone().count(&self.db).await.map_err(query_error)?;
        Page::<PostCard>::check_range(page, total)?;

        let models = select
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.size())
            .all(&self.db)
            .await
            .map_err(query_error)?;

        let cards = self.hydrate(models).await?;
        Ok(Page::new(cards, page, total)?)
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_error)?
        else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![model]).await?.pop())
    }

    async fn find_owned(&self, id: Uuid, author_id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::AuthorId.eq(author_id))
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        // Comments are removed by the ON DELETE CASCADE on comments.post_id.
        let result = PostEntity::delete_many()
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentCard>, RepoError> {
        let rows = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .find_also_related(UserEntity)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        rows.into_iter()
            .map(|(comment, author)| {
                let author = author.ok_or_else(|| {
                    RepoError::Query(format!("comment {} references a missing author", comment.id))
                })?;
                Ok(CommentCard {
                    comment: comment.into(),
                    author: Author {
                        id: author.id,
                        username: author.username,
                    },
                })
            })
            .collect()
    }
}
