//! In-memory blog store - used when no database is configured and in tests.
//!
//! All five repositories are served by one [`InMemoryBlogStore`] so that
//! foreign keys, uniqueness and cascades behave like the PostgreSQL schema.
//! Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use blogicum_core::domain::{Category, Comment, CommentCard, Location, Post, PostCard, User};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{Page, PageRequest};
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    UserRepository,
};
use blogicum_core::query::{PostFilter, newest_first};

pub(crate) trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

macro_rules! record {
    ($($ty:ty),*) => {
        $(impl Record for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
        })*
    };
}

record!(User, Category, Location, Post, Comment);

#[derive(Default)]
pub(crate) struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    locations: HashMap<Uuid, Location>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

/// Per-entity access to a table plus its integrity rules.
pub(crate) trait TableOf<T: Record> {
    fn rows(&self) -> &HashMap<Uuid, T>;
    fn rows_mut(&mut self) -> &mut HashMap<Uuid, T>;

    /// Foreign key and uniqueness checks run before every write.
    fn check(&self, _row: &T) -> Result<(), RepoError> {
        Ok(())
    }

    /// Restrictions and cascades run before a delete.
    fn before_delete(&mut self, _id: Uuid) -> Result<(), RepoError> {
        Ok(())
    }
}

fn missing(what: &str, id: Uuid) -> RepoError {
    RepoError::Constraint(format!("{what} {id} does not exist"))
}

impl Tables {
    fn remove_post(&mut self, id: Uuid) {
        self.posts.remove(&id);
        self.comments.retain(|_, c| c.post_id != id);
    }

    fn card(&self, post: &Post) -> Result<PostCard, RepoError> {
        let dangling = |what: &str| {
            RepoError::Query(format!("post {} references a missing {what}", post.id))
        };

        let author = self
            .users
            .get(&post.author_id)
            .map(User::author)
            .ok_or_else(|| dangling("author"))?;
        let category = self
            .categories
            .get(&post.category_id)
            .cloned()
            .ok_or_else(|| dangling("category"))?;
        let location = match post.location_id {
            Some(id) => Some(self.locations.get(&id).cloned().ok_or_else(|| dangling("location"))?),
            None => None,
        };
        let comment_count = self.comments.values().filter(|c| c.post_id == post.id).count() as u64;

        Ok(PostCard {
            post: post.clone(),
            author,
            category,
            location,
            comment_count,
        })
    }
}

impl TableOf<User> for Tables {
    fn rows(&self) -> &HashMap<Uuid, User> {
        &self.users
    }

    fn rows_mut(&mut self) -> &mut HashMap<Uuid, User> {
        &mut self.users
    }

    fn check(&self, row: &User) -> Result<(), RepoError> {
        if self
            .users
            .values()
            .any(|u| u.id != row.id && u.username == row.username)
        {
            return Err(RepoError::Constraint(format!(
                "username '{}' is already taken",
                row.username
            )));
        }
        Ok(())
    }

    fn before_delete(&mut self, id: Uuid) -> Result<(), RepoError> {
        let owned: Vec<Uuid> = self
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            self.remove_post(post_id);
        }
        self.comments.retain(|_, c| c.author_id != id);
        Ok(())
    }
}

impl TableOf<Category> for Tables {
    fn rows(&self) -> &HashMap<Uuid, Category> {
        &self.categories
    }

    fn rows_mut(&mut self) -> &mut HashMap<Uuid, Category> {
        &mut self.categories
    }

    fn check(&self, row: &Category) -> Result<(), RepoError> {
        if self
            .categories
            .values()
            .any(|c| c.id != row.id && c.slug == row.slug)
        {
            return Err(RepoError::Constraint(format!(
                "slug '{}' is already taken",
                row.slug
            )));
        }
        Ok(())
    }

    fn before_delete(&mut self, id: Uuid) -> Result<(), RepoError> {
        if self.posts.values().any(|p| p.category_id == id) {
            return Err(RepoError::Constraint(format!(
                "category {id} still has posts"
            )));
        }
        Ok(())
    }
}

impl TableOf<Location> for Tables {
    fn rows(&self) -> &HashMap<Uuid, Location> {
        &self.locations
    }

    fn rows_mut(&mut self) -> &mut HashMap<Uuid, Location> {
        &mut self.locations
    }

    fn before_delete(&mut self, id: Uuid) -> Result<(), RepoError> {
        for post in self.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(())
    }
}

impl TableOf<Post> for Tables {
    fn rows(&self) -> &HashMap<Uuid, Post> {
        &self.posts
    }

    fn rows_mut(&mut self) -> &mut HashMap<Uuid, Post> {
        &mut self.posts
    }

    fn check(&self, row: &Post) -> Result<(), RepoError> {
        if !self.users.contains_key(&row.author_id) {
            return Err(missing("user", row.author_id));
        }
        if !self.categories.contains_key(&row.category_id) {
            return Err(missing("category", row.category_id));
        }
        if let Some(location_id) = row.location_id {
            if !self.locations.contains_key(&location_id) {
                return Err(missing("location", location_id));
            }
        }
        Ok(())
    }

    fn before_delete(&mut self, id: Uuid) -> Result<(), RepoError> {
        self.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }
}

impl TableOf<Comment> for Tables {
    fn rows(&self) -> &HashMap<Uuid, Comment> {
        &self.comments
    }

    fn rows_mut(&mut self) -> &mut HashMap<Uuid, Comment> {
        &mut self.comments
    }

    fn check(&self, row: &Comment) -> Result<(), RepoError> {
        if !self.posts.contains_key(&row.post_id) {
            return Err(missing("post", row.post_id));
        }
        if !self.users.contains_key(&row.author_id) {
            return Err(missing("user", row.author_id));
        }
        Ok(())
    }
}

/// In-memory implementation of every blog repository behind one async RwLock.
#[derive(Default)]
pub struct InMemoryBlogStore {
    tables: RwLock<Tables>,
}

impl InMemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> BaseRepository<T, Uuid> for InMemoryBlogStore
where
    T: Record,
    Tables: TableOf<T>,
{
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let tables = self.tables.read().await;
        Ok(TableOf::<T>::rows(&*tables).get(&id).cloned())
    }

    async fn insert(&self, entity: T) -> Result<T, RepoError> {
        let mut tables = self.tables.write().await;
        if TableOf::<T>::rows(&*tables).contains_key(&entity.id()) {
            return Err(RepoError::Constraint(format!(
                "duplicate key {}",
                entity.id()
            )));
        }
        TableOf::<T>::check(&*tables, &entity)?;
        TableOf::<T>::rows_mut(&mut *tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T, RepoError> {
        let mut tables = self.tables.write().await;
        if !TableOf::<T>::rows(&*tables).contains_key(&entity.id()) {
            return Err(RepoError::NotFound);
        }
        TableOf::<T>::check(&*tables, &entity)?;
        TableOf::<T>::rows_mut(&mut *tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !TableOf::<T>::rows(&*tables).contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        TableOf::<T>::before_delete(&mut *tables, id)?;
        TableOf::<T>::rows_mut(&mut *tables).remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryBlogStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryBlogStore {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug && c.is_published)
            .cloned())
    }

    async fn list_published(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

#[async_trait]
impl LocationRepository for InMemoryBlogStore {
    async fn list_published(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables
            .locations
            .values()
            .filter(|l| l.is_published)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }
}

#[async_trait]
impl PostRepository for InMemoryBlogStore {
    async fn list(
        &self,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostCard>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| {
                tables
                    .categories
                    .get(&p.category_id)
                    .is_some_and(|c| filter.matches(p, c))
            })
            .collect();
        posts.sort_by(|a, b| newest_first(a, b));

        let page = Page::paginate(posts, page)?;
        page.try_map(|p| tables.card(p))
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError> {
        let tables = self.tables.read().await;
        tables.posts.get(&id).map(|p| tables.card(p)).transpose()
    }

    async fn find_owned(&self, id: Uuid, author_id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .get(&id)
            .filter(|p| p.author_id == author_id)
            .cloned())
    }

    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        match tables.posts.get(&id) {
            Some(post) if post.author_id == author_id => {
                tables.remove_post(id);
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl CommentRepository for InMemoryBlogStore {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentCard>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by_key(|c| c.created_at);

        comments
            .into_iter()
            .map(|c| {
                let author = tables.users.get(&c.author_id).map(User::author).ok_or_else(|| {
                    RepoError::Query(format!("comment {} references a missing author", c.id))
                })?;
                Ok(CommentCard {
                    comment: c.clone(),
                    author,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use blogicum_core::domain::PostDraft;

    struct Fixture {
        store: InMemoryBlogStore,
        author: User,
        category: Category,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryBlogStore::new();
        let author = User::new("author".into(), "hash".into());
        let category = Category::new("Travel".into(), "Trips".into(), "travel".into());
        BaseRepository::<User, Uuid>::insert(&store, author.clone()).await.unwrap();
        BaseRepository::<Category, Uuid>::insert(&store, category.clone()).await.unwrap();
        Fixture {
            store,
            author,
            category,
        }
    }

    fn draft(category_id: Uuid, title: &str, age: Duration) -> PostDraft {
        PostDraft {
            title: title.into(),
            text: "Body".into(),
            pub_date: Utc::now() - age,
            category_id,
            location_id: None,
            is_published: true,
            image: None,
        }
    }

    async fn add_post(f: &Fixture, title: &str, age: Duration) -> Post {
        let post = Post::new(f.author.id, draft(f.category.id, title, age));
        BaseRepository::<Post, Uuid>::insert(&f.store, post).await.unwrap()
    }

    #[tokio::test]
    async fn test_post_requires_existing_category() {
        let f = fixture().await;
        let post = Post::new(f.author.id, draft(Uuid::new_v4(), "Orphan", Duration::hours(1)));

        let err = BaseRepository::<Post, Uuid>::insert(&f.store, post).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let f = fixture().await;
        let twin = User::new("author".into(), "hash".into());

        let err = BaseRepository::<User, Uuid>::insert(&f.store, twin).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_with_comment_counts() {
        let f = fixture().await;
        let old = add_post(&f, "Old", Duration::days(3)).await;
        let new = add_post(&f, "New", Duration::hours(1)).await;
        for text in ["one", "two"] {
            let comment = Comment::new(old.id, f.author.id, text.into());
            BaseRepository::<Comment, Uuid>::insert(&f.store, comment).await.unwrap();
        }

        let page = f
            .store
            .list(PostFilter::published(Utc::now()), PageRequest::default())
            .await
            .unwrap();

        let titles: Vec<&str> = page.items.iter().map(|c| c.post.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old"]);
        assert_eq!(page.items[0].post.id, new.id);
        assert_eq!(page.items[1].comment_count, 2);
        assert_eq!(page.items[1].author.username, "author");
        assert_eq!(page.items[1].category.slug, "travel");
    }

    #[tokio::test]
    async fn test_list_paginates_by_ten() {
        let f = fixture().await;
        for i in 0..12 {
            add_post(&f, &format!("Post {i}"), Duration::hours(i + 1)).await;
        }

        let filter = PostFilter::published(Utc::now());
        let second = f
            .store
            .list(filter, PageRequest::new(2).unwrap())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.total, 12);
        assert_eq!(second.num_pages, 2);

        let err = f
            .store
            .list(filter, PageRequest::new(3).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_hidden_category_hides_its_posts() {
        let f = fixture().await;
        add_post(&f, "Visible until hidden", Duration::hours(1)).await;

        let mut hidden = f.category.clone();
        hidden.is_published = false;
        BaseRepository::<Category, Uuid>::update(&f.store, hidden).await.unwrap();

        let page = f
            .store
            .list(PostFilter::published(Utc::now()), PageRequest::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(
            f.store
                .find_published_by_slug("travel")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_to_comments() {
        let f = fixture().await;
        let post = add_post(&f, "Doomed", Duration::hours(1)).await;
        let comment = Comment::new(post.id, f.author.id, "bye".into());
        BaseRepository::<Comment, Uuid>::insert(&f.store, comment.clone()).await.unwrap();

        f.store.delete_owned(post.id, f.author.id).await.unwrap();

        assert!(
            BaseRepository::<Comment, Uuid>::find_by_id(&f.store, comment.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(f.store.list_for_post(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_owned_is_scoped_to_author() {
        let f = fixture().await;
        let post = add_post(&f, "Mine", Duration::hours(1)).await;

        let err = f.store.delete_owned(post.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
        assert!(f.store.find_owned(post.id, f.author.id).await.unwrap().is_some());
        assert!(f.store.find_owned(post.id, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_category_with_posts_cannot_be_deleted() {
        let f = fixture().await;
        add_post(&f, "Anchor", Duration::hours(1)).await;

        let err = BaseRepository::<Category, Uuid>::delete(&f.store, f.category.id)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_deleting_location_clears_reference() {
        let f = fixture().await;
        let location = Location::new("Lisbon".into());
        BaseRepository::<Location, Uuid>::insert(&f.store, location.clone()).await.unwrap();
        let mut d = draft(f.category.id, "Tram 28", Duration::hours(1));
        d.location_id = Some(location.id);
        let post = BaseRepository::<Post, Uuid>::insert(&f.store, Post::new(f.author.id, d))
            .await
            .unwrap();

        BaseRepository::<Location, Uuid>::delete(&f.store, location.id).await.unwrap();

        let card = f.store.find_card(post.id).await.unwrap().unwrap();
        assert!(card.location.is_none());
    }
}
