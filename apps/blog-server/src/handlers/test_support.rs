use std::sync::Arc;

use actix_web::http::header;
use chrono::{Duration, Utc};
use uuid::Uuid;

use blogicum_core::domain::{Category, Comment, Location, Post, PostDraft, User};
use blogicum_core::ports::BaseRepository;
use blogicum_infra::{InMemoryBlogStore, JwtConfig};

use crate::state::AppState;

/// Build an initialized test service routed like the real server.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state))
                .configure($crate::handlers::configure_routes),
        )
        .await
    };
}

pub(crate) use test_app;

/// An in-memory blog with one published category.
pub struct Fixture {
    pub state: AppState,
    pub category: Category,
}

impl Fixture {
    pub async fn new() -> Self {
        let state = AppState::in_memory(Arc::new(InMemoryBlogStore::new()), JwtConfig::default());
        let category = state
            .categories
            .insert(Category::new(
                "Travel".to_string(),
                "Trips and journeys".to_string(),
                "travel".to_string(),
            ))
            .await
            .unwrap();

        Self { state, category }
    }

    pub async fn user(&self, username: &str) -> (User, String) {
        let user = self
            .state
            .users
            .insert(User::new(username.to_string(), "not-a-real-hash".to_string()))
            .await
            .unwrap();
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        (user, token)
    }

    pub async fn category(&self, slug: &str, is_published: bool) -> Category {
        let mut category = Category::new(slug.to_uppercase(), String::new(), slug.to_string());
        category.is_published = is_published;
        self.state.categories.insert(category).await.unwrap()
    }

    pub async fn location(&self, name: &str) -> Location {
        self.state
            .locations
            .insert(Location::new(name.to_string()))
            .await
            .unwrap()
    }

    /// A publicly visible post in the fixture category, published an hour ago.
    pub async fn post(&self, author: &User, title: &str) -> Post {
        self.post_with(author, title, |_| {}).await
    }

    pub async fn post_with(
        &self,
        author: &User,
        title: &str,
        tweak: impl FnOnce(&mut Post),
    ) -> Post {
        let mut post = Post::new(author.id, self.draft(title));
        tweak(&mut post);
        self.state.posts.insert(post).await.unwrap()
    }

    fn draft(&self, title: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            text: format!("{title} body"),
            pub_date: Utc::now() - Duration::hours(1),
            category_id: self.category.id,
            location_id: None,
            is_published: true,
            image: None,
        }
    }

    pub async fn comment(&self, post: &Post, author: &User, text: &str) -> Comment {
        self.state
            .comments
            .insert(Comment::new(post.id, author.id, text.to_string()))
            .await
            .unwrap()
    }

    pub async fn find_post(&self, id: Uuid) -> Option<Post> {
        self.state.posts.find_by_id(id).await.unwrap()
    }
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub fn location_of<B>(res: &actix_web::dev::ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned()
}
