//! Application state - shared across all handlers.

use std::sync::Arc;

use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PasswordService, PostRepository,
    RateLimiter, TokenService, UserRepository,
};
use blogicum_infra::{
    Argon2PasswordService, DatabaseConfig, InMemoryBlogStore, JwtConfig, JwtTokenService,
};

#[cfg(feature = "postgres")]
use blogicum_infra::database::{
    DbConn, DbErr, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresLocationRepository, PostgresPostRepository, PostgresUserRepository, connect,
};
#[cfg(feature = "postgres")]
use migration::{Migrator, MigratorTrait};
#[cfg(feature = "rate-limit")]
use blogicum_infra::InMemoryRateLimiter;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    /// `None` disables rate limiting.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Name of the storage backend, reported by the health check.
    pub storage: &'static str,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    storage: &'static str,
}

impl Repositories {
    fn in_memory(store: Arc<InMemoryBlogStore>) -> Self {
        Self {
            users: store.clone(),
            categories: store.clone(),
            locations: store.clone(),
            posts: store.clone(),
            comments: store,
            storage: "memory",
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(db: DbConn) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            locations: Arc::new(PostgresLocationRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db)),
            storage: "postgres",
        }
    }

    #[cfg(feature = "postgres")]
    async fn open(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let db = connect(config).await?;

        if config.run_migrations {
            tracing::info!("Applying pending migrations");
            Migrator::up(&db, None).await?;
        }

        Ok(Self::postgres(db))
    }

    async fn from_config(db_config: Option<&DatabaseConfig>) -> Self {
        #[cfg(feature = "postgres")]
        match db_config {
            Some(config) => match Self::open(config).await {
                Ok(repos) => return repos,
                Err(e) => tracing::error!(
                    error = %e,
                    "Failed to connect to database. Using in-memory fallback."
                ),
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).")
            }
        }

        #[cfg(not(feature = "postgres"))]
        if db_config.is_some() {
            tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
        }

        Self::in_memory(Arc::new(InMemoryBlogStore::new()))
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = Repositories::from_config(config.database.as_ref()).await;

        #[cfg(feature = "rate-limit")]
        let rate_limiter: Option<Arc<dyn RateLimiter>> =
            Some(Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone())));
        #[cfg(not(feature = "rate-limit"))]
        let rate_limiter: Option<Arc<dyn RateLimiter>> = None;

        let state = Self::assemble(repos, config.jwt.clone(), rate_limiter);
        tracing::info!(storage = state.storage, "Application state initialized");
        state
    }

    /// State over an existing in-memory store, without rate limiting.
    pub fn in_memory(store: Arc<InMemoryBlogStore>, jwt: JwtConfig) -> Self {
        Self::assemble(Repositories::in_memory(store), jwt, None)
    }

    fn assemble(
        repos: Repositories,
        jwt: JwtConfig,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        Self {
            users: repos.users,
            categories: repos.categories,
            locations: repos.locations,
            posts: repos.posts,
            comments: repos.comments,
            tokens: Arc::new(JwtTokenService::new(jwt)),
            passwords: Arc::new(Argon2PasswordService::new()),
            rate_limiter,
            storage: repos.storage,
        }
    }
}
