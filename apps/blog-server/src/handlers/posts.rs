//! Post listing, detail and authoring handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use blogicum_core::domain::{Category, CommentCard, Location, Post, PostCard, PostDraft};
use blogicum_core::error::{DomainError, RepoError};
use blogicum_core::policy::{self, PostEditAccess};
use blogicum_core::ports::BaseRepository;
use blogicum_core::query::PostFilter;
use blogicum_shared::ApiResponse;
use blogicum_shared::dto::PostForm;

use super::{
    DeferredJson, PageQuery, current_user, json_body, post_url, profile_url, redirect,
};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostCard,
    pub comments: Vec<CommentCard>,
}

/// Choices offered by the post form.
#[derive(Serialize)]
pub struct FormOptions {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

impl FormOptions {
    async fn load(state: &AppState) -> AppResult<Self> {
        Ok(Self {
            categories: state.categories.list_published().await?,
            locations: state.locations.list_published().await?,
        })
    }
}

#[derive(Serialize)]
pub struct PostEditForm {
    pub post: Post,
    #[serde(flatten)]
    pub options: FormOptions,
}

pub(super) fn post_not_found(id: Uuid) -> AppError {
    DomainError::NotFound {
        entity_type: "Post",
        id,
    }
    .into()
}

async fn load_post(state: &AppState, id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| post_not_found(id))
}

/// Check the form, including that its category and location exist.
async fn validated_draft(state: &AppState, form: PostForm) -> AppResult<PostDraft> {
    let mut errors = form.validate().err().unwrap_or_default();

    if state.categories.find_by_id(form.category_id).await?.is_none() {
        errors.push("category_id: select a valid choice".to_string());
    }
    if let Some(location_id) = form.location_id {
        if state.locations.find_by_id(location_id).await?.is_none() {
            errors.push("location_id: select a valid choice".to_string());
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(PostDraft {
        title: form.title.trim().to_string(),
        text: form.text,
        pub_date: form.pub_date,
        category_id: form.category_id,
        location_id: form.location_id,
        is_published: form.is_published,
        image: form.image.map(|image| image.trim().to_string()),
    })
}

/// GET / - publicly visible posts, newest first.
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .posts
        .list(PostFilter::published(Utc::now()), query.request()?)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// GET /posts/{post_id}/ - the author sees the post whatever its state.
pub async fn detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let now = Utc::now();

    let card = state
        .posts
        .find_card(post_id)
        .await?
        .filter(|card| policy::can_view(&card.post, &card.category, viewer.user_id(), now))
        .ok_or_else(|| post_not_found(post_id))?;
    let comments = state.comments.list_for_post(post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostDetail {
        post: card,
        comments,
    })))
}

/// GET /posts/create/
pub async fn create_form(
    _identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FormOptions::load(&state).await?)))
}

/// POST /posts/create/ - the author is always the requester.
pub async fn create(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let author = current_user(&state, &identity).await?;
    let draft = validated_draft(&state, body.into_inner()).await?;
    let post = state.posts.insert(Post::new(author.id, draft)).await?;

    tracing::info!(post_id = %post.id, author = %author.username, "Post created");

    Ok(redirect(profile_url(&author.username), Some(post)))
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;

    if policy::post_edit_access(&post, identity.user_id) == PostEditAccess::RedirectToDetail {
        return Ok(redirect::<()>(post_url(post.id), None));
    }

    let options = FormOptions::load(&state).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostEditForm { post, options })))
}

/// POST /posts/{post_id}/edit/ - non-authors bounce back to the post untouched.
pub async fn edit(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: DeferredJson<PostForm>,
) -> AppResult<HttpResponse> {
    let mut post = load_post(&state, path.into_inner()).await?;

    if policy::post_edit_access(&post, identity.user_id) == PostEditAccess::RedirectToDetail {
        tracing::warn!(
            post_id = %post.id,
            username = %identity.username,
            "Edit of someone else's post"
        );
        return Ok(redirect::<()>(post_url(post.id), None));
    }

    let form = match json_body(body) {
        Ok(form) => form,
        Err(rejected) => return Ok(rejected),
    };
    post.apply(validated_draft(&state, form).await?);
    let post = state.posts.update(post).await?;

    Ok(redirect(post_url(post.id), Some(post)))
}

/// GET /posts/{post_id}/delete/ - only the author's own posts are found.
pub async fn delete_confirm(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = state
        .posts
        .find_owned(post_id, identity.user_id)
        .await?
        .ok_or_else(|| post_not_found(post_id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// POST /posts/{post_id}/delete/
pub async fn delete(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    state
        .posts
        .delete_owned(post_id, identity.user_id)
        .await
        .map_err(|err| match err {
            RepoError::NotFound => post_not_found(post_id),
            other => other.into(),
        })?;

    tracing::info!(post_id = %post_id, user_id = %identity.user_id, "Post deleted");

    Ok(redirect::<()>("/".to_string(), None))
}
