//! Comment handlers. Only the comment author may change a comment.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use blogicum_core::domain::Comment;
use blogicum_core::error::DomainError;
use blogicum_core::policy::{self, CommentAction};
use blogicum_core::ports::BaseRepository;
use blogicum_shared::ApiResponse;
use blogicum_shared::dto::CommentForm;

use super::posts::post_not_found;
use super::{DeferredJson, json_body, post_url, redirect};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// A comment addressed through a post it does not belong to is missing too.
async fn load_comment(state: &AppState, post_id: Uuid, comment_id: Uuid) -> AppResult<Comment> {
    state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|comment| comment.post_id == post_id)
        .ok_or_else(|| {
            DomainError::NotFound {
                entity_type: "Comment",
                id: comment_id,
            }
            .into()
        })
}

/// Load the comment and check that `identity` wrote it.
async fn authorized_comment(
    state: &AppState,
    identity: &Identity,
    (post_id, comment_id): (Uuid, Uuid),
    action: CommentAction,
) -> AppResult<Comment> {
    let comment = load_comment(state, post_id, comment_id).await?;

    policy::authorize_comment(&comment, identity.user_id, action).inspect_err(|_| {
        tracing::warn!(
            comment_id = %comment.id,
            user_id = %identity.user_id,
            ?action,
            "Comment change by non-author"
        )
    })?;

    Ok(comment)
}

fn validated(form: CommentForm) -> AppResult<String> {
    form.validate().map_err(AppError::Validation)?;
    Ok(form.text)
}

/// POST /posts/{post_id}/comment/ - only on posts the requester can see.
pub async fn add(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: DeferredJson<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    state
        .posts
        .find_card(post_id)
        .await?
        .filter(|card| {
            policy::can_view(&card.post, &card.category, Some(identity.user_id), Utc::now())
        })
        .ok_or_else(|| post_not_found(post_id))?;

    let form = match json_body(body) {
        Ok(form) => form,
        Err(rejected) => return Ok(rejected),
    };
    let text = validated(form)?;
    let comment = state
        .comments
        .insert(Comment::new(post_id, identity.user_id, text))
        .await?;

    Ok(redirect(post_url(post_id), Some(comment)))
}

/// GET /posts/{post_id}/comment/{comment_id}/edit/
pub async fn edit_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let comment =
        authorized_comment(&state, &identity, path.into_inner(), CommentAction::Edit).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment)))
}

/// POST /posts/{post_id}/comment/{comment_id}/edit/
pub async fn edit(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    body: DeferredJson<CommentForm>,
) -> AppResult<HttpResponse> {
    let mut comment =
        authorized_comment(&state, &identity, path.into_inner(), CommentAction::Edit).await?;

    let form = match json_body(body) {
        Ok(form) => form,
        Err(rejected) => return Ok(rejected),
    };
    comment.text = validated(form)?;
    let comment = state.comments.update(comment).await?;

    Ok(redirect(post_url(comment.post_id), Some(comment)))
}

/// GET /posts/{post_id}/comment/{comment_id}/delete/
pub async fn delete_confirm(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let comment =
        authorized_comment(&state, &identity, path.into_inner(), CommentAction::Delete).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment)))
}

/// POST /posts/{post_id}/comment/{comment_id}/delete/
pub async fn delete(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let comment =
        authorized_comment(&state, &identity, path.into_inner(), CommentAction::Delete).await?;

    state.comments.delete(comment.id).await?;

    Ok(redirect::<()>(post_url(comment.post_id), None))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{Value, json};

    use super::*;
    use crate::handlers::test_support::{Fixture, bearer, location_of, test_app};

    #[actix_web::test]
    async fn test_add_comment_redirects_to_post() {
        let fx = Fixture::new().await;
        let (author, _) = fx.user("leo").await;
        let (reader, token) = fx.user("anna").await;
        let post = fx.post(&author, "trip").await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .insert_header(bearer(&token))
            .set_json(json!({ "text": "Lovely" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location_of(&res), post_url(post.id));

        let comments = fx.state.comments.list_for_post(post.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author.id, reader.id);
        assert_eq!(comments[0].comment.text, "Lovely");
    }

    #[actix_web::test]
    async fn test_cannot_comment_on_hidden_post() {
        let fx = Fixture::new().await;
        let (author, author_token) = fx.user("leo").await;
        let (_, token) = fx.user("anna").await;
        let post = fx
            .post_with(&author, "draft", |p| p.is_published = false)
            .await;
        let uri = format!("/posts/{}/comment/", post.id);

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(json!({ "text": "Sneaky" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&author_token))
            .set_json(json!({ "text": "Note to self" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FOUND);
    }

    #[actix_web::test]
    async fn test_blank_comment_is_rejected() {
        let fx = Fixture::new().await;
        let (author, token) = fx.user("leo").await;
        let post = fx.post(&author, "trip").await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .insert_header(bearer(&token))
            .set_json(json!({ "text": "   " }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_only_comment_author_can_edit_or_delete() {
        let fx = Fixture::new().await;
        let (author, author_token) = fx.user("leo").await;
        let (reader, reader_token) = fx.user("anna").await;
        let post = fx.post(&author, "trip").await;
        let comment = fx.comment(&post, &reader, "Lovely").await;
        let edit_uri = format!("/posts/{}/comment/{}/edit/", post.id, comment.id);
        let delete_uri = format!("/posts/{}/comment/{}/delete/", post.id, comment.id);

        let app = test_app!(fx.state.clone());

        // The post author is not the comment author.
        let req = test::TestRequest::post()
            .uri(&edit_uri)
            .insert_header(bearer(&author_token))
            .set_json(json!({ "text": "Rewritten" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "You are not allowed to edit this comment.");

        let req = test::TestRequest::post()
            .uri(&delete_uri)
            .insert_header(bearer(&author_token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "You are not allowed to delete this comment.");

        let req = test::TestRequest::post()
            .uri(&edit_uri)
            .insert_header(bearer(&reader_token))
            .set_json(json!({ "text": "Edited" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location_of(&res), post_url(post.id));
        let stored = fx.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "Edited");

        let req = test::TestRequest::post()
            .uri(&delete_uri)
            .insert_header(bearer(&reader_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FOUND);
        assert!(fx.state.comments.find_by_id(comment.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_non_author_is_forbidden_before_the_form_is_read() {
        let fx = Fixture::new().await;
        let (author, author_token) = fx.user("leo").await;
        let (reader, reader_token) = fx.user("anna").await;
        let post = fx.post(&author, "trip").await;
        let comment = fx.comment(&post, &reader, "Lovely").await;
        let uri = format!("/posts/{}/comment/{}/edit/", post.id, comment.id);

        let app = test_app!(fx.state.clone());

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&author_token))
            .set_json(json!({}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "You are not allowed to edit this comment.");

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&reader_token))
            .set_json(json!({}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let stored = fx.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "Lovely");
    }

    #[actix_web::test]
    async fn test_comment_must_belong_to_post_in_path() {
        let fx = Fixture::new().await;
        let (author, token) = fx.user("leo").await;
        let post = fx.post(&author, "trip").await;
        let other = fx.post(&author, "another trip").await;
        let comment = fx.comment(&post, &author, "Mine").await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/comment/{}/edit/", other.id, comment.id))
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
