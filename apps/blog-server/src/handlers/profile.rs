//! Profile pages.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;

use blogicum_core::domain::{PostCard, User};
use blogicum_core::pagination::Page;
use blogicum_core::ports::BaseRepository;
use blogicum_core::query::PostFilter;
use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{OwnProfile, ProfileForm, PublicProfile};

use super::{PageQuery, current_user, profile_url, redirect};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Other visitors never see the email address.
#[derive(Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Own(OwnProfile),
    Public(PublicProfile),
}

#[derive(Serialize)]
pub struct ProfilePage {
    pub profile: ProfileView,
    pub is_owner: bool,
    pub posts: Page<PostCard>,
}

fn own_profile(user: User) -> OwnProfile {
    OwnProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        date_joined: user.date_joined,
    }
}

fn public_profile(user: User) -> PublicProfile {
    PublicProfile {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        date_joined: user.date_joined,
    }
}

/// GET /profile/{username}/ - all posts for the owner, visible ones for everybody else.
pub async fn show(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {username} not found")))?;

    let filter = PostFilter::by_author(user.id, viewer.user_id(), Utc::now());
    let posts = state.posts.list(filter, query.request()?).await?;

    let is_owner = viewer.user_id() == Some(user.id);
    let profile = if is_owner {
        ProfileView::Own(own_profile(user))
    } else {
        ProfileView::Public(public_profile(user))
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ProfilePage {
        profile,
        is_owner,
        posts,
    })))
}

/// GET /profile/edit/
pub async fn edit_form(
    identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(own_profile(user))))
}

/// POST /profile/edit/
pub async fn edit(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<ProfileForm>,
) -> AppResult<HttpResponse> {
    let form = body.into_inner();
    let mut user = current_user(&state, &identity).await?;

    let username = form.username.trim().to_string();
    let mut errors = form.validate().err().unwrap_or_default();
    if !username.is_empty() && !User::is_valid_username(&username) {
        errors.push(
            "username: letters, digits and @/./+/-/_ only, at most 150 characters".to_string(),
        );
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(existing) = state.users.find_by_username(&username).await? {
        if existing.id != user.id {
            return Err(AppError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
    }

    user.username = username;
    user.email = form.email.trim().to_string();
    user.first_name = form.first_name;
    user.last_name = form.last_name;
    let user = state.users.update(user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Profile updated");

    Ok(redirect(profile_url(&user.username), Some(own_profile(user))))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{Value, json};

    use super::*;
    use crate::handlers::test_support::{Fixture, bearer, location_of, test_app};

    #[actix_web::test]
    async fn test_owner_sees_hidden_posts_and_email() {
        let fx = Fixture::new().await;
        let (author, token) = fx.user("leo").await;
        fx.post(&author, "public").await;
        fx.post_with(&author, "draft", |p| p.is_published = false)
            .await;

        let app = test_app!(fx.state.clone());

        let req = test::TestRequest::get()
            .uri("/profile/leo/")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["is_owner"], true);
        assert_eq!(body["data"]["posts"]["total"], 2);
        assert!(body["data"]["profile"].get("email").is_some());

        let req = test::TestRequest::get().uri("/profile/leo/").to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["is_owner"], false);
        assert_eq!(body["data"]["posts"]["total"], 1);
        assert_eq!(body["data"]["posts"]["items"][0]["title"], "public");
        assert!(body["data"]["profile"].get("email").is_none());
        assert!(body["data"]["profile"].get("password_hash").is_none());
    }

    #[actix_web::test]
    async fn test_unknown_profile_is_not_found() {
        let fx = Fixture::new().await;
        let app = test_app!(fx.state.clone());

        let req = test::TestRequest::get().uri("/profile/ghost/").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_edit_profile_renames_user() {
        let fx = Fixture::new().await;
        let (user, token) = fx.user("leo").await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::post()
            .uri("/profile/edit/")
            .insert_header(bearer(&token))
            .set_json(json!({
                "username": "tolstoy",
                "email": "leo@example.com",
                "first_name": "Leo",
                "last_name": "Tolstoy",
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location_of(&res), "/profile/tolstoy/");

        let stored = fx.state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "tolstoy");
        assert_eq!(stored.last_name, "Tolstoy");
    }

    #[actix_web::test]
    async fn test_edit_profile_rejects_taken_username() {
        let fx = Fixture::new().await;
        let (_, token) = fx.user("leo").await;
        fx.user("anna").await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::post()
            .uri("/profile/edit/")
            .insert_header(bearer(&token))
            .set_json(json!({ "username": "anna" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );
    }

    #[actix_web::test]
    async fn test_edit_profile_requires_login() {
        let fx = Fixture::new().await;
        let app = test_app!(fx.state.clone());

        let req = test::TestRequest::get().uri("/profile/edit/").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location_of(&res), "/auth/login/?next=/profile/edit/");
    }
}
