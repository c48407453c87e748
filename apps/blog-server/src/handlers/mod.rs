//! HTTP handlers and route configuration.

mod auth;
mod categories;
mod comments;
mod health;
mod pages;
mod posts;
mod profile;

#[cfg(test)]
mod test_support;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blogicum_core::domain::User;
use blogicum_core::pagination::PageRequest;
use blogicum_core::ports::BaseRepository;
use blogicum_shared::ApiResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::state::AppState;

#[cfg(feature = "rate-limit")]
use crate::middleware::rate_limit::RateLimitMiddleware;

/// `?page=` of the paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub fn request(&self) -> AppResult<PageRequest> {
        Ok(PageRequest::parse(self.page.as_deref())?)
    }
}

pub fn post_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

/// `302 Found` to `location`, with the same target in the JSON envelope.
pub fn redirect<T: Serialize>(location: String, data: Option<T>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.clone()))
        .json(ApiResponse::redirect(data, location))
}

/// A JSON body whose extraction error is held back until the request is authorized.
pub type DeferredJson<T> = Result<web::Json<T>, actix_web::Error>;

/// The deserialized body, or the problem document of the failed extraction.
pub fn json_body<T>(body: DeferredJson<T>) -> Result<T, HttpResponse> {
    body.map(web::Json::into_inner).map_err(|err| err.error_response())
}

/// The account behind a token; a token of a deleted account is rejected.
pub async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn not_found(req: HttpRequest, request_id: RequestId) -> AppResult<HttpResponse> {
    tracing::debug!(request_id = request_id.as_str(), path = req.path(), "No route matched");
    Err(AppError::NotFound(
        "The requested page does not exist".to_string(),
    ))
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::NotFound(err.to_string()).into());

    let auth = web::scope("/auth")
        .route("/registration/", web::post().to(auth::register))
        .route("/login/", web::post().to(auth::login));
    #[cfg(feature = "rate-limit")]
    let auth = auth.wrap(RateLimitMiddleware);

    cfg.app_data(json_config)
        .app_data(path_config)
        .route("/", web::get().to(posts::index))
        .route("/health", web::get().to(health::health_check))
        .service(auth)
        .service(
            web::scope("/posts")
                .route("/create/", web::get().to(posts::create_form))
                .route("/create/", web::post().to(posts::create))
                .route("/{post_id}/", web::get().to(posts::detail))
                .route("/{post_id}/edit/", web::get().to(posts::edit_form))
                .route("/{post_id}/edit/", web::post().to(posts::edit))
                .route("/{post_id}/delete/", web::get().to(posts::delete_confirm))
                .route("/{post_id}/delete/", web::post().to(posts::delete))
                .route("/{post_id}/comment/", web::post().to(comments::add))
                .route(
                    "/{post_id}/comment/{comment_id}/edit/",
                    web::get().to(comments::edit_form),
                )
                .route(
                    "/{post_id}/comment/{comment_id}/edit/",
                    web::post().to(comments::edit),
                )
                .route(
                    "/{post_id}/comment/{comment_id}/delete/",
                    web::get().to(comments::delete_confirm),
                )
                .route(
                    "/{post_id}/comment/{comment_id}/delete/",
                    web::post().to(comments::delete),
                ),
        )
        .service(
            web::scope("/profile")
                .route("/edit/", web::get().to(profile::edit_form))
                .route("/edit/", web::post().to(profile::edit))
                .route("/{username}/", web::get().to(profile::show)),
        )
        .route("/category/{slug}/", web::get().to(categories::show))
        .service(
            web::scope("/pages")
                .route("/about/", web::get().to(pages::about))
                .route("/rules/", web::get().to(pages::rules)),
        )
        .default_service(web::to(not_found));
}
