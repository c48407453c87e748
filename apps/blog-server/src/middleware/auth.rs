//! Authentication extractors.

use std::future::{Ready, ready};

use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use url::form_urlencoded;
use uuid::Uuid;

use blogicum_core::ports::{AuthError, TokenClaims};
use blogicum_shared::{ApiResponse, ErrorResponse};

use crate::state::AppState;

/// Where anonymous visitors of protected routes are sent.
pub const LOGIN_URL: &str = "/auth/login/";

/// Authenticated user identity extractor.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Login URL that brings the visitor back to `next` (path and query) afterwards.
pub fn login_redirect_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_URL}?next={}", encoded.replace("%2F", "/"))
}

/// Why a request could not be authenticated.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// No credentials at all; answered with a redirect to the login page.
    #[error("Login required to access {next}")]
    LoginRequired { next: String },

    #[error(transparent)]
    Rejected(AuthError),
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::LoginRequired { .. } => StatusCode::FOUND,
            AuthenticationError::Rejected(AuthError::HashingError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthenticationError::Rejected(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AuthenticationError::LoginRequired { next } => {
                let location = login_redirect_url(next);
                let body = ApiResponse::<()>::redirect(None, location.clone())
                    .with_message("Login required");
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .json(body);
            }
            AuthenticationError::Rejected(AuthError::TokenExpired) => {
                ErrorResponse::new(401, "Token Expired")
                    .with_detail("Your authentication token has expired. Please login again.")
            }
            AuthenticationError::Rejected(AuthError::InvalidToken(msg)) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthenticationError::Rejected(AuthError::HashingError(_)) => {
                ErrorResponse::internal_error()
            }
            AuthenticationError::Rejected(_) => ErrorResponse::unauthorized(),
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthenticationError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return Err(AuthenticationError::Rejected(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        )));
    };

    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        let next = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.path(), |pq| pq.as_str());
        return Err(AuthenticationError::LoginRequired {
            next: next.to_string(),
        });
    };

    let token = auth_header
        .to_str()
        .map_err(|_| {
            AuthenticationError::Rejected(AuthError::InvalidToken(
                "Invalid authorization header".to_string(),
            ))
        })?
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AuthenticationError::Rejected(AuthError::InvalidToken(
                "Expected Bearer token".to_string(),
            ))
        })?;

    state
        .tokens
        .validate_token(token)
        .map(Identity::from)
        .map_err(AuthenticationError::Rejected)
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Optional identity extractor - anonymous when the credentials are missing or bad.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_plain_paths_readable() {
        assert_eq!(
            login_redirect_url("/posts/create/"),
            "/auth/login/?next=/posts/create/"
        );
    }

    #[test]
    fn test_login_redirect_encodes_query_and_reserved_characters() {
        assert_eq!(
            login_redirect_url("/profile/edit/?page=2&x=1"),
            "/auth/login/?next=/profile/edit/%3Fpage%3D2%26x%3D1"
        );
        assert_eq!(
            login_redirect_url("/profile/a+b/"),
            "/auth/login/?next=/profile/a%2Bb/"
        );
    }
}
