//! Registration and login.

use actix_web::{HttpResponse, web};

use blogicum_core::domain::User;
use blogicum_core::ports::BaseRepository;
use blogicum_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state.tokens.generate_token(user.id, &user.username)?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /auth/registration/
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let username = req.username.trim().to_string();

    let mut errors = req.validate().err().unwrap_or_default();
    if !username.is_empty() && !User::is_valid_username(&username) {
        errors.push(
            "username: letters, digits and @/./+/-/_ only, at most 150 characters".to_string(),
        );
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if state.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict(
            "A user with that username already exists.".to_string(),
        ));
    }

    let password_hash = state.passwords.hash(&req.password)?;

    let mut user = User::new(username, password_hash);
    user.email = req.email.trim().to_string();
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    let user = state.users.insert(user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(HttpResponse::Created().json(auth_response(&state, &user)?))
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .users
        .find_by_username(req.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(AppError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(auth_response(&state, &user)?))
}
