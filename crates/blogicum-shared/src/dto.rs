//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 256;
const MIN_PASSWORD_LEN: usize = 8;

fn default_true() -> bool {
    true
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !email.is_empty() && !email.contains('@') {
        errors.push("email: enter a valid email address".to_string());
    }
}

fn into_result(errors: Vec<String>) -> Result<(), Vec<String>> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Request to register a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push("username: this field is required".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "password: must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        check_email(&self.email, &mut errors);
        into_result(errors)
    }
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Create/edit form of a post. The author is never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Uuid,
    #[serde(default)]
    pub location_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub image: Option<String>,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            errors.push("title: this field is required".to_string());
        } else if title_len > MAX_TITLE_LEN {
            errors.push(format!("title: at most {MAX_TITLE_LEN} characters"));
        }
        if self.text.trim().is_empty() {
            errors.push("text: this field is required".to_string());
        }
        if self.image.as_deref().is_some_and(|i| i.trim().is_empty()) {
            errors.push("image: must not be blank".to_string());
        }
        into_result(errors)
    }
}

/// Comment form - only the text is editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        if self.text.trim().is_empty() {
            return Err(vec!["text: this field is required".to_string()]);
        }
        Ok(())
    }
}

/// Profile edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push("username: this field is required".to_string());
        }
        check_email(&self.email, &mut errors);
        into_result(errors)
    }
}

/// A user as shown to other visitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

/// A user as shown to themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

/// An informational page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPage {
    pub slug: String,
    pub title: String,
    pub body: String,
}
