use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity - an account that can own posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and join date.
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            date_joined: Utc::now(),
        }
    }

    /// Whether `username` has 1..=150 letters, digits or `@.+-_`.
    pub fn is_valid_username(username: &str) -> bool {
        let len = username.chars().count();
        (1..=150).contains(&len)
            && username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    }

    pub fn author(&self) -> Author {
        Author {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The public face of a user attached to posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(User::is_valid_username("leo.tolstoy"));
        assert!(User::is_valid_username("anna+k@mail_1"));
        assert!(!User::is_valid_username(""));
        assert!(!User::is_valid_username("with space"));
        assert!(!User::is_valid_username(&"x".repeat(151)));
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User::new("reader".to_string(), "secret-hash".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("reader"));
    }
}
