//! User model for gator.

use chrono::{DateTime, Utc};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// User name (unique).
    pub name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User name.
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Check that the name is usable.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("user name must not be empty".to_string());
        }
        if name.chars().any(char::is_whitespace) {
            return Err("user name must not contain whitespace".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = NewUser::new("alice");
        assert_eq!(user.name, "alice");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_new_user_rejects_empty_name() {
        assert!(NewUser::new("  ").validate().is_err());
    }

    #[test]
    fn test_new_user_rejects_whitespace() {
        assert!(NewUser::new("al ice").validate().is_err());
    }
}
