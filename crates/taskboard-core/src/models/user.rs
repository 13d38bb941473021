use serde::{Deserialize, Serialize};

/// The signed-in account as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Response of the session check endpoint.
///
/// An anonymous caller is not an error: the backend answers
/// `{"authenticated": false}` with a success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionCheck {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

impl SessionCheck {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }

    /// The user, but only when the backend both claims a session and names
    /// the account. A claimed session without a user counts as anonymous.
    pub fn into_user(self) -> Option<User> {
        if self.authenticated {
            self.user
        } else {
            None
        }
    }
}

/// Body returned by login and signup.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anonymous_session_check() {
        let check: SessionCheck = serde_json::from_str(r#"{"authenticated": false}"#).unwrap();
        assert!(!check.authenticated);
        assert_eq!(check.into_user(), None);
    }

    #[test]
    fn test_parse_authenticated_session_check() {
        let json = r#"{"authenticated": true, "user": {"id": 1, "username": "a", "email": "a@b.com"}}"#;
        let check: SessionCheck = serde_json::from_str(json).unwrap();
        let user = check.into_user().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "a");
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_authenticated_without_user_is_anonymous() {
        let check: SessionCheck = serde_json::from_str(r#"{"authenticated": true}"#).unwrap();
        assert_eq!(check.into_user(), None);
    }

    #[test]
    fn test_user_email_is_optional() {
        let user: User = serde_json::from_str(r#"{"id": 7, "username": "x"}"#).unwrap();
        assert_eq!(user.email, "");
    }
}
