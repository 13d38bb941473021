use crate::models::User;

/// Who the client is acting as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }
}

/// Snapshot of the session as published by the store.
///
/// Snapshots are replaced whole; a reader never sees a half-applied update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    /// True until the first session check settles, and again while any
    /// explicitly requested check is in flight.
    pub resolving: bool,
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

impl Session {
    /// State at process start: unresolved, anonymous, no error.
    pub fn initial() -> Self {
        Self {
            identity: Identity::Anonymous,
            resolving: true,
            last_error: None,
        }
    }

    /// The signed-in user, once resolution has settled.
    pub fn user(&self) -> Option<&User> {
        if self.resolving {
            None
        } else {
            self.identity.user()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Header text: "Signed in as <name>" / "Not signed in".
    pub fn status_line(&self) -> String {
        if self.resolving && !self.identity.is_authenticated() {
            return "Checking session...".to_string();
        }
        match self.identity.user() {
            Some(user) => format!("Signed in as {}", user.username),
            None => "Not signed in".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_initial_session_is_unresolved() {
        let session = Session::initial();
        assert!(session.resolving);
        assert_eq!(session.identity, Identity::Anonymous);
        assert!(session.last_error.is_none());
        assert_eq!(session.status_line(), "Checking session...");
    }

    #[test]
    fn test_user_hidden_while_resolving() {
        let mut session = Session {
            identity: Identity::Authenticated(alice()),
            resolving: true,
            last_error: None,
        };
        assert!(session.user().is_none());
        assert!(!session.is_authenticated());

        session.resolving = false;
        assert_eq!(session.user().map(|u| u.id), Some(1));
        assert_eq!(session.status_line(), "Signed in as alice");
    }

    #[test]
    fn test_status_line_anonymous() {
        let session = Session {
            resolving: false,
            ..Session::initial()
        };
        assert_eq!(session.status_line(), "Not signed in");
    }

    #[test]
    fn test_identity_accessors() {
        assert_eq!(Identity::Anonymous.user_id(), None);
        assert!(!Identity::Anonymous.is_authenticated());
        let identity = Identity::Authenticated(alice());
        assert_eq!(identity.user_id(), Some(1));
        assert!(identity.is_authenticated());
    }
}
