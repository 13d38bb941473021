use crate::models::User;
use crate::routes::Route;

use super::session::{Identity, Session};

/// Outcome of guarding one route against one session snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<'a> {
    /// The route does not require a session.
    Public,
    /// Identity is not settled yet. Show a placeholder, never the content.
    Loading,
    /// Nobody is signed in; go to `to` and come back to `from` afterwards.
    Redirect { to: Route, from: Route },
    Render(&'a User),
}

/// Stateless decision function for protected routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    entry: Route,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl RouteGuard {
    /// A guard that sends anonymous visitors to `entry`.
    pub fn new(entry: Route) -> Self {
        Self { entry }
    }

    pub fn entry(&self) -> Route {
        self.entry
    }

    pub fn check<'a>(&self, route: &Route, session: &'a Session) -> GuardDecision<'a> {
        if !route.requires_auth() {
            return GuardDecision::Public;
        }
        if session.resolving {
            return GuardDecision::Loading;
        }
        match &session.identity {
            Identity::Anonymous => GuardDecision::Redirect {
                to: self.entry,
                from: *route,
            },
            Identity::Authenticated(user) => GuardDecision::Render(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(identity: Identity) -> Session {
        Session {
            identity,
            resolving: false,
            last_error: None,
        }
    }

    fn bob() -> User {
        User {
            id: 2,
            username: "bob".to_string(),
            email: String::new(),
        }
    }

    #[test]
    fn test_loading_while_resolving() {
        let guard = RouteGuard::default();
        assert_eq!(guard.check(&Route::Projects, &Session::initial()), GuardDecision::Loading);

        // A previously known user is still hidden while a check is in flight.
        let session = Session {
            resolving: true,
            ..settled(Identity::Authenticated(bob()))
        };
        assert_eq!(guard.check(&Route::ProjectDetail(4), &session), GuardDecision::Loading);
    }

    #[test]
    fn test_anonymous_redirects_with_return_route() {
        let guard = RouteGuard::default();
        let session = settled(Identity::Anonymous);
        assert_eq!(
            guard.check(&Route::ProjectDetail(9), &session),
            GuardDecision::Redirect {
                to: Route::Login,
                from: Route::ProjectDetail(9)
            }
        );
    }

    #[test]
    fn test_custom_entry_point() {
        let guard = RouteGuard::new(Route::Signup);
        assert_eq!(guard.entry(), Route::Signup);
        let anonymous = settled(Identity::Anonymous);
        let decision = guard.check(&Route::Projects, &anonymous);
        assert!(matches!(decision, GuardDecision::Redirect { to: Route::Signup, .. }));
    }

    #[test]
    fn test_authenticated_renders_user() {
        let session = settled(Identity::Authenticated(bob()));
        match RouteGuard::default().check(&Route::Projects, &session) {
            GuardDecision::Render(user) => assert_eq!(user.username, "bob"),
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[test]
    fn test_public_routes_ignore_session() {
        let guard = RouteGuard::default();
        for route in [Route::Home, Route::Login, Route::Signup] {
            assert_eq!(guard.check(&route, &Session::initial()), GuardDecision::Public);
            assert_eq!(guard.check(&route, &settled(Identity::Anonymous)), GuardDecision::Public);
        }
    }
}
