//! Session store: the single writer of identity state.
//!
//! Operations may interleave at await points. Two counters keep the published
//! snapshot coherent:
//! - the identity generation, bumped when `resolve()` or `logout()` starts. A
//!   session check only applies its result if no later operation started
//!   while it was in flight.
//! - the operation ticket, bumped when any operation starts. An error is only
//!   recorded by the operation holding the latest ticket.
//!
//! Both counters and the publish live under one `std::sync::Mutex` that is
//! never held across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::ApiResult;
use crate::models::User;

use super::backend::AuthBackend;
use super::session::{Identity, Session};

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";

#[derive(Error, Debug)]
pub enum SessionError {
    /// The server answered with something the client could not interpret.
    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Default)]
struct Ledger {
    identity_generation: u64,
    operation: u64,
}

pub struct SessionStore<B> {
    backend: B,
    ledger: Mutex<Ledger>,
    state: watch::Sender<Session>,
    activated: AtomicBool,
}

impl<B: AuthBackend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self {
            backend,
            ledger: Mutex::new(Ledger::default()),
            state,
            activated: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// A receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Run the startup session check. Only the first call does any work;
    /// returns whether this call was the one that ran it.
    pub async fn activate(&self) -> bool {
        if self.activated.swap(true, Ordering::SeqCst) {
            debug!("Session store already activated");
            return false;
        }
        self.resolve().await;
        true
    }

    /// Ask the backend who the session belongs to and publish the answer.
    ///
    /// Never fails: any error is logged and resolves to anonymous.
    pub async fn resolve(&self) {
        let generation = {
            let mut ledger = self.ledger();
            ledger.identity_generation += 1;
            ledger.operation += 1;
            self.state.send_modify(|s| {
                s.resolving = true;
                s.last_error = None;
            });
            ledger.identity_generation
        };
        debug!(generation, "Resolving session");

        let identity = match self.backend.check_session().await {
            Ok(check) => match check.into_user() {
                Some(user) => Identity::Authenticated(user),
                None => Identity::Anonymous,
            },
            Err(e) => {
                warn!(error = %e, "Session check failed, treating as signed out");
                Identity::Anonymous
            }
        };

        let ledger = self.ledger();
        if ledger.identity_generation != generation {
            debug!(
                generation,
                current = ledger.identity_generation,
                "Discarding superseded session check"
            );
            return;
        }
        match identity.user() {
            Some(user) => info!(user_id = user.id, username = %user.username, "Session resolved"),
            None => info!("Session resolved as anonymous"),
        }
        self.state.send_modify(|s| {
            s.identity = identity;
            s.resolving = false;
        });
    }

    /// Sign in. Rejections and transport failures land in `last_error`; only
    /// an uninterpretable server response is returned as an error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let ticket = self.begin_operation();
        if email.trim().is_empty() || password.is_empty() {
            self.record_error(ticket, "Email and password are required".to_string());
            return Ok(());
        }

        info!("Signing in");
        let result = self.backend.login(email, password).await;
        self.finish_credentials(ticket, result, LOGIN_FAILED).await
    }

    /// Create an account. Same contract as `login`.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<(), SessionError> {
        let ticket = self.begin_operation();
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            self.record_error(ticket, "Username, email and password are required".to_string());
            return Ok(());
        }

        info!("Signing up");
        let result = self.backend.signup(username, email, password).await;
        self.finish_credentials(ticket, result, SIGNUP_FAILED).await
    }

    /// Sign out. The local session ends whether or not the server call works.
    pub async fn logout(&self) {
        let generation = {
            let mut ledger = self.ledger();
            ledger.identity_generation += 1;
            ledger.operation += 1;
            self.clear_error();
            ledger.identity_generation
        };

        if let Err(e) = self.backend.logout().await {
            warn!(error = %e, "Logout request failed, ending local session anyway");
        }

        let ledger = self.ledger();
        // A session check started after this logout owns `resolving` and
        // publishes its own identity when it lands.
        let newer_check = ledger.identity_generation != generation;
        self.state.send_modify(|s| {
            s.identity = Identity::Anonymous;
            if !newer_check {
                s.resolving = false;
            }
        });
        info!(newer_check, "Signed out");
    }

    async fn finish_credentials(
        &self,
        ticket: u64,
        result: ApiResult<User>,
        fallback: &str,
    ) -> Result<(), SessionError> {
        match result {
            Ok(user) => {
                // Identity comes from the session check, not the credential response.
                debug!(user_id = user.id, "Credentials accepted");
                self.resolve().await;
                Ok(())
            }
            Err(e) if e.is_unexpected() => {
                error!(error = %e, "{}: unexpected response", fallback);
                self.record_error(ticket, e.user_message(fallback));
                Err(SessionError::UnexpectedResponse(e.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "{}", fallback);
                self.record_error(ticket, e.user_message(fallback));
                Ok(())
            }
        }
    }

    fn begin_operation(&self) -> u64 {
        let mut ledger = self.ledger();
        ledger.operation += 1;
        self.clear_error();
        ledger.operation
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    fn record_error(&self, ticket: u64, message: String) {
        let ledger = self.ledger();
        if ledger.operation != ticket {
            debug!(ticket, current = ledger.operation, "Dropping error from superseded operation");
            return;
        }
        self.state.send_modify(|s| s.last_error = Some(message));
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::auth::{GuardDecision, RouteGuard};
    use crate::models::SessionCheck;
    use crate::routes::Route;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    enum Step<T> {
        Ready(ApiResult<T>),
        Gated {
            entered: oneshot::Sender<()>,
            release: oneshot::Receiver<ApiResult<T>>,
        },
    }

    struct Gate<T> {
        entered: oneshot::Receiver<()>,
        release: oneshot::Sender<ApiResult<T>>,
    }

    impl<T> Gate<T> {
        async fn wait_entered(&mut self) {
            (&mut self.entered).await.unwrap();
        }

        fn release(self, result: ApiResult<T>) {
            assert!(self.release.send(result).is_ok(), "gated call went away");
        }
    }

    fn gated<T>() -> (Step<T>, Gate<T>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        (
            Step::Gated {
                entered: entered_tx,
                release: release_rx,
            },
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    impl<T> Step<T> {
        async fn run(self) -> ApiResult<T> {
            match self {
                Step::Ready(result) => result,
                Step::Gated { entered, release } => {
                    let _ = entered.send(());
                    release
                        .await
                        .unwrap_or_else(|_| Err(ApiError::InvalidResponse("gate dropped".into())))
                }
            }
        }
    }

    /// Backend answering from per-endpoint scripts, in call order.
    #[derive(Default)]
    struct ScriptedBackend {
        checks: Mutex<VecDeque<Step<SessionCheck>>>,
        logins: Mutex<VecDeque<Step<User>>>,
        signups: Mutex<VecDeque<Step<User>>>,
        logouts: Mutex<VecDeque<Step<()>>>,
        check_calls: AtomicUsize,
        login_calls: AtomicUsize,
    }

    fn next<T>(queue: &Mutex<VecDeque<Step<T>>>, endpoint: &str) -> Step<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted {} call", endpoint))
    }

    impl ScriptedBackend {
        fn check(self, step: Step<SessionCheck>) -> Self {
            self.checks.lock().unwrap().push_back(step);
            self
        }

        fn login(self, step: Step<User>) -> Self {
            self.logins.lock().unwrap().push_back(step);
            self
        }

        fn signup(self, step: Step<User>) -> Self {
            self.signups.lock().unwrap().push_back(step);
            self
        }

        fn logout(self, step: Step<()>) -> Self {
            self.logouts.lock().unwrap().push_back(step);
            self
        }
    }

    #[async_trait]
    impl AuthBackend for ScriptedBackend {
        async fn check_session(&self) -> ApiResult<SessionCheck> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            let step = next(&self.checks, "check_session");
            step.run().await
        }

        async fn login(&self, _email: &str, _password: &str) -> ApiResult<User> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            let step = next(&self.logins, "login");
            step.run().await
        }

        async fn signup(&self, _username: &str, _email: &str, _password: &str) -> ApiResult<User> {
            let step = next(&self.signups, "signup");
            step.run().await
        }

        async fn logout(&self) -> ApiResult<()> {
            let step = next(&self.logouts, "logout");
            step.run().await
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            username: name.to_string(),
            email: format!("{}@example.com", name),
        }
    }

    fn signed_in(id: i64, name: &str) -> Step<SessionCheck> {
        Step::Ready(Ok(SessionCheck::authenticated(user(id, name))))
    }

    fn signed_out() -> Step<SessionCheck> {
        Step::Ready(Ok(SessionCheck::anonymous()))
    }

    fn rejected(status: StatusCode, message: &str) -> ApiError {
        ApiError::from_status(status, &format!(r#"{{"error": "{}"}}"#, message))
    }

    fn unreachable_server() -> ApiError {
        ApiError::NetworkError(reqwest::Client::new().get("::not a url::").build().unwrap_err())
    }

    #[tokio::test]
    async fn test_fresh_load_anonymous_redirects_to_login() {
        let store = SessionStore::new(ScriptedBackend::default().check(signed_out()));
        let guard = RouteGuard::default();

        let before = store.snapshot();
        assert_eq!(guard.check(&Route::Projects, &before), GuardDecision::Loading);

        assert!(store.activate().await);
        let after = store.snapshot();
        assert!(!after.resolving);
        assert_eq!(after.identity, Identity::Anonymous);
        assert_eq!(
            guard.check(&Route::Projects, &after),
            GuardDecision::Redirect {
                to: Route::Login,
                from: Route::Projects
            }
        );
    }

    #[tokio::test]
    async fn test_activate_runs_once() {
        let store = SessionStore::new(ScriptedBackend::default().check(signed_in(1, "a")));
        assert!(store.activate().await);
        assert!(!store.activate().await);
        assert_eq!(store.backend().check_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_success_resolves_identity() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Ok(user(1, "a"))))
            .check(signed_in(1, "a"));
        let store = SessionStore::new(backend);
        store.activate().await;

        store.login("a@example.com", "pw").await.unwrap();

        let session = store.snapshot();
        assert!(!session.resolving);
        assert!(session.last_error.is_none());
        match RouteGuard::default().check(&Route::Projects, &session) {
            GuardDecision::Render(u) => assert_eq!(u.username, "a"),
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_identity_comes_from_session_check_not_login_body() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Ok(user(1, "from-login"))))
            .check(signed_in(1, "from-check"));
        let store = SessionStore::new(backend);
        store.activate().await;
        store.login("a@example.com", "pw").await.unwrap();
        assert_eq!(store.snapshot().identity.user().unwrap().username, "from-check");
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_existing_identity() {
        let backend = ScriptedBackend::default()
            .check(signed_in(1, "a"))
            .login(Step::Ready(Err(rejected(StatusCode::UNAUTHORIZED, "invalid credentials"))));
        let store = SessionStore::new(backend);
        store.activate().await;

        store.login("a@example.com", "wrong").await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.last_error.as_deref(), Some("invalid credentials"));
        assert_eq!(session.identity.user_id(), Some(1));
        assert!(!session.resolving);
    }

    #[tokio::test]
    async fn test_login_rejection_without_message_uses_fallback() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Err(ApiError::from_status(StatusCode::UNAUTHORIZED, ""))));
        let store = SessionStore::new(backend);
        store.activate().await;
        store.login("a@example.com", "pw").await.unwrap();
        assert_eq!(
            store.snapshot().last_error.as_deref(),
            Some("Login failed: HTTP 401")
        );
    }

    #[tokio::test]
    async fn test_login_transport_failure_is_a_rejection() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Err(unreachable_server())));
        let store = SessionStore::new(backend);
        store.activate().await;

        assert!(store.login("a@example.com", "pw").await.is_ok());
        assert_eq!(
            store.snapshot().last_error.as_deref(),
            Some("Unable to connect to server. Check your internet connection.")
        );
    }

    #[tokio::test]
    async fn test_malformed_login_response_is_returned() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Err(ApiError::InvalidResponse("missing user".into()))));
        let store = SessionStore::new(backend);
        store.activate().await;

        let result = store.login("a@example.com", "pw").await;
        assert!(matches!(result, Err(SessionError::UnexpectedResponse(_))));
        let session = store.snapshot();
        assert!(session.last_error.unwrap().starts_with("Login failed"));
        assert_eq!(session.identity, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_empty_credentials_skip_the_network() {
        let store = SessionStore::new(ScriptedBackend::default().check(signed_out()));
        store.activate().await;
        store.login("   ", "pw").await.unwrap();
        assert_eq!(
            store.snapshot().last_error.as_deref(),
            Some("Email and password are required")
        );
        assert_eq!(store.backend().login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signup_conflict_sets_error() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .signup(Step::Ready(Err(rejected(
                StatusCode::CONFLICT,
                "username or email already in use",
            ))));
        let store = SessionStore::new(backend);
        store.activate().await;

        store.signup("a", "a@example.com", "pw").await.unwrap();
        let session = store.snapshot();
        assert_eq!(session.last_error.as_deref(), Some("username or email already in use"));
        assert_eq!(session.identity, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_signup_success_signs_in() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .signup(Step::Ready(Ok(user(7, "new"))))
            .check(signed_in(7, "new"));
        let store = SessionStore::new(backend);
        store.activate().await;
        store.signup("new", "new@example.com", "pw").await.unwrap();
        assert_eq!(store.snapshot().identity.user_id(), Some(7));
    }

    #[tokio::test]
    async fn test_logout_with_network_down_still_signs_out() {
        let backend = ScriptedBackend::default()
            .check(signed_in(1, "a"))
            .logout(Step::Ready(Err(unreachable_server())));
        let store = SessionStore::new(backend);
        store.activate().await;

        store.logout().await;

        let session = store.snapshot();
        assert_eq!(session.identity, Identity::Anonymous);
        assert!(!session.resolving);
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_previous_error() {
        let backend = ScriptedBackend::default()
            .check(signed_out())
            .login(Step::Ready(Err(rejected(StatusCode::UNAUTHORIZED, "invalid credentials"))))
            .logout(Step::Ready(Ok(())));
        let store = SessionStore::new(backend);
        store.activate().await;
        store.login("a@example.com", "bad").await.unwrap();
        assert!(store.snapshot().last_error.is_some());

        store.logout().await;
        assert!(store.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_anonymous_without_error() {
        let backend = ScriptedBackend::default()
            .check(Step::Ready(Err(rejected(StatusCode::INTERNAL_SERVER_ERROR, "boom"))));
        let store = SessionStore::new(backend);
        store.resolve().await;
        let session = store.snapshot();
        assert_eq!(session.identity, Identity::Anonymous);
        assert!(!session.resolving);
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_claimed_session_without_user_is_anonymous() {
        let backend = ScriptedBackend::default().check(Step::Ready(Ok(SessionCheck {
            authenticated: true,
            user: None,
        })));
        let store = SessionStore::new(backend);
        store.resolve().await;
        assert_eq!(store.snapshot().identity, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let backend = ScriptedBackend::default()
            .check(signed_in(1, "a"))
            .check(signed_in(1, "a"));
        let store = SessionStore::new(backend);
        store.resolve().await;
        let first = store.snapshot();
        store.resolve().await;
        assert_eq!(store.snapshot(), first);
    }

    #[tokio::test]
    async fn test_logout_supersedes_slow_resolve() {
        let (step, mut gate) = gated();
        let store = Arc::new(SessionStore::new(
            ScriptedBackend::default().check(step).logout(Step::Ready(Ok(()))),
        ));

        let resolving = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.resolve().await }
        });
        gate.wait_entered().await;

        store.logout().await;
        gate.release(Ok(SessionCheck::authenticated(user(1, "a"))));
        resolving.await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.identity, Identity::Anonymous);
        assert!(!session.resolving);
    }

    #[tokio::test]
    async fn test_login_started_during_logout_is_kept() {
        let (slow_logout, mut logout_gate) = gated();
        let (slow_check, mut check_gate) = gated();
        let store = Arc::new(SessionStore::new(
            ScriptedBackend::default()
                .logout(slow_logout)
                .login(Step::Ready(Ok(user(2, "b"))))
                .check(slow_check),
        ));

        let logout = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.logout().await }
        });
        logout_gate.wait_entered().await;

        let login = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.login("b@example.com", "pw").await }
        });
        check_gate.wait_entered().await;

        logout_gate.release(Ok(()));
        logout.await.unwrap();
        let between = store.snapshot();
        assert_eq!(between.identity, Identity::Anonymous);
        assert!(between.resolving);

        check_gate.release(Ok(SessionCheck::authenticated(user(2, "b"))));
        login.await.unwrap().unwrap();

        let session = store.snapshot();
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("b"));
        assert!(!session.resolving);
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_older_resolve_cannot_overwrite_newer() {
        let (slow, mut gate) = gated();
        let store = Arc::new(SessionStore::new(
            ScriptedBackend::default().check(slow).check(signed_out()),
        ));

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.resolve().await }
        });
        gate.wait_entered().await;

        store.resolve().await;
        assert_eq!(store.snapshot().identity, Identity::Anonymous);

        gate.release(Ok(SessionCheck::authenticated(user(1, "a"))));
        first.await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.identity, Identity::Anonymous);
        assert!(!session.resolving);
    }

    #[tokio::test]
    async fn test_stale_login_error_is_dropped() {
        let (slow_login, mut gate) = gated();
        let store = Arc::new(SessionStore::new(
            ScriptedBackend::default()
                .check(signed_out())
                .login(slow_login)
                .logout(Step::Ready(Ok(()))),
        ));
        store.activate().await;

        let login = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.login("a@example.com", "pw").await }
        });
        gate.wait_entered().await;

        store.logout().await;
        gate.release(Err(rejected(StatusCode::UNAUTHORIZED, "invalid credentials")));
        login.await.unwrap().unwrap();

        assert!(store.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn test_no_loading_flash_after_settling() {
        let (slow_logout, mut gate) = gated();
        let store = Arc::new(SessionStore::new(
            ScriptedBackend::default()
                .check(signed_in(1, "a"))
                .login(Step::Ready(Err(rejected(StatusCode::UNAUTHORIZED, "nope"))))
                .logout(slow_logout),
        ));
        store.activate().await;
        assert!(!store.snapshot().resolving);

        store.login("a@example.com", "bad").await.unwrap();
        assert!(!store.snapshot().resolving);

        let logout = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.logout().await }
        });
        gate.wait_entered().await;
        assert!(!store.snapshot().resolving);

        gate.release(Ok(()));
        logout.await.unwrap();
        assert!(!store.snapshot().resolving);
    }

    #[tokio::test]
    async fn test_subscribers_see_settled_snapshot() {
        let store = SessionStore::new(ScriptedBackend::default().check(signed_in(3, "c")));
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().resolving);

        store.activate().await;

        assert!(rx.has_changed().unwrap());
        let session = rx.borrow_and_update().clone();
        assert!(!session.resolving);
        assert_eq!(session.identity.user_id(), Some(3));
    }
}
