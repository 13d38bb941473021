use async_trait::async_trait;

use crate::api::ApiResult;
use crate::models::{SessionCheck, User};

/// The auth endpoints the session store depends on.
///
/// `ApiClient` is the production implementation; the credential that ties
/// these calls together (a cookie) is carried by the implementation, never
/// by the store.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// "Who am I". An anonymous caller gets `Ok` with `authenticated: false`.
    async fn check_session(&self) -> ApiResult<SessionCheck>;

    async fn login(&self, email: &str, password: &str) -> ApiResult<User>;

    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<User>;

    async fn logout(&self) -> ApiResult<()>;
}
