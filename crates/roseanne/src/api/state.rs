//! Application state shared across handlers.

use std::time::Duration;

use axum::extract::FromRef;

use crate::auth::AuthState;
use crate::celebrity::SharedStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token authenticator for login, verify and the admin guard.
    pub auth: AuthState,
    /// Celebrity and vote persistence.
    pub store: SharedStore,
    /// Client used for image health checks.
    pub http: reqwest::Client,
    /// Per-image timeout for health checks.
    pub image_check_timeout: Duration,
}

impl AppState {
    pub fn new(auth: AuthState, store: SharedStore, image_check_timeout: Duration) -> Self {
        Self {
            auth,
            store,
            http: reqwest::Client::new(),
            image_check_timeout,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
