//! Sign-in boundary
//!
//! Chat code never inspects credentials. It sees an [`AuthState`] feed and
//! two actions. [`LocalAuth`] signs in a single configured identity and is
//! enough for a self-hosted deployment; a real identity provider plugs in
//! behind the same trait.

use crate::config::AuthConfig;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub is_loading: bool,
    pub user: Option<AuthUser>,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            user: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            is_loading: false,
            user: None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Live auth state; the receiver sees every change
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    async fn login(&self);

    async fn logout(&self);

    fn current(&self) -> AuthState {
        self.subscribe().borrow().clone()
    }
}

/// Single-user provider backed by configuration
pub struct LocalAuth {
    user: AuthUser,
    state_tx: watch::Sender<AuthState>,
}

impl LocalAuth {
    pub fn new(config: &AuthConfig) -> Self {
        let (state_tx, _) = watch::channel(AuthState::loading());
        Self {
            user: AuthUser {
                id: uuid::Uuid::new_v4().to_string(),
                email: config.email.clone(),
                display_name: config.display_name.clone(),
            },
            state_tx,
        }
    }

    /// Settle the initial loading state. Nothing survives a restart, so the
    /// user starts signed out.
    pub fn restore(&self) {
        self.state_tx.send_if_modified(|state| {
            if state.is_loading {
                *state = AuthState::signed_out();
                true
            } else {
                false
            }
        });
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    async fn login(&self) {
        tracing::info!(email = %self.user.email, "User signed in");
        self.state_tx.send_replace(AuthState {
            is_loading: false,
            user: Some(self.user.clone()),
        });
    }

    async fn logout(&self) {
        tracing::info!(email = %self.user.email, "User signed out");
        self.state_tx.send_replace(AuthState::signed_out());
    }
}
