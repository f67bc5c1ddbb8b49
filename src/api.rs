//! HTTP API for the chat client
//!
//! Everything except auth and version requires a signed-in user.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::auth::AuthProvider;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(auth: Arc<dyn AuthProvider>, sessions: Arc<SessionManager>) -> Self {
        Self { auth, sessions }
    }
}
