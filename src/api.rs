//! HTTP API: the chat transport as a small polling interface

mod handlers;
mod transport;
mod types;

pub use handlers::create_router;
pub use transport::HttpTransport;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::session::SessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<HttpTransport>,
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn new(transport: Arc<HttpTransport>, store: Arc<SessionStore>) -> Self {
        Self { transport, store }
    }
}
