use crate::session::SessionHandle;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle of the session being controlled, once one has started
    pub session: Arc<RwLock<Option<SessionHandle>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_session(handle: SessionHandle) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(handle))),
        }
    }

    /// Attach (or replace) the controlled session
    pub async fn attach(&self, handle: SessionHandle) {
        *self.session.write().await = Some(handle);
    }

    pub async fn handle(&self) -> Option<SessionHandle> {
        self.session.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
