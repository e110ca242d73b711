//! Shared application state and navigation collaborators
//!
//! The listing workflow only ever writes here on its success path: one
//! `video_added` event and one navigation to the detail route.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;

/// Sink for "video added" events
pub trait StateSink: Send + Sync {
    fn video_added(&self, token_uri: &str);
}

/// Receiver of the post-listing navigation target
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Detail route for a listed video
pub fn nft_route(token_uri: &str) -> String {
    format!("/nft/{}", token_uri)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoEntry {
    pub token_uri: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoState {
    /// Most recently added video
    pub current: Option<String>,
    pub videos: Vec<VideoEntry>,
}

/// In-memory video state shared across requests.
///
/// Concurrent listings append independently; the last writer sets `current`.
#[derive(Clone, Default)]
pub struct VideoStore {
    inner: Arc<RwLock<VideoState>>,
}

impl VideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> VideoState {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateSink for VideoStore {
    fn video_added(&self, token_uri: &str) {
        let mut state = self.inner.write();
        state.videos.push(VideoEntry {
            token_uri: token_uri.to_string(),
            added_at: Utc::now(),
        });
        state.current = Some(token_uri.to_string());
        debug!(token_uri = %token_uri, total = state.videos.len(), "Video added");
    }
}

/// Navigator that records every route it is sent to
#[derive(Debug, Default)]
pub struct RouteRecorder {
    routes: Mutex<Vec<String>>,
}

impl RouteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }
}

impl Navigator for RouteRecorder {
    fn navigate(&self, route: &str) {
        self.routes.lock().push(route.to_string());
    }
}
