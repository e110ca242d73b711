//! Video state models for GET /api/videos

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::video_state::VideoState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListResponse {
    pub current: Option<String>,
    pub videos: Vec<VideoItem>,
}

impl From<VideoState> for VideoListResponse {
    fn from(state: VideoState) -> Self {
        Self {
            current: state.current,
            videos: state
                .videos
                .into_iter()
                .map(|v| VideoItem {
                    token_uri: v.token_uri,
                    added_at: v.added_at,
                })
                .collect(),
        }
    }
}
