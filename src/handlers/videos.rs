use axum::{Json, extract::State};

use crate::AppState;
use crate::models::video::VideoListResponse;

/// GET /api/videos
pub async fn get_videos(State(state): State<AppState>) -> Json<VideoListResponse> {
    Json(VideoListResponse::from(state.videos.snapshot()))
}
