use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::store::{StoreError, StoreResult, Table, VideoStore};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStats {
    pub videos: i64,
    pub channels: i64,
}

/// Any failure while gathering stats.
///
/// Rendered as a zeroed body with status 500; the cause is only logged.
#[derive(Debug, thiserror::Error)]
#[error("Failed to fetch stats: {0}")]
pub struct StatsError(#[from] StoreError);

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Failed to fetch stats");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(VideoStats::default())).into_response()
    }
}

/// Count videos and channels concurrently.
pub async fn fetch_stats<S>(store: &S) -> StoreResult<VideoStats>
where
    S: VideoStore + ?Sized,
{
    let (videos, channels) = tokio::try_join!(store.count(Table::Video), store.count(Table::Channel))?;
    Ok(VideoStats { videos, channels })
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<VideoStats>, StatsError> {
    let stats = fetch_stats(state.store.as_ref()).await?;
    Ok(Json(stats))
}
