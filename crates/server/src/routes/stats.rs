//! User stats endpoint.

use axum::extract::{Path, State};
use axum::Json;
use questline_shared::UserStats;

use crate::state::AppState;

/// `GET /api/users/{user_id}/stats`
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<UserStats> {
    Json(state.stats(user_id).await)
}
