use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendRequest, RecommendResponse},
};

use super::AppState;

/// Welcome message
pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Movie Recommendation API!" }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "movies": state.recommender.table().len(),
        })),
    )
}

/// Predicts ratings for every movie the user has not rated
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<RecommendResponse>> {
    let Json(request) = payload?;
    let ratings = request.into_ratings();

    tracing::info!(
        request_id = %request_id,
        rating_count = ratings.len(),
        "Processing recommendation request"
    );

    let response = state.recommender.recommend(ratings).await?;

    tracing::info!(
        request_id = %request_id,
        top = response.top_10.len(),
        bottom = response.bottom_10.len(),
        "Recommendation completed"
    );

    Ok(Json(response))
}
