//! Search handler.

use super::{SearchRequest, SearchResponse};
use crate::api::AppState;
use crate::error::Result;
use axum::{Json, extract::State};

/// POST /search - Look up videos without downloading
#[utoipa::path(
    post,
    path = "/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Empty query", body = crate::error::ApiError),
        (status = 502, description = "Search tool failed or timed out", body = crate::error::ApiError)
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let results = state
        .downloader
        .search(&request.query, request.limit)
        .await?;
    Ok(Json(SearchResponse { results }))
}
