//! Job handlers: submit, batch submit, progress, file retrieval.

use super::{BatchJobRequest, SubmitJobRequest};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{Progress, Submission};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;

/// POST /jobs - Submit a URL or search query
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = Submission),
        (status = 400, description = "Empty input or unrecognised URL", body = crate::error::ApiError),
        (status = 422, description = "Generated mixes cannot be fetched", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<Submission>)> {
    let submission = state
        .downloader
        .submit(&request.input, request.quality)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(submission)))
}

/// POST /jobs/batch - Submit pre-resolved items as one job
#[utoipa::path(
    post,
    path = "/jobs/batch",
    tag = "jobs",
    request_body = BatchJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = Submission),
        (status = 400, description = "Empty list or malformed item id", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchJobRequest>,
) -> Result<(StatusCode, Json<Submission>)> {
    let submission = state
        .downloader
        .submit_batch(request.items, request.quality)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(submission)))
}

/// GET /jobs/:id/progress - Poll a job's progress record
#[utoipa::path(
    get,
    path = "/jobs/{id}/progress",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Current progress record", body = Progress),
        (status = 404, description = "Unknown or already retrieved job", body = crate::error::ApiError)
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Progress>> {
    state.downloader.progress(&id).map(Json)
}

/// GET /jobs/:id/file - Download a finished job's output
///
/// The job's working directory and record are removed once the response body
/// has been sent or abandoned.
#[utoipa::path(
    get,
    path = "/jobs/{id}/file",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Single audio file or zip archive", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown job or no files produced", body = crate::error::ApiError),
        (status = 409, description = "Job still running", body = crate::error::ApiError),
        (status = 500, description = "Packaging failed", body = crate::error::ApiError)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let delivery = state.downloader.retrieve(&id).await?;

    let content_type = delivery.mime_type;
    let content_length = delivery.size;
    let disposition = content_disposition(&delivery.filename);
    let path = delivery.path.clone();
    let guard = delivery.into_guard();

    // On error the guard is dropped here and the job is released.
    let file = tokio::fs::File::open(&path).await?;

    // The guard travels with the body and is dropped once streaming ends.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _held = &guard;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Other(format!("failed to build file response: {e}")))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub(crate) fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
