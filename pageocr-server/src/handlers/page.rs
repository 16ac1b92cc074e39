//! Page resource handlers
//!
//! PUT, GET and DELETE on `/page/{filename}`. Handlers translate between HTTP
//! and [`PageController`](pageocr_core::PageController) outcomes; every
//! filesystem and engine decision is made by the controller.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pageocr_core::{
    negotiate, CacheStatus, DeleteOutcome, DeletionReport, ReadOutcome, Transcript,
    TranscriptVariant,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_file_size, validate_not_empty};

/// `hit` when served from the transcript cache, `miss` when generated.
pub const CACHE_HEADER: &str = "x-transcript-cache";
/// Engine run time in milliseconds, present on a cache miss.
pub const GENERATION_MS_HEADER: &str = "x-generation-ms";

/// Response for a stored page image
#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    /// Identifier the image is stored under
    #[schema(example = "page-0001.jpg")]
    pub key: String,
    /// Number of bytes written
    #[schema(example = 482113_u64)]
    pub bytes: u64,
}

/// Which files a delete removed
#[derive(Serialize, ToSchema)]
pub struct DeletedResponse {
    pub image: bool,
    pub text: bool,
    pub html: bool,
}

impl From<DeletionReport> for DeletedResponse {
    fn from(report: DeletionReport) -> Self {
        Self {
            image: report.image,
            text: report.text,
            html: report.html,
        }
    }
}

/// Returned with 300 when the request named no servable representation
#[derive(Serialize, ToSchema)]
pub struct RepresentationsResponse {
    pub error: &'static str,
    /// Media types that can be requested through `Accept`
    #[schema(example = json!(["text/plain", "text/html"]))]
    pub available: Vec<&'static str>,
}

impl RepresentationsResponse {
    fn all() -> Self {
        Self {
            error: "Specify a representation with the Accept header",
            available: TranscriptVariant::ALL
                .iter()
                .map(|v| v.media_type())
                .collect(),
        }
    }
}

/// Store or replace a page image
///
/// The request body is the raw image. Replacing an image discards any
/// transcripts generated from the previous one.
#[utoipa::path(
    put,
    path = "/page/{filename}",
    tag = "Pages",
    params(
        ("filename" = String, Path, description = "Image file name, e.g. page-0001.jpg")
    ),
    request_body(
        content_type = "application/octet-stream",
        description = "Raw image bytes"
    ),
    responses(
        (status = 201, description = "Image stored", body = CreatedResponse),
        (status = 400, description = "Invalid identifier, unsupported extension, or empty/oversized body"),
        (status = 403, description = "Rejected by the access gate"),
        (status = 500, description = "Storage failure")
    ),
    security(("auth_key" = []))
)]
pub async fn put_page(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    state.pages.parse_key(&filename)?;
    validate_not_empty(body.len())?;
    validate_file_size(body.len(), state.max_image_bytes)?;

    let created = state.pages.create(&filename, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            key: created.key.to_string(),
            bytes: created.bytes,
        }),
    ))
}

/// Fetch a page transcript
///
/// The representation is chosen by `Accept`: `text/html` for hOCR,
/// `text/plain` for plain text. The first request for a representation runs
/// the OCR engine; later ones are served from cache.
#[utoipa::path(
    get,
    path = "/page/{filename}",
    tag = "Pages",
    params(
        ("filename" = String, Path, description = "Image file name"),
        ("Accept" = String, Header, description = "text/plain or text/html")
    ),
    responses(
        (status = 200, description = "Transcript", content_type = "text/plain", body = String),
        (status = 204, description = "No image under this name"),
        (status = 300, description = "No representation selected", body = RepresentationsResponse),
        (status = 400, description = "Invalid identifier or unsupported extension"),
        (status = 403, description = "Rejected by the access gate"),
        (status = 500, description = "Transcript generation or storage failure")
    ),
    security(("auth_key" = []))
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok());

    let response = match state.pages.read(&filename, negotiate(accept)).await? {
        ReadOutcome::Transcript(transcript) => transcript_response(transcript),
        ReadOutcome::NoContent => StatusCode::NO_CONTENT.into_response(),
        ReadOutcome::NotAcceptable => (
            StatusCode::MULTIPLE_CHOICES,
            Json(RepresentationsResponse::all()),
        )
            .into_response(),
    };
    Ok(response)
}

/// Delete a page image and its transcripts
#[utoipa::path(
    delete,
    path = "/page/{filename}",
    tag = "Pages",
    params(
        ("filename" = String, Path, description = "Image file name")
    ),
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 204, description = "No image under this name"),
        (status = 400, description = "Invalid identifier or unsupported extension"),
        (status = 403, description = "Rejected by the access gate"),
        (status = 500, description = "Storage failure")
    ),
    security(("auth_key" = []))
)]
pub async fn delete_page(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let response = match state.pages.delete(&filename).await? {
        DeleteOutcome::Deleted(report) => {
            (StatusCode::OK, Json(DeletedResponse::from(report))).into_response()
        }
        DeleteOutcome::NoContent => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

fn transcript_response(transcript: Transcript) -> Response {
    let content_type = transcript.variant.content_type();
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        transcript.bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    match transcript.cache {
        CacheStatus::Hit => {
            headers.insert(CACHE_HEADER, HeaderValue::from_static("hit"));
        }
        CacheStatus::Generated { duration, .. } => {
            headers.insert(CACHE_HEADER, HeaderValue::from_static("miss"));
            headers.insert(
                GENERATION_MS_HEADER,
                HeaderValue::from(duration.as_millis() as u64),
            );
        }
    }
    response
}
