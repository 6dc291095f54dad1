//! Slideshow submission, status polling and download.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use picvid_models::{JobId, JobRecord, JobStatus, SlideshowRequest, DEFAULT_DURATION_SECS};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Resolution used when the form leaves it out.
const DEFAULT_RESOLUTION: &str = "portrait";

/// Response to an accepted upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: String,
}

/// Snapshot of a job as seen by pollers.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    pub percent: u8,
    pub msg: String,
    /// Download path, once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobRecord> for StatusResponse {
    fn from(record: JobRecord) -> Self {
        let result = (record.status == JobStatus::Completed)
            .then(|| format!("/download/{}", record.id));
        Self {
            status: record.status,
            percent: record.percent,
            msg: record.message,
            result,
            filename: record.output_filename,
            error: record.error_detail,
        }
    }
}

/// Fields collected from the multipart form.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<Vec<u8>>,
    title: Option<String>,
    duration: Option<f64>,
    resolution: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "files" => form.files.push(field.bytes().await?.to_vec()),
                "title" => form.title = Some(field.text().await?),
                "duration" => {
                    let raw = field.text().await?;
                    let duration = raw.trim().parse::<f64>().map_err(|_| {
                        ApiError::bad_request(format!("duration must be a number, got {:?}", raw))
                    })?;
                    form.duration = Some(duration);
                }
                "resolution" => form.resolution = Some(field.text().await?),
                _ => debug!(field = %name, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    fn into_request(self) -> ApiResult<SlideshowRequest> {
        let title = self
            .title
            .ok_or_else(|| ApiError::bad_request("title is required"))?;

        Ok(SlideshowRequest::new(
            self.files,
            self.duration.unwrap_or(DEFAULT_DURATION_SECS),
            self.resolution.as_deref().unwrap_or(DEFAULT_RESOLUTION),
            title,
        )?)
    }
}

/// Accept images and start rendering.
///
/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let request = UploadForm::read(multipart).await?.into_request()?;
    let images = request.image_count();

    let task_id = state.orchestrator.submit(request).await?;
    metrics::record_upload(images);
    info!(task_id = %task_id, images, "Slideshow accepted");

    Ok(Json(UploadResponse {
        task_id: task_id.to_string(),
    }))
}

/// Poll a job.
///
/// GET /status/{task_id}
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let record = state
        .registry
        .get(&JobId::from(task_id))
        .await
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(record.into()))
}

/// Serve a finished video as an attachment.
///
/// GET /download/{task_id}
pub async fn download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Response> {
    let record = state
        .registry
        .get(&JobId::from(task_id))
        .await
        .filter(|r| r.status == JobStatus::Completed)
        .ok_or_else(|| ApiError::bad_request("File not ready"))?;

    let path = record
        .result_path
        .as_ref()
        .ok_or_else(|| ApiError::internal("completed job has no result"))?;

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(task_id = %record.id, "Video already removed");
            return Err(ApiError::not_found("Video is no longer available"));
        }
        Err(e) => return Err(ApiError::internal(format!("failed to open video: {}", e))),
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("failed to stat video: {}", e)))?
        .len();

    metrics::record_download(size);

    // the reaper may unlink the path; the open handle keeps streaming
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.output_filename),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// `attachment` disposition; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    let value = if ascii == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    };

    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"video.mp4\""))
}
