//! The video assembly endpoint.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use bytes::Bytes;
use sv_core::Error;
use sv_pipeline::Submission;

use crate::context::AppContext;
use crate::error::{AppError, ErrorBody};
use crate::middleware::request_id::RequestId;
use crate::outcome;

/// Form fields of an assembly submission, for the OpenAPI document.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct AssemblyForm {
    /// JSON-encoded `AssemblyRequest`.
    metadata: String,
    /// One image per scene, in scene order.
    #[schema(value_type = Vec<String>, format = Binary)]
    images: Vec<Vec<u8>>,
    /// One narration clip per scene, in scene order.
    #[schema(value_type = Vec<String>, format = Binary)]
    audio: Vec<Vec<u8>>,
}

/// POST /assemble-video
#[utoipa::path(
    post,
    path = "/assemble-video",
    request_body(content = AssemblyForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "The assembled MP4 (video/mp4) as an attachment",
         headers(
            ("X-Video-Duration" = String, description = "Duration in seconds"),
            ("X-Video-Size" = u64, description = "Size in bytes"),
         )),
        (status = 400, description = "Invalid metadata, asset counts or missing input", body = ErrorBody),
        (status = 413, description = "Upload exceeds the size ceiling", body = ErrorBody),
        (status = 500, description = "Encoder or internal failure", body = ErrorBody),
        (status = 504, description = "Encode exceeded its deadline", body = ErrorBody),
    )
)]
pub async fn assemble_video(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let started = std::time::Instant::now();
    let request_id = request_id.map(|Extension(RequestId(id))| id);

    let submission = match multipart {
        Ok(multipart) => {
            let caps = UploadCaps {
                transport: ctx.config.server.max_request_bytes,
                ceiling: ctx.pipeline.settings().max_upload_bytes,
            };
            collect_submission(multipart, caps).await
        }
        Err(rejection) => Err(Error::invalid_request(format!(
            "Malformed multipart body: {}",
            rejection.body_text()
        ))),
    };

    let result = match submission {
        Ok(submission) => ctx.pipeline.run(submission).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(result) => {
            let filename = outcome::todays_filename(&ctx.config.assembly.filename_prefix);
            tracing::info!(
                job = %result.job_id,
                filename = %filename,
                duration = result.duration_seconds,
                size = result.size_bytes,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Sending assembled video"
            );
            outcome::record_outcome("ok", result.elapsed);
            Ok(outcome::video_response(result, &filename))
        }
        Err(e) => {
            outcome::record_outcome(e.code(), started.elapsed());
            Err(AppError::new(e).with_request_id(request_id))
        }
    }
}

/// Byte limits in force while reading the form.
#[derive(Debug, Clone, Copy)]
struct UploadCaps {
    /// Body size at which the transport stops reading.
    transport: u64,
    /// Aggregate asset ceiling reported to the client.
    ceiling: u64,
}

/// Read every part of the form into memory, preserving part order within
/// each field name. Unknown fields are skipped.
async fn collect_submission(mut multipart: Multipart, caps: UploadCaps) -> sv_core::Result<Submission> {
    let mut metadata: Option<String> = None;
    let mut images: Vec<Bytes> = Vec::new();
    let mut audio: Vec<Bytes> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e, caps)),
        };
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, caps))?;

        match name.as_str() {
            "metadata" => {
                let text = String::from_utf8(data.to_vec())
                    .map_err(|e| Error::InvalidMetadata(e.to_string()))?;
                metadata = Some(text);
            }
            "images" => images.push(data),
            "audio" => audio.push(data),
            other => tracing::debug!("Ignoring unexpected form field {other:?}"),
        }
    }

    let metadata =
        metadata.ok_or_else(|| Error::InvalidMetadata("missing form field \"metadata\"".into()))?;

    Ok(Submission {
        metadata,
        images,
        audio,
    })
}

/// A body cut off by the transport cap is reported as oversize; anything
/// else wrong with the form is the client's malformed request.
///
/// The exact size of a truncated body is unknown; the transport cap is the
/// lower bound reported as observed.
fn multipart_error(err: MultipartError, caps: UploadCaps) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::payload_too_large(caps.transport.max(caps.ceiling.saturating_add(1)), caps.ceiling)
    } else {
        Error::invalid_request(format!("Malformed multipart body: {}", err.body_text()))
    }
}
