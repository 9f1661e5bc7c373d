//! Conversion endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, OriginalUri, Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use pdfconvert_core::{
    parse_options, ConversionOutcome, ConversionRequest, TargetFormat, UploadValidator,
    ValidationError,
};

use super::error::ApiError;
use crate::metrics::UPLOAD_BYTES;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const OPTIONS_FIELD: &str = "options";

/// POST /api/convert/{format_pair}
///
/// Multipart upload with a required `file` part (`application/pdf`) and an
/// optional `options` part holding a JSON object. Responds with the converted
/// document as an attachment.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Path(format_pair): Path<String>,
    OriginalUri(uri): OriginalUri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match handle(&state, &format_pair, multipart).await {
        Ok(response) => response,
        Err(e) => e.into_response_at(uri.path()),
    }
}

async fn handle(
    state: &AppState,
    format_pair: &str,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let target = TargetFormat::from_pair(format_pair)
        .ok_or_else(|| ApiError::UnsupportedPair(format_pair.to_string()))?;
    let policy = state
        .policy(target)
        .ok_or_else(|| ApiError::Internal(format!("no policy registered for {}", target)))?;

    let mut multipart = multipart.map_err(|e| ApiError::MalformedMultipart(e.body_text()))?;
    let request = read_request(&mut multipart, state).await?;
    UPLOAD_BYTES
        .with_label_values(&[target.pair()])
        .observe(request.declared_len as f64);

    let options = parse_options(&request.raw_options);
    info!(
        pair = %target,
        bytes = request.declared_len,
        file_name = request.file_name.as_deref().unwrap_or("-"),
        mode = options.mode.as_str(),
        "Conversion requested"
    );

    match policy.execute(request.document.clone(), options).await {
        ConversionOutcome::Success(converted) => {
            let file_name = request.output_file_name(target);
            info!(pair = %target, bytes = converted.len(), file_name = %file_name, "Conversion succeeded");
            Ok(attachment(converted, target, &file_name))
        }
        ConversionOutcome::TimedOut { after } => Err(ApiError::TimedOut { target, after }),
        ConversionOutcome::EngineFailure(source) => Err(ApiError::EngineFailure { target, source }),
        ConversionOutcome::CircuitOpen { retry_in } => {
            Err(ApiError::CircuitOpen { target, retry_in })
        }
    }
}

/// Walks the multipart stream, validating the file part as it arrives.
async fn read_request(
    multipart: &mut Multipart,
    state: &AppState,
) -> Result<ConversionRequest, ApiError> {
    let validator = state.validator();
    let max = validator.max_file_size();

    let mut upload: Option<(Bytes, String, Option<String>)> = None;
    let mut raw_options: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, max))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            FILE_FIELD => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                // Size is enforced while streaming, so TooLarge wins over WrongType
                let document = read_capped(field, validator).await?;
                validator.validate(document.len() as u64, content_type.as_deref())?;
                let content_type = content_type.unwrap_or_default();
                upload = Some((document, content_type, file_name));
            }
            OPTIONS_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, max))?;
                raw_options = Some(text);
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (document, content_type, file_name) = match upload {
        Some(upload) if !upload.0.is_empty() => upload,
        _ => return Err(ValidationError::MissingFile.into()),
    };

    Ok(ConversionRequest {
        declared_len: document.len() as u64,
        document,
        content_type,
        file_name,
        raw_options: raw_options
            .unwrap_or_else(|| state.config().convert.default_options.clone()),
    })
}

/// Buffers a file part, failing as soon as it grows past the upload limit.
async fn read_capped(mut field: Field<'_>, validator: &UploadValidator) -> Result<Bytes, ApiError> {
    let max = validator.max_file_size();
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::from_multipart(e, max))?
    {
        validator.check_size(buffer.len() as u64 + chunk.len() as u64)?;
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

fn attachment(converted: Vec<u8>, target: TargetFormat, file_name: &str) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(file_name)
    );
    let disposition = HeaderValue::from_str(&disposition).unwrap_or_else(|_| {
        HeaderValue::from_static("attachment")
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(target.mime_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        converted,
    )
        .into_response()
}

/// Replaces characters that cannot appear inside a quoted header parameter.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
