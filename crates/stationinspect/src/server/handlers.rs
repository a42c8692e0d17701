//! Request handlers.

use std::collections::BTreeMap;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{with_service, ApiError, AppState};
use crate::assembler::GenerationOptions;
use crate::error::Error;
use crate::model::ChannelInput;
use crate::service::{ErpRequest, ImageUpload, UploadError};
use crate::validation::ReportDraft;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

type HandlerResult = Result<HttpResponse, ApiError>;

pub(super) async fn calculate_erp(
    state: web::Data<AppState>,
    body: web::Json<ErpRequest>,
) -> HandlerResult {
    let request = body.into_inner();
    let summary = with_service(state, move |service| service.calculate_erp(&request)).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkCalculateRequest {
    report_id: Option<i64>,
    #[serde(default)]
    channels: Vec<ChannelInput>,
}

pub(super) async fn bulk_calculate(
    state: web::Data<AppState>,
    body: web::Json<BulkCalculateRequest>,
) -> HandlerResult {
    let BulkCalculateRequest {
        report_id,
        channels,
    } = body.into_inner();
    let report_id = report_id.ok_or_else(|| Error::invalid_input("report_id is required"))?;
    let result =
        with_service(state, move |service| service.bulk_calculate(report_id, &channels)).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub(super) async fn create_from_inspection(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> HandlerResult {
    let inspection_id = path.into_inner();
    let creation = with_service(state, move |service| {
        service.create_report_from_inspection(inspection_id)
    })
    .await?;

    let mut response = if creation.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(creation))
}

pub(super) async fn validate_report(
    state: web::Data<AppState>,
    body: web::Json<ReportDraft>,
) -> HandlerResult {
    let draft = body.into_inner();
    let validation = with_service(state, move |service| service.validate_report(&draft)).await?;
    Ok(HttpResponse::Ok().json(validation))
}

pub(super) async fn analyze_violations(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> HandlerResult {
    let report_id = path.into_inner();
    let summary =
        with_service(state, move |service| service.analyze_violations(report_id)).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Debug, Serialize)]
struct GenerationInfo {
    formats_generated: Vec<String>,
    include_images: bool,
    total_images: usize,
    generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct GenerationResponse {
    success: bool,
    message: &'static str,
    report_id: i64,
    reference_number: String,
    file_name: String,
    size_bytes: usize,
    generation_info: GenerationInfo,
}

pub(super) async fn generate_documents(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: Option<web::Json<GenerationOptions>>,
) -> HandlerResult {
    let report_id = path.into_inner();
    let options = body.map(web::Json::into_inner).unwrap_or_default();
    let include_images = options.include_images;

    let generated = with_service(state, move |service| {
        service.generate_documents(report_id, &options)
    })
    .await?;

    Ok(HttpResponse::Ok().json(GenerationResponse {
        success: true,
        message: "Report document generated",
        report_id,
        file_name: generated.report.document_file_name(),
        reference_number: generated.report.reference_number,
        size_bytes: generated.size_bytes,
        generation_info: GenerationInfo {
            formats_generated: generated.formats,
            include_images,
            total_images: generated.total_images,
            generated_at: generated.report.date_completed,
        },
    }))
}

pub(super) async fn download_docx(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> HandlerResult {
    let report_id = path.into_inner();
    let (bytes, file_name) = with_service(state, move |service| {
        let (path, file_name) = service.document(report_id)?;
        Ok((std::fs::read(path)?, file_name))
    })
    .await?;

    Ok(HttpResponse::Ok()
        .content_type(DOCX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(bytes))
}

pub(super) async fn image_requirements(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> HandlerResult {
    let report_id = path.into_inner();
    let requirements =
        with_service(state, move |service| service.image_requirements(report_id)).await?;
    Ok(HttpResponse::Ok().json(requirements))
}

/// Largest accepted text field of a multipart upload, in bytes.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// A file part of a multipart upload.
struct FilePart {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
    /// Set when the part was larger than the limit; `bytes` is then empty.
    oversized: bool,
}

/// Collect the form as text fields and file parts keyed by field name.
///
/// File parts over `max_file_bytes` are drained without being kept and
/// come back marked as oversized.
async fn read_multipart(
    mut payload: Multipart,
    max_file_bytes: u64,
) -> Result<(BTreeMap<String, String>, Vec<(String, FilePart)>), Error> {
    let max_file_bytes = usize::try_from(max_file_bytes).unwrap_or(usize::MAX);
    let mut fields = BTreeMap::new();
    let mut files = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| Error::invalid_input(format!("malformed upload: {e}")))?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let limit = if file_name.is_some() {
            max_file_bytes
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut bytes = Vec::new();
        let mut oversized = false;
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| Error::invalid_input(format!("malformed upload: {e}")))?;
            if oversized {
                continue;
            }
            if bytes.len() + chunk.len() > limit {
                oversized = true;
                bytes = Vec::new();
            } else {
                bytes.extend_from_slice(&chunk);
            }
        }

        match file_name {
            Some(file_name) => files.push((
                name,
                FilePart {
                    file_name,
                    content_type,
                    bytes,
                    oversized,
                },
            )),
            None if oversized => {
                return Err(Error::invalid_input(format!(
                    "field {name} exceeds {MAX_TEXT_FIELD_BYTES} bytes"
                )));
            }
            None => {
                fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    Ok((fields, files))
}

pub(super) async fn bulk_upload(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let max_file_bytes = state.service().config().uploads.max_file_bytes;
    let (fields, files) = read_multipart(payload, max_file_bytes).await?;
    let report_id = fields
        .get("report_id")
        .ok_or_else(|| Error::invalid_input("report_id is required"))?
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::invalid_input("report_id must be an integer"))?;
    debug!(report_id, files = files.len(), "Received image upload");

    let (files, oversized): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|(_, part)| !part.oversized);
    let rejected: Vec<UploadError> = oversized
        .into_iter()
        .map(|(_, part)| {
            warn!(report_id, file = %part.file_name, "Rejected oversized upload");
            UploadError {
                filename: part.file_name,
                error: format!("file exceeds the limit of {max_file_bytes} bytes"),
            }
        })
        .collect();

    let uploads: Vec<ImageUpload> = files
        .into_iter()
        .map(|(key, part)| ImageUpload {
            category: fields.get(&format!("{key}_type")).cloned(),
            caption: fields.get(&format!("{key}_caption")).cloned(),
            position: fields.get(&format!("{key}_position")).cloned(),
            file_name: part.file_name,
            content_type: part.content_type,
            bytes: part.bytes,
        })
        .collect();

    let mut result =
        with_service(state, move |service| service.upload_images(report_id, uploads)).await?;
    result.errors.extend(rejected);
    result.total_errors = result.errors.len();
    Ok(HttpResponse::Ok().json(result))
}
