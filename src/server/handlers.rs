use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;
use crate::cloner::discard_partial_output;
use crate::features::{extract_features, VoiceFeatures};
use crate::storage::{validate_extension, StorageError};

const NO_FILE: &str = "No file was uploaded.";
const UNSUPPORTED_FORMAT: &str = "Unsupported file format. (only wav, mp3, flac, m4a are supported)";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub features: VoiceFeatures,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reference_filename: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub success: bool,
    pub message: String,
    pub output_filename: String,
}

pub async fn initialize(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    let cloner = state.cloner.clone();
    let ready = tokio::task::spawn_blocking(move || cloner.initialize()).await?;
    if !ready {
        return Err(ApiError::Internal("Model initialization failed.".to_string()));
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Model initialized successfully.".to_string(),
    }))
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut audio: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        audio = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = audio.ok_or_else(|| ApiError::Validation(NO_FILE.to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::Validation(NO_FILE.to_string()));
    }
    if !validate_extension(&filename) {
        return Err(ApiError::Validation(UNSUPPORTED_FORMAT.to_string()));
    }

    let store = state.store.clone();
    let (stored, features) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let stored = store.store_upload(&filename, &bytes)?;
        match extract_features(&stored.path) {
            Ok(features) => Ok((stored, features)),
            Err(e) => {
                if let Err(rm) = store.remove_upload(&stored.filename) {
                    log::warn!("Could not remove rejected upload {}: {rm}", stored.filename);
                }
                Err(e.into())
            }
        }
    })
    .await??;

    log::info!(
        "Stored upload {} ({:.2}s, F0 {:.1} Hz)",
        stored.filename,
        features.duration,
        features.fundamental_frequency
    );
    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully.".to_string(),
        filename: stored.filename,
        features,
    }))
}

pub async fn synthesize(
    State(state): State<AppState>,
    request: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Json<SynthesizeResponse>, ApiError> {
    let Json(request) = request?;

    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("Please enter text.".to_string()));
    }
    let reference = request.reference_filename.trim();
    if reference.is_empty() {
        return Err(ApiError::Validation("No reference audio file.".to_string()));
    }
    let language = request
        .language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| state.default_language.clone());

    let reference_path = state.store.upload_path(reference).map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidName(_) => {
            ApiError::NotFound("Reference audio file not found.".to_string())
        }
        other => other.into(),
    })?;

    let output = state.store.new_output();
    let output_path = output.path.clone();
    let cloner = state.cloner.clone();
    let joined = tokio::task::spawn_blocking(move || {
        cloner.clone_voice(&text, &reference_path, &output_path, &language)
    })
    .await;
    if joined.is_err() {
        discard_partial_output(&output.path);
    }
    joined??;

    if !output.path.exists() {
        return Err(ApiError::Synthesis("Speech synthesis failed.".to_string()));
    }
    Ok(Json(SynthesizeResponse {
        success: true,
        message: "Speech synthesis completed.".to_string(),
        output_filename: output.filename,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .store
        .output_path(&filename)
        .map_err(|_| ApiError::NotFound("File not found.".to_string()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("Error occurred: {e}")))?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|_| ApiError::Validation(format!("Invalid file name '{filename}'")))?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type(&filename))),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

pub async fn cleanup(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.store.clone();
    let retention = state.retention;
    let summary = tokio::task::spawn_blocking(move || store.purge_expired(&retention)).await??;

    let removed = summary.uploads.removed.len() + summary.outputs.removed.len();
    let failed = summary.uploads.failed.len() + summary.outputs.failed.len();
    log::info!("Cleanup removed {removed} file(s), {failed} failure(s)");
    Ok(Json(MessageResponse {
        success: true,
        message: format!("File cleanup completed. Removed {removed} file(s)."),
    }))
}

fn content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}
