#![cfg(feature = "server")]

use std::path::Path;
use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use voice_clone_rs::audio::save_wav;
use voice_clone_rs::cloner::VoiceCloner;
use voice_clone_rs::server::{router, AppState};
use voice_clone_rs::storage::{FileStore, RetentionPolicy};
use voice_clone_rs::{BoxError, Device, VoiceCloningEngine};

/// Writes a short tone instead of running a real model.
#[derive(Default)]
struct ToneEngine {
    loaded: bool,
    fail_load: bool,
    /// Write part of the output, then fail.
    break_mid_write: bool,
}

impl VoiceCloningEngine for ToneEngine {
    fn load_model(&mut self, _device: Device) -> Result<(), BoxError> {
        if self.fail_load {
            return Err("no weights".into());
        }
        self.loaded = true;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn synthesize_to_file(
        &mut self,
        _text: &str,
        speaker_wav: &Path,
        _language: &str,
        output: &Path,
    ) -> Result<(), BoxError> {
        assert!(speaker_wav.exists());
        if self.break_mid_write {
            std::fs::write(output, b"RIFF")?;
            return Err("synthesis interrupted".into());
        }
        let samples: Vec<f32> = (0..22050)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 330.0 / 22050.0).sin() * 0.3)
            .collect();
        save_wav(output, &samples, 22050)?;
        Ok(())
    }
}

struct Harness {
    _root: TempDir,
    uploads: std::path::PathBuf,
    outputs: std::path::PathBuf,
    app: Router,
}

fn harness_with(engine: ToneEngine, max_upload_bytes: usize) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    let outputs = root.path().join("outputs");
    let temp = root.path().join("tmp");
    std::fs::create_dir_all(&temp).unwrap();

    let store = FileStore::new(&uploads, &outputs)
        .unwrap()
        .with_max_upload_bytes(max_upload_bytes);
    let cloner = VoiceCloner::new(Box::new(engine), Device::Cpu).with_temp_dir(&temp);
    let state = AppState::new(cloner, store).with_retention(RetentionPolicy::default());

    Harness {
        _root: root,
        uploads,
        outputs,
        app: router(state),
    }
}

fn harness() -> Harness {
    harness_with(ToneEngine::default(), 50 * 1024 * 1024)
}

fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    save_wav(&path, samples, sample_rate).unwrap();
    std::fs::read(path).unwrap()
}

fn voice_like_wav() -> Vec<u8> {
    let sr = 22050;
    let samples: Vec<f32> = (0..sr)
        .map(|i| {
            let t = i as f32 / sr as f32;
            0.4 * (2.0 * std::f32::consts::PI * 180.0 * t).sin()
                + 0.1 * (2.0 * std::f32::consts::PI * 360.0 * t).sin()
        })
        .collect();
    wav_bytes(&samples, sr as u32)
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "voicecloneboundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn upload_voice(h: &Harness) -> String {
    let (status, body) = send(&h.app, multipart_request("audio", "voice.wav", &voice_like_wav())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["filename"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn initialize_reports_success() {
    let h = harness();
    let (status, body) = send(&h.app, empty_post("/initialize")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn initialize_failure_is_500() {
    let h = harness_with(
        ToneEngine {
            fail_load: true,
            ..Default::default()
        },
        1024 * 1024,
    );
    let (status, body) = send(&h.app, empty_post("/initialize")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn upload_returns_features() {
    let h = harness();
    let (status, body) = send(&h.app, multipart_request("audio", "my voice.wav", &voice_like_wav())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with("_my_voice.wav"), "{filename}");
    assert!(h.uploads.join(filename).is_file());

    let features = &body["features"];
    assert_eq!(features["mfcc_mean"].as_array().unwrap().len(), 20);
    assert_eq!(features["sample_rate"], json!(22050));
    // Short clips are tiled up to the three second minimum before analysis.
    let duration = features["duration"].as_f64().unwrap();
    assert!((duration - 3.0).abs() < 0.01, "{duration}");
    let f0 = features["fundamental_frequency"].as_f64().unwrap();
    assert!(f0 > 150.0 && f0 < 210.0, "{f0}");
}

#[tokio::test]
async fn upload_without_audio_field_is_400() {
    let h = harness();
    let (status, body) = send(&h.app, multipart_request("file", "voice.wav", &voice_like_wav())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn upload_with_empty_filename_is_400() {
    let h = harness();
    let (status, _) = send(&h.app, multipart_request("audio", "", b"data")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_unsupported_extension_is_400() {
    let h = harness();
    let (status, body) = send(&h.app, multipart_request("audio", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(std::fs::read_dir(&h.uploads).unwrap().count(), 0);
}

#[tokio::test]
async fn silent_upload_fails_analysis_and_is_removed() {
    let h = harness();
    let silence = wav_bytes(&vec![0.0; 22050], 22050);
    let (status, body) = send(&h.app, multipart_request("audio", "quiet.wav", &silence)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(std::fs::read_dir(&h.uploads).unwrap().count(), 0);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let h = harness_with(ToneEngine::default(), 1024);
    let (status, body) = send(&h.app, multipart_request("audio", "big.wav", &vec![0u8; 8 * 1024])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn synthesize_writes_downloadable_output() {
    let h = harness();
    send(&h.app, empty_post("/initialize")).await;
    let reference = upload_voice(&h).await;

    let (status, body) = send(
        &h.app,
        json_request(
            "/synthesize",
            json!({"text": "  안녕하세요  ", "reference_filename": reference, "language": "ko"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));

    let output = body["output_filename"].as_str().unwrap().to_string();
    assert!(output.starts_with("synthesized_") && output.ends_with(".wav"));
    assert!(h.outputs.join(&output).is_file());

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/download/{output}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&output));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..4], b"RIFF");
}

#[tokio::test]
async fn synthesize_uses_default_language_when_omitted() {
    let h = harness();
    send(&h.app, empty_post("/initialize")).await;
    let reference = upload_voice(&h).await;

    let (status, _) = send(
        &h.app,
        json_request("/synthesize", json!({"text": "hello", "reference_filename": reference})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn failed_synthesis_leaves_no_output() {
    let h = harness_with(
        ToneEngine {
            break_mid_write: true,
            ..Default::default()
        },
        50 * 1024 * 1024,
    );
    send(&h.app, empty_post("/initialize")).await;
    let reference = upload_voice(&h).await;

    let (status, body) = send(
        &h.app,
        json_request("/synthesize", json!({"text": "hi", "reference_filename": reference})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(std::fs::read_dir(&h.outputs).unwrap().count(), 0);
}

#[tokio::test]
async fn synthesize_before_initialize_is_500() {
    let h = harness();
    let reference = upload_voice(&h).await;

    let (status, body) = send(
        &h.app,
        json_request("/synthesize", json!({"text": "hi", "reference_filename": reference})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(std::fs::read_dir(&h.outputs).unwrap().count(), 0);
}

#[tokio::test]
async fn synthesize_validates_input() {
    let h = harness();
    send(&h.app, empty_post("/initialize")).await;

    let (status, _) = send(
        &h.app,
        json_request("/synthesize", json!({"text": "   ", "reference_filename": "a.wav"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, json_request("/synthesize", json!({"text": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &h.app,
        json_request("/synthesize", json!({"text": "hi", "reference_filename": "missing.wav"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));

    let malformed = Request::builder()
        .method("POST")
        .uri("/synthesize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn download_unknown_file_is_404() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/download/synthesized_nothing.wav")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cleanup_removes_only_expired_files() {
    let h = harness();
    let stale = h.uploads.join("stale.wav");
    let fresh = h.outputs.join("synthesized_fresh.wav");
    std::fs::write(&stale, b"old").unwrap();
    std::fs::write(&fresh, b"new").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
        .unwrap();

    let (status, body) = send(&h.app, empty_post("/cleanup")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(!stale.exists());
    assert!(fresh.exists());
}
