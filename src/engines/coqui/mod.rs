//! Coqui XTTS v2 voice-cloning engine.
//!
//! This module drives the pretrained multilingual XTTS v2 model through the
//! `tts` command line tool shipped with the Coqui `TTS` Python package. Each
//! synthesis request runs one `tts` process that reads the reference clip
//! and writes a WAV file.
//!
//! # System Requirements
//!
//! The `tts` binary must be installed and on PATH (or configured explicitly):
//! - `pip install TTS`
//!
//! The XTTS licence prompt is answered non-interactively by setting
//! `COQUI_TOS_AGREED=1` for every invocation.
//!
//! # Language Support
//!
//! XTTS v2 accepts these language codes: `en`, `es`, `fr`, `de`, `it`, `pt`,
//! `pl`, `tr`, `ru`, `nl`, `cs`, `ar`, `zh-cn`, `ja`, `hu`, `ko`, `hi`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use voice_clone_rs::{engines::coqui::CoquiEngine, Device, VoiceCloningEngine};
//!
//! let mut engine = CoquiEngine::new();
//! engine.load_model(Device::Cpu)?;
//! engine.synthesize_to_file("Hello!", Path::new("ref.wav"), "en", Path::new("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! ```

pub mod cli;
pub mod engine;

pub use cli::CoquiError;
pub use engine::{CoquiEngine, CoquiModelParams, DEFAULT_MODEL_NAME, SUPPORTED_LANGUAGES};
