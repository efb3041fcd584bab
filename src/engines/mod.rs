//! Voice-cloning engines.
//!
//! This module contains implementations of [`crate::VoiceCloningEngine`].
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `coqui` - Coqui XTTS v2 through the `tts` command line tool (Python package `TTS` required)

#[cfg(feature = "coqui")]
pub mod coqui;
