//! Voice cloning facade.
//!
//! [`VoiceCloner`] owns one engine behind a mutex and tracks whether its
//! model is usable. Initialisation and synthesis are serialised: at most one
//! of them runs at a time.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::audio::{preprocess, AudioError, TARGET_SAMPLE_RATE};
use crate::{BoxError, Device, VoiceCloningEngine};

/// Lifecycle of the model held by a [`VoiceCloner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Ready,
    FailedToLoad,
}

#[derive(thiserror::Error, Debug)]
pub enum CloneError {
    #[error("TTS model is not initialized. Call initialize() first.")]
    ModelNotInitialized,
    #[error("Voice cloning failed: {0}")]
    Synthesis(#[source] BoxError),
}

impl CloneError {
    fn synthesis(err: impl Into<BoxError>) -> Self {
        CloneError::Synthesis(err.into())
    }

    /// The preprocessing error behind a synthesis failure, if that is what failed.
    pub fn audio_error(&self) -> Option<&AudioError> {
        match self {
            CloneError::Synthesis(source) => source.downcast_ref::<AudioError>(),
            CloneError::ModelNotInitialized => None,
        }
    }
}

struct Slot {
    engine: Box<dyn VoiceCloningEngine>,
    state: ModelState,
}

/// Process-wide handle to the voice-cloning model.
pub struct VoiceCloner {
    slot: Mutex<Slot>,
    device: Device,
    temp_dir: PathBuf,
}

impl VoiceCloner {
    /// Wrap `engine`; the model is not loaded until [`initialize`](Self::initialize).
    pub fn new(engine: Box<dyn VoiceCloningEngine>, device: Device) -> Self {
        Self {
            slot: Mutex::new(Slot {
                engine,
                state: ModelState::Uninitialized,
            }),
            device,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the preprocessed reference copies handed to the engine.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn state(&self) -> ModelState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panic inside an engine must not wedge every later request.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the model on the configured device.
    ///
    /// Calling this while Ready unloads and reloads the model. Returns whether
    /// the model ended up Ready.
    pub fn initialize(&self) -> bool {
        let mut slot = self.lock();
        if slot.state == ModelState::Ready {
            log::info!("Reinitializing TTS model");
            slot.engine.unload_model();
        }

        log::info!("Using device: {}", self.device);
        let loaded = slot.engine.load_model(self.device).and_then(|()| {
            if slot.engine.is_loaded() {
                Ok(())
            } else {
                Err("engine finished loading but reports no model".into())
            }
        });
        match loaded {
            Ok(()) => {
                slot.state = ModelState::Ready;
                log::info!("TTS model loaded successfully");
                true
            }
            Err(e) => {
                slot.state = ModelState::FailedToLoad;
                log::warn!("Failed to load TTS model: {e}");
                false
            }
        }
    }

    /// Speak `text` in the voice of the recording at `reference_path`,
    /// writing the result to `output_path`.
    ///
    /// The reference is preprocessed into a temporary WAV that is removed
    /// before this returns, whatever the outcome.
    pub fn clone_voice(
        &self,
        text: &str,
        reference_path: &Path,
        output_path: &Path,
        language: &str,
    ) -> Result<(), CloneError> {
        if self.state() != ModelState::Ready {
            return Err(CloneError::ModelNotInitialized);
        }

        let reference = preprocess(reference_path, TARGET_SAMPLE_RATE).map_err(CloneError::synthesis)?;

        let temp = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(".wav")
            .tempfile_in(&self.temp_dir)
            .map_err(CloneError::synthesis)?;
        reference.save(temp.path()).map_err(CloneError::synthesis)?;

        let mut slot = self.lock();
        if slot.state != ModelState::Ready || !slot.engine.is_loaded() {
            return Err(CloneError::ModelNotInitialized);
        }

        log::info!(
            "Synthesizing {} chars in '{}' with reference {}",
            text.chars().count(),
            language,
            reference_path.display()
        );
        let synthesized = slot
            .engine
            .synthesize_to_file(text, temp.path(), language, output_path)
            .map_err(CloneError::Synthesis);
        drop(slot);

        let result = synthesized
            .and_then(|()| {
                if output_path.exists() {
                    Ok(())
                } else {
                    Err(CloneError::synthesis(format!(
                        "engine reported success but {} was not written",
                        output_path.display()
                    )))
                }
            })
            .and_then(|()| temp.close().map_err(CloneError::synthesis));

        if result.is_err() {
            discard_partial_output(output_path);
        }
        result
    }
}

/// A failed synthesis must not leave a truncated file behind.
pub(crate) fn discard_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::warn!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial output {}: {e}", path.display()),
    }
}
