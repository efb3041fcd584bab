use std::path::{Path, PathBuf};

use crate::{BoxError, Device, VoiceCloningEngine};

use super::cli::{model_info_args, run_tts, synthesis_args, CoquiError};

/// Registry name of the multilingual XTTS v2 checkpoint.
pub const DEFAULT_MODEL_NAME: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

/// Language codes XTTS v2 was trained on.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "ja", "hu",
    "ko", "hi",
];

/// Parameters for locating the Coqui CLI and choosing a model.
#[derive(Debug, Clone)]
pub struct CoquiModelParams {
    /// Path to the `tts` binary. `None` resolves `tts` from PATH.
    pub bin_path: Option<PathBuf>,
    /// Coqui model registry name.
    pub model_name: String,
}

impl Default for CoquiModelParams {
    fn default() -> Self {
        Self {
            bin_path: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
        }
    }
}

impl CoquiModelParams {
    fn bin(&self) -> PathBuf {
        self.bin_path.clone().unwrap_or_else(|| PathBuf::from("tts"))
    }
}

/// Coqui XTTS v2 engine.
///
/// Loading checks that the CLI runs and knows the model; the weights are
/// read by each `tts` process, so every synthesis is self-contained.
///
/// ```rust,no_run
/// use voice_clone_rs::engines::coqui::{CoquiEngine, CoquiModelParams};
/// use std::path::PathBuf;
///
/// let engine = CoquiEngine::with_params(CoquiModelParams {
///     bin_path: Some(PathBuf::from("/opt/venv/bin/tts")),
///     ..Default::default()
/// });
/// ```
pub struct CoquiEngine {
    params: CoquiModelParams,
    device: Option<Device>,
}

impl Default for CoquiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CoquiEngine {
    /// Create an engine that uses `tts` from PATH and the XTTS v2 model.
    pub fn new() -> Self {
        Self::with_params(CoquiModelParams::default())
    }

    pub fn with_params(params: CoquiModelParams) -> Self {
        Self {
            params,
            device: None,
        }
    }

    pub fn params(&self) -> &CoquiModelParams {
        &self.params
    }

    /// Device the model was loaded for, if loaded.
    pub fn device(&self) -> Option<Device> {
        self.device
    }
}

fn check_language(language: &str) -> Result<(), CoquiError> {
    if SUPPORTED_LANGUAGES.contains(&language) {
        Ok(())
    } else {
        Err(CoquiError::UnsupportedLanguage(language.to_string()))
    }
}

impl VoiceCloningEngine for CoquiEngine {
    fn load_model(&mut self, device: Device) -> Result<(), BoxError> {
        self.device = None;
        let bin = self.params.bin();
        log::info!(
            "Loading Coqui model {} via {} on {}",
            self.params.model_name,
            bin.display(),
            device
        );

        run_tts(&bin, model_info_args(&self.params.model_name))?;
        self.device = Some(device);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.device = None;
    }

    fn is_loaded(&self) -> bool {
        self.device.is_some()
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        speaker_wav: &Path,
        language: &str,
        output: &Path,
    ) -> Result<(), BoxError> {
        let device = self.device.ok_or(CoquiError::ModelNotLoaded)?;
        check_language(language)?;

        let args = synthesis_args(
            &self.params.model_name,
            text,
            speaker_wav,
            language,
            output,
            device,
        );
        run_tts(&self.params.bin(), args)?;

        if !output.exists() {
            return Err(CoquiError::MissingOutput(output.to_path_buf()).into());
        }
        Ok(())
    }
}
