//! # voice-clone-rs
//!
//! A web front-end for multilingual voice cloning. A reference recording is
//! uploaded, analysed and preprocessed; a pretrained voice-cloning model then
//! speaks arbitrary text in that voice.
//!
//! ## Features
//!
//! - **Reference preprocessing**: decoding, resampling, pre-emphasis,
//!   normalisation, silence trimming and tiling to a minimum duration
//! - **Voice analysis**: pitch, spectral centroid/rolloff and MFCC summaries
//! - **Pluggable engines**: the model sits behind [`VoiceCloningEngine`]
//! - **File lifecycle**: collision-free uploads and time-based retention
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! voice-clone-rs = { version = "2026.10", features = ["coqui"] }
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use voice_clone_rs::{cloner::VoiceCloner, engines::coqui::CoquiEngine, Device};
//!
//! let cloner = VoiceCloner::new(Box::new(CoquiEngine::new()), Device::best_available());
//! assert!(cloner.initialize());
//! cloner.clone_voice("안녕하세요", Path::new("reference.wav"), Path::new("out.wav"), "ko")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod cloner;
pub mod config;
pub mod engines;
pub mod features;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::str::FromStr;

/// Error type crossing the engine boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Compute device a model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    Cuda,
    #[default]
    Cpu,
}

impl Device {
    /// CUDA when an NVIDIA driver answers, otherwise CPU.
    pub fn best_available() -> Self {
        let has_gpu = Command::new("nvidia-smi")
            .arg("-L")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if has_gpu {
            Device::Cuda
        } else {
            Device::Cpu
        }
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self, Device::Cuda)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// Which device to use, as requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DevicePreference {
    pub fn resolve(self) -> Device {
        match self {
            DevicePreference::Auto => Device::best_available(),
            DevicePreference::Cuda => Device::Cuda,
            DevicePreference::Cpu => Device::Cpu,
        }
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!("unknown device '{other}', expected auto, cuda or cpu")),
        }
    }
}

/// Common interface for voice-cloning synthesis engines.
///
/// An engine turns text plus a reference recording into speech in the
/// reference speaker's voice. The model behind it is opaque to this crate.
pub trait VoiceCloningEngine: Send {
    /// Load (or reload) the model bound to `device`.
    fn load_model(&mut self, device: Device) -> Result<(), BoxError>;

    /// Release the loaded model.
    fn unload_model(&mut self);

    /// Whether a model is currently loaded. Consulted after `load_model`
    /// and before every synthesis.
    fn is_loaded(&self) -> bool;

    /// Speak `text` in the voice of `speaker_wav` and write a WAV file to `output`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        speaker_wav: &Path,
        language: &str,
        output: &Path,
    ) -> Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use super::{Device, DevicePreference};

    #[test]
    fn parses_device_preferences() {
        assert_eq!("auto".parse(), Ok(DevicePreference::Auto));
        assert_eq!("GPU".parse(), Ok(DevicePreference::Cuda));
        assert_eq!(" cpu ".parse(), Ok(DevicePreference::Cpu));
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn explicit_preferences_resolve_without_probing() {
        assert_eq!(DevicePreference::Cpu.resolve(), Device::Cpu);
        assert_eq!(DevicePreference::Cuda.resolve(), Device::Cuda);
        assert!(Device::Cuda.is_accelerated());
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }
}
