use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::Device;

#[derive(thiserror::Error, Debug)]
pub enum CoquiError {
    #[error("Coqui `tts` binary not found at '{}'. Install it with `pip install TTS`.", .0.display())]
    BinaryNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("`tts` exited with code {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Synthesis finished but no audio was written to {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("Unsupported language '{0}'")]
    UnsupportedLanguage(String),
}

/// Arguments asking the CLI to describe `model_name`, which fails for unknown models.
pub fn model_info_args(model_name: &str) -> Vec<OsString> {
    vec!["--model_info_by_name".into(), model_name.into()]
}

/// Arguments for one voice-cloning synthesis run.
pub fn synthesis_args(
    model_name: &str,
    text: &str,
    speaker_wav: &Path,
    language: &str,
    output: &Path,
    device: Device,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--text".into(),
        text.into(),
        "--model_name".into(),
        model_name.into(),
        "--speaker_wav".into(),
        speaker_wav.into(),
        "--language_idx".into(),
        language.into(),
        "--out_path".into(),
        output.into(),
    ];
    if device.is_accelerated() {
        args.push("--use_cuda".into());
        args.push("true".into());
    }
    args
}

/// Run the `tts` binary to completion, failing on a non-zero exit status.
pub fn run_tts<I, S>(bin: &Path, args: I) -> Result<Output, CoquiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(bin)
        .args(args)
        .env("COQUI_TOS_AGREED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoquiError::BinaryNotFound(bin.to_path_buf())
            } else {
                CoquiError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoquiError::CommandFailed {
            code: output.status.code(),
            stderr: last_lines(&stderr, 5),
        });
    }

    Ok(output)
}

/// Python tracebacks are long; the tail carries the actual exception.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
