//! Upload and output file bookkeeping.
//!
//! Every stored file gets a random identifier in its name, so concurrent
//! requests never collide and nothing is ever overwritten. Files are
//! write-once; their modification time is treated as their creation time
//! when retention is enforced.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

/// Extensions accepted for reference uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "m4a"];

/// Default upload size cap (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file format. (only wav, mp3, flac, m4a are supported)")]
    UnsupportedExtension,
    #[error("File is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
    #[error("Invalid file name '{0}'")]
    InvalidName(String),
    #[error("File not found: {0}")]
    NotFound(String),
}

/// A file owned by the store: an upload or a synthesized result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Unique name inside its directory; this is the asset's identity.
    pub filename: String,
    pub path: PathBuf,
    pub created_at: SystemTime,
}

/// How long files survive in each directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub uploads: Duration,
    pub outputs: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            uploads: Duration::from_secs(3600),
            outputs: Duration::from_secs(24 * 3600),
        }
    }
}

/// Outcome of purging one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Outcome of purging both directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub uploads: PurgeReport,
    pub outputs: PurgeReport,
}

/// True when `filename` ends in `.wav`, `.mp3`, `.flac` or `.m4a` (any case).
pub fn validate_extension(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, characters outside
/// `[A-Za-z0-9._-]` are removed and leading/trailing dots or underscores are
/// stripped. An allow-listed extension is always kept, in lowercase, even
/// when nothing of the stem survives.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if validate_extension(base) => (stem, Some(ext.to_ascii_lowercase())),
        _ => (base, None),
    };

    let cleaned: String = stem
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    let stem = if cleaned.is_empty() { "audio" } else { cleaned };

    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Names handed back by clients must be plain file names inside a store directory.
fn check_plain_name(name: &str) -> Result<(), StorageError> {
    let plain = !name.is_empty()
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        && name != "."
        && name != "..";
    if plain {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// File-system store for uploads and synthesized outputs.
#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
    max_upload_bytes: usize,
}

impl FileStore {
    /// Open a store over the two directories, creating them if needed.
    pub fn new(uploads_dir: impl Into<PathBuf>, outputs_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self {
            uploads_dir: uploads_dir.into(),
            outputs_dir: outputs_dir.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        };
        fs::create_dir_all(&store.uploads_dir)?;
        fs::create_dir_all(&store.outputs_dir)?;
        Ok(store)
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Persist an uploaded reference clip under a fresh unique name.
    pub fn store_upload(&self, raw_filename: &str, content: &[u8]) -> Result<StoredAsset, StorageError> {
        if !validate_extension(raw_filename) {
            return Err(StorageError::UnsupportedExtension);
        }
        if content.len() > self.max_upload_bytes {
            return Err(StorageError::TooLarge {
                size: content.len(),
                limit: self.max_upload_bytes,
            });
        }

        let filename = format!("{}_{}", Uuid::new_v4(), sanitize_filename(raw_filename));
        let path = self.uploads_dir.join(&filename);

        write_new_file(&path, |file| {
            file.write_all(content)?;
            file.sync_all()
        })?;

        log::info!("Stored upload {} ({} bytes)", filename, content.len());
        Ok(StoredAsset {
            filename,
            created_at: SystemTime::now(),
            path,
        })
    }

    /// Path of an existing upload.
    pub fn upload_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        Self::existing(&self.uploads_dir, filename)
    }

    /// Path of an existing synthesized output.
    pub fn output_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        Self::existing(&self.outputs_dir, filename)
    }

    fn existing(dir: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        check_plain_name(filename)?;
        let path = dir.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StorageError::NotFound(filename.to_string()))
        }
    }

    /// Reserve a unique name for a synthesis result. The file itself is
    /// written by the engine.
    pub fn new_output(&self) -> StoredAsset {
        let filename = format!("synthesized_{}.wav", Uuid::new_v4());
        StoredAsset {
            path: self.outputs_dir.join(&filename),
            filename,
            created_at: SystemTime::now(),
        }
    }

    /// Delete an upload, e.g. after it failed analysis.
    pub fn remove_upload(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.upload_path(filename)?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Apply `policy` to both directories.
    pub fn purge_expired(&self, policy: &RetentionPolicy) -> Result<PurgeSummary, StorageError> {
        Ok(PurgeSummary {
            uploads: purge_older_than(&self.uploads_dir, policy.uploads)?,
            outputs: purge_older_than(&self.outputs_dir, policy.outputs)?,
        })
    }
}

/// Create `path` exclusively and fill it with `fill`. A partly written file
/// is removed before the error is returned.
fn write_new_file<F>(path: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut fs::File) -> std::io::Result<()>,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(rm) = fs::remove_file(path) {
            log::warn!("Could not remove incomplete file {}: {rm}", path.display());
        }
        return Err(e);
    }
    Ok(())
}

/// Remove every regular file in `dir` older than `retention`.
///
/// Only direct entries are considered. A file that cannot be removed is
/// logged and recorded in [`PurgeReport::failed`]; the scan carries on.
pub fn purge_older_than(dir: &Path, retention: Duration) -> std::io::Result<PurgeReport> {
    purge_with(dir, retention, SystemTime::now(), |path| fs::remove_file(path))
}

fn purge_with<F>(
    dir: &Path,
    retention: Duration,
    now: SystemTime,
    mut remove: F,
) -> std::io::Result<PurgeReport>
where
    F: FnMut(&Path) -> std::io::Result<()>,
{
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut report = PurgeReport::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let written = match entry.metadata() {
            Ok(meta) if meta.is_file() => match meta.modified() {
                Ok(time) => time,
                Err(e) => {
                    log::warn!("No timestamp for {name}: {e}");
                    continue;
                }
            },
            Ok(_) => continue,
            Err(e) => {
                log::warn!("Cannot stat {name}: {e}");
                continue;
            }
        };

        if written >= cutoff {
            continue;
        }

        match remove(&path) {
            Ok(()) => {
                log::info!("Deleted expired file: {name}");
                report.removed.push(name);
            }
            Err(e) => {
                log::warn!("Failed to delete {name}: {e}");
                report.failed.push(name);
            }
        }
    }

    Ok(report)
}
