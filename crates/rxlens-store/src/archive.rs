//! Result File Archive: one JSON file per accepted extraction.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use rxlens_core::{Error, Result, SavedResult, StoragePayload};

use crate::confine::{confine, resolve_existing};

pub const ARCHIVE_EXTENSION: &str = ".json";

/// Upper bound on `_N` suffixes tried for one base name.
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Build the archive file name for a result saved at `at`.
///
/// `prescription_<doctor>_<YYYY-MM-DDTHH-MM-SS>.json`, with runs of
/// whitespace and path separators in the doctor name turned into `_`.
pub fn archive_filename(doctor_name: Option<&str>, at: DateTime<Utc>) -> String {
    format!(
        "prescription_{}_{}{}",
        doctor_slug(doctor_name),
        at.format("%Y-%m-%dT%H-%M-%S"),
        ARCHIVE_EXTENSION
    )
}

fn doctor_slug(doctor_name: Option<&str>) -> String {
    let slug = doctor_name
        .unwrap_or("")
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() || slug.chars().all(|c| c == '.') {
        "unknown".into()
    } else {
        slug
    }
}

/// Insert `_N` before the extension of `filename`.
fn with_suffix(filename: &str, n: u32) -> String {
    let stem = filename.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(filename);
    format!("{}_{}{}", stem, n, ARCHIVE_EXTENSION)
}

/// Write `contents` to a freshly created `path`, removing it again on failure
/// so no truncated file keeps the name.
fn write_or_remove(file: &mut impl Write, path: &Path, contents: &[u8]) -> Result<()> {
    let Err(e) = file.write_all(contents).and_then(|()| file.flush()) else {
        return Ok(());
    };
    if let Err(rm) = std::fs::remove_file(path) {
        warn!("Failed to remove partial {}: {}", path.display(), rm);
    }
    Err(Error::StoreIo(format!("Failed to write {}: {}", path.display(), e)))
}

/// Directory of individually saved extraction results.
#[derive(Debug, Clone)]
pub struct ResultArchive {
    dir: PathBuf,
}

impl ResultArchive {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the results directory if absent. Idempotent.
    pub fn ensure_directory(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::StoreIo(format!("Failed to create {}: {}", self.dir.display(), e))
        })
    }

    /// Save `payload` under a name derived from its doctor and the current time.
    pub fn save(&self, payload: &StoragePayload) -> Result<SavedResult> {
        self.save_at(payload, Utc::now())
    }

    /// Save `payload` as of `at`. An existing file with the same computed name
    /// is never overwritten; a numeric suffix is added instead.
    pub fn save_at(&self, payload: &StoragePayload, at: DateTime<Utc>) -> Result<SavedResult> {
        self.ensure_directory()?;

        let base = archive_filename(payload.doctor_name(), at);
        let contents = serde_json::to_vec_pretty(payload.as_object())?;

        for n in 1..=MAX_COLLISION_SUFFIX {
            let filename = if n == 1 { base.clone() } else { with_suffix(&base, n) };
            let path = self.dir.join(&filename);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("Archive name {} taken, trying next suffix", filename);
                    continue;
                }
                Err(e) => {
                    return Err(Error::StoreIo(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )))
                }
            };

            write_or_remove(&mut file, &path, &contents)?;

            info!("Archived result as {}", filename);
            return Ok(SavedResult {
                filename,
                filepath: path.to_string_lossy().to_string(),
            });
        }

        warn!("Exhausted collision suffixes for {}", base);
        Err(Error::StoreIo(format!("Too many archived results named {}", base)))
    }

    /// Archived file names, sorted. Empty when the directory does not exist.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::StoreIo(format!(
                    "Failed to read {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(ARCHIVE_EXTENSION))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Path of an archived file, confined to the results directory.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let candidate = confine(&self.dir, filename)?;
        resolve_existing(&self.dir, &candidate)
    }

    /// Contents of an archived file.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.resolve(filename)?;
        std::fs::read(&path)
            .map_err(|e| Error::StoreIo(format!("Failed to read {}: {}", path.display(), e)))
    }
}
