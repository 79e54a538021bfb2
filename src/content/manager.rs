// src/content/manager.rs
//! Content-file lifecycle: allocate, write, read, finalize.
//!
//! Content files carry long-form text between an assistant and a write
//! command. A file that fed a successful command is deleted; one whose
//! command failed is moved to `failed_content/` with a marker explaining
//! why, so the text is never lost.

use super::handle::{ContentFileHandle, Disposition, Outcome};
use super::paths;
use crate::constants::FAILED_CONTENT_DIR_NAME;
use crate::error::{AppError, ContentFileError};
use crate::types::ContentPurpose;
use chrono::Utc;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Manages the scratch directory for one configuration.
#[derive(Debug, Clone)]
pub struct ContentFileManager {
    content_dir: PathBuf,
    archive_dir: PathBuf,
}

impl ContentFileManager {
    /// Records the directory. Nothing is created until the first allocation.
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        let content_dir = content_dir.into();
        let archive_dir = content_dir.join(FAILED_CONTENT_DIR_NAME);
        Self {
            content_dir,
            archive_dir,
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Reserves a unique path for a new content file. The file itself is
    /// not created.
    pub fn allocate(&self, purpose: &str) -> Result<ContentFileHandle, ContentFileError> {
        ensure_dir(&self.content_dir)?;

        let purpose = ContentPurpose::new(purpose);
        let created_at = Utc::now();
        let name = paths::content_file_name(&purpose, created_at, Uuid::new_v4());
        let path = self.content_dir.join(name);

        log::debug!("Allocated content file {}", path.display());
        Ok(ContentFileHandle::new(path, purpose, created_at))
    }

    pub fn write(&self, handle: &ContentFileHandle, text: &str) -> Result<(), ContentFileError> {
        fs::write(handle.path(), text).map_err(|source| ContentFileError::Io {
            path: handle.path().to_path_buf(),
            source,
        })
    }

    pub fn read(&self, path: &Path) -> Result<String, ContentFileError> {
        fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ContentFileError::NotFound(path.to_path_buf()),
            _ => ContentFileError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    /// Whether `path` lives in the scratch directory (and so should be
    /// finalized after use).
    pub fn manages(&self, path: &Path) -> bool {
        paths::is_within(path, &self.content_dir) && !paths::is_within(path, &self.archive_dir)
    }

    /// Turns a caller-supplied path back into a handle.
    ///
    /// Only existing files inside the scratch directory (outside its archive)
    /// can be adopted.
    pub fn adopt(&self, path: &Path) -> Result<ContentFileHandle, ContentFileError> {
        if !self.manages(path) {
            return Err(ContentFileError::OutsideContentDir {
                path: path.to_path_buf(),
                dir: self.content_dir.clone(),
            });
        }

        let metadata = fs::metadata(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ContentFileError::NotFound(path.to_path_buf()),
            _ => ContentFileError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let purpose = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(paths::purpose_from_file_name)
            .unwrap_or_else(|| ContentPurpose::new(""));
        let created_at = metadata
            .modified()
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(ContentFileHandle::new(path.to_path_buf(), purpose, created_at))
    }

    /// Disposes of a content file according to how its command went.
    ///
    /// Success deletes the file. Failure moves it into the archive directory
    /// under the same basename and writes a `.failed` marker beside it.
    /// Never fails: I/O problems are logged and reflected in the returned
    /// disposition.
    pub fn finalize(&self, handle: ContentFileHandle, outcome: Outcome) -> Disposition {
        let path = handle.path();
        if !path.exists() {
            log::debug!("Content file {} already absent", path.display());
            return Disposition::AlreadyAbsent;
        }

        match outcome {
            Outcome::Success => match fs::remove_file(path) {
                Ok(()) => {
                    log::debug!("Removed content file {}", path.display());
                    Disposition::Deleted
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Disposition::AlreadyAbsent,
                Err(e) => {
                    log::warn!("Could not remove content file {}: {}", path.display(), e);
                    Disposition::Retained {
                        path: path.to_path_buf(),
                    }
                }
            },
            Outcome::Failure(reason) => self.archive(&handle, &reason),
        }
    }

    fn archive(&self, handle: &ContentFileHandle, reason: &str) -> Disposition {
        let origin = handle.path();
        if let Err(e) = ensure_dir(&self.archive_dir) {
            log::warn!("{}", e);
            return Disposition::Retained {
                path: origin.to_path_buf(),
            };
        }

        let archived = self.archive_dir.join(handle.file_name());
        if let Err(e) = move_file(origin, &archived) {
            log::warn!(
                "Could not archive content file {}: {}",
                origin.display(),
                e
            );
            return Disposition::Retained {
                path: origin.to_path_buf(),
            };
        }

        let marker = paths::marker_path(&archived);
        let note = format!(
            "failed_at: {}\nreason: {}\noriginal: {}\npurpose: {}\n",
            Utc::now().to_rfc3339(),
            reason,
            origin.display(),
            handle.purpose()
        );
        let marker = match fs::write(&marker, note) {
            Ok(()) => Some(marker),
            Err(e) => {
                log::warn!("Could not write failure marker {}: {}", marker.display(), e);
                None
            }
        };

        log::info!("Archived content file to {}", archived.display());
        Disposition::Archived {
            path: archived,
            marker,
        }
    }

    /// Reads the file, runs `op` on its text and finalizes by the result.
    ///
    /// The operation's result is returned unchanged; where the file went is
    /// logged.
    pub async fn run_with_content<T, F, Fut>(
        &self,
        handle: ContentFileHandle,
        op: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let result = match self.read(handle.path()) {
            Ok(text) => op(text).await,
            Err(e) => Err(e.into()),
        };

        let disposition = self.finalize(handle, Outcome::of(&result));
        match &disposition {
            Disposition::Archived { .. } | Disposition::Retained { .. } => {
                log::warn!("{}", disposition)
            }
            _ => log::debug!("{}", disposition),
        }
        result
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ContentFileError> {
    fs::create_dir_all(dir).map_err(|source| ContentFileError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        source,
    })
}

/// Renames, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
