// src/content/handle.rs
//! Handles for allocated content files and how they ended up.

use crate::types::ContentPurpose;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// An allocated content file.
///
/// Not `Clone`: a handle is owned by one command at a time and is consumed
/// by `ContentFileManager::finalize`.
#[derive(Debug, PartialEq, Eq)]
pub struct ContentFileHandle {
    path: PathBuf,
    purpose: ContentPurpose,
    created_at: DateTime<Utc>,
}

impl ContentFileHandle {
    pub(super) fn new(path: PathBuf, purpose: ContentPurpose, created_at: DateTime<Utc>) -> Self {
        Self {
            path,
            purpose,
            created_at,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn purpose(&self) -> &ContentPurpose {
        &self.purpose
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The file's basename, preserved when archived.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// How the command that used a content file went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    /// Maps a command result to an outcome.
    pub fn of<T, E: fmt::Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::Failure(e.to_string()),
        }
    }
}

/// Where a finalized content file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Deleted,
    /// The file was already gone; nothing to do.
    AlreadyAbsent,
    Archived { path: PathBuf, marker: Option<PathBuf> },
    /// Archiving failed; the file is still at its original location.
    Retained { path: PathBuf },
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Deleted => write!(f, "content file removed"),
            Disposition::AlreadyAbsent => write!(f, "content file already absent"),
            Disposition::Archived { path, .. } => {
                write!(f, "content saved for review at {}", path.display())
            }
            Disposition::Retained { path } => {
                write!(f, "content left in place at {}", path.display())
            }
        }
    }
}
