// src/content/paths.rs
//! Pure functions for content-file names and directory containment.
//!
//! Nothing here touches the filesystem.

use crate::constants::{CONTENT_FILE_EXTENSION, FAILURE_MARKER_EXTENSION};
use crate::types::ContentPurpose;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// `<purpose>_<UTC timestamp>_<suffix>.md`
pub fn content_file_name(purpose: &ContentPurpose, at: DateTime<Utc>, suffix: Uuid) -> String {
    format!(
        "{}_{}_{}.{}",
        purpose,
        at.format("%Y%m%dT%H%M%SZ"),
        suffix.simple(),
        CONTENT_FILE_EXTENSION
    )
}

/// The purpose tag encoded at the front of a content file name, if the name
/// follows the allocation pattern.
pub fn purpose_from_file_name(name: &str) -> Option<ContentPurpose> {
    let stem = name.strip_suffix(&format!(".{}", CONTENT_FILE_EXTENSION))?;
    let mut parts = stem.rsplitn(3, '_');
    let _suffix = parts.next()?;
    let _timestamp = parts.next()?;
    parts.next().map(ContentPurpose::new)
}

/// Where the failure marker for an archived file lives.
pub fn marker_path(archived: &Path) -> PathBuf {
    let mut name = archived
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(FAILURE_MARKER_EXTENSION);
    archived.with_file_name(name)
}

/// Checks whether `path` lies inside `base_dir`.
///
/// Uses canonical paths when both exist and falls back to lexical
/// normalization for paths not yet created.
pub fn is_within(path: &Path, base_dir: &Path) -> bool {
    if let (Ok(canonical_path), Ok(canonical_base)) = (path.canonicalize(), base_dir.canonicalize())
    {
        return canonical_path.starts_with(&canonical_base);
    }
    normalize_path(path).starts_with(normalize_path(base_dir))
}

/// Resolves `.` and `..` components lexically.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                components.pop();
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }
    components.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_encodes_purpose_time_and_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 3, 4).unwrap();
        let suffix = Uuid::nil();
        let name = content_file_name(&ContentPurpose::new("comment"), at, suffix);
        assert_eq!(
            name,
            "comment_20240517T090304Z_00000000000000000000000000000000.md"
        );
        assert_eq!(
            purpose_from_file_name(&name).map(|p| p.to_string()),
            Some("comment".to_string())
        );
    }

    #[test]
    fn purpose_with_underscores_survives() {
        let name = content_file_name(
            &ContentPurpose::new("page_body"),
            Utc::now(),
            Uuid::new_v4(),
        );
        assert_eq!(
            purpose_from_file_name(&name).map(|p| p.to_string()),
            Some("page_body".to_string())
        );
        assert!(purpose_from_file_name("notes.txt").is_none());
    }

    #[test]
    fn marker_sits_next_to_archived_file() {
        assert_eq!(
            marker_path(Path::new("/c/failed_content/x.md")),
            PathBuf::from("/c/failed_content/x.md.failed")
        );
    }

    #[test]
    fn containment_is_lexical_for_missing_paths() {
        let base = Path::new("/nonexistent/content");
        assert!(is_within(Path::new("/nonexistent/content/a.md"), base));
        assert!(!is_within(Path::new("/nonexistent/content/../a.md"), base));
        assert!(!is_within(Path::new("/elsewhere/a.md"), base));
    }
}
