// src/traversal/cursor.rs
//! Traversal parameters, validated once before any request is made.

use crate::constants::{CONFLUENCE_MAX_BATCH_SIZE, TRAVERSAL_DEFAULT_MAX_PAGES};
use crate::types::{PageId, SpaceKey, ValidationError};
use std::fmt;

/// How far below the starting point a traversal descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DepthPolicy {
    /// Top-level pages of the space.
    #[default]
    Root,
    /// Direct children of the anchor page.
    Children,
    /// Every page, breadth-first, bounded by `max_pages`.
    All,
    /// Every page of the space as one flat listing, in server order.
    #[value(skip)]
    Space,
}

impl fmt::Display for DepthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthPolicy::Root => write!(f, "root"),
            DepthPolicy::Children => write!(f, "children"),
            DepthPolicy::All => write!(f, "all"),
            DepthPolicy::Space => write!(f, "space"),
        }
    }
}

/// Where a traversal starts and how it pages through results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalCursor {
    space: SpaceKey,
    depth: DepthPolicy,
    anchor: Option<PageId>,
    batch_size: usize,
    max_pages: usize,
}

impl TraversalCursor {
    /// Builds a cursor. `children` needs an anchor page; `all` starts below
    /// the anchor when one is given and at the space root otherwise.
    pub fn new(
        space: SpaceKey,
        depth: DepthPolicy,
        anchor: Option<PageId>,
        batch_size: usize,
    ) -> Result<Self, ValidationError> {
        if batch_size == 0 || batch_size > CONFLUENCE_MAX_BATCH_SIZE {
            return Err(ValidationError::InvalidBatchSize {
                size: batch_size,
                max: CONFLUENCE_MAX_BATCH_SIZE,
            });
        }
        if depth == DepthPolicy::Children && anchor.is_none() {
            return Err(ValidationError::MissingAnchor {
                policy: depth.to_string(),
            });
        }
        Ok(Self {
            space,
            depth,
            anchor,
            batch_size,
            max_pages: TRAVERSAL_DEFAULT_MAX_PAGES,
        })
    }

    /// Caps an `all` traversal at `max_pages` records. Zero means no cap.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = if max_pages == 0 { usize::MAX } else { max_pages };
        self
    }

    pub fn space(&self) -> &SpaceKey {
        &self.space
    }

    pub fn depth(&self) -> DepthPolicy {
        self.depth
    }

    pub fn anchor(&self) -> Option<&PageId> {
        self.anchor.as_ref()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The record cap, which only `all` traversals enforce.
    pub fn max_pages(&self) -> Option<usize> {
        (self.depth == DepthPolicy::All).then_some(self.max_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SpaceKey {
        SpaceKey::new("DOCS").unwrap()
    }

    #[test]
    fn batch_size_must_be_in_range() {
        assert!(TraversalCursor::new(space(), DepthPolicy::Root, None, 0).is_err());
        assert!(TraversalCursor::new(space(), DepthPolicy::Root, None, 251).is_err());
        assert!(TraversalCursor::new(space(), DepthPolicy::Root, None, 250).is_ok());
    }

    #[test]
    fn children_requires_anchor() {
        let err = TraversalCursor::new(space(), DepthPolicy::Children, None, 50).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingAnchor {
                policy: "children".to_string()
            }
        );
        let anchor = PageId::parse("7").unwrap();
        assert!(TraversalCursor::new(space(), DepthPolicy::Children, Some(anchor), 50).is_ok());
    }

    #[test]
    fn max_pages_only_applies_to_all() {
        let root = TraversalCursor::new(space(), DepthPolicy::Root, None, 50).unwrap();
        assert_eq!(root.max_pages(), None);
        let all = TraversalCursor::new(space(), DepthPolicy::All, None, 50)
            .unwrap()
            .with_max_pages(20);
        assert_eq!(all.max_pages(), Some(20));
        let flat = TraversalCursor::new(space(), DepthPolicy::Space, None, 50)
            .unwrap()
            .with_max_pages(20);
        assert_eq!(flat.max_pages(), None);
    }
}
