// src/traversal/report.rs
//! What a collected traversal produced and why it stopped.

use crate::error::AppError;
use crate::model::PageRecord;

/// Why a traversal stopped.
#[derive(Debug)]
pub enum Termination {
    Completed,
    /// The cancellation token fired between batches.
    Cancelled,
    /// A remote error or the page cap ended the traversal early.
    Failed(AppError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub batches_fetched: usize,
    pub records_yielded: usize,
    pub duplicates_skipped: usize,
}

/// Records gathered by `SpaceTraversal::collect`, including the partial set
/// when the traversal did not complete.
#[derive(Debug)]
pub struct TraversalReport {
    pub records: Vec<PageRecord>,
    pub stats: TraversalStats,
    pub termination: Termination,
}

impl TraversalReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::Completed)
    }

    /// Splits the report into the records and the reason they may be
    /// incomplete.
    pub fn into_parts(self) -> (Vec<PageRecord>, Option<AppError>) {
        let retrieved = self.records.len();
        let error = match self.termination {
            Termination::Completed => None,
            Termination::Cancelled => Some(AppError::Cancelled { retrieved }),
            Termination::Failed(e) => Some(e),
        };
        (self.records, error)
    }

    /// The records if the traversal completed, otherwise the error.
    pub fn into_result(self) -> Result<Vec<PageRecord>, AppError> {
        match self.into_parts() {
            (records, None) => Ok(records),
            (_, Some(e)) => Err(e),
        }
    }
}
