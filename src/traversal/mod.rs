// src/traversal/mod.rs
//! Walking the page hierarchy of a space in server-sized batches.

mod cursor;
mod report;
mod session;

pub use cursor::{DepthPolicy, TraversalCursor};
pub use report::{Termination, TraversalReport, TraversalStats};
pub use session::{SpaceTraversal, TraversalState};
