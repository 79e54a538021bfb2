//! Records exchanged with the remote platforms.

mod issue;
mod page;

pub use issue::{IssueDraft, IssueUpdate, RemoteLink, Transition};
pub use page::{PageBatch, PageDraft, PageRecord, PageSummary, PageToken, PageUpdate};
