// src/lib.rs
//! conduit library: a unified Jira and Confluence client that turns wiki
//! content into clean markdown for AI assistants.
//!
//! # Public API
//!
//! Organized by concern:
//! - **Storage format**: `parse`, `StructuralNode`, `MacroKind`
//! - **Rendering**: `render`, `render_storage`, `render_page`
//! - **Authoring**: `markdown_to_storage`, `markdown_to_jira`
//! - **Traversal**: `SpaceTraversal`, `TraversalCursor`, `DepthPolicy`
//! - **Content files**: `ContentFileManager`, `ContentFileHandle`
//! - **Remote access**: `WikiRepository`, `IssueTracker` and their HTTP clients
//! - **Configuration**: `ConduitConfig`, `CommandLineInput`

pub mod api;
pub mod authoring;
pub mod commands;
pub mod config;
pub mod constants;
pub mod content;
pub mod error;
pub mod error_recovery;
pub mod formatting;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod traversal;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, AtlassianErrorCode, ContentFileError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, ConduitConfig, Platform, ResolvedSite};

// --- Domain Model ---
pub use crate::model::{
    IssueDraft, IssueUpdate, PageBatch, PageDraft, PageRecord, PageSummary, PageToken, PageUpdate,
    RemoteLink, Transition,
};

// --- Domain Types ---
pub use crate::types::{ApiToken, ContentPurpose, IssueKey, PageId, SiteUrl, SpaceKey};

// --- Storage Format ---
pub use crate::storage::{
    parse, parse_with_diagnostics, Emphasis, ListKind, MacroKind, MarkupIssue, StructuralNode,
};

// --- Rendering & Authoring ---
pub use crate::authoring::{markdown_to_jira, markdown_to_storage};
pub use crate::formatting::{render, render_page, render_page_as, render_storage, BodyFormat};

// --- Traversal ---
pub use crate::traversal::{
    DepthPolicy, SpaceTraversal, Termination, TraversalCursor, TraversalReport, TraversalState,
    TraversalStats,
};

// --- Content Files ---
pub use crate::content::{ContentFileHandle, ContentFileManager, Disposition, Outcome};

// --- Remote Access ---
pub use crate::api::{
    AtlassianHttpClient, BatchRequest, BatchScope, ConfluenceClient, IssueTracker, JiraClient,
    WikiRepository,
};

// --- Pipeline Traits ---
pub use crate::pipeline::{ContentDelivery, PageComposer, PageSource};
