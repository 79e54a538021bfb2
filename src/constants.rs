// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role: how much a traversal fetches per round-trip, how deep
//! rendering may recurse, where content files live.

// ---------------------------------------------------------------------------
// Remote API boundaries
// ---------------------------------------------------------------------------

/// Pages requested per batch when the caller does not say otherwise.
pub const CONFLUENCE_DEFAULT_BATCH_SIZE: usize = 100;

/// Largest batch the Confluence content endpoints will honour.
pub const CONFLUENCE_MAX_BATCH_SIZE: usize = 250;

/// Upper bound on pages collected by an `all`-depth traversal unless the
/// caller supplies its own cap.
pub const TRAVERSAL_DEFAULT_MAX_PAGES: usize = 1000;

/// Fields expanded on every page fetch so a single request yields a
/// complete `PageRecord`.
pub const CONFLUENCE_PAGE_EXPAND: &str = "body.storage,version,space,ancestors";

/// Jira REST API version used for wiki-markup descriptions and comments.
pub const JIRA_API_PREFIX: &str = "rest/api/2";

/// Issues returned by a JQL search when the caller does not say otherwise.
pub const JIRA_SEARCH_DEFAULT_MAX_RESULTS: usize = 50;

/// Per-request timeout for remote API calls.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Transport retry policy for transient failures (429 and 5xx).
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
pub const RETRY_MAX_DELAY_MS: u64 = 8_000;

// ---------------------------------------------------------------------------
// Rendering boundaries
// ---------------------------------------------------------------------------

/// Maximum number of elements the storage parser keeps open at once.
/// Anything nested deeper is folded into the innermost open element.
pub const STORAGE_MAX_NESTING_DEPTH: usize = 256;

/// Maximum tree depth the normalizer descends before flattening the rest
/// of a subtree to plain text.
pub const NODE_MAX_RENDER_DEPTH: usize = 100;

/// Maximum nesting for rendered lists. Deeper lists are emitted at this
/// indentation level.
pub const LIST_MAX_NESTING: usize = 10;

/// Estimated characters per node, used to pre-allocate output strings.
pub const CHARS_PER_NODE_ESTIMATE: usize = 64;

// ---------------------------------------------------------------------------
// Content files
// ---------------------------------------------------------------------------

/// Subdirectory of the content directory that receives files from failed
/// commands.
pub const FAILED_CONTENT_DIR_NAME: &str = "failed_content";

/// Extension for allocated content files.
pub const CONTENT_FILE_EXTENSION: &str = "md";

/// Extension of the marker written next to an archived content file.
pub const FAILURE_MARKER_EXTENSION: &str = "failed";

/// Purpose tag used when the caller does not provide one.
pub const DEFAULT_CONTENT_PURPOSE: &str = "content";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Location of the site configuration, relative to the home directory.
pub const CONFIG_RELATIVE_PATH: &str = ".config/conduit/config.yaml";

/// Default content directory, relative to the home directory.
pub const CONTENT_DIR_RELATIVE_PATH: &str = ".config/conduit/content";

/// Alias used when a platform section does not name a default site.
pub const DEFAULT_SITE_ALIAS: &str = "default";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
