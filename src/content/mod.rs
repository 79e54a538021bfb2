// src/content/mod.rs
//! Scratch files for long-form text passed to write commands.

mod handle;
mod manager;
mod paths;

pub use handle::{ContentFileHandle, Disposition, Outcome};
pub use manager::ContentFileManager;
