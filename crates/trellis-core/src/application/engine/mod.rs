//! The schema execution engine.
//!
//! One [`walker`] drives every traversal; what happens at each node is
//! decided by a strategy:
//!
//! - [`materialize`]: writes folders and files (or logs what it would write)
//! - [`preview`]: classifies nodes into a diff tree without touching disk
//!
//! [`undo`] reverses a materialization from its recorded items, and
//! [`archive`] rewrites downloaded office/zip documents in place.

pub mod archive;
pub mod diff;
pub(crate) mod materialize;
pub(crate) mod preview;
pub(crate) mod undo;
pub(crate) mod walker;

pub use archive::ArchiveKind;
pub use diff::{compute_hunks, is_binary_content, truncate_content};
pub use materialize::CreateOptions;
