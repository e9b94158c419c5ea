//! Fatal errors and process exit codes.
//!
//! Documentation problems are never errors: they become violations in the
//! report. Only a precondition that makes the run meaningless (no root, no
//! readable version-control state, bad configuration, a file table whose
//! syntax cannot be read) aborts it, and then no report is printed at all.

use format_doc_core::markdown::FileTableError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for configuration and scope-resolution failures.
pub const EXIT_FAILURE: i32 = 2;

/// Why the set of files to check could not be determined.
#[derive(Debug, Error)]
pub enum ScopeResolutionError {
    #[error("root path does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("root path is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("cannot read {mode} state from git in {}: {reason}", .root.display())]
    VcsUnavailable {
        mode: &'static str,
        root: PathBuf,
        reason: String,
    },

    #[error("invalid exclude glob '{pattern}'")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk {}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A folder index starts a file table that cannot be parsed.
#[derive(Debug, Error)]
#[error("unparsable file table in {path}: {reason}")]
pub struct IndexSyntaxError {
    pub path: String,
    pub reason: FileTableError,
}
