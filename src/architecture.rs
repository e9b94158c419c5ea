//! Architecture link validation.
//!
//! Reads the root architecture file, checks that every module link resolves
//! to something on disk, and warns about maintained top-level folders that
//! no link points into.

use std::path::Path;

use format_doc_core::markdown::parse_module_links;
use format_doc_core::models::{Severity, Violation, ViolationKind};
use format_doc_core::reconcile::{check_architecture_links, unlinked_modules};

/// Validate `architecture_file` in `root` against the maintained folders.
///
/// A missing file is an error, or a warning when `relaxed` is set; either way
/// no link checks run without it.
pub fn check_architecture(
    root: &Path,
    architecture_file: &str,
    relaxed: bool,
    maintained_folders: &[String],
) -> Vec<Violation> {
    let path = root.join(architecture_file);
    if !path.is_file() {
        let severity = if relaxed {
            Severity::Warning
        } else {
            Severity::Error
        };
        return vec![Violation::new(
            ViolationKind::ArchitectureMissing,
            architecture_file,
            "root architecture file does not exist",
        )
        .with_severity(severity)];
    }

    let text = match std::fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            return vec![Violation::new(
                ViolationKind::FileUnreadable,
                architecture_file,
                format!("failed to read: {}", e),
            )]
        }
    };

    let links = parse_module_links(&text);
    tracing::debug!(links = links.len(), "architecture links parsed");

    let (mut violations, resolved) =
        check_architecture_links(architecture_file, &links, |target| root.join(target).exists());
    violations.extend(unlinked_modules(
        architecture_file,
        maintained_folders,
        &resolved,
    ));
    violations
}
