//! Cross-referencing documentation against the file tree.
//!
//! Existence checks are passed in as closures over root-relative paths, so
//! everything here stays free of I/O.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    join_rel, normalize_rel, top_level, ArchitectureLink, FolderIndexEntry, IndexRow, SourceFile,
    Violation, ViolationKind,
};

/// Reconcile a folder's index rows with its files.
///
/// * a row naming a file that does not exist → `StaleIndexRow`
/// * a file named by more than one row → `DuplicateIndexRow`
/// * an in-scope file named by no row → `IndexRowMissing`
///
/// Row order is the author's business and is not checked.
pub fn reconcile_index<F>(
    entry: &FolderIndexEntry,
    index_path: &str,
    in_scope: &[SourceFile],
    exists: F,
) -> Vec<Violation>
where
    F: Fn(&str) -> bool,
{
    let mut by_file: BTreeMap<String, Vec<&IndexRow>> = BTreeMap::new();
    for row in &entry.rows {
        by_file.entry(normalize_rel(&row.file)).or_default().push(row);
    }

    let mut violations = Vec::new();
    for (file, rows) in &by_file {
        let path = join_rel(&entry.folder, file);
        if !exists(&path) {
            violations.push(Violation::new(
                ViolationKind::StaleIndexRow,
                path.clone(),
                format!(
                    "listed in {} (line {}) but the file does not exist",
                    index_path, rows[0].line
                ),
            ));
        }
        if rows.len() > 1 {
            let lines: Vec<String> = rows.iter().map(|r| r.line.to_string()).collect();
            violations.push(Violation::new(
                ViolationKind::DuplicateIndexRow,
                path,
                format!("listed {} times in {} (lines {})", rows.len(), index_path, lines.join(", ")),
            ));
        }
    }

    for file in in_scope {
        if !by_file.contains_key(file.name()) {
            violations.push(Violation::new(
                ViolationKind::IndexRowMissing,
                file.path.clone(),
                format!("not listed in {}", index_path),
            ));
        }
    }
    violations
}

/// Check that every architecture link resolves. Returns the violations and
/// the root-relative targets that do resolve.
pub fn check_architecture_links<F>(
    architecture_path: &str,
    links: &[ArchitectureLink],
    exists: F,
) -> (Vec<Violation>, Vec<String>)
where
    F: Fn(&str) -> bool,
{
    let mut violations = Vec::new();
    let mut resolved = Vec::new();
    for link in links {
        let target = normalize_rel(&link.target);
        if !target.is_empty() && exists(&target) {
            resolved.push(target);
        } else {
            violations.push(Violation::new(
                ViolationKind::BrokenArchitectureLink,
                if target.is_empty() { link.target.clone() } else { target },
                format!(
                    "link [{}] in {} (line {}) points at nothing",
                    link.text, architecture_path, link.line
                ),
            ));
        }
    }
    (violations, resolved)
}

/// Top-level folders that hold maintained folders but have no resolving
/// architecture link inside them. Files directly in the root belong to no
/// module and are never reported.
pub fn unlinked_modules(
    architecture_path: &str,
    maintained_folders: &[String],
    resolved_targets: &[String],
) -> Vec<Violation> {
    let modules: BTreeSet<&str> = maintained_folders
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| top_level(f).unwrap_or(f.as_str()))
        .collect();

    modules
        .into_iter()
        .filter(|module| {
            !resolved_targets.iter().any(|target| {
                target == module
                    || (target.starts_with(module) && target[module.len()..].starts_with('/'))
            })
        })
        .map(|module| {
            Violation::new(
                ViolationKind::UnlinkedModule,
                module,
                format!("no module link in {} points into this folder", architecture_path),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn row(file: &str, line: usize) -> IndexRow {
        IndexRow {
            file: file.to_string(),
            role: "Module".to_string(),
            responsibility: String::new(),
            line,
        }
    }

    fn file(path: &str) -> SourceFile {
        SourceFile::from_relative(path).unwrap()
    }

    #[test]
    fn bijection_has_no_violations() {
        let entry = FolderIndexEntry {
            folder: "services".to_string(),
            rows: vec![row("user.ts", 10)],
        };
        let v = reconcile_index(
            &entry,
            "services/INDEX.md",
            &[file("services/user.ts")],
            |p| p == "services/user.ts",
        );
        assert!(v.is_empty(), "{:?}", v);
    }

    #[test]
    fn stale_row_for_deleted_file() {
        let entry = FolderIndexEntry {
            folder: "billing".to_string(),
            rows: vec![row("invoice.py", 11), row("ledger.py", 12)],
        };
        let v = reconcile_index(&entry, "billing/INDEX.md", &[], |p| p == "billing/ledger.py");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::StaleIndexRow);
        assert_eq!(v[0].subject, "billing/invoice.py");
        assert!(v[0].detail.contains("line 11"));
    }

    #[test]
    fn missing_row_for_new_file() {
        let entry = FolderIndexEntry {
            folder: String::new(),
            rows: vec![],
        };
        let v = reconcile_index(&entry, "INDEX.md", &[file("auth.go")], |_| true);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::IndexRowMissing);
        assert_eq!(v[0].subject, "auth.go");
    }

    #[test]
    fn duplicate_rows_after_normalization() {
        let entry = FolderIndexEntry {
            folder: "a".to_string(),
            rows: vec![row("x.ts", 3), row("./x.ts", 7)],
        };
        let v = reconcile_index(&entry, "a/INDEX.md", &[file("a/x.ts")], |_| true);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::DuplicateIndexRow);
        assert!(v[0].detail.contains("lines 3, 7"));
    }

    #[test]
    fn rows_for_non_source_files_are_fine() {
        let entry = FolderIndexEntry {
            folder: "docs".to_string(),
            rows: vec![row("README.md", 5)],
        };
        let v = reconcile_index(&entry, "docs/INDEX.md", &[], |p| p == "docs/README.md");
        assert!(v.is_empty());
    }

    fn link(target: &str) -> ArchitectureLink {
        ArchitectureLink {
            text: target.to_string(),
            target: target.to_string(),
            line: 1,
        }
    }

    #[test]
    fn broken_and_resolved_links() {
        let links = vec![link("./services/INDEX.md"), link("payments/INDEX.md")];
        let (v, resolved) = check_architecture_links("ARCHITECTURE.md", &links, |p| {
            p == "services/INDEX.md"
        });
        assert_eq!(resolved, vec!["services/INDEX.md".to_string()]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::BrokenArchitectureLink);
        assert_eq!(v[0].subject, "payments/INDEX.md");
        assert_eq!(v[0].severity, Severity::Error);
    }

    #[test]
    fn unlinked_top_level_modules_are_warnings() {
        let maintained = vec![
            String::new(),
            "services".to_string(),
            "services/api".to_string(),
            "billing/core".to_string(),
            "servicesx".to_string(),
        ];
        let resolved = vec!["services/api/INDEX.md".to_string()];
        let v = unlinked_modules("ARCHITECTURE.md", &maintained, &resolved);
        let subjects: Vec<_> = v.iter().map(|v| v.subject.as_str()).collect();
        assert_eq!(subjects, vec!["billing", "servicesx"]);
        assert!(v.iter().all(|v| v.severity == Severity::Warning));
    }
}
