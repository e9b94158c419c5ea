//! Core data models used throughout format-doc.
//!
//! Every value here is derived fresh from the file tree on each run and never
//! mutated once built. Paths are always root-relative with `/` separators; the
//! root folder itself is the empty string.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How much a violation matters for the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One of the four metadata fields every header must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HeaderField {
    #[serde(rename = "@input")]
    Input,
    #[serde(rename = "@output")]
    Output,
    #[serde(rename = "@position")]
    Position,
    #[serde(rename = "@doc-sync")]
    DocSync,
}

impl HeaderField {
    pub const ALL: [HeaderField; 4] = [
        HeaderField::Input,
        HeaderField::Output,
        HeaderField::Position,
        HeaderField::DocSync,
    ];

    /// Canonical tag as written in source files.
    pub fn tag(&self) -> &'static str {
        match self {
            HeaderField::Input => "@input",
            HeaderField::Output => "@output",
            HeaderField::Position => "@position",
            HeaderField::DocSync => "@doc-sync",
        }
    }

    /// Every spelling accepted for this field. `@auto-doc` is the older
    /// name of the sync marker.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            HeaderField::Input => &["@input"],
            HeaderField::Output => &["@output"],
            HeaderField::Position => &["@position"],
            HeaderField::DocSync => &["@doc-sync", "@auto-doc"],
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What kind of inconsistency was found.
///
/// Declaration order is the secondary sort key of the report, so header
/// problems come before index problems for the same subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    FileUnreadable,
    HeaderMissing,
    HeaderFieldMissing { field: HeaderField },
    HeaderFieldEmpty { field: HeaderField },
    DuplicateHeaderField { field: HeaderField },
    IndexMissing,
    IndexTableMissing,
    IndexRowMissing,
    StaleIndexRow,
    DuplicateIndexRow,
    ArchitectureMissing,
    BrokenArchitectureLink,
    UnlinkedModule,
}

impl ViolationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ViolationKind::FileUnreadable => "FileUnreadable",
            ViolationKind::HeaderMissing => "HeaderMissing",
            ViolationKind::HeaderFieldMissing { .. } => "HeaderFieldMissing",
            ViolationKind::HeaderFieldEmpty { .. } => "HeaderFieldEmpty",
            ViolationKind::DuplicateHeaderField { .. } => "DuplicateHeaderField",
            ViolationKind::IndexMissing => "IndexMissing",
            ViolationKind::IndexTableMissing => "IndexTableMissing",
            ViolationKind::IndexRowMissing => "IndexRowMissing",
            ViolationKind::StaleIndexRow => "StaleIndexRow",
            ViolationKind::DuplicateIndexRow => "DuplicateIndexRow",
            ViolationKind::ArchitectureMissing => "ArchitectureMissing",
            ViolationKind::BrokenArchitectureLink => "BrokenArchitectureLink",
            ViolationKind::UnlinkedModule => "UnlinkedModule",
        }
    }

    pub fn field(&self) -> Option<HeaderField> {
        match self {
            ViolationKind::HeaderFieldMissing { field }
            | ViolationKind::HeaderFieldEmpty { field }
            | ViolationKind::DuplicateHeaderField { field } => Some(*field),
            _ => None,
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            ViolationKind::UnlinkedModule => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => write!(f, "{}({})", self.name(), field),
            None => f.write_str(self.name()),
        }
    }
}

/// A single documentation inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// File, folder, index or link path the violation is about.
    pub subject: String,
    pub detail: String,
    pub severity: Severity,
}

impl Violation {
    pub fn new(kind: ViolationKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
            severity: kind.default_severity(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A source file selected by the scope resolver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceFile {
    /// Root-relative path, `/`-separated. Identity of the file.
    pub path: String,
    /// Lower-cased extension including the leading dot.
    pub extension: String,
    /// Root-relative folder; empty for the root.
    pub folder: String,
}

impl SourceFile {
    /// Build from a root-relative path. Returns `None` for paths without an
    /// extension.
    pub fn from_relative(path: &str) -> Option<Self> {
        let path = normalize_rel(path);
        let name = file_name(&path);
        let dot = name.rfind('.')?;
        if dot == 0 || dot + 1 == name.len() {
            return None;
        }
        let extension = name[dot..].to_lowercase();
        Some(Self {
            folder: folder_of(&path).to_string(),
            extension,
            path,
        })
    }

    pub fn name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Metadata fields found in one file's header.
///
/// Absent fields have no entry; each present field keeps every value it was
/// given, in file order, so duplicates stay visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    pub fields: BTreeMap<HeaderField, Vec<String>>,
}

impl HeaderRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn insert(&mut self, field: HeaderField, value: impl Into<String>) {
        self.fields.entry(field).or_default().push(value.into());
    }
}

/// One row of a folder index's file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    /// File name as written, with Markdown decoration removed.
    pub file: String,
    pub role: String,
    pub responsibility: String,
    /// 1-based line in the index file.
    pub line: usize,
}

/// Parsed file table of one folder's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderIndexEntry {
    pub folder: String,
    pub rows: Vec<IndexRow>,
}

/// A module link in the root architecture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitectureLink {
    pub text: String,
    /// Target as written, with any `#fragment` removed.
    pub target: String,
    pub line: usize,
}

/// Normalize a relative path: `\` becomes `/`, `.` segments and duplicate
/// separators are dropped, `..` pops a segment where possible.
pub fn normalize_rel(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join a root-relative folder and a relative name.
pub fn join_rel(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        normalize_rel(name)
    } else {
        normalize_rel(&format!("{}/{}", folder, name))
    }
}

pub fn folder_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// First segment of a nested path, or `None` for entries directly in the root.
pub fn top_level(path: &str) -> Option<&str> {
    path.find('/').map(|idx| &path[..idx])
}

/// Human label for a folder path.
pub fn display_folder(folder: &str) -> &str {
    if folder.is_empty() {
        "."
    } else {
        folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_file_from_relative() {
        let f = SourceFile::from_relative("services/api/User.TS").unwrap();
        assert_eq!(f.path, "services/api/User.TS");
        assert_eq!(f.extension, ".ts");
        assert_eq!(f.folder, "services/api");
        assert_eq!(f.name(), "User.TS");

        let root = SourceFile::from_relative("main.go").unwrap();
        assert_eq!(root.folder, "");
    }

    #[test]
    fn source_file_rejects_extensionless() {
        assert!(SourceFile::from_relative("Makefile").is_none());
        assert!(SourceFile::from_relative("src/.env").is_none());
        assert!(SourceFile::from_relative("src/trailing.").is_none());
    }

    #[test]
    fn normalize_handles_dots_and_backslashes() {
        assert_eq!(normalize_rel("./a//b/./c.ts"), "a/b/c.ts");
        assert_eq!(normalize_rel("a\\b\\c.py"), "a/b/c.py");
        assert_eq!(normalize_rel("a/b/../c"), "a/c");
        assert_eq!(normalize_rel("../x"), "../x");
    }

    #[test]
    fn join_and_split() {
        assert_eq!(join_rel("", "INDEX.md"), "INDEX.md");
        assert_eq!(join_rel("billing", "./invoice.py"), "billing/invoice.py");
        assert_eq!(folder_of("a/b/c.ts"), "a/b");
        assert_eq!(file_name("a/b/c.ts"), "c.ts");
        assert_eq!(top_level("a/b/c.ts"), Some("a"));
        assert_eq!(top_level("c.ts"), None);
    }

    #[test]
    fn field_kinds_display_their_field() {
        let kind = ViolationKind::HeaderFieldMissing {
            field: HeaderField::Output,
        };
        assert_eq!(kind.to_string(), "HeaderFieldMissing(@output)");
        assert_eq!(ViolationKind::StaleIndexRow.to_string(), "StaleIndexRow");
    }

    #[test]
    fn unlinked_module_is_a_warning() {
        let v = Violation::new(ViolationKind::UnlinkedModule, "billing", "no link");
        assert_eq!(v.severity, Severity::Warning);
        assert!(!v.is_error());
        let v = Violation::new(ViolationKind::HeaderMissing, "a.ts", "none");
        assert!(v.is_error());
    }

    #[test]
    fn header_record_keeps_repeated_fields() {
        let mut record = HeaderRecord::default();
        assert!(record.is_empty());
        record.insert(HeaderField::Input, "config");
        record.insert(HeaderField::Input, "db");
        record.insert(HeaderField::DocSync, "keep in sync");
        assert!(!record.fields.contains_key(&HeaderField::Output));
        assert_eq!(record.fields[&HeaderField::Input], ["config", "db"]);
    }
}
