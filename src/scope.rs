//! Scope resolution: which source files a run checks.
//!
//! * `full` walks the root, skipping ignored directories, excluded globs and
//!   unregistered extensions.
//! * `changed` keeps the files from `full` that the working tree reports as
//!   modified or added (tracked and untracked).
//! * `staged` keeps the files from `full` that are in the staging area.
//!
//! Deleted paths reported by version control come back as deletion events:
//! they have no file to validate but still send their folder's index through
//! reconciliation, so rows for them show up as stale.

use clap::ValueEnum;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use format_doc_core::language::LanguageRegistry;
use format_doc_core::models::{folder_of, SourceFile};

use crate::config::Config;
use crate::error::ScopeResolutionError;
use crate::vcs::VcsState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeMode {
    /// Every source file under the root.
    Full,
    /// Files modified, added, or untracked since the last commit.
    Changed,
    /// Files in the staging area.
    Staged,
}

impl ScopeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeMode::Full => "full",
            ScopeMode::Changed => "changed",
            ScopeMode::Staged => "staged",
        }
    }
}

/// The files one run operates on.
#[derive(Debug, Clone)]
pub struct Scope {
    pub mode: ScopeMode,
    /// Existing in-scope files, sorted by path, no duplicates.
    pub files: Vec<SourceFile>,
    /// Deleted source files reported by version control.
    pub deleted: Vec<SourceFile>,
    /// Folders holding an index file but no in-scope files (`full` only).
    pub index_only_folders: Vec<String>,
}

impl Scope {
    /// Nothing to check and nothing deleted.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deleted.is_empty()
    }

    /// Folders holding at least one in-scope file, sorted.
    pub fn source_folders(&self) -> Vec<String> {
        let folders: BTreeSet<&str> = self.files.iter().map(|f| f.folder.as_str()).collect();
        folders.into_iter().map(str::to_string).collect()
    }

    /// Folders whose index is reconciled: source folders plus folders of
    /// deletion events and index-only folders, sorted.
    pub fn maintained_folders(&self) -> Vec<String> {
        let folders: BTreeSet<String> = self
            .files
            .iter()
            .chain(&self.deleted)
            .map(|f| f.folder.clone())
            .chain(self.index_only_folders.iter().cloned())
            .collect();
        folders.into_iter().collect()
    }
}

/// Ignore rules, fixed when the resolver is built.
#[derive(Debug, Clone)]
pub struct ScopeRules {
    ignore_dirs: BTreeSet<String>,
    excludes: GlobSet,
    include_hidden: bool,
    follow_symlinks: bool,
}

impl ScopeRules {
    pub fn from_config(config: &Config) -> Result<Self, ScopeResolutionError> {
        Ok(Self {
            ignore_dirs: config.ignore_dirs(),
            excludes: build_globset(&config.exclude_globs())?,
            include_hidden: config.scope.include_hidden,
            follow_symlinks: config.scope.follow_symlinks,
        })
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name) || (!self.include_hidden && name.starts_with('.'))
    }

    /// Whether a root-relative file path falls under an ignore rule.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let mut parts: Vec<&str> = rel_path.split('/').collect();
        parts.pop();
        parts.iter().any(|dir| self.skips_dir(dir)) || self.excludes.is_match(rel_path)
    }
}

pub struct ScopeResolver<'a> {
    root: PathBuf,
    registry: &'a LanguageRegistry,
    rules: &'a ScopeRules,
    index_file: &'a str,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(
        root: &Path,
        registry: &'a LanguageRegistry,
        rules: &'a ScopeRules,
        index_file: &'a str,
    ) -> Result<Self, ScopeResolutionError> {
        if !root.exists() {
            return Err(ScopeResolutionError::RootMissing(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScopeResolutionError::RootNotDirectory(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            registry,
            rules,
            index_file,
        })
    }

    pub fn resolve(&self, mode: ScopeMode, vcs: &dyn VcsState) -> Result<Scope, ScopeResolutionError> {
        let (all, index_folders) = self.walk()?;

        let scope = match mode {
            ScopeMode::Full => {
                let maintained: BTreeSet<&str> = all.iter().map(|f| f.folder.as_str()).collect();
                let index_only_folders = index_folders
                    .into_iter()
                    .filter(|folder| !maintained.contains(folder.as_str()))
                    .collect();
                Scope {
                    mode,
                    files: all,
                    deleted: Vec::new(),
                    index_only_folders,
                }
            }
            ScopeMode::Changed | ScopeMode::Staged => {
                let changes = if mode == ScopeMode::Changed {
                    vcs.changed(&self.root)?
                } else {
                    vcs.staged(&self.root)?
                };
                let files = all.into_iter().filter(|f| changes.contains(&f.path)).collect();
                let deleted = changes
                    .deleted()
                    .filter(|path| !self.root.join(path).exists())
                    .filter_map(|path| self.eligible(path))
                    .collect();
                Scope {
                    mode,
                    files,
                    deleted,
                    index_only_folders: Vec::new(),
                }
            }
        };

        tracing::info!(
            mode = mode.as_str(),
            files = scope.files.len(),
            deleted = scope.deleted.len(),
            "scope resolved"
        );
        Ok(scope)
    }

    /// A root-relative path that the full walk would select, ignoring
    /// whether it exists.
    fn eligible(&self, rel_path: &str) -> Option<SourceFile> {
        if rel_path.starts_with("../") || self.rules.is_ignored(rel_path) {
            return None;
        }
        let file = SourceFile::from_relative(rel_path)?;
        self.registry.is_registered(&file.extension).then_some(file)
    }

    /// All registered source files, plus folders that contain an index file.
    fn walk(&self) -> Result<(Vec<SourceFile>, Vec<String>), ScopeResolutionError> {
        let mut files = Vec::new();
        let mut index_folders = BTreeSet::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.rules.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !self.rules.skips_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = entry.map_err(|source| ScopeResolutionError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(rel) = relative_string(entry.path(), &self.root) else {
                continue;
            };
            if self.rules.excludes.is_match(&rel) {
                tracing::debug!(path = %rel, "excluded by glob");
                continue;
            }

            if entry.file_name() == self.index_file {
                index_folders.insert(folder_of(&rel).to_string());
                continue;
            }

            match SourceFile::from_relative(&rel) {
                Some(file) if self.registry.is_registered(&file.extension) => files.push(file),
                _ => {}
            }
        }

        files.sort();
        files.dedup();
        Ok((files, index_folders.into_iter().collect()))
    }
}

fn relative_string(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScopeResolutionError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScopeResolutionError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScopeResolutionError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{FixedVcs, WorkingChanges};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "main.go", "package main\n");
        write(root, "services/user.ts", "export {}\n");
        write(root, "services/INDEX.md", "# services\n");
        write(root, "services/notes.md", "notes\n");
        write(root, "node_modules/dep/index.js", "x\n");
        write(root, ".hidden/secret.py", "x\n");
        write(root, "web/app.min.js", "x\n");
        write(root, "docs/INDEX.md", "# docs\n");
        write(root, "lib/Tool.JAVA", "class Tool {}\n");
        tmp
    }

    fn paths(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    fn resolve(root: &Path, mode: ScopeMode, vcs: &dyn VcsState) -> Scope {
        let config = Config::default();
        let registry = config.registry().unwrap();
        let rules = ScopeRules::from_config(&config).unwrap();
        let resolver = ScopeResolver::new(root, &registry, &rules, "INDEX.md").unwrap();
        resolver.resolve(mode, vcs).unwrap()
    }

    #[test]
    fn full_walk_respects_ignores() {
        let tmp = tree();
        let scope = resolve(tmp.path(), ScopeMode::Full, &FixedVcs::default());
        assert_eq!(
            paths(&scope.files),
            vec!["lib/Tool.JAVA", "main.go", "services/user.ts"]
        );
        assert_eq!(scope.index_only_folders, vec!["docs".to_string()]);
        assert_eq!(
            scope.maintained_folders(),
            vec!["".to_string(), "docs".to_string(), "lib".to_string(), "services".to_string()]
        );
        assert_eq!(
            scope.source_folders(),
            vec!["".to_string(), "lib".to_string(), "services".to_string()]
        );
    }

    #[test]
    fn changed_is_subset_of_full() {
        let tmp = tree();
        let mut changes = WorkingChanges::new();
        changes.touch("services/user.ts");
        changes.touch("services/notes.md");
        changes.touch("node_modules/dep/index.js");
        changes.delete("billing/invoice.py");
        changes.delete("billing/readme.txt");
        let vcs = FixedVcs {
            changed: changes,
            ..Default::default()
        };

        let full = resolve(tmp.path(), ScopeMode::Full, &vcs);
        let changed = resolve(tmp.path(), ScopeMode::Changed, &vcs);
        assert_eq!(paths(&changed.files), vec!["services/user.ts"]);
        assert!(changed.files.iter().all(|f| full.files.contains(f)));
        assert_eq!(paths(&changed.deleted), vec!["billing/invoice.py"]);
        assert!(changed.index_only_folders.is_empty());
        assert_eq!(
            changed.maintained_folders(),
            vec!["billing".to_string(), "services".to_string()]
        );
        assert_eq!(changed.source_folders(), vec!["services".to_string()]);
    }

    #[test]
    fn nothing_staged_is_empty() {
        let tmp = tree();
        let scope = resolve(tmp.path(), ScopeMode::Staged, &FixedVcs::default());
        assert!(scope.is_empty());
        assert!(scope.maintained_folders().is_empty());
    }

    #[test]
    fn deletion_of_existing_path_is_ignored() {
        let tmp = tree();
        let mut staged = WorkingChanges::new();
        staged.delete("main.go");
        let vcs = FixedVcs {
            staged,
            ..Default::default()
        };
        let scope = resolve(tmp.path(), ScopeMode::Staged, &vcs);
        assert!(scope.deleted.is_empty());
    }

    #[test]
    fn missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        let config = Config::default();
        let registry = config.registry().unwrap();
        let rules = ScopeRules::from_config(&config).unwrap();
        let err = ScopeResolver::new(&tmp.path().join("absent"), &registry, &rules, "INDEX.md")
            .err()
            .unwrap();
        assert!(matches!(err, ScopeResolutionError::RootMissing(_)));

        let file = tmp.path().join("f.ts");
        fs::write(&file, "").unwrap();
        let err = ScopeResolver::new(&file, &registry, &rules, "INDEX.md")
            .err()
            .unwrap();
        assert!(matches!(err, ScopeResolutionError::RootNotDirectory(_)));
    }

    #[test]
    fn ignore_rules_apply_to_paths() {
        let rules = ScopeRules::from_config(&Config::default()).unwrap();
        assert!(rules.is_ignored("node_modules/a/b.js"));
        assert!(rules.is_ignored(".cache/x.py"));
        assert!(rules.is_ignored("web/app.min.js"));
        assert!(!rules.is_ignored("src/.eslintrc.js"));
        assert!(!rules.is_ignored("src/app.js"));
    }
}
