//! The `fdoc check` pipeline.
//!
//! ```text
//! resolve scope ──▶ per-folder tasks (headers + index) ──┐
//!              └──▶ architecture task ──────────────────┴──▶ Report
//! ```
//!
//! Folder tasks run on the blocking pool and share nothing but an immutable
//! [`FolderContext`]. Their violation lists are merged once at the end and
//! sorted by [`Report::new`], so completion order never shows in the output.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use format_doc_core::header::check_header;
use format_doc_core::language::LanguageRegistry;
use format_doc_core::markdown::{parse_file_table, FileTableError};
use format_doc_core::models::{display_folder, join_rel, SourceFile, Violation, ViolationKind};
use format_doc_core::reconcile::reconcile_index;
use format_doc_core::report::Report;

use crate::architecture::check_architecture;
use crate::config::Config;
use crate::error::IndexSyntaxError;
use crate::scope::{Scope, ScopeMode, ScopeResolver, ScopeRules};
use crate::vcs::VcsState;

/// Which parts of a check run.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    pub mode: ScopeMode,
    pub skip_headers: bool,
    pub skip_index: bool,
    pub skip_architecture: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            mode: ScopeMode::Full,
            skip_headers: false,
            skip_index: false,
            skip_architecture: false,
        }
    }
}

/// Read-only state shared by folder tasks.
struct FolderContext {
    root: PathBuf,
    registry: LanguageRegistry,
    index_file: String,
    max_header_lines: usize,
    skip_headers: bool,
    skip_index: bool,
}

/// Resolve the scope for `root` without checking anything.
pub fn resolve_scope(
    root: &Path,
    config: &Config,
    mode: ScopeMode,
    vcs: &dyn VcsState,
) -> Result<Scope> {
    let registry = config.registry()?;
    let rules = ScopeRules::from_config(config)?;
    let resolver = ScopeResolver::new(root, &registry, &rules, &config.docs.index_file)?;
    Ok(resolver.resolve(mode, vcs)?)
}

/// Run every enabled validator and aggregate the result.
///
/// Fails when the scope cannot be resolved, a file table cannot be parsed, or
/// a task dies; documentation problems are returned inside the report.
pub async fn run_check(
    root: &Path,
    config: &Config,
    options: CheckOptions,
    vcs: &dyn VcsState,
) -> Result<Report> {
    let scope = resolve_scope(root, config, options.mode, vcs)?;
    let maintained = scope.maintained_folders();

    let mut by_folder: BTreeMap<String, Vec<SourceFile>> =
        maintained.iter().map(|f| (f.clone(), Vec::new())).collect();
    for file in &scope.files {
        by_folder.entry(file.folder.clone()).or_default().push(file.clone());
    }

    let ctx = Arc::new(FolderContext {
        root: root.to_path_buf(),
        registry: config.registry()?,
        index_file: config.docs.index_file.clone(),
        max_header_lines: config.headers.max_lines,
        skip_headers: options.skip_headers,
        skip_index: options.skip_index,
    });

    let mut tasks: JoinSet<Result<Vec<Violation>, IndexSyntaxError>> = JoinSet::new();
    for (folder, files) in by_folder {
        let ctx = Arc::clone(&ctx);
        tasks.spawn_blocking(move || check_folder(&ctx, &folder, &files));
    }

    if !options.skip_architecture && !scope.is_empty() {
        let root = root.to_path_buf();
        let architecture_file = config.docs.architecture_file.clone();
        let relaxed = config.docs.relaxed_architecture;
        let source_folders = scope.source_folders();
        tasks.spawn_blocking(move || {
            Ok(check_architecture(&root, &architecture_file, relaxed, &source_folders))
        });
    }

    let mut violations = Vec::new();
    let mut failures = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result.context("check task failed")? {
            Ok(found) => violations.extend(found),
            Err(e) => failures.push(e),
        }
    }
    // Lowest path wins so the message does not depend on task order.
    if let Some(failure) = failures.into_iter().min_by(|a, b| a.path.cmp(&b.path)) {
        return Err(failure.into());
    }

    Ok(Report::new(
        options.mode.as_str(),
        scope.files.len(),
        maintained.len(),
        violations,
    ))
}

/// Header validation for the folder's in-scope files, then index
/// reconciliation for the folder.
fn check_folder(
    ctx: &FolderContext,
    folder: &str,
    files: &[SourceFile],
) -> Result<Vec<Violation>, IndexSyntaxError> {
    let mut violations = Vec::new();

    if !ctx.skip_headers {
        for file in files {
            violations.extend(check_file_header(ctx, file));
        }
    }

    if !ctx.skip_index {
        violations.extend(check_folder_index(ctx, folder, files)?);
    }

    tracing::debug!(
        folder = display_folder(folder),
        files = files.len(),
        violations = violations.len(),
        "folder checked"
    );
    Ok(violations)
}

fn check_file_header(ctx: &FolderContext, file: &SourceFile) -> Vec<Violation> {
    let Some(adapter) = ctx.registry.lookup(&file.extension) else {
        return Vec::new();
    };
    match std::fs::read(ctx.root.join(&file.path)) {
        Ok(bytes) => check_header(
            &file.path,
            &String::from_utf8_lossy(&bytes),
            adapter,
            ctx.max_header_lines,
        ),
        Err(e) => vec![Violation::new(
            ViolationKind::FileUnreadable,
            file.path.clone(),
            format!("failed to read: {}", e),
        )],
    }
}

fn check_folder_index(
    ctx: &FolderContext,
    folder: &str,
    files: &[SourceFile],
) -> Result<Vec<Violation>, IndexSyntaxError> {
    let index_path = join_rel(folder, &ctx.index_file);
    let abs = ctx.root.join(&index_path);

    if !abs.is_file() {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![Violation::new(
            ViolationKind::IndexMissing,
            index_path,
            format!(
                "folder {} has {} source file(s) but no {}",
                display_folder(folder),
                files.len(),
                ctx.index_file
            ),
        )]);
    }

    let text = match std::fs::read(&abs) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            return Ok(vec![Violation::new(
                ViolationKind::FileUnreadable,
                index_path,
                format!("failed to read: {}", e),
            )])
        }
    };

    match parse_file_table(folder, &text) {
        Ok(entry) => Ok(reconcile_index(&entry, &index_path, files, |path| {
            ctx.root.join(path).exists()
        })),
        Err(FileTableError::NotFound) => Ok(vec![Violation::new(
            ViolationKind::IndexTableMissing,
            index_path,
            "no file table (a table whose first column is File) found",
        )]),
        Err(reason) => Err(IndexSyntaxError {
            path: index_path,
            reason,
        }),
    }
}
