//! TOML configuration parsing.
//!
//! Configuration is optional. It is read from `--config <path>` or, when that
//! flag is absent, from `<root>/.format-doc.toml` if the file exists;
//! otherwise the built-in defaults apply. Command-line flags are applied on
//! top with [`Config::apply`].
//!
//! ```toml
//! [docs]
//! index_file = "INDEX.md"
//! architecture_file = "ARCHITECTURE.md"
//! relaxed_architecture = false
//!
//! [headers]
//! max_lines = 80
//!
//! [scope]
//! ignore_dirs = ["generated"]
//! exclude_globs = ["**/*_pb2.py"]
//!
//! [[languages]]
//! extension = ".rb"
//! line = "#"
//! ```

use anyhow::{bail, Context, Result};
use format_doc_core::language::{normalize_extension, CommentSyntax, LanguageAdapter, LanguageRegistry};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File name looked up in the root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".format-doc.toml";

/// Directory names never descended into.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".idea",
    ".vscode",
    "node_modules",
    "dist",
    "build",
    "target",
    "coverage",
    "vendor",
    ".next",
    "out",
    "__pycache__",
    ".mvn",
    ".gradle",
];

/// Files excluded from every scope: minified and bundled output.
pub const DEFAULT_EXCLUDE_GLOBS: &[&str] = &[
    "**/*.min.js",
    "**/*.min.mjs",
    "**/*.min.cjs",
    "**/*.bundle.js",
];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub headers: HeadersConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub languages: Vec<LanguageConfig>,
    /// Languages added on the command line with `--ext`.
    #[serde(skip)]
    pub extra_languages: Vec<LanguageAdapter>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default = "default_architecture_file")]
    pub architecture_file: String,
    /// A missing architecture file is a warning instead of an error, and
    /// link checks are skipped.
    #[serde(default)]
    pub relaxed_architecture: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            index_file: default_index_file(),
            architecture_file: default_architecture_file(),
            relaxed_architecture: false,
        }
    }
}

fn default_index_file() -> String {
    "INDEX.md".to_string()
}
fn default_architecture_file() -> String {
    "ARCHITECTURE.md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeadersConfig {
    /// Leading lines of each file searched for the header.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

fn default_max_lines() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScopeConfig {
    /// Added to [`DEFAULT_IGNORED_DIRS`].
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
    /// Added to [`DEFAULT_EXCLUDE_GLOBS`]; matched against root-relative paths.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Descend into directories whose name starts with `.`.
    #[serde(default)]
    pub include_hidden: bool,
}

/// A `[[languages]]` entry: either `line` or `block_open` + `block_close`.
#[derive(Debug, Deserialize, Clone)]
pub struct LanguageConfig {
    pub extension: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub block_open: Option<String>,
    #[serde(default)]
    pub block_close: Option<String>,
}

impl LanguageConfig {
    fn to_adapter(&self) -> Result<LanguageAdapter> {
        let Some(extension) = normalize_extension(&self.extension) else {
            bail!("languages: invalid extension '{}'", self.extension);
        };
        let syntax = match (&self.line, &self.block_open, &self.block_close) {
            (Some(prefix), None, None) if !prefix.trim().is_empty() => {
                CommentSyntax::line(prefix.trim())
            }
            (None, Some(open), Some(close))
                if !open.trim().is_empty() && !close.trim().is_empty() =>
            {
                CommentSyntax::block(open.trim(), close.trim())
            }
            _ => bail!(
                "languages: '{}' must set either `line` or both `block_open` and `block_close`",
                self.extension
            ),
        };
        let language = self.language.as_deref().unwrap_or("custom");
        Ok(LanguageAdapter::new(&extension, language, vec![syntax]))
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub index_file: Option<String>,
    pub architecture_file: Option<String>,
    pub relaxed_architecture: bool,
    pub max_header_lines: Option<usize>,
    pub extensions: Vec<LanguageAdapter>,
    pub ignore_dirs: Vec<String>,
}

impl Config {
    /// Apply command-line overrides and re-validate.
    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(index_file) = overrides.index_file {
            self.docs.index_file = index_file;
        }
        if let Some(architecture_file) = overrides.architecture_file {
            self.docs.architecture_file = architecture_file;
        }
        if overrides.relaxed_architecture {
            self.docs.relaxed_architecture = true;
        }
        if let Some(max_lines) = overrides.max_header_lines {
            self.headers.max_lines = max_lines;
        }
        self.extra_languages.extend(overrides.extensions);
        self.scope.ignore_dirs.extend(overrides.ignore_dirs);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.headers.max_lines == 0 {
            bail!("headers.max_lines must be > 0");
        }
        check_file_name("docs.index_file", &self.docs.index_file)?;
        check_file_name("docs.architecture_file", &self.docs.architecture_file)?;

        for dir in &self.scope.ignore_dirs {
            if dir.trim().is_empty() || dir.contains(['/', '\\']) {
                bail!("scope.ignore_dirs: '{}' must be a single directory name", dir);
            }
        }
        for pattern in &self.scope.exclude_globs {
            globset::Glob::new(pattern)
                .with_context(|| format!("scope.exclude_globs: invalid glob '{}'", pattern))?;
        }
        for language in &self.languages {
            language.to_adapter()?;
        }
        Ok(())
    }

    /// Built-in languages plus `[[languages]]` entries plus `--ext` values,
    /// later entries replacing earlier ones for the same extension.
    pub fn registry(&self) -> Result<LanguageRegistry> {
        let mut registry = LanguageRegistry::builtin();
        for language in &self.languages {
            registry.register(language.to_adapter()?);
        }
        for adapter in &self.extra_languages {
            registry.register(adapter.clone());
        }
        Ok(registry)
    }

    pub fn ignore_dirs(&self) -> BTreeSet<String> {
        DEFAULT_IGNORED_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(self.scope.ignore_dirs.iter().map(|d| d.trim().to_string()))
            .collect()
    }

    pub fn exclude_globs(&self) -> Vec<String> {
        DEFAULT_EXCLUDE_GLOBS
            .iter()
            .map(|g| g.to_string())
            .chain(self.scope.exclude_globs.iter().cloned())
            .collect()
    }
}

fn check_file_name(key: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("{} must not be empty", key);
    }
    if name.contains(['/', '\\']) {
        bail!("{} must be a file name, not a path: '{}'", key, name);
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config.validate()?;
    Ok(config)
}

/// Find and load the configuration for a run rooted at `root`.
pub fn resolve_config(explicit: Option<&Path>, root: &Path) -> Result<Config> {
    let candidate: Option<PathBuf> = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = root.join(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    };

    match candidate {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config(&path)
        }
        None => Ok(Config::default()),
    }
}
