//! Language adapter registry.
//!
//! Maps a file extension to the comment syntax its header is written in.
//! Lookups are pure: nothing here touches the filesystem.
//!
//! | Extensions | Header forms tried, in order |
//! |------------|------------------------------|
//! | `.js .jsx .mjs .cjs .ts .tsx .java` | `/** … */`, then `//` lines |
//! | `.py` | `"""…"""` / `'''…'''` docstring, then `#` lines |
//! | `.go` | `//` lines, then `/* … */` |
//!
//! Extensions outside the registry are out of scope unless added at runtime
//! with [`LanguageRegistry::register`].

use std::collections::BTreeMap;
use std::fmt;

/// One way a header comment can be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSyntax {
    /// Delimited block such as `/* … */`. Continuation lines may start with
    /// a decorative `*`.
    Block { open: String, close: String },
    /// Consecutive lines each starting with `prefix`.
    Line { prefix: String },
    /// Python module docstring delimited by `"""` or `'''`.
    DocString,
}

impl CommentSyntax {
    pub fn block(open: &str, close: &str) -> Self {
        CommentSyntax::Block {
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    pub fn line(prefix: &str) -> Self {
        CommentSyntax::Line {
            prefix: prefix.to_string(),
        }
    }
}

impl fmt::Display for CommentSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentSyntax::Block { open, close } => write!(f, "{} … {}", open, close),
            CommentSyntax::Line { prefix } => write!(f, "{} …", prefix),
            CommentSyntax::DocString => f.write_str("\"\"\" … \"\"\""),
        }
    }
}

/// Comment-syntax descriptor for one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAdapter {
    /// Lower-cased, dot-prefixed extension.
    pub extension: String,
    pub language: String,
    /// Header forms, tried in order until one matches the file's first
    /// comment.
    pub syntaxes: Vec<CommentSyntax>,
    /// Python-style `# -*- coding: … -*-` lines may precede the header.
    pub allows_encoding_line: bool,
}

impl LanguageAdapter {
    pub fn new(extension: &str, language: &str, syntaxes: Vec<CommentSyntax>) -> Self {
        Self {
            extension: normalize_extension(extension).unwrap_or_else(|| extension.to_string()),
            language: language.to_string(),
            syntaxes,
            allows_encoding_line: false,
        }
    }
}

/// Registry of every extension the checker knows how to read.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    adapters: BTreeMap<String, LanguageAdapter>,
}

impl LanguageRegistry {
    /// Empty registry; mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in languages.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let c_style = || {
            vec![
                CommentSyntax::block("/*", "*/"),
                CommentSyntax::line("//"),
            ]
        };
        for (ext, language) in [
            (".js", "JavaScript"),
            (".jsx", "JavaScript (JSX)"),
            (".mjs", "JavaScript (ES module)"),
            (".cjs", "JavaScript (CommonJS)"),
            (".ts", "TypeScript"),
            (".tsx", "TypeScript (TSX)"),
            (".java", "Java"),
        ] {
            registry.register(LanguageAdapter::new(ext, language, c_style()));
        }

        let mut python = LanguageAdapter::new(
            ".py",
            "Python",
            vec![CommentSyntax::DocString, CommentSyntax::line("#")],
        );
        python.allows_encoding_line = true;
        registry.register(python);

        registry.register(LanguageAdapter::new(
            ".go",
            "Go",
            vec![
                CommentSyntax::line("//"),
                CommentSyntax::block("/*", "*/"),
            ],
        ));
        registry
    }

    /// Add or replace the adapter for an extension.
    pub fn register(&mut self, adapter: LanguageAdapter) {
        self.adapters.insert(adapter.extension.clone(), adapter);
    }

    pub fn lookup(&self, extension: &str) -> Option<&LanguageAdapter> {
        let key = normalize_extension(extension)?;
        self.adapters.get(&key)
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.lookup(extension).is_some()
    }

    /// Adapters in extension order.
    pub fn adapters(&self) -> impl Iterator<Item = &LanguageAdapter> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Lower-case and dot-prefix an extension: `RB` → `.rb`.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('*');
    let bare = trimmed.trim_start_matches('.');
    if bare.is_empty() || bare.contains(['/', '\\', '.']) {
        return None;
    }
    Some(format!(".{}", bare.to_lowercase()))
}

/// Guess a header syntax for an extension the caller added without naming
/// one. Falls back to C-style comments.
pub fn best_effort_syntax(extension: &str) -> Vec<CommentSyntax> {
    let ext = normalize_extension(extension).unwrap_or_default();
    match ext.as_str() {
        ".rb" | ".sh" | ".bash" | ".zsh" | ".pl" | ".pm" | ".r" | ".ex" | ".exs" | ".nim"
        | ".cr" | ".jl" | ".tcl" | ".ps1" | ".coffee" => vec![CommentSyntax::line("#")],
        ".lua" | ".sql" | ".hs" | ".elm" | ".ada" => vec![CommentSyntax::line("--")],
        ".clj" | ".cljs" | ".lisp" | ".el" | ".scm" => vec![CommentSyntax::line(";;")],
        ".erl" | ".hrl" => vec![CommentSyntax::line("%")],
        ".ml" | ".mli" | ".fs" | ".fsx" => vec![CommentSyntax::block("(*", "*)")],
        ".vue" | ".svelte" | ".html" => vec![
            CommentSyntax::block("<!--", "-->"),
            CommentSyntax::block("/*", "*/"),
        ],
        _ => vec![
            CommentSyntax::block("/*", "*/"),
            CommentSyntax::line("//"),
        ],
    }
}

/// Parse a caller-supplied syntax: `#` (line prefix) or `open,close`
/// (block delimiters, e.g. `/*,*/`).
pub fn parse_syntax_spec(spec: &str) -> Result<CommentSyntax, String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err("comment syntax must not be empty".to_string());
    }
    match spec.split_once(',') {
        Some((open, close)) => {
            let (open, close) = (open.trim(), close.trim());
            if open.is_empty() || close.is_empty() {
                return Err(format!(
                    "block syntax '{}' needs both an opening and a closing token",
                    spec
                ));
            }
            Ok(CommentSyntax::block(open, close))
        }
        None => Ok(CommentSyntax::line(spec)),
    }
}

/// Parse an `--ext` argument: `.rb`, `rb`, or `.lua=--`.
pub fn parse_extension_arg(arg: &str) -> Result<LanguageAdapter, String> {
    let (ext, syntax) = match arg.split_once('=') {
        Some((ext, syntax)) => (ext, Some(syntax)),
        None => (arg, None),
    };
    let extension =
        normalize_extension(ext).ok_or_else(|| format!("invalid extension '{}'", ext))?;
    let syntaxes = match syntax {
        Some(spec) => vec![parse_syntax_spec(spec)?],
        None => best_effort_syntax(&extension),
    };
    Ok(LanguageAdapter::new(&extension, "custom", syntaxes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_required_extensions() {
        let registry = LanguageRegistry::builtin();
        for ext in [
            ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".py", ".go", ".java",
        ] {
            assert!(registry.is_registered(ext), "{} not registered", ext);
        }
        assert_eq!(registry.len(), 9);
        assert!(!registry.is_registered(".rb"));
        assert!(!registry.is_registered(".md"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.lookup("TS").unwrap().extension, ".ts");
        assert_eq!(registry.lookup(".PY").unwrap().language, "Python");
    }

    #[test]
    fn native_forms_come_first() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(
            registry.lookup(".py").unwrap().syntaxes[0],
            CommentSyntax::DocString
        );
        assert_eq!(
            registry.lookup(".go").unwrap().syntaxes[0],
            CommentSyntax::line("//")
        );
        assert_eq!(
            registry.lookup(".java").unwrap().syntaxes[0],
            CommentSyntax::block("/*", "*/")
        );
    }

    #[test]
    fn normalize_extension_variants() {
        assert_eq!(normalize_extension("rb").as_deref(), Some(".rb"));
        assert_eq!(normalize_extension(" .PHP ").as_deref(), Some(".php"));
        assert_eq!(normalize_extension("*.kt").as_deref(), Some(".kt"));
        assert_eq!(normalize_extension(""), None);
        assert_eq!(normalize_extension("."), None);
        assert_eq!(normalize_extension("tar.gz"), None);
    }

    #[test]
    fn extension_arg_with_and_without_syntax() {
        let rb = parse_extension_arg(".rb").unwrap();
        assert_eq!(rb.syntaxes, vec![CommentSyntax::line("#")]);

        let lua = parse_extension_arg("lua=--").unwrap();
        assert_eq!(lua.extension, ".lua");
        assert_eq!(lua.syntaxes, vec![CommentSyntax::line("--")]);

        let c = parse_extension_arg(".c=/*,*/").unwrap();
        assert_eq!(c.syntaxes, vec![CommentSyntax::block("/*", "*/")]);

        assert!(parse_extension_arg("=#").is_err());
        assert!(parse_extension_arg(".x=/*,").is_err());
    }

    #[test]
    fn register_overrides_builtin() {
        let mut registry = LanguageRegistry::builtin();
        registry.register(LanguageAdapter::new(
            ".ts",
            "TypeScript",
            vec![CommentSyntax::line("//")],
        ));
        assert_eq!(
            registry.lookup(".ts").unwrap().syntaxes,
            vec![CommentSyntax::line("//")]
        );
        assert_eq!(registry.len(), 9);
    }
}
