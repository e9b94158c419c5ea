//! # format-doc CLI (`fdoc`)
//!
//! Checks that file headers, folder indexes and the root architecture file
//! agree with the source tree.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fdoc check <root>` | Validate documentation and print a report |
//! | `fdoc scope <root>` | Print the files a check would look at |
//! | `fdoc languages` | List registered extensions and comment syntaxes |
//! | `fdoc completions <shell>` | Print shell completions |
//!
//! ## Exit codes
//!
//! `0` no error-severity violations, `1` at least one, `2` configuration,
//! scope-resolution or index-syntax failure (nothing is reported in that case).
//!
//! ## Examples
//!
//! ```bash
//! # Pre-commit hook
//! fdoc check . --mode staged
//!
//! # CI, machine-readable
//! fdoc check . --format json
//!
//! # Treat Lua files as sources with `--` line comments
//! fdoc check . --ext .lua=--
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use format_doc::check::{resolve_scope, run_check, CheckOptions};
use format_doc::config::{resolve_config, Config, Overrides};
use format_doc::error::EXIT_FAILURE;
use format_doc::logging::init_logging;
use format_doc::scope::ScopeMode;
use format_doc::vcs::GitCli;
use format_doc_core::language::{parse_extension_arg, LanguageAdapter};
use format_doc_core::report::{JsonRenderer, ReportRenderer, TextRenderer};

/// format-doc: keep file headers, folder indexes and the architecture map in
/// step with the code.
#[derive(Parser)]
#[command(
    name = "fdoc",
    about = "Check that file headers, folder INDEX.md files and ARCHITECTURE.md match the source tree",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Defaults to `<ROOT>/.format-doc.toml` when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (`-v` info, `-vv` debug). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documentation against the source tree.
    ///
    /// Prints one line per violation and a summary. Exits 1 when any
    /// error-severity violation is found.
    Check {
        /// Repository root.
        root: PathBuf,

        /// Which files to check.
        #[arg(long, value_enum, default_value = "full")]
        mode: ScopeMode,

        /// Report format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Do not validate file headers.
        #[arg(long)]
        skip_headers: bool,

        /// Do not reconcile folder indexes.
        #[arg(long)]
        skip_index: bool,

        /// Do not validate the architecture file.
        #[arg(long)]
        skip_architecture: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print the resolved scope, one path per line.
    ///
    /// Deletion events reported by git are suffixed with ` (deleted)`.
    Scope {
        root: PathBuf,

        #[arg(long, value_enum, default_value = "full")]
        mode: ScopeMode,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List registered extensions and their comment syntaxes.
    Languages {
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

/// Values that take precedence over the configuration file.
#[derive(Args, Default)]
struct OverrideArgs {
    /// Folder index file name.
    #[arg(long)]
    index_file: Option<String>,

    /// Root architecture file name.
    #[arg(long)]
    architecture_file: Option<String>,

    /// Report a missing architecture file as a warning.
    #[arg(long)]
    relaxed_architecture: bool,

    /// Leading lines scanned for a header.
    #[arg(long)]
    max_header_lines: Option<usize>,

    /// Extra source extension, optionally with its comment syntax:
    /// `.rb`, `.lua=--`, `.css=/*,*/`. Repeatable.
    #[arg(long = "ext", value_name = "EXT[=SYNTAX]", value_parser = parse_extension_arg)]
    extensions: Vec<LanguageAdapter>,

    /// Extra directory name to skip. Repeatable.
    #[arg(long = "ignore-dir", value_name = "NAME")]
    ignore_dirs: Vec<String>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            index_file: args.index_file,
            architecture_file: args.architecture_file,
            relaxed_architecture: args.relaxed_architecture,
            max_header_lines: args.max_header_lines,
            extensions: args.extensions,
            ignore_dirs: args.ignore_dirs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load(explicit: Option<&Path>, root: &Path, overrides: OverrideArgs) -> Result<Config> {
    resolve_config(explicit, root)?.apply(overrides.into())
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check {
            root,
            mode,
            format,
            skip_headers,
            skip_index,
            skip_architecture,
            overrides,
        } => {
            let config = load(cli.config.as_deref(), &root, overrides)?;
            let options = CheckOptions {
                mode,
                skip_headers,
                skip_index,
                skip_architecture,
            };
            let report = run_check(&root, &config, options, &GitCli).await?;

            let rendered = match format {
                OutputFormat::Text => TextRenderer {
                    color: atty::is(atty::Stream::Stdout),
                }
                .render(&report),
                OutputFormat::Json => JsonRenderer.render(&report),
            };
            print!("{}", rendered);
            std::io::stdout().flush()?;
            Ok(report.exit_code())
        }
        Commands::Scope {
            root,
            mode,
            overrides,
        } => {
            let config = load(cli.config.as_deref(), &root, overrides)?;
            let scope = resolve_scope(&root, &config, mode, &GitCli)?;
            for file in &scope.files {
                println!("{}", file.path);
            }
            for file in &scope.deleted {
                println!("{} (deleted)", file.path);
            }
            Ok(0)
        }
        Commands::Languages { overrides } => {
            let config = match cli.config.as_deref() {
                Some(path) => format_doc::config::load_config(path)?,
                None => Config::default(),
            }
            .apply(overrides.into())?;
            for adapter in config.registry()?.adapters() {
                let syntaxes: Vec<String> =
                    adapter.syntaxes.iter().map(|s| s.to_string()).collect();
                println!(
                    "{:<8} {:<12} {}",
                    adapter.extension,
                    adapter.language,
                    syntaxes.join(" | ")
                );
            }
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "fdoc", &mut std::io::stdout());
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("fdoc: {:#}", e);
            ExitCode::from(EXIT_FAILURE as u8)
        }
    }
}
