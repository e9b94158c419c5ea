//! # format-doc
//!
//! A deterministic checker that keeps three layers of in-repo documentation
//! consistent with the source tree:
//!
//! 1. a metadata header at the top of every source file
//!    (`@input`, `@output`, `@position`, `@doc-sync`),
//! 2. an `INDEX.md` per folder whose file table lists the folder's files,
//! 3. a root `ARCHITECTURE.md` whose module links point at real folders.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │  Config  │──▶│   Scope   │──▶│ Folder tasks │──▶│  Report  │
//! │  (TOML)  │   │ walk + VCS│   │ header+index │   │ text/json│
//! └──────────┘   └───────────┘   └──────────────┘   └──────────┘
//!                                 ┌──────────────┐        ▲
//!                                 │ Architecture │────────┘
//!                                 └──────────────┘
//! ```
//!
//! The pure parsing and reconciliation logic lives in `format-doc-core`;
//! this crate adds file I/O, git, configuration and the CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! fdoc check .                    # whole tree
//! fdoc check . --mode changed     # working-tree changes only
//! fdoc check . --mode staged      # pre-commit hook
//! fdoc check . --format json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and CLI overrides |
//! | [`error`] | Scope and index-syntax errors, exit codes |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`scope`] | Which files a run checks |
//! | [`vcs`] | Working-tree and staging-area state from git |
//! | [`architecture`] | Root architecture file validation |
//! | [`check`] | The check pipeline |

pub mod architecture;
pub mod check;
pub mod config;
pub mod error;
pub mod logging;
pub mod scope;
pub mod vcs;
