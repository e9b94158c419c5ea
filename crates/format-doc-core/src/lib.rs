//! # format-doc core
//!
//! Pure logic for the format-doc documentation checker: the violation model,
//! the comment-syntax registry, header and Markdown parsing, reconciliation
//! of indexes and architecture links, and report rendering.
//!
//! This crate does no filesystem, process, or terminal I/O. Callers read
//! files and answer existence questions; everything here is a function of
//! its inputs.

pub mod header;
pub mod language;
pub mod markdown;
pub mod models;
pub mod reconcile;
pub mod report;
