//! Minimal Markdown reading: pipe tables and inline links.
//!
//! Only what the checker needs is understood. Fenced code blocks are skipped;
//! everything else is read line by line.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use crate::models::{ArchitectureLink, FolderIndexEntry, IndexRow};

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$").expect("Invalid separator regex")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("Invalid link regex")
});

/// Header cells that mark a table as the file table.
const FILE_COLUMN_NAMES: &[&str] = &["file", "files", "filename", "file name", "name", "文件", "文件名"];

/// A pipe table with the heading it appears under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub heading: Option<String>,
    /// 1-based line of the header row.
    pub line: usize,
    pub header: Vec<String>,
    /// Body rows with their 1-based line numbers.
    pub rows: Vec<(usize, Vec<String>)>,
}

struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Lines outside fenced code blocks, numbered from 1.
fn prose_lines(text: &str) -> Vec<Line<'_>> {
    let mut fence: Option<&str> = None;
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        let marker = if trimmed.starts_with("```") {
            Some("```")
        } else if trimmed.starts_with("~~~") {
            Some("~~~")
        } else {
            None
        };
        match (fence, marker) {
            (None, Some(m)) => fence = Some(m),
            (Some(open), Some(m)) if open == m => fence = None,
            (None, None) => out.push(Line {
                number: idx + 1,
                text: raw,
            }),
            _ => {}
        }
    }
    out
}

/// ATX heading level and text, if the line is one.
fn heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim().to_string()))
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            other => current.push(other),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Every pipe table in the document.
pub fn parse_tables(text: &str) -> Vec<Table> {
    let lines = prose_lines(text);
    let mut tables = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;
        if let Some((_, title)) = heading(line) {
            current_heading = Some(title);
            i += 1;
            continue;
        }

        let is_header = line.contains('|')
            && lines
                .get(i + 1)
                .is_some_and(|next| next.text.contains('-') && SEPARATOR_RE.is_match(next.text));
        if !is_header {
            i += 1;
            continue;
        }

        let mut table = Table {
            heading: current_heading.clone(),
            line: lines[i].number,
            header: split_cells(line),
            rows: Vec::new(),
        };
        i += 2;
        while let Some(row) = lines.get(i) {
            if row.text.trim().is_empty() || !row.text.contains('|') {
                break;
            }
            table.rows.push((row.number, split_cells(row.text)));
            i += 1;
        }
        tables.push(table);
    }
    tables
}

/// Resolve CommonMark backslash escapes: `\_` is `_`. A backslash before
/// anything but ASCII punctuation is kept.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '\\' && next.is_ascii_punctuation() => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Strip Markdown decoration from a file cell. A link cell yields its target.
///
/// Emphasis and code spans are removed first, then escapes are resolved,
/// except inside a code span where backslashes are literal.
pub fn clean_file_cell(cell: &str) -> String {
    let cell = cell.trim();
    if let Some(caps) = LINK_RE.captures(cell) {
        if caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == cell.len()) {
            let target = unescape(&caps[3]);
            return crate::models::normalize_rel(strip_fragment(&target));
        }
    }

    let mut s = cell;
    let mut code_span = false;
    loop {
        let before = s;
        for marker in ["**", "__", "`", "*", "_"] {
            if s.len() > 2 * marker.len() && s.starts_with(marker) && s.ends_with(marker) {
                s = s[marker.len()..s.len() - marker.len()].trim();
                code_span |= marker == "`";
                break;
            }
        }
        if s == before {
            break;
        }
    }
    if code_span {
        crate::models::normalize_rel(s)
    } else {
        crate::models::normalize_rel(&unescape(s))
    }
}

fn is_file_table(table: &Table) -> bool {
    table
        .header
        .first()
        .map(|cell| clean_file_cell(cell).to_lowercase())
        .is_some_and(|name| FILE_COLUMN_NAMES.contains(&name.as_str()))
}

fn heading_mentions_files(table: &Table) -> bool {
    table
        .heading
        .as_deref()
        .map(str::to_lowercase)
        .is_some_and(|h| h.contains("file") || h.contains("文件"))
}

/// Why a folder index yielded no file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTableError {
    /// No table in the document looks like a file table.
    NotFound,
    /// A pipe row headed like a file table (`| File | … |`) with no delimiter
    /// row under it.
    MissingDelimiter { line: usize },
}

impl fmt::Display for FileTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileTableError::NotFound => f.write_str("no file table found"),
            FileTableError::MissingDelimiter { line } => write!(
                f,
                "file table header at line {} is not followed by a delimiter row",
                line
            ),
        }
    }
}

impl std::error::Error for FileTableError {}

/// Parse the file table of a folder index.
///
/// Tables under a files heading are accepted as a fallback. When nothing
/// qualifies, a `| File | … |` row without a delimiter row is reported as
/// [`FileTableError::MissingDelimiter`]; anything else is
/// [`FileTableError::NotFound`].
pub fn parse_file_table(folder: &str, text: &str) -> Result<FolderIndexEntry, FileTableError> {
    let tables = parse_tables(text);
    let Some(table) = tables
        .iter()
        .find(|t| is_file_table(t))
        .or_else(|| tables.iter().find(|t| heading_mentions_files(t)))
    else {
        return Err(broken_file_table(text, &tables).unwrap_or(FileTableError::NotFound));
    };

    let rows = table
        .rows
        .iter()
        .filter_map(|(line, cells)| {
            let file = clean_file_cell(cells.first()?);
            if file.is_empty() {
                return None;
            }
            Some(IndexRow {
                file,
                role: cells.get(1).cloned().unwrap_or_default(),
                responsibility: cells.get(2).cloned().unwrap_or_default(),
                line: *line,
            })
        })
        .collect();

    Ok(FolderIndexEntry {
        folder: folder.to_string(),
        rows,
    })
}

fn broken_file_table(text: &str, tables: &[Table]) -> Option<FileTableError> {
    let mut table_lines: BTreeSet<usize> = BTreeSet::new();
    for table in tables {
        table_lines.insert(table.line);
        table_lines.extend(table.rows.iter().map(|(line, _)| *line));
    }

    prose_lines(text)
        .into_iter()
        .filter(|line| !table_lines.contains(&line.number))
        .find(|line| {
            if !line.text.trim_start().starts_with('|') {
                return false;
            }
            let cells = split_cells(line.text);
            cells.len() >= 2
                && FILE_COLUMN_NAMES.contains(&clean_file_cell(&cells[0]).to_lowercase().as_str())
        })
        .map(|line| FileTableError::MissingDelimiter { line: line.number })
}

fn strip_fragment(target: &str) -> &str {
    let end = target.find(['#', '?']).unwrap_or(target.len());
    &target[..end]
}

fn is_external(target: &str) -> bool {
    if target.starts_with('#') || target.starts_with("//") {
        return true;
    }
    match target.find(':') {
        Some(idx) => {
            let scheme = &target[..idx];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && target.find('/').map_or(true, |slash| slash > idx)
        }
        None => false,
    }
}

fn is_module_heading(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.contains("module") || title.contains("模块")
}

/// Local links of an architecture document.
///
/// When the document has a section whose heading mentions modules, only links
/// inside such sections are returned; otherwise every local link is.
pub fn parse_module_links(text: &str) -> Vec<ArchitectureLink> {
    let lines = prose_lines(text);

    let mut all = Vec::new();
    let mut in_modules = Vec::new();
    let mut section: Option<usize> = None;
    let mut has_module_section = false;

    for line in &lines {
        if let Some((level, title)) = heading(line.text) {
            if section.is_some_and(|open| level <= open) {
                section = None;
            }
            if section.is_none() && is_module_heading(&title) {
                section = Some(level);
                has_module_section = true;
            }
            continue;
        }

        for caps in LINK_RE.captures_iter(line.text) {
            if !caps[1].is_empty() {
                continue;
            }
            let raw = &caps[3];
            if is_external(raw) {
                continue;
            }
            let target = strip_fragment(raw);
            if target.is_empty() {
                continue;
            }
            let link = ArchitectureLink {
                text: caps[2].trim().to_string(),
                target: target.to_string(),
                line: line.number,
            };
            if section.is_some() {
                in_modules.push(link.clone());
            }
            all.push(link);
        }
    }

    if has_module_section {
        in_modules
    } else {
        all
    }
}
