//! File header parsing and validation.
//!
//! A header is the first leading comment of a file that carries at least one
//! metadata field (`@input`, `@output`, `@position`, `@doc-sync`). Leading
//! comments without fields (licence banners, build tags) are skipped; the
//! search stops at the first line that is neither blank nor a comment, so a
//! header below code is never recognized.
//!
//! Only structural presence is checked. What a field says is up to its
//! author.

use crate::language::{CommentSyntax, LanguageAdapter};
use crate::models::{HeaderField, HeaderRecord, Violation, ViolationKind};

/// Outcome of looking for a header in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderScan {
    Found(HeaderRecord),
    /// No header; the string says why.
    Missing(String),
}

enum CommentMatch {
    /// Comment body lines (delimiters removed) and the index after it.
    Complete(Vec<String>, usize),
    /// A comment whose closing line continues with code; nothing after it is
    /// leading.
    FollowedByCode(Vec<String>),
    Unterminated,
}

/// Locate and parse the header of `content`, scanning at most `max_lines`
/// lines.
pub fn scan_header(content: &str, adapter: &LanguageAdapter, max_lines: usize) -> HeaderScan {
    let lines: Vec<&str> = content
        .trim_start_matches('\u{feff}')
        .lines()
        .take(max_lines)
        .collect();

    let mut idx = 0;
    if lines.first().is_some_and(|l| l.starts_with("#!")) {
        idx = 1;
    }
    if adapter.allows_encoding_line && lines.get(idx).is_some_and(|l| is_encoding_line(l)) {
        idx += 1;
    }

    let mut saw_comment = false;
    loop {
        while lines.get(idx).is_some_and(|l| l.trim().is_empty()) {
            idx += 1;
        }
        if idx >= lines.len() {
            break;
        }

        let matched = adapter
            .syntaxes
            .iter()
            .find_map(|syntax| match_comment(&lines, idx, syntax));

        match matched {
            Some(CommentMatch::Complete(body, next)) => {
                saw_comment = true;
                let record = parse_fields(&body);
                if !record.is_empty() {
                    return HeaderScan::Found(record);
                }
                idx = next;
            }
            Some(CommentMatch::FollowedByCode(body)) => {
                saw_comment = true;
                let record = parse_fields(&body);
                if !record.is_empty() {
                    return HeaderScan::Found(record);
                }
                break;
            }
            Some(CommentMatch::Unterminated) => {
                return HeaderScan::Missing(format!(
                    "leading comment is not closed within the first {} lines",
                    max_lines
                ));
            }
            None => break,
        }
    }

    if saw_comment {
        HeaderScan::Missing("leading comments carry no metadata fields".to_string())
    } else {
        HeaderScan::Missing("no leading header comment".to_string())
    }
}

/// Turn a scan result into violations for the file at `path`.
pub fn validate_header(path: &str, scan: &HeaderScan) -> Vec<Violation> {
    let record = match scan {
        HeaderScan::Missing(reason) => {
            return vec![Violation::new(ViolationKind::HeaderMissing, path, reason.clone())];
        }
        HeaderScan::Found(record) => record,
    };

    let mut violations = Vec::new();
    for field in HeaderField::ALL {
        match record.fields.get(&field) {
            None => violations.push(Violation::new(
                ViolationKind::HeaderFieldMissing { field },
                path,
                format!("header has no {} line", field),
            )),
            Some(values) => {
                if values.len() > 1 {
                    violations.push(Violation::new(
                        ViolationKind::DuplicateHeaderField { field },
                        path,
                        format!("{} appears {} times", field, values.len()),
                    ));
                }
                if values.iter().any(|v| v.is_empty()) {
                    violations.push(Violation::new(
                        ViolationKind::HeaderFieldEmpty { field },
                        path,
                        format!("{} has no text", field),
                    ));
                }
            }
        }
    }
    violations
}

/// Scan and validate in one step.
pub fn check_header(
    path: &str,
    content: &str,
    adapter: &LanguageAdapter,
    max_lines: usize,
) -> Vec<Violation> {
    validate_header(path, &scan_header(content, adapter, max_lines))
}

fn is_encoding_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('#') && (line.contains("coding:") || line.contains("coding="))
}

fn match_comment(lines: &[&str], idx: usize, syntax: &CommentSyntax) -> Option<CommentMatch> {
    match syntax {
        CommentSyntax::Block { open, close } => match_block(lines, idx, open, close),
        CommentSyntax::Line { prefix } => match_lines(lines, idx, prefix),
        CommentSyntax::DocString => match_docstring(lines, idx),
    }
}

fn match_block(lines: &[&str], idx: usize, open: &str, close: &str) -> Option<CommentMatch> {
    let first = lines[idx].trim_start().strip_prefix(open)?;
    collect_until(lines, idx, first, close, strip_block_decoration)
}

fn match_docstring(lines: &[&str], idx: usize) -> Option<CommentMatch> {
    let trimmed = lines[idx].trim_start();
    let unprefixed = trimmed
        .strip_prefix(['r', 'R', 'u', 'U'])
        .filter(|rest| rest.starts_with("\"\"\"") || rest.starts_with("'''"))
        .unwrap_or(trimmed);
    let delim = ["\"\"\"", "'''"]
        .into_iter()
        .find(|d| unprefixed.starts_with(d))?;
    let first = &unprefixed[delim.len()..];
    collect_until(lines, idx, first, delim, str::trim)
}

fn collect_until(
    lines: &[&str],
    idx: usize,
    first: &str,
    close: &str,
    clean: fn(&str) -> &str,
) -> Option<CommentMatch> {
    if let Some(end) = first.find(close) {
        let body = vec![clean(&first[..end]).to_string()];
        return Some(closed(body, &first[end + close.len()..], idx + 1));
    }

    let mut body = vec![clean(first).to_string()];
    for (offset, line) in lines[idx + 1..].iter().enumerate() {
        if let Some(end) = line.find(close) {
            body.push(clean(&line[..end]).to_string());
            return Some(closed(body, &line[end + close.len()..], idx + offset + 2));
        }
        body.push(clean(line).to_string());
    }
    Some(CommentMatch::Unterminated)
}

fn closed(body: Vec<String>, rest: &str, next: usize) -> CommentMatch {
    if rest.trim().is_empty() {
        CommentMatch::Complete(body, next)
    } else {
        CommentMatch::FollowedByCode(body)
    }
}

fn strip_block_decoration(line: &str) -> &str {
    line.trim().trim_start_matches('*').trim()
}

fn match_lines(lines: &[&str], idx: usize, prefix: &str) -> Option<CommentMatch> {
    let repeat = prefix.chars().last().unwrap_or(' ');
    let mut body = Vec::new();
    let mut next = idx;
    while let Some(rest) = lines
        .get(next)
        .and_then(|l| l.trim_start().strip_prefix(prefix))
    {
        body.push(rest.trim_start_matches([repeat, '!']).trim().to_string());
        next += 1;
    }
    if body.is_empty() {
        None
    } else {
        Some(CommentMatch::Complete(body, next))
    }
}

/// Extract metadata fields from cleaned comment lines. A non-tag line right
/// after a field continues that field's value.
fn parse_fields(body: &[String]) -> HeaderRecord {
    let mut record = HeaderRecord::default();
    let mut current: Option<HeaderField> = None;

    for line in body {
        if let Some((field, value)) = parse_field_line(line) {
            record.insert(field, value);
            current = Some(field);
            continue;
        }
        if line.is_empty() || line.starts_with('@') {
            current = None;
            continue;
        }
        if let Some(field) = current {
            if let Some(last) = record.fields.get_mut(&field).and_then(|v| v.last_mut()) {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(line);
            }
        }
    }
    record
}

fn parse_field_line(line: &str) -> Option<(HeaderField, &str)> {
    for field in HeaderField::ALL {
        for spelling in field.spellings() {
            let Some(rest) = line.strip_prefix(spelling) else {
                continue;
            };
            let boundary = rest
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || c == ':');
            if boundary {
                return Some((field, rest.trim_start_matches(':').trim()));
            }
        }
    }
    None
}
