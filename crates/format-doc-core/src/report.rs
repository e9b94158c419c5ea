//! Violation aggregation and report rendering.
//!
//! A [`Report`] is built once from every violation a run produced. It drops
//! duplicates by `(kind, subject)` and sorts by subject then kind, so the
//! rendered output depends only on the tree, never on the order in which
//! workers finished.

use serde::Serialize;

use crate::models::{HeaderField, Severity, Violation};

/// Exit status when no error-severity violation was found.
pub const EXIT_CLEAN: i32 = 0;
/// Exit status when at least one error-severity violation was found.
pub const EXIT_VIOLATIONS: i32 = 1;

/// The final, immutable result of one run.
#[derive(Debug, Clone)]
pub struct Report {
    pub mode: String,
    /// Source files in scope.
    pub files: usize,
    /// Folders whose index was reconciled.
    pub folders: usize,
    violations: Vec<Violation>,
}

impl Report {
    pub fn new(
        mode: impl Into<String>,
        files: usize,
        folders: usize,
        violations: impl IntoIterator<Item = Violation>,
    ) -> Self {
        let mut violations: Vec<Violation> = violations.into_iter().collect();
        violations.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| b.severity.cmp(&a.severity))
                .then_with(|| a.detail.cmp(&b.detail))
        });
        violations.dedup_by(|later, earlier| later.kind == earlier.kind && later.subject == earlier.subject);

        Self {
            mode: mode.into(),
            files,
            folders,
            violations,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(Violation::is_error)
    }

    /// `0` when nothing has error severity, `1` otherwise. Warnings never
    /// change the exit status.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            EXIT_VIOLATIONS
        } else {
            EXIT_CLEAN
        }
    }
}

/// Turns a report into the text printed on stdout.
pub trait ReportRenderer {
    fn render(&self, report: &Report) -> String;
}

/// Human-readable report: one line per violation and a summary line.
pub struct TextRenderer {
    /// Wrap severity labels in ANSI colour codes.
    pub color: bool,
}

impl TextRenderer {
    fn label(&self, severity: Severity) -> String {
        let padded = format!("{:<7}", severity.label());
        if !self.color {
            return padded;
        }
        let code = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
        };
        format!("\x1b[{}m{}\x1b[0m", code, padded)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

impl ReportRenderer for TextRenderer {
    fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        for v in report.violations() {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                self.label(v.severity),
                v.kind,
                v.subject,
                v.detail
            ));
        }
        out.push_str(&format!(
            "fdoc: {}, {} in {} across {} ({} mode)\n",
            plural(report.error_count(), "error"),
            plural(report.warning_count(), "warning"),
            plural(report.files, "file"),
            plural(report.folders, "folder"),
            report.mode
        ));
        out
    }
}

/// Machine-readable report: a single pretty-printed JSON document.
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonReport<'a> {
    mode: &'a str,
    files: usize,
    folders: usize,
    errors: usize,
    warnings: usize,
    violations: Vec<JsonViolation<'a>>,
}

#[derive(Serialize)]
struct JsonViolation<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<HeaderField>,
    subject: &'a str,
    detail: &'a str,
    severity: Severity,
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &Report) -> String {
        let doc = JsonReport {
            mode: &report.mode,
            files: report.files,
            folders: report.folders,
            errors: report.error_count(),
            warnings: report.warning_count(),
            violations: report
                .violations()
                .iter()
                .map(|v| JsonViolation {
                    kind: v.kind.name(),
                    field: v.kind.field(),
                    subject: &v.subject,
                    detail: &v.detail,
                    severity: v.severity,
                })
                .collect(),
        };
        let mut out = serde_json::to_string_pretty(&doc).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        });
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationKind;

    fn sample() -> Vec<Violation> {
        vec![
            Violation::new(ViolationKind::UnlinkedModule, "billing", "no link"),
            Violation::new(ViolationKind::IndexRowMissing, "auth.go", "not listed"),
            Violation::new(ViolationKind::HeaderMissing, "auth.go", "no header"),
            Violation::new(ViolationKind::HeaderMissing, "auth.go", "no header"),
        ]
    }

    #[test]
    fn sorted_and_deduplicated() {
        let report = Report::new("full", 2, 1, sample());
        let got: Vec<_> = report
            .violations()
            .iter()
            .map(|v| (v.subject.as_str(), v.kind))
            .collect();
        assert_eq!(
            got,
            vec![
                ("auth.go", ViolationKind::HeaderMissing),
                ("auth.go", ViolationKind::IndexRowMissing),
                ("billing", ViolationKind::UnlinkedModule),
            ]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut reversed = sample();
        reversed.reverse();
        let a = TextRenderer { color: false }.render(&Report::new("full", 2, 1, sample()));
        let b = TextRenderer { color: false }.render(&Report::new("full", 2, 1, reversed));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_fields_are_not_merged() {
        let report = Report::new(
            "full",
            1,
            1,
            vec![
                Violation::new(
                    ViolationKind::HeaderFieldMissing {
                        field: HeaderField::Output,
                    },
                    "a.ts",
                    "x",
                ),
                Violation::new(
                    ViolationKind::HeaderFieldMissing {
                        field: HeaderField::Input,
                    },
                    "a.ts",
                    "y",
                ),
            ],
        );
        assert_eq!(report.violations().len(), 2);
        assert_eq!(
            report.violations()[0].kind.field(),
            Some(HeaderField::Input)
        );
    }

    #[test]
    fn exit_code_ignores_warnings() {
        let warn_only = Report::new(
            "full",
            0,
            0,
            vec![Violation::new(ViolationKind::UnlinkedModule, "x", "y")],
        );
        assert_eq!(warn_only.exit_code(), EXIT_CLEAN);
        assert_eq!(warn_only.warning_count(), 1);

        let with_error = Report::new("full", 2, 1, sample());
        assert_eq!(with_error.exit_code(), EXIT_VIOLATIONS);
        assert_eq!(with_error.error_count(), 2);

        assert_eq!(Report::new("staged", 0, 0, vec![]).exit_code(), EXIT_CLEAN);
    }

    #[test]
    fn text_rendering() {
        let text = TextRenderer { color: false }.render(&Report::new("full", 2, 1, sample()));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "error   HeaderMissing auth.go: no header");
        assert_eq!(lines[2], "warning UnlinkedModule billing: no link");
        assert_eq!(
            lines[3],
            "fdoc: 2 errors, 1 warning in 2 files across 1 folder (full mode)"
        );
    }

    #[test]
    fn colour_only_wraps_labels() {
        let text = TextRenderer { color: true }.render(&Report::new("full", 2, 1, sample()));
        assert!(text.starts_with("\x1b[31merror  \x1b[0m HeaderMissing"));
    }

    #[test]
    fn json_rendering() {
        let report = Report::new(
            "changed",
            1,
            1,
            vec![Violation::new(
                ViolationKind::HeaderFieldEmpty {
                    field: HeaderField::DocSync,
                },
                "a.py",
                "@doc-sync has no text",
            )],
        );
        let json: serde_json::Value =
            serde_json::from_str(&JsonRenderer.render(&report)).unwrap();
        assert_eq!(json["mode"], "changed");
        assert_eq!(json["errors"], 1);
        assert_eq!(json["violations"][0]["kind"], "HeaderFieldEmpty");
        assert_eq!(json["violations"][0]["field"], "@doc-sync");
        assert_eq!(json["violations"][0]["severity"], "error");
    }
}
