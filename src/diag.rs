//! Structured diagnostics for lexing and parsing.
//!
//! The collector accumulates diagnostics while scanning and parsing;
//! rendering against the original source is deferred to [`DiagCollector::dump`].

use std::io;

use crate::token::Token;
use crate::value::Completion;

/// Byte range of a token or phrase in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    /// Zero-width span, used by the end-of-file token.
    pub fn point(at: usize) -> Span {
        Span { start: at, end: at }
    }
}

/// A message anchored to a source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// One reported problem: stable code, message, labels, optional note/help.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub primary: Option<Label>,
    pub secondary: Vec<Label>,
    pub note: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            code,
            message: message.into(),
            primary: None,
            secondary: Vec::new(),
            note: None,
            help: None,
        }
    }

    pub fn with_primary_label(mut self, span: Span, message: impl Into<String>) -> Diagnostic {
        self.primary = Some(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Diagnostic {
        self.secondary.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Diagnostic {
        self.note = Some(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Diagnostic {
        self.help = Some(help.into());
        self
    }
}

/// Accumulates diagnostics against one source text.
#[derive(Debug)]
pub struct DiagCollector {
    source: String,
    pub diags: Vec<Diagnostic>,
}

impl DiagCollector {
    pub fn new(source: &str) -> DiagCollector {
        DiagCollector {
            source: source.to_string(),
            diags: Vec::new(),
        }
    }

    pub fn emit(&mut self, d: Diagnostic) {
        self.diags.push(d);
    }

    /// Records the diagnostic and produces the completion that unwinds the
    /// parse.
    pub fn fatal(&mut self, d: Diagnostic) -> Completion {
        self.emit(d);
        Completion::exception("parse error")
    }

    pub fn expected(&mut self, expected: &str, got: &Token) -> Completion {
        self.fatal(
            Diagnostic::error(
                "E0100",
                format!("expected {}, found {}", expected, got.kind.name()),
            )
            .with_primary_label(got.span, format!("expected {} here", expected)),
        )
    }

    pub fn unexpected(&mut self, got: &Token, context: &str) -> Completion {
        let message = if context.is_empty() {
            format!("unexpected {}", got.kind.name())
        } else {
            format!("unexpected {} in {}", got.kind.name(), context)
        };
        self.fatal(
            Diagnostic::error("E0101", message).with_primary_label(got.span, "unexpected token"),
        )
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diags.iter().any(|d| d.code == code)
    }

    /// Renders every diagnostic against the source.
    pub fn dump(&self, w: &mut dyn io::Write) -> io::Result<()> {
        self.render(w, true)
    }

    /// Renders to a string, without colors.
    pub fn format(&self) -> String {
        let mut out = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.render(&mut out, false);
        String::from_utf8_lossy(&out).into_owned()
    }

    fn render(&self, w: &mut dyn io::Write, color: bool) -> io::Result<()> {
        use ariadne::{Color, Config, Report, ReportKind, Source};

        const SRC: &str = "<script>";

        for d in &self.diags {
            let anchor = d.primary.as_ref().map(|l| l.span).unwrap_or(Span::point(0));

            let mut report = Report::build(ReportKind::Error, (SRC, anchor.start..anchor.end))
                .with_config(Config::default().with_color(color))
                .with_code(d.code)
                .with_message(&d.message);

            if let Some(primary) = &d.primary {
                report = report.with_label(
                    ariadne::Label::new((SRC, primary.span.start..primary.span.end))
                        .with_message(&primary.message)
                        .with_color(Color::Red),
                );
            }

            for secondary in &d.secondary {
                report = report.with_label(
                    ariadne::Label::new((SRC, secondary.span.start..secondary.span.end))
                        .with_message(&secondary.message)
                        .with_color(Color::Yellow),
                );
            }

            if let Some(note) = &d.note {
                report = report.with_note(note);
            }
            if let Some(help) = &d.help {
                report = report.with_help(help);
            }

            report
                .finish()
                .write((SRC, Source::from(self.source.as_str())), &mut *w)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_records_codes() {
        let mut diag = DiagCollector::new("var x 42");
        diag.emit(
            Diagnostic::error("E0103", "expected '=' in variable declaration")
                .with_primary_label(Span::new(6, 8), "expected '=' here"),
        );
        assert!(diag.has_code("E0103"));
        assert!(!diag.has_code("E0100"));
    }

    #[test]
    fn fatal_produces_a_parse_error_completion() {
        let mut diag = DiagCollector::new("");
        let completion = diag.fatal(Diagnostic::error("E0100", "expected value"));
        match completion {
            Completion::Exception(v) => {
                assert_eq!(crate::ops::as_string(&v).unwrap().as_ref(), "parse error")
            }
            c => panic!("unexpected completion: {:?}", c),
        }
        assert_eq!(diag.diags.len(), 1);
    }

    #[test]
    fn format_renders_code_and_source() {
        let mut diag = DiagCollector::new("var x 42");
        diag.emit(
            Diagnostic::error("E0103", "expected '=' in variable declaration")
                .with_primary_label(Span::new(6, 8), "expected '=' here")
                .with_help("add '=' followed by an initial value"),
        );
        let rendered = diag.format();
        assert!(rendered.contains("E0103"));
        assert!(rendered.contains("var x 42"));
        assert!(rendered.contains("expected '=' here"));
    }
}
