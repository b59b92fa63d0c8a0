//! Diagnostic collection and rendering.
//!
//! Passes report problems here; the scheduler consults [`Diagnostics::error_count`]
//! after every pass and every stage sweep to decide whether to halt the
//! pipeline.

use crate::source::{SourceMap, Span};
use std::fmt;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A single diagnostic message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Render the diagnostic with source context.
    pub fn render(&self, source_map: &SourceMap) -> String {
        let mut output = String::new();

        let severity_str = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(span) = self.span {
            if let Some(source) = source_map.get(span.source) {
                let (line, col) = source.line_col(span.start as usize);
                output.push_str(&format!("  --> {}:{}:{}\n", source.name(), line, col));
            }
        }

        for note in &self.notes {
            output.push_str(&format!("  = note: {}\n", note));
        }

        output
    }
}

/// Accumulated diagnostics plus the counters the scheduler polls.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    errors_found: usize,
    warnings_found: usize,
    /// Set while the parser is skipping to a recovery point.
    pub in_panic_mode: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors_found += 1,
            Severity::Warning => self.warnings_found += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diag);
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::error(message).with_span(span));
    }

    pub fn error_no_span(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::warning(message).with_span(span));
    }

    pub fn has_errors(&self) -> bool {
        self.errors_found > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors_found
    }

    pub fn warning_count(&self) -> usize {
        self.warnings_found
    }

    /// Reset counters and panic mode before a fresh compilation unit.
    /// Already-collected diagnostics are kept for rendering.
    pub fn clear_counts(&mut self) {
        self.errors_found = 0;
        self.warnings_found = 0;
        self.in_panic_mode = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Render all diagnostics.
    pub fn render(&self, source_map: &SourceMap) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diag in &self.diagnostics {
            writeln!(
                f,
                "{}: {}",
                match diag.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Note => "note",
                },
                diag.message
            )?;
        }
        Ok(())
    }
}
