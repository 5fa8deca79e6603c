use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::token::Span;

/// A single krug source file: the unit of compilation for the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub name: String,
    pub code: String,
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        CompilationUnit {
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        let code = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());
        Ok(CompilationUnit { name, code })
    }

    /// Returns the line containing `span` along with a caret underline for
    /// it, for rendering diagnostics against the source.
    pub fn get_line(&self, span: Span) -> (usize, String, String) {
        let code = self.code.as_bytes();
        let start = span.start.min(code.len());

        let line_num = self.code[..start].matches('\n').count() + 1;
        let line_start = self.code[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = self.code[line_start..]
            .find('\n')
            .map(|off| line_start + off)
            .unwrap_or(self.code.len());

        let line = self.code[line_start..line_end].to_string();
        let col = start - line_start;
        let width = span.len().max(1).min(line.len().saturating_sub(col).max(1));
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(width));

        (line_num, line, underline)
    }
}

/// Resolves a lex request input: an `@`-prefixed input is an absolute path
/// to read the source bytes from, anything else is the source itself.
pub fn resolve_input(input: &str) -> io::Result<String> {
    match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(Path::new(path)),
        None => Ok(input.to_string()),
    }
}
