//! Source file loading and source-name expansion.
//!
//! The [`SourceMap`] owns every loaded file for the process lifetime and
//! provides idempotent loading: asking for the same path twice reports
//! `already_loaded` so the driver can skip files reachable through more
//! than one input spelling.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::compiler::CompileError;

/// Unique identifier for a loaded source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceId(pub u32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file[{}]", self.0)
    }
}

/// A loaded source file.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    /// Canonicalized path; `None` for inline sources in tests.
    pub path: Option<PathBuf>,
    pub content: String,
}

impl Source {
    /// Path shown in diagnostics and the lex-only dump. Inline sources
    /// have no path and get a synthetic name.
    pub fn name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("<inline:{}>", self.id.0),
        }
    }

    /// 1-based line and column for a byte offset.
    ///
    /// Offsets past the end clamp to the last position, so diagnostics
    /// anchored at EOF still render.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let prefix = &self.content.as_bytes()[..offset];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = prefix
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let col = self.content[line_start..offset].chars().count() + 1;
        (line, col)
    }
}

/// A byte range in one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub source: SourceId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: SourceId, start: u32, end: u32) -> Self {
        Self { source, start, end }
    }

    pub fn merge(self, other: Self) -> Self {
        debug_assert_eq!(self.source, other.source);
        Self {
            source: self.source,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Owns all loaded sources; loading is idempotent by canonical path.
#[derive(Debug, Default)]
pub struct SourceMap {
    sources: Vec<Source>,
    path_to_id: FxHashMap<PathBuf, SourceId>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file, returning its id and whether it was already loaded.
    ///
    /// A second load of the same canonical path does no I/O and reports
    /// `already_loaded = true`; the driver must not re-parse it.
    pub fn load(&mut self, path: &Path) -> io::Result<(SourceId, bool)> {
        let canonical = path.canonicalize()?;
        if let Some(&id) = self.path_to_id.get(&canonical) {
            return Ok((id, true));
        }
        let content = fs::read_to_string(&canonical)?;
        let id = SourceId(self.sources.len() as u32);
        self.path_to_id.insert(canonical.clone(), id);
        self.sources.push(Source {
            id,
            path: Some(canonical),
            content,
        });
        Ok((id, false))
    }

    /// Add an inline source (tests).
    pub fn add_inline(&mut self, content: impl Into<String>) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(Source {
            id,
            path: None,
            content: content.into(),
        });
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn is_c3_file(path: &Path) -> bool {
    path.extension().map(|e| e == "c3").unwrap_or(false)
}

fn add_wildcard_files(files: &mut Vec<PathBuf>, dir: &Path, recursive: bool) {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && is_c3_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
}

/// Expand a build target's source-name list.
///
/// Accepts literal `.c3` paths, one-level wildcards (`dir/*`, bare `*`)
/// and recursive wildcards (`dir/**`, bare `**`). Anything else is a
/// configuration error.
pub fn expand_source_names(names: &[String]) -> Result<Vec<PathBuf>, CompileError> {
    let mut files = Vec::new();
    for name in names {
        let len = name.len();
        if len == 0 {
            return Err(invalid_source_name(name));
        }
        if name.ends_with('*') {
            if len == 1 || name.as_bytes()[len - 2] == b'/' {
                let dir = &name[..len - 1];
                add_wildcard_files(&mut files, Path::new(dir), false);
                continue;
            }
            if name.as_bytes()[len - 2] != b'*' {
                return Err(invalid_source_name(name));
            }
            if len == 2 || name.as_bytes()[len - 3] == b'/' {
                let dir = &name[..len - 2];
                add_wildcard_files(&mut files, Path::new(dir), true);
                continue;
            }
            return Err(invalid_source_name(name));
        }
        if len < 4 || !name.ends_with(".c3") {
            return Err(invalid_source_name(name));
        }
        files.push(PathBuf::from(name));
    }
    Ok(files)
}

fn invalid_source_name(name: &str) -> CompileError {
    CompileError::Config(format!(
        "File names must end with .c3 or they cannot be compiled: '{}' is invalid.",
        name
    ))
}
