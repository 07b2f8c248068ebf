// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Position value types shared by the parser and the label graph.
//!
//! None of these own text: a span is always resolved against the line array
//! of the file it came from.

use std::fmt;

use serde::Serialize;

/// Half-open byte column range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end.max(start) as u32,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, column: u32) -> bool {
        column >= self.start && column < self.end
    }

    /// Shifts the span right by `offset` columns.
    pub fn offset(self, offset: usize) -> Self {
        Self {
            start: self.start + offset as u32,
            end: self.end + offset as u32,
        }
    }
}

/// A line in a specific (possibly included) file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineRef {
    pub file_id: u32,
    pub line: u32,
}

impl LineRef {
    pub fn new(file_id: u32, line: u32) -> Self {
        Self { file_id, line }
    }
}

/// Identifies exactly one token occurrence. Equality and ordering are by value
/// (file, line, start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KeywordId {
    pub file_id: u32,
    pub line: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl KeywordId {
    pub fn new(file_id: u32, line: u32, span: Span) -> Self {
        Self {
            file_id,
            line,
            start_col: span.start,
            end_col: span.end,
        }
    }

    pub fn line_ref(&self) -> LineRef {
        LineRef::new(self.file_id, self.line)
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start_col,
            end: self.end_col,
        }
    }
}

impl fmt::Display for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}",
            self.file_id,
            self.line + 1,
            self.start_col + 1,
            self.end_col + 1
        )
    }
}
