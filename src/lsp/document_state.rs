// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::path::PathBuf;
use std::sync::Arc;

/// Editor text of one open document. Analysis results live in the
/// document's worker; this is only what the client last sent.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub uri: String,
    pub path: Option<PathBuf>,
    pub version: i64,
    pub lines: Arc<Vec<String>>,
}

impl DocumentState {
    pub fn new(uri: String, path: Option<PathBuf>, version: i64, text: &str) -> Self {
        Self {
            uri,
            path,
            version,
            lines: Arc::new(split_lines(text)),
        }
    }

    pub fn replace_text(&mut self, version: i64, text: &str) {
        self.version = version;
        self.lines = Arc::new(split_lines(text));
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(String::as_str)
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}
