// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::path::PathBuf;
use std::time::Duration;

use crate::core::dialect::Dialect;
use crate::core::label_graph::DEFAULT_MAX_LINES;

/// Settings that change what an analysis build produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub dialect: Dialect,
    pub case_sensitive: bool,
    pub max_lines: usize,
    pub include_paths: Vec<PathBuf>,
    pub fold_begin_tag: String,
    pub fold_end_tag: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            case_sensitive: false,
            max_lines: DEFAULT_MAX_LINES,
            include_paths: Vec::new(),
            fold_begin_tag: "#region".to_string(),
            fold_end_tag: "#endregion".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet period after the last edit before a build starts.
    pub delay: Duration,
    /// Edits that may push the deadline back before a build is forced.
    pub max_resets: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_resets: 100,
        }
    }
}

impl SchedulerConfig {
    pub const MIN_DELAY: Duration = Duration::from_millis(10);

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms).max(Self::MIN_DELAY);
        self
    }
}
