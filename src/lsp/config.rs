// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use crate::core::arch::ArchSet;
use crate::core::dialect::Dialect;
use crate::core::label_graph::DEFAULT_MAX_LINES;
use crate::core::options::{AnalysisOptions, SchedulerConfig};
use crate::core::performance::MicroArchSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub debounce_ms: u64,
    pub max_resets: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            debounce_ms: scheduler.delay.as_millis() as u64,
            max_resets: scheduler.max_resets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    pub enabled: bool,
    pub use_capitals: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_capitals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingConfig {
    pub begin_tag: String,
    pub end_tag: String,
}

impl Default for FoldingConfig {
    fn default() -> Self {
        let options = AnalysisOptions::default();
        Self {
            begin_tag: options.fold_begin_tag,
            end_tag: options.fold_end_tag,
        }
    }
}

/// Server settings, read from the `asmscope` key of the client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LspConfig {
    pub dialect: Dialect,
    pub case_sensitive: bool,
    /// Empty means the default architecture set.
    pub architectures: Vec<String>,
    pub signature_files: Vec<String>,
    /// Empty means Haswell and SkylakeX.
    pub micro_architectures: Vec<String>,
    pub performance_files: Vec<String>,
    pub include_paths: Vec<String>,
    pub max_lines: usize,
    pub analysis: AnalysisConfig,
    pub completion: CompletionConfig,
    pub hover_enabled: bool,
    pub hover_performance: bool,
    pub signature_help_enabled: bool,
    pub folding: FoldingConfig,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            case_sensitive: false,
            architectures: Vec::new(),
            signature_files: Vec::new(),
            micro_architectures: Vec::new(),
            performance_files: Vec::new(),
            include_paths: Vec::new(),
            max_lines: DEFAULT_MAX_LINES,
            analysis: AnalysisConfig::default(),
            completion: CompletionConfig::default(),
            hover_enabled: true,
            hover_performance: true,
            signature_help_enabled: true,
            folding: FoldingConfig::default(),
        }
    }
}

impl LspConfig {
    pub fn update_from_workspace_settings(&mut self, settings: Option<&Value>) {
        let Some(settings) = settings else {
            return;
        };
        let Some(root) = settings.get("asmscope") else {
            return;
        };

        if let Some(name) = root.get("dialect").and_then(Value::as_str) {
            match name.parse() {
                Ok(dialect) => self.dialect = dialect,
                Err(err) => warn!(%err, "ignoring dialect setting"),
            }
        }
        if let Some(flag) = root.get("caseSensitive").and_then(Value::as_bool) {
            self.case_sensitive = flag;
        }
        if let Some(archs) = read_string_array(root.get("architectures")) {
            self.architectures = archs;
        }
        if let Some(files) = read_string_array(root.get("signatureFiles")) {
            self.signature_files = files;
        }
        if let Some(archs) = read_string_array(root.get("microArchitectures")) {
            self.micro_architectures = archs;
        }
        if let Some(files) = read_string_array(root.get("performanceFiles")) {
            self.performance_files = files;
        }
        if let Some(paths) = read_string_array(root.get("includePaths")) {
            self.include_paths = paths;
        }
        if let Some(max) = root.get("maxLines").and_then(Value::as_u64) {
            self.max_lines = max as usize;
        }
        if let Some(analysis) = root.get("analysis") {
            if let Some(ms) = analysis.get("debounceMs").and_then(Value::as_u64) {
                self.analysis.debounce_ms = ms.max(SchedulerConfig::MIN_DELAY.as_millis() as u64);
            }
            if let Some(resets) = analysis.get("maxResets").and_then(Value::as_u64) {
                self.analysis.max_resets = resets.min(u32::MAX as u64) as u32;
            }
        }
        if let Some(completion) = root.get("completion") {
            if let Some(enabled) = completion.get("enabled").and_then(Value::as_bool) {
                self.completion.enabled = enabled;
            }
            if let Some(capitals) = completion.get("useCapitals").and_then(Value::as_bool) {
                self.completion.use_capitals = capitals;
            }
        }
        if let Some(hover) = root.get("hover") {
            if let Some(enabled) = hover.get("enabled").and_then(Value::as_bool) {
                self.hover_enabled = enabled;
            }
            if let Some(performance) = hover.get("performance").and_then(Value::as_bool) {
                self.hover_performance = performance;
            }
        }
        if let Some(enabled) = read_enabled(root.get("signatureHelp")) {
            self.signature_help_enabled = enabled;
        }
        if let Some(folding) = root.get("folding") {
            if let Some(tag) = read_non_empty_string(folding.get("beginTag")) {
                self.folding.begin_tag = tag;
            }
            if let Some(tag) = read_non_empty_string(folding.get("endTag")) {
                self.folding.end_tag = tag;
            }
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            dialect: self.dialect,
            case_sensitive: self.case_sensitive,
            max_lines: self.max_lines,
            include_paths: self.include_paths.iter().map(PathBuf::from).collect(),
            fold_begin_tag: self.folding.begin_tag.clone(),
            fold_end_tag: self.folding.end_tag.clone(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_resets: self.analysis.max_resets,
            ..SchedulerConfig::default()
        }
        .with_delay_ms(self.analysis.debounce_ms)
    }

    /// Unknown names are logged and left out.
    pub fn enabled_archs(&self) -> ArchSet {
        if self.architectures.is_empty() {
            return ArchSet::default_enabled();
        }
        let (archs, unknown) = ArchSet::parse_list(&self.architectures.join(","));
        if !unknown.is_empty() {
            warn!(?unknown, "ignoring unknown architectures");
        }
        archs
    }

    pub fn signature_paths(&self) -> Vec<PathBuf> {
        self.signature_files.iter().map(PathBuf::from).collect()
    }

    /// Microarchitectures shown in hover; empty when timings are off.
    pub fn micro_archs(&self) -> MicroArchSet {
        if !self.hover_performance {
            return MicroArchSet::empty();
        }
        if self.micro_architectures.is_empty() {
            return MicroArchSet::default_enabled();
        }
        let (archs, unknown) = MicroArchSet::parse_list(&self.micro_architectures.join(","));
        if !unknown.is_empty() {
            warn!(?unknown, "ignoring unknown microarchitectures");
        }
        archs
    }

    pub fn performance_paths(&self) -> Vec<PathBuf> {
        self.performance_files.iter().map(PathBuf::from).collect()
    }
}

fn read_string_array(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect()
    })
}

fn read_non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string)
}

fn read_enabled(section: Option<&Value>) -> Option<bool> {
    section?.get("enabled").and_then(Value::as_bool)
}
