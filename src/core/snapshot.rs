// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Immutable result of one complete analysis build.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::context::AnalysisContext;
use crate::core::diagnostic::AnalysisDiagnostic;
use crate::core::folding::{fold_ranges, Folding};
use crate::core::include::FsIncludeLoader;
use crate::core::label_graph::LabelGraph;
use crate::core::line_parser::LineParser;
use crate::core::options::AnalysisOptions;

/// File id of the analysed document itself; includes get higher ids.
pub const DOCUMENT_FILE_ID: u32 = 0;

#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub version: i64,
    pub lines: Arc<Vec<String>>,
    pub path: Option<PathBuf>,
    pub options: Arc<AnalysisOptions>,
    pub graph: LabelGraph,
    pub folding: Folding,
}

impl AnalysisSnapshot {
    /// Snapshot of an empty document, used before the first build lands.
    pub fn empty(ctx: &AnalysisContext) -> Self {
        Self::build(ctx, -1, Arc::new(Vec::new()), None)
    }

    pub fn build(
        ctx: &AnalysisContext,
        version: i64,
        lines: Arc<Vec<String>>,
        path: Option<PathBuf>,
    ) -> Self {
        let started = Instant::now();
        let options = ctx.options();
        let parser = LineParser::new(options.dialect, Arc::clone(ctx.store()));
        let loader = FsIncludeLoader::new(options.include_paths.clone());
        let graph = LabelGraph::builder(&parser)
            .case_sensitive(options.case_sensitive)
            .max_lines(options.max_lines)
            .include_loader(&loader)
            .source_path(path.clone())
            .build(&lines, DOCUMENT_FILE_ID);
        let folding = fold_ranges(
            &lines,
            DOCUMENT_FILE_ID,
            options.dialect,
            &options.fold_begin_tag,
            &options.fold_end_tag,
        );
        debug!(
            version,
            lines = lines.len(),
            files = graph.files().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "analysis build finished"
        );
        Self {
            version,
            lines,
            path,
            options,
            graph,
            folding,
        }
    }

    /// Whether this snapshot crossed the line ceiling that `previous` was
    /// still under.
    pub fn newly_disabled(&self, previous: &AnalysisSnapshot) -> bool {
        previous.graph.is_enabled() && !self.graph.is_enabled()
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.lines.get(line as usize).map(String::as_str)
    }

    /// Label and folding diagnostics, ordered by position.
    pub fn diagnostics(&self) -> Vec<AnalysisDiagnostic> {
        let mut out = self.graph.diagnostics();
        out.extend(self.folding.diagnostics.iter().cloned());
        out.sort_by_key(|diag| diag.id);
        out
    }
}

/// The snapshot readers currently see. Builds publish by swapping the
/// `Arc`; the lock is held only for the swap or the clone.
#[derive(Debug)]
pub struct SnapshotSlot {
    current: Mutex<Arc<AnalysisSnapshot>>,
}

impl SnapshotSlot {
    pub fn new(initial: AnalysisSnapshot) -> Self {
        Self {
            current: Mutex::new(Arc::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<AnalysisSnapshot> {
        Arc::clone(&self.current.lock())
    }

    /// Installs `snapshot` unless a newer version is already visible.
    pub fn store(&self, snapshot: Arc<AnalysisSnapshot>) -> bool {
        let mut current = self.current.lock();
        if snapshot.version < current.version {
            return false;
        }
        *current = snapshot;
        true
    }
}
