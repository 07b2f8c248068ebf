// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::collections::{BTreeMap, HashSet};

use serde_json::{json, Value};

use crate::core::diagnostic::{AnalysisDiagnostic, Severity};
use crate::core::snapshot::AnalysisSnapshot;
use crate::lsp::definition::file_uri;

pub fn dedup_diagnostics(input: Vec<AnalysisDiagnostic>) -> Vec<AnalysisDiagnostic> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for diag in input {
        let key = (diag.code, diag.id, diag.message.clone());
        if seen.insert(key) {
            out.push(diag);
        }
    }
    out
}

/// Snapshot diagnostics keyed by the uri of the file they sit in. The root
/// document is always present so that clearing it is published too.
pub fn group_diagnostics_by_uri(
    root_uri: &str,
    snapshot: &AnalysisSnapshot,
) -> BTreeMap<String, Vec<AnalysisDiagnostic>> {
    let mut grouped: BTreeMap<String, Vec<AnalysisDiagnostic>> = BTreeMap::new();
    grouped.insert(root_uri.to_string(), Vec::new());
    for diag in dedup_diagnostics(snapshot.diagnostics()) {
        let Some(uri) = file_uri(root_uri, &snapshot.graph, diag.id.file_id) else {
            continue;
        };
        grouped.entry(uri).or_default().push(diag);
    }
    grouped
}

pub fn diagnostics_to_lsp(input: &[AnalysisDiagnostic]) -> Vec<Value> {
    input
        .iter()
        .map(|diag| {
            let id = diag.id;
            json!({
                "range": {
                    "start": {"line": id.line, "character": id.start_col},
                    "end": {"line": id.line, "character": id.end_col.max(id.start_col + 1)},
                },
                "severity": severity_to_lsp(diag.severity),
                "code": diag.code.as_str(),
                "source": "asmscope",
                "message": diag.message,
            })
        })
        .collect()
}

fn severity_to_lsp(value: Severity) -> u32 {
    match value {
        Severity::Error => 1,
        Severity::Warning => 2,
        Severity::Information => 3,
        Severity::Hint => 4,
    }
}
