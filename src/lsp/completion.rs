// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use serde_json::{json, Value};

use crate::core::query::{CandidateKind, CompletionCandidate};

pub fn completion_items(candidates: &[CompletionCandidate]) -> Vec<Value> {
    let items = candidates
        .iter()
        .map(|candidate| {
            let mut item = json!({
                "label": candidate.label,
                "kind": candidate_kind_to_lsp(candidate.kind),
                "detail": candidate.display,
                "insertText": candidate.insert_text,
            });
            if !candidate.documentation.is_empty() {
                item["documentation"] = json!({
                    "kind": "markdown",
                    "value": candidate.documentation,
                });
            }
            item
        })
        .collect();
    dedup_items(items)
}

fn candidate_kind_to_lsp(kind: CandidateKind) -> u32 {
    match kind {
        CandidateKind::Mnemonic | CandidateKind::Directive | CandidateKind::Keyword => 14,
        CandidateKind::Register => 6,
        CandidateKind::Label => 18,
    }
}

fn dedup_items(items: Vec<Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if seen.insert(key) {
            out.push(item);
        }
    }
    out
}
