// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use serde_json::{json, Value};

use crate::core::keyword_id::KeywordId;
use crate::core::label_graph::LabelGraph;
use crate::core::snapshot::DOCUMENT_FILE_ID;
use crate::lsp::session::path_to_file_uri;

/// Uri of a file in the graph. Includes without a known path have none.
pub fn file_uri(root_uri: &str, graph: &LabelGraph, file_id: u32) -> Option<String> {
    if file_id == DOCUMENT_FILE_ID {
        return Some(root_uri.to_string());
    }
    graph
        .file(file_id)
        .and_then(|file| file.path.as_deref())
        .map(path_to_file_uri)
}

pub fn keyword_locations(root_uri: &str, graph: &LabelGraph, ids: &[KeywordId]) -> Vec<Value> {
    let mut out = Vec::new();
    for id in ids {
        let Some(uri) = file_uri(root_uri, graph, id.file_id) else {
            continue;
        };
        out.push(json!({
            "uri": uri,
            "range": {
                "start": {"line": id.line, "character": id.start_col},
                "end": {"line": id.line, "character": id.end_col},
            }
        }));
    }
    dedup_locations(out)
}

fn dedup_locations(items: Vec<Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.to_string();
        if seen.insert(key) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dialect::Dialect;
    use crate::core::keyword_id::Span;
    use crate::core::line_parser::LineParser;
    use crate::core::signature_store::SignatureStore;
    use std::sync::Arc;

    #[test]
    fn document_ids_map_to_root_uri_and_unknown_files_are_skipped() {
        let parser = LineParser::new(Dialect::NasmIntel, Arc::new(SignatureStore::builtin()));
        let graph = LabelGraph::build(&parser, &["start:".to_string()], DOCUMENT_FILE_ID);
        let ids = [
            KeywordId::new(DOCUMENT_FILE_ID, 3, Span::new(0, 4)),
            KeywordId::new(DOCUMENT_FILE_ID, 3, Span::new(0, 4)),
            KeywordId::new(7, 1, Span::new(0, 2)),
        ];
        let out = keyword_locations("file:///tmp/a.asm", &graph, &ids);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["uri"], "file:///tmp/a.asm");
        assert_eq!(out[0]["range"]["end"]["character"], 4);
    }
}
