// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::context::AnalysisContext;
use crate::core::folding::FoldRange;
use crate::core::performance::PerformanceStore;
use crate::core::query::QueryFacade;
use crate::core::scheduler::{DocumentWorker, SnapshotReady};
use crate::core::signature_store::SignatureStore;
use crate::core::snapshot::AnalysisSnapshot;
use crate::lsp::completion::completion_items;
use crate::lsp::config::LspConfig;
use crate::lsp::definition::keyword_locations;
use crate::lsp::diagnostics::{diagnostics_to_lsp, group_diagnostics_by_uri};
use crate::lsp::document_state::DocumentState;
use crate::lsp::hover::hover_response;
use crate::lsp::signature_help::signature_help_response;

#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Response {
        id: Value,
        result: Value,
    },
    Error {
        id: Value,
        code: i64,
        message: String,
    },
    Notification {
        method: String,
        params: Value,
    },
}

pub struct LspSession {
    config: LspConfig,
    ctx: Arc<AnalysisContext>,
    loaded_signature_files: Vec<String>,
    loaded_performance_files: Vec<String>,
    documents: HashMap<String, DocumentState>,
    workers: HashMap<String, DocumentWorker>,
    ready_tx: Sender<SnapshotReady>,
    ready_rx: Receiver<SnapshotReady>,
    published_uris_by_root: HashMap<String, HashSet<String>>,
    shutdown_requested: bool,
}

/// What a positional request works on: the client's current line text and
/// the last completed snapshot.
struct QueryTarget {
    uri: String,
    line: u32,
    character: usize,
    line_text: String,
    snapshot: Arc<AnalysisSnapshot>,
}

impl Default for LspSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LspSession {
    pub fn new() -> Self {
        let (ready_tx, ready_rx) = mpsc::channel();
        Self {
            config: LspConfig::default(),
            ctx: Arc::new(AnalysisContext::new(Arc::new(SignatureStore::builtin()))),
            loaded_signature_files: Vec::new(),
            loaded_performance_files: Vec::new(),
            documents: HashMap::new(),
            workers: HashMap::new(),
            ready_tx,
            ready_rx,
            published_uris_by_root: HashMap::new(),
            shutdown_requested: false,
        }
    }

    pub fn should_exit(&self) -> bool {
        self.shutdown_requested
    }

    pub fn poll_async_notifications(&mut self) -> Vec<OutboundMessage> {
        self.drain_snapshot_results()
    }

    pub fn handle_message(&mut self, message: &Value) -> Vec<OutboundMessage> {
        let mut out = self.drain_snapshot_results();
        let method = message.get("method").and_then(Value::as_str);
        let id = message.get("id").cloned();

        let Some(method) = method else {
            return out;
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        if let Some(id) = id {
            match self.handle_request(method, &params) {
                Ok(result) => out.push(OutboundMessage::Response { id, result }),
                Err((code, msg)) => out.push(OutboundMessage::Error {
                    id,
                    code,
                    message: msg,
                }),
            }
            return out;
        }

        out.extend(self.handle_notification(method, &params));
        out
    }

    fn handle_request(&mut self, method: &str, params: &Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(self.handle_initialize(params)),
            "shutdown" => {
                self.shutdown_requested = true;
                Ok(Value::Null)
            }
            "textDocument/completion" => Ok(self.handle_completion(params)),
            "textDocument/hover" => Ok(self.handle_hover(params)),
            "textDocument/signatureHelp" => Ok(self.handle_signature_help(params)),
            "textDocument/definition" => Ok(self.handle_definition(params)),
            "textDocument/references" => Ok(self.handle_references(params)),
            "textDocument/foldingRange" => Ok(self.handle_folding_range(params)),
            _ => Err((-32601, format!("method not found: {method}"))),
        }
    }

    fn handle_notification(&mut self, method: &str, params: &Value) -> Vec<OutboundMessage> {
        match method {
            "initialized" => Vec::new(),
            "exit" => {
                self.shutdown_requested = true;
                Vec::new()
            }
            "workspace/didChangeConfiguration" => self.handle_config_change(params),
            "textDocument/didOpen" => self.handle_did_open(params),
            "textDocument/didChange" => self.handle_did_change(params),
            "textDocument/didSave" => self.handle_did_save(params),
            "textDocument/didClose" => self.handle_did_close(params),
            _ => Vec::new(),
        }
    }

    fn handle_initialize(&mut self, params: &Value) -> Value {
        self.config
            .update_from_workspace_settings(params.get("initializationOptions"));
        self.reconfigure();
        info!(dialect = %self.config.dialect, "language server initialized");

        json!({
            "capabilities": {
                "textDocumentSync": {
                    "openClose": true,
                    "change": 1,
                    "save": { "includeText": true }
                },
                "completionProvider": { "resolveProvider": false, "triggerCharacters": ["."] },
                "hoverProvider": true,
                "signatureHelpProvider": { "triggerCharacters": [" ", ","] },
                "definitionProvider": true,
                "referencesProvider": true,
                "foldingRangeProvider": true
            },
            "serverInfo": {
                "name": "asmscope-lsp",
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_config_change(&mut self, params: &Value) -> Vec<OutboundMessage> {
        self.config
            .update_from_workspace_settings(params.get("settings"));
        self.reconfigure();
        Vec::new()
    }

    fn handle_did_open(&mut self, params: &Value) -> Vec<OutboundMessage> {
        let Some(doc) = params.get("textDocument") else {
            return Vec::new();
        };
        let Some(uri) = doc.get("uri").and_then(Value::as_str) else {
            return Vec::new();
        };
        let text = doc.get("text").and_then(Value::as_str).unwrap_or_default();
        let version = doc.get("version").and_then(Value::as_i64).unwrap_or(0);
        let state = DocumentState::new(uri.to_string(), uri_to_path(uri), version, text);
        let worker = self.spawn_worker(&state, AnalysisSnapshot::empty(&self.ctx));
        debug!(uri, version, lines = state.lines.len(), "document opened");
        self.documents.insert(uri.to_string(), state);
        self.workers.insert(uri.to_string(), worker);
        Vec::new()
    }

    fn handle_did_change(&mut self, params: &Value) -> Vec<OutboundMessage> {
        let Some(doc) = params.get("textDocument") else {
            return Vec::new();
        };
        let Some(uri) = doc.get("uri").and_then(Value::as_str) else {
            return Vec::new();
        };
        let version = doc.get("version").and_then(Value::as_i64).unwrap_or(0);
        let Some(text) = params
            .get("contentChanges")
            .and_then(Value::as_array)
            .and_then(|changes| changes.last())
            .and_then(|entry| entry.get("text"))
            .and_then(Value::as_str)
        else {
            return Vec::new();
        };
        let Some(state) = self.documents.get_mut(uri) else {
            return Vec::new();
        };
        state.replace_text(version, text);
        let lines = Arc::clone(&state.lines);
        self.send_edit(uri, version, lines);
        Vec::new()
    }

    /// Saving re-analyses even without a text change, since included
    /// files may have changed on disk.
    fn handle_did_save(&mut self, params: &Value) -> Vec<OutboundMessage> {
        let Some(uri) = params
            .get("textDocument")
            .and_then(|value| value.get("uri"))
            .and_then(Value::as_str)
        else {
            return Vec::new();
        };
        let Some(state) = self.documents.get_mut(uri) else {
            return Vec::new();
        };
        if let Some(text) = params.get("text").and_then(Value::as_str) {
            let version = state.version;
            state.replace_text(version, text);
        }
        let (version, lines) = (state.version, Arc::clone(&state.lines));
        self.send_edit(uri, version, lines);
        Vec::new()
    }

    fn handle_did_close(&mut self, params: &Value) -> Vec<OutboundMessage> {
        let Some(uri) = params
            .get("textDocument")
            .and_then(|value| value.get("uri"))
            .and_then(Value::as_str)
        else {
            return Vec::new();
        };
        self.documents.remove(uri);
        if let Some(worker) = self.workers.remove(uri) {
            worker.shutdown();
        }
        debug!(uri, "document closed");
        let mut targets: HashSet<String> = self
            .published_uris_by_root
            .remove(uri)
            .unwrap_or_default();
        targets.insert(uri.to_string());
        let mut sorted_targets: Vec<String> = targets.into_iter().collect();
        sorted_targets.sort();
        sorted_targets
            .into_iter()
            .map(|target_uri| OutboundMessage::Notification {
                method: "textDocument/publishDiagnostics".to_string(),
                params: json!({
                    "uri": target_uri,
                    "diagnostics": [],
                }),
            })
            .collect()
    }

    fn handle_completion(&self, params: &Value) -> Value {
        if !self.config.completion.enabled {
            return Value::Array(Vec::new());
        }
        let Some(target) = self.query_target(params) else {
            return Value::Array(Vec::new());
        };
        let facade = QueryFacade::new(&self.ctx, &target.snapshot)
            .use_capitals(self.config.completion.use_capitals);
        let candidates = facade.completion(&target.line_text, target.line, target.character);
        Value::Array(completion_items(&candidates))
    }

    fn handle_hover(&self, params: &Value) -> Value {
        if !self.config.hover_enabled {
            return Value::Null;
        }
        let Some(target) = self.query_target(params) else {
            return Value::Null;
        };
        QueryFacade::new(&self.ctx, &target.snapshot)
            .hover(&target.line_text, target.line, target.character)
            .map(|info| hover_response(&info, target.line))
            .unwrap_or(Value::Null)
    }

    fn handle_signature_help(&self, params: &Value) -> Value {
        if !self.config.signature_help_enabled {
            return Value::Null;
        }
        let Some(target) = self.query_target(params) else {
            return Value::Null;
        };
        QueryFacade::new(&self.ctx, &target.snapshot)
            .signature_help(&target.line_text, target.character)
            .map(|info| signature_help_response(&info))
            .unwrap_or(Value::Null)
    }

    fn handle_definition(&self, params: &Value) -> Value {
        let Some(target) = self.query_target(params) else {
            return Value::Array(Vec::new());
        };
        let ids = QueryFacade::new(&self.ctx, &target.snapshot).definition(
            &target.line_text,
            target.line,
            target.character,
        );
        Value::Array(keyword_locations(&target.uri, &target.snapshot.graph, &ids))
    }

    fn handle_references(&self, params: &Value) -> Value {
        let Some(target) = self.query_target(params) else {
            return Value::Array(Vec::new());
        };
        let include_declaration = params
            .get("context")
            .and_then(|value| value.get("includeDeclaration"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let ids = QueryFacade::new(&self.ctx, &target.snapshot).references(
            &target.line_text,
            target.line,
            target.character,
            include_declaration,
        );
        Value::Array(keyword_locations(&target.uri, &target.snapshot.graph, &ids))
    }

    fn handle_folding_range(&self, params: &Value) -> Value {
        let Some(uri) = params
            .get("textDocument")
            .and_then(|value| value.get("uri"))
            .and_then(Value::as_str)
        else {
            return Value::Array(Vec::new());
        };
        let Some(worker) = self.workers.get(uri) else {
            return Value::Array(Vec::new());
        };
        let snapshot = worker.snapshot();
        let ranges = QueryFacade::new(&self.ctx, &snapshot)
            .folding_ranges()
            .iter()
            .map(folding_range_to_lsp)
            .collect();
        Value::Array(ranges)
    }

    fn query_target(&self, params: &Value) -> Option<QueryTarget> {
        let uri = params
            .get("textDocument")
            .and_then(|value| value.get("uri"))
            .and_then(Value::as_str)?;
        let position = params.get("position")?;
        let line = position.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
        let character = position
            .get("character")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let line_text = self.documents.get(uri)?.line(line as usize)?.to_string();
        let snapshot = self.workers.get(uri)?.snapshot();
        Some(QueryTarget {
            uri: uri.to_string(),
            line,
            character,
            line_text,
            snapshot,
        })
    }

    fn send_edit(&self, uri: &str, version: i64, lines: Arc<Vec<String>>) {
        let Some(worker) = self.workers.get(uri) else {
            return;
        };
        if let Err(err) = worker.edit(version, lines) {
            warn!(%err, "edit not delivered");
        }
    }

    fn spawn_worker(&self, doc: &DocumentState, initial: AnalysisSnapshot) -> DocumentWorker {
        let ctx = Arc::clone(&self.ctx);
        let path = doc.path.clone();
        let worker = DocumentWorker::spawn(
            doc.uri.clone(),
            self.config.scheduler_config(),
            initial,
            move |version, lines| AnalysisSnapshot::build(&ctx, version, lines, path.clone()),
            self.ready_tx.clone(),
        );
        if let Err(err) = worker.edit(doc.version, Arc::clone(&doc.lines)) {
            warn!(%err, "initial edit not delivered");
        }
        worker
    }

    /// Applies the current settings to the analysis context and restarts
    /// every document worker so that open documents are re-analysed.
    fn reconfigure(&mut self) {
        if self.config.signature_files != self.loaded_signature_files
            || self.config.performance_files != self.loaded_performance_files
        {
            let store = match SignatureStore::builtin_with_overlays(&self.config.signature_paths())
            {
                Ok(store) => store,
                Err(err) => {
                    warn!(%err, "using builtin signatures only");
                    SignatureStore::builtin()
                }
            };
            let performance =
                match PerformanceStore::builtin_with_overlays(&self.config.performance_paths()) {
                    Ok(performance) => performance,
                    Err(err) => {
                        warn!(%err, "using builtin performance table only");
                        PerformanceStore::builtin()
                    }
                };
            self.ctx = Arc::new(
                AnalysisContext::new(Arc::new(store)).with_performance(Arc::new(performance)),
            );
            self.loaded_signature_files = self.config.signature_files.clone();
            self.loaded_performance_files = self.config.performance_files.clone();
        }
        self.ctx.set_options(self.config.analysis_options());
        self.ctx.set_enabled_archs(self.config.enabled_archs());
        self.ctx.set_micro_archs(self.config.micro_archs());

        let uris: Vec<String> = self.documents.keys().cloned().collect();
        for uri in uris {
            let initial = match self.workers.remove(&uri) {
                Some(worker) => {
                    let last = worker.snapshot();
                    worker.shutdown();
                    AnalysisSnapshot::clone(&last)
                }
                None => AnalysisSnapshot::empty(&self.ctx),
            };
            let Some(doc) = self.documents.get(&uri) else {
                continue;
            };
            let worker = self.spawn_worker(doc, initial);
            self.workers.insert(uri, worker);
        }
    }

    fn drain_snapshot_results(&mut self) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        loop {
            match self.ready_rx.try_recv() {
                Ok(ready) => out.extend(self.apply_snapshot(ready)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    fn apply_snapshot(&mut self, ready: SnapshotReady) -> Vec<OutboundMessage> {
        let Some(current) = self.documents.get(&ready.uri) else {
            return Vec::new();
        };
        if current.version != ready.version {
            debug!(
                uri = %ready.uri,
                version = ready.version,
                current = current.version,
                "dropping stale snapshot"
            );
            return Vec::new();
        }
        let version = current.version;
        self.publish_snapshot_diagnostics(&ready.uri, version, &ready.snapshot)
    }

    fn publish_snapshot_diagnostics(
        &mut self,
        root_uri: &str,
        version: i64,
        snapshot: &AnalysisSnapshot,
    ) -> Vec<OutboundMessage> {
        let grouped = group_diagnostics_by_uri(root_uri, snapshot);
        let new_uris: HashSet<String> = grouped.keys().cloned().collect();
        let previous_uris = self
            .published_uris_by_root
            .get(root_uri)
            .cloned()
            .unwrap_or_default();

        let mut notifications = Vec::new();
        let mut stale_uris: Vec<&String> = previous_uris.difference(&new_uris).collect();
        stale_uris.sort();
        for stale_uri in stale_uris {
            notifications.push(OutboundMessage::Notification {
                method: "textDocument/publishDiagnostics".to_string(),
                params: json!({
                    "uri": stale_uri,
                    "diagnostics": [],
                }),
            });
        }

        for (target_uri, diagnostics) in &grouped {
            let mut params = json!({
                "uri": target_uri,
                "diagnostics": diagnostics_to_lsp(diagnostics),
            });
            if target_uri == root_uri {
                params["version"] = json!(version);
            }
            notifications.push(OutboundMessage::Notification {
                method: "textDocument/publishDiagnostics".to_string(),
                params,
            });
        }
        self.published_uris_by_root
            .insert(root_uri.to_string(), new_uris);

        notifications
    }
}

fn folding_range_to_lsp(range: &FoldRange) -> Value {
    json!({
        "startLine": range.start_line,
        "endLine": range.end_line,
        "kind": "region",
    })
}

pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    if !uri.starts_with("file://") {
        return None;
    }
    let raw = uri.trim_start_matches("file://");
    let decoded = percent_decode(raw);
    if decoded.is_empty() {
        None
    } else {
        Some(PathBuf::from(decoded))
    }
}

pub fn path_to_file_uri(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("file://{}", percent_encode(raw.as_ref()))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or_default();
            if let Ok(value) = u8::from_str_radix(hex, 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn percent_encode(input: &str) -> String {
    let mut out = String::new();
    for b in input.bytes() {
        let c = b as char;
        if c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~' | ':') {
            out.push(c);
        } else {
            out.push('%');
            out.push_str(&format!("{:02X}", b));
        }
    }
    out
}
