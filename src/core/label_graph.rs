// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Label definitions and usages of a document and its includes.
//!
//! The graph is built in one pass over the lines and is immutable
//! afterwards; an edit produces a new graph. Local labels (`.name`) are
//! qualified with the last non-local label seen before them, so `.loop`
//! inside `Foo` is keyed as `FOO.LOOP` (keys are upper-cased unless the
//! graph is case sensitive).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::constant::to_constant;
use crate::core::diagnostic::{AnalysisDiagnostic, DiagnosticCode};
use crate::core::dialect::Dialect;
use crate::core::include::IncludeLoader;
use crate::core::keyword_id::{KeywordId, LineRef, Span};
use crate::core::line_parser::{include_directive, is_word_char, LabelKind, LineParser, ParsedLine};
use crate::core::register::Register;

pub const DEFAULT_MAX_LINES: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStatus {
    Enabled,
    /// The document (with includes) had `lines` lines, more than `max_lines`.
    Disabled { lines: usize, max_lines: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_id: u32,
    pub path: Option<PathBuf>,
}

impl SourceFile {
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// An include directive whose target could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedInclude {
    pub name: String,
    pub id: KeywordId,
}

/// One label definition, for completion lists and hover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub key: String,
    /// Spelling at the definition site, unqualified.
    pub name: String,
    pub kind: LabelKind,
    pub id: KeywordId,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct LabelGraph {
    dialect: Dialect,
    case_sensitive: bool,
    status: GraphStatus,
    defined_at: BTreeMap<String, Vec<KeywordId>>,
    declared_at: BTreeMap<String, Vec<KeywordId>>,
    used_at: BTreeMap<String, Vec<KeywordId>>,
    definitions: Vec<LabelInfo>,
    /// Per file: lines where the non-local scope changes, ascending.
    scopes: BTreeMap<u32, Vec<(u32, String)>>,
    files: Vec<SourceFile>,
    unresolved: Vec<UnresolvedInclude>,
}

pub struct LabelGraphBuilder<'a> {
    parser: &'a LineParser,
    case_sensitive: bool,
    max_lines: usize,
    loader: Option<&'a dyn IncludeLoader>,
    source_path: Option<PathBuf>,
}

impl<'a> LabelGraphBuilder<'a> {
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn include_loader(mut self, loader: &'a dyn IncludeLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn source_path(mut self, path: Option<PathBuf>) -> Self {
        self.source_path = path;
        self
    }

    pub fn build(self, lines: &[String], file_id: u32) -> LabelGraph {
        let mut scan = Scan {
            parser: self.parser,
            loader: self.loader,
            max_lines: self.max_lines,
            total_lines: 0,
            next_file_id: file_id + 1,
            seen: HashSet::new(),
            graph: LabelGraph::empty(self.parser.dialect(), self.case_sensitive),
        };
        if let Some(path) = &self.source_path {
            scan.seen.insert(path.clone());
        }
        scan.visit(file_id, self.source_path.clone(), lines);
        let mut graph = scan.graph;
        if let GraphStatus::Disabled { lines, max_lines } = graph.status {
            debug!(lines, max_lines, "label analysis disabled: document too large");
            let files = std::mem::take(&mut graph.files);
            graph = LabelGraph::empty(self.parser.dialect(), self.case_sensitive);
            graph.status = GraphStatus::Disabled { lines, max_lines };
            graph.files = files;
        }
        graph
    }
}

struct Scan<'a> {
    parser: &'a LineParser,
    loader: Option<&'a dyn IncludeLoader>,
    max_lines: usize,
    total_lines: usize,
    next_file_id: u32,
    seen: HashSet<PathBuf>,
    graph: LabelGraph,
}

impl Scan<'_> {
    fn visit(&mut self, file_id: u32, path: Option<PathBuf>, lines: &[String]) {
        self.graph.files.push(SourceFile {
            file_id,
            path: path.clone(),
        });
        self.total_lines += lines.len();
        if self.total_lines > self.max_lines {
            self.graph.status = GraphStatus::Disabled {
                lines: self.total_lines,
                max_lines: self.max_lines,
            };
            return;
        }
        let dialect = self.parser.dialect();
        let mut scope: Option<String> = None;

        for (number, line) in lines.iter().enumerate() {
            if matches!(self.graph.status, GraphStatus::Disabled { .. }) {
                return;
            }
            let number = number as u32;
            let parsed = self.parser.parse(line, number, file_id);
            // Usages resolve against labels on earlier lines only.
            let usage_scope = scope.clone();

            if let Some(label) = &parsed.label {
                let id = KeywordId::new(file_id, number, label.span);
                let local = dialect.is_local_label(&label.name);
                let key = self
                    .graph
                    .fold(&qualify(scope.as_deref(), &label.name, local));
                match label.kind {
                    LabelKind::Regular => {
                        self.graph.defined_at.entry(key.clone()).or_default().push(id);
                        if !local {
                            scope = Some(label.name.clone());
                            self.graph
                                .scopes
                                .entry(file_id)
                                .or_default()
                                .push((number, label.name.clone()));
                        }
                    }
                    LabelKind::Proto | LabelKind::Extern => {
                        self.graph.declared_at.entry(key.clone()).or_default().push(id);
                    }
                }
                self.graph.definitions.push(LabelInfo {
                    key,
                    name: label.name.clone(),
                    kind: label.kind,
                    id,
                    description: String::new(),
                });
            }

            if parsed.is_jump {
                if let Some((target, span)) = jump_target(&parsed, dialect.is_att()) {
                    let local = dialect.is_local_label(&target);
                    let key = self.graph.fold(&qualify(usage_scope.as_deref(), &target, local));
                    let id = KeywordId::new(file_id, number, span);
                    self.graph.used_at.entry(key).or_default().push(id);
                }
            }

            if let Some((name, span)) = include_directive(line, dialect) {
                self.include(&name, KeywordId::new(file_id, number, span), path.as_deref());
            }
        }
    }

    fn include(&mut self, name: &str, id: KeywordId, from: Option<&Path>) {
        let loaded = self.loader.and_then(|loader| loader.load(name, from));
        let Some(loaded) = loaded else {
            debug!(include = name, line = id.line, "unresolved include");
            self.graph.unresolved.push(UnresolvedInclude {
                name: name.to_string(),
                id,
            });
            return;
        };
        if !self.seen.insert(loaded.path.clone()) {
            debug!(path = %loaded.path.display(), "include already scanned");
            return;
        }
        let file_id = self.next_file_id;
        self.next_file_id += 1;
        self.visit(file_id, Some(loaded.path), &loaded.lines);
    }
}

fn qualify(scope: Option<&str>, label: &str, local: bool) -> String {
    match scope {
        Some(scope) if local => format!("{scope}{label}"),
        _ => label.to_string(),
    }
}

/// The local part of a qualified key: `FOO.LOOP` yields `.LOOP`.
fn local_part(key: &str) -> Option<&str> {
    match key.find('.') {
        Some(pos) if pos > 0 => Some(&key[pos..]),
        _ => None,
    }
}

/// Label named by the first operand of a jump, with its column range.
/// `SHORT`, `NEAR`, `FAR` and `PTR` are skipped; registers, constants and
/// memory references are not labels.
fn jump_target(parsed: &ParsedLine, att: bool) -> Option<(String, Span)> {
    let operand = parsed.operands.first()?;
    let span = parsed.operand_spans.first()?;
    let mut rest = operand.as_str();
    let mut offset = 0usize;
    if att {
        if let Some(stripped) = rest.strip_prefix('*') {
            rest = stripped;
            offset += 1;
        }
    }
    loop {
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        rest = trimmed;
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let is_modifier = matches!(
            rest[..word_end].to_ascii_uppercase().as_str(),
            "SHORT" | "NEAR" | "FAR" | "PTR"
        );
        if word_end < rest.len() && is_modifier {
            offset += word_end;
            rest = &rest[word_end..];
            continue;
        }
        break;
    }
    let target = rest.trim_end();
    let first = target.chars().next()?;
    if !(first.is_ascii_alphabetic() || matches!(first, '_' | '.' | '@' | '?'))
        || !target.chars().all(is_word_char)
        || Register::parse(target).is_some()
        || to_constant(target).is_some()
    {
        return None;
    }
    let start = span.start as usize + offset;
    Some((target.to_string(), Span::new(start, start + target.len())))
}

impl LabelGraph {
    pub fn builder(parser: &LineParser) -> LabelGraphBuilder<'_> {
        LabelGraphBuilder {
            parser,
            case_sensitive: false,
            max_lines: DEFAULT_MAX_LINES,
            loader: None,
            source_path: None,
        }
    }

    /// Builds without include resolution, case-insensitive, default ceiling.
    pub fn build(parser: &LineParser, lines: &[String], file_id: u32) -> LabelGraph {
        Self::builder(parser).build(lines, file_id)
    }

    fn empty(dialect: Dialect, case_sensitive: bool) -> Self {
        Self {
            dialect,
            case_sensitive,
            status: GraphStatus::Enabled,
            defined_at: BTreeMap::new(),
            declared_at: BTreeMap::new(),
            used_at: BTreeMap::new(),
            definitions: Vec::new(),
            scopes: BTreeMap::new(),
            files: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    fn fold(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_ascii_uppercase()
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn status(&self) -> GraphStatus {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status == GraphStatus::Enabled
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, file_id: u32) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.file_id == file_id)
    }

    pub fn defined_map(&self) -> &BTreeMap<String, Vec<KeywordId>> {
        &self.defined_at
    }

    pub fn used_map(&self) -> &BTreeMap<String, Vec<KeywordId>> {
        &self.used_at
    }

    pub fn is_defined(&self, label: &str) -> bool {
        let key = self.fold(label);
        self.defined_at.contains_key(&key) || self.declared_at.contains_key(&key)
    }

    pub fn is_duplicated(&self, label: &str) -> bool {
        self.defined_at
            .get(&self.fold(label))
            .is_some_and(|ids| ids.len() > 1)
    }

    pub fn definitions_of(&self, label: &str) -> &[KeywordId] {
        self.defined_at
            .get(&self.fold(label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lines of the regular definitions of `label`.
    pub fn definition_lines(&self, label: &str) -> BTreeSet<LineRef> {
        self.definitions_of(label).iter().map(KeywordId::line_ref).collect()
    }

    /// Lines of `PROTO` and `EXTERN` declarations of `label`.
    pub fn declaration_lines(&self, label: &str) -> BTreeSet<LineRef> {
        self.declared_at
            .get(&self.fold(label))
            .into_iter()
            .flatten()
            .map(KeywordId::line_ref)
            .collect()
    }

    /// Usages of `label`. A local form such as `.loop` also matches every
    /// qualified key ending in it (`FOO.LOOP`, `BAR.LOOP`).
    pub fn usages_of(&self, label: &str) -> Vec<KeywordId> {
        let key = self.fold(label);
        let local = key.starts_with('.') && key.len() > 1;
        let mut ids: Vec<KeywordId> = self
            .used_at
            .iter()
            .filter(|(used, _)| {
                **used == key || (local && local_part(used) == Some(key.as_str()))
            })
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn usage_lines(&self, label: &str) -> BTreeSet<LineRef> {
        self.usages_of(label).iter().map(KeywordId::line_ref).collect()
    }

    fn resolves(&self, key: &str) -> bool {
        if self.defined_at.contains_key(key) {
            return true;
        }
        let bare = local_part(key);
        if bare.is_some_and(|bare| self.defined_at.contains_key(bare)) {
            return true;
        }
        self.declared_at.contains_key(key)
            || bare.is_some_and(|bare| self.declared_at.contains_key(bare))
    }

    /// Sites `key` resolves to, trying the qualified key before its local
    /// part and definitions before declarations.
    pub fn resolve_definitions(&self, key: &str) -> Vec<KeywordId> {
        let key = self.fold(key);
        let candidates: Vec<&str> = std::iter::once(key.as_str()).chain(local_part(&key)).collect();
        for map in [&self.defined_at, &self.declared_at] {
            if let Some(ids) = candidates.iter().find_map(|candidate| map.get(*candidate)) {
                return ids.clone();
            }
        }
        Vec::new()
    }

    /// Usage sites of labels that are neither defined nor declared, in
    /// document order.
    pub fn undefined_usages(&self) -> impl Iterator<Item = KeywordId> {
        let mut ids: Vec<KeywordId> = self
            .used_at
            .iter()
            .filter(|(key, _)| !self.resolves(key))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort();
        ids.into_iter()
    }

    /// Labels with more than one regular definition.
    pub fn label_clashes(&self) -> Vec<(&str, &[KeywordId])> {
        self.defined_at
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, ids)| (key.as_str(), ids.as_slice()))
            .collect()
    }

    pub fn unresolved_includes(&self) -> &[UnresolvedInclude] {
        &self.unresolved
    }

    /// Every definition and declaration, described as `LINE n (file)`.
    pub fn labels(&self) -> Vec<LabelInfo> {
        self.definitions
            .iter()
            .map(|info| {
                let file = self
                    .file(info.id.file_id)
                    .map(SourceFile::display_name)
                    .unwrap_or_else(|| "document".to_string());
                LabelInfo {
                    description: format!("LINE {} ({})", info.id.line + 1, file),
                    ..info.clone()
                }
            })
            .collect()
    }

    /// Last non-local label defined on a line before `at`.
    pub fn scope_at(&self, at: LineRef) -> Option<&str> {
        let changes = self.scopes.get(&at.file_id)?;
        let idx = changes.partition_point(|(line, _)| *line < at.line);
        idx.checked_sub(1).map(|idx| changes[idx].1.as_str())
    }

    /// Graph key for `label` as written at `at`.
    pub fn resolve_at(&self, label: &str, at: LineRef) -> String {
        let local = self.dialect.is_local_label(label);
        self.fold(&qualify(self.scope_at(at), label, local))
    }

    pub fn diagnostics(&self) -> Vec<AnalysisDiagnostic> {
        let mut out = Vec::new();
        if let GraphStatus::Disabled { lines, max_lines } = self.status {
            let file_id = self.files.first().map(|file| file.file_id).unwrap_or(0);
            out.push(AnalysisDiagnostic::new(
                DiagnosticCode::LabelAnalysisDisabled,
                format!(
                    "label analysis disabled: {lines} lines exceed the limit of {max_lines}"
                ),
                KeywordId::new(file_id, 0, Span::default()),
            ));
            return out;
        }
        for (key, ids) in self.label_clashes() {
            for id in ids {
                out.push(AnalysisDiagnostic::new(
                    DiagnosticCode::DuplicateLabel,
                    format!("label '{key}' is defined {} times", ids.len()),
                    *id,
                ));
            }
        }
        for (key, ids) in &self.used_at {
            if self.resolves(key) {
                continue;
            }
            for id in ids {
                out.push(AnalysisDiagnostic::new(
                    DiagnosticCode::UndefinedLabel,
                    format!("undefined label '{key}'"),
                    *id,
                ));
            }
        }
        for include in &self.unresolved {
            out.push(AnalysisDiagnostic::new(
                DiagnosticCode::UnresolvedInclude,
                format!("cannot resolve include '{}'", include.name),
                include.id,
            ));
        }
        out.sort_by_key(|diag| diag.id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::include::LoadedInclude;
    use crate::core::signature_store::SignatureStore;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn parser(dialect: Dialect) -> LineParser {
        LineParser::new(dialect, Arc::new(SignatureStore::builtin()))
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    struct MemoryLoader(HashMap<String, Vec<String>>);

    impl IncludeLoader for MemoryLoader {
        fn load(&self, name: &str, _from: Option<&Path>) -> Option<LoadedInclude> {
            self.0.get(name).map(|lines| LoadedInclude {
                path: PathBuf::from(format!("/virtual/{name}")),
                lines: lines.clone(),
            })
        }
    }

    #[test]
    fn duplicate_definitions_are_reported_on_both_lines() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::build(&p, &lines("foo: MOV RAX, RBX\nfoo: MOV RCX, RDX"), 0);
        assert!(graph.is_duplicated("FOO"));
        assert!(graph.is_duplicated("foo"));
        let expected: BTreeSet<LineRef> = [LineRef::new(0, 0), LineRef::new(0, 1)].into();
        assert_eq!(graph.definition_lines("foo"), expected);
        let dups: Vec<_> = graph
            .diagnostics()
            .into_iter()
            .filter(|d| d.code == DiagnosticCode::DuplicateLabel)
            .collect();
        assert_eq!(dups.len(), 2);
    }

    #[test]
    fn undefined_jump_target_is_reported_once() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::build(&p, &lines("JMP bar"), 0);
        let undefined: Vec<KeywordId> = graph.undefined_usages().collect();
        assert_eq!(undefined, vec![KeywordId::new(0, 0, Span::new(4, 7))]);
    }

    #[test]
    fn masm_local_labels_are_qualified_by_procedure() {
        let p = parser(Dialect::Masm);
        let src = "Foo PROC\n.loop: JMP .loop\nFoo ENDP";
        let graph = LabelGraph::build(&p, &lines(src), 0);
        assert!(graph.is_defined("FOO.LOOP"));
        assert_eq!(graph.usage_lines("FOO.LOOP").len(), 1);
        assert_eq!(graph.undefined_usages().count(), 0);
        assert!(graph
            .diagnostics()
            .iter()
            .all(|d| d.code != DiagnosticCode::UndefinedLabel));
    }

    #[test]
    fn same_local_name_in_two_procedures_is_not_a_clash() {
        let p = parser(Dialect::NasmIntel);
        let src = "a:\n.loop: jmp .loop\nb:\n.loop: jne .loop\n jmp .loop";
        let graph = LabelGraph::build(&p, &lines(src), 0);
        assert!(!graph.is_duplicated("A.LOOP"));
        assert!(!graph.is_duplicated("B.LOOP"));
        assert_eq!(graph.usage_lines(".loop").len(), 3);
        assert_eq!(graph.usage_lines("B.LOOP").len(), 2);
        assert_eq!(graph.scope_at(LineRef::new(0, 1)), Some("a"));
        assert_eq!(graph.scope_at(LineRef::new(0, 4)), Some("b"));
        assert_eq!(graph.resolve_at(".loop", LineRef::new(0, 1)), "A.LOOP");
    }

    #[test]
    fn label_on_the_jump_line_does_not_scope_its_operand() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::build(&p, &lines("a:\n.x: nop\nb: jmp .x"), 0);
        assert_eq!(graph.undefined_usages().count(), 0);
        assert_eq!(graph.usage_lines("A.X").len(), 1);
        assert!(graph.usage_lines("B.X").is_empty());
        assert_eq!(graph.scope_at(LineRef::new(0, 2)), Some("a"));
        assert_eq!(graph.scope_at(LineRef::new(0, 3)), Some("b"));
        assert_eq!(graph.resolve_at(".x", LineRef::new(0, 2)), "A.X");
    }

    #[test]
    fn unscoped_local_definition_satisfies_qualified_use() {
        let p = parser(Dialect::NasmIntel);
        let src = ".top: nop\nmain:\n jmp .top";
        let graph = LabelGraph::build(&p, &lines(src), 0);
        assert_eq!(graph.undefined_usages().count(), 0);
        assert_eq!(
            graph.resolve_definitions("main.top"),
            vec![KeywordId::new(0, 0, Span::new(0, 4))]
        );
    }

    #[test]
    fn proto_satisfies_usage_without_clashing() {
        let p = parser(Dialect::Masm);
        let src = "Helper PROTO\nHelper PROC\n ret\nHelper ENDP\n call Helper\n call Other";
        let graph = LabelGraph::build(&p, &lines(src), 0);
        assert!(!graph.is_duplicated("Helper"));
        assert_eq!(graph.definition_lines("Helper").len(), 1);
        assert_eq!(graph.declaration_lines("Helper").len(), 1);
        let undefined: Vec<KeywordId> = graph.undefined_usages().collect();
        assert_eq!(undefined.len(), 1);
        assert_eq!(undefined[0].line, 5);
    }

    #[test]
    fn extern_declarations_satisfy_usages() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::build(&p, &lines("extern puts\n call puts"), 0);
        assert_eq!(graph.undefined_usages().count(), 0);
        assert!(graph.is_defined("puts"));
    }

    #[test]
    fn jump_modifiers_registers_and_memory() {
        let p = parser(Dialect::NasmIntel);
        let src = "jmp short done\njmp rax\njmp qword [rax]\njmp 0x10\ndone:";
        let graph = LabelGraph::build(&p, &lines(src), 0);
        assert_eq!(graph.usages_of("done"), vec![KeywordId::new(0, 0, Span::new(10, 14))]);
        assert_eq!(graph.used_map().len(), 1);
    }

    #[test]
    fn includes_are_scanned_once_and_missing_ones_reported() {
        let p = parser(Dialect::NasmIntel);
        let loader = MemoryLoader(HashMap::from([
            ("defs.inc".to_string(), lines("shared:\n%include \"defs.inc\"")),
        ]));
        let src = "%include \"defs.inc\"\n%include \"missing.inc\"\n jmp shared";
        let graph = LabelGraph::builder(&p)
            .include_loader(&loader)
            .build(&lines(src), 0);
        assert_eq!(graph.files().len(), 2);
        assert_eq!(graph.definition_lines("shared"), [LineRef::new(1, 0)].into());
        assert_eq!(graph.undefined_usages().count(), 0);
        assert_eq!(graph.unresolved_includes().len(), 1);
        assert_eq!(graph.unresolved_includes()[0].name, "missing.inc");
        let labels = graph.labels();
        assert_eq!(labels[0].description, "LINE 1 (defs.inc)");
    }

    #[test]
    fn line_ceiling_disables_the_graph() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::builder(&p)
            .max_lines(2)
            .build(&lines("a:\nb:\njmp c"), 0);
        assert!(!graph.is_enabled());
        assert!(graph.defined_map().is_empty());
        let diags = graph.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::LabelAnalysisDisabled);
    }

    #[test]
    fn case_sensitive_graphs_keep_spelling() {
        let p = parser(Dialect::NasmIntel);
        let graph = LabelGraph::builder(&p)
            .case_sensitive(true)
            .build(&lines("Foo:\nfoo:\n jmp FOO"), 0);
        assert!(!graph.is_duplicated("Foo"));
        assert_eq!(graph.undefined_usages().count(), 1);
    }

    fn arb_document() -> impl Strategy<Value = Vec<String>> {
        let line = prop_oneof![
            prop::sample::select(vec!["foo", "bar", "baz"]).prop_map(|n| format!("{n}:")),
            prop::sample::select(vec![".a", ".b"]).prop_map(|n| format!("{n}: nop")),
            prop::sample::select(vec!["foo", "bar", ".a", ".b", "qux"])
                .prop_map(|n| format!(" jmp {n}")),
            Just(" mov eax, 1".to_string()),
            Just("; remark".to_string()),
        ];
        prop::collection::vec(line, 0..40)
    }

    proptest! {
        #[test]
        fn rebuilding_is_idempotent(doc in arb_document()) {
            let p = parser(Dialect::NasmIntel);
            let first = LabelGraph::build(&p, &doc, 0);
            let second = LabelGraph::build(&p, &doc, 0);
            prop_assert_eq!(first.defined_map(), second.defined_map());
            prop_assert_eq!(first.used_map(), second.used_map());
        }

        #[test]
        fn duplicated_iff_more_than_one_definition_line(doc in arb_document()) {
            let p = parser(Dialect::NasmIntel);
            let graph = LabelGraph::build(&p, &doc, 0);
            for key in graph.defined_map().keys() {
                prop_assert_eq!(graph.definition_lines(key).len() > 1, graph.is_duplicated(key));
            }
        }

        #[test]
        fn qualified_lookup_round_trips(doc in arb_document()) {
            let p = parser(Dialect::NasmIntel);
            let graph = LabelGraph::build(&p, &doc, 0);
            for info in graph.labels() {
                if !info.name.starts_with('.') {
                    continue;
                }
                let key = graph.resolve_at(&info.name, info.id.line_ref());
                prop_assert_eq!(&key, &info.key);
                prop_assert!(graph.definitions_of(&key).contains(&info.id));
            }
        }
    }
}
