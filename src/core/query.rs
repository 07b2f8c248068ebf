// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Editor-facing queries over the last completed snapshot.
//!
//! Every query is synchronous and read-only. The enabled architecture set
//! is read once per query so a concurrent configuration change cannot give
//! one answer two views of it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::arch::ArchSet;
use crate::core::constant::to_constant;
use crate::core::context::AnalysisContext;
use crate::core::diagnostic::AnalysisDiagnostic;
use crate::core::dialect::Dialect;
use crate::core::folding::FoldRange;
use crate::core::keyword_id::{KeywordId, LineRef, Span};
use crate::core::keywords::{self, Keyword};
use crate::core::line_parser::{is_word_char, keyword_at, remark_start, LabelKind, LineParser};
use crate::core::mnemonic::Mnemonic;
use crate::core::operand::make_operands;
use crate::core::performance::{self, MicroArchSet};
use crate::core::operand_type::OperandType;
use crate::core::register::Register;
use crate::core::signature::{self, SignatureEntry};
use crate::core::signature_store::SignatureStore;
use crate::core::snapshot::{AnalysisSnapshot, DOCUMENT_FILE_ID};

const MAX_DISPLAY_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Mnemonic,
    Register,
    Label,
    Directive,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    /// The keyword being completed, as the user would type it.
    pub label: String,
    /// `KEYWORD [ARCH] - description`, at most 120 characters.
    pub display: String,
    pub insert_text: String,
    pub documentation: String,
    pub kind: CandidateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HoverKind {
    Mnemonic,
    Register,
    Label,
    Keyword,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverInfo {
    pub kind: HoverKind,
    pub word: String,
    pub span: Span,
    /// Markdown.
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    /// Columns of the parameter inside the signature label.
    pub label: Span,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureInfo {
    pub label: String,
    pub documentation: String,
    pub parameters: Vec<ParameterInfo>,
    pub active_parameter: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureHelpInfo {
    pub signatures: Vec<SignatureInfo>,
    pub active_signature: usize,
    pub active_parameter: usize,
}

pub struct QueryFacade<'a> {
    ctx: &'a AnalysisContext,
    snapshot: &'a AnalysisSnapshot,
    parser: LineParser,
    enabled: ArchSet,
    micro_archs: MicroArchSet,
    use_capitals: bool,
}

impl<'a> QueryFacade<'a> {
    pub fn new(ctx: &'a AnalysisContext, snapshot: &'a AnalysisSnapshot) -> Self {
        Self {
            ctx,
            snapshot,
            parser: LineParser::new(snapshot.options.dialect, ctx.store().clone()),
            enabled: *ctx.enabled_archs(),
            micro_archs: ctx.micro_archs(),
            use_capitals: true,
        }
    }

    /// Case used for inserted mnemonics, registers and keywords.
    pub fn use_capitals(mut self, use_capitals: bool) -> Self {
        self.use_capitals = use_capitals;
        self
    }

    fn store(&self) -> &SignatureStore {
        self.ctx.store()
    }

    fn dialect(&self) -> Dialect {
        self.parser.dialect()
    }

    pub fn diagnostics(&self) -> Vec<AnalysisDiagnostic> {
        self.snapshot.diagnostics()
    }

    pub fn folding_ranges(&self) -> &[FoldRange] {
        &self.snapshot.folding.ranges
    }

    pub fn completion(&self, line_text: &str, line: u32, character: usize) -> Vec<CompletionCandidate> {
        let column = clamp_column(line_text, character);
        if remark_start(line_text, self.dialect()).is_some_and(|start| start < column) {
            return Vec::new();
        }
        let prefix_start = word_start(line_text, column);
        let prefix = &line_text[prefix_start..column];
        if prefix.is_empty() {
            return Vec::new();
        }
        let before = &line_text[..prefix_start];
        let parsed = self.parser.parse(before, line, DOCUMENT_FILE_ID);

        let mut candidates = if !parsed.has_mnemonic() {
            self.instruction_candidates()
        } else if parsed.is_jump {
            self.label_candidates()
        } else {
            let index = parsed.operands.len().saturating_sub(1);
            let completed = &parsed.operands[..index];
            let entries = self.surviving_entries(&parsed.mnemonic, completed);
            let types = signature::allowed_types_at(&entries, index, self.dialect());
            self.operand_candidates(&types)
        };

        candidates.retain(|candidate| starts_with_ignore_case(&candidate.label, prefix));
        candidates.sort_by(|a, b| (a.kind, &a.label).cmp(&(b.kind, &b.label)));
        candidates.dedup_by(|a, b| a.kind == b.kind && a.label == b.label);
        candidates
    }

    fn cased(&self, text: &str) -> String {
        if self.use_capitals {
            text.to_ascii_uppercase()
        } else {
            text.to_ascii_lowercase()
        }
    }

    fn instruction_candidates(&self) -> Vec<CompletionCandidate> {
        let store = self.store();
        let mut out: Vec<CompletionCandidate> = store
            .mnemonics_switched_on(&self.enabled)
            .into_iter()
            .map(|mnemonic| {
                let archs = store.arch_of(mnemonic);
                let description = store.description(mnemonic).unwrap_or_default();
                CompletionCandidate {
                    label: mnemonic.as_str().to_string(),
                    display: display_text(mnemonic.as_str(), Some(&archs), description),
                    insert_text: self.cased(mnemonic.as_str()),
                    documentation: description.to_string(),
                    kind: CandidateKind::Mnemonic,
                }
            })
            .collect();
        let directives = keywords::directives(self.dialect())
            .iter()
            .map(|keyword| self.keyword_candidate(keyword, CandidateKind::Directive));
        let misc = keywords::misc_keywords()
            .iter()
            .map(|keyword| self.keyword_candidate(keyword, CandidateKind::Keyword));
        out.extend(directives.chain(misc));
        out
    }

    fn keyword_candidate(&self, keyword: &Keyword, kind: CandidateKind) -> CompletionCandidate {
        CompletionCandidate {
            label: keyword.name.to_string(),
            display: display_text(keyword.name, None, keyword.description),
            insert_text: self.cased(keyword.name),
            documentation: keyword.description.to_string(),
            kind,
        }
    }

    fn label_candidates(&self) -> Vec<CompletionCandidate> {
        self.snapshot
            .graph
            .labels()
            .into_iter()
            .map(|info| CompletionCandidate {
                display: display_text(&info.name, None, &info.description),
                insert_text: info.name.clone(),
                documentation: info.description,
                label: info.name,
                kind: CandidateKind::Label,
            })
            .collect()
    }

    fn operand_candidates(&self, types: &BTreeSet<OperandType>) -> Vec<CompletionCandidate> {
        let att = self.dialect().is_att();
        let mut out: Vec<CompletionCandidate> = self
            .store()
            .registers_switched_on(&self.enabled)
            .into_iter()
            .filter(|reg| types.iter().any(|ty| ty.is_allowed_register(reg)))
            .map(|reg| {
                let name = if att {
                    format!("%{}", reg.name())
                } else {
                    reg.name().to_string()
                };
                let archs = ArchSet::single(reg.arch());
                CompletionCandidate {
                    display: display_text(&name, Some(&archs), reg.class().describe()),
                    insert_text: self.cased(&name),
                    documentation: reg.class().describe().to_string(),
                    label: name,
                    kind: CandidateKind::Register,
                }
            })
            .collect();
        if !att {
            out.extend(
                keywords::size_keywords()
                    .iter()
                    .filter(|keyword| types.iter().any(|ty| ty.is_allowed_size_keyword(keyword.name)))
                    .map(|keyword| self.keyword_candidate(keyword, CandidateKind::Keyword)),
            );
        }
        out
    }

    fn surviving_entries(&self, mnemonic: &Mnemonic, completed: &[String]) -> Vec<&SignatureEntry> {
        let operands = make_operands(completed, self.dialect());
        signature::constrain(
            self.store().signatures_switched_on(mnemonic, &self.enabled),
            &operands,
            &self.enabled,
            self.dialect(),
        )
    }

    pub fn signature_help(&self, line_text: &str, character: usize) -> Option<SignatureHelpInfo> {
        let column = clamp_column(line_text, character);
        if remark_start(line_text, self.dialect()).is_some_and(|start| start < column) {
            return None;
        }
        let before = &line_text[..column];
        let parsed = self.parser.parse(before, 0, DOCUMENT_FILE_ID);
        let mnemonic_end = parsed.mnemonic_span?.end as usize;
        if column <= mnemonic_end {
            return None;
        }
        let comma_count = parsed.operands.len().saturating_sub(1);
        let completed = &parsed.operands[..comma_count];
        let mut entries = self.surviving_entries(&parsed.mnemonic, completed);
        if entries.is_empty() {
            entries = self
                .store()
                .signatures_switched_on(&parsed.mnemonic, &self.enabled);
        }
        if entries.is_empty() {
            return None;
        }
        let signatures: Vec<SignatureInfo> = entries
            .iter()
            .map(|entry| {
                let active = entry.active_parameter(comma_count, self.dialect());
                SignatureInfo {
                    label: entry.signature_text.clone(),
                    documentation: format!("{} [{}]", entry.documentation, entry.archs),
                    parameters: entry
                        .params
                        .iter()
                        .map(|param| ParameterInfo {
                            label: param.label_span,
                            documentation: param.documentation(),
                        })
                        .collect(),
                    active_parameter: active,
                }
            })
            .collect();
        // First overload that still has room for the operand being typed.
        let active_signature = entries
            .iter()
            .position(|entry| entry.param_count() > comma_count)
            .unwrap_or(0);
        let active_parameter = if self.dialect().is_att() {
            signatures[active_signature].active_parameter
        } else {
            signature::active_parameter(comma_count, &entries)
        };
        Some(SignatureHelpInfo {
            signatures,
            active_signature,
            active_parameter,
        })
    }

    pub fn hover(&self, line_text: &str, line: u32, character: usize) -> Option<HoverInfo> {
        let column = clamp_column(line_text, character);
        if remark_start(line_text, self.dialect()).is_some_and(|start| start <= column) {
            return None;
        }
        let (word, span) = keyword_at(line_text, column)?;
        let at = LineRef::new(DOCUMENT_FILE_ID, line);
        let key = self.snapshot.graph.resolve_at(&word, at);
        let defined = !self.snapshot.graph.resolve_definitions(&key).is_empty();

        let (kind, contents) = if defined {
            (HoverKind::Label, self.label_hover(&word, &key))
        } else if let Some(mnemonic) = self.parser.find_mnemonic(&word) {
            (HoverKind::Mnemonic, self.mnemonic_hover(&mnemonic))
        } else if let Some(reg) = Register::parse(&word).filter(|reg| self.enabled.contains(reg.arch())) {
            let contents = format!(
                "**{}** ({}, {} bits) [{}]",
                reg.name(),
                reg.class().describe(),
                reg.width(),
                reg.arch()
            );
            (HoverKind::Register, contents)
        } else if let Some(keyword) = keywords::lookup(self.dialect(), &word) {
            (HoverKind::Keyword, format!("**{}**: {}", keyword.name, keyword.description))
        } else if let Some(constant) = to_constant(&word) {
            let contents = format!(
                "Constant {}: decimal {}, hex 0x{:X}, {} bits",
                word, constant.value, constant.value, constant.bits
            );
            (HoverKind::Constant, contents)
        } else if !self.snapshot.graph.usages_of(&key).is_empty() {
            (HoverKind::Label, self.label_hover(&word, &key))
        } else {
            return None;
        };
        Some(HoverInfo {
            kind,
            word,
            span,
            contents,
        })
    }

    fn mnemonic_hover(&self, mnemonic: &Mnemonic) -> String {
        let store = self.store();
        let mut out = format!("**{}** [{}]", mnemonic, store.arch_of(mnemonic));
        if let Some(description) = store.description(mnemonic) {
            out.push_str("\n\n");
            out.push_str(description);
        }
        let signatures = store.signatures_switched_on(mnemonic, &self.enabled);
        if !signatures.is_empty() {
            out.push('\n');
            for entry in signatures {
                out.push_str(&format!(
                    "\n- `{}` [{}] {}",
                    entry.signature_text, entry.archs, entry.documentation
                ));
            }
        }
        let timings = self.ctx.performance().rows_for(mnemonic, self.micro_archs);
        if !timings.is_empty() {
            out.push_str("\n\n**Performance:**\n```text\n");
            out.push_str(&performance::format_table(&timings));
            out.push_str("\n```");
        }
        if let Some(reference) = store.reference(mnemonic) {
            out.push_str(&format!("\n\n[Reference]({reference})"));
        }
        out
    }

    fn label_hover(&self, word: &str, key: &str) -> String {
        let graph = &self.snapshot.graph;
        let labels: BTreeMap<KeywordId, _> = graph
            .labels()
            .into_iter()
            .map(|info| (info.id, info))
            .collect();
        let sites = graph.resolve_definitions(key);
        if sites.is_empty() {
            return format!("Label **{word}** is not defined");
        }
        let mut out = format!("Label **{word}**");
        for id in &sites {
            let Some(info) = labels.get(id) else {
                continue;
            };
            let what = match info.kind {
                LabelKind::Regular => "defined at",
                LabelKind::Proto => "declared (PROTO) at",
                LabelKind::Extern => "declared extern at",
            };
            out.push_str(&format!("\n\n{what} {}", info.description));
        }
        let usages = graph.usages_of(key).len();
        out.push_str(&format!("\n\nused {usages} time{}", if usages == 1 { "" } else { "s" }));
        out
    }

    /// Definition sites of the label under the cursor.
    pub fn definition(&self, line_text: &str, line: u32, character: usize) -> Vec<KeywordId> {
        let column = clamp_column(line_text, character);
        let Some((word, _)) = keyword_at(line_text, column) else {
            return Vec::new();
        };
        let key = self
            .snapshot
            .graph
            .resolve_at(&word, LineRef::new(DOCUMENT_FILE_ID, line));
        self.snapshot.graph.resolve_definitions(&key)
    }

    /// Usage sites of the label under the cursor, optionally with its
    /// definitions, in document order.
    pub fn references(
        &self,
        line_text: &str,
        line: u32,
        character: usize,
        include_declaration: bool,
    ) -> Vec<KeywordId> {
        let column = clamp_column(line_text, character);
        let Some((word, _)) = keyword_at(line_text, column) else {
            return Vec::new();
        };
        let graph = &self.snapshot.graph;
        let key = graph.resolve_at(&word, LineRef::new(DOCUMENT_FILE_ID, line));
        let mut out = graph.usages_of(&key);
        if include_declaration {
            out.extend(graph.resolve_definitions(&key));
        }
        out.sort();
        out.dedup();
        out
    }
}

/// `KEYWORD [ARCH] - description`, cut to the display limit.
fn display_text(keyword: &str, archs: Option<&ArchSet>, description: &str) -> String {
    let mut text = keyword.to_string();
    if let Some(archs) = archs.filter(|archs| !archs.is_empty()) {
        text.push_str(&format!(" [{archs}]"));
    }
    if !description.is_empty() {
        text.push_str(" - ");
        text.push_str(description);
    }
    if text.chars().count() > MAX_DISPLAY_LEN {
        text = text.chars().take(MAX_DISPLAY_LEN).collect();
    }
    text
}

fn clamp_column(text: &str, column: usize) -> usize {
    let mut column = column.min(text.len());
    while !text.is_char_boundary(column) {
        column -= 1;
    }
    column
}

fn word_start(text: &str, column: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = column;
    while start > 0 && is_word_char(bytes[start - 1] as char) {
        start -= 1;
    }
    start
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arch::Arch;
    use crate::core::options::AnalysisOptions;
    use crate::core::signature_store::SignatureStore;
    use std::sync::Arc;

    fn context(dialect: Dialect) -> AnalysisContext {
        let ctx = AnalysisContext::new(Arc::new(SignatureStore::builtin()));
        ctx.set_options(AnalysisOptions {
            dialect,
            ..AnalysisOptions::default()
        });
        ctx
    }

    fn snapshot(ctx: &AnalysisContext, text: &str) -> AnalysisSnapshot {
        let lines = Arc::new(text.lines().map(str::to_string).collect());
        AnalysisSnapshot::build(ctx, 1, lines, None)
    }

    fn labels(candidates: &[CompletionCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn mnemonic_completion_filters_by_prefix() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        let found = query.completion("  mo", 0, 4);
        assert!(labels(&found).contains(&"MOV"));
        assert!(found.iter().all(|c| c.label.to_ascii_uppercase().starts_with("MO")));
        let mov = found.iter().find(|c| c.label == "MOV").expect("MOV offered");
        assert!(mov.display.starts_with("MOV ["));
        assert!(mov.display.chars().count() <= MAX_DISPLAY_LEN);
    }

    #[test]
    fn no_completion_after_separator_or_in_remark() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        assert!(query.completion("mov rax, ", 0, 9).is_empty());
        assert!(query.completion("nop ; mo", 0, 8).is_empty());
    }

    #[test]
    fn jump_completion_offers_labels() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "start:\nstop:\n jmp st");
        let query = QueryFacade::new(&ctx, &snap).use_capitals(false);
        let found = query.completion(" jmp st", 2, 7);
        assert_eq!(labels(&found), vec!["start", "stop"]);
        assert_eq!(found[0].documentation, "LINE 1 (document)");
    }

    #[test]
    fn operand_completion_follows_signatures() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        let found = query.completion("movzx eax, b", 0, 12);
        let names = labels(&found);
        assert!(names.contains(&"BL"));
        assert!(names.contains(&"BX"));
        assert!(names.contains(&"BYTE"));
        let found = query.completion("movzx eax, d", 0, 12);
        let names = labels(&found);
        assert!(names.contains(&"DL"));
        assert!(!names.contains(&"DWORD"));
        assert!(!names.contains(&"EDX"));
    }

    #[test]
    fn att_registers_carry_percent() {
        let ctx = context(Dialect::NasmAtt);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        let found = query.completion("movl %ea", 0, 8);
        assert!(labels(&found).contains(&"%EAX"));
    }

    #[test]
    fn signature_help_tracks_commas() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        assert!(query.signature_help("mov", 3).is_none());
        let help = query.signature_help("mov rax, ", 9).expect("help");
        assert_eq!(help.active_parameter, 1);
        assert!(help.signatures.iter().all(|sig| sig.label.starts_with("MOV")));
        assert!(help.signatures.iter().all(|sig| !sig.label.contains("r/m8,")));
        let help = query.signature_help("ret ", 4).expect("ret help");
        assert_eq!(help.active_parameter, 0);
    }

    #[test]
    fn signature_help_prefers_overloads_with_room_left() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        let help = query.signature_help("imul eax, ", 10).expect("imul help");
        assert_eq!(help.active_parameter, 1);
        let active = &help.signatures[help.active_signature];
        assert!(active.parameters.len() >= 2, "active: {}", active.label);
        assert_eq!(active.active_parameter, 1);
        let single = help
            .signatures
            .iter()
            .find(|sig| sig.label == "IMUL r/m32")
            .expect("one-operand form survives");
        assert_eq!(single.active_parameter, 0);
    }

    #[test]
    fn hover_resolves_each_token_kind() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "main:\n mov rax, 0x10\n jmp main");
        let query = QueryFacade::new(&ctx, &snap);
        let hover = query.hover(" mov rax, 0x10", 1, 2).expect("mnemonic hover");
        assert_eq!(hover.kind, HoverKind::Mnemonic);
        assert!(hover.contents.starts_with("**MOV**"));
        let hover = query.hover(" mov rax, 0x10", 1, 6).expect("register hover");
        assert_eq!(hover.kind, HoverKind::Register);
        let hover = query.hover(" mov rax, 0x10", 1, 11).expect("constant hover");
        assert_eq!(hover.kind, HoverKind::Constant);
        assert!(hover.contents.contains("decimal 16"));
        let hover = query.hover(" jmp main", 2, 6).expect("label hover");
        assert_eq!(hover.kind, HoverKind::Label);
        assert!(hover.contents.contains("defined at LINE 1"));
    }

    #[test]
    fn mnemonic_hover_lists_timings_of_selected_microarchitectures() {
        let ctx = context(Dialect::NasmIntel);
        let snap = snapshot(&ctx, "");
        let hover = QueryFacade::new(&ctx, &snap)
            .hover(" imul eax, ebx", 0, 2)
            .expect("mnemonic hover");
        assert!(hover.contents.contains("**Performance:**"));
        assert!(hover.contents.contains("Haswell"));
        assert!(hover.contents.contains("SkylakeX"));
        assert!(!hover.contents.contains("SandyBridge"));

        ctx.set_micro_archs(MicroArchSet::empty());
        let hover = QueryFacade::new(&ctx, &snap)
            .hover(" imul eax, ebx", 0, 2)
            .expect("mnemonic hover");
        assert!(!hover.contents.contains("**Performance:**"));
    }

    #[test]
    fn register_hover_needs_its_architecture() {
        let ctx = context(Dialect::NasmIntel);
        ctx.set_enabled_archs([Arch::I8086, Arch::I386].into_iter().collect());
        let snap = snapshot(&ctx, "");
        let query = QueryFacade::new(&ctx, &snap);
        assert!(query.hover("mov zmm3, zmm4", 0, 5).is_none());
        assert!(query.hover("mov eax, ebx", 0, 5).is_some());
    }

    #[test]
    fn definition_and_references_use_scope() {
        let ctx = context(Dialect::NasmIntel);
        let text = "a:\n.loop: jmp .loop\nb:\n.loop: jmp .loop";
        let snap = snapshot(&ctx, text);
        let query = QueryFacade::new(&ctx, &snap);
        let defs = query.definition(".loop: jmp .loop", 3, 13);
        assert_eq!(defs, vec![KeywordId::new(0, 3, Span::new(0, 5))]);
        let refs = query.references(".loop: jmp .loop", 1, 2, true);
        assert_eq!(
            refs,
            vec![
                KeywordId::new(0, 1, Span::new(0, 5)),
                KeywordId::new(0, 1, Span::new(11, 16)),
            ]
        );
    }

    #[test]
    fn display_text_is_truncated() {
        let long = "x".repeat(300);
        assert_eq!(display_text("MOV", None, &long).chars().count(), MAX_DISPLAY_LEN);
    }
}
