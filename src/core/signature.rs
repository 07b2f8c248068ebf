// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction signatures and the narrowing rules used by completion and
//! signature help.

use std::collections::BTreeSet;

use crate::core::arch::ArchSet;
use crate::core::dialect::Dialect;
use crate::core::keyword_id::Span;
use crate::core::mnemonic::Mnemonic;
use crate::core::operand::Operand;
use crate::core::operand_type::{is_allowed, parse_pattern, OperandType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Pattern text as written in the table, e.g. `r/m32`.
    pub pattern: String,
    pub types: Vec<OperandType>,
    /// Where the parameter label sits inside the signature text.
    pub label_span: Span,
}

impl Parameter {
    pub fn documentation(&self) -> String {
        let docs: Vec<String> = self
            .types
            .iter()
            .filter(|ty| !ty.is_decorator())
            .map(OperandType::describe)
            .collect();
        docs.join(" or ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub mnemonic: Mnemonic,
    pub archs: ArchSet,
    pub params: Vec<Parameter>,
    pub signature_text: String,
    pub documentation: String,
}

impl SignatureEntry {
    /// Builds an entry from table columns. Returns `None` when the operand
    /// patterns and the parameters of the signature text disagree in count.
    pub fn from_columns(
        mnemonic: Mnemonic,
        operand_patterns: &str,
        archs: ArchSet,
        signature_text: &str,
        documentation: &str,
    ) -> Option<SignatureEntry> {
        let patterns: Vec<&str> = split_list(operand_patterns);
        let offsets = parameter_offsets(signature_text);
        if patterns.len() != offsets.len() {
            return None;
        }
        let params = patterns
            .into_iter()
            .zip(offsets)
            .map(|(pattern, label_span)| Parameter {
                pattern: pattern.to_string(),
                types: parse_pattern(pattern),
                label_span,
            })
            .collect();
        Some(SignatureEntry {
            mnemonic,
            archs,
            params,
            signature_text: signature_text.trim().to_string(),
            documentation: documentation.trim().to_string(),
        })
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn arch_allowed(&self, enabled: &ArchSet) -> bool {
        self.archs.intersects(enabled)
    }

    /// Whether `operand` may appear at position `index`. Positions beyond
    /// the declared parameters never match.
    pub fn allowed(&self, index: usize, operand: &Operand) -> bool {
        match self.params.get(index) {
            Some(param) => is_allowed(&param.types, operand),
            None => false,
        }
    }

    pub fn is_jump(&self) -> bool {
        self.params
            .iter()
            .any(|param| param.types.iter().any(OperandType::is_relative))
    }

    pub fn types_at(&self, index: usize) -> &[OperandType] {
        self.params
            .get(index)
            .map(|param| param.types.as_slice())
            .unwrap_or(&[])
    }

    /// Table position of the operand written at `index`. Tables are in
    /// Intel order, AT&T writes operands in reverse.
    pub fn position(&self, index: usize, dialect: Dialect) -> Option<usize> {
        if dialect.is_att() {
            self.param_count().checked_sub(index + 1)
        } else {
            (index < self.param_count()).then_some(index)
        }
    }

    /// Parameter highlighted after `comma_count` commas, as a table position.
    pub fn active_parameter(&self, comma_count: usize, dialect: Dialect) -> usize {
        let clamped = comma_count.min(self.param_count().saturating_sub(1));
        if dialect.is_att() {
            self.param_count().saturating_sub(clamped + 1)
        } else {
            clamped
        }
    }
}

/// Keeps the entries that are switched on and accept every completed
/// operand. `operands` are in written order.
pub fn constrain<'a>(
    entries: impl IntoIterator<Item = &'a SignatureEntry>,
    operands: &[Operand],
    enabled: &ArchSet,
    dialect: Dialect,
) -> Vec<&'a SignatureEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.arch_allowed(enabled))
        .filter(|entry| {
            operands.iter().enumerate().all(|(index, operand)| {
                entry
                    .position(index, dialect)
                    .is_some_and(|pos| entry.allowed(pos, operand))
            })
        })
        .collect()
}

/// Comma count clamped to the last parameter any surviving entry declares.
pub fn active_parameter(comma_count: usize, entries: &[&SignatureEntry]) -> usize {
    let max_params = entries
        .iter()
        .map(|entry| entry.param_count())
        .max()
        .unwrap_or(0);
    if max_params == 0 {
        return 0;
    }
    comma_count.min(max_params - 1)
}

/// Union of the operand types admitted at written position `index` by
/// `entries`.
pub fn allowed_types_at(
    entries: &[&SignatureEntry],
    index: usize,
    dialect: Dialect,
) -> BTreeSet<OperandType> {
    entries
        .iter()
        .filter_map(|entry| entry.position(index, dialect).map(|pos| entry.types_at(pos)))
        .flat_map(|types| types.iter().copied())
        .collect()
}

fn split_list(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::trim).collect()
}

/// Column ranges of the comma separated parameters following the mnemonic
/// in `signature_text` (`ADD r/m32, imm8` yields the ranges of `r/m32` and
/// `imm8`).
fn parameter_offsets(signature_text: &str) -> Vec<Span> {
    let text = signature_text.trim();
    let Some(space) = text.find(char::is_whitespace) else {
        return Vec::new();
    };
    let mut spans = Vec::new();
    let mut start = space + 1;
    for piece in text[space + 1..].split(',') {
        let lead = piece.len() - piece.trim_start().len();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            spans.push(Span::new(start + lead, start + lead + trimmed.len()));
        }
        start += piece.len() + 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arch::Arch;
    use crate::core::operand::make_operands;

    fn entry(patterns: &str, arch: Arch, text: &str) -> SignatureEntry {
        SignatureEntry::from_columns(
            Mnemonic::new(text.split_whitespace().next().unwrap_or("")),
            patterns,
            ArchSet::single(arch),
            text,
            "",
        )
        .expect("consistent row")
    }

    fn operands(args: &[&str]) -> Vec<Operand> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        make_operands(&args, Dialect::NasmIntel)
    }

    #[test]
    fn parameter_offsets_point_into_signature_text() {
        let sig = entry("r/m32,imm8", Arch::I386, "ADD r/m32, imm8");
        let spans: Vec<&str> = sig
            .params
            .iter()
            .map(|p| &sig.signature_text[p.label_span.start as usize..p.label_span.end as usize])
            .collect();
        assert_eq!(spans, vec!["r/m32", "imm8"]);
        assert!(SignatureEntry::from_columns(
            Mnemonic::new("ADD"),
            "r/m32",
            ArchSet::single(Arch::I386),
            "ADD r/m32, imm8",
            "",
        )
        .is_none());
    }

    #[test]
    fn constrain_filters_by_arch_and_operands() {
        let table = vec![
            entry("r/m32,imm8", Arch::I386, "ADD r/m32, imm8"),
            entry("r/m64,r64", Arch::X64, "ADD r/m64, r64"),
            entry("xmm1,xmm2/m128", Arch::Sse, "ADDPS xmm1, xmm2/m128"),
        ];
        let enabled = ArchSet::default_enabled();
        let kept = constrain(&table, &operands(&["rax"]), &enabled, Dialect::NasmIntel);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].signature_text, "ADD r/m64, r64");

        let kept = constrain(&table, &operands(&["[rax]"]), &enabled, Dialect::NasmIntel);
        assert_eq!(kept.len(), 2);

        let only_386 = ArchSet::single(Arch::I386);
        let kept = constrain(&table, &[], &only_386, Dialect::NasmIntel);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn extra_operands_eliminate_entries() {
        let table = vec![entry("r/m32", Arch::I386, "INC r/m32")];
        let kept = constrain(&table, &operands(&["eax", "ebx"]), &ArchSet::all(), Dialect::NasmIntel);
        assert!(kept.is_empty());
    }

    #[test]
    fn active_parameter_is_clamped() {
        let a = entry("r/m32,imm8", Arch::I386, "ADD r/m32, imm8");
        let b = entry("r32,r/m32,imm8", Arch::I386, "IMUL r32, r/m32, imm8");
        assert_eq!(active_parameter(1, &[&a]), 1);
        assert_eq!(active_parameter(5, &[&a]), 1);
        assert_eq!(active_parameter(5, &[&a, &b]), 2);
        assert_eq!(active_parameter(3, &[]), 0);
    }

    #[test]
    fn att_operands_map_to_reversed_positions() {
        let table = vec![
            entry("r/m32,imm8", Arch::I386, "ADD r/m32, imm8"),
            entry("r/m32,r32", Arch::I386, "ADD r/m32, r32"),
        ];
        let args = vec!["$5".to_string()];
        let written = make_operands(&args, Dialect::NasmAtt);
        let kept = constrain(&table, &written, &ArchSet::all(), Dialect::NasmAtt);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].signature_text, "ADD r/m32, imm8");

        let types = allowed_types_at(&kept, 1, Dialect::NasmAtt);
        assert!(types.contains(&OperandType::R32));
        assert!(types.contains(&OperandType::M32));
        assert_eq!(kept[0].active_parameter(0, Dialect::NasmAtt), 1);
        assert_eq!(kept[0].active_parameter(4, Dialect::NasmAtt), 0);
        assert_eq!(kept[0].active_parameter(4, Dialect::NasmIntel), 1);
    }

    #[test]
    fn jump_entries_are_detected_from_operand_types() {
        assert!(entry("rel32", Arch::I386, "JMP rel32").is_jump());
        assert!(!entry("r/m32", Arch::I386, "INC r/m32").is_jump());
    }

    #[test]
    fn union_of_types_at_position() {
        let a = entry("r/m32,imm8", Arch::I386, "ADD r/m32, imm8");
        let b = entry("r/m32,r32", Arch::I386, "ADD r/m32, r32");
        let types = allowed_types_at(&[&a, &b], 1, Dialect::NasmIntel);
        assert!(types.contains(&OperandType::Imm8));
        assert!(types.contains(&OperandType::R32));
        assert_eq!(types.len(), 2);
    }
}
