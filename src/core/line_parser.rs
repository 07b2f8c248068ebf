// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Single-line decomposition into label, mnemonic, operands and remark.
//!
//! Parsing never fails. Text the parser does not understand ends up with
//! `mnemonic == Mnemonic::NONE` and no operands; nothing is rejected.

use std::sync::Arc;

use crate::core::dialect::Dialect;
use crate::core::keyword_id::Span;
use crate::core::keywords;
use crate::core::mnemonic::Mnemonic;
use crate::core::signature_store::SignatureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Regular,
    /// MASM `name PROTO`: a forward declaration.
    Proto,
    /// `EXTERN name`: defined in another module.
    Extern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDef {
    pub name: String,
    pub span: Span,
    pub kind: LabelKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub label: Option<LabelDef>,
    pub mnemonic: Mnemonic,
    pub mnemonic_span: Option<Span>,
    pub operands: Vec<String>,
    pub operand_spans: Vec<Span>,
    /// Remark text including its introducing character.
    pub remark: Option<String>,
    pub remark_start: Option<usize>,
    pub is_jump: bool,
    pub line_number: u32,
    pub file_id: u32,
}

impl ParsedLine {
    pub fn label_name(&self) -> Option<&str> {
        self.label.as_ref().map(|label| label.name.as_str())
    }

    pub fn has_mnemonic(&self) -> bool {
        !self.mnemonic.is_none()
    }
}

/// Dialect-aware line parser. Mnemonic recognition is driven by the
/// signature store, so the parser knows exactly the instructions the
/// tables declare.
#[derive(Debug, Clone)]
pub struct LineParser {
    dialect: Dialect,
    store: Arc<SignatureStore>,
}

impl LineParser {
    pub fn new(dialect: Dialect, store: Arc<SignatureStore>) -> Self {
        Self { dialect, store }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    pub fn parse(&self, line: &str, line_number: u32, file_id: u32) -> ParsedLine {
        let remark_start = remark_start(line, self.dialect);
        let code_end = remark_start.unwrap_or(line.len());
        let code = &line[..code_end];

        let (label, mut pos) = match self.label_definition(code) {
            Some((label, end)) => (Some(label), end),
            None => (None, 0),
        };

        let mut mnemonic = Mnemonic::NONE;
        let mut mnemonic_span = None;
        for span in word_spans(code, pos) {
            let word = &code[span.start as usize..span.end as usize];
            if keywords::is_prefix(word) {
                continue;
            }
            if let Some(found) = self.find_mnemonic(word) {
                mnemonic = found;
                mnemonic_span = Some(span);
                pos = span.end as usize;
                break;
            }
            if keywords::is_directive(self.dialect, word) {
                break;
            }
        }

        let (operands, operand_spans) = if mnemonic_span.is_some() {
            split_operands(code, pos)
        } else {
            (Vec::new(), Vec::new())
        };
        let is_jump = self.store.is_jump(&mnemonic);

        ParsedLine {
            label,
            mnemonic,
            mnemonic_span,
            operands,
            operand_spans,
            remark: remark_start.map(|start| line[start..].to_string()),
            remark_start,
            is_jump,
            line_number,
            file_id,
        }
    }

    /// Resolves `word` to a mnemonic known to the store. AT&T size suffixes
    /// (`movl`, `pushq`) are stripped when the full spelling is unknown.
    pub fn find_mnemonic(&self, word: &str) -> Option<Mnemonic> {
        if let Some(mnemonic) = self.store.lookup(word) {
            return Some(mnemonic);
        }
        if self.dialect.is_att() {
            let stem = Mnemonic::new(word).without_att_suffix()?;
            if self.store.contains(&stem) {
                return Some(stem);
            }
        }
        None
    }

    /// Label defined on this line and the column where code continues.
    fn label_definition(&self, code: &str) -> Option<(LabelDef, usize)> {
        let mut words = word_spans(code, 0).into_iter();
        let first = words.next()?;
        let first_text = &code[first.start as usize..first.end as usize];
        let after_first = &code[first.end as usize..];

        // `name:` and `name::`
        if after_first.starts_with(':') && is_label_identifier(first_text) {
            let colons = if after_first.starts_with("::") { 2 } else { 1 };
            let label = LabelDef {
                name: first_text.to_string(),
                span: first,
                kind: LabelKind::Regular,
            };
            return Some((label, first.end as usize + colons));
        }

        let second = words.next();
        let second_text = second.map(|span| &code[span.start as usize..span.end as usize]);

        if is_extern_keyword(first_text) {
            let span = second?;
            let name = second_text?;
            if !is_label_identifier(name) {
                return None;
            }
            let label = LabelDef {
                name: name.to_string(),
                span,
                kind: LabelKind::Extern,
            };
            return Some((label, code.len()));
        }

        let second_text = second_text?;
        if !is_label_identifier(first_text) || self.find_mnemonic(first_text).is_some() {
            return None;
        }
        let kind = if second_text.eq_ignore_ascii_case("EQU") {
            LabelKind::Regular
        } else if self.dialect.is_masm() {
            match second_text.to_ascii_uppercase().as_str() {
                "PROC" | "LABEL" => LabelKind::Regular,
                "PROTO" => LabelKind::Proto,
                word if keywords::is_masm_data_directive(word) => LabelKind::Regular,
                _ => return None,
            }
        } else if self.dialect == Dialect::NasmIntel && is_nasm_data_directive(second_text) {
            LabelKind::Regular
        } else {
            return None;
        };
        let label = LabelDef {
            name: first_text.to_string(),
            span: first,
            kind,
        };
        Some((label, first.end as usize))
    }
}

/// Column of the first remark character outside quotes.
pub fn remark_start(line: &str, dialect: Dialect) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in line.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if dialect.is_remark_char(ch) => return Some(idx),
            None => {}
        }
    }
    None
}

/// Characters that make up a keyword. Everything else separates keywords.
pub fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '%' | '$' | '@' | '?')
}

pub fn is_separator(ch: char) -> bool {
    !is_word_char(ch)
}

/// Spans of the keywords in `text` from byte `from` on.
pub fn word_spans(text: &str, from: usize) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut idx = from.min(bytes.len());
    while idx < bytes.len() {
        if !is_word_char(bytes[idx] as char) {
            idx += 1;
            continue;
        }
        let start = idx;
        while idx < bytes.len() && is_word_char(bytes[idx] as char) {
            idx += 1;
        }
        spans.push(Span::new(start, idx));
    }
    spans
}

/// The keyword under (or immediately left of) `column`.
pub fn keyword_at(line: &str, column: usize) -> Option<(String, Span)> {
    let bytes = line.as_bytes();
    let column = column.min(bytes.len());
    let mut start = column;
    while start > 0 && is_word_char(bytes[start - 1] as char) {
        start -= 1;
    }
    let mut end = column;
    while end < bytes.len() && is_word_char(bytes[end] as char) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some((line[start..end].to_string(), Span::new(start, end)))
}

/// `%include "file"`, `INCLUDE file.inc`, `.include "file"`: the file name
/// and where it sits on the line.
pub fn include_directive(line: &str, dialect: Dialect) -> Option<(String, Span)> {
    let code_end = remark_start(line, dialect).unwrap_or(line.len());
    let code = &line[..code_end];
    let first = *word_spans(code, 0).first()?;
    let word = &code[first.start as usize..first.end as usize];
    if !matches!(
        word.to_ascii_uppercase().as_str(),
        "%INCLUDE" | "INCLUDE" | ".INCLUDE"
    ) {
        return None;
    }
    let rest = &code[first.end as usize..];
    let lead = rest.len() - rest.trim_start().len();
    let raw = rest.trim();
    let inner = raw
        .strip_prefix(['"', '\'', '<', '['])
        .and_then(|s| s.strip_suffix(['"', '\'', '>', ']']))
        .unwrap_or(raw);
    let name = inner.trim();
    if name.is_empty() {
        return None;
    }
    let offset = first.end as usize + lead + raw.find(name).unwrap_or(0);
    Some((name.to_string(), Span::new(offset, offset + name.len())))
}

/// Splits operands at top-level commas. A trailing comma leaves a trailing
/// empty operand so the caller can tell a new operand has started.
fn split_operands(code: &str, from: usize) -> (Vec<String>, Vec<Span>) {
    let text = &code[from..];
    if text.trim().is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut operands = Vec::new();
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut piece_start = 0usize;
    let mut push = |start: usize, end: usize| {
        let piece = &text[start..end];
        let lead = piece.len() - piece.trim_start().len();
        let trimmed = piece.trim();
        let abs = from + start + lead;
        operands.push(trimmed.to_string());
        spans.push(Span::new(abs, abs + trimmed.len()));
    };
    for (idx, ch) in text.char_indices() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                continue;
            }
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => {}
        }
        match ch {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                push(piece_start, idx);
                piece_start = idx + 1;
            }
            _ => {}
        }
    }
    push(piece_start, text.len());
    (operands, spans)
}

fn is_label_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || matches!(first, '_' | '.' | '@' | '?' | '$') => {
            text != "." && !text.starts_with('%')
        }
        _ => false,
    }
}

fn is_extern_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "EXTERN" | "EXTRN" | "EXTERNDEF" | ".EXTERN"
    )
}

fn is_nasm_data_directive(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "DB" | "DW" | "DD" | "DQ" | "DT" | "DO" | "DY" | "DZ" | "RESB" | "RESW" | "RESD"
            | "RESQ" | "REST"
    )
}
