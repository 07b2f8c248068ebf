// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Query-time classification of operand text into register, immediate or
//! memory operands.

use crate::core::constant::{to_constant, Constant};
use crate::core::dialect::Dialect;
use crate::core::register::{Register, RegisterClass};

/// Memory reference decoded from `[...]` (Intel) or `disp(base,index,scale)`
/// (AT&T) syntax.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryOperand {
    pub base: Option<Register>,
    pub index: Option<Register>,
    pub scale: u8,
    pub displacement: i64,
    pub has_symbol: bool,
    pub rip_relative: bool,
    /// Width from a size keyword (`QWORD PTR`, `dword`); `None` when the
    /// source does not say.
    pub width: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    Register(Register),
    Immediate(Constant),
    Memory(MemoryOperand),
    /// Anything else: labels, symbols, expressions and half-typed text.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub text: String,
    pub kind: OperandKind,
}

impl Operand {
    pub fn parse(text: &str, dialect: Dialect) -> Operand {
        let text = text.trim();
        let core = strip_decorators(text);
        let kind = if core.is_empty() {
            OperandKind::Unknown
        } else if dialect.is_att() {
            classify_att(core)
        } else {
            classify_intel(core)
        };
        Operand {
            text: text.to_string(),
            kind,
        }
    }

    pub fn register(&self) -> Option<&Register> {
        match &self.kind {
            OperandKind::Register(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn immediate(&self) -> Option<Constant> {
        match &self.kind {
            OperandKind::Immediate(constant) => Some(*constant),
            _ => None,
        }
    }

    pub fn memory(&self) -> Option<&MemoryOperand> {
        match &self.kind {
            OperandKind::Memory(mem) => Some(mem),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, OperandKind::Unknown)
    }

    pub fn width_bits(&self) -> Option<u16> {
        match &self.kind {
            OperandKind::Register(reg) => Some(reg.width()),
            OperandKind::Immediate(constant) => Some(constant.bits),
            OperandKind::Memory(mem) => mem.width,
            OperandKind::Unknown => None,
        }
    }
}

/// Classifies operand strings as typed so far, in written order.
pub fn make_operands(args: &[String], dialect: Dialect) -> Vec<Operand> {
    args.iter().map(|arg| Operand::parse(arg, dialect)).collect()
}

/// Bits addressed by a memory size keyword.
pub fn size_keyword_bits(keyword: &str) -> Option<u16> {
    match keyword.to_ascii_uppercase().as_str() {
        "BYTE" | "SBYTE" => Some(8),
        "WORD" | "SWORD" => Some(16),
        "DWORD" | "SDWORD" | "REAL4" => Some(32),
        "FWORD" => Some(48),
        "QWORD" | "REAL8" | "MMWORD" => Some(64),
        "TBYTE" | "TWORD" | "REAL10" => Some(80),
        "OWORD" | "XMMWORD" => Some(128),
        "YMMWORD" | "YWORD" => Some(256),
        "ZMMWORD" | "ZWORD" => Some(512),
        _ => None,
    }
}

/// Drops trailing EVEX decorators such as `{k1}`, `{z}`, `{sae}`, `{1to16}`.
fn strip_decorators(text: &str) -> &str {
    let mut core = text.trim_end();
    while core.ends_with('}') {
        match core.rfind('{') {
            Some(open) => core = core[..open].trim_end(),
            None => break,
        }
    }
    core
}

fn classify_intel(text: &str) -> OperandKind {
    if let Some(reg) = Register::parse(text) {
        return OperandKind::Register(reg);
    }
    if let Some(constant) = to_constant(text) {
        return OperandKind::Immediate(constant);
    }
    match parse_intel_memory(text) {
        Some(mem) => OperandKind::Memory(mem),
        None => OperandKind::Unknown,
    }
}

fn classify_att(text: &str) -> OperandKind {
    let text = text.strip_prefix('*').unwrap_or(text).trim();
    if let Some(imm) = text.strip_prefix('$') {
        return match to_constant(imm) {
            Some(constant) => OperandKind::Immediate(constant),
            None => OperandKind::Unknown,
        };
    }
    if text.starts_with('%') {
        if let Some(reg) = Register::parse(text) {
            return OperandKind::Register(reg);
        }
    }
    match parse_att_memory(text) {
        Some(mem) => OperandKind::Memory(mem),
        None => OperandKind::Unknown,
    }
}

fn parse_intel_memory(text: &str) -> Option<MemoryOperand> {
    let Some(open) = text.find('[') else {
        return parse_masm_ptr(text);
    };
    let close = text.rfind(']')?;
    if close < open {
        return None;
    }
    let mut width = None;
    for word in text[..open]
        .split(|c: char| c.is_whitespace() || c == ':')
        .filter(|word| !word.is_empty())
    {
        if let Some(bits) = size_keyword_bits(word) {
            width = Some(bits);
        }
    }
    let mut mem = parse_address_terms(&text[open + 1..close])?;
    mem.width = width;
    Some(mem)
}

/// MASM `DWORD PTR var` form without brackets.
fn parse_masm_ptr(text: &str) -> Option<MemoryOperand> {
    let mut words = text.split_whitespace();
    let width = size_keyword_bits(words.next()?)?;
    if !words.next()?.eq_ignore_ascii_case("PTR") {
        return None;
    }
    let rest: Vec<&str> = words.collect();
    if rest.is_empty() {
        return None;
    }
    let mut mem = parse_address_terms(&rest.join(" "))?;
    mem.width = Some(width);
    Some(mem)
}

fn parse_address_terms(inner: &str) -> Option<MemoryOperand> {
    let inner = strip_segment_override(inner.trim());
    if inner.is_empty() {
        return None;
    }
    let mut mem = MemoryOperand::default();
    let mut sign = 1i64;
    let mut term = String::new();
    let mut terms: Vec<(i64, String)> = Vec::new();
    for ch in inner.chars() {
        match ch {
            '+' | '-' => {
                if !term.trim().is_empty() {
                    terms.push((sign, term.trim().to_string()));
                } else if !terms.is_empty() {
                    // `rax+-8` or a dangling operator.
                    if ch == '+' {
                        return None;
                    }
                }
                term.clear();
                sign = if ch == '-' { -1 } else { 1 };
            }
            _ => term.push(ch),
        }
    }
    if term.trim().is_empty() {
        return None;
    }
    terms.push((sign, term.trim().to_string()));

    for (sign, term) in terms {
        if let Some((left, right)) = term.split_once('*') {
            let (reg, scale) = match (Register::parse(left), Register::parse(right)) {
                (Some(reg), None) => (reg, to_constant(right)?),
                (None, Some(reg)) => (reg, to_constant(left)?),
                _ => return None,
            };
            if mem.index.is_some() || sign < 0 {
                return None;
            }
            mem.index = Some(reg);
            mem.scale = u8::try_from(scale.value).ok()?;
            continue;
        }
        if term.eq_ignore_ascii_case("RIP") || term.eq_ignore_ascii_case("EIP") {
            mem.rip_relative = true;
            continue;
        }
        if let Some(reg) = Register::parse(&term) {
            if sign < 0 {
                return None;
            }
            if mem.base.is_none() {
                mem.base = Some(reg);
            } else if mem.index.is_none() {
                mem.index = Some(reg);
                mem.scale = 1;
            } else {
                return None;
            }
            continue;
        }
        if let Some(constant) = to_constant(&term) {
            mem.displacement = mem.displacement.wrapping_add(constant.value.wrapping_mul(sign));
            continue;
        }
        if is_symbol(&term) {
            mem.has_symbol = true;
            continue;
        }
        return None;
    }
    validate_memory(mem)
}

fn validate_memory(mut mem: MemoryOperand) -> Option<MemoryOperand> {
    if mem.index.is_some() && mem.scale == 0 {
        mem.scale = 1;
    }
    if mem.index.is_some() && !matches!(mem.scale, 1 | 2 | 4 | 8) {
        return None;
    }
    if let Some(base) = &mem.base {
        if !base.class().is_general_purpose() || base.class() == RegisterClass::Gp8 {
            // A lone vector register base is really a VSIB index.
            if base.class().is_vector() && mem.index.is_none() {
                mem.index = mem.base.take();
                mem.scale = 1;
            } else {
                return None;
            }
        }
    }
    if let Some(index) = &mem.index {
        let vsib = index.class().is_vector();
        if !vsib && (!index.class().is_general_purpose() || index.class() == RegisterClass::Gp8) {
            return None;
        }
        if let Some(base) = &mem.base {
            if !vsib && base.width() != index.width() {
                return None;
            }
        }
    }
    Some(mem)
}

fn parse_att_memory(text: &str) -> Option<MemoryOperand> {
    let text = strip_segment_override(text);
    let Some(open) = text.find('(') else {
        // A bare number is an absolute address in AT&T syntax.
        let constant = to_constant(text)?;
        return Some(MemoryOperand {
            displacement: constant.value,
            ..MemoryOperand::default()
        });
    };
    let close = text.rfind(')')?;
    if close < open {
        return None;
    }
    let mut mem = MemoryOperand::default();
    let disp = text[..open].trim();
    if !disp.is_empty() {
        if let Some(constant) = to_constant(disp) {
            mem.displacement = constant.value;
        } else if is_symbol(disp) {
            mem.has_symbol = true;
        } else {
            return None;
        }
    }
    let parts: Vec<&str> = text[open + 1..close].split(',').map(str::trim).collect();
    if let Some(base) = parts.first().filter(|part| !part.is_empty()) {
        if base.eq_ignore_ascii_case("%rip") || base.eq_ignore_ascii_case("%eip") {
            mem.rip_relative = true;
        } else {
            mem.base = Some(Register::parse(base)?);
        }
    }
    if let Some(index) = parts.get(1).filter(|part| !part.is_empty()) {
        mem.index = Some(Register::parse(index)?);
        mem.scale = 1;
    }
    if let Some(scale) = parts.get(2).filter(|part| !part.is_empty()) {
        mem.scale = u8::try_from(to_constant(scale)?.value).ok()?;
    }
    if parts.len() > 3 {
        return None;
    }
    validate_memory(mem)
}

fn strip_segment_override(text: &str) -> &str {
    if let Some((segment, rest)) = text.split_once(':') {
        if Register::parse(segment.trim())
            .is_some_and(|reg| reg.class() == RegisterClass::Segment)
        {
            return rest.trim();
        }
    }
    text
}

fn is_symbol(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || matches!(first, '_' | '.' | '@' | '$' | '?'))
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '$' | '?'))
}
