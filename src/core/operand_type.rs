// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand type vocabulary of the signature tables and the rules for matching
//! a concrete operand against it.

use std::fmt;

use tracing::debug;

use crate::core::operand::{size_keyword_bits, MemoryOperand, Operand, OperandKind};
use crate::core::register::{Register, RegisterClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperandType {
    /// Pattern text the loader did not recognise; matches anything.
    Unknown,
    Mem,
    M8,
    M16,
    M32,
    M64,
    M80,
    M128,
    M256,
    M512,
    R8,
    R16,
    R32,
    R64,
    RegAl,
    RegAx,
    RegEax,
    RegRax,
    RegCl,
    RegCx,
    RegEcx,
    RegRcx,
    RegDx,
    RegEdx,
    RegCs,
    RegDs,
    RegEs,
    RegSs,
    RegFs,
    RegGs,
    Sreg,
    Creg,
    Dreg,
    Zero,
    Unity,
    Imm,
    Imm8,
    Imm16,
    Imm32,
    Imm64,
    Rel8,
    Rel16,
    Rel32,
    Rel64,
    Near,
    Far,
    Short,
    Fpu0,
    FpuReg,
    K,
    Z,
    Sae,
    Er,
    Vm32X,
    Vm64X,
    Vm32Y,
    Vm64Y,
    Vm32Z,
    Vm64Z,
    Xmm0,
    Mmx,
    Xmm,
    Ymm,
    Zmm,
    Bnd,
    M32Bcst,
    M64Bcst,
}

impl OperandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperandType::Unknown => "UNKNOWN",
            OperandType::Mem => "MEM",
            OperandType::M8 => "M8",
            OperandType::M16 => "M16",
            OperandType::M32 => "M32",
            OperandType::M64 => "M64",
            OperandType::M80 => "M80",
            OperandType::M128 => "M128",
            OperandType::M256 => "M256",
            OperandType::M512 => "M512",
            OperandType::R8 => "R8",
            OperandType::R16 => "R16",
            OperandType::R32 => "R32",
            OperandType::R64 => "R64",
            OperandType::RegAl => "AL",
            OperandType::RegAx => "AX",
            OperandType::RegEax => "EAX",
            OperandType::RegRax => "RAX",
            OperandType::RegCl => "CL",
            OperandType::RegCx => "CX",
            OperandType::RegEcx => "ECX",
            OperandType::RegRcx => "RCX",
            OperandType::RegDx => "DX",
            OperandType::RegEdx => "EDX",
            OperandType::RegCs => "CS",
            OperandType::RegDs => "DS",
            OperandType::RegEs => "ES",
            OperandType::RegSs => "SS",
            OperandType::RegFs => "FS",
            OperandType::RegGs => "GS",
            OperandType::Sreg => "SREG",
            OperandType::Creg => "CR",
            OperandType::Dreg => "DR",
            OperandType::Zero => "0",
            OperandType::Unity => "1",
            OperandType::Imm => "IMM",
            OperandType::Imm8 => "IMM8",
            OperandType::Imm16 => "IMM16",
            OperandType::Imm32 => "IMM32",
            OperandType::Imm64 => "IMM64",
            OperandType::Rel8 => "REL8",
            OperandType::Rel16 => "REL16",
            OperandType::Rel32 => "REL32",
            OperandType::Rel64 => "REL64",
            OperandType::Near => "NEAR",
            OperandType::Far => "FAR",
            OperandType::Short => "SHORT",
            OperandType::Fpu0 => "ST(0)",
            OperandType::FpuReg => "ST(I)",
            OperandType::K => "K",
            OperandType::Z => "Z",
            OperandType::Sae => "SAE",
            OperandType::Er => "ER",
            OperandType::Vm32X => "VM32X",
            OperandType::Vm64X => "VM64X",
            OperandType::Vm32Y => "VM32Y",
            OperandType::Vm64Y => "VM64Y",
            OperandType::Vm32Z => "VM32Z",
            OperandType::Vm64Z => "VM64Z",
            OperandType::Xmm0 => "XMM0",
            OperandType::Mmx => "MM",
            OperandType::Xmm => "XMM",
            OperandType::Ymm => "YMM",
            OperandType::Zmm => "ZMM",
            OperandType::Bnd => "BND",
            OperandType::M32Bcst => "M32BCST",
            OperandType::M64Bcst => "M64BCST",
        }
    }

    /// One-line explanation used in signature help parameter docs.
    pub fn describe(&self) -> String {
        match self {
            OperandType::Unknown => "any operand".to_string(),
            OperandType::Mem => "memory operand".to_string(),
            OperandType::R8 => RegisterClass::Gp8.describe().to_string(),
            OperandType::R16 => RegisterClass::Gp16.describe().to_string(),
            OperandType::R32 => RegisterClass::Gp32.describe().to_string(),
            OperandType::R64 => RegisterClass::Gp64.describe().to_string(),
            OperandType::Sreg => RegisterClass::Segment.describe().to_string(),
            OperandType::Creg => RegisterClass::Control.describe().to_string(),
            OperandType::Dreg => RegisterClass::Debug.describe().to_string(),
            OperandType::Mmx => RegisterClass::Mmx.describe().to_string(),
            OperandType::Xmm => RegisterClass::Xmm.describe().to_string(),
            OperandType::Ymm => RegisterClass::Ymm.describe().to_string(),
            OperandType::Zmm => RegisterClass::Zmm.describe().to_string(),
            OperandType::K => RegisterClass::Opmask.describe().to_string(),
            OperandType::Bnd => RegisterClass::Bound.describe().to_string(),
            OperandType::FpuReg => RegisterClass::Fpu.describe().to_string(),
            OperandType::Fpu0 => "top of the x87 register stack".to_string(),
            OperandType::Xmm0 => "register XMM0".to_string(),
            OperandType::Zero => "the constant 0".to_string(),
            OperandType::Unity => "the constant 1".to_string(),
            OperandType::Imm => "immediate value".to_string(),
            OperandType::Near => "near jump target".to_string(),
            OperandType::Far => "far jump target".to_string(),
            OperandType::Short => "short jump target".to_string(),
            OperandType::Z => "zeroing-masking decorator".to_string(),
            OperandType::Sae => "suppress-all-exceptions decorator".to_string(),
            OperandType::Er => "embedded rounding decorator".to_string(),
            OperandType::M32Bcst => "32-bit memory broadcast".to_string(),
            OperandType::M64Bcst => "64-bit memory broadcast".to_string(),
            other => {
                if let Some(bits) = other.memory_bits() {
                    format!("{bits}-bit memory operand")
                } else if let Some(bits) = other.immediate_bits() {
                    if other.is_relative() {
                        format!("{bits}-bit relative jump target")
                    } else {
                        format!("{bits}-bit immediate value")
                    }
                } else if let Some(name) = other.specific_register() {
                    format!("register {name}")
                } else if let Some((bits, vector)) = other.vsib() {
                    format!("vector of {bits}-bit indices in {vector} (VSIB memory)")
                } else {
                    other.as_str().to_string()
                }
            }
        }
    }

    fn memory_bits(&self) -> Option<u16> {
        match self {
            OperandType::M8 => Some(8),
            OperandType::M16 => Some(16),
            OperandType::M32 => Some(32),
            OperandType::M64 => Some(64),
            OperandType::M80 => Some(80),
            OperandType::M128 => Some(128),
            OperandType::M256 => Some(256),
            OperandType::M512 => Some(512),
            _ => None,
        }
    }

    fn immediate_bits(&self) -> Option<u16> {
        match self {
            OperandType::Imm8 | OperandType::Rel8 => Some(8),
            OperandType::Imm16 | OperandType::Rel16 => Some(16),
            OperandType::Imm32 | OperandType::Rel32 => Some(32),
            OperandType::Imm64 | OperandType::Rel64 => Some(64),
            _ => None,
        }
    }

    fn specific_register(&self) -> Option<&'static str> {
        match self {
            OperandType::RegAl
            | OperandType::RegAx
            | OperandType::RegEax
            | OperandType::RegRax
            | OperandType::RegCl
            | OperandType::RegCx
            | OperandType::RegEcx
            | OperandType::RegRcx
            | OperandType::RegDx
            | OperandType::RegEdx
            | OperandType::RegCs
            | OperandType::RegDs
            | OperandType::RegEs
            | OperandType::RegSs
            | OperandType::RegFs
            | OperandType::RegGs
            | OperandType::Xmm0 => Some(self.as_str()),
            _ => None,
        }
    }

    fn register_class(&self) -> Option<RegisterClass> {
        match self {
            OperandType::R8 => Some(RegisterClass::Gp8),
            OperandType::R16 => Some(RegisterClass::Gp16),
            OperandType::R32 => Some(RegisterClass::Gp32),
            OperandType::R64 => Some(RegisterClass::Gp64),
            OperandType::Sreg => Some(RegisterClass::Segment),
            OperandType::Creg => Some(RegisterClass::Control),
            OperandType::Dreg => Some(RegisterClass::Debug),
            OperandType::Mmx => Some(RegisterClass::Mmx),
            OperandType::Xmm => Some(RegisterClass::Xmm),
            OperandType::Ymm => Some(RegisterClass::Ymm),
            OperandType::Zmm => Some(RegisterClass::Zmm),
            OperandType::K => Some(RegisterClass::Opmask),
            OperandType::Bnd => Some(RegisterClass::Bound),
            OperandType::FpuReg => Some(RegisterClass::Fpu),
            _ => None,
        }
    }

    /// Index width and vector register class of a VSIB type.
    fn vsib(&self) -> Option<(u16, &'static str)> {
        match self {
            OperandType::Vm32X => Some((32, "XMM")),
            OperandType::Vm64X => Some((64, "XMM")),
            OperandType::Vm32Y => Some((32, "YMM")),
            OperandType::Vm64Y => Some((64, "YMM")),
            OperandType::Vm32Z => Some((32, "ZMM")),
            OperandType::Vm64Z => Some((64, "ZMM")),
            _ => None,
        }
    }

    /// Types that name a branch target. Their presence marks a mnemonic as a
    /// jump.
    pub fn is_relative(&self) -> bool {
        matches!(
            self,
            OperandType::Rel8
                | OperandType::Rel16
                | OperandType::Rel32
                | OperandType::Rel64
                | OperandType::Near
                | OperandType::Far
                | OperandType::Short
        )
    }

    /// Decorator types describe instruction modifiers, never an operand.
    pub fn is_decorator(&self) -> bool {
        matches!(self, OperandType::Z | OperandType::Sae | OperandType::Er)
    }

    pub fn is_allowed_operand(&self, operand: &Operand) -> bool {
        match &operand.kind {
            OperandKind::Unknown => true,
            OperandKind::Register(reg) => self.is_allowed_register(reg),
            OperandKind::Immediate(constant) => match self {
                OperandType::Imm | OperandType::Near | OperandType::Far | OperandType::Short => {
                    true
                }
                OperandType::Zero => constant.value == 0,
                OperandType::Unity => constant.value == 1,
                other => other
                    .immediate_bits()
                    .is_some_and(|bits| constant.bits <= bits),
            },
            OperandKind::Memory(mem) => self.is_allowed_memory(mem),
        }
    }

    pub fn is_allowed_register(&self, reg: &Register) -> bool {
        if let Some(name) = self.specific_register() {
            return reg.name() == name;
        }
        if *self == OperandType::Fpu0 {
            return reg.class() == RegisterClass::Fpu && reg.number() == 0;
        }
        self.register_class() == Some(reg.class())
    }

    fn is_allowed_memory(&self, mem: &MemoryOperand) -> bool {
        let vector_index = mem
            .index
            .as_ref()
            .map(|index| index.class().is_vector())
            .unwrap_or(false);
        if let Some((_, vector)) = self.vsib() {
            return mem
                .index
                .as_ref()
                .is_some_and(|index| index.class().is_vector() && index.name().starts_with(vector));
        }
        if vector_index {
            return false;
        }
        match self {
            OperandType::Mem => true,
            OperandType::M32Bcst => mem.width.map_or(true, |bits| bits == 32),
            OperandType::M64Bcst => mem.width.map_or(true, |bits| bits == 64),
            other => match other.memory_bits() {
                Some(bits) => mem.width.map_or(true, |width| width == bits),
                None => false,
            },
        }
    }

    /// True when `keyword` (e.g. `QWORD`) may introduce a memory operand of
    /// this type.
    pub fn is_allowed_size_keyword(&self, keyword: &str) -> bool {
        let Some(bits) = size_keyword_bits(keyword) else {
            return false;
        };
        match self {
            OperandType::Mem => true,
            OperandType::M32Bcst => bits == 32,
            OperandType::M64Bcst => bits == 64,
            other => other.memory_bits() == Some(bits),
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when the operand matches at least one of `types`. An empty set,
/// or one holding [`OperandType::Unknown`], accepts everything.
pub fn is_allowed(types: &[OperandType], operand: &Operand) -> bool {
    if types.is_empty() || types.contains(&OperandType::Unknown) || operand.is_unknown() {
        return true;
    }
    types.iter().any(|ty| ty.is_allowed_operand(operand))
}

/// Parses the pattern of a single operand, e.g. `r/m32`, `xmm2/m128{k}` or
/// `r16/r32/r64`, into the set of types it admits.
pub fn parse_pattern(pattern: &str) -> Vec<OperandType> {
    let mut upper = pattern.trim().to_ascii_uppercase();
    let mut types = Vec::new();
    while let (Some(open), Some(close)) = (upper.find('{'), upper.find('}')) {
        if close < open {
            break;
        }
        match &upper[open + 1..close] {
            "K" | "K1" | "K2" => types.push(OperandType::K),
            "Z" => types.push(OperandType::Z),
            "ER" => types.push(OperandType::Er),
            "SAE" => types.push(OperandType::Sae),
            _ => {}
        }
        upper.replace_range(open..=close, "");
    }
    let upper = upper.replace("R/M", "R_M").replace("REG/M", "R_M");
    if upper.starts_with('M') && upper.ends_with("BYTE") {
        // `m14/28byte`, `m94/108byte`: environment blocks of odd sizes.
        types.push(OperandType::Mem);
        return types;
    }

    let mut prefix = String::new();
    for token in upper.split('/').map(str::trim).filter(|t| !t.is_empty()) {
        // `r32/64` shorthand reuses the letters of the previous token.
        let token = if token.chars().all(|c| c.is_ascii_digit()) && !prefix.is_empty() {
            format!("{prefix}{token}")
        } else {
            token.to_string()
        };
        prefix = token
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        for ty in parse_token(&token) {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
    }
    types
}

fn parse_token(token: &str) -> Vec<OperandType> {
    use OperandType as T;
    let token = token.trim_matches(|c| c == '<' || c == '>');
    if let Some(bits) = token.strip_prefix("R_M") {
        return match register_for_bits(bits) {
            Some(reg) => vec![reg, memory_for_bits(bits).unwrap_or(T::Mem)],
            None => vec![T::R16, T::R32, T::R64, T::Mem],
        };
    }
    let single = match token {
        "M" | "MEM" => T::Mem,
        "M8" => T::M8,
        "M16" | "M16INT" => T::M16,
        "M32" | "M32FP" | "M32INT" => T::M32,
        "M64" | "M64FP" | "M64INT" => T::M64,
        "M80" | "M80FP" | "M80BCD" | "M80DEC" => T::M80,
        "M128" => T::M128,
        "M256" => T::M256,
        "M512" => T::M512,
        "R8" => T::R8,
        "R16" => T::R16,
        "R32" | "REG" => T::R32,
        "R64" => T::R64,
        "AL" => T::RegAl,
        "AX" => T::RegAx,
        "EAX" => T::RegEax,
        "RAX" => T::RegRax,
        "CL" => T::RegCl,
        "CX" => T::RegCx,
        "ECX" => T::RegEcx,
        "RCX" => T::RegRcx,
        "DX" => T::RegDx,
        "EDX" => T::RegEdx,
        "CS" => T::RegCs,
        "DS" => T::RegDs,
        "ES" => T::RegEs,
        "SS" => T::RegSs,
        "FS" => T::RegFs,
        "GS" => T::RegGs,
        "SREG" | "REG_SREG" => T::Sreg,
        "CR" | "CR0-CR7" | "CR8" | "REG_CREG" => T::Creg,
        "DR" | "DR0-DR7" | "REG_DREG" => T::Dreg,
        "0" => T::Zero,
        "1" => T::Unity,
        "IMM" => T::Imm,
        "IMM8" | "MOFFS8" => T::Imm8,
        "IMM16" | "MOFFS16" => T::Imm16,
        "IMM32" | "MOFFS32" => T::Imm32,
        "IMM64" | "MOFFS64" => T::Imm64,
        "REL8" => T::Rel8,
        "REL16" => T::Rel16,
        "REL32" => T::Rel32,
        "REL64" => T::Rel64,
        "NEAR" => T::Near,
        "FAR" => T::Far,
        "SHORT" => T::Short,
        "ST(0)" | "ST0" => T::Fpu0,
        "ST" | "ST(I)" => T::FpuReg,
        "K" | "K+1" => T::K,
        "Z" => T::Z,
        "SAE" => T::Sae,
        "ER" => T::Er,
        "VM32X" => T::Vm32X,
        "VM64X" => T::Vm64X,
        "VM32Y" => T::Vm32Y,
        "VM64Y" => T::Vm64Y,
        "VM32Z" => T::Vm32Z,
        "VM64Z" => T::Vm64Z,
        "XMM0" | "XMM_ZERO" => T::Xmm0,
        "MM" => T::Mmx,
        "XMM" => T::Xmm,
        "YMM" => T::Ymm,
        "ZMM" => T::Zmm,
        "BND" => T::Bnd,
        "M32BCST" => T::M32Bcst,
        "M64BCST" => T::M64Bcst,
        other => return parse_numbered_token(other),
    };
    vec![single]
}

/// Intel manual style names with a trailing index (`xmm2`, `k1`, `mm1`,
/// `bnd3`) and odd-sized memory blocks (`m14/28byte`, `m16:32`).
fn parse_numbered_token(token: &str) -> Vec<OperandType> {
    use OperandType as T;
    let stem = token.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.len() < token.len() {
        match stem {
            "XMM" => return vec![T::Xmm],
            "YMM" => return vec![T::Ymm],
            "ZMM" => return vec![T::Zmm],
            "MM" => return vec![T::Mmx],
            "K" => return vec![T::K],
            "BND" => return vec![T::Bnd],
            _ => {}
        }
    }
    if token.starts_with("PTR16:") {
        return vec![T::Imm];
    }
    if token.starts_with('M') && (token.ends_with("BYTE") || token.contains(['&', ':'])) {
        return vec![T::Mem];
    }
    if token.starts_with("IMM") && token.contains(':') {
        return vec![T::Imm];
    }
    debug!(token, "unrecognised operand type in signature pattern");
    vec![T::Unknown]
}

fn register_for_bits(bits: &str) -> Option<OperandType> {
    match bits {
        "8" => Some(OperandType::R8),
        "16" => Some(OperandType::R16),
        "32" => Some(OperandType::R32),
        "64" => Some(OperandType::R64),
        _ => None,
    }
}

fn memory_for_bits(bits: &str) -> Option<OperandType> {
    match bits {
        "8" => Some(OperandType::M8),
        "16" => Some(OperandType::M16),
        "32" => Some(OperandType::M32),
        "64" => Some(OperandType::M64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dialect::Dialect;

    fn op(text: &str) -> Operand {
        Operand::parse(text, Dialect::NasmIntel)
    }

    #[test]
    fn parses_register_or_memory_patterns() {
        assert_eq!(
            parse_pattern("r/m32"),
            vec![OperandType::R32, OperandType::M32]
        );
        assert_eq!(
            parse_pattern("R/M64{ER}"),
            vec![OperandType::Er, OperandType::R64, OperandType::M64]
        );
        assert_eq!(
            parse_pattern("r16/r32/r64"),
            vec![OperandType::R16, OperandType::R32, OperandType::R64]
        );
        assert_eq!(parse_pattern("r32/64"), vec![OperandType::R32, OperandType::R64]);
    }

    #[test]
    fn parses_vector_patterns_with_decorators() {
        assert_eq!(
            parse_pattern("xmm1{k1}{z}"),
            vec![OperandType::K, OperandType::Z, OperandType::Xmm]
        );
        assert_eq!(
            parse_pattern("zmm3/m512/m32bcst"),
            vec![OperandType::Zmm, OperandType::M512, OperandType::M32Bcst]
        );
        assert_eq!(parse_pattern("m14/28byte"), vec![OperandType::Mem]);
        assert_eq!(parse_pattern("gibberish"), vec![OperandType::Unknown]);
    }

    #[test]
    fn immediates_match_by_width_and_value() {
        assert!(OperandType::Imm8.is_allowed_operand(&op("127")));
        assert!(!OperandType::Imm8.is_allowed_operand(&op("0x1234")));
        assert!(OperandType::Imm32.is_allowed_operand(&op("0x1234")));
        assert!(OperandType::Unity.is_allowed_operand(&op("1")));
        assert!(!OperandType::Unity.is_allowed_operand(&op("2")));
        assert!(OperandType::Rel32.is_allowed_operand(&op("100")));
        assert!(!OperandType::Z.is_allowed_operand(&op("0")));
    }

    #[test]
    fn registers_match_by_class_or_name() {
        assert!(OperandType::R64.is_allowed_operand(&op("r10")));
        assert!(!OperandType::R64.is_allowed_operand(&op("eax")));
        assert!(OperandType::RegCl.is_allowed_operand(&op("cl")));
        assert!(!OperandType::RegCl.is_allowed_operand(&op("dl")));
        assert!(OperandType::Fpu0.is_allowed_operand(&op("st(0)")));
        assert!(!OperandType::Fpu0.is_allowed_operand(&op("st(1)")));
    }

    #[test]
    fn memory_width_is_a_wildcard_when_unsized() {
        assert!(OperandType::M64.is_allowed_operand(&op("[rax]")));
        assert!(OperandType::M64.is_allowed_operand(&op("qword [rax]")));
        assert!(!OperandType::M64.is_allowed_operand(&op("dword [rax]")));
        assert!(!OperandType::R64.is_allowed_operand(&op("[rax]")));
        assert!(OperandType::Vm32Y.is_allowed_operand(&op("[rax + ymm1*4]")));
        assert!(!OperandType::M256.is_allowed_operand(&op("[rax + ymm1*4]")));
    }

    #[test]
    fn unknown_operands_and_types_are_wildcards() {
        assert!(is_allowed(&[OperandType::R8], &op("some_label")));
        assert!(is_allowed(&[OperandType::Unknown], &op("rax")));
        assert!(!is_allowed(&[OperandType::R8], &op("rax")));
    }

    #[test]
    fn size_keywords_follow_memory_width() {
        assert!(OperandType::M32.is_allowed_size_keyword("DWORD"));
        assert!(!OperandType::M32.is_allowed_size_keyword("QWORD"));
        assert!(OperandType::Mem.is_allowed_size_keyword("byte"));
        assert!(!OperandType::R32.is_allowed_size_keyword("DWORD"));
    }
}
