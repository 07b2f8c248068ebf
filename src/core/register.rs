// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! x86 register names, classes, widths and the architecture each needs.

use std::fmt;

use crate::core::arch::Arch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterClass {
    Gp8,
    Gp16,
    Gp32,
    Gp64,
    Segment,
    Control,
    Debug,
    Mmx,
    Xmm,
    Ymm,
    Zmm,
    Opmask,
    Bound,
    Fpu,
}

impl RegisterClass {
    pub fn width(&self) -> u16 {
        match self {
            RegisterClass::Gp8 => 8,
            RegisterClass::Gp16 | RegisterClass::Segment => 16,
            RegisterClass::Gp32 => 32,
            RegisterClass::Gp64
            | RegisterClass::Control
            | RegisterClass::Debug
            | RegisterClass::Mmx
            | RegisterClass::Opmask => 64,
            RegisterClass::Fpu => 80,
            RegisterClass::Xmm | RegisterClass::Bound => 128,
            RegisterClass::Ymm => 256,
            RegisterClass::Zmm => 512,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RegisterClass::Gp8 => "8-bit general purpose register",
            RegisterClass::Gp16 => "16-bit general purpose register",
            RegisterClass::Gp32 => "32-bit general purpose register",
            RegisterClass::Gp64 => "64-bit general purpose register",
            RegisterClass::Segment => "segment register",
            RegisterClass::Control => "control register",
            RegisterClass::Debug => "debug register",
            RegisterClass::Mmx => "64-bit MMX register",
            RegisterClass::Xmm => "128-bit SSE register",
            RegisterClass::Ymm => "256-bit AVX register",
            RegisterClass::Zmm => "512-bit AVX-512 register",
            RegisterClass::Opmask => "AVX-512 opmask register",
            RegisterClass::Bound => "MPX bound register",
            RegisterClass::Fpu => "x87 floating point stack register",
        }
    }

    pub fn is_general_purpose(&self) -> bool {
        matches!(
            self,
            RegisterClass::Gp8 | RegisterClass::Gp16 | RegisterClass::Gp32 | RegisterClass::Gp64
        )
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            RegisterClass::Xmm | RegisterClass::Ymm | RegisterClass::Zmm
        )
    }
}

/// A register operand. The name is kept upper-case and canonical
/// (`ST(3)` is stored as `ST3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register {
    name: String,
    class: RegisterClass,
    number: u8,
}

const GP8_LEGACY: [&str; 8] = ["AL", "CL", "DL", "BL", "AH", "CH", "DH", "BH"];
const GP8_REX: [&str; 4] = ["SPL", "BPL", "SIL", "DIL"];
const GP16: [&str; 8] = ["AX", "CX", "DX", "BX", "SP", "BP", "SI", "DI"];
const GP32: [&str; 8] = ["EAX", "ECX", "EDX", "EBX", "ESP", "EBP", "ESI", "EDI"];
const GP64: [&str; 8] = ["RAX", "RCX", "RDX", "RBX", "RSP", "RBP", "RSI", "RDI"];
const SEGMENT: [&str; 6] = ["ES", "CS", "SS", "DS", "FS", "GS"];

impl Register {
    /// Parses a register name in any case. A leading AT&T `%` is ignored.
    pub fn parse(text: &str) -> Option<Register> {
        let upper = text.trim().trim_start_matches('%').to_ascii_uppercase();
        if upper.is_empty() {
            return None;
        }
        let named = |class, table: &[&str], base: u8| {
            table
                .iter()
                .position(|name| *name == upper)
                .map(|idx| Register::new(upper.clone(), class, base + idx as u8))
        };
        if let Some(reg) = named(RegisterClass::Gp8, &GP8_LEGACY, 0)
            .or_else(|| named(RegisterClass::Gp8, &GP8_REX, 4))
            .or_else(|| named(RegisterClass::Gp16, &GP16, 0))
            .or_else(|| named(RegisterClass::Gp32, &GP32, 0))
            .or_else(|| named(RegisterClass::Gp64, &GP64, 0))
            .or_else(|| named(RegisterClass::Segment, &SEGMENT, 0))
        {
            return Some(reg);
        }
        if upper == "ST" {
            return Some(Register::new("ST0".to_string(), RegisterClass::Fpu, 0));
        }
        if let Some(inner) = upper
            .strip_prefix("ST(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let number = parse_index(inner.trim(), 7)?;
            return Some(Register::new(format!("ST{number}"), RegisterClass::Fpu, number));
        }
        Self::parse_numbered(&upper)
    }

    fn parse_numbered(upper: &str) -> Option<Register> {
        // R8..R15 with optional width suffix: R8B/R8W/R8D/R8.
        if let Some(rest) = upper.strip_prefix('R') {
            let (digits, class) = match rest.as_bytes().last() {
                Some(b'B') | Some(b'L') => (&rest[..rest.len() - 1], RegisterClass::Gp8),
                Some(b'W') => (&rest[..rest.len() - 1], RegisterClass::Gp16),
                Some(b'D') => (&rest[..rest.len() - 1], RegisterClass::Gp32),
                _ => (rest, RegisterClass::Gp64),
            };
            if let Some(number) = parse_index(digits, 15).filter(|n| *n >= 8) {
                return Some(Register::new(upper.to_string(), class, number));
            }
            return None;
        }
        let prefixes: [(&str, RegisterClass, u8); 9] = [
            ("XMM", RegisterClass::Xmm, 31),
            ("YMM", RegisterClass::Ymm, 31),
            ("ZMM", RegisterClass::Zmm, 31),
            ("MM", RegisterClass::Mmx, 7),
            ("CR", RegisterClass::Control, 15),
            ("DR", RegisterClass::Debug, 15),
            ("BND", RegisterClass::Bound, 3),
            ("ST", RegisterClass::Fpu, 7),
            ("K", RegisterClass::Opmask, 7),
        ];
        for (prefix, class, max) in prefixes {
            if let Some(digits) = upper.strip_prefix(prefix) {
                if let Some(number) = parse_index(digits, max) {
                    return Some(Register::new(upper.to_string(), class, number));
                }
            }
        }
        None
    }

    fn new(name: String, class: RegisterClass, number: u8) -> Self {
        Self {
            name,
            class,
            number,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> RegisterClass {
        self.class
    }

    pub fn width(&self) -> u16 {
        self.class.width()
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Architecture that must be switched on for this register to exist.
    pub fn arch(&self) -> Arch {
        if self.class.is_general_purpose() && self.number >= 8 {
            return Arch::X64;
        }
        match self.class {
            RegisterClass::Gp8 if self.number >= 4 && !self.name.ends_with('H') => Arch::X64,
            RegisterClass::Gp8 | RegisterClass::Gp16 => Arch::I8086,
            RegisterClass::Gp32 => Arch::I386,
            RegisterClass::Gp64 => Arch::X64,
            RegisterClass::Segment if self.number >= 4 => Arch::I386,
            RegisterClass::Segment => Arch::I8086,
            RegisterClass::Control | RegisterClass::Debug => Arch::I386,
            RegisterClass::Mmx => Arch::Mmx,
            RegisterClass::Xmm if self.number >= 16 => Arch::Avx512Vl,
            RegisterClass::Xmm => Arch::Sse,
            RegisterClass::Ymm if self.number >= 16 => Arch::Avx512Vl,
            RegisterClass::Ymm => Arch::Avx,
            RegisterClass::Zmm | RegisterClass::Opmask => Arch::Avx512F,
            RegisterClass::Bound => Arch::Mpx,
            RegisterClass::Fpu => Arch::Fpu,
        }
    }

    /// Every register the engine knows about, in a stable order.
    pub fn all() -> Vec<Register> {
        let mut out = Vec::new();
        let mut push_named = |table: &[&str]| {
            out.extend(table.iter().filter_map(|name| Register::parse(name)));
        };
        push_named(&GP8_LEGACY);
        push_named(&GP8_REX);
        push_named(&GP16);
        push_named(&GP32);
        push_named(&GP64);
        push_named(&SEGMENT);
        for n in 8..16 {
            for suffix in ["B", "W", "D", ""] {
                out.extend(Register::parse(&format!("R{n}{suffix}")));
            }
        }
        let numbered: [(&str, u8); 9] = [
            ("MM", 8),
            ("XMM", 32),
            ("YMM", 32),
            ("ZMM", 32),
            ("K", 8),
            ("CR", 9),
            ("DR", 8),
            ("BND", 4),
            ("ST", 8),
        ];
        for (prefix, count) in numbered {
            for n in 0..count {
                out.extend(Register::parse(&format!("{prefix}{n}")));
            }
        }
        out
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn parse_index(digits: &str, max: u8) -> Option<u8> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.len() > 2 {
        return None;
    }
    if digits.len() == 2 && digits.starts_with('0') {
        return None;
    }
    digits.parse::<u8>().ok().filter(|n| *n <= max)
}
