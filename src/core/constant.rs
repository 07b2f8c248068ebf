// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Numeric literal evaluation for operands.

/// A literal that evaluated cleanly, with the storage width it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub value: i64,
    pub bits: u16,
}

/// Evaluates an assembler numeric literal.
///
/// Accepted notations (case-insensitive, `_` separators allowed):
/// decimal `42`, `42d`, `0d42`; hex `0x2A`, `0h2A`, `$2A`, `2Ah`;
/// binary `0b1010`, `0y1010`, `1010b`, `1010y`; octal `0o52`, `0q52`,
/// `52o`, `52q`. A leading `-` negates. Anything that does not parse, or
/// that overflows 64 bits, is not a constant.
pub fn to_constant(text: &str) -> Option<Constant> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let digits: String = text
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let magnitude = parse_magnitude(&digits)?;
    if negative && magnitude > (i64::MAX as u64) + 1 {
        return None;
    }
    let value = if negative {
        (magnitude as i64).wrapping_neg()
    } else {
        magnitude as i64
    };
    Some(Constant {
        value,
        bits: bits_needed(magnitude, negative),
    })
}

fn parse_magnitude(text: &str) -> Option<u64> {
    // Prefixed forms first so suffix rules never misread `0b1h` style input.
    let prefixed = [
        ("0x", 16),
        ("0h", 16),
        ("$", 16),
        ("0b", 2),
        ("0y", 2),
        ("0o", 8),
        ("0q", 8),
        ("0d", 10),
    ];
    for (prefix, radix) in prefixed {
        if let Some(rest) = text.strip_prefix(prefix) {
            if let Some(value) = parse_radix(rest, radix) {
                return Some(value);
            }
        }
    }
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Some(body) = text.strip_suffix('h') {
        return parse_radix(body, 16);
    }
    if let Some(body) = text.strip_suffix('b').or_else(|| text.strip_suffix('y')) {
        if let Some(value) = parse_radix(body, 2) {
            return Some(value);
        }
        // `0ABb` style: trailing b is a hex digit only when an h follows,
        // which was handled above.
        return None;
    }
    if let Some(body) = text.strip_suffix('o').or_else(|| text.strip_suffix('q')) {
        return parse_radix(body, 8);
    }
    if let Some(body) = text.strip_suffix('d') {
        return parse_radix(body, 10);
    }
    parse_radix(text, 10)
}

fn parse_radix(text: &str, radix: u32) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    u64::from_str_radix(text, radix).ok()
}

/// Storage width (8, 16, 32 or 64 bits) needed to hold the value.
pub fn bits_needed(magnitude: u64, negative: bool) -> u16 {
    if negative {
        match magnitude {
            0..=0x80 => 8,
            0x81..=0x8000 => 16,
            0x8001..=0x8000_0000 => 32,
            _ => 64,
        }
    } else {
        match magnitude {
            0..=0xFF => 8,
            0x100..=0xFFFF => 16,
            0x1_0000..=0xFFFF_FFFF => 32,
            _ => 64,
        }
    }
}
