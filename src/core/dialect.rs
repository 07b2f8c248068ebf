// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler dialects understood by the parser and label graph.

use std::fmt;
use std::str::FromStr;

use crate::core::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    Masm,
    #[default]
    NasmIntel,
    NasmAtt,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Masm => "masm",
            Dialect::NasmIntel => "nasm-intel",
            Dialect::NasmAtt => "nasm-att",
        }
    }

    pub fn is_att(&self) -> bool {
        matches!(self, Dialect::NasmAtt)
    }

    pub fn is_masm(&self) -> bool {
        matches!(self, Dialect::Masm)
    }

    /// True when `ch` starts a remark in this dialect.
    pub fn is_remark_char(&self, ch: char) -> bool {
        ch == ';' || (self.is_att() && ch == '#')
    }

    /// Local labels are written with a leading `.` in every supported dialect.
    pub fn is_local_label(&self, label: &str) -> bool {
        label.len() > 1 && label.starts_with('.') && !label.starts_with("..")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "masm" => Ok(Dialect::Masm),
            "nasm" | "nasm-intel" | "nasm_intel" | "intel" => Ok(Dialect::NasmIntel),
            "att" | "nasm-att" | "nasm_att" | "gas" => Ok(Dialect::NasmAtt),
            other => Err(AnalysisError::UnknownDialect(other.to_string())),
        }
    }
}
