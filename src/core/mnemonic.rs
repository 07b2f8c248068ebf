// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::borrow::Borrow;
use std::fmt;

/// Upper-case instruction name. The set of valid mnemonics is whatever the
/// loaded signature tables declare; the empty mnemonic means "none".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Mnemonic(String);

impl Mnemonic {
    pub const NONE: Mnemonic = Mnemonic(String::new());

    pub fn new(text: &str) -> Self {
        Self(text.trim().to_ascii_uppercase())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// AT&T spellings carry an operand size suffix (`movl`, `addq`). Returns
    /// the mnemonic without it, if there is one to strip.
    pub fn without_att_suffix(&self) -> Option<Mnemonic> {
        let stem = self.0.strip_suffix(['B', 'W', 'L', 'Q'])?;
        (!stem.is_empty()).then(|| Mnemonic(stem.to_string()))
    }
}

impl Borrow<str> for Mnemonic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("NONE")
        } else {
            f.write_str(&self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case_and_strips_att_suffix() {
        assert_eq!(Mnemonic::new(" movl ").as_str(), "MOVL");
        assert_eq!(
            Mnemonic::new("movl").without_att_suffix(),
            Some(Mnemonic::new("mov"))
        );
        assert_eq!(Mnemonic::new("jmp").without_att_suffix(), None);
        assert_eq!(Mnemonic::new("b").without_att_suffix(), None);
        assert!(Mnemonic::NONE.is_none());
        assert_eq!(Mnemonic::NONE.to_string(), "NONE");
    }
}
