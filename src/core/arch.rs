// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction-set architectures and the bit set used to switch them on.

use std::fmt;
use std::str::FromStr;

use crate::core::error::AnalysisError;

macro_rules! arch_table {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// One architecture / ISA extension a signature or register belongs to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Arch {
            $($variant),+
        }

        impl Arch {
            pub const ALL: &'static [Arch] = &[$(Arch::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Arch::$variant => $name),+
                }
            }

            fn from_normalized(name: &str) -> Option<Arch> {
                match name {
                    $($name => Some(Arch::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

arch_table! {
    I8086 => "8086",
    I186 => "186",
    I286 => "286",
    I386 => "386",
    I486 => "486",
    Pent => "PENT",
    P6 => "P6",
    Amd3dNow => "3DNOW",
    Mmx => "MMX",
    Sse => "SSE",
    Sse2 => "SSE2",
    Sse3 => "SSE3",
    Ssse3 => "SSSE3",
    Sse41 => "SSE41",
    Sse42 => "SSE42",
    Sse4a => "SSE4A",
    Sse5 => "SSE5",
    Avx => "AVX",
    Avx2 => "AVX2",
    Avx512 => "AVX512",
    Avx512F => "AVX512F",
    Avx512Vl => "AVX512VL",
    Avx512Dq => "AVX512DQ",
    Avx512Bw => "AVX512BW",
    Avx512Er => "AVX512ER",
    Avx512Pf => "AVX512PF",
    Avx512Cd => "AVX512CD",
    Avx512Vbmi => "AVX512VBMI",
    Avx512Ifma => "AVX512IFMA",
    X64 => "X64",
    Ia64 => "IA64",
    Fpu => "FPU",
    Fma => "FMA",
    Bmi1 => "BMI1",
    Bmi2 => "BMI2",
    Tbm => "TBM",
    Amd => "AMD",
    Priv => "PRIV",
    Prot => "PROT",
    Vmx => "VMX",
    Mpx => "MPX",
    Sha => "SHA",
    Rtm => "RTM",
    Hle => "HLE",
    Adx => "ADX",
    Aes => "AES",
    Clmul => "CLMUL",
    F16c => "F16C",
    Rdrand => "RDRAND",
    Rdseed => "RDSEED",
    Lzcnt => "LZCNT",
    Popcnt => "POPCNT",
    Invpcid => "INVPCID",
    Cyrix => "CYRIX",
    Undoc => "UNDOC",
}

impl Arch {
    fn bit(self) -> u128 {
        1u128 << (self as u8)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = AnalysisError;

    /// Case-insensitive; underscores and a leading `ARCH_` are ignored, so
    /// `AVX512_VL`, `avx512vl` and `ARCH_486` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if let Some(rest) = normalized.strip_prefix("ARCH") {
            if Arch::from_normalized(rest).is_some() {
                normalized = rest.to_string();
            }
        }
        match normalized.as_str() {
            "X8664" | "X86-64" => return Ok(Arch::X64),
            "PENTIUM" => return Ok(Arch::Pent),
            _ => {}
        }
        Arch::from_normalized(&normalized).ok_or_else(|| AnalysisError::UnknownArch(s.to_string()))
    }
}

/// Bit set over [`Arch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArchSet(u128);

impl ArchSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Arch::ALL.iter().copied().collect()
    }

    /// Architectures enabled when the user has not configured any.
    pub fn default_enabled() -> Self {
        [
            Arch::I8086,
            Arch::I186,
            Arch::I286,
            Arch::I386,
            Arch::I486,
            Arch::Pent,
            Arch::P6,
            Arch::Fpu,
            Arch::Mmx,
            Arch::Sse,
            Arch::Sse2,
            Arch::Sse3,
            Arch::Ssse3,
            Arch::Sse41,
            Arch::Sse42,
            Arch::Avx,
            Arch::Avx2,
            Arch::Fma,
            Arch::Bmi1,
            Arch::Bmi2,
            Arch::X64,
            Arch::Priv,
            Arch::Prot,
        ]
        .into_iter()
        .collect()
    }

    pub fn single(arch: Arch) -> Self {
        Self(arch.bit())
    }

    pub fn insert(&mut self, arch: Arch) {
        self.0 |= arch.bit();
    }

    pub fn remove(&mut self, arch: Arch) {
        self.0 &= !arch.bit();
    }

    pub fn contains(&self, arch: Arch) -> bool {
        self.0 & arch.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(&self, other: &ArchSet) -> ArchSet {
        ArchSet(self.0 | other.0)
    }

    pub fn intersection(&self, other: &ArchSet) -> ArchSet {
        ArchSet(self.0 & other.0)
    }

    pub fn intersects(&self, other: &ArchSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_subset(&self, other: &ArchSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Arch> + '_ {
        Arch::ALL.iter().copied().filter(|arch| self.contains(*arch))
    }

    /// Parses a comma (or whitespace) separated list. Unknown names are
    /// returned separately so callers can decide whether to warn or fail.
    pub fn parse_list(list: &str) -> (ArchSet, Vec<String>) {
        let mut set = ArchSet::empty();
        let mut unknown = Vec::new();
        for name in list
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            match name.parse::<Arch>() {
                Ok(arch) => set.insert(arch),
                Err(_) => unknown.push(name.to_string()),
            }
        }
        (set, unknown)
    }
}

impl FromIterator<Arch> for ArchSet {
    fn from_iter<T: IntoIterator<Item = Arch>>(iter: T) -> Self {
        let mut set = ArchSet::empty();
        for arch in iter {
            set.insert(arch);
        }
        set
    }
}

impl fmt::Display for ArchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|arch| arch.as_str()).collect();
        f.write_str(&names.join(","))
    }
}
