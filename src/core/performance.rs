// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-microarchitecture latency, throughput and µop tables.
//!
//! Rows have nine tab separated columns:
//!
//! `microarch  MNEMONIC[ MNEMONIC..]  operands  fused  unfused  ports  latency  throughput  remark`
//!
//! A row naming several mnemonics (`CMOVA CMOVNBE`) applies to each of them.
//! Blank lines and `;` comments are ignored; malformed rows are logged and
//! skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::core::error::{AnalysisError, Result};
use crate::core::mnemonic::Mnemonic;
use crate::core::signature_store::RowIssue;

const BUILTIN_TABLE: &str = include_str!("../../data/performance.tsv");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MicroArch {
    SandyBridge,
    IvyBridge,
    Haswell,
    Broadwell,
    Skylake,
    SkylakeX,
    KabyLake,
    CannonLake,
    IceLake,
    TigerLake,
    KnightsCorner,
    KnightsLanding,
}

impl MicroArch {
    pub const ALL: &'static [MicroArch] = &[
        MicroArch::SandyBridge,
        MicroArch::IvyBridge,
        MicroArch::Haswell,
        MicroArch::Broadwell,
        MicroArch::Skylake,
        MicroArch::SkylakeX,
        MicroArch::KabyLake,
        MicroArch::CannonLake,
        MicroArch::IceLake,
        MicroArch::TigerLake,
        MicroArch::KnightsCorner,
        MicroArch::KnightsLanding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MicroArch::SandyBridge => "SandyBridge",
            MicroArch::IvyBridge => "IvyBridge",
            MicroArch::Haswell => "Haswell",
            MicroArch::Broadwell => "Broadwell",
            MicroArch::Skylake => "Skylake",
            MicroArch::SkylakeX => "SkylakeX",
            MicroArch::KabyLake => "KabyLake",
            MicroArch::CannonLake => "CannonLake",
            MicroArch::IceLake => "IceLake",
            MicroArch::TigerLake => "TigerLake",
            MicroArch::KnightsCorner => "KnightsCorner",
            MicroArch::KnightsLanding => "KnightsLanding",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for MicroArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MicroArch {
    type Err = String;

    /// Case-insensitive; `_`, `-` and spaces are ignored (`skylake-x`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        MicroArch::ALL
            .iter()
            .copied()
            .find(|arch| arch.as_str().to_ascii_uppercase() == wanted)
            .ok_or_else(|| s.to_string())
    }
}

/// Set of microarchitectures whose rows are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MicroArchSet(u16);

impl MicroArchSet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Haswell and SkylakeX.
    pub fn default_enabled() -> Self {
        [MicroArch::Haswell, MicroArch::SkylakeX].into_iter().collect()
    }

    pub fn insert(&mut self, arch: MicroArch) {
        self.0 |= arch.bit();
    }

    pub fn contains(&self, arch: MicroArch) -> bool {
        self.0 & arch.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parses a comma or whitespace separated list, returning the names it
    /// did not recognise.
    pub fn parse_list(list: &str) -> (MicroArchSet, Vec<String>) {
        let mut set = MicroArchSet::empty();
        let mut unknown = Vec::new();
        for name in list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|name| !name.is_empty())
        {
            match name.parse::<MicroArch>() {
                Ok(arch) => set.insert(arch),
                Err(name) => unknown.push(name),
            }
        }
        (set, unknown)
    }
}

impl FromIterator<MicroArch> for MicroArchSet {
    fn from_iter<T: IntoIterator<Item = MicroArch>>(iter: T) -> Self {
        let mut set = MicroArchSet::empty();
        for arch in iter {
            set.insert(arch);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRow {
    pub micro_arch: MicroArch,
    pub mnemonic: Mnemonic,
    pub operands: String,
    pub uops_fused: String,
    pub uops_unfused: String,
    pub ports: String,
    pub latency: String,
    pub throughput: String,
    pub remark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceReport {
    pub rows: usize,
    pub skipped: Vec<RowIssue>,
}

#[derive(Debug, Default)]
pub struct PerformanceStore {
    rows: Vec<PerformanceRow>,
}

impl PerformanceStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut store = Self::empty();
        let report = store.load_str("<builtin>", BUILTIN_TABLE);
        debug!(
            rows = report.rows,
            skipped = report.skipped.len(),
            "loaded builtin performance table"
        );
        store
    }

    /// The builtin table followed by the rows of `paths`.
    pub fn builtin_with_overlays(paths: &[PathBuf]) -> Result<Self> {
        let mut store = Self::builtin();
        for path in paths {
            store.load_file(path)?;
        }
        Ok(store)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<PerformanceReport> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::PerformanceTable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.load_str(&path.display().to_string(), &text))
    }

    pub fn load_str(&mut self, source: &str, text: &str) -> PerformanceReport {
        let mut report = PerformanceReport::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with(';') {
                continue;
            }
            match parse_row(line) {
                Ok(rows) => {
                    report.rows += rows.len();
                    self.rows.extend(rows);
                }
                Err(reason) => {
                    warn!(source, line = idx + 1, %reason, "skipping performance table row");
                    report.skipped.push(RowIssue {
                        source: source.to_string(),
                        line: idx + 1,
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Rows of `mnemonic` for the microarchitectures in `enabled`, in load
    /// order.
    pub fn rows_for(&self, mnemonic: &Mnemonic, enabled: MicroArchSet) -> Vec<&PerformanceRow> {
        self.rows
            .iter()
            .filter(|row| row.mnemonic == *mnemonic && enabled.contains(row.micro_arch))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_row(line: &str) -> std::result::Result<Vec<PerformanceRow>, String> {
    let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
    if columns.len() != 9 {
        return Err(format!("expected 9 columns, found {}", columns.len()));
    }
    let micro_arch: MicroArch = columns[0]
        .parse()
        .map_err(|name| format!("unknown microarchitecture '{name}'"))?;
    let mnemonics: Vec<Mnemonic> = columns[1]
        .split_whitespace()
        .map(Mnemonic::new)
        .filter(|mnemonic| !mnemonic.is_none())
        .collect();
    if mnemonics.is_empty() {
        return Err("row without a mnemonic".to_string());
    }
    Ok(mnemonics
        .into_iter()
        .map(|mnemonic| PerformanceRow {
            micro_arch,
            mnemonic,
            operands: columns[2].to_string(),
            uops_fused: columns[3].to_string(),
            uops_unfused: columns[4].to_string(),
            ports: columns[5].to_string(),
            latency: columns[6].to_string(),
            throughput: columns[7].to_string(),
            remark: columns[8].to_string(),
        })
        .collect())
}

/// Fixed-width text table of `rows`, for a fenced hover block.
pub fn format_table(rows: &[&PerformanceRow]) -> String {
    let mut out = format!(
        "{:<15}{:<24}{:<7}{:<9}{:<20}{:<9}{:<11}{}\n{:<15}{:<24}{:<7}{:<9}{:<20}{:<9}{:<11}",
        "", "", "µOps", "µOps", "µOps", "", "", "",
        "Architecture", "Instruction", "Fused", "Unfused", "Port", "Latency", "Throughput",
    );
    for row in rows {
        let instruction = format!("{} {}", row.mnemonic, row.operands);
        out.push_str(&format!(
            "\n{:<15}{:<24}{:<7}{:<9}{:<20}{:<9}{:<11}{}",
            row.micro_arch.as_str(),
            instruction.trim_end(),
            row.uops_fused,
            row.uops_unfused,
            row.ports,
            row.latency,
            row.throughput,
            row.remark,
        ));
    }
    out.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}
