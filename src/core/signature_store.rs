// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tab separated signature tables and the read-only store built from them.
//!
//! Two row shapes are accepted:
//!
//! - 4 columns: `tag  MNEMONIC  description  reference-url`
//! - 5 or 6 columns: `MNEMONIC  operand-patterns  arch-list  signature-text  documentation`
//!
//! Blank lines and lines starting with `;` are ignored. Rows that do not fit
//! are logged and skipped; a bad row never fails the load.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::arch::ArchSet;
use crate::core::error::{AnalysisError, Result};
use crate::core::mnemonic::Mnemonic;
use crate::core::register::Register;
use crate::core::signature::SignatureEntry;

const BUILTIN_TABLE: &str = include_str!("../../data/signatures.tsv");

/// A skipped table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub source: String,
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub signatures: usize,
    pub descriptions: usize,
    pub skipped: Vec<RowIssue>,
}

#[derive(Debug, Default)]
pub struct SignatureStore {
    signatures: HashMap<Mnemonic, Vec<SignatureEntry>>,
    archs: HashMap<Mnemonic, ArchSet>,
    descriptions: HashMap<Mnemonic, String>,
    references: HashMap<Mnemonic, String>,
    jumps: HashSet<Mnemonic>,
}

impl SignatureStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store over the table compiled into the binary.
    pub fn builtin() -> Self {
        let mut store = Self::empty();
        let report = store.load_str("<builtin>", BUILTIN_TABLE);
        debug!(
            signatures = report.signatures,
            descriptions = report.descriptions,
            skipped = report.skipped.len(),
            "loaded builtin signature table"
        );
        store
    }

    /// The builtin table overlaid with `paths` in order.
    pub fn builtin_with_overlays(paths: &[PathBuf]) -> Result<Self> {
        let mut store = Self::builtin();
        for path in paths {
            store.load_file(path)?;
        }
        Ok(store)
    }

    pub fn from_str_table(text: &str) -> (Self, LoadReport) {
        let mut store = Self::empty();
        let report = store.load_str("<memory>", text);
        (store, report)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<LoadReport> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::SignatureTable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.load_str(&path.display().to_string(), &text))
    }

    /// Loads rows on top of what is already present. Later rows replace
    /// descriptions, references and signatures with the same text.
    pub fn load_str(&mut self, source: &str, text: &str) -> LoadReport {
        let mut report = LoadReport::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with(';') {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let outcome = match columns.len() {
                4 => self.add_description(&columns),
                5 | 6 => self.add_signature(&columns),
                n => Err(format!("expected 4, 5 or 6 columns, found {n}")),
            };
            match outcome {
                Ok(RowKind::Description) => report.descriptions += 1,
                Ok(RowKind::Signature) => report.signatures += 1,
                Err(reason) => {
                    warn!(source, line = idx + 1, %reason, "skipping signature table row");
                    report.skipped.push(RowIssue {
                        source: source.to_string(),
                        line: idx + 1,
                        reason,
                    });
                }
            }
        }
        self.rebuild_derived();
        report
    }

    fn add_description(&mut self, columns: &[&str]) -> std::result::Result<RowKind, String> {
        let mnemonic = Mnemonic::new(columns[1]);
        if mnemonic.is_none() {
            return Err("description row without a mnemonic".to_string());
        }
        self.descriptions
            .insert(mnemonic.clone(), columns[2].trim().to_string());
        let reference = columns[3].trim();
        if !reference.is_empty() {
            self.references.insert(mnemonic, reference.to_string());
        }
        Ok(RowKind::Description)
    }

    fn add_signature(&mut self, columns: &[&str]) -> std::result::Result<RowKind, String> {
        let mnemonic = Mnemonic::new(columns[0]);
        if mnemonic.is_none() {
            return Err("signature row without a mnemonic".to_string());
        }
        let (archs, unknown) = ArchSet::parse_list(columns[2]);
        if !unknown.is_empty() {
            debug!(mnemonic = %mnemonic, ?unknown, "ignoring unknown architectures");
        }
        if archs.is_empty() {
            return Err(format!("no known architecture in '{}'", columns[2]));
        }
        let entry =
            SignatureEntry::from_columns(mnemonic.clone(), columns[1], archs, columns[3], columns[4])
                .ok_or_else(|| {
                    format!(
                        "operand patterns '{}' do not match signature '{}'",
                        columns[1], columns[3]
                    )
                })?;
        let list = self.signatures.entry(mnemonic).or_default();
        match list
            .iter_mut()
            .find(|existing| existing.signature_text == entry.signature_text)
        {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
        Ok(RowKind::Signature)
    }

    fn rebuild_derived(&mut self) {
        self.archs = self
            .signatures
            .iter()
            .map(|(mnemonic, entries)| {
                let archs = entries
                    .iter()
                    .fold(ArchSet::empty(), |acc, entry| acc.union(&entry.archs));
                (mnemonic.clone(), archs)
            })
            .collect();
        self.jumps = self
            .signatures
            .iter()
            .filter(|(_, entries)| entries.iter().any(SignatureEntry::is_jump))
            .map(|(mnemonic, _)| mnemonic.clone())
            .collect();
    }

    /// Known mnemonic for `word`, if the tables declare one.
    pub fn lookup(&self, word: &str) -> Option<Mnemonic> {
        let mnemonic = Mnemonic::new(word);
        self.contains(&mnemonic).then_some(mnemonic)
    }

    pub fn contains(&self, mnemonic: &Mnemonic) -> bool {
        self.signatures.contains_key(mnemonic) || self.descriptions.contains_key(mnemonic)
    }

    pub fn signatures_for(&self, mnemonic: &Mnemonic) -> &[SignatureEntry] {
        self.signatures
            .get(mnemonic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn signatures_switched_on(
        &self,
        mnemonic: &Mnemonic,
        enabled: &ArchSet,
    ) -> Vec<&SignatureEntry> {
        self.signatures_for(mnemonic)
            .iter()
            .filter(|entry| entry.arch_allowed(enabled))
            .collect()
    }

    pub fn is_jump(&self, mnemonic: &Mnemonic) -> bool {
        self.jumps.contains(mnemonic)
    }

    pub fn arch_of(&self, mnemonic: &Mnemonic) -> ArchSet {
        self.archs.get(mnemonic).copied().unwrap_or_default()
    }

    /// All known mnemonics, sorted.
    pub fn mnemonics(&self) -> Vec<&Mnemonic> {
        let mut all: Vec<&Mnemonic> = self
            .signatures
            .keys()
            .chain(self.descriptions.keys().filter(|m| !self.signatures.contains_key(*m)))
            .collect();
        all.sort();
        all
    }

    /// Mnemonics with at least one signature on an enabled architecture.
    /// Mnemonics that only have a description are always offered.
    pub fn mnemonics_switched_on(&self, enabled: &ArchSet) -> Vec<&Mnemonic> {
        self.mnemonics()
            .into_iter()
            .filter(|mnemonic| match self.archs.get(*mnemonic) {
                Some(archs) => archs.intersects(enabled),
                None => true,
            })
            .collect()
    }

    pub fn registers_switched_on(&self, enabled: &ArchSet) -> Vec<Register> {
        Register::all()
            .into_iter()
            .filter(|reg| enabled.contains(reg.arch()))
            .collect()
    }

    pub fn description(&self, mnemonic: &Mnemonic) -> Option<&str> {
        self.descriptions.get(mnemonic).map(String::as_str)
    }

    pub fn reference(&self, mnemonic: &Mnemonic) -> Option<&str> {
        self.references.get(mnemonic).map(String::as_str)
    }
}

enum RowKind {
    Description,
    Signature,
}
