// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared, explicitly constructed analysis context.
//!
//! The signature and performance stores are immutable once built. Enabled
//! architectures, microarchitectures and options are configuration that may change while builds run, so readers
//! take an `Arc` snapshot under a short read lock and never hold the lock
//! while working.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::arch::ArchSet;
use crate::core::line_parser::LineParser;
use crate::core::options::AnalysisOptions;
use crate::core::performance::{MicroArchSet, PerformanceStore};
use crate::core::signature_store::SignatureStore;

#[derive(Debug)]
pub struct AnalysisContext {
    store: Arc<SignatureStore>,
    performance: Arc<PerformanceStore>,
    enabled_archs: RwLock<Arc<ArchSet>>,
    micro_archs: RwLock<MicroArchSet>,
    options: RwLock<Arc<AnalysisOptions>>,
}

impl AnalysisContext {
    pub fn new(store: Arc<SignatureStore>) -> Self {
        Self::with_options(store, ArchSet::default_enabled(), AnalysisOptions::default())
    }

    pub fn with_options(
        store: Arc<SignatureStore>,
        enabled_archs: ArchSet,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            store,
            performance: Arc::new(PerformanceStore::builtin()),
            enabled_archs: RwLock::new(Arc::new(enabled_archs)),
            micro_archs: RwLock::new(MicroArchSet::default_enabled()),
            options: RwLock::new(Arc::new(options)),
        }
    }

    /// Replaces the builtin performance table.
    pub fn with_performance(mut self, performance: Arc<PerformanceStore>) -> Self {
        self.performance = performance;
        self
    }

    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    pub fn performance(&self) -> &Arc<PerformanceStore> {
        &self.performance
    }

    /// Microarchitectures whose timings hover shows; empty turns them off.
    pub fn micro_archs(&self) -> MicroArchSet {
        *self.micro_archs.read()
    }

    pub fn set_micro_archs(&self, micro_archs: MicroArchSet) {
        *self.micro_archs.write() = micro_archs;
    }

    pub fn enabled_archs(&self) -> Arc<ArchSet> {
        Arc::clone(&self.enabled_archs.read())
    }

    pub fn set_enabled_archs(&self, archs: ArchSet) {
        debug!(archs = %archs, "enabled architectures changed");
        *self.enabled_archs.write() = Arc::new(archs);
    }

    pub fn options(&self) -> Arc<AnalysisOptions> {
        Arc::clone(&self.options.read())
    }

    pub fn set_options(&self, options: AnalysisOptions) {
        *self.options.write() = Arc::new(options);
    }

    /// Parser for the currently configured dialect.
    pub fn parser(&self) -> LineParser {
        LineParser::new(self.options().dialect, Arc::clone(&self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arch::Arch;
    use crate::core::dialect::Dialect;

    #[test]
    fn readers_keep_their_snapshot_across_updates() {
        let ctx = AnalysisContext::new(Arc::new(SignatureStore::empty()));
        let before = ctx.enabled_archs();
        ctx.set_enabled_archs(ArchSet::single(Arch::Avx512F));
        assert!(before.contains(Arch::X64));
        assert!(!ctx.enabled_archs().contains(Arch::X64));
    }

    #[test]
    fn parser_follows_configured_dialect() {
        let ctx = AnalysisContext::new(Arc::new(SignatureStore::empty()));
        ctx.set_options(AnalysisOptions {
            dialect: Dialect::Masm,
            ..AnalysisOptions::default()
        });
        assert_eq!(ctx.parser().dialect(), Dialect::Masm);
    }
}
