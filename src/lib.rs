// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! asmscope: incremental analysis of x86 assembly sources.

pub mod cli;
pub mod core;
pub mod lsp;

/// Installs the stderr `tracing` subscriber shared by both binaries.
/// `ASMSCOPE_LOG` takes precedence over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("ASMSCOPE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
