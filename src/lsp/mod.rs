// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! asmscope language server modules.

pub mod completion;
pub mod config;
pub mod definition;
pub mod diagnostics;
pub mod document_state;
pub mod hover;
pub mod protocol;
pub mod session;
pub mod signature_help;
