// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembly analysis engine: parsing, signatures, label graph and queries.

pub mod arch;
pub mod constant;
pub mod context;
pub mod diagnostic;
pub mod dialect;
pub mod error;
pub mod folding;
pub mod include;
pub mod keyword_id;
pub mod keywords;
pub mod label_graph;
pub mod line_parser;
pub mod mnemonic;
pub mod operand;
pub mod operand_type;
pub mod options;
pub mod performance;
pub mod query;
pub mod register;
pub mod scheduler;
pub mod signature;
pub mod signature_store;
pub mod snapshot;
