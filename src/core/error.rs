// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error type for the few engine surfaces that can fail.
//!
//! Parsing, operand classification and label-graph construction never fail;
//! they degrade to best-effort results. Only loading data, reading sources and
//! talking to worker threads return `Result`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read signature table {path}: {source}")]
    SignatureTable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read performance table {path}: {source}")]
    PerformanceTable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read source file {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown architecture: {0}")]
    UnknownArch(String),

    #[error("unknown assembler dialect: {0}")]
    UnknownDialect(String),

    #[error("analysis worker for {0} is no longer running")]
    WorkerGone(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = AnalysisError::UnknownArch("AVX1024".to_string());
        assert_eq!(err.to_string(), "unknown architecture: AVX1024");

        let err = AnalysisError::SignatureTable {
            path: PathBuf::from("/nope/sigs.tsv"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nope/sigs.tsv"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
