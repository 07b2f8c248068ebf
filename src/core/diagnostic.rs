// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::fmt;

use serde::Serialize;

use crate::core::keyword_id::KeywordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    DuplicateLabel,
    UndefinedLabel,
    UnresolvedInclude,
    LabelAnalysisDisabled,
    UnmatchedFoldEnd,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DuplicateLabel => "duplicate-label",
            DiagnosticCode::UndefinedLabel => "undefined-label",
            DiagnosticCode::UnresolvedInclude => "unresolved-include",
            DiagnosticCode::LabelAnalysisDisabled => "label-analysis-disabled",
            DiagnosticCode::UnmatchedFoldEnd => "unmatched-fold-end",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::DuplicateLabel | DiagnosticCode::UndefinedLabel => Severity::Error,
            DiagnosticCode::UnresolvedInclude
            | DiagnosticCode::LabelAnalysisDisabled
            | DiagnosticCode::UnmatchedFoldEnd => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding about the document, anchored to one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisDiagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub id: KeywordId,
}

impl AnalysisDiagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, id: KeywordId) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keyword_id::Span;

    #[test]
    fn codes_carry_their_severity() {
        let id = KeywordId::new(0, 4, Span::new(2, 5));
        let diag = AnalysisDiagnostic::new(DiagnosticCode::UndefinedLabel, "undefined", id);
        assert!(diag.is_error());
        let diag = AnalysisDiagnostic::new(DiagnosticCode::UnresolvedInclude, "missing", id);
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(DiagnosticCode::LabelAnalysisDisabled.to_string(), "label-analysis-disabled");
    }

    #[test]
    fn serializes_with_stable_names() {
        let id = KeywordId::new(0, 1, Span::new(0, 3));
        let diag = AnalysisDiagnostic::new(DiagnosticCode::DuplicateLabel, "dup", id);
        let value = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(value["code"], "duplicate-label");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["id"]["line"], 1);
    }
}
