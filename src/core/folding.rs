// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Foldable regions: remark tag pairs and procedure bodies.

use serde::Serialize;

use crate::core::diagnostic::{AnalysisDiagnostic, DiagnosticCode};
use crate::core::dialect::Dialect;
use crate::core::keyword_id::{KeywordId, Span};
use crate::core::line_parser::{remark_start, word_spans};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldKind {
    Region,
    Procedure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoldRange {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: FoldKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folding {
    pub ranges: Vec<FoldRange>,
    pub diagnostics: Vec<AnalysisDiagnostic>,
}

pub fn fold_ranges(
    lines: &[String],
    file_id: u32,
    dialect: Dialect,
    begin_tag: &str,
    end_tag: &str,
) -> Folding {
    let mut folding = Folding::default();
    let mut regions: Vec<u32> = Vec::new();
    let mut procedures: Vec<u32> = Vec::new();

    for (number, line) in lines.iter().enumerate() {
        let number = number as u32;
        let remark = remark_start(line, dialect);
        let code = &line[..remark.unwrap_or(line.len())];

        if let Some(start) = remark {
            let text = &line[start..];
            if let Some(pos) = text.find(end_tag).filter(|_| !end_tag.is_empty()) {
                match regions.pop() {
                    Some(open) => folding.ranges.push(FoldRange {
                        start_line: open,
                        end_line: number,
                        kind: FoldKind::Region,
                    }),
                    None => {
                        let col = start + pos;
                        folding.diagnostics.push(AnalysisDiagnostic::new(
                            DiagnosticCode::UnmatchedFoldEnd,
                            format!("'{end_tag}' without a matching '{begin_tag}'"),
                            KeywordId::new(file_id, number, Span::new(col, col + end_tag.len())),
                        ));
                    }
                }
            } else if !begin_tag.is_empty() && text.contains(begin_tag) {
                regions.push(number);
            }
        }

        let leading_words = word_spans(code, 0)
            .into_iter()
            .take(2)
            .map(|span| code[span.start as usize..span.end as usize].to_ascii_uppercase())
            .collect::<Vec<_>>();
        if leading_words.iter().any(|word| word == "PROC") {
            procedures.push(number);
        } else if leading_words.iter().any(|word| word == "ENDP") {
            if let Some(open) = procedures.pop() {
                folding.ranges.push(FoldRange {
                    start_line: open,
                    end_line: number,
                    kind: FoldKind::Procedure,
                });
            }
        }
    }
    folding.ranges.sort_by_key(|range| (range.start_line, range.end_line));
    folding
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn nested_regions_and_procedures() {
        let src = "; #region outer\nFoo PROC\n; #region inner\n nop\n; #endregion\nFoo ENDP\n; #endregion";
        let folding = fold_ranges(&lines(src), 0, Dialect::Masm, "#region", "#endregion");
        assert_eq!(
            folding.ranges,
            vec![
                FoldRange { start_line: 0, end_line: 6, kind: FoldKind::Region },
                FoldRange { start_line: 1, end_line: 5, kind: FoldKind::Procedure },
                FoldRange { start_line: 2, end_line: 4, kind: FoldKind::Region },
            ]
        );
        assert!(folding.diagnostics.is_empty());
    }

    #[test]
    fn unmatched_end_is_reported_at_the_tag() {
        let folding = fold_ranges(&lines(" nop ; #endregion"), 3, Dialect::NasmIntel, "#region", "#endregion");
        assert!(folding.ranges.is_empty());
        assert_eq!(folding.diagnostics.len(), 1);
        let diag = &folding.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::UnmatchedFoldEnd);
        assert_eq!(diag.id, KeywordId::new(3, 0, Span::new(7, 17)));
    }

    #[test]
    fn tags_outside_remarks_are_ignored() {
        let folding = fold_ranges(&lines("db \"#region\"\n; #endregion"), 0, Dialect::NasmIntel, "#region", "#endregion");
        assert!(folding.ranges.is_empty());
        assert_eq!(folding.diagnostics.len(), 1);
    }
}
