// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface of the batch checker.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::json;
use tracing::{info, warn};

use crate::core::arch::ArchSet;
use crate::core::context::AnalysisContext;
use crate::core::diagnostic::AnalysisDiagnostic;
use crate::core::dialect::Dialect;
use crate::core::error::{AnalysisError, Result};
use crate::core::label_graph::DEFAULT_MAX_LINES;
use crate::core::options::AnalysisOptions;
use crate::core::signature_store::SignatureStore;
use crate::core::snapshot::AnalysisSnapshot;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Checks x86 assembly sources for label problems.

Reports duplicate labels, jumps to undefined labels, includes that cannot be
found and unmatched fold markers. Exits with status 1 when any error is found.
Set ASMSCOPE_LOG (e.g. ASMSCOPE_LOG=debug) for engine logging on stderr.";

#[derive(Parser, Debug)]
#[command(
    name = "asmscope",
    version = VERSION,
    about = "Label and include checker for MASM, NASM and AT&T x86 assembly",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,
    #[arg(
        long = "dialect",
        value_name = "NAME",
        default_value = "nasm-intel",
        long_help = "Assembler dialect: masm, nasm (nasm-intel) or att (nasm-att, gas)."
    )]
    pub dialect: String,
    #[arg(
        long = "arch",
        value_name = "LIST",
        action = ArgAction::Append,
        long_help = "Comma separated architectures to enable, e.g. X64,AVX2. Repeatable. Defaults to the common desktop set."
    )]
    pub arch: Vec<String>,
    #[arg(
        long = "signatures",
        value_name = "FILE",
        action = ArgAction::Append,
        long_help = "Additional tab separated signature table loaded over the builtin one. Repeatable; later files win."
    )]
    pub signatures: Vec<PathBuf>,
    #[arg(
        short = 'I',
        long = "include",
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Directory searched for include files after the including file's own directory. Repeatable."
    )]
    pub include_paths: Vec<PathBuf>,
    #[arg(
        long = "case-sensitive",
        action = ArgAction::SetTrue,
        long_help = "Treat labels that differ only in case as different labels."
    )]
    pub case_sensitive: bool,
    #[arg(
        long = "max-lines",
        value_name = "N",
        default_value_t = DEFAULT_MAX_LINES,
        long_help = "Disable label analysis for sources (with includes) longer than N lines."
    )]
    pub max_lines: usize,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "text prints one diagnostic per line; json prints one JSON object per line."
    )]
    pub format: OutputFormat,
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        long_help = "Log level used when ASMSCOPE_LOG is not set."
    )]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Validated CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inputs: Vec<PathBuf>,
    pub archs: ArchSet,
    pub signature_files: Vec<PathBuf>,
    pub options: AnalysisOptions,
    pub output_format: OutputFormat,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig> {
    let dialect: Dialect = cli.dialect.parse()?;
    let archs = if cli.arch.is_empty() {
        ArchSet::default_enabled()
    } else {
        let mut archs = ArchSet::empty();
        for list in &cli.arch {
            let (parsed, unknown) = ArchSet::parse_list(list);
            if let Some(name) = unknown.into_iter().next() {
                return Err(AnalysisError::UnknownArch(name));
            }
            archs = archs.union(&parsed);
        }
        archs
    };
    Ok(CliConfig {
        inputs: cli.inputs.clone(),
        archs,
        signature_files: cli.signatures.clone(),
        options: AnalysisOptions {
            dialect,
            case_sensitive: cli.case_sensitive,
            max_lines: cli.max_lines,
            include_paths: cli.include_paths.clone(),
            ..AnalysisOptions::default()
        },
        output_format: cli.format,
    })
}

/// Diagnostics of one input file. Diagnostics raised inside an include
/// carry that include's path.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub diagnostics: Vec<(PathBuf, AnalysisDiagnostic)>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(_, diag)| diag.is_error())
    }
}

pub fn build_context(config: &CliConfig) -> Result<AnalysisContext> {
    let store = SignatureStore::builtin_with_overlays(&config.signature_files)?;
    Ok(AnalysisContext::with_options(
        Arc::new(store),
        config.archs,
        config.options.clone(),
    ))
}

pub fn check_file(ctx: &AnalysisContext, path: &Path) -> Result<FileReport> {
    let text = fs::read_to_string(path).map_err(|source| AnalysisError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let source_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let snapshot = AnalysisSnapshot::build(ctx, 0, Arc::new(lines), Some(source_path));
    if !snapshot.graph.is_enabled() {
        warn!(path = %path.display(), "label analysis disabled for this file");
    }
    let diagnostics = snapshot
        .diagnostics()
        .into_iter()
        .map(|diag| {
            let file = snapshot
                .graph
                .file(diag.id.file_id)
                .filter(|file| file.file_id != 0)
                .and_then(|file| file.path.clone())
                .unwrap_or_else(|| path.to_path_buf());
            (file, diag)
        })
        .collect();
    info!(path = %path.display(), "checked");
    Ok(FileReport {
        path: path.to_path_buf(),
        diagnostics,
    })
}

/// One diagnostic, 1-based positions.
pub fn format_diagnostic_line(file: &Path, diag: &AnalysisDiagnostic, format: OutputFormat) -> String {
    let line = diag.id.line + 1;
    let col_start = diag.id.start_col + 1;
    let col_end = diag.id.end_col + 1;
    match format {
        OutputFormat::Json => json!({
            "code": diag.code.as_str(),
            "severity": diag.severity.as_str(),
            "message": diag.message,
            "file": file.display().to_string(),
            "line": line,
            "col_start": col_start,
            "col_end": col_end,
        })
        .to_string(),
        OutputFormat::Text => format!(
            "{}:{line}:{col_start}: {}[{}]: {}",
            file.display(),
            diag.severity.as_str(),
            diag.code,
            diag.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostic::DiagnosticCode;
    use crate::core::keyword_id::{KeywordId, Span};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn create_temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "asmscope-cli-{label}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn parses_repeatable_arguments() {
        let cli = Cli::parse_from([
            "asmscope",
            "--dialect",
            "masm",
            "--arch",
            "X64,AVX2",
            "--arch",
            "SSE",
            "-I",
            "inc",
            "--format",
            "json",
            "main.asm",
        ]);
        let config = validate_cli(&cli).expect("valid cli");
        assert_eq!(config.options.dialect, Dialect::Masm);
        assert_eq!(config.archs.len(), 3);
        assert_eq!(config.options.include_paths, vec![PathBuf::from("inc")]);
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let cli = Cli::parse_from(["asmscope", "--arch", "X64,NOPE", "a.asm"]);
        assert!(matches!(validate_cli(&cli), Err(AnalysisError::UnknownArch(name)) if name == "NOPE"));
        let cli = Cli::parse_from(["asmscope", "--dialect", "tasm", "a.asm"]);
        assert!(matches!(validate_cli(&cli), Err(AnalysisError::UnknownDialect(_))));
    }

    #[test]
    fn check_file_reports_include_diagnostics_against_the_include() {
        let dir = create_temp_dir("include");
        fs::write(dir.join("defs.inc"), "dup:\ndup:\n").expect("write include");
        let main = dir.join("main.asm");
        fs::write(&main, "%include \"defs.inc\"\n jmp dup\n").expect("write main");

        let cli = Cli::parse_from(["asmscope", main.to_str().expect("utf8 path")]);
        let config = validate_cli(&cli).expect("valid cli");
        let ctx = build_context(&config).expect("context");
        let report = check_file(&ctx, &main).expect("report");
        assert!(report.has_errors());
        assert_eq!(report.diagnostics.len(), 2);
        for (file, diag) in &report.diagnostics {
            assert_eq!(diag.code, DiagnosticCode::DuplicateLabel);
            assert!(file.ends_with("defs.inc"));
        }
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn text_and_json_lines_are_one_based() {
        let diag = AnalysisDiagnostic::new(
            DiagnosticCode::UndefinedLabel,
            "undefined label 'BAR'",
            KeywordId::new(0, 0, Span::new(4, 7)),
        );
        let text = format_diagnostic_line(Path::new("a.asm"), &diag, OutputFormat::Text);
        assert_eq!(text, "a.asm:1:5: error[undefined-label]: undefined label 'BAR'");
        let json: serde_json::Value =
            serde_json::from_str(&format_diagnostic_line(Path::new("a.asm"), &diag, OutputFormat::Json))
                .expect("json line");
        assert_eq!(json["col_end"], 8);
        assert_eq!(json["code"], "undefined-label");
    }
}
