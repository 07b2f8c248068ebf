// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asmscope.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use asmscope::cli::{build_context, check_file, format_diagnostic_line, validate_cli, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    asmscope::init_logging(&cli.log_level);

    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    let ctx = match build_context(&config) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;
    for path in &config.inputs {
        let report = match check_file(&ctx, path) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::from(2);
            }
        };
        for (file, diag) in &report.diagnostics {
            let _ = writeln!(out, "{}", format_diagnostic_line(file, diag, config.output_format));
        }
        failed |= report.has_errors();
    }
    let _ = out.flush();
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
