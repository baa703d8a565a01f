// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asma65k.

fn main() {
    let use_color = std::env::var("NO_COLOR").is_err();
    match asma65k::assembler::run() {
        Ok(report) => {
            if let Some(summary) = report.summary() {
                println!("{summary}");
            }
        }
        Err(err) => {
            for diag in err.diagnostics() {
                eprintln!(
                    "{}",
                    diag.format_with_context(Some(err.source_lines()), use_color)
                );
            }
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
