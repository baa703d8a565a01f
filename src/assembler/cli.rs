// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::core::error::{AsmError, AsmRunError, ErrorKind};

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "Assembler for the A65000 32-bit microprocessor.

Assembles a single source file in one pass and writes the machine code as
an RSX0 container: the 'RSX0' magic followed by one <address, length, data>
record per segment, everything little-endian.";

#[derive(Parser, Debug)]
#[command(
    name = "asma65k",
    version = VERSION,
    about = "Assembler for the A65000 32-bit microprocessor",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(value_name = "FILE", long_help = "Input assembly source file.")]
    pub infile: PathBuf,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "FILE",
        long_help = "Output container file. Defaults to the input path with an .rsx extension."
    )]
    pub outfile: Option<PathBuf>,
    #[arg(
        short = 'd',
        long = "dump",
        action = ArgAction::SetTrue,
        long_help = "Print a hex dump of the assembled segments to stdout."
    )]
    pub dump: bool,
    #[arg(
        short = 's',
        long = "symbols",
        action = ArgAction::SetTrue,
        long_help = "Print the symbol table after a successful assembly."
    )]
    pub symbols: bool,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub out_path: PathBuf,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmRunError> {
    if !cli.infile.is_file() {
        let err = AsmError::with_message(
            ErrorKind::Cli,
            format!("Could not load file '{}'", cli.infile.display()),
        );
        return Err(AsmRunError::new(err, Vec::new(), Vec::new()));
    }
    let out_path = cli
        .outfile
        .clone()
        .unwrap_or_else(|| cli.infile.with_extension("rsx"));
    Ok(CliConfig { out_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_swaps_extension() {
        let cli = Cli::try_parse_from(["asma65k", "demo.asm"]).unwrap();
        assert_eq!(cli.infile, PathBuf::from("demo.asm"));
        assert_eq!(cli.infile.with_extension("rsx"), PathBuf::from("demo.rsx"));
        assert!(!cli.dump);
    }

    #[test]
    fn output_override_and_flags() {
        let cli = Cli::try_parse_from(["asma65k", "demo.asm", "-o", "out.bin", "-d", "-s"]).unwrap();
        assert_eq!(cli.outfile, Some(PathBuf::from("out.bin")));
        assert!(cli.dump);
        assert!(cli.symbols);
    }

    #[test]
    fn missing_input_is_rejected() {
        let cli = Cli::try_parse_from(["asma65k"]);
        assert!(cli.is_err());
    }
}
