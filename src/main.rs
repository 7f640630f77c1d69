//! Alpha Programming Language - CLI

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use alpha::{demos, run, run_file, util::logger, NAME, VERSION};

/// Front-end, IR, and interpreter for the Alpha language
#[derive(Parser, Debug)]
#[command(name = "alpha")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an Alpha source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate Alpha code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Check a source file for errors without running it
    Check {
        /// Source file to check
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Emit the Go rendition of a source file's IR
    EmitGo {
        /// Source file to translate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a demo group; the selector is read from standard input
    Demo,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_with_filter("debug");
    } else {
        logger::init();
    }

    match args.command {
        Commands::Run { file } => {
            run_file(&file).with_context(|| format!("Failed to run: {}", file.display()))?;
        }
        Commands::Eval { code } => {
            run(&code).context("Failed to evaluate code")?;
        }
        Commands::Check { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read: {}", file.display()))?;
            let errors = alpha::check(&source);
            if errors.is_empty() {
                eprintln!("Check passed!");
            } else {
                for error in &errors {
                    eprintln!("{error}");
                }
                std::process::exit(1);
            }
        }
        Commands::EmitGo { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read: {}", file.display()))?;
            print!("{}", alpha::emit_go(&source)?);
        }
        Commands::Demo => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read selector from stdin")?;
            let selector = input.trim();
            print!("{}", demos::run_selector(selector));
        }
        Commands::Version => {
            println!("{NAME} {VERSION}");
        }
    }

    Ok(())
}
