use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;

use pytocpp::{codegen, lexer, parser, toolchain};

#[derive(Parser)]
#[command(
    name = "pytocpp",
    about = "Translate a small Python subset into C++",
    version
)]
struct Cli {
    /// Python source file to translate
    input: PathBuf,

    /// Where the generated C++ is written
    #[arg(short, long, default_value = "output.cpp")]
    output: PathBuf,

    /// Suppress progress output and the generated code listing
    #[arg(short, long)]
    quiet: bool,

    /// Compile the generated file with $CXX (or c++) and run it
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.input.is_file() {
        bail!("Input file not found: {}", cli.input.display());
    }
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Reading {}", cli.input.display()))?;

    let progress = |message: &str| {
        if !cli.quiet {
            println!("{message}");
        }
    };

    progress(&format!("Tokenizing {}", cli.input.display()));
    let tokens = lexer::tokenize(&source)?;

    progress(&format!("Parsing {} tokens", tokens.len()));
    let program = parser::parse_tokens(tokens)?;

    progress("Generating C++");
    let cpp = codegen::generate(&program)?;

    fs::write(&cli.output, &cpp)
        .with_context(|| format!("Writing {}", cli.output.display()))?;
    if !cli.quiet {
        println!("Generated C++ code:");
        print!("{cpp}");
        println!("Wrote {}", cli.output.display());
    }

    if cli.run {
        let compiler = toolchain::cxx_compiler();
        let stdout = toolchain::compile_and_run(&compiler, &cli.output)?;
        print!("{stdout}");
    }
    Ok(())
}
