//! vegac - Command-line front-end for the Vega compiler.

use std::path::PathBuf;

use clap::Parser;

use vegac_drv::{run, Config};

/// Compiler for the Vega agent language
#[derive(Parser, Debug)]
#[command(name = "vegac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler for the Vega agent language", long_about = None)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// Output file (defaults to the input with a .vgb extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a textual disassembly to stdout instead of writing a file
    #[arg(short = 'S', long = "disassemble")]
    disassemble: bool,

    /// Dump the token stream to stdout
    #[arg(long)]
    tokens: bool,

    /// Dump the parsed tree to stdout
    #[arg(long)]
    ast: bool,

    /// Report stage progress on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Exit 1 on usage errors (clap's default is 2); help and version
    // displays still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let config = Config {
        input: cli.input,
        output: cli.output,
        disassemble: cli.disassemble,
        dump_tokens: cli.tokens,
        dump_ast: cli.ast,
        verbose: cli.verbose,
    };

    std::process::exit(run(config));
}
