//! vegac-drv - Compiler driver.
//!
//! Orchestrates the pipeline:
//!
//! ```text
//! Source file (.vega)
//!        │
//!        ▼
//!   [Lexer] ──▶ token stream
//!        │
//!        ▼
//!   [Parser] ──▶ tree
//!        │
//!        ▼
//!   [Semantic analysis] ──▶ checked tree + imported module trees
//!        │
//!        ▼
//!   [Bytecode emission] ──▶ artifact (.vgb) or disassembly
//! ```
//!
//! Stages share one diagnostic [`Handler`]; each later stage runs only if
//! the previous one succeeded, so an invocation produces at most one
//! fatal diagnostic plus any parser-recovery reports. [`run`] prints the
//! collected diagnostics to standard error and returns the process exit
//! code: 0 on success, 1 on any failure.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use vegac_gen::CodeGenerator;
use vegac_lex::Lexer;
use vegac_par::Parser;
use vegac_sem::Analyzer;
use vegac_util::Handler;

/// Environment variable naming an extra module search directory.
pub const VEGA_PATH_ENV: &str = "VEGA_PATH";

/// Directory added as an implicit search path when it exists.
pub const STDLIB_DIR: &str = "stdlib";

/// Compiler configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source file to compile.
    pub input: PathBuf,

    /// Output path; `None` derives it from the input.
    pub output: Option<PathBuf>,

    /// Print textual disassembly to stdout instead of writing a file.
    pub disassemble: bool,

    /// Dump the token stream to stdout.
    pub dump_tokens: bool,

    /// Dump the parsed tree to stdout.
    pub dump_ast: bool,

    /// Stage-progress messages on stderr.
    pub verbose: bool,
}

impl Config {
    /// The effective output path: `-o` if given, otherwise the input with
    /// its extension changed to `.vgb`.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("vgb"))
    }
}

/// One compilation session: fresh state per invocation.
pub struct Session {
    config: Config,
    handler: Handler,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: Handler::new(),
        }
    }

    /// The diagnostics collected so far.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Run the pipeline.
    ///
    /// Diagnostic-level failures leave their reports in the handler and
    /// return an error; infrastructure failures (unreadable input,
    /// unwritable output) surface through the `Result` alone.
    pub fn compile(&self) -> Result<()> {
        let input = &self.config.input;
        let filename = input.display().to_string();

        let source = fs::read_to_string(input)
            .with_context(|| format!("cannot read '{}'", filename))?;

        if self.config.dump_tokens {
            self.dump_tokens(&source, &filename);
        }

        // Lexing and parsing.
        if self.config.verbose {
            eprintln!("Parsing {}", filename);
        }
        let lexer = Lexer::new(&source, filename.clone());
        let mut parser = Parser::new(lexer, &self.handler);
        let program = parser.parse_program();

        if self.config.dump_ast {
            println!("{:#?}", program);
        }
        if parser.has_error() {
            bail!("compilation failed");
        }

        // Semantic analysis, including module resolution.
        if self.config.verbose {
            eprintln!("Analyzing {}", filename);
        }
        let mut analyzer = Analyzer::new(&self.handler);
        if let Ok(vega_path) = env::var(VEGA_PATH_ENV) {
            analyzer.add_search_path(vega_path);
        }
        if Path::new(STDLIB_DIR).is_dir() {
            analyzer.add_search_path(STDLIB_DIR);
        }
        if !analyzer.analyze(&program, input) {
            bail!("compilation failed");
        }

        // Emission: imported modules first, then the main program.
        if self.config.verbose {
            eprintln!("Generating bytecode");
        }
        let mut generator = CodeGenerator::new(&self.handler);
        for module in analyzer.module_programs() {
            if !generator.generate(module) {
                bail!("compilation failed");
            }
        }
        if !generator.generate(&program) {
            bail!("compilation failed");
        }

        if self.config.disassemble {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            generator.disassemble(&mut lock)?;
            lock.flush()?;
        } else {
            let output = self.config.output_path();
            generator.write_file(&output)?;
            if self.config.verbose {
                eprintln!("Wrote {}", output.display());
            }
        }

        Ok(())
    }

    fn dump_tokens(&self, source: &str, filename: &str) {
        let mut lexer = Lexer::new(source, filename);
        loop {
            let token = lexer.next_token();
            println!("{:?}", token);
            if token.is_eof() {
                break;
            }
        }
    }
}

/// Run one compilation and return the process exit code.
pub fn run(config: Config) -> i32 {
    let session = Session::new(config);
    let result = session.compile();

    for diagnostic in session.handler().diagnostics() {
        eprintln!("{}", diagnostic);
    }

    match result {
        Ok(()) => 0,
        Err(err) => {
            // Diagnostic failures already printed above; anything else is
            // an infrastructure error worth its own line.
            if !session.handler().has_errors() {
                eprintln!("error: {:#}", err);
            }
            1
        }
    }
}
