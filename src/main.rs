mod bytecode;
mod frontend;
mod lang;
mod runtime;


use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::{ArgAction, Parser as CliParser, ValueEnum};
use log::{LevelFilter, error, info, warn};
use simple_logger::SimpleLogger;

use crate::bytecode::ProgramBc;
use crate::bytecode::compile::{Compiler, CompilerOptions};
use crate::bytecode::disasm::print_bc;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::token_dumper::TokenDumper;
use crate::lang::program::Program;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm_ast::{InterpreterConfig, VmAst};
use crate::runtime::vm_bc::{VmBc, VmConfig};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Backend {
    /// Compile to bytecode and run on the stack VM
    Vm,
    /// Walk the parsed program directly
    Interp,
}

#[derive(CliParser)]
#[command(name = "cyaron", about = "CYaRon! interpreter and bytecode VM", version)]
struct Cli {
    /// Program source, or a bytecode image with --load-bc. Reads stdin when absent or `-`
    file: Option<PathBuf>,

    /// Execution backend
    #[arg(long, value_enum, default_value_t = Backend::Vm)]
    backend: Backend,

    /// Print tokens and exit
    #[arg(long)]
    tokens: bool,

    /// Print the parsed program and exit
    #[arg(long)]
    ast: bool,

    /// Print the bytecode disassembly and exit
    #[arg(long)]
    bc: bool,

    /// Write a bytecode image to PATH instead of running
    #[arg(long, value_name = "PATH")]
    emit_bc: Option<PathBuf>,

    /// Treat FILE as a bytecode image
    #[arg(long)]
    load_bc: bool,

    /// Disable peephole fusion
    #[arg(long)]
    no_fuse: bool,

    /// VM operand stack capacity
    #[arg(long, default_value_t = 512)]
    stack_capacity: usize,

    /// Abort after this many steps
    #[arg(long)]
    max_steps: Option<usize>,

    /// Report per-phase timings on stderr
    #[arg(long)]
    time: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Plain token dump
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).without_timestamps().init() {
        eprintln!("failed to initialise logging: {}", e);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}

/// Runs `f`, reporting its wall time on stderr when `enabled`.
fn timed<T>(enabled: bool, phase: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    if enabled {
        eprintln!("[time] {:<8} {:>12.3?}", phase, start.elapsed());
    }
    result
}

fn read_input(file: Option<&Path>) -> io::Result<Vec<u8>> {
    match file {
        Some(path) if path != Path::new("-") => fs::read(path),
        _ => {
            let mut bytes = Vec::new();
            io::stdin().read_to_end(&mut bytes)?;
            Ok(bytes)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let bytes = read_input(cli.file.as_deref()).map_err(|e| {
        let name = cli
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".to_string());
        format!("failed to read '{}': {}", name, e)
    })?;

    if cli.load_bc {
        if cli.backend == Backend::Interp {
            warn!("bytecode images always run on the vm backend");
        }
        let program_bc = ProgramBc::from_bytes(&bytes)
            .map_err(|e| RuntimeError::new(&format!("malformed bytecode image: {}", e)))?;
        info!(
            "loaded bytecode image: {} instructions, {} variables",
            program_bc.code.len(),
            program_bc.decls.len()
        );
        if cli.bc {
            print_bc(&program_bc);
            return Ok(());
        }
        return run_bc(cli, &program_bc);
    }

    let source = String::from_utf8_lossy(&bytes);

    let mut lexer = Lexer::new(&source);
    let tokens = timed(cli.time, "lex", || lexer.tokenize());
    info!("{} tokens, {} interned strings", tokens.len(), lexer.pool().len());

    if cli.tokens {
        let mut dumper = TokenDumper::new();
        if cli.no_color {
            dumper = dumper.no_color();
        }
        dumper.dump(&tokens, lexer.pool());
        return Ok(());
    }

    let program = timed(cli.time, "parse", || Parser::new(tokens, lexer.pool()).parse())?;
    info!(
        "{} variables, {} top-level statements",
        program.decls.len(),
        program.stmts.len()
    );

    if cli.ast {
        print!("{}", program);
        return Ok(());
    }

    let wants_bytecode = cli.bc || cli.emit_bc.is_some();
    if cli.backend == Backend::Interp && !wants_bytecode {
        return run_ast(cli, &program);
    }

    let options = CompilerOptions { fuse: !cli.no_fuse };
    let program_bc = timed(cli.time, "compile", || {
        Compiler::with_options(options).compile_program(&program)
    })?;

    if cli.bc {
        print_bc(&program_bc);
        return Ok(());
    }

    if let Some(path) = &cli.emit_bc {
        let image = program_bc
            .to_bytes()
            .map_err(|e| format!("failed to encode bytecode image: {}", e))?;
        fs::write(path, &image)
            .map_err(|e| format!("failed to write '{}': {}", path.display(), e))?;
        info!("wrote {} bytes to {}", image.len(), path.display());
        return Ok(());
    }

    run_bc(cli, &program_bc)
}

/// Flushes whatever the program printed, then ends the line on success.
fn finish_output(out: &mut dyn Write, result: Result<(), RuntimeError>) -> Result<(), Box<dyn Error>> {
    if result.is_ok() {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(result?)
}

fn run_ast(cli: &Cli, program: &Program) -> Result<(), Box<dyn Error>> {
    let config = InterpreterConfig {
        max_steps: cli.max_steps,
    };
    let mut vm = VmAst::with_config(program, config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = timed(cli.time, "run", || vm.run(&mut out));
    info!("interpreter stats: {:?}", vm.stats());
    finish_output(&mut out, result)
}

fn run_bc(cli: &Cli, program_bc: &ProgramBc) -> Result<(), Box<dyn Error>> {
    let config = VmConfig {
        stack_capacity: cli.stack_capacity,
        max_steps: cli.max_steps,
    };
    let mut vm = VmBc::with_config(config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = timed(cli.time, "run", || vm.run_compiled(program_bc, &mut out));
    info!("vm stats: {:?}", vm.stats());
    finish_output(&mut out, result)
}
