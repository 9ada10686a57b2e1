//! BType compiler front end
//!
//! Usage: btc [OPTIONS] <input>

use anyhow::{bail, Context as _};
use btype_compiler::common::DiagnosticReporter;
use btype_compiler::driver::{compile, CompileConfig, Environment, FsLoader};
use btype_compiler::CompileError;
use clap::Parser as ClapParser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "btc")]
#[command(author = "BType Team")]
#[command(version = "0.1.0")]
#[command(about = "Type checker and IR front end for the BType language", long_about = None)]
struct Args {
    /// Input source file (.bt)
    #[arg(required = true)]
    input: PathBuf,

    /// Require a runtime initializer
    #[arg(long)]
    runtime: bool,

    /// Exported func<void> used as the program entry point
    #[arg(long, requires = "runtime")]
    runtime_entry: Option<String>,

    /// Generate debug information
    #[arg(short = 'g', long)]
    debug: bool,

    /// Where code generators write debug information
    #[arg(long, requires = "debug")]
    debug_info_output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump typed IR and scope analysis (for debugging)
    #[arg(long)]
    dump_ir: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = CompileConfig {
        runtime: args.runtime,
        runtime_entry: args.runtime_entry.clone(),
        debug_info: args.debug,
        debug_info_output: args.debug_info_output.clone(),
        verbose: args.verbose,
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_ir: args.dump_ir,
    };

    if args.verbose {
        eprintln!("Compiling {}", args.input.display());
    }

    let mut env = Environment::new(config, Box::new(FsLoader));
    if let Err(err) = compile(&mut env, &args.input) {
        let path = env.failed_file().unwrap_or(&args.input);
        report(path, &err)?;
        bail!("could not compile {}", args.input.display());
    }

    if args.dump_ir {
        dump_ir(&env);
    }

    if args.verbose {
        eprintln!("Successfully checked {}", args.input.display());
    }

    Ok(())
}

fn report(path: &Path, err: &CompileError) -> anyhow::Result<()> {
    // Errors raised before any source was read have nothing to point at
    if err.span().is_none() || !path.exists() {
        eprintln!("{err}");
        return Ok(());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(path.display().to_string(), source);
    reporter.report_error(file_id, err);
    Ok(())
}

fn dump_ir(env: &Environment) {
    for module in env.modules() {
        eprintln!("=== IR: {} ===", module.name);
        if let Some(ir) = &module.ir {
            eprintln!("{:#?}", ir.body);
        }
        eprintln!("=== End IR ===\n");
    }

    eprintln!("=== Functions ===");
    for function in &env.functions {
        let closure = function.body_context.map(|ctx| env.contexts.get(ctx));
        eprintln!(
            "  {} ({}): {} first_class={} side_effect_free={} lexical={} global={}",
            function.name,
            function.assigned_name,
            env.types.describe(&function.ty),
            function.first_class,
            closure.is_none_or(|c| c.side_effect_free),
            closure.is_some_and(|c| c.accesses_lexical_scope),
            closure.is_some_and(|c| c.accesses_global_scope),
        );
    }
    eprintln!("=== End Functions ===\n");
}
