//! `atto` command line: run a program file, or start an interactive session.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use atto::{Config, Interpreter, StdConsole, Value};

#[derive(Parser, Debug)]
#[command(name = "atto", version, about = "Run Atto programs or start an interactive session")]
struct Cli {
    /// Program to run; without it an interactive prompt starts
    file: Option<PathBuf>,

    /// Arguments for `main`, each read as a literal (numbers, booleans, null, text)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Do not load the prelude
    #[arg(long)]
    no_prelude: bool,

    /// Fail with a recursion error beyond this many nested calls
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Log more (-v info, -vv debug, -vvv trace); ATTO_LOG sets the level too
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Minimal logger writing `level target: message` lines to stderr
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => std::env::var("ATTO_LOG")
            .ok()
            .and_then(|level| level.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config {
        load_prelude: !cli.no_prelude,
        max_call_depth: cli.max_depth,
    };
    let mut interpreter = Interpreter::with_config(config).context("failed to load the prelude")?;

    match cli.file {
        Some(path) => run_file(&mut interpreter, &path, &cli.args),
        None => {
            repl::run(&mut interpreter)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_file(interpreter: &mut Interpreter, path: &Path, args: &[String]) -> Result<ExitCode> {
    let source =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let args: Vec<Value> = args.iter().map(|arg| Value::litr(arg)).collect();

    let mut console = StdConsole::new();
    let outcome = interpreter
        .load(&source)
        .and_then(|()| interpreter.run_main(args, &mut console));

    match outcome {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Handle one line of interactive input: a definition or an expression
fn eval_line(interpreter: &mut Interpreter, line: &str, console: &mut StdConsole) {
    if line.split_whitespace().next() == Some("fn") {
        match interpreter.load(line) {
            Ok(()) => println!("ok"),
            Err(e) => println!("Error: {e}"),
        }
    } else {
        match interpreter.eval_expression(line, console) {
            Ok(value) => println!("{value}"),
            Err(e) => println!("Error: {e}"),
        }
    }
}

fn print_banner(interpreter: &Interpreter) {
    println!("Atto interactive session");
    println!("Enter expressions like: + 1 * 2 3");
    println!("Define functions like:  fn square x is * x x");
    println!("Type :help for more commands, or Ctrl+D to exit.");

    let config = interpreter.config();
    if !config.load_prelude {
        println!("The prelude is not loaded; only builtins are available.");
    }
    if let Some(limit) = config.max_call_depth {
        println!("Nested calls are limited to a depth of {limit}.");
    }
    println!();
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :defs      - List defined functions and their arities");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!();
    println!("Lines starting with `fn` add definitions; anything else is evaluated.");
    println!("Every name takes a fixed number of arguments, so no brackets are needed:");
    println!("  pair 3 17                 [3, 17]");
    println!("  fuse pair 1 2 pair 3 4    [1, 2, 3, 4]");
    println!("  if < 1 2 \"yes\" \"no\"       yes");
    println!();
}

fn print_definitions(interpreter: &Interpreter) {
    let names = interpreter.function_names();
    if names.is_empty() {
        println!("No functions defined.");
        return;
    }

    println!("Defined functions ({} total):", names.len());
    for name in names {
        let arity = interpreter.arity_of(name).unwrap_or_default();
        println!("  {name:<15} {arity}");
    }
}

/// Handle an interactive command; returns false when the session should end
fn command(interpreter: &Interpreter, line: &str) -> Option<bool> {
    match line {
        ":help" => print_help(),
        ":defs" => print_definitions(interpreter),
        ":quit" | ":exit" => return Some(false),
        _ => return None,
    }
    Some(true)
}

#[cfg(feature = "repl")]
mod repl {
    use anyhow::{Context, Result};
    use atto::{Interpreter, StdConsole};
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    pub fn run(interpreter: &mut Interpreter) -> Result<()> {
        super::print_banner(interpreter);

        let mut rl = DefaultEditor::new().context("could not initialize the line editor")?;
        let mut console = StdConsole::new();

        loop {
            match rl.readline("atto> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    match super::command(interpreter, line) {
                        Some(true) => continue,
                        Some(false) => break,
                        None => super::eval_line(interpreter, line, &mut console),
                    }
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
                Err(err) => return Err(err).context("failed to read input"),
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}

#[cfg(not(feature = "repl"))]
mod repl {
    use std::io::{self, BufRead, Write};

    use anyhow::Result;
    use atto::{Interpreter, StdConsole};

    pub fn run(interpreter: &mut Interpreter) -> Result<()> {
        super::print_banner(interpreter);

        let mut console = StdConsole::new();
        let mut line = String::new();
        loop {
            print!("atto> ");
            io::stdout().flush()?;

            line.clear();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match super::command(interpreter, input) {
                Some(true) => continue,
                Some(false) => break,
                None => super::eval_line(interpreter, input, &mut console),
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}
