use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxide as lox;

use lox::ast::Ast;
use lox::error::LoxError;
use lox::interpreter::{Completion, Interpreter};
use lox::lint;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Loxide language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Emit the AST as JSON instead of the parenthesized form
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a program, or starts a prompt without one
    Run { filename: Option<PathBuf> },
}

/// How one source run ended.
enum RunOutcome {
    /// Ran to completion.
    Done,

    /// Reported diagnostics; the exit code a file run should end with.
    Failed(i32),

    /// The program executed `exit`.
    Exit(i32),
}

/// Memory-map a script file for scanning.
fn map_file(filename: &Path) -> Result<Mmap> {
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    // SAFETY: scripts are not expected to be modified out from under a run.
    let map =
        unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(map)
}

/// The directory and display name a file's tokens carry, for diagnostics
/// and relative `include`/`import` resolution.
fn origin(filename: &Path) -> (String, String) {
    let directory = filename
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = filename.to_string_lossy().into_owned();

    (directory, file)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with statement number and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'loxide::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxide::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan a whole buffer, splitting tokens from lexical errors.
fn scan(src: &[u8], directory: &str, file: &str) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for item in Scanner::with_origin(src, directory, file) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Scan → parse → resolve → lint → interpret one source buffer.
///
/// Every syntax and resolution error is reported before giving up; any of
/// them suppresses execution entirely.
fn run_source(
    interpreter: &mut Interpreter,
    src: &[u8],
    directory: &str,
    file: &str,
) -> RunOutcome {
    let (tokens, lex_errors) = scan(src, directory, file);

    if !lex_errors.is_empty() {
        for e in &lex_errors {
            eprintln!("{}", e);
        }
        return RunOutcome::Failed(65);
    }

    let mut statements = Vec::new();
    let mut had_parse_error = false;

    for stmt in Parser::new(tokens) {
        match stmt {
            Ok(stmt) => {
                debug!("Parsed statement: {:?}", stmt);
                statements.push(stmt);
            }
            Err(e) => {
                eprintln!("{}", e);
                had_parse_error = true;
            }
        }
    }

    if had_parse_error {
        return RunOutcome::Failed(65);
    }

    info!("Parsed {} statement(s)", statements.len());

    let locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            return RunOutcome::Failed(65);
        }
    };

    // Advisory only — warnings never stop the run.
    for warning in lint::lint(&statements) {
        eprintln!("{}", warning);
    }

    match interpreter.interpret(&statements, locals) {
        Ok(Completion::Finished) => {
            info!("Program executed successfully");
            RunOutcome::Done
        }

        Ok(Completion::Exit(code)) => {
            info!("Program requested exit code {}", code);
            RunOutcome::Exit(code)
        }

        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            RunOutcome::Failed(70)
        }
    }
}

/// The interactive prompt: one interpreter fed line after line.
fn run_prompt() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        if let RunOutcome::Exit(code) = run_source(&mut interpreter, line.as_bytes(), "", "") {
            process::exit(code);
        }
        // Diagnostics were already printed; the prompt keeps going.
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let map = map_file(&filename)?;
                let (directory, file) = origin(&filename);
                let mut tokenized = true;

                for token in Scanner::with_origin(&map, &directory, &file) {
                    match token {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);

                            println!("{}", token);
                        }

                        Err(e) => {
                            tokenized = false;

                            debug!("Tokenization debug: {}", e);

                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");

                    process::exit(65);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                info!("No filepath provided for Tokenize");

                println!("No input filepath was provided. Exiting...");

                process::exit(0);
            }
        },

        Commands::Parse { filename, json } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let map = map_file(&filename)?;
                let (directory, file) = origin(&filename);

                let (tokens, lex_errors) = scan(&map, &directory, &file);
                if !lex_errors.is_empty() {
                    for e in &lex_errors {
                        eprintln!("{}", e);
                    }
                    process::exit(65);
                }

                let mut parser = Parser::new(tokens);

                match parser.parse_expression() {
                    Ok(expr) => {
                        info!("Expression parsed successfully");

                        if json {
                            println!("{}", serde_json::to_string_pretty(&expr)?);
                        } else {
                            let printer = Ast;
                            let ast_str = printer.print(&expr);

                            debug!("AST: {}", ast_str);
                            println!("{}", ast_str);
                        }
                    }

                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        process::exit(65);
                    }
                }

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                process::exit(0);
            }
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => {
                info!("Running Evaluate subcommand");

                let map = map_file(&filename)?;
                let (directory, file) = origin(&filename);

                let (tokens, lex_errors) = scan(&map, &directory, &file);
                if !lex_errors.is_empty() {
                    for e in &lex_errors {
                        eprintln!("{}", e);
                    }
                    process::exit(65);
                }

                let mut parser = Parser::new(tokens);
                let mut interpreter = Interpreter::new();

                match parser.parse_expression() {
                    Ok(expr) => {
                        info!("Expression parsed successfully");

                        match interpreter.evaluate(&expr) {
                            Ok(value) => {
                                debug!("Evaluated to: {}", value);
                                println!("{}", value);
                            }

                            Err(unwind) => {
                                let e = Interpreter::diagnose(unwind);
                                debug!("Evaluation debug: {}", e);
                                eprintln!("{}", e);
                                process::exit(70);
                            }
                        }
                    }

                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        process::exit(65);
                    }
                }

                info!("Evaluate subcommand completed");
            }

            None => {
                info!("No filepath provided for Evaluate");
                println!("No input filepath was provided. Exiting...");
                process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let map = map_file(&filename)?;
                let (directory, file) = origin(&filename);

                let mut interpreter = Interpreter::new();

                match run_source(&mut interpreter, &map, &directory, &file) {
                    RunOutcome::Done => {}
                    RunOutcome::Failed(code) => process::exit(code),
                    RunOutcome::Exit(code) => process::exit(code),
                }
            }

            None => {
                info!("No filepath provided for Run; starting prompt");
                run_prompt()?;
            }
        },
    }

    Ok(())
}
