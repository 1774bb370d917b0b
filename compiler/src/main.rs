use clap::{ArgAction, Parser, Subcommand};
use dp_compiler::{Compiler, CompilerOptions, SyntaxError, process, tokenize};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, debug};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "dpc")]
#[command(about = "Decorator template compiler")]
struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of an expression as JSON
    Tokens {
        expression: String,
    },

    /// Parse and analyze an expression, printing trees and watch targets
    Parse {
        expression: String,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Pre-process a template file or every .html file under a directory
    Process {
        /// Path to template file or directory
        #[arg(required_unless_present = "stdin")]
        path: Option<PathBuf>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Output the compiled template as JSON instead of markup
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Tokens { expression } => match tokenize(&expression) {
            Ok(tokens) => print_json(&tokens, true),
            Err(e) => fail(&e, &expression, "<expression>"),
        },
        Commands::Parse { expression, pretty } => {
            let mut compiler = Compiler::new(CompilerOptions { cache: false });
            match compiler.compile_expression(&expression) {
                Ok(compiled) => print_json(&*compiled, pretty),
                Err(e) => fail(&e, &expression, "<expression>"),
            }
        }
        Commands::Process { path, stdin, json } => {
            if stdin {
                process_stdin(json);
            } else if let Some(path) = path {
                process_path(&path, json);
            } else {
                eprintln!("Error: provide a file/directory or use --stdin");
                std::process::exit(1);
            }
        }
    }
}

fn process_stdin(json: bool) {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("Error: failed to read stdin: {}", e);
        std::process::exit(1);
    }

    let mut compiler = Compiler::default();
    if let Err(e) = emit(&mut compiler, &source, json) {
        fail(&e, &source, "<stdin>");
    }
}

fn process_path(path: &Path, json: bool) {
    if path.is_file() {
        let start = Instant::now();
        let mut compiler = Compiler::default();
        let source = read(path);
        if let Err(e) = emit(&mut compiler, &source, json) {
            fail(&e, &source, &path.display().to_string());
        }
        print_summary(1, start.elapsed());
    } else if path.is_dir() {
        process_directory(path);
    } else {
        eprintln!("Error: {} does not exist", path.display());
        std::process::exit(1);
    }
}

/// Write `<name>.dp.html` next to every `.html` template under `dir`
fn process_directory(dir: &Path) {
    let start = Instant::now();
    let mut compiler = Compiler::default();
    let mut file_count = 0;
    let mut failed = false;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_template(e.path()))
    {
        let path = entry.path();
        let source = read(path);

        match process(&source) {
            Ok(markup) => {
                let output = path.with_extension("dp.html");
                if let Err(e) = fs::write(&output, markup) {
                    eprintln!("Error: failed to write {}: {}", output.display(), e);
                    std::process::exit(1);
                }
                file_count += 1;
                print_generated(&output.display().to_string());
            }
            Err(e) => {
                report(&e, &source, &path.display().to_string());
                failed = true;
                continue;
            }
        }

        // Surface expression errors too, without failing the markup output
        if let Err(e) = compiler.compile_template(&source) {
            report(&e, &source, &path.display().to_string());
            failed = true;
        }
    }

    debug!(cached = compiler.cache_len(), "directory done");

    if file_count == 0 && !failed {
        eprintln!("No .html templates found in {}", dir.display());
        std::process::exit(1);
    }

    print_summary(file_count, start.elapsed());
    if failed {
        std::process::exit(1);
    }
}

/// Source templates only; skips our own `.dp.html` output
fn is_template(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".html") && !name.ends_with(".dp.html")
}

fn emit(compiler: &mut Compiler, source: &str, json: bool) -> Result<(), SyntaxError> {
    if json {
        let compiled = compiler.compile_template(source)?;
        print_json(&*compiled, true);
    } else {
        print!("{}", process(source)?);
    }
    Ok(())
}

fn read(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

fn report(error: &SyntaxError, source: &str, filename: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", error.render_color(source, filename));
    } else {
        eprint!("{}", error.render(source, filename));
    }
}

fn fail(error: &SyntaxError, source: &str, filename: &str) -> ! {
    report(error, source, filename);
    std::process::exit(1);
}

fn print_generated(path: &str) {
    if io::stderr().is_terminal() {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, elapsed: std::time::Duration) {
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };

    if io::stderr().is_terminal() {
        eprintln!("\n\x1b[1mProcessed {} {} in {}\x1b[0m", count, files_word, time_str);
    } else {
        eprintln!("\nProcessed {} {} in {}", count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
