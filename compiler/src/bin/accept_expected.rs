//! Binary to generate/update the expected output of fixture templates
//!
//! Usage:
//!   cargo run --bin accept_expected            # Update all
//!   cargo run --bin accept_expected -- basic   # Update only tests matching "basic"

use dp_compiler::{Compiler, CompilerOptions, process};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() {
    let filter: Option<String> = std::env::args().nth(1);
    let fixture_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");

    let mut updated = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&fixture_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|s| s == "tpl").unwrap_or(false))
    {
        let path = entry.path();
        let path_str = path.to_string_lossy();

        if let Some(ref f) = filter {
            if !path_str.contains(f) {
                skipped += 1;
                continue;
            }
        }

        process_file(path);
        updated += 1;
    }

    println!("Updated {} files, skipped {}", updated, skipped);
}

fn write(path: &Path, contents: &str) {
    if let Err(e) = fs::write(path, contents) {
        eprintln!("Failed to write {:?}: {}", path, e);
    } else {
        println!("  wrote {}", path.display());
    }
}

fn process_file(path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", path, e);
            return;
        }
    };

    let is_error_test = path.components().any(|c| c.as_os_str() == "errors");
    let mut compiler = Compiler::new(CompilerOptions { cache: false });

    match compiler.compile_template(&source) {
        Ok(template) => {
            if is_error_test {
                eprintln!("ERROR: {:?} is in errors/ but compiles", path);
                return;
            }

            match process(&source) {
                Ok(markup) => write(&path.with_extension("expected.html"), &markup),
                Err(e) => eprintln!("ERROR: {:?} failed to process: {}", path, e),
            }

            match serde_json::to_string_pretty(&template.outline()) {
                Ok(json) => write(&path.with_extension("expected.json"), &format!("{}\n", json)),
                Err(e) => eprintln!("Failed to serialize outline for {:?}: {}", path, e),
            }
        }
        Err(e) => {
            if is_error_test {
                let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown");
                write(&path.with_extension("expected.err"), &e.render(&source, filename));
            } else {
                eprintln!(
                    "ERROR: {:?} failed to compile but is not in errors/: {}",
                    path, e
                );
            }
        }
    }
}
