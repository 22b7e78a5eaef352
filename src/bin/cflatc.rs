//! the compiler driver binary. takes a source file, an optional output
//! format, and a list of `-I` include directories, and prints the
//! requested stage's output to stdout.
//!
//! run with `--help` for more info.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use cflat::back;
use cflat::front::{self, lex};
use cflat::preprocessor::{self, Diagnostic, IncludeResolver, Severity};

use clap::{Parser, ValueEnum};
use log::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file
    file: String,
    /// the output format
    #[arg(value_enum, short, long, default_value_t = Output::Asm)]
    out: Output,
    /// additional directories searched by `#include <...>`
    #[arg(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// the preprocessed source text
    Preprocessed,
    /// the list of tokens
    Tokens,
    /// the ast data structure
    Ast,
    /// the resulting MIPS32 assembly
    Asm,
}

/// Resolves `#include` paths against the source file's own directory
/// (`search_internal`, for `"..."`) and a list of `-I` directories
/// (`search_external`, for `<...>`), reading each header exactly once.
/// Leaking the loaded text is fine here: the resolver lives for the whole
/// process and the driver is not part of the core this crate specifies.
struct FileResolver {
    base_dir: PathBuf,
    include_dirs: Vec<PathBuf>,
    headers: RefCell<Vec<&'static str>>,
}

impl FileResolver {
    fn new(source_path: &Path, include_dirs: Vec<PathBuf>) -> Self {
        let base_dir = source_path.parent().map(Path::to_path_buf).unwrap_or_default();
        FileResolver {
            base_dir,
            include_dirs,
            headers: RefCell::new(Vec::new()),
        }
    }

    fn load(&self, path: PathBuf) -> Option<usize> {
        let text = std::fs::read_to_string(&path).ok()?;
        debug!("loaded include {}", path.display());
        let leaked: &'static str = Box::leak(text.into_boxed_str());
        let mut headers = self.headers.borrow_mut();
        headers.push(leaked);
        Some(headers.len() - 1)
    }
}

impl IncludeResolver for FileResolver {
    fn search_internal(&self, path: &str) -> Option<usize> {
        self.load(self.base_dir.join(path))
    }

    fn search_external(&self, path: &str) -> Option<usize> {
        self.include_dirs
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file())
            .and_then(|candidate| self.load(candidate))
    }

    fn header_text(&self, index: usize) -> &str {
        self.headers.borrow()[index]
    }
}

fn report(diags: &[Diagnostic]) {
    for diag in diags {
        match diag.severity {
            Severity::Error => eprintln!("error: {diag}"),
            Severity::Warning => warn!("{diag}"),
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    info!("compiling {}", args.file);

    let raw = std::fs::read(&args.file).expect("file should be readable");
    let input = String::from_utf8(raw).expect("input characters should be utf8");

    let resolver = FileResolver::new(Path::new(&args.file), args.include_dirs);
    let (preprocessed, diags) = preprocessor::preprocess(&input, 0, &resolver);
    let had_errors = diags.iter().any(Diagnostic::is_error);
    report(&diags);
    debug!("preprocessing produced {} diagnostics", diags.len());

    if args.out == Output::Preprocessed {
        print!("{preprocessed}");
        return;
    }
    if had_errors {
        std::process::exit(1);
    }

    match args.out {
        Output::Preprocessed => unreachable!(),
        Output::Tokens => {
            let mut lexer = lex::Lexer::new(&preprocessed);
            loop {
                match lexer.next() {
                    Ok(Some(token)) => println!("{token}"),
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("{e}");
                        std::process::exit(1);
                    }
                }
            }
        }
        Output::Ast => match front::parse(&preprocessed) {
            Ok((ast, _tables)) => println!("{ast:?}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        Output::Asm => match front::parse(&preprocessed) {
            Ok((ast, tables)) => {
                info!("lowering to MIPS32 assembly");
                print!("{}", back::compile(&ast, &tables));
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
    }
}
