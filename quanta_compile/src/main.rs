use std::{
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use quanta_compile::{
    config::{Config, DEFAULT_MAX_CALL_DEPTH},
    interpret::Interpreter,
    run,
};
use quanta_syntax::source::{read_program, FileSource, InteractiveSource};

/// quanta evaluates programs that compute with physical quantities.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Read the program from a file.
    #[arg(short, long, value_name = "PATH", conflicts_with = "interactive")]
    file: Option<PathBuf>,

    /// Type the program in line by line, ending it with a line reading DONE.
    #[arg(short, long)]
    interactive: bool,

    /// Maximum depth of nested function calls.
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,

    /// Program file, the same as passing it with --file.
    #[arg(conflicts_with_all = ["file", "interactive"])]
    path: Option<PathBuf>,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let args = Args::parse();

    let source = match args.file.or(args.path) {
        Some(path) => FileSource::open(&path).and_then(|mut file| read_program(&mut file)),
        None => {
            let mut stdin = InteractiveSource::new(BufReader::new(io::stdin()), io::stdout());
            read_program(&mut stdin)
        }
    };
    let source = match source {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read the program: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = Interpreter::new(Config::default().with_max_call_depth(args.max_depth));
    match run(&source, &mut interpreter) {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => (),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
