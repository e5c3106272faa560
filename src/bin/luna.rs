//! Luna interpreter command-line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop.
//!
//! When called with arguments, it interprets the corresponding files in a
//! single interpreter session (so code and data sharing is possible).

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;

use anyhow::{self, Context};

use luna::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if !args.is_empty() {
        run_all_files(args)?;
    } else {
        run_prompt()?;
    }
    Ok(())
}

fn run_all_files(paths: Vec<String>) -> Result<(), anyhow::Error> {
    let mut interp = Interpreter::new();

    for p in &paths {
        let code =
            fs::read_to_string(p).with_context(|| format!("failed to open {}", p))?;
        interp.eval(&code)?;
    }

    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut interp = Interpreter::new();

    let mut input = String::new();
    loop {
        stdout.write_all(b">>> ")?;
        stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        match interp.eval(&input) {
            Ok(v) => println!("{}", v),
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}
