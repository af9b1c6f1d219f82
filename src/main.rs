use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::Result;
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use visualphp::lexer::LexState;
use visualphp::{init_logging, render_tokens, tokenize_file, tokenize_string, Tokenizer, DEMO_SOURCE};

/// Dumps the PHP token stream of a snippet, a file or interactive input.
#[derive(Parser)]
#[command(name = "tokens", version)]
struct Cli {
    /// PHP file to tokenize
    file: Option<PathBuf>,
    /// Read PHP code line by line instead
    #[arg(long, conflicts_with = "file")]
    repl: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    if cli.repl {
        run_repl()?;
    } else if let Some(file) = &cli.file {
        run_script(file)?;
    } else {
        let tokens = tokenize_string(DEMO_SOURCE)?;
        println!("{:#?}", render_tokens(&tokens));
    }
    Ok(())
}

fn run_script(filename: &Path) -> Result<()> {
    let tokens = tokenize_file(filename)?;
    println!("{:#?}", render_tokens(&tokens));
    Ok(())
}

fn run_repl() -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut tokenizer = Tokenizer::interactive();
    let mut prompt = ">> ";
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if let Err(err) = rl.add_history_entry(line.as_str()) {
                    debug!("history not updated: {}", err);
                }
                match tokenizer.feed(&format!("{}\n", line)) {
                    LexState::Ok => {
                        for token in tokenizer.extract() {
                            println!("{}", token);
                        }
                        prompt = ">> ";
                    }
                    LexState::ContinuationNeeded => prompt = ".. ",
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    for token in tokenizer.finalize()? {
        println!("{}", token);
    }
    Ok(())
}
