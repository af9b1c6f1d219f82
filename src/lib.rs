pub mod catalog;
pub mod config;
mod error;
pub mod lexer;

pub use catalog::{build_catalog, to_json, FunctionRecord, ParamRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use lexer::{render_tokens, tokenize_file, tokenize_string, Token, Tokenizer};

/// The snippet tokenized by `tokens` when it is run without arguments.
pub const DEMO_SOURCE: &str = "<?php add(multiply(2, 3), 5);";

/// `env_logger` on stderr, `warn` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}
