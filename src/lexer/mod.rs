mod error;
mod locations;
pub mod tokenizer;

pub use error::Error;
pub use locations::{Locatable, Location, Span};
pub use tokenizer::{
    token_name, tokenize_file, tokenize_string, LexState, Token, TokenType, Tokenizer,
};

/// Renders every token the way `token_get_all` output is usually dumped:
/// `"T_NAME : text"` for named tokens, the bare character otherwise.
pub fn render_tokens(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(Token::render).collect()
}
