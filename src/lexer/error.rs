use super::locations::{Locatable, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Error(pub(crate) Span, pub(crate) String);

impl Error {
    pub fn with_range<R: Locatable>(start: Span, end: &R, msg: &str) -> Self {
        Self(start.till(end), msg.to_string())
    }
    pub fn span(&self) -> Span {
        self.0
    }
    pub fn message(&self) -> &str {
        &self.1
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error: {} in {}", self.1, self.0)
    }
}

impl std::error::Error for Error {}
