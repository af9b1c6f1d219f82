/// A position in the source text. Lines are 1-indexed like PHP's own
/// reflection output, columns are 0-indexed byte offsets into the line.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

pub trait Locatable {
    fn span(&self) -> Span;
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum Span {
    #[default]
    Indetermined,
    Determined(Extent),
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Extent {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub(crate) fn new(start: Location, end: Location) -> Self {
        Self::Determined(Extent { start, end })
    }

    pub fn start_line(&self) -> Option<usize> {
        match self {
            Self::Determined(e) => Some(e.start.line),
            Self::Indetermined => None,
        }
    }

    pub fn end_line(&self) -> Option<usize> {
        match self {
            Self::Determined(e) => Some(e.end.line),
            Self::Indetermined => None,
        }
    }

    pub fn till<R: Locatable>(&self, other: &R) -> Self {
        match (self, other.span()) {
            (Self::Indetermined, Self::Indetermined) => Self::Indetermined,
            (Self::Indetermined, Self::Determined(t)) => Self::Determined(t),
            (Self::Determined(s), Self::Indetermined) => Self::Determined(*s),
            (Self::Determined(s), Self::Determined(t)) => Self::Determined(Extent {
                start: s.start,
                end: t.end,
            }),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indetermined => write!(f, "unknown location"),
            Self::Determined(e) if e.start == e.end => write!(f, "{}", e.start),
            Self::Determined(e) => write!(f, "{} till {}", e.start, e.end),
        }
    }
}

/// Where the cursor ends up after consuming `text` starting at `from`.
pub(crate) fn advance(from: Location, text: &str) -> Location {
    match text.rfind('\n') {
        Some(idx) => Location {
            line: from.line + text.matches('\n').count(),
            column: text.len() - idx - 1,
        },
        None => Location {
            line: from.line,
            column: from.column + text.len(),
        },
    }
}

impl Locatable for Span {
    fn span(&self) -> Span {
        *self
    }
}
