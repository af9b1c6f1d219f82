use super::error::Error;
use super::locations::{advance, Location, Span};
use const_format::concatcp;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

#[derive(Clone, Default, Debug, PartialEq)]
pub struct Token {
    pub(crate) typ: TokenType,
    pub(crate) lexeme: String,
    pub(crate) span: Span,
}

impl Token {
    pub fn typ(&self) -> TokenType {
        self.typ
    }
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }
    pub fn is(&self, typ: TokenType) -> bool {
        self.typ == typ
    }
    /// `"T_NAME : lexeme"` for named tokens, the bare character otherwise.
    pub fn render(&self) -> String {
        match self.typ.name() {
            Some(name) => format!("{} : {}", name, self.lexeme),
            None => self.lexeme.clone(),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

macro_rules! token_types {
    ($($name:ident),+ $(,)?) => {
        #[allow(non_camel_case_types)]
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
        pub enum TokenType {
            $($name,)+
            Char(char),
            #[default]
            T_BAD_CHARACTER,
        }

        impl TokenType {
            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $(Self::$name => Some(stringify!($name)),)+
                    Self::Char(_) => None,
                    Self::T_BAD_CHARACTER => Some("T_BAD_CHARACTER"),
                }
            }
        }
    };
}

token_types! {
    T_INLINE_HTML,
    T_OPEN_TAG,
    T_OPEN_TAG_WITH_ECHO,
    T_CLOSE_TAG,
    T_WHITESPACE,
    T_COMMENT,
    T_DOC_COMMENT,
    T_ATTRIBUTE,
    T_VARIABLE,
    T_STRING,
    T_NAME_QUALIFIED,
    T_NAME_FULLY_QUALIFIED,
    T_NAME_RELATIVE,
    T_NS_SEPARATOR,
    T_LNUMBER,
    T_DNUMBER,
    T_CONSTANT_ENCAPSED_STRING,
    T_ENCAPSED_AND_WHITESPACE,
    T_START_HEREDOC,
    T_END_HEREDOC,
    T_ABSTRACT,
    T_ARRAY,
    T_AS,
    T_BREAK,
    T_CALLABLE,
    T_CASE,
    T_CATCH,
    T_CLASS,
    T_CLONE,
    T_CONST,
    T_CONTINUE,
    T_DECLARE,
    T_DEFAULT,
    T_DO,
    T_ECHO,
    T_ELSE,
    T_ELSEIF,
    T_EMPTY,
    T_ENDDECLARE,
    T_ENDFOR,
    T_ENDFOREACH,
    T_ENDIF,
    T_ENDSWITCH,
    T_ENDWHILE,
    T_EVAL,
    T_EXIT,
    T_EXTENDS,
    T_FINAL,
    T_FINALLY,
    T_FN,
    T_FOR,
    T_FOREACH,
    T_FUNCTION,
    T_GLOBAL,
    T_GOTO,
    T_IF,
    T_IMPLEMENTS,
    T_INCLUDE,
    T_INCLUDE_ONCE,
    T_INSTANCEOF,
    T_INSTEADOF,
    T_INTERFACE,
    T_ISSET,
    T_LIST,
    T_LOGICAL_AND,
    T_LOGICAL_OR,
    T_LOGICAL_XOR,
    T_MATCH,
    T_NAMESPACE,
    T_NEW,
    T_PRINT,
    T_PRIVATE,
    T_PROTECTED,
    T_PUBLIC,
    T_READONLY,
    T_REQUIRE,
    T_REQUIRE_ONCE,
    T_RETURN,
    T_STATIC,
    T_SWITCH,
    T_THROW,
    T_TRAIT,
    T_TRY,
    T_UNSET,
    T_USE,
    T_VAR,
    T_WHILE,
    T_YIELD,
    T_CLASS_C,
    T_DIR,
    T_FILE,
    T_FUNC_C,
    T_LINE,
    T_METHOD_C,
    T_NS_C,
    T_TRAIT_C,
    T_INT_CAST,
    T_DOUBLE_CAST,
    T_STRING_CAST,
    T_ARRAY_CAST,
    T_OBJECT_CAST,
    T_BOOL_CAST,
    T_UNSET_CAST,
    T_SPACESHIP,
    T_IS_IDENTICAL,
    T_IS_NOT_IDENTICAL,
    T_IS_EQUAL,
    T_IS_NOT_EQUAL,
    T_IS_SMALLER_OR_EQUAL,
    T_IS_GREATER_OR_EQUAL,
    T_DOUBLE_ARROW,
    T_OBJECT_OPERATOR,
    T_NULLSAFE_OBJECT_OPERATOR,
    T_PAAMAYIM_NEKUDOTAYIM,
    T_INC,
    T_DEC,
    T_BOOLEAN_AND,
    T_BOOLEAN_OR,
    T_COALESCE,
    T_COALESCE_EQUAL,
    T_PLUS_EQUAL,
    T_MINUS_EQUAL,
    T_MUL_EQUAL,
    T_DIV_EQUAL,
    T_CONCAT_EQUAL,
    T_MOD_EQUAL,
    T_AND_EQUAL,
    T_OR_EQUAL,
    T_XOR_EQUAL,
    T_POW,
    T_POW_EQUAL,
    T_SL,
    T_SR,
    T_SL_EQUAL,
    T_SR_EQUAL,
    T_ELLIPSIS,
}

impl TokenType {
    /// Tokens the PHP parser never sees.
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::T_WHITESPACE
                | Self::T_COMMENT
                | Self::T_DOC_COMMENT
                | Self::T_OPEN_TAG
                | Self::T_CLOSE_TAG
                | Self::T_INLINE_HTML
        )
    }
}

/// The category name of a token type, or the character itself for bare
/// single-character tokens.
pub fn token_name(typ: TokenType) -> String {
    match (typ.name(), typ) {
        (Some(name), _) => name.to_string(),
        (None, TokenType::Char(c)) => c.to_string(),
        (None, _) => String::new(),
    }
}

const KEYWORDS: [(&str, TokenType); 85] = [
    ("abstract", TokenType::T_ABSTRACT),
    ("and", TokenType::T_LOGICAL_AND),
    ("array", TokenType::T_ARRAY),
    ("as", TokenType::T_AS),
    ("break", TokenType::T_BREAK),
    ("callable", TokenType::T_CALLABLE),
    ("case", TokenType::T_CASE),
    ("catch", TokenType::T_CATCH),
    ("class", TokenType::T_CLASS),
    ("clone", TokenType::T_CLONE),
    ("const", TokenType::T_CONST),
    ("continue", TokenType::T_CONTINUE),
    ("declare", TokenType::T_DECLARE),
    ("default", TokenType::T_DEFAULT),
    ("die", TokenType::T_EXIT),
    ("do", TokenType::T_DO),
    ("echo", TokenType::T_ECHO),
    ("else", TokenType::T_ELSE),
    ("elseif", TokenType::T_ELSEIF),
    ("empty", TokenType::T_EMPTY),
    ("enddeclare", TokenType::T_ENDDECLARE),
    ("endfor", TokenType::T_ENDFOR),
    ("endforeach", TokenType::T_ENDFOREACH),
    ("endif", TokenType::T_ENDIF),
    ("endswitch", TokenType::T_ENDSWITCH),
    ("endwhile", TokenType::T_ENDWHILE),
    ("eval", TokenType::T_EVAL),
    ("exit", TokenType::T_EXIT),
    ("extends", TokenType::T_EXTENDS),
    ("final", TokenType::T_FINAL),
    ("finally", TokenType::T_FINALLY),
    ("fn", TokenType::T_FN),
    ("for", TokenType::T_FOR),
    ("foreach", TokenType::T_FOREACH),
    ("function", TokenType::T_FUNCTION),
    ("global", TokenType::T_GLOBAL),
    ("goto", TokenType::T_GOTO),
    ("if", TokenType::T_IF),
    ("implements", TokenType::T_IMPLEMENTS),
    ("include", TokenType::T_INCLUDE),
    ("include_once", TokenType::T_INCLUDE_ONCE),
    ("instanceof", TokenType::T_INSTANCEOF),
    ("insteadof", TokenType::T_INSTEADOF),
    ("interface", TokenType::T_INTERFACE),
    ("isset", TokenType::T_ISSET),
    ("list", TokenType::T_LIST),
    ("match", TokenType::T_MATCH),
    ("namespace", TokenType::T_NAMESPACE),
    ("new", TokenType::T_NEW),
    ("or", TokenType::T_LOGICAL_OR),
    ("print", TokenType::T_PRINT),
    ("private", TokenType::T_PRIVATE),
    ("protected", TokenType::T_PROTECTED),
    ("public", TokenType::T_PUBLIC),
    ("readonly", TokenType::T_READONLY),
    ("require", TokenType::T_REQUIRE),
    ("require_once", TokenType::T_REQUIRE_ONCE),
    ("return", TokenType::T_RETURN),
    ("static", TokenType::T_STATIC),
    ("switch", TokenType::T_SWITCH),
    ("throw", TokenType::T_THROW),
    ("trait", TokenType::T_TRAIT),
    ("try", TokenType::T_TRY),
    ("unset", TokenType::T_UNSET),
    ("use", TokenType::T_USE),
    ("var", TokenType::T_VAR),
    ("while", TokenType::T_WHILE),
    ("xor", TokenType::T_LOGICAL_XOR),
    ("yield", TokenType::T_YIELD),
    ("__class__", TokenType::T_CLASS_C),
    ("__dir__", TokenType::T_DIR),
    ("__file__", TokenType::T_FILE),
    ("__function__", TokenType::T_FUNC_C),
    ("__line__", TokenType::T_LINE),
    ("__method__", TokenType::T_METHOD_C),
    ("__namespace__", TokenType::T_NS_C),
    ("__trait__", TokenType::T_TRAIT_C),
    ("int", TokenType::T_INT_CAST),
    ("integer", TokenType::T_INT_CAST),
    ("float", TokenType::T_DOUBLE_CAST),
    ("double", TokenType::T_DOUBLE_CAST),
    ("string", TokenType::T_STRING_CAST),
    ("object", TokenType::T_OBJECT_CAST),
    ("bool", TokenType::T_BOOL_CAST),
    ("boolean", TokenType::T_BOOL_CAST),
];

// Cast names share the table above; they only apply inside `( ... )`.
const CAST_KEYWORDS: usize = 8;

const SIMPLE_TOKENS: [(&str, TokenType); 36] = [
    ("<=>", TokenType::T_SPACESHIP),
    ("===", TokenType::T_IS_IDENTICAL),
    ("!==", TokenType::T_IS_NOT_IDENTICAL),
    ("**=", TokenType::T_POW_EQUAL),
    ("...", TokenType::T_ELLIPSIS),
    ("<<=", TokenType::T_SL_EQUAL),
    (">>=", TokenType::T_SR_EQUAL),
    ("??=", TokenType::T_COALESCE_EQUAL),
    ("?->", TokenType::T_NULLSAFE_OBJECT_OPERATOR),
    ("==", TokenType::T_IS_EQUAL),
    ("!=", TokenType::T_IS_NOT_EQUAL),
    ("<>", TokenType::T_IS_NOT_EQUAL),
    ("<=", TokenType::T_IS_SMALLER_OR_EQUAL),
    (">=", TokenType::T_IS_GREATER_OR_EQUAL),
    ("=>", TokenType::T_DOUBLE_ARROW),
    ("->", TokenType::T_OBJECT_OPERATOR),
    ("::", TokenType::T_PAAMAYIM_NEKUDOTAYIM),
    ("++", TokenType::T_INC),
    ("--", TokenType::T_DEC),
    ("&&", TokenType::T_BOOLEAN_AND),
    ("||", TokenType::T_BOOLEAN_OR),
    ("??", TokenType::T_COALESCE),
    ("+=", TokenType::T_PLUS_EQUAL),
    ("-=", TokenType::T_MINUS_EQUAL),
    ("*=", TokenType::T_MUL_EQUAL),
    ("/=", TokenType::T_DIV_EQUAL),
    (".=", TokenType::T_CONCAT_EQUAL),
    ("%=", TokenType::T_MOD_EQUAL),
    ("&=", TokenType::T_AND_EQUAL),
    ("|=", TokenType::T_OR_EQUAL),
    ("^=", TokenType::T_XOR_EQUAL),
    ("**", TokenType::T_POW),
    ("<<", TokenType::T_SL),
    (">>", TokenType::T_SR),
    ("#[", TokenType::T_ATTRIBUTE),
    ("\\", TokenType::T_NS_SEPARATOR),
];

macro_rules! alternative {
    ($t:expr) => {{
        $t
    }};
    ($t:expr, $($ts:expr),+) => {{
        concatcp!($t, "|", alternative!($($ts),+))
    }}
}

macro_rules! group {
    ($($ts:expr),+) => {{
        concatcp!(r"(?:", alternative!($($ts),+), ")")
    }}
}

macro_rules! maybe {
    ($($ts:expr),+) => {
        concatcp!(group!($($ts),+), r"?")
    }
}

const S_LABEL: &str = r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*";
const S_WHITESPACE: &str = r"^[ \n\r\t]+";
const S_VARIABLE: &str = concatcp!(r"^\$", S_LABEL);
const S_NAME: &str = concatcp!("^", S_LABEL);
const S_NAME_QUALIFIED: &str = concatcp!("^", S_LABEL, r"(?:\\", S_LABEL, ")+");
const S_NAME_FULLY_QUALIFIED: &str = concatcp!(r"^(?:\\", S_LABEL, ")+");
const S_NAME_RELATIVE: &str = concatcp!(r"^(?i:namespace)(?:\\", S_LABEL, ")+");
const S_DIGITS: &str = r"[0-9]+(?:_[0-9]+)*";
const S_HEXNUMBER: &str = r"0[xX][0-9a-fA-F]+(?:_[0-9a-fA-F]+)*";
const S_BINNUMBER: &str = r"0[bB][01]+(?:_[01]+)*";
const S_OCTNUMBER: &str = r"0[oO][0-7]+(?:_[0-7]+)*";
const S_EXPONENT: &str = concatcp!(r"[eE][-+]?", S_DIGITS);
const S_POINTFLOAT: &str = group!(
    concatcp!(maybe!(S_DIGITS), r"\.", S_DIGITS),
    concatcp!(S_DIGITS, r"\.", maybe!(S_DIGITS))
);
const S_FLOATNUMBER: &str = concatcp!(
    "^",
    group!(
        concatcp!(group!(S_POINTFLOAT, S_DIGITS), S_EXPONENT),
        S_POINTFLOAT
    )
);
const S_INTNUMBER: &str = concatcp!("^", group!(S_HEXNUMBER, S_BINNUMBER, S_OCTNUMBER, S_DIGITS));
const S_CAST: &str = r"^\([ \t]*([a-zA-Z]+)[ \t]*\)";
const S_HEREDOC: &str = concatcp!(
    r"^<<<[ \t]*",
    group!(
        concatcp!(r#""("#, S_LABEL, r#")""#),
        concatcp!("'(", S_LABEL, ")'"),
        concatcp!("(", S_LABEL, ")")
    ),
    r"\r?\n"
);
const S_OPEN_TAG: &str = r"(?i:<\?php)(?:\r\n|[ \t\n\r]|$)|<\?=";

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_WHITESPACE).expect("Error compiling regex."));
static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_VARIABLE).expect("Error compiling regex."));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(S_NAME).expect("Error compiling regex."));
static NAME_QUALIFIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_NAME_QUALIFIED).expect("Error compiling regex."));
static NAME_FULLY_QUALIFIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_NAME_FULLY_QUALIFIED).expect("Error compiling regex."));
static NAME_RELATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_NAME_RELATIVE).expect("Error compiling regex."));
static FLOATNUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_FLOATNUMBER).expect("Error compiling regex."));
static INTNUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_INTNUMBER).expect("Error compiling regex."));
static CAST: Lazy<Regex> = Lazy::new(|| Regex::new(S_CAST).expect("Error compiling regex."));
static HEREDOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_HEREDOC).expect("Error compiling regex."));
static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_OPEN_TAG).expect("Error compiling regex."));

/// Lexemes produced by one scanning step, as `(type, byte length)` pairs.
type Pieces = Vec<(TokenType, usize)>;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Unterminated {
    String,
    Comment,
}

impl Unterminated {
    fn message(&self) -> &'static str {
        match self {
            Self::String => "Unterminated string literal",
            Self::Comment => "Unterminated comment",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    InlineHtml,
    Php,
}

pub struct Tokenizer {
    tokens: Vec<Token>,
    pending: String,
    location: Location,
    mode: Mode,
    previous: Option<TokenType>,
    unterminated: Option<Unterminated>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// A tokenizer that, like `token_get_all`, treats everything before the
    /// first open tag as inline HTML.
    pub fn new() -> Self {
        Self {
            tokens: vec![],
            pending: String::new(),
            location: Location { line: 1, column: 0 },
            mode: Mode::InlineHtml,
            previous: None,
            unterminated: None,
        }
    }

    /// A tokenizer that starts inside PHP code, for line-by-line input.
    pub fn interactive() -> Self {
        Self {
            mode: Mode::Php,
            ..Self::new()
        }
    }

    pub fn feed(&mut self, input: &str) -> LexState {
        self.pending.push_str(input);
        let mut offset = 0;
        self.unterminated = None;
        while offset < self.pending.len() {
            let rest = &self.pending[offset..];
            let scanned = match self.mode {
                Mode::InlineHtml => Ok(scan_inline_html(rest)),
                Mode::Php => self.scan_php(rest),
            };
            match scanned {
                Ok(pieces) => {
                    for (typ, len) in pieces {
                        self.push(typ, offset, len);
                        offset += len;
                    }
                }
                Err(what) => {
                    self.unterminated = Some(what);
                    break;
                }
            }
        }
        self.pending.drain(..offset);
        if self.unterminated.is_some() {
            LexState::ContinuationNeeded
        } else {
            LexState::Ok
        }
    }

    /// Hands out the tokens completed so far.
    pub fn extract(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.tokens)
    }

    pub fn finalize(self) -> Result<Vec<Token>, Error> {
        match self.unterminated {
            Some(what) => {
                let start = Span::new(self.location, self.location);
                let end = advance(self.location, &self.pending);
                Err(Error::with_range(start, &Span::new(end, end), what.message()))
            }
            None => Ok(self.tokens),
        }
    }

    fn push(&mut self, typ: TokenType, offset: usize, len: usize) {
        let lexeme = self.pending[offset..offset + len].to_string();
        let start = self.location;
        self.location = advance(start, &lexeme);
        match typ {
            TokenType::T_OPEN_TAG | TokenType::T_OPEN_TAG_WITH_ECHO => self.mode = Mode::Php,
            TokenType::T_CLOSE_TAG => self.mode = Mode::InlineHtml,
            _ => {}
        }
        if !typ.is_ignorable() {
            self.previous = Some(typ);
        }
        self.tokens.push(Token {
            typ,
            lexeme,
            span: Span::new(start, self.location),
        });
    }

    fn scan_php(&self, rest: &str) -> Result<Pieces, Unterminated> {
        if let Some(tail) = rest.strip_prefix("?>") {
            let newline = if tail.starts_with("\r\n") {
                2
            } else if tail.starts_with('\n') {
                1
            } else {
                0
            };
            return Ok(vec![(TokenType::T_CLOSE_TAG, 2 + newline)]);
        }
        if let Some(m) = WHITESPACE.find(rest) {
            return Ok(vec![(TokenType::T_WHITESPACE, m.end())]);
        }
        if rest.starts_with("//") || (rest.starts_with('#') && !rest.starts_with("#[")) {
            return Ok(vec![(TokenType::T_COMMENT, line_comment_len(rest))]);
        }
        if rest.starts_with("/*") {
            return block_comment(rest);
        }
        if let Some(m) = VARIABLE.find(rest) {
            return Ok(vec![(TokenType::T_VARIABLE, m.end())]);
        }
        if let Some(piece) = scan_cast(rest) {
            return Ok(vec![piece]);
        }
        if let Some(piece) = scan_number(rest) {
            return Ok(vec![piece]);
        }
        if let Some(piece) = self.scan_name(rest) {
            return Ok(vec![piece]);
        }
        if rest.starts_with('\'') {
            return single_quoted(rest);
        }
        if rest.starts_with('"') {
            return double_quoted(rest);
        }
        if let Some(pieces) = heredoc(rest) {
            return pieces;
        }
        for (lexeme, tok_type) in SIMPLE_TOKENS {
            if rest.starts_with(lexeme) {
                return Ok(vec![(tok_type, lexeme.len())]);
            }
        }
        match rest.chars().next() {
            Some(c) => Ok(vec![(TokenType::Char(c), c.len_utf8())]),
            None => Ok(vec![]),
        }
    }

    fn scan_name(&self, rest: &str) -> Option<(TokenType, usize)> {
        if let Some(m) = NAME_RELATIVE.find(rest) {
            return Some((TokenType::T_NAME_RELATIVE, m.end()));
        }
        if let Some(m) = NAME_QUALIFIED.find(rest) {
            return Some((TokenType::T_NAME_QUALIFIED, m.end()));
        }
        if let Some(m) = NAME_FULLY_QUALIFIED.find(rest) {
            return Some((TokenType::T_NAME_FULLY_QUALIFIED, m.end()));
        }
        let m = NAME.find(rest)?;
        // Member names may reuse reserved words.
        let member = matches!(
            self.previous,
            Some(TokenType::T_OBJECT_OPERATOR)
                | Some(TokenType::T_NULLSAFE_OBJECT_OPERATOR)
                | Some(TokenType::T_PAAMAYIM_NEKUDOTAYIM)
        );
        let typ = if member {
            TokenType::T_STRING
        } else {
            keyword(m.as_str()).unwrap_or(TokenType::T_STRING)
        };
        Some((typ, m.end()))
    }
}

fn keyword(word: &str) -> Option<TokenType> {
    KEYWORDS[..KEYWORDS.len() - CAST_KEYWORDS]
        .iter()
        .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
        .map(|(_, typ)| *typ)
}

fn scan_inline_html(rest: &str) -> Pieces {
    match OPEN_TAG.find(rest) {
        Some(m) => {
            let tag = if m.as_str().starts_with("<?=") {
                TokenType::T_OPEN_TAG_WITH_ECHO
            } else {
                TokenType::T_OPEN_TAG
            };
            let mut pieces = vec![];
            if m.start() > 0 {
                pieces.push((TokenType::T_INLINE_HTML, m.start()));
            }
            pieces.push((tag, m.len()));
            pieces
        }
        None => vec![(TokenType::T_INLINE_HTML, rest.len())],
    }
}

fn scan_cast(rest: &str) -> Option<(TokenType, usize)> {
    let caps = CAST.captures(rest)?;
    let name = caps.get(1)?.as_str();
    let typ = match name.to_ascii_lowercase().as_str() {
        "array" => TokenType::T_ARRAY_CAST,
        "unset" => TokenType::T_UNSET_CAST,
        "binary" => TokenType::T_STRING_CAST,
        "real" => TokenType::T_DOUBLE_CAST,
        _ => KEYWORDS[KEYWORDS.len() - CAST_KEYWORDS..]
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(name))
            .map(|(_, typ)| *typ)?,
    };
    Some((typ, caps.get(0)?.end()))
}

fn scan_number(rest: &str) -> Option<(TokenType, usize)> {
    if let Some(m) = FLOATNUMBER.find(rest) {
        return Some((TokenType::T_DNUMBER, m.end()));
    }
    let m = INTNUMBER.find(rest)?;
    // Integers that overflow become floats, as in PHP.
    let typ = if parse_int(m.as_str()).is_some() {
        TokenType::T_LNUMBER
    } else {
        TokenType::T_DNUMBER
    };
    Some((typ, m.end()))
}

/// Parses a PHP integer literal (decimal, `0x`, `0b`, `0o` or legacy octal).
pub(crate) fn parse_int(literal: &str) -> Option<i64> {
    let digits = literal.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

fn line_comment_len(rest: &str) -> usize {
    let eol = rest.find(|c: char| c == '\n' || c == '\r').unwrap_or(rest.len());
    rest[..eol].find("?>").unwrap_or(eol)
}

fn block_comment(rest: &str) -> Result<Pieces, Unterminated> {
    let close = rest[2..].find("*/").ok_or(Unterminated::Comment)?;
    let len = 2 + close + 2;
    let doc = rest.starts_with("/**")
        && rest[3..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_whitespace());
    let typ = if doc {
        TokenType::T_DOC_COMMENT
    } else {
        TokenType::T_COMMENT
    };
    Ok(vec![(typ, len)])
}

fn single_quoted(rest: &str) -> Result<Pieces, Unterminated> {
    let bytes = rest.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' => return Ok(vec![(TokenType::T_CONSTANT_ENCAPSED_STRING, i + 1)]),
            _ => i += 1,
        }
    }
    Err(Unterminated::String)
}

fn starts_label(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
}

/// Double-quoted strings stay a single token unless they interpolate a
/// `$variable`; then the quotes, literal parts and variables are split.
fn double_quoted(rest: &str) -> Result<Pieces, Unterminated> {
    let bytes = rest.as_bytes();
    let mut parts = vec![];
    let mut segment = 1;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => {
                if parts.is_empty() {
                    return Ok(vec![(TokenType::T_CONSTANT_ENCAPSED_STRING, i + 1)]);
                }
                let mut pieces = vec![(TokenType::Char('"'), 1)];
                pieces.append(&mut parts);
                if i > segment {
                    pieces.push((TokenType::T_ENCAPSED_AND_WHITESPACE, i - segment));
                }
                pieces.push((TokenType::Char('"'), 1));
                return Ok(pieces);
            }
            b'$' if starts_label(&rest[i + 1..]) => {
                if i > segment {
                    parts.push((TokenType::T_ENCAPSED_AND_WHITESPACE, i - segment));
                }
                let len = VARIABLE.find(&rest[i..]).map_or(1, |m| m.end());
                parts.push((TokenType::T_VARIABLE, len));
                i += len;
                segment = i;
            }
            _ => i += 1,
        }
    }
    Err(Unterminated::String)
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// `<<<LABEL` (heredoc) or `<<<'LABEL'` (nowdoc) up to the closing label,
/// which may be indented. Heredoc text splits on `$variable` like a
/// double-quoted string; nowdoc text is a single lexeme.
fn heredoc(rest: &str) -> Option<Result<Pieces, Unterminated>> {
    let caps = HEREDOC.captures(rest)?;
    let start = caps.get(0)?.end();
    let (label, nowdoc) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (_, Some(label), _) => (label.as_str(), true),
        (Some(label), _, _) | (_, _, Some(label)) => (label.as_str(), false),
        _ => return None,
    };
    let mut line_start = start;
    loop {
        let line = &rest[line_start..];
        let indented = line.trim_start_matches([' ', '\t']);
        let closes = indented
            .strip_prefix(label)
            .is_some_and(|after| !after.chars().next().is_some_and(is_label_char));
        if closes {
            let body = &rest[start..line_start];
            let mut pieces = vec![(TokenType::T_START_HEREDOC, start)];
            if nowdoc {
                if !body.is_empty() {
                    pieces.push((TokenType::T_ENCAPSED_AND_WHITESPACE, body.len()));
                }
            } else {
                pieces.append(&mut interpolated(body));
            }
            let close = line.len() - indented.len() + label.len();
            pieces.push((TokenType::T_END_HEREDOC, close));
            return Some(Ok(pieces));
        }
        match line.find('\n') {
            Some(eol) => line_start += eol + 1,
            None => return Some(Err(Unterminated::String)),
        }
    }
}

/// Literal runs and `$variable`s of an interpolated text.
fn interpolated(text: &str) -> Pieces {
    let bytes = text.as_bytes();
    let mut pieces = vec![];
    let mut segment = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if starts_label(&text[i + 1..]) => {
                if i > segment {
                    pieces.push((TokenType::T_ENCAPSED_AND_WHITESPACE, i - segment));
                }
                let len = VARIABLE.find(&text[i..]).map_or(1, |m| m.end());
                pieces.push((TokenType::T_VARIABLE, len));
                i += len;
                segment = i;
            }
            _ => i += 1,
        }
    }
    if text.len() > segment {
        pieces.push((TokenType::T_ENCAPSED_AND_WHITESPACE, text.len() - segment));
    }
    pieces
}

pub fn tokenize_string(input: &str) -> Result<Vec<Token>, Error> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.feed(input);
    tokenizer.finalize()
}

pub fn tokenize_file<P>(path: P) -> Result<Vec<Token>, crate::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| crate::Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tokenize_string(&source)?)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexState {
    Ok,
    ContinuationNeeded,
}
