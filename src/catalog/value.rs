use log::warn;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::lexer::tokenizer::parse_int;
use crate::lexer::{Token, TokenType};

/// A parameter default as far as it can be folded without running PHP.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    EmptyArray,
    /// Anything that does not fold to a value (user constants, calls,
    /// non-empty arrays), kept as written.
    Expression(String),
}

impl DefaultValue {
    /// Folds the tokens between `=` and the end of the parameter.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let significant: Vec<&Token> = tokens.iter().filter(|t| !t.typ.is_ignorable()).collect();
        let mut folder = Folder {
            tokens: &significant,
            pos: 0,
        };
        if let Some(value) = folder.expression(0) {
            if folder.pos == significant.len() {
                return value;
            }
        }
        let text: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        let text = text.trim().to_string();
        warn!("default value `{}` does not fold to a constant, keeping its source text", text);
        Self::Expression(text)
    }
}

/// `true`/`false`/`null` and the predefined constants PHP substitutes at
/// compile time.
fn constant(name: &str) -> Option<DefaultValue> {
    let name = name.strip_prefix('\\').unwrap_or(name);
    Some(match name.to_ascii_lowercase().as_str() {
        "null" => DefaultValue::Null,
        "true" => DefaultValue::Bool(true),
        "false" => DefaultValue::Bool(false),
        _ => match name {
            "PHP_EOL" => DefaultValue::Str("\n".to_string()),
            "PHP_INT_MAX" => DefaultValue::Int(i64::MAX),
            "PHP_INT_MIN" => DefaultValue::Int(i64::MIN),
            "PHP_INT_SIZE" => DefaultValue::Int(8),
            "PHP_FLOAT_EPSILON" => DefaultValue::Float(f64::EPSILON),
            "PHP_FLOAT_MAX" => DefaultValue::Float(f64::MAX),
            "PHP_FLOAT_MIN" => DefaultValue::Float(f64::MIN_POSITIVE),
            "M_PI" => DefaultValue::Float(std::f64::consts::PI),
            "M_E" => DefaultValue::Float(std::f64::consts::E),
            _ => return None,
        },
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    BitOr,
    BitXor,
    BitAnd,
    Concat,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl Op {
    fn from_token(token: &Token) -> Option<Self> {
        use TokenType as TT;
        Some(match token.typ {
            TT::Char('|') => Self::BitOr,
            TT::Char('^') => Self::BitXor,
            TT::Char('&') => Self::BitAnd,
            TT::Char('.') => Self::Concat,
            TT::T_SL => Self::Shl,
            TT::T_SR => Self::Shr,
            TT::Char('+') => Self::Add,
            TT::Char('-') => Self::Sub,
            TT::Char('*') => Self::Mul,
            TT::Char('/') => Self::Div,
            TT::Char('%') => Self::Mod,
            TT::T_POW => Self::Pow,
            _ => return None,
        })
    }

    /// Left and right binding power, following PHP 8 precedence.
    fn binding(self) -> (u8, u8) {
        match self {
            Self::BitOr => (1, 2),
            Self::BitXor => (3, 4),
            Self::BitAnd => (5, 6),
            Self::Concat => (7, 8),
            Self::Shl | Self::Shr => (9, 10),
            Self::Add | Self::Sub => (11, 12),
            Self::Mul | Self::Div | Self::Mod => (13, 14),
            Self::Pow => (18, 17),
        }
    }
}

const PREFIX_BINDING: u8 = 15;

/// Precedence climbing over the significant tokens of a default.
struct Folder<'t> {
    tokens: &'t [&'t Token],
    pos: usize,
}

impl<'t> Folder<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, typ: TokenType) -> Option<()> {
        self.peek().filter(|t| t.is(typ))?;
        self.pos += 1;
        Some(())
    }

    fn expression(&mut self, min_binding: u8) -> Option<DefaultValue> {
        let mut lhs = self.operand()?;
        while let Some(op) = self.peek().and_then(Op::from_token) {
            let (left, right) = op.binding();
            if left < min_binding {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(right)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn operand(&mut self) -> Option<DefaultValue> {
        use TokenType as TT;
        let token = self.next()?;
        match token.typ {
            TT::T_LNUMBER | TT::T_DNUMBER => number(&token.lexeme),
            TT::T_CONSTANT_ENCAPSED_STRING => Some(DefaultValue::Str(unquote(&token.lexeme))),
            TT::T_STRING | TT::T_NAME_FULLY_QUALIFIED => constant(&token.lexeme),
            TT::Char('-') => negate(self.expression(PREFIX_BINDING)?),
            TT::Char('+') => match self.expression(PREFIX_BINDING)? {
                value @ (DefaultValue::Int(_) | DefaultValue::Float(_)) => Some(value),
                _ => None,
            },
            TT::Char('~') => match self.expression(PREFIX_BINDING)? {
                DefaultValue::Int(i) => Some(DefaultValue::Int(!i)),
                _ => None,
            },
            TT::Char('(') => {
                let value = self.expression(0)?;
                self.eat(TT::Char(')'))?;
                Some(value)
            }
            TT::Char('[') => {
                self.eat(TT::Char(']'))?;
                Some(DefaultValue::EmptyArray)
            }
            TT::T_ARRAY => {
                self.eat(TT::Char('('))?;
                self.eat(TT::Char(')'))?;
                Some(DefaultValue::EmptyArray)
            }
            _ => None,
        }
    }
}

fn number(lexeme: &str) -> Option<DefaultValue> {
    if let Some(int) = parse_int(lexeme) {
        return Some(DefaultValue::Int(int));
    }
    let float: f64 = lexeme.replace('_', "").parse().ok()?;
    Some(DefaultValue::Float(float))
}

fn negate(value: DefaultValue) -> Option<DefaultValue> {
    match value {
        DefaultValue::Int(i) => Some(match i.checked_neg() {
            Some(negated) => DefaultValue::Int(negated),
            None => DefaultValue::Float(-(i as f64)),
        }),
        DefaultValue::Float(f) => Some(DefaultValue::Float(-f)),
        _ => None,
    }
}

fn as_float(value: &DefaultValue) -> Option<f64> {
    match value {
        DefaultValue::Int(i) => Some(*i as f64),
        DefaultValue::Float(f) => Some(*f),
        _ => None,
    }
}

/// String conversion for `.`; floats only where Rust and PHP print alike.
fn as_string(value: &DefaultValue) -> Option<String> {
    match value {
        DefaultValue::Null | DefaultValue::Bool(false) => Some(String::new()),
        DefaultValue::Bool(true) => Some("1".to_string()),
        DefaultValue::Int(i) => Some(i.to_string()),
        DefaultValue::Float(f) if *f == 0.0 || (1e-4..1e15).contains(&f.abs()) => {
            Some(f.to_string())
        }
        DefaultValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}

/// Integer arithmetic that overflows continues in floating point, as in PHP.
fn arithmetic(
    lhs: &DefaultValue,
    rhs: &DefaultValue,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Option<DefaultValue> {
    if let (DefaultValue::Int(a), DefaultValue::Int(b)) = (lhs, rhs) {
        if let Some(result) = int(*a, *b) {
            return Some(DefaultValue::Int(result));
        }
    }
    Some(DefaultValue::Float(float(as_float(lhs)?, as_float(rhs)?)))
}

fn apply(op: Op, lhs: DefaultValue, rhs: DefaultValue) -> Option<DefaultValue> {
    use DefaultValue::{Float, Int, Str};
    let value = match op {
        Op::Concat => Str(as_string(&lhs)? + &as_string(&rhs)?),
        Op::Add => arithmetic(&lhs, &rhs, i64::checked_add, |a, b| a + b)?,
        Op::Sub => arithmetic(&lhs, &rhs, i64::checked_sub, |a, b| a - b)?,
        Op::Mul => arithmetic(&lhs, &rhs, i64::checked_mul, |a, b| a * b)?,
        Op::Div => {
            // Division by zero throws at runtime.
            if as_float(&rhs)? == 0.0 {
                return None;
            }
            let exact = |a: i64, b: i64| -> Option<i64> { (a.checked_rem(b)? == 0).then(|| a / b) };
            arithmetic(&lhs, &rhs, exact, |a, b| a / b)?
        }
        Op::Pow => arithmetic(
            &lhs,
            &rhs,
            |a, b| a.checked_pow(u32::try_from(b).ok()?),
            f64::powf,
        )?,
        Op::Mod | Op::Shl | Op::Shr | Op::BitAnd | Op::BitOr | Op::BitXor => {
            let (Int(a), Int(b)) = (lhs, rhs) else {
                return None;
            };
            Int(match op {
                Op::Mod => a.checked_rem(b)?,
                Op::Shl | Op::Shr if b < 0 => return None,
                Op::Shl if b >= 64 => 0,
                Op::Shl => a << b,
                Op::Shr if b >= 64 => a.signum().min(0),
                Op::Shr => a >> b,
                Op::BitAnd => a & b,
                Op::BitOr => a | b,
                _ => a ^ b,
            })
        }
    };
    match value {
        Float(f) if !f.is_finite() => None,
        value => Some(value),
    }
}

/// Strips the quotes of a string literal and resolves its escapes.
pub(crate) fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len().saturating_sub(1).max(1)];
    if literal.starts_with('\'') {
        unescape_single(inner)
    } else {
        unescape_double(inner)
    }
}

fn unescape_single(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next)) if next == '\'' || next == '\\' => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push(c);
            break;
        };
        let simple = match next {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'v' => Some('\x0B'),
            'e' => Some('\x1B'),
            'f' => Some('\x0C'),
            '\\' | '$' | '"' => Some(next),
            _ => None,
        };
        if let Some(ch) = simple {
            out.push(ch);
            chars.next();
            continue;
        }
        match next {
            'x' => {
                chars.next();
                let hex: String = take_while(&mut chars, 2, |c| c.is_ascii_hexdigit());
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => out.push(char::from(byte)),
                    Err(_) => out.push_str("\\x"),
                }
            }
            'u' => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = take_while(&mut chars, 6, |c| c.is_ascii_hexdigit());
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(ch) => out.push(ch),
                        None => out.push_str(&format!("\\u{{{}}}", hex)),
                    }
                } else {
                    out.push_str("\\u");
                }
            }
            '0'..='7' => {
                let oct: String = take_while(&mut chars, 3, |c| ('0'..='7').contains(&c));
                let code = u32::from_str_radix(&oct, 8).unwrap_or(0) & 0xFF;
                out.push(char::from_u32(code).unwrap_or('\0'));
            }
            _ => out.push(c),
        }
    }
    out
}

fn take_while<I>(chars: &mut std::iter::Peekable<I>, max: usize, pred: fn(char) -> bool) -> String
where
    I: Iterator<Item = char>,
{
    let mut taken = String::new();
    while taken.len() < max {
        match chars.next_if(|c| pred(*c)) {
            Some(c) => taken.push(c),
            None => break,
        }
    }
    taken
}

impl Serialize for DefaultValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::EmptyArray => serializer.serialize_seq(Some(0))?.end(),
            Self::Expression(text) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("expression", text)?;
                map.end()
            }
        }
    }
}
