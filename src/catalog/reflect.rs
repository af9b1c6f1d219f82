use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::value::DefaultValue;
use crate::error::{Error, Result};
use crate::lexer::{tokenize_string, Token, TokenType as TT};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Name including the `$` sigil.
    pub name: String,
    /// Declared type as written, without whitespace; empty when untyped.
    pub typ: String,
    /// `None` when the parameter declares no default.
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    /// Namespace-qualified name, e.g. `add` or `VisualPHP\add`.
    pub name: String,
    pub return_type: String,
    pub params: Vec<ParamDescriptor>,
    pub file: PathBuf,
    /// First line after the line holding the `function` keyword.
    pub body_line: usize,
    /// Line of the closing brace.
    pub end_line: usize,
}

/// Every top-level function declared in a set of PHP files, in declaration
/// order.
#[derive(Debug, Default)]
pub struct Registry {
    functions: Vec<FunctionDescriptor>,
}

impl Registry {
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut registry = Self::default();
        for path in paths {
            let path = path.as_ref();
            let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
            registry.extend(&source, path)?;
        }
        Ok(registry)
    }

    pub fn from_source(source: &str, file: &Path) -> Result<Self> {
        let mut registry = Self::default();
        registry.extend(source, file)?;
        Ok(registry)
    }

    fn extend(&mut self, source: &str, file: &Path) -> Result<()> {
        let tokens = tokenize_string(source)?;
        let found = Reflector::new(&tokens, file).reflect()?;
        debug!("{}: {} function(s) declared", file.display(), found.len());
        for function in found {
            self.register(function)?;
        }
        Ok(())
    }

    fn register(&mut self, function: FunctionDescriptor) -> Result<()> {
        if self.get(&function.name).is_some() {
            return Err(Error::Redeclared {
                name: function.name,
                file: function.file,
                line: function.body_line - 1,
            });
        }
        self.functions.push(function);
        Ok(())
    }

    pub fn defined(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    /// Function names are case-insensitive in PHP.
    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

enum Scope {
    Namespace,
    Block,
}

struct Reflector<'a> {
    tokens: &'a [Token],
    pos: usize,
    file: &'a Path,
    namespace: String,
    scopes: Vec<Scope>,
}

fn line(token: &Token) -> usize {
    token.span.start_line().unwrap_or_default()
}

impl<'a> Reflector<'a> {
    fn new(tokens: &'a [Token], file: &'a Path) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            namespace: String::new(),
            scopes: vec![],
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens[self.pos..]
            .iter()
            .find(|t| !t.typ.is_ignorable())
    }

    fn next(&mut self) -> Option<&'a Token> {
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !token.typ.is_ignorable() {
                return Some(token);
            }
        }
        None
    }

    fn peek_is(&self, typ: TT) -> bool {
        self.peek().is_some_and(|t| t.is(typ))
    }

    fn syntax(&self, at: Option<&Token>, msg: &str) -> Error {
        let line = match at {
            Some(token) => line(token),
            None => self.tokens.last().and_then(|t| t.span.end_line()).unwrap_or(1),
        };
        Error::Syntax {
            file: self.file.to_path_buf(),
            line,
            message: msg.to_string(),
        }
    }

    fn expect(&mut self, typ: TT, msg: &str) -> Result<&'a Token> {
        match self.next() {
            Some(token) if token.is(typ) => Ok(token),
            other => Err(self.syntax(other, msg)),
        }
    }

    fn at_top_level(&self) -> bool {
        self.scopes.iter().all(|s| matches!(s, Scope::Namespace))
    }

    fn reflect(mut self) -> Result<Vec<FunctionDescriptor>> {
        let mut found = vec![];
        let mut previous = None;
        while let Some(token) = self.next() {
            match token.typ {
                TT::T_NAMESPACE if self.scopes.is_empty() => self.namespace()?,
                TT::T_FUNCTION if self.at_top_level() && previous != Some(TT::T_USE) => {
                    if let Some(function) = self.function(token)? {
                        found.push(function);
                    }
                }
                TT::Char('{') => self.scopes.push(Scope::Block),
                TT::Char('}') => {
                    if let Some(Scope::Namespace) = self.scopes.pop() {
                        self.namespace.clear();
                    }
                }
                _ => {}
            }
            previous = Some(token.typ);
        }
        Ok(found)
    }

    /// `namespace Foo;`, `namespace Foo { ... }` or the global `namespace { ... }`.
    fn namespace(&mut self) -> Result<()> {
        self.namespace.clear();
        if let Some(name) = self
            .peek()
            .filter(|t| t.is(TT::T_STRING) || t.is(TT::T_NAME_QUALIFIED))
        {
            self.next();
            self.namespace = name.lexeme.clone();
        }
        match self.next() {
            Some(t) if t.is(TT::Char(';')) => Ok(()),
            Some(t) if t.is(TT::Char('{')) => {
                self.scopes.push(Scope::Namespace);
                Ok(())
            }
            other => Err(self.syntax(other, "expected `;` or `{` after namespace")),
        }
    }

    fn function(&mut self, keyword: &Token) -> Result<Option<FunctionDescriptor>> {
        if self.peek_is(TT::Char('&')) {
            self.next();
        }
        // Closures have no name; their braces are tracked by the caller.
        let Some(name) = self.peek().filter(|t| t.is(TT::T_STRING)) else {
            return Ok(None);
        };
        self.next();
        let name = if self.namespace.is_empty() {
            name.lexeme.clone()
        } else {
            format!("{}\\{}", self.namespace, name.lexeme)
        };
        let params = self.parameters()?;
        let return_type = self.return_type();
        if self.peek_is(TT::Char(';')) {
            self.next();
            return Ok(None);
        }
        self.expect(TT::Char('{'), "expected function body")?;
        let end_line = self.body()?;
        debug!("reflected {}({} params)", name, params.len());
        Ok(Some(FunctionDescriptor {
            name,
            return_type,
            params,
            file: self.file.to_path_buf(),
            body_line: line(keyword) + 1,
            end_line,
        }))
    }

    fn parameters(&mut self) -> Result<Vec<ParamDescriptor>> {
        self.expect(TT::Char('('), "expected `(` after function name")?;
        let mut params = vec![];
        loop {
            match self.peek() {
                Some(t) if t.is(TT::Char(')')) => {
                    self.next();
                    return Ok(params);
                }
                Some(_) => params.push(self.parameter()?),
                None => return Err(self.syntax(None, "unterminated parameter list")),
            }
            match self.next() {
                Some(t) if t.is(TT::Char(',')) => continue,
                Some(t) if t.is(TT::Char(')')) => return Ok(params),
                other => return Err(self.syntax(other, "expected `,` or `)`")),
            }
        }
    }

    fn parameter(&mut self) -> Result<ParamDescriptor> {
        let mut typ: Vec<&Token> = vec![];
        let name = loop {
            match self.next() {
                Some(t) if t.is(TT::T_VARIABLE) => break t.lexeme.clone(),
                Some(t) if t.is(TT::T_ATTRIBUTE) => self.skip_attribute()?,
                Some(t)
                    if matches!(
                        t.typ,
                        TT::T_PUBLIC | TT::T_PROTECTED | TT::T_PRIVATE | TT::T_READONLY
                    ) => {}
                Some(t) if t.is(TT::Char(',')) || t.is(TT::Char(')')) => {
                    return Err(self.syntax(Some(t), "parameter without a name"))
                }
                Some(t) => typ.push(t),
                None => return Err(self.syntax(None, "unterminated parameter list")),
            }
        };
        // By-reference and variadic markers belong to the variable.
        while typ
            .last()
            .is_some_and(|t| t.is(TT::Char('&')) || t.is(TT::T_ELLIPSIS))
        {
            typ.pop();
        }
        let typ = typ.iter().map(|t| t.lexeme.as_str()).collect();
        let default = if self.peek_is(TT::Char('=')) {
            self.next();
            Some(self.default_value()?)
        } else {
            None
        };
        Ok(ParamDescriptor { name, typ, default })
    }

    fn skip_attribute(&mut self) -> Result<()> {
        let mut depth = 1;
        while depth > 0 {
            match self.next() {
                Some(t) if t.is(TT::Char('[')) || t.is(TT::T_ATTRIBUTE) => depth += 1,
                Some(t) if t.is(TT::Char(']')) => depth -= 1,
                Some(_) => {}
                None => return Err(self.syntax(None, "unterminated attribute")),
            }
        }
        Ok(())
    }

    fn default_value(&mut self) -> Result<DefaultValue> {
        let start = self.pos;
        let mut depth = 0;
        loop {
            match self.peek() {
                Some(t) if depth == 0 && (t.is(TT::Char(',')) || t.is(TT::Char(')'))) => break,
                Some(t) => {
                    match t.typ {
                        TT::Char('(') | TT::Char('[') | TT::Char('{') => depth += 1,
                        TT::Char(')') | TT::Char(']') | TT::Char('}') => depth -= 1,
                        _ => {}
                    }
                    self.next();
                }
                None => return Err(self.syntax(None, "unterminated default value")),
            }
        }
        if start == self.pos {
            return Err(self.syntax(self.peek(), "missing default value"));
        }
        Ok(DefaultValue::from_tokens(&self.tokens[start..self.pos]))
    }

    fn return_type(&mut self) -> String {
        let mut typ = String::new();
        if !self.peek_is(TT::Char(':')) {
            return typ;
        }
        self.next();
        while let Some(t) = self.peek() {
            if t.is(TT::Char('{')) || t.is(TT::Char(';')) {
                break;
            }
            typ.push_str(&t.lexeme);
            self.next();
        }
        typ
    }

    /// Consumes the body up to its closing brace and returns that brace's line.
    fn body(&mut self) -> Result<usize> {
        let mut depth = 1;
        while let Some(t) = self.next() {
            match t.typ {
                TT::Char('{') => depth += 1,
                TT::Char('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(line(t));
                    }
                }
                _ => {}
            }
        }
        Err(self.syntax(None, "unterminated function body"))
    }
}
