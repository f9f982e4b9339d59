//! Textual type syntax used by declaration files and configuration.
//!
//! ```text
//! type    := primary ("[" "]")*
//! primary := "?" | NAME ("<" type ("," type)* ">")?
//!          | "(" (type ("," type)*)? ")" "->" type
//!          | "(" type ")"
//!          | "{" (field ("," field)*)? ("," "..")? "}" | "{" ".." "}"
//! field   := NAME ":" type
//! ```
//!
//! Names listed in `type_params` parse to [`Ty::Param`].

use std::fmt;

use crate::ty::{RecordTy, Ty};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSyntaxError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for TypeSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for TypeSyntaxError {}

/// Parse a type with no type parameters in scope.
pub fn parse_type(src: &str) -> Result<Ty, TypeSyntaxError> {
    parse_type_with_params(src, &[])
}

/// Parse a type, resolving the given names to type parameters.
pub fn parse_type_with_params(src: &str, type_params: &[String]) -> Result<Ty, TypeSyntaxError> {
    let mut parser = TypeParser {
        src,
        pos: 0,
        type_params,
    };
    let ty = parser.ty()?;
    parser.skip_ws();
    if parser.pos < src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(ty)
}

struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
    type_params: &'a [String],
}

impl<'a> TypeParser<'a> {
    fn error(&self, message: impl Into<String>) -> TypeSyntaxError {
        TypeSyntaxError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), TypeSyntaxError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", token)))
        }
    }

    fn name(&mut self) -> Result<String, TypeSyntaxError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            let ok = if self.pos == start {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
            };
            if !ok {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn ty(&mut self) -> Result<Ty, TypeSyntaxError> {
        let mut ty = self.primary()?;
        while self.eat("[") {
            self.expect("]")?;
            ty = Ty::array(ty);
        }
        Ok(ty)
    }

    fn list_until(&mut self, close: &str) -> Result<Vec<Ty>, TypeSyntaxError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.ty()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn primary(&mut self) -> Result<Ty, TypeSyntaxError> {
        if self.eat("?") {
            return Ok(Ty::Unknown);
        }
        if self.eat("(") {
            let items = self.list_until(")")?;
            if self.eat("->") {
                let ret = self.ty()?;
                return Ok(Ty::fun(items, ret));
            }
            return match <[Ty; 1]>::try_from(items) {
                Ok([single]) => Ok(single),
                Err(_) => Err(self.error("expected `->` after parameter list")),
            };
        }
        if self.eat("{") {
            return self.record();
        }
        let name = self.name()?;
        if self.type_params.iter().any(|p| p == &name) {
            return Ok(Ty::Param(name));
        }
        if self.eat("<") {
            let args = self.list_until(">")?;
            return Ok(Ty::generic(name, args));
        }
        Ok(Ty::nominal(name))
    }

    fn record(&mut self) -> Result<Ty, TypeSyntaxError> {
        let mut rec = RecordTy {
            fields: Default::default(),
            closed: true,
        };
        if self.eat("}") {
            return Ok(Ty::RecordLiteral(rec));
        }
        loop {
            if self.eat("..") {
                rec.closed = false;
                self.expect("}")?;
                return Ok(Ty::RecordLiteral(rec));
            }
            let key = self.name()?;
            self.expect(":")?;
            let value = self.ty()?;
            if rec.fields.insert(key.clone(), value).is_some() {
                return Err(self.error(format!("duplicate record field `{}`", key)));
            }
            if self.eat("}") {
                return Ok(Ty::RecordLiteral(rec));
            }
            self.expect(",")?;
        }
    }
}
