//! Recursive-descent parser for the condition grammar:
//!
//! ```text
//! expr     := or_expr
//! or_expr  := and_expr ('||' and_expr)*
//! and_expr := cmp_expr ('&&' cmp_expr)*
//! cmp_expr := atom (('==' | '!=' | '<=' | '<' | '>=' | '>') atom)?
//! atom     := NUMBER | STRING | 'true' | 'false' | IDENT | '!' atom | '(' expr ')'
//! ```

use super::ast::{CmpOp, Expr};

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

pub fn parse(input: &str) -> Result<Expr, String> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        source: input,
    };
    let expr = parser.parse_or()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(format!("unexpected trailing input in `{}`", parser.source));
    }
    Ok(expr)
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        let rest: String = self.chars[self.pos..].iter().collect();
        rest.starts_with(s)
    }

    /// True if `word` (an identifier-shaped keyword) occurs next and is not
    /// itself the prefix of a longer identifier (so `truely` is parsed as an
    /// identifier, not `true` followed by trailing garbage).
    fn peek_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        if !self.starts_with(word) {
            return false;
        }
        match self.chars.get(self.pos + word.chars().count()) {
            Some(c) => !(c.is_alphanumeric() || *c == '_'),
            None => true,
        }
    }

    fn consume_token(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.starts_with(token) {
            self.pos += token.chars().count();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        loop {
            if self.consume_token("||") {
                let rhs = self.parse_and()?;
                lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_cmp()?;
        loop {
            if self.consume_token("&&") {
                let rhs = self.parse_cmp()?;
                lhs = Expr::And(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_atom()?;
        let op = if self.consume_token("==") {
            Some(CmpOp::Eq)
        } else if self.consume_token("!=") {
            Some(CmpOp::Ne)
        } else if self.consume_token("<=") {
            Some(CmpOp::Le)
        } else if self.consume_token(">=") {
            Some(CmpOp::Ge)
        } else if self.consume_token("<") {
            Some(CmpOp::Lt)
        } else if self.consume_token(">") {
            Some(CmpOp::Gt)
        } else {
            None
        };

        match op {
            Some(op) => {
                let rhs = self.parse_atom()?;
                Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        if self.consume_token("!") {
            let inner = self.parse_atom()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.consume_token("(") {
            let inner = self.parse_or()?;
            if !self.consume_token(")") {
                return Err("expected closing parenthesis".to_string());
            }
            return Ok(inner);
        }
        if self.peek_keyword("true") {
            self.consume_token("true");
            return Ok(Expr::Bool(true));
        }
        if self.peek_keyword("false") {
            self.consume_token("false");
            return Ok(Expr::Bool(false));
        }
        if let Some('"') = self.peek() {
            return self.parse_string();
        }
        if let Some(c) = self.peek() {
            if c.is_ascii_digit() || (c == '-' && self.pos + 1 < self.chars.len() && self.chars[self.pos + 1].is_ascii_digit()) {
                return self.parse_number();
            }
            if c.is_alphabetic() || c == '_' {
                return self.parse_ident();
            }
        }
        Err(format!("unexpected character at position {} in `{}`", self.pos, self.source))
    }

    fn parse_string(&mut self) -> Result<Expr, String> {
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string literal".to_string()),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(Expr::Str(out))
    }

    fn parse_number(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Expr::Num)
            .map_err(|_| format!("invalid number literal: {text}"))
    }

    fn parse_ident(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(Expr::Ident(text))
    }
}
