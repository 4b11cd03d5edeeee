//! Lane filter language.
//!
//! ```text
//! expr   := and ("or" and)*
//! and    := unary ("and" unary)*
//! unary  := "not" unary | "(" expr ")" | atom
//! atom   := status=WORD | tag=WORD | type=WORD | assignee=WORD
//!         | priority OP INT | points OP INT | age OP INT d | updated<=INT d | me
//! ```
//!
//! Whitespace is insignificant and keywords are case-insensitive. An empty
//! filter compiles to [`FilterExpr::True`].

use std::fmt;

use crate::model::filter::{CmpOp, FilterExpr};
use crate::model::ticket::{Status, TicketType};

/// A filter compilation error with a 1-based column into the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    pub column: usize,
    pub message: String,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for FilterError {}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Op(CmpOp),
    LParen,
    RParen,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Byte offset of the token in the source
    offset: usize,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '<' | '>' | '=')
}

fn tokenize(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '<' | '>' | '=' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                TokenKind::Op(match (c, followed_by_eq) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    ('>', true) => CmpOp::Ge,
                    _ => CmpOp::Eq, // `=` and `==`
                })
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                TokenKind::Word(word)
            }
        };
        tokens.push(Token { kind, offset });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset: src.len(),
    });
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> FilterError {
        FilterError {
            column: tok.offset + 1,
            message: message.into(),
        }
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(kw))
    }

    fn parse_or(&mut self) -> Result<FilterExpr, FilterError> {
        let mut items = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.next();
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            FilterExpr::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<FilterExpr, FilterError> {
        let mut items = vec![self.parse_unary()?];
        while self.peek_keyword("and") {
            self.next();
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            FilterExpr::And(items)
        })
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, FilterError> {
        if self.peek_keyword("not") {
            self.next();
            return Ok(FilterExpr::Not(Box::new(self.parse_unary()?)));
        }
        if self.peek().kind == TokenKind::LParen {
            self.next();
            let inner = self.parse_or()?;
            let close = self.next();
            if close.kind != TokenKind::RParen {
                return Err(self.error_at(&close, "expected ')'"));
            }
            return Ok(inner);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<FilterExpr, FilterError> {
        let tok = self.next();
        let name = match &tok.kind {
            TokenKind::Word(w) => w.to_lowercase(),
            TokenKind::End => return Err(self.error_at(&tok, "unexpected end of filter")),
            _ => return Err(self.error_at(&tok, "expected a filter term")),
        };

        match name.as_str() {
            "me" => Ok(FilterExpr::Me),
            "true" | "all" => Ok(FilterExpr::True),
            "status" => {
                let (value, at) = self.expect_eq_value(&name)?;
                Status::from_alias(&value)
                    .map(FilterExpr::Status)
                    .ok_or_else(|| self.error_at(&at, format!("unknown status '{}'", value)))
            }
            "type" => {
                let (value, at) = self.expect_eq_value(&name)?;
                TicketType::parse(&value)
                    .map(FilterExpr::Type)
                    .ok_or_else(|| self.error_at(&at, format!("unknown type '{}'", value)))
            }
            "tag" | "tags" => {
                let (value, _) = self.expect_eq_value(&name)?;
                Ok(FilterExpr::Tag(value))
            }
            "assignee" => {
                let (value, _) = self.expect_eq_value(&name)?;
                Ok(FilterExpr::Assignee(value))
            }
            "priority" => {
                let op = self.expect_op(&name)?;
                let n = self.expect_int(false)?;
                Ok(FilterExpr::Priority(op, n))
            }
            "points" => {
                let op = self.expect_op(&name)?;
                let n = self.expect_int(false)?;
                Ok(FilterExpr::Points(op, n))
            }
            "age" => {
                let op = self.expect_op(&name)?;
                let n = self.expect_int(true)?;
                Ok(FilterExpr::AgeDays(op, n))
            }
            "updated" => {
                let op_tok = self.peek().clone();
                let op = self.expect_op(&name)?;
                if op != CmpOp::Le {
                    return Err(self.error_at(&op_tok, "updated only supports '<='"));
                }
                let n = self.expect_int(true)?;
                Ok(FilterExpr::UpdatedWithinDays(n))
            }
            other => Err(self.error_at(&tok, format!("unknown filter field '{}'", other))),
        }
    }

    fn expect_op(&mut self, field: &str) -> Result<CmpOp, FilterError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Op(op) => Ok(op),
            _ => Err(self.error_at(&tok, format!("expected comparison after '{}'", field))),
        }
    }

    fn expect_eq_value(&mut self, field: &str) -> Result<(String, Token), FilterError> {
        let op_tok = self.next();
        if op_tok.kind != TokenKind::Op(CmpOp::Eq) {
            return Err(self.error_at(&op_tok, format!("expected '=' after '{}'", field)));
        }
        let tok = self.next();
        match &tok.kind {
            TokenKind::Word(w) => Ok((w.clone(), tok.clone())),
            _ => Err(self.error_at(&tok, "expected value after '='")),
        }
    }

    /// Parse an integer, optionally with a trailing `d` (days). Day counts
    /// may not be negative.
    fn expect_int(&mut self, days: bool) -> Result<i64, FilterError> {
        let tok = self.next();
        let word = match &tok.kind {
            TokenKind::Word(w) => w.clone(),
            _ => return Err(self.error_at(&tok, "expected a number")),
        };
        let digits = if days {
            word.strip_suffix(['d', 'D']).unwrap_or(&word)
        } else {
            word.as_str()
        };
        let n = digits
            .parse::<i64>()
            .map_err(|_| self.error_at(&tok, format!("invalid number '{}'", word)))?;
        if days && n < 0 {
            return Err(self.error_at(&tok, format!("negative day count '{}'", word)));
        }
        Ok(n)
    }
}

/// Compile a filter string. Empty or whitespace-only input is `True`.
pub fn parse_filter(src: &str) -> Result<FilterExpr, FilterError> {
    let mut parser = Parser {
        tokens: tokenize(src),
        pos: 0,
    };
    if parser.peek().kind == TokenKind::End {
        return Ok(FilterExpr::True);
    }
    let expr = parser.parse_or()?;
    let trailing = parser.next();
    if trailing.kind != TokenKind::End {
        return Err(parser.error_at(&trailing, "unexpected trailing input"));
    }
    Ok(expr)
}
