//! Tokenizer and recursive-descent parser for the engine's SQL dialect.

use super::{
    Assignment, CompareOp, OrderKey, Projection, SetExpr, SqlOperand, Statement, WhereExpr,
};
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use vitrine_core::{Error, Result, Value};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    LParen,
    RParen,
    Comma,
    Star,
    Placeholder,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_statement(message, self.pos)
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                ' ' | '\t' | '\n' | '\r' | ';' => self.advance(),
                '(' => {
                    self.advance();
                    tokens.push((start, Token::LParen));
                }
                ')' => {
                    self.advance();
                    tokens.push((start, Token::RParen));
                }
                ',' => {
                    self.advance();
                    tokens.push((start, Token::Comma));
                }
                '*' => {
                    self.advance();
                    tokens.push((start, Token::Star));
                }
                '?' => {
                    self.advance();
                    tokens.push((start, Token::Placeholder));
                }
                '=' => {
                    self.advance();
                    tokens.push((start, Token::Eq));
                }
                '!' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push((start, Token::Ne));
                    } else {
                        return Err(self.error("expected '=' after '!'"));
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push((start, Token::Lte));
                    } else {
                        tokens.push((start, Token::Lt));
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push((start, Token::Gte));
                    } else {
                        tokens.push((start, Token::Gt));
                    }
                }
                '\'' => {
                    self.advance();
                    let mut text = String::new();
                    loop {
                        match self.peek() {
                            Some('\'') => {
                                self.advance();
                                break;
                            }
                            Some(ch) => {
                                text.push(ch);
                                self.advance();
                            }
                            None => return Err(self.error("unterminated string literal")),
                        }
                    }
                    tokens.push((start, Token::Str(text)));
                }
                '-' => {
                    self.advance();
                    let number = self.read_number(start)?;
                    let negated = match number {
                        Value::Int(i) => Value::Int(-i),
                        Value::Float(f) => Value::Float(-f),
                        _ => return Err(self.error("expected digits after '-'")),
                    };
                    tokens.push((start, Token::Number(negated)));
                }
                c if c.is_ascii_digit() => {
                    let number = self.read_number(start)?;
                    tokens.push((start, Token::Number(number)));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(ch) = self.peek() {
                        if ch.is_alphanumeric() || ch == '_' {
                            ident.push(ch);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    tokens.push((start, Token::Ident(ident)));
                }
                other => {
                    return Err(self.error(alloc::format!("unexpected character '{}'", other)))
                }
            }
        }
        Ok(tokens)
    }

    fn read_number(&mut self, start: usize) -> Result<Value> {
        let mut digits = String::new();
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                is_float = true;
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(Error::invalid_statement("expected digits", start));
        }
        if is_float {
            digits
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::invalid_statement("malformed number", start))
        } else {
            digits
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Error::invalid_statement("malformed number", start))
        }
    }
}

/// Parses one statement of the engine dialect.
pub fn parse(sql: &str) -> Result<Statement> {
    let tokens = Tokenizer::new(sql).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        placeholders: 0,
    };
    let statement = parser.statement()?;
    parser.expect_end()?;
    Ok(statement)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    placeholders: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(p, _)| *p)
            .unwrap_or(0)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_statement(message, self.position())
    }

    /// Consumes the next token if it is the given keyword
    /// (case-insensitive).
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(Token::Ident(ident)) = self.peek() {
            if ident.eq_ignore_ascii_case(keyword) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(alloc::format!("expected {}", keyword)))
        }
    }

    fn expect_token(&mut self, expected: Token, what: &str) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            _ => Err(self.error(alloc::format!("expected {}", what))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(ident)) => Ok(ident),
            _ => Err(self.error("expected identifier")),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("trailing tokens after statement"))
        }
    }

    fn statement(&mut self) -> Result<Statement> {
        if self.eat_keyword("BEGIN") {
            return Ok(Statement::Begin);
        }
        if self.eat_keyword("COMMIT") {
            return Ok(Statement::Commit);
        }
        if self.eat_keyword("ROLLBACK") {
            return Ok(Statement::Rollback);
        }
        if self.eat_keyword("INSERT") {
            return self.insert();
        }
        if self.eat_keyword("UPDATE") {
            return self.update();
        }
        if self.eat_keyword("DELETE") {
            return self.delete();
        }
        if self.eat_keyword("SELECT") {
            return self.select();
        }
        if self.eat_keyword("ALTER") {
            return self.alter();
        }
        Err(self.error("unrecognized statement"))
    }

    fn insert(&mut self) -> Result<Statement> {
        self.expect_keyword("INTO")?;
        let table = self.expect_ident()?;
        self.expect_token(Token::LParen, "'('")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.expect_ident()?);
            if !self.eat_token(Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RParen, "')'")?;
        self.expect_keyword("VALUES")?;
        self.expect_token(Token::LParen, "'('")?;
        let mut values = Vec::new();
        loop {
            values.push(self.operand()?);
            if !self.eat_token(Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RParen, "')'")?;
        if values.len() != columns.len() {
            return Err(self.error("column/value count mismatch"));
        }
        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    fn update(&mut self) -> Result<Statement> {
        let table = self.expect_ident()?;
        self.expect_keyword("SET")?;
        let mut assignments = Vec::new();
        loop {
            let column = self.expect_ident()?;
            self.expect_token(Token::Eq, "'='")?;
            let expr = if self.eat_keyword("REPLACE") {
                self.expect_token(Token::LParen, "'('")?;
                let source = self.expect_ident()?;
                self.expect_token(Token::Comma, "','")?;
                let search = self.operand()?;
                self.expect_token(Token::Comma, "','")?;
                let replacement = self.operand()?;
                self.expect_token(Token::RParen, "')'")?;
                SetExpr::Replace {
                    source,
                    search,
                    replacement,
                }
            } else {
                SetExpr::Value(self.operand()?)
            };
            assignments.push(Assignment { column, expr });
            if !self.eat_token(Token::Comma) {
                break;
            }
        }
        let filter = self.optional_where()?;
        Ok(Statement::Update {
            table,
            assignments,
            filter,
        })
    }

    fn delete(&mut self) -> Result<Statement> {
        self.expect_keyword("FROM")?;
        let table = self.expect_ident()?;
        let filter = self.optional_where()?;
        Ok(Statement::Delete { table, filter })
    }

    fn select(&mut self) -> Result<Statement> {
        let projection = if self.eat_token(Token::Star) {
            Projection::All
        } else if self.eat_keyword("COUNT") {
            self.expect_token(Token::LParen, "'('")?;
            self.expect_token(Token::Star, "'*'")?;
            self.expect_token(Token::RParen, "')'")?;
            let alias = if self.eat_keyword("AS") {
                Some(self.expect_ident()?)
            } else {
                None
            };
            Projection::CountStar { alias }
        } else {
            return Err(self.error("expected '*' or COUNT(*)"));
        };
        self.expect_keyword("FROM")?;
        let table = self.expect_ident()?;
        let filter = self.optional_where()?;

        let mut order_by = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let column = self.expect_ident()?;
                let descending = if self.eat_keyword("DESC") {
                    true
                } else {
                    self.eat_keyword("ASC");
                    false
                };
                order_by.push(OrderKey { column, descending });
                if !self.eat_token(Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.eat_keyword("LIMIT") {
            Some(self.expect_unsigned()?)
        } else {
            None
        };
        let offset = if self.eat_keyword("OFFSET") {
            Some(self.expect_unsigned()?)
        } else {
            None
        };

        Ok(Statement::Select {
            table,
            projection,
            filter,
            order_by,
            limit,
            offset,
        })
    }

    fn alter(&mut self) -> Result<Statement> {
        self.expect_keyword("TABLE")?;
        let table = self.expect_ident()?;
        if self.eat_keyword("ADD") {
            self.expect_keyword("COLUMN")?;
            let column = self.expect_ident()?;
            // Optional column type, ignored by the schema-less engine.
            while self.peek().is_some() {
                self.pos += 1;
            }
            return Ok(Statement::AlterAddColumn { table, column });
        }
        if self.eat_keyword("DROP") {
            self.expect_keyword("COLUMN")?;
            let column = self.expect_ident()?;
            return Ok(Statement::AlterDropColumn { table, column });
        }
        Err(self.error("expected ADD or DROP"))
    }

    fn optional_where(&mut self) -> Result<Option<WhereExpr>> {
        if self.eat_keyword("WHERE") {
            Ok(Some(self.where_expr()?))
        } else {
            Ok(None)
        }
    }

    /// `expr := and_expr (OR and_expr)*`. Standard precedence: AND binds
    /// tighter than OR.
    fn where_expr(&mut self) -> Result<WhereExpr> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("OR") {
            let right = self.and_expr()?;
            left = WhereExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<WhereExpr> {
        let mut left = self.primary_expr()?;
        while self.eat_keyword("AND") {
            let right = self.primary_expr()?;
            left = WhereExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary_expr(&mut self) -> Result<WhereExpr> {
        if self.eat_token(Token::LParen) {
            let expr = self.where_expr()?;
            self.expect_token(Token::RParen, "')'")?;
            return Ok(expr);
        }
        let column = self.expect_ident()?;

        if self.eat_keyword("NOT") {
            if self.eat_keyword("IN") {
                return self.in_list(column, true);
            }
            if self.eat_keyword("LIKE") {
                let pattern = self.operand()?;
                return Ok(WhereExpr::Like {
                    column,
                    negated: true,
                    pattern,
                });
            }
            return Err(self.error("expected IN or LIKE after NOT"));
        }
        if self.eat_keyword("IN") {
            return self.in_list(column, false);
        }
        if self.eat_keyword("LIKE") {
            let pattern = self.operand()?;
            return Ok(WhereExpr::Like {
                column,
                negated: false,
                pattern,
            });
        }

        let op = match self.next() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Lte) => CompareOp::Lte,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Gte) => CompareOp::Gte,
            _ => return Err(self.error("expected comparison operator")),
        };
        let rhs = self.operand()?;
        Ok(WhereExpr::Compare { column, op, rhs })
    }

    fn in_list(&mut self, column: String, negated: bool) -> Result<WhereExpr> {
        self.expect_token(Token::LParen, "'('")?;
        let mut items = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                items.push(self.operand()?);
                if !self.eat_token(Token::Comma) {
                    break;
                }
            }
        }
        self.expect_token(Token::RParen, "')'")?;
        Ok(WhereExpr::InList {
            column,
            negated,
            items,
        })
    }

    fn operand(&mut self) -> Result<SqlOperand> {
        match self.next() {
            Some(Token::Placeholder) => {
                let index = self.placeholders;
                self.placeholders += 1;
                Ok(SqlOperand::Placeholder(index))
            }
            Some(Token::Number(value)) => Ok(SqlOperand::Literal(value)),
            Some(Token::Str(text)) => Ok(SqlOperand::Literal(Value::Text(text))),
            Some(Token::Ident(ident)) => {
                if ident.eq_ignore_ascii_case("true") {
                    Ok(SqlOperand::Literal(Value::Bool(true)))
                } else if ident.eq_ignore_ascii_case("false") {
                    Ok(SqlOperand::Literal(Value::Bool(false)))
                } else if ident.eq_ignore_ascii_case("null") {
                    Ok(SqlOperand::Literal(Value::Null))
                } else {
                    Err(self.error(alloc::format!("unexpected identifier '{}'", ident)))
                }
            }
            _ => Err(self.error("expected value")),
        }
    }

    fn expect_unsigned(&mut self) -> Result<u64> {
        match self.next() {
            Some(Token::Number(Value::Int(i))) if i >= 0 => Ok(i as u64),
            _ => Err(self.error("expected non-negative integer")),
        }
    }

    fn eat_token(&mut self, expected: Token) -> bool {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
