//! Hand-written SQL tokenizer and recursive-descent parser.
//!
//! Supports:
//! - SELECT columns or SELECT *
//! - FROM table lists with aliases
//! - WHERE conditions (AND, OR, NOT, comparison operators)
//! - Column aliases (AS)
//! - CREATE TABLE / INSERT / UPDATE / DELETE (parsed, not executed)

use super::ast::{
    BinaryOperator, ColumnDef, SelectColumn, SelectStatement, SqlExpr, Statement, TableRef,
};
use crate::data::{DataType, Value};
use crate::{Result, ToyDbError};

/// Token plus its byte span in the source, for error reporting
#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    start: usize,
    end: usize,
}

/// Token types for the SQL lexer
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Keywords
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    True,
    False,
    Null,
    // DDL/DML keywords
    Create,
    Table,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    // Symbols
    Star,      // *
    Comma,     // ,
    Dot,       // .
    LParen,    // (
    RParen,    // )
    Semicolon, // ;
    Eq,        // =
    NotEq,     // != or <>
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    // Literals
    Identifier(String),
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    // End
    Eof,
}

/// Recursive-descent SQL parser
pub struct SqlParser {
    sql: String,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl SqlParser {
    /// Parse a single SQL statement. Trailing semicolons are allowed;
    /// anything else after the statement is an error.
    pub fn parse(sql: &str) -> Result<Statement> {
        let tokens = Self::tokenize(sql)?;
        let mut parser = SqlParser { sql: sql.to_string(), tokens, pos: 0 };
        let stmt = parser.parse_statement()?;
        while matches!(parser.current(), Token::Semicolon) {
            parser.advance();
        }
        if !matches!(parser.current(), Token::Eof) {
            let (start, _) = parser.current_span();
            return Err(parser.syntax_error(
                start,
                format!("unexpected {} after statement", parser.describe_current()),
            ));
        }
        Ok(stmt)
    }

    /// Parse a standalone expression with the WHERE-clause grammar.
    pub fn parse_expression(expr: &str) -> Result<SqlExpr> {
        let tokens = Self::tokenize(expr)?;
        let mut parser = SqlParser { sql: expr.to_string(), tokens, pos: 0 };
        let e = parser.parse_expr()?;
        if !matches!(parser.current(), Token::Eof) {
            let (start, _) = parser.current_span();
            return Err(parser.syntax_error(
                start,
                format!("unexpected {} after expression", parser.describe_current()),
            ));
        }
        Ok(e)
    }

    /// Tokenize the statement. Byte-level scan; SQL keywords and symbols
    /// are ASCII, multi-byte UTF-8 only appears inside string literals.
    fn tokenize(sql: &str) -> Result<Vec<SpannedToken>> {
        let bytes = sql.as_bytes();
        let len = bytes.len();
        let mut tokens: Vec<SpannedToken> = Vec::with_capacity(len / 4 + 8);
        let mut i = 0;

        while i < len {
            let c = bytes[i];

            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }

            // -- line comment: skip to end of line
            if c == b'-' && i + 1 < len && bytes[i + 1] == b'-' {
                i += 2;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }

            // Single character tokens
            let single = match c {
                b'*' => Some(Token::Star),
                b',' => Some(Token::Comma),
                b'.' => Some(Token::Dot),
                b'(' => Some(Token::LParen),
                b')' => Some(Token::RParen),
                b';' => Some(Token::Semicolon),
                b'=' => Some(Token::Eq),
                _ => None,
            };
            if let Some(token) = single {
                tokens.push(SpannedToken { token, start: i, end: i + 1 });
                i += 1;
                continue;
            }

            // Multi-character operators
            if c == b'<' {
                if i + 1 < len && bytes[i + 1] == b'=' {
                    tokens.push(SpannedToken { token: Token::Le, start: i, end: i + 2 });
                    i += 2;
                } else if i + 1 < len && bytes[i + 1] == b'>' {
                    tokens.push(SpannedToken { token: Token::NotEq, start: i, end: i + 2 });
                    i += 2;
                } else {
                    tokens.push(SpannedToken { token: Token::Lt, start: i, end: i + 1 });
                    i += 1;
                }
                continue;
            }
            if c == b'>' {
                if i + 1 < len && bytes[i + 1] == b'=' {
                    tokens.push(SpannedToken { token: Token::Ge, start: i, end: i + 2 });
                    i += 2;
                } else {
                    tokens.push(SpannedToken { token: Token::Gt, start: i, end: i + 1 });
                    i += 1;
                }
                continue;
            }
            if c == b'!' {
                if i + 1 < len && bytes[i + 1] == b'=' {
                    tokens.push(SpannedToken { token: Token::NotEq, start: i, end: i + 2 });
                    i += 2;
                    continue;
                }
                return Err(Self::tokenize_error(sql, i, "stray '!'"));
            }

            // String literal: 'text'
            if c == b'\'' {
                let start = i;
                i += 1;
                let content_start = i;
                while i < len && bytes[i] != b'\'' {
                    i += 1;
                }
                if i >= len {
                    return Err(Self::tokenize_error(sql, start, "unterminated string literal"));
                }
                let text = sql[content_start..i].to_string();
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::StringLit(text),
                    start,
                    end: i,
                });
                continue;
            }

            // Number literal
            if c.is_ascii_digit() {
                let start = i;
                let mut is_float = false;
                while i < len {
                    let d = bytes[i];
                    if d.is_ascii_digit() {
                        i += 1;
                    } else if d == b'.' && !is_float && i + 1 < len && bytes[i + 1].is_ascii_digit()
                    {
                        is_float = true;
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &sql[start..i];
                let token = if is_float {
                    Token::FloatLit(text.parse::<f64>().map_err(|_| {
                        Self::tokenize_error(sql, start, "invalid float literal")
                    })?)
                } else {
                    Token::IntLit(text.parse::<i64>().map_err(|_| {
                        Self::tokenize_error(sql, start, "integer literal out of range")
                    })?)
                };
                tokens.push(SpannedToken { token, start, end: i });
                continue;
            }

            // Identifier or keyword
            if c.is_ascii_alphabetic() || c == b'_' {
                let start = i;
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &sql[start..i];
                let token = match word.to_ascii_uppercase().as_str() {
                    "SELECT" => Token::Select,
                    "FROM" => Token::From,
                    "WHERE" => Token::Where,
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "AS" => Token::As,
                    "TRUE" => Token::True,
                    "FALSE" => Token::False,
                    "NULL" => Token::Null,
                    "CREATE" => Token::Create,
                    "TABLE" => Token::Table,
                    "INSERT" => Token::Insert,
                    "INTO" => Token::Into,
                    "VALUES" => Token::Values,
                    "UPDATE" => Token::Update,
                    "SET" => Token::Set,
                    "DELETE" => Token::Delete,
                    _ => Token::Identifier(word.to_string()),
                };
                tokens.push(SpannedToken { token, start, end: i });
                continue;
            }

            return Err(Self::tokenize_error(
                sql,
                i,
                format!("unexpected character '{}'", bytes[i] as char),
            ));
        }

        tokens.push(SpannedToken { token: Token::Eof, start: len, end: len });
        Ok(tokens)
    }

    // -- token stream helpers ------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn current_span(&self) -> (usize, usize) {
        let t = &self.tokens[self.pos];
        (t.start, t.end)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.current() == &token {
            self.advance();
            Ok(())
        } else {
            let (start, _) = self.current_span();
            Err(self.syntax_error(
                start,
                format!("expected {}, got {}", what, self.describe_current()),
            ))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => {
                let (start, _) = self.current_span();
                Err(self.syntax_error(
                    start,
                    format!("expected {}, got {}", what, self.describe_current()),
                ))
            }
        }
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::StringLit(_) => "string literal".to_string(),
            Token::IntLit(v) => format!("number {}", v),
            Token::FloatLit(v) => format!("number {}", v),
            Token::Eof => "end of input".to_string(),
            other => format!("{:?}", other).to_uppercase(),
        }
    }

    // -- error helpers -------------------------------------------------------

    fn line_col(sql: &str, at: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, b) in sql.bytes().enumerate() {
            if i >= at {
                break;
            }
            if b == b'\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn format_near(sql: &str, at: usize) -> String {
        let start = at.saturating_sub(10);
        let end = (at + 10).min(sql.len());
        // Clamp to char boundaries so slicing cannot split UTF-8.
        let start = (start..=at).find(|&i| sql.is_char_boundary(i)).unwrap_or(0);
        let end = (end..=sql.len())
            .find(|&i| sql.is_char_boundary(i))
            .unwrap_or(sql.len());
        sql[start..end].trim().to_string()
    }

    fn syntax_error(&self, at: usize, msg: String) -> ToyDbError {
        Self::error_at(&self.sql, at, msg)
    }

    fn tokenize_error(sql: &str, at: usize, msg: impl Into<String>) -> ToyDbError {
        Self::error_at(sql, at, msg.into())
    }

    fn error_at(sql: &str, at: usize, msg: String) -> ToyDbError {
        let (line, col) = Self::line_col(sql, at);
        ToyDbError::Parse(format!(
            "syntax error at {}:{} (pos {}): {} (near: {})",
            line,
            col,
            at,
            msg,
            Self::format_near(sql, at)
        ))
    }

    // -- grammar -------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Create => self.parse_create_table(),
            Token::Insert => self.parse_insert(),
            Token::Update => self.parse_update(),
            Token::Delete => self.parse_delete(),
            _ => {
                let (start, _) = self.current_span();
                Err(self.syntax_error(
                    start,
                    format!("expected a statement, got {}", self.describe_current()),
                ))
            }
        }
    }

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(Token::Select, "SELECT")?;

        let mut select_all = false;
        let mut columns = Vec::new();
        if self.accept(&Token::Star) {
            select_all = true;
        } else {
            loop {
                columns.push(self.parse_select_column()?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }

        self.expect(Token::From, "FROM")?;
        let mut from = Vec::new();
        loop {
            from.push(self.parse_table_ref()?);
            if !self.accept(&Token::Comma) {
                break;
            }
        }

        let where_clause = if self.accept(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(SelectStatement { select_all, columns, from, where_clause })
    }

    fn parse_select_column(&mut self) -> Result<SelectColumn> {
        let first = self.expect_identifier("a column name")?;
        let (table, name) = if self.accept(&Token::Dot) {
            let name = self.expect_identifier("a column name after '.'")?;
            (Some(first), name)
        } else {
            (None, first)
        };
        let alias = if self.accept(&Token::As) {
            Some(self.expect_identifier("an alias after AS")?)
        } else {
            None
        };
        Ok(SelectColumn { table, name, alias })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_identifier("a table name")?;
        // Optional alias, with or without AS.
        let alias = if self.accept(&Token::As) {
            Some(self.expect_identifier("an alias after AS")?)
        } else if let Token::Identifier(alias) = self.current().clone() {
            self.advance();
            Some(alias)
        } else {
            None
        };
        Ok(TableRef { name, alias })
    }

    // Precedence: OR < AND < NOT < comparison.
    fn parse_expr(&mut self) -> Result<SqlExpr> {
        let mut left = self.parse_and()?;
        while self.accept(&Token::Or) {
            let right = self.parse_and()?;
            left = SqlExpr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<SqlExpr> {
        let mut left = self.parse_not()?;
        while self.accept(&Token::And) {
            let right = self.parse_not()?;
            left = SqlExpr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<SqlExpr> {
        if self.accept(&Token::Not) {
            let inner = self.parse_not()?;
            return Ok(SqlExpr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<SqlExpr> {
        let left = self.parse_primary()?;
        let op = match self.current() {
            Token::Eq => BinaryOperator::Eq,
            Token::NotEq => BinaryOperator::NotEq,
            Token::Lt => BinaryOperator::Lt,
            Token::Le => BinaryOperator::Le,
            Token::Gt => BinaryOperator::Gt,
            Token::Ge => BinaryOperator::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_primary()?;
        Ok(SqlExpr::BinaryOp { left: Box::new(left), op, right: Box::new(right) })
    }

    fn parse_primary(&mut self) -> Result<SqlExpr> {
        match self.current().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::IntLit(v) => {
                self.advance();
                // Literals that fit 32 bits type as INT32; the planner
                // widens them where a comparison needs it.
                Ok(SqlExpr::Literal(int_literal(v)))
            }
            Token::FloatLit(v) => {
                self.advance();
                Ok(SqlExpr::Literal(Value::Double(v)))
            }
            Token::StringLit(s) => {
                self.advance();
                Ok(SqlExpr::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(SqlExpr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(SqlExpr::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.advance();
                Ok(SqlExpr::Literal(Value::Null))
            }
            Token::Identifier(first) => {
                self.advance();
                if self.accept(&Token::Dot) {
                    let name = self.expect_identifier("a column name after '.'")?;
                    Ok(SqlExpr::Column { table: Some(first), name })
                } else {
                    Ok(SqlExpr::Column { table: None, name: first })
                }
            }
            _ => {
                let (start, _) = self.current_span();
                Err(self.syntax_error(
                    start,
                    format!("expected an expression, got {}", self.describe_current()),
                ))
            }
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect(Token::Create, "CREATE")?;
        self.expect(Token::Table, "TABLE")?;
        let table = self.expect_identifier("a table name")?;
        self.expect(Token::LParen, "'('")?;

        let mut columns = Vec::new();
        loop {
            let name = self.expect_identifier("a column name")?;
            let (start, _) = self.current_span();
            let type_name = self.expect_identifier("a column type")?;
            let data_type = DataType::parse(&type_name.to_ascii_uppercase())
                .ok_or_else(|| {
                    self.syntax_error(start, format!("unknown column type '{}'", type_name))
                })?;
            columns.push(ColumnDef { name, data_type });
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(Statement::CreateTable { table, columns })
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(Token::Insert, "INSERT")?;
        self.expect(Token::Into, "INTO")?;
        let table = self.expect_identifier("a table name")?;

        let mut columns = Vec::new();
        if self.accept(&Token::LParen) {
            loop {
                columns.push(self.expect_identifier("a column name")?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen, "')'")?;
        }

        self.expect(Token::Values, "VALUES")?;
        let mut values = Vec::new();
        loop {
            self.expect(Token::LParen, "'('")?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expr()?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen, "')'")?;
            values.push(row);
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        Ok(Statement::Insert { table, columns, values })
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(Token::Update, "UPDATE")?;
        let table = self.expect_identifier("a table name")?;
        self.expect(Token::Set, "SET")?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("a column name")?;
            self.expect(Token::Eq, "'='")?;
            let value = self.parse_expr()?;
            assignments.push((column, value));
            if !self.accept(&Token::Comma) {
                break;
            }
        }

        let where_clause = if self.accept(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Update { table, assignments, where_clause })
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(Token::Delete, "DELETE")?;
        self.expect(Token::From, "FROM")?;
        let table = self.expect_identifier("a table name")?;
        let where_clause = if self.accept(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Delete { table, where_clause })
    }
}

/// Integer literal typing: INT32 when the value fits, INT64 otherwise.
fn int_literal(v: i64) -> Value {
    if let Ok(v32) = i32::try_from(v) {
        Value::Int32(v32)
    } else {
        Value::Int64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_select(sql: &str) -> SelectStatement {
        match SqlParser::parse(sql).unwrap() {
            Statement::Select(select) => select,
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_select_star() {
        let select = parse_select("SELECT * FROM users");
        assert!(select.select_all);
        assert!(select.columns.is_empty());
        assert_eq!(select.from.len(), 1);
        assert_eq!(select.from[0].name, "users");
        assert!(select.where_clause.is_none());
    }

    #[test]
    fn test_select_columns_and_aliases() {
        let select = parse_select("SELECT id, users.name AS n FROM users u;");
        assert!(!select.select_all);
        assert_eq!(select.columns.len(), 2);
        assert_eq!(select.columns[0].name, "id");
        assert!(select.columns[0].table.is_none());
        assert_eq!(select.columns[1].table.as_deref(), Some("users"));
        assert_eq!(select.columns[1].alias.as_deref(), Some("n"));
        assert_eq!(select.from[0].alias.as_deref(), Some("u"));
    }

    #[test]
    fn test_where_precedence() {
        let select = parse_select("SELECT id FROM t WHERE a = 1 OR b = 2 AND c = 3");
        // OR binds weaker than AND.
        match select.where_clause.unwrap() {
            SqlExpr::BinaryOp { op: BinaryOperator::Or, right, .. } => match *right {
                SqlExpr::BinaryOp { op: BinaryOperator::And, .. } => {}
                other => panic!("expected AND under OR, got {:?}", other),
            },
            other => panic!("expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_not_and_parens() {
        let select = parse_select("SELECT id FROM t WHERE NOT (a = 1 AND b = 2)");
        match select.where_clause.unwrap() {
            SqlExpr::Not(inner) => match *inner {
                SqlExpr::BinaryOp { op: BinaryOperator::And, .. } => {}
                other => panic!("expected AND inside NOT, got {:?}", other),
            },
            other => panic!("expected NOT, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_typing() {
        let select = parse_select("SELECT id FROM t WHERE a = 1");
        match select.where_clause.unwrap() {
            SqlExpr::BinaryOp { right, .. } => {
                assert!(matches!(*right, SqlExpr::Literal(Value::Int32(1))));
            }
            other => panic!("unexpected {:?}", other),
        }

        let select = parse_select("SELECT id FROM t WHERE a = 3000000000");
        match select.where_clause.unwrap() {
            SqlExpr::BinaryOp { right, .. } => {
                assert!(matches!(*right, SqlExpr::Literal(Value::Int64(3000000000))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        let select =
            parse_select("SELECT id FROM t WHERE a = 1.5 AND b = 'x' AND c = TRUE AND d = NULL");
        let mut literals = Vec::new();
        fn collect(expr: &SqlExpr, out: &mut Vec<Value>) {
            match expr {
                SqlExpr::Literal(v) => out.push(v.clone()),
                SqlExpr::BinaryOp { left, right, .. } => {
                    collect(left, out);
                    collect(right, out);
                }
                SqlExpr::Not(inner) => collect(inner, out),
                SqlExpr::Column { .. } => {}
            }
        }
        collect(&select.where_clause.unwrap(), &mut literals);
        assert_eq!(
            literals,
            vec![
                Value::Double(1.5),
                Value::String("x".to_string()),
                Value::Bool(true),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_operators() {
        for (sql, op) in [
            ("a = 1", BinaryOperator::Eq),
            ("a != 1", BinaryOperator::NotEq),
            ("a <> 1", BinaryOperator::NotEq),
            ("a < 1", BinaryOperator::Lt),
            ("a <= 1", BinaryOperator::Le),
            ("a > 1", BinaryOperator::Gt),
            ("a >= 1", BinaryOperator::Ge),
        ] {
            let expr = SqlParser::parse_expression(sql).unwrap();
            match expr {
                SqlExpr::BinaryOp { op: got, .. } => assert_eq!(got, op, "{}", sql),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let select = parse_select("select ID from Users where ID = 1");
        assert_eq!(select.columns[0].name, "ID");
        assert_eq!(select.from[0].name, "Users");
    }

    #[test]
    fn test_line_comments() {
        let select = parse_select("SELECT id -- trailing comment\nFROM t");
        assert_eq!(select.from[0].name, "t");
    }

    #[test]
    fn test_syntax_error_positions() {
        let err = SqlParser::parse("SELECT FROM t").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1:8"), "{}", msg);
        assert!(msg.contains("near:"), "{}", msg);

        let err = SqlParser::parse("SELECT id\nFROM t WHERE").unwrap_err();
        assert!(err.to_string().contains("2:"), "{}", err);
    }

    #[test]
    fn test_unexpected_trailing_tokens() {
        let err = SqlParser::parse("SELECT id FROM t WHERE a = 1 garbage").unwrap_err();
        assert!(err.to_string().contains("after statement"), "{}", err);
    }

    #[test]
    fn test_unterminated_string() {
        let err = SqlParser::parse("SELECT id FROM t WHERE name = 'oops").unwrap_err();
        assert!(err.to_string().contains("unterminated"), "{}", err);
    }

    #[test]
    fn test_print_reparse_fixpoint() {
        // Rendering a parsed statement and parsing it again reaches a
        // fixpoint after one round.
        let sql = "SELECT id, users.name AS n FROM users u WHERE id = 1 AND age > 20";
        let first = SqlParser::parse(sql).unwrap().to_string();
        let second = SqlParser::parse(&first).unwrap().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dml_forms_parse() {
        assert!(matches!(
            SqlParser::parse("CREATE TABLE t (id INT64, name STRING)").unwrap(),
            Statement::CreateTable { .. }
        ));
        assert!(matches!(
            SqlParser::parse("INSERT INTO t (id) VALUES (1), (2)").unwrap(),
            Statement::Insert { .. }
        ));
        assert!(matches!(
            SqlParser::parse("UPDATE t SET id = 2 WHERE id = 1").unwrap(),
            Statement::Update { .. }
        ));
        assert!(matches!(
            SqlParser::parse("DELETE FROM t WHERE id = 1").unwrap(),
            Statement::Delete { .. }
        ));
    }
}
