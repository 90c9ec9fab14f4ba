//! Tokenizer and recursive-descent parser for script expressions.

use crate::config::{MAX_SCRIPT_DEPTH, MAX_SCRIPT_TOKENS};
use crate::error::ScriptError;

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

/// Longest operators first so `===` wins over `==` and `=`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{", "}", ",", ":",
    ";", ".", "+", "-", "*", "/", "%", "!", "=", "<", ">",
];

pub fn tokenize(src: &str) -> Result<Vec<Tok>, ScriptError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                i += 1;
                if i < chars.len() && matches!(chars[i], '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ScriptError::InvalidNumber(text.clone()))?;
            tokens.push(Tok::Num(value));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut value = String::new();
            i += 1;
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(ScriptError::UnterminatedString);
                };
                i += 1;
                if ch == quote {
                    break;
                }
                if ch == '\\' {
                    let Some(&esc) = chars.get(i) else {
                        return Err(ScriptError::UnterminatedString);
                    };
                    i += 1;
                    value.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                } else {
                    value.push(ch);
                }
            }
            tokens.push(Tok::Str(value));
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            tokens.push(Tok::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let op = *OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or(ScriptError::UnexpectedChar(c))?;
            i += op.chars().count();
            tokens.push(Tok::Op(op));
        }
    }

    Ok(tokens)
}

// =============================================================================
// Syntax Tree
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    /// Call of a named builtin (`print`, `console.log`, `Math.max`)
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(String, Expr),
    Assign(String, Expr),
    Expr(Expr),
}

// =============================================================================
// Parser
// =============================================================================

pub struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
    /// Current bracket/unary nesting, capped at `MAX_SCRIPT_DEPTH`
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Tok>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn check_length(&self) -> Result<(), ScriptError> {
        if self.tokens.len() > MAX_SCRIPT_TOKENS {
            return Err(ScriptError::TooLong);
        }
        Ok(())
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if self.depth >= MAX_SCRIPT_DEPTH {
            return Err(ScriptError::TooDeep);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse `stmt (; stmt)* ;?`.
    pub fn parse_program(mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.check_length()?;
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            if self.eat_op(";") {
                continue;
            }
            stmts.push(self.statement()?);
            if self.peek().is_some() && !self.eat_op(";") {
                return Err(self.unexpected());
            }
        }
        Ok(stmts)
    }

    /// Parse exactly one expression and nothing else.
    pub fn parse_expression(mut self) -> Result<Expr, ScriptError> {
        self.check_length()?;
        let expr = self.expression()?;
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        if let Some(Tok::Ident(kw)) = self.peek()
            && matches!(kw.as_str(), "let" | "const" | "var")
        {
            self.pos += 1;
            let name = self.ident()?;
            self.expect_op("=")?;
            return Ok(Stmt::Let(name, self.expression()?));
        }

        if let (Some(Tok::Ident(name)), Some(Tok::Op("="))) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            let name = name.clone();
            self.pos += 2;
            return Ok(Stmt::Assign(name, self.expression()?));
        }

        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::or)
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and()?;
        while self.eat_op("||") {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        while self.eat_op("&&") {
            left = Expr::And(Box::new(left), Box::new(self.equality()?));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op("==" | "===")) => BinOp::Eq,
                Some(Tok::Op("!=" | "!==")) => BinOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.comparison()?));
        }
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op("<")) => BinOp::Lt,
                Some(Tok::Op("<=")) => BinOp::Le,
                Some(Tok::Op(">")) => BinOp::Gt,
                Some(Tok::Op(">=")) => BinOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.additive()?));
        }
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op("+")) => BinOp::Add,
                Some(Tok::Op("-")) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.term()?));
        }
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op("*")) => BinOp::Mul,
                Some(Tok::Op("/")) => BinOp::Div,
                Some(Tok::Op("%")) => BinOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Some(Tok::Op("-")) => UnOp::Neg,
            Some(Tok::Op("+")) => UnOp::Plus,
            Some(Tok::Op("!")) => UnOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.nested(Self::unary)?)))
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_op(".") {
                let name = self.ident()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat_op("[") {
                let index = self.expression()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat_op("(") {
                let callee = match &expr {
                    Expr::Ident(name) => name.clone(),
                    Expr::Member(base, prop) => match base.as_ref() {
                        Expr::Ident(obj) => format!("{}.{}", obj, prop),
                        _ => return Err(ScriptError::NotAFunction(prop.clone())),
                    },
                    _ => return Err(ScriptError::NotAFunction("expression".to_string())),
                };
                let args = self.list(")")?;
                expr = Expr::Call(callee, args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let tok = self.next().ok_or(ScriptError::UnexpectedEnd)?;
        match tok {
            Tok::Num(n) => Ok(Expr::Num(n)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                "undefined" => Expr::Undefined,
                "NaN" => Expr::Num(f64::NAN),
                "Infinity" => Expr::Num(f64::INFINITY),
                _ => Expr::Ident(name),
            }),
            Tok::Op("(") => {
                let expr = self.expression()?;
                self.expect_op(")")?;
                Ok(expr)
            }
            Tok::Op("[") => Ok(Expr::Array(self.list("]")?)),
            Tok::Op("{") => self.object(),
            other => Err(ScriptError::UnexpectedToken(describe(&other))),
        }
    }

    /// Comma-separated expressions up to `close` (already past the opener).
    fn list(&mut self, close: &'static str) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        if self.eat_op(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat_op(close) {
                return Ok(items);
            }
            self.expect_op(",")?;
            // Trailing comma
            if self.eat_op(close) {
                return Ok(items);
            }
        }
    }

    fn object(&mut self) -> Result<Expr, ScriptError> {
        let mut fields = Vec::new();
        if self.eat_op("}") {
            return Ok(Expr::Object(fields));
        }
        loop {
            let key = match self.next().ok_or(ScriptError::UnexpectedEnd)? {
                Tok::Ident(k) | Tok::Str(k) => k,
                Tok::Num(n) => crate::utils::format::format_number(n),
                other => return Err(ScriptError::UnexpectedToken(describe(&other))),
            };
            self.expect_op(":")?;
            fields.push((key, self.expression()?));
            if self.eat_op("}") {
                return Ok(Expr::Object(fields));
            }
            self.expect_op(",")?;
            if self.eat_op("}") {
                return Ok(Expr::Object(fields));
            }
        }
    }

    // =========================================================================
    // Token Helpers
    // =========================================================================

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ScriptError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn ident(&mut self) -> Result<String, ScriptError> {
        match self.next() {
            Some(Tok::Ident(name)) => Ok(name),
            Some(other) => Err(ScriptError::UnexpectedToken(describe(&other))),
            None => Err(ScriptError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> ScriptError {
        match self.peek() {
            Some(tok) => ScriptError::UnexpectedToken(describe(tok)),
            None => ScriptError::UnexpectedEnd,
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Num(n) => crate::utils::format::format_number(*n),
        Tok::Str(s) => format!("\"{}\"", s),
        Tok::Ident(s) => s.clone(),
        Tok::Op(op) => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        Parser::new(tokenize(src).unwrap()).parse_expression().unwrap()
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            tokenize("a === 1.5e2").unwrap(),
            vec![
                Tok::Ident("a".into()),
                Tok::Op("==="),
                Tok::Num(150.0)
            ]
        );
        assert_eq!(tokenize(".5").unwrap(), vec![Tok::Num(0.5)]);
    }

    #[test]
    fn test_tokenize_errors() {
        assert_eq!(tokenize("'open"), Err(ScriptError::UnterminatedString));
        assert_eq!(tokenize("1.2.3"), Err(ScriptError::InvalidNumber("1.2.3".into())));
        assert_eq!(tokenize("a # b"), Err(ScriptError::UnexpectedChar('#')));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Num(1.0)),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Num(2.0)),
                    Box::new(Expr::Num(3.0))
                ))
            )
        );
    }

    #[test]
    fn test_member_call() {
        assert_eq!(
            expr("console.log(1)"),
            Expr::Call("console.log".into(), vec![Expr::Num(1.0)])
        );
    }

    #[test]
    fn test_statements() {
        let stmts = Parser::new(tokenize("let x = 2; x = x + 1; x").unwrap())
            .parse_program()
            .unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Stmt::Let(ref n, _) if n == "x"));
        assert!(matches!(stmts[1], Stmt::Assign(ref n, _) if n == "x"));
    }

    #[test]
    fn test_incomplete_input() {
        let result = Parser::new(tokenize("2 +").unwrap()).parse_expression();
        assert_eq!(result, Err(ScriptError::UnexpectedEnd));
        let result = Parser::new(tokenize("(1").unwrap()).parse_expression();
        assert_eq!(result, Err(ScriptError::UnexpectedEnd));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_SCRIPT_DEPTH - 1), ")".repeat(MAX_SCRIPT_DEPTH - 1));
        assert!(Parser::new(tokenize(&ok).unwrap()).parse_expression().is_ok());

        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        let result = Parser::new(tokenize(&deep).unwrap()).parse_expression();
        assert_eq!(result, Err(ScriptError::TooDeep));

        let negations = format!("{}1", "-".repeat(100));
        let result = Parser::new(tokenize(&negations).unwrap()).parse_program();
        assert_eq!(result, Err(ScriptError::TooDeep));
    }

    #[test]
    fn test_length_limit() {
        let chain = vec!["1"; MAX_SCRIPT_TOKENS].join("+");
        let result = Parser::new(tokenize(&chain).unwrap()).parse_expression();
        assert_eq!(result, Err(ScriptError::TooLong));
    }
}
