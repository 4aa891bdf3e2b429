//! SPDX license expression tree and its recursive descent parser.
//!
//! The parser is strict: informal input (`mit and isc`, `Apache 2.0`) is
//! rejected here and must first go through [`super::spdx::correct`].

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
        }
    }
}

/// A single license reference, e.g. `GPL-2.0+ WITH Classpath-exception-2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRef {
    pub id: String,
    /// Trailing `+`.
    pub or_later: bool,
    pub exception: Option<String>,
}

impl LicenseRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            or_later: false,
            exception: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Leaf(LicenseRef),
    Binary {
        op: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn leaf(id: impl Into<String>) -> Self {
        Expression::Leaf(LicenseRef::new(id))
    }

    /// Depth-first, left-to-right fold over the leaves.
    pub fn fold<'a, T>(&'a self, init: T, f: &mut impl FnMut(T, &'a LicenseRef) -> T) -> T {
        match self {
            Expression::Leaf(license) => f(init, license),
            Expression::Binary { left, right, .. } => {
                let acc = left.fold(init, f);
                right.fold(acc, f)
            }
        }
    }

    /// Every leaf identifier, in expression order. Operators are discarded.
    pub fn license_ids(&self) -> Vec<&str> {
        self.fold(Vec::new(), &mut |mut ids, license| {
            ids.push(license.id.as_str());
            ids
        })
    }

    pub fn contains_and(&self) -> bool {
        match self {
            Expression::Leaf(_) => false,
            Expression::Binary { op, left, right } => {
                *op == Operator::And || left.contains_and() || right.contains_and()
            }
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Leaf(license) => {
                write!(f, "{}", license.id)?;
                if license.or_later {
                    write!(f, "+")?;
                }
                if let Some(exception) = &license.exception {
                    write!(f, " WITH {}", exception)?;
                }
                Ok(())
            }
            Expression::Binary { op, left, right } => {
                for (i, side) in [left, right].into_iter().enumerate() {
                    if i == 1 {
                        write!(f, " {} ", op)?;
                    }
                    let needs_parens = *op == Operator::And
                        && matches!(**side, Expression::Binary { op: Operator::Or, .. });
                    if needs_parens {
                        write!(f, "({})", side)?;
                    } else {
                        write!(f, "{}", side)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty license expression")]
    Empty,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("missing closing parenthesis")]
    UnclosedParen,
    #[error("invalid license identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Tokens produced by [`tokenize`].
#[derive(Debug, PartialEq, Clone)]
enum Token {
    Id(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Id(s) => write!(f, "{}", s),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::With => write!(f, "WITH"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::RParen);
            chars.next();
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                s.push(c);
                chars.next();
            }
            let token = match s.as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "WITH" => Token::With,
                _ => Token::Id(s),
            };
            tokens.push(token);
        }
    }
    tokens
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ':'
}

/// Grammar (AND binds tighter than OR):
/// ```text
/// expr     := or_expr
/// or_expr  := and_expr ( "OR" and_expr )*
/// and_expr := atom ( "AND" atom )*
/// atom     := "(" expr ")" | id [ "+" ] ( "WITH" id )?
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.consume();
            let right = self.parse_and()?;
            left = Expression::Binary {
                op: Operator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_atom()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.consume();
            let right = self.parse_atom()?;
            left = Expression::Binary {
                op: Operator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        match self.consume() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ParseError::UnclosedParen),
                }
            }
            Some(Token::Id(raw)) => {
                let mut license = parse_license_ref(&raw)?;
                if matches!(self.peek(), Some(Token::With)) {
                    self.consume();
                    match self.consume() {
                        Some(Token::Id(exception)) if exception.chars().all(is_id_char) => {
                            license.exception = Some(exception);
                        }
                        Some(other) => return Err(ParseError::UnexpectedToken(other.to_string())),
                        None => return Err(ParseError::UnexpectedEnd),
                    }
                }
                Ok(Expression::Leaf(license))
            }
            Some(other) => Err(ParseError::UnexpectedToken(other.to_string())),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

fn parse_license_ref(raw: &str) -> Result<LicenseRef, ParseError> {
    let (id, or_later) = match raw.strip_suffix('+') {
        Some(base) => (base, true),
        None => (raw, false),
    };
    if id.is_empty() || !id.chars().all(is_id_char) {
        return Err(ParseError::InvalidIdentifier(raw.to_string()));
    }
    Ok(LicenseRef {
        id: id.to_string(),
        or_later,
        exception: None,
    })
}

/// Parse a well-formed SPDX expression.
pub fn parse(expr: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(expr);
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let tree = parser.parse_or()?;
    match parser.consume() {
        None => Ok(tree),
        Some(trailing) => Err(ParseError::UnexpectedToken(trailing.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_identifier() {
        assert_eq!(parse("MIT").unwrap(), Expression::leaf("MIT"));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let tree = parse("MIT OR GPL-3.0 AND BSD-3-Clause").unwrap();
        match tree {
            Expression::Binary { op, left, right } => {
                assert_eq!(op, Operator::Or);
                assert_eq!(*left, Expression::leaf("MIT"));
                assert!(matches!(*right, Expression::Binary { op: Operator::And, .. }));
            }
            _ => panic!("expected binary node"),
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let tree = parse("(MIT OR ISC) AND Apache-2.0").unwrap();
        assert!(matches!(tree, Expression::Binary { op: Operator::And, .. }));
        assert_eq!(tree.license_ids(), vec!["MIT", "ISC", "Apache-2.0"]);
        assert_eq!(tree.to_string(), "(MIT OR ISC) AND Apache-2.0");
    }

    #[test]
    fn test_with_exception_and_plus() {
        let tree = parse("GPL-2.0+ WITH Classpath-exception-2.0").unwrap();
        let Expression::Leaf(license) = tree else {
            panic!("expected leaf");
        };
        assert_eq!(license.id, "GPL-2.0");
        assert!(license.or_later);
        assert_eq!(license.exception.as_deref(), Some("Classpath-exception-2.0"));
    }

    #[test]
    fn test_fold_visits_leaves_left_to_right() {
        let tree = parse("A OR (B AND C) OR D").unwrap();
        let joined = tree.fold(String::new(), &mut |acc, l| acc + &l.id);
        assert_eq!(joined, "ABCD");
        assert!(tree.contains_and());
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("(MIT OR ISC"), Err(ParseError::UnclosedParen));
        assert_eq!(parse("MIT OR"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("MIT ISC"), Err(ParseError::UnexpectedToken("ISC".into())));
        assert!(matches!(parse("MIT/ISC"), Err(ParseError::InvalidIdentifier(_))));
        assert!(parse("mit and isc").is_err());
    }
}
