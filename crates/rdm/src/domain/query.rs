//! Row filter expressions
//!
//! A small language for selecting rows of a data set:
//!
//! ```text
//! expr    := and_expr ("or" and_expr)*
//! and_expr:= primary ("and" primary)*
//! primary := "(" expr ")" | operand cmp operand
//! operand := column | number
//! cmp     := "<" | "<=" | ">" | ">=" | "==" | "!="
//! ```
//!
//! Examples: `NPV_invest > 0`, `NPV_invest > NPV_wait and yCLAIM <= 2032`.

use super::dataset::Record;
use crate::error::{RdmError, Result};
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// Column reference or literal
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Number(f64),
}

impl Operand {
    fn resolve(&self, record: &Record) -> Result<f64> {
        match self {
            Self::Number(v) => Ok(*v),
            Self::Column(name) => record
                .get(name)
                .copied()
                .ok_or_else(|| RdmError::UnknownColumn(name.clone())),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Number(v) => write!(f, "{v}"),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Compare { lhs: Operand, op: CmpOp, rhs: Operand },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

impl Query {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: input.len(),
        };
        let query = parser.expr()?;
        if let Some((pos, token)) = parser.tokens.get(parser.pos) {
            return Err(RdmError::Query {
                position: *pos,
                message: format!("unexpected {token:?}"),
            });
        }
        Ok(query)
    }

    /// Evaluate against one row; unknown columns are errors
    pub fn matches(&self, record: &Record) -> Result<bool> {
        match self {
            Self::Compare { lhs, op, rhs } => Ok(op.apply(lhs.resolve(record)?, rhs.resolve(record)?)),
            Self::And(a, b) => Ok(a.matches(record)? && b.matches(record)?),
            Self::Or(a, b) => Ok(a.matches(record)? || b.matches(record)?),
        }
    }

    /// Column names referenced by the expression
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                for operand in [lhs, rhs] {
                    if let Operand::Column(name) = operand {
                        if !out.contains(&name.as_str()) {
                            out.push(name);
                        }
                    }
                }
            }
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { lhs, op, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Self::And(a, b) => write!(f, "({a} and {b})"),
            Self::Or(a, b) => write!(f, "({a} or {b})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Cmp(CmpOp),
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let token = match c {
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '<' | '>' | '=' | '!' => {
                let next_eq = bytes.get(i + 1) == Some(&b'=');
                let op = match (c, next_eq) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    ('>', true) => CmpOp::Ge,
                    ('>', false) => CmpOp::Gt,
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    _ => {
                        return Err(RdmError::Query {
                            position: start,
                            message: format!("expected comparison after '{c}'"),
                        });
                    }
                };
                i += if next_eq { 2 } else { 1 };
                Token::Cmp(op)
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => {
                i += 1;
                while i < bytes.len() {
                    let d = bytes[i] as char;
                    let exponent_sign =
                        (d == '-' || d == '+') && matches!(bytes[i - 1], b'e' | b'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &input[start..i];
                let value = text.parse::<f64>().map_err(|_| RdmError::Query {
                    position: start,
                    message: format!("invalid number '{text}'"),
                })?;
                Token::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                match &input[start..i] {
                    "and" => Token::And,
                    "or" => Token::Or,
                    ident => Token::Ident(ident.to_string()),
                }
            }
            _ => {
                return Err(RdmError::Query {
                    position: start,
                    message: format!("unexpected character '{c}'"),
                });
            }
        };
        tokens.push((start, token));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(RdmError::Query {
            position: self.position(),
            message: message.into(),
        })
    }

    fn expr(&mut self) -> Result<Query> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Query::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Query> {
        let mut lhs = self.primary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.primary()?;
            lhs = Query::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Query> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr()?;
            if self.peek() != Some(&Token::RParen) {
                return self.error("expected ')'");
            }
            self.pos += 1;
            return Ok(inner);
        }

        let lhs = self.operand()?;
        let op = match self.peek() {
            Some(Token::Cmp(op)) => *op,
            _ => return self.error("expected comparison operator"),
        };
        self.pos += 1;
        let rhs = self.operand()?;
        Ok(Query::Compare { lhs, op, rhs })
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.peek() {
            Some(Token::Ident(_)) | Some(Token::Number(_)) => {}
            _ => return self.error("expected column name or number"),
        }
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Column(name)),
            Some(Token::Number(v)) => Ok(Operand::Number(v)),
            _ => self.error("expected column name or number"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_simple_comparison() {
        let q = Query::parse("NPV_invest>0").unwrap();
        assert!(q.matches(&record(&[("NPV_invest", 5.0)])).unwrap());
        assert!(!q.matches(&record(&[("NPV_invest", -5.0)])).unwrap());
    }

    #[test]
    fn test_column_to_column() {
        let q = Query::parse("NPV_invest > NPV_wait").unwrap();
        let r = record(&[("NPV_invest", 2.0), ("NPV_wait", 1.0)]);
        assert!(q.matches(&r).unwrap());
        assert_eq!(q.columns(), vec!["NPV_invest", "NPV_wait"]);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = Query::parse("a > 0 or b > 0 and c > 0").unwrap();
        // a > 0 or (b > 0 and c > 0)
        assert!(q.matches(&record(&[("a", 1.0), ("b", -1.0), ("c", -1.0)])).unwrap());
        assert!(!q.matches(&record(&[("a", -1.0), ("b", 1.0), ("c", -1.0)])).unwrap());

        let q = Query::parse("(a > 0 or b > 0) and c > 0").unwrap();
        assert!(!q.matches(&record(&[("a", 1.0), ("b", -1.0), ("c", -1.0)])).unwrap());
    }

    #[test]
    fn test_numbers() {
        let q = Query::parse("x >= -1.5e2").unwrap();
        assert!(q.matches(&record(&[("x", -150.0)])).unwrap());
        let q = Query::parse("Regret == 0").unwrap();
        assert!(q.matches(&record(&[("Regret", 0.0)])).unwrap());
        let q = Query::parse("yCLAIM != 2032.5").unwrap();
        assert!(q.matches(&record(&[("yCLAIM", 2030.0)])).unwrap());
    }

    #[test]
    fn test_unknown_column() {
        let q = Query::parse("missing < 1").unwrap();
        assert!(matches!(
            q.matches(&record(&[("x", 0.0)])),
            Err(RdmError::UnknownColumn(ref c)) if c == "missing"
        ));
    }

    #[test]
    fn test_parse_errors_report_position() {
        match Query::parse("a > ") {
            Err(RdmError::Query { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected query error, got {other:?}"),
        }
        assert!(Query::parse("a = 1").is_err());
        assert!(Query::parse("a > 1 b").is_err());
        assert!(Query::parse("(a > 1").is_err());
        assert!(Query::parse("a # 1").is_err());
    }

    #[test]
    fn test_display() {
        let q = Query::parse("a>1 and b<=c").unwrap();
        assert_eq!(q.to_string(), "(a > 1 and b <= c)");
    }
}
