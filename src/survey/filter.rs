//! Record filter expressions
//!
//! A filter decides which survey output records are kept while reading. It is
//! parsed once from a small boolean grammar over the record fields
//! `f` (file index), `m` (measure), `s` (survey), `g` (group), `c` (cohort)
//! and `gt` (genotype):
//!
//! ```text
//! m!=0
//! m in [11,12,13]
//! s > 73 and m != 0
//! not (g == 1 or gt in [2, 3])
//! True
//! ```
//!
//! Comparisons take integer operands only. `and`/`&&`, `or`/`||` and
//! `not`/`!` combine them; `x not in [...]` negates membership.

use super::error::{PlotError, Result};
use super::reader::Record;
use std::fmt;

/// Filter applied when none is given on the command line
pub const DEFAULT_FILTER: &str = "m!=0";

/// Record field available to filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    File,
    Measure,
    Survey,
    Group,
    Cohort,
    Genotype,
}

impl Var {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "f" => Some(Var::File),
            "m" => Some(Var::Measure),
            "s" => Some(Var::Survey),
            "g" => Some(Var::Group),
            "c" => Some(Var::Cohort),
            "gt" => Some(Var::Genotype),
            _ => None,
        }
    }

    fn read(self, record: &Record) -> i64 {
        match self {
            Var::File => record.file as i64,
            Var::Measure => i64::from(record.measure),
            Var::Survey => record.survey,
            Var::Group => record.group,
            Var::Cohort => record.cohort,
            Var::Genotype => record.genotype,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Var(Var),
    Int(i64),
}

impl Operand {
    fn eval(self, record: &Record) -> i64 {
        match self {
            Operand::Var(v) => v.read(record),
            Operand::Int(i) => i,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(bool),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    Member {
        operand: Operand,
        set: Vec<i64>,
        negated: bool,
    },
}

impl Node {
    fn eval(&self, record: &Record) -> bool {
        match self {
            Node::Const(b) => *b,
            Node::Not(inner) => !inner.eval(record),
            Node::And(a, b) => a.eval(record) && b.eval(record),
            Node::Or(a, b) => a.eval(record) || b.eval(record),
            Node::Compare { lhs, op, rhs } => op.apply(lhs.eval(record), rhs.eval(record)),
            Node::Member {
                operand,
                set,
                negated,
            } => set.contains(&operand.eval(record)) != *negated,
        }
    }
}

/// Parsed record predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    root: Node,
}

impl Filter {
    /// Parse a filter expression
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        parser.expect_end()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Filter that keeps every record
    pub fn accept_all() -> Self {
        Self {
            source: "True".to_string(),
            root: Node::Const(true),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.root.eval(record)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for Filter {
    fn default() -> Self {
        // DEFAULT_FILTER is a constant known to parse
        Self {
            source: DEFAULT_FILTER.to_string(),
            root: Node::Compare {
                lhs: Operand::Var(Var::Measure),
                op: CmpOp::Ne,
                rhs: Operand::Int(0),
            },
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Int(i64),
    Cmp(CmpOp),
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn filter_error(offset: usize, message: impl Into<String>) -> PlotError {
    PlotError::Filter {
        offset,
        message: message.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];
        let next = bytes.get(pos + 1).copied();

        let kind = match ch {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'=' if next == Some(b'=') => {
                pos += 1;
                TokenKind::Cmp(CmpOp::Eq)
            }
            b'!' if next == Some(b'=') => {
                pos += 1;
                TokenKind::Cmp(CmpOp::Ne)
            }
            b'!' => TokenKind::Bang,
            b'<' if next == Some(b'=') => {
                pos += 1;
                TokenKind::Cmp(CmpOp::Le)
            }
            b'<' => TokenKind::Cmp(CmpOp::Lt),
            b'>' if next == Some(b'=') => {
                pos += 1;
                TokenKind::Cmp(CmpOp::Ge)
            }
            b'>' => TokenKind::Cmp(CmpOp::Gt),
            b'&' if next == Some(b'&') => {
                pos += 1;
                TokenKind::AndAnd
            }
            b'|' if next == Some(b'|') => {
                pos += 1;
                TokenKind::OrOr
            }
            b'-' | b'0'..=b'9' => {
                let mut end = pos + 1;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let text = &source[start..end];
                let value = text
                    .parse::<i64>()
                    .map_err(|_| filter_error(start, format!("invalid integer '{}'", text)))?;
                pos = end;
                tokens.push(Token {
                    kind: TokenKind::Int(value),
                    offset: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = pos + 1;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                pos = end;
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..end].to_string()),
                    offset: start,
                });
                continue;
            }
            _ => {
                let c = source[start..].chars().next().unwrap_or('?');
                return Err(filter_error(start, format!("unexpected character '{}'", c)));
            }
        };
        pos += 1;
        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

/// Recursive-descent parser over the token list
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == word)
    }

    fn expect_end(&self) -> Result<()> {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(filter_error(token.offset, "unexpected trailing input"))
        }
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut node = self.parse_and()?;
        while self.at_keyword("or") || self.peek().kind == TokenKind::OrOr {
            self.advance();
            let rhs = self.parse_and()?;
            node = Node::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node> {
        let mut node = self.parse_not()?;
        while self.at_keyword("and") || self.peek().kind == TokenKind::AndAnd {
            self.advance();
            let rhs = self.parse_not()?;
            node = Node::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<Node> {
        if self.at_keyword("not") || self.peek().kind == TokenKind::Bang {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Node> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                let close = self.advance();
                if close.kind != TokenKind::RParen {
                    return Err(filter_error(close.offset, "expected ')'"));
                }
                Ok(inner)
            }
            TokenKind::Ident(name) if matches!(name.as_str(), "True" | "true") => {
                self.advance();
                Ok(Node::Const(true))
            }
            TokenKind::Ident(name) if matches!(name.as_str(), "False" | "false") => {
                self.advance();
                Ok(Node::Const(false))
            }
            _ => self.parse_compare(),
        }
    }

    fn parse_compare(&mut self) -> Result<Node> {
        let lhs = self.parse_operand()?;
        let token = self.advance();
        match token.kind {
            TokenKind::Cmp(op) => {
                let rhs = self.parse_operand()?;
                Ok(Node::Compare { lhs, op, rhs })
            }
            TokenKind::Ident(ref word) if word == "in" => Ok(Node::Member {
                operand: lhs,
                set: self.parse_list()?,
                negated: false,
            }),
            TokenKind::Ident(ref word) if word == "not" => {
                let kw = self.advance();
                if !matches!(&kw.kind, TokenKind::Ident(w) if w == "in") {
                    return Err(filter_error(kw.offset, "expected 'in' after 'not'"));
                }
                Ok(Node::Member {
                    operand: lhs,
                    set: self.parse_list()?,
                    negated: true,
                })
            }
            _ => Err(filter_error(
                token.offset,
                "expected comparison operator or 'in'",
            )),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(value) => Ok(Operand::Int(value)),
            TokenKind::Ident(ref name) => Var::from_name(name)
                .map(Operand::Var)
                .ok_or_else(|| filter_error(token.offset, format!("unknown variable '{}'", name))),
            _ => Err(filter_error(token.offset, "expected variable or integer")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<i64>> {
        let open = self.advance();
        let close_kind = match open.kind {
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LParen => TokenKind::RParen,
            _ => return Err(filter_error(open.offset, "expected '[' or '('")),
        };

        let mut values = Vec::new();
        if self.peek().kind == close_kind {
            self.advance();
            return Ok(values);
        }
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Int(value) => values.push(value),
                _ => return Err(filter_error(token.offset, "expected integer in list")),
            }
            let sep = self.advance();
            if sep.kind == close_kind {
                return Ok(values);
            }
            if sep.kind != TokenKind::Comma {
                return Err(filter_error(sep.offset, "expected ',' or end of list"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(measure: u32, survey: i64) -> Record {
        Record {
            file: 0,
            measure,
            survey,
            group: 1,
            cohort: 0,
            genotype: 0,
            value: 1.0,
        }
    }

    #[test]
    fn test_default_filter_drops_measure_zero() {
        let filter = Filter::default();
        assert!(!filter.matches(&record(0, 1)));
        assert!(filter.matches(&record(1, 1)));
        assert_eq!(filter, Filter::parse(DEFAULT_FILTER).unwrap());
    }

    #[test]
    fn test_membership() {
        let filter = Filter::parse("m in [11,12,13]").unwrap();
        assert!(filter.matches(&record(12, 1)));
        assert!(!filter.matches(&record(14, 1)));

        let filter = Filter::parse("m not in (11, 12)").unwrap();
        assert!(!filter.matches(&record(11, 1)));
        assert!(filter.matches(&record(14, 1)));

        let filter = Filter::parse("m in []").unwrap();
        assert!(!filter.matches(&record(1, 1)));
    }

    #[test]
    fn test_connectives_and_precedence() {
        let filter = Filter::parse("s > 73 and m!=0").unwrap();
        assert!(filter.matches(&record(1, 74)));
        assert!(!filter.matches(&record(0, 74)));
        assert!(!filter.matches(&record(1, 73)));

        // and binds tighter than or
        let filter = Filter::parse("m == 1 or m == 2 && s == 5").unwrap();
        assert!(filter.matches(&record(1, 0)));
        assert!(!filter.matches(&record(2, 0)));
        assert!(filter.matches(&record(2, 5)));

        let filter = Filter::parse("!(m == 1 || g <= 0)").unwrap();
        assert!(filter.matches(&record(2, 0)));
        assert!(!filter.matches(&record(1, 0)));
    }

    #[test]
    fn test_constants_and_negative_literals() {
        assert!(Filter::parse("True").unwrap().matches(&record(0, 0)));
        assert!(!Filter::parse("false").unwrap().matches(&record(0, 0)));
        assert!(Filter::parse("s >= -1").unwrap().matches(&record(0, 0)));
        assert!(Filter::accept_all().matches(&record(0, 0)));
    }

    #[test]
    fn test_all_variables() {
        let r = Record {
            file: 2,
            measure: 3,
            survey: 4,
            group: 5,
            cohort: 6,
            genotype: 7,
            value: 0.0,
        };
        let filter =
            Filter::parse("f == 2 and m == 3 and s == 4 and g == 5 and c == 6 and gt == 7")
                .unwrap();
        assert!(filter.matches(&r));
    }

    #[test]
    fn test_parse_errors_report_offset() {
        match Filter::parse("m != x") {
            Err(PlotError::Filter { offset, .. }) => assert_eq!(offset, 5),
            other => panic!("expected filter error, got {:?}", other),
        }
        assert!(Filter::parse("m !=").is_err());
        assert!(Filter::parse("m == 1 m").is_err());
        assert!(Filter::parse("(m == 1").is_err());
        assert!(Filter::parse("m in [1,").is_err());
        assert!(Filter::parse("m # 1").is_err());
        assert!(Filter::parse("m not 1").is_err());
        assert!(Filter::parse("__import__('os')").is_err());
    }
}
