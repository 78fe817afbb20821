//! Boolean selection expressions over event columns
//!
//! Cut expressions are plain text decided at configuration time. They are
//! compiled once into a small tree of comparison and logical nodes, whose
//! variables are bound by exact name to event columns or to scalar constants,
//! and then evaluated for every event.
//!
//! Supported syntax: numeric literals, identifiers, comparisons
//! (`<`, `<=`, `>`, `>=`, `==`, `!=`), chained range checks (`lo < x < hi`),
//! `&&` / `and` / `&`, `||` / `or` / `|`, `!` / `not`, `true`, `false` and
//! parentheses.

use crate::{dataset::EventColumns, numeric::Float};

use thiserror::Error;

/// Reason why an expression could not be compiled
#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    /// The text is not a valid expression
    #[error("{0}")]
    Syntax(String),

    /// An identifier is bound to nothing
    #[error("unknown variable {0}")]
    Unknown(String),
}

type CompileResult<T> = std::result::Result<T, CompileError>;

/// What an identifier of an expression stands for
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Binding {
    /// Position of an event column
    Column(usize),

    /// Constant value (e.g. a cut bound)
    Scalar(Float),
}

// ── Compiled tree ──────────────────────────────────────────────

/// Value compared by a predicate
#[derive(Clone, Copy, Debug, PartialEq)]
enum Operand {
    Const(Float),
    Column(usize),
}

/// Comparison operator
#[derive(Clone, Copy, Debug, PartialEq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}
//
impl CmpOp {
    fn apply(self, lhs: Float, rhs: Float) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    /// Whether the operator bounds its left-hand side from above
    fn is_ascending(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le)
    }

    fn is_descending(self) -> bool {
        matches!(self, CmpOp::Gt | CmpOp::Ge)
    }

    /// Same comparison with swapped operands
    fn flip(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            other => other,
        }
    }
}

/// Node of a compiled expression
#[derive(Clone, Debug, PartialEq)]
enum Predicate {
    Const(bool),
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    /// `low low_op value high_op high`, with ascending operators
    Range {
        low: Operand,
        low_op: CmpOp,
        value: Operand,
        high_op: CmpOp,
        high: Operand,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// A compiled boolean expression, ready for evaluation
#[derive(Clone, Debug)]
pub struct CompiledExpr {
    tree: Predicate,

    /// Event columns read by the expression, ordered by first occurrence
    columns: Vec<usize>,
}
//
impl CompiledExpr {
    /// Parse an expression and bind its identifiers
    ///
    /// `bind` is queried once per distinct identifier, with the identifier's
    /// exact spelling.
    ///
    pub fn compile(
        input: &str,
        mut bind: impl FnMut(&str) -> Option<Binding>,
    ) -> CompileResult<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            bind: &mut bind,
            columns: Vec::new(),
        };
        let tree = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(CompileError::Syntax(format!(
                "unexpected {token:?} after the end of the expression"
            )));
        }
        let columns = parser.columns;
        Ok(Self { tree, columns })
    }

    /// Decide whether an event passes this expression
    ///
    /// An event for which any referenced column is NaN never passes, whatever
    /// the shape of the expression.
    ///
    pub fn eval(&self, columns: &EventColumns, event: usize) -> bool {
        let has_nan = self
            .columns
            .iter()
            .any(|&col| columns.column_at(col)[event].is_nan());
        !has_nan && eval_predicate(&self.tree, columns, event)
    }

    /// Evaluate the expression for every event of a column set
    pub fn mask(&self, columns: &EventColumns) -> Vec<bool> {
        (0..columns.num_events())
            .map(|event| self.eval(columns, event))
            .collect()
    }
}

// ── Evaluation ─────────────────────────────────────────────────

fn eval_operand(operand: Operand, columns: &EventColumns, event: usize) -> Float {
    match operand {
        Operand::Const(value) => value,
        Operand::Column(col) => columns.column_at(col)[event],
    }
}

fn eval_predicate(pred: &Predicate, columns: &EventColumns, event: usize) -> bool {
    let value = |operand| eval_operand(operand, columns, event);
    match pred {
        Predicate::Const(b) => *b,
        Predicate::Compare { lhs, op, rhs } => op.apply(value(*lhs), value(*rhs)),
        Predicate::Range {
            low,
            low_op,
            value: x,
            high_op,
            high,
        } => {
            let x = value(*x);
            low_op.apply(value(*low), x) && high_op.apply(x, value(*high))
        }
        Predicate::And(preds) => preds.iter().all(|p| eval_predicate(p, columns, event)),
        Predicate::Or(preds) => preds.iter().any(|p| eval_predicate(p, columns, event)),
        Predicate::Not(pred) => !eval_predicate(pred, columns, event),
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(Float),
    Ident(String),
    Minus,
    LParen,
    RParen,
    Cmp(CmpOp),
    And,
    Or,
    Not,
    True,
    False,
}

fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators
        if let Some(&next) = chars.get(i + 1) {
            let tok = match (c, next) {
                ('&', '&') => Some(Token::And),
                ('|', '|') => Some(Token::Or),
                ('=', '=') => Some(Token::Cmp(CmpOp::Eq)),
                ('!', '=') => Some(Token::Cmp(CmpOp::Ne)),
                ('<', '=') => Some(Token::Cmp(CmpOp::Le)),
                ('>', '=') => Some(Token::Cmp(CmpOp::Ge)),
                _ => None,
            };
            if let Some(t) = tok {
                tokens.push(t);
                i += 2;
                continue;
            }
        }

        let single = match c {
            '&' => Some(Token::And),
            '|' => Some(Token::Or),
            '!' => Some(Token::Not),
            '<' => Some(Token::Cmp(CmpOp::Lt)),
            '>' => Some(Token::Cmp(CmpOp::Gt)),
            '-' => Some(Token::Minus),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(t) = single {
            tokens.push(t);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || chars[i] == '.'
                    || chars[i] == 'e'
                    || chars[i] == 'E'
                    || ((chars[i] == '+' || chars[i] == '-')
                        && i > start
                        && (chars[i - 1] == 'e' || chars[i - 1] == 'E')))
            {
                i += 1;
            }
            let s: String = chars[start..i].iter().collect();
            let n = s
                .parse::<Float>()
                .map_err(|_| CompileError::Syntax(format!("invalid number `{s}`")))?;
            tokens.push(Token::Num(n));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "true" => Token::True,
                "false" => Token::False,
                _ => Token::Ident(word),
            });
        } else {
            return Err(CompileError::Syntax(format!("unexpected character `{c}`")));
        }
    }

    Ok(tokens)
}

// ── Parser (recursive descent) ─────────────────────────────────

struct Parser<'a, B: FnMut(&str) -> Option<Binding>> {
    tokens: &'a [Token],
    pos: usize,
    bind: &'a mut B,
    columns: Vec<usize>,
}

impl<'a, B: FnMut(&str) -> Option<Binding>> Parser<'a, B> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> CompileResult<Predicate> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::Or(terms)
        })
    }

    fn parse_and(&mut self) -> CompileResult<Predicate> {
        let mut terms = vec![self.parse_unary()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::And(terms)
        })
    }

    fn parse_unary(&mut self) -> CompileResult<Predicate> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                Ok(Predicate::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(CompileError::Syntax(format!("expected `)`, got {other:?}"))),
                }
            }
            Some(Token::True) => {
                self.advance();
                Ok(Predicate::Const(true))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Predicate::Const(false))
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> CompileResult<Predicate> {
        let lhs = self.parse_operand()?;
        let op = self.parse_cmp_op()?;
        let rhs = self.parse_operand()?;

        // Chained comparisons are range checks on the middle operand
        let Some(Token::Cmp(_)) = self.peek() else {
            return Ok(Predicate::Compare { lhs, op, rhs });
        };
        let op2 = self.parse_cmp_op()?;
        let third = self.parse_operand()?;
        if op.is_ascending() && op2.is_ascending() {
            Ok(Predicate::Range {
                low: lhs,
                low_op: op,
                value: rhs,
                high_op: op2,
                high: third,
            })
        } else if op.is_descending() && op2.is_descending() {
            Ok(Predicate::Range {
                low: third,
                low_op: op2.flip(),
                value: rhs,
                high_op: op.flip(),
                high: lhs,
            })
        } else {
            Err(CompileError::Syntax(
                "chained comparisons must all go in the same direction".to_owned(),
            ))
        }
    }

    fn parse_cmp_op(&mut self) -> CompileResult<CmpOp> {
        match self.advance() {
            Some(Token::Cmp(op)) => Ok(*op),
            other => Err(CompileError::Syntax(format!(
                "expected a comparison operator, got {other:?}"
            ))),
        }
    }

    fn parse_operand(&mut self) -> CompileResult<Operand> {
        match self.advance().cloned() {
            Some(Token::Num(n)) => Ok(Operand::Const(n)),
            Some(Token::Minus) => match self.advance() {
                Some(Token::Num(n)) => Ok(Operand::Const(-*n)),
                other => Err(CompileError::Syntax(format!(
                    "only numbers can be negated, got {other:?}"
                ))),
            },
            Some(Token::Ident(name)) => match (self.bind)(&name) {
                Some(Binding::Scalar(value)) => Ok(Operand::Const(value)),
                Some(Binding::Column(col)) => {
                    if !self.columns.contains(&col) {
                        self.columns.push(col);
                    }
                    Ok(Operand::Column(col))
                }
                None => Err(CompileError::Unknown(name)),
            },
            other => Err(CompileError::Syntax(format!(
                "expected a number or a variable, got {other:?}"
            ))),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
