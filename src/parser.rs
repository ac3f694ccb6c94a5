use std::mem;

use crate::{
    ast::{FieldOp, Node, TextKind, TextTerm, Token, TokenKind},
    lexer::{LexError, Lexer},
};

/// Syntax errors. Each carries the character offset of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),
    /// A position where a term was required (dangling operator, stray token)
    ExpectedTerm { position: usize },
    /// A field operator with no word or phrase after it
    ExpectedValue { position: usize },
    /// An unbalanced `(`
    ExpectedCloseParen { position: usize },
    /// Leftover tokens after a complete expression
    TrailingInput { position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.position(),
            ParseError::ExpectedTerm { position }
            | ParseError::ExpectedValue { position }
            | ParseError::ExpectedCloseParen { position }
            | ParseError::TrailingInput { position } => *position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::ExpectedTerm { position } => write!(f, "Expected a term at {}", position),
            ParseError::ExpectedValue { position } => {
                write!(f, "Expected a field value at {}", position)
            }
            ParseError::ExpectedCloseParen { position } => {
                write!(f, "Expected ')' at {}", position)
            }
            ParseError::TrailingInput { position } => {
                write!(f, "Unexpected extra input at {}", position)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

// Binding powers, loosest to tightest. Implicit conjunction by
// juxtaposition sits on the same tier as the explicit AND keyword.
const BP_OR: u8 = 1;
const BP_AND: u8 = 2;
const BP_NOT: u8 = 3;

pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Take the current token, pulling the next one into its place.
    fn take(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current, next))
    }

    fn expect_close_paren(&mut self) -> Result<(), ParseError> {
        if !matches!(self.current.kind, TokenKind::RParen) {
            return Err(ParseError::ExpectedCloseParen {
                position: self.current.start,
            });
        }
        self.advance()
    }

    /// Parse the whole input. Empty input is the empty query; anything left
    /// over after a complete expression is an error.
    pub fn parse(&mut self) -> Result<Node, ParseError> {
        if matches!(self.current.kind, TokenKind::Eof) {
            return Ok(Node::Empty);
        }
        let node = self.parse_expression(0)?;
        if !matches!(self.current.kind, TokenKind::Eof) {
            return Err(ParseError::TrailingInput {
                position: self.current.start,
            });
        }
        Ok(node)
    }

    /// Precedence climbing: keep extending `left` while the next operator
    /// binds at least as tightly as `min_bp`. A token that can start an
    /// expression acts as an implicit AND.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        let mut left = self.parse_primary()?;

        loop {
            let (explicit, disjunction, bp) = match &self.current.kind {
                TokenKind::Or => (true, true, BP_OR),
                TokenKind::And => (true, false, BP_AND),
                kind if starts_expression(kind) => (false, false, BP_AND),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            if explicit {
                self.advance()?;
            }

            let right = self.parse_expression(bp + 1)?;
            left = if disjunction {
                Node::or(vec![left, right])
            } else {
                Node::and(vec![left, right])
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.take()?;
        match token.kind {
            TokenKind::Word(value) => {
                // `latency > 100` — a detached operator right after a word
                // still reads as a field test
                let follow = match self.current.kind {
                    TokenKind::Comp(op) => Some(FieldOp::Compare(op)),
                    TokenKind::Contains => Some(FieldOp::Contains),
                    _ => None,
                };
                if let Some(op) = follow {
                    self.advance()?;
                    let term = self.parse_value_term()?;
                    return Ok(Node::Filter {
                        key: value,
                        op,
                        value: term,
                    });
                }
                Ok(Node::Text(TextTerm {
                    value,
                    kind: TextKind::Word,
                }))
            }
            TokenKind::Phrase(value) => Ok(Node::Text(TextTerm {
                value,
                kind: TextKind::Phrase,
            })),
            TokenKind::Minus | TokenKind::Not => {
                let term = self.parse_expression(BP_NOT)?;
                Ok(Node::Not(Box::new(term)))
            }
            TokenKind::LParen => {
                let expr = self.parse_expression(0)?;
                self.expect_close_paren()?;
                Ok(expr)
            }
            TokenKind::Field { key, op } => {
                // `key:(...)` and `key~(...)` scope the field across the
                // whole parenthesized sub-expression
                if matches!(op, FieldOp::Match | FieldOp::Contains)
                    && matches!(self.current.kind, TokenKind::LParen)
                {
                    self.advance()?;
                    let expr = self.parse_expression(0)?;
                    self.expect_close_paren()?;
                    return Ok(scope_field(&key, expr, op));
                }
                let value = self.parse_value_term()?;
                Ok(Node::Filter { key, op, value })
            }
            _ => Err(ParseError::ExpectedTerm {
                position: token.start,
            }),
        }
    }

    fn parse_value_term(&mut self) -> Result<TextTerm, ParseError> {
        match self.current.kind {
            TokenKind::Word(_) | TokenKind::Phrase(_) => {
                let token = self.take()?;
                match token.kind {
                    TokenKind::Word(value) => Ok(TextTerm {
                        value,
                        kind: TextKind::Word,
                    }),
                    TokenKind::Phrase(value) => Ok(TextTerm {
                        value,
                        kind: TextKind::Phrase,
                    }),
                    _ => unreachable!(),
                }
            }
            _ => Err(ParseError::ExpectedValue {
                position: self.current.start,
            }),
        }
    }
}

/// Tokens that can begin an expression; seeing one where a binary operator
/// could stand means implicit conjunction.
fn starts_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LParen
            | TokenKind::Word(_)
            | TokenKind::Phrase(_)
            | TokenKind::Not
            | TokenKind::Minus
            | TokenKind::Field { .. }
    )
}

/// Distribute a field key and operator across every leaf text term of a
/// scoped group, so `sys:(a OR b)` reads as `sys:a OR sys:b`.
fn scope_field(key: &str, node: Node, op: FieldOp) -> Node {
    match node {
        Node::Text(term) => Node::Filter {
            key: key.to_string(),
            op,
            value: term,
        },
        Node::And(terms) => Node::and(
            terms
                .into_iter()
                .map(|term| scope_field(key, term, op))
                .collect(),
        ),
        Node::Or(terms) => Node::or(
            terms
                .into_iter()
                .map(|term| scope_field(key, term, op))
                .collect(),
        ),
        Node::Not(term) => Node::Not(Box::new(scope_field(key, *term, op))),
        other => other,
    }
}

/// Tokenize and parse a query string in one step.
pub fn parse_query(input: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    parser.parse()
}
