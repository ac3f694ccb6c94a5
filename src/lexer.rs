use crate::ast::{CompareOp, FieldOp, Token, TokenKind};

/// Lexical errors. Each carries the character offset it was raised at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A quoted phrase with no closing `"`
    UnterminatedQuote { position: usize },
    /// A backslash at the end of a quoted phrase
    UnterminatedEscape { position: usize },
    /// A position where a word was required but none could start
    ExpectedWord { position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { position }
            | LexError::UnterminatedEscape { position }
            | LexError::ExpectedWord { position } => *position,
        }
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnterminatedQuote { position } => {
                write!(f, "Unterminated quote at {}", position)
            }
            LexError::UnterminatedEscape { position } => {
                write!(f, "Unterminated escape in phrase at {}", position)
            }
            LexError::ExpectedWord { position } => write!(f, "Expected a word at {}", position),
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            start,
            end: self.position,
        }
    }

    /// `-` negates only at the start of input, after whitespace, or after
    /// `(`; anywhere else it is an ordinary word character.
    fn at_negation_position(&self) -> bool {
        match self.position.checked_sub(1).and_then(|i| self.input.get(i)) {
            None => true,
            Some(prev) => prev.is_whitespace() || *prev == '(',
        }
    }

    fn is_word_char(ch: char) -> bool {
        !ch.is_whitespace() && !matches!(ch, '(' | ')' | ':' | '"' | '|' | '~' | '>' | '<')
    }

    fn read_word(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_word_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if result.is_empty() {
            return Err(LexError::ExpectedWord { position: start });
        }
        Ok(result)
    }

    /// Consume `>` or `<` with an optional trailing `=`.
    fn read_compare_op(&mut self) -> CompareOp {
        let less = self.current_char() == Some('<');
        self.advance();
        let equal = self.current_char() == Some('=');
        if equal {
            self.advance();
        }
        match (less, equal) {
            (false, false) => CompareOp::Gt,
            (false, true) => CompareOp::Ge,
            (true, false) => CompareOp::Lt,
            (true, true) => CompareOp::Le,
        }
    }

    fn read_phrase(&mut self) -> Result<String, LexError> {
        let opening = self.position;
        self.advance(); // consume opening quote
        let mut result = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    match self.peek_char(1) {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        // any other escaped character passes through literally
                        Some(other) => result.push(other),
                        None => {
                            return Err(LexError::UnterminatedEscape {
                                position: self.position,
                            });
                        }
                    }
                    self.advance();
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedQuote { position: opening })
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        match ch {
            '(' => {
                self.advance();
                Ok(self.token(TokenKind::LParen, start))
            }
            ')' => {
                self.advance();
                Ok(self.token(TokenKind::RParen, start))
            }
            '|' => {
                self.advance();
                Ok(self.token(TokenKind::Or, start))
            }
            '~' => {
                self.advance();
                Ok(self.token(TokenKind::Contains, start))
            }
            '>' | '<' => {
                let op = self.read_compare_op();
                Ok(self.token(TokenKind::Comp(op), start))
            }
            '-' if self.at_negation_position() => {
                self.advance();
                Ok(self.token(TokenKind::Minus, start))
            }
            '"' => {
                let value = self.read_phrase()?;
                Ok(self.token(TokenKind::Phrase(value), start))
            }
            _ => {
                let word = self.read_word()?;

                // A word immediately followed by a field operator folds
                // into a single FIELD token.
                match self.current_char() {
                    Some(':') => {
                        self.advance();
                        return Ok(self.token(
                            TokenKind::Field {
                                key: word,
                                op: FieldOp::Match,
                            },
                            start,
                        ));
                    }
                    Some('~') => {
                        self.advance();
                        return Ok(self.token(
                            TokenKind::Field {
                                key: word,
                                op: FieldOp::Contains,
                            },
                            start,
                        ));
                    }
                    Some('>') | Some('<') => {
                        let op = self.read_compare_op();
                        return Ok(self.token(
                            TokenKind::Field {
                                key: word,
                                op: FieldOp::Compare(op),
                            },
                            start,
                        ));
                    }
                    _ => {}
                }

                let kind = if word.eq_ignore_ascii_case("or") {
                    TokenKind::Or
                } else if word.eq_ignore_ascii_case("and") {
                    TokenKind::And
                } else if word.eq_ignore_ascii_case("not") {
                    TokenKind::Not
                } else {
                    TokenKind::Word(word)
                };
                Ok(self.token(kind, start))
            }
        }
    }
}

/// Materialize the whole token list, EOF included. The parser consumes
/// tokens one at a time; this form exists for inspection and testing.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[test]
fn test_field_folding() {
    let tokens = tokenize("level:error").unwrap();
    assert_eq!(
        tokens[0].kind,
        TokenKind::Field {
            key: "level".to_string(),
            op: FieldOp::Match,
        }
    );
    assert_eq!(tokens[1].kind, TokenKind::Word("error".to_string()));
    assert_eq!(tokens[2].kind, TokenKind::Eof);
}

#[test]
fn test_minus_context() {
    // negation position
    let tokens = tokenize("-a").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Minus);

    // mid-word, it is just a word character
    let tokens = tokenize("a-b").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Word("a-b".to_string()));
}
