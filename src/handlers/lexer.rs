use std::iter::Peekable;
use std::str::CharIndices;

/// A Go token, as far as constructor signatures need them.
///
/// Operators are not combined: `:=` arrives as two [`Token::Punct`]s. Only
/// `...` is kept whole because it marks variadic parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    /// String, raw string, rune or number literal, verbatim
    Literal(String),
    Punct(char),
    Ellipsis,
}

impl Token {
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, Token::Ident(s) if s == name)
    }

    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }

    /// Source text of the token.
    pub fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::Literal(s) => s.clone(),
            Token::Punct(c) => c.to_string(),
            Token::Ellipsis => "...".to_string(),
        }
    }
}

/// Tokenizer for Go source that skips comments and whitespace.
///
/// Unterminated literals or comments end the stream instead of failing.
pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Byte offset of the next unread char.
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(i, _)| i)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek().map(|&(_, c)| c) {
                        Some('/') => {
                            for (_, c) in self.chars.by_ref() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.chars.next();
                            self.chars.next();
                            let mut prev = '\0';
                            for (_, c) in self.chars.by_ref() {
                                if prev == '*' && c == '/' {
                                    break;
                                }
                                prev = c;
                            }
                        }
                        _ => return,
                    }
                }
                _ => return,
            }
        }
    }

    /// Consume a quoted literal; `escapes` is false for raw strings.
    fn quoted(&mut self, start: usize, quote: char, escapes: bool) -> Token {
        self.chars.next();
        let mut escaped = false;
        for (_, c) in self.chars.by_ref() {
            if escapes && escaped {
                escaped = false;
            } else if escapes && c == '\\' {
                escaped = true;
            } else if c == quote {
                break;
            }
        }
        let end = self.offset();
        Token::Literal(self.src[start..end].to_string())
    }

    fn take_while(&mut self, start: usize, pred: impl Fn(char) -> bool) -> &'a str {
        while self.peek_char().is_some_and(&pred) {
            self.chars.next();
        }
        let end = self.offset();
        &self.src[start..end]
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_trivia();
        let (start, c) = *self.chars.peek()?;
        let token = match c {
            '"' => self.quoted(start, '"', true),
            '\'' => self.quoted(start, '\'', true),
            '`' => self.quoted(start, '`', false),
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.take_while(start, |c| c.is_alphanumeric() || c == '_');
                Token::Ident(ident.to_string())
            }
            c if c.is_ascii_digit() => {
                let number =
                    self.take_while(start, |c| c.is_alphanumeric() || c == '.' || c == '_');
                Token::Literal(number.to_string())
            }
            '.' if self.src[start..].starts_with("...") => {
                self.chars.next();
                self.chars.next();
                self.chars.next();
                Token::Ellipsis
            }
            other => {
                self.chars.next();
                Token::Punct(other)
            }
        };
        Some(token)
    }
}

/// Tokenize a whole source file.
pub fn tokenize(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}
