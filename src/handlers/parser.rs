//! Syntax-only extraction of Go constructor signatures.
//!
//! Types are rebuilt as text from a bounded grammar: identifiers, pointers,
//! selectors (`pkg.Type`), slices and arrays, maps, `interface{...}`,
//! generic instantiations with one or more arguments, and variadic `...T`.
//! Anything else (function types, channels, inline structs) is kept as the raw
//! token text of the parameter. No type checking or import resolution happens.

use super::lexer::{tokenize, Token};

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Declared name, or `argN` for unnamed parameters
    pub name: String,
    pub type_expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: String,
    pub params: Vec<Param>,
}

/// Find the top-level function `name` in `source` and extract its parameters.
///
/// Methods (functions with a receiver) never match. Returns `None` when no
/// such function exists.
pub fn parse_constructor(source: &str, name: &str) -> Option<Constructor> {
    let tokens = tokenize(source);
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Punct('{') => depth += 1,
            Token::Punct('}') => depth = depth.saturating_sub(1),
            tok if depth == 0 && tok.is_ident("func") => {
                if tokens.get(i + 1).is_some_and(|t| t.is_ident(name)) {
                    let mut pos = i + 2;
                    if tokens.get(pos).is_some_and(|t| t.is_punct('[')) {
                        pos = matching(&tokens, pos)? + 1;
                    }
                    if tokens.get(pos).is_some_and(|t| t.is_punct('(')) {
                        let close = matching(&tokens, pos)?;
                        return Some(Constructor {
                            name: name.to_string(),
                            params: parse_params(&tokens[pos + 1..close]),
                        });
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn opener_closer(tok: &Token) -> Option<(char, char)> {
    match tok {
        Token::Punct('(') => Some(('(', ')')),
        Token::Punct('[') => Some(('[', ']')),
        Token::Punct('{') => Some(('{', '}')),
        _ => None,
    }
}

/// Index of the bracket closing the one at `open`.
fn matching(tokens: &[Token], open: usize) -> Option<usize> {
    let (o, c) = opener_closer(tokens.get(open)?)?;
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_punct(o) {
            depth += 1;
        } else if tok.is_punct(c) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut groups = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok {
            Token::Punct('(' | '[' | '{') => depth += 1,
            Token::Punct(')' | ']' | '}') => depth -= 1,
            Token::Punct(',') if depth == 0 => {
                groups.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        groups.push(&tokens[start..]);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

const TYPE_KEYWORDS: [&str; 5] = ["func", "chan", "struct", "map", "interface"];

/// Parse a parameter list body (between the parentheses).
///
/// Go either names every parameter or none. A list is named when some group
/// starts with a plain identifier but does not read as a type on its own.
fn parse_params(tokens: &[Token]) -> Vec<Param> {
    let groups = split_top_level(tokens);
    let named = groups.iter().any(|g| {
        matches!(g.first(), Some(Token::Ident(first)) if !TYPE_KEYWORDS.contains(&first.as_str()))
            && g.len() > 1
            && parse_full_type(g).is_none()
    });

    if !named {
        return groups
            .iter()
            .enumerate()
            .map(|(idx, g)| Param {
                name: format!("arg{idx}"),
                type_expr: parse_full_type(g).unwrap_or_else(|| render_raw(g)),
            })
            .collect();
    }

    let mut params = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for group in groups {
        match group {
            [Token::Ident(name)] => pending.push(name.clone()),
            [Token::Ident(name), rest @ ..] => {
                let type_expr = parse_full_type(rest).unwrap_or_else(|| render_raw(rest));
                for earlier in pending.drain(..) {
                    params.push(Param {
                        name: earlier,
                        type_expr: type_expr.clone(),
                    });
                }
                params.push(Param {
                    name: name.clone(),
                    type_expr,
                });
            }
            other => params.push(Param {
                name: format!("arg{}", params.len() + pending.len()),
                type_expr: render_raw(other),
            }),
        }
    }
    // trailing names without a type: best effort, keep them untyped
    params.extend(pending.into_iter().map(|name| Param {
        name,
        type_expr: String::new(),
    }));
    params
}

/// Parse `tokens` as exactly one type expression.
fn parse_full_type(tokens: &[Token]) -> Option<String> {
    let mut parser = TypeParser { tokens, pos: 0 };
    let ty = parser.parse_type()?;
    (parser.pos == tokens.len()).then_some(ty)
}

struct TypeParser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TypeParser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Ident(s) => {
                let s = s.clone();
                self.pos += 1;
                Some(s)
            }
            _ => None,
        }
    }

    fn parse_type(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Ellipsis => {
                self.pos += 1;
                Some(format!("...{}", self.parse_type()?))
            }
            Token::Punct('*') => {
                self.pos += 1;
                Some(format!("*{}", self.parse_type()?))
            }
            Token::Punct('(') => {
                self.pos += 1;
                let inner = self.parse_type()?;
                self.eat_punct(')').then_some(inner)
            }
            Token::Punct('[') => {
                self.pos += 1;
                let len = match self.peek()? {
                    Token::Punct(']') => String::new(),
                    Token::Literal(n) => {
                        let n = n.clone();
                        self.pos += 1;
                        n
                    }
                    Token::Ellipsis => {
                        self.pos += 1;
                        "...".to_string()
                    }
                    _ => return None,
                };
                if !self.eat_punct(']') {
                    return None;
                }
                Some(format!("[{len}]{}", self.parse_type()?))
            }
            Token::Ident(kw) if kw == "map" => {
                self.pos += 1;
                if !self.eat_punct('[') {
                    return None;
                }
                let key = self.parse_type()?;
                if !self.eat_punct(']') {
                    return None;
                }
                Some(format!("map[{key}]{}", self.parse_type()?))
            }
            Token::Ident(kw) if kw == "interface" => {
                self.pos += 1;
                let body = self.braced_body()?;
                Some(if body.is_empty() {
                    "interface{}".to_string()
                } else {
                    format!("interface{{ {body} }}")
                })
            }
            Token::Ident(kw) if kw == "func" || kw == "chan" || kw == "struct" => None,
            Token::Ident(_) => self.named_type(),
            _ => None,
        }
    }

    /// `Name`, `pkg.Name`, optionally instantiated: `Name[A, B]`.
    fn named_type(&mut self) -> Option<String> {
        let mut name = self.ident()?;
        if self.eat_punct('.') {
            name = format!("{name}.{}", self.ident()?);
        }
        if self.eat_punct('[') {
            let mut args = vec![self.parse_type()?];
            while self.eat_punct(',') {
                args.push(self.parse_type()?);
            }
            if !self.eat_punct(']') {
                return None;
            }
            name = format!("{name}[{}]", args.join(", "));
        }
        Some(name)
    }

    /// Raw text between a `{` and its `}`, consuming both.
    fn braced_body(&mut self) -> Option<String> {
        if !self.peek().is_some_and(|t| t.is_punct('{')) {
            return None;
        }
        let close = matching(self.tokens, self.pos)?;
        let body = render_raw(&self.tokens[self.pos + 1..close]);
        self.pos = close + 1;
        Some(body)
    }
}

/// Render tokens back to text, spacing words apart and after `)`.
fn render_raw(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut space_before_word = false;
    for tok in tokens {
        let word = matches!(tok, Token::Ident(_) | Token::Literal(_));
        if word && space_before_word {
            out.push(' ');
        }
        out.push_str(&tok.text());
        if tok.is_punct(',') || tok.is_punct(';') {
            out.push(' ');
        }
        space_before_word = word || tok.is_punct(')');
    }
    out.trim_end().to_string()
}
