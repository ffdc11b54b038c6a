use std::{iter::Peekable, str::CharIndices};

mod error;

pub use error::{LexError, LexResult};

use crate::token::{Span, Token, TokenKind};

/// Operator and delimiter spellings. At each position the longest matching
/// entry wins; among entries of equal length the earlier one wins.
const SYMBOLS: &[(&str, TokenKind<'static>)] = &[
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::NotEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("+=", TokenKind::PlusEqual),
    ("-=", TokenKind::MinusEqual),
    ("*=", TokenKind::StarEqual),
    ("/=", TokenKind::SlashEqual),
    ("//", TokenKind::DoubleSlash),
    ("=", TokenKind::Equal),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
];

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<usize>,
    pending_tokens: Vec<Token<'a>>,
    at_line_start: bool,
    eof_reached: bool,
    // Open `(` / `[` count; newlines inside brackets join lines.
    nesting: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![0],
            pending_tokens: Vec::new(),
            at_line_start: true,
            eof_reached: false,
            nesting: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            return Ok(Token::new(TokenKind::EOF, self.empty_span()));
        }

        if self.at_line_start && self.nesting == 0 {
            self.at_line_start = false;
            if let Some(token) = self.handle_indentation()? {
                return Ok(token);
            }
        }

        self.skip_trivia();

        let Some(&(start, ch)) = self.chars.peek() else {
            return Ok(self.finish());
        };

        match ch {
            '\n' => {
                self.advance_char();
                self.at_line_start = true;
                Ok(Token::new(
                    TokenKind::Newline,
                    Span {
                        start,
                        end: start + 1,
                    },
                ))
            }
            '"' | '\'' => self.read_string(start, ch),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier(start)),
            c if c.is_ascii_digit() => self.read_number(start),
            _ => self.read_symbol(start, ch),
        }
    }

    /// Measures the indentation of the next logical line and turns it into
    /// `Indent`/`Dedent` tokens. Blank and comment-only lines are consumed
    /// without producing anything.
    fn handle_indentation(&mut self) -> LexResult<Option<Token<'a>>> {
        let indent_level = loop {
            let mut lookahead = self.chars.clone();
            let mut count = 0;
            while let Some(&(idx, c)) = lookahead.peek() {
                match c {
                    ' ' => {
                        count += 1;
                        lookahead.next();
                    }
                    '\t' => return Err(LexError::TabIndentation { position: idx }),
                    _ => break,
                }
            }

            match lookahead.peek() {
                None => return Ok(None),
                Some(&(_, '\n' | '\r' | '#')) => self.skip_line(),
                Some(_) => {
                    for _ in 0..count {
                        self.advance_char();
                    }
                    break count;
                }
            }
        };

        let current_indent = self.current_indent();
        let span = self.empty_span();

        if indent_level > current_indent {
            self.indent_stack.push(indent_level);
            return Ok(Some(Token::new(TokenKind::Indent, span)));
        }

        if indent_level < current_indent {
            while self.current_indent() > indent_level {
                self.indent_stack.pop();
                self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
            }
            if self.current_indent() != indent_level {
                return Err(LexError::InvalidDedent {
                    indent_level,
                    position: span.start,
                });
            }
            return Ok(self.pending_tokens.pop());
        }

        Ok(None)
    }

    /// Closes every open indentation level, then yields `EOF`.
    fn finish(&mut self) -> Token<'a> {
        self.eof_reached = true;
        let span = self.empty_span();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
        self.pending_tokens
            .pop()
            .unwrap_or(Token::new(TokenKind::EOF, span))
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance_char();
                }
                '#' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                '\n' if self.nesting > 0 => {
                    self.advance_char();
                }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some((_, c)) = self.advance_char() {
            if c == '\n' {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = TokenKind::keyword(ident).unwrap_or(TokenKind::Identifier(ident));
        Token::new(kind, Span { start, end })
    }

    fn read_number(&mut self, start: usize) -> LexResult<Token<'a>> {
        self.consume_digits();

        let mut is_float = false;
        if let Some(&(_, '.')) = self.chars.peek() {
            is_float = true;
            self.advance_char();
            self.consume_digits();
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let kind = if is_float {
            let invalid = || LexError::InvalidFloatLiteral {
                literal: literal.to_string(),
                position: start,
            };
            // Overlong literals parse to infinity, which has no C++ spelling.
            let value = literal
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(invalid)?;
            TokenKind::Float(value)
        } else {
            let value = literal
                .parse::<i64>()
                .map_err(|_| LexError::InvalidIntegerLiteral {
                    literal: literal.to_string(),
                    position: start,
                })?;
            TokenKind::Integer(value)
        };
        Ok(Token::new(kind, Span { start, end }))
    }

    fn consume_digits(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, start: usize, quote: char) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume opening quote
        let content_start = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            match c {
                c if c == quote => {
                    self.advance_char(); // Consume closing quote
                    return Ok(Token::new(
                        TokenKind::String(&self.input[content_start..idx]),
                        Span {
                            start,
                            end: idx + 1,
                        },
                    ));
                }
                '\n' => break,
                '\\' => {
                    self.advance_char();
                    if let Some(&(_, '\n')) = self.chars.peek() {
                        break;
                    }
                    self.advance_char();
                }
                _ => {
                    self.advance_char();
                }
            }
        }
        Err(LexError::UnterminatedString { position: start })
    }

    fn read_symbol(&mut self, start: usize, ch: char) -> LexResult<Token<'a>> {
        let rest = &self.input[start..];
        let mut best: Option<(&str, TokenKind<'a>)> = None;
        for &(text, kind) in SYMBOLS {
            if rest.starts_with(text) && best.is_none_or(|(found, _)| text.len() > found.len()) {
                best = Some((text, kind));
            }
        }

        let Some((text, kind)) = best else {
            return Err(LexError::UnexpectedCharacter {
                character: ch,
                position: start,
            });
        };

        for _ in 0..text.len() {
            self.advance_char();
        }
        match kind {
            TokenKind::LParen | TokenKind::LBracket => self.nesting += 1,
            TokenKind::RParen | TokenKind::RBracket => {
                self.nesting = self.nesting.saturating_sub(1)
            }
            _ => {}
        }
        Ok(Token::new(
            kind,
            Span {
                start,
                end: start + text.len(),
            },
        ))
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn empty_span(&mut self) -> Span {
        let index = self.current_index();
        Span {
            start: index,
            end: index,
        }
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            def f(n):
                n = 4 + 4
                print(n)
            f(1)
        "};
        let expected_tokens = vec![
            TokenKind::Def,
            TokenKind::Identifier("f"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("n"),
            TokenKind::Equal,
            TokenKind::Integer(4),
            TokenKind::Plus,
            TokenKind::Integer(4),
            TokenKind::Newline,
            TokenKind::Print,
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Identifier("f"),
            TokenKind::LParen,
            TokenKind::Integer(1),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn token_count_is_lexemes_plus_eof() {
        let tokens = tokenize("a = 5 + 3").expect("tokenize should succeed");
        assert_eq!(tokens.len(), 6);
        assert!(matches!(tokens.last().map(|t| t.kind), Some(TokenKind::EOF)));

        let tokens = tokenize("x<=y==z//2").expect("tokenize should succeed");
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn prefers_longest_symbol() {
        assert_eq!(
            kinds("a <= b == c != d // e >= f += 1"),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::LessEqual,
                TokenKind::Identifier("b"),
                TokenKind::EqualEqual,
                TokenKind::Identifier("c"),
                TokenKind::NotEqual,
                TokenKind::Identifier("d"),
                TokenKind::DoubleSlash,
                TokenKind::Identifier("e"),
                TokenKind::GreaterEqual,
                TokenKind::Identifier("f"),
                TokenKind::PlusEqual,
                TokenKind::Integer(1),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn keyword_prefixes_stay_identifiers() {
        assert_eq!(
            kinds("printer = iffy + format"),
            vec![
                TokenKind::Identifier("printer"),
                TokenKind::Equal,
                TokenKind::Identifier("iffy"),
                TokenKind::Plus,
                TokenKind::Identifier("format"),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            kinds(r#"x = 2.5 + 2. + 'it\'s' + "a\"b" + True"#),
            vec![
                TokenKind::Identifier("x"),
                TokenKind::Equal,
                TokenKind::Float(2.5),
                TokenKind::Plus,
                TokenKind::Float(2.0),
                TokenKind::Plus,
                TokenKind::String(r"it\'s"),
                TokenKind::Plus,
                TokenKind::String(r#"a\"b"#),
                TokenKind::Plus,
                TokenKind::True,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let input = indoc! {"
            # leading comment

            if x:  # trailing comment
                # comment inside block

                y = 1
            z = 2
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::If,
                TokenKind::Identifier("x"),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Identifier("y"),
                TokenKind::Equal,
                TokenKind::Integer(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Identifier("z"),
                TokenKind::Equal,
                TokenKind::Integer(2),
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn joins_lines_inside_brackets() {
        let input = indoc! {"
            xs = [1,
                  2]
            y = 3
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Identifier("xs"),
                TokenKind::Equal,
                TokenKind::LBracket,
                TokenKind::Integer(1),
                TokenKind::Comma,
                TokenKind::Integer(2),
                TokenKind::RBracket,
                TokenKind::Newline,
                TokenKind::Identifier("y"),
                TokenKind::Equal,
                TokenKind::Integer(3),
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn closes_open_blocks_at_eof() {
        let input = "while x:\n    if y:\n        z = 1";
        let kinds = kinds(input);
        assert_eq!(
            &kinds[kinds.len() - 3..],
            &[TokenKind::Dedent, TokenKind::Dedent, TokenKind::EOF]
        );
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                position: 6
            }
        );
        assert!(err.to_string().contains("Unexpected character '@'"));
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow");
        assert!(err.to_string().contains("Invalid integer literal"));
    }

    #[test]
    fn errors_on_float_overflow() {
        let source = format!("x = 1{}.5\n", "0".repeat(400));
        let err = tokenize(&source).expect_err("expected overflow");
        assert!(matches!(
            err,
            LexError::InvalidFloatLiteral { position: 4, .. }
        ));
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("s = \"abc\nt = 1\n").expect_err("expected failure");
        assert_eq!(err, LexError::UnterminatedString { position: 4 });
    }

    #[test]
    fn errors_on_tab_indentation() {
        let err = tokenize("if x:\n\ty = 1\n").expect_err("expected failure");
        assert!(matches!(err, LexError::TabIndentation { .. }));
    }

    #[test]
    fn errors_on_inconsistent_dedent() {
        let input = "if x:\n    y = 1\n  z = 2\n";
        let err = tokenize(input).expect_err("expected failure");
        assert!(matches!(
            err,
            LexError::InvalidDedent {
                indent_level: 2,
                ..
            }
        ));
    }
}
