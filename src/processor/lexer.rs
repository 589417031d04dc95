//! Hand-written lexer for Verbena source text.
//!
//! The parser pulls one token at a time through [`Lexer::lex`]; there is
//! exactly one token of lookahead and tokens are never collected.
//
//  Lexical items (informal):
//
//      Word     ::= [A-Za-z_][A-Za-z0-9_]*      (`$` allowed in the dollar dialect)
//      Number   ::= 0[xXoObB][A-Za-z0-9_]* | [0-9][0-9_]* ('.' [0-9][0-9_]*)?
//      Quote    ::= '"' ... '"' | '\'' ... '\''   (kept verbatim, quotes included)
//      Newline  ::= ('\n' | '#' comment | blank)+ collapsed into one token
//      Punct    ::= longest match from OPERATORS, else any single character

use crate::error::{CompileError, CompileErrorKind, LexErrorKind};

/// Text of the end-of-file token. No real token can be a lone space.
pub const EOF_TEXT: &str = " ";

/// Multi-character operators, longest spelling first.
const OPERATORS: &[&str] = &[
    ">>>=", "**=", "<<=", ">>=", ">>>", "**", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "//",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    Quote,
    Punct,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str, line: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            line,
        }
    }

    /// True for a word or punctuation token spelled exactly `text`.
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Punct) && self.text == text
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    file: &'a str,
    src: &'a str,
    pos: usize,
    line: usize,
    dollar_identifiers: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a str, src: &'a str) -> Self {
        Self {
            file,
            src,
            pos: 0,
            line: 1,
            dollar_identifiers: false,
            finished: false,
        }
    }

    pub fn with_dollar_identifiers(mut self, enabled: bool) -> Self {
        self.dollar_identifiers = enabled;
        self
    }

    pub fn file(&self) -> &'a str {
        self.file
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn error(&self, line: usize, near: &str, kind: LexErrorKind) -> CompileError {
        CompileError::new(self.file, line, near, CompileErrorKind::Lexical(kind))
    }

    /// Advances past the next token and returns it.
    ///
    /// Once the input is exhausted every call returns the end-of-file token.
    pub fn lex(&mut self) -> Result<Token, CompileError> {
        self.consume_while(|c| matches!(c, ' ' | '\t' | '\r' | '\x0c'));

        let line = self.line;
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(Token::new(TokenKind::Eof, EOF_TEXT, line));
        };

        let token = match c {
            '\n' | '#' => {
                self.skip_newline_run();
                Token::new(TokenKind::Newline, "\n", line)
            }
            '"' | '\'' => {
                self.read_quote(line)?;
                Token::new(TokenKind::Quote, &self.src[start..self.pos], line)
            }
            c if c.is_ascii_digit() => {
                self.read_number();
                let text = &self.src[start..self.pos];
                if !well_formed_number(text) {
                    return Err(self.error(line, text, LexErrorKind::MalformedNumber));
                }
                Token::new(TokenKind::Number, text, line)
            }
            c if c.is_ascii_alphabetic() || c == '_' || (self.dollar_identifiers && c == '$') => {
                let dollar = self.dollar_identifiers;
                self.consume_while(|c| {
                    c.is_ascii_alphanumeric() || c == '_' || (dollar && c == '$')
                });
                Token::new(TokenKind::Word, &self.src[start..self.pos], line)
            }
            c => {
                if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
                    self.pos += op.len();
                    Token::new(TokenKind::Punct, op, line)
                } else if c.is_control() {
                    let near = c.escape_default().to_string();
                    return Err(self.error(line, &near, LexErrorKind::UnexpectedCharacter(c)));
                } else {
                    self.next_char();
                    Token::new(TokenKind::Punct, &self.src[start..self.pos], line)
                }
            }
        };
        Ok(token)
    }

    /// Newlines, blanks and `#` comments up to the next significant character.
    fn skip_newline_run(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                '\n' | ' ' | '\t' | '\r' | '\x0c' => {
                    self.next_char();
                }
                '#' => self.consume_while(|c| c != '\n'),
                _ => break,
            }
        }
    }

    /// A backslash always takes the following character with it, so an
    /// escaped quote or backslash never closes the string.
    fn read_quote(&mut self, line: usize) -> Result<(), CompileError> {
        let start = self.pos;
        let quote = self.next_char();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.unterminated(line, start)),
                Some('\\') => {
                    self.next_char();
                    if self.next_char().is_none() {
                        return Err(self.unterminated(line, start));
                    }
                }
                Some(c) => {
                    self.next_char();
                    if Some(c) == quote {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn unterminated(&self, line: usize, start: usize) -> CompileError {
        self.error(line, &self.src[start..self.pos], LexErrorKind::UnterminatedString)
    }

    fn read_number(&mut self) {
        let first = self.next_char();
        let prefixed = matches!(self.peek_char(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        if first == Some('0') && prefixed {
            self.next_char();
            self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return;
        }
        self.consume_while(|c| c.is_ascii_digit() || c == '_');
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.next_char();
            self.consume_while(|c| c.is_ascii_digit() || c == '_');
        }
    }
}

/// Whether number text is also a valid JavaScript literal: `_` only between
/// two digits, radix digits in range, no leading zero on a decimal.
fn well_formed_number(text: &str) -> bool {
    fn digits(s: &str, radix: u32) -> bool {
        !s.is_empty()
            && !s.starts_with('_')
            && !s.ends_with('_')
            && !s.contains("__")
            && s.chars().all(|c| c == '_' || c.is_digit(radix))
    }

    let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return digits(&text[2..], radix);
    }

    let (int, frac) = match text.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (text, None),
    };
    if int.len() > 1 && int.starts_with('0') {
        return false;
    }
    digits(int, 10) && frac.is_none_or(|f| digits(f, 10))
}

/// Yields every token up to and including end-of-file, or the first error.
impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let res = self.lex();
        if !matches!(&res, Ok(tok) if tok.kind != TokenKind::Eof) {
            self.finished = true;
        }
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(src: &str) -> Vec<(TokenKind, String)> {
        Lexer::new("test.va", src)
            .map(|t| t.unwrap())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_tokenisation() {
        use TokenKind::*;
        let test_cases = vec![
            (
                "x = 1\n",
                vec![(Word, "x"), (Punct, "="), (Number, "1"), (Newline, "\n"), (Eof, " ")],
            ),
            (
                "print 'a\\'b', \"c\"\n",
                vec![
                    (Word, "print"),
                    (Quote, "'a\\'b'"),
                    (Punct, ","),
                    (Quote, "\"c\""),
                    (Newline, "\n"),
                    (Eof, " "),
                ],
            ),
            (
                "a **= b >>>= c >> d\n",
                vec![
                    (Word, "a"),
                    (Punct, "**="),
                    (Word, "b"),
                    (Punct, ">>>="),
                    (Word, "c"),
                    (Punct, ">>"),
                    (Word, "d"),
                    (Newline, "\n"),
                    (Eof, " "),
                ],
            ),
            (
                "f(xs[1:2]).y\n",
                vec![
                    (Word, "f"),
                    (Punct, "("),
                    (Word, "xs"),
                    (Punct, "["),
                    (Number, "1"),
                    (Punct, ":"),
                    (Number, "2"),
                    (Punct, "]"),
                    (Punct, ")"),
                    (Punct, "."),
                    (Word, "y"),
                    (Newline, "\n"),
                    (Eof, " "),
                ],
            ),
        ];

        for (src, expected) in test_cases {
            let expected: Vec<_> = expected.into_iter().map(|(k, t)| (k, t.to_string())).collect();
            assert_eq!(kinds_and_texts(src), expected, "source: {src:?}");
        }
    }

    #[test]
    fn test_numbers() {
        let test_cases = vec![
            ("0x1F", "0x1F"),
            ("0b1010", "0b1010"),
            ("0o17", "0o17"),
            ("3.25", "3.25"),
            ("1_000", "1_000"),
        ];

        for (src, expected) in test_cases {
            let tok = Lexer::new("test.va", src).lex().unwrap();
            assert_eq!(tok.kind, TokenKind::Number);
            assert_eq!(tok.text, expected);
        }

        // a point not followed by a digit is member access
        let texts: Vec<_> = kinds_and_texts("1.x").into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["1", ".", "x", " "]);
    }

    #[test]
    fn test_malformed_numbers() {
        let test_cases = vec![
            "1_", "1__0", "1.5_", "0x", "0x_1", "0xfg", "0b102", "0_1", "012",
        ];

        for src in test_cases {
            let err = Lexer::new("test.va", src).lex().unwrap_err();
            assert_eq!(err.kind, CompileErrorKind::Lexical(LexErrorKind::MalformedNumber));
            assert_eq!(err.to_string(), format!("test.va:1: '{src}': malformed number"));
        }
    }

    #[test]
    fn test_comments_and_blank_lines_collapse() {
        let src = "a\n\n# comment\n   \n  # another\nb # trailing\n";
        let tokens = kinds_and_texts(src);
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "a".to_string()),
                (TokenKind::Newline, "\n".to_string()),
                (TokenKind::Word, "b".to_string()),
                (TokenKind::Newline, "\n".to_string()),
                (TokenKind::Eof, " ".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let mut lex = Lexer::new("test.va", "a\n# c\n\nb\n");
        assert_eq!(lex.lex().unwrap().line, 1);
        assert_eq!(lex.lex().unwrap().line, 1);
        assert_eq!(lex.lex().unwrap().line, 4);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lex = Lexer::new("test.va", "x");
        assert_eq!(lex.lex().unwrap().text, "x");
        for _ in 0..3 {
            let tok = lex.lex().unwrap();
            assert_eq!(tok.kind, TokenKind::Eof);
            assert_eq!(tok.text, EOF_TEXT);
        }
    }

    #[test]
    fn test_unterminated_string() {
        let test_cases = vec![("x = 1\ny = 'abc\n", 2), ("\n\n\"abc", 3), ("'ends in escape\\", 1)];

        for (src, line) in test_cases {
            let err = Lexer::new("test.va", src)
                .find_map(|t| t.err())
                .expect("lexing should fail");
            assert_eq!(err.line, line);
            assert_eq!(err.kind, CompileErrorKind::Lexical(LexErrorKind::UnterminatedString));
            assert!(err.to_string().contains("unterminated"), "got: {err}");
            assert!(err.to_string().starts_with(&format!("test.va:{line}:")));
        }
    }

    #[test]
    fn test_escaped_backslash_closes_string() {
        let tok = Lexer::new("test.va", r#""a\\" + 1"#).lex().unwrap();
        assert_eq!(tok.text, r#""a\\""#);
    }

    #[test]
    fn test_dollar_identifiers() {
        let plain: Vec<_> = kinds_and_texts("a$b").into_iter().map(|(_, t)| t).collect();
        assert_eq!(plain, vec!["a", "$", "b", " "]);

        let tok = Lexer::new("test.va", "$a$b")
            .with_dollar_identifiers(true)
            .lex()
            .unwrap();
        assert_eq!(tok.kind, TokenKind::Word);
        assert_eq!(tok.text, "$a$b");
    }

    #[test]
    fn test_control_character_is_rejected() {
        let err = Lexer::new("test.va", "a \u{1} b")
            .find_map(|t| t.err())
            .expect("lexing should fail");
        assert_eq!(err.kind, CompileErrorKind::Lexical(LexErrorKind::UnexpectedCharacter('\u{1}')));
    }
}
