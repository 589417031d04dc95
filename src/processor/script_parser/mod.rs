//! Parser that pulls tokens from the lexer and builds the program AST.
//!
//! All cursor state lives in [`Parser`], one instance per compilation, so
//! independent files never share anything.

mod expression;
mod statement;

use super::ast::Stmt;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{CompileError, CompileErrorKind};
use crate::model::CompileOptions;

/// Words that start or terminate a statement and so can never be an
/// identifier in expression position.
const KEYWORDS: &[&str] = &[
    "assert", "break", "case", "catch", "continue", "dowhile", "elif", "else", "end", "fn", "for",
    "if", "outer", "return", "throw", "try", "while",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parses a whole file. `src` is expected to end in a newline.
pub fn parse(file: &str, src: &str, options: &CompileOptions) -> Result<Vec<Stmt>, CompileError> {
    let mut p = Parser::new(file, src, options)?;
    p.parse()
}

pub struct Parser<'a> {
    lex: Lexer<'a>,
    tok: Token,
    /// Depth of `fn` bodies around the current statement.
    fn_depth: usize,
    /// Loops around the current statement within the current `fn`.
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(
        file: &'a str,
        src: &'a str,
        options: &CompileOptions,
    ) -> Result<Self, CompileError> {
        let mut lex = Lexer::new(file, src).with_dollar_identifiers(options.dollar_identifiers);
        let tok = lex.lex()?;
        Ok(Self {
            lex,
            tok,
            fn_depth: 0,
            loop_depth: 0,
        })
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, CompileError> {
        if self.tok.kind == TokenKind::Newline {
            self.advance()?;
        }
        let program = self.block()?;
        if self.tok.kind != TokenKind::Eof {
            return Err(self.err("expected statement"));
        }
        Ok(program)
    }

    /// Moves to the next token and returns the one just passed.
    fn advance(&mut self) -> Result<Token, CompileError> {
        let next = self.lex.lex()?;
        Ok(std::mem::replace(&mut self.tok, next))
    }

    fn at(&self, text: &str) -> bool {
        self.tok.is(text)
    }

    fn eat(&mut self, text: &str) -> Result<bool, CompileError> {
        if self.at(text) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, text: &str) -> Result<(), CompileError> {
        if !self.eat(text)? {
            return Err(self.err(&format!("expected '{text}'")));
        }
        Ok(())
    }

    fn expect_newline(&mut self) -> Result<(), CompileError> {
        if self.tok.kind != TokenKind::Newline {
            return Err(self.err("expected newline"));
        }
        self.advance()?;
        Ok(())
    }

    fn skip_newlines(&mut self) -> Result<(), CompileError> {
        if self.tok.kind == TokenKind::Newline {
            self.advance()?;
        }
        Ok(())
    }

    /// An identifier that is not a keyword.
    fn word(&mut self) -> Result<String, CompileError> {
        if self.tok.kind != TokenKind::Word || is_keyword(&self.tok.text) {
            return Err(self.err("expected name"));
        }
        Ok(self.advance()?.text)
    }

    fn err(&self, msg: &str) -> CompileError {
        CompileError::new(
            self.lex.file(),
            self.tok.line,
            &self.tok.text,
            CompileErrorKind::Syntax(msg.to_string()),
        )
    }
}
