//! Statements and blocks.

use super::{Parser, is_keyword};
use crate::error::CompileError;
use crate::processor::ast::{CaseArm, Else, Expr, FnDef, If, Stmt};
use crate::processor::lexer::TokenKind;

impl Parser<'_> {
    /// Statements up to `|`, `catch`, `else`, `elif`, `end` or end of file.
    /// The terminator itself is left for the caller.
    pub(super) fn block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut body = Vec::new();
        while !self.at_block_end() {
            body.push(self.parse_stmt()?);
            self.expect_newline()?;
        }
        Ok(body)
    }

    fn at_block_end(&self) -> bool {
        self.tok.kind == TokenKind::Eof
            || ["|", "catch", "else", "elif", "end"]
                .iter()
                .any(|t| self.at(t))
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        if self.tok.kind != TokenKind::Word {
            return self.parse_expr_stmt();
        }
        let stmt = match self.tok.text.as_str() {
            "if" => {
                self.advance()?;
                Stmt::If(self.parse_if()?)
            }
            "while" => {
                self.advance()?;
                let (cond, body) = self.parse_loop()?;
                Stmt::While { cond, body }
            }
            "dowhile" => {
                self.advance()?;
                let (cond, body) = self.parse_loop()?;
                Stmt::DoWhile { cond, body }
            }
            "for" => self.parse_for()?,
            "case" => self.parse_case()?,
            "fn" => Stmt::Fn(self.parse_fn()?),
            "return" => self.parse_return()?,
            "outer" => {
                self.advance()?;
                Stmt::Outer(self.parse_names()?)
            }
            "break" | "continue" => self.parse_jump()?,
            "assert" => {
                let line = self.advance()?.line;
                Stmt::Assert {
                    cond: self.expression()?,
                    line,
                }
            }
            "throw" => {
                self.advance()?;
                Stmt::Throw(self.expression()?)
            }
            "try" => self.parse_try()?,
            _ => self.parse_expr_stmt()?,
        };
        Ok(stmt)
    }

    /// After `if` or `elif`. An `elif` becomes the sole content of the else
    /// branch and the innermost level consumes the one `end`.
    fn parse_if(&mut self) -> Result<If, CompileError> {
        let cond = self.expression()?;
        self.expect_newline()?;
        let then_block = self.block()?;

        let else_branch = if self.eat("elif")? {
            return Ok(If {
                cond,
                then_block,
                else_branch: Some(Else::If(Box::new(self.parse_if()?))),
            });
        } else if self.eat("else")? {
            self.expect_newline()?;
            Some(Else::Block(self.block()?))
        } else {
            None
        };
        self.expect("end")?;

        Ok(If {
            cond,
            then_block,
            else_branch,
        })
    }

    /// Condition and body shared by `while` and `dowhile`.
    fn parse_loop(&mut self) -> Result<(Expr, Vec<Stmt>), CompileError> {
        let cond = self.expression()?;
        self.expect_newline()?;
        let body = self.loop_body()?;
        Ok((cond, body))
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        let body = body?;
        self.expect("end")?;
        Ok(body)
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        let first = self.word()?;
        let second = if self.eat(",")? {
            Some(self.word()?)
        } else {
            None
        };
        self.expect(":")?;
        let iterable = self.expression()?;
        self.expect_newline()?;
        let body = self.loop_body()?;

        Ok(match second {
            Some(element) => Stmt::ForIndexed {
                index: first,
                element,
                iterable,
                body,
            },
            None => Stmt::For {
                var: first,
                iterable,
                body,
            },
        })
    }

    fn parse_case(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        let subject = self.expression()?;
        self.expect_newline()?;

        let mut arms = Vec::new();
        loop {
            if self.eat("|")? {
                let mut patterns = vec![self.expression()?];
                while self.eat(",")? {
                    patterns.push(self.expression()?);
                }
                self.expect_newline()?;
                let body = self.block()?;
                arms.push(CaseArm { patterns, body });
            } else if self.eat("else")? {
                self.expect_newline()?;
                let body = self.block()?;
                arms.push(CaseArm {
                    patterns: Vec::new(),
                    body,
                });
                self.expect("end")?;
                break;
            } else {
                self.expect("end")?;
                break;
            }
        }
        Ok(Stmt::Case { subject, arms })
    }

    fn parse_fn(&mut self) -> Result<FnDef, CompileError> {
        self.advance()?;
        let name = self.word()?;
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.eat(")")? {
            params = self.parse_names()?;
            self.expect(")")?;
        }
        self.expect_newline()?;

        // loops outside the function are not targets for break/continue inside it
        let saved_loops = std::mem::take(&mut self.loop_depth);
        self.fn_depth += 1;
        let body = self.block();
        self.fn_depth -= 1;
        self.loop_depth = saved_loops;
        let body = body?;
        self.expect("end")?;

        Ok(FnDef { name, params, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        if self.fn_depth == 0 {
            return Err(self.err("expected 'return' inside fn"));
        }
        self.advance()?;
        if self.tok.kind == TokenKind::Newline {
            return Ok(Stmt::Return(Expr::null()));
        }
        Ok(Stmt::Return(self.expression()?))
    }

    fn parse_jump(&mut self) -> Result<Stmt, CompileError> {
        if self.loop_depth == 0 {
            return Err(self.err(&format!("expected '{}' inside loop", self.tok.text)));
        }
        let tok = self.advance()?;
        Ok(if tok.text == "break" {
            Stmt::Break
        } else {
            Stmt::Continue
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        self.expect_newline()?;
        let body = self.block()?;
        self.expect("catch")?;
        let var = self.word()?;
        self.expect_newline()?;
        let handler = self.block()?;
        self.expect("end")?;
        Ok(Stmt::Try { body, var, handler })
    }

    /// `a, b, c`
    fn parse_names(&mut self) -> Result<Vec<String>, CompileError> {
        let mut names = vec![self.word()?];
        while self.eat(",")? {
            names.push(self.word()?);
        }
        Ok(names)
    }

    /// A bare expression, `expr : name args...` or `expr args...`.
    fn parse_expr_stmt(&mut self) -> Result<Stmt, CompileError> {
        let e = self.expression()?;

        if self.eat(":")? {
            let name = self.word()?;
            let mut args = vec![e];
            if self.starts_expression() {
                args.extend(self.parse_args()?);
            }
            return Ok(Stmt::Expr(Expr::Call {
                callee: Box::new(Expr::Ident(name)),
                args,
            }));
        }

        if self.starts_expression() {
            let args = self.parse_args()?;
            return Ok(Stmt::Expr(Expr::Call {
                callee: Box::new(e),
                args,
            }));
        }

        Ok(Stmt::Expr(e))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = vec![self.expression()?];
        while self.eat(",")? {
            args.push(self.expression()?);
        }
        Ok(args)
    }

    /// Whether the current token can begin an expression. Anything else
    /// after a complete expression is left for `expect_newline` to report.
    fn starts_expression(&self) -> bool {
        match self.tok.kind {
            TokenKind::Number | TokenKind::Quote => true,
            TokenKind::Word => !is_keyword(&self.tok.text),
            TokenKind::Punct => ["(", "[", "{", "!", "~", "-"].iter().any(|t| self.at(t)),
            TokenKind::Newline | TokenKind::Eof => false,
        }
    }
}
