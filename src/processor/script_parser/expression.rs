//! Expressions: prefix, postfix and primary terms by recursive descent,
//! infix operators by precedence climbing.

use super::{Parser, is_keyword};
use crate::error::CompileError;
use crate::processor::ast::{BinaryOp, Expr, UnaryOp};
use crate::processor::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    /// `None` is plain `=`.
    Assign(Option<BinaryOp>),
}

/// Entry in the infix operator table.
#[derive(Debug, Clone, Copy)]
struct Op {
    prec: u8,
    /// Added to `prec` for the right operand: 1 groups left to right,
    /// 0 groups right to left.
    left: u8,
    infix: Infix,
}

fn infix_op(tok: &Token) -> Option<Op> {
    use BinaryOp::*;

    if tok.kind != TokenKind::Punct {
        return None;
    }
    let binary = |prec, op| Op {
        prec,
        left: 1,
        infix: Infix::Binary(op),
    };
    let assign = |op| Op {
        prec: 1,
        left: 0,
        infix: Infix::Assign(op),
    };
    let op = match tok.text.as_str() {
        "**" => Op {
            prec: 11,
            left: 0,
            infix: Infix::Binary(Pow),
        },

        "*" => binary(10, Mul),
        "/" => binary(10, Div),
        "%" => binary(10, Rem),
        "//" => binary(10, FloorDiv),

        "+" => binary(9, Add),
        "-" => binary(9, Sub),

        "<<" => binary(8, Shl),
        ">>" => binary(8, Shr),
        ">>>" => binary(8, UShr),

        "&" => binary(7, BitAnd),
        "^" => binary(6, BitXor),
        "|" => binary(5, BitOr),

        "==" => binary(4, Eq),
        "!=" => binary(4, Ne),
        "<" => binary(4, Lt),
        "<=" => binary(4, Le),
        ">" => binary(4, Gt),
        ">=" => binary(4, Ge),

        "&&" => binary(3, And),
        "||" => binary(2, Or),

        "=" => assign(None),
        "+=" => assign(Some(Add)),
        "-=" => assign(Some(Sub)),
        "*=" => assign(Some(Mul)),
        "/=" => assign(Some(Div)),
        "%=" => assign(Some(Rem)),
        "**=" => assign(Some(Pow)),
        "&=" => assign(Some(BitAnd)),
        "|=" => assign(Some(BitOr)),
        "^=" => assign(Some(BitXor)),
        "<<=" => assign(Some(Shl)),
        ">>=" => assign(Some(Shr)),
        ">>>=" => assign(Some(UShr)),

        _ => return None,
    };
    Some(op)
}

fn prefix_op(tok: &Token) -> Option<UnaryOp> {
    if tok.kind != TokenKind::Punct {
        return None;
    }
    match tok.text.as_str() {
        "!" => Some(UnaryOp::Not),
        "~" => Some(UnaryOp::BitNot),
        "-" => Some(UnaryOp::Neg),
        _ => None,
    }
}

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> Result<Expr, CompileError> {
        self.expr(0)
    }

    /// Parses one expression whose infix operators all bind at least as
    /// tightly as `min_prec`.
    pub(super) fn expr(&mut self, min_prec: u8) -> Result<Expr, CompileError> {
        let mut lhs = self.prefix()?;
        while let Some(op) = infix_op(&self.tok) {
            if op.prec < min_prec {
                break;
            }
            if matches!(op.infix, Infix::Assign(_)) && !lhs.is_assignable() {
                return Err(self.err("expected assignable target"));
            }
            self.advance()?;
            let rhs = Box::new(self.expr(op.prec + op.left)?);
            lhs = match op.infix {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs,
                },
                Infix::Assign(op) => Expr::Assign {
                    op,
                    target: Box::new(lhs),
                    value: rhs,
                },
            };
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, CompileError> {
        if let Some(op) = prefix_op(&self.tok) {
            self.advance()?;
            let operand = Box::new(self.prefix()?);
            return Ok(Expr::Unary { op, operand });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.primary()?;
        loop {
            if self.eat("(")? {
                let args = self.comma_list(")")?;
                e = Expr::Call {
                    callee: Box::new(e),
                    args,
                };
            } else if self.eat(".")? {
                let name = self.member_name()?;
                e = Expr::Index {
                    target: Box::new(e),
                    index: Box::new(Expr::Str(format!("\"{name}\""))),
                };
            } else if self.eat("[")? {
                e = self.subscript(e)?;
            } else {
                return Ok(e);
            }
        }
    }

    /// After `.`, any word is accepted, keywords included: `x.end` is fine.
    fn member_name(&mut self) -> Result<String, CompileError> {
        if self.tok.kind != TokenKind::Word {
            return Err(self.err("expected name"));
        }
        Ok(self.advance()?.text)
    }

    /// After `[`: either `[i]` or `[i:j]` where both bounds may be omitted.
    fn subscript(&mut self, target: Expr) -> Result<Expr, CompileError> {
        let start = if self.at(":") {
            Expr::Undefined
        } else {
            self.expression()?
        };
        if !self.eat(":")? {
            self.expect("]")?;
            return Ok(Expr::Index {
                target: Box::new(target),
                index: Box::new(start),
            });
        }
        let end = if self.at("]") {
            Expr::Undefined
        } else {
            self.expression()?
        };
        self.expect("]")?;
        Ok(Expr::Slice {
            target: Box::new(target),
            start: Box::new(start),
            end: Box::new(end),
        })
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        match self.tok.kind {
            TokenKind::Quote => return Ok(Expr::Str(self.advance()?.text)),
            TokenKind::Number => return Ok(Expr::Number(self.advance()?.text)),
            TokenKind::Word if !is_keyword(&self.tok.text) => {
                return Ok(Expr::Ident(self.advance()?.text));
            }
            _ => {}
        }

        if self.eat("(")? {
            self.skip_newlines()?;
            let e = self.expression()?;
            self.skip_newlines()?;
            self.expect(")")?;
            return Ok(e);
        }
        if self.eat("[")? {
            return Ok(Expr::List(self.comma_list("]")?));
        }
        if self.eat("{")? {
            return self.map_literal();
        }
        Err(self.err("expected expression"))
    }

    /// Comma separated expressions up to `close`, which is consumed.
    /// Line breaks are allowed between elements.
    fn comma_list(&mut self, close: &str) -> Result<Vec<Expr>, CompileError> {
        let mut v = Vec::new();
        self.skip_newlines()?;
        while !self.eat(close)? {
            v.push(self.expression()?);
            self.skip_newlines()?;
            if self.eat(",")? {
                self.skip_newlines()?;
            } else {
                self.expect(close)?;
                break;
            }
        }
        Ok(v)
    }

    fn map_literal(&mut self) -> Result<Expr, CompileError> {
        let mut entries = Vec::new();
        self.skip_newlines()?;
        while !self.eat("}")? {
            let key = self.expression()?;
            self.expect(":")?;
            let value = self.expression()?;
            entries.push((key, value));
            self.skip_newlines()?;
            if self.eat(",")? {
                self.skip_newlines()?;
            } else {
                self.expect("}")?;
                break;
            }
        }
        Ok(Expr::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompileOptions;

    fn expr(src: &str) -> Expr {
        let src = format!("{src}\n");
        let mut p = Parser::new("test.va", &src, &CompileOptions::default()).unwrap();
        let e = p.expression().unwrap();
        assert_eq!(p.tok.kind, TokenKind::Newline, "expression did not consume {src:?}");
        e
    }

    fn id(s: &str) -> Box<Expr> {
        Box::new(Expr::Ident(s.into()))
    }

    fn num(s: &str) -> Box<Expr> {
        Box::new(Expr::Number(s.into()))
    }

    fn bin(op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>) -> Box<Expr> {
        Box::new(Expr::Binary { op, lhs, rhs })
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let e = expr("2 + 3 * 4");
        assert_eq!(
            e,
            *bin(BinaryOp::Add, num("2"), bin(BinaryOp::Mul, num("3"), num("4")))
        );
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let e = expr("2 ** 3 ** 2");
        assert_eq!(
            e,
            *bin(BinaryOp::Pow, num("2"), bin(BinaryOp::Pow, num("3"), num("2")))
        );
    }

    #[test]
    fn test_left_associative_chains() {
        let test_cases = vec![
            (
                "a - b - c",
                bin(BinaryOp::Sub, bin(BinaryOp::Sub, id("a"), id("b")), id("c")),
            ),
            (
                "a / b * c",
                bin(BinaryOp::Mul, bin(BinaryOp::Div, id("a"), id("b")), id("c")),
            ),
            (
                "a || b && c",
                bin(BinaryOp::Or, id("a"), bin(BinaryOp::And, id("b"), id("c"))),
            ),
            (
                "a & b | c ^ d",
                bin(
                    BinaryOp::BitOr,
                    bin(BinaryOp::BitAnd, id("a"), id("b")),
                    bin(BinaryOp::BitXor, id("c"), id("d")),
                ),
            ),
            (
                "a + 1 < b << 2",
                bin(
                    BinaryOp::Lt,
                    bin(BinaryOp::Add, id("a"), num("1")),
                    bin(BinaryOp::Shl, id("b"), num("2")),
                ),
            ),
        ];

        for (src, expected) in test_cases {
            assert_eq!(expr(src), *expected, "source: {src}");
        }
    }

    #[test]
    fn test_assignment_is_right_associative_and_lowest() {
        let e = expr("a = b += c || d");
        assert_eq!(
            e,
            Expr::Assign {
                op: None,
                target: id("a"),
                value: Box::new(Expr::Assign {
                    op: Some(BinaryOp::Add),
                    target: id("b"),
                    value: bin(BinaryOp::Or, id("c"), id("d")),
                }),
            }
        );
    }

    #[test]
    fn test_prefix_operators() {
        let e = expr("-x ** 2");
        assert_eq!(
            e,
            *bin(
                BinaryOp::Pow,
                Box::new(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: id("x")
                }),
                num("2")
            )
        );

        let e = expr("!~a.b");
        assert_eq!(
            e,
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(Expr::Index {
                        target: id("a"),
                        index: Box::new(Expr::Str("\"b\"".into())),
                    }),
                }),
            }
        );
    }

    #[test]
    fn test_postfix_chain() {
        let e = expr("f(1, x)[0].name");
        assert_eq!(
            e,
            Expr::Index {
                target: Box::new(Expr::Index {
                    target: Box::new(Expr::Call {
                        callee: id("f"),
                        args: vec![Expr::Number("1".into()), Expr::Ident("x".into())],
                    }),
                    index: num("0"),
                }),
                index: Box::new(Expr::Str("\"name\"".into())),
            }
        );
    }

    #[test]
    fn test_slices_with_omitted_bounds() {
        let test_cases = vec![
            ("s[1:2]", Expr::Number("1".into()), Expr::Number("2".into())),
            ("s[:2]", Expr::Undefined, Expr::Number("2".into())),
            ("s[1:]", Expr::Number("1".into()), Expr::Undefined),
            ("s[:]", Expr::Undefined, Expr::Undefined),
        ];

        for (src, start, end) in test_cases {
            assert_eq!(
                expr(src),
                Expr::Slice {
                    target: id("s"),
                    start: Box::new(start),
                    end: Box::new(end),
                },
                "source: {src}"
            );
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            expr("[1, 'a', [],]"),
            Expr::List(vec![
                Expr::Number("1".into()),
                Expr::Str("'a'".into()),
                Expr::List(vec![]),
            ])
        );
        assert_eq!(
            expr("{'a': 1, k: v}"),
            Expr::Map(vec![
                (Expr::Str("'a'".into()), Expr::Number("1".into())),
                (Expr::Ident("k".into()), Expr::Ident("v".into())),
            ])
        );
        assert_eq!(expr("{}"), Expr::Map(vec![]));
    }

    #[test]
    fn test_lists_may_span_lines() {
        assert_eq!(
            expr("[\n  1,\n  2\n]"),
            Expr::List(vec![Expr::Number("1".into()), Expr::Number("2".into())])
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let e = expr("(2 + 3) * 4");
        assert_eq!(
            e,
            *bin(BinaryOp::Mul, bin(BinaryOp::Add, num("2"), num("3")), num("4"))
        );
    }

    #[test]
    fn test_keyword_is_not_an_expression() {
        let src = "end\n";
        let mut p = Parser::new("test.va", src, &CompileOptions::default()).unwrap();
        let err = p.expression().unwrap_err();
        assert!(err.to_string().contains("expected expression"));
    }
}
