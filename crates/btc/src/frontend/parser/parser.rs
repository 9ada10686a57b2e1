//! BType recursive descent parser

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};

/// BType parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse a complete module (file)
    pub fn parse_module(&mut self) -> CompileResult<Module> {
        let start = self.lexer.peek()?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::Eof)? {
            stmts.push(self.parse_stmt()?);
        }

        let end = self.lexer.peek()?.span;
        Ok(Module::new(stmts, Span::new(start.start, end.end)))
    }

    // ==================== Statements ====================

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let start = self.lexer.peek()?.span;
        let lead = self.lexer.peek()?.kind.clone();

        let kind = match lead {
            TokenKind::Import => StmtKind::Import(self.parse_import()?),
            TokenKind::From => StmtKind::Import(self.parse_from_import()?),
            TokenKind::Export => {
                self.lexer.next_token()?;
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Export { name }
            }
            TokenKind::Func if !self.is_typed_decl_start()? => {
                StmtKind::Func(self.parse_func_decl()?)
            }
            TokenKind::Object => StmtKind::Object(self.parse_object()?),
            TokenKind::Operator => StmtKind::Operator(self.parse_operator()?),
            TokenKind::Return => {
                self.lexer.next_token()?;
                let value = if self.check(&TokenKind::Semi)? {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semi)?;
                StmtKind::Return(value)
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => {
                self.lexer.next_token()?;
                let condition = self.parse_paren_expr()?;
                let body = self.parse_block()?;
                StmtKind::While { condition, body }
            }
            TokenKind::Do => {
                self.lexer.next_token()?;
                let body = self.parse_block()?;
                self.expect(TokenKind::While)?;
                let condition = self.parse_paren_expr()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::DoWhile { body, condition }
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Break => {
                self.lexer.next_token()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.lexer.next_token()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Continue
            }
            TokenKind::SwitchType => self.parse_switchtype()?,
            _ => return self.parse_simple_stmt(true),
        };

        let end = self.previous_end(start);
        Ok(Stmt::new(kind, Span::new(start.start, end)))
    }

    /// Declarations, assignments and expression statements; the forms
    /// allowed in `for` headers
    fn parse_simple_stmt(&mut self, require_semi: bool) -> CompileResult<Stmt> {
        let start = self.lexer.peek()?.span;

        let kind = if self.check(&TokenKind::Var)? || self.check(&TokenKind::Const)? {
            let is_const = self.lexer.next_token()?.kind == TokenKind::Const;
            let name = self.expect_identifier()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expr()?;
            StmtKind::Var { name, ty: None, value, is_const }
        } else if self.is_typed_decl_start()? {
            let ty = self.parse_type()?;
            self.expect(TokenKind::Colon)?;
            let name = self.expect_identifier()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expr()?;
            StmtKind::Var { name, ty: Some(ty), value, is_const: false }
        } else {
            let expr = self.parse_expr()?;
            if self.match_token(&TokenKind::Eq)? {
                let value = self.parse_expr()?;
                StmtKind::Assign { target: expr, value }
            } else {
                StmtKind::Expr(expr)
            }
        };

        let mut end = self.lexer.peek()?.span.start;
        if require_semi {
            end = self.expect(TokenKind::Semi)?.span.end;
        }
        Ok(Stmt::new(kind, Span::new(start.start, end)))
    }

    fn parse_if(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_paren_expr()?;
        let then_block = self.parse_block()?;

        let else_block = if self.match_token(&TokenKind::Else)? {
            if self.check(&TokenKind::If)? {
                // else if: wrap the nested if in a synthetic block
                let start = self.lexer.peek()?.span;
                let nested = self.parse_if()?;
                let span = Span::new(start.start, self.previous_end(start));
                Some(Block::new(vec![Stmt::new(nested, span)], span))
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(StmtKind::If { condition, then_block, else_block })
    }

    fn parse_for(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.match_token(&TokenKind::Semi)? {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt(true)?))
        };

        let condition = if self.check(&TokenKind::Semi)? {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi)?;

        let step = if self.check(&TokenKind::RParen)? {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt(false)?))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Ok(StmtKind::For { init, condition, step, body })
    }

    fn parse_switchtype(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::SwitchType)?;
        let expr = self.parse_paren_expr()?;
        self.expect(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace)? {
            let start = self.expect(TokenKind::Case)?.span;
            let ty = self.parse_type()?;
            let body = self.parse_block()?;
            let span = Span::new(start.start, body.span.end);
            cases.push(SwitchCase { ty, body, span });
        }
        self.expect(TokenKind::RBrace)?;

        Ok(StmtKind::SwitchType { expr, cases })
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace)? {
            if self.check(&TokenKind::Eof)? {
                let token = self.lexer.next_token()?;
                return Err(CompileError::parser("unterminated block", token.span));
            }
            stmts.push(self.parse_stmt()?);
        }

        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Block::new(stmts, Span::new(start.start, end.end)))
    }

    // ==================== Declarations ====================

    fn parse_import(&mut self) -> CompileResult<ImportDecl> {
        let start = self.expect(TokenKind::Import)?.span;
        let path = self.parse_module_path()?;
        let alias = if self.match_token(&TokenKind::As)? {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let end = self.expect(TokenKind::Semi)?.span;

        Ok(ImportDecl {
            path,
            alias,
            members: Vec::new(),
            span: Span::new(start.start, end.end),
        })
    }

    fn parse_from_import(&mut self) -> CompileResult<ImportDecl> {
        let start = self.expect(TokenKind::From)?.span;
        let path = self.parse_module_path()?;
        self.expect(TokenKind::Import)?;

        let mut members = vec![self.expect_identifier()?];
        while self.match_token(&TokenKind::Comma)? {
            members.push(self.expect_identifier()?);
        }
        let end = self.expect(TokenKind::Semi)?.span;

        Ok(ImportDecl {
            path,
            alias: None,
            members,
            span: Span::new(start.start, end.end),
        })
    }

    fn parse_module_path(&mut self) -> CompileResult<Vec<String>> {
        let mut path = vec![self.expect_identifier()?];
        while self.match_token(&TokenKind::Dot)? {
            path.push(self.expect_identifier()?);
        }
        Ok(path)
    }

    /// `func [T:]name(params) { }`
    fn parse_func_decl(&mut self) -> CompileResult<FuncDecl> {
        let start = self.expect(TokenKind::Func)?.span;

        // `func name(` has no return type; anything else starts with one
        let return_type = if matches!(self.lexer.peek()?.kind, TokenKind::Identifier(_))
            && self.lexer.peek_at(1)?.kind == TokenKind::LParen
        {
            None
        } else {
            let ty = self.parse_type()?;
            self.expect(TokenKind::Colon)?;
            Some(ty)
        };

        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;

        Ok(FuncDecl {
            name,
            return_type,
            params,
            span: Span::new(start.start, body.span.end),
            body,
        })
    }

    fn parse_params(&mut self) -> CompileResult<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen)? {
            params.push(self.parse_param()?);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> CompileResult<Param> {
        let ty = self.parse_type()?;
        self.expect(TokenKind::Colon)?;
        let name_token = self.lexer.next_token()?;
        let name = match name_token.kind {
            TokenKind::Identifier(name) => name,
            other => {
                return Err(CompileError::parser(
                    format!("expected parameter name, found {other}"),
                    name_token.span,
                ));
            }
        };
        Ok(Param {
            name,
            span: ty.span.to(name_token.span),
            ty,
        })
    }

    fn parse_object(&mut self) -> CompileResult<ObjectDecl> {
        let start = self.expect(TokenKind::Object)?.span;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        let mut methods = Vec::new();
        let mut constructor = None;

        while !self.check(&TokenKind::RBrace)? {
            let member_start = self.lexer.peek()?.span;
            let mut is_final = false;
            let mut is_private = false;
            loop {
                if self.match_token(&TokenKind::Final)? {
                    is_final = true;
                } else if self.match_token(&TokenKind::Private)? {
                    is_private = true;
                } else {
                    break;
                }
            }

            if self.check(&TokenKind::New)? {
                if is_final || is_private {
                    return Err(CompileError::parser(
                        "constructors cannot be final or private",
                        member_start,
                    ));
                }
                let new_span = self.expect(TokenKind::New)?.span;
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                let decl = FuncDecl {
                    name: "new".to_string(),
                    return_type: None,
                    params,
                    span: Span::new(new_span.start, body.span.end),
                    body,
                };
                if constructor.replace(decl).is_some() {
                    return Err(CompileError::parser(
                        format!("object '{name}' declares more than one constructor"),
                        new_span,
                    ));
                }
            } else if self.check(&TokenKind::Func)? {
                if is_final {
                    return Err(CompileError::parser("methods cannot be final", member_start));
                }
                let func = self.parse_func_decl()?;
                methods.push(MethodDecl { func, is_private });
            } else {
                let ty = self.parse_type()?;
                self.expect(TokenKind::Colon)?;
                let member_name = self.expect_identifier()?;
                let end = self.expect(TokenKind::Semi)?.span;
                members.push(ObjectMember {
                    name: member_name,
                    ty,
                    is_final,
                    is_private,
                    span: Span::new(member_start.start, end.end),
                });
            }
        }

        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(ObjectDecl {
            name,
            members,
            constructor,
            methods,
            span: Span::new(start.start, end.end),
        })
    }

    /// `operator (T:a OP U:b) R { }`
    fn parse_operator(&mut self) -> CompileResult<OperatorDecl> {
        let start = self.expect(TokenKind::Operator)?.span;
        self.expect(TokenKind::LParen)?;
        let left = self.parse_param()?;

        let op = if self.match_token(&TokenKind::LBracket)? {
            self.expect(TokenKind::RBracket)?;
            OverloadOp::Subscript
        } else if let Some(op) = self.peek_binary_op()? {
            self.lexer.next_token()?;
            OverloadOp::Binary(op)
        } else {
            let token = self.lexer.next_token()?;
            return Err(CompileError::parser(
                format!("expected overloadable operator, found {}", token.kind),
                token.span,
            ));
        };

        let right = self.parse_param()?;
        self.expect(TokenKind::RParen)?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(OperatorDecl {
            op,
            left,
            right,
            return_type,
            span: Span::new(start.start, body.span.end),
            body,
        })
    }

    // ==================== Types ====================

    fn parse_type(&mut self) -> CompileResult<TypeExpr> {
        let start = self.lexer.peek()?.span;

        if self.match_token(&TokenKind::Func)? {
            let mut args = self.parse_type_args()?;
            let ret = if args.is_empty() {
                return Err(CompileError::parser("func type needs a return type", start));
            } else {
                args.remove(0)
            };
            let ret = match &ret.kind {
                TypeExprKind::Named(name) if name == "void" => None,
                _ => Some(Box::new(ret)),
            };
            let span = Span::new(start.start, self.previous_end(start));
            return Ok(TypeExpr::new(TypeExprKind::Func { ret, params: args }, span));
        }

        let name = self.expect_identifier()?;
        let kind = match name.as_str() {
            "array" if self.check(&TokenKind::Lt)? => {
                let mut args = self.parse_type_args()?;
                if args.len() != 1 {
                    return Err(CompileError::parser("array takes exactly one type argument", start));
                }
                TypeExprKind::Array(Box::new(args.remove(0)))
            }
            "tuple" if self.check(&TokenKind::Lt)? => TypeExprKind::Tuple(self.parse_type_args()?),
            _ => TypeExprKind::Named(name),
        };

        let span = Span::new(start.start, self.previous_end(start));
        Ok(TypeExpr::new(kind, span))
    }

    fn parse_type_args(&mut self) -> CompileResult<Vec<TypeExpr>> {
        self.expect(TokenKind::Lt)?;
        let mut args = vec![self.parse_type()?];
        while self.match_token(&TokenKind::Comma)? {
            args.push(self.parse_type()?);
        }
        self.lexer.split_shift_right()?;
        self.expect(TokenKind::Gt)?;
        Ok(args)
    }

    /// Does a `T:name` declaration start here? Scans the type without
    /// consuming anything.
    fn is_typed_decl_start(&mut self) -> CompileResult<bool> {
        let mut offset = match self.lexer.peek()?.kind {
            TokenKind::Identifier(_) | TokenKind::Func => 1,
            _ => return Ok(false),
        };

        if self.lexer.peek_at(offset)?.kind == TokenKind::Lt {
            let mut depth: i32 = 0;
            loop {
                match self.lexer.peek_at(offset)?.kind {
                    TokenKind::Lt => depth += 1,
                    TokenKind::Gt => depth -= 1,
                    TokenKind::Shr => depth -= 2,
                    TokenKind::Identifier(_) | TokenKind::Func | TokenKind::Comma => {}
                    _ => return Ok(false),
                }
                offset += 1;
                if depth <= 0 {
                    break;
                }
            }
        }

        Ok(self.lexer.peek_at(offset)?.kind == TokenKind::Colon
            && matches!(self.lexer.peek_at(offset + 1)?.kind, TokenKind::Identifier(_)))
    }

    // ==================== Expressions ====================

    fn parse_paren_expr(&mut self) -> CompileResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_expr_with_precedence(0)
    }

    fn parse_expr_with_precedence(&mut self, min_prec: u8) -> CompileResult<Expr> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op()? {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.lexer.next_token()?; // consume operator
            let right = self.parse_expr_with_precedence(prec + 1)?;

            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn peek_binary_op(&mut self) -> CompileResult<Option<BinOp>> {
        Ok(match &self.lexer.peek()?.kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Rem),
            TokenKind::Amp => Some(BinOp::BitAnd),
            TokenKind::Pipe => Some(BinOp::BitOr),
            TokenKind::Caret => Some(BinOp::BitXor),
            TokenKind::Shl => Some(BinOp::Shl),
            TokenKind::Shr => Some(BinOp::Shr),
            TokenKind::And => Some(BinOp::And),
            TokenKind::Or => Some(BinOp::Or),
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::NotEq => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::LtEq => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::GtEq => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_unary_expr(&mut self) -> CompileResult<Expr> {
        let start = self.lexer.peek()?.span;

        let op = match self.lexer.peek()?.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang | TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };

        if let Some(op) = op {
            self.lexer.next_token()?;
            let operand = self.parse_unary_expr()?;
            let span = start.to(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary { op, operand: Box::new(operand) },
                span,
            ));
        }

        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            if self.match_token(&TokenKind::Dot)? {
                let member_token = self.lexer.next_token()?;
                let member = match member_token.kind {
                    TokenKind::Identifier(name) => name,
                    other => {
                        return Err(CompileError::parser(
                            format!("expected member name, found {other}"),
                            member_token.span,
                        ));
                    }
                };
                let span = expr.span.to(member_token.span);
                expr = Expr::new(
                    ExprKind::Member { base: Box::new(expr), member },
                    span,
                );
            } else if self.match_token(&TokenKind::LBracket)? {
                let index = self.parse_expr()?;
                let end = self.expect(TokenKind::RBracket)?.span;
                let span = expr.span.to(end);
                expr = Expr::new(
                    ExprKind::Subscript {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.match_token(&TokenKind::LParen)? {
                let args = self.parse_call_args()?;
                let end = self.expect(TokenKind::RParen)?.span;
                let span = expr.span.to(end);
                expr = Expr::new(
                    ExprKind::Call { callee: Box::new(expr), args },
                    span,
                );
            } else if self.match_token(&TokenKind::As)? {
                let ty = self.parse_type()?;
                let span = expr.span.to(ty.span);
                expr = Expr::new(
                    ExprKind::Cast { expr: Box::new(expr), ty },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> CompileResult<Vec<Expr>> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen)? {
            args.push(self.parse_expr()?);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }

        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> CompileResult<Expr> {
        let token = self.lexer.next_token()?;
        let span = token.span;

        let kind = match token.kind {
            TokenKind::IntLiteral(text) => ExprKind::IntLiteral(self.parse_int_literal(&text, 10, span)?),
            TokenKind::HexLiteral(text) => {
                ExprKind::IntLiteral(self.parse_int_literal(&text[2..], 16, span)?)
            }
            TokenKind::FloatLiteral(text) => {
                let value = text.parse::<f64>().map_err(|_| {
                    CompileError::parser(format!("invalid float literal '{text}'"), span)
                })?;
                ExprKind::FloatLiteral(value)
            }
            TokenKind::StringLiteral(text) => ExprKind::StringLiteral(self.parse_string_literal(&text, span)?),
            TokenKind::True => ExprKind::BoolLiteral(true),
            TokenKind::False => ExprKind::BoolLiteral(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let end = self.expect(TokenKind::RParen)?.span;
                return Ok(Expr::new(inner.kind, span.to(end)));
            }
            TokenKind::New => {
                let ty = self.parse_type()?;
                self.expect(TokenKind::LParen)?;
                let args = self.parse_call_args()?;
                let end = self.expect(TokenKind::RParen)?.span;
                return Ok(Expr::new(ExprKind::New { ty, args }, span.to(end)));
            }
            TokenKind::LBracket => {
                // Tuple literal: [: a, b]
                self.expect(TokenKind::Colon)?;
                let mut elements = vec![self.parse_expr()?];
                while self.match_token(&TokenKind::Comma)? {
                    elements.push(self.parse_expr()?);
                }
                let end = self.expect(TokenKind::RBracket)?.span;
                return Ok(Expr::new(ExprKind::Tuple(elements), span.to(end)));
            }
            other => {
                return Err(CompileError::parser(
                    format!("expected expression, found {other}"),
                    span,
                ));
            }
        };

        Ok(Expr::new(kind, span))
    }

    fn parse_int_literal(&self, text: &str, radix: u32, span: Span) -> CompileResult<i64> {
        i64::from_str_radix(text, radix)
            .map_err(|_| CompileError::parser(format!("integer literal '{text}' out of range"), span))
    }

    fn parse_string_literal(&self, text: &str, span: Span) -> CompileResult<String> {
        let inner = &text[1..text.len() - 1];
        let mut result = String::with_capacity(inner.len());
        let mut chars = inner.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                result.push(c);
                continue;
            }
            let escaped = match chars.next() {
                Some('n') => '\n',
                Some('t') => '\t',
                Some('r') => '\r',
                Some('0') => '\0',
                Some('\\') => '\\',
                Some('"') => '"',
                Some(other) => {
                    return Err(CompileError::parser(
                        format!("unknown escape sequence '\\{other}'"),
                        span,
                    ));
                }
                None => return Err(CompileError::parser("unterminated escape sequence", span)),
            };
            result.push(escaped);
        }

        Ok(result)
    }

    // ==================== Helpers ====================

    fn check(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        self.lexer.check(expected)
    }

    fn match_token(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        self.lexer.match_token(expected)
    }

    fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
        self.lexer.expect(expected)
    }

    fn expect_identifier(&mut self) -> CompileResult<String> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(CompileError::parser(
                format!("expected identifier, found {}", token.kind),
                token.span,
            )),
        }
    }

    /// End offset for a construct that began at `start`: the start of the
    /// next unconsumed token, never before `start` itself
    fn previous_end(&mut self, start: Span) -> usize {
        self.lexer
            .peek()
            .map(|t| t.span.start)
            .unwrap_or(start.end)
            .max(start.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Module {
        Parser::new(source).parse_module().unwrap()
    }

    #[test]
    fn test_parse_function() {
        let module = parse("func int:add(int:a, int:b) { return a + b; }");

        assert_eq!(module.stmts.len(), 1);
        match &module.stmts[0].kind {
            StmtKind::Func(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.return_type.as_ref().map(ToString::to_string).as_deref(), Some("int"));
                assert_eq!(f.body.stmts.len(), 1);
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_void_function() {
        let module = parse("func main() { }");
        match &module.stmts[0].kind {
            StmtKind::Func(f) => {
                assert_eq!(f.name, "main");
                assert!(f.return_type.is_none());
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_declarations() {
        let module = parse("var x = 1; const y = 2; int:z = 3; array<array<int>>:grid = new array<array<int>>(4);");

        assert_eq!(module.stmts.len(), 4);
        match &module.stmts[1].kind {
            StmtKind::Var { name, is_const, ty, .. } => {
                assert_eq!(name, "y");
                assert!(*is_const);
                assert!(ty.is_none());
            }
            _ => panic!("expected declaration"),
        }
        match &module.stmts[3].kind {
            StmtKind::Var { ty: Some(ty), .. } => {
                assert_eq!(ty.to_string(), "array<array<int>>");
            }
            _ => panic!("expected typed declaration"),
        }
    }

    #[test]
    fn test_parse_func_typed_declaration() {
        let module = parse("func<int, int>:f = inc;");
        match &module.stmts[0].kind {
            StmtKind::Var { ty: Some(ty), name, .. } => {
                assert_eq!(name, "f");
                assert_eq!(ty.to_string(), "func<int, int>");
            }
            _ => panic!("expected typed declaration"),
        }
    }

    #[test]
    fn test_parse_object() {
        let source = r#"
            object Point {
                final int:x;
                private int:y;
                new(int:x) { self.x = x; }
                func int:getX() { return self.x; }
                private func helper() { }
            }
        "#;
        let module = parse(source);

        match &module.stmts[0].kind {
            StmtKind::Object(o) => {
                assert_eq!(o.name, "Point");
                assert_eq!(o.members.len(), 2);
                assert!(o.members[0].is_final);
                assert!(o.members[1].is_private);
                assert!(o.constructor.is_some());
                assert_eq!(o.methods.len(), 2);
                assert!(o.methods[1].is_private);
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_operator() {
        let module = parse("operator (Vec:a + Vec:b) Vec { return a; } operator (Vec:v [] int:i) float { return 0.0; }");

        match &module.stmts[0].kind {
            StmtKind::Operator(o) => assert_eq!(o.op, OverloadOp::Binary(BinOp::Add)),
            _ => panic!("expected operator"),
        }
        match &module.stmts[1].kind {
            StmtKind::Operator(o) => assert_eq!(o.op, OverloadOp::Subscript),
            _ => panic!("expected operator"),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let module = parse("x = 1 + 2 * 3 == 7 and ok;");
        let StmtKind::Assign { value, .. } = &module.stmts[0].kind else {
            panic!("expected assignment");
        };
        match &value.kind {
            ExprKind::Binary { op: BinOp::And, left, .. } => match &left.kind {
                ExprKind::Binary { op: BinOp::Eq, left, .. } => {
                    assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Add, .. }));
                }
                _ => panic!("expected equality"),
            },
            _ => panic!("expected and"),
        }
    }

    #[test]
    fn test_parse_postfix_chain() {
        let module = parse("a.b[0].c(1, 2);");
        let StmtKind::Expr(expr) = &module.stmts[0].kind else {
            panic!("expected expression statement");
        };
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(callee.kind, ExprKind::Member { .. }));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
            func f() {
                if (a) { } else if (b) { } else { }
                while (c) { break; }
                do { continue; } while (d);
                for (int:i = 0; i < 10; i = i + 1) { }
            }
        "#;
        let module = parse(source);
        let StmtKind::Func(f) = &module.stmts[0].kind else {
            panic!("expected function");
        };
        assert_eq!(f.body.stmts.len(), 4);
        assert!(matches!(f.body.stmts[3].kind, StmtKind::For { init: Some(_), step: Some(_), .. }));
    }

    #[test]
    fn test_parse_switchtype_and_modules() {
        let source = r#"
            import std.math as m;
            from util import helper, Point;
            switchtype (x) { case int { } case float { } }
            export helper;
        "#;
        let module = parse(source);
        assert_eq!(module.stmts.len(), 4);
        match &module.stmts[0].kind {
            StmtKind::Import(i) => {
                assert_eq!(i.path, vec!["std".to_string(), "math".to_string()]);
                assert_eq!(i.binding(), "m");
            }
            _ => panic!("expected import"),
        }
        match &module.stmts[1].kind {
            StmtKind::Import(i) => assert_eq!(i.members.len(), 2),
            _ => panic!("expected from-import"),
        }
        match &module.stmts[2].kind {
            StmtKind::SwitchType { cases, .. } => assert_eq!(cases.len(), 2),
            _ => panic!("expected switchtype"),
        }
    }

    #[test]
    fn test_parse_literals() {
        let module = parse(r#"var t = [: 0xFF, 2.5, "a\tb", null, -1];"#);
        let StmtKind::Var { value, .. } = &module.stmts[0].kind else {
            panic!("expected declaration");
        };
        let ExprKind::Tuple(elements) = &value.kind else {
            panic!("expected tuple literal");
        };
        assert!(matches!(elements[0].kind, ExprKind::IntLiteral(255)));
        assert!(matches!(&elements[2].kind, ExprKind::StringLiteral(s) if s == "a\tb"));
        assert!(matches!(elements[3].kind, ExprKind::Null));
        assert!(matches!(elements[4].kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = Parser::new("var = 3;").parse_module().unwrap_err();
        match err {
            CompileError::Parser { span, .. } => assert_eq!(span.start, 4),
            other => panic!("expected parser error, got {other:?}"),
        }
    }
}
