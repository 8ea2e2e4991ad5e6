use std::{iter::Peekable, rc::Rc, slice::Iter};

use log::trace;

use crate::{
    ast::{BinOp, Block, FuncDecl, Ident, Node, NodeKind, Param, TypeName, UnaryOp},
    error::{syntax_error, Error, ErrorMsg},
    token::{Position, Span, Token, TokenKind},
};

const COMPARISONS: &[TokenKind] = &[
    TokenKind::EQUAL_EQUAL,
    TokenKind::BANG_EQUAL,
    TokenKind::GREATER,
    TokenKind::GREATER_EQUAL,
    TokenKind::LESS,
    TokenKind::LESS_EQUAL,
];

/// Deepest nesting of expressions and blocks the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
            depth: 0,
        }
    }

    /// Parses the whole token stream into the top-level statement block.
    /// The stream must be terminated by an `EOF` token.
    pub fn parse_all(mut self) -> Result<Block, Error> {
        let start = self.current()?.span.start;
        let mut items = Vec::default();
        while !self.check(TokenKind::EOF)? {
            items.push(self.parse_item()?);
        }
        let eof = self.advance_or_err(TokenKind::EOF)?;
        trace!("Parsed {} top-level statements", items.len());
        Ok(Block::new(items, Span::new(start, eof.span.end)))
    }

    pub fn parse_item(&mut self) -> Result<Node, Error> {
        let token = self.current()?;
        let item = match token.kind {
            TokenKind::IF => return self.parse_if_stmt(),
            TokenKind::WHILE => return self.parse_while_stmt(),
            TokenKind::FUNCTION => return self.parse_function(),
            TokenKind::LBRACE => {
                let block = self.parse_block()?;
                let span = block.span;
                return Ok(Node::new(NodeKind::Block(block), span));
            }
            TokenKind::RETURN => self.parse_return(),
            TokenKind::BREAK => {
                self.advance();
                Ok(Node::new(NodeKind::Break, token.span))
            }
            TokenKind::CONTINUE => {
                self.advance();
                Ok(Node::new(NodeKind::Continue, token.span))
            }
            _ => self.parse_expr(),
        }?;
        self.advance_or_err(TokenKind::SEMICOLON)?;
        Ok(item)
    }

    fn parse_block(&mut self) -> Result<Block, Error> {
        self.nested(Self::parse_block_items)
    }

    fn parse_block_items(&mut self) -> Result<Block, Error> {
        let open = self.advance_or_err(TokenKind::LBRACE)?;
        let mut items = Vec::default();
        while !self.check(TokenKind::RBRACE)? && !self.check(TokenKind::EOF)? {
            items.push(self.parse_item()?);
        }
        let close = self.advance_or_err(TokenKind::RBRACE)?;
        Ok(Block::new(items, open.span.to(close.span)))
    }

    fn parse_if_stmt(&mut self) -> Result<Node, Error> {
        // Consume the `if` keyword
        let start = self.advance_or_err(TokenKind::IF)?.span;
        let mut cases = vec![self.parse_case()?];
        while self
            .advance_if(|t| t.kind == TokenKind::ELSEIF)
            .is_some()
        {
            cases.push(self.parse_case()?);
        }
        let else_block = if self.advance_if(|t| t.kind == TokenKind::ELSE).is_some() {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = match &else_block {
            Some(block) => block.span,
            // There is always at least one case
            None => cases.last().map_or(start, |(_, block)| block.span),
        };

        Ok(Node::new(
            NodeKind::If { cases, else_block },
            start.to(end),
        ))
    }

    fn parse_case(&mut self) -> Result<(Node, Block), Error> {
        let condition = self.parse_condition()?;
        let block = self.parse_block()?;
        Ok((condition, block))
    }

    fn parse_condition(&mut self) -> Result<Node, Error> {
        self.advance_or_err(TokenKind::LPAREN)?;
        let condition = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN)?;
        Ok(condition)
    }

    fn parse_while_stmt(&mut self) -> Result<Node, Error> {
        // Consume the `while` keyword
        let start = self.advance_or_err(TokenKind::WHILE)?.span;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        let span = start.to(body.span);

        Ok(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body,
            },
            span,
        ))
    }

    fn parse_function(&mut self) -> Result<Node, Error> {
        // Consume the `function` keyword
        let start = self.advance_or_err(TokenKind::FUNCTION)?.span;
        let ident = self.parse_ident()?;
        self.advance_or_err(TokenKind::LPAREN)?;
        let mut params = vec![];
        if self.check(TokenKind::IDENT)? {
            params.push(self.parse_param()?);
            while self.advance_if(|t| t.kind == TokenKind::COMMA).is_some() {
                params.push(self.parse_param()?);
            }
        }
        self.advance_or_err(TokenKind::RPAREN)?;
        self.advance_or_err(TokenKind::ARROW)?;
        let return_type = self.parse_type(true)?;
        let body = self.parse_block()?;
        let span = start.to(body.span);

        Ok(Node::new(
            NodeKind::Function(Rc::new(FuncDecl {
                ident,
                params,
                return_type,
                body,
            })),
            span,
        ))
    }

    fn parse_param(&mut self) -> Result<Param, Error> {
        let ident = self.parse_ident()?;
        self.advance_or_err(TokenKind::COLON)?;
        let ty = self.parse_type(false)?;
        Ok(Param { ident, ty })
    }

    fn parse_type(&mut self, include_void: bool) -> Result<TypeName, Error> {
        let token = self.current()?;
        let accepted = token.kind.is_type() || (include_void && token.kind == TokenKind::VOID);
        match TypeName::from_token(token.kind).filter(|_| accepted) {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None if include_void => Err(syntax_error(token, ErrorMsg::ExpectedReturnType)),
            None => Err(syntax_error(token, ErrorMsg::ExpectedType)),
        }
    }

    fn parse_return(&mut self) -> Result<Node, Error> {
        // Consume the `return` keyword
        let start = self.advance_or_err(TokenKind::RETURN)?.span;
        if self.check(TokenKind::SEMICOLON)? {
            return Ok(Node::new(NodeKind::Return(None), start));
        }
        let value = self.parse_expr()?;
        let span = start.to(value.span);

        Ok(Node::new(NodeKind::Return(Some(Box::new(value))), span))
    }

    pub fn parse_expr(&mut self) -> Result<Node, Error> {
        self.nested(Self::parse_expr_inner)
    }

    fn parse_expr_inner(&mut self) -> Result<Node, Error> {
        let token = self.current()?;
        // A declaration starts with a type, a plain assignment is an
        // identifier directly followed by `=`. Anything else is an expression.
        let is_assignment = token.kind.is_type()
            || (token.kind == TokenKind::IDENT
                && self.peek_second().is_some_and(|t| t.kind == TokenKind::EQUAL));
        if is_assignment {
            self.parse_assignment()
        } else {
            self.parse_logical()
        }
    }

    fn parse_assignment(&mut self) -> Result<Node, Error> {
        let start = self.current()?.span;
        let ty = if self.current()?.kind.is_type() {
            Some(self.parse_type(false)?)
        } else {
            None
        };
        let ident = self.parse_ident()?;
        self.advance_or_err(TokenKind::EQUAL)?;
        let value = self.parse_expr()?;
        let span = start.to(value.span);

        Ok(Node::new(
            NodeKind::Assignment {
                ty,
                ident,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_logical(&mut self) -> Result<Node, Error> {
        self.parse_binary(Self::parse_comparison, &[TokenKind::AND, TokenKind::OR])
    }

    fn parse_comparison(&mut self) -> Result<Node, Error> {
        if let Some(op) = self.advance_if(|t| t.kind == TokenKind::NOT) {
            let expr = self.nested(Self::parse_comparison)?;
            let span = op.span.to(expr.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_binary(Self::parse_term, COMPARISONS)
    }

    fn parse_term(&mut self) -> Result<Node, Error> {
        self.parse_binary(Self::parse_factor, &[TokenKind::PLUS, TokenKind::MINUS])
    }

    fn parse_factor(&mut self) -> Result<Node, Error> {
        self.parse_binary(Self::parse_unary, &[TokenKind::STAR, TokenKind::SLASH])
    }

    /// Parses a left-associative chain of `operand (op operand)*`.
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Node, Error>,
        ops: &[TokenKind],
    ) -> Result<Node, Error> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.advance_if(|t| ops.contains(&t.kind)) {
            // Infallible unwrap as we are ensuring the right token kind above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = operand(self)?;
            let span = lhs.span.to(rhs.span);
            lhs = Node::new(
                NodeKind::Binary {
                    lhs: Box::new(lhs),
                    op: bin_op,
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, Error> {
        if let Some(op) = self.advance_if(|t| matches!(t.kind, TokenKind::PLUS | TokenKind::MINUS))
        {
            let expr = self.nested(Self::parse_unary)?;
            let span = op.span.to(expr.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    // Infallible unwrap as we are ensuring the right token kind above
                    op: UnaryOp::from_token(op.kind)
                        .expect("non-unary operators cannot be present here"),
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Node, Error> {
        let token = self.current()?;
        match token.kind {
            TokenKind::IDENT => match self.peek_second().map(|t| t.kind) {
                Some(TokenKind::LPAREN) => self.parse_func_call(),
                Some(TokenKind::AMPERSAND) => {
                    let ident = self.parse_ident()?;
                    let span = ident.span;
                    self.parse_phys(Node::new(NodeKind::Var(ident), span))
                }
                _ => {
                    let ident = self.parse_ident()?;
                    let span = ident.span;
                    Ok(Node::new(NodeKind::Var(ident), span))
                }
            },
            TokenKind::LPAREN => self.parse_group(),
            _ => self.parse_value(),
        }
    }

    fn parse_group(&mut self) -> Result<Node, Error> {
        let open = self.advance_or_err(TokenKind::LPAREN)?;
        let mut expr = self.parse_expr()?;
        let close = self.advance_or_err(TokenKind::RPAREN)?;
        expr.span = open.span.to(close.span);
        Ok(expr)
    }

    fn parse_value(&mut self) -> Result<Node, Error> {
        let token = self.current()?;
        let kind = match token.kind {
            TokenKind::INT_LIT | TokenKind::DOUBLE_LIT => {
                let magnitude = self.parse_number()?;
                if self.check(TokenKind::AMPERSAND)? {
                    return self.parse_phys(magnitude);
                }
                return Ok(magnitude);
            }
            TokenKind::PIPE => return self.parse_unit(),
            TokenKind::STRING_LIT | TokenKind::CHAR_LIT => {
                NodeKind::Str(strip_delimiters(token.lexeme()).to_string())
            }
            TokenKind::TRUE => NodeKind::Bool(true),
            TokenKind::FALSE => NodeKind::Bool(false),
            _ => return Err(syntax_error(token, ErrorMsg::ExpectedExpression)),
        };
        self.advance();
        Ok(Node::new(kind, token.span))
    }

    fn parse_number(&mut self) -> Result<Node, Error> {
        let token = self.current()?;
        let kind = match token.kind {
            TokenKind::INT_LIT => NodeKind::Int(
                token
                    .lexeme()
                    .parse()
                    .map_err(|_| syntax_error(token, ErrorMsg::IntOutOfRange))?,
            ),
            TokenKind::DOUBLE_LIT => {
                let n: f64 = token
                    .lexeme()
                    .parse()
                    .map_err(|_| syntax_error(token, ErrorMsg::DoubleOutOfRange))?;
                if !n.is_finite() {
                    return Err(syntax_error(token, ErrorMsg::DoubleOutOfRange));
                }
                NodeKind::Double(n)
            }
            _ => return Err(syntax_error(token, ErrorMsg::ExpectedMagnitude)),
        };
        self.advance();
        Ok(Node::new(kind, token.span))
    }

    fn parse_phys(&mut self, magnitude: Node) -> Result<Node, Error> {
        self.advance_or_err(TokenKind::AMPERSAND)?;
        let unit = self.parse_unit()?;
        let span = magnitude.span.to(unit.span);
        Ok(Node::new(
            NodeKind::Phys {
                magnitude: Box::new(magnitude),
                unit: Box::new(unit),
            },
            span,
        ))
    }

    /// `| ident (* ident)* [/ ident (* ident)*] |`, where a lone `1`
    /// stands for an empty nominator.
    fn parse_unit(&mut self) -> Result<Node, Error> {
        let open = self.advance_or_err(TokenKind::PIPE)?;
        let token = self.current()?;
        let nominator = match token.kind {
            TokenKind::IDENT => self.parse_unit_factors()?,
            TokenKind::INT_LIT if token.lexeme() == "1" => {
                self.advance();
                vec![]
            }
            _ => return Err(syntax_error(token, ErrorMsg::ExpectedUnitNumerator)),
        };
        let denominator = if self.advance_if(|t| t.kind == TokenKind::SLASH).is_some() {
            self.parse_unit_factors()?
        } else {
            vec![]
        };
        let close = self.advance_or_err(TokenKind::PIPE)?;

        Ok(Node::new(
            NodeKind::Unit {
                nominator,
                denominator,
            },
            open.span.to(close.span),
        ))
    }

    fn parse_unit_factors(&mut self) -> Result<Vec<Ident>, Error> {
        let mut factors = vec![self.parse_ident()?];
        while self.advance_if(|t| t.kind == TokenKind::STAR).is_some() {
            factors.push(self.parse_ident()?);
        }
        Ok(factors)
    }

    fn parse_func_call(&mut self) -> Result<Node, Error> {
        let ident = self.parse_ident()?;
        self.advance_or_err(TokenKind::LPAREN)?;
        let mut args = vec![];
        if !self.check(TokenKind::RPAREN)? {
            loop {
                args.push(self.parse_expr()?);
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                    break;
                }
            }
        }
        let close = self.advance_or_err(TokenKind::RPAREN)?;
        let span = ident.span.to(close.span);

        Ok(Node::new(NodeKind::Call { ident, args }, span))
    }

    fn parse_ident(&mut self) -> Result<Ident, Error> {
        let token = self.advance_or_err(TokenKind::IDENT)?;
        Ok(Ident::new(token.lexeme(), token.span))
    }

    /// Runs `parse` one nesting level deeper, failing once the
    /// nesting exceeds `MAX_NESTING_DEPTH`.
    fn nested<T>(&mut self, parse: fn(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(syntax_error(self.current()?, ErrorMsg::NestingTooDeep));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn current(&mut self) -> Result<&'a Token, Error> {
        self.stream.peek().copied().ok_or_else(Self::eof_error)
    }

    fn peek_second(&self) -> Option<&'a Token> {
        self.stream.clone().nth(1)
    }

    fn check(&mut self, kind: TokenKind) -> Result<bool, Error> {
        Ok(self.current()?.kind == kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        self.stream.next()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind) -> Result<&'a Token, Error> {
        let token = self.current()?;
        if token.kind == kind {
            self.advance();
            Ok(token)
        } else {
            Err(syntax_error(token, kind))
        }
    }

    fn eof_error() -> Error {
        Error::Syntax {
            pos: Position::default(),
            expected: TokenKind::EOF.to_string(),
            found: "end of stream".to_string(),
        }
    }
}

fn strip_delimiters(literal: &str) -> &str {
    literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;

    fn parse_test(input: &str, expected: Vec<Node>) {
        let tokens = Lexer::new(input).lex_all().unwrap();
        let source = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(source.items, expected);
    }

    fn parse_err_test(input: &str, expected: &str) {
        let tokens = Lexer::new(input).lex_all().unwrap();
        let err = Parser::new(&tokens).parse_all().unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    fn node(kind: NodeKind) -> Node {
        Node::new(kind, Span::default())
    }

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    fn var(name: &str) -> Node {
        node(NodeKind::Var(ident(name)))
    }

    fn int(n: i64) -> Node {
        node(NodeKind::Int(n))
    }

    fn block(items: Vec<Node>) -> Block {
        Block::new(items, Span::default())
    }

    fn binary(lhs: Node, op: BinOp, rhs: Node) -> Node {
        node(NodeKind::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    fn unit(nominator: &[&str], denominator: &[&str]) -> Node {
        node(NodeKind::Unit {
            nominator: nominator.iter().map(|n| ident(n)).collect(),
            denominator: denominator.iter().map(|n| ident(n)).collect(),
        })
    }

    #[test]
    fn literals() {
        parse_test(
            r#"1; 1.5; "text"; 'c'; true; false;"#,
            vec![
                int(1),
                node(NodeKind::Double(1.5)),
                node(NodeKind::Str("text".to_string())),
                node(NodeKind::Str("c".to_string())),
                node(NodeKind::Bool(true)),
                node(NodeKind::Bool(false)),
            ],
        );
    }

    #[test]
    fn unit_literal() {
        parse_test(
            "|m*m/s*n*x|; |1/s|; |kg|;",
            vec![
                unit(&["m", "m"], &["s", "n", "x"]),
                unit(&[], &["s"]),
                unit(&["kg"], &[]),
            ],
        );
    }

    #[test]
    fn phys_literal() {
        parse_test(
            "3&|m/s|; 2.5 & |kg|; x&|m|;",
            vec![
                node(NodeKind::Phys {
                    magnitude: Box::new(int(3)),
                    unit: Box::new(unit(&["m"], &["s"])),
                }),
                node(NodeKind::Phys {
                    magnitude: Box::new(node(NodeKind::Double(2.5))),
                    unit: Box::new(unit(&["kg"], &[])),
                }),
                node(NodeKind::Phys {
                    magnitude: Box::new(var("x")),
                    unit: Box::new(unit(&["m"], &[])),
                }),
            ],
        );
    }

    #[test]
    fn precedence() {
        parse_test(
            "1 + 2 * 3 < 4 and not x == -5;",
            vec![binary(
                binary(
                    binary(int(1), BinOp::Plus, binary(int(2), BinOp::Star, int(3))),
                    BinOp::Less,
                    int(4),
                ),
                BinOp::And,
                node(NodeKind::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(binary(
                        var("x"),
                        BinOp::EqualEqual,
                        node(NodeKind::Unary {
                            op: UnaryOp::Minus,
                            expr: Box::new(int(5)),
                        }),
                    )),
                }),
            )],
        );
    }

    #[test]
    fn left_associative() {
        parse_test(
            "8 - 4 - 2; a or b and c;",
            vec![
                binary(binary(int(8), BinOp::Minus, int(4)), BinOp::Minus, int(2)),
                binary(binary(var("a"), BinOp::Or, var("b")), BinOp::And, var("c")),
            ],
        );
    }

    #[test]
    fn grouping() {
        parse_test(
            "(1 + 2) * 3;",
            vec![binary(
                binary(int(1), BinOp::Plus, int(2)),
                BinOp::Star,
                int(3),
            )],
        );
    }

    #[test]
    fn assignment() {
        parse_test(
            "int x = 5; x = x + 1; x;",
            vec![
                node(NodeKind::Assignment {
                    ty: Some(TypeName::Int),
                    ident: ident("x"),
                    value: Box::new(int(5)),
                }),
                node(NodeKind::Assignment {
                    ty: None,
                    ident: ident("x"),
                    value: Box::new(binary(var("x"), BinOp::Plus, int(1))),
                }),
                var("x"),
            ],
        );
    }

    #[test]
    fn typed_declarations() {
        parse_test(
            "phys v = 3&|m/s|; unit u = |a*s/c|;",
            vec![
                node(NodeKind::Assignment {
                    ty: Some(TypeName::Phys),
                    ident: ident("v"),
                    value: Box::new(node(NodeKind::Phys {
                        magnitude: Box::new(int(3)),
                        unit: Box::new(unit(&["m"], &["s"])),
                    })),
                }),
                node(NodeKind::Assignment {
                    ty: Some(TypeName::Unit),
                    ident: ident("u"),
                    value: Box::new(unit(&["a", "s"], &["c"])),
                }),
            ],
        );
    }

    #[test]
    fn if_stmt() {
        parse_test(
            r#"if (x < 4) { 1; } elseif (x > 6) { 2; } elseif (x == 5) { 3; } else { "x"; }"#,
            vec![node(NodeKind::If {
                cases: vec![
                    (binary(var("x"), BinOp::Less, int(4)), block(vec![int(1)])),
                    (binary(var("x"), BinOp::Greater, int(6)), block(vec![int(2)])),
                    (
                        binary(var("x"), BinOp::EqualEqual, int(5)),
                        block(vec![int(3)]),
                    ),
                ],
                else_block: Some(block(vec![node(NodeKind::Str("x".to_string()))])),
            })],
        );
    }

    #[test]
    fn while_stmt() {
        parse_test(
            "while (true) { 1; break; continue; }",
            vec![node(NodeKind::While {
                condition: Box::new(node(NodeKind::Bool(true))),
                body: block(vec![int(1), node(NodeKind::Break), node(NodeKind::Continue)]),
            })],
        );
    }

    #[test]
    fn function() {
        parse_test(
            "function add (a:int, b:int)->int{ return a+b; } function nop()->void{ return; }",
            vec![
                node(NodeKind::Function(Rc::new(FuncDecl {
                    ident: ident("add"),
                    params: vec![
                        Param {
                            ident: ident("a"),
                            ty: TypeName::Int,
                        },
                        Param {
                            ident: ident("b"),
                            ty: TypeName::Int,
                        },
                    ],
                    return_type: TypeName::Int,
                    body: block(vec![node(NodeKind::Return(Some(Box::new(binary(
                        var("a"),
                        BinOp::Plus,
                        var("b"),
                    )))))]),
                }))),
                node(NodeKind::Function(Rc::new(FuncDecl {
                    ident: ident("nop"),
                    params: vec![],
                    return_type: TypeName::Void,
                    body: block(vec![node(NodeKind::Return(None))]),
                }))),
            ],
        );
    }

    #[test]
    fn call() {
        parse_test(
            "f(); g(1, x * 2);",
            vec![
                node(NodeKind::Call {
                    ident: ident("f"),
                    args: vec![],
                }),
                node(NodeKind::Call {
                    ident: ident("g"),
                    args: vec![int(1), binary(var("x"), BinOp::Star, int(2))],
                }),
            ],
        );
    }

    #[test]
    fn empty_program() {
        parse_test("", vec![]);
        parse_test("{ }", vec![node(NodeKind::Block(block(vec![])))]);
    }

    #[test]
    fn spans() {
        let tokens = Lexer::new("int x = 1 + 23;").lex_all().unwrap();
        let source = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(
            source.items[0].span,
            Span::new(Position::new(0, 0), Position::new(0, 14))
        );
    }

    #[test]
    fn missing_semicolon() {
        parse_err_test(
            "int x = 1",
            "Syntax error at line 2, column 1: expected ;, found end of text",
        );
    }

    #[test]
    fn missing_closing_paren() {
        parse_err_test(
            "(1 + 2 * 3;",
            "Syntax error at line 1, column 11: expected ), found ;",
        );
    }

    #[test]
    fn missing_closing_brace() {
        parse_err_test(
            "while (true) { a;",
            "Syntax error at line 2, column 1: expected }, found end of text",
        );
    }

    #[test]
    fn missing_return_type() {
        parse_err_test(
            "function f(a: int) { return a; }",
            "Syntax error at line 1, column 20: expected ->, found {",
        );
        parse_err_test(
            "function f(a: void) -> int { return 1; }",
            "Syntax error at line 1, column 15: expected one of int, double, bool, string, phys, unit, found void",
        );
    }

    #[test]
    fn bad_unit_nominator() {
        parse_err_test(
            "|2/s|;",
            "Syntax error at line 1, column 2: expected identifier or 1, found 2",
        );
    }

    /// Parses on a roomy stack, returning the number of top-level items.
    fn parse_deep(input: String) -> Result<usize, Error> {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || {
                let tokens = Lexer::new(&input).lex_all().unwrap();
                Parser::new(&tokens).parse_all().map(|block| block.items.len())
            })
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn nesting_limit() {
        let nest = |depth: usize| format!("{}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_deep(nest(MAX_NESTING_DEPTH - 1)), Ok(1));

        let err = parse_deep(nest(3000)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Syntax error at line 1, column 257: expected expression nested at most 256 levels deep, found ("
        );

        let err = parse_deep(format!("{}1;", "-".repeat(3000))).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = parse_deep(format!("{}{}", "{".repeat(3000), "}".repeat(3000))).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn integer_out_of_range() {
        parse_err_test(
            "99999999999999999999;",
            "Syntax error at line 1, column 1: expected integer literal within 64-bit range, found 99999999999999999999",
        );
    }
}
