use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// `<pattern> in|of <source>`. The lazy left side lets destructuring patterns
/// contain spaces while the first ` in ` / ` of ` ends the pattern.
static FOR_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\s\S]*?)\s+(?:in|of)\s+([\s\S]*)$").expect("for alias regex is valid")
});

/// Parse a single expression (`:attr`, `v-if`, `v-show`, interpolation, ...)
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a `;`-separated statement list (`@event` handlers, `v-effect`)
pub fn parse_statements(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program(None)?;
    parser.expect_end()?;
    Ok(program)
}

/// Parse a `v-for` header such as `(item, index) in items`
pub fn parse_for_header(source: &str) -> ParseResult<ForHeader> {
    let captures = FOR_ALIAS_RE.captures(source).ok_or_else(|| {
        ParseError::invalid_syntax(0..source.len(), "invalid v-for expression")
    })?;

    let (lhs, source_match) = match (captures.get(1), captures.get(2)) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        _ => {
            return Err(ParseError::invalid_syntax(
                0..source.len(),
                "invalid v-for expression",
            ))
        }
    };

    let source_text = source_match.as_str().trim().to_string();
    let source_expr =
        parse_expression(source_match.as_str()).map_err(|e| e.offset(source_match.start()))?;

    let mut alias = lhs.as_str().trim();
    let mut alias_offset = lhs.start() + (lhs.as_str().len() - lhs.as_str().trim_start().len());
    if alias.starts_with('(') && alias.ends_with(')') && alias.len() >= 2 {
        alias = &alias[1..alias.len() - 1];
        alias_offset += 1;
    }

    let mut parser = Parser::new(alias).map_err(|e| e.offset(alias_offset))?;
    let (value, index, object_index) = parser
        .parse_for_aliases()
        .map_err(|e| e.offset(alias_offset))?;

    Ok(ForHeader {
        value,
        index,
        object_index,
        source: source_expr,
        source_text,
    })
}

/// Recursive-descent parser for directive expressions
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse statements until EOF or the given closing token
    pub fn parse_program(&mut self, until: Option<Token<'src>>) -> ParseResult<Program> {
        let mut statements = Vec::new();

        loop {
            while self.match_token(Token::Semicolon) {}

            if self.is_at_end() {
                break;
            }
            if let Some(end) = &until {
                if self.check(end.clone()) {
                    break;
                }
            }

            statements.push(self.parse_expression()?);

            if !self.match_token(Token::Semicolon) {
                break;
            }
        }

        Ok(Program { statements })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    /// Parse assignment (right associative) and arrow functions
    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        if self.at_arrow_function() {
            return self.parse_arrow_function();
        }

        let start = self.peek_span().start;
        let target = self.parse_conditional()?;

        let operator = match self.peek() {
            Some((Token::Equals, _)) => AssignOp::Assign,
            Some((Token::PlusEquals, _)) => AssignOp::Add,
            Some((Token::MinusEquals, _)) => AssignOp::Subtract,
            Some((Token::StarEquals, _)) => AssignOp::Multiply,
            Some((Token::SlashEquals, _)) => AssignOp::Divide,
            _ => return Ok(target),
        };

        if !target.is_assignable() {
            let span = target.span();
            return Err(ParseError::invalid_syntax(
                span.start..span.end,
                "invalid assignment target",
            ));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expression::Assign {
            target: Box::new(target),
            operator,
            value: Box::new(value),
            span: Span::new(start, self.prev_end()),
        })
    }

    /// `x =>`, `() =>`, `(a, b) =>`
    fn at_arrow_function(&self) -> bool {
        match self.peek() {
            Some((Token::Ident(_), _)) => {
                matches!(self.peek_ahead(1), Some((Token::Arrow, _)))
            }
            Some((Token::LParen, _)) => {
                let mut offset = 1;
                loop {
                    match self.peek_ahead(offset) {
                        Some((Token::RParen, _)) => {
                            return matches!(self.peek_ahead(offset + 1), Some((Token::Arrow, _)))
                        }
                        Some((Token::Ident(_), _)) => {
                            offset += 1;
                            match self.peek_ahead(offset) {
                                Some((Token::Comma, _)) => offset += 1,
                                Some((Token::RParen, _)) => {}
                                _ => return false,
                            }
                        }
                        _ => return false,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_arrow_function(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut params = Vec::new();

        if self.match_token(Token::LParen) {
            while !self.check(Token::RParen) && !self.is_at_end() {
                params.push(self.expect_ident()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        } else {
            params.push(self.expect_ident()?);
        }

        self.expect(Token::Arrow)?;

        let body = if self.match_token(Token::LBrace) {
            let program = self.parse_program(Some(Token::RBrace))?;
            self.expect(Token::RBrace)?;
            ArrowBody::Block(program)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::Arrow {
            params,
            body,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Parse ternary expression
    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let test = self.parse_nullish()?;

        if !self.match_token(Token::Question) {
            return Ok(test);
        }

        let consequent = self.parse_assignment()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_nullish(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_or()?;

        while self.match_token(Token::QuestionQuestion) {
            let right = self.parse_or()?;
            left = self.logical(left, LogicalOp::Nullish, right, start);
        }

        Ok(left)
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_and()?;

        while self.match_token(Token::Or) {
            let right = self.parse_and()?;
            left = self.logical(left, LogicalOp::Or, right, start);
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_equality()?;

        while self.match_token(Token::And) {
            let right = self.parse_equality()?;
            left = self.logical(left, LogicalOp::And, right, start);
        }

        Ok(left)
    }

    /// Parse equality expression (== != === !==)
    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match self.peek() {
                Some((Token::EqualsEquals, _)) => BinaryOp::Equals,
                Some((Token::NotEquals, _)) => BinaryOp::NotEquals,
                Some((Token::StrictEquals, _)) => BinaryOp::StrictEquals,
                Some((Token::StrictNotEquals, _)) => BinaryOp::StrictNotEquals,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = self.binary(left, operator, right, start);
        }

        Ok(left)
    }

    /// Parse comparison expression (< > <= >=)
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_additive()?;

        loop {
            let operator = match self.peek() {
                Some((Token::LAngle, _)) => BinaryOp::LessThan,
                Some((Token::LessThanEquals, _)) => BinaryOp::LessThanOrEqual,
                Some((Token::RAngle, _)) => BinaryOp::GreaterThan,
                Some((Token::GreaterThanEquals, _)) => BinaryOp::GreaterThanOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.binary(left, operator, right, start);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match self.peek() {
                Some((Token::Plus, _)) => BinaryOp::Add,
                Some((Token::Minus, _)) => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(left, operator, right, start);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut left = self.parse_unary()?;

        loop {
            let operator = match self.peek() {
                Some((Token::Star, _)) => BinaryOp::Multiply,
                Some((Token::Slash, _)) => BinaryOp::Divide,
                Some((Token::Percent, _)) => BinaryOp::Remainder,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(left, operator, right, start);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;

        let operator = match self.peek() {
            Some((Token::Bang, _)) => UnaryOp::Not,
            Some((Token::Minus, _)) => UnaryOp::Negate,
            Some((Token::Plus, _)) => UnaryOp::Plus,
            Some((Token::Typeof, _)) => UnaryOp::Typeof,
            Some((Token::PlusPlus, _)) | Some((Token::MinusMinus, _)) => {
                let operator = if self.check(Token::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let target = self.parse_unary()?;
                return self.update(target, operator, true, start);
            }
            _ => return self.parse_postfix(),
        };

        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Postfix `++` / `--`
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let expr = self.parse_call_member()?;

        if self.match_token(Token::PlusPlus) {
            return self.update(expr, UpdateOp::Increment, false, start);
        }
        if self.match_token(Token::MinusMinus) {
            return self.update(expr, UpdateOp::Decrement, false, start);
        }

        Ok(expr)
    }

    /// Member access, computed access and calls, left to right
    fn parse_call_member(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(Token::Dot) {
                let property = self.expect_property_name()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::OptionalDot) {
                let property = self.expect_property_name()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                    optional: true,
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span: Span::new(start, self.prev_end()),
                };
            } else if self.match_token(Token::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                    span: Span::new(start, self.prev_end()),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        while !self.check(Token::RParen) && !self.is_at_end() {
            arguments.push(self.parse_expression()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let span = self.peek_span();
        let start = span.start;

        match self.peek().cloned() {
            Some((Token::Number(n), _)) => {
                self.advance();
                let value = n.parse::<f64>().map_err(|_| {
                    ParseError::invalid_syntax(span.clone(), format!("invalid number {}", n))
                })?;
                Ok(Expression::Number {
                    value,
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::String(raw), _)) => {
                self.advance();
                Ok(Expression::String {
                    value: unescape(&raw[1..raw.len() - 1]),
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::Template(raw), _)) => {
                self.advance();
                let parts = parse_template_parts(&raw[1..raw.len() - 1], start + 1)?;
                Ok(Expression::Template {
                    parts,
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::True, _)) => {
                self.advance();
                Ok(Expression::Boolean {
                    value: true,
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::False, _)) => {
                self.advance();
                Ok(Expression::Boolean {
                    value: false,
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::Null, _)) => {
                self.advance();
                Ok(Expression::Null {
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::Undefined, _)) => {
                self.advance();
                Ok(Expression::Undefined {
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::Ident(name), _)) => {
                self.advance();
                Ok(Expression::Identifier {
                    name: name.to_string(),
                    span: Span::new(start, span.end),
                })
            }
            Some((Token::LParen, _)) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some((Token::LBracket, _)) => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(Token::RBracket) && !self.is_at_end() {
                    elements.push(self.parse_expression()?);
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expression::Array {
                    elements,
                    span: Span::new(start, self.prev_end()),
                })
            }
            Some((Token::LBrace, _)) => {
                self.advance();
                self.parse_object_literal(start)
            }
            Some(_) => Err(ParseError::unexpected_token(
                span,
                "expression",
                Self::format_token(self.peek()),
            )),
            None => Err(ParseError::unexpected_eof(span.start, "expression")),
        }
    }

    /// Object literal body, after the opening `{`
    fn parse_object_literal(&mut self, start: usize) -> ParseResult<Expression> {
        let mut properties = Vec::new();

        while !self.check(Token::RBrace) && !self.is_at_end() {
            let key_span = self.peek_span();
            let (key, shorthand_ok) = match self.peek().cloned() {
                Some((Token::Ident(name), _)) => (name.to_string(), true),
                Some((Token::String(raw), _)) => (unescape(&raw[1..raw.len() - 1]), false),
                Some((Token::Number(n), _)) => (n.to_string(), false),
                other => match other.as_ref().and_then(|(token, _)| keyword_name(token)) {
                    Some(name) => (name.to_string(), false),
                    None => {
                        return Err(ParseError::unexpected_token(
                            key_span,
                            "property name",
                            Self::format_token(self.peek()),
                        ))
                    }
                },
            };
            self.advance();

            let value = if self.match_token(Token::Colon) {
                self.parse_expression()?
            } else if shorthand_ok {
                Expression::Identifier {
                    name: key.clone(),
                    span: Span::new(key_span.start, key_span.end),
                }
            } else {
                return Err(ParseError::unexpected_token(
                    self.peek_span(),
                    "':'",
                    Self::format_token(self.peek()),
                ));
            };

            properties.push(ObjectProperty { key, value });

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(Expression::Object {
            properties,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// `value [, index [, objectIndex]]` on the left of `in` / `of`
    fn parse_for_aliases(&mut self) -> ParseResult<(BindingPattern, Option<String>, Option<String>)> {
        let value = self.parse_binding_pattern()?;
        let index = if self.match_token(Token::Comma) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let object_index = if index.is_some() && self.match_token(Token::Comma) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect_end()?;
        Ok((value, index, object_index))
    }

    fn parse_binding_pattern(&mut self) -> ParseResult<BindingPattern> {
        if self.match_token(Token::LBracket) {
            let mut elements = Vec::new();
            while !self.check(Token::RBracket) && !self.is_at_end() {
                if self.match_token(Token::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.parse_binding_pattern()?));
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBracket)?;
            return Ok(BindingPattern::Array { elements });
        }

        if self.match_token(Token::LBrace) {
            let mut fields = Vec::new();
            while !self.check(Token::RBrace) && !self.is_at_end() {
                let key = self.expect_ident()?;
                let binding = if self.match_token(Token::Colon) {
                    self.parse_binding_pattern()?
                } else {
                    BindingPattern::Identifier { name: key.clone() }
                };
                fields.push(ObjectPatternField { key, binding });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace)?;
            return Ok(BindingPattern::Object { fields });
        }

        Ok(BindingPattern::Identifier {
            name: self.expect_ident()?,
        })
    }

    fn binary(
        &self,
        left: Expression,
        operator: BinaryOp,
        right: Expression,
        start: usize,
    ) -> Expression {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::new(start, self.prev_end()),
        }
    }

    fn logical(
        &self,
        left: Expression,
        operator: LogicalOp,
        right: Expression,
        start: usize,
    ) -> Expression {
        Expression::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::new(start, self.prev_end()),
        }
    }

    fn update(
        &self,
        target: Expression,
        operator: UpdateOp,
        prefix: bool,
        start: usize,
    ) -> ParseResult<Expression> {
        if !target.is_assignable() {
            let span = target.span();
            return Err(ParseError::invalid_syntax(
                span.start..span.end,
                "invalid update target",
            ));
        }
        Ok(Expression::Update {
            target: Box::new(target),
            operator,
            prefix,
            span: Span::new(start, self.prev_end()),
        })
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            return Ok(());
        }
        if self.is_at_end() {
            return Err(ParseError::unexpected_eof(
                self.peek_span().start,
                format!("'{}'", token),
            ));
        }
        Err(ParseError::unexpected_token(
            self.peek_span(),
            format!("'{}'", token),
            Self::format_token(self.peek()),
        ))
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(
                self.peek_span().start,
                "identifier",
            )),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "identifier",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// After `.` any identifier-like word is a valid property (`item.null`)
    fn expect_property_name(&mut self) -> ParseResult<String> {
        if let Some((token, _)) = self.peek() {
            if let Some(name) = keyword_name(token) {
                self.advance();
                return Ok(name.to_string());
            }
        }
        self.expect_ident()
    }

    fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(ParseError::unexpected_token(
                self.peek_span(),
                "end of expression",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// End offset of the token we just consumed
    fn prev_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    /// Get the span of the next token (the one we're about to consume)
    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                // If we're at EOF, use the end of the last token
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }

    /// Format a token for display in error messages
    fn format_token(token: Option<&(Token, Range<usize>)>) -> String {
        match token {
            None => "end of input".to_string(),
            Some((token, _)) => match token {
                Token::Ident(_) | Token::String(_) | Token::Template(_) | Token::Number(_) => {
                    token.to_string()
                }
                other => format!("'{}'", other),
            },
        }
    }
}

fn keyword_name(token: &Token) -> Option<&'static str> {
    match token {
        Token::True => Some("true"),
        Token::False => Some("false"),
        Token::Null => Some("null"),
        Token::Undefined => Some("undefined"),
        Token::Typeof => Some("typeof"),
        _ => None,
    }
}

/// Split the body of a backtick literal into literal text and `${}` parts.
/// `base` is the offset of the body inside the expression source.
fn parse_template_parts(body: &str, base: usize) -> ParseResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let bytes = body.as_bytes();
    let mut i = 0;

    while i < body.len() {
        match bytes[i] {
            b'\\' => {
                let rest = &body[i + 1..];
                let escape_len = match rest.chars().next() {
                    Some('u') => 1 + rest[1..].chars().take(4).map(char::len_utf8).sum::<usize>(),
                    Some(c) => c.len_utf8(),
                    None => 0,
                };
                literal.push_str(&unescape(&body[i..i + 1 + escape_len]));
                i += 1 + escape_len;
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let expr_start = i + 2;
                let expr_end = find_closing_brace(body, expr_start).ok_or_else(|| {
                    ParseError::unexpected_eof(base + body.len(), "'}' closing template part")
                })?;
                let expr = parse_expression(&body[expr_start..expr_end])
                    .map_err(|e| e.offset(base + expr_start))?;
                parts.push(TemplatePart::Expression(expr));
                i = expr_end + 1;
            }
            _ => {
                let ch_len = body[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                literal.push_str(&body[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(parts)
}

/// Index of the `}` matching an already-open `${`, skipping nested braces and
/// quoted strings
fn find_closing_brace(body: &str, from: usize) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 1;
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}

/// Resolve backslash escapes in a string literal body
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
