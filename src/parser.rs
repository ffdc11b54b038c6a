use crate::ast::{
    BinaryOperator, Expression, ListAssignMode, Program, Statement, UnaryOperator,
};
use crate::builtins::BuiltinFunction;
use crate::token::{Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

type ParseFn<'a> = fn(&mut Parser<'a>) -> ParseResult<Expression>;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> ParseResult<Self> {
        if !matches!(tokens.last().map(|token| token.kind), Some(TokenKind::EOF)) {
            return Err(ParseError::MissingEof);
        }
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !matches!(self.current(), TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current() {
            TokenKind::Print => self.parse_print(),
            TokenKind::Def => self.parse_function_def(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Pass => {
                self.advance();
                self.expect_statement_end()?;
                Ok(Statement::Pass)
            }
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `print`
        self.expect(TokenKind::LParen, "(")?;
        let args = self.parse_arguments()?;
        self.expect_statement_end()?;
        Ok(Statement::Print(args))
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `def`
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "(")?;

        let mut params = Vec::new();
        while !matches!(self.current(), TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, ")")?;

        let body = self.parse_suite()?;
        Ok(Statement::FunctionDef { name, params, body })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `return`
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_statement_end()?;
        Ok(Statement::Return(value))
    }

    /// Handles both `if` and `elif`; an `elif` chain nests as the sole
    /// statement of the enclosing else-body.
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `if` / `elif`
        let condition = self.parse_expression()?;
        let then_body = self.parse_suite()?;

        let else_body = match self.current() {
            TokenKind::Elif => Some(vec![self.parse_if()?]),
            TokenKind::Else => {
                self.advance();
                Some(self.parse_suite()?)
            }
            _ => None,
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `while`
        let condition = self.parse_expression()?;
        let body = self.parse_suite()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        self.advance(); // Consume `for`
        let var_name = self.expect_identifier()?;
        self.expect(TokenKind::In, "in")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_suite()?;
        Ok(Statement::For {
            var_name,
            iterable,
            body,
        })
    }

    /// Assignment, augmented assignment, element swap, or a call statement.
    fn parse_simple_statement(&mut self) -> ParseResult<Statement> {
        let target = self.parse_expression()?;

        if self.eat(TokenKind::Equal) {
            let value = self.parse_expression()?;
            self.expect_statement_end()?;
            return Self::assignment(target, value);
        }

        if let Some(op) = augmented_operator(self.current()) {
            self.advance();
            let rhs = self.parse_expression()?;
            self.expect_statement_end()?;
            let value = Expression::BinaryOp {
                left: Box::new(target.clone()),
                op,
                right: Box::new(rhs),
            };
            return Self::assignment(target, value);
        }

        if matches!(self.current(), TokenKind::Comma) {
            return self.parse_swap(target);
        }

        self.expect_statement_end()?;
        match target {
            Expression::Call { .. } => Ok(Statement::Expr(target)),
            other => Err(ParseError::ExpectedStatement {
                found: format!("{other:?}"),
            }),
        }
    }

    fn assignment(target: Expression, value: Expression) -> ParseResult<Statement> {
        match target {
            Expression::Variable(name) => Ok(Statement::Assign { name, value }),
            Expression::ListAccess { list, index } => Ok(Statement::ListAssign {
                list: *list,
                index: *index,
                value,
                mode: ListAssignMode::Store,
            }),
            other => Err(ParseError::InvalidAssignmentTarget {
                target: format!("{other:?}"),
            }),
        }
    }

    /// `a[i], a[j] = a[j], a[i]` becomes a single `ListAssign` in swap mode
    /// whose value is the second slot.
    fn parse_swap(&mut self, first: Expression) -> ParseResult<Statement> {
        self.expect(TokenKind::Comma, ",")?;
        let second = self.parse_expression()?;
        self.expect(TokenKind::Equal, "=")?;
        let first_value = self.parse_expression()?;
        self.expect(TokenKind::Comma, ",")?;
        let second_value = self.parse_expression()?;
        self.expect_statement_end()?;

        let is_exchange = first_value == second && second_value == first;
        match first {
            Expression::ListAccess { list, index }
                if is_exchange && matches!(second, Expression::ListAccess { .. }) =>
            {
                Ok(Statement::ListAssign {
                    list: *list,
                    index: *index,
                    value: second,
                    mode: ListAssignMode::Swap,
                })
            }
            _ => Err(ParseError::UnsupportedTupleAssignment),
        }
    }

    fn parse_suite(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(TokenKind::Colon, ":")?;
        if !matches!(self.current(), TokenKind::Newline) {
            return Ok(vec![self.parse_statement()?]);
        }
        self.advance();
        self.expect(TokenKind::Indent, "indent")?;

        let mut body = Vec::new();
        while !matches!(self.current(), TokenKind::Dedent | TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Dedent, "dedent")?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_and, |kind| match kind {
            TokenKind::Or => Some(BinaryOperator::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::And => Some(BinaryOperator::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOperator::Equal),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Mul),
            TokenKind::Slash => Some(BinaryOperator::Div),
            TokenKind::DoubleSlash => Some(BinaryOperator::FloorDiv),
            TokenKind::Percent => Some(BinaryOperator::Mod),
            _ => None,
        })
    }

    /// One left-associative precedence level.
    fn parse_binary_level(
        &mut self,
        operand: ParseFn<'a>,
        operator: fn(TokenKind<'a>) -> Option<BinaryOperator>,
    ) -> ParseResult<Expression> {
        let mut expr = operand(self)?;
        while let Some(op) = operator(self.current()) {
            self.advance();
            let right = operand(self)?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current() {
            TokenKind::Minus => UnaryOperator::Neg,
            TokenKind::Not => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        while self.eat(TokenKind::LBracket) {
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "]")?;
            expr = Expression::ListAccess {
                list: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let expr = match self.current() {
            TokenKind::Integer(value) => Expression::Number(value),
            TokenKind::Float(value) => Expression::Float(value),
            TokenKind::String(value) => Expression::String(value.to_string()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Identifier(name) => {
                self.advance();
                if !self.eat(TokenKind::LParen) {
                    return Ok(Expression::Variable(name.to_string()));
                }
                let args = self.parse_arguments()?;
                if BuiltinFunction::from_name(name) == Some(BuiltinFunction::Range) {
                    return range_call(args);
                }
                return Ok(Expression::Call {
                    name: name.to_string(),
                    args,
                });
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, ")")?;
                return Ok(expr);
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !matches!(self.current(), TokenKind::RBracket) {
                    elements.push(self.parse_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "]")?;
                return Ok(Expression::List(elements));
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// Parses a comma separated argument list; the opening `(` has already
    /// been consumed.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        while !matches!(self.current(), TokenKind::RParen) {
            args.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        Ok(args)
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.current(), TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::EOF
        )
    }

    /// A statement ends at a newline; a following dedent or EOF also closes
    /// it and is left for the enclosing rule.
    fn expect_statement_end(&mut self) -> ParseResult<()> {
        match self.current() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::EOF => Ok(()),
            _ => Err(self.error("newline")),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current() {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'static>, expected: &'static str) -> ParseResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn eat(&mut self, kind: TokenKind<'static>) -> bool {
        if self.current() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current(&self) -> TokenKind<'a> {
        self.tokens
            .get(self.position)
            .map_or(TokenKind::EOF, |token| token.kind)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: format!("{:?}", self.current()),
        }
    }
}

fn augmented_operator(kind: TokenKind<'_>) -> Option<BinaryOperator> {
    match kind {
        TokenKind::PlusEqual => Some(BinaryOperator::Add),
        TokenKind::MinusEqual => Some(BinaryOperator::Sub),
        TokenKind::StarEqual => Some(BinaryOperator::Mul),
        TokenKind::SlashEqual => Some(BinaryOperator::Div),
        _ => None,
    }
}

fn range_call(args: Vec<Expression>) -> ParseResult<Expression> {
    let found = args.len();
    let mut args = args.into_iter().map(Box::new);
    match (args.next(), args.next(), args.next(), args.next()) {
        (Some(start), end, step, None) => Ok(Expression::Range { start, end, step }),
        _ => Err(ParseError::RangeArity { found }),
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    Parser::new(tokens)?.parse_program()
}
