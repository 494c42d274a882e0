//! Recursive-descent parser producing an [`Expr`] tree.

use super::ExpressionError;
use super::ast::{BinaryOp, Expr, Function, Literal, UnaryOp};
use super::lexer::{Spanned, Token, tokenize};

/// Maximum nesting depth of parentheses, unary operators and calls.
pub const MAX_DEPTH: usize = 64;

/// Parse a complete expression.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(unexpected(spanned)),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn peek_nth_token(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn next_or_end(&mut self) -> Result<Spanned, ExpressionError> {
        self.advance().ok_or(ExpressionError::UnexpectedEnd)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        let spanned = self.next_or_end()?;
        if spanned.token == expected {
            Ok(())
        } else {
            Err(unexpected(&spanned))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_token(), Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword))
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<T, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        self.nested(|p| {
            let mut left = p.parse_and()?;
            while p.at_keyword("or") || matches!(p.peek_token(), Some(Token::OrOr)) {
                p.advance();
                let right = p.parse_and()?;
                left = binary(BinaryOp::Or, left, right);
            }
            Ok(left)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not()?;
        while self.at_keyword("and") || matches!(self.peek_token(), Some(Token::AndAnd)) {
            self.advance();
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if self.at_keyword("not") || matches!(self.peek_token(), Some(Token::Bang)) {
            self.advance();
            return self.nested(|p| {
                let operand = p.parse_not()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_additive()?;

        let op = match self.peek_token() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::NotEq),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::LtEq) => Some(BinaryOp::LtEq),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::GtEq) => Some(BinaryOp::GtEq),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(binary(op, left, right));
        }

        if self.at_keyword("in") {
            self.advance();
            let list = self.parse_list()?;
            return Ok(Expr::InList {
                operand: Box::new(left),
                list,
                negated: false,
            });
        }

        let not_in = self.at_keyword("not")
            && matches!(self.peek_nth_token(1), Some(Token::Ident(name)) if name.eq_ignore_ascii_case("in"));
        if not_in {
            self.advance();
            self.advance();
            let list = self.parse_list()?;
            return Ok(Expr::InList {
                operand: Box::new(left),
                list,
                negated: true,
            });
        }

        Ok(left)
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let open = self.next_or_end()?;
        let close = match open.token {
            Token::LParen => Token::RParen,
            Token::LBracket => Token::RBracket,
            _ => return Err(unexpected(&open)),
        };

        let mut items = Vec::new();
        loop {
            items.push(self.parse_or()?);
            let next = self.next_or_end()?;
            if next.token == close {
                break;
            }
            if next.token != Token::Comma {
                return Err(unexpected(&next));
            }
        }
        Ok(items)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek_token() {
            Some(Token::Minus) => {
                self.advance();
                self.nested(|p| {
                    let operand = p.parse_unary()?;
                    Ok(Expr::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    })
                })
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(|p| p.parse_unary())
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.parse_primary()?;
        if matches!(self.peek_token(), Some(Token::Power)) {
            self.advance();
            let exponent = self.nested(|p| p.parse_unary())?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let spanned = self.next_or_end()?;
        match spanned.token {
            Token::Int(v) => Ok(Expr::Literal(Literal::Int(v))),
            Token::Float(v) => Ok(Expr::Literal(Literal::Float(v))),
            Token::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            Token::Quoted(name) => Ok(Expr::Column(name)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(ref name) => self.parse_identifier(name.clone(), &spanned),
            _ => Err(unexpected(&spanned)),
        }
    }

    fn parse_identifier(&mut self, name: String, spanned: &Spanned) -> Result<Expr, ExpressionError> {
        match name.to_ascii_lowercase().as_str() {
            "true" => return Ok(Expr::Literal(Literal::Bool(true))),
            "false" => return Ok(Expr::Literal(Literal::Bool(false))),
            "null" | "none" => return Ok(Expr::Literal(Literal::Null)),
            "and" | "or" | "not" | "in" => return Err(unexpected(spanned)),
            _ => {}
        }

        if name == "df" && matches!(self.peek_token(), Some(Token::LBracket)) {
            self.advance();
            let key = self.next_or_end()?;
            let column = match key.token {
                Token::Str(column) => column,
                _ => return Err(unexpected(&key)),
            };
            self.expect(Token::RBracket)?;
            return Ok(Expr::Column(column));
        }

        if matches!(self.peek_token(), Some(Token::LParen)) {
            let function =
                Function::from_name(&name).ok_or(ExpressionError::UnknownFunction(name))?;
            self.advance();
            let args = self.nested(|p| p.parse_arguments())?;
            function.check_arity(args.len())?;
            return Ok(Expr::Call { function, args });
        }

        Ok(Expr::Column(name))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        if matches!(self.peek_token(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            let next = self.next_or_end()?;
            match next.token {
                Token::RParen => break,
                Token::Comma => continue,
                _ => return Err(unexpected(&next)),
            }
        }
        Ok(args)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unexpected(spanned: &Spanned) -> ExpressionError {
    ExpressionError::UnexpectedToken {
        found: format!("{:?}", spanned.token),
        offset: spanned.offset,
    }
}
