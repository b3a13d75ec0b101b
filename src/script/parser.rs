//! Recursive descent parser producing a name-resolved AST.
//!
//! Every identifier is resolved while parsing: routine inputs (`i`, `count`,
//! `time`), the two buffers, `Math.*` members and declared locals. Anything
//! else is a compile error, so a parsed [`Program`] can only fail at run time
//! on buffer bounds or its step budget.

use super::lexer::{Token, TokenKind};
use crate::error::CompileError;

// ─── AST Types ──────────────────────────────────────────────────────────

/// A parsed routine body.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// Number of local variable slots.
    pub slots: usize,
}

/// Read-only values supplied by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Index,
    Count,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Buffer {
    Positions,
    Colors,
}

impl Buffer {
    pub fn name(self) -> &'static str {
        match self {
            Buffer::Positions => "positions",
            Buffer::Colors => "colors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// `Math.*` functions available to routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MathFn {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Cbrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Exp,
    Log,
    Log2,
    Log10,
    Pow,
    Hypot,
    Min,
    Max,
    Random,
}

/// Accepted argument counts.
enum Arity {
    Exactly(usize),
    Any,
}

impl MathFn {
    fn lookup(name: &str) -> Option<(MathFn, Arity)> {
        use Arity::*;
        Some(match name {
            "sin" => (MathFn::Sin, Exactly(1)),
            "cos" => (MathFn::Cos, Exactly(1)),
            "tan" => (MathFn::Tan, Exactly(1)),
            "asin" => (MathFn::Asin, Exactly(1)),
            "acos" => (MathFn::Acos, Exactly(1)),
            "atan" => (MathFn::Atan, Exactly(1)),
            "atan2" => (MathFn::Atan2, Exactly(2)),
            "sinh" => (MathFn::Sinh, Exactly(1)),
            "cosh" => (MathFn::Cosh, Exactly(1)),
            "tanh" => (MathFn::Tanh, Exactly(1)),
            "sqrt" => (MathFn::Sqrt, Exactly(1)),
            "cbrt" => (MathFn::Cbrt, Exactly(1)),
            "abs" => (MathFn::Abs, Exactly(1)),
            "floor" => (MathFn::Floor, Exactly(1)),
            "ceil" => (MathFn::Ceil, Exactly(1)),
            "round" => (MathFn::Round, Exactly(1)),
            "trunc" => (MathFn::Trunc, Exactly(1)),
            "sign" => (MathFn::Sign, Exactly(1)),
            "exp" => (MathFn::Exp, Exactly(1)),
            "log" => (MathFn::Log, Exactly(1)),
            "log2" => (MathFn::Log2, Exactly(1)),
            "log10" => (MathFn::Log10, Exactly(1)),
            "pow" => (MathFn::Pow, Exactly(2)),
            "hypot" => (MathFn::Hypot, Any),
            "min" => (MathFn::Min, Any),
            "max" => (MathFn::Max, Any),
            "random" => (MathFn::Random, Exactly(0)),
            _ => return None,
        })
    }
}

fn math_constant(name: &str) -> Option<f64> {
    use std::f64::consts;
    Some(match name {
        "PI" => consts::PI,
        "E" => consts::E,
        "LN2" => consts::LN_2,
        "LN10" => consts::LN_10,
        "LOG2E" => consts::LOG2_E,
        "LOG10E" => consts::LOG10_E,
        "SQRT2" => consts::SQRT_2,
        "SQRT1_2" => consts::FRAC_1_SQRT_2,
        _ => return None,
    })
}

/// Where an assignment stores its value.
#[derive(Debug, Clone)]
pub enum Target {
    Local(usize),
    Element { buffer: Buffer, index: Box<Expr> },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Num(f64),
    Input(Input),
    Local(usize),
    Read { buffer: Buffer, index: Box<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Call { func: MathFn, args: Vec<Expr> },
    /// `x++`, `--x` and friends on a local.
    Step { slot: usize, delta: f64, prefix: bool },
    Assign { target: Target, op: Option<BinOp>, value: Box<Expr> },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let`/`const` with or without initializer, or `var` with one.
    Declare { slot: usize, init: Option<Expr> },
    Expr(Expr),
    If { cond: Expr, then: Box<Stmt>, otherwise: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    Break,
    Continue,
    Return,
    Empty,
}

// ─── Parser ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum DeclKind {
    Let,
    Const,
    Var,
}

struct Binding {
    name: String,
    slot: usize,
}

/// Maximum nesting of statements and expressions. Every nested level costs
/// parser and interpreter stack, so hostile input is cut off here.
pub const MAX_NESTING: usize = 128;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    /// Innermost scope last.
    scopes: Vec<Vec<Binding>>,
    /// Per slot: whether it may be reassigned.
    mutable: Vec<bool>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            scopes: vec![Vec::new()],
            mutable: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        let tok = &self.tokens[self.pos];
        CompileError::Syntax {
            line: tok.line,
            col: tok.col,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), CompileError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, got {:?}", other))),
        }
    }

    fn nested<T>(&mut self, parse: fn(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ─── Scopes ─────────────────────────────────────────────────────

    fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|b| b.name == name)
            .map(|b| b.slot)
    }

    fn declare(&mut self, name: String, kind: DeclKind) -> Result<usize, CompileError> {
        let scope_idx = if kind == DeclKind::Var { 0 } else { self.scopes.len() - 1 };
        if let Some(existing) = self.scopes[scope_idx].iter().find(|b| b.name == name) {
            if kind == DeclKind::Var && self.mutable[existing.slot] {
                return Ok(existing.slot);
            }
            return Err(self.error(format!("`{}` is already declared", name)));
        }
        let slot = self.mutable.len();
        self.mutable.push(kind != DeclKind::Const);
        self.scopes[scope_idx].push(Binding { name, slot });
        Ok(slot)
    }

    // ─── Statements ─────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut body = Vec::new();
        while !self.at(&TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        Ok(Program {
            body,
            slots: self.mutable.len(),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.nested(Self::parse_stmt_kind)
    }

    fn parse_stmt_kind(&mut self) -> Result<Stmt, CompileError> {
        match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let stmt = self.parse_declaration()?;
                self.eat(&TokenKind::Semicolon);
                Ok(stmt)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.advance();
                self.eat(&TokenKind::Semicolon);
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.eat(&TokenKind::Semicolon);
                Ok(Stmt::Continue)
            }
            TokenKind::Return => {
                self.advance();
                if !self.eat(&TokenKind::Semicolon)
                    && !self.at(&TokenKind::RBrace)
                    && !self.at(&TokenKind::Eof)
                {
                    return Err(self.error("routines cannot return a value"));
                }
                Ok(Stmt::Return)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.eat(&TokenKind::Semicolon);
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, CompileError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        self.push_scope();
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.error("unclosed block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.advance();
        self.pop_scope();
        Ok(Stmt::Block(stmts))
    }

    /// One or more comma-separated declarators; no trailing semicolon.
    fn parse_declaration(&mut self) -> Result<Stmt, CompileError> {
        let kind = match self.advance().kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut decls = Vec::new();
        loop {
            let name = self.ident()?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_assignment()?)
            } else if kind == DeclKind::Const {
                return Err(self.error(format!("const `{}` needs an initializer", name)));
            } else {
                None
            };
            let slot = self.declare(name, kind)?;
            // `var x;` keeps whatever x already holds.
            if kind != DeclKind::Var || init.is_some() {
                decls.push(Stmt::Declare { slot, init });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(match decls.len() {
            0 => Stmt::Empty,
            1 => decls.remove(0),
            _ => Stmt::Block(decls),
        })
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, CompileError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        let cond = self.parse_paren_expr()?;
        let then = Box::new(self.parse_scoped_stmt()?);
        let otherwise = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_scoped_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then, otherwise })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        let cond = self.parse_paren_expr()?;
        let body = Box::new(self.parse_scoped_stmt()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        self.push_scope();

        let init = match self.peek() {
            TokenKind::Semicolon => None,
            TokenKind::Let | TokenKind::Const | TokenKind::Var => Some(Box::new(self.parse_declaration()?)),
            _ => Some(Box::new(Stmt::Expr(self.parse_expr()?))),
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        let cond = if self.at(&TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semicolon, "';'")?;
        let update = if self.at(&TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_scoped_stmt()?);

        self.pop_scope();
        Ok(Stmt::For { init, cond, update, body })
    }

    /// A statement body (of `if`, `while`, `for`) in its own scope.
    fn parse_scoped_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.push_scope();
        let stmt = self.parse_stmt();
        self.pop_scope();
        stmt
    }

    // ─── Expressions ────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::parse_assignment_op)
    }

    fn parse_assignment_op(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_conditional()?;
        let op = match self.peek() {
            TokenKind::Assign => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Rem),
            _ => return Ok(left),
        };
        let target = self.as_target(left)?;
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign { target, op, value: Box::new(value) })
    }

    fn as_target(&self, expr: Expr) -> Result<Target, CompileError> {
        match expr {
            Expr::Local(slot) if self.mutable[slot] => Ok(Target::Local(slot)),
            Expr::Local(_) => Err(self.error("cannot assign to a const binding")),
            Expr::Read { buffer, index } => Ok(Target::Element { buffer, index }),
            Expr::Input(_) => Err(self.error("cannot assign to a routine input")),
            _ => Err(self.error("invalid assignment target")),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, CompileError> {
        let cond = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_assignment()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let otherwise = self.parse_assignment()?;
        Ok(Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, CompileError>,
        ops: fn(&TokenKind) -> Option<BinOp>,
    ) -> Result<Expr, CompileError> {
        let mut left = next(self)?;
        while let Some(op) = ops(self.peek()) {
            self.advance();
            let right = next(self)?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::parse_relational, |t| match t {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::NotEq => Some(BinOp::NotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::parse_additive, |t| match t {
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::LtEq => Some(BinOp::LtEq),
            TokenKind::GtEq => Some(BinOp::GtEq),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::parse_multiplicative, |t| match t {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::parse_unary, |t| match t {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::parse_unary_op)
    }

    fn parse_unary_op(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let delta = if self.at(&TokenKind::PlusPlus) { 1.0 } else { -1.0 };
                self.advance();
                let operand = self.parse_unary()?;
                let slot = self.step_slot(operand)?;
                return Ok(Expr::Step { slot, delta, prefix: true });
            }
            _ => return self.parse_power(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        Ok(Expr::Unary { op, expr: Box::new(expr) })
    }

    /// `a ** b`, right-associative.
    fn parse_power(&mut self) -> Result<Expr, CompileError> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::StarStar) {
            return Ok(base);
        }
        let exponent = self.parse_unary()?;
        Ok(Expr::Binary {
            op: BinOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let expr = self.parse_primary()?;
        let delta = match self.peek() {
            TokenKind::PlusPlus => 1.0,
            TokenKind::MinusMinus => -1.0,
            _ => return Ok(expr),
        };
        let slot = self.step_slot(expr)?;
        self.advance();
        Ok(Expr::Step { slot, delta, prefix: false })
    }

    fn step_slot(&self, expr: Expr) -> Result<usize, CompileError> {
        match self.as_target(expr)? {
            Target::Local(slot) => Ok(slot),
            Target::Element { .. } => Err(self.error("++/-- only apply to local variables")),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let tok = &self.tokens[self.pos];
        let (line, col) = (tok.line, tok.col);

        match tok.kind.clone() {
            TokenKind::Number(v) => {
                self.advance();
                Ok(Expr::Num(v))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Num(1.0))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Num(0.0))
            }
            TokenKind::LParen => self.parse_paren_expr(),
            TokenKind::Ident(name) => {
                self.advance();
                if name == "Math" {
                    return self.parse_math(line, col);
                }
                if let Some(slot) = self.lookup(&name) {
                    return Ok(Expr::Local(slot));
                }
                match name.as_str() {
                    "i" => Ok(Expr::Input(Input::Index)),
                    "count" => Ok(Expr::Input(Input::Count)),
                    "time" => Ok(Expr::Input(Input::Time)),
                    "NaN" => Ok(Expr::Num(f64::NAN)),
                    "Infinity" => Ok(Expr::Num(f64::INFINITY)),
                    "positions" | "colors" => {
                        let buffer = if name == "positions" { Buffer::Positions } else { Buffer::Colors };
                        self.expect(&TokenKind::LBracket, &format!("'[' after `{}`", name))?;
                        let index = self.parse_expr()?;
                        self.expect(&TokenKind::RBracket, "']'")?;
                        Ok(Expr::Read { buffer, index: Box::new(index) })
                    }
                    _ => Err(CompileError::UnknownIdentifier { line, col, name }),
                }
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    /// `Math.NAME` or `Math.NAME(args)`, after `Math` was consumed.
    fn parse_math(&mut self, line: usize, col: usize) -> Result<Expr, CompileError> {
        self.expect(&TokenKind::Dot, "'.' after `Math`")?;
        let name = self.ident()?;

        if !self.at(&TokenKind::LParen) {
            return math_constant(&name)
                .map(Expr::Num)
                .ok_or(CompileError::UnknownIdentifier {
                    line,
                    col,
                    name: format!("Math.{}", name),
                });
        }

        self.advance();
        let mut args = Vec::new();
        while !self.at(&TokenKind::RParen) {
            args.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;

        match MathFn::lookup(&name) {
            Some((func, Arity::Any)) => Ok(Expr::Call { func, args }),
            Some((func, Arity::Exactly(n))) if n == args.len() => Ok(Expr::Call { func, args }),
            _ => Err(CompileError::UnknownFunction {
                line,
                col,
                name,
                arity: args.len(),
            }),
        }
    }
}

/// Parse a token stream into a resolved [`Program`].
pub fn parse(tokens: &[Token]) -> Result<Program, CompileError> {
    Parser::new(tokens).parse_program()
}
