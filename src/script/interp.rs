//! Tree-walking evaluator for parsed routines.
//!
//! All values are `f64`. Buffer elements are `f32` and are widened on read
//! and narrowed on write.

use super::parser::{BinOp, Buffer, Expr, Input, MathFn, Stmt, Target, UnaryOp};
use crate::error::RuntimeError;
use rand::rngs::SmallRng;
use rand::Rng;

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

/// Mutable state for one invocation of a routine.
pub struct Frame<'a> {
    pub positions: &'a mut [f32],
    pub colors: &'a mut [f32],
    pub locals: &'a mut [f64],
    pub rng: &'a mut SmallRng,
    pub count: f64,
    pub time: f64,
    /// Particle currently being updated.
    pub particle: usize,
    pub steps_left: u64,
    pub budget: u64,
}

pub fn truthy(v: f64) -> bool {
    v != 0.0 && !v.is_nan()
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// `**` with the NaN behavior of `Math.pow`.
fn pow(base: f64, exp: f64) -> f64 {
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exp)
    }
}

fn sign(v: f64) -> f64 {
    if v.is_nan() || v == 0.0 {
        v
    } else {
        v.signum()
    }
}

fn apply_binary(op: BinOp, l: f64, r: f64) -> f64 {
    match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Rem => l % r,
        BinOp::Pow => pow(l, r),
        BinOp::Eq => bool_value(l == r),
        BinOp::NotEq => bool_value(l != r),
        BinOp::Lt => bool_value(l < r),
        BinOp::Gt => bool_value(l > r),
        BinOp::LtEq => bool_value(l <= r),
        BinOp::GtEq => bool_value(l >= r),
    }
}

impl Frame<'_> {
    fn buffer(&self, buffer: Buffer) -> &[f32] {
        match buffer {
            Buffer::Positions => &*self.positions,
            Buffer::Colors => &*self.colors,
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        if self.steps_left == 0 {
            return Err(RuntimeError::BudgetExceeded {
                particle: self.particle,
                budget: self.budget,
            });
        }
        self.steps_left -= 1;
        Ok(())
    }

    fn read(&self, buffer: Buffer, index: f64) -> f64 {
        let data = self.buffer(buffer);
        if index.fract() != 0.0 || index < 0.0 || index >= data.len() as f64 {
            // fract() of NaN/inf is NaN, which also lands here
            return f64::NAN;
        }
        data[index as usize] as f64
    }

    fn element_index(&self, buffer: Buffer, index: f64) -> Result<usize, RuntimeError> {
        if !index.is_finite() || index.fract() != 0.0 {
            return Err(RuntimeError::BadIndex {
                particle: self.particle,
                buffer: buffer.name(),
                value: index,
            });
        }
        let len = self.buffer(buffer).len();
        if index < 0.0 || index >= len as f64 {
            return Err(RuntimeError::IndexOutOfRange {
                particle: self.particle,
                buffer: buffer.name(),
                index: index as i64,
                len,
            });
        }
        Ok(index as usize)
    }

    fn write(&mut self, buffer: Buffer, index: usize, value: f64) {
        match buffer {
            Buffer::Positions => self.positions[index] = value as f32,
            Buffer::Colors => self.colors[index] = value as f32,
        }
    }

    // ========== Statements ==========

    pub fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            let flow = self.exec(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    pub fn exec(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.tick()?;
        match stmt {
            Stmt::Declare { slot, init } => {
                self.locals[*slot] = match init {
                    Some(expr) => self.eval(expr)?,
                    None => f64::NAN,
                };
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::If { cond, then, otherwise } => {
                if truthy(self.eval(cond)?) {
                    return self.exec(then);
                } else if let Some(otherwise) = otherwise {
                    return self.exec(otherwise);
                }
            }
            Stmt::While { cond, body } => {
                while truthy(self.eval(cond)?) {
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::For { init, cond, update, body } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !truthy(self.eval(cond)?) {
                            break;
                        }
                    } else {
                        self.tick()?;
                    }
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update)?;
                    }
                }
            }
            Stmt::Block(stmts) => return self.exec_block(stmts),
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Return => return Ok(Flow::Return),
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    // ========== Expressions ==========

    pub fn eval(&mut self, expr: &Expr) -> Result<f64, RuntimeError> {
        Ok(match expr {
            Expr::Num(v) => *v,
            Expr::Input(Input::Index) => self.particle as f64,
            Expr::Input(Input::Count) => self.count,
            Expr::Input(Input::Time) => self.time,
            Expr::Local(slot) => self.locals[*slot],
            Expr::Read { buffer, index } => {
                let index = self.eval(index)?;
                self.read(*buffer, index)
            }
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Plus => v,
                    UnaryOp::Not => bool_value(!truthy(v)),
                }
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                apply_binary(*op, l, r)
            }
            Expr::And(left, right) => {
                let l = self.eval(left)?;
                if truthy(l) {
                    self.eval(right)?
                } else {
                    l
                }
            }
            Expr::Or(left, right) => {
                let l = self.eval(left)?;
                if truthy(l) {
                    l
                } else {
                    self.eval(right)?
                }
            }
            Expr::Cond { cond, then, otherwise } => {
                if truthy(self.eval(cond)?) {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
            Expr::Call { func, args } => self.call(*func, args)?,
            Expr::Step { slot, delta, prefix } => {
                let old = self.locals[*slot];
                let new = old + delta;
                self.locals[*slot] = new;
                if *prefix {
                    new
                } else {
                    old
                }
            }
            Expr::Assign { target, op, value } => self.assign(target, *op, value)?,
        })
    }

    fn assign(&mut self, target: &Target, op: Option<BinOp>, value: &Expr) -> Result<f64, RuntimeError> {
        match target {
            Target::Local(slot) => {
                let rhs = self.eval(value)?;
                let v = match op {
                    Some(op) => apply_binary(op, self.locals[*slot], rhs),
                    None => rhs,
                };
                self.locals[*slot] = v;
                Ok(v)
            }
            Target::Element { buffer, index } => {
                let raw_index = self.eval(index)?;
                let rhs = self.eval(value)?;
                let idx = self.element_index(*buffer, raw_index)?;
                let v = match op {
                    Some(op) => apply_binary(op, self.buffer(*buffer)[idx] as f64, rhs),
                    None => rhs,
                };
                self.write(*buffer, idx, v);
                Ok(v)
            }
        }
    }

    /// Argument `k`; the parser has already checked the arity.
    fn arg(&mut self, args: &[Expr], k: usize) -> Result<f64, RuntimeError> {
        match args.get(k) {
            Some(expr) => self.eval(expr),
            None => Ok(f64::NAN),
        }
    }

    /// Fold the variadic functions while evaluating, left to right.
    fn call_variadic(&mut self, func: MathFn, args: &[Expr]) -> Result<f64, RuntimeError> {
        let mut acc = match func {
            MathFn::Min => f64::INFINITY,
            MathFn::Max => f64::NEG_INFINITY,
            _ => 0.0,
        };
        let mut saw_nan = false;
        let mut saw_inf = false;
        for arg in args {
            let v = self.eval(arg)?;
            saw_nan |= v.is_nan();
            saw_inf |= v.is_infinite();
            acc = match func {
                MathFn::Min => acc.min(v),
                MathFn::Max => acc.max(v),
                _ => acc + v * v,
            };
        }
        Ok(match func {
            MathFn::Hypot if saw_inf => f64::INFINITY,
            _ if saw_nan => f64::NAN,
            MathFn::Hypot => acc.sqrt(),
            _ => acc,
        })
    }

    fn call(&mut self, func: MathFn, args: &[Expr]) -> Result<f64, RuntimeError> {
        match func {
            MathFn::Min | MathFn::Max | MathFn::Hypot => return self.call_variadic(func, args),
            MathFn::Random => return Ok(self.rng.gen::<f64>()),
            _ => {}
        }
        let a = self.arg(args, 0)?;
        let b = if func == MathFn::Atan2 || func == MathFn::Pow {
            self.arg(args, 1)?
        } else {
            f64::NAN
        };

        Ok(match func {
            MathFn::Sin => a.sin(),
            MathFn::Cos => a.cos(),
            MathFn::Tan => a.tan(),
            MathFn::Asin => a.asin(),
            MathFn::Acos => a.acos(),
            MathFn::Atan => a.atan(),
            MathFn::Atan2 => a.atan2(b),
            MathFn::Sinh => a.sinh(),
            MathFn::Cosh => a.cosh(),
            MathFn::Tanh => a.tanh(),
            MathFn::Sqrt => a.sqrt(),
            MathFn::Cbrt => a.cbrt(),
            MathFn::Abs => a.abs(),
            MathFn::Floor => a.floor(),
            MathFn::Ceil => a.ceil(),
            MathFn::Round => (a + 0.5).floor(),
            MathFn::Trunc => a.trunc(),
            MathFn::Sign => sign(a),
            MathFn::Exp => a.exp(),
            MathFn::Log => a.ln(),
            MathFn::Log2 => a.log2(),
            MathFn::Log10 => a.log10(),
            MathFn::Pow => pow(a, b),
            MathFn::Min | MathFn::Max | MathFn::Hypot | MathFn::Random => f64::NAN,
        })
    }
}
