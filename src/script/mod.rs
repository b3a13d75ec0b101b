//! Sandboxed per-particle update routines.
//!
//! A routine is the body of a loop over particles, written in a small
//! JavaScript-like dialect:
//!
//! ```text
//! const a = i / count * Math.PI * 2;
//! positions[i * 3]     = Math.cos(a + time) * 10;
//! positions[i * 3 + 1] = Math.sin(a * 3) * 2;
//! positions[i * 3 + 2] = Math.sin(a + time) * 10;
//! colors[i * 3] = 0.5 + 0.5 * Math.sin(a);
//! ```
//!
//! The body sees `i`, `count`, `time`, the flat `positions`/`colors` buffers
//! and `Math.*`. Nothing else is reachable: there are no strings, objects or
//! user functions, every name is resolved at compile time, and each
//! invocation runs under a step budget.

mod interp;
mod lexer;
mod parser;

use crate::error::{CompileError, RuntimeError};
use interp::{Flow, Frame};
use parser::Program;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Default number of interpreter steps one invocation may take.
pub const DEFAULT_STEP_BUDGET: u64 = 50_000_000;

/// A compiled update routine, ready to run once per frame.
#[derive(Debug, Clone)]
pub struct Routine {
    program: Arc<Program>,
    source: Arc<str>,
    locals: Vec<f64>,
    rng: SmallRng,
    budget: u64,
}

/// Compile routine source with the default step budget.
pub fn compile(source: &str) -> Result<Routine, CompileError> {
    compile_with_budget(source, DEFAULT_STEP_BUDGET)
}

/// Compile routine source, bounding each invocation to `budget` steps.
pub fn compile_with_budget(source: &str, budget: u64) -> Result<Routine, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::Empty);
    }
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(&tokens)?;
    Ok(Routine {
        locals: vec![f64::NAN; program.slots],
        program: Arc::new(program),
        source: Arc::from(source),
        rng: SmallRng::from_entropy(),
        budget,
    })
}

impl Routine {
    /// Source text this routine was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Seed `Math.random`, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Run the body once for every particle index in `0..count`.
    ///
    /// Writes land directly in `positions` and `colors`. On error the buffers
    /// keep every write made before the failing statement.
    pub fn run(
        &mut self,
        count: usize,
        time: f64,
        positions: &mut [f32],
        colors: &mut [f32],
    ) -> Result<(), RuntimeError> {
        self.locals.fill(f64::NAN);
        let mut frame = Frame {
            positions,
            colors,
            locals: &mut self.locals,
            rng: &mut self.rng,
            count: count as f64,
            time,
            particle: 0,
            steps_left: self.budget,
            budget: self.budget,
        };

        for i in 0..count {
            frame.particle = i;
            match frame.exec_block(&self.program.body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break | Flow::Return => break,
            }
        }
        Ok(())
    }
}

/// Remove markdown code fences a generator may wrap around its answer.
pub fn strip_fences(text: &str) -> String {
    text.replace("```javascript", "")
        .replace("```js", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str, count: usize, time: f64) -> (Result<(), RuntimeError>, Vec<f32>, Vec<f32>) {
        let mut routine = compile(src).unwrap().with_seed(7);
        let mut positions = vec![0.0; count * 3];
        let mut colors = vec![0.0; count * 3];
        let result = routine.run(count, time, &mut positions, &mut colors);
        (result, positions, colors)
    }

    #[test]
    fn test_writes_every_particle() {
        let (result, positions, colors) = run(
            "positions[i * 3] = i;\npositions[i * 3 + 1] = time\ncolors[i * 3 + 2] = count",
            4,
            1.5,
        );
        assert!(result.is_ok());
        for i in 0..4 {
            assert_eq!(positions[i * 3], i as f32);
            assert_eq!(positions[i * 3 + 1], 1.5);
            assert_eq!(colors[i * 3 + 2], 4.0);
        }
    }

    #[test]
    fn test_math_and_operators() {
        let (result, positions, _) = run(
            "let a = Math.max(1, 5, 3) ** 2 % 7;\n\
             positions[0] = a;\n\
             positions[1] = Math.hypot(3, 4);\n\
             positions[2] = (0 || 4) && 9;\n\
             positions[3] = time < 1 ? Math.round(2.5) : -1;\n\
             positions[4] = Math.min() > 1e300;",
            2,
            0.0,
        );
        assert!(result.is_ok());
        assert_eq!(&positions[..5], &[4.0, 5.0, 9.0, 3.0, 1.0]);
    }

    #[test]
    fn test_loops_accumulate() {
        let (result, positions, _) = run(
            "let s = 0;\nfor (let k = 1; k <= 4; k++) { if (k == 3) continue; s += k; }\n\
             let n = 0; while (true) { n++; if (n >= 10) break; }\n\
             positions[0] = s; positions[1] = n;",
            1,
            0.0,
        );
        assert!(result.is_ok());
        assert_eq!(positions[0], 7.0);
        assert_eq!(positions[1], 10.0);
    }

    #[test]
    fn test_out_of_range_read_is_nan() {
        let (result, positions, _) = run("positions[0] = colors[999] + 1; positions[1] = colors[0.5];", 1, 0.0);
        assert!(result.is_ok());
        assert!(positions[0].is_nan());
        assert!(positions[1].is_nan());
    }

    #[test]
    fn test_out_of_range_write_fails_after_partial_writes() {
        let (result, positions, _) = run("positions[i * 3] = 5;\ncolors[count * 3 + 10] = 1;", 3, 0.0);
        assert_eq!(
            result,
            Err(RuntimeError::IndexOutOfRange {
                particle: 0,
                buffer: "colors",
                index: 19,
                len: 9,
            })
        );
        assert_eq!(positions[0], 5.0);
        assert_eq!(positions[3], 0.0);
    }

    #[test]
    fn test_non_integer_write_index() {
        let (result, _, _) = run("positions[i / 2] = 1;", 2, 0.0);
        assert!(matches!(result, Err(RuntimeError::BadIndex { particle: 1, .. })));
    }

    #[test]
    fn test_budget_stops_infinite_loop() {
        let mut routine = compile_with_budget("while (true) {}", 1_000).unwrap();
        let mut positions = vec![0.0; 3];
        let mut colors = vec![0.0; 3];
        let err = routine.run(1, 0.0, &mut positions, &mut colors).unwrap_err();
        assert_eq!(err, RuntimeError::BudgetExceeded { particle: 0, budget: 1_000 });
    }

    #[test]
    fn test_top_level_return_stops_invocation() {
        let (result, positions, _) = run("if (i == 2) return;\npositions[i * 3] = 1;", 4, 0.0);
        assert!(result.is_ok());
        assert_eq!(positions[3], 1.0);
        assert_eq!(positions[6], 0.0);
        assert_eq!(positions[9], 0.0);
    }

    #[test]
    fn test_variadic_math_evaluates_every_argument() {
        let (result, positions, colors) = run(
            "let n = 0;\n\
             positions[0] = Math.max(n++, NaN, n++);\n\
             positions[1] = n;\n\
             positions[2] = Math.min(4, -2, 9);\n\
             colors[0] = Math.hypot(NaN, Infinity);\n\
             colors[1] = Math.hypot(2, 3, 6);\n\
             colors[2] = Math.atan2(1, 1) * 4;",
            1,
            0.0,
        );
        assert!(result.is_ok());
        assert!(positions[0].is_nan());
        assert_eq!(positions[1], 2.0);
        assert_eq!(positions[2], -2.0);
        assert_eq!(colors[0], f32::INFINITY);
        assert!((colors[1] - 7.0).abs() < 1e-6);
        assert!((colors[2] - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_var_persists_across_particles() {
        let (result, positions, _) = run("var n; n = (n || 0) + 1; positions[i * 3] = n;", 3, 0.0);
        assert!(result.is_ok());
        assert_eq!(positions[0], 1.0);
        assert_eq!(positions[3], 2.0);
        assert_eq!(positions[6], 3.0);
    }

    #[test]
    fn test_random_in_unit_range() {
        let (result, positions, _) = run("positions[i] = Math.random();", 3, 0.0);
        assert!(result.is_ok());
        assert!(positions[..3].iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_compile_rejects_empty() {
        assert_eq!(compile("  \n").unwrap_err(), CompileError::Empty);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```javascript\npositions[0] = 1;\n```"), "positions[0] = 1;");
        assert_eq!(strip_fences("```js\nx\n```\n"), "x");
        assert_eq!(strip_fences("  plain  "), "plain");
    }
}
