//! Prompt-to-routine glue.
//!
//! Producing routine source from a natural-language prompt is someone else's
//! job (a hosted model, a local script). This module owns the contract: the
//! [`SYSTEM_PROMPT`] a generator should send along, the credential and prompt
//! checks, fence cleanup and compilation.

use crate::error::GenerationError;
use crate::script::{self, Routine};

/// Instructions that describe the routine dialect to a code generator.
pub const SYSTEM_PROMPT: &str = "\
You are a graphics programming expert.
Generate a JavaScript loop body that calculates particle positions and colors from a user description.

Context:
- You have access to these variables:
  - 'i': current particle index (0 to count-1)
  - 'count': total number of particles
  - 'time': current animation time in seconds
  - 'positions': flat array of particle positions (x, y, z)
  - 'colors': flat array of particle colors (r, g, b), each in 0..1

Requirements:
- Output ONLY the raw JavaScript code for the loop body.
- DO NOT wrap it in a function or in markdown code blocks.
- DO NOT use 'return'.
- Assign values to 'positions[i * 3]', 'positions[i * 3 + 1]', 'positions[i * 3 + 2]'.
- Assign values to 'colors[i * 3]', 'colors[i * 3 + 1]', 'colors[i * 3 + 2]'.
- Use only numbers, local variables (let/const/var), if/else, for/while loops and Math functions (Math.sin, Math.cos, etc.).
- The shape should be centered at (0,0,0).
- Scale should be roughly within the -10 to 10 range.
";

/// Something that turns a prompt into routine source text.
pub trait CodeGenerator {
    /// Produce raw source for `prompt`. Errors are reported to the user as-is.
    fn generate(&self, credential: &str, prompt: &str) -> Result<String, GenerationError>;
}

impl<F> CodeGenerator for F
where
    F: Fn(&str, &str) -> Result<String, GenerationError>,
{
    fn generate(&self, credential: &str, prompt: &str) -> Result<String, GenerationError> {
        self(credential, prompt)
    }
}

/// Ask `generator` for a routine and compile it.
///
/// Fails without calling the generator when the credential or prompt is
/// blank.
pub fn compile_prompt(
    generator: &dyn CodeGenerator,
    credential: &str,
    prompt: &str,
    step_budget: u64,
) -> Result<Routine, GenerationError> {
    if credential.trim().is_empty() {
        return Err(GenerationError::MissingCredential);
    }
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }

    log::info!("requesting routine for prompt {:?}", prompt);
    let raw = generator.generate(credential, prompt)?;
    let source = script::strip_fences(&raw);
    if source.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    log::debug!("generated routine:\n{}", source);

    Ok(script::compile_with_budget(&source, step_budget)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use std::cell::Cell;

    #[test]
    fn test_compiles_fenced_answer() {
        let generator = |_: &str, _: &str| -> Result<String, GenerationError> {
            Ok("```javascript\npositions[i * 3] = Math.sin(time);\n```".to_string())
        };
        let routine = compile_prompt(&generator, "key", "a wave", 1000).unwrap();
        assert_eq!(routine.source(), "positions[i * 3] = Math.sin(time);");
        assert_eq!(routine.budget(), 1000);
    }

    #[test]
    fn test_blank_inputs_skip_generator() {
        let calls = Cell::new(0);
        let generator = |_: &str, _: &str| -> Result<String, GenerationError> {
            calls.set(calls.get() + 1);
            Ok(String::new())
        };
        assert!(matches!(
            compile_prompt(&generator, "", "spiral", 10),
            Err(GenerationError::MissingCredential)
        ));
        assert!(matches!(
            compile_prompt(&generator, "key", "   ", 10),
            Err(GenerationError::EmptyPrompt)
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_empty_and_broken_answers() {
        let empty = |_: &str, _: &str| -> Result<String, GenerationError> { Ok("```\n```".into()) };
        assert!(matches!(
            compile_prompt(&empty, "key", "x", 10),
            Err(GenerationError::EmptyResponse)
        ));

        let broken = |_: &str, _: &str| -> Result<String, GenerationError> { Ok("positions[i = ;".into()) };
        assert!(matches!(
            compile_prompt(&broken, "key", "x", 10),
            Err(GenerationError::Compile(CompileError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_remote_error_is_preserved() {
        let failing =
            |_: &str, _: &str| -> Result<String, GenerationError> { Err(GenerationError::Remote("quota exceeded".into())) };
        let err = compile_prompt(&failing, "key", "x", 10).unwrap_err();
        assert_eq!(err.to_string(), "code generation failed: quota exceeded");
    }
}
