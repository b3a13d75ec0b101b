//! Code generator backed by an external command.
//!
//! The command receives [`SYSTEM_PROMPT`] followed by the user prompt on
//! stdin and the credential in `SWARMFORM_API_KEY`, and prints routine
//! source on stdout.

use std::io::Write;
use std::process::{Command, Stdio};

use swarmform::{CodeGenerator, GenerationError, SYSTEM_PROMPT};

pub const CREDENTIAL_VAR: &str = "SWARMFORM_API_KEY";

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Split a shell-style command line on whitespace. No quoting support.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }
}

impl CodeGenerator for CommandGenerator {
    fn generate(&self, credential: &str, prompt: &str) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(CREDENTIAL_VAR, credential)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GenerationError::Remote(format!("failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let request = format!("{}\nUser Prompt: {}\n", SYSTEM_PROMPT, prompt);
            if let Err(e) = stdin.write_all(request.as_bytes()) {
                // Reap the child so it does not linger.
                let _ = child.kill();
                let _ = child.wait();
                return Err(GenerationError::Remote(format!("failed to write prompt: {}", e)));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| GenerationError::Remote(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(GenerationError::Remote(message));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| GenerationError::Remote("generator output is not UTF-8".to_string()))
    }
}
