//! Error types for swarmform.
//!
//! Each failure domain gets its own enum: glyph loading, routine compilation,
//! routine execution, code generation and configuration files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the glyph outline provider.
#[derive(Debug, Error)]
pub enum GlyphError {
    /// The font file could not be read from disk.
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The font data is not a parseable TrueType/OpenType face.
    #[error("failed to parse font data: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
    /// The provider has not finished loading a font yet.
    #[error("glyph source not loaded yet")]
    NotLoaded,
    /// The text produced no drawable outline at all.
    #[error("text {0:?} has no drawable outlines")]
    EmptyOutline(String),
}

/// Errors raised while compiling routine source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A character sequence that is not part of the routine dialect.
    #[error("L{line}:{col}: {message}")]
    Lex {
        line: usize,
        col: usize,
        message: String,
    },
    /// A token stream that does not form a valid statement.
    #[error("L{line}:{col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },
    /// A name that is neither a routine input nor a declared local.
    #[error("L{line}:{col}: unknown identifier `{name}`")]
    UnknownIdentifier { line: usize, col: usize, name: String },
    /// A `Math.*` member or call that the interpreter does not provide.
    #[error("L{line}:{col}: unknown function `Math.{name}` with {arity} argument(s)")]
    UnknownFunction {
        line: usize,
        col: usize,
        name: String,
        arity: usize,
    },
    /// Source text that is empty after cleanup.
    #[error("routine source is empty")]
    Empty,
}

/// Errors raised while a compiled routine runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A buffer write outside `0..3 * count`.
    #[error("particle {particle}: write to {buffer}[{index}] is out of range (len {len})")]
    IndexOutOfRange {
        particle: usize,
        buffer: &'static str,
        index: i64,
        len: usize,
    },
    /// A buffer write whose index is not a finite integer.
    #[error("particle {particle}: {buffer} index {value} is not an integer")]
    BadIndex {
        particle: usize,
        buffer: &'static str,
        value: f64,
    },
    /// The invocation exceeded its per-frame step budget.
    #[error("particle {particle}: step budget of {budget} exceeded")]
    BudgetExceeded { particle: usize, budget: u64 },
}

/// Errors raised when turning a prompt into a compiled routine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No credential was supplied to the generator.
    #[error("an API credential is required")]
    MissingCredential,
    /// The prompt was empty.
    #[error("prompt is empty")]
    EmptyPrompt,
    /// The generator itself failed; the message is shown to the user as-is.
    #[error("code generation failed: {0}")]
    Remote(String),
    /// The generator answered with nothing usable.
    #[error("generator returned an empty response")]
    EmptyResponse,
    /// The returned source did not compile.
    #[error("generated routine does not compile: {0}")]
    Compile(#[from] CompileError),
}

/// Errors raised when loading or saving an engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}
