mod python;

pub use python::PythonParser;

use thiserror::Error;

/// File extension of the sources scanned for imports
pub const SOURCE_EXTENSION: &str = "py";

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),
    #[error("syntax error at line {line}, column {column}")]
    SyntaxError { line: usize, column: usize },
}
