//! Centralised error hierarchy for the interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert
//! their internal failure modes into one of the variants defined here. This
//! enables a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter‑operation with `anyhow`, while still preserving rich diagnostic
//! detail.
//!
//! The module **does not** print diagnostics itself — everything
//! user‑visible travels as a [`Diagnostic`] record and the host decides
//! formatting and exit codes.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// The single reporting record behind every user‑visible message:
/// which file and line, what category of report (`Error`, `Warning`,
/// `RuntimeError`, or a thrown error class's name), where in the line, and
/// the message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source file (empty for the prompt).
    pub file: String,

    /// 1‑based line number.
    pub line: usize,

    /// Report category, e.g. `Error`, `Warning`, `RuntimeError`.
    pub category: String,

    /// Narrower location inside the line, e.g. ` at 'x'` or ` at end`.
    pub location: String,

    /// Human‑readable description.
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(
        file: &str,
        line: usize,
        category: &str,
        location: &str,
        message: S,
    ) -> Self {
        Diagnostic {
            file: file.to_owned(),
            line,
            category: category.to_owned(),
            location: location.to_owned(),
            message: message.into(),
        }
    }

    /// ` at 'lexeme'`, or ` at end` for the EOF token.
    pub fn locate(token: &Token) -> String {
        if token.token_type == TokenType::EOF {
            " at end".to_owned()
        } else {
            format!(" at '{}'", token.lexeme)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(
                f,
                "[line {}] {}{}: {}",
                self.line, self.category, self.location, self.message
            )
        } else {
            write!(
                f,
                "[{}: line {}] {}{}: {}",
                self.file, self.line, self.category, self.location, self.message
            )
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("{0}")]
    Lex(Diagnostic),

    /// Syntactic (parser) error.
    #[error("{0}")]
    Parse(Diagnostic),

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("{0}")]
    Resolve(Diagnostic),

    /// Runtime evaluation error that reached the top level.
    #[error("{0}")]
    Runtime(Diagnostic),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(file: &str, line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex(Diagnostic::new(file, line, "Error", "", message))
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse(Diagnostic::new(
            &token.file,
            token.line,
            "Error",
            &Diagnostic::locate(token),
            message,
        ))
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve(Diagnostic::new(
            &token.file,
            token.line,
            "Error",
            &Diagnostic::locate(token),
            message,
        ))
    }

    /// Helper constructor for a runtime fault surfacing to the host.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        LoxError::Runtime(Diagnostic::new(
            &token.file,
            token.line,
            "RuntimeError",
            &format!(" at '{}'", token.lexeme),
            message,
        ))
    }

    /// Helper constructor for an uncaught user `throw`: the category is the
    /// thrown instance's class name.
    pub fn thrown<S: Into<String>>(class_name: &str, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating user error: class={}, line={}, msg={}",
            class_name, token.line, message
        );

        LoxError::Runtime(Diagnostic::new(
            &token.file,
            token.line,
            class_name,
            "",
            message,
        ))
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
