//! rlogo - a small interpreter for a Logo-family command language
//!
//! The language is whitespace-delimited and dynamically typed. Procedure
//! calls carry no parentheses; the evaluator collects exactly as many
//! argument expressions as the procedure's arity demands:
//!
//! ```text
//! print sum product 3 4 8     ; prints 20
//! make "x 12  print sum 5 :x  ; prints 17
//! print 3 + 4 * 5 + 6         ; infix is rewritten to prefix, prints 29
//! ```
//!
//! Procedures are defined interactively and recurse naturally:
//!
//! ```text
//! to factorial :n
//! output ifelse equal? :n 1 [1] [product :n factorial difference :n 1]
//! end
//! print factorial 5           ; prints 120
//! ```
//!
//! ## Strict semantics
//!
//! This interpreter is deliberately strict:
//! - No type coercion: arithmetic rejects non-numbers, `if` demands a
//!   literal `True` or `False` word.
//! - Variable lookup failures, unknown procedures, and statement/expression
//!   confusion are reported immediately with their own messages.
//! - The frame stack is rebalanced on every exit path, including errors and
//!   the `output`/`stop` non-local return.
//!
//! ## Modules
//!
//! - `ast`: the token/value universe and evaluation outcomes
//! - `lexer`: line tokenization and the forward-consuming token cursor
//! - `infix`: infix-to-prefix rewriting with precedence
//! - `builtinops`: the primitive registry and primitive implementations
//! - `evaluator`: environment, procedures, and the recursive evaluator

use std::fmt;

/// Maximum bracket nesting accepted by the lexer.
/// This limits deeply nested list literals on a single line.
pub const MAX_LEX_DEPTH: usize = 64;

/// Maximum evaluation depth. Deep natural recursion is expected (argument
/// collection and user-procedure application both recurse), so the limit is
/// generous; it exists to turn a runaway recursion into a clean error.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// The single domain error kind.
///
/// Error categories (lookup, argument, syntax, type guard,
/// statement-vs-expression) are distinguished by message text, never by
/// type: the host prints the message and continues with the next line.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Lookup error for an unbound variable.
    pub(crate) fn no_value(name: &str) -> Self {
        Self::new(format!("{name} has no value"))
    }

    /// Lookup error for an unknown procedure name.
    pub(crate) fn unknown_procedure(name: &str) -> Self {
        Self::new(format!("I do not know how to {name}."))
    }

    /// Argument error raised when collection runs dry mid-call.
    pub(crate) fn found_only_args(found: usize, wanted: usize, position: &str) -> Self {
        Self::new(format!("Found only {found} of {wanted} args at {position}"))
    }

    /// Statement-vs-expression error for an unconsumed result.
    pub(crate) fn unconsumed_result(value: &str) -> Self {
        Self::new(format!("You do not say what to do with {value}."))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod infix;
pub mod lexer;
