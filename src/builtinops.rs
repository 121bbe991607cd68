//! Primitive procedure registry.
//!
//! Every primitive is described once by a [`PrimitiveOp`]: the names it is
//! registered under (aliases share one descriptor), its fixed arity, and its
//! handler. Handlers come in two kinds - plain handlers see only their
//! already-evaluated arguments, while environment-threaded handlers also
//! receive the interpreter so they can bind variables or evaluate lines
//! (`make`, `if`, `ifelse`, `run`, and the printing primitives).
//!
//! ## Strictness
//!
//! Primitives reject wrong argument tags instead of coercing:
//! - Arithmetic and comparisons require numbers; `div` rejects a zero
//!   divisor.
//! - `equalp` is structural equality; values of different tags are unequal.
//! - `if`/`ifelse` demand a literal `True` or `False` word as guard.
//!
//! ## Adding a primitive
//!
//! 1. Implement the handler with the matching [`PrimKind`] signature.
//! 2. Add a `PrimitiveOp` entry to `PRIMITIVES` with its names and arity.
//! 3. Add cases to the data-driven tests below.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{NumberType, Outcome, Value};
use crate::evaluator::Interpreter;

/// Handler form for a primitive. Environment-threaded handlers get the
/// interpreter and the current evaluation depth as extra channels beside
/// the argument slice.
#[derive(Clone, Copy)]
pub enum PrimKind {
    Plain(fn(&[Value]) -> Result<Outcome, Error>),
    WithInterp(fn(&[Value], &mut Interpreter, usize) -> Result<Outcome, Error>),
}

impl fmt::Debug for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimKind::Plain(_) => write!(f, "Plain(<fn>)"),
            PrimKind::WithInterp(_) => write!(f, "WithInterp(<fn>)"),
        }
    }
}

/// Definition of a primitive procedure.
#[derive(Debug)]
pub struct PrimitiveOp {
    /// Names this descriptor is registered under; the first is canonical.
    pub names: &'static [&'static str],
    /// Fixed number of arguments the evaluator collects.
    pub arity: usize,
    /// The handler and its calling convention.
    pub kind: PrimKind,
}

impl PrimitiveOp {
    /// Whether the environment is threaded into the handler.
    pub fn needs_env(&self) -> bool {
        matches!(self.kind, PrimKind::WithInterp(_))
    }
}

//
// Argument extraction helpers
//

fn number_arg(prim: &str, value: &Value) -> Result<NumberType, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Error::new(format!(
            "{prim} doesn't like {} as input",
            other.token_form()
        ))),
    }
}

/// The character text of a word-like value. Numbers read as their display
/// text, so `word 12 34` is the word `1234`.
fn word_text(prim: &str, value: &Value) -> Result<String, Error> {
    match value {
        Value::Word(word) => Ok(word.clone()),
        Value::Number(n) => Ok(format!("{n}")),
        other => Err(Error::new(format!(
            "{prim} doesn't like {} as input",
            other.token_form()
        ))),
    }
}

fn list_items<'a>(prim: &str, value: &'a Value) -> Result<&'a [Value], Error> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Error::new(format!(
            "{prim} doesn't like {} as input",
            other.token_form()
        ))),
    }
}

/// A list's elements, or the value itself as a one-element sequence. This
/// both flattens `sentence` arguments and wraps non-list values into
/// single-token lines for `run`/`if`/`ifelse`.
fn elements_of(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

//
// Plain primitives
//

fn prim_sum(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("sum", &args[0])?;
    let b = number_arg("sum", &args[1])?;
    Ok(Outcome::Value(Value::Number(a + b)))
}

fn prim_difference(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("difference", &args[0])?;
    let b = number_arg("difference", &args[1])?;
    Ok(Outcome::Value(Value::Number(a - b)))
}

fn prim_product(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("product", &args[0])?;
    let b = number_arg("product", &args[1])?;
    Ok(Outcome::Value(Value::Number(a * b)))
}

fn prim_div(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("div", &args[0])?;
    let b = number_arg("div", &args[1])?;
    if b == 0.0 {
        return Err(Error::new("div doesn't like 0 as input"));
    }
    Ok(Outcome::Value(Value::Number(a / b)))
}

fn prim_equalp(args: &[Value]) -> Result<Outcome, Error> {
    // Structural across tags: words textual, numbers numeric, lists
    // element-wise recursive. Different tags are unequal.
    Ok(Outcome::Value(Value::boolean(args[0] == args[1])))
}

fn prim_lessp(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("lessp", &args[0])?;
    let b = number_arg("lessp", &args[1])?;
    Ok(Outcome::Value(Value::boolean(a < b)))
}

fn prim_greaterp(args: &[Value]) -> Result<Outcome, Error> {
    let a = number_arg("greaterp", &args[0])?;
    let b = number_arg("greaterp", &args[1])?;
    Ok(Outcome::Value(Value::boolean(a > b)))
}

fn prim_word(args: &[Value]) -> Result<Outcome, Error> {
    let mut joined = word_text("word", &args[0])?;
    joined.push_str(&word_text("word", &args[1])?);
    Ok(Outcome::Value(Value::Word(joined)))
}

fn prim_sentence(args: &[Value]) -> Result<Outcome, Error> {
    let mut items = elements_of(&args[0]);
    items.extend(elements_of(&args[1]));
    Ok(Outcome::Value(Value::List(items)))
}

fn prim_list(args: &[Value]) -> Result<Outcome, Error> {
    Ok(Outcome::Value(Value::List(vec![
        args[0].clone(),
        args[1].clone(),
    ])))
}

fn prim_fput(args: &[Value]) -> Result<Outcome, Error> {
    let tail = list_items("fput", &args[1])?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend_from_slice(tail);
    Ok(Outcome::Value(Value::List(items)))
}

fn prim_first(args: &[Value]) -> Result<Outcome, Error> {
    match &args[0] {
        Value::List(items) => match items.first() {
            Some(first) => Ok(Outcome::Value(first.clone())),
            None => Err(Error::new("first doesn't like an empty list as input")),
        },
        word_like => {
            let text = word_text("first", word_like)?;
            match text.chars().next() {
                Some(c) => Ok(Outcome::Value(Value::Word(c.to_string()))),
                None => Err(Error::new("first doesn't like an empty word as input")),
            }
        }
    }
}

fn prim_last(args: &[Value]) -> Result<Outcome, Error> {
    match &args[0] {
        Value::List(items) => match items.last() {
            Some(last) => Ok(Outcome::Value(last.clone())),
            None => Err(Error::new("last doesn't like an empty list as input")),
        },
        word_like => {
            let text = word_text("last", word_like)?;
            match text.chars().next_back() {
                Some(c) => Ok(Outcome::Value(Value::Word(c.to_string()))),
                None => Err(Error::new("last doesn't like an empty word as input")),
            }
        }
    }
}

fn prim_butfirst(args: &[Value]) -> Result<Outcome, Error> {
    match &args[0] {
        Value::List(items) => {
            if items.is_empty() {
                return Err(Error::new("butfirst doesn't like an empty list as input"));
            }
            Ok(Outcome::Value(Value::List(items[1..].to_vec())))
        }
        word_like => {
            let text = word_text("butfirst", word_like)?;
            let mut chars = text.chars();
            if chars.next().is_none() {
                return Err(Error::new("butfirst doesn't like an empty word as input"));
            }
            Ok(Outcome::Value(Value::Word(chars.collect())))
        }
    }
}

fn prim_emptyp(args: &[Value]) -> Result<Outcome, Error> {
    let empty = match &args[0] {
        Value::Word(word) => word.is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    };
    Ok(Outcome::Value(Value::boolean(empty)))
}

fn prim_wordp(args: &[Value]) -> Result<Outcome, Error> {
    // Numbers read as words in this language family
    let is_word = matches!(&args[0], Value::Word(_) | Value::Number(_));
    Ok(Outcome::Value(Value::boolean(is_word)))
}

fn prim_output(args: &[Value]) -> Result<Outcome, Error> {
    Ok(Outcome::Output(Some(args[0].clone())))
}

fn prim_stop(_args: &[Value]) -> Result<Outcome, Error> {
    Ok(Outcome::Output(None))
}

//
// Environment-threaded primitives
//

fn prim_print(args: &[Value], interp: &mut Interpreter, _depth: usize) -> Result<Outcome, Error> {
    interp.environment_mut().print_line(&format!("{}", args[0]));
    Ok(Outcome::NoValue)
}

fn prim_show(args: &[Value], interp: &mut Interpreter, _depth: usize) -> Result<Outcome, Error> {
    // Unlike print, show keeps a top-level list's brackets
    interp.environment_mut().print_line(&args[0].token_form());
    Ok(Outcome::NoValue)
}

fn prim_type(args: &[Value], interp: &mut Interpreter, _depth: usize) -> Result<Outcome, Error> {
    interp
        .environment_mut()
        .print_no_newline(&format!("{}", args[0]));
    Ok(Outcome::NoValue)
}

fn prim_make(args: &[Value], interp: &mut Interpreter, _depth: usize) -> Result<Outcome, Error> {
    let name = match &args[0] {
        Value::Word(word) => word.clone(),
        other => {
            return Err(Error::new(format!(
                "make doesn't like {} as input",
                other.token_form()
            )));
        }
    };
    interp
        .environment_mut()
        .set_variable_value(&name, args[1].clone());
    Ok(Outcome::NoValue)
}

fn prim_run(args: &[Value], interp: &mut Interpreter, depth: usize) -> Result<Outcome, Error> {
    interp.eval_token_line(elements_of(&args[0]), depth + 1)
}

fn boolean_guard(prim: &str, value: &Value) -> Result<bool, Error> {
    value.as_boolean().ok_or_else(|| {
        Error::new(format!(
            "First argument to \"{prim}\" is not True or False: {}",
            value.token_form()
        ))
    })
}

fn prim_if(args: &[Value], interp: &mut Interpreter, depth: usize) -> Result<Outcome, Error> {
    if boolean_guard("if", &args[0])? {
        // Output traps from the body propagate as the if's own outcome
        interp.eval_token_line(elements_of(&args[1]), depth + 1)
    } else {
        Ok(Outcome::NoValue)
    }
}

fn prim_ifelse(args: &[Value], interp: &mut Interpreter, depth: usize) -> Result<Outcome, Error> {
    let branch = if boolean_guard("ifelse", &args[0])? {
        &args[1]
    } else {
        &args[2]
    };
    interp.eval_token_line(elements_of(branch), depth + 1)
}

/// Global registry of all primitives. One descriptor may be registered
/// under many names; the procedure table is populated from this slice at
/// environment construction.
static PRIMITIVES: &[PrimitiveOp] = &[
    // Arithmetic
    PrimitiveOp {
        names: &["sum"],
        arity: 2,
        kind: PrimKind::Plain(prim_sum),
    },
    PrimitiveOp {
        names: &["difference"],
        arity: 2,
        kind: PrimKind::Plain(prim_difference),
    },
    PrimitiveOp {
        names: &["product"],
        arity: 2,
        kind: PrimKind::Plain(prim_product),
    },
    PrimitiveOp {
        names: &["div"],
        arity: 2,
        kind: PrimKind::Plain(prim_div),
    },
    // Comparisons
    PrimitiveOp {
        names: &["equalp", "equal?"],
        arity: 2,
        kind: PrimKind::Plain(prim_equalp),
    },
    PrimitiveOp {
        names: &["lessp", "less?"],
        arity: 2,
        kind: PrimKind::Plain(prim_lessp),
    },
    PrimitiveOp {
        names: &["greaterp", "greater?"],
        arity: 2,
        kind: PrimKind::Plain(prim_greaterp),
    },
    // Word and list constructors and accessors
    PrimitiveOp {
        names: &["word"],
        arity: 2,
        kind: PrimKind::Plain(prim_word),
    },
    PrimitiveOp {
        names: &["sentence"],
        arity: 2,
        kind: PrimKind::Plain(prim_sentence),
    },
    PrimitiveOp {
        names: &["list"],
        arity: 2,
        kind: PrimKind::Plain(prim_list),
    },
    PrimitiveOp {
        names: &["fput"],
        arity: 2,
        kind: PrimKind::Plain(prim_fput),
    },
    PrimitiveOp {
        names: &["first"],
        arity: 1,
        kind: PrimKind::Plain(prim_first),
    },
    PrimitiveOp {
        names: &["last"],
        arity: 1,
        kind: PrimKind::Plain(prim_last),
    },
    PrimitiveOp {
        names: &["butfirst", "bf"],
        arity: 1,
        kind: PrimKind::Plain(prim_butfirst),
    },
    // Predicates
    PrimitiveOp {
        names: &["empty?", "emptyp"],
        arity: 1,
        kind: PrimKind::Plain(prim_emptyp),
    },
    PrimitiveOp {
        names: &["word?"],
        arity: 1,
        kind: PrimKind::Plain(prim_wordp),
    },
    // Printing
    PrimitiveOp {
        names: &["print"],
        arity: 1,
        kind: PrimKind::WithInterp(prim_print),
    },
    PrimitiveOp {
        names: &["show"],
        arity: 1,
        kind: PrimKind::WithInterp(prim_show),
    },
    PrimitiveOp {
        names: &["type"],
        arity: 1,
        kind: PrimKind::WithInterp(prim_type),
    },
    // Binding and control flow
    PrimitiveOp {
        names: &["make"],
        arity: 2,
        kind: PrimKind::WithInterp(prim_make),
    },
    PrimitiveOp {
        names: &["if"],
        arity: 2,
        kind: PrimKind::WithInterp(prim_if),
    },
    PrimitiveOp {
        names: &["ifelse"],
        arity: 3,
        kind: PrimKind::WithInterp(prim_ifelse),
    },
    PrimitiveOp {
        names: &["run"],
        arity: 1,
        kind: PrimKind::WithInterp(prim_run),
    },
    // Non-local return
    PrimitiveOp {
        names: &["output"],
        arity: 1,
        kind: PrimKind::Plain(prim_output),
    },
    PrimitiveOp {
        names: &["stop"],
        arity: 0,
        kind: PrimKind::Plain(prim_stop),
    },
];

/// Lazy static map from every registered name to its descriptor.
static PRIMITIVES_BY_NAME: LazyLock<HashMap<&'static str, &'static PrimitiveOp>> =
    LazyLock::new(|| {
        let mut index = HashMap::new();
        for op in PRIMITIVES {
            for name in op.names {
                index.insert(*name, op);
            }
        }
        index
    });

/// All primitive descriptors (for environment construction).
pub(crate) fn all_primitives() -> &'static [PrimitiveOp] {
    PRIMITIVES
}

/// Find a primitive descriptor by any of its registered names.
pub fn find_primitive(name: &str) -> Option<&'static PrimitiveOp> {
    PRIMITIVES_BY_NAME.get(name).copied()
}
