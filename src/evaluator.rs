//! The recursive expression evaluator and its environment.
//!
//! The central contract is `eval_expression`: consume exactly the tokens
//! forming one complete expression at the cursor and return its
//! [`Outcome`]. Because calls carry no parentheses, control flow is driven
//! by procedure arity - applying a procedure of arity `n` recursively
//! evaluates exactly `n` argument expressions from the same cursor.
//!
//! The environment is a non-empty stack of binding frames over a global
//! procedure table. Variable lookup is dynamic: the innermost frame is
//! searched first, falling through to the global frame, so a procedure sees
//! its caller's locals. Procedure bindings are global and do not
//! participate in frame scoping.
//!
//! `output` and `stop` return through [`Outcome::Output`] traps rather than
//! unwinding: the innermost user-procedure application pops its frame and
//! converts the trap into its own result. Every exit path - normal return,
//! trap, or error - leaves the frame stack exactly as deep as it was on
//! entry.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::{Outcome, Value};
use crate::builtinops::{self, PrimKind, PrimitiveOp};
use crate::infix;
use crate::lexer::{self, Cursor};
use crate::{Error, MAX_EVAL_DEPTH};

/// Where the interpreter sends program output. `print`, `show`, and `type`
/// go through this, as do top-level error reports.
pub trait Console {
    fn print_line(&mut self, text: &str);
    fn print_no_newline(&mut self, text: &str);
}

/// The default console: standard output.
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn print_line(&mut self, text: &str) {
        println!("{text}");
    }

    fn print_no_newline(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }
}

/// Supplies source lines to the interpreter. The host is responsible for
/// prompting, comment stripping, and deciding when the session ends.
pub trait LineSource {
    /// The next top-level line, or `None` at end of session.
    fn next_top_level_line(&mut self) -> Result<Option<String>, Error>;

    /// A further line of a `to ... end` definition. Running out of input
    /// mid-definition is an error.
    fn next_continuation_line(&mut self) -> Result<String, Error>;
}

/// A named callable: a primitive descriptor or a user-defined body.
/// Immutable after registration.
#[derive(Debug)]
pub struct Procedure {
    pub name: String,
    /// Number of argument expressions the evaluator collects.
    pub arity: usize,
    pub body: ProcedureBody,
}

#[derive(Debug)]
pub enum ProcedureBody {
    Primitive(&'static PrimitiveOp),
    /// Formal parameter names in order, and body lines as lexed.
    User {
        params: Vec<String>,
        lines: Vec<Vec<Value>>,
    },
}

/// A stack of name-to-value frames plus the global procedure table.
pub struct Environment {
    frames: Vec<HashMap<String, Value>>,
    procedures: HashMap<String, Rc<Procedure>>,
    console: Box<dyn Console>,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_console(Box::new(StdoutConsole))
    }

    /// Build the environment with the global frame and the procedure table
    /// populated from the primitive registry (every alias of a descriptor
    /// maps to one shared procedure).
    pub fn with_console(console: Box<dyn Console>) -> Self {
        let mut procedures = HashMap::new();
        for op in builtinops::all_primitives() {
            let procedure = Rc::new(Procedure {
                name: op.names[0].to_owned(),
                arity: op.arity,
                body: ProcedureBody::Primitive(op),
            });
            for name in op.names {
                procedures.insert((*name).to_owned(), Rc::clone(&procedure));
            }
        }
        Environment {
            frames: vec![HashMap::new()],
            procedures,
            console,
        }
    }

    pub fn push_frame(&mut self, bindings: HashMap<String, Value>) {
        self.frames.push(bindings);
    }

    /// Removes the innermost frame. The global frame is never removed.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Drop every local frame. The top level does this after an error so
    /// the next line starts from the global frame alone.
    pub(crate) fn rewind_to_global(&mut self) {
        self.frames.truncate(1);
    }

    /// The innermost binding of `name`, searching toward the global frame.
    pub fn lookup_variable(&self, name: &str) -> Result<Value, Error> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Ok(value.clone());
            }
        }
        Err(Error::no_value(name))
    }

    /// Updates the innermost frame that already binds `name`; if none does,
    /// creates the binding in the global frame.
    pub fn set_variable_value(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if frame.contains_key(name) {
                frame.insert(name.to_owned(), value);
                return;
            }
        }
        self.frames[0].insert(name.to_owned(), value);
    }

    /// Registers `procedure`, overwriting any prior entry of the same name.
    pub fn define_procedure(&mut self, procedure: Procedure) {
        self.procedures
            .insert(procedure.name.clone(), Rc::new(procedure));
    }

    pub fn lookup_procedure(&self, name: &str) -> Result<Rc<Procedure>, Error> {
        self.procedures
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_procedure(name))
    }

    pub fn print_line(&mut self, text: &str) {
        self.console.print_line(text);
    }

    pub fn print_no_newline(&mut self, text: &str) {
        self.console.print_no_newline(text);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// What argument collection produced: the argument values, or an output
/// trap that surfaced mid-collection and must propagate to the nearest
/// user-procedure boundary.
enum Collected {
    Args(Vec<Value>),
    Trap(Outcome),
}

/// The tree-walking interpreter: owns the environment and the line source.
pub struct Interpreter {
    env: Environment,
    source: Box<dyn LineSource>,
}

impl Interpreter {
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Interpreter {
            env: Environment::new(),
            source,
        }
    }

    pub fn with_console(source: Box<dyn LineSource>, console: Box<dyn Console>) -> Self {
        Interpreter {
            env: Environment::with_console(console),
            source,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Drive a whole session: evaluate top-level lines until the source is
    /// exhausted. Problems in a line are reported through the console and
    /// the loop continues; only a failing source ends the session early.
    pub fn run(&mut self) -> Result<(), Error> {
        while let Some(line) = self.source.next_top_level_line()? {
            self.eval_top_level(&line);
        }
        Ok(())
    }

    /// Evaluate one top-level line, reporting problems through the console
    /// and rewinding the frame stack afterwards.
    pub fn eval_top_level(&mut self, line: &str) {
        match self.eval_source_line(line) {
            Ok(Outcome::NoValue) => {}
            Ok(Outcome::Value(value)) => {
                let message = Error::unconsumed_result(&value.token_form());
                self.report(message.message());
            }
            Ok(Outcome::Output(Some(_))) => {
                self.report("Can only use output inside a procedure.");
            }
            Ok(Outcome::Output(None)) => {
                self.report("Can only use stop inside a procedure.");
            }
            Err(error) => self.report(error.message()),
        }
    }

    fn report(&mut self, message: &str) {
        self.env.print_line(message);
        self.env.rewind_to_global();
    }

    /// Lex, rewrite, and evaluate one line of source text.
    pub fn eval_source_line(&mut self, line: &str) -> Result<Outcome, Error> {
        let tokens = lexer::lex_line(line)?;
        self.eval_token_line(tokens, 0)
    }

    /// Evaluate a token sequence as a line. Every sequence passes through
    /// the infix rewriter at this point, whether it came from source text,
    /// a procedure body, or a list handed to `run`/`if`/`ifelse`.
    pub(crate) fn eval_token_line(
        &mut self,
        tokens: Vec<Value>,
        depth: usize,
    ) -> Result<Outcome, Error> {
        let tokens = infix::rewrite_line(tokens)?;
        let mut cursor = Cursor::new(tokens);
        self.eval_line(&mut cursor, depth)
    }

    /// Evaluate expressions off the cursor until it is exhausted (no-value)
    /// or an expression yields anything else, which is returned immediately
    /// with the remaining tokens unevaluated.
    fn eval_line(&mut self, cursor: &mut Cursor, depth: usize) -> Result<Outcome, Error> {
        while !cursor.is_empty() {
            let outcome = self.eval_expression(cursor, depth)?;
            if !matches!(outcome, Outcome::NoValue) {
                return Ok(outcome);
            }
        }
        Ok(Outcome::NoValue)
    }

    /// Consume exactly the tokens forming one complete expression starting
    /// at the cursor's position and return its outcome.
    fn eval_expression(&mut self, cursor: &mut Cursor, depth: usize) -> Result<Outcome, Error> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(Error::new(format!(
                "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            )));
        }

        let Some(token) = cursor.pop() else {
            return Err(Error::new(format!("Not enough args at {cursor}")));
        };

        match token {
            // Self-evaluating forms
            Value::Number(_) | Value::List(_) => Ok(Outcome::Value(token)),
            // A quoted word evaluates to the bareword without its marker
            Value::Quoted(name) => Ok(Outcome::Value(Value::Word(name))),
            // A variable reference evaluates to its current binding
            Value::VarRef(name) => Ok(Outcome::Value(self.env.lookup_variable(&name)?)),
            Value::OpenParen => {
                let inner = self.eval_expression(cursor, depth + 1)?;
                match cursor.pop() {
                    Some(Value::CloseParen) => Ok(inner),
                    _ => Err(Error::new(format!("Expected ) at {cursor}"))),
                }
            }
            Value::CloseParen => Err(Error::new(format!("Unexpected ) at {cursor}"))),
            // The rewriter removes infix tokens before evaluation; one in
            // operand position had nothing to its left
            Value::Infix(op) => Err(Error::new(format!(
                "Infix operator {} is missing a left operand",
                op.symbol()
            ))),
            Value::Word(name) => {
                if name == "True" || name == "False" {
                    return Ok(Outcome::Value(Value::Word(name)));
                }
                if name == "to" {
                    self.read_definition(cursor)?;
                    return Ok(Outcome::NoValue);
                }
                let procedure = self.env.lookup_procedure(&name)?;
                self.apply_procedure(&procedure, cursor, depth)
            }
        }
    }

    /// Collect the procedure's arguments off the cursor, then apply it.
    fn apply_procedure(
        &mut self,
        procedure: &Rc<Procedure>,
        cursor: &mut Cursor,
        depth: usize,
    ) -> Result<Outcome, Error> {
        let args = match self.collect_args(procedure, cursor, depth)? {
            Collected::Args(args) => args,
            Collected::Trap(trap) => return Ok(trap),
        };

        match &procedure.body {
            ProcedureBody::Primitive(op) => match op.kind {
                PrimKind::Plain(func) => func(&args),
                PrimKind::WithInterp(func) => func(&args, self, depth),
            },
            ProcedureBody::User { params, lines } => self.apply_user(params, lines, args, depth),
        }
    }

    /// Recursively evaluate exactly `arity` argument expressions. A cursor
    /// that runs dry, or an argument that produces no value, is reported as
    /// an incomplete collection; an output trap abandons the call.
    fn collect_args(
        &mut self,
        procedure: &Procedure,
        cursor: &mut Cursor,
        depth: usize,
    ) -> Result<Collected, Error> {
        let mut args = Vec::with_capacity(procedure.arity);
        for found in 0..procedure.arity {
            if cursor.is_empty() {
                return Err(Error::found_only_args(
                    found,
                    procedure.arity,
                    &cursor.to_string(),
                ));
            }
            match self.eval_expression(cursor, depth + 1)? {
                Outcome::Value(value) => args.push(value),
                Outcome::NoValue => {
                    return Err(Error::found_only_args(
                        found,
                        procedure.arity,
                        &cursor.to_string(),
                    ));
                }
                trap @ Outcome::Output(_) => return Ok(Collected::Trap(trap)),
            }
        }
        Ok(Collected::Args(args))
    }

    /// Apply a user-defined procedure: push a frame binding the formals,
    /// evaluate the body line by line, and pop the frame on every exit
    /// path. An output trap from a body line becomes this call's result.
    fn apply_user(
        &mut self,
        params: &[String],
        lines: &[Vec<Value>],
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Outcome, Error> {
        let mut bindings = HashMap::with_capacity(params.len());
        for (param, arg) in params.iter().zip(args) {
            bindings.insert(param.clone(), arg);
        }
        self.env.push_frame(bindings);
        let result = self.run_body(lines, depth);
        self.env.pop_frame();
        result
    }

    fn run_body(&mut self, lines: &[Vec<Value>], depth: usize) -> Result<Outcome, Error> {
        for line in lines {
            match self.eval_token_line(line.clone(), depth + 1)? {
                Outcome::NoValue => {}
                // The trap is consumed here: its payload is the call's
                // result (no payload for stop)
                Outcome::Output(Some(value)) => return Ok(Outcome::Value(value)),
                Outcome::Output(None) => return Ok(Outcome::NoValue),
                Outcome::Value(value) => {
                    return Err(Error::unconsumed_result(&value.token_form()));
                }
            }
        }
        Ok(Outcome::NoValue)
    }

    /// Read a `to <name> :params...` definition: the body comes from
    /// continuation lines until a line holding the single word `end`.
    /// Tokens left on the `to` line after the parameters stay in the cursor
    /// and are evaluated once the definition is registered.
    fn read_definition(&mut self, cursor: &mut Cursor) -> Result<(), Error> {
        let name = match cursor.pop() {
            Some(Value::Word(name)) => name,
            Some(other) => {
                return Err(Error::new(format!(
                    "to needs a procedure name, not {}",
                    other.token_form()
                )));
            }
            None => return Err(Error::new("to needs a procedure name")),
        };

        let mut params = Vec::new();
        while matches!(cursor.current(), Some(Value::VarRef(_))) {
            if let Some(Value::VarRef(param)) = cursor.pop() {
                params.push(param);
            }
        }

        let mut lines = Vec::new();
        loop {
            let text = self.source.next_continuation_line()?;
            let tokens = lexer::lex_line(&text)?;
            if let [Value::Word(only)] = tokens.as_slice()
                && only == "end"
            {
                break;
            }
            // Definitions are not nestable; a body never contains `to`
            if tokens
                .iter()
                .any(|t| matches!(t, Value::Word(w) if w == "to"))
            {
                return Err(Error::new("to definitions cannot be nested"));
            }
            if !tokens.is_empty() {
                lines.push(tokens);
            }
        }

        self.env.define_procedure(Procedure {
            name,
            arity: params.len(),
            body: ProcedureBody::User { params, lines },
        });
        Ok(())
    }
}
