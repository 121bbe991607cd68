//! Core token and value types for the interpreter.
//!
//! The lexer and the evaluator share one shape: a lexed token and a runtime
//! value are both [`Value`]. Runtime values only ever use the `Number`,
//! `Word`, and `List` variants; the marker variants (`Quoted`, `VarRef`) and
//! the structural variants (`OpenParen`, `CloseParen`, `Infix`) are consumed
//! during evaluation. A list keeps its elements as lexed, markers included,
//! so list data survives a round trip through `run` unchanged.
//!
//! [`Outcome`] is what evaluating one expression produces: a value, the
//! no-value sentinel returned by statements, or the output trap used by
//! `output` and `stop` to request non-local return from a user procedure.

use std::fmt;

/// Type alias for number values in the interpreter.
/// One numeric tag covers integers and floats; integral values display with
/// no fraction.
pub(crate) type NumberType = f64;

/// Infix operator symbols. The lexer recognizes them when they stand alone
/// as a token; the rewriter replaces them with prefix procedure calls, so
/// the evaluator never dispatches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    Less,
    Greater,
}

impl InfixOp {
    pub(crate) fn from_symbol(text: &str) -> Option<InfixOp> {
        match text {
            "+" => Some(InfixOp::Add),
            "-" => Some(InfixOp::Sub),
            "*" => Some(InfixOp::Mul),
            "/" => Some(InfixOp::Div),
            "=" => Some(InfixOp::Equal),
            "<" => Some(InfixOp::Less),
            ">" => Some(InfixOp::Greater),
            _ => None,
        }
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Equal => "=",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
        }
    }

    /// The prefix procedure the rewriter substitutes for this operator.
    pub(crate) fn procedure_name(self) -> &'static str {
        match self {
            InfixOp::Add => "sum",
            InfixOp::Sub => "difference",
            InfixOp::Mul => "product",
            InfixOp::Div => "div",
            InfixOp::Equal => "equalp",
            InfixOp::Less => "lessp",
            InfixOp::Greater => "greaterp",
        }
    }

    /// Precedence level, lowest first: comparisons, then additive, then
    /// multiplicative. All levels are left-associative.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            InfixOp::Equal | InfixOp::Less | InfixOp::Greater => 0,
            InfixOp::Add | InfixOp::Sub => 1,
            InfixOp::Mul | InfixOp::Div => 2,
        }
    }
}

/// One token of a lexed line, doubling as a runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A numeric literal.
    Number(NumberType),
    /// An unquoted bareword: procedure name, keyword, or symbolic atom.
    /// The words `True` and `False` are the boolean values.
    Word(String),
    /// A bareword carrying a leading `"` marker; evaluates to the bareword.
    Quoted(String),
    /// A bareword carrying a leading `:` marker; evaluates to the current
    /// binding of the named variable.
    VarRef(String),
    /// A bracketed list, lexed recursively. Self-evaluating.
    List(Vec<Value>),
    /// Grouping markers.
    OpenParen,
    CloseParen,
    /// An infix operator token. Removed by the rewriter.
    Infix(InfixOp),
}

impl Value {
    pub(crate) fn boolean(value: bool) -> Value {
        Value::Word(if value { "True" } else { "False" }.to_owned())
    }

    /// The boolean a literal `True`/`False` word denotes, if any.
    pub(crate) fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Word(word) if word == "True" => Some(true),
            Value::Word(word) if word == "False" => Some(false),
            _ => None,
        }
    }

    /// Render the way the token appears inside a line: lists keep their
    /// brackets, markers keep their prefixes. Used by cursor positions,
    /// error messages, and `show`.
    pub(crate) fn token_form(&self) -> String {
        match self {
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::token_form).collect();
                format!("[{}]", inner.join(" "))
            }
            other => format!("{other}"),
        }
    }
}

impl fmt::Display for Value {
    /// Logo display rules: bareword text for words, shortest decimal form
    /// for numbers (integer suffix elided when integral), and for lists the
    /// space-separated elements with each *nested* list wrapped in `[...]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Word(word) => write!(f, "{word}"),
            Value::Quoted(name) => write!(f, "\"{name}"),
            Value::VarRef(name) => write!(f, ":{name}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item.token_form())?;
                }
                Ok(())
            }
            Value::OpenParen => write!(f, "("),
            Value::CloseParen => write!(f, ")"),
            Value::Infix(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// What evaluating one expression produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The expression produced a value.
    Value(Value),
    /// The no-value sentinel: a statement ran and left nothing behind.
    NoValue,
    /// The output trap: `output` carries its payload, `stop` carries none.
    /// Unwound by the innermost user-procedure application.
    Output(Option<Value>),
}

/// Helper function for creating words - works great in mixed lists!
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn word<S: AsRef<str>>(name: S) -> Value {
    Value::Word(name.as_ref().to_owned())
}

/// Helper function for creating numbers.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn num(value: NumberType) -> Value {
    Value::Number(value)
}

/// Helper function for creating lists from element vectors.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn list(items: Vec<Value>) -> Value {
    Value::List(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_data_driven() {
        // Test cases as (value, expected display) pairs
        let test_cases = vec![
            (num(20.0), "20"),
            (num(3.5), "3.5"),
            (num(-7.0), "-7"),
            (num(0.0), "0"),
            (word("hello"), "hello"),
            (word("True"), "True"),
            (Value::Quoted("x".to_owned()), "\"x"),
            (Value::VarRef("n".to_owned()), ":n"),
            // Top-level lists display without outer brackets
            (list(vec![num(1.0), num(2.0)]), "1 2"),
            // Nested lists keep theirs, with no trailing space inside
            (
                list(vec![word("a"), list(vec![word("b"), word("c")])]),
                "a [b c]",
            ),
            (list(vec![]), ""),
            (
                list(vec![Value::Quoted("a".to_owned()), Value::VarRef("b".to_owned())]),
                "\"a :b",
            ),
        ];

        for (value, expected) in test_cases {
            assert_eq!(format!("{value}"), expected, "display of {value:?}");
        }
    }

    #[test]
    fn test_token_form_wraps_lists() {
        let nested = list(vec![num(1.0), list(vec![num(2.0)])]);
        assert_eq!(nested.token_form(), "[1 [2]]");
        assert_eq!(num(4.0).token_form(), "4");
        assert_eq!(Value::Quoted("go".to_owned()).token_form(), "\"go");
    }

    #[test]
    fn test_equality_is_structural() {
        // Numbers compare numerically, words textually, lists element-wise
        assert_eq!(num(2.0), num(2.0));
        assert_ne!(num(2.0), num(2.5));
        assert_eq!(word("ab"), word("ab"));
        assert_ne!(word("ab"), word("Ab"));
        assert_eq!(
            list(vec![num(1.0), list(vec![word("x")])]),
            list(vec![num(1.0), list(vec![word("x")])]),
        );
        assert_ne!(
            list(vec![num(1.0), list(vec![word("x")])]),
            list(vec![num(1.0), list(vec![word("y")])]),
        );
        // Different tags never compare equal
        assert_ne!(num(1.0), word("1"));
        assert_ne!(list(vec![]), word(""));
    }

    #[test]
    fn test_boolean_words() {
        assert_eq!(Value::boolean(true), word("True"));
        assert_eq!(Value::boolean(false), word("False"));
        assert_eq!(word("True").as_boolean(), Some(true));
        assert_eq!(word("False").as_boolean(), Some(false));
        // Exact spelling only
        assert_eq!(word("true").as_boolean(), None);
        assert_eq!(word("TRUE").as_boolean(), None);
        assert_eq!(num(1.0).as_boolean(), None);
    }

    #[test]
    fn test_infix_op_table() {
        let symbols = ["+", "-", "*", "/", "=", "<", ">"];
        for symbol in symbols {
            let op = InfixOp::from_symbol(symbol).unwrap();
            assert_eq!(op.symbol(), symbol);
        }
        assert_eq!(InfixOp::from_symbol("+-"), None);
        assert_eq!(InfixOp::from_symbol("=="), None);
        assert_eq!(InfixOp::from_symbol(""), None);

        assert_eq!(InfixOp::Add.procedure_name(), "sum");
        assert_eq!(InfixOp::Sub.procedure_name(), "difference");
        assert_eq!(InfixOp::Mul.procedure_name(), "product");
        assert_eq!(InfixOp::Div.procedure_name(), "div");
        assert_eq!(InfixOp::Equal.procedure_name(), "equalp");
        assert_eq!(InfixOp::Less.procedure_name(), "lessp");
        assert_eq!(InfixOp::Greater.procedure_name(), "greaterp");

        // Comparisons bind loosest, multiplicative tightest
        assert!(InfixOp::Equal.precedence() < InfixOp::Add.precedence());
        assert!(InfixOp::Add.precedence() < InfixOp::Mul.precedence());
        assert_eq!(InfixOp::Add.precedence(), InfixOp::Sub.precedence());
        assert_eq!(InfixOp::Mul.precedence(), InfixOp::Div.precedence());
        assert_eq!(InfixOp::Less.precedence(), InfixOp::Greater.precedence());
    }
}
