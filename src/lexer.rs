//! Line lexer and token cursor.
//!
//! The lexer is line-oriented and has no cross-line state: one physical
//! source line (comments already stripped by the host) becomes a flat
//! sequence of tokens in which each bracketed `[...]` region is a single
//! nested [`Value::List`] token, lexed recursively. `"` and `:` prefixes
//! survive on their tokens as markers; parentheses and brackets delimit
//! themselves regardless of adjacent characters.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::value,
    error::ErrorKind,
    sequence::preceded,
};

use std::fmt;

use crate::ast::{InfixOp, NumberType, Value};
use crate::{Error, MAX_LEX_DEPTH};

/// Characters that end a token no matter what precedes them.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "()[]".contains(c)
}

/// Numeric classification for a candidate token. Deliberately narrower than
/// `f64::from_str`: `inf`, `nan`, and friends stay words.
fn parse_number_text(text: &str) -> Option<NumberType> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let looks_numeric = first.is_ascii_digit()
        || ((first == '-' || first == '.')
            && chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'));
    if !looks_numeric {
        return None;
    }
    text.parse::<NumberType>().ok()
}

/// Parse one atom: everything up to the next delimiter, classified by its
/// leading marker, then as an infix symbol, then as a number, then a word.
fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (rest, text) = take_while1(|c: char| !is_delimiter(c)).parse(input)?;

    let token = if let Some(name) = text.strip_prefix('"') {
        Value::Quoted(name.to_owned())
    } else if let Some(name) = text.strip_prefix(':') {
        Value::VarRef(name.to_owned())
    } else if let Some(op) = InfixOp::from_symbol(text) {
        Value::Infix(op)
    } else if let Some(n) = parse_number_text(text) {
        Value::Number(n)
    } else {
        Value::Word(text.to_owned())
    };

    Ok((rest, token))
}

/// Parse a bracketed list: contents are lexed recursively, so the token
/// carries tokens, not strings.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut rest, _) = char('[').parse(input)?;
    let mut items = Vec::new();

    loop {
        let (after, _) = multispace0.parse(rest)?;
        if let Some(stripped) = after.strip_prefix(']') {
            return Ok((stripped, Value::List(items)));
        }
        if after.is_empty() {
            // Ran off the end of the line with the bracket still open
            return Err(nom::Err::Failure(nom::error::Error::new(
                after,
                ErrorKind::Char,
            )));
        }
        let (next, token) = parse_token(after, depth + 1)?;
        items.push(token);
        rest = next;
    }
}

fn parse_token(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_LEX_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    preceded(
        multispace0,
        alt((
            value(Value::OpenParen, char('(')),
            value(Value::CloseParen, char(')')),
            |input| parse_list(input, depth),
            parse_atom,
        )),
    )
    .parse(input)
}

/// Convert nom lexing errors to user-friendly messages
fn lex_error_to_message(line: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            ErrorKind::TooLarge => Error::new(format!(
                "Too many nested brackets (max depth: {MAX_LEX_DEPTH})"
            )),
            ErrorKind::Char => Error::new(format!("Unbalanced [ in {line}")),
            _ => Error::new(format!("Cannot read {line}")),
        },
        nom::Err::Incomplete(_) => Error::new(format!("Incomplete input in {line}")),
    }
}

/// Lex one physical source line into tokens.
pub fn lex_line(line: &str) -> Result<Vec<Value>, Error> {
    let mut tokens = Vec::new();
    let mut rest = line;

    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            return Ok(tokens);
        }
        if trimmed.starts_with(']') {
            return Err(Error::new(format!("Unexpected ] in {line}")));
        }
        match parse_token(trimmed, 0) {
            Ok((next, token)) => {
                tokens.push(token);
                rest = next;
            }
            Err(error) => return Err(lex_error_to_message(line, error)),
        }
    }
}

/// A read-only, forward-consuming view of a token sequence.
#[derive(Debug, Clone)]
pub struct Cursor {
    tokens: Vec<Value>,
    position: usize,
}

impl Cursor {
    pub fn new(tokens: Vec<Value>) -> Self {
        Cursor {
            tokens,
            position: 0,
        }
    }

    /// The next token, without consuming it.
    pub fn current(&self) -> Option<&Value> {
        self.tokens.get(self.position)
    }

    /// Remove and return the next token.
    pub fn pop(&mut self) -> Option<Value> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }
}

impl fmt::Display for Cursor {
    /// Human-readable position for error messages: consumed tokens, a `·`
    /// marker, then the remaining tokens.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens[..self.position] {
            write!(f, "{} ", token.token_form())?;
        }
        write!(f, "·")?;
        for token in &self.tokens[self.position..] {
            write!(f, " {}", token.token_form())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{list, num, word};

    /// Test result variants for lexer tests
    #[derive(Debug)]
    enum LexResult {
        Tokens(Vec<Value>),
        SpecificError(&'static str),
    }
    use LexResult::*;

    fn run_lex_tests(test_cases: Vec<(&str, LexResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Lex test #{}", i + 1);
            match (lex_line(input), expected) {
                (Ok(actual), Tokens(expected_tokens)) => {
                    assert_eq!(actual, *expected_tokens, "{test_id}: token mismatch for '{input}'");
                }
                (Err(err), SpecificError(expected_text)) => {
                    assert!(
                        err.message().contains(expected_text),
                        "{test_id}: error should contain '{expected_text}', got: {err}"
                    );
                }
                (Ok(actual), SpecificError(expected_text)) => {
                    panic!("{test_id}: expected error containing '{expected_text}', got {actual:?}");
                }
                (Err(err), Tokens(_)) => {
                    panic!("{test_id}: expected tokens for '{input}', got error {err}");
                }
            }
        }
    }

    fn quoted(name: &str) -> Value {
        Value::Quoted(name.to_owned())
    }

    fn varref(name: &str) -> Value {
        Value::VarRef(name.to_owned())
    }

    #[test]
    fn test_lexer_comprehensive() {
        let test_cases = vec![
            // ===== WORDS AND NUMBERS =====
            (
                "print sum product 3 4 8",
                Tokens(vec![
                    word("print"),
                    word("sum"),
                    word("product"),
                    num(3.0),
                    num(4.0),
                    num(8.0),
                ]),
            ),
            ("42", Tokens(vec![num(42.0)])),
            ("-5", Tokens(vec![num(-5.0)])),
            ("3.5", Tokens(vec![num(3.5)])),
            (".5", Tokens(vec![num(0.5)])),
            ("-.25", Tokens(vec![num(-0.25)])),
            ("1e3", Tokens(vec![num(1000.0)])),
            // Numeric-looking spellings that stay words
            ("inf", Tokens(vec![word("inf")])),
            ("nan", Tokens(vec![word("nan")])),
            ("-inf", Tokens(vec![word("-inf")])),
            ("3+4", Tokens(vec![word("3+4")])),
            ("--5", Tokens(vec![word("--5")])),
            ("..5", Tokens(vec![word("..5")])),
            // ===== MARKERS =====
            ("\"foo", Tokens(vec![quoted("foo")])),
            (":x", Tokens(vec![varref("x")])),
            // A bare quote is the empty word, quoted
            ("\"", Tokens(vec![quoted("")])),
            ("make \"x 12", Tokens(vec![word("make"), quoted("x"), num(12.0)])),
            // Marker wins over number classification
            ("\"5", Tokens(vec![quoted("5")])),
            (":3", Tokens(vec![varref("3")])),
            // ===== INFIX SYMBOLS =====
            (
                "3 + 4 * 5",
                Tokens(vec![
                    num(3.0),
                    Value::Infix(InfixOp::Add),
                    num(4.0),
                    Value::Infix(InfixOp::Mul),
                    num(5.0),
                ]),
            ),
            ("-", Tokens(vec![Value::Infix(InfixOp::Sub)])),
            (
                "= < >",
                Tokens(vec![
                    Value::Infix(InfixOp::Equal),
                    Value::Infix(InfixOp::Less),
                    Value::Infix(InfixOp::Greater),
                ]),
            ),
            // Only standalone symbols are operators
            ("<=", Tokens(vec![word("<=")])),
            // ===== PARENTHESES =====
            (
                "(print 3)",
                Tokens(vec![
                    Value::OpenParen,
                    word("print"),
                    num(3.0),
                    Value::CloseParen,
                ]),
            ),
            // Self-delimiting regardless of adjacency
            (
                "a(b)c",
                Tokens(vec![
                    word("a"),
                    Value::OpenParen,
                    word("b"),
                    Value::CloseParen,
                    word("c"),
                ]),
            ),
            // ===== LISTS =====
            ("[]", Tokens(vec![list(vec![])])),
            ("[1 2]", Tokens(vec![list(vec![num(1.0), num(2.0)])])),
            // Adjacency inside and around brackets
            ("[1]", Tokens(vec![list(vec![num(1.0)])])),
            (
                "print[1]",
                Tokens(vec![word("print"), list(vec![num(1.0)])]),
            ),
            (
                "[a [b c] d]",
                Tokens(vec![list(vec![
                    word("a"),
                    list(vec![word("b"), word("c")]),
                    word("d"),
                ])]),
            ),
            // Markers and infix symbols survive inside lists as data
            (
                "[product :n 2]",
                Tokens(vec![list(vec![word("product"), varref("n"), num(2.0)])]),
            ),
            (
                "[3 + 4]",
                Tokens(vec![list(vec![
                    num(3.0),
                    Value::Infix(InfixOp::Add),
                    num(4.0),
                ])]),
            ),
            ("[\" ]", Tokens(vec![list(vec![quoted("")])])),
            // ===== WHITESPACE =====
            ("", Tokens(vec![])),
            ("   \t  ", Tokens(vec![])),
            ("\ta\tb ", Tokens(vec![word("a"), word("b")])),
            // ===== ERRORS =====
            ("[1 2", SpecificError("Unbalanced [")),
            ("[a [b] ", SpecificError("Unbalanced [")),
            ("]", SpecificError("Unexpected ]")),
            ("1 ] 2", SpecificError("Unexpected ]")),
        ];

        run_lex_tests(test_cases);
    }

    #[test]
    fn test_lexer_depth_limit() {
        let under_limit = format!(
            "{}x{}",
            "[".repeat(MAX_LEX_DEPTH - 1),
            "]".repeat(MAX_LEX_DEPTH - 1)
        );
        assert!(lex_line(&under_limit).is_ok());

        let over_limit = format!(
            "{}x{}",
            "[".repeat(MAX_LEX_DEPTH + 1),
            "]".repeat(MAX_LEX_DEPTH + 1)
        );
        let err = lex_line(&over_limit).unwrap_err();
        assert!(err.message().contains("nested brackets"));
    }

    #[test]
    fn test_cursor_operations() {
        let mut cursor = Cursor::new(vec![word("a"), num(1.0), word("b")]);
        assert!(!cursor.is_empty());
        assert_eq!(cursor.current(), Some(&word("a")));
        // current does not consume
        assert_eq!(cursor.current(), Some(&word("a")));
        assert_eq!(cursor.pop(), Some(word("a")));
        assert_eq!(cursor.pop(), Some(num(1.0)));
        assert_eq!(cursor.current(), Some(&word("b")));
        assert_eq!(cursor.pop(), Some(word("b")));
        assert!(cursor.is_empty());
        assert_eq!(cursor.pop(), None);
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_cursor_display_marks_position() {
        let mut cursor = Cursor::new(vec![word("sum"), num(3.0), list(vec![num(4.0)])]);
        assert_eq!(format!("{cursor}"), "· sum 3 [4]");
        cursor.pop();
        cursor.pop();
        assert_eq!(format!("{cursor}"), "sum 3 · [4]");
        cursor.pop();
        assert_eq!(format!("{cursor}"), "sum 3 [4] ·");
    }
}
