//! Infix-to-prefix rewriting.
//!
//! Before a token sequence becomes a line for the evaluator, every
//! `⟨expr⟩ ⟨op⟩ ⟨expr⟩` subsequence is rewritten into the prefix call
//! `⟨opname⟩ ⟨expr⟩ ⟨expr⟩` using precedence climbing. Operands are single
//! tokens or parenthesized groups; groups are rewritten recursively inside
//! and treated as atomic outside. List tokens are data and are never
//! rewritten in place - their contents get the same treatment if and when
//! they are evaluated as a line (`run`, `if`, `ifelse`, procedure bodies).

use crate::Error;
use crate::ast::Value;

/// Rewrite one line's tokens, replacing infix operator occurrences with
/// prefix procedure calls. The output contains no `Infix` tokens.
pub fn rewrite_line(tokens: Vec<Value>) -> Result<Vec<Value>, Error> {
    let mut rewritten = Vec::with_capacity(tokens.len());
    let mut pos = 0;
    while pos < tokens.len() {
        let expr = parse_expression(&tokens, &mut pos, 0)?;
        rewritten.extend(expr);
    }
    Ok(rewritten)
}

/// Precedence climbing: parse one operand, then fold in operators at or
/// above `min_level`. Left associativity comes from recursing one level up.
fn parse_expression(
    tokens: &[Value],
    pos: &mut usize,
    min_level: u8,
) -> Result<Vec<Value>, Error> {
    let mut lhs = parse_operand(tokens, pos)?;

    while let Some(Value::Infix(op)) = tokens.get(*pos) {
        let op = *op;
        if op.precedence() < min_level {
            break;
        }
        *pos += 1;
        if *pos >= tokens.len() {
            return Err(Error::new(format!(
                "Infix operator {} is missing a right operand",
                op.symbol()
            )));
        }
        let rhs = parse_expression(tokens, pos, op.precedence() + 1)?;

        let mut combined = Vec::with_capacity(1 + lhs.len() + rhs.len());
        combined.push(Value::Word(op.procedure_name().to_owned()));
        combined.extend(lhs);
        combined.extend(rhs);
        lhs = combined;
    }

    Ok(lhs)
}

/// One atomic operand: a single token, or a whole `(...)` group rewritten
/// recursively. An operator here has nothing to its left, which is a syntax
/// error (there is no unary minus).
fn parse_operand(tokens: &[Value], pos: &mut usize) -> Result<Vec<Value>, Error> {
    match tokens.get(*pos) {
        None => Err(Error::new("Expected an expression at end of line")),
        Some(Value::Infix(op)) => Err(Error::new(format!(
            "Infix operator {} is missing a left operand",
            op.symbol()
        ))),
        Some(Value::OpenParen) => {
            *pos += 1;
            let inner = collect_group(tokens, pos)?;
            let inner = rewrite_line(inner)?;
            let mut group = Vec::with_capacity(inner.len() + 2);
            group.push(Value::OpenParen);
            group.extend(inner);
            group.push(Value::CloseParen);
            Ok(group)
        }
        Some(token) => {
            *pos += 1;
            Ok(vec![token.clone()])
        }
    }
}

/// Consume tokens up to the matching `)`, exclusive. `pos` starts just past
/// the `(` and ends just past the `)`.
fn collect_group(tokens: &[Value], pos: &mut usize) -> Result<Vec<Value>, Error> {
    let mut inner = Vec::new();
    let mut nesting = 1usize;
    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        match token {
            Value::OpenParen => nesting += 1,
            Value::CloseParen => {
                nesting -= 1;
                if nesting == 0 {
                    return Ok(inner);
                }
            }
            _ => {}
        }
        inner.push(token.clone());
    }
    Err(Error::new("Expected ) before end of line"))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::lexer::lex_line;

    /// Rewrite a source line and render the result for comparison.
    fn rewrite_to_text(line: &str) -> Result<String, Error> {
        let tokens = rewrite_line(lex_line(line).unwrap())?;
        let parts: Vec<String> = tokens.iter().map(Value::token_form).collect();
        Ok(parts.join(" "))
    }

    #[test]
    fn test_rewrite_comprehensive() {
        // (input line, rewritten line)
        let test_cases = vec![
            // No operators: tokens pass through untouched
            ("print sum 3 4", "print sum 3 4"),
            ("", ""),
            // Single operator per level
            ("3 + 4", "sum 3 4"),
            ("3 - 4", "difference 3 4"),
            ("3 * 4", "product 3 4"),
            ("3 / 4", "div 3 4"),
            ("3 = 4", "equalp 3 4"),
            ("3 < 4", "lessp 3 4"),
            ("3 > 4", "greaterp 3 4"),
            // Precedence: multiplicative over additive over comparison
            ("3 + 4 * 5", "sum 3 product 4 5"),
            ("3 * 4 + 5", "sum product 3 4 5"),
            ("1 + 2 < 3 * 4", "lessp sum 1 2 product 3 4"),
            // Left associativity within a level
            ("10 - 4 - 3", "difference difference 10 4 3"),
            ("20 / 2 / 5", "div div 20 2 5"),
            ("3 + 4 * 5 + 6", "sum sum 3 product 4 5 6"),
            // A leading word is its own expression
            ("print 3 + 4 * 5 + 6", "print sum sum 3 product 4 5 6"),
            // Operands can be any single token
            (":n - 1", "difference :n 1"),
            ("\"a = \"b", "equalp \"a \"b"),
            // Parenthesized groups are rewritten inside and stay atomic
            ("(3 + 4) * 5", "product ( sum 3 4 ) 5"),
            ("2 * (3 + 4)", "product 2 ( sum 3 4 )"),
            ("((1 + 2))", "( ( sum 1 2 ) )"),
            // Lists are data: contents are left untouched
            ("print [3 + 4]", "print [3 + 4]"),
            ("ifelse equal? :n 1 [1] [product :n 2]", "ifelse equal? :n 1 [1] [product :n 2]"),
            // Multiple independent expressions on one line
            ("make \"x 1 + 2 print :x", "make \"x sum 1 2 print :x"),
        ];

        for (input, expected) in test_cases {
            let actual = rewrite_to_text(input).unwrap();
            assert_eq!(actual, expected, "rewrite of '{input}'");
        }
    }

    #[test]
    fn test_rewrite_errors() {
        // (input line, expected message fragment)
        let error_cases = vec![
            // No unary minus: an operator with no left operand
            ("- 5", "missing a left operand"),
            ("* 3 4", "missing a left operand"),
            ("print 3 + + 4", "missing a left operand"),
            ("(+ 1 2)", "missing a left operand"),
            // Trailing operator
            ("3 +", "missing a right operand"),
            ("(3 -)", "missing a right operand"),
            // Unclosed group
            ("(3 + 4", "Expected )"),
        ];

        for (input, expected) in error_cases {
            let err = rewrite_to_text(input).unwrap_err();
            assert!(
                err.message().contains(expected),
                "rewrite of '{input}': expected '{expected}', got: {err}"
            );
        }
    }

    #[test]
    fn test_rewrite_output_has_no_infix_tokens() {
        let lines = [
            "1 + 2 * 3 - 4 / 5",
            "(1 + 2) * (3 - 4)",
            "a + b < c * d",
        ];
        for line in lines {
            let rewritten = rewrite_line(lex_line(line).unwrap()).unwrap();
            assert!(
                rewritten
                    .iter()
                    .all(|t| !matches!(t, Value::Infix(_))),
                "infix token survived rewriting '{line}'"
            );
        }
    }
}
