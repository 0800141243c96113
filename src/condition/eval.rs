//! Restricted arithmetic for relational right-hand sides.
//!
//! Accepts numbers, `+ - * /`, parentheses, unary signs and the functions
//! `abs(x)` and `max(x, ...)`. Placeholders such as `$2` must be substituted
//! before evaluation; one left over is reported as [`EvalError::Unbound`].

use std::collections::HashMap;

use pest::iterators::Pair;
use pest::Parser;

use crate::grammar::{PatternGrammar, Rule};

/// Why a right-hand side could not be turned into a number
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("syntax error in `{expr}`: {message}")]
    Syntax { expr: String, message: String },

    #[error("unresolved placeholder {0}")]
    Unbound(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("non-finite result in `{0}`")]
    NonFinite(String),
}

fn syntax(expr: &str, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        expr: expr.to_string(),
        message: message.into(),
    }
}

/// Evaluate an already-substituted expression.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let mut pairs =
        PatternGrammar::parse(Rule::expression, expr).map_err(|e| syntax(expr, e.to_string()))?;
    let sum = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| syntax(expr, "empty expression"))?;

    let value = eval_binary(sum)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite(expr.to_string()))
    }
}

/// Replace every `$n` token bound in `bindings` with its value.
///
/// Tokens are matched whole, so `$1` never rewrites part of `$12`.
pub fn substitute(expr: &str, bindings: &HashMap<String, f64>) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let digits = rest[pos + 1..]
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let token = &rest[pos..pos + 1 + digits];
        match bindings.get(token) {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(token),
        }
        rest = &rest[pos + 1 + digits..];
    }

    out.push_str(rest);
    out
}

// `sum` and `product` share the same shape: operand (op operand)*
fn eval_binary(pair: Pair<'_, Rule>) -> Result<f64, EvalError> {
    let text = pair.as_str();
    let operand: fn(Pair<'_, Rule>) -> Result<f64, EvalError> = match pair.as_rule() {
        Rule::sum => eval_binary,
        Rule::product => eval_unary,
        other => return Err(syntax(text, format!("unexpected {other:?}"))),
    };

    let mut inner = pair.into_inner();
    let first = inner.next().ok_or_else(|| syntax(text, "missing operand"))?;
    let mut acc = operand(first)?;

    while let Some(op) = inner.next() {
        let rhs = inner.next().ok_or_else(|| syntax(text, "missing operand"))?;
        let rhs = operand(rhs)?;
        acc = match op.as_str() {
            "+" => acc + rhs,
            "-" => acc - rhs,
            "*" => acc * rhs,
            "/" => {
                let quotient = acc / rhs;
                if !quotient.is_finite() {
                    return Err(EvalError::NonFinite(text.to_string()));
                }
                quotient
            }
            other => return Err(syntax(text, format!("unknown operator `{other}`"))),
        };
    }

    Ok(acc)
}

fn eval_unary(pair: Pair<'_, Rule>) -> Result<f64, EvalError> {
    let text = pair.as_str();
    let mut negate = false;

    for p in pair.into_inner() {
        if p.as_rule() == Rule::sign {
            if p.as_str() == "-" {
                negate = !negate;
            }
            continue;
        }
        let value = eval_primary(p)?;
        return Ok(if negate { -value } else { value });
    }

    Err(syntax(text, "missing operand"))
}

fn eval_primary(pair: Pair<'_, Rule>) -> Result<f64, EvalError> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::number => text.parse::<f64>().map_err(|e| syntax(text, e.to_string())),
        Rule::placeholder => Err(EvalError::Unbound(text.to_string())),
        Rule::sum => eval_binary(pair),
        Rule::call => eval_call(pair),
        other => Err(syntax(text, format!("unexpected {other:?}"))),
    }
}

fn eval_call(pair: Pair<'_, Rule>) -> Result<f64, EvalError> {
    let text = pair.as_str();
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| syntax(text, "missing function name"))?
        .as_str();
    let args = inner.map(eval_binary).collect::<Result<Vec<_>, _>>()?;

    match name {
        "abs" => match args.as_slice() {
            [x] => Ok(x.abs()),
            _ => Err(EvalError::Arity {
                name: name.to_string(),
                expected: "1",
                got: args.len(),
            }),
        },
        "max" => args.iter().copied().reduce(f64::max).ok_or(EvalError::Arity {
            name: name.to_string(),
            expected: "at least 1",
            got: 0,
        }),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}
