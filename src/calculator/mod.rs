//! Sandboxed arithmetic expression evaluator.
//!
//! Only numeric literals, the standard arithmetic operators and a fixed
//! allow-list of math functions are accepted. Names are never resolved.

pub mod number;
pub mod parser;

pub use number::Number;

use parser::{BinaryOp, Expr, UnaryOp};
use thiserror::Error;
use tracing::debug;

/// Functions callable from an expression.
pub const MATH_FUNCTIONS: &[&str] = &["sqrt", "log", "sin", "cos", "tan", "exp"];

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("invalid syntax ({0})")]
    Syntax(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("float division by zero")]
    FloatDivisionByZero,
    #[error("math domain error")]
    Domain,
    #[error("math range error")]
    Range,
    #[error("Sorry! I don't want to evaluate {base} ** {exponent}")]
    NumberTooHigh { base: String, exponent: String },
    #[error("Function '{name}' not defined, for expression '{expression}'.")]
    FunctionNotDefined { name: String, expression: String },
    #[error("'{name}' is not defined for expression '{expression}'")]
    NameNotDefined { name: String, expression: String },
    #[error("{0}")]
    Arity(String),
}

/// Evaluate an expression and render the result as text.
///
/// Failures come back as `"Error: <message>"` rather than an `Err`.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(value) => value.to_string(),
        Err(e) => {
            debug!("Expression {:?} failed: {}", expression, e);
            format!("Error: {}", e)
        }
    }
}

/// Evaluate an expression to a number.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let tree = parser::parse(expression)?;
    Evaluator { expression }.eval(&tree)
}

struct Evaluator<'a> {
    expression: &'a str,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Number, CalcError> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Name(name) => Err(CalcError::NameNotDefined {
                name: name.clone(),
                expression: self.expression.to_string(),
            }),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => value.neg(),
                })
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                match op {
                    BinaryOp::Add => Ok(a.add(b)),
                    BinaryOp::Sub => Ok(a.sub(b)),
                    BinaryOp::Mul => Ok(a.mul(b)),
                    BinaryOp::Div => a.div(b),
                    BinaryOp::FloorDiv => a.floor_div(b),
                    BinaryOp::Mod => a.rem(b),
                    BinaryOp::Pow => a.pow(b),
                }
            }
            Expr::Call { name, args } => self.call(name, args),
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Number, CalcError> {
        if !MATH_FUNCTIONS.contains(&name) {
            return Err(CalcError::FunctionNotDefined {
                name: name.to_string(),
                expression: self.expression.to_string(),
            });
        }

        let values = args
            .iter()
            .map(|a| self.eval(a).map(Number::as_f64))
            .collect::<Result<Vec<f64>, _>>()?;

        if name == "log" {
            return log(&values);
        }

        let &[x] = values.as_slice() else {
            return Err(CalcError::Arity(format!(
                "{}() takes exactly one argument ({} given)",
                name,
                values.len()
            )));
        };

        let result = match name {
            "sqrt" if x < 0.0 => return Err(CalcError::Domain),
            "sqrt" => x.sqrt(),
            "exp" => x.exp(),
            "sin" | "cos" | "tan" if x.is_infinite() => return Err(CalcError::Domain),
            "sin" => x.sin(),
            "cos" => x.cos(),
            _ => x.tan(),
        };

        if result.is_infinite() && x.is_finite() {
            return Err(CalcError::Range);
        }
        Ok(Number::Float(result))
    }
}

/// Natural log, or `log(x, base)`.
fn log(values: &[f64]) -> Result<Number, CalcError> {
    let ln = |x: f64| {
        if x <= 0.0 {
            Err(CalcError::Domain)
        } else {
            Ok(x.ln())
        }
    };

    match values {
        [x] => Ok(Number::Float(ln(*x)?)),
        [x, base] => {
            let denominator = ln(*base)?;
            if denominator == 0.0 {
                return Err(CalcError::FloatDivisionByZero);
            }
            Ok(Number::Float(ln(*x)? / denominator))
        }
        [] => Err(CalcError::Arity(
            "log expected at least 1 argument, got 0".to_string(),
        )),
        _ => Err(CalcError::Arity(format!(
            "log expected at most 2 arguments, got {}",
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(calculate("2 + 2"), "4");
        assert_eq!(calculate("2 + 3 * 4"), "14");
        assert_eq!(calculate("(2 + 3) * 4"), "20");
        assert_eq!(calculate("7 // 2"), "3");
        assert_eq!(calculate("-7 % 3"), "2");
        assert_eq!(calculate("2 ** 10"), "1024");
        assert_eq!(calculate("-2 ** 2"), "-4");
        assert_eq!(calculate("2 ** 3 ** 2"), "512");
    }

    #[test]
    fn test_true_division_is_float() {
        assert_eq!(calculate("6 / 3"), "2.0");
        assert_eq!(calculate("7 / 2"), "3.5");
        assert_eq!(calculate("2 ** -1"), "0.5");
        assert_eq!(calculate("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_functions() {
        assert_eq!(calculate("sqrt(16)"), "4.0");
        assert_eq!(calculate("exp(0)"), "1.0");
        assert_eq!(calculate("sin(0)"), "0.0");
        assert_eq!(calculate("cos(0) + 1"), "2.0");
        assert_eq!(calculate("log(1)"), "0.0");
        assert_eq!(calculate("log(8, 2)"), "3.0");
        assert_eq!(calculate("sqrt(2 * 8) + 1"), "5.0");
    }

    #[test]
    fn test_errors_are_prefixed() {
        assert_eq!(calculate("1 / 0"), "Error: division by zero");
        assert_eq!(calculate("5 % 0"), "Error: division by zero");
        assert_eq!(calculate("sqrt(-1)"), "Error: math domain error");
        assert_eq!(calculate("log(0)"), "Error: math domain error");
        assert_eq!(calculate("exp(1000)"), "Error: math range error");
        assert_eq!(
            calculate("9 ** 5000000"),
            "Error: Sorry! I don't want to evaluate 9 ** 5000000"
        );
    }

    #[test]
    fn test_disallowed_names() {
        assert_eq!(
            calculate("foo(1)"),
            "Error: Function 'foo' not defined, for expression 'foo(1)'."
        );
        assert_eq!(
            calculate("pi * 2"),
            "Error: 'pi' is not defined for expression 'pi * 2'"
        );
        assert_eq!(
            calculate("__import__(1)"),
            "Error: Function '__import__' not defined, for expression '__import__(1)'."
        );
    }

    #[test]
    fn test_arity() {
        assert_eq!(
            calculate("sqrt(1, 2)"),
            "Error: sqrt() takes exactly one argument (2 given)"
        );
        assert_eq!(
            calculate("log()"),
            "Error: log expected at least 1 argument, got 0"
        );
        assert_eq!(
            calculate("log(1, 2, 3)"),
            "Error: log expected at most 2 arguments, got 3"
        );
    }

    #[test]
    fn test_syntax_error() {
        assert!(calculate("2 +").starts_with("Error: invalid syntax"));
        assert_eq!(calculate(""), "Error: empty expression");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(calculate(&parens).starts_with("Error: invalid syntax"));

        let signs = format!("{}1", "-".repeat(10_000));
        assert!(calculate(&signs).starts_with("Error: invalid syntax"));

        assert_eq!(calculate("((((2 + 3))))"), "5");
    }

    #[test]
    fn test_log_base_one() {
        assert_eq!(calculate("log(8, 1)"), "Error: float division by zero");
    }

    #[test]
    fn test_evaluate_typed() {
        assert_eq!(evaluate("1 + 1").unwrap(), Number::Int(2));
        assert!(matches!(evaluate("1 / 0"), Err(CalcError::DivisionByZero)));
    }
}
