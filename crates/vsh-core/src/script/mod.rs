//! Sandboxed expression evaluator for scripting mode.
//!
//! A small dynamically typed language with:
//! - number, string, boolean, `null`, `undefined`, array and object values
//! - arithmetic, comparison and short-circuit logical operators
//! - `let` bindings that persist across lines of one [`Interpreter`]
//! - `print`/`console.log` trace output and a handful of builtins
//!
//! There is no I/O, no loops and no user-defined functions; every evaluation
//! terminates.

mod parser;

use std::collections::BTreeMap;

use crate::error::ScriptError;
use crate::models::{OutputLine, ValueKind};
use crate::utils::format::format_number;

use parser::{BinOp, Expr, Parser, Stmt, UnOp, tokenize};

// =============================================================================
// Values
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Numeric coercion (`"12"` is 12, `true` is 1, `undefined` is NaN).
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Array(_) | Self::Object(_) => f64::NAN,
        }
    }

    /// String coercion used by concatenation and `str()`.
    pub fn to_display(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Str(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(|v| match v {
                    Self::Undefined | Self::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => items.iter().map(Value::to_json).collect(),
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Argument formatting for `print`: strings raw, everything else compact.
    fn to_trace(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => self.to_json().to_string(),
            other => other.to_display(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Typed transcript rendering of a final value; `undefined` renders nothing.
    pub fn render(&self) -> Option<OutputLine> {
        match self {
            Self::Undefined => None,
            Self::Null | Self::Bool(_) | Self::Number(_) => {
                Some(OutputLine::value(ValueKind::Primitive, self.to_display()))
            }
            Self::Str(s) => {
                let quoted = serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s));
                Some(OutputLine::value(ValueKind::String, quoted))
            }
            Self::Array(_) | Self::Object(_) => {
                let json = self.to_json();
                let text = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
                Some(OutputLine::value(ValueKind::Structured, text))
            }
        }
    }
}

// =============================================================================
// Interpreter
// =============================================================================

/// Outcome of evaluating one line: trace output plus the final value or error.
#[derive(Debug)]
pub struct Evaluation {
    pub trace: Vec<String>,
    pub result: Result<Value, ScriptError>,
}

impl Evaluation {
    /// Transcript lines: trace first, then the value or `Error: message`.
    pub fn into_lines(self) -> Vec<OutputLine> {
        let mut lines: Vec<OutputLine> = self.trace.into_iter().map(OutputLine::trace).collect();
        match self.result {
            Ok(value) => lines.extend(value.render()),
            Err(e) => lines.push(OutputLine::error(format!("Error: {}", e))),
        }
        lines
    }
}

/// Evaluator with bindings that live as long as one scripting session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpreter {
    vars: BTreeMap<String, Value>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn eval(&mut self, src: &str) -> Evaluation {
        let mut trace = Vec::new();
        let result = self.run(src, &mut trace);
        Evaluation { trace, result }
    }

    fn run(&mut self, src: &str, trace: &mut Vec<String>) -> Result<Value, ScriptError> {
        let program = Parser::new(tokenize(src)?).parse_program()?;
        let mut last = Value::Undefined;
        for stmt in program {
            last = match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.expr(&expr, trace)?;
                    self.vars.insert(name, value);
                    Value::Undefined
                }
                Stmt::Assign(name, expr) => {
                    let value = self.expr(&expr, trace)?;
                    self.vars.insert(name, value.clone());
                    value
                }
                Stmt::Expr(expr) => self.expr(&expr, trace)?,
            };
        }
        Ok(last)
    }

    fn expr(&self, expr: &Expr, trace: &mut Vec<String>) -> Result<Value, ScriptError> {
        Ok(match expr {
            Expr::Num(n) => Value::Number(*n),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Undefined => Value::Undefined,
            Expr::Ident(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::Undefined(name.clone()))?,
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.expr(item, trace))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.expr(value, trace)?);
                }
                Value::Object(map)
            }
            Expr::Unary(op, operand) => {
                let value = self.expr(operand, trace)?;
                match op {
                    UnOp::Neg => Value::Number(-value.to_number()),
                    UnOp::Plus => Value::Number(value.to_number()),
                    UnOp::Not => Value::Bool(!value.is_truthy()),
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.expr(left, trace)?;
                let right = self.expr(right, trace)?;
                binary(*op, &left, &right)
            }
            Expr::And(left, right) => {
                let left = self.expr(left, trace)?;
                if left.is_truthy() {
                    self.expr(right, trace)?
                } else {
                    left
                }
            }
            Expr::Or(left, right) => {
                let left = self.expr(left, trace)?;
                if left.is_truthy() {
                    left
                } else {
                    self.expr(right, trace)?
                }
            }
            Expr::Member(base, prop) => {
                let base = self.expr(base, trace)?;
                member(&base, prop)?
            }
            Expr::Index(base, index) => {
                let base = self.expr(base, trace)?;
                let index = self.expr(index, trace)?;
                match (&base, &index) {
                    (Value::Array(items), Value::Number(n)) => {
                        if *n >= 0.0 && n.fract() == 0.0 {
                            items.get(*n as usize).cloned().unwrap_or(Value::Undefined)
                        } else {
                            Value::Undefined
                        }
                    }
                    (Value::Str(s), Value::Number(n)) => {
                        if *n >= 0.0 && n.fract() == 0.0 {
                            s.chars()
                                .nth(*n as usize)
                                .map(|c| Value::Str(c.to_string()))
                                .unwrap_or(Value::Undefined)
                        } else {
                            Value::Undefined
                        }
                    }
                    _ => member(&base, &index.to_display())?,
                }
            }
            Expr::Call(callee, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.expr(arg, trace))
                    .collect::<Result<Vec<_>, _>>()?;
                call(callee, &args, trace)?
            }
        })
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => match (left, right) {
            (Value::Str(_), _)
            | (_, Value::Str(_))
            | (Value::Array(_) | Value::Object(_), _)
            | (_, Value::Array(_) | Value::Object(_)) => {
                Value::Str(format!("{}{}", left.to_display(), right.to_display()))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinOp::Eq => Value::Bool(left == right),
        BinOp::Ne => Value::Bool(left != right),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

fn member(base: &Value, prop: &str) -> Result<Value, ScriptError> {
    Ok(match base {
        Value::Undefined | Value::Null => {
            return Err(ScriptError::BadAccess(format!(
                "{} (reading '{}')",
                base.type_name(),
                prop
            )));
        }
        Value::Str(s) if prop == "length" => Value::Number(s.chars().count() as f64),
        Value::Array(items) if prop == "length" => Value::Number(items.len() as f64),
        Value::Object(map) => map.get(prop).cloned().unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    })
}

fn call(callee: &str, args: &[Value], trace: &mut Vec<String>) -> Result<Value, ScriptError> {
    let first = args.first().cloned().unwrap_or(Value::Undefined);
    let numbers = || args.iter().map(Value::to_number);

    Ok(match callee {
        "print" | "console.log" | "console.info" | "console.warn" | "console.error" => {
            let line = args.iter().map(Value::to_trace).collect::<Vec<_>>().join(" ");
            trace.push(line);
            Value::Undefined
        }
        "len" => match &first {
            Value::Str(s) => Value::Number(s.chars().count() as f64),
            Value::Array(items) => Value::Number(items.len() as f64),
            Value::Object(map) => Value::Number(map.len() as f64),
            other => {
                return Err(ScriptError::Type(format!(
                    "len() expects a string, array or object, got {}",
                    other.type_name()
                )));
            }
        },
        "keys" => match &first {
            Value::Object(map) => Value::Array(map.keys().cloned().map(Value::Str).collect()),
            Value::Array(items) => Value::Array(
                (0..items.len()).map(|i| Value::Str(i.to_string())).collect(),
            ),
            other => {
                return Err(ScriptError::Type(format!(
                    "keys() expects an object, got {}",
                    other.type_name()
                )));
            }
        },
        "upper" => Value::Str(first.to_display().to_uppercase()),
        "lower" => Value::Str(first.to_display().to_lowercase()),
        "str" | "String" => Value::Str(first.to_display()),
        "num" | "Number" => Value::Number(first.to_number()),
        "Math.abs" => Value::Number(first.to_number().abs()),
        "Math.floor" => Value::Number(first.to_number().floor()),
        "Math.ceil" => Value::Number(first.to_number().ceil()),
        "Math.round" => Value::Number((first.to_number() + 0.5).floor()),
        "Math.sqrt" => Value::Number(first.to_number().sqrt()),
        "Math.pow" => {
            let exp = args.get(1).map(Value::to_number).unwrap_or(f64::NAN);
            Value::Number(first.to_number().powf(exp))
        }
        "Math.max" => Value::Number(numbers().fold(f64::NEG_INFINITY, f64::max)),
        "Math.min" => Value::Number(numbers().fold(f64::INFINITY, f64::min)),
        other => return Err(ScriptError::NotAFunction(other.to_string())),
    })
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Evaluate a single arithmetic expression to a number.
pub fn evaluate_arithmetic(src: &str) -> Result<f64, ScriptError> {
    let expr = Parser::new(tokenize(src)?).parse_expression()?;
    match Interpreter::new().expr(&expr, &mut Vec::new())? {
        Value::Number(n) => Ok(n),
        other => Err(ScriptError::Type(format!(
            "expected a number, got {}",
            other.type_name()
        ))),
    }
}
