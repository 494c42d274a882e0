//! Row-wise interpreter for parsed expressions.
//!
//! Columns referenced by the expression are loaded once into [`Value`]
//! vectors; the tree is then evaluated for every row. Missing values
//! propagate through arithmetic and comparisons, boolean operators follow
//! three-valued logic, and numeric domain errors (division by zero, `sqrt`
//! of a negative, `log` of a non-positive) yield missing instead of failing.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;

use super::ExpressionError;
use super::ast::{BinaryOp, Expr, Function, Literal, UnaryOp};
use crate::cleaner::parse_datetime_millis;
use crate::config::EngineConfig;
use crate::utils::{MILLIS_PER_DAY, datetime_millis, is_integer_dtype, is_numeric_dtype};

/// A single cell value during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Milliseconds since the Unix epoch, UTC.
    DateTime(i64),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
            Value::DateTime(_) => "datetime",
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    fn float(v: f64) -> Value {
        if v.is_nan() { Value::Null } else { Value::Float(v) }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(v) => Value::Int(*v),
            Literal::Float(v) => Value::float(*v),
            Literal::Str(s) => Value::Text(s.clone()),
        }
    }
}

/// Evaluate `expr` once per row of `df`.
pub(crate) fn evaluate(
    df: &DataFrame,
    expr: &Expr,
    config: &EngineConfig,
) -> Result<Vec<Value>, ExpressionError> {
    let mut columns = HashMap::new();
    for name in expr.columns() {
        let column = df
            .column(name)
            .map_err(|_| ExpressionError::UnknownColumn(name.to_string()))?;
        columns.insert(name, load_column(column.as_materialized_series())?);
    }

    let context = Context {
        columns,
        now_millis: Utc::now().timestamp_millis(),
        config,
    };

    (0..df.height()).map(|row| context.eval(expr, row)).collect()
}

fn load_column(series: &Series) -> Result<Vec<Value>, ExpressionError> {
    let dtype = series.dtype();

    if is_integer_dtype(dtype) {
        let cast = series.cast(&DataType::Int64)?;
        return Ok(cast
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Int))
            .collect());
    }

    if is_numeric_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::float))
            .collect());
    }

    match dtype {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
            .collect()),
        DataType::Boolean => Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect()),
        DataType::Datetime(_, _) | DataType::Date => Ok(datetime_millis(series)?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::DateTime))
            .collect()),
        DataType::Categorical(..) | DataType::Enum(..) => {
            let cast = series.cast(&DataType::String)?;
            Ok(cast
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                .collect())
        }
        DataType::Null => Ok(vec![Value::Null; series.len()]),
        other => Err(ExpressionError::TypeMismatch(format!(
            "column '{}' has unsupported type {}",
            series.name(),
            other
        ))),
    }
}

struct Context<'a> {
    columns: HashMap<&'a str, Vec<Value>>,
    now_millis: i64,
    config: &'a EngineConfig,
}

impl Context<'_> {
    fn eval(&self, expr: &Expr, row: usize) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Column(name) => self
                .columns
                .get(name.as_str())
                .and_then(|values| values.get(row))
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownColumn(name.clone())),
            Expr::Unary { op, operand } => unary(*op, self.eval(operand, row)?),
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let left = self.eval(left, row)?;
                if left == Value::Bool(false) {
                    return Ok(left);
                }
                logical_and(left, self.eval(right, row)?)
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                let left = self.eval(left, row)?;
                if left == Value::Bool(true) {
                    return Ok(left);
                }
                logical_or(left, self.eval(right, row)?)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                match op {
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => self.compare(*op, &left, &right),
                    _ => arithmetic(*op, left, right),
                }
            }
            Expr::InList {
                operand,
                list,
                negated,
            } => {
                let value = self.eval(operand, row)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut found = false;
                let mut saw_null = false;
                for item in list {
                    let item = self.eval(item, row)?;
                    if item.is_null() {
                        saw_null = true;
                    } else if self.compare(BinaryOp::Eq, &value, &item)? == Value::Bool(true) {
                        found = true;
                        break;
                    }
                }
                let result = if found {
                    Value::Bool(true)
                } else if saw_null {
                    Value::Null
                } else {
                    Value::Bool(false)
                };
                if *negated {
                    unary(UnaryOp::Not, result)
                } else {
                    Ok(result)
                }
            }
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, row))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(*function, args)
            }
        }
    }

    fn parse_text_datetime(&self, text: &str) -> Option<i64> {
        parse_datetime_millis(text, self.config)
    }

    /// Datetime view of a value; text is parsed leniently.
    fn to_millis(&self, function: Function, value: &Value) -> Result<Option<i64>, ExpressionError> {
        match value {
            Value::Null => Ok(None),
            Value::DateTime(ms) => Ok(Some(*ms)),
            Value::Text(s) => Ok(self.parse_text_datetime(s)),
            other => Err(ExpressionError::TypeMismatch(format!(
                "{}() expects a datetime, found {}",
                function.name(),
                other.type_name()
            ))),
        }
    }

    fn compare(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        let ordering = match (left, right) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::Text(s)) => self.parse_text_datetime(s).map(|b| a.cmp(&b)),
            (Value::Text(s), Value::DateTime(b)) => self.parse_text_datetime(s).map(|a| a.cmp(b)),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        };

        let result = match ordering {
            Some(ord) => match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::GtEq => ord != Ordering::Less,
                _ => return Err(mismatch(op, left, right)),
            },
            None => match op {
                BinaryOp::Eq => false,
                BinaryOp::NotEq => true,
                _ => return Err(mismatch(op, left, right)),
            },
        };
        Ok(Value::Bool(result))
    }

    fn call(&self, function: Function, args: Vec<Value>) -> Result<Value, ExpressionError> {
        match function {
            Function::Abs => match first(args) {
                Value::Null => Ok(Value::Null),
                Value::Int(v) => Ok(v.checked_abs().map_or(Value::Float((v as f64).abs()), Value::Int)),
                other => numeric(function, &other).map(|v| Value::float(v.abs())),
            },
            Function::Sqrt => float_fn(function, first(args), |v| (v >= 0.0).then(|| v.sqrt())),
            Function::Log => float_fn(function, first(args), |v| (v > 0.0).then(|| v.ln())),
            Function::Log10 => float_fn(function, first(args), |v| (v > 0.0).then(|| v.log10())),
            Function::Exp => float_fn(function, first(args), |v| Some(v.exp())),
            Function::Floor => int_preserving(function, first(args), f64::floor),
            Function::Ceil => int_preserving(function, first(args), f64::ceil),
            Function::Round => {
                let mut args = args.into_iter();
                let value = args.next().unwrap_or(Value::Null);
                let digits = match args.next() {
                    None => 0,
                    Some(Value::Null) => return Ok(Value::Null),
                    Some(Value::Int(d)) => d,
                    Some(other) => {
                        return Err(ExpressionError::TypeMismatch(format!(
                            "round() digits must be an integer, found {}",
                            other.type_name()
                        )));
                    }
                };
                round(function, value, digits)
            }
            Function::Min => extremum(function, args, Ordering::Less),
            Function::Max => extremum(function, args, Ordering::Greater),
            Function::Pow => {
                let mut args = args.into_iter();
                let base = args.next().unwrap_or(Value::Null);
                let exponent = args.next().unwrap_or(Value::Null);
                arithmetic(BinaryOp::Pow, base, exponent)
            }
            Function::Len => text_fn(function, first(args), |s| Value::Int(s.chars().count() as i64)),
            Function::Lower => text_fn(function, first(args), |s| Value::Text(s.to_lowercase())),
            Function::Upper => text_fn(function, first(args), |s| Value::Text(s.to_uppercase())),
            Function::IsNull => Ok(Value::Bool(first(args).is_null())),
            Function::NotNull => Ok(Value::Bool(!first(args).is_null())),
            Function::Coalesce => Ok(args
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null)),
            Function::Year
            | Function::Month
            | Function::Day
            | Function::Weekday
            | Function::Hour => {
                let Some(ms) = self.to_millis(function, &first(args))? else {
                    return Ok(Value::Null);
                };
                let Some(dt) = naive(ms) else {
                    return Ok(Value::Null);
                };
                let part = match function {
                    Function::Year => dt.year() as i64,
                    Function::Month => dt.month() as i64,
                    Function::Day => dt.day() as i64,
                    Function::Weekday => dt.weekday().num_days_from_monday() as i64,
                    _ => dt.hour() as i64,
                };
                Ok(Value::Int(part))
            }
            Function::Date => Ok(self
                .to_millis(function, &first(args))?
                .map_or(Value::Null, |ms| Value::DateTime(truncate_to_day(ms)))),
            Function::Now => Ok(Value::DateTime(self.now_millis)),
            Function::Today => Ok(Value::DateTime(truncate_to_day(self.now_millis))),
            Function::DaysBetween => {
                let mut args = args.into_iter();
                let start = args.next().unwrap_or(Value::Null);
                let end = args.next().unwrap_or(Value::Null);
                match (self.to_millis(function, &start)?, self.to_millis(function, &end)?) {
                    (Some(a), Some(b)) => Ok(Value::Float((b - a) as f64 / MILLIS_PER_DAY as f64)),
                    _ => Ok(Value::Null),
                }
            }
        }
    }
}

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

fn naive(ms: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn truncate_to_day(ms: i64) -> i64 {
    ms.div_euclid(MILLIS_PER_DAY) * MILLIS_PER_DAY
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> ExpressionError {
    ExpressionError::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn numeric(function: Function, value: &Value) -> Result<f64, ExpressionError> {
    value.as_f64().ok_or_else(|| {
        ExpressionError::TypeMismatch(format!(
            "{}() expects a number, found {}",
            function.name(),
            value.type_name()
        ))
    })
}

fn float_fn(
    function: Function,
    value: Value,
    f: impl Fn(f64) -> Option<f64>,
) -> Result<Value, ExpressionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let v = numeric(function, &value)?;
    Ok(f(v).map_or(Value::Null, Value::float))
}

fn int_preserving(
    function: Function,
    value: Value,
    f: impl Fn(f64) -> f64,
) -> Result<Value, ExpressionError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => Ok(Value::Int(v)),
        other => numeric(function, &other).map(|v| Value::float(f(v))),
    }
}

fn text_fn(
    function: Function,
    value: Value,
    f: impl Fn(&str) -> Value,
) -> Result<Value, ExpressionError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Text(s) => Ok(f(&s)),
        other => Err(ExpressionError::TypeMismatch(format!(
            "{}() expects text, found {}",
            function.name(),
            other.type_name()
        ))),
    }
}

fn round(function: Function, value: Value, digits: i64) -> Result<Value, ExpressionError> {
    let digits = digits.clamp(-308, 308) as i32;
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) if digits >= 0 => Ok(Value::Int(v)),
        other => {
            let v = numeric(function, &other)?;
            let factor = 10f64.powi(digits);
            let rounded = (v * factor).round_ties_even() / factor;
            match other {
                Value::Int(_) => Ok(Value::Int(rounded as i64)),
                _ => Ok(Value::float(rounded)),
            }
        }
    }
}

fn extremum(function: Function, args: Vec<Value>, keep: Ordering) -> Result<Value, ExpressionError> {
    let values: Vec<Value> = args.into_iter().filter(|v| !v.is_null()).collect();
    let Some(head) = values.first() else {
        return Ok(Value::Null);
    };

    let incompatible = |value: &Value| {
        ExpressionError::TypeMismatch(format!(
            "{}() cannot compare {} and {}",
            function.name(),
            head.type_name(),
            value.type_name()
        ))
    };

    match head {
        Value::Text(_) | Value::DateTime(_) => {
            let mut best = head.clone();
            for value in &values[1..] {
                let ord = match (&best, value) {
                    (Value::Text(a), Value::Text(b)) => b.cmp(a),
                    (Value::DateTime(a), Value::DateTime(b)) => b.cmp(a),
                    _ => return Err(incompatible(value)),
                };
                if ord == keep {
                    best = value.clone();
                }
            }
            Ok(best)
        }
        _ => {
            if values.iter().all(|v| matches!(v, Value::Int(_))) {
                let ints = values.iter().filter_map(Value::as_i64);
                let best = if keep == Ordering::Less { ints.min() } else { ints.max() };
                return Ok(best.map_or(Value::Null, Value::Int));
            }
            let mut best: Option<f64> = None;
            for value in &values {
                let v = value.as_f64().ok_or_else(|| incompatible(value))?;
                best = Some(match best {
                    None => v,
                    Some(b) if keep == Ordering::Less => b.min(v),
                    Some(b) => b.max(v),
                });
            }
            Ok(best.map_or(Value::Null, Value::float))
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, ExpressionError> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(v)) => {
            Ok(v.checked_neg().map_or(Value::Float(-(v as f64)), Value::Int))
        }
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Int(-(b as i64))),
        (op, other) => Err(ExpressionError::TypeMismatch(format!(
            "cannot apply '{}' to {}",
            match op {
                UnaryOp::Not => "not",
                UnaryOp::Neg => "-",
            },
            other.type_name()
        ))),
    }
}

fn logical_operand(op: BinaryOp, value: &Value) -> Result<Option<bool>, ExpressionError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(ExpressionError::TypeMismatch(format!(
            "'{}' expects boolean operands, found {}",
            op.symbol(),
            other.type_name()
        ))),
    }
}

fn logical_and(left: Value, right: Value) -> Result<Value, ExpressionError> {
    let l = logical_operand(BinaryOp::And, &left)?;
    let r = logical_operand(BinaryOp::And, &right)?;
    Ok(match (l, r) {
        (Some(false), _) | (_, Some(false)) => Value::Bool(false),
        (Some(true), Some(true)) => Value::Bool(true),
        _ => Value::Null,
    })
}

fn logical_or(left: Value, right: Value) -> Result<Value, ExpressionError> {
    let l = logical_operand(BinaryOp::Or, &left)?;
    let r = logical_operand(BinaryOp::Or, &right)?;
    Ok(match (l, r) {
        (Some(true), _) | (_, Some(true)) => Value::Bool(true),
        (Some(false), Some(false)) => Value::Bool(false),
        _ => Value::Null,
    })
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExpressionError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match (&left, &right) {
        (Value::Text(a), Value::Text(b)) if op == BinaryOp::Add => {
            return Ok(Value::Text(format!("{}{}", a, b)));
        }
        (Value::DateTime(a), Value::DateTime(b)) if op == BinaryOp::Sub => {
            return Ok(Value::Float((a - b) as f64 / MILLIS_PER_DAY as f64));
        }
        (Value::DateTime(ms), other) if matches!(op, BinaryOp::Add | BinaryOp::Sub) => {
            let days = other.as_f64().ok_or_else(|| mismatch(op, &left, &right))?;
            let delta = (days * MILLIS_PER_DAY as f64).round() as i64;
            let shifted = if op == BinaryOp::Add { ms.saturating_add(delta) } else { ms.saturating_sub(delta) };
            return Ok(Value::DateTime(shifted));
        }
        (other, Value::DateTime(ms)) if op == BinaryOp::Add => {
            let days = other.as_f64().ok_or_else(|| mismatch(op, &left, &right))?;
            let delta = (days * MILLIS_PER_DAY as f64).round() as i64;
            return Ok(Value::DateTime(ms.saturating_add(delta)));
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return Ok(integer_arithmetic(op, a, b));
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(float_arithmetic(op, a, b)),
        _ => Err(mismatch(op, &left, &right)),
    }
}

fn integer_arithmetic(op: BinaryOp, a: i64, b: i64) -> Value {
    let checked = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => return float_arithmetic(op, a as f64, b as f64),
        BinaryOp::Mod => {
            if b == 0 {
                return Value::Null;
            }
            // Result takes the sign of the divisor.
            a.checked_rem(b).map(|m| if m != 0 && ((m < 0) != (b < 0)) { m + b } else { m })
        }
        BinaryOp::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    };
    checked.map_or_else(|| float_arithmetic(op, a as f64, b as f64), Value::Int)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Value::Null;
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Value::Null;
            }
            a - b * (a / b).floor()
        }
        BinaryOp::Pow => a.powf(b),
        _ => f64::NAN,
    };
    Value::float(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    Int,
    Float,
    Text,
    Bool,
    DateTime,
}

impl OutputKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::Text(_) => Some(Self::Text),
            Value::Bool(_) => Some(Self::Bool),
            Value::DateTime(_) => Some(Self::DateTime),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bool => "boolean",
            Self::DateTime => "datetime",
        }
    }
}

/// Build a typed column from evaluated values.
///
/// Integer and float rows widen to `Float64`; an all-missing result is a
/// `Float64` column of nulls. Any other mix of types is an error.
pub(crate) fn values_to_series(name: &str, values: Vec<Value>) -> Result<Series, ExpressionError> {
    let mut kind: Option<OutputKind> = None;
    for value in &values {
        let Some(current) = OutputKind::of(value) else {
            continue;
        };
        kind = Some(match (kind, current) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(OutputKind::Int), OutputKind::Float) | (Some(OutputKind::Float), OutputKind::Int) => {
                OutputKind::Float
            }
            (Some(a), b) => {
                return Err(ExpressionError::MixedTypes {
                    first: a.name(),
                    second: b.name(),
                });
            }
        });
    }

    let name: PlSmallStr = name.into();
    let series = match kind {
        Some(OutputKind::Int) => Series::new(
            name,
            values.iter().map(Value::as_i64).collect::<Vec<Option<i64>>>(),
        ),
        Some(OutputKind::Text) => Series::new(
            name,
            values
                .into_iter()
                .map(|v| match v {
                    Value::Text(s) => Some(s),
                    _ => None,
                })
                .collect::<Vec<Option<String>>>(),
        ),
        Some(OutputKind::Bool) => Series::new(
            name,
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<Option<bool>>>(),
        ),
        Some(OutputKind::DateTime) => Series::new(
            name,
            values
                .iter()
                .map(|v| match v {
                    Value::DateTime(ms) => Some(*ms),
                    _ => None,
                })
                .collect::<Vec<Option<i64>>>(),
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Some(OutputKind::Float) | None => Series::new(
            name,
            values.iter().map(Value::as_f64).collect::<Vec<Option<f64>>>(),
        ),
    };
    Ok(series)
}

/// Build a row mask; missing entries drop the row.
pub(crate) fn values_to_mask(values: Vec<Value>) -> Result<BooleanChunked, ExpressionError> {
    let mut mask = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Bool(b) => mask.push(b),
            Value::Null => mask.push(false),
            other => return Err(ExpressionError::NotBoolean(other.type_name())),
        }
    }
    Ok(BooleanChunked::from_slice("mask".into(), &mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;
    use pretty_assertions::assert_eq;

    fn eval_all(df: &DataFrame, input: &str) -> Vec<Value> {
        let expr = parse(input).unwrap();
        evaluate(df, &expr, &EngineConfig::default()).unwrap()
    }

    fn sample() -> DataFrame {
        df!(
            "price" => [Some(100.0), Some(250.0), None, Some(80.0)],
            "sqft" => [Some(50i64), Some(0), Some(10), Some(40)],
            "city" => [Some("Paris"), Some("Rome"), Some("Oslo"), None],
            "active" => [Some(true), Some(false), None, Some(true)],
        )
        .unwrap()
    }

    #[test]
    fn test_division_propagates_nulls_and_zero() {
        let values = eval_all(&sample(), "price / sqft");
        assert_eq!(
            values,
            vec![Value::Float(2.0), Value::Null, Value::Null, Value::Float(2.0)]
        );
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let values = eval_all(&sample(), "sqft * 2 + 1");
        assert_eq!(
            values,
            vec![Value::Int(101), Value::Int(1), Value::Int(21), Value::Int(81)]
        );
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        let df = df!("a" => [-7i64, 7]).unwrap();
        assert_eq!(eval_all(&df, "a % 3"), vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_kleene_logic() {
        let values = eval_all(&sample(), "active or price > 90");
        assert_eq!(
            values,
            vec![Value::Bool(true), Value::Bool(true), Value::Null, Value::Bool(true)]
        );

        let values = eval_all(&sample(), "active and price > 90");
        assert_eq!(
            values,
            vec![Value::Bool(true), Value::Bool(false), Value::Null, Value::Bool(false)]
        );
    }

    #[test]
    fn test_text_comparison_and_membership() {
        let values = eval_all(&sample(), "city in ('Paris', 'Oslo')");
        assert_eq!(
            values,
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(true), Value::Null]
        );
    }

    #[test]
    fn test_ordering_across_types_is_an_error() {
        let expr = parse("city > 3").unwrap();
        let result = evaluate(&sample(), &expr, &EngineConfig::default());
        assert!(matches!(result, Err(ExpressionError::TypeMismatch(_))));
    }

    #[test]
    fn test_equality_across_types_is_false() {
        let values = eval_all(&sample(), "city == 3");
        assert_eq!(values[0], Value::Bool(false));
    }

    #[test]
    fn test_functions() {
        let df = df!("x" => [4.0, -1.0], "name" => ["  Ab ", "c"]).unwrap();
        assert_eq!(eval_all(&df, "sqrt(x)"), vec![Value::Float(2.0), Value::Null]);
        assert_eq!(eval_all(&df, "abs(x)"), vec![Value::Float(4.0), Value::Float(1.0)]);
        assert_eq!(eval_all(&df, "len(name)"), vec![Value::Int(5), Value::Int(1)]);
        assert_eq!(
            eval_all(&df, "upper(name)"),
            vec![Value::Text("  AB ".to_string()), Value::Text("C".to_string())]
        );
        assert_eq!(
            eval_all(&df, "max(x, 0)"),
            vec![Value::Float(4.0), Value::Float(0.0)]
        );
        assert_eq!(eval_all(&df, "round(2.5)"), vec![Value::Float(2.0), Value::Float(2.0)]);
        assert_eq!(eval_all(&df, "round(1.256, 2)")[0], Value::Float(1.26));
    }

    #[test]
    fn test_coalesce_and_null_checks() {
        let values = eval_all(&sample(), "coalesce(price, 0)");
        assert_eq!(values[2], Value::Int(0));
        assert_eq!(eval_all(&sample(), "is_null(price)")[2], Value::Bool(true));
    }

    #[test]
    fn test_date_functions() {
        let df = df!("signup" => ["2024-03-15", "not a date"]).unwrap();
        assert_eq!(eval_all(&df, "year(signup)"), vec![Value::Int(2024), Value::Null]);
        assert_eq!(eval_all(&df, "month(signup)"), vec![Value::Int(3), Value::Null]);
        assert_eq!(eval_all(&df, "weekday(signup)")[0], Value::Int(4));
        assert_eq!(
            eval_all(&df, "days_between('2024-03-01', signup)")[0],
            Value::Float(14.0)
        );
    }

    #[test]
    fn test_datetime_compares_with_text() {
        let df = df!("d" => ["2024-01-10", "2023-12-31"]).unwrap();
        let values = eval_all(&df, "date(d) >= '2024-01-01'");
        assert_eq!(values, vec![Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn test_unknown_column() {
        let expr = parse("price / area").unwrap();
        let result = evaluate(&sample(), &expr, &EngineConfig::default());
        assert!(matches!(result, Err(ExpressionError::UnknownColumn(name)) if name == "area"));
    }

    #[test]
    fn test_values_to_series_widens_numbers() {
        let series = values_to_series("x", vec![Value::Int(1), Value::Float(1.5), Value::Null]).unwrap();
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 1);
    }

    #[test]
    fn test_values_to_series_rejects_mixed_types() {
        let result = values_to_series("x", vec![Value::Int(1), Value::Text("a".to_string())]);
        assert!(matches!(result, Err(ExpressionError::MixedTypes { .. })));
    }

    #[test]
    fn test_values_to_series_all_null_is_float() {
        let series = values_to_series("x", vec![Value::Null, Value::Null]).unwrap();
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_values_to_mask() {
        let mask = values_to_mask(vec![Value::Bool(true), Value::Null, Value::Bool(false)]).unwrap();
        let collected: Vec<Option<bool>> = (&mask).into_iter().collect();
        assert_eq!(collected, vec![Some(true), Some(false), Some(false)]);

        assert!(matches!(
            values_to_mask(vec![Value::Int(1)]),
            Err(ExpressionError::NotBoolean("integer"))
        ));
    }
}
