#![forbid(unsafe_code)]

use std::cmp::Ordering;

use nf_columnar::{Column, ColumnError, Element};
use nf_types::{ErrorCategory, Kind, Nullable, Numeric, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use nf_types::ArithmeticOp;

/// Element-wise comparison operations that produce `Bool` columns.
///
/// NA on either side produces NA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

impl ComparisonOp {
    #[must_use]
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Gt => ord == Ordering::Greater,
            Self::Lt => ord == Ordering::Less,
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Ge => ord != Ordering::Less,
            Self::Le => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Abs,
    Sqrt,
    Square,
    Log,
    Log10,
    Exp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CumulativeOp {
    Sum,
    Prod,
    Min,
    Max,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    #[error("{op} is not supported for {kind} columns")]
    UnsupportedKind { op: &'static str, kind: Kind },
    #[error("column kind mismatch: left={left}, right={right}")]
    KindMismatch { left: Kind, right: Kind },
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("scalar operand must be int or double, got {value}")]
    NonNumericScalar { value: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Column(#[from] ColumnError),
}

impl MathError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LengthMismatch { .. } => ErrorCategory::ShapeMismatch,
            Self::UnsupportedKind { .. }
            | Self::KindMismatch { .. }
            | Self::NonNumericScalar { .. }
            | Self::DivisionByZero => ErrorCategory::InvalidArgument,
            Self::Column(err) => err.category(),
        }
    }
}

fn widen(values: &[Nullable<i64>]) -> Vec<Nullable<f64>> {
    values
        .iter()
        .map(|v| Nullable::from_option(v.value().map(|x| *x as f64)))
        .collect()
}

fn typed_fill<T: Element>(fill: &Value) -> Result<Nullable<T>, MathError> {
    let cast = fill.cast(T::KIND).map_err(ColumnError::from)?;
    Ok(Nullable::from_option(T::from_value(&cast)))
}

fn binary_typed<T: Numeric>(
    left: &[Nullable<T>],
    right: &[Nullable<T>],
    op: ArithmeticOp,
    fill: Nullable<T>,
) -> Vec<Nullable<T>> {
    left.iter()
        .enumerate()
        .map(|(i, &l)| {
            let Some(&r) = right.get(i) else {
                return l;
            };
            let (l, r) = match (l.is_na(), r.is_na()) {
                (true, true) => (fill, fill),
                (true, false) => (fill, r),
                (false, true) => (l, fill),
                (false, false) => (l, r),
            };
            l.apply(op, r)
        })
        .collect()
}

/// Combines two columns of the same numeric kind element by element.
///
/// Pairs are combined up to the shorter length and the result has the left's
/// length; cells past the end of `right` keep the left's value. When `fill`
/// is not NA it (cast to the column kind) stands in for each NA side, so two
/// NA cells combine as `fill op fill`.
pub fn binary(
    left: &Column,
    right: &Column,
    op: ArithmeticOp,
    fill: &Value,
) -> Result<Column, MathError> {
    match (left, right) {
        (Column::Int(l), Column::Int(r)) => Ok(Column::Int(binary_typed(
            l,
            r,
            op,
            typed_fill(fill)?,
        ))),
        (Column::Double(l), Column::Double(r)) => Ok(Column::Double(binary_typed(
            l,
            r,
            op,
            typed_fill(fill)?,
        ))),
        _ if left.kind() != right.kind() => Err(MathError::KindMismatch {
            left: left.kind(),
            right: right.kind(),
        }),
        _ => Err(MathError::UnsupportedKind {
            op: op.symbol(),
            kind: left.kind(),
        }),
    }
}

/// Checks that `scalar` can be an arithmetic operand for `op`.
pub fn validate_scalar(op: ArithmeticOp, scalar: &Value) -> Result<(), MathError> {
    match scalar {
        Value::Int(_) | Value::Double(_) => {}
        other => {
            return Err(MathError::NonNumericScalar {
                value: other.to_string(),
            });
        }
    }
    if op == ArithmeticOp::Div && scalar.as_f64() == Some(0.0) {
        return Err(MathError::DivisionByZero);
    }
    Ok(())
}

fn scalar_typed<T: Numeric>(values: &[Nullable<T>], op: ArithmeticOp, rhs: T) -> Vec<Nullable<T>> {
    let rhs = Nullable::new(rhs);
    values.iter().map(|&v| v.apply(op, rhs)).collect()
}

/// Applies `op` with a scalar right operand to every present cell.
///
/// Bool and Str columns are returned unchanged. A Double scalar promotes an
/// Int column to Double.
pub fn scalar(column: &Column, op: ArithmeticOp, value: &Value) -> Result<Column, MathError> {
    validate_scalar(op, value)?;
    Ok(match (column, value) {
        (Column::Int(values), Value::Int(rhs)) => Column::Int(scalar_typed(values, op, *rhs)),
        (Column::Int(values), Value::Double(rhs)) => {
            Column::Double(scalar_typed(&widen(values), op, *rhs))
        }
        (Column::Double(values), _) => match value.as_f64() {
            Some(rhs) => Column::Double(scalar_typed(values, op, rhs)),
            None => column.clone(),
        },
        _ => column.clone(),
    })
}

// ── Elementwise ────────────────────────────────────────────────────────

fn unary_f64(op: UnaryOp, x: f64) -> Option<f64> {
    let out = match op {
        UnaryOp::Abs => x.abs(),
        UnaryOp::Square => x * x,
        UnaryOp::Exp => x.exp(),
        UnaryOp::Sqrt if x >= 0.0 => x.sqrt(),
        UnaryOp::Log if x > 0.0 => x.ln(),
        UnaryOp::Log10 if x > 0.0 => x.log10(),
        UnaryOp::Sqrt | UnaryOp::Log | UnaryOp::Log10 => return None,
    };
    (!out.is_nan()).then_some(out)
}

/// Applies a one-argument function to every cell.
///
/// `abs` and `square` keep Int columns as Int; the rest produce Double.
/// Out-of-domain inputs (negative square root, non-positive log) become NA.
pub fn unary(column: &Column, op: UnaryOp) -> Result<Column, MathError> {
    match (column, op) {
        (Column::Int(values), UnaryOp::Abs) => Ok(Column::Int(
            values
                .iter()
                .map(|v| Nullable::from_option(v.value().map(|x| x.wrapping_abs())))
                .collect(),
        )),
        (Column::Int(values), UnaryOp::Square) => Ok(Column::Int(
            values
                .iter()
                .map(|v| Nullable::from_option(v.value().map(|x| x.wrapping_mul(*x))))
                .collect(),
        )),
        (Column::Int(_) | Column::Double(_), _) => Ok(Column::Double(
            column
                .to_f64()?
                .into_iter()
                .map(|cell| Nullable::from_option(cell.and_then(|x| unary_f64(op, x))))
                .collect(),
        )),
        (Column::Bool(_) | Column::Str(_), _) => Err(MathError::UnsupportedKind {
            op: "unary",
            kind: column.kind(),
        }),
    }
}

fn compare_typed<T: Element>(
    values: &[Nullable<T>],
    op: ComparisonOp,
    rhs: &T,
) -> Vec<Nullable<bool>> {
    values
        .iter()
        .map(|v| Nullable::from_option(v.value().map(|x| op.holds(x.total_order(rhs)))))
        .collect()
}

/// Compares every cell against `value`, producing a `Bool` column.
///
/// Int and Double compare numerically with each other; other kinds must
/// match exactly. An NA operand yields an all-NA result.
pub fn compare(column: &Column, op: ComparisonOp, value: &Value) -> Result<Column, MathError> {
    if value.is_na() {
        return Ok(Column::nulls(Kind::Bool, column.len()));
    }
    let out = match (column, value) {
        (Column::Int(values), Value::Int(rhs)) => compare_typed(values, op, rhs),
        (Column::Int(values), Value::Double(rhs)) => compare_typed(&widen(values), op, rhs),
        (Column::Double(values), Value::Int(rhs)) => compare_typed(values, op, &(*rhs as f64)),
        (Column::Double(values), Value::Double(rhs)) => compare_typed(values, op, rhs),
        (Column::Bool(values), Value::Bool(rhs)) => compare_typed(values, op, rhs),
        (Column::Str(values), Value::Str(rhs)) => compare_typed(values, op, rhs),
        _ => {
            return Err(MathError::KindMismatch {
                left: column.kind(),
                right: value.kind().unwrap_or(column.kind()),
            });
        }
    };
    Ok(Column::Bool(out))
}

fn compare_pairs<T: Element>(
    left: &[Nullable<T>],
    right: &[Nullable<T>],
    op: ComparisonOp,
) -> Vec<Nullable<bool>> {
    left.iter()
        .zip(right)
        .map(|(l, r)| {
            Nullable::from_option(match (l.value(), r.value()) {
                (Some(a), Some(b)) => Some(op.holds(a.total_order(b))),
                _ => None,
            })
        })
        .collect()
}

/// Compares two same-kind, same-length columns cell by cell.
pub fn compare_columns(
    left: &Column,
    right: &Column,
    op: ComparisonOp,
) -> Result<Column, MathError> {
    if left.len() != right.len() {
        return Err(MathError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    let out = match (left, right) {
        (Column::Int(l), Column::Int(r)) => compare_pairs(l, r, op),
        (Column::Double(l), Column::Double(r)) => compare_pairs(l, r, op),
        (Column::Bool(l), Column::Bool(r)) => compare_pairs(l, r, op),
        (Column::Str(l), Column::Str(r)) => compare_pairs(l, r, op),
        _ => {
            return Err(MathError::KindMismatch {
                left: left.kind(),
                right: right.kind(),
            });
        }
    };
    Ok(Column::Bool(out))
}

// ── Cumulative ─────────────────────────────────────────────────────────

fn cumulative_typed<T: Numeric>(values: &[Nullable<T>], op: CumulativeOp) -> Vec<Nullable<T>> {
    let mut acc: Nullable<T> = Nullable::na();
    values
        .iter()
        .map(|&v| {
            if v.is_na() {
                return v;
            }
            acc = if acc.is_na() {
                v
            } else {
                match op {
                    CumulativeOp::Sum => acc.apply(ArithmeticOp::Add, v),
                    CumulativeOp::Prod => acc.apply(ArithmeticOp::Mul, v),
                    CumulativeOp::Min => {
                        if v.lt(&acc) { v } else { acc }
                    }
                    CumulativeOp::Max => {
                        if v.gt(&acc) { v } else { acc }
                    }
                }
            };
            acc
        })
        .collect()
}

/// Running sum, product, minimum or maximum; NA cells stay NA and are skipped.
pub fn cumulative(column: &Column, op: CumulativeOp) -> Result<Column, MathError> {
    match column {
        Column::Int(values) => Ok(Column::Int(cumulative_typed(values, op))),
        Column::Double(values) => Ok(Column::Double(cumulative_typed(values, op))),
        Column::Bool(_) | Column::Str(_) => Err(MathError::UnsupportedKind {
            op: "cumulative",
            kind: column.kind(),
        }),
    }
}
