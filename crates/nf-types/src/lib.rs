#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token used for missing cells when rendering or parsing text.
pub const DEFAULT_NA_TOKEN: &str = "NA";

/// Delta degrees of freedom used by `std`/`var` when the caller gives none.
pub const DEFAULT_DDOF: usize = 1;

/// Coarse failure class shared by every error type in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    ShapeMismatch,
    InvalidArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Int,
    Double,
    Bool,
    Str,
}

impl Kind {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Double)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Str => "string",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" | "integer" => Ok(Self::Int),
            "double" | "float" | "float64" => Ok(Self::Double),
            "bool" | "boolean" => Ok(Self::Bool),
            "string" | "str" | "utf8" => Ok(Self::Str),
            _ => Err(TypeError::UnknownKind {
                name: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("cannot cast value of kind {from} to {to}")]
    InvalidCast { from: Kind, to: Kind },
    #[error("cannot cast double {value} to int without loss")]
    LossyFloatToInt { value: f64 },
    #[error("expected 0/1 for bool cast from int but found {value}")]
    InvalidBoolInt { value: i64 },
    #[error("expected 0.0/1.0 for bool cast from double but found {value}")]
    InvalidBoolFloat { value: f64 },
    #[error("unknown column kind {name:?}")]
    UnknownKind { name: String },
}

impl TypeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::InvalidArgument
    }
}

// ── Arithmetic operators ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for bool {}
    impl Sealed for String {}
}

/// Payload types a [`Nullable`] may carry.
pub trait Primitive: sealed::Sealed + Clone + PartialEq + PartialOrd + fmt::Debug {
    const KIND: Kind;

    /// Values that are stored as NA even when given explicitly (NaN).
    fn is_missing(&self) -> bool {
        false
    }

    fn total_order(&self, other: &Self) -> Ordering;

    fn into_value(self) -> Value;

    /// Extracts the payload when `value` is exactly this kind.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Primitive for i64 {
    const KIND: Kind = Kind::Int;

    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl Primitive for f64 {
    const KIND: Kind = Kind::Double;

    fn is_missing(&self) -> bool {
        self.is_nan()
    }

    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl Primitive for bool {
    const KIND: Kind = Kind::Bool;

    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl Primitive for String {
    const KIND: Kind = Kind::Str;

    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Numeric payloads that support the four arithmetic operators.
pub trait Numeric: Primitive + Copy {
    /// `None` when the result is undefined (division by zero, overflow in
    /// integer division, NaN).
    fn checked_op(self, op: ArithmeticOp, rhs: Self) -> Option<Self>;

    fn to_f64(self) -> f64;
}

impl Numeric for i64 {
    fn checked_op(self, op: ArithmeticOp, rhs: Self) -> Option<Self> {
        match op {
            ArithmeticOp::Add => Some(self.wrapping_add(rhs)),
            ArithmeticOp::Sub => Some(self.wrapping_sub(rhs)),
            ArithmeticOp::Mul => Some(self.wrapping_mul(rhs)),
            ArithmeticOp::Div => self.checked_div(rhs),
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Numeric for f64 {
    fn checked_op(self, op: ArithmeticOp, rhs: Self) -> Option<Self> {
        let out = match op {
            ArithmeticOp::Add => self + rhs,
            ArithmeticOp::Sub => self - rhs,
            ArithmeticOp::Mul => self * rhs,
            ArithmeticOp::Div => {
                if rhs == 0.0 {
                    return None;
                }
                self / rhs
            }
        };
        (!out.is_nan()).then_some(out)
    }

    fn to_f64(self) -> f64 {
        self
    }
}

// ── Nullable ───────────────────────────────────────────────────────────

/// A value of `T` that may be missing.
///
/// Arithmetic propagates NA and yields NA on division by zero. Ordered
/// comparisons (`lt`, `gt`, `le`, `ge`) are `false` whenever either side is
/// NA, while equality treats two NAs as equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullable<T>(Option<T>);

impl<T> Nullable<T> {
    #[must_use]
    pub const fn na() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn is_na(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn into_option(self) -> Option<T> {
        self.0
    }
}

impl<T: Clone> Nullable<T> {
    #[must_use]
    pub fn value_or(&self, default: T) -> T {
        self.0.clone().unwrap_or(default)
    }
}

impl<T: Primitive> Nullable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        if value.is_missing() {
            Self(None)
        } else {
            Self(Some(value))
        }
    }

    #[must_use]
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self(None), Self::new)
    }

    /// Ordering of two present values; `None` when either side is NA.
    #[must_use]
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn lt(&self, other: &Self) -> bool {
        self.partial_cmp_value(other) == Some(Ordering::Less)
    }

    #[must_use]
    pub fn gt(&self, other: &Self) -> bool {
        self.partial_cmp_value(other) == Some(Ordering::Greater)
    }

    #[must_use]
    pub fn le(&self, other: &Self) -> bool {
        matches!(
            self.partial_cmp_value(other),
            Some(Ordering::Less | Ordering::Equal)
        )
    }

    #[must_use]
    pub fn ge(&self, other: &Self) -> bool {
        matches!(
            self.partial_cmp_value(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// Total order used for sorting: NA is greater than every present value.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.total_order(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        self.0.clone().map_or(Value::Na, Primitive::into_value)
    }
}

impl<T: Numeric> Nullable<T> {
    /// Applies `op`; NA when either side is NA or the result is undefined.
    #[must_use]
    pub fn apply(self, op: ArithmeticOp, rhs: Self) -> Self {
        match (self.0, rhs.0) {
            (Some(a), Some(b)) => Self::from_option(a.checked_op(op, b)),
            _ => Self(None),
        }
    }
}

impl<T: Primitive> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Primitive> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

impl From<&str> for Nullable<String> {
    fn from(value: &str) -> Self {
        Self(Some(value.to_owned()))
    }
}

impl<T: Primitive> From<Nullable<T>> for Value {
    fn from(value: Nullable<T>) -> Self {
        value.0.map_or(Self::Na, Primitive::into_value)
    }
}

impl<T: fmt::Display> fmt::Display for Nullable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str(DEFAULT_NA_TOKEN),
        }
    }
}

macro_rules! nullable_arith {
    (@op $ty:ty, $trait:ident, $method:ident, $op:expr) => {
        impl $trait for Nullable<$ty> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                self.apply($op, rhs)
            }
        }

        impl $trait<$ty> for Nullable<$ty> {
            type Output = Self;

            fn $method(self, rhs: $ty) -> Self {
                self.apply($op, Nullable::new(rhs))
            }
        }
    };
    ($($ty:ty),*) => {$(
        nullable_arith!(@op $ty, Add, add, ArithmeticOp::Add);
        nullable_arith!(@op $ty, Sub, sub, ArithmeticOp::Sub);
        nullable_arith!(@op $ty, Mul, mul, ArithmeticOp::Mul);
        nullable_arith!(@op $ty, Div, div, ArithmeticOp::Div);
    )*};
}

nullable_arith!(i64, f64);

// ── Value ──────────────────────────────────────────────────────────────

/// A single cell of any kind, or NA.
///
/// `Value` has a total order: kinds rank `Bool < Int < Double < Str < Na`,
/// then payloads compare naturally (`f64::total_cmp` for doubles). This is the
/// order GroupBy keys are iterated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Na,
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Self::Int(_) => Some(Kind::Int),
            Self::Double(_) => Some(Kind::Double),
            Self::Bool(_) => Some(Kind::Bool),
            Self::Str(_) => Some(Kind::Str),
            Self::Na => None,
        }
    }

    #[must_use]
    pub fn is_na(&self) -> bool {
        match self {
            Self::Na => true,
            Self::Double(v) => v.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) if !v.is_nan() => Some(*v),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Casts to `target` without losing information; NA stays NA.
    pub fn cast(&self, target: Kind) -> Result<Self, TypeError> {
        let Some(from) = self.kind() else {
            return Ok(Self::Na);
        };
        if from == target {
            return Ok(self.clone());
        }

        match target {
            Kind::Str => Ok(Self::Str(self.to_string())),
            Kind::Bool => match self {
                Self::Int(v) => match *v {
                    0 => Ok(Self::Bool(false)),
                    1 => Ok(Self::Bool(true)),
                    _ => Err(TypeError::InvalidBoolInt { value: *v }),
                },
                Self::Double(v) => {
                    if *v == 0.0 {
                        Ok(Self::Bool(false))
                    } else if *v == 1.0 {
                        Ok(Self::Bool(true))
                    } else {
                        Err(TypeError::InvalidBoolFloat { value: *v })
                    }
                }
                _ => Err(TypeError::InvalidCast { from, to: target }),
            },
            Kind::Int => match self {
                Self::Bool(v) => Ok(Self::Int(i64::from(*v))),
                Self::Double(v) => {
                    if !v.is_finite() || *v != v.trunc() {
                        return Err(TypeError::LossyFloatToInt { value: *v });
                    }
                    if *v < i64::MIN as f64 || *v > i64::MAX as f64 {
                        return Err(TypeError::LossyFloatToInt { value: *v });
                    }
                    Ok(Self::Int(*v as i64))
                }
                _ => Err(TypeError::InvalidCast { from, to: target }),
            },
            Kind::Double => match self {
                Self::Bool(v) => Ok(Self::Double(if *v { 1.0 } else { 0.0 })),
                Self::Int(v) => Ok(Self::Double(*v as f64)),
                _ => Err(TypeError::InvalidCast { from, to: target }),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Double(v) if !v.is_nan() => 2,
            Self::Str(_) => 3,
            Self::Double(_) | Self::Na => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) if !a.is_nan() && !b.is_nan() => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Double(v) if !v.is_nan() => v.to_bits().hash(state),
            Self::Bool(v) => v.hash(state),
            Self::Str(v) => v.hash(state),
            Self::Double(_) | Self::Na => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) if v.is_nan() => f.write_str(DEFAULT_NA_TOKEN),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::Na => f.write_str(DEFAULT_NA_TOKEN),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::Na
        } else {
            Self::Double(value)
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Na, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;
    use std::collections::BTreeSet;

    use super::{ArithmeticOp, Kind, Nullable, TypeError, Value};

    // ── Nullable arithmetic ────────────────────────────────────────────

    #[test]
    fn arithmetic_propagates_na() {
        let a = Nullable::new(4_i64);
        let na = Nullable::<i64>::na();
        assert!((a + na).is_na());
        assert!((na - a).is_na());
        assert!((na * na).is_na());
        assert_eq!((a + Nullable::new(3)).value(), Some(&7));
        assert_eq!((a * 2).value(), Some(&8));
    }

    #[test]
    fn division_by_zero_is_na() {
        assert!((Nullable::new(4_i64) / 0).is_na());
        assert!((Nullable::new(4.0_f64) / 0.0).is_na());
        assert!((Nullable::new(i64::MIN) / -1).is_na());
        assert_eq!((Nullable::new(7_i64) / 2).value(), Some(&3));
    }

    #[test]
    fn nan_is_stored_as_na() {
        assert!(Nullable::new(f64::NAN).is_na());
        let inf = Nullable::new(f64::INFINITY);
        assert!((inf - inf).is_na());
        assert!(Value::from(f64::NAN).is_na());
    }

    #[test]
    fn integer_overflow_wraps() {
        let out = Nullable::new(i64::MAX).apply(ArithmeticOp::Add, Nullable::new(1));
        assert_eq!(out.value(), Some(&i64::MIN));
    }

    // ── Nullable comparisons ───────────────────────────────────────────

    #[test]
    fn ordered_comparisons_with_na_are_false() {
        let one = Nullable::new(1.0_f64);
        let na = Nullable::<f64>::na();
        assert!(!one.lt(&na));
        assert!(!one.gt(&na));
        assert!(!na.le(&one));
        assert!(!na.ge(&na));
        assert!(one.lt(&Nullable::new(2.0)));
        assert!(one.le(&Nullable::new(1.0)));
    }

    #[test]
    fn equality_treats_na_as_equal() {
        assert_eq!(Nullable::<i64>::na(), Nullable::na());
        assert_ne!(Nullable::new(0_i64), Nullable::na());
    }

    #[test]
    fn sort_cmp_places_na_last() {
        let na = Nullable::<String>::na();
        let z = Nullable::<String>::from("z");
        assert_eq!(z.sort_cmp(&na), Ordering::Less);
        assert_eq!(na.sort_cmp(&z), Ordering::Greater);
        assert_eq!(na.sort_cmp(&na), Ordering::Equal);
    }

    #[test]
    fn value_or_returns_default_for_na() {
        assert!(Nullable::<bool>::na().value_or(true));
        assert_eq!(Nullable::new(5_i64).value_or(0), 5);
    }

    // ── Value ──────────────────────────────────────────────────────────

    #[test]
    fn value_total_order_ranks_kinds_then_payloads() {
        let set: BTreeSet<Value> = [
            Value::Na,
            Value::from("b"),
            Value::Int(3),
            Value::Double(1.5),
            Value::Bool(true),
            Value::Int(-1),
            Value::from("a"),
        ]
        .into_iter()
        .collect();
        let ordered: Vec<Value> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                Value::Bool(true),
                Value::Int(-1),
                Value::Int(3),
                Value::Double(1.5),
                Value::from("a"),
                Value::from("b"),
                Value::Na,
            ]
        );
    }

    #[test]
    fn nullable_collapses_into_value() {
        assert_eq!(Value::from(Nullable::new(2_i64)), Value::Int(2));
        assert_eq!(Value::from(Nullable::<String>::na()), Value::Na);
        assert_eq!(Value::from(None::<bool>), Value::Na);
    }

    #[test]
    fn cast_is_lossless_or_fails() {
        assert_eq!(Value::Double(3.0).cast(Kind::Int), Ok(Value::Int(3)));
        assert_eq!(
            Value::Double(3.5).cast(Kind::Int),
            Err(TypeError::LossyFloatToInt { value: 3.5 })
        );
        assert_eq!(
            Value::Int(2).cast(Kind::Bool),
            Err(TypeError::InvalidBoolInt { value: 2 })
        );
        assert_eq!(Value::Bool(true).cast(Kind::Double), Ok(Value::Double(1.0)));
        assert_eq!(Value::Int(7).cast(Kind::Str), Ok(Value::from("7")));
        assert_eq!(Value::Na.cast(Kind::Int), Ok(Value::Na));
        assert!(matches!(
            Value::from("x").cast(Kind::Int),
            Err(TypeError::InvalidCast { .. })
        ));
    }

    #[test]
    fn display_renders_na_token() {
        assert_eq!(Value::Na.to_string(), "NA");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Nullable::<i64>::na().to_string(), "NA");
    }

    #[test]
    fn kind_parses_common_names() {
        assert_eq!("float64".parse::<Kind>(), Ok(Kind::Double));
        assert_eq!("String".parse::<Kind>(), Ok(Kind::Str));
        assert!("decimal".parse::<Kind>().is_err());
    }

    #[test]
    fn value_serde_round_trip() {
        let values = vec![Value::Int(1), Value::from("x"), Value::Na];
        let json = serde_json::to_string(&values).expect("serialize");
        let back: Vec<Value> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, values);
    }
}
