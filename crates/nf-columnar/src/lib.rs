#![forbid(unsafe_code)]

use std::cmp::Ordering;

use nf_types::{ErrorCategory, Kind, Nullable, Primitive, TypeError, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A homogeneous vector of nullable cells.
///
/// The kind is fixed at construction; [`Column::cast`] produces a new column.
/// Every per-element operation dispatches with an exhaustive `match` over the
/// four variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Column {
    Int(Vec<Nullable<i64>>),
    Double(Vec<Nullable<f64>>),
    Bool(Vec<Nullable<bool>>),
    Str(Vec<Nullable<String>>),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("column kind mismatch: left={left}, right={right}")]
    KindMismatch { left: Kind, right: Kind },
    #[error("position {position} out of bounds for column of length {len}")]
    IndexOutOfBounds { position: usize, len: usize },
    #[error("invalid slice [{start}, {end}) for column of length {len}")]
    InvalidSlice { start: usize, end: usize, len: usize },
    #[error("operation {op} is not supported for {kind} columns")]
    UnsupportedKind { op: &'static str, kind: Kind },
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ColumnError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LengthMismatch { .. } => ErrorCategory::ShapeMismatch,
            Self::IndexOutOfBounds { .. } => ErrorCategory::NotFound,
            Self::KindMismatch { .. }
            | Self::InvalidSlice { .. }
            | Self::UnsupportedKind { .. }
            | Self::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            Self::Type(err) => err.category(),
        }
    }
}

/// Rebuilds the same variant from a per-variant expression.
macro_rules! map_variants {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            Column::Int($values) => Column::Int($body),
            Column::Double($values) => Column::Double($body),
            Column::Bool($values) => Column::Bool($body),
            Column::Str($values) => Column::Str($body),
        }
    };
}

/// Evaluates a per-variant expression that yields the same type for every kind.
macro_rules! with_variants {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            Column::Int($values) => $body,
            Column::Double($values) => $body,
            Column::Bool($values) => $body,
            Column::Str($values) => $body,
        }
    };
}

/// Payload types that have a matching [`Column`] variant.
pub trait Element: Primitive {
    fn view(column: &Column) -> Option<&[Nullable<Self>]>;

    fn into_column(values: Vec<Nullable<Self>>) -> Column;
}

macro_rules! element_impl {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            fn view(column: &Column) -> Option<&[Nullable<Self>]> {
                match column {
                    Column::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn into_column(values: Vec<Nullable<Self>>) -> Column {
                Column::$variant(values)
            }
        }

        impl From<Vec<$ty>> for Column {
            fn from(values: Vec<$ty>) -> Self {
                Self::$variant(values.into_iter().map(Nullable::new).collect())
            }
        }

        impl From<Vec<Option<$ty>>> for Column {
            fn from(values: Vec<Option<$ty>>) -> Self {
                Self::$variant(values.into_iter().map(Nullable::from_option).collect())
            }
        }

        impl From<Vec<Nullable<$ty>>> for Column {
            fn from(values: Vec<Nullable<$ty>>) -> Self {
                Self::$variant(values)
            }
        }
    };
}

element_impl!(i64, Int);
element_impl!(f64, Double);
element_impl!(bool, Bool);
element_impl!(String, Str);

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Self::Str(values.into_iter().map(Nullable::from).collect())
    }
}

impl From<Vec<Option<&str>>> for Column {
    fn from(values: Vec<Option<&str>>) -> Self {
        Self::Str(
            values
                .into_iter()
                .map(|v| Nullable::from_option(v.map(str::to_owned)))
                .collect(),
        )
    }
}

fn typed_from_values<T: Element>(values: &[Value]) -> Result<Vec<Nullable<T>>, ColumnError> {
    values
        .iter()
        .map(|value| {
            let cast = value.cast(T::KIND)?;
            Ok::<_, ColumnError>(Nullable::from_option(T::from_value(&cast)))
        })
        .collect()
}

fn take_typed<T: Clone>(values: &[T], positions: &[usize]) -> Result<Vec<T>, ColumnError> {
    positions
        .iter()
        .map(|&position| {
            values
                .get(position)
                .cloned()
                .ok_or(ColumnError::IndexOutOfBounds {
                    position,
                    len: values.len(),
                })
        })
        .collect()
}

fn fill_typed<T: Element>(values: &[Nullable<T>], fill: &Value) -> Vec<Nullable<T>> {
    let fill = Nullable::from_option(T::from_value(fill));
    values
        .iter()
        .map(|v| if v.is_na() { fill.clone() } else { v.clone() })
        .collect()
}

fn replace_typed<T: Element>(
    values: &[Nullable<T>],
    old: &Nullable<T>,
    new: &Nullable<T>,
) -> Vec<Nullable<T>> {
    values
        .iter()
        .map(|v| if v == old { new.clone() } else { v.clone() })
        .collect()
}

fn sort_order_typed<T: Element>(values: &[Nullable<T>], ascending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = values[a].sort_cmp(&values[b]);
        if ascending { ord } else { ord.reverse() }
    });
    order
}

impl Column {
    /// An all-NA column of `kind`.
    #[must_use]
    pub fn nulls(kind: Kind, len: usize) -> Self {
        match kind {
            Kind::Int => Self::Int(vec![Nullable::na(); len]),
            Kind::Double => Self::Double(vec![Nullable::na(); len]),
            Kind::Bool => Self::Bool(vec![Nullable::na(); len]),
            Kind::Str => Self::Str(vec![Nullable::na(); len]),
        }
    }

    /// Builds a column of `kind`, casting each value losslessly.
    pub fn from_values(kind: Kind, values: &[Value]) -> Result<Self, ColumnError> {
        Ok(match kind {
            Kind::Int => Self::Int(typed_from_values(values)?),
            Kind::Double => Self::Double(typed_from_values(values)?),
            Kind::Bool => Self::Bool(typed_from_values(values)?),
            Kind::Str => Self::Str(typed_from_values(values)?),
        })
    }

    /// Builds a column whose kind is that of the first present value.
    ///
    /// An empty or all-NA input produces a `Double` column.
    pub fn infer_from_values(values: &[Value]) -> Result<Self, ColumnError> {
        let kind = values
            .iter()
            .find_map(Value::kind)
            .unwrap_or(Kind::Double);
        Self::from_values(kind, values)
    }

    #[must_use]
    pub fn from_nullables<T: Element>(values: Vec<Nullable<T>>) -> Self {
        T::into_column(values)
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Int(_) => Kind::Int,
            Self::Double(_) => Kind::Double,
            Self::Bool(_) => Kind::Bool,
            Self::Str(_) => Kind::Str,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_variants!(self, values => values.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the cells when the column holds `T`.
    #[must_use]
    pub fn as_slice<T: Element>(&self) -> Option<&[Nullable<T>]> {
        T::view(self)
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Value> {
        with_variants!(self, values => values.get(idx).map(Nullable::to_value))
    }

    pub fn value(&self, idx: usize) -> Result<Value, ColumnError> {
        self.get(idx).ok_or(ColumnError::IndexOutOfBounds {
            position: idx,
            len: self.len(),
        })
    }

    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        with_variants!(self, values => values.iter().map(Nullable::to_value).collect())
    }

    #[must_use]
    pub fn is_na(&self, idx: usize) -> bool {
        with_variants!(self, values => values.get(idx).is_some_and(Nullable::is_na))
    }

    #[must_use]
    pub fn na_mask(&self) -> Vec<bool> {
        with_variants!(self, values => values.iter().map(Nullable::is_na).collect())
    }

    #[must_use]
    pub fn na_count(&self) -> usize {
        with_variants!(self, values => values.iter().filter(|v| v.is_na()).count())
    }

    #[must_use]
    pub fn count_valid(&self) -> usize {
        self.len() - self.na_count()
    }

    /// Numeric view of the cells (`true` is 1.0); NA cells are `None`.
    pub fn to_f64(&self) -> Result<Vec<Option<f64>>, ColumnError> {
        match self {
            Self::Int(values) => Ok(values
                .iter()
                .map(|v| v.value().map(|x| *x as f64))
                .collect()),
            Self::Double(values) => Ok(values.iter().map(|v| v.value().copied()).collect()),
            Self::Bool(values) => Ok(values
                .iter()
                .map(|v| v.value().map(|b| if *b { 1.0 } else { 0.0 }))
                .collect()),
            Self::Str(_) => Err(ColumnError::UnsupportedKind {
                op: "to_f64",
                kind: Kind::Str,
            }),
        }
    }

    /// Half-open `[start, end)` copy of the cells.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, ColumnError> {
        let len = self.len();
        if start > end || end > len {
            return Err(ColumnError::InvalidSlice { start, end, len });
        }
        Ok(map_variants!(self, values => values[start..end].to_vec()))
    }

    pub fn take(&self, positions: &[usize]) -> Result<Self, ColumnError> {
        Ok(map_variants!(self, values => take_typed(values, positions)?))
    }

    /// Keeps the cells whose mask entry is `true`.
    pub fn filter_mask(&self, mask: &[bool]) -> Result<Self, ColumnError> {
        if mask.len() != self.len() {
            return Err(ColumnError::LengthMismatch {
                left: self.len(),
                right: mask.len(),
            });
        }
        Ok(map_variants!(self, values => values
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(v, _)| v.clone())
            .collect()))
    }

    /// Keeps the cells where a `Bool` mask column is `true`; NA counts as `false`.
    pub fn filter_by(&self, mask: &Self) -> Result<Self, ColumnError> {
        let Self::Bool(bits) = mask else {
            return Err(ColumnError::KindMismatch {
                left: Kind::Bool,
                right: mask.kind(),
            });
        };
        let keep: Vec<bool> = bits.iter().map(|b| b.value_or(false)).collect();
        self.filter_mask(&keep)
    }

    pub fn append(&self, other: &Self) -> Result<Self, ColumnError> {
        Ok(match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int([a.as_slice(), b.as_slice()].concat()),
            (Self::Double(a), Self::Double(b)) => {
                Self::Double([a.as_slice(), b.as_slice()].concat())
            }
            (Self::Bool(a), Self::Bool(b)) => Self::Bool([a.as_slice(), b.as_slice()].concat()),
            (Self::Str(a), Self::Str(b)) => Self::Str([a.as_slice(), b.as_slice()].concat()),
            _ => {
                return Err(ColumnError::KindMismatch {
                    left: self.kind(),
                    right: other.kind(),
                });
            }
        })
    }

    /// Replaces every NA cell with `fill`, cast to this column's kind.
    pub fn fillna(&self, fill: &Value) -> Result<Self, ColumnError> {
        if fill.is_na() {
            return Err(ColumnError::InvalidArgument(
                "fill value must not be NA".to_owned(),
            ));
        }
        let fill = fill.cast(self.kind())?;
        Ok(map_variants!(self, values => fill_typed(values, &fill)))
    }

    #[must_use]
    pub fn dropna(&self) -> Self {
        map_variants!(self, values => values.iter().filter(|v| !v.is_na()).cloned().collect())
    }

    /// Replaces cells equal to `old` with `new`.
    ///
    /// `old` must have this column's kind (or be NA); `new` is cast to it.
    pub fn replace(&self, old: &Value, new: &Value) -> Result<Self, ColumnError> {
        let kind = self.kind();
        if let Some(old_kind) = old.kind()
            && old_kind != kind
        {
            return Err(ColumnError::KindMismatch {
                left: kind,
                right: old_kind,
            });
        }
        let new = new.cast(kind)?;
        Ok(map_variants!(self, values => replace_typed(
            values,
            &Nullable::from_option(Primitive::from_value(old)),
            &Nullable::from_option(Primitive::from_value(&new)),
        )))
    }

    /// Converts every cell to `target`; fails on the first lossy cell.
    pub fn cast(&self, target: Kind) -> Result<Self, ColumnError> {
        if self.kind() == target {
            return Ok(self.clone());
        }
        Self::from_values(target, &self.values())
    }

    /// Compares two rows of this column with NA greater than every value.
    #[must_use]
    pub fn compare_rows(&self, left: usize, right: usize) -> Ordering {
        with_variants!(self, values => {
            match (values.get(left), values.get(right)) {
                (Some(a), Some(b)) => a.sort_cmp(b),
                _ => Ordering::Equal,
            }
        })
    }

    /// Stable permutation that sorts the column.
    ///
    /// NA sorts greater than every value, so it lands last when ascending and
    /// first when descending.
    #[must_use]
    pub fn sort_order(&self, ascending: bool) -> Vec<usize> {
        with_variants!(self, values => sort_order_typed(values, ascending))
    }
}
