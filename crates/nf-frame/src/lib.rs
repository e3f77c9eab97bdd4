#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{debug, trace};
use nf_columnar::{Column, ColumnError};
use nf_index::{Index, IndexError};
use nf_math::{ArithmeticOp, ComparisonOp, CumulativeOp, MathError, UnaryOp};
use nf_stats::{DESCRIBE_STATS, Reducer, StatsError};
use nf_types::{ErrorCategory, Kind, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("row {row} out of bounds for frame with {len} rows")]
    RowOutOfBounds { row: usize, len: usize },
    #[error("column position {position} out of bounds for frame with {len} columns")]
    ColumnOutOfBounds { position: usize, len: usize },
    #[error("column '{name}' has length {column_len} but the frame has {row_count} rows")]
    LengthMismatch {
        name: String,
        row_count: usize,
        column_len: usize,
    },
    #[error("index has {index_len} labels but the frame has {row_count} rows")]
    IndexLengthMismatch { index_len: usize, row_count: usize },
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
    #[error("invalid row slice [{start}, {end}) for frame with {len} rows")]
    InvalidSlice { start: usize, end: usize, len: usize },
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Math(#[from] MathError),
}

impl FrameError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ColumnNotFound(_)
            | Self::RowOutOfBounds { .. }
            | Self::ColumnOutOfBounds { .. } => ErrorCategory::NotFound,
            Self::LengthMismatch { .. } | Self::IndexLengthMismatch { .. } => {
                ErrorCategory::ShapeMismatch
            }
            Self::DuplicateColumn(_) | Self::InvalidSlice { .. } | Self::InvalidArgument(_) => {
                ErrorCategory::InvalidArgument
            }
            Self::Column(err) => err.category(),
            Self::Index(err) => err.category(),
            Self::Stats(err) => err.category(),
            Self::Math(err) => err.category(),
        }
    }
}

/// Which columns survive a frame-by-frame arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnJoin {
    /// Columns from either operand; one-sided columns pass through.
    #[default]
    Union,
    /// Only columns present in both operands.
    Inner,
}

#[derive(Serialize, Deserialize)]
struct DataFrameRepr {
    index: Index,
    columns: Vec<(String, Column)>,
}

/// Named columns of equal length sharing one row [`Index`].
///
/// Columns iterate in insertion order. The index is shared between copies of
/// a frame and replaced, never mutated, when the row layout changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataFrameRepr", into = "DataFrameRepr")]
pub struct DataFrame {
    index: Arc<Index>,
    columns: BTreeMap<String, Column>,
    column_order: Vec<String>,
    row_count: usize,
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<DataFrameRepr> for DataFrame {
    type Error = FrameError;

    fn try_from(repr: DataFrameRepr) -> Result<Self, Self::Error> {
        let mut columns = BTreeMap::new();
        let mut order = Vec::with_capacity(repr.columns.len());
        for (name, column) in repr.columns {
            if columns.contains_key(&name) {
                return Err(FrameError::DuplicateColumn(name));
            }
            order.push(name.clone());
            columns.insert(name, column);
        }
        Self::from_parts(Arc::new(repr.index), columns, order)
    }
}

impl From<DataFrame> for DataFrameRepr {
    fn from(frame: DataFrame) -> Self {
        let DataFrame {
            index,
            mut columns,
            column_order,
            ..
        } = frame;
        let columns = column_order
            .into_iter()
            .filter_map(|name| columns.remove(&name).map(|column| (name, column)))
            .collect();
        Self {
            index: Arc::unwrap_or_clone(index),
            columns,
        }
    }
}

impl DataFrame {
    fn validate_column_lengths(
        row_count: usize,
        columns: &BTreeMap<String, Column>,
    ) -> Result<(), FrameError> {
        for (name, column) in columns {
            if column.len() != row_count {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    row_count,
                    column_len: column.len(),
                });
            }
        }
        Ok(())
    }

    fn from_parts(
        index: Arc<Index>,
        columns: BTreeMap<String, Column>,
        column_order: Vec<String>,
    ) -> Result<Self, FrameError> {
        let row_count = index.len();
        Self::validate_column_lengths(row_count, &columns)?;
        Ok(Self {
            index,
            columns,
            column_order,
            row_count,
        })
    }

    /// Same index and column order, new column data.
    fn with_columns(&self, columns: BTreeMap<String, Column>) -> Result<Self, FrameError> {
        Self::from_parts(Arc::clone(&self.index), columns, self.column_order.clone())
    }

    fn map_columns<F>(&self, mut f: F) -> Result<Self, FrameError>
    where
        F: FnMut(&str, &Column) -> Result<Column, FrameError>,
    {
        let mut columns = BTreeMap::new();
        for (name, column) in self.iter() {
            columns.insert(name.to_owned(), f(name, column)?);
        }
        self.with_columns(columns)
    }

    fn check_row(&self, row: usize) -> Result<(), FrameError> {
        if row >= self.row_count {
            return Err(FrameError::RowOutOfBounds {
                row,
                len: self.row_count,
            });
        }
        Ok(())
    }

    fn row_key(&self, names: &[&str], row: usize) -> Vec<Value> {
        names
            .iter()
            .filter_map(|name| self.columns.get(*name).and_then(|c| c.get(row)))
            .collect()
    }

    #[must_use]
    pub fn new() -> Self {
        Self {
            index: Arc::new(Index::default()),
            columns: BTreeMap::new(),
            column_order: Vec::new(),
            row_count: 0,
        }
    }

    /// Builds a frame from `(name, column)` pairs, in order.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut frame = Self::new();
        for (name, column) in columns {
            let name = name.into();
            if frame.columns.contains_key(&name) {
                return Err(FrameError::DuplicateColumn(name));
            }
            frame.add_column(name, column)?;
        }
        Ok(frame)
    }

    // ── Shape and access ───────────────────────────────────────────────

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.column_order.len()
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.num_columns())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    #[must_use]
    pub fn column_exists(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Columns in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.column_order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|c| (name.as_str(), c)))
    }

    #[must_use]
    pub fn columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column, FrameError> {
        self.columns
            .get(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))
    }

    pub fn column_name(&self, position: usize) -> Result<&str, FrameError> {
        self.column_order
            .get(position)
            .map(String::as_str)
            .ok_or(FrameError::ColumnOutOfBounds {
                position,
                len: self.column_order.len(),
            })
    }

    pub fn column_at(&self, position: usize) -> Result<&Column, FrameError> {
        self.column(self.column_name(position)?)
    }

    // ── Column structure ───────────────────────────────────────────────

    /// Adds or replaces a column.
    ///
    /// The first column of an empty frame fixes the row count and installs a
    /// default index; later columns, replacements included, must match that row
    /// count.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), FrameError> {
        let name = name.into();
        self.accept_length(&name, &column)?;
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.columns.insert(name, column);
        Ok(())
    }

    fn accept_length(&mut self, name: &str, column: &Column) -> Result<(), FrameError> {
        if self.columns.is_empty() {
            if column.len() != self.index.len() {
                self.index = Arc::new(Index::default_for(column.len()));
            }
            self.row_count = column.len();
            return Ok(());
        }
        if column.len() != self.row_count {
            return Err(FrameError::LengthMismatch {
                name: name.to_owned(),
                row_count: self.row_count,
                column_len: column.len(),
            });
        }
        Ok(())
    }

    /// Inserts a new column at `position` (clamped to the end).
    pub fn insert(
        &mut self,
        position: usize,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), FrameError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        self.accept_length(&name, &column)?;
        let position = position.min(self.column_order.len());
        self.column_order.insert(position, name.clone());
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<Column, FrameError> {
        let column = self
            .columns
            .remove(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))?;
        self.column_order.retain(|entry| entry != name);
        Ok(column)
    }

    /// Copy of the frame with `column` added or replaced.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        let mut out = self.clone();
        out.add_column(name, column)?;
        Ok(out)
    }

    /// Copy of the frame without the named columns.
    pub fn drop(&self, names: &[&str]) -> Result<Self, FrameError> {
        let mut out = self.clone();
        for name in names {
            out.remove_column(name)?;
        }
        Ok(out)
    }

    /// Copy of the frame with only the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Self, FrameError> {
        let mut columns = BTreeMap::new();
        let mut order = Vec::with_capacity(names.len());
        for &name in names {
            let column = self.column(name)?;
            if columns.insert(name.to_owned(), column.clone()).is_some() {
                return Err(FrameError::InvalidArgument(format!(
                    "column '{name}' selected twice"
                )));
            }
            order.push(name.to_owned());
        }
        Self::from_parts(Arc::clone(&self.index), columns, order)
    }

    // ── Rows ───────────────────────────────────────────────────────────

    /// One row as a column-name to value map.
    pub fn iloc(&self, row: usize) -> Result<BTreeMap<String, Value>, FrameError> {
        self.check_row(row)?;
        Ok(self
            .iter()
            .filter_map(|(name, column)| column.get(row).map(|v| (name.to_owned(), v)))
            .collect())
    }

    /// Rows at `positions`, in that order, with their index labels.
    pub fn take(&self, positions: &[usize]) -> Result<Self, FrameError> {
        for &row in positions {
            self.check_row(row)?;
        }
        let index = self.index.take(positions)?;
        let mut columns = BTreeMap::new();
        for (name, column) in self.iter() {
            columns.insert(name.to_owned(), column.take(positions)?);
        }
        Self::from_parts(Arc::new(index), columns, self.column_order.clone())
    }

    /// Rows by index label.
    pub fn loc(&self, labels: &[&str]) -> Result<Self, FrameError> {
        let positions = self.index.to_positions(labels)?;
        self.take(&positions)
    }

    /// Rows `[start, end)`; the range must be non-empty and in bounds.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, FrameError> {
        if start >= end || end > self.row_count {
            return Err(FrameError::InvalidSlice {
                start,
                end,
                len: self.row_count,
            });
        }
        self.take(&(start..end).collect::<Vec<_>>())
    }

    /// First `n` rows (all rows when `n` exceeds the row count).
    ///
    /// Matches `df.head(n)`.
    pub fn head(&self, n: usize) -> Result<Self, FrameError> {
        self.take(&(0..n.min(self.row_count)).collect::<Vec<_>>())
    }

    /// Last `n` rows.
    ///
    /// Matches `df.tail(n)`.
    pub fn tail(&self, n: usize) -> Result<Self, FrameError> {
        let start = self.row_count - n.min(self.row_count);
        self.take(&(start..self.row_count).collect::<Vec<_>>())
    }

    /// Rows for which `predicate(columns, row)` holds, in original order.
    pub fn filter<F>(&self, mut predicate: F) -> Result<Self, FrameError>
    where
        F: FnMut(&BTreeMap<String, Column>, usize) -> bool,
    {
        let positions: Vec<usize> = (0..self.row_count)
            .filter(|&row| predicate(&self.columns, row))
            .collect();
        debug!(
            "filter kept {} of {} rows",
            positions.len(),
            self.row_count
        );
        self.take(&positions)
    }

    /// Rows where a `Bool` mask column is `true`; NA counts as `false`.
    pub fn filter_mask(&self, mask: &Column) -> Result<Self, FrameError> {
        let Some(bits) = mask.as_slice::<bool>() else {
            return Err(FrameError::InvalidArgument(format!(
                "mask must be a bool column, got {}",
                mask.kind()
            )));
        };
        if bits.len() != self.row_count {
            return Err(FrameError::LengthMismatch {
                name: "mask".to_owned(),
                row_count: self.row_count,
                column_len: bits.len(),
            });
        }
        let positions: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| bit.value_or(false))
            .map(|(row, _)| row)
            .collect();
        self.take(&positions)
    }

    /// Compares a column against a scalar, producing a `Bool` mask column.
    pub fn compare(
        &self,
        column: &str,
        op: ComparisonOp,
        value: &Value,
    ) -> Result<Column, FrameError> {
        Ok(nf_math::compare(self.column(column)?, op, value)?)
    }

    fn extreme_rows(&self, n: usize, column: &str, ascending: bool) -> Result<Self, FrameError> {
        let col = self.column(column)?;
        let positions: Vec<usize> = col
            .sort_order(ascending)
            .into_iter()
            .filter(|&row| !col.is_na(row))
            .take(n)
            .collect();
        self.take(&positions)
    }

    /// The `n` rows with the largest non-NA values in `column`.
    ///
    /// Matches `df.nlargest(n, column)`.
    pub fn nlargest(&self, n: usize, column: &str) -> Result<Self, FrameError> {
        self.extreme_rows(n, column, false)
    }

    /// Matches `df.nsmallest(n, column)`.
    pub fn nsmallest(&self, n: usize, column: &str) -> Result<Self, FrameError> {
        self.extreme_rows(n, column, true)
    }

    // ── Ordering ───────────────────────────────────────────────────────

    /// Stable sort of every column (and the index) by one column.
    ///
    /// NA orders after every value, so it ends up last when ascending and
    /// first when descending.
    pub fn sort(&self, column: &str, ascending: bool) -> Result<Self, FrameError> {
        let order = self.column(column)?.sort_order(ascending);
        debug!(
            "sorting {} rows by '{column}' (ascending={ascending})",
            self.row_count
        );
        self.take(&order)
    }

    /// Stable lexicographic sort by several columns.
    pub fn sort_by(&self, columns: &[&str], ascending: &[bool]) -> Result<Self, FrameError> {
        if columns.is_empty() || columns.len() != ascending.len() {
            return Err(FrameError::InvalidArgument(format!(
                "sort_by needs one ascending flag per column ({} columns, {} flags)",
                columns.len(),
                ascending.len()
            )));
        }
        let keys = columns
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut order: Vec<usize> = (0..self.row_count).collect();
        order.sort_by(|&a, &b| {
            for (key, &asc) in keys.iter().zip(ascending) {
                let ord = key.compare_rows(a, b);
                let ord = if asc { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        debug!("sorting {} rows by {columns:?}", self.row_count);
        self.take(&order)
    }

    /// Sorts rows by index label text.
    pub fn sort_index(&self, ascending: bool) -> Result<Self, FrameError> {
        self.take(&self.index.argsort(ascending))
    }

    // ── Missing values and transforms ──────────────────────────────────

    /// Fills NA cells of every column whose kind equals `value`'s kind.
    ///
    /// Columns of other kinds are returned unchanged.
    pub fn fillna(&self, value: &Value) -> Result<Self, FrameError> {
        let Some(kind) = value.kind() else {
            return Err(FrameError::InvalidArgument(
                "fill value must not be NA".to_owned(),
            ));
        };
        self.map_columns(|_, column| {
            if column.kind() == kind {
                Ok(column.fillna(value)?)
            } else {
                Ok(column.clone())
            }
        })
    }

    /// Drops every row that holds an NA in any column.
    pub fn dropna(&self) -> Result<Self, FrameError> {
        let positions: Vec<usize> = (0..self.row_count)
            .filter(|&row| self.columns.values().all(|column| !column.is_na(row)))
            .collect();
        self.take(&positions)
    }

    /// Replaces `old` with `new` in every column of `old`'s kind.
    ///
    /// With an NA `old`, NA cells of columns of `new`'s kind are replaced.
    pub fn replace(&self, old: &Value, new: &Value) -> Result<Self, FrameError> {
        let Some(kind) = old.kind().or_else(|| new.kind()) else {
            return Err(FrameError::InvalidArgument(
                "replace needs at least one non-NA value".to_owned(),
            ));
        };
        self.map_columns(|_, column| {
            if column.kind() == kind {
                Ok(column.replace(old, new)?)
            } else {
                Ok(column.clone())
            }
        })
    }

    /// Casts the named columns.
    pub fn astype(&self, kinds: &[(&str, Kind)]) -> Result<Self, FrameError> {
        let mut columns = self.columns.clone();
        for &(name, kind) in kinds {
            let column = columns
                .get_mut(name)
                .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))?;
            *column = column.cast(kind)?;
        }
        self.with_columns(columns)
    }

    /// Applies `f` to every column; results must keep the row count.
    pub fn transform<F>(&self, mut f: F) -> Result<Self, FrameError>
    where
        F: FnMut(&Column) -> Result<Column, FrameError>,
    {
        self.map_columns(|_, column| f(column))
    }

    /// Replaces one column with `f(column)`.
    pub fn apply<F>(&self, name: &str, f: F) -> Result<Self, FrameError>
    where
        F: FnOnce(&Column) -> Result<Column, FrameError>,
    {
        let mut columns = self.columns.clone();
        let column = columns
            .get_mut(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))?;
        *column = f(column)?;
        self.with_columns(columns)
    }

    /// Keeps the first row of every distinct combination of `subset` values
    /// (all columns when `None`).
    pub fn drop_duplicates(&self, subset: Option<&[&str]>) -> Result<Self, FrameError> {
        let names: Vec<&str> = match subset {
            Some(names) => {
                for name in names {
                    self.column(name)?;
                }
                names.to_vec()
            }
            None => self.column_order.iter().map(String::as_str).collect(),
        };
        let mut seen = HashSet::new();
        let positions: Vec<usize> = (0..self.row_count)
            .filter(|&row| seen.insert(self.row_key(&names, row)))
            .collect();
        self.take(&positions)
    }

    /// Stacks frames row-wise.
    ///
    /// Every frame needs the same column names and kinds. Default indexes are
    /// renumbered; otherwise labels are concatenated and must stay unique.
    pub fn concat(frames: &[&Self]) -> Result<Self, FrameError> {
        let Some((first, rest)) = frames.split_first() else {
            return Ok(Self::new());
        };
        let mut columns = first.columns.clone();
        let mut all_default = first.index.is_default();
        for frame in rest {
            if frame.num_columns() != first.num_columns() {
                return Err(FrameError::InvalidArgument(format!(
                    "concat needs matching columns ({} vs {})",
                    first.num_columns(),
                    frame.num_columns()
                )));
            }
            for (name, column) in &mut columns {
                *column = column.append(frame.column(name)?)?;
            }
            all_default &= frame.index.is_default();
        }
        let total: usize = frames.iter().map(|frame| frame.row_count).sum();
        let index = if all_default {
            Index::default_for(total)
        } else {
            let labels = frames
                .iter()
                .flat_map(|frame| frame.index.labels().iter().cloned())
                .collect();
            Index::new(labels)?
        };
        debug!("concatenated {} frames into {total} rows", frames.len());
        Self::from_parts(Arc::new(index), columns, first.column_order.clone())
    }

    // ── Index ──────────────────────────────────────────────────────────

    /// Copy of the frame with custom row labels.
    pub fn set_index(&self, labels: Vec<String>) -> Result<Self, FrameError> {
        if labels.len() != self.row_count {
            return Err(FrameError::IndexLengthMismatch {
                index_len: labels.len(),
                row_count: self.row_count,
            });
        }
        let index = Index::new(labels)?;
        Self::from_parts(Arc::new(index), self.columns.clone(), self.column_order.clone())
    }

    /// Uses the text of a column's cells as row labels.
    pub fn set_index_column(&self, name: &str, drop: bool) -> Result<Self, FrameError> {
        let labels = self
            .column(name)?
            .values()
            .iter()
            .map(ToString::to_string)
            .collect();
        let out = self.set_index(labels)?;
        if drop { out.drop(&[name]) } else { Ok(out) }
    }

    /// Installs a default index, keeping the old labels as a leading `index`
    /// column unless `drop` is set.
    pub fn reset_index(&self, drop: bool) -> Result<Self, FrameError> {
        let mut out = self.clone();
        out.index = Arc::new(Index::default_for(self.row_count));
        if !drop {
            let labels = Column::from(self.index.labels().to_vec());
            out.insert(0, "index", labels)?;
        }
        Ok(out)
    }

    // ── Aggregation ────────────────────────────────────────────────────

    pub fn reduce(&self, column: &str, reducer: Reducer) -> Result<Value, FrameError> {
        Ok(reducer.apply(self.column(column)?)?)
    }

    /// `reducer` over every column that supports it, in column order.
    pub fn aggregate(&self, reducer: Reducer) -> Result<Vec<(String, Value)>, FrameError> {
        self.iter()
            .filter(|(_, column)| reducer.accepts(column.kind()))
            .map(|(name, column)| Ok((name.to_owned(), reducer.apply(column)?)))
            .collect()
    }

    pub fn sum(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Sum)
    }

    pub fn mean(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Mean)
    }

    pub fn min(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Min)
    }

    pub fn max(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Max)
    }

    pub fn median(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Median)
    }

    pub fn count(&self, column: &str) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Count)
    }

    pub fn var(&self, column: &str, ddof: usize) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Var { ddof })
    }

    pub fn std(&self, column: &str, ddof: usize) -> Result<Value, FrameError> {
        self.reduce(column, Reducer::Std { ddof })
    }

    pub fn quantile(&self, column: &str, q: f64) -> Result<Value, FrameError> {
        Ok(nf_stats::quantile(self.column(column)?, q)?)
    }

    fn numeric_columns(&self) -> Vec<(&str, &Column)> {
        self.iter()
            .filter(|(_, column)| column.kind().is_numeric())
            .collect()
    }

    /// Summary statistics of every Int/Double column.
    ///
    /// One row per described column, labelled by column name, with columns
    /// `count`, `mean`, `std`, `min`, `25%`, `50%`, `75%`, `max`.
    pub fn describe(&self) -> Result<Self, FrameError> {
        let numeric = self.numeric_columns();
        if numeric.is_empty() {
            return Ok(Self::new());
        }
        let mut stats: Vec<Vec<Value>> =
            vec![Vec::with_capacity(numeric.len()); DESCRIBE_STATS.len()];
        let mut labels = Vec::with_capacity(numeric.len());
        for (name, column) in &numeric {
            let summary = nf_stats::describe(column)?;
            for (slot, value) in stats.iter_mut().zip(summary.values()) {
                slot.push(value);
            }
            labels.push((*name).to_owned());
        }
        let mut out = Self::new();
        for (stat, values) in DESCRIBE_STATS.iter().zip(&stats) {
            let kind = if *stat == "count" { Kind::Int } else { Kind::Double };
            out.add_column(*stat, Column::from_values(kind, values)?)?;
        }
        out.set_index(labels)
    }

    fn pairwise<F>(&self, diagonal: Option<f64>, f: F) -> Result<Self, FrameError>
    where
        F: Fn(&Column, &Column) -> Result<Value, StatsError>,
    {
        let numeric = self.numeric_columns();
        let mut out = Self::new();
        for &(name, right) in &numeric {
            let values = numeric
                .iter()
                .map(|&(other, left)| match diagonal {
                    Some(d) if other == name => Ok(Value::Double(d)),
                    _ => f(left, right),
                })
                .collect::<Result<Vec<_>, _>>()?;
            out.add_column(name, Column::from_values(Kind::Double, &values)?)?;
        }
        let labels = numeric.iter().map(|(name, _)| (*name).to_owned()).collect();
        out.set_index(labels)
    }

    /// Pearson correlation between every pair of numeric columns.
    pub fn corr(&self) -> Result<Self, FrameError> {
        self.pairwise(Some(1.0), nf_stats::corr_pair)
    }

    /// Sample covariance between every pair of numeric columns.
    pub fn cov(&self) -> Result<Self, FrameError> {
        self.pairwise(None, nf_stats::cov_pair)
    }

    /// Same column names, kinds and cells (NA equal to NA); labels ignored.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.columns == other.columns
    }

    // ── Arithmetic ─────────────────────────────────────────────────────

    /// Aligns two frames by column name and combines shared columns.
    ///
    /// Shared columns must have the same numeric kind. With
    /// [`ColumnJoin::Union`] one-sided columns pass through; right-only
    /// columns are padded with NA or truncated to this frame's row count. The
    /// result keeps this frame's index.
    pub fn binary_op(
        &self,
        other: &Self,
        op: ArithmeticOp,
        fill: &Value,
        join: ColumnJoin,
    ) -> Result<Self, FrameError> {
        let mut columns = BTreeMap::new();
        let mut order = Vec::new();
        for (name, left) in self.iter() {
            let combined = match other.columns.get(name) {
                Some(right) => nf_math::binary(left, right, op, fill)?,
                None if join == ColumnJoin::Union => left.clone(),
                None => continue,
            };
            columns.insert(name.to_owned(), combined);
            order.push(name.to_owned());
        }
        if join == ColumnJoin::Union {
            for (name, right) in other.iter() {
                if self.columns.contains_key(name) {
                    continue;
                }
                trace!("carrying right-only column '{name}'");
                columns.insert(name.to_owned(), fit_length(right, self.row_count)?);
                order.push(name.to_owned());
            }
        }
        debug!(
            "frame {} ({join:?}): {} shared columns, {} in result",
            op.symbol(),
            self.iter()
                .filter(|(name, _)| other.columns.contains_key(*name))
                .count(),
            order.len()
        );
        Self::from_parts(Arc::clone(&self.index), columns, order)
    }

    pub fn add(&self, other: &Self, fill: &Value) -> Result<Self, FrameError> {
        self.binary_op(other, ArithmeticOp::Add, fill, ColumnJoin::Union)
    }

    pub fn sub(&self, other: &Self, fill: &Value) -> Result<Self, FrameError> {
        self.binary_op(other, ArithmeticOp::Sub, fill, ColumnJoin::Union)
    }

    pub fn mul(&self, other: &Self, fill: &Value) -> Result<Self, FrameError> {
        self.binary_op(other, ArithmeticOp::Mul, fill, ColumnJoin::Union)
    }

    pub fn div(&self, other: &Self, fill: &Value) -> Result<Self, FrameError> {
        self.binary_op(other, ArithmeticOp::Div, fill, ColumnJoin::Union)
    }

    /// Applies `op` with a scalar to every numeric column.
    ///
    /// The scalar must be Int or Double, and dividing by zero fails before any
    /// column is touched. Bool and Str columns are left as they are.
    pub fn scalar_op(&self, op: ArithmeticOp, value: &Value) -> Result<Self, FrameError> {
        nf_math::validate_scalar(op, value)?;
        self.map_columns(|_, column| Ok(nf_math::scalar(column, op, value)?))
    }

    pub fn add_scalar(&self, value: &Value) -> Result<Self, FrameError> {
        self.scalar_op(ArithmeticOp::Add, value)
    }

    pub fn sub_scalar(&self, value: &Value) -> Result<Self, FrameError> {
        self.scalar_op(ArithmeticOp::Sub, value)
    }

    pub fn mul_scalar(&self, value: &Value) -> Result<Self, FrameError> {
        self.scalar_op(ArithmeticOp::Mul, value)
    }

    pub fn div_scalar(&self, value: &Value) -> Result<Self, FrameError> {
        self.scalar_op(ArithmeticOp::Div, value)
    }

    /// Element-wise function over numeric columns; other columns are kept.
    pub fn unary(&self, op: UnaryOp) -> Result<Self, FrameError> {
        self.map_columns(|_, column| {
            if column.kind().is_numeric() {
                Ok(nf_math::unary(column, op)?)
            } else {
                Ok(column.clone())
            }
        })
    }

    /// Running aggregate down numeric columns; other columns are kept.
    pub fn cumulative(&self, op: CumulativeOp) -> Result<Self, FrameError> {
        self.map_columns(|_, column| {
            if column.kind().is_numeric() {
                Ok(nf_math::cumulative(column, op)?)
            } else {
                Ok(column.clone())
            }
        })
    }
}

/// Pads with NA or truncates `column` to exactly `len` cells.
fn fit_length(column: &Column, len: usize) -> Result<Column, FrameError> {
    Ok(match column.len().cmp(&len) {
        Ordering::Equal => column.clone(),
        Ordering::Greater => column.slice(0, len)?,
        Ordering::Less => column.append(&Column::nulls(column.kind(), len - column.len()))?,
    })
}
