#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::BTreeMap;

use nf_columnar::{Column, ColumnError, Element};
use nf_types::{DEFAULT_DDOF, ErrorCategory, Kind, Nullable, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("{op} is not supported for {kind} columns")]
    UnsupportedKind { op: &'static str, kind: Kind },
    #[error("quantile must be within [0, 1], got {q}")]
    InvalidQuantile { q: f64 },
    #[error("rolling window must be at least 1")]
    ZeroWindow,
    #[error("range step must be non-zero")]
    ZeroStep,
    #[error("range bounds and step must be finite: start={start}, stop={stop}, step={step}")]
    NonFiniteRange { start: f64, stop: f64, step: f64 },
    #[error("range of {len} values cannot be allocated")]
    RangeTooLong { len: f64 },
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error(transparent)]
    Column(#[from] ColumnError),
}

impl StatsError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LengthMismatch { .. } => ErrorCategory::ShapeMismatch,
            Self::UnsupportedKind { .. }
            | Self::InvalidQuantile { .. }
            | Self::ZeroWindow
            | Self::ZeroStep
            | Self::NonFiniteRange { .. }
            | Self::RangeTooLong { .. } => ErrorCategory::InvalidArgument,
            Self::Column(err) => err.category(),
        }
    }
}

fn present<T: Element>(values: &[Nullable<T>]) -> impl Iterator<Item = &T> {
    values.iter().filter_map(Nullable::value)
}

/// Non-NA cells of an Int or Double column as `f64`.
fn numeric_values(column: &Column, op: &'static str) -> Result<Vec<f64>, StatsError> {
    match column {
        Column::Int(values) => Ok(present(values).map(|v| *v as f64).collect()),
        Column::Double(values) => Ok(present(values).copied().collect()),
        Column::Bool(_) | Column::Str(_) => Err(StatsError::UnsupportedKind {
            op,
            kind: column.kind(),
        }),
    }
}

fn sorted_numeric(column: &Column, op: &'static str) -> Result<Vec<f64>, StatsError> {
    let mut nums = numeric_values(column, op)?;
    nums.sort_by(f64::total_cmp);
    Ok(nums)
}

fn mean_of(nums: &[f64]) -> f64 {
    nums.iter().sum::<f64>() / nums.len() as f64
}

fn var_of(nums: &[f64], ddof: usize) -> Option<f64> {
    if nums.len() <= ddof {
        return None;
    }
    let mean = mean_of(nums);
    let sum_sq: f64 = nums.iter().map(|x| (x - mean).powi(2)).sum();
    Some(sum_sq / (nums.len() - ddof) as f64)
}

fn median_of_sorted(nums: &[f64]) -> Option<f64> {
    if nums.is_empty() {
        return None;
    }
    let mid = nums.len() / 2;
    if nums.len().is_multiple_of(2) {
        Some((nums[mid - 1] + nums[mid]) / 2.0)
    } else {
        Some(nums[mid])
    }
}

/// `sorted[floor(q * n)]`, clamped to the last element.
fn quantile_position(q: f64, n: usize) -> usize {
    ((q * n as f64).floor() as usize).min(n - 1)
}

fn extreme<T: Element>(values: &[Nullable<T>], keep: Ordering) -> Value {
    let mut best: Option<&T> = None;
    for value in present(values) {
        best = match best {
            Some(current) if value.total_order(current) != keep => Some(current),
            _ => Some(value),
        };
    }
    best.map_or(Value::Na, |v| v.clone().into_value())
}

// ── Reducers ───────────────────────────────────────────────────────────

/// Number of non-NA cells, for every kind.
#[must_use]
pub fn count(column: &Column) -> Value {
    Value::Int(column.count_valid() as i64)
}

/// Int and Bool columns sum to Int, Double to Double. NA when nothing is present.
pub fn sum(column: &Column) -> Result<Value, StatsError> {
    if column.count_valid() == 0 && column.kind() != Kind::Str {
        return Ok(Value::Na);
    }
    match column {
        Column::Int(values) => Ok(Value::Int(
            present(values).fold(0_i64, |acc, v| acc.wrapping_add(*v)),
        )),
        Column::Double(values) => Ok(Value::from(present(values).sum::<f64>())),
        Column::Bool(values) => Ok(Value::Int(present(values).filter(|v| **v).count() as i64)),
        Column::Str(_) => Err(StatsError::UnsupportedKind {
            op: "sum",
            kind: Kind::Str,
        }),
    }
}

/// Arithmetic mean of Int, Double, or Bool cells as Double.
pub fn mean(column: &Column) -> Result<Value, StatsError> {
    if column.kind() == Kind::Str {
        return Err(StatsError::UnsupportedKind {
            op: "mean",
            kind: Kind::Str,
        });
    }
    let nums: Vec<f64> = column.to_f64()?.into_iter().flatten().collect();
    if nums.is_empty() {
        return Ok(Value::Na);
    }
    Ok(Value::from(mean_of(&nums)))
}

#[must_use]
pub fn min(column: &Column) -> Value {
    match column {
        Column::Int(values) => extreme(values, Ordering::Less),
        Column::Double(values) => extreme(values, Ordering::Less),
        Column::Bool(values) => extreme(values, Ordering::Less),
        Column::Str(values) => extreme(values, Ordering::Less),
    }
}

#[must_use]
pub fn max(column: &Column) -> Value {
    match column {
        Column::Int(values) => extreme(values, Ordering::Greater),
        Column::Double(values) => extreme(values, Ordering::Greater),
        Column::Bool(values) => extreme(values, Ordering::Greater),
        Column::Str(values) => extreme(values, Ordering::Greater),
    }
}

/// Middle value; an even count averages the central pair.
pub fn median(column: &Column) -> Result<Value, StatsError> {
    let nums = sorted_numeric(column, "median")?;
    Ok(median_of_sorted(&nums).map_or(Value::Na, Value::from))
}

/// Variance with `ddof` delta degrees of freedom; NA when `count <= ddof`.
pub fn var(column: &Column, ddof: usize) -> Result<Value, StatsError> {
    let nums = numeric_values(column, "var")?;
    Ok(var_of(&nums, ddof).map_or(Value::Na, Value::from))
}

pub fn std(column: &Column, ddof: usize) -> Result<Value, StatsError> {
    let nums = numeric_values(column, "std")?;
    Ok(var_of(&nums, ddof).map_or(Value::Na, |v| Value::from(v.sqrt())))
}

/// The element at `floor(q * n)` of the sorted non-NA cells.
///
/// The result keeps the column's kind.
pub fn quantile(column: &Column, q: f64) -> Result<Value, StatsError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(StatsError::InvalidQuantile { q });
    }
    match column {
        Column::Int(values) => {
            let mut nums: Vec<i64> = present(values).copied().collect();
            if nums.is_empty() {
                return Ok(Value::Na);
            }
            nums.sort_unstable();
            Ok(Value::Int(nums[quantile_position(q, nums.len())]))
        }
        Column::Double(_) => {
            let nums = sorted_numeric(column, "quantile")?;
            if nums.is_empty() {
                return Ok(Value::Na);
            }
            Ok(Value::from(nums[quantile_position(q, nums.len())]))
        }
        Column::Bool(_) | Column::Str(_) => Err(StatsError::UnsupportedKind {
            op: "quantile",
            kind: column.kind(),
        }),
    }
}

/// Sample skewness (bias corrected). NA with fewer than three values.
pub fn skew(column: &Column) -> Result<Value, StatsError> {
    let nums = numeric_values(column, "skew")?;
    let n = nums.len();
    if n < 3 {
        return Ok(Value::Na);
    }
    let mean = mean_of(&nums);
    let m2 = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let m3 = nums.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n as f64;
    if m2 == 0.0 {
        return Ok(Value::Double(0.0));
    }
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    Ok(Value::from(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)))
}

/// Sample excess kurtosis (bias corrected). NA with fewer than four values.
pub fn kurt(column: &Column) -> Result<Value, StatsError> {
    let nums = numeric_values(column, "kurt")?;
    let n = nums.len();
    if n < 4 {
        return Ok(Value::Na);
    }
    let mean = mean_of(&nums);
    let m2 = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let m4 = nums.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n as f64;
    if m2 == 0.0 {
        return Ok(Value::Double(0.0));
    }
    let n = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    Ok(Value::from(
        ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)),
    ))
}

// ── Reducer dispatch ───────────────────────────────────────────────────

/// A named column reduction, used by frame and group-by aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Reducer {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Var { ddof: usize },
    Std { ddof: usize },
}

impl Reducer {
    pub const VAR: Self = Self::Var { ddof: DEFAULT_DDOF };
    pub const STD: Self = Self::Std { ddof: DEFAULT_DDOF };

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Var { .. } => "var",
            Self::Std { .. } => "std",
        }
    }

    /// Whether the reducer is defined for a column of `kind`.
    #[must_use]
    pub fn accepts(self, kind: Kind) -> bool {
        match self {
            Self::Count | Self::Min | Self::Max => true,
            Self::Sum | Self::Mean => kind != Kind::Str,
            Self::Median | Self::Var { .. } | Self::Std { .. } => kind.is_numeric(),
        }
    }

    /// Kind of the value produced for an input column of `kind`.
    #[must_use]
    pub fn output_kind(self, kind: Kind) -> Kind {
        match self {
            Self::Count => Kind::Int,
            Self::Sum => match kind {
                Kind::Double => Kind::Double,
                _ => Kind::Int,
            },
            Self::Min | Self::Max => kind,
            Self::Mean | Self::Median | Self::Var { .. } | Self::Std { .. } => Kind::Double,
        }
    }

    pub fn apply(self, column: &Column) -> Result<Value, StatsError> {
        match self {
            Self::Count => Ok(count(column)),
            Self::Sum => sum(column),
            Self::Mean => mean(column),
            Self::Min => Ok(min(column)),
            Self::Max => Ok(max(column)),
            Self::Median => median(column),
            Self::Var { ddof } => var(column, ddof),
            Self::Std { ddof } => std(column, ddof),
        }
    }
}

// ── Describe ───────────────────────────────────────────────────────────

/// Row labels of a describe result, in output order.
pub const DESCRIBE_STATS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Summary of one numeric column. `count` is Int; the rest are Double.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: Value,
    pub mean: Value,
    pub std: Value,
    pub min: Value,
    pub q25: Value,
    pub q50: Value,
    pub q75: Value,
    pub max: Value,
}

impl Describe {
    fn missing() -> Self {
        Self {
            count: Value::Na,
            mean: Value::Na,
            std: Value::Na,
            min: Value::Na,
            q25: Value::Na,
            q50: Value::Na,
            q75: Value::Na,
            max: Value::Na,
        }
    }

    /// Statistics in [`DESCRIBE_STATS`] order.
    #[must_use]
    pub fn values(&self) -> [Value; 8] {
        [
            self.count.clone(),
            self.mean.clone(),
            self.std.clone(),
            self.min.clone(),
            self.q25.clone(),
            self.q50.clone(),
            self.q75.clone(),
            self.max.clone(),
        ]
    }
}

/// Count, mean, sample std, min, quartiles and max of an Int/Double column.
///
/// Quartiles pick `sorted[n / 4]` and `sorted[3n / 4]`; the 50% entry is the
/// median. An empty or all-NA column describes as NA throughout.
pub fn describe(column: &Column) -> Result<Describe, StatsError> {
    let nums = sorted_numeric(column, "describe")?;
    let n = nums.len();
    if n == 0 {
        return Ok(Describe::missing());
    }
    Ok(Describe {
        count: Value::Int(n as i64),
        mean: Value::from(mean_of(&nums)),
        std: var_of(&nums, DEFAULT_DDOF).map_or(Value::Na, |v| Value::from(v.sqrt())),
        min: Value::from(nums[0]),
        q25: Value::from(nums[n / 4]),
        q50: median_of_sorted(&nums).map_or(Value::Na, Value::from),
        q75: Value::from(nums[(3 * n / 4).min(n - 1)]),
        max: Value::from(nums[n - 1]),
    })
}

// ── Pairwise ───────────────────────────────────────────────────────────

/// Rows where both columns are present, as `f64` pairs.
fn complete_pairs(
    left: &Column,
    right: &Column,
    op: &'static str,
) -> Result<(Vec<f64>, Vec<f64>), StatsError> {
    for column in [left, right] {
        if !column.kind().is_numeric() {
            return Err(StatsError::UnsupportedKind {
                op,
                kind: column.kind(),
            });
        }
    }
    if left.len() != right.len() {
        return Err(StatsError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(left
        .to_f64()?
        .into_iter()
        .zip(right.to_f64()?)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .unzip())
}

fn centered_sums(xs: &[f64], ys: &[f64]) -> (f64, f64, f64) {
    let mx = mean_of(xs);
    let my = mean_of(ys);
    xs.iter()
        .zip(ys)
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
            let dx = x - mx;
            let dy = y - my;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        })
}

/// Sample covariance over pairwise-complete rows; NA below two pairs.
pub fn cov_pair(left: &Column, right: &Column) -> Result<Value, StatsError> {
    let (xs, ys) = complete_pairs(left, right, "cov")?;
    if xs.len() < 2 {
        return Ok(Value::Na);
    }
    let (sxy, _, _) = centered_sums(&xs, &ys);
    Ok(Value::from(sxy / (xs.len() - 1) as f64))
}

/// Pearson correlation over pairwise-complete rows.
///
/// NA below two pairs or when either side has zero variance.
pub fn corr_pair(left: &Column, right: &Column) -> Result<Value, StatsError> {
    let (xs, ys) = complete_pairs(left, right, "corr")?;
    if xs.len() < 2 {
        return Ok(Value::Na);
    }
    let (sxy, sxx, syy) = centered_sums(&xs, &ys);
    if sxx == 0.0 || syy == 0.0 {
        return Ok(Value::Na);
    }
    Ok(Value::from(sxy / (sxx * syy).sqrt()))
}

// ── Frequencies ────────────────────────────────────────────────────────

/// Distinct non-NA values with their counts, most frequent first.
///
/// Ties are broken by value order.
#[must_use]
pub fn value_counts(column: &Column) -> Vec<(Value, usize)> {
    let mut counts = BTreeMap::<Value, usize>::new();
    for value in column.values() {
        if !value.is_na() {
            *counts.entry(value).or_default() += 1;
        }
    }
    let mut out: Vec<(Value, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

// ── Rolling windows ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingStat {
    Sum,
    Mean,
    Min,
    Max,
    Var,
    Std,
}

/// Trailing-window statistic over an Int/Double column, as a Double column.
///
/// A position is NA until `window` cells are available, and whenever its
/// window contains an NA.
pub fn rolling(column: &Column, window: usize, stat: RollingStat) -> Result<Column, StatsError> {
    if window == 0 {
        return Err(StatsError::ZeroWindow);
    }
    if !column.kind().is_numeric() {
        return Err(StatsError::UnsupportedKind {
            op: "rolling",
            kind: column.kind(),
        });
    }
    let cells = column.to_f64()?;
    let out = (0..cells.len())
        .map(|end| {
            if end + 1 < window {
                return None;
            }
            let nums = cells[end + 1 - window..=end]
                .iter()
                .copied()
                .collect::<Option<Vec<f64>>>()?;
            match stat {
                RollingStat::Sum => Some(nums.iter().sum()),
                RollingStat::Mean => Some(mean_of(&nums)),
                RollingStat::Min => nums.iter().copied().reduce(f64::min),
                RollingStat::Max => nums.iter().copied().reduce(f64::max),
                RollingStat::Var => var_of(&nums, DEFAULT_DDOF),
                RollingStat::Std => var_of(&nums, DEFAULT_DDOF).map(f64::sqrt),
            }
        })
        .collect::<Vec<Option<f64>>>();
    Ok(Column::from(out))
}

// ── Sequences ──────────────────────────────────────────────────────────

/// `num` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Values from `start` towards `stop` (exclusive) in increments of `step`.
pub fn arange(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, StatsError> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(StatsError::NonFiniteRange { start, stop, step });
    }
    if step == 0.0 {
        return Err(StatsError::ZeroStep);
    }
    if (step > 0.0 && start >= stop) || (step < 0.0 && start <= stop) {
        return Ok(Vec::new());
    }
    let len = ((stop - start) / step).ceil();
    if !len.is_finite() || len > (isize::MAX as usize / size_of::<f64>()) as f64 {
        return Err(StatsError::RangeTooLong { len });
    }
    let num = len as usize;
    Ok((0..num).map(|i| start + i as f64 * step).collect())
}
