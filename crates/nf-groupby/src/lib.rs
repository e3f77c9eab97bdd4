#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use log::{debug, trace};
use nf_columnar::{Column, ColumnError};
use nf_frame::{DataFrame, FrameError};
use nf_math::MathError;
use nf_stats::{Reducer, StatsError};
use nf_types::{DEFAULT_NA_TOKEN, ErrorCategory, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByOptions {
    /// Skip rows whose key holds an NA instead of grouping them together.
    pub dropna: bool,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroupByError {
    #[error("group-by needs at least one key column")]
    NoKeys,
    #[error("group {key:?} not found")]
    GroupNotFound { key: String },
    #[error("key has {actual} components but the grouping uses {expected} columns")]
    KeyArity { expected: usize, actual: usize },
    #[error(
        "transform of column '{column}' returned {actual} values for a group of {expected} rows"
    )]
    TransformLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Math(#[from] MathError),
}

impl GroupByError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GroupNotFound { .. } => ErrorCategory::NotFound,
            Self::TransformLength { .. } => ErrorCategory::ShapeMismatch,
            Self::NoKeys | Self::KeyArity { .. } => ErrorCategory::InvalidArgument,
            Self::Frame(err) => err.category(),
            Self::Column(err) => err.category(),
            Self::Stats(err) => err.category(),
            Self::Math(err) => err.category(),
        }
    }
}

/// One value per key column.
pub type GroupKey = Vec<Value>;

/// Aggregation closure applied to one group's slice of a column.
pub type AggFn<'f> = &'f dyn Fn(&Column) -> Result<Value, StatsError>;

/// Text label of a group key; multi-column keys are joined with `", "`.
///
/// Distinct keys always get distinct labels. A string component is written in
/// double quotes (inner quotes doubled) when it contains a comma or a quote,
/// or when it equals the NA token. A NaN double is written as `NaN`.
#[must_use]
pub fn key_label(key: &[Value]) -> String {
    key.iter().map(label_part).collect::<Vec<_>>().join(", ")
}

fn label_part(value: &Value) -> String {
    match value {
        Value::Str(text)
            if text == DEFAULT_NA_TOKEN || text.contains(',') || text.contains('"') =>
        {
            format!("\"{}\"", text.replace('"', "\"\""))
        }
        Value::Double(v) if v.is_nan() => "NaN".to_owned(),
        other => other.to_string(),
    }
}

/// Rows of a borrowed [`DataFrame`] partitioned by the values of key columns.
///
/// Groups iterate in ascending key order (the [`Value`] total order); rows
/// within a group keep their original order.
#[derive(Debug, Clone)]
pub struct GroupBy<'a> {
    frame: &'a DataFrame,
    by: Vec<String>,
    groups: BTreeMap<GroupKey, Vec<usize>>,
}

impl<'a> GroupBy<'a> {
    pub fn new(frame: &'a DataFrame, by: &[&str]) -> Result<Self, GroupByError> {
        Self::with_options(frame, by, GroupByOptions::default())
    }

    pub fn with_options(
        frame: &'a DataFrame,
        by: &[&str],
        options: GroupByOptions,
    ) -> Result<Self, GroupByError> {
        if by.is_empty() {
            return Err(GroupByError::NoKeys);
        }
        let keys = by
            .iter()
            .map(|name| frame.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        let mut skipped = 0_usize;
        for row in 0..frame.num_rows() {
            let key: GroupKey = keys
                .iter()
                .map(|column| column.get(row).unwrap_or(Value::Na))
                .collect();
            if options.dropna && key.iter().any(Value::is_na) {
                skipped += 1;
                continue;
            }
            groups.entry(key).or_default().push(row);
        }
        debug!(
            "grouped {} rows by {by:?} into {} groups ({skipped} rows with NA keys dropped)",
            frame.num_rows(),
            groups.len()
        );
        Ok(Self {
            frame,
            by: by.iter().map(|name| (*name).to_owned()).collect(),
            groups,
        })
    }

    #[must_use]
    pub fn frame(&self) -> &'a DataFrame {
        self.frame
    }

    /// Names of the key columns.
    #[must_use]
    pub fn by(&self) -> &[String] {
        &self.by
    }

    #[must_use]
    pub fn ngroups(&self) -> usize {
        self.groups.len()
    }

    /// Group keys in order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    /// Row positions of every group.
    #[must_use]
    pub fn indices(&self) -> &BTreeMap<GroupKey, Vec<usize>> {
        &self.groups
    }

    fn is_key(&self, name: &str) -> bool {
        self.by.iter().any(|key| key == name)
    }

    fn value_columns(&self) -> Vec<(&'a str, &'a Column)> {
        self.frame
            .iter()
            .filter(|(name, _)| !self.is_key(name))
            .collect()
    }

    fn labels(&self) -> Vec<String> {
        self.groups.keys().map(|key| key_label(key)).collect()
    }

    /// One value per group: `f` applied to each group's slice of `column`.
    fn per_group<F>(&self, column: &Column, f: F) -> Result<Vec<Value>, GroupByError>
    where
        F: Fn(&Column) -> Result<Value, StatsError>,
    {
        self.groups
            .values()
            .map(|rows| Ok(f(&column.take(rows)?)?))
            .collect()
    }

    /// Frame indexed by group label from already aggregated columns.
    fn keyed_frame(&self, columns: Vec<(String, Column)>) -> Result<DataFrame, GroupByError> {
        if columns.is_empty() {
            return Ok(DataFrame::new());
        }
        let frame = DataFrame::from_columns(columns)?;
        Ok(frame.set_index(self.labels())?)
    }

    /// Rows of one group, with their original labels.
    pub fn get_group(&self, key: &[Value]) -> Result<DataFrame, GroupByError> {
        if key.len() != self.by.len() {
            return Err(GroupByError::KeyArity {
                expected: self.by.len(),
                actual: key.len(),
            });
        }
        let rows = self
            .groups
            .get(key)
            .ok_or_else(|| GroupByError::GroupNotFound {
                key: key_label(key),
            })?;
        Ok(self.frame.take(rows)?)
    }

    /// Row count of every group, as a single `size` column.
    pub fn size(&self) -> Result<DataFrame, GroupByError> {
        let sizes: Vec<i64> = self
            .groups
            .values()
            .map(|rows| i64::try_from(rows.len()).unwrap_or(i64::MAX))
            .collect();
        self.keyed_frame(vec![("size".to_owned(), Column::from(sizes))])
    }

    /// Applies a reducer per group.
    ///
    /// `count` covers every non-key column; the other reducers cover the
    /// numeric non-key columns.
    pub fn reduce(&self, reducer: Reducer) -> Result<DataFrame, GroupByError> {
        let mut columns = Vec::new();
        for (name, column) in self.value_columns() {
            let kind = column.kind();
            let eligible = match reducer {
                Reducer::Count => true,
                _ => kind.is_numeric() && reducer.accepts(kind),
            };
            if !eligible {
                trace!("{} skips column '{name}' of kind {kind}", reducer.name());
                continue;
            }
            let values = self.per_group(column, |group| reducer.apply(group))?;
            columns.push((
                name.to_owned(),
                Column::from_values(reducer.output_kind(kind), &values)?,
            ));
        }
        self.keyed_frame(columns)
    }

    pub fn count(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Count)
    }

    pub fn sum(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Sum)
    }

    pub fn mean(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Mean)
    }

    pub fn min(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Min)
    }

    pub fn max(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Max)
    }

    pub fn median(&self) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Median)
    }

    pub fn var(&self, ddof: usize) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Var { ddof })
    }

    pub fn std(&self, ddof: usize) -> Result<DataFrame, GroupByError> {
        self.reduce(Reducer::Std { ddof })
    }

    /// Applies `f` per group to every non-key column.
    ///
    /// Output column kinds are inferred from the produced values.
    pub fn agg<F>(&self, f: F) -> Result<DataFrame, GroupByError>
    where
        F: Fn(&Column) -> Result<Value, StatsError>,
    {
        let mut columns = Vec::new();
        for (name, column) in self.value_columns() {
            let values = self.per_group(column, &f)?;
            columns.push((name.to_owned(), Column::infer_from_values(&values)?));
        }
        self.keyed_frame(columns)
    }

    /// One reducer per named column.
    pub fn agg_columns(&self, aggs: &[(&str, Reducer)]) -> Result<DataFrame, GroupByError> {
        let mut columns = Vec::with_capacity(aggs.len());
        for &(name, reducer) in aggs {
            let column = self.frame.column(name)?;
            let values = self.per_group(column, |group| reducer.apply(group))?;
            columns.push((
                name.to_owned(),
                Column::from_values(reducer.output_kind(column.kind()), &values)?,
            ));
        }
        self.keyed_frame(columns)
    }

    /// One closure per named column.
    pub fn agg_map(&self, aggs: &[(&str, AggFn<'_>)]) -> Result<DataFrame, GroupByError> {
        let mut columns = Vec::with_capacity(aggs.len());
        for &(name, f) in aggs {
            let values = self.per_group(self.frame.column(name)?, f)?;
            columns.push((name.to_owned(), Column::infer_from_values(&values)?));
        }
        self.keyed_frame(columns)
    }

    /// Replaces every non-key column with per-group results of `f`.
    ///
    /// `f` must return either one value (broadcast to the group) or one value
    /// per group row. The result keeps the source frame's rows and index;
    /// rows outside every group (NA keys with `dropna`) become NA.
    pub fn transform<F>(&self, mut f: F) -> Result<DataFrame, GroupByError>
    where
        F: FnMut(&Column) -> Result<Column, GroupByError>,
    {
        let keys: Vec<&str> = self.by.iter().map(String::as_str).collect();
        let mut out = self.frame.drop(&keys)?;
        for (name, column) in self.value_columns() {
            let mut cells = vec![Value::Na; self.frame.num_rows()];
            let mut kind = None;
            for rows in self.groups.values() {
                let result = f(&column.take(rows)?)?;
                match kind {
                    None => kind = Some(result.kind()),
                    Some(first) if first != result.kind() => {
                        return Err(ColumnError::KindMismatch {
                            left: first,
                            right: result.kind(),
                        }
                        .into());
                    }
                    Some(_) => {}
                }
                let values = result.values();
                match values.len() {
                    1 => {
                        for &row in rows {
                            cells[row] = values[0].clone();
                        }
                    }
                    n if n == rows.len() => {
                        for (&row, value) in rows.iter().zip(values) {
                            cells[row] = value;
                        }
                    }
                    n => {
                        return Err(GroupByError::TransformLength {
                            column: name.to_owned(),
                            expected: rows.len(),
                            actual: n,
                        });
                    }
                }
            }
            let kind = kind.unwrap_or(column.kind());
            out.add_column(name, Column::from_values(kind, &cells)?)?;
        }
        Ok(out)
    }

    /// Keeps whole groups whose sub-frame satisfies `predicate`; rows stay
    /// in their original order.
    pub fn filter<F>(&self, mut predicate: F) -> Result<DataFrame, GroupByError>
    where
        F: FnMut(&DataFrame) -> bool,
    {
        let mut keep = Vec::new();
        for rows in self.groups.values() {
            if predicate(&self.frame.take(rows)?) {
                keep.extend_from_slice(rows);
            }
        }
        keep.sort_unstable();
        debug!(
            "group filter kept {} of {} rows",
            keep.len(),
            self.frame.num_rows()
        );
        Ok(self.frame.take(&keep)?)
    }
}

/// `df.groupby(...)` entry point.
pub trait GroupByExt {
    fn groupby(&self, by: &[&str]) -> Result<GroupBy<'_>, GroupByError>;

    fn groupby_with_options(
        &self,
        by: &[&str],
        options: GroupByOptions,
    ) -> Result<GroupBy<'_>, GroupByError>;
}

impl GroupByExt for DataFrame {
    fn groupby(&self, by: &[&str]) -> Result<GroupBy<'_>, GroupByError> {
        GroupBy::new(self, by)
    }

    fn groupby_with_options(
        &self,
        by: &[&str],
        options: GroupByOptions,
    ) -> Result<GroupBy<'_>, GroupByError> {
        GroupBy::with_options(self, by, options)
    }
}

#[cfg(test)]
mod tests {
    use nf_columnar::Column;
    use nf_frame::DataFrame;
    use nf_stats::{Reducer, StatsError};
    use nf_types::{ErrorCategory, Kind, Value};

    use super::{AggFn, GroupByError, GroupByExt, GroupByOptions, key_label};

    fn letters() -> DataFrame {
        DataFrame::from_columns([
            ("key", Column::from(vec!["A", "B", "A", "B", "A"])),
            ("val", Column::from(vec![1_i64, 2, 3, 4, 5])),
        ])
        .expect("frame")
    }

    fn sales() -> DataFrame {
        DataFrame::from_columns([
            (
                "region",
                Column::from(vec![Some("east"), Some("west"), Some("east"), None, Some("west")]),
            ),
            ("rep", Column::from(vec!["a", "b", "a", "c", "d"])),
            (
                "units",
                Column::from(vec![Some(3_i64), Some(4), None, Some(8), Some(6)]),
            ),
            ("price", Column::from(vec![1.5, 2.0, 2.5, 3.0, 4.0])),
        ])
        .expect("frame")
    }

    // ── Construction ───────────────────────────────────────────────────

    #[test]
    fn groups_are_ordered_by_key() {
        let df = letters();
        let grouped = df.groupby(&["key"]).expect("groupby");
        assert_eq!(grouped.ngroups(), 2);
        let keys: Vec<String> = grouped.groups().map(|key| key_label(key)).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(
            grouped.indices().get(&vec![Value::from("A")]),
            Some(&vec![0, 2, 4])
        );
    }

    #[test]
    fn unknown_or_missing_keys_fail() {
        let df = letters();
        let err = df.groupby(&["nope"]).expect_err("unknown");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(df.groupby(&[]).expect_err("empty"), GroupByError::NoKeys);
    }

    #[test]
    fn na_keys_form_a_group_unless_dropped() {
        let df = sales();
        let kept = df.groupby(&["region"]).expect("groupby");
        assert_eq!(kept.ngroups(), 3);
        let total: usize = kept.indices().values().map(Vec::len).sum();
        assert_eq!(total, df.num_rows());

        let dropped = df
            .groupby_with_options(&["region"], GroupByOptions { dropna: true })
            .expect("groupby");
        assert_eq!(dropped.ngroups(), 2);
    }

    // ── Reducers ───────────────────────────────────────────────────────

    #[test]
    fn sum_per_key() {
        let df = letters();
        let sums = df.groupby(&["key"]).expect("groupby").sum().expect("sum");
        assert_eq!(sums.index().labels(), &["A", "B"]);
        assert_eq!(
            sums.column("val").expect("val"),
            &Column::from(vec![9_i64, 6])
        );
        assert_eq!(sums.num_columns(), 1);
    }

    #[test]
    fn numeric_reducers_skip_string_columns() {
        let df = sales();
        let grouped = df.groupby(&["region"]).expect("groupby");
        let means = grouped.mean().expect("mean");
        assert_eq!(means.column_names(), &["units", "price"]);
        assert_eq!(means.index().labels(), &["east", "west", "NA"]);
        assert_eq!(
            means.column("units").expect("units").get(0),
            Some(Value::Double(3.0))
        );

        let counts = grouped.count().expect("count");
        assert_eq!(counts.column_names(), &["rep", "units", "price"]);
        assert_eq!(
            counts.column("units").expect("units"),
            &Column::from(vec![1_i64, 2, 1])
        );
    }

    #[test]
    fn min_max_median_and_spread() {
        let grouped_df = letters();
        let grouped = grouped_df.groupby(&["key"]).expect("groupby");
        assert_eq!(
            grouped.min().expect("min").column("val").expect("val"),
            &Column::from(vec![1_i64, 2])
        );
        assert_eq!(
            grouped.max().expect("max").column("val").expect("val"),
            &Column::from(vec![5_i64, 4])
        );
        assert_eq!(
            grouped.median().expect("median").column("val").expect("val"),
            &Column::from(vec![3.0, 3.0])
        );
        let var = grouped.var(1).expect("var");
        assert_eq!(var.column("val").expect("val"), &Column::from(vec![4.0, 2.0]));
        let std = grouped.std(1).expect("std");
        let a = std.column("val").expect("val").to_f64().expect("numeric");
        assert!((a[0].expect("A") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn multi_key_labels_are_joined() {
        let df = DataFrame::from_columns([
            ("k1", Column::from(vec!["x", "x", "y"])),
            ("k2", Column::from(vec![1_i64, 2, 1])),
            ("v", Column::from(vec![1.0, 2.0, 3.0])),
        ])
        .expect("frame");
        let sums = df.groupby(&["k1", "k2"]).expect("groupby").sum().expect("sum");
        assert_eq!(sums.index().labels(), &["x, 1", "x, 2", "y, 1"]);
        assert_eq!(sums.column_names(), &["v"]);
    }

    #[test]
    fn na_key_and_na_text_get_distinct_labels() {
        let df = DataFrame::from_columns([
            ("k", Column::from(vec![Some("NA"), None, Some("x")])),
            ("v", Column::from(vec![1_i64, 2, 3])),
        ])
        .expect("frame");
        let grouped = df.groupby(&["k"]).expect("groupby");
        assert_eq!(grouped.ngroups(), 3);
        let sums = grouped.sum().expect("sum");
        assert_eq!(sums.index().labels(), &["\"NA\"", "x", "NA"]);
        assert_eq!(sums.column("v").expect("v"), &Column::from(vec![1_i64, 3, 2]));
    }

    #[test]
    fn separator_inside_key_text_is_quoted() {
        let df = DataFrame::from_columns([
            ("a", Column::from(vec!["x, y", "x"])),
            ("b", Column::from(vec!["z", "y, z"])),
            ("v", Column::from(vec![1_i64, 2])),
        ])
        .expect("frame");
        let grouped = df.groupby(&["a", "b"]).expect("groupby");
        let sums = grouped.sum().expect("sum");
        assert_eq!(sums.index().labels(), &["x, \"y, z\"", "\"x, y\", z"]);
        assert_eq!(sums.column("v").expect("v"), &Column::from(vec![2_i64, 1]));

        let sizes = grouped.size().expect("size");
        assert_eq!(sizes.num_rows(), 2);
        assert_eq!(
            key_label(&[Value::from("say \"hi\""), Value::Double(f64::NAN)]),
            "\"say \"\"hi\"\"\", NaN"
        );
    }

    #[test]
    fn size_counts_rows() {
        let sizes = letters().groupby(&["key"]).expect("groupby").size().expect("size");
        assert_eq!(sizes.column("size").expect("size"), &Column::from(vec![3_i64, 2]));
    }

    #[test]
    fn agg_variants() {
        let df = sales();
        let grouped = df.groupby(&["region"]).expect("groupby");

        let firsts = grouped
            .agg(|column| Ok(column.get(0).unwrap_or(Value::Na)))
            .expect("agg");
        assert_eq!(firsts.column("rep").expect("rep").kind(), Kind::Str);
        assert_eq!(
            firsts.column("rep").expect("rep").get(1),
            Some(Value::from("b"))
        );

        let picked = grouped
            .agg_columns(&[("price", Reducer::Max), ("units", Reducer::Sum)])
            .expect("agg_columns");
        assert_eq!(picked.column_names(), &["price", "units"]);
        assert_eq!(
            picked.column("units").expect("units"),
            &Column::from(vec![3_i64, 10, 8])
        );
        assert_eq!(
            picked.column("price").expect("price"),
            &Column::from(vec![2.5, 4.0, 3.0])
        );

        let range: AggFn<'_> = &|column| {
            let hi = nf_stats::max(column).as_f64();
            let lo = nf_stats::min(column).as_f64();
            Ok(Value::from(hi.zip(lo).map(|(hi, lo)| hi - lo)))
        };
        let spread = grouped.agg_map(&[("price", range)]).expect("agg_map");
        assert_eq!(
            spread.column("price").expect("price"),
            &Column::from(vec![1.0, 2.0, 0.0])
        );
        assert!(grouped.agg_columns(&[("missing", Reducer::Sum)]).is_err());
    }

    #[test]
    fn agg_errors_propagate() {
        let df = letters();
        let grouped = df.groupby(&["key"]).expect("groupby");
        let err = grouped
            .agg_columns(&[("key", Reducer::Sum)])
            .expect_err("string sum");
        assert!(matches!(err, GroupByError::Stats(StatsError::UnsupportedKind { .. })));
    }

    // ── Group-wise frames ──────────────────────────────────────────────

    #[test]
    fn get_group_returns_original_rows() {
        let df = letters();
        let grouped = df.groupby(&["key"]).expect("groupby");
        let b = grouped.get_group(&[Value::from("B")]).expect("group");
        assert_eq!(b.index().labels(), &["1", "3"]);
        let err = grouped.get_group(&[Value::from("Z")]).expect_err("absent");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(matches!(
            grouped.get_group(&[]),
            Err(GroupByError::KeyArity { .. })
        ));
    }

    #[test]
    fn transform_broadcasts_and_scatters() {
        let df = letters();
        let grouped = df.groupby(&["key"]).expect("groupby");
        let totals = grouped
            .transform(|group| {
                let total = nf_stats::sum(group)?;
                Ok(Column::from_values(Kind::Int, &[total])?)
            })
            .expect("transform");
        assert_eq!(totals.num_rows(), 5);
        assert_eq!(totals.column_names(), &["val"]);
        assert_eq!(
            totals.column("val").expect("val"),
            &Column::from(vec![9_i64, 6, 9, 6, 9])
        );

        let running = grouped
            .transform(|group| {
                Ok(nf_math::cumulative(group, nf_math::CumulativeOp::Sum)?)
            })
            .expect("cumsum");
        assert_eq!(
            running.column("val").expect("val"),
            &Column::from(vec![1_i64, 2, 4, 6, 9])
        );

        let err = grouped
            .transform(|group| Ok(group.append(group)?))
            .expect_err("wrong length");
        assert_eq!(err.category(), ErrorCategory::ShapeMismatch);

        let err = grouped
            .transform(|group| {
                if group.get(0) == Some(Value::Int(1)) {
                    Ok(group.clone())
                } else {
                    Ok(group.cast(Kind::Double)?)
                }
            })
            .expect_err("mixed kinds");
        assert!(matches!(
            err,
            GroupByError::Column(nf_columnar::ColumnError::KindMismatch { .. })
        ));
    }

    #[test]
    fn filter_keeps_whole_groups_in_order() {
        let df = letters();
        let grouped = df.groupby(&["key"]).expect("groupby");
        let big = grouped
            .filter(|group| group.num_rows() > 2)
            .expect("filter");
        assert_eq!(big.index().labels(), &["0", "2", "4"]);
        let none = grouped.filter(|_| false).expect("filter");
        assert!(none.is_empty());
    }

    #[test]
    fn empty_frame_groups_to_nothing() {
        let df = DataFrame::from_columns([
            ("k", Column::from(Vec::<i64>::new())),
            ("v", Column::from(Vec::<f64>::new())),
        ])
        .expect("frame");
        let grouped = df.groupby(&["k"]).expect("groupby");
        assert_eq!(grouped.ngroups(), 0);
        assert_eq!(grouped.sum().expect("sum").num_rows(), 0);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: GroupByOptions = serde_json::from_str("{}").expect("options");
        assert!(!options.dropna);
        let options: GroupByOptions =
            serde_json::from_str(r#"{"dropna":true}"#).expect("options");
        assert!(options.dropna);
    }
}
