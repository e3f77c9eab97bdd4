#![forbid(unsafe_code)]

use std::collections::HashMap;

use nf_types::ErrorCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("duplicate index label {label:?}")]
    DuplicateLabel { label: String },
    #[error("index label {label:?} not found")]
    LabelNotFound { label: String },
    #[error("position {position} out of bounds for index of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error("invalid slice [{start}, {end}) for index of length {len}")]
    InvalidSlice { start: usize, end: usize, len: usize },
}

impl IndexError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LabelNotFound { .. } | Self::PositionOutOfBounds { .. } => {
                ErrorCategory::NotFound
            }
            Self::DuplicateLabel { .. } => ErrorCategory::ShapeMismatch,
            Self::InvalidSlice { .. } => ErrorCategory::InvalidArgument,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IndexRepr {
    labels: Vec<String>,
    is_default: bool,
}

/// Ordered, unique row labels with O(1) label lookup.
///
/// An `Index` never changes after construction; every layout change builds a
/// new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "IndexRepr", into = "IndexRepr")]
pub struct Index {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
    is_default: bool,
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for Index {}

impl TryFrom<IndexRepr> for Index {
    type Error = IndexError;

    fn try_from(repr: IndexRepr) -> Result<Self, Self::Error> {
        let mut index = Self::new(repr.labels)?;
        index.is_default = repr.is_default;
        Ok(index)
    }
}

impl From<Index> for IndexRepr {
    fn from(index: Index) -> Self {
        Self {
            labels: index.labels,
            is_default: index.is_default,
        }
    }
}

fn build_positions(labels: &[String]) -> Result<HashMap<String, usize>, IndexError> {
    let mut positions = HashMap::with_capacity(labels.len());
    for (pos, label) in labels.iter().enumerate() {
        if positions.insert(label.clone(), pos).is_some() {
            return Err(IndexError::DuplicateLabel {
                label: label.clone(),
            });
        }
    }
    Ok(positions)
}

impl Default for Index {
    fn default() -> Self {
        Self::default_for(0)
    }
}

impl Index {
    /// Custom index over `labels`; duplicates are rejected.
    pub fn new(labels: Vec<String>) -> Result<Self, IndexError> {
        let positions = build_positions(&labels)?;
        Ok(Self {
            labels,
            positions,
            is_default: false,
        })
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels.into_iter().map(Into::into).collect())
    }

    /// Positional labels `"0"..len`.
    #[must_use]
    pub fn default_for(len: usize) -> Self {
        let labels: Vec<String> = (0..len).map(|i| i.to_string()).collect();
        let positions = labels
            .iter()
            .enumerate()
            .map(|(pos, label)| (label.clone(), pos))
            .collect();
        Self {
            labels,
            positions,
            is_default: true,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, position: usize) -> Result<&str, IndexError> {
        self.labels
            .get(position)
            .map(String::as_str)
            .ok_or(IndexError::PositionOutOfBounds {
                position,
                len: self.len(),
            })
    }

    #[must_use]
    pub fn get_position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn position(&self, label: &str) -> Result<usize, IndexError> {
        self.get_position(label)
            .ok_or_else(|| IndexError::LabelNotFound {
                label: label.to_owned(),
            })
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    /// Positions of `labels`, in the order given.
    pub fn to_positions<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, IndexError> {
        labels
            .iter()
            .map(|label| self.position(label.as_ref()))
            .collect()
    }

    /// Labels at `[start, end)`; the range must be non-empty and in bounds.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, IndexError> {
        let len = self.len();
        if start >= end || end > len {
            return Err(IndexError::InvalidSlice { start, end, len });
        }
        Self::new(self.labels[start..end].to_vec())
    }

    pub fn take(&self, positions: &[usize]) -> Result<Self, IndexError> {
        let labels = positions
            .iter()
            .map(|&pos| self.label(pos).map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(labels)
    }

    pub fn append(&self, label: impl Into<String>) -> Result<Self, IndexError> {
        let label = label.into();
        if self.contains(&label) {
            return Err(IndexError::DuplicateLabel { label });
        }
        let mut labels = self.labels.clone();
        labels.push(label);
        Self::new(labels)
    }

    pub fn extend(&self, other: &Self) -> Result<Self, IndexError> {
        let mut labels = Vec::with_capacity(self.len() + other.len());
        labels.extend_from_slice(&self.labels);
        labels.extend_from_slice(&other.labels);
        Self::new(labels)
    }

    /// Stable permutation ordering the labels as text.
    #[must_use]
    pub fn argsort(&self, ascending: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            let ord = self.labels[a].cmp(&self.labels[b]);
            if ascending { ord } else { ord.reverse() }
        });
        order
    }
}
