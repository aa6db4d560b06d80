//! Dataset snapshots
//!
//! A [`Dataset`] pairs a polars [`DataFrame`] with the [`ColumnTaxonomy`]
//! derived from its schema. Snapshots are never mutated: every operation
//! that changes the table returns a new snapshot whose taxonomy is
//! classified again from the new schema with the same rules.

use crate::error::{DataError, Result};
use crate::taxonomy::{ColumnTaxonomy, TaxonomyRules};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Immutable tabular snapshot with its column taxonomy
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    taxonomy: ColumnTaxonomy,
    rules: TaxonomyRules,
}

impl Dataset {
    /// Wrap a frame using the default prefix rules.
    pub fn new(frame: DataFrame) -> Result<Self> {
        Self::with_rules(frame, TaxonomyRules::default())
    }

    /// Wrap a frame using custom classification rules.
    pub fn with_rules(frame: DataFrame, rules: TaxonomyRules) -> Result<Self> {
        let taxonomy = ColumnTaxonomy::classify(&frame.get_column_names(), &rules)?;
        Ok(Self {
            frame,
            taxonomy,
            rules,
        })
    }

    /// Build the next snapshot from a transformed frame.
    ///
    /// The taxonomy is recomputed from `frame`'s schema; nothing is carried
    /// over from this snapshot except the classification rules.
    pub fn derive(&self, frame: DataFrame) -> Result<Self> {
        let mut rules = self.rules.clone();
        for explicit in [&mut rules.features, &mut rules.targets, &mut rules.predictions] {
            if let Some(list) = explicit {
                list.retain(|c| frame.column(c).is_ok());
            }
        }
        Self::with_rules(frame, rules)
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Column classification.
    pub const fn taxonomy(&self) -> &ColumnTaxonomy {
        &self.taxonomy
    }

    /// Classification rules.
    pub const fn rules(&self) -> &TaxonomyRules {
        &self.rules
    }

    /// Feature columns.
    pub fn feature_cols(&self) -> &[String] {
        &self.taxonomy.feature_cols
    }

    /// Target columns.
    pub fn target_cols(&self) -> &[String] {
        &self.taxonomy.target_cols
    }

    /// Prediction columns.
    pub fn prediction_cols(&self) -> &[String] {
        &self.taxonomy.prediction_cols
    }

    /// Auxiliary columns.
    pub fn aux_cols(&self) -> &[String] {
        &self.taxonomy.aux_cols
    }

    /// Era column name.
    pub fn era_col(&self) -> Result<&str> {
        self.taxonomy
            .era_col
            .as_deref()
            .ok_or_else(|| DataError::MissingEraColumn {
                candidates: self.rules.era_candidates.clone(),
            })
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.frame.shape()
    }

    /// Whether `name` is a column of the snapshot.
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Fail with [`DataError::MissingColumn`] for the first absent name.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        match names.iter().find(|n| !self.has_column(n.as_ref())) {
            Some(missing) => Err(DataError::MissingColumn(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Read a numeric column as `f64`.
    ///
    /// Nulls are rejected; a neutralized score must exist for every row.
    pub fn column_f64(&self, name: &str) -> Result<Array1<f64>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))?;
        let dtype = column.dtype();
        if !(dtype.is_float() || dtype.is_integer()) {
            return Err(DataError::InvalidColumn {
                column: name.to_string(),
                reason: format!("expected a numeric column, found {}", column.dtype()),
            });
        }
        let values = column.cast(&DataType::Float64)?;
        values
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| DataError::InvalidColumn {
                    column: name.to_string(),
                    reason: format!("null value at row {row}"),
                })
            })
            .collect()
    }

    /// Read several numeric columns into a row-major (rows × columns) matrix.
    pub fn matrix<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>> {
        let mut matrix = Array2::<f64>::zeros((self.height(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let column = self.column_f64(name.as_ref())?;
            matrix.column_mut(j).assign(&column);
        }
        Ok(matrix)
    }

    /// New snapshot with `values` stored under `name`.
    ///
    /// An existing column of the same name is replaced, so re-running a
    /// stage yields the same schema.
    pub fn with_f64_column(&self, name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.height() {
            return Err(DataError::RowCountMismatch {
                expected: self.height(),
                actual: values.len(),
            });
        }
        let mut frame = self.frame.clone();
        frame.with_column(Series::new(name.into(), values))?;
        self.derive(frame)
    }

    /// New snapshot restricted to `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        self.require_columns(names)?;
        let frame = self.frame.select(names.iter().map(|n| n.as_ref()))?;
        self.derive(frame)
    }
}
