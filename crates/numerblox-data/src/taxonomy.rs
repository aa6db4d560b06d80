//! Column taxonomy
//!
//! Splits a dataset schema into feature, target, prediction and auxiliary
//! groups. Each group is either given explicitly or recognized by a name
//! prefix (`feature*`, `target*`, `prediction*`). Everything that is not a
//! feature, target or prediction is auxiliary, including the era column.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Taxonomy group a column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnGroup {
    /// Engineered predictors
    Feature,
    /// Training targets
    Target,
    /// Model predictions
    Prediction,
    /// Identifiers and everything else (row id, era, ticker)
    Aux,
}

impl fmt::Display for ColumnGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Feature => "feature",
            Self::Target => "target",
            Self::Prediction => "prediction",
            Self::Aux => "aux",
        };
        f.write_str(name)
    }
}

/// Rules used to classify a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRules {
    /// Prefix marking feature columns (default: "feature")
    pub feature_prefix: String,
    /// Prefix marking target columns (default: "target")
    pub target_prefix: String,
    /// Prefix marking prediction columns (default: "prediction")
    pub prediction_prefix: String,
    /// Explicit feature columns; replaces prefix matching for features
    pub features: Option<Vec<String>>,
    /// Explicit target columns; replaces prefix matching for targets
    pub targets: Option<Vec<String>>,
    /// Explicit prediction columns; replaces prefix matching for predictions
    pub predictions: Option<Vec<String>>,
    /// Era column candidates, first match wins
    pub era_candidates: Vec<String>,
}

impl Default for TaxonomyRules {
    fn default() -> Self {
        Self {
            feature_prefix: "feature".to_string(),
            target_prefix: "target".to_string(),
            prediction_prefix: "prediction".to_string(),
            features: None,
            targets: None,
            predictions: None,
            era_candidates: vec![
                "era".to_string(),
                "friday_date".to_string(),
                "date".to_string(),
            ],
        }
    }
}

impl TaxonomyRules {
    /// Use `era_col` as the only era candidate.
    pub fn with_era_col(mut self, era_col: impl Into<String>) -> Self {
        self.era_candidates = vec![era_col.into()];
        self
    }

    /// Classify features from an explicit list instead of the prefix.
    pub fn with_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> Self {
        self.features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Classify targets from an explicit list instead of the prefix.
    pub fn with_targets<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Classify predictions from an explicit list instead of the prefix.
    pub fn with_predictions<S: Into<String>>(
        mut self,
        predictions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.predictions = Some(predictions.into_iter().map(Into::into).collect());
        self
    }

    fn matches(&self, column: &str, group: ColumnGroup) -> bool {
        let (explicit, prefix) = match group {
            ColumnGroup::Feature => (&self.features, &self.feature_prefix),
            ColumnGroup::Target => (&self.targets, &self.target_prefix),
            ColumnGroup::Prediction => (&self.predictions, &self.prediction_prefix),
            ColumnGroup::Aux => return false,
        };
        match explicit {
            Some(list) => list.iter().any(|c| c == column),
            None => column.starts_with(prefix.as_str()),
        }
    }
}

/// Classified schema of a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTaxonomy {
    /// Feature columns in schema order
    pub feature_cols: Vec<String>,
    /// Target columns in schema order
    pub target_cols: Vec<String>,
    /// Prediction columns in schema order
    pub prediction_cols: Vec<String>,
    /// Auxiliary columns in schema order
    pub aux_cols: Vec<String>,
    /// Era column, if one of the candidates is present
    pub era_col: Option<String>,
}

impl ColumnTaxonomy {
    /// Classify `columns` according to `rules`.
    ///
    /// # Errors
    /// * [`DataError::MissingColumn`] when an explicitly listed column is absent
    /// * [`DataError::GroupOverlap`] when a column matches two groups
    pub fn classify<S: AsRef<str>>(columns: &[S], rules: &TaxonomyRules) -> Result<Self> {
        for explicit in [&rules.features, &rules.targets, &rules.predictions]
            .into_iter()
            .flatten()
        {
            if let Some(missing) = explicit
                .iter()
                .find(|wanted| !columns.iter().any(|c| c.as_ref() == wanted.as_str()))
            {
                return Err(DataError::MissingColumn(missing.clone()));
            }
        }

        let mut taxonomy = Self::default();
        for column in columns {
            let column = column.as_ref();
            let mut group = ColumnGroup::Aux;
            for candidate in [
                ColumnGroup::Feature,
                ColumnGroup::Target,
                ColumnGroup::Prediction,
            ] {
                if !rules.matches(column, candidate) {
                    continue;
                }
                if group != ColumnGroup::Aux {
                    return Err(DataError::GroupOverlap {
                        column: column.to_string(),
                        first: group,
                        second: candidate,
                    });
                }
                group = candidate;
            }
            taxonomy.group_mut(group).push(column.to_string());
        }

        taxonomy.era_col = rules
            .era_candidates
            .iter()
            .find(|era| taxonomy.aux_cols.contains(era))
            .cloned();

        Ok(taxonomy)
    }

    /// Columns of one group.
    pub fn group(&self, group: ColumnGroup) -> &[String] {
        match group {
            ColumnGroup::Feature => &self.feature_cols,
            ColumnGroup::Target => &self.target_cols,
            ColumnGroup::Prediction => &self.prediction_cols,
            ColumnGroup::Aux => &self.aux_cols,
        }
    }

    fn group_mut(&mut self, group: ColumnGroup) -> &mut Vec<String> {
        match group {
            ColumnGroup::Feature => &mut self.feature_cols,
            ColumnGroup::Target => &mut self.target_cols,
            ColumnGroup::Prediction => &mut self.prediction_cols,
            ColumnGroup::Aux => &mut self.aux_cols,
        }
    }

    /// Group of `column`, if it is part of the schema.
    pub fn group_of(&self, column: &str) -> Option<ColumnGroup> {
        [
            ColumnGroup::Feature,
            ColumnGroup::Target,
            ColumnGroup::Prediction,
            ColumnGroup::Aux,
        ]
        .into_iter()
        .find(|&g| self.group(g).iter().any(|c| c == column))
    }

    /// Total number of classified columns.
    pub fn len(&self) -> usize {
        self.feature_cols.len()
            + self.target_cols.len()
            + self.prediction_cols.len()
            + self.aux_cols.len()
    }

    /// Whether the schema was empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
