//! Per-era exposure summaries.

use ndarray::Axis;
use numerblox_data::{Dataset, EraPartitioner};
use numerblox_exposure::{feature_exposures, max_abs};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while summarizing exposures
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Dataset access failed
    #[error(transparent)]
    Data(#[from] numerblox_data::DataError),

    /// Exposure computation failed
    #[error(transparent)]
    Exposure(#[from] numerblox_exposure::ExposureError),
}

impl SummaryError {
    /// Classify the error.
    pub const fn kind(&self) -> numerblox_data::ErrorKind {
        match self {
            Self::Data(e) => e.kind(),
            Self::Exposure(e) => e.kind(),
        }
    }
}

/// Largest absolute feature exposure of each summarized column in one era
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraExposure {
    /// Era value
    pub era: String,
    /// Rows in the era
    pub rows: usize,
    /// One value per summarized column, in column order
    pub max_exposure: Vec<f64>,
}

/// Per-era maximum absolute exposure for a set of prediction columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    /// Summarized columns
    pub columns: Vec<String>,
    /// Feature columns exposures were measured against
    pub features: Vec<String>,
    /// One entry per era, ascending
    pub eras: Vec<EraExposure>,
}

impl ExposureSummary {
    /// Measure every column in `columns` against the dataset's features.
    pub fn from_dataset(dataset: &Dataset, columns: &[String]) -> Result<Self, SummaryError> {
        let features = dataset.feature_cols().to_vec();
        let matrix = dataset.matrix(&features)?;
        let scores = columns
            .iter()
            .map(|c| dataset.column_f64(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut eras = Vec::new();
        for group in EraPartitioner::default().partition(dataset)? {
            let era_features = matrix.select(Axis(0), &group.rows);
            let max_exposure = scores
                .iter()
                .map(|s| {
                    let era_scores = s.select(Axis(0), &group.rows);
                    feature_exposures(era_scores.view(), era_features.view())
                        .map(|e| max_abs(e.view()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            eras.push(EraExposure {
                era: group.key.to_string(),
                rows: group.len(),
                max_exposure,
            });
        }

        Ok(Self {
            columns: columns.to_vec(),
            features,
            eras,
        })
    }

    /// Worst era per column.
    pub fn worst(&self) -> Vec<f64> {
        (0..self.columns.len())
            .map(|j| {
                self.eras
                    .iter()
                    .map(|e| e.max_exposure[j])
                    .fold(0.0, f64::max)
            })
            .collect()
    }
}

impl fmt::Display for ExposureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Max |exposure| per era ({} features)",
            self.features.len()
        )?;
        write!(f, "  {:<8} {:>6}", "era", "rows")?;
        for column in &self.columns {
            write!(f, "  {column:>12}")?;
        }
        writeln!(f)?;
        for era in &self.eras {
            write!(f, "  {:<8} {:>6}", era.era, era.rows)?;
            for value in &era.max_exposure {
                write!(f, "  {value:>12.4}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  {:<8} {:>6}", "worst", "")?;
        for value in self.worst() {
            write!(f, "  {value:>12.4}")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticPanel;

    #[test]
    fn test_summary_per_era() {
        let dataset = SyntheticPanel {
            eras: 2,
            rows_per_era: 50,
            features: 4,
            ..SyntheticPanel::default()
        }
        .build()
        .unwrap();
        let summary = ExposureSummary::from_dataset(&dataset, &["prediction".to_string()]).unwrap();
        assert_eq!(summary.eras.len(), 2);
        assert_eq!(summary.eras[0].era, "1");
        assert_eq!(summary.eras[0].rows, 50);
        assert!(summary.worst()[0] > 0.1);

        let text = summary.to_string();
        assert!(text.contains("prediction"));
        assert!(text.contains("worst"));
    }

    #[test]
    fn test_summary_serializes() {
        let dataset = SyntheticPanel::default().build().unwrap();
        let summary = ExposureSummary::from_dataset(&dataset, &["prediction".to_string()]).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["columns"][0], "prediction");
        assert_eq!(json["eras"].as_array().unwrap().len(), 3);
        assert_eq!(json["features"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_missing_column() {
        let dataset = SyntheticPanel::default().build().unwrap();
        let err = ExposureSummary::from_dataset(&dataset, &["prediction_x".to_string()]).unwrap_err();
        assert_eq!(err.kind(), numerblox_data::ErrorKind::Validation);
    }
}
