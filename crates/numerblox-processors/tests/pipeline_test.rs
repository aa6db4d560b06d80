//! End-to-end pipeline runs on a seeded synthetic panel.

use ndarray::Axis;
use numerblox_data::{Dataset, EraKey, EraPartitioner, ErrorKind};
use numerblox_exposure::{PenaltyConfig, feature_exposures, max_abs};
use numerblox_processors::{
    EraExecutor, FeatureNeutralizer, FeaturePenalizer, FeatureSelectionProcessor, MeanEnsembler,
    Pipeline, PipelineError, Processor, ProcessorError, ReduceMemoryProcessor,
};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

const FEATURES: usize = 6;

fn panel(eras: usize, rows_per_era: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = eras * rows_per_era;
    // Interleave eras so recombination has real work to do
    let era: Vec<String> = (0..n).map(|i| format!("{:04}", i % eras + 1)).collect();
    let features: Vec<Vec<f64>> = (0..FEATURES)
        .map(|_| (0..n).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();
    let prediction: Vec<f64> = (0..n)
        .map(|i| features[0][i] + 0.7 * features[1][i] + rng.gen_range(-0.4..0.4))
        .collect();

    let mut columns = vec![Column::new("era".into(), era)];
    for (j, values) in features.into_iter().enumerate() {
        columns.push(Column::new(format!("feature_{j}").into(), values));
    }
    columns.push(Column::new("target".into(), vec![0.5; n]));
    columns.push(Column::new("prediction".into(), prediction));
    Dataset::new(DataFrame::new(columns).unwrap()).unwrap()
}

fn per_era_max_exposure(dataset: &Dataset, column: &str) -> Vec<(EraKey, f64)> {
    let scores = dataset.column_f64(column).unwrap();
    let features = dataset.matrix(dataset.feature_cols()).unwrap();
    EraPartitioner::default()
        .partition(dataset)
        .unwrap()
        .into_iter()
        .map(|group| {
            let s = scores.select(Axis(0), &group.rows);
            let f = features.select(Axis(0), &group.rows);
            let exposures = feature_exposures(s.view(), f.view()).unwrap();
            (group.key, max_abs(exposures.view()))
        })
        .collect()
}

#[rstest]
#[case(3, 100, 0, None)]
#[case(4, 80, 1, Some(2))]
fn test_full_pipeline(
    #[case] eras: usize,
    #[case] rows: usize,
    #[case] seed: u64,
    #[case] workers: Option<usize>,
) {
    let executor = workers.map_or_else(EraExecutor::new, |w| EraExecutor::new().with_workers(w));
    let pipeline = Pipeline::new()
        .with_stage(ReduceMemoryProcessor::new())
        .with_stage(
            FeatureNeutralizer::new("prediction", 0.5)
                .unwrap()
                .with_executor(executor),
        )
        .with_stage(
            FeaturePenalizer::new(
                vec!["model".into()],
                "prediction",
                PenaltyConfig::with_max_exposure(0.1),
            )
            .unwrap()
            .with_executor(executor),
        )
        .with_stage(
            MeanEnsembler::new(
                vec![
                    "prediction_neutralized_0.5".into(),
                    "prediction_prediction_model_FP_0.1".into(),
                ],
                "prediction_ensemble",
            )
            .unwrap(),
        );

    let input = panel(eras, rows, seed);
    let (output, reports) = pipeline.run_with_reports(&input).unwrap();

    assert_eq!(reports.len(), 4);
    assert_eq!(output.height(), input.height());
    assert_eq!(input.shape().1 + 3, output.shape().1);

    for column in [
        "prediction_neutralized_0.5",
        "prediction_prediction_model_FP_0.1",
        "prediction_ensemble",
    ] {
        let values = output.column_f64(column).unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)), "{column}");
    }

    let before = per_era_max_exposure(&output, "prediction");
    let after = per_era_max_exposure(&output, "prediction_prediction_model_FP_0.1");
    assert_eq!(after.len(), eras);
    for ((era, start), (_, end)) in before.iter().zip(&after) {
        assert!(*start > 0.1, "era {era} starts at {start}");
        assert!(*end <= 0.1 + 1e-3, "era {era} ends at {end}");
    }
}

#[test]
fn test_failing_era_aborts_pipeline() {
    let input = panel(3, 40, 5);
    let mut prediction = input.column_f64("prediction").unwrap().to_vec();
    // Row 1 belongs to era 0002
    prediction[1] = f64::NAN;
    let broken = input.with_f64_column("prediction", prediction).unwrap();

    let pipeline = Pipeline::new()
        .with_stage(FeatureSelectionProcessor::new(vec![
            "feature_0".into(),
            "feature_1".into(),
        ]))
        .with_stage(
            FeaturePenalizer::new(vec!["model".into()], "prediction", PenaltyConfig::default())
                .unwrap(),
        );
    let err = pipeline.run(&broken).unwrap_err();

    assert_eq!(err.processor(), "FeaturePenalizer");
    assert_eq!(err.kind(), ErrorKind::Numerical);
    let PipelineError::Stage { index, source, .. } = err;
    assert_eq!(index, 1);
    match source {
        ProcessorError::Eras(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].era, EraKey::Text("0002".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_source_snapshot_is_untouched() {
    let input = panel(2, 50, 9);
    let before = input.frame().clone();
    let output = FeatureNeutralizer::new("prediction", 1.0)
        .unwrap()
        .with_features(vec!["feature_0".into(), "feature_3".into()])
        .transform(&input)
        .unwrap();
    assert!(input.frame().equals(&before));
    assert!(output.has_column("prediction_neutralized_1.0"));
}
