//! Partition / recombine integrity over randomly shuffled era layouts.

use numerblox_data::{Dataset, EraFragment, EraPartitioner, TaxonomyRules};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn shuffled_dataset(n_rows: usize, n_eras: i64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let eras: Vec<i64> = (0..n_rows).map(|_| rng.gen_range(0..n_eras)).collect();
    let ids: Vec<u64> = (0..n_rows as u64).collect();
    let frame = DataFrame::new(vec![
        Column::new("row_id".into(), ids),
        Column::new("era".into(), eras),
    ])
    .unwrap();
    Dataset::with_rules(frame, TaxonomyRules::default().with_era_col("era")).unwrap()
}

#[rstest]
#[case(1, 1, 7)]
#[case(50, 3, 11)]
#[case(500, 12, 42)]
fn test_recombine_partition_is_identity(
    #[case] n_rows: usize,
    #[case] n_eras: i64,
    #[case] seed: u64,
) {
    let dataset = shuffled_dataset(n_rows, n_eras, seed);
    let partitioner = EraPartitioner::default();
    let groups = partitioner.partition(&dataset).unwrap();

    // Every row lands in exactly one era
    let covered: usize = groups.iter().map(|g| g.len()).sum();
    assert_eq!(covered, n_rows);
    for group in &groups {
        assert!(group.rows.windows(2).all(|w| w[0] < w[1]));
    }
    assert!(groups.windows(2).all(|w| w[0].key < w[1].key));

    let fragments = groups
        .into_iter()
        .map(|g| EraFragment {
            values: g.rows.clone(),
            key: g.key,
            rows: g.rows,
        })
        .collect();
    let recombined = partitioner.recombine(fragments, dataset.height()).unwrap();
    assert_eq!(recombined, (0..n_rows).collect::<Vec<_>>());
}

#[test]
fn test_missing_era_column() {
    let frame = DataFrame::new(vec![Column::new("row_id".into(), &[1u64, 2])]).unwrap();
    let dataset = Dataset::new(frame).unwrap();
    assert!(EraPartitioner::default().partition(&dataset).is_err());
}
